//! The program interface.
//!
//! A program is a pure function from (state, caller, action, round) to a
//! list of mutations. It never touches the state itself: the ledger applies
//! the mutations only when the whole evaluation succeeded, so a rejected
//! action leaves nothing behind.

use crate::codec::{self, GLOBAL};
use crate::{Action, Address, Error, Participant, Path, State, Value};
use serde::{Deserialize, Serialize};

/// A mutation to state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    Set(Path, Value),
    Delete(Path),
}

/// Everything a program may know about the call besides state.
#[derive(Clone, Copy, Debug)]
pub struct CallContext<'a> {
    /// Authenticated sender.
    pub sender: Address,
    /// Account that created the application. On the creation call this is
    /// the sender.
    pub creator: Address,
    /// The ledger's current round.
    pub round: u64,
    pub action: &'a Action,
}

impl CallContext<'_> {
    pub fn is_creator(&self) -> bool {
        self.sender == self.creator
    }

    pub fn ensure_creator(&self) -> Result<(), Error> {
        if self.is_creator() {
            Ok(())
        } else {
            Err(Error::Unauthorized(self.sender))
        }
    }
}

/// Trait for application programs.
pub trait Program: Send + Sync {
    /// Evaluate an action against state, returning mutations.
    fn evaluate(&self, ctx: &CallContext<'_>, state: &State) -> Result<Vec<Mutation>, Error>;
}

/// Apply mutations in order.
pub fn apply(state: &mut State, mutations: Vec<Mutation>) {
    for mutation in mutations {
        match mutation {
            Mutation::Set(path, value) => state.set_path(&path, value),
            Mutation::Delete(path) => {
                state.delete_path(&path);
            }
        }
    }
}

/// Evaluate `program` and return the resulting state, leaving `state` as is.
pub fn transition(program: &dyn Program, state: &State, ctx: &CallContext<'_>) -> Result<State, Error> {
    let mutations = program.evaluate(ctx, state)?;
    let mut next = state.clone();
    apply(&mut next, mutations);
    Ok(next)
}

/// Mutations that take `account`'s vote back out of the tally, if it has one.
pub(crate) fn retract_vote(state: &State, account: &Address) -> Result<Vec<Mutation>, Error> {
    let Some(choice) = Participant::load(state, account)?.and_then(|p| p.voted_choice) else {
        return Ok(Vec::new());
    };

    let key = codec::votes_for_key(choice);
    let count = state.get_uint(&[GLOBAL, &key])?;
    let remaining = count
        .checked_sub(1)
        .ok_or_else(|| Error::CorruptState(format!("{}/{} underflow", GLOBAL, key)))?;

    Ok(vec![
        Mutation::Set(codec::global_path(&key), Value::Uint(remaining)),
        Mutation::Delete(codec::local_path(account, codec::VOTED)),
    ])
}
