//! The exit program, run when an account clears its election state.
//!
//! The ledger removes the account's record whatever this program returns.
//! The account's vote always leaves the tally, deadline or not.

use crate::program::{CallContext, Mutation, Program, retract_vote};
use crate::{Error, State};

/// Exit program for a single election.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClearStateProgram;

impl Program for ClearStateProgram {
    fn evaluate(&self, ctx: &CallContext<'_>, state: &State) -> Result<Vec<Mutation>, Error> {
        retract_vote(state, &ctx.sender)
    }
}
