//! The election lifecycle program.
//!
//! Handles creation, joining, eligibility decisions, voting and withdrawal.
//! Every precondition is checked before any mutation is produced.

use crate::action::{CreateElection, StatusUpdate};
use crate::codec::{self, CAN_VOTE, ELECTION_END, NUM_VOTE_OPTIONS, VOTED, VOTE_OPTIONS};
use crate::program::{CallContext, Mutation, Program, retract_vote};
use crate::{Action, Election, Eligibility, Error, Participant, State, Value};

/// Lifecycle program for a single election.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApprovalProgram;

impl Program for ApprovalProgram {
    fn evaluate(&self, ctx: &CallContext<'_>, state: &State) -> Result<Vec<Mutation>, Error> {
        match ctx.action {
            Action::Create(params) => create(params),
            Action::Delete | Action::Update => {
                ctx.ensure_creator()?;
                Ok(Vec::new())
            }
            Action::CloseOut => {
                Election::load(state)?.ensure_open(ctx.round)?;
                retract_vote(state, &ctx.sender)
            }
            Action::Join => {
                Election::load(state)?.ensure_open(ctx.round)?;
                Ok(vec![Mutation::Set(
                    codec::local_path(&ctx.sender, CAN_VOTE),
                    Value::Bytes(Eligibility::Pending.encode().to_vec()),
                )])
            }
            Action::Vote { choice } => vote(ctx, state, *choice),
            Action::UpdateStatus(update) => update_status(ctx, state, update),
            Action::Exit => Err(Error::InvalidArgument(
                "clear-state calls are handled by the exit program".to_string(),
            )),
        }
    }
}

fn create(params: &CreateElection) -> Result<Vec<Mutation>, Error> {
    if params.num_options == 0 {
        return Err(Error::InvalidArgument(
            "election needs at least one option".to_string(),
        ));
    }
    if params.labels.len() as u64 != params.num_options {
        return Err(Error::InvalidArgument(format!(
            "{} options declared but {} labels given",
            params.num_options,
            params.labels.len()
        )));
    }

    let mut mutations = vec![
        Mutation::Set(codec::global_path(ELECTION_END), Value::Uint(params.election_end)),
        Mutation::Set(codec::global_path(NUM_VOTE_OPTIONS), Value::Uint(params.num_options)),
        Mutation::Set(
            codec::global_path(VOTE_OPTIONS),
            Value::Bytes(codec::encode_labels(&params.labels)),
        ),
    ];

    for i in 0..params.num_options {
        mutations.push(Mutation::Set(
            codec::global_path(&codec::votes_for_key(i)),
            Value::Uint(0),
        ));
    }

    Ok(mutations)
}

fn vote(ctx: &CallContext<'_>, state: &State, choice: u64) -> Result<Vec<Mutation>, Error> {
    let election = Election::load(state)?;
    election.ensure_open(ctx.round)?;

    let voter = match Participant::load(state, &ctx.sender)? {
        Some(p) if p.eligibility == Eligibility::Approved => p,
        _ => return Err(Error::NotApproved(ctx.sender)),
    };

    if let Some(previous) = voter.voted_choice {
        return Err(Error::AlreadyVoted(ctx.sender, previous));
    }

    let Some(count) = election.votes_for(choice) else {
        return Err(Error::InvalidChoice {
            choice,
            num_options: election.num_options(),
        });
    };

    let key = codec::votes_for_key(choice);
    let count = count
        .checked_add(1)
        .ok_or_else(|| Error::CorruptState(format!("{} overflow", key)))?;

    Ok(vec![
        Mutation::Set(codec::local_path(&ctx.sender, VOTED), Value::Uint(choice)),
        Mutation::Set(codec::global_path(&key), Value::Uint(count)),
    ])
}

fn update_status(
    ctx: &CallContext<'_>,
    state: &State,
    update: &StatusUpdate,
) -> Result<Vec<Mutation>, Error> {
    ctx.ensure_creator()?;
    Election::load(state)?.ensure_open(ctx.round)?;

    let target = update.target()?;
    let eligibility = update.eligibility()?;

    match Participant::load(state, &target)? {
        Some(p) if p.eligibility == Eligibility::Pending => {}
        Some(p) => {
            return Err(Error::InvalidState {
                target,
                found: p.eligibility.to_string(),
            });
        }
        None => {
            return Err(Error::InvalidState {
                target,
                found: "not a participant".to_string(),
            });
        }
    }

    Ok(vec![Mutation::Set(
        codec::local_path(&target, CAN_VOTE),
        Value::Bytes(eligibility.encode().to_vec()),
    )])
}
