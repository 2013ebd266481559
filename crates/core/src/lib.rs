//! ezballot-core: election state machine for a consensus-ordered ledger.
//!
//! The crate has three layers:
//! - `State`: the ledger's typed key-value tree
//! - `Program`: pure transition functions producing mutations
//!   (`ApprovalProgram` for the election lifecycle, `ClearStateProgram`
//!   for accounts leaving)
//! - `Ledger`: authenticates transactions, routes them and commits the
//!   mutations atomically

mod address;
mod action;
mod approval;
mod clear_state;
pub mod codec;
pub mod config;
mod election;
mod error;
mod hash;
mod ledger;
pub mod program;
mod schema;
mod state;

pub use address::Address;
pub use action::{Action, ApplicationCall, CreateElection, OnCompletion, StatusUpdate, Transaction};
pub use approval::ApprovalProgram;
pub use clear_state::ClearStateProgram;
pub use config::ElectionConfig;
pub use election::{Election, ElectionSnapshot, Eligibility, OptionTally, Participant};
pub use error::Error;
pub use hash::Hash;
pub use ledger::{Application, Ledger, Receipt};
pub use program::{CallContext, Mutation, Program};
pub use schema::{AppSchemas, StateSchema};
pub use state::{Node, Path, State, Value};

/// Re-export for convenience
pub use ed25519_dalek::{SigningKey, VerifyingKey};
