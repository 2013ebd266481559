//! Error types for ezballot-core.

use thiserror::Error;

use crate::Address;

/// Core errors.
///
/// Every variant aborts the transaction that produced it; nothing is
/// written to the ledger.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrong number of call arguments.
    #[error("expected {expected} arguments, got {found}")]
    Arity { expected: usize, found: usize },

    /// Caller lacks the identity the action requires.
    #[error("{0} is not authorized for this action")]
    Unauthorized(Address),

    /// Action submitted after the election closed.
    #[error("election closed at round {election_end}, current round is {round}")]
    DeadlinePassed { round: u64, election_end: u64 },

    /// Voter has not been approved by the creator.
    #[error("{0} is not approved to vote")]
    NotApproved(Address),

    /// Voter already has a recorded choice.
    #[error("{0} already voted for option {1}")]
    AlreadyVoted(Address, u64),

    /// Choice is outside `[0, num_options)`.
    #[error("option {choice} out of range, election has {num_options} options")]
    InvalidChoice { choice: u64, num_options: u64 },

    /// Status update target is not pending.
    #[error("{target} is {found}, expected pending")]
    InvalidState { target: Address, found: String },

    /// Malformed argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unrecognized action tag.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// Invalid signature.
    #[error("invalid signature for sender: {0}")]
    InvalidSignature(Address),

    /// No election application with this id.
    #[error("application not found: {0}")]
    ApplicationNotFound(u64),

    /// The election application already exists.
    #[error("application {0} already created")]
    AlreadyCreated(u64),

    /// Declared state schema cannot hold the election.
    #[error("{scope} schema too small: need {uints} uints and {byte_slices} byte slices")]
    SchemaExceeded {
        scope: &'static str,
        uints: u64,
        byte_slices: u64,
    },

    /// Stored state does not decode.
    #[error("corrupt state at {0}")]
    CorruptState(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Short category name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Arity { .. } => "arity",
            Self::Unauthorized(_) => "authorization",
            Self::DeadlinePassed { .. } => "deadline",
            Self::NotApproved(_) => "not_approved",
            Self::AlreadyVoted(..) => "already_voted",
            Self::InvalidChoice { .. } => "invalid_choice",
            Self::InvalidState { .. } => "invalid_state",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::UnknownAction(_) => "unknown_action",
            Self::InvalidSignature(_) => "signature",
            Self::ApplicationNotFound(_) => "not_found",
            Self::AlreadyCreated(_) => "already_created",
            Self::SchemaExceeded { .. } => "schema",
            Self::CorruptState(_) => "corrupt_state",
            Self::Serialization(_) => "serialization",
            Self::Config(_) => "configuration",
        }
    }
}

impl From<ciborium::ser::Error<std::io::Error>> for Error {
    fn from(e: ciborium::ser::Error<std::io::Error>) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<ciborium::de::Error<std::io::Error>> for Error {
    fn from(e: ciborium::de::Error<std::io::Error>) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
