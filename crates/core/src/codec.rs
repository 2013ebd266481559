//! Argument and state-key encoding.
//!
//! Call arguments are opaque byte strings. Integers travel as big-endian
//! bytes of at most eight bytes, option labels as one comma-delimited
//! string.

use crate::{Address, Error};

/// Separator between option labels.
pub const LABEL_DELIMITER: char = ',';

/// Root segment for election-wide keys.
pub const GLOBAL: &str = "global";
/// Root segment for per-participant keys.
pub const LOCAL: &str = "local";

pub const ELECTION_END: &str = "ElectionEnd";
pub const NUM_VOTE_OPTIONS: &str = "NumVoteOptions";
pub const VOTE_OPTIONS: &str = "VoteOptions";
pub const VOTES_FOR_PREFIX: &str = "VotesFor";

pub const CAN_VOTE: &str = "can_vote";
pub const VOTED: &str = "voted";

/// Encode an integer argument.
pub fn encode_uint(n: u64) -> Vec<u8> {
    n.to_be_bytes().to_vec()
}

/// Decode an integer argument. Shorter inputs are zero-extended; an empty
/// argument is zero.
pub fn decode_uint(bytes: &[u8]) -> Result<u64, Error> {
    if bytes.len() > 8 {
        return Err(Error::InvalidArgument(format!(
            "integer argument is {} bytes, limit is 8",
            bytes.len()
        )));
    }
    Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// Join option labels into the stored form.
pub fn encode_labels<S: AsRef<str>>(labels: &[S]) -> Vec<u8> {
    labels
        .iter()
        .map(|l| l.as_ref())
        .collect::<Vec<_>>()
        .join(&LABEL_DELIMITER.to_string())
        .into_bytes()
}

/// Split the stored label string into option names, by position.
pub fn decode_labels(bytes: &[u8]) -> Result<Vec<String>, Error> {
    let joined = std::str::from_utf8(bytes)
        .map_err(|e| Error::InvalidArgument(format!("option labels are not utf-8: {}", e)))?;
    Ok(joined.split(LABEL_DELIMITER).map(str::to_string).collect())
}

/// Key of the tally counter for one option, e.g. `VotesFor2`.
pub fn votes_for_key(choice: u64) -> String {
    format!("{}{}", VOTES_FOR_PREFIX, choice)
}

/// Full path of an election-wide key.
pub fn global_path(key: &str) -> Vec<String> {
    vec![GLOBAL.to_string(), key.to_string()]
}

/// Full path of a participant key.
pub fn local_path(account: &Address, key: &str) -> Vec<String> {
    vec![LOCAL.to_string(), account.to_hex(), key.to_string()]
}
