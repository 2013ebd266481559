//! Typed views over the election's stored keys.

use crate::codec::{self, CAN_VOTE, ELECTION_END, GLOBAL, LOCAL, NUM_VOTE_OPTIONS, VOTED, VOTE_OPTIONS};
use crate::{Address, Error, State};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a participant may vote.
///
/// "No record" is modelled as `Option::None` around a [`Participant`], not
/// as a variant here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Eligibility {
    Pending,
    Approved,
    Denied,
}

impl Eligibility {
    /// Stored and wire form.
    pub fn encode(self) -> &'static [u8] {
        match self {
            Eligibility::Pending => b"maybe",
            Eligibility::Approved => b"yes",
            Eligibility::Denied => b"no",
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        match bytes {
            b"maybe" => Ok(Eligibility::Pending),
            b"yes" => Ok(Eligibility::Approved),
            b"no" => Ok(Eligibility::Denied),
            other => Err(Error::InvalidArgument(format!(
                "unknown eligibility {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }
}

impl fmt::Display for Eligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Eligibility::Pending => "pending",
            Eligibility::Approved => "approved",
            Eligibility::Denied => "denied",
        };
        f.write_str(name)
    }
}

/// Election-wide parameters and tally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Election {
    pub election_end: u64,
    pub labels: Vec<String>,
    pub tally: Vec<u64>,
}

impl Election {
    /// Decode the election from its global keys.
    pub fn load(state: &State) -> Result<Self, Error> {
        let election_end = state.get_uint(&[GLOBAL, ELECTION_END])?;
        let num_options = state.get_uint(&[GLOBAL, NUM_VOTE_OPTIONS])?;
        let labels = codec::decode_labels(state.get_bytes(&[GLOBAL, VOTE_OPTIONS])?)
            .map_err(|_| Error::CorruptState(format!("{}/{}", GLOBAL, VOTE_OPTIONS)))?;

        let tally = (0..num_options)
            .map(|i| state.get_uint(&[GLOBAL, &codec::votes_for_key(i)]))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            election_end,
            labels,
            tally,
        })
    }

    pub fn num_options(&self) -> u64 {
        self.tally.len() as u64
    }

    /// Whether `round` is still inside the voting window.
    pub fn is_open(&self, round: u64) -> bool {
        round <= self.election_end
    }

    /// Fail with a deadline error once the window has closed.
    pub fn ensure_open(&self, round: u64) -> Result<(), Error> {
        if self.is_open(round) {
            Ok(())
        } else {
            Err(Error::DeadlinePassed {
                round,
                election_end: self.election_end,
            })
        }
    }

    /// Votes currently counted for one option.
    pub fn votes_for(&self, choice: u64) -> Option<u64> {
        self.tally.get(usize::try_from(choice).ok()?).copied()
    }

    pub fn total_votes(&self) -> u64 {
        self.tally.iter().sum()
    }
}

/// One account's participation record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub eligibility: Eligibility,
    pub voted_choice: Option<u64>,
}

impl Participant {
    /// Decode an account's record. `None` when the account never joined.
    pub fn load(state: &State, account: &Address) -> Result<Option<Self>, Error> {
        let hex = account.to_hex();
        if state.children(&[LOCAL, &hex]).is_empty() {
            return Ok(None);
        }

        let eligibility = Eligibility::decode(state.get_bytes(&[LOCAL, &hex, CAN_VOTE])?)
            .map_err(|_| Error::CorruptState(format!("{}/{}/{}", LOCAL, hex, CAN_VOTE)))?;

        let voted_choice = match state.get(&[LOCAL, &hex, VOTED]) {
            Some(_) => Some(state.get_uint(&[LOCAL, &hex, VOTED])?),
            None => None,
        };

        Ok(Some(Self {
            eligibility,
            voted_choice,
        }))
    }

    pub fn has_voted(&self) -> bool {
        self.voted_choice.is_some()
    }
}

/// One option's label and current count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionTally {
    pub label: String,
    pub votes: u64,
}

/// Read-only view of the election, as returned to clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSnapshot {
    pub app_id: u64,
    pub creator: Address,
    pub election_end: u64,
    pub options: Vec<OptionTally>,
}

impl ElectionSnapshot {
    pub fn new(app_id: u64, creator: Address, election: &Election) -> Self {
        let options = election
            .labels
            .iter()
            .zip(&election.tally)
            .map(|(label, votes)| OptionTally {
                label: label.clone(),
                votes: *votes,
            })
            .collect();

        Self {
            app_id,
            creator,
            election_end: election.election_end,
            options,
        }
    }

    pub fn tally(&self) -> Vec<u64> {
        self.options.iter().map(|o| o.votes).collect()
    }

    /// JSON rendering for clients.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
