//! Declared state capacity.
//!
//! An application declares up front how many integer and byte-string keys
//! its global and per-account state may hold. The election checks the
//! declaration against its option count when it is created.

use crate::Error;
use serde::{Deserialize, Serialize};

/// Capacity of one state scope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSchema {
    pub num_uints: u64,
    pub num_byte_slices: u64,
}

impl StateSchema {
    pub const fn new(num_uints: u64, num_byte_slices: u64) -> Self {
        Self {
            num_uints,
            num_byte_slices,
        }
    }

    pub fn covers(&self, need: &StateSchema) -> bool {
        self.num_uints >= need.num_uints && self.num_byte_slices >= need.num_byte_slices
    }
}

/// Global and local schema, fixed at creation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSchemas {
    pub global: StateSchema,
    pub local: StateSchema,
}

impl AppSchemas {
    /// `can_vote` and `voted`.
    pub const LOCAL_REQUIRED: StateSchema = StateSchema::new(1, 1);

    /// The smallest schemas able to hold an election with `num_options` options:
    /// `ElectionEnd`, `NumVoteOptions` and one counter per option as integers,
    /// `VoteOptions` as bytes.
    pub fn required(num_options: u64) -> Self {
        Self {
            global: StateSchema::new(num_options.saturating_add(2), 1),
            local: Self::LOCAL_REQUIRED,
        }
    }

    /// Fail if these schemas cannot hold an election with `num_options` options.
    pub fn ensure_fits(&self, num_options: u64) -> Result<(), Error> {
        let need = Self::required(num_options);
        if !self.global.covers(&need.global) {
            return Err(Error::SchemaExceeded {
                scope: "global",
                uints: need.global.num_uints,
                byte_slices: need.global.num_byte_slices,
            });
        }
        if !self.local.covers(&need.local) {
            return Err(Error::SchemaExceeded {
                scope: "local",
                uints: need.local.num_uints,
                byte_slices: need.local.num_byte_slices,
            });
        }
        Ok(())
    }
}
