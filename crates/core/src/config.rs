//! Election deployment parameters.

use crate::codec::LABEL_DELIMITER;
use crate::{AppSchemas, ApplicationCall, Error, StateSchema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Parameters for creating an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectionConfig {
    /// Rounds between creation and the close of voting.
    pub relative_election_end: u64,
    /// Option labels, in index order.
    pub vote_options: Vec<String>,
    pub global_schema: StateSchema,
    pub local_schema: StateSchema,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        let vote_options: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        let schemas = AppSchemas::required(vote_options.len() as u64);
        Self {
            relative_election_end: 1000,
            vote_options,
            global_schema: schemas.global,
            local_schema: schemas.local,
        }
    }
}

impl ElectionConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load from `EZBALLOT_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to resolve variable names.
    ///
    /// - `EZBALLOT_RELATIVE_END`: rounds until voting closes
    /// - `EZBALLOT_OPTIONS`: comma-separated option labels
    ///
    /// Schemas are sized to the option list.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("EZBALLOT_RELATIVE_END") {
            config.relative_election_end = raw.trim().parse().map_err(|_| {
                Error::Config(format!("EZBALLOT_RELATIVE_END is not a round count: {}", raw))
            })?;
        }

        if let Some(raw) = lookup("EZBALLOT_OPTIONS") {
            config.vote_options = raw
                .split(LABEL_DELIMITER)
                .map(|s| s.trim().to_string())
                .collect();
            let schemas = AppSchemas::required(config.vote_options.len() as u64);
            config.global_schema = schemas.global;
            config.local_schema = schemas.local;
        }

        Ok(config)
    }

    pub fn schemas(&self) -> AppSchemas {
        AppSchemas {
            global: self.global_schema,
            local: self.local_schema,
        }
    }

    /// Check the options and schemas describe an election that can be created.
    pub fn validate(&self) -> Result<(), Error> {
        if self.vote_options.is_empty() {
            return Err(Error::Config("at least one vote option is required".to_string()));
        }

        let mut seen = BTreeSet::new();
        for label in &self.vote_options {
            if label.is_empty() {
                return Err(Error::Config("vote option labels must not be empty".to_string()));
            }
            if label.contains(LABEL_DELIMITER) {
                return Err(Error::Config(format!(
                    "vote option {:?} contains the delimiter {:?}",
                    label, LABEL_DELIMITER
                )));
            }
            if !seen.insert(label.as_str()) {
                return Err(Error::Config(format!("duplicate vote option {:?}", label)));
            }
        }

        self.schemas()
            .ensure_fits(self.vote_options.len() as u64)
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// The creation call for an election deployed at `current_round`.
    pub fn creation_call(&self, current_round: u64) -> Result<ApplicationCall, Error> {
        self.validate()?;
        let election_end = current_round
            .checked_add(self.relative_election_end)
            .ok_or_else(|| Error::Config("election end overflows the round counter".to_string()))?;
        Ok(ApplicationCall::create(
            election_end,
            &self.vote_options,
            self.schemas(),
        ))
    }
}
