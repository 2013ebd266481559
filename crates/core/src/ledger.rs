//! The ledger host: authenticates transactions, routes them to the election
//! programs and applies the resulting mutations.
//!
//! Transactions arrive already ordered by consensus. Each one is evaluated
//! in full against the current state and either committed or dropped, so
//! the ledger never holds a half-applied action.

use crate::codec::LOCAL;
use crate::program::{CallContext, Program, apply};
use crate::{
    Action, Address, AppSchemas, ApprovalProgram, ClearStateProgram, Election, ElectionSnapshot,
    Error, Hash, OnCompletion, Participant, State, Transaction,
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// The deployed election application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Application {
    pub id: u64,
    pub creator: Address,
    pub schemas: AppSchemas,
    /// Bumped on every accepted program update.
    pub version: u64,
}

/// Outcome of an accepted transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub tx_id: Hash,
    pub app_id: u64,
    pub round: u64,
    pub action: &'static str,
    /// State hash after the transaction.
    pub state_hash: Hash,
}

/// Single-application ledger.
pub struct Ledger {
    /// Current state.
    state: State,

    /// Current round, the election's clock.
    round: u64,

    application: Option<Application>,

    next_app_id: u64,

    approval: Box<dyn Program>,

    clear_state: Box<dyn Program>,

    /// Accepted transactions, in order of application.
    history: Vec<Transaction>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// A ledger running the election programs.
    pub fn new() -> Self {
        Self::with_programs(Box::new(ApprovalProgram), Box::new(ClearStateProgram))
    }

    /// A ledger running custom programs.
    pub fn with_programs(approval: Box<dyn Program>, clear_state: Box<dyn Program>) -> Self {
        Self {
            state: State::new(),
            round: 0,
            application: None,
            next_app_id: 1,
            approval,
            clear_state,
            history: Vec::new(),
        }
    }

    /// Get the current state.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Get the current state hash.
    pub fn state_hash(&self) -> Result<Hash, Error> {
        self.state.hash()
    }

    /// Get the transaction history.
    pub fn history(&self) -> &[Transaction] {
        &self.history
    }

    pub fn application(&self) -> Option<&Application> {
        self.application.as_ref()
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    /// Move the clock to `round`. Rounds never go backwards.
    pub fn set_round(&mut self, round: u64) -> Result<(), Error> {
        if round < self.round {
            return Err(Error::InvalidArgument(format!(
                "round {} is before current round {}",
                round, self.round
            )));
        }
        self.round = round;
        Ok(())
    }

    /// Advance the clock by `rounds`.
    pub fn advance(&mut self, rounds: u64) {
        self.round = self.round.saturating_add(rounds);
    }

    /// Election parameters and tally, if an election exists.
    pub fn election(&self) -> Result<Option<ElectionSnapshot>, Error> {
        let Some(app) = &self.application else {
            return Ok(None);
        };
        let election = Election::load(&self.state)?;
        Ok(Some(ElectionSnapshot::new(app.id, app.creator, &election)))
    }

    /// One account's record, if it has joined.
    pub fn participant(&self, account: &Address) -> Result<Option<Participant>, Error> {
        Participant::load(&self.state, account)
    }

    /// Every account that currently holds a record.
    pub fn participants(&self) -> Result<BTreeMap<Address, Participant>, Error> {
        let mut out = BTreeMap::new();
        for hex in self.state.children(&[LOCAL]) {
            let account = Address::from_hex(&hex)
                .ok_or_else(|| Error::CorruptState(format!("{}/{}", LOCAL, hex)))?;
            if let Some(record) = Participant::load(&self.state, &account)? {
                out.insert(account, record);
            }
        }
        Ok(out)
    }

    /// Submit a transaction at the current round.
    pub fn submit(&mut self, mut tx: Transaction) -> Result<Receipt, Error> {
        tx.refresh_id()?;

        if !tx.verify_signature() {
            warn!("Rejected transaction {}: bad signature from {}", tx.id, tx.sender);
            return Err(Error::InvalidSignature(tx.sender));
        }

        match self.execute(&tx) {
            Ok(receipt) => {
                debug!(
                    "Accepted {} from {} at round {}",
                    receipt.action, tx.sender, receipt.round
                );
                self.history.push(tx);
                Ok(receipt)
            }
            Err(e) => {
                warn!(
                    "Rejected transaction {} from {} at round {} ({}): {}",
                    tx.id,
                    tx.sender,
                    self.round,
                    e.kind(),
                    e
                );
                Err(e)
            }
        }
    }

    fn execute(&mut self, tx: &Transaction) -> Result<Receipt, Error> {
        let action = Action::parse(&tx.call)?;

        let current = self.application;
        let mut app = match current {
            None if tx.call.is_create() => return self.create(tx, &action),
            None => return Err(Error::ApplicationNotFound(tx.call.app_id)),
            Some(app) if tx.call.is_create() => return Err(Error::AlreadyCreated(app.id)),
            Some(app) if app.id != tx.call.app_id => {
                return Err(Error::ApplicationNotFound(tx.call.app_id));
            }
            Some(app) => app,
        };

        let ctx = CallContext {
            sender: tx.sender,
            creator: app.creator,
            round: self.round,
            action: &action,
        };

        // Work on a copy; nothing below touches `self` until the commit.
        let mut next = self.state.clone();
        let mut deleted = false;

        match &action {
            Action::Exit => {
                match self.clear_state.evaluate(&ctx, &next) {
                    Ok(mutations) => apply(&mut next, mutations),
                    Err(e) => warn!(
                        "Exit program failed for {} ({}), detaching anyway: {}",
                        ctx.sender,
                        e.kind(),
                        e
                    ),
                }
                remove_participant(&mut next, &ctx.sender);
            }
            _ => {
                let mutations = self.approval.evaluate(&ctx, &next)?;
                apply(&mut next, mutations);

                match &action {
                    Action::CloseOut => remove_participant(&mut next, &ctx.sender),
                    Action::Delete => {
                        next = State::new();
                        deleted = true;
                    }
                    Action::Update => app.version += 1,
                    _ => {}
                }
            }
        }

        let receipt = self.receipt(tx, app.id, &action, &next)?;

        self.state = next;
        if deleted {
            self.application = None;
            info!("Deleted election application {}", app.id);
        } else {
            if let Action::Update = action {
                info!("Updated election application {} to version {}", app.id, app.version);
            }
            self.application = Some(app);
        }

        Ok(receipt)
    }

    fn create(&mut self, tx: &Transaction, action: &Action) -> Result<Receipt, Error> {
        if tx.call.on_completion != OnCompletion::NoOp {
            return Err(Error::InvalidArgument(
                "application must be created with a NoOp call".to_string(),
            ));
        }
        let schemas = tx.call.schemas.ok_or_else(|| {
            Error::InvalidArgument("creation requires state schemas".to_string())
        })?;
        if let Action::Create(params) = action {
            schemas.ensure_fits(params.num_options)?;
        }

        let ctx = CallContext {
            sender: tx.sender,
            creator: tx.sender,
            round: self.round,
            action,
        };
        let mut next = self.state.clone();
        let mutations = self.approval.evaluate(&ctx, &next)?;
        apply(&mut next, mutations);

        let app = Application {
            id: self.next_app_id,
            creator: tx.sender,
            schemas,
            version: 1,
        };
        let receipt = self.receipt(tx, app.id, action, &next)?;

        self.state = next;
        self.next_app_id += 1;
        self.application = Some(app);

        info!("Created election application {} by {}", app.id, app.creator);

        Ok(receipt)
    }

    fn receipt(
        &self,
        tx: &Transaction,
        app_id: u64,
        action: &Action,
        next: &State,
    ) -> Result<Receipt, Error> {
        Ok(Receipt {
            tx_id: tx.id,
            app_id,
            round: self.round,
            action: action.name(),
            state_hash: next.hash()?,
        })
    }
}

/// Drop an account's whole record.
fn remove_participant(state: &mut State, account: &Address) {
    state.delete(&[LOCAL, &account.to_hex()]);
}
