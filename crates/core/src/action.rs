//! Transactions and the actions they carry.
//!
//! A client submits a signed [`Transaction`] wrapping an [`ApplicationCall`]:
//! a completion kind plus opaque byte arguments. The ledger decodes the call
//! once into an [`Action`], and the programs only ever see that closed set.

use crate::codec::{self, decode_uint, encode_uint};
use crate::{Address, AppSchemas, Eligibility, Error, Hash};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use serde::{Deserialize, Serialize};

/// Tag of the vote action.
pub const VOTE_TAG: &[u8] = b"vote";
/// Tag of the eligibility update action.
pub const UPDATE_STATUS_TAG: &[u8] = b"update_user_status";

/// Ledger-defined category of an application call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnCompletion {
    NoOp,
    OptIn,
    CloseOut,
    ClearState,
    UpdateApplication,
    DeleteApplication,
}

/// An application call as it travels on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationCall {
    /// Target application, `0` to create one.
    pub app_id: u64,
    pub on_completion: OnCompletion,
    pub args: Vec<Vec<u8>>,
    /// Declared capacity, only meaningful on creation.
    pub schemas: Option<AppSchemas>,
}

impl ApplicationCall {
    fn new(app_id: u64, on_completion: OnCompletion, args: Vec<Vec<u8>>) -> Self {
        Self {
            app_id,
            on_completion,
            args,
            schemas: None,
        }
    }

    /// Create the election.
    pub fn create<S: AsRef<str>>(election_end: u64, labels: &[S], schemas: AppSchemas) -> Self {
        let args = vec![
            encode_uint(election_end),
            encode_uint(labels.len() as u64),
            codec::encode_labels(labels),
        ];
        Self {
            schemas: Some(schemas),
            ..Self::new(0, OnCompletion::NoOp, args)
        }
    }

    pub fn opt_in(app_id: u64) -> Self {
        Self::new(app_id, OnCompletion::OptIn, Vec::new())
    }

    pub fn close_out(app_id: u64) -> Self {
        Self::new(app_id, OnCompletion::CloseOut, Vec::new())
    }

    pub fn clear_state(app_id: u64) -> Self {
        Self::new(app_id, OnCompletion::ClearState, Vec::new())
    }

    pub fn update_application(app_id: u64) -> Self {
        Self::new(app_id, OnCompletion::UpdateApplication, Vec::new())
    }

    pub fn delete_application(app_id: u64) -> Self {
        Self::new(app_id, OnCompletion::DeleteApplication, Vec::new())
    }

    pub fn no_op(app_id: u64, args: Vec<Vec<u8>>) -> Self {
        Self::new(app_id, OnCompletion::NoOp, args)
    }

    pub fn vote(app_id: u64, choice: u64) -> Self {
        Self::no_op(app_id, vec![VOTE_TAG.to_vec(), encode_uint(choice)])
    }

    pub fn update_user_status(app_id: u64, target: &Address, eligibility: Eligibility) -> Self {
        Self::no_op(
            app_id,
            vec![
                UPDATE_STATUS_TAG.to_vec(),
                target.as_bytes().to_vec(),
                eligibility.encode().to_vec(),
            ],
        )
    }

    pub fn is_create(&self) -> bool {
        self.app_id == 0
    }
}

/// Creation parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateElection {
    pub election_end: u64,
    pub num_options: u64,
    pub labels: Vec<String>,
}

/// Arguments of an eligibility update, kept raw until the caller has been
/// authorized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusUpdate {
    args: Vec<Vec<u8>>,
}

impl StatusUpdate {
    fn ensure_arity(&self) -> Result<(), Error> {
        if self.args.len() != 2 {
            return Err(Error::Arity {
                expected: 3,
                found: self.args.len() + 1,
            });
        }
        Ok(())
    }

    /// The account whose eligibility changes.
    pub fn target(&self) -> Result<Address, Error> {
        self.ensure_arity()?;
        Address::from_slice(&self.args[0])
    }

    /// The new eligibility. Only a decision is accepted; moving an account
    /// back to pending is not an update.
    pub fn eligibility(&self) -> Result<Eligibility, Error> {
        self.ensure_arity()?;
        match Eligibility::decode(&self.args[1])? {
            Eligibility::Pending => Err(Error::InvalidArgument(
                "status update must approve or deny".to_string(),
            )),
            decided => Ok(decided),
        }
    }
}

/// The closed set of election actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Create(CreateElection),
    Delete,
    Update,
    CloseOut,
    Join,
    Vote { choice: u64 },
    UpdateStatus(StatusUpdate),
    /// The account is leaving through clear-state; handled by the exit program.
    Exit,
}

impl Action {
    /// Decode a call. The completion kind decides first; the tag in argument 0
    /// is only consulted for `NoOp` calls.
    pub fn parse(call: &ApplicationCall) -> Result<Self, Error> {
        if call.is_create() {
            return Self::parse_create(&call.args);
        }

        match call.on_completion {
            OnCompletion::DeleteApplication => Ok(Action::Delete),
            OnCompletion::UpdateApplication => Ok(Action::Update),
            OnCompletion::CloseOut => Ok(Action::CloseOut),
            OnCompletion::OptIn => Ok(Action::Join),
            OnCompletion::ClearState => Ok(Action::Exit),
            OnCompletion::NoOp => Self::parse_tagged(&call.args),
        }
    }

    fn parse_create(args: &[Vec<u8>]) -> Result<Self, Error> {
        let [end, num, labels] = args else {
            return Err(Error::Arity {
                expected: 3,
                found: args.len(),
            });
        };

        Ok(Action::Create(CreateElection {
            election_end: decode_uint(end)?,
            num_options: decode_uint(num)?,
            labels: codec::decode_labels(labels)?,
        }))
    }

    fn parse_tagged(args: &[Vec<u8>]) -> Result<Self, Error> {
        let Some((tag, rest)) = args.split_first() else {
            return Err(Error::Arity {
                expected: 1,
                found: 0,
            });
        };

        match tag.as_slice() {
            VOTE_TAG => {
                let [choice] = rest else {
                    return Err(Error::Arity {
                        expected: 2,
                        found: args.len(),
                    });
                };
                Ok(Action::Vote {
                    choice: decode_uint(choice)?,
                })
            }
            UPDATE_STATUS_TAG => Ok(Action::UpdateStatus(StatusUpdate {
                args: rest.to_vec(),
            })),
            other => Err(Error::UnknownAction(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Create(_) => "create",
            Action::Delete => "delete",
            Action::Update => "update",
            Action::CloseOut => "close_out",
            Action::Join => "join",
            Action::Vote { .. } => "vote",
            Action::UpdateStatus(_) => "update_user_status",
            Action::Exit => "exit",
        }
    }
}

/// A signed application call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    /// Content hash (computed, not part of the signed content).
    #[serde(skip)]
    pub id: Hash,

    pub sender: Address,

    pub call: ApplicationCall,

    /// Ed25519 signature over the sender and call.
    pub signature: Vec<u8>,
}

impl Transaction {
    /// Build a transaction from `signing_key`'s account and sign it.
    pub fn new(call: ApplicationCall, signing_key: &SigningKey) -> Result<Self, Error> {
        let mut tx = Self {
            id: Hash::ZERO,
            sender: Address::from(&signing_key.verifying_key()),
            call,
            signature: Vec::new(),
        };

        let content = tx.signable_content()?;
        tx.signature = signing_key.sign(&content).to_bytes().to_vec();
        tx.id = Hash::of(&content);

        Ok(tx)
    }

    /// Get the content to be signed (excludes id and signature).
    fn signable_content(&self) -> Result<Vec<u8>, Error> {
        let signable = SignableTransaction {
            sender: &self.sender,
            call: &self.call,
        };

        let mut buf = Vec::new();
        ciborium::into_writer(&signable, &mut buf)?;
        Ok(buf)
    }

    /// Compute the content hash of this transaction.
    pub fn compute_id(&self) -> Result<Hash, Error> {
        Ok(Hash::of(&self.signable_content()?))
    }

    /// Verify the signature against the sender's own key.
    pub fn verify_signature(&self) -> bool {
        let Some(public_key) = self.sender.verifying_key() else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(self.signature.as_slice()) else {
            return false;
        };
        let signature = Signature::from_bytes(&sig_bytes);

        match self.signable_content() {
            Ok(content) => public_key.verify(&content, &signature).is_ok(),
            Err(_) => false,
        }
    }

    /// Recompute and set the id field.
    pub fn refresh_id(&mut self) -> Result<(), Error> {
        self.id = self.compute_id()?;
        Ok(())
    }
}

/// Helper struct for signing (excludes mutable fields).
#[derive(Serialize)]
struct SignableTransaction<'a> {
    sender: &'a Address,
    call: &'a ApplicationCall,
}
