//! Conformance tests for the election programs, driven through the ledger.

use ed25519_dalek::SigningKey;
use ezballot_core::{
    Address, AppSchemas, ApplicationCall, ElectionConfig, Eligibility, Error, Ledger, OnCompletion,
    Receipt, Transaction, codec,
};
use proptest::prelude::*;
use rand::rngs::OsRng;

// =============================================================================
// Test Utilities
// =============================================================================

/// A ledger with one election on it.
struct Harness {
    ledger: Ledger,
    creator: SigningKey,
    app_id: u64,
}

impl Harness {
    /// Create an election closing at `election_end` with the given labels.
    fn new(election_end: u64, labels: &[&str]) -> Self {
        Self::with_creator(SigningKey::generate(&mut OsRng), election_end, labels)
    }

    fn with_creator(creator: SigningKey, election_end: u64, labels: &[&str]) -> Self {
        let mut ledger = Ledger::new();
        let call = ApplicationCall::create(
            election_end,
            labels,
            AppSchemas::required(labels.len() as u64),
        );
        let tx = Transaction::new(call, &creator).unwrap();
        let app_id = ledger.submit(tx).unwrap().app_id;
        Self {
            ledger,
            creator,
            app_id,
        }
    }

    fn submit(&mut self, key: &SigningKey, call: ApplicationCall) -> Result<Receipt, Error> {
        self.ledger.submit(Transaction::new(call, key)?)
    }

    fn at(&mut self, round: u64) -> &mut Self {
        self.ledger.set_round(round).unwrap();
        self
    }

    fn join(&mut self, key: &SigningKey) -> Result<Receipt, Error> {
        let call = ApplicationCall::opt_in(self.app_id);
        self.submit(key, call)
    }

    fn set_status(&mut self, target: &Address, eligibility: Eligibility) -> Result<Receipt, Error> {
        let creator = self.creator.clone();
        let call = ApplicationCall::update_user_status(self.app_id, target, eligibility);
        self.submit(&creator, call)
    }

    fn vote(&mut self, key: &SigningKey, choice: u64) -> Result<Receipt, Error> {
        let call = ApplicationCall::vote(self.app_id, choice);
        self.submit(key, call)
    }

    fn close_out(&mut self, key: &SigningKey) -> Result<Receipt, Error> {
        let call = ApplicationCall::close_out(self.app_id);
        self.submit(key, call)
    }

    fn clear(&mut self, key: &SigningKey) -> Result<Receipt, Error> {
        let call = ApplicationCall::clear_state(self.app_id);
        self.submit(key, call)
    }

    fn tally(&self) -> Vec<u64> {
        self.ledger.election().unwrap().unwrap().tally()
    }

    fn voted_choice(&self, account: &Address) -> Option<u64> {
        self.ledger
            .participant(account)
            .unwrap()
            .and_then(|p| p.voted_choice)
    }

    fn eligibility(&self, account: &Address) -> Option<Eligibility> {
        self.ledger.participant(account).unwrap().map(|p| p.eligibility)
    }

    fn voter_count(&self) -> u64 {
        self.ledger
            .participants()
            .unwrap()
            .values()
            .filter(|p| p.has_voted())
            .count() as u64
    }

    /// Join and get approved by the creator at the current round.
    fn approved_account(&mut self) -> (SigningKey, Address) {
        let (key, addr) = account();
        self.join(&key).unwrap();
        self.set_status(&addr, Eligibility::Approved).unwrap();
        (key, addr)
    }
}

fn account() -> (SigningKey, Address) {
    let key = SigningKey::generate(&mut OsRng);
    let addr = Address::from(&key.verifying_key());
    (key, addr)
}

// =============================================================================
// Scenarios
// =============================================================================

/// Create, join, approve, vote.
#[test]
fn scenario_full_lifecycle() {
    let mut h = Harness::new(1000, &["A", "B"]);
    assert_eq!(h.tally(), vec![0, 0]);

    let (p1, p1_addr) = account();

    h.at(10).join(&p1).unwrap();
    assert_eq!(h.eligibility(&p1_addr), Some(Eligibility::Pending));

    h.at(20).set_status(&p1_addr, Eligibility::Approved).unwrap();
    assert_eq!(h.eligibility(&p1_addr), Some(Eligibility::Approved));

    h.at(30).vote(&p1, 1).unwrap();
    assert_eq!(h.tally(), vec![0, 1]);
    assert_eq!(h.voted_choice(&p1_addr), Some(1));
}

/// Close-out before the deadline withdraws the vote.
#[test]
fn scenario_close_out_withdraws_vote() {
    let mut h = Harness::new(1000, &["A", "B"]);
    let (p1, p1_addr) = h.at(10).approved_account();
    h.at(30).vote(&p1, 1).unwrap();

    h.at(40).close_out(&p1).unwrap();
    assert_eq!(h.tally(), vec![0, 0]);
    assert_eq!(h.voted_choice(&p1_addr), None);
}

/// Out-of-range choice is rejected and the tally is untouched.
#[test]
fn scenario_invalid_choice() {
    let mut h = Harness::new(1000, &["A", "B"]);
    let (p1, p1_addr) = h.at(10).approved_account();

    let result = h.at(30).vote(&p1, 5);
    assert!(matches!(
        result,
        Err(Error::InvalidChoice { choice: 5, num_options: 2 })
    ));
    assert_eq!(h.tally(), vec![0, 0]);
    assert_eq!(h.voted_choice(&p1_addr), None);
}

/// A vote one round after the deadline is rejected.
#[test]
fn scenario_late_vote() {
    let mut h = Harness::new(1000, &["A", "B"]);
    let (p1, _) = h.at(10).approved_account();

    let result = h.at(1001).vote(&p1, 0);
    assert!(matches!(
        result,
        Err(Error::DeadlinePassed { round: 1001, election_end: 1000 })
    ));
    assert_eq!(h.tally(), vec![0, 0]);
}

/// Voting on the last open round is still accepted.
#[test]
fn vote_on_deadline_round() {
    let mut h = Harness::new(1000, &["A", "B"]);
    let (p1, _) = h.at(10).approved_account();

    h.at(1000).vote(&p1, 0).unwrap();
    assert_eq!(h.tally(), vec![1, 0]);
}

// =============================================================================
// Tally Properties
// =============================================================================

/// Property: a second close-out in a row is a no-op.
#[test]
fn close_out_twice_is_safe() {
    let mut h = Harness::new(100, &["A", "B"]);
    let (p1, _) = h.at(1).approved_account();
    let (p2, _) = h.approved_account();
    h.vote(&p1, 0).unwrap();
    h.vote(&p2, 0).unwrap();

    h.close_out(&p1).unwrap();
    assert_eq!(h.tally(), vec![1, 0]);

    h.close_out(&p1).unwrap();
    assert_eq!(h.tally(), vec![1, 0]);
    assert_eq!(h.voter_count(), 1);
}

/// Property: a participant who voted can never vote again.
#[test]
fn no_double_voting() {
    let mut h = Harness::new(100, &["A", "B", "C"]);
    let (p1, p1_addr) = h.at(1).approved_account();
    h.vote(&p1, 2).unwrap();

    for choice in 0..3 {
        assert!(matches!(
            h.vote(&p1, choice),
            Err(Error::AlreadyVoted(addr, 2)) if addr == p1_addr
        ));
    }
    assert_eq!(h.tally(), vec![0, 0, 1]);
}

/// Property: re-joining resets eligibility but keeps the counted vote.
#[test]
fn rejoin_keeps_vote() {
    let mut h = Harness::new(100, &["A", "B"]);
    let (p1, p1_addr) = h.at(1).approved_account();
    h.vote(&p1, 1).unwrap();

    h.join(&p1).unwrap();
    assert_eq!(h.eligibility(&p1_addr), Some(Eligibility::Pending));
    assert_eq!(h.voted_choice(&p1_addr), Some(1));
    assert_eq!(h.tally(), vec![0, 1]);
    assert_eq!(h.voter_count(), 1);
}

/// Property: clearing state retracts the vote and drops the record.
#[test]
fn clear_state_retracts_vote() {
    let mut h = Harness::new(100, &["A", "B"]);
    let (p1, p1_addr) = h.at(1).approved_account();
    h.vote(&p1, 0).unwrap();

    h.clear(&p1).unwrap();
    assert_eq!(h.tally(), vec![0, 0]);
    assert_eq!(h.ledger.participant(&p1_addr).unwrap(), None);
}

/// Property: clearing state after the deadline still detaches and retracts.
#[test]
fn clear_state_after_deadline() {
    let mut h = Harness::new(100, &["A", "B"]);
    let (p1, p1_addr) = h.at(1).approved_account();
    h.vote(&p1, 1).unwrap();

    h.at(500).clear(&p1).unwrap();
    assert_eq!(h.tally(), vec![0, 0]);
    assert_eq!(h.ledger.participant(&p1_addr).unwrap(), None);
    assert_eq!(h.voter_count(), 0);
}

/// Property: close-out of an account that never joined changes nothing.
#[test]
fn close_out_without_record() {
    let mut h = Harness::new(100, &["A"]);
    let before = h.ledger.state_hash().unwrap();
    let (stranger, _) = account();

    h.close_out(&stranger).unwrap();
    assert_eq!(h.ledger.state_hash().unwrap(), before);
}

// =============================================================================
// Authorization
// =============================================================================

/// Property: non-creators are rejected for status updates, deletes and
/// updates, whatever the other arguments say.
#[test]
fn non_creator_always_unauthorized() {
    let mut h = Harness::new(100, &["A", "B"]);
    let (mallory, mallory_addr) = account();
    h.at(1).join(&mallory).unwrap();
    let before = h.ledger.state_hash().unwrap();

    let app_id = h.app_id;
    let calls = vec![
        ApplicationCall::update_user_status(app_id, &mallory_addr, Eligibility::Approved),
        ApplicationCall::update_user_status(app_id, &mallory_addr, Eligibility::Pending),
        ApplicationCall::no_op(app_id, vec![b"update_user_status".to_vec()]),
        ApplicationCall::no_op(
            app_id,
            vec![b"update_user_status".to_vec(), vec![0u8; 3], b"maybe-not".to_vec()],
        ),
        ApplicationCall::delete_application(app_id),
        ApplicationCall::update_application(app_id),
    ];

    for call in calls {
        let result = h.submit(&mallory, call);
        assert!(
            matches!(result, Err(Error::Unauthorized(addr)) if addr == mallory_addr),
            "expected authorization error"
        );
    }

    // Also after the deadline: authorization is checked first.
    let call = ApplicationCall::update_user_status(app_id, &mallory_addr, Eligibility::Approved);
    assert!(matches!(h.at(200).submit(&mallory, call), Err(Error::Unauthorized(_))));

    assert_eq!(h.ledger.state_hash().unwrap(), before);
    assert_eq!(h.eligibility(&mallory_addr), Some(Eligibility::Pending));
}

/// Property: the creator can approve only pending participants, once.
#[test]
fn status_decided_once() {
    let mut h = Harness::new(100, &["A"]);
    let (p1, p1_addr) = account();
    h.at(1).join(&p1).unwrap();

    h.set_status(&p1_addr, Eligibility::Denied).unwrap();
    assert!(matches!(
        h.set_status(&p1_addr, Eligibility::Approved),
        Err(Error::InvalidState { .. })
    ));
    assert_eq!(h.eligibility(&p1_addr), Some(Eligibility::Denied));
    assert!(matches!(h.vote(&p1, 0), Err(Error::NotApproved(_))));
}

/// Property: tag arguments are ignored under a non-default completion kind.
#[test]
fn completion_kind_takes_precedence() {
    let mut h = Harness::new(100, &["A", "B"]);
    let (p1, p1_addr) = h.at(1).approved_account();

    let mut call = ApplicationCall::vote(h.app_id, 1);
    call.on_completion = OnCompletion::OptIn;
    h.submit(&p1, call).unwrap();

    assert_eq!(h.tally(), vec![0, 0]);
    assert_eq!(h.eligibility(&p1_addr), Some(Eligibility::Pending));
}

/// Property: the creator may delete the election.
#[test]
fn creator_deletes_election() {
    let mut h = Harness::new(100, &["A"]);
    let creator = h.creator.clone();
    let app_id = h.app_id;

    h.submit(&creator, ApplicationCall::delete_application(app_id))
        .unwrap();
    assert!(h.ledger.election().unwrap().is_none());

    let (p1, _) = account();
    assert!(matches!(h.join(&p1), Err(Error::ApplicationNotFound(_))));
}

// =============================================================================
// Deadline
// =============================================================================

/// Property: join, vote, close-out and status update are all rejected after
/// the deadline, leaving state unchanged.
#[test]
fn deadline_freezes_state() {
    let mut h = Harness::new(100, &["A", "B"]);
    let (voter, _) = h.at(1).approved_account();
    let (pending, pending_addr) = account();
    h.join(&pending).unwrap();
    h.vote(&voter, 0).unwrap();

    h.at(101);
    let before = h.ledger.state_hash().unwrap();
    let (late, _) = account();

    let results = [
        h.join(&late),
        h.vote(&voter, 1),
        h.close_out(&voter),
        h.set_status(&pending_addr, Eligibility::Approved),
    ];

    for result in results {
        assert!(matches!(result, Err(Error::DeadlinePassed { .. })));
    }
    assert_eq!(h.ledger.state_hash().unwrap(), before);
    assert_eq!(h.tally(), vec![1, 0]);
}

// =============================================================================
// Creation
// =============================================================================

/// Creation needs exactly three arguments.
#[test]
fn creation_arity() {
    let creator = SigningKey::generate(&mut OsRng);
    let mut ledger = Ledger::new();

    for args in [
        vec![codec::encode_uint(100), codec::encode_uint(1)],
        vec![
            codec::encode_uint(100),
            codec::encode_uint(1),
            b"A".to_vec(),
            b"extra".to_vec(),
        ],
    ] {
        let mut call = ApplicationCall::create(100, &["A"], AppSchemas::required(1));
        call.args = args;
        let result = ledger.submit(Transaction::new(call, &creator).unwrap());
        assert!(matches!(result, Err(Error::Arity { expected: 3, .. })));
    }
    assert!(ledger.application().is_none());
}

/// Creation must be a NoOp call and carry schemas.
#[test]
fn creation_call_shape() {
    let creator = SigningKey::generate(&mut OsRng);
    let mut ledger = Ledger::new();

    let mut call = ApplicationCall::create(100, &["A"], AppSchemas::required(1));
    call.on_completion = OnCompletion::OptIn;
    assert!(matches!(
        ledger.submit(Transaction::new(call, &creator).unwrap()),
        Err(Error::InvalidArgument(_))
    ));

    let mut call = ApplicationCall::create(100, &["A"], AppSchemas::required(1));
    call.schemas = None;
    assert!(matches!(
        ledger.submit(Transaction::new(call, &creator).unwrap()),
        Err(Error::InvalidArgument(_))
    ));
}

/// The deployment config produces a creation call the ledger accepts.
#[test]
fn deploy_from_config() {
    let config = ElectionConfig::from_json(
        r#"{"relative_election_end": 30, "vote_options": ["Yes", "No", "Abstain"]}"#,
    )
    .unwrap();
    let creator = SigningKey::generate(&mut OsRng);
    let mut ledger = Ledger::new();
    ledger.set_round(70).unwrap();

    let call = config.creation_call(ledger.round()).unwrap();
    ledger.submit(Transaction::new(call, &creator).unwrap()).unwrap();

    let snapshot = ledger.election().unwrap().unwrap();
    assert_eq!(snapshot.election_end, 100);
    let labels: Vec<&str> = snapshot.options.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, vec!["Yes", "No", "Abstain"]);
    assert_eq!(snapshot.tally(), vec![0, 0, 0]);
}

// =============================================================================
// Random Sequences
// =============================================================================

const ACCOUNTS: usize = 4;
const OPTIONS: &[&str] = &["A", "B", "C"];
const ELECTION_END: u64 = 60;

#[derive(Clone, Debug)]
enum Op {
    Join(usize),
    Approve(usize),
    Deny(usize),
    Vote(usize, u64),
    CloseOut(usize),
    Clear(usize),
    Advance(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..ACCOUNTS).prop_map(Op::Join),
        3 => (0..ACCOUNTS).prop_map(Op::Approve),
        1 => (0..ACCOUNTS).prop_map(Op::Deny),
        4 => (0..ACCOUNTS, 0u64..5).prop_map(|(a, c)| Op::Vote(a, c)),
        2 => (0..ACCOUNTS).prop_map(Op::CloseOut),
        1 => (0..ACCOUNTS).prop_map(Op::Clear),
        1 => (0u64..15).prop_map(Op::Advance),
    ]
}

fn fixed_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: for any order of actions, the tally equals the number of
    /// participants holding a vote, nobody votes twice, and nothing changes
    /// after the deadline except through clear-state.
    #[test]
    fn tally_matches_voters(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let mut h = Harness::with_creator(fixed_key(200), ELECTION_END, OPTIONS);
        let keys: Vec<SigningKey> = (0..ACCOUNTS as u8).map(|i| fixed_key(i + 1)).collect();
        let addrs: Vec<Address> = keys.iter().map(|k| Address::from(&k.verifying_key())).collect();

        for op in ops {
            let closed = h.ledger.round() > ELECTION_END;
            let before = h.ledger.state_hash().unwrap();

            let (result, deadline_bound) = match op {
                Op::Join(i) => (h.join(&keys[i]), true),
                Op::Approve(i) => (h.set_status(&addrs[i], Eligibility::Approved), true),
                Op::Deny(i) => (h.set_status(&addrs[i], Eligibility::Denied), true),
                Op::Vote(i, choice) => {
                    let previous = h.voted_choice(&addrs[i]);
                    let result = h.vote(&keys[i], choice);
                    if previous.is_some() {
                        prop_assert!(result.is_err());
                    }
                    (result, true)
                }
                Op::CloseOut(i) => (h.close_out(&keys[i]), true),
                Op::Clear(i) => {
                    let result = h.clear(&keys[i]);
                    prop_assert!(result.is_ok());
                    (result, false)
                }
                Op::Advance(n) => {
                    h.ledger.advance(n);
                    continue;
                }
            };

            if closed && deadline_bound {
                let is_deadline_error = matches!(result, Err(Error::DeadlinePassed { .. }));
                prop_assert!(is_deadline_error);
            }
            if result.is_err() {
                prop_assert_eq!(h.ledger.state_hash().unwrap(), before);
            }

            let tally = h.tally();
            prop_assert_eq!(tally.iter().sum::<u64>(), h.voter_count());
            for (addr, record) in h.ledger.participants().unwrap() {
                if let Some(choice) = record.voted_choice {
                    prop_assert!(choice < OPTIONS.len() as u64);
                    prop_assert!(tally[choice as usize] > 0, "{} counted nowhere", addr);
                }
            }
        }
    }
}
