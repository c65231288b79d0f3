//! Name database: the authoritative, deterministically derived state.
//!
//! [`NameDb`] holds the three tables (names, preorders, namespaces) and
//! implements the acceptance rules for every operation kind via
//! [`NameDb::apply`]. Validation rejection is routine, not an error: apply
//! returns a tagged [`Outcome`] and the driver simply logs rejected
//! operations and moves on.
//!
//! [`ChainState`] wraps the database together with the consensus tape and
//! block-position metadata; it is the value that gets snapshotted and the
//! value the query endpoint reads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consensus::ConsensusTape;
use crate::types::ops::{
    NameOperation, NamePreorder, NameRegister, NameRevoke, NameTransfer, NameUpdate,
    NamespaceReady, NamespaceReveal, preorder_fingerprint, split_name,
};
use crate::types::{Address, BlockHash, Hash160};

/// Record types stored in the database tables.
pub mod records;

/// Name pricing as a function of namespace parameters.
pub mod pricing;

pub use pricing::name_price;
pub use records::{NameRecord, NamespaceRecord, NamespaceState, PreorderKind, PreorderRecord};

/// Snapshot schema version, bumped on any incompatible layout change.
pub const SCHEMA_VERSION: u32 = 1;

/// Blocks a revealed namespace has to become ready before the reveal lapses.
///
/// Roughly one year of ten-minute blocks.
pub const NAMESPACE_READY_DEADLINE: u64 = 52_595;

/// TTL parameters for preorder matching.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ValidationRules {
    /// Blocks a name preorder stays consumable.
    pub preorder_ttl: u64,
    /// Blocks a namespace preorder stays consumable.
    pub ns_preorder_ttl: u64,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            preorder_ttl: 144,
            ns_preorder_ttl: 144,
        }
    }
}

impl ValidationRules {
    fn ttl_for(&self, kind: PreorderKind) -> u64 {
        match kind {
            PreorderKind::Name => self.preorder_ttl,
            PreorderKind::Namespace => self.ns_preorder_ttl,
        }
    }
}

/// Per-operation context handed to [`NameDb::apply`].
///
/// Carries everything the acceptance rules may consult besides the tables
/// themselves: the block position, the sender recovered from the carrying
/// transaction, the optional destination output, and the consensus window.
pub struct OpContext<'a> {
    /// Height of the block containing the operation.
    pub block_height: u64,
    /// Sending address, recovered from the transaction's first input.
    pub sender: Address,
    /// Destination address from the transaction, if present.
    pub recipient: Option<Address>,
    /// Current consensus window, for freshness checks and preorder matching.
    pub tape: &'a ConsensusTape,
    /// TTL parameters.
    pub rules: ValidationRules,
}

/// Why an operation was not accepted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RejectReason {
    /// The committed consensus hash is not in the current window.
    StaleConsensusHash,
    /// An unexpired preorder already occupies the fingerprint.
    PreorderExists,
    /// No preorder in the window matches the disclosed (name, salt).
    NoMatchingPreorder,
    /// A matching preorder exists but belongs to a different sender.
    PreorderWrongSender,
    /// The matching preorder is older than its TTL.
    PreorderExpired,
    /// The name is registered to someone else and not expired.
    NameTaken,
    /// The name does not exist or has expired.
    NameNotFound,
    /// The name exists but is expired.
    NameExpired,
    /// The name has been revoked and accepts no operations.
    NameRevoked,
    /// The sender does not own the name.
    NotNameOwner,
    /// The name's namespace has not been revealed.
    NamespaceNotFound,
    /// The namespace is revealed but not ready, and the sender is not its
    /// creator.
    NamespaceNotOpen,
    /// A namespace with this id already exists.
    NamespaceExists,
    /// The namespace is already ready.
    NamespaceAlreadyReady,
    /// The ready operation came after the reveal deadline.
    ReadyDeadlinePassed,
    /// Only the namespace creator may perform this operation.
    NotNamespaceCreator,
    /// A transfer transaction carried no destination output.
    MissingRecipient,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            RejectReason::StaleConsensusHash => "consensus hash is outside the window",
            RejectReason::PreorderExists => "an active preorder already exists",
            RejectReason::NoMatchingPreorder => "no matching preorder in the window",
            RejectReason::PreorderWrongSender => "preorder belongs to a different sender",
            RejectReason::PreorderExpired => "matching preorder has expired",
            RejectReason::NameTaken => "name is registered to another owner",
            RejectReason::NameNotFound => "name is not registered",
            RejectReason::NameExpired => "name has expired",
            RejectReason::NameRevoked => "name has been revoked",
            RejectReason::NotNameOwner => "sender does not own the name",
            RejectReason::NamespaceNotFound => "namespace has not been revealed",
            RejectReason::NamespaceNotOpen => "namespace is not open for registration",
            RejectReason::NamespaceExists => "namespace already exists",
            RejectReason::NamespaceAlreadyReady => "namespace is already ready",
            RejectReason::ReadyDeadlinePassed => "namespace reveal deadline has passed",
            RejectReason::NotNamespaceCreator => "sender did not create the namespace",
            RejectReason::MissingRecipient => "transaction has no destination output",
        };
        f.write_str(msg)
    }
}

/// Result of applying one operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The operation was accepted and the state mutated.
    Applied,
    /// The operation was rejected; the state is unchanged.
    Rejected(RejectReason),
}

impl Outcome {
    /// Returns `true` for [`Outcome::Applied`].
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

/// The three tables of the name database.
///
/// `BTreeMap`s keep iteration deterministic, which snapshot hashing and
/// replay equality depend on. Only the driver mutates a `NameDb`, strictly
/// in (block height, transaction index) order.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct NameDb {
    /// Registered names, keyed by full name.
    pub names: BTreeMap<String, NameRecord>,
    /// Outstanding preorders, keyed by fingerprint.
    pub preorders: BTreeMap<Hash160, PreorderRecord>,
    /// Revealed and ready namespaces, keyed by namespace id.
    pub namespaces: BTreeMap<String, NamespaceRecord>,
}

impl NameDb {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record for `name`, expired or not.
    pub fn get_name(&self, name: &str) -> Option<&NameRecord> {
        self.names.get(name)
    }

    /// Returns the record for `name` if it is live (registered, unexpired)
    /// as of `height`.
    pub fn lookup(&self, name: &str, height: u64) -> Option<&NameRecord> {
        self.names.get(name).filter(|rec| !rec.is_expired(height))
    }

    /// Returns `true` if `name` is live as of `height`.
    pub fn is_name_registered(&self, name: &str, height: u64) -> bool {
        self.lookup(name, height).is_some()
    }

    /// Returns the namespace record for `ns`.
    pub fn get_namespace(&self, ns: &str) -> Option<&NamespaceRecord> {
        self.namespaces.get(ns)
    }

    /// Applies one operation, mutating the database on acceptance.
    ///
    /// Deterministic: the outcome depends only on the operation, the
    /// context, and the current tables. Rejection leaves the tables
    /// untouched.
    pub fn apply(&mut self, op: &NameOperation, ctx: &OpContext<'_>) -> Outcome {
        match op {
            NameOperation::Preorder(p) => self.apply_preorder(p, ctx, PreorderKind::Name),
            NameOperation::Register(r) => self.apply_register(r, ctx),
            NameOperation::Update(u) => self.apply_update(u, ctx),
            NameOperation::Transfer(t) => self.apply_transfer(t, ctx),
            NameOperation::Revoke(r) => self.apply_revoke(r, ctx),
            NameOperation::NamespacePreorder(p) => {
                let as_name_preorder = NamePreorder {
                    fingerprint: p.fingerprint,
                    consensus_hash: p.consensus_hash,
                };
                self.apply_preorder(&as_name_preorder, ctx, PreorderKind::Namespace)
            }
            NameOperation::NamespaceReveal(r) => self.apply_namespace_reveal(r, ctx),
            NameOperation::NamespaceReady(r) => self.apply_namespace_ready(r, ctx),
        }
    }

    fn apply_preorder(
        &mut self,
        op: &NamePreorder,
        ctx: &OpContext<'_>,
        kind: PreorderKind,
    ) -> Outcome {
        if !ctx.tape.contains(&op.consensus_hash) {
            return Outcome::Rejected(RejectReason::StaleConsensusHash);
        }
        if let Some(existing) = self.preorders.get(&op.fingerprint) {
            let ttl = ctx.rules.ttl_for(existing.kind);
            if !existing.is_expired(ctx.block_height, ttl) {
                return Outcome::Rejected(RejectReason::PreorderExists);
            }
            // Expired commitments are silently replaced.
        }
        self.preorders.insert(
            op.fingerprint,
            PreorderRecord {
                sender: ctx.sender,
                block_height: ctx.block_height,
                consensus_hash: op.consensus_hash,
                kind,
            },
        );
        Outcome::Applied
    }

    fn apply_register(&mut self, op: &NameRegister, ctx: &OpContext<'_>) -> Outcome {
        let height = ctx.block_height;

        // A live name can only be renewed, and only by its owner.
        if let Some(existing) = self.names.get(&op.name) {
            if !existing.is_expired(height) {
                if existing.revoked {
                    return Outcome::Rejected(RejectReason::NameRevoked);
                }
                if existing.owner != ctx.sender {
                    return Outcome::Rejected(RejectReason::NameTaken);
                }
                let Some(ns) = self.namespaces.get(&existing.namespace_id) else {
                    return Outcome::Rejected(RejectReason::NamespaceNotFound);
                };
                let expires_at = height + u64::from(ns.lifetime);
                let record = self.names.get_mut(&op.name).expect("checked above");
                record.expires_at = expires_at;
                return Outcome::Applied;
            }
        }

        // Fresh (or re-)registration: the namespace must accept the sender.
        let Some((_, ns_id)) = split_name(&op.name) else {
            // The codec guarantees a namespace suffix; treat its absence as
            // an unknown namespace rather than panicking.
            return Outcome::Rejected(RejectReason::NamespaceNotFound);
        };
        let Some(ns) = self.namespaces.get(ns_id) else {
            return Outcome::Rejected(RejectReason::NamespaceNotFound);
        };
        match ns.state {
            NamespaceState::Revealed => {
                if ns.creator != ctx.sender {
                    return Outcome::Rejected(RejectReason::NamespaceNotOpen);
                }
            }
            NamespaceState::Ready => {}
        }
        let lifetime = u64::from(ns.lifetime);

        // Match the disclosed (name, salt) against the preorder table by
        // scanning the window's consensus hashes, newest first.
        let mut matched: Option<Hash160> = None;
        for entry in ctx.tape.entries().iter().rev() {
            let fingerprint = preorder_fingerprint(&op.name, &op.salt, &entry.hash);
            if let Some(preorder) = self.preorders.get(&fingerprint) {
                if preorder.kind != PreorderKind::Name {
                    continue;
                }
                if preorder.sender != ctx.sender {
                    return Outcome::Rejected(RejectReason::PreorderWrongSender);
                }
                if preorder.is_expired(height, ctx.rules.preorder_ttl) {
                    return Outcome::Rejected(RejectReason::PreorderExpired);
                }
                matched = Some(fingerprint);
                break;
            }
        }
        let Some(fingerprint) = matched else {
            return Outcome::Rejected(RejectReason::NoMatchingPreorder);
        };

        self.preorders.remove(&fingerprint);
        self.names.insert(
            op.name.clone(),
            NameRecord {
                owner: ctx.sender,
                data_hash: None,
                registered_at: height,
                expires_at: height + lifetime,
                namespace_id: ns_id.to_string(),
                revoked: false,
                fingerprint,
            },
        );
        Outcome::Applied
    }

    fn live_owned_name(
        &mut self,
        name: &str,
        ctx: &OpContext<'_>,
    ) -> Result<&mut NameRecord, RejectReason> {
        let height = ctx.block_height;
        let Some(record) = self.names.get_mut(name) else {
            return Err(RejectReason::NameNotFound);
        };
        if record.is_expired(height) {
            return Err(RejectReason::NameExpired);
        }
        if record.revoked {
            return Err(RejectReason::NameRevoked);
        }
        if record.owner != ctx.sender {
            return Err(RejectReason::NotNameOwner);
        }
        Ok(record)
    }

    fn apply_update(&mut self, op: &NameUpdate, ctx: &OpContext<'_>) -> Outcome {
        match self.live_owned_name(&op.name, ctx) {
            Ok(record) => {
                record.data_hash = Some(op.data_hash);
                Outcome::Applied
            }
            Err(reason) => Outcome::Rejected(reason),
        }
    }

    fn apply_transfer(&mut self, op: &NameTransfer, ctx: &OpContext<'_>) -> Outcome {
        let Some(recipient) = ctx.recipient else {
            return Outcome::Rejected(RejectReason::MissingRecipient);
        };
        match self.live_owned_name(&op.name, ctx) {
            Ok(record) => {
                record.owner = recipient;
                if !op.keep_data {
                    record.data_hash = None;
                }
                Outcome::Applied
            }
            Err(reason) => Outcome::Rejected(reason),
        }
    }

    fn apply_revoke(&mut self, op: &NameRevoke, ctx: &OpContext<'_>) -> Outcome {
        match self.live_owned_name(&op.name, ctx) {
            Ok(record) => {
                record.revoked = true;
                record.data_hash = None;
                Outcome::Applied
            }
            Err(reason) => Outcome::Rejected(reason),
        }
    }

    fn apply_namespace_reveal(&mut self, op: &NamespaceReveal, ctx: &OpContext<'_>) -> Outcome {
        let height = ctx.block_height;
        if self.namespaces.contains_key(&op.namespace_id) {
            return Outcome::Rejected(RejectReason::NamespaceExists);
        }

        let mut matched: Option<Hash160> = None;
        for entry in ctx.tape.entries().iter().rev() {
            let fingerprint = preorder_fingerprint(&op.namespace_id, &op.salt, &entry.hash);
            if let Some(preorder) = self.preorders.get(&fingerprint) {
                if preorder.kind != PreorderKind::Namespace {
                    continue;
                }
                if preorder.sender != ctx.sender {
                    return Outcome::Rejected(RejectReason::PreorderWrongSender);
                }
                if preorder.is_expired(height, ctx.rules.ns_preorder_ttl) {
                    return Outcome::Rejected(RejectReason::PreorderExpired);
                }
                matched = Some(fingerprint);
                break;
            }
        }
        let Some(fingerprint) = matched else {
            return Outcome::Rejected(RejectReason::NoMatchingPreorder);
        };

        self.preorders.remove(&fingerprint);
        self.namespaces.insert(
            op.namespace_id.clone(),
            NamespaceRecord {
                creator: ctx.sender,
                lifetime: op.lifetime,
                base_cost: op.base_cost,
                cost_decay_ppm: op.cost_decay_ppm,
                state: NamespaceState::Revealed,
                reveal_height: height,
                ready_height: None,
            },
        );
        Outcome::Applied
    }

    fn apply_namespace_ready(&mut self, op: &NamespaceReady, ctx: &OpContext<'_>) -> Outcome {
        let Some(ns) = self.namespaces.get_mut(&op.namespace_id) else {
            return Outcome::Rejected(RejectReason::NamespaceNotFound);
        };
        if ns.state == NamespaceState::Ready {
            return Outcome::Rejected(RejectReason::NamespaceAlreadyReady);
        }
        if ns.creator != ctx.sender {
            return Outcome::Rejected(RejectReason::NotNamespaceCreator);
        }
        if ctx.block_height > ns.reveal_height + NAMESPACE_READY_DEADLINE {
            return Outcome::Rejected(RejectReason::ReadyDeadlinePassed);
        }
        ns.state = NamespaceState::Ready;
        ns.ready_height = Some(ctx.block_height);
        Outcome::Applied
    }
}

/// The full committed state: database, consensus tape, block position.
///
/// This is the snapshot value. Cloning is cheap enough for per-block
/// copy-then-mutate, which keeps the published state immutable while the
/// driver works on the next block.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChainState {
    /// Snapshot schema version.
    pub schema_version: u32,
    /// Height of the last fully committed block.
    pub height: u64,
    /// Hash of the last committed block, for reorg detection.
    pub last_block_hash: Option<BlockHash>,
    /// The name database.
    pub db: NameDb,
    /// The consensus-hash window.
    pub tape: ConsensusTape,
}

impl ChainState {
    /// Creates the genesis state: nothing processed, next block is
    /// `start_block`.
    pub fn genesis(start_block: u64, window: u64) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            height: start_block.saturating_sub(1),
            last_block_hash: None,
            db: NameDb::new(),
            tape: ConsensusTape::new(window),
        }
    }

    /// Returns the most recent consensus hash, if any block has been
    /// processed.
    pub fn current_consensus(&self) -> Option<crate::types::ConsensusHash> {
        self.tape.current()
    }

    /// Returns the canonical byte representation of this state.
    ///
    /// Used for snapshot persistence and for state-equality checks in
    /// tests.
    ///
    /// # Panics
    ///
    /// Panics if encoding fails, which would be a programming error: every
    /// field is serializable.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let cfg = bincode::config::standard();
        bincode::serde::encode_to_vec(self, cfg)
            .expect("ChainState should always be serializable with bincode 2 + serde")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ops::NamespacePreorder;
    use crate::types::{ConsensusHash, HASH160_LEN, SALT_LEN, Salt};

    fn dummy_address(byte: u8) -> Address {
        Address(Hash160([byte; HASH160_LEN]))
    }

    fn dummy_salt(byte: u8) -> Salt {
        Salt([byte; SALT_LEN])
    }

    /// Tape with one sealed entry per height in `1..=blocks`.
    fn sealed_tape(blocks: u64) -> ConsensusTape {
        let mut tape = ConsensusTape::new(144);
        for h in 1..=blocks {
            tape.seal(h, &h.to_be_bytes());
        }
        tape
    }

    fn ctx<'a>(
        tape: &'a ConsensusTape,
        height: u64,
        sender: Address,
        recipient: Option<Address>,
    ) -> OpContext<'a> {
        OpContext {
            block_height: height,
            sender,
            recipient,
            tape,
            rules: ValidationRules::default(),
        }
    }

    /// A ready namespace "id" with a 1000-block lifetime, created by `creator`.
    fn db_with_ready_namespace(creator: Address) -> NameDb {
        let mut db = NameDb::new();
        db.namespaces.insert(
            "id".to_string(),
            NamespaceRecord {
                creator,
                lifetime: 1_000,
                base_cost: 25_600,
                cost_decay_ppm: 250_000,
                state: NamespaceState::Ready,
                reveal_height: 5,
                ready_height: Some(6),
            },
        );
        db
    }

    fn preorder_then_register(
        db: &mut NameDb,
        tape: &ConsensusTape,
        sender: Address,
        name: &str,
        salt: Salt,
        preorder_height: u64,
        register_height: u64,
    ) -> Outcome {
        let committed = tape.current().unwrap();
        let preorder = NameOperation::Preorder(NamePreorder {
            fingerprint: preorder_fingerprint(name, &salt, &committed),
            consensus_hash: committed,
        });
        let out = db.apply(&preorder, &ctx(tape, preorder_height, sender, None));
        assert_eq!(out, Outcome::Applied, "preorder should be accepted");

        let register = NameOperation::Register(NameRegister {
            name: name.to_string(),
            salt,
        });
        db.apply(&register, &ctx(tape, register_height, sender, None))
    }

    #[test]
    fn preorder_then_register_within_ttl_succeeds() {
        let alice = dummy_address(1);
        let tape = sealed_tape(100);
        let mut db = db_with_ready_namespace(dummy_address(9));

        let out =
            preorder_then_register(&mut db, &tape, alice, "alice.id", dummy_salt(7), 101, 104);
        assert_eq!(out, Outcome::Applied);

        let rec = db.get_name("alice.id").expect("name should exist");
        assert_eq!(rec.owner, alice);
        assert_eq!(rec.data_hash, None);
        assert_eq!(rec.expires_at, 104 + 1_000);
        assert!(db.preorders.is_empty(), "preorder should be consumed");
    }

    #[test]
    fn stale_consensus_hash_is_rejected() {
        let alice = dummy_address(1);
        // Window holds the last 144 of 300 entries; height 50 is long gone.
        let mut tape = ConsensusTape::new(144);
        let mut stale = None;
        for h in 1..=300 {
            let ch = tape.seal(h, &h.to_be_bytes());
            if h == 50 {
                stale = Some(ch);
            }
        }
        let stale = stale.unwrap();
        assert!(!tape.contains(&stale));

        let mut db = db_with_ready_namespace(dummy_address(9));
        let preorder = NameOperation::Preorder(NamePreorder {
            fingerprint: preorder_fingerprint("alice.id", &dummy_salt(7), &stale),
            consensus_hash: stale,
        });
        let out = db.apply(&preorder, &ctx(&tape, 301, alice, None));
        assert_eq!(out, Outcome::Rejected(RejectReason::StaleConsensusHash));
        assert!(db.preorders.is_empty());
    }

    #[test]
    fn register_by_wrong_sender_is_rejected() {
        let alice = dummy_address(1);
        let bob = dummy_address(2);
        let tape = sealed_tape(100);
        let mut db = db_with_ready_namespace(dummy_address(9));

        let committed = tape.current().unwrap();
        let salt = dummy_salt(7);
        let preorder = NameOperation::Preorder(NamePreorder {
            fingerprint: preorder_fingerprint("alice.id", &salt, &committed),
            consensus_hash: committed,
        });
        assert!(
            db.apply(&preorder, &ctx(&tape, 101, alice, None))
                .is_applied()
        );

        // Bob discloses Alice's (name, salt).
        let register = NameOperation::Register(NameRegister {
            name: "alice.id".to_string(),
            salt,
        });
        let out = db.apply(&register, &ctx(&tape, 103, bob, None));
        assert_eq!(out, Outcome::Rejected(RejectReason::PreorderWrongSender));
        assert!(db.get_name("alice.id").is_none());
    }

    #[test]
    fn register_after_ttl_is_rejected() {
        let alice = dummy_address(1);
        let tape = sealed_tape(100);
        let mut db = db_with_ready_namespace(dummy_address(9));

        let out = preorder_then_register(
            &mut db,
            &tape,
            alice,
            "alice.id",
            dummy_salt(7),
            101,
            101 + 145,
        );
        assert_eq!(out, Outcome::Rejected(RejectReason::PreorderExpired));
    }

    #[test]
    fn duplicate_fingerprint_keeps_the_first_preorder() {
        let alice = dummy_address(1);
        let bob = dummy_address(2);
        let tape = sealed_tape(100);
        let mut db = db_with_ready_namespace(dummy_address(9));

        let committed = tape.current().unwrap();
        let fingerprint = preorder_fingerprint("alice.id", &dummy_salt(7), &committed);
        let preorder = NameOperation::Preorder(NamePreorder {
            fingerprint,
            consensus_hash: committed,
        });

        assert!(
            db.apply(&preorder, &ctx(&tape, 101, alice, None))
                .is_applied()
        );
        let out = db.apply(&preorder, &ctx(&tape, 101, bob, None));
        assert_eq!(out, Outcome::Rejected(RejectReason::PreorderExists));
        assert_eq!(db.preorders.get(&fingerprint).unwrap().sender, alice);
    }

    #[test]
    fn update_sets_data_hash_for_owner_only() {
        let alice = dummy_address(1);
        let bob = dummy_address(2);
        let tape = sealed_tape(100);
        let mut db = db_with_ready_namespace(dummy_address(9));
        preorder_then_register(&mut db, &tape, alice, "alice.id", dummy_salt(7), 101, 104);

        let update = NameOperation::Update(NameUpdate {
            name: "alice.id".to_string(),
            data_hash: Hash160([0xde; HASH160_LEN]),
        });

        let out = db.apply(&update, &ctx(&tape, 105, bob, None));
        assert_eq!(out, Outcome::Rejected(RejectReason::NotNameOwner));

        let out = db.apply(&update, &ctx(&tape, 105, alice, None));
        assert_eq!(out, Outcome::Applied);
        assert_eq!(
            db.get_name("alice.id").unwrap().data_hash,
            Some(Hash160([0xde; HASH160_LEN]))
        );
    }

    #[test]
    fn transfer_changes_owner_and_can_drop_data() {
        let alice = dummy_address(1);
        let bob = dummy_address(2);
        let tape = sealed_tape(100);
        let mut db = db_with_ready_namespace(dummy_address(9));
        preorder_then_register(&mut db, &tape, alice, "alice.id", dummy_salt(7), 101, 104);

        let update = NameOperation::Update(NameUpdate {
            name: "alice.id".to_string(),
            data_hash: Hash160([0xde; HASH160_LEN]),
        });
        assert!(db.apply(&update, &ctx(&tape, 105, alice, None)).is_applied());

        let transfer = NameOperation::Transfer(NameTransfer {
            name: "alice.id".to_string(),
            keep_data: false,
        });
        let out = db.apply(&transfer, &ctx(&tape, 106, alice, Some(bob)));
        assert_eq!(out, Outcome::Applied);

        let rec = db.get_name("alice.id").unwrap();
        assert_eq!(rec.owner, bob);
        assert_eq!(rec.data_hash, None);
    }

    #[test]
    fn transfer_without_destination_output_is_rejected() {
        let alice = dummy_address(1);
        let tape = sealed_tape(100);
        let mut db = db_with_ready_namespace(dummy_address(9));
        preorder_then_register(&mut db, &tape, alice, "alice.id", dummy_salt(7), 101, 104);

        let transfer = NameOperation::Transfer(NameTransfer {
            name: "alice.id".to_string(),
            keep_data: true,
        });
        let out = db.apply(&transfer, &ctx(&tape, 106, alice, None));
        assert_eq!(out, Outcome::Rejected(RejectReason::MissingRecipient));
    }

    #[test]
    fn revoked_name_accepts_nothing_until_expiry() {
        let alice = dummy_address(1);
        let tape = sealed_tape(100);
        let mut db = db_with_ready_namespace(dummy_address(9));
        preorder_then_register(&mut db, &tape, alice, "alice.id", dummy_salt(7), 101, 104);

        let revoke = NameOperation::Revoke(NameRevoke {
            name: "alice.id".to_string(),
        });
        assert!(db.apply(&revoke, &ctx(&tape, 105, alice, None)).is_applied());
        let rec = db.get_name("alice.id").unwrap();
        assert!(rec.revoked);
        assert_eq!(rec.data_hash, None);

        // Even the owner cannot update or re-register while revoked.
        let update = NameOperation::Update(NameUpdate {
            name: "alice.id".to_string(),
            data_hash: Hash160([1; HASH160_LEN]),
        });
        assert_eq!(
            db.apply(&update, &ctx(&tape, 106, alice, None)),
            Outcome::Rejected(RejectReason::NameRevoked)
        );
        let register = NameOperation::Register(NameRegister {
            name: "alice.id".to_string(),
            salt: dummy_salt(7),
        });
        assert_eq!(
            db.apply(&register, &ctx(&tape, 106, alice, None)),
            Outcome::Rejected(RejectReason::NameRevoked)
        );
    }

    #[test]
    fn renewal_extends_expiration_idempotently() {
        let alice = dummy_address(1);
        let tape = sealed_tape(100);
        let mut db = db_with_ready_namespace(dummy_address(9));
        preorder_then_register(&mut db, &tape, alice, "alice.id", dummy_salt(7), 101, 104);

        let renew = NameOperation::Register(NameRegister {
            name: "alice.id".to_string(),
            salt: dummy_salt(0),
        });
        assert!(db.apply(&renew, &ctx(&tape, 500, alice, None)).is_applied());
        assert_eq!(db.get_name("alice.id").unwrap().expires_at, 1_500);

        // Renewing again in the same block changes nothing.
        assert!(db.apply(&renew, &ctx(&tape, 500, alice, None)).is_applied());
        assert_eq!(db.get_name("alice.id").unwrap().expires_at, 1_500);
    }

    #[test]
    fn expired_name_can_be_reregistered_by_someone_else() {
        let alice = dummy_address(1);
        let bob = dummy_address(2);
        let mut tape = sealed_tape(100);
        let mut db = db_with_ready_namespace(dummy_address(9));
        preorder_then_register(&mut db, &tape, alice, "alice.id", dummy_salt(7), 101, 104);

        // Lifetime is 1000, so the name expires at 1104.
        for h in 101..=1_105 {
            tape.seal(h, &h.to_be_bytes());
        }
        let out = preorder_then_register(
            &mut db,
            &tape,
            bob,
            "alice.id",
            dummy_salt(8),
            1_105,
            1_106,
        );
        assert_eq!(out, Outcome::Applied);
        assert_eq!(db.get_name("alice.id").unwrap().owner, bob);
    }

    #[test]
    fn namespace_lifecycle_gates_registration() {
        let creator = dummy_address(1);
        let bob = dummy_address(2);
        let tape = sealed_tape(9);
        let mut db = NameDb::new();
        let committed = tape.current().unwrap();

        // Preorder the namespace at block 10.
        let ns_salt = dummy_salt(3);
        let ns_preorder = NameOperation::NamespacePreorder(NamespacePreorder {
            fingerprint: preorder_fingerprint("id", &ns_salt, &committed),
            consensus_hash: committed,
        });
        assert!(
            db.apply(&ns_preorder, &ctx(&tape, 10, creator, None))
                .is_applied()
        );

        // Reveal at block 20.
        let reveal = NameOperation::NamespaceReveal(NamespaceReveal {
            namespace_id: "id".to_string(),
            salt: ns_salt,
            lifetime: 1_000,
            base_cost: 25_600,
            cost_decay_ppm: 250_000,
        });
        assert!(db.apply(&reveal, &ctx(&tape, 20, creator, None)).is_applied());
        assert_eq!(
            db.get_namespace("id").unwrap().state,
            NamespaceState::Revealed
        );

        // Bob preorders his name, but registration at 25 is rejected: the
        // namespace is revealed and Bob is not the creator.
        let bob_salt = dummy_salt(4);
        let bob_preorder = NameOperation::Preorder(NamePreorder {
            fingerprint: preorder_fingerprint("bob.id", &bob_salt, &committed),
            consensus_hash: committed,
        });
        assert!(
            db.apply(&bob_preorder, &ctx(&tape, 22, bob, None))
                .is_applied()
        );
        let bob_register = NameOperation::Register(NameRegister {
            name: "bob.id".to_string(),
            salt: bob_salt,
        });
        assert_eq!(
            db.apply(&bob_register, &ctx(&tape, 25, bob, None)),
            Outcome::Rejected(RejectReason::NamespaceNotOpen)
        );

        // The creator can register while revealed.
        let creator_salt = dummy_salt(5);
        let creator_preorder = NameOperation::Preorder(NamePreorder {
            fingerprint: preorder_fingerprint("own.id", &creator_salt, &committed),
            consensus_hash: committed,
        });
        assert!(
            db.apply(&creator_preorder, &ctx(&tape, 26, creator, None))
                .is_applied()
        );
        let creator_register = NameOperation::Register(NameRegister {
            name: "own.id".to_string(),
            salt: creator_salt,
        });
        assert!(
            db.apply(&creator_register, &ctx(&tape, 27, creator, None))
                .is_applied()
        );

        // Only the creator may flip the namespace to ready.
        let ready = NameOperation::NamespaceReady(NamespaceReady {
            namespace_id: "id".to_string(),
        });
        assert_eq!(
            db.apply(&ready, &ctx(&tape, 30, bob, None)),
            Outcome::Rejected(RejectReason::NotNamespaceCreator)
        );
        assert!(db.apply(&ready, &ctx(&tape, 30, creator, None)).is_applied());

        // Bob's identical registration now succeeds.
        assert_eq!(
            db.apply(&bob_register, &ctx(&tape, 31, bob, None)),
            Outcome::Applied
        );
        assert_eq!(db.get_name("bob.id").unwrap().owner, bob);
    }

    #[test]
    fn namespace_ready_after_deadline_is_rejected() {
        let creator = dummy_address(1);
        let tape = sealed_tape(9);
        let mut db = NameDb::new();
        db.namespaces.insert(
            "id".to_string(),
            NamespaceRecord {
                creator,
                lifetime: 1_000,
                base_cost: 25_600,
                cost_decay_ppm: 250_000,
                state: NamespaceState::Revealed,
                reveal_height: 10,
                ready_height: None,
            },
        );

        let ready = NameOperation::NamespaceReady(NamespaceReady {
            namespace_id: "id".to_string(),
        });
        let late = 10 + NAMESPACE_READY_DEADLINE + 1;
        assert_eq!(
            db.apply(&ready, &ctx(&tape, late, creator, None)),
            Outcome::Rejected(RejectReason::ReadyDeadlinePassed)
        );
    }

    #[test]
    fn chain_state_canonical_bytes_roundtrip() {
        let alice = dummy_address(1);
        let tape = sealed_tape(100);
        let mut db = db_with_ready_namespace(dummy_address(9));
        preorder_then_register(&mut db, &tape, alice, "alice.id", dummy_salt(7), 101, 104);

        let state = ChainState {
            schema_version: SCHEMA_VERSION,
            height: 104,
            last_block_hash: None,
            db,
            tape,
        };

        let cfg = bincode::config::standard();
        let bytes = state.canonical_bytes();
        let (decoded, _): (ChainState, usize) =
            bincode::serde::decode_from_slice(&bytes, cfg).expect("ChainState decode");
        assert_eq!(decoded, state);
    }
}
