//! The ledger entity: construction, lifecycle, identity, and accessors.

use crate::entry::{AccountState, EntryLookup, EntryWrite, LedgerEntry, LookupMode};
use crate::error::LedgerError;
use crate::index::{account_root_index, nickname_index_from_hash};
use meridian_crypto::{sha512_half, sign_message, verify_signature};
use meridian_transactions::Transaction;
use meridian_tree::{Fetch, HashTree, InsertOutcome, LeafKind, SupplyOutcome, TreeKind};
use meridian_types::{
    Amount, Hash256, KeyPair, LedgerParams, LedgerSeq, PublicKey, Signature, Timestamp,
};

/// Length of the canonical header: parent hash, transaction-tree hash,
/// account-tree hash, fee held, timestamp, sequence.
pub(crate) const RAW_HEADER_LEN: usize = 32 + 32 + 32 + 8 + 8 + 4;
const RAW_SIGNATURE_LEN: usize = 64;

/// One versioned snapshot of account state plus the transactions that
/// produced it.
///
/// All structural mutation goes through `&mut self`; once
/// [`Ledger::set_accepted`] has run, every mutating operation fails with
/// [`LedgerError::Immutable`] rather than silently succeeding.
#[derive(Clone, Debug)]
pub struct Ledger {
    hash: Hash256,
    hash_valid: bool,
    parent_hash: Hash256,
    tx_root_hash: Hash256,
    account_root_hash: Hash256,
    fee_held: Amount,
    timestamp: Timestamp,
    sequence: LedgerSeq,
    closed: bool,
    accepted: bool,
    immutable: bool,
    acquiring: bool,
    signature: Option<Signature>,
    pub(crate) transactions: HashTree,
    pub(crate) account_state: HashTree,
    params: LedgerParams,
}

impl Ledger {
    // ── Construction ────────────────────────────────────────────────────

    /// The bootstrap ledger: sequence 0, zero parent hash, an empty
    /// transaction tree, and a single account-state leaf granting the
    /// master account the starting balance.
    pub fn genesis(master: &PublicKey, starting_balance: Amount) -> Self {
        let master_account = meridian_crypto::derive_account_id(master);
        let mut account_state = HashTree::new(TreeKind::AccountStateMap);
        let entry =
            LedgerEntry::AccountRoot(AccountState::with_balance(master_account, starting_balance));
        account_state
            .insert(entry.index(), entry.to_bytes(), LeafKind::Account)
            .expect("insert into a fresh tree cannot fail");

        let mut params = LedgerParams::defaults();
        params.genesis_balance = starting_balance;

        let mut ledger = Self {
            hash: Hash256::ZERO,
            hash_valid: false,
            parent_hash: Hash256::ZERO,
            tx_root_hash: Hash256::ZERO,
            account_root_hash: account_state.root_hash(),
            fee_held: Amount::ZERO,
            timestamp: Timestamp::EPOCH,
            sequence: 0,
            closed: false,
            accepted: false,
            immutable: false,
            acquiring: false,
            signature: None,
            transactions: HashTree::new(TreeKind::TransactionMap),
            account_state,
            params,
        };
        ledger.update_hash();
        ledger
    }

    /// The open successor of a closed ledger: shares both trees
    /// copy-on-write, records the parent's identity hash, and sits at
    /// `parent.sequence + 1`.
    pub fn successor_of(parent: &Ledger, timestamp: Timestamp) -> Result<Self, LedgerError> {
        if !parent.closed {
            return Err(LedgerError::NotClosed);
        }
        Ok(Self {
            hash: Hash256::ZERO,
            hash_valid: false,
            parent_hash: parent.hash,
            tx_root_hash: parent.transactions.root_hash(),
            account_root_hash: parent.account_state.root_hash(),
            fee_held: Amount::ZERO,
            timestamp,
            sequence: parent.sequence + 1,
            closed: false,
            accepted: false,
            immutable: false,
            acquiring: false,
            signature: None,
            transactions: parent.transactions.clone_unsealed(),
            account_state: parent.account_state.clone_unsealed(),
            params: parent.params.clone(),
        })
    }

    /// A closed-but-unsynced shell built from header fields received from
    /// a peer. Both trees start as placeholders keyed by their root hashes
    /// and are populated via [`Ledger::supply_transaction_node`] /
    /// [`Ledger::supply_account_node`].
    pub fn from_header(
        parent_hash: Hash256,
        tx_root_hash: Hash256,
        account_root_hash: Hash256,
        fee_held: Amount,
        timestamp: Timestamp,
        sequence: LedgerSeq,
    ) -> Self {
        let mut transactions = HashTree::from_root_hash(TreeKind::TransactionMap, tx_root_hash);
        let mut account_state =
            HashTree::from_root_hash(TreeKind::AccountStateMap, account_root_hash);
        transactions.seal();
        account_state.seal();

        let mut ledger = Self {
            hash: Hash256::ZERO,
            hash_valid: false,
            parent_hash,
            tx_root_hash,
            account_root_hash,
            fee_held,
            timestamp,
            sequence,
            closed: true,
            accepted: false,
            immutable: false,
            acquiring: false,
            signature: None,
            transactions,
            account_state,
            params: LedgerParams::defaults(),
        };
        ledger.update_hash();
        ledger
    }

    /// Parse the canonical raw encoding (header plus optional signature)
    /// into the same shell form as [`Ledger::from_header`].
    pub fn from_raw(bytes: &[u8]) -> Result<Self, LedgerError> {
        if bytes.len() != RAW_HEADER_LEN && bytes.len() != RAW_HEADER_LEN + RAW_SIGNATURE_LEN {
            return Err(LedgerError::BadEncoding(format!(
                "raw ledger is {} bytes, expected {} or {}",
                bytes.len(),
                RAW_HEADER_LEN,
                RAW_HEADER_LEN + RAW_SIGNATURE_LEN
            )));
        }
        let mut parent = [0u8; 32];
        parent.copy_from_slice(&bytes[0..32]);
        let mut tx_root = [0u8; 32];
        tx_root.copy_from_slice(&bytes[32..64]);
        let mut account_root = [0u8; 32];
        account_root.copy_from_slice(&bytes[64..96]);
        let mut fee = [0u8; 8];
        fee.copy_from_slice(&bytes[96..104]);
        let mut timestamp = [0u8; 8];
        timestamp.copy_from_slice(&bytes[104..112]);
        let mut sequence = [0u8; 4];
        sequence.copy_from_slice(&bytes[112..116]);

        let mut ledger = Self::from_header(
            Hash256::new(parent),
            Hash256::new(tx_root),
            Hash256::new(account_root),
            Amount::new(u64::from_be_bytes(fee)),
            Timestamp::new(u64::from_be_bytes(timestamp)),
            LedgerSeq::from_be_bytes(sequence),
        );
        if bytes.len() == RAW_HEADER_LEN + RAW_SIGNATURE_LEN {
            let mut signature = [0u8; 64];
            signature.copy_from_slice(&bytes[RAW_HEADER_LEN..]);
            ledger.signature = Some(Signature(signature));
        }
        Ok(ledger)
    }

    // ── Identity ────────────────────────────────────────────────────────

    fn header_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RAW_HEADER_LEN);
        buf.extend_from_slice(self.parent_hash.as_bytes());
        buf.extend_from_slice(self.tx_root_hash.as_bytes());
        buf.extend_from_slice(self.account_root_hash.as_bytes());
        buf.extend_from_slice(&self.fee_held.drops().to_be_bytes());
        buf.extend_from_slice(&self.timestamp.as_secs().to_be_bytes());
        buf.extend_from_slice(&self.sequence.to_be_bytes());
        buf
    }

    /// Serialize the canonical raw encoding: the hashed header fields in
    /// hashing order, then signature bytes when present.
    pub fn add_raw(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.header_bytes());
        if let Some(signature) = &self.signature {
            buf.extend_from_slice(signature.as_bytes());
        }
    }

    pub fn to_raw_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RAW_HEADER_LEN + RAW_SIGNATURE_LEN);
        self.add_raw(&mut buf);
        buf
    }

    pub(crate) fn update_hash(&mut self) {
        self.hash = sha512_half(&self.header_bytes());
        self.hash_valid = true;
    }

    /// Refresh the header's tree-root snapshot after a mutation. The
    /// identity hash becomes stale until the next [`Ledger::hash`] call.
    pub(crate) fn sync_roots(&mut self) {
        self.tx_root_hash = self.transactions.root_hash();
        self.account_root_hash = self.account_state.root_hash();
        self.hash_valid = false;
    }

    /// The ledger's identity hash, recomputed lazily if tree contents
    /// changed since it was last read.
    pub fn hash(&mut self) -> Hash256 {
        if !self.hash_valid {
            self.update_hash();
        }
        self.hash
    }

    /// The identity hash if it is current, `None` while mutations have
    /// left it stale. Always current on a closed ledger.
    pub fn identity_hash(&self) -> Option<Hash256> {
        self.hash_valid.then_some(self.hash)
    }

    /// True iff `other` could be this ledger's parent or child under the
    /// hash-chain rule.
    pub fn is_compatible(&self, other: &Ledger) -> bool {
        (other.hash_valid && self.parent_hash == other.hash)
            || (self.hash_valid && other.parent_hash == self.hash)
    }

    /// Sign the raw header with a closed ledger's identity.
    pub fn sign(&mut self, keys: &KeyPair) -> Result<(), LedgerError> {
        if !self.closed {
            return Err(LedgerError::NotClosed);
        }
        self.signature = Some(sign_message(&self.header_bytes(), &keys.private));
        Ok(())
    }

    /// Verify the stored signature against the raw header.
    pub fn verify_ledger_signature(&self, key: &PublicKey) -> bool {
        match &self.signature {
            Some(signature) => verify_signature(&self.header_bytes(), signature, key),
            None => false,
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    pub(crate) fn ensure_open(&self) -> Result<(), LedgerError> {
        if self.immutable {
            return Err(LedgerError::Immutable);
        }
        if self.closed {
            return Err(LedgerError::NotOpen);
        }
        Ok(())
    }

    /// Freeze the ledger: seal both trees, record their final root
    /// hashes, and compute the identity hash. Closing twice is a caller
    /// bug and fails loudly.
    pub fn close(&mut self, timestamp: Timestamp) -> Result<(), LedgerError> {
        if self.closed {
            return Err(LedgerError::AlreadyClosed);
        }
        self.timestamp = timestamp;
        self.transactions.seal();
        self.account_state.seal();
        self.sync_roots();
        self.closed = true;
        self.update_hash();
        tracing::debug!(sequence = self.sequence, hash = %self.hash, "ledger closed");
        Ok(())
    }

    /// Mark the ledger accepted by consensus. Terminal: implies immutable.
    pub fn set_accepted(&mut self) -> Result<(), LedgerError> {
        if !self.closed {
            return Err(LedgerError::NotClosed);
        }
        self.accepted = true;
        self.immutable = true;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    // ── Header accessors ────────────────────────────────────────────────

    pub fn parent_hash(&self) -> Hash256 {
        self.parent_hash
    }

    pub fn transaction_root(&self) -> Hash256 {
        self.tx_root_hash
    }

    pub fn account_state_root(&self) -> Hash256 {
        self.account_root_hash
    }

    pub fn fee_held(&self) -> Amount {
        self.fee_held
    }

    pub(crate) fn set_fee_held(&mut self, fee_held: Amount) {
        self.fee_held = fee_held;
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn sequence(&self) -> LedgerSeq {
        self.sequence
    }

    pub fn params(&self) -> &LedgerParams {
        &self.params
    }

    // ── Low-level map access ────────────────────────────────────────────

    pub fn transaction_map(&self) -> &HashTree {
        &self.transactions
    }

    pub fn account_state_map(&self) -> &HashTree {
        &self.account_state
    }

    // ── Sync surface ────────────────────────────────────────────────────

    /// Mark this ledger as being fetched from the network.
    pub fn set_acquiring(&mut self) {
        self.acquiring = true;
    }

    pub fn is_acquiring(&self) -> bool {
        self.acquiring
    }

    pub fn is_acquiring_tx(&self) -> bool {
        !self.transactions.is_complete()
    }

    pub fn is_acquiring_account_state(&self) -> bool {
        !self.account_state.is_complete()
    }

    /// Resolve a pending transaction-tree node fetched from a peer.
    /// Materialization never changes the root hash, so the identity hash
    /// stays valid throughout.
    pub fn supply_transaction_node(
        &mut self,
        expected: Hash256,
        bytes: &[u8],
    ) -> Result<SupplyOutcome, LedgerError> {
        let outcome = self.transactions.supply_node(expected, bytes)?;
        self.refresh_acquiring();
        Ok(outcome)
    }

    /// Resolve a pending account-state-tree node fetched from a peer.
    pub fn supply_account_node(
        &mut self,
        expected: Hash256,
        bytes: &[u8],
    ) -> Result<SupplyOutcome, LedgerError> {
        let outcome = self.account_state.supply_node(expected, bytes)?;
        self.refresh_acquiring();
        Ok(outcome)
    }

    fn refresh_acquiring(&mut self) {
        if self.transactions.is_complete() && self.account_state.is_complete() {
            self.acquiring = false;
        }
    }

    // ── Transaction queries ─────────────────────────────────────────────

    pub fn has_transaction(&self, id: &Hash256) -> bool {
        matches!(self.transactions.fetch(id), Fetch::Found(_))
    }

    /// Decode the transaction stored under `id`, if present locally.
    /// A leaf that fails to decode is corruption and escalates.
    pub fn get_transaction(&self, id: &Hash256) -> Result<Option<Transaction>, LedgerError> {
        match self.transactions.fetch(id) {
            Fetch::Found(leaf) => {
                let tx = Transaction::from_canonical_bytes(leaf.payload)
                    .map_err(|err| LedgerError::BadEncoding(err.to_string()))?;
                Ok(Some(tx))
            }
            Fetch::Missing => Ok(None),
            Fetch::Pending(hash) => Err(meridian_tree::TreeError::Incomplete(hash).into()),
        }
    }

    // ── Account queries ─────────────────────────────────────────────────

    /// An account's balance, zero if the account does not exist.
    pub fn get_balance(&self, account: &meridian_types::AccountId) -> Amount {
        self.get_account_state(account)
            .map(|state| state.balance)
            .unwrap_or(Amount::ZERO)
    }

    /// An account's state, if it exists and is locally present.
    pub fn get_account_state(
        &self,
        account: &meridian_types::AccountId,
    ) -> Option<AccountState> {
        match self.account_state.fetch(&account_root_index(account)) {
            Fetch::Found(leaf) => LedgerEntry::from_bytes(leaf.payload)
                .ok()
                .and_then(|entry| entry.as_account_root().cloned()),
            _ => None,
        }
    }

    /// Look up an account's root entry, optionally creating a fresh one.
    pub fn get_account_root(
        &mut self,
        account: &meridian_types::AccountId,
        mode: LookupMode,
    ) -> Result<EntryLookup, LedgerError> {
        let fresh = || LedgerEntry::AccountRoot(AccountState::new(*account));
        self.lookup_entry(account_root_index(account), is_account_root, fresh, mode)
    }

    /// Look up a nickname entry by its string form.
    pub fn get_nickname(
        &mut self,
        nickname: &str,
        mode: LookupMode,
    ) -> Result<EntryLookup, LedgerError> {
        self.get_nickname_by_hash(&sha512_half(nickname.as_bytes()), mode)
    }

    /// Look up a nickname entry by the nickname's hash.
    pub fn get_nickname_by_hash(
        &mut self,
        nickname_hash: &Hash256,
        mode: LookupMode,
    ) -> Result<EntryLookup, LedgerError> {
        let hash = *nickname_hash;
        let fresh = move || LedgerEntry::Nickname {
            nickname_hash: hash,
            owner: meridian_types::AccountId::ZERO,
        };
        self.lookup_entry(nickname_index_from_hash(nickname_hash), is_nickname, fresh, mode)
    }

    fn lookup_entry(
        &mut self,
        index: Hash256,
        family: fn(&LedgerEntry) -> bool,
        fresh: impl FnOnce() -> LedgerEntry,
        mode: LookupMode,
    ) -> Result<EntryLookup, LedgerError> {
        match self.account_state.fetch(&index) {
            Fetch::Found(leaf) => {
                let entry = LedgerEntry::from_bytes(leaf.payload)?;
                if family(&entry) {
                    Ok(EntryLookup::Found(entry))
                } else {
                    Ok(EntryLookup::WrongType)
                }
            }
            Fetch::Pending(hash) => Ok(EntryLookup::Pending(hash)),
            Fetch::Missing => match mode {
                LookupMode::Peek => Ok(EntryLookup::Missing),
                LookupMode::CreateIfMissing => {
                    self.ensure_open()?;
                    let entry = fresh();
                    self.account_state
                        .insert(index, entry.to_bytes(), LeafKind::Account)?;
                    self.sync_roots();
                    Ok(EntryLookup::Created(entry))
                }
            },
        }
    }

    /// Store a modified entry back into the account-state tree at its
    /// derived index.
    pub fn write_back(&mut self, entry: &LedgerEntry) -> Result<EntryWrite, LedgerError> {
        self.ensure_open()?;
        let outcome =
            self.account_state
                .insert(entry.index(), entry.to_bytes(), LeafKind::Account)?;
        self.sync_roots();
        Ok(match outcome {
            InsertOutcome::Created => EntryWrite::Created,
            InsertOutcome::Replaced => EntryWrite::Updated,
        })
    }
}

fn is_account_root(entry: &LedgerEntry) -> bool {
    matches!(entry, LedgerEntry::AccountRoot(_))
}

fn is_nickname(entry: &LedgerEntry) -> bool {
    matches!(entry, LedgerEntry::Nickname { .. })
}
