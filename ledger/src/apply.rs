//! The transaction-application state machine.
//!
//! Every attempt resolves to exactly one [`TxOutcome`]. Outcomes are
//! expected, reportable conditions — they are returned in `Ok`, never
//! raised as errors. The checks run strictly before any write, so a
//! transaction that fails a pre-condition leaves the ledger untouched;
//! a successful application mutates balances, sequence, the fee
//! accumulator, and the transaction tree as one unit.
//!
//! Fees are burned: a success debits `amount + fee` from the source,
//! credits `amount` to the destination, and adds `fee` to the ledger's
//! fee-held accumulator, which nothing ever re-credits to an account.

use crate::entry::{AccountState, LedgerEntry};
use crate::error::LedgerError;
use crate::index::{account_root_index, nickname_index_from_hash};
use crate::ledger::Ledger;
use meridian_transactions::{validate_transaction, Transaction, TxPayload};
use meridian_tree::{Fetch, LeafKind, TreeError};
use meridian_types::AccountId;

/// Terminal outcome of one transaction attempt, in check order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxOutcome {
    /// Malformed encoding or invalid signature; nothing mutated.
    BadTransaction,
    /// Source (or required destination) account does not exist.
    BadAccount,
    /// Claimed sequence is not ahead of the account; the transaction is
    /// stale.
    PastSequence,
    /// Claimed sequence leaves a gap; an earlier transaction from this
    /// account is missing. The caller may retry once the gap fills.
    PreSequence,
    /// The sending account cannot cover amount plus fee.
    Insufficient,
    /// The offered fee is below the ledger's minimum.
    TooSmall,
    /// Applied: balances, sequence, fee accumulator, and transaction tree
    /// all updated atomically.
    Success,
    /// An identical transaction hash is already in this ledger's
    /// transaction tree; idempotent no-op.
    Already,
    /// Removal target is not in this ledger.
    NotFound,
}

impl Ledger {
    /// Apply one transaction against this open ledger.
    pub fn apply_transaction(&mut self, tx: &Transaction) -> Result<TxOutcome, LedgerError> {
        self.ensure_open()?;

        if validate_transaction(tx).is_err() || !tx.verify() {
            return Ok(TxOutcome::BadTransaction);
        }

        // Idempotence: a hash already present is reported distinctly and
        // nothing is re-applied.
        match self.transactions.fetch(&tx.hash()) {
            Fetch::Found(_) => return Ok(TxOutcome::Already),
            Fetch::Pending(hash) => return Err(TreeError::Incomplete(hash).into()),
            Fetch::Missing => {}
        }

        let mut source = match self.read_account(&tx.source())? {
            Some(state) => state,
            None => return Ok(TxOutcome::BadAccount),
        };

        if tx.sequence() <= source.sequence {
            return Ok(TxOutcome::PastSequence);
        }
        if tx.sequence() > source.sequence.saturating_add(1) {
            return Ok(TxOutcome::PreSequence);
        }

        match *tx.payload() {
            TxPayload::Payment {
                destination,
                amount,
            } => {
                let Some(total) = amount.checked_add(tx.fee()) else {
                    return Ok(TxOutcome::Insufficient);
                };
                if source.balance < total {
                    return Ok(TxOutcome::Insufficient);
                }
                if tx.fee() < self.params().min_tx_fee {
                    return Ok(TxOutcome::TooSmall);
                }

                // All reads (and pending-node checks) happen before the
                // first write so a failure cannot leave partial state.
                let mut dest = match self.read_account(&destination)? {
                    Some(state) => state,
                    // First payment to an unknown account creates it.
                    None => AccountState::new(destination),
                };
                dest.balance = dest
                    .balance
                    .checked_add(amount)
                    .ok_or(LedgerError::AmountOverflow)?;
                source.balance = source
                    .balance
                    .checked_sub(total)
                    .ok_or(LedgerError::AmountOverflow)?;
                source.sequence = tx.sequence();
                self.store_account(&source)?;
                self.store_account(&dest)?;
            }
            TxPayload::SetNickname { nickname_hash } => {
                if source.balance < tx.fee() {
                    return Ok(TxOutcome::Insufficient);
                }
                if tx.fee() < self.params().min_tx_fee {
                    return Ok(TxOutcome::TooSmall);
                }
                let index = nickname_index_from_hash(&nickname_hash);
                if let Fetch::Pending(hash) = self.account_state.fetch(&index) {
                    return Err(TreeError::Incomplete(hash).into());
                }
                source.balance = source
                    .balance
                    .checked_sub(tx.fee())
                    .ok_or(LedgerError::AmountOverflow)?;
                source.sequence = tx.sequence();
                let claim = LedgerEntry::Nickname {
                    nickname_hash,
                    owner: source.account,
                };
                self.store_account(&source)?;
                self.account_state
                    .insert(index, claim.to_bytes(), LeafKind::Account)?;
            }
        }

        let fee_held = self
            .fee_held()
            .checked_add(tx.fee())
            .ok_or(LedgerError::AmountOverflow)?;
        self.set_fee_held(fee_held);
        self.transactions
            .insert(tx.hash(), tx.to_canonical_bytes(), LeafKind::Transaction)?;
        self.sync_roots();
        Ok(TxOutcome::Success)
    }

    /// Unwind a previously applied transaction — error recovery while the
    /// ledger is still being assembled. Only the source's most recent
    /// transaction can be unwound.
    pub fn remove_transaction(&mut self, tx: &Transaction) -> Result<TxOutcome, LedgerError> {
        self.ensure_open()?;

        match self.transactions.fetch(&tx.hash()) {
            Fetch::Missing => return Ok(TxOutcome::NotFound),
            Fetch::Pending(hash) => return Err(TreeError::Incomplete(hash).into()),
            Fetch::Found(_) => {}
        }

        let mut source = match self.read_account(&tx.source())? {
            Some(state) => state,
            None => return Ok(TxOutcome::BadAccount),
        };
        if source.sequence != tx.sequence() {
            return Ok(TxOutcome::PastSequence);
        }

        match *tx.payload() {
            TxPayload::Payment {
                destination,
                amount,
            } => {
                let mut dest = match self.read_account(&destination)? {
                    Some(state) => state,
                    None => return Ok(TxOutcome::BadAccount),
                };
                // The receiving side may have spent the credit already.
                if dest.balance < amount {
                    return Ok(TxOutcome::Insufficient);
                }
                let total = amount
                    .checked_add(tx.fee())
                    .ok_or(LedgerError::AmountOverflow)?;
                dest.balance = dest
                    .balance
                    .checked_sub(amount)
                    .ok_or(LedgerError::AmountOverflow)?;
                source.balance = source
                    .balance
                    .checked_add(total)
                    .ok_or(LedgerError::AmountOverflow)?;
                source.sequence = tx.sequence().saturating_sub(1);
                if dest.balance.is_zero() && dest.sequence == 0 {
                    // The credit was what created the account; remove the
                    // empty entry so the tree matches its pre-apply shape.
                    self.account_state
                        .remove(&account_root_index(&destination))?;
                } else {
                    self.store_account(&dest)?;
                }
                self.store_account(&source)?;
            }
            TxPayload::SetNickname { nickname_hash } => {
                source.balance = source
                    .balance
                    .checked_add(tx.fee())
                    .ok_or(LedgerError::AmountOverflow)?;
                source.sequence = tx.sequence().saturating_sub(1);
                self.account_state
                    .remove(&nickname_index_from_hash(&nickname_hash))?;
                self.store_account(&source)?;
            }
        }

        let fee_held = self
            .fee_held()
            .checked_sub(tx.fee())
            .ok_or(LedgerError::AmountOverflow)?;
        self.set_fee_held(fee_held);
        self.transactions.remove(&tx.hash())?;
        self.sync_roots();
        Ok(TxOutcome::Success)
    }

    fn read_account(&self, account: &AccountId) -> Result<Option<AccountState>, LedgerError> {
        match self.account_state.fetch(&account_root_index(account)) {
            Fetch::Found(leaf) => {
                let entry = LedgerEntry::from_bytes(leaf.payload)?;
                Ok(entry.as_account_root().cloned())
            }
            Fetch::Missing => Ok(None),
            Fetch::Pending(hash) => Err(TreeError::Incomplete(hash).into()),
        }
    }

    fn store_account(&mut self, state: &AccountState) -> Result<(), LedgerError> {
        let entry = LedgerEntry::AccountRoot(state.clone());
        self.account_state
            .insert(entry.index(), entry.to_bytes(), LeafKind::Account)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_crypto::{derive_account_id, keypair_from_seed};
    use meridian_types::{Amount, KeyPair, Timestamp};

    const GENESIS_BALANCE: u64 = 100_000_000_000;

    fn master_keys() -> KeyPair {
        keypair_from_seed(&[42u8; 32])
    }

    fn genesis() -> Ledger {
        Ledger::genesis(&master_keys().public, Amount::new(GENESIS_BALANCE))
    }

    fn dest() -> AccountId {
        AccountId::new([0xDD; 20])
    }

    fn payment(sequence: u32, amount: u64, fee: u64) -> Transaction {
        Transaction::payment(
            &master_keys(),
            sequence,
            Amount::new(fee),
            dest(),
            Amount::new(amount),
        )
    }

    #[test]
    fn bootstrap_payment_scenario() {
        let mut ledger = genesis();
        let master = derive_account_id(&master_keys().public);
        let tx = payment(1, 1_000, 10);

        assert_eq!(ledger.apply_transaction(&tx).unwrap(), TxOutcome::Success);

        // Master pays amount plus fee; the fee is burned into fee-held.
        assert_eq!(ledger.get_balance(&master), Amount::new(99_999_998_990));
        assert_eq!(ledger.get_account_state(&master).unwrap().sequence, 1);
        assert_eq!(ledger.get_balance(&dest()), Amount::new(1_000));
        assert_eq!(ledger.fee_held(), Amount::new(10));

        // Exactly one leaf, keyed by the transaction's content hash.
        assert_eq!(ledger.transaction_map().leaf_count().unwrap(), 1);
        assert!(ledger.has_transaction(&tx.hash()));
    }

    #[test]
    fn second_apply_is_already_and_changes_nothing() {
        let mut ledger = genesis();
        let master = derive_account_id(&master_keys().public);
        let tx = payment(1, 1_000, 10);

        assert_eq!(ledger.apply_transaction(&tx).unwrap(), TxOutcome::Success);
        let balance_after = ledger.get_balance(&master);
        let root_after = ledger.account_state_root();

        assert_eq!(ledger.apply_transaction(&tx).unwrap(), TxOutcome::Already);
        assert_eq!(ledger.get_balance(&master), balance_after);
        assert_eq!(ledger.account_state_root(), root_after);
        assert_eq!(ledger.get_account_state(&master).unwrap().sequence, 1);
        assert_eq!(ledger.fee_held(), Amount::new(10));
    }

    #[test]
    fn sequence_gap_and_stale_sequence() {
        let mut ledger = genesis();
        let master = derive_account_id(&master_keys().public);
        let before_root = ledger.account_state_root();

        // Account sits at sequence 0: claiming 2 skips a transaction.
        assert_eq!(
            ledger.apply_transaction(&payment(2, 1_000, 10)).unwrap(),
            TxOutcome::PreSequence
        );
        assert_eq!(ledger.account_state_root(), before_root);

        assert_eq!(
            ledger.apply_transaction(&payment(1, 1_000, 10)).unwrap(),
            TxOutcome::Success
        );
        // Replaying sequence 1 (a different tx with the same claim) is stale.
        assert_eq!(
            ledger.apply_transaction(&payment(1, 2_000, 10)).unwrap(),
            TxOutcome::PastSequence
        );
        assert_eq!(ledger.get_account_state(&master).unwrap().sequence, 1);
    }

    #[test]
    fn insufficient_balance_leaves_state_unchanged() {
        let mut ledger = genesis();
        let master = derive_account_id(&master_keys().public);
        let before_root = ledger.account_state_root();

        let tx = payment(1, GENESIS_BALANCE, 10); // amount + fee > balance
        assert_eq!(
            ledger.apply_transaction(&tx).unwrap(),
            TxOutcome::Insufficient
        );
        assert_eq!(ledger.get_balance(&master), Amount::new(GENESIS_BALANCE));
        assert_eq!(ledger.get_account_state(&master).unwrap().sequence, 0);
        assert_eq!(ledger.account_state_root(), before_root);
        assert_eq!(ledger.transaction_map().leaf_count().unwrap(), 0);
    }

    #[test]
    fn fee_below_minimum_is_too_small() {
        let mut ledger = genesis();
        assert_eq!(
            ledger.apply_transaction(&payment(1, 1_000, 1)).unwrap(),
            TxOutcome::TooSmall
        );
        assert_eq!(ledger.fee_held(), Amount::ZERO);
    }

    #[test]
    fn tampered_transaction_is_bad() {
        let mut ledger = genesis();
        let mut bytes = payment(1, 1_000, 10).to_canonical_bytes();
        let amount_offset = 1 + 20 + 32 + 4 + 8 + 20;
        bytes[amount_offset] ^= 0x01;
        let forged = Transaction::from_canonical_bytes(&bytes).unwrap();

        assert_eq!(
            ledger.apply_transaction(&forged).unwrap(),
            TxOutcome::BadTransaction
        );
        assert_eq!(ledger.transaction_map().leaf_count().unwrap(), 0);
    }

    #[test]
    fn unknown_source_is_bad_account() {
        let mut ledger = genesis();
        let stranger = keypair_from_seed(&[77u8; 32]);
        let tx = Transaction::payment(
            &stranger,
            1,
            Amount::new(10),
            dest(),
            Amount::new(100),
        );
        assert_eq!(
            ledger.apply_transaction(&tx).unwrap(),
            TxOutcome::BadAccount
        );
    }

    #[test]
    fn destination_is_created_lazily() {
        let mut ledger = genesis();
        assert!(ledger.get_account_state(&dest()).is_none());
        ledger.apply_transaction(&payment(1, 500, 10)).unwrap();
        let created = ledger.get_account_state(&dest()).unwrap();
        assert_eq!(created.balance, Amount::new(500));
        assert_eq!(created.sequence, 0);
    }

    #[test]
    fn remove_inverts_apply() {
        let mut ledger = genesis();
        let master = derive_account_id(&master_keys().public);
        let account_root_before = ledger.account_state_root();
        let tx_root_before = ledger.transaction_root();

        let tx = payment(1, 1_000, 10);
        ledger.apply_transaction(&tx).unwrap();
        assert_eq!(ledger.remove_transaction(&tx).unwrap(), TxOutcome::Success);

        assert_eq!(ledger.get_balance(&master), Amount::new(GENESIS_BALANCE));
        assert_eq!(ledger.get_account_state(&master).unwrap().sequence, 0);
        assert!(ledger.get_account_state(&dest()).is_none());
        assert_eq!(ledger.fee_held(), Amount::ZERO);
        // Both trees are back to their pre-apply shapes.
        assert_eq!(ledger.account_state_root(), account_root_before);
        assert_eq!(ledger.transaction_root(), tx_root_before);
    }

    #[test]
    fn remove_unknown_transaction_is_not_found() {
        let mut ledger = genesis();
        assert_eq!(
            ledger.remove_transaction(&payment(1, 1_000, 10)).unwrap(),
            TxOutcome::NotFound
        );
    }

    #[test]
    fn remove_is_only_legal_while_open() {
        let mut ledger = genesis();
        let tx = payment(1, 1_000, 10);
        ledger.apply_transaction(&tx).unwrap();
        ledger.close(Timestamp::new(1_000)).unwrap();
        assert!(matches!(
            ledger.remove_transaction(&tx),
            Err(LedgerError::NotOpen)
        ));
    }

    #[test]
    fn apply_on_closed_or_accepted_ledger_fails_loudly() {
        let mut ledger = genesis();
        ledger.close(Timestamp::new(1_000)).unwrap();
        assert!(matches!(
            ledger.apply_transaction(&payment(1, 1_000, 10)),
            Err(LedgerError::NotOpen)
        ));

        ledger.set_accepted().unwrap();
        assert!(matches!(
            ledger.apply_transaction(&payment(1, 1_000, 10)),
            Err(LedgerError::Immutable)
        ));
    }

    #[test]
    fn sequential_payments_accumulate_fees() {
        let mut ledger = genesis();
        ledger.apply_transaction(&payment(1, 100, 10)).unwrap();
        ledger.apply_transaction(&payment(2, 200, 15)).unwrap();
        ledger.apply_transaction(&payment(3, 300, 20)).unwrap();
        assert_eq!(ledger.fee_held(), Amount::new(45));
        assert_eq!(ledger.transaction_map().leaf_count().unwrap(), 3);
    }

    #[test]
    fn nickname_claim_applies_and_unwinds() {
        let mut ledger = genesis();
        let master = derive_account_id(&master_keys().public);
        let nickname_hash = meridian_crypto::sha512_half(b"alice");
        let tx = Transaction::set_nickname(&master_keys(), 1, Amount::new(10), nickname_hash);

        assert_eq!(ledger.apply_transaction(&tx).unwrap(), TxOutcome::Success);
        match ledger
            .get_nickname_by_hash(&nickname_hash, crate::entry::LookupMode::Peek)
            .unwrap()
        {
            crate::entry::EntryLookup::Found(LedgerEntry::Nickname { owner, .. }) => {
                assert_eq!(owner, master)
            }
            other => panic!("expected nickname entry, got {other:?}"),
        }
        assert_eq!(
            ledger.get_balance(&master),
            Amount::new(GENESIS_BALANCE - 10)
        );

        assert_eq!(ledger.remove_transaction(&tx).unwrap(), TxOutcome::Success);
        assert_eq!(ledger.get_balance(&master), Amount::new(GENESIS_BALANCE));
        assert_eq!(
            ledger
                .get_nickname_by_hash(&nickname_hash, crate::entry::LookupMode::Peek)
                .unwrap(),
            crate::entry::EntryLookup::Missing
        );
    }
}
