//! Chain-reorganization recovery: re-basing an open ledger onto a
//! different parent.

use crate::apply::TxOutcome;
use crate::error::LedgerError;
use crate::ledger::Ledger;
use meridian_transactions::Transaction;
use meridian_tree::DiffKind;

impl Ledger {
    /// Re-base this ledger onto `new_previous`: derive a fresh successor
    /// of the new parent and re-apply the transactions this ledger holds
    /// beyond `old_previous`, up to `limit` of them.
    ///
    /// The transaction set is recovered structurally — a tree diff against
    /// the old parent's transaction map — so only this ledger's own
    /// additions are replayed. Fails with
    /// [`LedgerError::RebaseFailed`] when the set exceeds `limit` or a
    /// transaction no longer applies cleanly; the caller decides whether
    /// to escalate to a full resync.
    pub fn switch_previous_ledger(
        &self,
        old_previous: &Ledger,
        new_previous: &Ledger,
        limit: usize,
    ) -> Result<Ledger, LedgerError> {
        if old_previous.identity_hash() != Some(self.parent_hash()) {
            return Err(LedgerError::NotCompatible);
        }
        if !new_previous.is_closed() {
            return Err(LedgerError::NotClosed);
        }

        let diff = self
            .transactions
            .diff(old_previous.transaction_map())?;
        let mut pending: Vec<Transaction> = Vec::new();
        for (id, kind) in &diff {
            if *kind == DiffKind::AddedHere {
                let tx = self.get_transaction(id)?.ok_or_else(|| {
                    LedgerError::BadEncoding("diff reported a transaction the tree does not hold".into())
                })?;
                pending.push(tx);
            }
        }

        let total = pending.len();
        if total > limit {
            tracing::warn!(pending = total, limit, "re-base refused: transaction set exceeds limit");
            return Err(LedgerError::RebaseFailed {
                applied: 0,
                pending: total,
                limit,
            });
        }

        let mut rebased = Ledger::successor_of(new_previous, self.timestamp())?;
        let mut applied = 0usize;
        // Diff order is key order, not sequence order: keep retrying
        // transactions that arrive ahead of their account's sequence until
        // a pass makes no progress.
        while !pending.is_empty() {
            let mut retry = Vec::new();
            let mut progressed = false;
            for tx in pending {
                match rebased.apply_transaction(&tx)? {
                    TxOutcome::Success | TxOutcome::Already => {
                        applied += 1;
                        progressed = true;
                    }
                    TxOutcome::PreSequence => retry.push(tx),
                    outcome => {
                        tracing::warn!(
                            ?outcome,
                            tx = %tx.hash(),
                            "re-base could not re-apply transaction"
                        );
                        return Err(LedgerError::RebaseFailed {
                            applied,
                            pending: total,
                            limit,
                        });
                    }
                }
            }
            if !progressed {
                return Err(LedgerError::RebaseFailed {
                    applied,
                    pending: total,
                    limit,
                });
            }
            pending = retry;
        }
        tracing::debug!(applied, parent = %new_previous.identity_hash().unwrap_or_default(), "re-based ledger");
        Ok(rebased)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_crypto::{derive_account_id, keypair_from_seed};
    use meridian_types::{AccountId, Amount, KeyPair, Timestamp};

    fn master_keys() -> KeyPair {
        keypair_from_seed(&[42u8; 32])
    }

    fn closed_genesis() -> Ledger {
        let mut ledger = Ledger::genesis(&master_keys().public, Amount::new(100_000_000_000));
        ledger.close(Timestamp::new(1_000)).unwrap();
        ledger
    }

    fn payment(sequence: u32, amount: u64) -> Transaction {
        Transaction::payment(
            &master_keys(),
            sequence,
            Amount::new(10),
            AccountId::new([0xDD; 20]),
            Amount::new(amount),
        )
    }

    #[test]
    fn rebase_limit_zero_with_transactions_fails() {
        let genesis = closed_genesis();
        let mut open = Ledger::successor_of(&genesis, Timestamp::new(1_010)).unwrap();
        open.apply_transaction(&payment(1, 500)).unwrap();

        let err = open
            .switch_previous_ledger(&genesis, &genesis, 0)
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::RebaseFailed {
                applied: 0,
                pending: 1,
                limit: 0
            }
        ));
    }

    #[test]
    fn rebase_onto_alternative_parent_replays_transactions() {
        let genesis = closed_genesis();
        let mut open = Ledger::successor_of(&genesis, Timestamp::new(1_010)).unwrap();
        open.apply_transaction(&payment(1, 500)).unwrap();
        open.apply_transaction(&payment(2, 700)).unwrap();

        // A competing empty successor of genesis won the reorganization.
        let mut alternative = Ledger::successor_of(&genesis, Timestamp::new(1_011)).unwrap();
        alternative.close(Timestamp::new(1_020)).unwrap();
        let alternative_hash = alternative.identity_hash().unwrap();

        let rebased = open
            .switch_previous_ledger(&genesis, &alternative, 10)
            .unwrap();
        assert_eq!(rebased.parent_hash(), alternative_hash);
        assert_eq!(rebased.sequence(), alternative.sequence() + 1);

        let master = derive_account_id(&master_keys().public);
        // Both payments replayed: 500 + 700 paid out, 2 × 10 fee burned.
        assert_eq!(
            rebased.get_balance(&master),
            Amount::new(100_000_000_000 - 500 - 700 - 20)
        );
        assert_eq!(
            rebased.get_balance(&AccountId::new([0xDD; 20])),
            Amount::new(1_200)
        );
        assert_eq!(rebased.get_account_state(&master).unwrap().sequence, 2);
    }

    #[test]
    fn rebase_with_wrong_old_parent_is_not_compatible() {
        let genesis = closed_genesis();
        let open = Ledger::successor_of(&genesis, Timestamp::new(1_010)).unwrap();

        let mut unrelated =
            Ledger::genesis(&keypair_from_seed(&[9u8; 32]).public, Amount::new(5));
        unrelated.close(Timestamp::new(2)).unwrap();

        assert!(matches!(
            open.switch_previous_ledger(&unrelated, &genesis, 10),
            Err(LedgerError::NotCompatible)
        ));
    }

    #[test]
    fn rebase_requires_closed_new_parent() {
        let genesis = closed_genesis();
        let open = Ledger::successor_of(&genesis, Timestamp::new(1_010)).unwrap();
        let still_open = Ledger::successor_of(&genesis, Timestamp::new(1_011)).unwrap();

        assert!(matches!(
            open.switch_previous_ledger(&genesis, &still_open, 10),
            Err(LedgerError::NotClosed)
        ));
    }

    #[test]
    fn rebase_with_no_own_transactions_is_trivial() {
        let genesis = closed_genesis();
        let open = Ledger::successor_of(&genesis, Timestamp::new(1_010)).unwrap();

        let mut alternative = Ledger::successor_of(&genesis, Timestamp::new(1_011)).unwrap();
        alternative.close(Timestamp::new(1_020)).unwrap();

        let rebased = open
            .switch_previous_ledger(&genesis, &alternative, 0)
            .unwrap();
        assert_eq!(rebased.parent_hash(), alternative.identity_hash().unwrap());
        assert_eq!(rebased.transaction_map().leaf_count().unwrap(), 0);
    }
}
