//! Stateless transaction validation.
//!
//! Structural checks only. Stateful checks (sequence gaps, balance
//! sufficiency, the fee floor) are performed by the ledger when the
//! transaction is applied.

use crate::error::TransactionError;
use crate::{Transaction, TxPayload};

/// Validate a transaction's structure.
pub fn validate_transaction(tx: &Transaction) -> Result<(), TransactionError> {
    if tx.sequence() == 0 {
        return Err(TransactionError::ZeroSequence);
    }
    match tx.payload() {
        TxPayload::Payment {
            destination,
            amount,
        } => {
            if amount.is_zero() {
                return Err(TransactionError::ZeroAmount);
            }
            if *destination == tx.source() {
                return Err(TransactionError::SelfPayment);
            }
        }
        TxPayload::SetNickname { .. } => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_crypto::{derive_account_id, keypair_from_seed};
    use meridian_types::{AccountId, Amount, Hash256};

    #[test]
    fn valid_payment_passes() {
        let keys = keypair_from_seed(&[1u8; 32]);
        let tx = Transaction::payment(
            &keys,
            1,
            Amount::new(10),
            AccountId::new([0xBB; 20]),
            Amount::new(500),
        );
        assert!(validate_transaction(&tx).is_ok());
    }

    #[test]
    fn zero_amount_payment_fails() {
        let keys = keypair_from_seed(&[2u8; 32]);
        let tx = Transaction::payment(
            &keys,
            1,
            Amount::new(10),
            AccountId::new([0xBB; 20]),
            Amount::ZERO,
        );
        assert_eq!(
            validate_transaction(&tx),
            Err(TransactionError::ZeroAmount)
        );
    }

    #[test]
    fn self_payment_fails() {
        let keys = keypair_from_seed(&[3u8; 32]);
        let own_account = derive_account_id(&keys.public);
        let tx = Transaction::payment(&keys, 1, Amount::new(10), own_account, Amount::new(500));
        assert_eq!(
            validate_transaction(&tx),
            Err(TransactionError::SelfPayment)
        );
    }

    #[test]
    fn zero_sequence_fails() {
        let keys = keypair_from_seed(&[4u8; 32]);
        let tx = Transaction::payment(
            &keys,
            0,
            Amount::new(10),
            AccountId::new([0xBB; 20]),
            Amount::new(500),
        );
        assert_eq!(
            validate_transaction(&tx),
            Err(TransactionError::ZeroSequence)
        );
    }

    #[test]
    fn nickname_claim_passes() {
        let keys = keypair_from_seed(&[5u8; 32]);
        let tx = Transaction::set_nickname(&keys, 1, Amount::new(10), Hash256::new([7; 32]));
        assert!(validate_transaction(&tx).is_ok());
    }
}
