//! Ledger entries: the typed contents of account-state leaves.
//!
//! Every leaf of the account-state map is one [`LedgerEntry`] in a
//! canonical fixed-width encoding. Account roots carry the balance and
//! sequence the transaction state machine operates on; nickname entries
//! record name ownership.

use crate::error::LedgerError;
use crate::index::{account_root_index, nickname_index_from_hash};
use meridian_types::{AccountId, Amount, Hash256, TxSeq};

const ACCOUNT_ROOT_TAG: u8 = 1;
const NICKNAME_TAG: u8 = 2;

/// A single account's state in one ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountState {
    pub account: AccountId,
    /// Spendable drops. Never negative: debits go through checked
    /// subtraction behind the Insufficient pre-condition.
    pub balance: Amount,
    /// Sequence of the last successfully applied transaction from this
    /// account; the next valid claim is `sequence + 1`.
    pub sequence: TxSeq,
}

impl AccountState {
    /// A fresh account: zero balance, no transactions applied.
    pub fn new(account: AccountId) -> Self {
        Self {
            account,
            balance: Amount::ZERO,
            sequence: 0,
        }
    }

    pub fn with_balance(account: AccountId, balance: Amount) -> Self {
        Self {
            account,
            balance,
            sequence: 0,
        }
    }

    /// The tree key this account's state lives at.
    pub fn index(&self) -> Hash256 {
        account_root_index(&self.account)
    }
}

/// A typed account-state leaf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEntry {
    AccountRoot(AccountState),
    Nickname {
        nickname_hash: Hash256,
        owner: AccountId,
    },
}

impl LedgerEntry {
    /// The tree key this entry lives at.
    pub fn index(&self) -> Hash256 {
        match self {
            LedgerEntry::AccountRoot(state) => state.index(),
            LedgerEntry::Nickname { nickname_hash, .. } => {
                nickname_index_from_hash(nickname_hash)
            }
        }
    }

    /// Canonical fixed-width encoding (the leaf payload).
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            LedgerEntry::AccountRoot(state) => {
                let mut buf = Vec::with_capacity(33);
                buf.push(ACCOUNT_ROOT_TAG);
                buf.extend_from_slice(state.account.as_bytes());
                buf.extend_from_slice(&state.balance.drops().to_be_bytes());
                buf.extend_from_slice(&state.sequence.to_be_bytes());
                buf
            }
            LedgerEntry::Nickname {
                nickname_hash,
                owner,
            } => {
                let mut buf = Vec::with_capacity(53);
                buf.push(NICKNAME_TAG);
                buf.extend_from_slice(nickname_hash.as_bytes());
                buf.extend_from_slice(owner.as_bytes());
                buf
            }
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        let (&tag, rest) = bytes
            .split_first()
            .ok_or_else(|| LedgerError::BadEncoding("empty ledger entry".into()))?;
        match tag {
            ACCOUNT_ROOT_TAG => {
                if rest.len() != 32 {
                    return Err(LedgerError::BadEncoding(
                        "account root entry has wrong length".into(),
                    ));
                }
                let mut account = [0u8; 20];
                account.copy_from_slice(&rest[..20]);
                let mut balance = [0u8; 8];
                balance.copy_from_slice(&rest[20..28]);
                let mut sequence = [0u8; 4];
                sequence.copy_from_slice(&rest[28..32]);
                Ok(LedgerEntry::AccountRoot(AccountState {
                    account: AccountId::new(account),
                    balance: Amount::new(u64::from_be_bytes(balance)),
                    sequence: TxSeq::from_be_bytes(sequence),
                }))
            }
            NICKNAME_TAG => {
                if rest.len() != 52 {
                    return Err(LedgerError::BadEncoding(
                        "nickname entry has wrong length".into(),
                    ));
                }
                let mut nickname_hash = [0u8; 32];
                nickname_hash.copy_from_slice(&rest[..32]);
                let mut owner = [0u8; 20];
                owner.copy_from_slice(&rest[32..52]);
                Ok(LedgerEntry::Nickname {
                    nickname_hash: Hash256::new(nickname_hash),
                    owner: AccountId::new(owner),
                })
            }
            other => Err(LedgerError::BadEncoding(format!(
                "unknown ledger entry tag {other}"
            ))),
        }
    }

    pub fn as_account_root(&self) -> Option<&AccountState> {
        match self {
            LedgerEntry::AccountRoot(state) => Some(state),
            _ => None,
        }
    }
}

/// Lookup configuration: whether a missing slot should be synthesized as a
/// fresh, empty entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupMode {
    /// Report a missing slot as [`EntryLookup::Missing`].
    Peek,
    /// Synthesize and store a fresh entry when the slot is empty.
    CreateIfMissing,
}

/// Outcome of an entry lookup — distinct from the input configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryLookup {
    /// The slot held an entry of the requested family.
    Found(LedgerEntry),
    /// The slot was empty and a fresh entry was created.
    Created(LedgerEntry),
    /// The slot is empty.
    Missing,
    /// The slot holds an entry of a different family.
    WrongType,
    /// Descent blocked on a node awaiting fetch.
    Pending(Hash256),
}

/// Outcome of writing an entry back into the account-state tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryWrite {
    Created,
    Updated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_root_roundtrip() {
        let entry = LedgerEntry::AccountRoot(AccountState {
            account: AccountId::new([3; 20]),
            balance: Amount::new(42_000),
            sequence: 17,
        });
        let decoded = LedgerEntry::from_bytes(&entry.to_bytes()).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn nickname_roundtrip() {
        let entry = LedgerEntry::Nickname {
            nickname_hash: Hash256::new([9; 32]),
            owner: AccountId::new([4; 20]),
        };
        let decoded = LedgerEntry::from_bytes(&entry.to_bytes()).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn malformed_entries_are_rejected() {
        assert!(LedgerEntry::from_bytes(&[]).is_err());
        assert!(LedgerEntry::from_bytes(&[ACCOUNT_ROOT_TAG, 1, 2]).is_err());
        assert!(LedgerEntry::from_bytes(&[0xEE; 33]).is_err());
    }

    #[test]
    fn fresh_account_is_empty() {
        let state = AccountState::new(AccountId::new([1; 20]));
        assert!(state.balance.is_zero());
        assert_eq!(state.sequence, 0);
    }
}
