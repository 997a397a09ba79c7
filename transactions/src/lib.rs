//! Signed transactions and their canonical binary encoding.
//!
//! A [`Transaction`] is immutable once constructed: its content hash is
//! computed exactly once, over the canonical fixed-order encoding, and is
//! the key under which the transaction lives in a ledger's transaction
//! tree. Stateless validation (structure, signature) lives here; stateful
//! checks (sequence, balance, fee floor) belong to the ledger's
//! application state machine.

pub mod error;
pub mod validation;

pub use error::TransactionError;
pub use validation::validate_transaction;

use meridian_crypto::{derive_account_id, sha512_half, sign_message, verify_signature};
use meridian_types::{AccountId, Amount, Hash256, KeyPair, PublicKey, Signature, TxSeq};

const PAYMENT_TAG: u8 = 1;
const SET_NICKNAME_TAG: u8 = 2;

/// Type-specific transaction content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxPayload {
    /// Move `amount` drops from the source to `destination`.
    Payment {
        destination: AccountId,
        amount: Amount,
    },
    /// Claim a nickname slot (keyed by the hash of the nickname string).
    SetNickname { nickname_hash: Hash256 },
}

impl TxPayload {
    fn tag(&self) -> u8 {
        match self {
            TxPayload::Payment { .. } => PAYMENT_TAG,
            TxPayload::SetNickname { .. } => SET_NICKNAME_TAG,
        }
    }
}

/// An immutable signed instruction.
///
/// Construct via [`Transaction::payment`] / [`Transaction::set_nickname`]
/// (sign-and-hash) or [`Transaction::from_canonical_bytes`] (decode). The
/// hash is never recomputed after construction.
#[derive(Clone, Debug)]
pub struct Transaction {
    hash: Hash256,
    source: AccountId,
    source_key: PublicKey,
    sequence: TxSeq,
    fee: Amount,
    payload: TxPayload,
    signature: Signature,
}

impl Transaction {
    /// Build and sign a payment.
    pub fn payment(
        keys: &KeyPair,
        sequence: TxSeq,
        fee: Amount,
        destination: AccountId,
        amount: Amount,
    ) -> Self {
        Self::new_signed(
            keys,
            sequence,
            fee,
            TxPayload::Payment {
                destination,
                amount,
            },
        )
    }

    /// Build and sign a nickname claim.
    pub fn set_nickname(keys: &KeyPair, sequence: TxSeq, fee: Amount, nickname_hash: Hash256) -> Self {
        Self::new_signed(keys, sequence, fee, TxPayload::SetNickname { nickname_hash })
    }

    fn new_signed(keys: &KeyPair, sequence: TxSeq, fee: Amount, payload: TxPayload) -> Self {
        let source = derive_account_id(&keys.public);
        let mut tx = Self {
            hash: Hash256::ZERO,
            source,
            source_key: keys.public.clone(),
            sequence,
            fee,
            payload,
            signature: Signature([0u8; 64]),
        };
        tx.signature = sign_message(&tx.signing_bytes(), &keys.private);
        tx.hash = sha512_half(&tx.to_canonical_bytes());
        tx
    }

    pub fn hash(&self) -> Hash256 {
        self.hash
    }

    pub fn source(&self) -> AccountId {
        self.source
    }

    pub fn source_key(&self) -> &PublicKey {
        &self.source_key
    }

    pub fn sequence(&self) -> TxSeq {
        self.sequence
    }

    pub fn fee(&self) -> Amount {
        self.fee
    }

    pub fn payload(&self) -> &TxPayload {
        &self.payload
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The fields covered by the signature, in canonical order.
    fn signing_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(97);
        buf.push(self.payload.tag());
        buf.extend_from_slice(self.source.as_bytes());
        buf.extend_from_slice(self.source_key.as_bytes());
        buf.extend_from_slice(&self.sequence.to_be_bytes());
        buf.extend_from_slice(&self.fee.drops().to_be_bytes());
        match &self.payload {
            TxPayload::Payment {
                destination,
                amount,
            } => {
                buf.extend_from_slice(destination.as_bytes());
                buf.extend_from_slice(&amount.drops().to_be_bytes());
            }
            TxPayload::SetNickname { nickname_hash } => {
                buf.extend_from_slice(nickname_hash.as_bytes());
            }
        }
        buf
    }

    /// The canonical encoding: signing fields followed by the signature.
    /// This is both the wire form and the hashing preimage.
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut buf = self.signing_bytes();
        buf.extend_from_slice(self.signature.as_bytes());
        buf
    }

    /// Decode the canonical encoding. The content hash is recomputed from
    /// the bytes; signature validity is NOT checked here — callers branch
    /// on [`Transaction::verify`] separately.
    pub fn from_canonical_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = Reader::new(bytes);
        let tag = reader.u8()?;
        let source = AccountId::new(reader.array::<20>()?);
        let source_key = PublicKey(reader.array::<32>()?);
        let sequence = TxSeq::from_be_bytes(reader.array::<4>()?);
        let fee = Amount::new(u64::from_be_bytes(reader.array::<8>()?));
        let payload = match tag {
            PAYMENT_TAG => TxPayload::Payment {
                destination: AccountId::new(reader.array::<20>()?),
                amount: Amount::new(u64::from_be_bytes(reader.array::<8>()?)),
            },
            SET_NICKNAME_TAG => TxPayload::SetNickname {
                nickname_hash: Hash256::new(reader.array::<32>()?),
            },
            other => return Err(TransactionError::UnknownPayloadTag(other)),
        };
        let signature = Signature(reader.array::<64>()?);
        reader.finish()?;

        Ok(Self {
            hash: sha512_half(bytes),
            source,
            source_key,
            sequence,
            fee,
            payload,
            signature,
        })
    }

    /// Signature and source-binding check: the Ed25519 signature must
    /// cover the signing bytes, and the claimed source account must be the
    /// one derived from the signing key.
    pub fn verify(&self) -> bool {
        self.source == derive_account_id(&self.source_key)
            && verify_signature(&self.signing_bytes(), &self.signature, &self.source_key)
    }
}

/// Bounds-checked cursor over the canonical encoding.
struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn u8(&mut self) -> Result<u8, TransactionError> {
        let (&first, rest) = self
            .bytes
            .split_first()
            .ok_or(TransactionError::Truncated)?;
        self.bytes = rest;
        Ok(first)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], TransactionError> {
        if self.bytes.len() < N {
            return Err(TransactionError::Truncated);
        }
        let (head, rest) = self.bytes.split_at(N);
        self.bytes = rest;
        let mut out = [0u8; N];
        out.copy_from_slice(head);
        Ok(out)
    }

    fn finish(&self) -> Result<(), TransactionError> {
        if self.bytes.is_empty() {
            Ok(())
        } else {
            Err(TransactionError::TrailingBytes(self.bytes.len()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_crypto::keypair_from_seed;

    fn dest() -> AccountId {
        AccountId::new([0xDD; 20])
    }

    #[test]
    fn payment_roundtrips_canonically() {
        let keys = keypair_from_seed(&[1u8; 32]);
        let tx = Transaction::payment(&keys, 1, Amount::new(10), dest(), Amount::new(1_000));
        let decoded = Transaction::from_canonical_bytes(&tx.to_canonical_bytes()).unwrap();
        assert_eq!(decoded.hash(), tx.hash());
        assert_eq!(decoded.sequence(), 1);
        assert_eq!(decoded.fee(), Amount::new(10));
        assert_eq!(decoded.payload(), tx.payload());
        assert!(decoded.verify());
    }

    #[test]
    fn nickname_roundtrips_canonically() {
        let keys = keypair_from_seed(&[2u8; 32]);
        let tx = Transaction::set_nickname(&keys, 3, Amount::new(10), Hash256::new([5; 32]));
        let decoded = Transaction::from_canonical_bytes(&tx.to_canonical_bytes()).unwrap();
        assert_eq!(decoded.hash(), tx.hash());
        assert!(decoded.verify());
    }

    #[test]
    fn hash_is_content_derived() {
        let keys = keypair_from_seed(&[3u8; 32]);
        let a = Transaction::payment(&keys, 1, Amount::new(10), dest(), Amount::new(100));
        let b = Transaction::payment(&keys, 1, Amount::new(10), dest(), Amount::new(100));
        let c = Transaction::payment(&keys, 2, Amount::new(10), dest(), Amount::new(100));
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn tampered_bytes_fail_verification() {
        let keys = keypair_from_seed(&[4u8; 32]);
        let tx = Transaction::payment(&keys, 1, Amount::new(10), dest(), Amount::new(100));
        let mut bytes = tx.to_canonical_bytes();
        // Flip a bit in the amount field.
        let amount_offset = 1 + 20 + 32 + 4 + 8 + 20;
        bytes[amount_offset] ^= 0x01;
        let decoded = Transaction::from_canonical_bytes(&bytes).unwrap();
        assert!(!decoded.verify());
        assert_ne!(decoded.hash(), tx.hash());
    }

    #[test]
    fn truncated_and_trailing_bytes_are_rejected() {
        let keys = keypair_from_seed(&[5u8; 32]);
        let bytes = Transaction::payment(&keys, 1, Amount::new(10), dest(), Amount::new(100))
            .to_canonical_bytes();
        assert!(matches!(
            Transaction::from_canonical_bytes(&bytes[..bytes.len() - 1]),
            Err(TransactionError::Truncated)
        ));
        let mut extended = bytes.clone();
        extended.push(0);
        assert!(matches!(
            Transaction::from_canonical_bytes(&extended),
            Err(TransactionError::TrailingBytes(1))
        ));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let keys = keypair_from_seed(&[6u8; 32]);
        let mut bytes = Transaction::payment(&keys, 1, Amount::new(10), dest(), Amount::new(100))
            .to_canonical_bytes();
        bytes[0] = 0x7F;
        assert!(matches!(
            Transaction::from_canonical_bytes(&bytes),
            Err(TransactionError::UnknownPayloadTag(0x7F))
        ));
    }

    #[test]
    fn forged_source_fails_verification() {
        let keys = keypair_from_seed(&[7u8; 32]);
        let tx = Transaction::payment(&keys, 1, Amount::new(10), dest(), Amount::new(100));
        let mut bytes = tx.to_canonical_bytes();
        // Overwrite the claimed source account; the key-derivation binding
        // must catch the mismatch even though the signature bytes are next
        // to the untouched signing key.
        bytes[1] ^= 0xFF;
        let decoded = Transaction::from_canonical_bytes(&bytes).unwrap();
        assert!(!decoded.verify());
    }
}
