//! Tree nodes: inner (16-way branch) and leaf, each carrying its canonical
//! hash.
//!
//! Nodes are immutable once constructed; their hash is computed exactly once
//! in the constructor. Mutating a tree therefore means building new nodes
//! along the root-to-leaf path while every untouched subtree is shared by
//! `Arc` — this is what makes cloning a tree O(1).

use crate::error::TreeError;
use meridian_crypto::sha512_half;
use meridian_types::Hash256;
use std::sync::Arc;

/// Maximum tree depth: 64 nibbles of a 256-bit key.
pub const MAX_DEPTH: usize = 64;

/// Wire/hash tag for inner nodes. Leaf kinds use their own tags.
const INNER_TAG: u8 = 0;

/// The payload type stored by a leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeafKind {
    /// Account-state entry (account-state map only).
    Account,
    /// Transaction by content hash (transaction map only).
    Transaction,
    /// Transaction plus application metadata (transaction map only).
    TransactionMeta,
}

impl LeafKind {
    /// Domain-separation tag, doubling as the wire tag.
    pub(crate) fn tag(self) -> u8 {
        match self {
            LeafKind::Account => 1,
            LeafKind::Transaction => 2,
            LeafKind::TransactionMeta => 3,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(LeafKind::Account),
            2 => Some(LeafKind::Transaction),
            3 => Some(LeafKind::TransactionMeta),
            _ => None,
        }
    }
}

/// One of an inner node's 16 child slots.
#[derive(Clone, Debug)]
pub enum Child {
    /// No child; hashes as `Hash256::ZERO`.
    Empty,
    /// A locally present child.
    Node(Arc<Node>),
    /// A child known only by hash, awaiting an out-of-band fetch.
    Placeholder(Hash256),
}

impl Child {
    pub fn hash(&self) -> Hash256 {
        match self {
            Child::Empty => Hash256::ZERO,
            Child::Node(node) => node.hash(),
            Child::Placeholder(hash) => *hash,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Child::Empty)
    }
}

/// A hash tree node with its canonical hash.
#[derive(Debug)]
pub struct Node {
    hash: Hash256,
    body: NodeBody,
}

/// Node contents.
#[derive(Debug)]
pub enum NodeBody {
    /// Branch node: up to 16 children, one per key nibble.
    Inner { children: [Child; 16] },
    /// Terminal node holding one item.
    Leaf {
        kind: LeafKind,
        id: Hash256,
        payload: Vec<u8>,
    },
}

pub(crate) fn empty_children() -> [Child; 16] {
    std::array::from_fn(|_| Child::Empty)
}

impl Node {
    /// Construct a leaf. Hash = sha512half(kind tag ‖ id ‖ payload).
    pub fn leaf(kind: LeafKind, id: Hash256, payload: Vec<u8>) -> Self {
        let mut buf = Vec::with_capacity(1 + 32 + payload.len());
        buf.push(kind.tag());
        buf.extend_from_slice(id.as_bytes());
        buf.extend_from_slice(&payload);
        Self {
            hash: sha512_half(&buf),
            body: NodeBody::Leaf { kind, id, payload },
        }
    }

    /// Construct an inner node. Hash = sha512half(inner tag ‖ 16 child
    /// hashes in slot order), absent children hashing as zero.
    pub fn inner(children: [Child; 16]) -> Self {
        let mut buf = Vec::with_capacity(1 + 16 * 32);
        buf.push(INNER_TAG);
        for child in &children {
            buf.extend_from_slice(child.hash().as_bytes());
        }
        Self {
            hash: sha512_half(&buf),
            body: NodeBody::Inner { children },
        }
    }

    pub fn hash(&self) -> Hash256 {
        self.hash
    }

    pub fn body(&self) -> &NodeBody {
        &self.body
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.body, NodeBody::Leaf { .. })
    }

    /// Serialize for peer transfer.
    ///
    /// Inner: `[0x00, present-bitmap u16 BE, 32-byte hash per present child]`.
    /// Leaf: `[kind tag, 32-byte id, payload]`.
    pub fn to_wire(&self) -> Vec<u8> {
        match &self.body {
            NodeBody::Inner { children } => {
                let mut bitmap: u16 = 0;
                for (i, child) in children.iter().enumerate() {
                    if !child.is_empty() {
                        bitmap |= 1 << i;
                    }
                }
                let mut buf = Vec::with_capacity(3 + 16 * 32);
                buf.push(INNER_TAG);
                buf.extend_from_slice(&bitmap.to_be_bytes());
                for child in children {
                    if !child.is_empty() {
                        buf.extend_from_slice(child.hash().as_bytes());
                    }
                }
                buf
            }
            NodeBody::Leaf { kind, id, payload } => {
                let mut buf = Vec::with_capacity(1 + 32 + payload.len());
                buf.push(kind.tag());
                buf.extend_from_slice(id.as_bytes());
                buf.extend_from_slice(payload);
                buf
            }
        }
    }

    /// Decode a wire-format node.
    ///
    /// Children of a decoded inner node come back as placeholders; the
    /// fetcher resolves them with further node requests. The hash is
    /// recomputed from the decoded contents, so a decoded node can always
    /// be verified against the hash it was requested under.
    pub fn from_wire(bytes: &[u8]) -> Result<Self, TreeError> {
        let (&tag, rest) = bytes
            .split_first()
            .ok_or_else(|| TreeError::Malformed("empty node encoding".into()))?;

        if tag == INNER_TAG {
            if rest.len() < 2 {
                return Err(TreeError::Malformed("inner node missing bitmap".into()));
            }
            let bitmap = u16::from_be_bytes([rest[0], rest[1]]);
            if bitmap == 0 {
                return Err(TreeError::Malformed("inner node with no children".into()));
            }
            let mut hashes = &rest[2..];
            let mut children = empty_children();
            for (i, slot) in children.iter_mut().enumerate() {
                if bitmap & (1 << i) == 0 {
                    continue;
                }
                if hashes.len() < 32 {
                    return Err(TreeError::Malformed("inner node truncated".into()));
                }
                let mut hash = [0u8; 32];
                hash.copy_from_slice(&hashes[..32]);
                *slot = Child::Placeholder(Hash256::new(hash));
                hashes = &hashes[32..];
            }
            if !hashes.is_empty() {
                return Err(TreeError::Malformed("inner node has trailing bytes".into()));
            }
            Ok(Node::inner(children))
        } else {
            let kind = LeafKind::from_tag(tag)
                .ok_or_else(|| TreeError::Malformed(format!("unknown node tag {tag}")))?;
            if rest.len() < 32 {
                return Err(TreeError::Malformed("leaf node missing id".into()));
            }
            let mut id = [0u8; 32];
            id.copy_from_slice(&rest[..32]);
            Ok(Node::leaf(kind, Hash256::new(id), rest[32..].to_vec()))
        }
    }
}
