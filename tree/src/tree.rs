//! The hash tree proper: structural mutation, fetch, sealing, and partial
//! materialization.

use crate::diff::{diff_children, DiffKind};
use crate::error::TreeError;
use crate::node::{empty_children, Child, LeafKind, Node, NodeBody, MAX_DEPTH};
use meridian_types::Hash256;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Which of a ledger's two maps a tree is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeKind {
    TransactionMap,
    AccountStateMap,
}

impl TreeKind {
    fn accepts(self, leaf: LeafKind) -> bool {
        match self {
            TreeKind::TransactionMap => {
                matches!(leaf, LeafKind::Transaction | LeafKind::TransactionMeta)
            }
            TreeKind::AccountStateMap => matches!(leaf, LeafKind::Account),
        }
    }
}

/// How much of the tree is locally present.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    /// Every reachable node is local.
    Complete,
    /// Some placeholders resolved so far, more outstanding.
    Synching { fetched: u64 },
    /// Known only by root hash; nothing fetched yet.
    Unsynchronized,
}

/// Result of an insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Created,
    Replaced,
}

/// Result of a removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    Missing,
}

/// Result of supplying a fetched node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupplyOutcome {
    /// The node filled at least one pending placeholder.
    Linked,
    /// Valid node, but nothing in this tree is waiting for it.
    Unrequested,
}

/// Borrowed view of a leaf.
#[derive(Clone, Copy, Debug)]
pub struct LeafView<'a> {
    pub kind: LeafKind,
    pub id: Hash256,
    pub payload: &'a [u8],
}

/// Result of a non-blocking fetch.
#[derive(Clone, Copy, Debug)]
pub enum Fetch<'a> {
    /// Leaf is locally present.
    Found(LeafView<'a>),
    /// No leaf under this key.
    Missing,
    /// Descent blocked on a node known only by hash; the caller must
    /// acquire it out-of-band and retry.
    Pending(Hash256),
}

impl<'a> Fetch<'a> {
    pub fn found(self) -> Option<LeafView<'a>> {
        match self {
            Fetch::Found(leaf) => Some(leaf),
            _ => None,
        }
    }
}

/// A radix-16 content-addressed tree keyed by 256-bit identifiers.
///
/// `Clone` is O(1): the root reference is shared and the first mutation
/// after a clone rebuilds only the mutated path.
#[derive(Clone, Debug)]
pub struct HashTree {
    kind: TreeKind,
    root: Child,
    status: SyncStatus,
    sealed: bool,
}

impl HashTree {
    /// A new, empty, fully local tree.
    pub fn new(kind: TreeKind) -> Self {
        Self {
            kind,
            root: Child::Empty,
            status: SyncStatus::Complete,
            sealed: false,
        }
    }

    /// A tree known only by its root hash; contents arrive via
    /// [`HashTree::supply_node`]. A zero root is the empty tree and is
    /// already complete.
    pub fn from_root_hash(kind: TreeKind, root: Hash256) -> Self {
        if root.is_zero() {
            Self::new(kind)
        } else {
            Self {
                kind,
                root: Child::Placeholder(root),
                status: SyncStatus::Unsynchronized,
                sealed: false,
            }
        }
    }

    pub fn kind(&self) -> TreeKind {
        self.kind
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn is_complete(&self) -> bool {
        self.status == SyncStatus::Complete
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Forbid all further mutation. Called when the owning ledger closes.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// An O(1) mutable copy sharing this tree's nodes.
    ///
    /// This is how a successor ledger inherits its parent's frozen trees:
    /// the copy starts from the same root and the first mutation rebuilds
    /// only the mutated path, leaving the sealed original untouched.
    pub fn clone_unsealed(&self) -> Self {
        let mut copy = self.clone();
        copy.sealed = false;
        copy
    }

    /// The canonical root hash: zero for the empty tree, otherwise the
    /// root node's content hash. O(1) — node hashes are computed at
    /// construction.
    pub fn root_hash(&self) -> Hash256 {
        self.root.hash()
    }

    /// Add or overwrite the leaf at `id`.
    pub fn insert(
        &mut self,
        id: Hash256,
        payload: Vec<u8>,
        kind: LeafKind,
    ) -> Result<InsertOutcome, TreeError> {
        if self.sealed {
            return Err(TreeError::Sealed);
        }
        if !self.kind.accepts(kind) {
            return Err(TreeError::KindMismatch);
        }
        let leaf = Arc::new(Node::leaf(kind, id, payload));
        let (new_root, outcome) = insert_child(&self.root, 0, id, kind, &leaf)?;
        self.root = new_root;
        Ok(outcome)
    }

    /// Remove the leaf at `id`, pruning and collapsing emptied branches so
    /// the tree stays canonical.
    pub fn remove(&mut self, id: &Hash256) -> Result<RemoveOutcome, TreeError> {
        if self.sealed {
            return Err(TreeError::Sealed);
        }
        let (new_root, outcome) = remove_child(&self.root, 0, id)?;
        if outcome == RemoveOutcome::Removed {
            self.root = new_root;
        }
        Ok(outcome)
    }

    /// Non-blocking lookup of the leaf at `id`.
    pub fn fetch(&self, id: &Hash256) -> Fetch<'_> {
        let mut current = &self.root;
        let mut depth = 0;
        loop {
            match current {
                Child::Empty => return Fetch::Missing,
                Child::Placeholder(hash) => return Fetch::Pending(*hash),
                Child::Node(node) => match node.body() {
                    NodeBody::Leaf {
                        kind,
                        id: leaf_id,
                        payload,
                    } => {
                        return if leaf_id == id {
                            Fetch::Found(LeafView {
                                kind: *kind,
                                id: *leaf_id,
                                payload,
                            })
                        } else {
                            Fetch::Missing
                        };
                    }
                    NodeBody::Inner { children } => {
                        current = &children[id.nibble(depth) as usize];
                        depth += 1;
                    }
                },
            }
        }
    }

    /// All leaves in key order. Requires a complete tree.
    pub fn leaves(&self) -> Result<Vec<LeafView<'_>>, TreeError> {
        let mut out = Vec::new();
        collect_leaves(&self.root, &mut out)?;
        Ok(out)
    }

    /// Number of leaves. Requires a complete tree.
    pub fn leaf_count(&self) -> Result<usize, TreeError> {
        self.leaves().map(|l| l.len())
    }

    /// Structural comparison against `other`: every leaf id present or
    /// changed on either side, with subtrees of equal hash skipped
    /// entirely. Both trees must be complete and of the same map kind.
    pub fn diff(&self, other: &HashTree) -> Result<BTreeMap<Hash256, DiffKind>, TreeError> {
        if self.kind != other.kind {
            return Err(TreeError::KindMismatch);
        }
        let mut out = BTreeMap::new();
        diff_children(&self.root, &other.root, &mut out)?;
        Ok(out)
    }

    /// Hashes of up to `max` placeholder nodes still awaiting fetch.
    pub fn missing_nodes(&self, max: usize) -> Vec<Hash256> {
        let mut out = Vec::new();
        collect_placeholders(&self.root, max, &mut out);
        out
    }

    /// Serve the wire encoding of a locally present node, by hash. This is
    /// the answering side of [`HashTree::supply_node`]: a peer asks for a
    /// hash, this tree hands back the bytes.
    pub fn node_wire(&self, hash: &Hash256) -> Option<Vec<u8>> {
        find_node_wire(&self.root, hash)
    }

    /// Resolve the placeholder for `expected` with a node received from a
    /// peer. The wire bytes are decoded and re-hashed; bytes that do not
    /// hash to `expected` are rejected loudly, since they indicate
    /// corruption or a misbehaving peer.
    pub fn supply_node(
        &mut self,
        expected: Hash256,
        bytes: &[u8],
    ) -> Result<SupplyOutcome, TreeError> {
        let node = Node::from_wire(bytes)?;
        if node.hash() != expected {
            tracing::warn!(%expected, actual = %node.hash(), "rejecting node with bad hash");
            return Err(TreeError::HashMismatch {
                expected,
                actual: node.hash(),
            });
        }
        let node = Arc::new(node);
        let (new_root, linked) = link_placeholder(&self.root, &expected, &node);
        if !linked {
            return Ok(SupplyOutcome::Unrequested);
        }
        self.root = new_root;
        let fetched = match self.status {
            SyncStatus::Synching { fetched } => fetched + 1,
            _ => 1,
        };
        self.status = if self.missing_nodes(1).is_empty() {
            SyncStatus::Complete
        } else {
            SyncStatus::Synching { fetched }
        };
        Ok(SupplyOutcome::Linked)
    }
}

fn insert_child(
    child: &Child,
    depth: usize,
    id: Hash256,
    kind: LeafKind,
    leaf: &Arc<Node>,
) -> Result<(Child, InsertOutcome), TreeError> {
    match child {
        Child::Empty => Ok((Child::Node(leaf.clone()), InsertOutcome::Created)),
        Child::Placeholder(hash) => Err(TreeError::Incomplete(*hash)),
        Child::Node(node) => match node.body() {
            NodeBody::Leaf {
                kind: existing_kind,
                id: existing_id,
                ..
            } => {
                if *existing_id == id {
                    if *existing_kind != kind {
                        return Err(TreeError::WrongType { id });
                    }
                    return Ok((Child::Node(leaf.clone()), InsertOutcome::Replaced));
                }
                // Key collision at this depth: push the resident leaf one
                // level down, then retry the insert against the new branch.
                // Distinct keys always diverge within 64 nibbles, so the
                // depth check can only fire on a corrupted key.
                if depth >= MAX_DEPTH {
                    return Err(TreeError::DepthExceeded);
                }
                let mut children = empty_children();
                children[existing_id.nibble(depth) as usize] = Child::Node(node.clone());
                let branch = Child::Node(Arc::new(Node::inner(children)));
                insert_child(&branch, depth, id, kind, leaf)
            }
            NodeBody::Inner { children } => {
                let slot = id.nibble(depth) as usize;
                let (new_child, outcome) = insert_child(&children[slot], depth + 1, id, kind, leaf)?;
                let mut new_children = children.clone();
                new_children[slot] = new_child;
                Ok((Child::Node(Arc::new(Node::inner(new_children))), outcome))
            }
        },
    }
}

fn remove_child(
    child: &Child,
    depth: usize,
    id: &Hash256,
) -> Result<(Child, RemoveOutcome), TreeError> {
    match child {
        Child::Empty => Ok((Child::Empty, RemoveOutcome::Missing)),
        Child::Placeholder(hash) => Err(TreeError::Incomplete(*hash)),
        Child::Node(node) => match node.body() {
            NodeBody::Leaf { id: existing_id, .. } => {
                if existing_id == id {
                    Ok((Child::Empty, RemoveOutcome::Removed))
                } else {
                    Ok((child.clone(), RemoveOutcome::Missing))
                }
            }
            NodeBody::Inner { children } => {
                let slot = id.nibble(depth) as usize;
                let (new_child, outcome) = remove_child(&children[slot], depth + 1, id)?;
                if outcome == RemoveOutcome::Missing {
                    return Ok((child.clone(), RemoveOutcome::Missing));
                }
                let mut new_children = children.clone();
                new_children[slot] = new_child;
                Ok((collapse(new_children), RemoveOutcome::Removed))
            }
        },
    }
}

/// Rebuild an inner node after a removal, keeping the tree canonical: an
/// emptied branch disappears and a branch holding a single local leaf
/// lifts that leaf up a level.
fn collapse(children: [Child; 16]) -> Child {
    let mut non_empty = children.iter().filter(|c| !c.is_empty());
    let first = non_empty.next();
    let second = non_empty.next();
    match (first, second) {
        (None, _) => Child::Empty,
        (Some(Child::Node(node)), None) if node.is_leaf() => Child::Node(node.clone()),
        _ => Child::Node(Arc::new(Node::inner(children))),
    }
}

fn collect_leaves<'a>(child: &'a Child, out: &mut Vec<LeafView<'a>>) -> Result<(), TreeError> {
    match child {
        Child::Empty => Ok(()),
        Child::Placeholder(hash) => Err(TreeError::Incomplete(*hash)),
        Child::Node(node) => match node.body() {
            NodeBody::Leaf { kind, id, payload } => {
                out.push(LeafView {
                    kind: *kind,
                    id: *id,
                    payload,
                });
                Ok(())
            }
            NodeBody::Inner { children } => {
                for child in children {
                    collect_leaves(child, out)?;
                }
                Ok(())
            }
        },
    }
}

fn collect_placeholders(child: &Child, max: usize, out: &mut Vec<Hash256>) {
    if out.len() >= max {
        return;
    }
    match child {
        Child::Empty => {}
        Child::Placeholder(hash) => out.push(*hash),
        Child::Node(node) => {
            if let NodeBody::Inner { children } = node.body() {
                for child in children {
                    collect_placeholders(child, max, out);
                }
            }
        }
    }
}

fn find_node_wire(child: &Child, target: &Hash256) -> Option<Vec<u8>> {
    match child {
        Child::Empty | Child::Placeholder(_) => None,
        Child::Node(node) => {
            if node.hash() == *target {
                return Some(node.to_wire());
            }
            if let NodeBody::Inner { children } = node.body() {
                for child in children {
                    if let Some(bytes) = find_node_wire(child, target) {
                        return Some(bytes);
                    }
                }
            }
            None
        }
    }
}

fn link_placeholder(child: &Child, target: &Hash256, node: &Arc<Node>) -> (Child, bool) {
    match child {
        Child::Empty => (Child::Empty, false),
        Child::Placeholder(hash) => {
            if hash == target {
                (Child::Node(node.clone()), true)
            } else {
                (child.clone(), false)
            }
        }
        Child::Node(existing) => match existing.body() {
            NodeBody::Leaf { .. } => (child.clone(), false),
            NodeBody::Inner { children } => {
                let mut linked = false;
                let mut new_children = children.clone();
                for slot in new_children.iter_mut() {
                    let (new_child, did_link) = link_placeholder(slot, target, node);
                    if did_link {
                        *slot = new_child;
                        linked = true;
                    }
                }
                if linked {
                    (Child::Node(Arc::new(Node::inner(new_children))), true)
                } else {
                    (child.clone(), false)
                }
            }
        },
    }
}
