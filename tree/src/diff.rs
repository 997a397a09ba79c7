//! Lock-step structural comparison of two trees.
//!
//! The walk descends both trees together and skips any pair of subtrees
//! whose hashes already match, so the cost is proportional to the
//! difference, not the tree size. This is the primitive ledger
//! synchronization is built on: only differing branches are fetched.

use crate::error::TreeError;
use crate::node::{Child, NodeBody};
use meridian_types::Hash256;
use std::collections::BTreeMap;

/// How a leaf id differs between two trees.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffKind {
    /// Present in the left tree only.
    AddedHere,
    /// Present in the right tree only.
    AddedThere,
    /// Present in both with different payloads.
    Changed,
}

pub(crate) fn diff_children(
    left: &Child,
    right: &Child,
    out: &mut BTreeMap<Hash256, DiffKind>,
) -> Result<(), TreeError> {
    if left.hash() == right.hash() {
        return Ok(());
    }
    match (left, right) {
        (Child::Placeholder(hash), _) | (_, Child::Placeholder(hash)) => {
            Err(TreeError::Incomplete(*hash))
        }
        (Child::Empty, _) => report_all(right, DiffKind::AddedThere, out),
        (_, Child::Empty) => report_all(left, DiffKind::AddedHere, out),
        (Child::Node(left_node), Child::Node(right_node)) => {
            match (left_node.body(), right_node.body()) {
                (
                    NodeBody::Leaf { id: left_id, .. },
                    NodeBody::Leaf { id: right_id, .. },
                ) => {
                    if left_id == right_id {
                        // Same key, different hash: payload changed.
                        out.insert(*left_id, DiffKind::Changed);
                    } else {
                        out.insert(*left_id, DiffKind::AddedHere);
                        out.insert(*right_id, DiffKind::AddedThere);
                    }
                    Ok(())
                }
                (
                    NodeBody::Inner {
                        children: left_children,
                    },
                    NodeBody::Inner {
                        children: right_children,
                    },
                ) => {
                    for (left_child, right_child) in left_children.iter().zip(right_children) {
                        diff_children(left_child, right_child, out)?;
                    }
                    Ok(())
                }
                (NodeBody::Leaf { .. }, NodeBody::Inner { .. }) => {
                    diff_leaf_against_subtree(left, right, false, out)
                }
                (NodeBody::Inner { .. }, NodeBody::Leaf { .. }) => {
                    diff_leaf_against_subtree(right, left, true, out)
                }
            }
        }
    }
}

/// One side is a lone leaf, the other a whole subtree: every leaf of the
/// subtree is an addition on its side unless it shares the lone leaf's key,
/// in which case the pair is a change (or identical, and skipped).
fn diff_leaf_against_subtree(
    leaf: &Child,
    subtree: &Child,
    leaf_is_right: bool,
    out: &mut BTreeMap<Hash256, DiffKind>,
) -> Result<(), TreeError> {
    let Child::Node(leaf_node) = leaf else {
        return Err(TreeError::Malformed("expected a leaf node".into()));
    };
    let NodeBody::Leaf { id: leaf_id, .. } = leaf_node.body() else {
        return Err(TreeError::Malformed("expected a leaf node".into()));
    };
    let (leaf_side, subtree_side) = if leaf_is_right {
        (DiffKind::AddedThere, DiffKind::AddedHere)
    } else {
        (DiffKind::AddedHere, DiffKind::AddedThere)
    };

    let mut matched = false;
    visit_leaves(subtree, &mut |id, hash| {
        if id == *leaf_id {
            matched = true;
            if hash != leaf_node.hash() {
                out.insert(id, DiffKind::Changed);
            }
        } else {
            out.insert(id, subtree_side);
        }
    })?;
    if !matched {
        out.insert(*leaf_id, leaf_side);
    }
    Ok(())
}

fn report_all(
    child: &Child,
    kind: DiffKind,
    out: &mut BTreeMap<Hash256, DiffKind>,
) -> Result<(), TreeError> {
    visit_leaves(child, &mut |id, _| {
        out.insert(id, kind);
    })
}

fn visit_leaves(
    child: &Child,
    visit: &mut impl FnMut(Hash256, Hash256),
) -> Result<(), TreeError> {
    match child {
        Child::Empty => Ok(()),
        Child::Placeholder(hash) => Err(TreeError::Incomplete(*hash)),
        Child::Node(node) => match node.body() {
            NodeBody::Leaf { id, .. } => {
                visit(*id, node.hash());
                Ok(())
            }
            NodeBody::Inner { children } => {
                for child in children {
                    visit_leaves(child, visit)?;
                }
                Ok(())
            }
        },
    }
}
