// Copyright (c) 2026-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A generic m-ary tree node shared by the TSVQ bootstrap tree, the
//! optional KTree bootstrap, and the streaming EM-tree.
//!
//! The source expresses a node as two parallel arrays (keys, children)
//! where a node is a leaf iff every child slot is null, plus a boolean
//! flag tracking key ownership for manual memory management. Rust's
//! ownership model makes the flag unnecessary; instead of a nullable
//! children array we use a sum type so a leaf cannot even syntactically
//! hold children.

use std::collections::HashSet;

/// An m-ary tree node over key type `K`.
///
/// `Leaf` and `Internal` both hold a `keys` array of length `n ≤ m`
/// (the tree order is enforced by callers, not this type). `Internal`
/// additionally holds a `children` array of the same length, where
/// `children[i]` is the subtree rooted under `keys[i]`.
#[derive(Debug)]
pub enum Node<K> {
    Leaf {
        keys: Vec<K>,
        pending_removals: Vec<usize>,
    },
    Internal {
        keys: Vec<K>,
        children: Vec<Node<K>>,
        pending_removals: Vec<usize>,
    },
}

impl<K> Node<K> {
    #[must_use]
    pub fn new_leaf() -> Self {
        Node::Leaf {
            keys: Vec::new(),
            pending_removals: Vec::new(),
        }
    }

    #[must_use]
    pub fn new_internal() -> Self {
        Node::Internal {
            keys: Vec::new(),
            children: Vec::new(),
            pending_removals: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.keys().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    #[must_use]
    pub fn keys(&self) -> &[K] {
        match self {
            Node::Leaf { keys, .. } | Node::Internal { keys, .. } => keys,
        }
    }

    pub fn keys_mut(&mut self) -> &mut Vec<K> {
        match self {
            Node::Leaf { keys, .. } | Node::Internal { keys, .. } => keys,
        }
    }

    #[must_use]
    pub fn key(&self, i: usize) -> &K {
        &self.keys()[i]
    }

    pub fn key_mut(&mut self, i: usize) -> &mut K {
        &mut self.keys_mut()[i]
    }

    /// Children of this node, or an empty slice if this is a leaf.
    #[must_use]
    pub fn children(&self) -> &[Node<K>] {
        match self {
            Node::Leaf { .. } => &[],
            Node::Internal { children, .. } => children,
        }
    }

    /// Mutable children of this node, or an empty slice if this is a leaf.
    pub fn children_mut(&mut self) -> &mut [Node<K>] {
        match self {
            Node::Leaf { .. } => &mut [],
            Node::Internal { children, .. } => children,
        }
    }

    /// # Panics
    ///
    /// Panics if called on a leaf.
    #[must_use]
    pub fn child(&self, i: usize) -> &Node<K> {
        match self {
            Node::Internal { children, .. } => &children[i],
            Node::Leaf { .. } => panic!("leaf node has no children"),
        }
    }

    /// # Panics
    ///
    /// Panics if called on a leaf.
    pub fn child_mut(&mut self, i: usize) -> &mut Node<K> {
        match self {
            Node::Internal { children, .. } => &mut children[i],
            Node::Leaf { .. } => panic!("leaf node has no children"),
        }
    }

    /// Appends a bare key to a leaf node.
    ///
    /// # Panics
    ///
    /// Panics if called on an internal node.
    pub fn add_leaf_key(&mut self, key: K) {
        match self {
            Node::Leaf { keys, .. } => keys.push(key),
            Node::Internal { .. } => panic!("cannot add a bare key to an internal node"),
        }
    }

    /// Appends a `(key, child)` pair to an internal node.
    ///
    /// # Panics
    ///
    /// Panics if called on a leaf node.
    pub fn add_child(&mut self, key: K, child: Node<K>) {
        match self {
            Node::Internal { keys, children, .. } => {
                keys.push(key);
                children.push(child);
            }
            Node::Leaf { .. } => panic!("cannot add a child to a leaf node"),
        }
    }

    /// Marks index `i` for removal. Does not compact; call
    /// [`Node::finalize_removals`] once the traversal over this node's
    /// entries is done.
    pub fn remove(&mut self, i: usize) {
        match self {
            Node::Leaf {
                pending_removals, ..
            }
            | Node::Internal {
                pending_removals, ..
            } => pending_removals.push(i),
        }
    }

    /// Compacts out every index marked by [`Node::remove`] since the last
    /// call, preserving relative order. Returns the number of entries
    /// removed.
    pub fn finalize_removals(&mut self) -> usize {
        match self {
            Node::Leaf {
                keys,
                pending_removals,
            } => {
                if pending_removals.is_empty() {
                    return 0;
                }
                let remove: HashSet<usize> = pending_removals.drain(..).collect();
                let removed_count = remove.len();
                let kept: Vec<K> = keys
                    .drain(..)
                    .enumerate()
                    .filter(|(i, _)| !remove.contains(i))
                    .map(|(_, k)| k)
                    .collect();
                *keys = kept;
                removed_count
            }
            Node::Internal {
                keys,
                children,
                pending_removals,
            } => {
                if pending_removals.is_empty() {
                    return 0;
                }
                let remove: HashSet<usize> = pending_removals.drain(..).collect();
                let removed_count = remove.len();
                let mut new_keys = Vec::with_capacity(keys.len());
                let mut new_children = Vec::with_capacity(children.len());
                for (i, (k, c)) in keys.drain(..).zip(children.drain(..)).enumerate() {
                    if !remove.contains(&i) {
                        new_keys.push(k);
                        new_children.push(c);
                    }
                }
                *keys = new_keys;
                *children = new_children;
                removed_count
            }
        }
    }

    /// Empties out keys (and children, if internal), leaving the node
    /// structurally intact but with size 0. Used by `KTree` node splits to
    /// reuse the original node allocation as one half of the split.
    pub fn clear_keys_and_children(&mut self) {
        match self {
            Node::Leaf {
                keys,
                pending_removals,
            } => {
                keys.clear();
                pending_removals.clear();
            }
            Node::Internal {
                keys,
                children,
                pending_removals,
            } => {
                keys.clear();
                children.clear();
                pending_removals.clear();
            }
        }
    }

    /// Takes ownership of this node's keys, leaving an empty vec behind.
    pub fn take_keys(&mut self) -> Vec<K> {
        match self {
            Node::Leaf { keys, .. } | Node::Internal { keys, .. } => std::mem::take(keys),
        }
    }

    /// Takes ownership of this node's children, leaving an empty vec
    /// behind. Always empty for a leaf.
    pub fn take_children(&mut self) -> Vec<Node<K>> {
        match self {
            Node::Leaf { .. } => Vec::new(),
            Node::Internal { children, .. } => std::mem::take(children),
        }
    }
}
