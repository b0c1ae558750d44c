// Copyright (c) 2026-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! An incremental, B-tree-like centroid tree: insertion descends via
//! nearest centroid, and an overflowing leaf is split in two via 2-means.
//!
//! `KTree` is an alternative bootstrap to TSVQ; it is never used on
//! the streaming path. Kept because building a `StreamingEMTree` only
//! requires *some* m-ary centroid tree to deep-copy, and a driver may
//! prefer incremental bootstrap construction over TSVQ's batch recursion.

use crate::kmeans::KMeans;
use crate::node::Node;
use crate::optimizer::Optimizer;
use crate::vector::Vector;

struct SplitResult {
    key1: Vector,
    key2: Vector,
    child2: Node<Vector>,
}

/// Incremental centroid tree of order `m`.
pub struct KTree {
    root: Node<Vector>,
    m: usize,
    clusterer: KMeans,
    optimizer: Optimizer,
    added: usize,
    delayed_updates: bool,
    update_delay: usize,
}

impl KTree {
    #[must_use]
    pub fn new(order: usize, clusterer_max_iters: i64) -> Self {
        let mut clusterer = KMeans::new(2, clusterer_max_iters, true);
        clusterer.set_enforce_num_clusters(true);
        Self {
            root: Node::new_leaf(),
            m: order,
            clusterer,
            optimizer: Optimizer,
            added: 0,
            delayed_updates: false,
            update_delay: 1000,
        }
    }

    pub fn set_update_delay(&mut self, update_delay: usize) {
        self.update_delay = update_delay;
    }

    pub fn set_delayed_updates(&mut self, delayed_updates: bool) {
        self.delayed_updates = delayed_updates;
    }

    /// Inserts `obj`, cascading leaf/internal splits up to (and possibly
    /// including) the root.
    pub fn add(&mut self, obj: Vector) {
        let result = push_down(
            &mut self.root,
            obj,
            self.m,
            &mut self.clusterer,
            &self.optimizer,
            self.delayed_updates,
            self.update_delay,
            self.added,
        );

        if let Some(SplitResult { key1, key2, child2 }) = result {
            let old_root = std::mem::replace(&mut self.root, Node::new_internal());
            self.root.add_child(key1, old_root);
            self.root.add_child(key2, child2);
        }

        self.added += 1;
    }

    /// The underlying centroid tree, suitable as input to
    /// [`crate::emtree::StreamingEMTree::new`] in place of a
    /// [`crate::tsvq::build`] tree.
    #[must_use]
    pub fn as_bootstrap(&self) -> &Node<Vector> {
        &self.root
    }

    #[must_use]
    pub fn get_obj_count(&self) -> u64 {
        obj_count(&self.root)
    }

    #[must_use]
    pub fn get_level_count(&self) -> usize {
        level_count(&self.root)
    }

    /// Counts non-empty leaves in the whole tree.
    #[must_use]
    pub fn get_cluster_count(&self) -> usize {
        cluster_count_total(&self.root)
    }

    /// Counts non-empty children at `depth` levels below the root.
    /// Unlike [`crate::emtree::StreamingEMTree::get_cluster_count`], this
    /// excludes empty children (per the design notes, both behaviours
    /// are intentional and preserved under their respective types).
    #[must_use]
    pub fn get_cluster_count_at(&self, depth: usize) -> usize {
        cluster_count_at(&self.root, depth)
    }

    #[must_use]
    pub fn get_empty_cluster_count(&self) -> usize {
        empty_cluster_count(&self.root)
    }

    /// Removes children whose subtree is structurally empty, bottom-up.
    /// Returns the number of entries removed.
    pub fn prune(&mut self) -> usize {
        prune(&mut self.root)
    }

    /// Re-means every internal key from its children's current keys
    /// (weighted by subtree object count for internal children), working
    /// bottom-up.
    pub fn rebuild_internal(&mut self) {
        let level_count = self.get_level_count();
        for depth in (1..level_count).rev() {
            rebuild_internal_at(&mut self.root, depth, &self.optimizer);
        }
    }

    #[must_use]
    pub fn rmse(&self) -> f64 {
        let count = self.get_obj_count();
        if count == 0 {
            return 0.0;
        }
        let sse = sum_squared_error(None, &self.root, &self.optimizer);
        (sse / count as f64).sqrt()
    }
}

#[allow(clippy::too_many_arguments)]
fn push_down(
    node: &mut Node<Vector>,
    obj: Vector,
    m: usize,
    clusterer: &mut KMeans,
    optimizer: &Optimizer,
    delayed_updates: bool,
    update_delay: usize,
    added: usize,
) -> Option<SplitResult> {
    if node.is_leaf() {
        if node.size() >= m {
            Some(split_leaf_node(node, obj, clusterer))
        } else {
            node.add_leaf_key(obj);
            None
        }
    } else {
        let idx = optimizer.nearest(&obj, node.keys()).index;
        let child_result = push_down(
            node.child_mut(idx),
            obj,
            m,
            clusterer,
            optimizer,
            delayed_updates,
            update_delay,
            added,
        );

        match child_result {
            Some(SplitResult { mut key1, key2, child2 }) => {
                update_prototype_from_child(optimizer, node.child(idx), &mut key1);
                *node.key_mut(idx) = key1;

                if node.size() >= m {
                    Some(split_internal_node(node, child2, key2, clusterer))
                } else {
                    node.add_child(key2, child2);
                    None
                }
            }
            None => {
                if !delayed_updates || added % update_delay.max(1) == 0 {
                    let mut key = node.key(idx).clone();
                    update_prototype_from_child(optimizer, node.child(idx), &mut key);
                    *node.key_mut(idx) = key;
                }
                None
            }
        }
    }
}

/// Re-means `key` from `child`'s current keys. Internal children weight
/// by subtree object count; leaves use uniform weight (i.e. a plain mean
/// over data vectors).
fn update_prototype_from_child(optimizer: &Optimizer, child: &Node<Vector>, key: &mut Vector) {
    let weights: Vec<f64> = if child.is_leaf() {
        Vec::new()
    } else {
        child.children().iter().map(|c| obj_count(c) as f64).collect()
    };
    let refs: Vec<&Vector> = child.keys().iter().collect();
    optimizer.update_prototype(key, &refs, &weights);
}

fn split_leaf_node(node: &mut Node<Vector>, obj: Vector, clusterer: &mut KMeans) -> SplitResult {
    let mut temp_keys = node.take_keys();
    temp_keys.push(obj);
    node.clear_keys_and_children();

    clusterer.set_num_clusters(2);
    let refs: Vec<&Vector> = temp_keys.iter().collect();
    let result = clusterer.run(&refs);
    assert_eq!(result.clusters.len(), 2, "2-means with enforcement must yield 2 clusters");

    let mut node2 = Node::new_leaf();
    for &i in &result.clusters[0].members {
        node.add_leaf_key(temp_keys[i].clone());
    }
    for &i in &result.clusters[1].members {
        node2.add_leaf_key(temp_keys[i].clone());
    }

    SplitResult {
        key1: result.clusters[0].centroid.clone(),
        key2: result.clusters[1].centroid.clone(),
        child2: node2,
    }
}

fn split_internal_node(
    node: &mut Node<Vector>,
    child2: Node<Vector>,
    key2: Vector,
    clusterer: &mut KMeans,
) -> SplitResult {
    let mut temp_keys = node.take_keys();
    let mut temp_children: Vec<Option<Node<Vector>>> =
        node.take_children().into_iter().map(Some).collect();
    temp_keys.push(key2);
    temp_children.push(Some(child2));
    node.clear_keys_and_children();

    clusterer.set_num_clusters(2);
    let refs: Vec<&Vector> = temp_keys.iter().collect();
    let result = clusterer.run(&refs);
    assert_eq!(result.clusters.len(), 2, "2-means with enforcement must yield 2 clusters");

    let mut node2 = Node::new_internal();
    for &i in &result.clusters[0].members {
        node.add_child(temp_keys[i].clone(), temp_children[i].take().expect("member visited twice"));
    }
    for &i in &result.clusters[1].members {
        node2.add_child(temp_keys[i].clone(), temp_children[i].take().expect("member visited twice"));
    }

    SplitResult {
        key1: result.clusters[0].centroid.clone(),
        key2: result.clusters[1].centroid.clone(),
        child2: node2,
    }
}

fn obj_count(node: &Node<Vector>) -> u64 {
    if node.is_leaf() {
        node.size() as u64
    } else {
        node.children().iter().map(obj_count).sum()
    }
}

fn level_count(node: &Node<Vector>) -> usize {
    if node.is_leaf() {
        1
    } else {
        1 + level_count(node.child(0))
    }
}

fn cluster_count_total(node: &Node<Vector>) -> usize {
    if node.is_leaf() {
        usize::from(!node.is_empty())
    } else {
        node.children().iter().map(cluster_count_total).sum()
    }
}

fn cluster_count_at(node: &Node<Vector>, depth: usize) -> usize {
    if depth == 1 {
        node.children().iter().filter(|c| !c.is_empty()).count()
    } else {
        node.children().iter().map(|c| cluster_count_at(c, depth - 1)).sum()
    }
}

fn empty_cluster_count(node: &Node<Vector>) -> usize {
    if node.is_leaf() {
        usize::from(node.is_empty())
    } else {
        node.children().iter().map(empty_cluster_count).sum()
    }
}

fn prune(node: &mut Node<Vector>) -> usize {
    if node.is_leaf() {
        return 0;
    }
    let mut pruned = 0;
    let n = node.size();
    for i in 0..n {
        if node.child(i).is_empty() {
            node.remove(i);
            pruned += 1;
        } else {
            pruned += prune(node.child_mut(i));
        }
    }
    node.finalize_removals();
    pruned
}

fn rebuild_internal_at(node: &mut Node<Vector>, depth: usize, optimizer: &Optimizer) {
    if node.is_leaf() {
        return;
    }
    let n = node.size();
    if depth == 1 {
        for i in 0..n {
            let mut key = node.key(i).clone();
            update_prototype_from_child(optimizer, node.child(i), &mut key);
            *node.key_mut(i) = key;
        }
    } else {
        for i in 0..n {
            rebuild_internal_at(node.child_mut(i), depth - 1, optimizer);
        }
    }
}

fn sum_squared_error(parent_key: Option<&Vector>, node: &Node<Vector>, optimizer: &Optimizer) -> f64 {
    if node.is_leaf() {
        match parent_key {
            Some(key) => {
                let refs: Vec<&Vector> = node.keys().iter().collect();
                optimizer.sum_squared_error(key, &refs)
            }
            None => 0.0,
        }
    } else {
        (0..node.size())
            .map(|i| sum_squared_error(Some(node.key(i)), node.child(i), optimizer))
            .sum()
    }
}
