// Copyright (c) 2026-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The streaming EM-tree: an accumulator-augmented m-ary centroid
//! tree, deep-copied from a TSVQ (or KTree) bootstrap with its leaf level
//! discarded. Unlike [`crate::tsvq`] or [`crate::ktree`], which store
//! whole vectors at a boundary, this tree never retains the objects that
//! pass through it — only running sums.
//!
//! A full iteration against a tree `t` looks like:
//!
//! ```ignore
//! for object in corpus {
//!     t.insert(&object);
//! }
//! t.prune();
//! let rmse = t.rmse();
//! t.update();
//! t.clear_accumulators();
//! ```

use crate::node::Node;
use crate::optimizer::{Keyed, Optimizer};
use crate::vector::Vector;
use crate::visitor::{ClusterVisitor, InsertVisitor};
use std::sync::Mutex;

/// Per-leaf running statistics, guarded by [`AccumulatorKey`]'s mutex.
///
/// `accumulator` is a component-wise sum of every object routed to this
/// key since the last [`StreamingEMTree::clear_accumulators`]; `count` is
/// how many objects contributed to that sum.
struct LeafState {
    sum_squared_error: f64,
    accumulator: Vector,
    count: u64,
}

/// The key type living inside a [`StreamingEMTree`] node.
///
/// Internal-level keys carry only `key`; leaf-level keys additionally
/// carry a [`LeafState`] behind a mutex, allocated once at deep-copy time
/// and mutated under lock during `insert`/`visit_stream`.
pub struct AccumulatorKey {
    key: Vector,
    leaf: Option<Mutex<LeafState>>,
}

impl AccumulatorKey {
    fn new_leaf(key: Vector) -> Self {
        let dimensions = key.len();
        Self {
            key,
            leaf: Some(Mutex::new(LeafState {
                sum_squared_error: 0.0,
                accumulator: Vector::new(dimensions),
                count: 0,
            })),
        }
    }

    fn new_internal(key: Vector) -> Self {
        Self { key, leaf: None }
    }

    /// The current centroid.
    #[must_use]
    pub fn key(&self) -> &Vector {
        &self.key
    }

    /// Number of objects accumulated since the last
    /// [`StreamingEMTree::clear_accumulators`]. `0` for internal keys.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.leaf.as_ref().map_or(0, |m| m.lock().unwrap().count)
    }

    /// Running sum of squared distances from inserted objects to `key`,
    /// accumulated during the preceding insert pass. `0.0` for internal
    /// keys.
    #[must_use]
    pub fn sum_squared_error(&self) -> f64 {
        self.leaf.as_ref().map_or(0.0, |m| m.lock().unwrap().sum_squared_error)
    }

}

impl Clone for AccumulatorKey {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            leaf: self.leaf.as_ref().map(|m| {
                let state = m.lock().unwrap();
                Mutex::new(LeafState {
                    sum_squared_error: state.sum_squared_error,
                    accumulator: state.accumulator.clone(),
                    count: state.count,
                })
            }),
        }
    }
}

impl std::fmt::Debug for AccumulatorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccumulatorKey")
            .field("key", &self.key)
            .field("count", &self.count())
            .finish()
    }
}

impl Keyed for AccumulatorKey {
    fn vector(&self) -> &Vector {
        &self.key
    }
}

/// An accumulator-augmented centroid tree built by deep-copying a
/// bootstrap m-ary tree and discarding its leaf level.
pub struct StreamingEMTree {
    root: Node<AccumulatorKey>,
    dimensions: usize,
    last_rmse: Option<f64>,
    converged: bool,
}

impl StreamingEMTree {
    /// Builds a streaming tree from a bootstrap m-ary centroid tree (the
    /// output of [`crate::tsvq::build`] or a [`crate::ktree::KTree`]).
    ///
    /// The bootstrap's leaf level (the nodes holding raw member vectors)
    /// is discarded; the level immediately above it becomes this tree's
    /// leaf level, with each of its keys turned into a fresh,
    /// zero-accumulator [`AccumulatorKey`].
    ///
    /// # Panics
    ///
    /// Panics if `bootstrap` is empty, or if it has no internal levels at
    /// all (a bootstrap of depth `0`, which [`crate::tsvq::build`] never
    /// produces).
    #[must_use]
    pub fn new(bootstrap: &Node<Vector>) -> Self {
        assert!(!bootstrap.is_empty(), "EmptyBootstrap: cannot build a StreamingEMTree from an empty tree");
        assert!(
            !bootstrap.is_leaf(),
            "EmptyBootstrap: bootstrap must have at least one internal level above its leaves"
        );

        let dimensions = bootstrap.key(0).len();
        let root = deep_copy_strip_leaves(bootstrap);

        Self {
            root,
            dimensions,
            last_rmse: None,
            converged: false,
        }
    }

    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[must_use]
    pub fn converged(&self) -> bool {
        self.converged
    }

    #[must_use]
    pub fn last_rmse(&self) -> Option<f64> {
        self.last_rmse
    }

    /// Routes `object` to its nearest leaf, accumulating `sum_squared_error`,
    /// `accumulator` and `count` under that leaf key's mutex (`insert`).
    ///
    /// Safe to call concurrently for distinct objects: every write lands
    /// behind a per-leaf-key mutex, and internal-node keys/children are
    /// read-only during this call.
    ///
    /// # Panics
    ///
    /// Panics if `object.len()` does not match [`Self::dimensions`].
    pub fn insert(&self, object: &Vector) {
        assert_eq!(
            object.len(),
            self.dimensions,
            "PreconditionFailure: vector length does not match tree dimensionality"
        );
        Self::insert_rec(&self.root, object);
    }

    fn insert_rec(node: &Node<AccumulatorKey>, object: &Vector) {
        let nearest = Optimizer.nearest(object, node.keys());
        if node.is_leaf() {
            let ak = &node.keys()[nearest.index];
            let mut state = ak.leaf.as_ref().expect("leaf key must carry leaf state").lock().unwrap();
            state.sum_squared_error += Optimizer.squared_distance(object, &ak.key);
            for i in 0..object.len() {
                state.accumulator[i] += object.get(i);
            }
            state.count += 1;
        } else {
            Self::insert_rec(node.child(nearest.index), object);
        }
    }

    /// Routes every vector in `objects` as [`Self::insert`] would, but at
    /// the leaf only updates `sum_squared_error` and `count` (never
    /// `accumulator`), and additionally calls `iv.accept` at every level
    /// visited on the way down (`visit(stream, insert_visitor)`).
    ///
    /// Used to emit cluster assignments without disturbing the
    /// accumulators a subsequent [`Self::update`] would consume.
    pub fn visit_stream(&self, objects: &[Vector], iv: &dyn InsertVisitor) {
        for object in objects {
            assert_eq!(
                object.len(),
                self.dimensions,
                "PreconditionFailure: vector length does not match tree dimensionality"
            );
            Self::visit_stream_rec(&self.root, object, 0, iv);
        }
    }

    fn visit_stream_rec(node: &Node<AccumulatorKey>, object: &Vector, level: usize, iv: &dyn InsertVisitor) {
        let nearest = Optimizer.nearest(object, node.keys());
        let ak = &node.keys()[nearest.index];
        iv.accept(level, object, &ak.key, nearest.similarity);

        if node.is_leaf() {
            let mut state = ak.leaf.as_ref().expect("leaf key must carry leaf state").lock().unwrap();
            state.sum_squared_error += Optimizer.squared_distance(object, &ak.key);
            state.count += 1;
        } else {
            Self::visit_stream_rec(node.child(nearest.index), object, level + 1, iv);
        }
    }

    /// Depth-first walk emitting `cv.accept(level, parent_key, this_key,
    /// subtree_rmse, subtree_count)` for every key at every level, parent
    /// before children (`visit(cluster_visitor)`).
    pub fn visit_clusters(&self, cv: &dyn ClusterVisitor) {
        Self::visit_clusters_rec(&self.root, None, 0, cv);
    }

    fn visit_clusters_rec(
        node: &Node<AccumulatorKey>,
        parent_key: Option<&Vector>,
        level: usize,
        cv: &dyn ClusterVisitor,
    ) {
        for i in 0..node.size() {
            let ak = node.key(i);
            let (sse, count) = if node.is_leaf() {
                (ak.sum_squared_error(), ak.count())
            } else {
                subtree_stats(node.child(i))
            };
            let rmse = if count == 0 { 0.0 } else { (sse / count as f64).sqrt() };
            cv.accept(level, parent_key, &ak.key, rmse, count);

            if !node.is_leaf() {
                Self::visit_clusters_rec(node.child(i), Some(&ak.key), level + 1, cv);
            }
        }
    }

    /// Removes empty keys and subtrees bottom-up (`prune`).
    ///
    /// At a node one level above the leaves, an individual leaf key with
    /// `count == 0` is dropped in place. At any internal node, a child
    /// whose subtree's total object count is `0` is dropped wholesale.
    /// The root itself is never removed. Returns the total number of
    /// entries removed (leaf keys and internal key/child pairs combined).
    pub fn prune(&mut self) -> usize {
        if self.root.is_leaf() {
            prune_leaf_keys(&mut self.root)
        } else {
            prune_internal(&mut self.root)
        }
    }

    /// Flattens every leaf's accumulator into its centroid
    /// (`accumulator / count`, unchanged if `count == 0`), then re-means
    /// every internal key from the aggregated accumulator/count of its
    /// subtree, post-order (`update`).
    pub fn update(&mut self) {
        update_node(&mut self.root, self.dimensions);
    }

    /// Zeroes every leaf's `sum_squared_error`, `accumulator` and `count`
    /// (`clear_accumulators`). A no-op if already cleared.
    pub fn clear_accumulators(&mut self) {
        clear_node(&mut self.root);
    }

    /// `√( Σ leaf.sum_squared_error / total leaf count )`, aggregated
    /// over the state accumulated since the last
    /// [`Self::clear_accumulators`]. Must be read before clearing.
    #[must_use]
    pub fn rmse(&self) -> f64 {
        let (sse, count) = subtree_stats(&self.root);
        if count == 0 {
            return 0.0;
        }
        (sse / count as f64).sqrt()
    }

    /// Compares `rmse` to the previously recorded RMSE using the
    /// convergence predicate (`prev - rmse > 0` and `(prev - rmse) /
    /// (rmse + 1e-7) <= tolerance`), records both `rmse` and the outcome
    /// as the tree's notepad, and returns the outcome.
    pub fn note_rmse(&mut self, rmse: f64, tolerance: f64) -> bool {
        self.converged = match self.last_rmse {
            Some(prev) => {
                let improvement = prev - rmse;
                improvement > 0.0 && improvement / (rmse + 1e-7) <= tolerance
            }
            None => false,
        };
        self.last_rmse = Some(rmse);
        self.converged
    }

    /// Total number of objects currently accumulated across all leaves.
    #[must_use]
    pub fn get_obj_count(&self) -> u64 {
        subtree_stats(&self.root).1
    }

    /// Number of levels from the root to the leaves, inclusive (a tree
    /// that is itself a single leaf node has `get_max_level_count() == 1`).
    #[must_use]
    pub fn get_max_level_count(&self) -> usize {
        max_level_count(&self.root)
    }

    /// Total number of keys held by every node at `depth` levels below
    /// the root (`depth == 0` is the root's own key count), counted
    /// regardless of emptiness. This deliberately differs from
    /// [`crate::ktree::KTree::get_cluster_count_at`], which excludes empty
    /// children.
    #[must_use]
    pub fn get_cluster_count(&self, depth: usize) -> usize {
        cluster_count_at(&self.root, depth)
    }
}

/// Deep-copies `node`, converting it into a [`Node<AccumulatorKey>`] and
/// discarding the bottom-most level (whose children are themselves
/// leaves holding raw vectors, per the bootstrap contract). A node whose
/// children are all leaves becomes a streaming-tree leaf directly;
/// its own children (the bootstrap leaves) are never visited.
fn deep_copy_strip_leaves(node: &Node<Vector>) -> Node<AccumulatorKey> {
    if node.children().iter().all(Node::is_leaf) {
        let keys = node.keys().iter().cloned().map(AccumulatorKey::new_leaf).collect();
        Node::Leaf {
            keys,
            pending_removals: Vec::new(),
        }
    } else {
        let mut keys = Vec::with_capacity(node.size());
        let mut children = Vec::with_capacity(node.size());
        for i in 0..node.size() {
            keys.push(AccumulatorKey::new_internal(node.key(i).clone()));
            children.push(deep_copy_strip_leaves(node.child(i)));
        }
        Node::Internal {
            keys,
            children,
            pending_removals: Vec::new(),
        }
    }
}

fn prune_leaf_keys(leaf: &mut Node<AccumulatorKey>) -> usize {
    let n = leaf.size();
    let mut removed = 0;
    for i in 0..n {
        if leaf.key(i).count() == 0 {
            leaf.remove(i);
            removed += 1;
        }
    }
    leaf.finalize_removals();
    removed
}

fn prune_internal(node: &mut Node<AccumulatorKey>) -> usize {
    let mut removed = 0;
    let n = node.size();

    for i in 0..n {
        let child = node.child_mut(i);
        if child.is_leaf() {
            removed += prune_leaf_keys(child);
        } else {
            removed += prune_internal(child);
        }

        if node.child(i).is_empty() {
            node.remove(i);
            removed += 1;
        }
    }

    node.finalize_removals();
    removed
}

fn update_node(node: &mut Node<AccumulatorKey>, dimensions: usize) -> (Vec<f64>, u64) {
    let mut total = vec![0.0; dimensions];
    let mut total_count = 0u64;

    if node.is_leaf() {
        for ak in node.keys_mut() {
            let state = ak
                .leaf
                .as_mut()
                .expect("leaf key must carry leaf state")
                .get_mut()
                .unwrap();
            if state.count > 0 {
                for i in 0..dimensions {
                    ak.key.set(i, state.accumulator.get(i) / state.count as f64);
                }
            }
            for i in 0..dimensions {
                total[i] += state.accumulator.get(i);
            }
            total_count += state.count;
        }
    } else {
        let n = node.size();
        for i in 0..n {
            let (child_total, child_count) = update_node(node.child_mut(i), dimensions);
            if child_count > 0 {
                let key = node.key_mut(i);
                for d in 0..dimensions {
                    key.key.set(d, child_total[d] / child_count as f64);
                }
            }
            for d in 0..dimensions {
                total[d] += child_total[d];
            }
            total_count += child_count;
        }
    }

    (total, total_count)
}

fn clear_node(node: &mut Node<AccumulatorKey>) {
    if node.is_leaf() {
        for ak in node.keys() {
            let mut state = ak.leaf.as_ref().expect("leaf key must carry leaf state").lock().unwrap();
            state.sum_squared_error = 0.0;
            state.accumulator.set_all(0.0);
            state.count = 0;
        }
    } else {
        for child in node.children_mut() {
            clear_node(child);
        }
    }
}

/// `(Σ leaf.sum_squared_error, Σ leaf.count)` over the subtree rooted at
/// `node`.
fn subtree_stats(node: &Node<AccumulatorKey>) -> (f64, u64) {
    if node.is_leaf() {
        node.keys()
            .iter()
            .fold((0.0, 0u64), |(sse, count), ak| (sse + ak.sum_squared_error(), count + ak.count()))
    } else {
        node.children()
            .iter()
            .fold((0.0, 0u64), |(sse, count), child| {
                let (child_sse, child_count) = subtree_stats(child);
                (sse + child_sse, count + child_count)
            })
    }
}

fn max_level_count(node: &Node<AccumulatorKey>) -> usize {
    if node.is_leaf() {
        1
    } else {
        1 + max_level_count(node.child(0))
    }
}

fn cluster_count_at(node: &Node<AccumulatorKey>, depth: usize) -> usize {
    if depth == 0 {
        node.size()
    } else {
        node.children().iter().map(|c| cluster_count_at(c, depth - 1)).sum()
    }
}
