// Copyright (c) 2026-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Callback interfaces for observing a [`crate::emtree::StreamingEMTree`]
//! without coupling it to any particular consumer.
//!
//! Both traits take `&self`, not `&mut self`: the streaming pipeline
//! drives many chunks through the tree in parallel, so an implementation
//! that writes anywhere (a file, a counter) must synchronize internally
//! (a `Mutex`, an atomic, a channel to a single writer thread).

use crate::vector::Vector;

/// Called at every level visited on an object's descent path during a
/// streaming insert pass (see
/// [`crate::emtree::StreamingEMTree::visit_stream`]).
///
/// `level` is `0` at the root. `chosen_key` is the centroid the object
/// was routed towards at that level; `similarity` is the (unsquared)
/// cosine similarity between `object` and `chosen_key`.
pub trait InsertVisitor: Sync {
    fn accept(&self, level: usize, object: &Vector, chosen_key: &Vector, similarity: f64);
}

/// Called once per key during a depth-first walk of the tree (see
/// [`crate::emtree::StreamingEMTree::visit_clusters`]), parent before
/// children.
///
/// `parent_key` is `None` only for the root's own key(s) entry, if the
/// tree exposes one; `subtree_rmse`/`subtree_count` aggregate over the
/// subtree rooted at `this_key`.
pub trait ClusterVisitor: Sync {
    fn accept(
        &self,
        level: usize,
        parent_key: Option<&Vector>,
        this_key: &Vector,
        subtree_rmse: f64,
        subtree_count: u64,
    );
}

/// An [`InsertVisitor`] that does nothing but count visits at level 0.
/// Useful when a caller only wants to drive the stream through the tree
/// (e.g. to exercise `insert` without keeping its own count).
#[derive(Default)]
pub struct CountingInsertVisitor {
    count: std::sync::atomic::AtomicU64,
}

impl CountingInsertVisitor {
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(std::sync::atomic::Ordering::Relaxed)
    }
}

impl InsertVisitor for CountingInsertVisitor {
    fn accept(&self, level: usize, _object: &Vector, _chosen_key: &Vector, _similarity: f64) {
        if level == 0 {
            self.count.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    }
}

/// A [`ClusterVisitor`] that collects every `(level, this_key, rmse,
/// count)` tuple it sees, in traversal order. Synchronized with a
/// `Mutex` since the tree walk that drives it is single-threaded in
/// practice but the trait itself makes no such promise.
#[derive(Default)]
pub struct CollectingClusterVisitor {
    clusters: std::sync::Mutex<Vec<(usize, Vector, f64, u64)>>,
}

impl CollectingClusterVisitor {
    #[must_use]
    pub fn into_clusters(self) -> Vec<(usize, Vector, f64, u64)> {
        self.clusters.into_inner().unwrap_or_default()
    }
}

impl ClusterVisitor for CollectingClusterVisitor {
    fn accept(
        &self,
        level: usize,
        _parent_key: Option<&Vector>,
        this_key: &Vector,
        subtree_rmse: f64,
        subtree_count: u64,
    ) {
        self.clusters
            .lock()
            .unwrap()
            .push((level, this_key.clone(), subtree_rmse, subtree_count));
    }
}

/// An [`InsertVisitor`] that records `(object_id, chosen_key)` pairs at
/// every level, for tests that need to inspect a full routing trace.
#[derive(Default)]
pub struct TracingInsertVisitor {
    trace: std::sync::Mutex<Vec<(usize, String, Vector)>>,
}

impl TracingInsertVisitor {
    #[must_use]
    pub fn into_trace(self) -> Vec<(usize, String, Vector)> {
        self.trace.into_inner().unwrap_or_default()
    }
}

impl InsertVisitor for TracingInsertVisitor {
    fn accept(&self, level: usize, object: &Vector, chosen_key: &Vector, _similarity: f64) {
        self.trace
            .lock()
            .unwrap()
            .push((level, object.id().to_string(), chosen_key.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_visitor_tallies_only_root_level_calls() {
        let visitor = CountingInsertVisitor::default();
        let v = Vector::new(2);
        visitor.accept(0, &v, &v, 1.0);
        visitor.accept(1, &v, &v, 1.0);
        visitor.accept(0, &v, &v, 1.0);
        assert_eq!(visitor.count(), 2);
    }

    #[test]
    fn collecting_visitor_preserves_order() {
        let visitor = CollectingClusterVisitor::default();
        visitor.accept(0, None, &Vector::from_data("a", vec![1.0]), 0.1, 3);
        visitor.accept(1, None, &Vector::from_data("b", vec![2.0]), 0.2, 5);
        let clusters = visitor.into_clusters();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].3, 3);
        assert_eq!(clusters[1].3, 5);
    }

    #[test]
    fn tracing_visitor_records_descent_path() {
        let visitor = TracingInsertVisitor::default();
        let object = Vector::from_data("doc1", vec![1.0, 0.0]);
        let key0 = Vector::from_data("", vec![1.0, 0.0]);
        let key1 = Vector::from_data("", vec![0.9, 0.1]);
        visitor.accept(0, &object, &key0, 0.99);
        visitor.accept(1, &object, &key1, 0.95);
        let trace = visitor.into_trace();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].1, "doc1");
        assert_eq!(trace[1].0, 1);
    }
}
