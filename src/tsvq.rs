// Copyright (c) 2026-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Top-down, batch bootstrap of an m-ary centroid tree by recursive
//! k-means. The tree this builds is the usual input to
//! [`crate::emtree::StreamingEMTree::new`].

use crate::kmeans::KMeans;
use crate::node::Node;
use crate::vector::Vector;

/// Builds an m-ary centroid tree of exact depth `d` over `data`.
///
/// Level 0 is the root. At every level `< d`, each node runs
/// `KMeans::new(m, max_iters, false)` on its members and recurses into
/// each resulting (non-empty) cluster; level `d` nodes are leaves holding
/// the raw member vectors.
///
/// # Panics
///
/// Panics if `data` is empty, if `d == 0`, or if some internal node along
/// the recursion ends up with fewer members than `m` (the precondition
/// k-means seeding places on its input — see [`crate::seed::Seeder`]).
#[must_use]
pub fn build(data: &[&Vector], m: usize, d: usize, max_iters: i64) -> Node<Vector> {
    assert!(!data.is_empty(), "TSVQ requires a non-empty bootstrap sample");
    assert!(d >= 1, "bootstrap depth must be at least 1");
    build_level(data, 0, d, m, max_iters)
}

fn build_level(data: &[&Vector], level: usize, d: usize, m: usize, max_iters: i64) -> Node<Vector> {
    if level == d {
        let mut leaf = Node::new_leaf();
        for &member in data {
            leaf.add_leaf_key(member.clone());
        }
        return leaf;
    }

    let mut kmeans = KMeans::new(m, max_iters, false);
    let result = kmeans.run(data);

    let mut node = Node::new_internal();
    for cluster in result.clusters {
        let members: Vec<&Vector> = cluster.members.iter().map(|&i| data[i]).collect();
        let child = build_level(&members, level + 1, d, m, max_iters);
        node.add_child(cluster.centroid, child);
    }
    node
}
