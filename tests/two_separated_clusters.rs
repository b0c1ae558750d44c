// Copyright (c) 2026-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Two well-separated bootstrap leaves each absorb the objects nearest
//! them; after `update` each centroid is the mean of exactly its own
//! members.

use streaming_emtree::visitor::CollectingClusterVisitor;
use streaming_emtree::{Node, StreamingEMTree, Vector};

fn v(data: &[f64]) -> Vector {
    Vector::from_data("", data.to_vec())
}

fn two_cluster_bootstrap() -> Node<Vector> {
    let mut leaf0 = Node::new_leaf();
    leaf0.add_leaf_key(v(&[1.0, 0.0]));
    let mut leaf1 = Node::new_leaf();
    leaf1.add_leaf_key(v(&[0.0, 1.0]));

    let mut root = Node::new_internal();
    root.add_child(v(&[1.0, 0.0]), leaf0);
    root.add_child(v(&[0.0, 1.0]), leaf1);
    root
}

#[test]
fn each_leaf_absorbs_its_own_members_only() {
    let bootstrap = two_cluster_bootstrap();
    let mut tree = StreamingEMTree::new(&bootstrap);

    for obj in [
        v(&[1.0, 0.1]),
        v(&[0.9, 0.0]),
        v(&[0.0, 1.0]),
        v(&[0.05, 0.95]),
    ] {
        tree.insert(&obj);
    }

    tree.update();

    let visitor = CollectingClusterVisitor::default();
    tree.visit_clusters(&visitor);
    let mut clusters = visitor.into_clusters();
    clusters.sort_by(|a, b| a.1.as_slice()[1].partial_cmp(&b.1.as_slice()[1]).unwrap());

    assert_eq!(clusters.len(), 2);

    let near_x_axis = clusters[0].1.as_slice();
    assert!((near_x_axis[0] - 0.95).abs() < 1e-9);
    assert!((near_x_axis[1] - 0.05).abs() < 1e-9);
    assert_eq!(clusters[0].3, 2);

    let near_y_axis = clusters[1].1.as_slice();
    assert!((near_y_axis[0] - 0.025).abs() < 1e-9);
    assert!((near_y_axis[1] - 0.975).abs() < 1e-9);
    assert_eq!(clusters[1].3, 2);
}
