// Copyright (c) 2026-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A bootstrap tree with a single root/leaf key at the origin absorbs
//! every object into one cluster; after `update` its centroid is the
//! mean of everything inserted.

use streaming_emtree::{Node, StreamingEMTree, Vector};

fn v(data: &[f64]) -> Vector {
    Vector::from_data("", data.to_vec())
}

fn single_cluster_bootstrap() -> Node<Vector> {
    let mut leaf = Node::new_leaf();
    leaf.add_leaf_key(v(&[0.0, 0.0]));
    let mut root = Node::new_internal();
    root.add_child(v(&[0.0, 0.0]), leaf);
    root
}

#[test]
fn single_cluster_mean_after_update() {
    let bootstrap = single_cluster_bootstrap();
    let mut tree = StreamingEMTree::new(&bootstrap);

    tree.insert(&v(&[1.0, 1.0]));
    tree.insert(&v(&[3.0, 3.0]));

    assert_eq!(tree.get_obj_count(), 2);

    let rmse = tree.rmse();
    assert!(rmse > 0.0, "origin is not the mean, RMSE should be nonzero before update");

    tree.update();

    let leaves = leaf_centroids(&tree);
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0], vec![2.0, 2.0]);
}

fn leaf_centroids(tree: &StreamingEMTree) -> Vec<Vec<f64>> {
    use streaming_emtree::visitor::CollectingClusterVisitor;
    let visitor = CollectingClusterVisitor::default();
    tree.visit_clusters(&visitor);
    visitor
        .into_clusters()
        .into_iter()
        .map(|(_, key, _, _)| key.as_slice().to_vec())
        .collect()
}
