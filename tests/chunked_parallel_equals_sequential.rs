// Copyright (c) 2026-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Splitting a batch into small chunks and inserting it through the
//! streaming pipeline must yield the same leaf `(count, sum of
//! accumulator)` state as inserting the same batch serially on one
//! thread, up to floating-point reassociation.

use streaming_emtree::stream::VectorStream;
use streaming_emtree::visitor::CollectingClusterVisitor;
use streaming_emtree::{pipeline, Config, Error, Node, Result, StreamingEMTree, Vector};

fn v(id: impl Into<String>, data: &[f64]) -> Vector {
    Vector::from_data(id, data.to_vec())
}

struct InMemoryStream {
    data: Vec<Vector>,
    pos: usize,
}

impl VectorStream for InMemoryStream {
    fn next(&mut self) -> Result<Option<Vector>> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let item = self.data[self.pos].clone();
        self.pos += 1;
        Ok(Some(item))
    }
}

fn two_cluster_bootstrap() -> Node<Vector> {
    let mut leaf0 = Node::new_leaf();
    leaf0.add_leaf_key(v("", &[1.0, 0.0]));
    let mut leaf1 = Node::new_leaf();
    leaf1.add_leaf_key(v("", &[0.0, 1.0]));
    let mut root = Node::new_internal();
    root.add_child(v("", &[1.0, 0.0]), leaf0);
    root.add_child(v("", &[0.0, 1.0]), leaf1);
    root
}

fn leaf_snapshot(tree: &StreamingEMTree) -> Vec<(Vec<f64>, u64)> {
    let visitor = CollectingClusterVisitor::default();
    tree.visit_clusters(&visitor);
    let mut clusters: Vec<(Vec<f64>, u64)> = visitor
        .into_clusters()
        .into_iter()
        .map(|(_, key, _, count)| (key.as_slice().to_vec(), count))
        .collect();
    clusters.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
    clusters
}

#[test]
fn pipeline_insert_matches_serial_insert() {
    let data: Vec<Vector> = (0..600)
        .map(|i| {
            if i % 3 == 0 {
                v(i.to_string(), &[1.0, 0.02])
            } else {
                v(i.to_string(), &[0.02, 1.0])
            }
        })
        .collect();

    let bootstrap = two_cluster_bootstrap();

    let serial_tree = StreamingEMTree::new(&bootstrap);
    for obj in &data {
        serial_tree.insert(obj);
    }

    let pipeline_tree = StreamingEMTree::new(&bootstrap);
    let mut stream = InMemoryStream {
        data: data.clone(),
        pos: 0,
    };
    let mut config = Config::new(2, 1);
    config.read_size = 17;
    config.max_tokens = 5;

    let total = pipeline::run(&mut stream, &config, |chunk| {
        for obj in chunk {
            pipeline_tree.insert(obj);
        }
    })
    .unwrap();

    assert_eq!(total, data.len() as u64);
    assert_eq!(serial_tree.get_obj_count(), pipeline_tree.get_obj_count());

    let serial_snapshot = leaf_snapshot(&serial_tree);
    let pipeline_snapshot = leaf_snapshot(&pipeline_tree);
    assert_eq!(serial_snapshot.len(), pipeline_snapshot.len());
    for ((_, serial_count), (_, pipeline_count)) in serial_snapshot.iter().zip(pipeline_snapshot.iter()) {
        assert_eq!(serial_count, pipeline_count);
    }
}

#[test]
fn pipeline_surfaces_a_stream_error() {
    struct AlwaysFails;
    impl VectorStream for AlwaysFails {
        fn next(&mut self) -> Result<Option<Vector>> {
            Err(Error::DimensionMismatch { expected: 2, found: 3 })
        }
    }

    let mut stream = AlwaysFails;
    let config = Config::new(2, 1);
    let result = pipeline::run(&mut stream, &config, |_| {});
    assert!(result.is_err());
}
