// Copyright (c) 2026-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! End-to-end: a `DocVectorStream` reading a real file on disk, driven
//! through the streaming pipeline into a bootstrap tree, matches the
//! vector count written to the file.

use std::io::{BufReader, Write};

use streaming_emtree::stream::{DocVectorStream, VectorStream};
use streaming_emtree::{pipeline, tsvq, Config, StreamingEMTree, Vector};

#[test]
fn reads_and_clusters_a_doc_vector_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for i in 0..200 {
        let (x, y) = if i % 2 == 0 { (1.0, 0.0) } else { (0.0, 1.0) };
        writeln!(file, "doc{i} {x} {y}").unwrap();
    }
    file.flush().unwrap();

    let sample: Vec<Vector> = {
        let reader = BufReader::new(std::fs::File::open(file.path()).unwrap());
        let mut stream = DocVectorStream::new(reader, 2);
        let mut out = Vec::new();
        loop {
            match stream.next().unwrap() {
                Some(v) => out.push(v),
                None => break,
            }
        }
        out
    };
    assert_eq!(sample.len(), 200);

    let refs: Vec<&Vector> = sample.iter().collect();
    let config = Config::new(2, 1);
    let bootstrap = tsvq::build(&refs, config.m, config.d, 10);
    let tree = StreamingEMTree::new(&bootstrap);

    let reader = BufReader::new(std::fs::File::open(file.path()).unwrap());
    let mut stream = DocVectorStream::new(reader, 2);

    let total = pipeline::run(&mut stream, &config, |chunk| {
        for obj in chunk {
            tree.insert(obj);
        }
    })
    .unwrap();

    assert_eq!(total, 200);
    assert_eq!(tree.get_obj_count(), 200);
}
