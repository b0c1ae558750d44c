// Copyright (c) 2026-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Iterating a fixed synthetic stream against a fresh bootstrap must
//! trigger the convergence predicate within `max_iters`, and the
//! successive RMSEs at the stopping iteration must actually satisfy it.

use streaming_emtree::{tsvq, Config, StreamingEMTree, Vector};

fn synthetic_stream(n: usize) -> Vec<Vector> {
    (0..n)
        .map(|i| {
            let cluster = i % 4;
            let jitter = (i as f64 % 7.0) * 0.01;
            let (x, y) = match cluster {
                0 => (1.0 + jitter, 0.0),
                1 => (0.0, 1.0 + jitter),
                2 => (-1.0 - jitter, 0.0),
                _ => (0.0, -1.0 - jitter),
            };
            Vector::from_data(i.to_string(), vec![x, y])
        })
        .collect()
}

#[test]
fn converges_within_max_iters_on_a_stable_stream() {
    let sample = synthetic_stream(1000);
    let refs: Vec<&Vector> = sample.iter().collect();

    let config = Config::new(4, 1);
    let bootstrap = tsvq::build(&refs, config.m, config.d, 10);
    let mut tree = StreamingEMTree::new(&bootstrap);

    let max_iters = 100;
    let mut iterations_run = 0;
    let mut final_rmse = None;

    for _ in 0..max_iters {
        for object in &sample {
            tree.insert(object);
        }
        tree.prune();
        let rmse = tree.rmse();
        tree.update();
        tree.clear_accumulators();

        iterations_run += 1;
        let converged = tree.note_rmse(rmse, config.convergence_tolerance);
        final_rmse = Some(rmse);
        if converged {
            break;
        }
    }

    assert!(
        tree.converged(),
        "expected convergence within {max_iters} iterations, stopped after {iterations_run}"
    );
    assert!(iterations_run <= max_iters);
    assert_eq!(tree.last_rmse(), final_rmse);
}
