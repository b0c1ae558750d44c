// Copyright (c) 2026-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A K.I.S.S. implementation of the streaming EM-tree algorithm for
//! clustering very large collections of high-dimensional vectors into a
//! hierarchical (m-ary) tree of cluster centroids.
//!
//! ##### About
//!
//! A [`StreamingEMTree`] never retains the vectors routed through it:
//! every leaf holds only a running component-wise sum and a count, so the
//! tree's memory footprint depends on its own shape (`m`, `d`), not on
//! the size of the corpus being clustered. Training is bulk-synchronous
//! and iteration-based: each pass streams the whole corpus through
//! [`StreamingEMTree::insert`], [`StreamingEMTree::prune`]s empty
//! clusters, [`StreamingEMTree::update`]s centroids from the accumulated
//! sums, then [`StreamingEMTree::clear_accumulators`] before the next
//! pass.
//!
//! The tree is bootstrapped from a small sample via [`tsvq::build`]
//! (recursive top-down k-means to a fixed depth), or alternatively via
//! the incremental [`ktree::KTree`].
//!
//! # Example
//!
//! ```
//! use streaming_emtree::{tsvq, StreamingEMTree, Vector};
//!
//! let sample: Vec<Vector> = (0..32)
//!     .map(|i| {
//!         if i < 16 {
//!             Vector::from_data(i.to_string(), vec![1.0, 0.0])
//!         } else {
//!             Vector::from_data(i.to_string(), vec![0.0, 1.0])
//!         }
//!     })
//!     .collect();
//! let refs: Vec<&Vector> = sample.iter().collect();
//!
//! let bootstrap = tsvq::build(&refs, /* m = */ 2, /* d = */ 1, /* max_iters = */ 10);
//! let tree = StreamingEMTree::new(&bootstrap);
//!
//! for object in &sample {
//!     tree.insert(object);
//! }
//! assert_eq!(tree.get_obj_count(), 32);
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod distance;
pub mod emtree;
pub mod error;
pub mod kmeans;
pub mod ktree;
pub mod node;
pub mod optimizer;
pub mod pipeline;
pub mod seed;
pub mod stream;
pub mod tsvq;
pub mod vector;
pub mod visitor;

pub use config::Config;
pub use emtree::{AccumulatorKey, StreamingEMTree};
pub use error::{Error, Result};
pub use node::Node;
pub use optimizer::Optimizer;
pub use vector::Vector;
