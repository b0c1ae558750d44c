// Copyright (c) 2026-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The serial-read / parallel-process streaming pipeline that
//! feeds chunks of a [`crate::stream::VectorStream`] into a closure,
//! typically [`crate::emtree::StreamingEMTree::insert`] or
//! [`crate::emtree::StreamingEMTree::visit_stream`].
//!
//! A single reader task pulls bounded chunks (`Config::read_size`) off
//! the stream and hands them to a bounded channel (`Config::max_tokens`
//! slots, the back-pressure bound); a rayon-driven consumer applies
//! `work` to each chunk as it arrives, fanning out across the thread
//! pool. Chunks may complete out of order; within a chunk, objects are
//! processed in the order they were read.
//!
//! `Config::max_to_read`, if set, caps the total number of vectors the
//! reader stage will pull before stopping early, leaving the rest of the
//! stream unread.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::stream::VectorStream;
use crate::vector::Vector;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Drains `stream` through the two-stage pipeline, calling `work` once
/// per chunk of up to `config.read_size` vectors, with at most
/// `config.max_tokens` chunks in flight. Returns the total number of
/// vectors processed.
///
/// `work` must be safe to call concurrently from multiple threads: many
/// chunks may be in `work` at once.
///
/// # Errors
///
/// Returns the first error the stream's read side produces; any chunks
/// already handed to `work` before the error still run to completion.
pub fn run<F>(stream: &mut dyn VectorStream, config: &Config, work: F) -> Result<u64>
where
    F: Fn(&[Vector]) + Sync,
{
    let (tx, rx) = crossbeam_channel::bounded::<Vec<Vector>>(config.max_tokens);
    let read_error: Mutex<Option<Error>> = Mutex::new(None);
    let total = AtomicU64::new(0);

    rayon::scope(|scope| {
        scope.spawn(|_| {
            let mut read_so_far = 0u64;
            loop {
                if let Some(cap) = config.max_to_read {
                    if read_so_far >= cap {
                        log::trace!("pipeline: stopping at max_to_read cap ({cap})");
                        break;
                    }
                }
                let want = config.max_to_read.map_or(config.read_size, |cap| {
                    config.read_size.min((cap - read_so_far) as usize)
                });
                match stream.read_chunk(want) {
                    Ok(chunk) if chunk.is_empty() => break,
                    Ok(chunk) => {
                        log::trace!("pipeline: read chunk of {} vectors", chunk.len());
                        read_so_far += chunk.len() as u64;
                        if tx.send(chunk).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::error!("pipeline: stream read failed: {e}");
                        *read_error.lock().unwrap() = Some(e);
                        break;
                    }
                }
            }
        });

        rx.iter().par_bridge().for_each(|chunk| {
            total.fetch_add(chunk.len() as u64, Ordering::Relaxed);
            work(&chunk);
        });
    });

    if let Some(e) = read_error.into_inner().unwrap() {
        return Err(e);
    }

    Ok(total.load(Ordering::Relaxed))
}
