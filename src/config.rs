// Copyright (c) 2026-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Tunables for a streaming EM-tree run, gathered into a single struct
//! rather than threaded through every constructor individually.

/// Configuration for building and streaming into an EM-tree.
///
/// All fields are public; construct with [`Config::new`] and adjust
/// fields directly, or start from [`Config::default`] and override what
/// you need.
#[derive(Clone, Debug)]
pub struct Config {
    /// Tree order: number of children per internal node / keys per leaf.
    pub m: usize,

    /// Bootstrap depth: number of internal levels above the leaves.
    pub d: usize,

    /// Number of vectors sampled from the input stream to build the
    /// initial bootstrap tree.
    pub sample_size: usize,

    /// Maximum k-means iterations during bootstrap (`-1` = until
    /// convergence, `0` = assign only).
    pub max_iters: i64,

    /// Convergence tolerance used when comparing successive RMSE values.
    pub convergence_tolerance: f64,

    /// Number of vectors read per streaming chunk.
    pub read_size: usize,

    /// Maximum number of chunks allowed in flight in the streaming
    /// pipeline before the reader blocks.
    pub max_tokens: usize,

    /// Caps the total number of vectors [`crate::pipeline::run`] will pull
    /// from a stream before stopping, regardless of how many remain.
    /// `None` (the default) reads until the stream is exhausted.
    pub max_to_read: Option<u64>,
}

impl Config {
    #[must_use]
    pub fn new(m: usize, d: usize) -> Self {
        Self {
            m,
            d,
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            m: 8,
            d: 3,
            sample_size: 10_000,
            max_iters: 100,
            convergence_tolerance: 1e-4,
            read_size: 1000,
            max_tokens: 1024,
            max_to_read: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_overrides_m_and_d_only() {
        let config = Config::new(16, 2);
        assert_eq!(config.m, 16);
        assert_eq!(config.d, 2);
        assert_eq!(config.sample_size, 10_000);
    }

    #[test]
    fn default_reads_until_stream_exhaustion() {
        assert_eq!(Config::default().max_to_read, None);
    }
}
