// Copyright (c) 2026-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Fixed-iteration Lloyd's algorithm with parallel assign/recompute steps.
//!
//! Used both to bootstrap the TSVQ tree and, with `num_clusters == 2`, to
//! split an overflowing `KTree` node.

use crate::optimizer::Optimizer;
use crate::seed::{RandomSeeder, Seeder};
use crate::vector::Vector;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};

/// Minimum grain size for the parallel assignment step.
const ASSIGN_GRAIN: usize = 1000;

/// Minimum grain size for the parallel recompute step.
const RECOMPUTE_GRAIN: usize = 2;

/// One cluster found by [`KMeans::run`]: its centroid and the indices
/// (into the `data` slice passed to `run`) of its members.
#[derive(Clone, Debug)]
pub struct Cluster {
    pub centroid: Vector,
    pub members: Vec<usize>,
}

/// The outcome of a complete `KMeans::run` call.
#[derive(Clone, Debug)]
pub struct KMeansResult {
    /// Only the clusters that received at least one member ("final
    /// clusters" in the source). May number fewer than the requested `k`.
    pub clusters: Vec<Cluster>,
    /// `√( Σⱼ sum_squared_error(cⱼ, clusterⱼ) / n )`, aggregated across
    /// *all* k clusters (including any left empty).
    pub rmse: f64,
}

/// Fixed-iteration Lloyd's algorithm.
///
/// `max_iters` follows the source's three-way convention: `0` runs only
/// the initial assignment (no recompute), `-1` runs until convergence,
/// and any positive value caps the iteration count.
pub struct KMeans<S: Seeder = RandomSeeder> {
    optimizer: Optimizer,
    seeder: S,
    num_clusters: usize,
    max_iters: i64,
    enforce_num_clusters: bool,
}

impl KMeans<RandomSeeder> {
    #[must_use]
    pub fn new(num_clusters: usize, max_iters: i64, enforce_num_clusters: bool) -> Self {
        Self::with_seeder(RandomSeeder, num_clusters, max_iters, enforce_num_clusters)
    }
}

impl<S: Seeder> KMeans<S> {
    #[must_use]
    pub fn with_seeder(
        seeder: S,
        num_clusters: usize,
        max_iters: i64,
        enforce_num_clusters: bool,
    ) -> Self {
        Self {
            optimizer: Optimizer,
            seeder,
            num_clusters,
            max_iters,
            enforce_num_clusters,
        }
    }

    pub fn set_num_clusters(&mut self, num_clusters: usize) {
        self.num_clusters = num_clusters;
    }

    pub fn set_max_iters(&mut self, max_iters: i64) {
        self.max_iters = max_iters;
    }

    pub fn set_enforce_num_clusters(&mut self, enforce: bool) {
        self.enforce_num_clusters = enforce;
    }

    #[must_use]
    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    /// Clusters `data` into (at most) `self.num_clusters()` groups.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() < self.num_clusters()` (the seeder's
    /// precondition).
    #[must_use]
    pub fn run(&mut self, data: &[&Vector]) -> KMeansResult {
        let mut centroids = Vec::new();
        self.seeder.seed(data, &mut centroids, self.num_clusters);

        let mut clusters: Vec<Cluster> = centroids
            .into_iter()
            .map(|centroid| Cluster {
                centroid,
                members: Vec::new(),
            })
            .collect();

        let mut nearest_centroid = vec![usize::MAX; data.len()];

        self.assign(data, &mut clusters, &mut nearest_centroid);

        if self.max_iters != 0 {
            self.recompute(data, &mut clusters);

            if self.max_iters != 1 {
                let mut iter_count = 1i64;
                loop {
                    let converged = self.assign(data, &mut clusters, &mut nearest_centroid);
                    self.recompute(data, &mut clusters);
                    iter_count += 1;

                    if converged {
                        break;
                    }
                    if self.max_iters != -1 && iter_count >= self.max_iters {
                        break;
                    }
                }
            }
        }

        if self.enforce_num_clusters {
            self.enforce(data, &mut clusters, &mut nearest_centroid);
        }

        let rmse = self.rmse(data, &clusters);
        let final_clusters: Vec<Cluster> = clusters
            .into_iter()
            .filter(|c| !c.members.is_empty())
            .collect();

        KMeansResult {
            clusters: final_clusters,
            rmse,
        }
    }

    /// Parallel nearest-centroid assignment (grain [`ASSIGN_GRAIN`]),
    /// followed by a serial rebuild of cluster membership lists.
    /// Returns `true` iff no vector's nearest centroid changed.
    fn assign(
        &self,
        data: &[&Vector],
        clusters: &mut [Cluster],
        nearest_centroid: &mut [usize],
    ) -> bool {
        let optimizer = self.optimizer;
        let centroids: Vec<Vector> = clusters.iter().map(|c| c.centroid.clone()).collect();
        let converged = AtomicBool::new(true);

        nearest_centroid
            .par_iter_mut()
            .zip(data.par_iter())
            .with_min_len(ASSIGN_GRAIN)
            .for_each(|(slot, object)| {
                let new_index = optimizer.nearest(object, &centroids).index;
                if new_index != *slot {
                    converged.store(false, Ordering::Relaxed);
                }
                *slot = new_index;
            });

        std::sync::atomic::fence(Ordering::SeqCst);

        for cluster in clusters.iter_mut() {
            cluster.members.clear();
        }
        for (i, &c) in nearest_centroid.iter().enumerate() {
            clusters[c].members.push(i);
        }

        converged.load(Ordering::Relaxed)
    }

    /// Parallel centroid recompute (grain [`RECOMPUTE_GRAIN`]). Empty
    /// clusters are left unchanged.
    fn recompute(&self, data: &[&Vector], clusters: &mut [Cluster]) {
        let optimizer = self.optimizer;
        clusters
            .par_iter_mut()
            .with_min_len(RECOMPUTE_GRAIN)
            .for_each(|cluster| {
                if !cluster.members.is_empty() {
                    let members: Vec<&Vector> =
                        cluster.members.iter().map(|&i| data[i]).collect();
                    optimizer.update_prototype(&mut cluster.centroid, &members, &[]);
                }
            });

        std::sync::atomic::fence(Ordering::SeqCst);
    }

    /// If fewer than `k` clusters received members, force a split: shuffle
    /// `data`, partition into `k` equal contiguous blocks by position,
    /// recompute, then reassign once more.
    fn enforce(
        &self,
        data: &[&Vector],
        clusters: &mut [Cluster],
        nearest_centroid: &mut [usize],
    ) {
        let has_empty_cluster = clusters.iter().any(|c| c.members.is_empty());
        if !has_empty_cluster {
            return;
        }

        let mut shuffled: Vec<usize> = (0..data.len()).collect();
        {
            let mut rng = rand::rng();
            use rand::seq::SliceRandom;
            shuffled.shuffle(&mut rng);
        }

        let k = clusters.len();
        let step = shuffled.len().div_ceil(k.max(1));
        for (block_index, chunk) in shuffled.chunks(step.max(1)).enumerate() {
            let cluster_index = block_index.min(k - 1);
            for &data_index in chunk {
                nearest_centroid[data_index] = cluster_index;
            }
        }

        for cluster in clusters.iter_mut() {
            cluster.members.clear();
        }
        for (i, &c) in nearest_centroid.iter().enumerate() {
            clusters[c].members.push(i);
        }

        self.recompute(data, clusters);
        self.assign(data, clusters, nearest_centroid);
    }

    fn rmse(&self, data: &[&Vector], clusters: &[Cluster]) -> f64 {
        let mut sse = 0.0;
        let mut n = 0usize;
        for cluster in clusters {
            n += cluster.members.len();
            let members: Vec<&Vector> = cluster.members.iter().map(|&i| data[i]).collect();
            sse += self.optimizer.sum_squared_error(&cluster.centroid, &members);
        }
        if n == 0 {
            return 0.0;
        }
        (sse / n as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(data: &[f64]) -> Vector {
        Vector::from_data("", data.to_vec())
    }

    #[test]
    fn converges_on_two_well_separated_blobs() {
        let data: Vec<Vector> = vec![
            v(&[1.0, 0.0]),
            v(&[0.9, 0.1]),
            v(&[0.0, 1.0]),
            v(&[0.1, 0.9]),
        ];
        let refs: Vec<&Vector> = data.iter().collect();

        let mut kmeans = KMeans::new(2, 100, false);
        let result = kmeans.run(&refs);

        assert_eq!(result.clusters.len(), 2);
        let total_members: usize = result.clusters.iter().map(|c| c.members.len()).sum();
        assert_eq!(total_members, 4);
    }

    #[test]
    fn max_iters_zero_only_assigns() {
        let data: Vec<Vector> = vec![v(&[1.0, 0.0]), v(&[0.0, 1.0])];
        let refs: Vec<&Vector> = data.iter().collect();

        let mut kmeans = KMeans::new(2, 0, false);
        let result = kmeans.run(&refs);
        assert_eq!(result.clusters.len(), 2);
    }

    #[test]
    fn enforce_num_clusters_recovers_from_a_degenerate_seed() {
        // Four identical vectors: without enforcement, k=2 would likely
        // collapse to a single non-empty cluster.
        let data: Vec<Vector> = vec![
            v(&[1.0, 1.0]),
            v(&[1.0, 1.0]),
            v(&[1.0, 1.0]),
            v(&[1.0, 1.0]),
        ];
        let refs: Vec<&Vector> = data.iter().collect();

        let mut kmeans = KMeans::new(2, 10, true);
        let result = kmeans.run(&refs);
        assert_eq!(result.clusters.len(), 2);
        assert!(result.clusters.iter().all(|c| !c.members.is_empty()));
    }

    #[test]
    fn rmse_saturates_at_the_reciprocal_floor_for_identical_points() {
        // `rmse` is built on the reciprocal-squared-similarity "distance"
        // (see `distance::squared_distance`), not a true metric: even a
        // point sitting exactly on its centroid contributes
        // `1 / (1 + 1e-5)` rather than `0`.
        let data: Vec<Vector> = vec![v(&[2.0, 2.0]), v(&[2.0, 2.0])];
        let refs: Vec<&Vector> = data.iter().collect();

        let mut kmeans = KMeans::new(1, 10, false);
        let result = kmeans.run(&refs);
        assert!((result.rmse - 1.0).abs() < 1e-4);
    }
}
