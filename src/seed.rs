// Copyright (c) 2026-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Centroid seeding strategies, pluggable behind the [`Seeder`] trait.

use crate::vector::Vector;
use rand::seq::SliceRandom;

/// Picks the initial centroids for a [`crate::kmeans::KMeans`] run.
///
/// # Preconditions
///
/// `centroids` is empty on entry and must contain exactly `num_centres`
/// entries on return. Implementations may assume `data.len() >= num_centres`;
/// behaviour is unspecified otherwise.
pub trait Seeder {
    fn seed(&self, data: &[&Vector], centroids: &mut Vec<Vector>, num_centres: usize);
}

/// Samples `num_centres` distinct vectors from `data` without replacement,
/// cloning each into `centroids`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomSeeder;

impl Seeder for RandomSeeder {
    fn seed(&self, data: &[&Vector], centroids: &mut Vec<Vector>, num_centres: usize) {
        assert!(
            data.len() >= num_centres,
            "cannot seed {num_centres} centroids from {} vectors",
            data.len()
        );

        let mut rng = rand::rng();
        let mut indices: Vec<usize> = (0..data.len()).collect();
        indices.shuffle(&mut rng);

        centroids.clear();
        centroids.extend(indices.into_iter().take(num_centres).map(|i| data[i].clone()));
    }
}
