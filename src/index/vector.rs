// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exact nearest-neighbor index under squared Euclidean distance.
//!
//! Vectors live in one contiguous row-major buffer. Position `i` occupies
//! `data[i * dimension..(i + 1) * dimension]` and never moves after insertion.

use rayon::prelude::*;
use std::cmp::Ordering;

use crate::errors::IndexError;

/// Below this many vectors a sequential scan beats rayon's fan-out.
const PARALLEL_SCAN_THRESHOLD: usize = 4096;

/// One search hit: a position in the index and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

impl Neighbor {
    /// Ascending distance, ties broken by ascending position.
    fn rank(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.position.cmp(&other.position))
    }
}

/// Flat (brute force) vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index for vectors of `dimension` components.
    pub fn new(dimension: usize) -> Result<Self, IndexError> {
        if dimension == 0 {
            return Err(IndexError::ZeroDimension);
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    /// Rebuild an index from a flat row-major buffer.
    pub(crate) fn from_raw(dimension: usize, data: Vec<f32>) -> Result<Self, IndexError> {
        if dimension == 0 {
            return Err(IndexError::ZeroDimension);
        }
        if data.len() % dimension != 0 {
            return Err(IndexError::InvalidVector(format!(
                "{} values do not divide into rows of {}",
                data.len(),
                dimension
            )));
        }
        Ok(Self { dimension, data })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Vector stored at `position`, if any.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    pub(crate) fn raw(&self) -> &[f32] {
        &self.data
    }

    /// Append vectors at the next positions.
    ///
    /// Either every vector is appended or none is.
    pub fn add<V: AsRef<[f32]>>(&mut self, vectors: &[V]) -> Result<(), IndexError> {
        for vector in vectors {
            self.validate(vector.as_ref())?;
        }

        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector.as_ref());
        }
        Ok(())
    }

    /// Return the `k` closest positions to `query`, nearest first.
    ///
    /// When `k` exceeds the index size every position is returned.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        self.validate(query)?;

        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let distance_at = |(position, row): (usize, &[f32])| Neighbor {
            position,
            distance: squared_euclidean(query, row),
        };

        let mut neighbors: Vec<Neighbor> = if self.len() >= PARALLEL_SCAN_THRESHOLD {
            self.data
                .par_chunks_exact(self.dimension)
                .enumerate()
                .map(distance_at)
                .collect()
        } else {
            self.data
                .chunks_exact(self.dimension)
                .enumerate()
                .map(distance_at)
                .collect()
        };

        if k < neighbors.len() {
            neighbors.select_nth_unstable_by(k - 1, Neighbor::rank);
            neighbors.truncate(k);
        }
        neighbors.sort_unstable_by(Neighbor::rank);

        Ok(neighbors)
    }

    fn validate(&self, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if let Some(i) = vector.iter().position(|v| !v.is_finite()) {
            return Err(IndexError::InvalidVector(format!(
                "non-finite value {} at component {}",
                vector[i], i
            )));
        }
        Ok(())
    }
}

/// Squared L2 distance. Never normalized or capped.
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> FlatIndex {
        let mut index = FlatIndex::new(2).unwrap();
        index
            .add(&[
                vec![0.0, 0.0],
                vec![1.0, 0.0],
                vec![0.0, 2.0],
                vec![3.0, 3.0],
            ])
            .unwrap();
        index
    }

    #[test]
    fn positions_follow_insertion_order() {
        let mut index = sample_index();
        assert_eq!(index.len(), 4);
        index.add(&[vec![9.0, 9.0]]).unwrap();
        assert_eq!(index.len(), 5);
        assert_eq!(index.vector(4), Some(&[9.0, 9.0][..]));
        assert_eq!(index.vector(1), Some(&[1.0, 0.0][..]));
        assert_eq!(index.vector(5), None);
    }

    #[test]
    fn search_orders_by_distance() {
        let index = sample_index();
        let hits = index.search(&[0.9, 0.0], 3).unwrap();
        let positions: Vec<usize> = hits.iter().map(|n| n.position).collect();
        assert_eq!(positions, vec![1, 0, 2]);
        assert!((hits[0].distance - 0.01).abs() < 1e-6);
        assert!((hits[1].distance - 0.81).abs() < 1e-6);
    }

    #[test]
    fn exact_match_has_zero_distance() {
        let index = sample_index();
        let hits = index.search(&[0.0, 2.0], 1).unwrap();
        assert_eq!(hits[0].position, 2);
        assert_eq!(hits[0].distance, 0.0);
    }

    #[test]
    fn k_larger_than_index_returns_everything() {
        let index = sample_index();
        let hits = index.search(&[0.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 4);
    }

    #[test]
    fn zero_k_returns_nothing() {
        let index = sample_index();
        assert!(index.search(&[0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn ties_break_by_position() {
        let mut index = FlatIndex::new(1).unwrap();
        index
            .add(&[vec![1.0], vec![-1.0], vec![1.0], vec![-1.0]])
            .unwrap();
        let hits = index.search(&[0.0], 3).unwrap();
        let positions: Vec<usize> = hits.iter().map(|n| n.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn distance_is_not_capped() {
        let index = sample_index();
        let hits = index.search(&[100.0, 100.0], 1).unwrap();
        assert_eq!(hits[0].position, 3);
        assert_eq!(hits[0].distance, 97.0 * 97.0 * 2.0);
    }

    #[test]
    fn add_rejects_wrong_dimension_atomically() {
        let mut index = sample_index();
        let err = index
            .add(&[vec![1.0, 1.0], vec![1.0, 1.0, 1.0]])
            .unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn rejects_non_finite_values() {
        let mut index = FlatIndex::new(2).unwrap();
        assert!(matches!(
            index.add(&[vec![f32::NAN, 0.0]]),
            Err(IndexError::InvalidVector(_))
        ));
        assert!(index.search(&[f32::INFINITY, 0.0], 1).is_err());
    }

    #[test]
    fn search_rejects_wrong_query_dimension() {
        let index = sample_index();
        assert!(matches!(
            index.search(&[1.0], 1),
            Err(IndexError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(matches!(FlatIndex::new(0), Err(IndexError::ZeroDimension)));
    }

    #[test]
    fn parallel_scan_matches_sequential_order() {
        let mut index = FlatIndex::new(3).unwrap();
        let vectors: Vec<Vec<f32>> = (0..PARALLEL_SCAN_THRESHOLD + 10)
            .map(|i| vec![(i % 97) as f32, (i % 13) as f32, 0.5])
            .collect();
        index.add(&vectors).unwrap();

        let hits = index.search(&[5.0, 5.0, 0.5], 8).unwrap();
        assert_eq!(hits.len(), 8);
        for pair in hits.windows(2) {
            assert!(pair[0].rank(&pair[1]) == Ordering::Less);
        }
        assert_eq!(hits[0].distance, 0.0);
    }
}
