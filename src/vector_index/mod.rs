//! Exact nearest-neighbour index over fixed-dimension embeddings.
//!
//! Vectors and their source texts live in two parallel stores: entry `i` of
//! `texts` always belongs to the `i`-th vector. Search is a brute-force scan
//! by squared Euclidean distance, which is exact and fast enough for the
//! per-session chunk counts this index holds.

mod codec;

use crate::error::{Result, ScribeError};
use std::cmp::Ordering;
use tracing::debug;

/// A search result: the stored text and its squared L2 distance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub text: String,
    pub distance: f32,
}

/// In-memory flat L2 index.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dimensions: usize,
    /// Row-major, `len() * dimensions` values.
    vectors: Vec<f32>,
    texts: Vec<String>,
}

impl VectorIndex {
    /// Create an empty index for vectors of `dimensions` components.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: Vec::new(),
            texts: Vec::new(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Stored texts in insertion order.
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    /// Append `vectors` and `texts` pairwise.
    ///
    /// The batch is validated before anything is stored, so a failed call
    /// leaves the index unchanged.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>, texts: Vec<String>) -> Result<()> {
        if vectors.len() != texts.len() {
            return Err(ScribeError::InvalidInput(format!(
                "{} vectors supplied for {} texts",
                vectors.len(),
                texts.len()
            )));
        }

        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(ScribeError::DimensionMismatch {
                expected: self.dimensions,
                actual: bad.len(),
            });
        }

        self.vectors.reserve(vectors.len() * self.dimensions);
        for vector in vectors {
            self.vectors.extend(vector);
        }
        self.texts.extend(texts);

        debug!("Index now holds {} entries", self.texts.len());
        Ok(())
    }

    /// Return the `top_k` entries closest to `query`, nearest first.
    ///
    /// Ties keep insertion order. Fewer than `top_k` entries stored means all
    /// of them are returned.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimensions {
            return Err(ScribeError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = (0..self.len())
            .map(|i| (i, squared_l2(query, self.row(i))))
            .collect();

        // Stable sort, so equal distances stay in insertion order.
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, distance)| SearchHit {
                text: self.texts[i].clone(),
                distance,
            })
            .collect())
    }

    /// Vector of entry `i`.
    pub(crate) fn row(&self, i: usize) -> &[f32] {
        &self.vectors[i * self.dimensions..(i + 1) * self.dimensions]
    }
}

/// Squared Euclidean distance between two equally sized vectors.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> VectorIndex {
        let mut index = VectorIndex::new(2);
        index
            .add(
                vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 3.0]],
                vec!["origin".into(), "east".into(), "north".into()],
            )
            .unwrap();
        index
    }

    #[test]
    fn test_squared_l2() {
        assert_eq!(squared_l2(&[1.0, 2.0], &[4.0, 6.0]), 25.0);
        assert_eq!(squared_l2(&[0.5], &[0.5]), 0.0);
    }

    #[test]
    fn test_search_orders_by_distance() {
        let index = sample_index();
        let hits = index.search(&[0.9, 0.1], 3).unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].text, "east");
        assert_eq!(hits[1].text, "origin");
        assert_eq!(hits[2].text, "north");
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert!((hits[0].distance - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_search_truncates_to_top_k() {
        let index = sample_index();
        assert_eq!(index.search(&[0.0, 0.0], 2).unwrap().len(), 2);
        assert_eq!(index.search(&[0.0, 0.0], 10).unwrap().len(), 3);
        assert!(VectorIndex::new(2).search(&[0.0, 0.0], 3).unwrap().is_empty());
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut index = VectorIndex::new(1);
        index
            .add(
                vec![vec![1.0], vec![-1.0], vec![1.0]],
                vec!["a".into(), "b".into(), "c".into()],
            )
            .unwrap();
        let hits = index.search(&[0.0], 3).unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_add_in_batches_keeps_pairs_aligned() {
        let mut index = VectorIndex::new(1);
        index.add(vec![vec![10.0]], vec!["ten".into()]).unwrap();
        index
            .add(vec![vec![20.0], vec![30.0]], vec!["twenty".into(), "thirty".into()])
            .unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(index.search(&[29.0], 1).unwrap()[0].text, "thirty");
        assert_eq!(index.search(&[11.0], 1).unwrap()[0].text, "ten");
    }

    #[test]
    fn test_add_rejects_dimension_mismatch_atomically() {
        let mut index = sample_index();
        let result = index.add(
            vec![vec![1.0, 1.0], vec![1.0, 1.0, 1.0]],
            vec!["ok".into(), "bad".into()],
        );
        assert!(matches!(
            result,
            Err(ScribeError::DimensionMismatch { expected: 2, actual: 3 })
        ));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_add_rejects_length_mismatch() {
        let mut index = VectorIndex::new(2);
        let result = index.add(vec![vec![1.0, 1.0]], vec![]);
        assert!(matches!(result, Err(ScribeError::InvalidInput(_))));
        assert!(index.is_empty());
    }

    #[test]
    fn test_query_dimension_checked() {
        let index = sample_index();
        assert!(matches!(
            index.search(&[1.0, 2.0, 3.0], 1),
            Err(ScribeError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }
}
