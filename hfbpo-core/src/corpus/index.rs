//! Embedding index over one modifier pool
//!
//! A full scan over unit-normalized vectors. Pools hold hundreds of terms, so
//! no approximate structure is needed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::embedder::{cosine_similarity, normalize};
use crate::error::{HfbpoError, Result};

use super::Pool;

/// A modifier term with its embedding, as stored in the corpus artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierTerm {
    pub text: String,
    pub embedding: Vec<f32>,
}

impl ModifierTerm {
    pub fn new(text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            embedding,
        }
    }
}

/// Rank `pool` by cosine similarity to `query` and return the indices of the
/// `k` best, most similar first.
///
/// Ties keep insertion order. An empty pool yields an empty list; vectors of
/// differing length fail with `DimensionMismatch`.
pub fn top_k(pool: &[Vec<f32>], query: &[f32], k: usize) -> Result<Vec<usize>> {
    let Some(first) = pool.first() else {
        return Ok(Vec::new());
    };
    let dimensions = first.len();
    check_dimensions("pool vector", dimensions, query.len())?;

    let mut unit = Vec::with_capacity(pool.len());
    for vector in pool {
        check_dimensions("pool vector", dimensions, vector.len())?;
        let mut v = vector.clone();
        normalize(&mut v);
        unit.push(v);
    }

    Ok(rank_normalized(&unit, query, k, |_| true))
}

fn check_dimensions(context: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(HfbpoError::DimensionMismatch {
            context: context.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Rank already-normalized vectors against `query`, keeping only indices
/// accepted by `keep`.
fn rank_normalized(
    unit: &[Vec<f32>],
    query: &[f32],
    k: usize,
    keep: impl Fn(usize) -> bool,
) -> Vec<usize> {
    let mut scored: Vec<(usize, f32)> = unit
        .iter()
        .enumerate()
        .filter(|(i, _)| keep(*i))
        .map(|(i, v)| (i, cosine_similarity(v, query)))
        .collect();

    // sort_by is stable, so equal scores keep insertion order
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k);
    scored.into_iter().map(|(i, _)| i).collect()
}

/// Embedding index for a single pool (places, verbs or scenarios)
#[derive(Debug, Clone)]
pub struct EmbeddingIndex {
    pool: Pool,
    texts: Vec<String>,
    unit: Vec<Vec<f32>>,
    positions: HashMap<String, usize>,
    dimensions: Option<usize>,
}

impl EmbeddingIndex {
    /// Build an index from terms in insertion order.
    ///
    /// Fails on mixed dimensionality, non-finite components or a repeated text.
    pub fn new(pool: Pool, terms: Vec<ModifierTerm>) -> Result<Self> {
        let mut index = Self::empty(pool);

        for term in terms {
            let dims = *index.dimensions.get_or_insert(term.embedding.len());
            check_dimensions(&format!("{pool} pool"), dims, term.embedding.len())?;

            if term.embedding.iter().any(|x| !x.is_finite()) {
                return Err(HfbpoError::InvalidEmbedding {
                    pool: pool.to_string(),
                    text: term.text,
                });
            }
            if index.positions.contains_key(&term.text) {
                return Err(HfbpoError::DuplicateTerm {
                    pool: pool.to_string(),
                    text: term.text,
                });
            }

            let mut unit = term.embedding;
            normalize(&mut unit);
            index.positions.insert(term.text.clone(), index.texts.len());
            index.texts.push(term.text);
            index.unit.push(unit);
        }

        Ok(index)
    }

    /// An index with no terms
    pub fn empty(pool: Pool) -> Self {
        Self {
            pool,
            texts: Vec::new(),
            unit: Vec::new(),
            positions: HashMap::new(),
            dimensions: None,
        }
    }

    pub fn pool(&self) -> Pool {
        self.pool
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Shared dimensionality of the pool, `None` while empty
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    /// Term texts in insertion order
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn position(&self, text: &str) -> Option<usize> {
        self.positions.get(text).copied()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.positions.contains_key(text)
    }

    /// Indices of the `k` terms most similar to `query`
    pub fn top_k(&self, query: &[f32], k: usize) -> Result<Vec<usize>> {
        let Some(dims) = self.dimensions else {
            return Ok(Vec::new());
        };
        check_dimensions(&format!("{} query", self.pool), dims, query.len())?;
        Ok(rank_normalized(&self.unit, query, k, |_| true))
    }

    /// Texts of the `k` terms most similar to `query`
    pub fn top_k_texts(&self, query: &[f32], k: usize) -> Result<Vec<&str>> {
        self.top_k_texts_where(query, k, |_| true)
    }

    /// Like [`top_k_texts`](Self::top_k_texts), but terms rejected by `keep`
    /// never take one of the `k` slots.
    pub fn top_k_texts_where(
        &self,
        query: &[f32],
        k: usize,
        keep: impl Fn(&str) -> bool,
    ) -> Result<Vec<&str>> {
        let Some(dims) = self.dimensions else {
            return Ok(Vec::new());
        };
        check_dimensions(&format!("{} query", self.pool), dims, query.len())?;
        Ok(
            rank_normalized(&self.unit, query, k, |i| keep(self.texts[i].as_str()))
                .into_iter()
                .map(|i| self.texts[i].as_str())
                .collect(),
        )
    }

    /// Cosine similarity between a known term and `query`.
    ///
    /// `None` if the term is absent or the query has the wrong length.
    pub fn similarity(&self, text: &str, query: &[f32]) -> Option<f32> {
        let position = self.position(text)?;
        if Some(query.len()) != self.dimensions {
            return None;
        }
        Some(cosine_similarity(&self.unit[position], query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(terms: &[(&str, [f32; 2])]) -> EmbeddingIndex {
        EmbeddingIndex::new(
            Pool::Place,
            terms
                .iter()
                .map(|(t, v)| ModifierTerm::new(*t, v.to_vec()))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_top_k_orders_by_similarity() {
        let idx = index(&[("east", [1.0, 0.0]), ("north", [0.0, 1.0]), ("ne", [1.0, 1.0])]);
        let ranked = idx.top_k_texts(&[0.0, 2.0], 3).unwrap();
        assert_eq!(ranked, vec!["north", "ne", "east"]);
    }

    #[test]
    fn test_top_k_length_is_min_of_k_and_n() {
        let idx = index(&[("a", [1.0, 0.0]), ("b", [0.0, 1.0])]);
        assert_eq!(idx.top_k(&[1.0, 0.0], 5).unwrap().len(), 2);
        assert_eq!(idx.top_k(&[1.0, 0.0], 1).unwrap().len(), 1);
        assert!(idx.top_k(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        // Same direction, different magnitude: identical cosine
        let idx = index(&[("first", [1.0, 0.0]), ("second", [3.0, 0.0]), ("other", [0.0, 1.0])]);
        assert_eq!(idx.top_k_texts(&[1.0, 0.0], 2).unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_empty_pool_returns_empty() {
        let idx = EmbeddingIndex::empty(Pool::Verb);
        assert!(idx.top_k(&[1.0, 2.0, 3.0], 3).unwrap().is_empty());
        assert!(top_k(&[], &[1.0], 3).unwrap().is_empty());
    }

    #[test]
    fn test_mixed_dimensions_rejected() {
        let err = EmbeddingIndex::new(
            Pool::Scenario,
            vec![
                ModifierTerm::new("calm", vec![1.0, 0.0]),
                ModifierTerm::new("tense", vec![1.0, 0.0, 0.0]),
            ],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            HfbpoError::DimensionMismatch {
                expected: 2,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let idx = index(&[("a", [1.0, 0.0])]);
        assert!(matches!(
            idx.top_k(&[1.0, 0.0, 0.0], 1),
            Err(HfbpoError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_duplicate_term_rejected() {
        let err = EmbeddingIndex::new(
            Pool::Place,
            vec![
                ModifierTerm::new("cafe", vec![1.0]),
                ModifierTerm::new("cafe", vec![0.5]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, HfbpoError::DuplicateTerm { .. }));
    }

    #[test]
    fn test_non_finite_embedding_rejected() {
        let err = EmbeddingIndex::new(Pool::Place, vec![ModifierTerm::new("x", vec![f32::NAN])])
            .unwrap_err();
        assert!(matches!(err, HfbpoError::InvalidEmbedding { .. }));
    }

    #[test]
    fn test_free_top_k_matches_index() {
        let pool = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]];
        assert_eq!(top_k(&pool, &[0.1, 1.0], 2).unwrap(), vec![1, 2]);
        assert!(top_k(&[vec![1.0], vec![1.0, 2.0]], &[1.0], 1).is_err());
    }

    #[test]
    fn test_filtered_terms_do_not_take_slots() {
        let idx = index(&[("best", [1.0, 0.0]), ("second", [0.9, 0.1]), ("third", [0.0, 1.0])]);
        let ranked = idx
            .top_k_texts_where(&[1.0, 0.0], 1, |text| text != "best")
            .unwrap();
        assert_eq!(ranked, vec!["second"]);
    }

    #[test]
    fn test_similarity_lookup() {
        let idx = index(&[("a", [1.0, 0.0])]);
        assert!((idx.similarity("a", &[2.0, 0.0]).unwrap() - 1.0).abs() < 1e-6);
        assert!(idx.similarity("missing", &[1.0, 0.0]).is_none());
        assert!(idx.similarity("a", &[1.0]).is_none());
    }
}
