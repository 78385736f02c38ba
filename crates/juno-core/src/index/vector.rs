//! Vector index trait.
//!
//! Persistent nearest-neighbour storage for embedded chunks. The LanceDB
//! implementation lives in juno-infra.
//!
//! Every vector in one index has the dimension fixed when the index was
//! created. Vectors of any other length are rejected with
//! `IndexError::DimensionMismatch` on insert and query.

use juno_types::index::{IndexError, IndexedItem, RankedResult};

/// Trait for the repository vector index.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait VectorIndex: Send + Sync {
    /// Create the index if it does not exist. Idempotent.
    ///
    /// Opening an existing index built with a different dimension fails with
    /// `DimensionMismatch`.
    fn ensure_created(&self) -> impl std::future::Future<Output = Result<(), IndexError>> + Send;

    /// Whether the index has been created.
    fn exists(&self) -> impl std::future::Future<Output = Result<bool, IndexError>> + Send;

    /// Append one item. Identical items may be inserted more than once.
    fn insert(
        &self,
        item: &IndexedItem,
    ) -> impl std::future::Future<Output = Result<(), IndexError>> + Send;

    /// Remove every item belonging to `file_path`. Returns how many were removed.
    fn delete_file(
        &self,
        file_path: &str,
    ) -> impl std::future::Future<Output = Result<usize, IndexError>> + Send;

    /// Stored content hash of `file_path`, if any of its chunks are indexed.
    fn file_hash(
        &self,
        file_path: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, IndexError>> + Send;

    /// The `top_k` nearest items by cosine distance, ascending. Equal
    /// distances keep insertion order.
    fn query(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> impl std::future::Future<Output = Result<Vec<RankedResult>, IndexError>> + Send;

    /// Destroy the persisted index. Succeeds when there is nothing to delete.
    fn delete_index(&self) -> impl std::future::Future<Output = Result<(), IndexError>> + Send;

    /// Number of stored items; zero when the index does not exist.
    fn count(&self) -> impl std::future::Future<Output = Result<usize, IndexError>> + Send;

    /// Vector dimension this index accepts.
    fn dimension(&self) -> usize;
}

/// Reject `vector` unless it has `expected` components.
pub fn check_dimension(expected: usize, vector: &[f32]) -> Result<(), IndexError> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(IndexError::DimensionMismatch {
            expected,
            actual: vector.len(),
        })
    }
}

/// Cosine distance (`1 - cosine similarity`). Zero vectors are treated as
/// maximally distant.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_vectors_have_zero_distance() {
        let v = [0.3, 0.4, 0.5];
        assert!(cosine_distance(&v, &v).abs() < 1e-6);
    }

    #[test]
    fn test_orthogonal_vectors_have_unit_distance() {
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_is_far_from_everything() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn test_dimension_check() {
        assert!(check_dimension(3, &[1.0, 2.0, 3.0]).is_ok());
        let err = check_dimension(3, &[1.0]).unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 3,
                actual: 1
            }
        ));
    }
}
