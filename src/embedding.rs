//! Fixed-dimension embedding vectors.
//!
//! Notes carry a precomputed 3072-dimensional embedding produced by an
//! external text-to-vector service. This module owns dimension validation,
//! the byte codec used to store vectors in SQLite blobs, and the cosine
//! distance used by the similarity scan.

use thiserror::Error;

/// Number of floats in every embedding vector.
pub const EMBEDDING_DIM: usize = 3072;

/// Errors produced when constructing or decoding an embedding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmbeddingError {
    /// The vector does not have exactly [`EMBEDDING_DIM`] components.
    #[error("embedding must have exactly {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A stored blob is not a whole number of f32 values.
    #[error("embedding blob length {0} is not a multiple of 4")]
    MalformedBlob(usize),
}

/// A validated 3072-dimensional embedding vector.
///
/// Construction goes through [`Embedding::new`] or [`Embedding::from_bytes`],
/// both of which reject any other dimensionality. Once a value exists its
/// dimension is guaranteed, so distance computations never need to re-check.
///
/// # Examples
///
/// ```
/// use semnote::embedding::{Embedding, EmbeddingError, EMBEDDING_DIM};
///
/// let ok = Embedding::new(vec![0.0; EMBEDDING_DIM]);
/// assert!(ok.is_ok());
///
/// let short = Embedding::new(vec![0.0; 100]);
/// assert_eq!(
///     short.unwrap_err(),
///     EmbeddingError::DimensionMismatch { expected: EMBEDDING_DIM, actual: 100 }
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    /// Validates dimensionality and wraps the vector.
    pub fn new(values: Vec<f32>) -> Result<Self, EmbeddingError> {
        if values.len() != EMBEDDING_DIM {
            return Err(EmbeddingError::DimensionMismatch {
                expected: EMBEDDING_DIM,
                actual: values.len(),
            });
        }
        Ok(Self(values))
    }

    /// Decodes an embedding from its little-endian f32 blob representation.
    ///
    /// Rejects blobs whose length is not a multiple of 4 and blobs that do
    /// not decode to exactly [`EMBEDDING_DIM`] floats, so a corrupted row
    /// surfaces as an error instead of a silently truncated vector.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EmbeddingError> {
        if bytes.len() % 4 != 0 {
            return Err(EmbeddingError::MalformedBlob(bytes.len()));
        }
        let values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Self::new(values)
    }

    /// Encodes the embedding as a little-endian f32 blob for storage.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.0.len() * 4);
        for value in &self.0 {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    /// Returns the raw component slice.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Cosine distance to another embedding, in `[0, 2]`.
    ///
    /// Defined as `1 - cosine_similarity`; lower means more similar.
    /// A zero-norm vector has no direction, so its distance to anything is
    /// reported as 1.0 (similarity 0).
    pub fn cosine_distance(&self, other: &Embedding) -> f32 {
        1.0 - cosine_similarity(&self.0, &other.0)
    }
}

/// Cosine similarity between two equal-length vectors.
///
/// Returns a value between -1.0 and 1.0 (1.0 = identical direction,
/// 0.0 = orthogonal). Returns 0.0 when either vector has zero norm.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
