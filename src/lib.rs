//! semnote - a personal note store with semantic search and tag
//! normalization.
//!
//! Notes carry precomputed 3072-dimensional embeddings; the
//! [`normalize`] module discovers clusters of semantically near-duplicate
//! notes that were tagged inconsistently, proposes a canonical tag per
//! cluster and applies the chosen normalization atomically.

pub mod db;
pub mod embedder;
pub mod embedding;
pub mod models;
pub mod normalize;
pub mod service;

pub use db::Database;
pub use models::{Note, NoteId, Tag, TagId, TaggedNote};
pub use normalize::{
    suggest_normalizations, NormalizationReport, NormalizationRequest, NormalizeConfig, Suggestion,
};
pub use service::{NoteService, SearchHit, SortOrder, StoreStats};
