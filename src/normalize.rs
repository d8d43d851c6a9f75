//! Tag-normalization engine.
//!
//! Discovers clusters of semantically near-duplicate notes that were tagged
//! inconsistently, proposes a canonical tag per cluster, and applies a chosen
//! normalization atomically. The analysis half is read-only and runs in three
//! stages:
//!
//! 1. [`graph`]: pairwise similarity scan over every tagged note,
//! 2. [`cluster`]: connected components over the similarity graph,
//! 3. [`suggest`]: per-cluster tag tally and canonical-tag proposal.
//!
//! The mutation half, [`apply`], is invoked separately once an operator has
//! picked a suggestion, and wraps the whole batch in one transaction.

pub mod apply;
pub mod cluster;
pub mod graph;
pub mod suggest;

pub use apply::{apply_normalization, NormalizationReport, NormalizationRequest};
pub use cluster::Cluster;
pub use graph::{SimilarityEdge, SimilarityGraph};
pub use suggest::Suggestion;

use anyhow::Result;
use log::info;

use crate::service::NoteService;

/// Tuning knobs for the analysis pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeConfig {
    /// Cosine similarity (0.0-1.0) above which two notes count as similar.
    pub similarity: f32,
    /// Smallest cluster worth reporting.
    pub min_cluster_size: usize,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            similarity: 0.85,
            min_cluster_size: 2,
        }
    }
}

impl NormalizeConfig {
    /// The distance threshold the graph builder compares against.
    ///
    /// The configuration surface speaks in similarity; the scan works in
    /// cosine distance, converted as `1 - similarity`.
    pub fn distance_threshold(&self) -> f32 {
        1.0 - self.similarity
    }
}

/// Runs the read-only analysis pipeline end to end.
///
/// Loads every tagged note from the store, builds the similarity graph,
/// extracts clusters and returns one [`Suggestion`] per cluster that uses
/// more than one distinct tag name. Empty stores and stores without similar
/// pairs produce an empty list, not an error.
pub fn suggest_normalizations(
    service: &NoteService,
    config: &NormalizeConfig,
) -> Result<Vec<Suggestion>> {
    let notes = service.list_tagged_notes()?;
    info!("scanning {} tagged notes for similar pairs", notes.len());

    let graph = graph::SimilarityGraph::build(&notes, config.distance_threshold());
    info!("similarity graph has {} edges", graph.edge_count());

    let clusters = cluster::extract_clusters(&graph, &notes, config.min_cluster_size);
    info!("found {} clusters of similar notes", clusters.len());

    Ok(suggest::suggestions_for(&clusters))
}
