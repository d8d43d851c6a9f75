//! Pairwise similarity graph construction.
//!
//! Compares every tagged note against every other tagged note (O(n²), no
//! approximate or indexed search) and keeps the pairs whose cosine distance
//! is at or below the configured threshold. There is no documented upper
//! bound on note count; at large stores this scan is the scaling limit and
//! would need an indexed nearest-neighbor structure.

use std::collections::BTreeMap;

use crate::models::{NoteId, TaggedNote};

/// An unordered pair of similar notes and their cosine distance.
///
/// Only one direction per pair is materialized (`a < b`).
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityEdge {
    pub a: NoteId,
    pub b: NoteId,
    pub distance: f32,
}

/// Adjacency view over the similarity edges of one scan.
///
/// Ephemeral: built per invocation and discarded with it. Neighbor lists are
/// kept sorted by ascending note id so traversal order is deterministic.
#[derive(Debug, Default)]
pub struct SimilarityGraph {
    edges: Vec<SimilarityEdge>,
    adjacency: BTreeMap<NoteId, Vec<NoteId>>,
}

impl SimilarityGraph {
    /// Builds the similarity graph over the given notes.
    ///
    /// Notes without tags are excluded before any comparison is attempted,
    /// so untagged notes never cost part of the O(n²) scan. Self-comparisons
    /// are excluded and each unordered pair is compared once.
    ///
    /// `distance_threshold` is a cosine distance in `[0, 2]`; a pair becomes
    /// an edge when its distance is less than or equal to it.
    ///
    /// Dimensionality is enforced by the [`crate::embedding::Embedding`]
    /// type, so no comparison here can see mismatched vectors.
    pub fn build(notes: &[TaggedNote], distance_threshold: f32) -> Self {
        let tagged: Vec<&TaggedNote> = notes.iter().filter(|n| !n.tags.is_empty()).collect();

        let mut graph = Self::default();
        for (i, left) in tagged.iter().enumerate() {
            for right in &tagged[i + 1..] {
                let distance = left.embedding.cosine_distance(&right.embedding);
                if distance <= distance_threshold {
                    graph.insert_edge(left.id, right.id, distance);
                }
            }
        }

        for neighbors in graph.adjacency.values_mut() {
            neighbors.sort();
        }

        graph
    }

    fn insert_edge(&mut self, a: NoteId, b: NoteId, distance: f32) {
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        self.edges.push(SimilarityEdge { a, b, distance });
        self.adjacency.entry(a).or_default().push(b);
        self.adjacency.entry(b).or_default().push(a);
    }

    /// All edges, one per unordered pair.
    pub fn edges(&self) -> &[SimilarityEdge] {
        &self.edges
    }

    /// Number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Notes incident to at least one edge, ascending by id.
    pub fn nodes(&self) -> impl Iterator<Item = NoteId> + '_ {
        self.adjacency.keys().copied()
    }

    /// Neighbors of a note, ascending by id. Empty for unknown notes.
    pub fn neighbors(&self, id: NoteId) -> &[NoteId] {
        self.adjacency
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
