//! Connected-component extraction over the similarity graph.
//!
//! Two notes land in the same cluster exactly when a path of similarity
//! edges connects them. Similarity is chained, not pairwise: a bridging note
//! can pull together notes that are not directly similar to each other, and
//! that behavior is intentional.

use std::collections::HashSet;

use crate::models::{NoteId, TaggedNote};

use super::graph::SimilarityGraph;

/// A maximal set of transitively similar tagged notes.
///
/// Members are stored in discovery order of the deterministic traversal
/// (ascending-id DFS seeds, ascending-id neighbor expansion), which is the
/// enumeration order the suggestion tally depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    members: Vec<TaggedNote>,
}

impl Cluster {
    /// The member notes, in traversal order.
    pub fn members(&self) -> &[TaggedNote] {
        &self.members
    }

    /// Number of notes in the cluster.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True when the cluster has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member ids, in traversal order.
    pub fn note_ids(&self) -> Vec<NoteId> {
        self.members.iter().map(|n| n.id).collect()
    }
}

/// Partitions the graph's notes into connected components.
///
/// Components with fewer than `min_cluster_size` members are discarded.
/// Traversal is a stack-based depth-first search seeded from nodes in
/// ascending id order, with neighbors pushed in descending order so they
/// pop ascending; repeated runs over the same graph yield identical
/// clusters regardless of input listing order.
pub fn extract_clusters(
    graph: &SimilarityGraph,
    notes: &[TaggedNote],
    min_cluster_size: usize,
) -> Vec<Cluster> {
    let mut visited: HashSet<NoteId> = HashSet::new();
    let mut clusters = Vec::new();

    for seed in graph.nodes() {
        if visited.contains(&seed) {
            continue;
        }

        let mut component = Vec::new();
        let mut stack = vec![seed];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            component.push(current);

            // Reverse order so the smallest unvisited neighbor pops first.
            for &neighbor in graph.neighbors(current).iter().rev() {
                if !visited.contains(&neighbor) {
                    stack.push(neighbor);
                }
            }
        }

        if component.len() >= min_cluster_size {
            let members = component
                .iter()
                .filter_map(|id| notes.iter().find(|n| n.id == *id).cloned())
                .collect();
            clusters.push(Cluster { members });
        }
    }

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{Embedding, EMBEDDING_DIM};

    fn note(id: i64, tags: &[&str], x: f32, y: f32) -> TaggedNote {
        let mut values = vec![0.0; EMBEDDING_DIM];
        values[0] = x;
        values[1] = y;
        TaggedNote {
            id: NoteId::new(id),
            title: format!("note-{id}"),
            embedding: Embedding::new(values).unwrap(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Unit vector at `angle` radians in the first two dimensions.
    fn angled_note(id: i64, tags: &[&str], angle: f32) -> TaggedNote {
        note(id, tags, angle.cos(), angle.sin())
    }

    #[test]
    fn mutually_similar_notes_form_one_cluster() {
        let notes = vec![
            note(1, &["a"], 1.0, 0.0),
            note(2, &["b"], 1.0, 0.0),
            note(3, &["c"], 1.0, 0.0),
        ];
        let graph = SimilarityGraph::build(&notes, 0.15);
        let clusters = extract_clusters(&graph, &notes, 2);

        assert_eq!(clusters.len(), 1);
        assert_eq!(
            clusters[0].note_ids(),
            vec![NoteId::new(1), NoteId::new(2), NoteId::new(3)]
        );
    }

    #[test]
    fn transitive_chains_cluster_without_pairwise_similarity() {
        // 1 and 3 sit 40 degrees apart (distance ~0.23, beyond the 0.15
        // threshold) but both sit 20 degrees from the bridge note 2
        // (distance ~0.06). The bridge must pull all three together.
        let step = 20f32.to_radians();
        let notes = vec![
            angled_note(1, &["a"], 0.0),
            angled_note(2, &["b"], step),
            angled_note(3, &["c"], 2.0 * step),
        ];
        let graph = SimilarityGraph::build(&notes, 0.15);

        // Precondition: the endpoints are not directly connected.
        assert_eq!(graph.neighbors(NoteId::new(1)), &[NoteId::new(2)]);
        assert_eq!(graph.neighbors(NoteId::new(3)), &[NoteId::new(2)]);

        let clusters = extract_clusters(&graph, &notes, 2);
        assert_eq!(clusters.len(), 1);
        assert_eq!(
            clusters[0].note_ids(),
            vec![NoteId::new(1), NoteId::new(2), NoteId::new(3)]
        );
    }

    #[test]
    fn disconnected_groups_form_separate_clusters() {
        let notes = vec![
            note(1, &["a"], 1.0, 0.0),
            note(2, &["b"], 1.0, 0.0),
            note(3, &["c"], 0.0, 1.0),
            note(4, &["d"], 0.0, 1.0),
        ];
        let graph = SimilarityGraph::build(&notes, 0.15);
        let clusters = extract_clusters(&graph, &notes, 2);

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].note_ids(), vec![NoteId::new(1), NoteId::new(2)]);
        assert_eq!(clusters[1].note_ids(), vec![NoteId::new(3), NoteId::new(4)]);
    }

    #[test]
    fn clusters_are_disjoint() {
        let notes: Vec<TaggedNote> = (1..=6)
            .map(|id| note(id, &["t"], if id <= 3 { 1.0 } else { 0.0 }, if id <= 3 { 0.0 } else { 1.0 }))
            .collect();
        let graph = SimilarityGraph::build(&notes, 0.15);
        let clusters = extract_clusters(&graph, &notes, 2);

        let mut seen = HashSet::new();
        for cluster in &clusters {
            for id in cluster.note_ids() {
                assert!(seen.insert(id), "note {id} appears in two clusters");
            }
        }
    }

    #[test]
    fn membership_is_independent_of_listing_order() {
        let forward = vec![
            note(1, &["a"], 1.0, 0.0),
            note(2, &["b"], 1.0, 0.0),
            note(3, &["c"], 0.0, 1.0),
            note(4, &["d"], 0.0, 1.0),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let clusters_fwd = extract_clusters(&SimilarityGraph::build(&forward, 0.15), &forward, 2);
        let clusters_rev = extract_clusters(&SimilarityGraph::build(&reversed, 0.15), &reversed, 2);

        let ids_fwd: Vec<Vec<NoteId>> = clusters_fwd.iter().map(|c| c.note_ids()).collect();
        let ids_rev: Vec<Vec<NoteId>> = clusters_rev.iter().map(|c| c.note_ids()).collect();
        assert_eq!(ids_fwd, ids_rev);
    }

    #[test]
    fn small_components_are_discarded() {
        let notes = vec![
            note(1, &["a"], 1.0, 0.0),
            note(2, &["b"], 1.0, 0.0),
            note(3, &["c"], 0.0, 1.0),
        ];
        let graph = SimilarityGraph::build(&notes, 0.15);

        let pairs = extract_clusters(&graph, &notes, 2);
        assert_eq!(pairs.len(), 1);

        let triples = extract_clusters(&graph, &notes, 3);
        assert!(triples.is_empty());
    }

    #[test]
    fn empty_graph_yields_no_clusters() {
        let notes = vec![note(1, &["a"], 1.0, 0.0), note(2, &["b"], 0.0, 1.0)];
        let graph = SimilarityGraph::build(&notes, 0.15);
        assert!(extract_clusters(&graph, &notes, 2).is_empty());
    }
}
