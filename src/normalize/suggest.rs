//! Per-cluster tag tallying and normalization suggestions.
//!
//! A cluster whose members all carry the same single tag name has nothing to
//! normalize and produces no suggestion. Every other cluster yields one
//! [`Suggestion`]: the tally of tag usage, the most common tag, and one
//! keep-this-replace-the-rest alternative per distinct tag.

use std::fmt;

use crate::models::NoteId;

use super::cluster::Cluster;

/// Insertion-ordered tag-usage tally.
///
/// Iteration order is the order tag names were first encountered while
/// walking the cluster, which makes tie-breaking deterministic. A hash map
/// would leave the tie-break implementation-defined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagTally {
    entries: Vec<(String, usize)>,
}

impl TagTally {
    /// Increments the count for `name`, registering it on first sight.
    pub fn bump(&mut self, name: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| n == name) {
            entry.1 += 1;
        } else {
            self.entries.push((name.to_string(), 1));
        }
    }

    /// `(name, count)` pairs in first-encountered order.
    pub fn entries(&self) -> &[(String, usize)] {
        &self.entries
    }

    /// Number of distinct tag names.
    pub fn distinct(&self) -> usize {
        self.entries.len()
    }

    /// The highest-count tag; ties go to the first-encountered name.
    pub fn most_common(&self) -> Option<&str> {
        let mut best: Option<&(String, usize)> = None;
        for entry in &self.entries {
            match best {
                Some((_, count)) if entry.1 <= *count => {}
                _ => best = Some(entry),
            }
        }
        best.map(|(name, _)| name.as_str())
    }
}

/// One keep-this-tag option offered to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternative {
    /// The tag to keep on every note of the cluster.
    pub keep: String,
    /// How many member notes currently carry it.
    pub count: usize,
    /// Every other distinct tag in the cluster, in tally order.
    pub replace: Vec<String>,
}

/// A proposed tag normalization for one cluster of similar notes.
///
/// Purely transient: rendered for the operator and discarded, never
/// persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    note_ids: Vec<NoteId>,
    note_titles: Vec<String>,
    tags: TagTally,
    most_common_tag: String,
}

impl Suggestion {
    /// Member note ids, in cluster order.
    pub fn note_ids(&self) -> &[NoteId] {
        &self.note_ids
    }

    /// Member note titles, in cluster order.
    pub fn note_titles(&self) -> &[String] {
        &self.note_titles
    }

    /// The tag-usage tally of the cluster.
    pub fn tags(&self) -> &TagTally {
        &self.tags
    }

    /// The default canonical candidate: the most used tag in the cluster.
    pub fn most_common_tag(&self) -> &str {
        &self.most_common_tag
    }

    /// Every distinct tag except the one being kept, in tally order.
    ///
    /// With `keep_tag = None` the most common tag is kept.
    pub fn other_tags(&self, keep_tag: Option<&str>) -> Vec<String> {
        let keep = keep_tag.unwrap_or(&self.most_common_tag);
        self.tags
            .entries()
            .iter()
            .filter(|(name, _)| name != keep)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// The full set of operator options: one alternative per distinct tag,
    /// ordered by descending usage count, then tag name.
    ///
    /// This enumeration is the contract the apply command is driven by.
    pub fn alternatives(&self) -> Vec<Alternative> {
        let mut ranked: Vec<&(String, usize)> = self.tags.entries().iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        ranked
            .into_iter()
            .map(|(name, count)| Alternative {
                keep: name.clone(),
                count: *count,
                replace: self.other_tags(Some(name)),
            })
            .collect()
    }
}

impl fmt::Display for Suggestion {
    /// Renders the operator-facing proposal: member titles, per-tag counts
    /// and one ready-to-run apply command per alternative.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Found a group of similar notes with different tags:")?;
        writeln!(f, "    Notes ({}):", self.note_ids.len())?;
        for title in &self.note_titles {
            writeln!(f, "      - {title}")?;
        }

        writeln!(f)?;
        writeln!(f, "    Current tag usage:")?;
        for alternative in self.alternatives() {
            writeln!(f, "      - {} ({} notes)", alternative.keep, alternative.count)?;
        }

        writeln!(f)?;
        writeln!(f, "    Options to normalize these tags:")?;

        let ids = self
            .note_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        for alternative in self.alternatives() {
            writeln!(f)?;
            writeln!(f, "    # To keep '{}' and replace others:", alternative.keep)?;
            writeln!(
                f,
                "    semnote apply --note-ids {ids} --keep-tag \"{}\" --replace-tags \"{}\"",
                alternative.keep,
                alternative.replace.join(",")
            )?;
        }

        Ok(())
    }
}

/// Builds suggestions from extracted clusters.
///
/// Tallies every tag of every member in cluster order; clusters with a
/// single distinct tag are skipped.
pub fn suggestions_for(clusters: &[Cluster]) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    for cluster in clusters {
        let mut tally = TagTally::default();
        for member in cluster.members() {
            for tag in &member.tags {
                tally.bump(tag);
            }
        }

        if tally.distinct() <= 1 {
            continue;
        }

        let Some(most_common_tag) = tally.most_common().map(str::to_string) else {
            continue;
        };

        suggestions.push(Suggestion {
            note_ids: cluster.note_ids(),
            note_titles: cluster.members().iter().map(|n| n.title.clone()).collect(),
            tags: tally,
            most_common_tag,
        });
    }

    suggestions
}
