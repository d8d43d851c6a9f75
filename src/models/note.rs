use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::NoteId;
use crate::embedding::Embedding;

/// A stored note with its content and tag names.
///
/// Notes are the primary unit of capture in the system. Each note carries a
/// title, freeform text content and zero or more tag names. The embedding is
/// deliberately absent here; fetch a [`TaggedNote`] when the vector is needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier from the database.
    pub id: NoteId,
    /// The note's title.
    pub title: String,
    /// The note's content.
    pub content: String,
    /// When this note was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When this note was last updated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// Names of the tags attached to this note.
    pub tags: Vec<String>,
}

/// The analysis-pipeline projection of a note.
///
/// Carries exactly what the similarity scan and the suggestion generator
/// consume: identifier, title for operator display, the embedding vector and
/// the attached tag names. Only notes with at least one tag are ever
/// materialized in this form.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedNote {
    pub id: NoteId,
    pub title: String,
    pub embedding: Embedding,
    pub tags: Vec<String>,
}
