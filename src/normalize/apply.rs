//! Atomic application of an operator-approved tag normalization.
//!
//! The whole request runs in one transaction scope: either every requested
//! note ends up normalized, or none of them shows any change. Unknown note
//! ids are the only tolerated irregularity; they are skipped with a warning
//! and the rest of the batch proceeds.

use anyhow::Result;
use log::warn;

use crate::models::NoteId;
use crate::service::NoteService;

/// An operator-chosen normalization to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationRequest {
    /// Notes to normalize, processed in this order.
    pub note_ids: Vec<NoteId>,
    /// The tag every listed note should end up carrying.
    pub keep_tag: String,
    /// Tag names to strip from every listed note.
    pub replace_tags: Vec<String>,
}

/// Outcome of one normalization batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    /// Notes that existed and were processed.
    pub notes_updated: usize,
    /// Tag links removed across the batch.
    pub links_removed: usize,
    /// Tag links added across the batch.
    pub links_added: usize,
    /// Requested ids that did not resolve to a note.
    pub missing_notes: Vec<NoteId>,
}

/// Applies a normalization request as a single atomic transaction.
///
/// Steps:
/// 1. resolve or create the keep tag (get-or-create, no duplicate rows),
/// 2. for each note id in input order: skip missing notes with a warning;
///    otherwise remove every link whose tag name is in `replace_tags` and
///    link the keep tag unless already present,
/// 3. commit if every step succeeded, otherwise roll back everything.
///
/// Re-applying an identical request is a no-op: already-absent tags are not
/// re-removed and an already-present keep tag is not re-added, so the second
/// report shows zero removals and additions.
pub fn apply_normalization(
    service: &NoteService,
    request: &NormalizationRequest,
) -> Result<NormalizationReport> {
    service.begin()?;

    let result: Result<NormalizationReport> = (|| {
        let keep_tag_id = service.get_or_create_tag(&request.keep_tag)?;
        let mut report = NormalizationReport::default();

        for &note_id in &request.note_ids {
            if !service.note_exists(note_id)? {
                warn!("note {note_id} not found, skipping");
                report.missing_notes.push(note_id);
                continue;
            }

            let links = service.note_tag_links(note_id)?;
            let has_keep_tag = links.iter().any(|(_, name)| name == &request.keep_tag);

            for (tag_id, name) in &links {
                if request.replace_tags.contains(name)
                    && service.remove_tag_link(note_id, *tag_id)?
                {
                    report.links_removed += 1;
                }
            }

            if !has_keep_tag && service.add_tag_link(note_id, keep_tag_id)? {
                report.links_added += 1;
            }

            report.notes_updated += 1;
        }

        Ok(report)
    })();

    match result {
        Ok(report) => {
            service.commit()?;
            Ok(report)
        }
        Err(e) => {
            service.rollback().ok();
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{Embedding, EMBEDDING_DIM};
    use crate::Database;

    fn service_with_notes(tag_sets: &[&[&str]]) -> (NoteService, Vec<NoteId>) {
        let db = Database::in_memory().expect("in-memory database");
        let service = NoteService::new(db);
        let embedding = Embedding::new(vec![0.0; EMBEDDING_DIM]).unwrap();

        let mut ids = Vec::new();
        for (i, tags) in tag_sets.iter().enumerate() {
            let note = service
                .create_note(&format!("note-{i}"), "content", &embedding, Some(tags))
                .unwrap();
            ids.push(note.id);
        }
        (service, ids)
    }

    #[test]
    fn replaces_tags_and_adds_keep_tag() {
        let (service, ids) = service_with_notes(&[&["py"], &["python"], &["py", "python"]]);

        let report = apply_normalization(
            &service,
            &NormalizationRequest {
                note_ids: ids.clone(),
                keep_tag: "python".to_string(),
                replace_tags: vec!["py".to_string()],
            },
        )
        .unwrap();

        assert_eq!(report.notes_updated, 3);
        assert_eq!(report.links_removed, 2, "py stripped from notes 0 and 2");
        assert_eq!(report.links_added, 1, "python added to note 0 only");
        assert!(report.missing_notes.is_empty());

        for id in ids {
            assert_eq!(
                service.note_tag_names(id).unwrap(),
                vec!["python".to_string()]
            );
        }
    }

    #[test]
    fn creates_keep_tag_when_absent() {
        let (service, ids) = service_with_notes(&[&["old"]]);

        apply_normalization(
            &service,
            &NormalizationRequest {
                note_ids: ids.clone(),
                keep_tag: "brand-new".to_string(),
                replace_tags: vec!["old".to_string()],
            },
        )
        .unwrap();

        assert_eq!(
            service.note_tag_names(ids[0]).unwrap(),
            vec!["brand-new".to_string()]
        );

        // get-or-create: exactly one row for the new tag.
        let count: i64 = service
            .database()
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM tags WHERE name = 'brand-new'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn missing_notes_warn_and_processing_continues() {
        // Scenario C: one unknown id in the middle of the batch.
        let (service, ids) = service_with_notes(&[&["py"], &["py"]]);

        let report = apply_normalization(
            &service,
            &NormalizationRequest {
                note_ids: vec![ids[0], ids[1], NoteId::new(999)],
                keep_tag: "python".to_string(),
                replace_tags: vec!["py".to_string()],
            },
        )
        .unwrap();

        assert_eq!(report.notes_updated, 2);
        assert_eq!(report.missing_notes, vec![NoteId::new(999)]);
        for id in &ids {
            assert_eq!(
                service.note_tag_names(*id).unwrap(),
                vec!["python".to_string()]
            );
        }
    }

    #[test]
    fn apply_is_idempotent() {
        let (service, ids) = service_with_notes(&[&["py"], &["python"]]);

        let request = NormalizationRequest {
            note_ids: ids.clone(),
            keep_tag: "python".to_string(),
            replace_tags: vec!["py".to_string()],
        };

        let first = apply_normalization(&service, &request).unwrap();
        assert_eq!(first.links_removed, 1);
        assert_eq!(first.links_added, 1);

        let tags_after_first: Vec<Vec<String>> = ids
            .iter()
            .map(|id| service.note_tag_names(*id).unwrap())
            .collect();

        let second = apply_normalization(&service, &request).unwrap();
        assert_eq!(second.links_removed, 0, "nothing left to remove");
        assert_eq!(second.links_added, 0, "keep tag already present");

        let tags_after_second: Vec<Vec<String>> = ids
            .iter()
            .map(|id| service.note_tag_names(*id).unwrap())
            .collect();
        assert_eq!(tags_after_first, tags_after_second);
    }

    #[test]
    fn untouched_tags_survive() {
        let (service, ids) = service_with_notes(&[&["py", "keepme"]]);

        apply_normalization(
            &service,
            &NormalizationRequest {
                note_ids: ids.clone(),
                keep_tag: "python".to_string(),
                replace_tags: vec!["py".to_string()],
            },
        )
        .unwrap();

        let mut tags = service.note_tag_names(ids[0]).unwrap();
        tags.sort();
        assert_eq!(tags, vec!["keepme".to_string(), "python".to_string()]);
    }

    #[test]
    fn empty_note_list_reports_zeros() {
        let (service, _ids) = service_with_notes(&[&["py"]]);

        let report = apply_normalization(
            &service,
            &NormalizationRequest {
                note_ids: Vec::new(),
                keep_tag: "python".to_string(),
                replace_tags: vec!["py".to_string()],
            },
        )
        .unwrap();

        assert_eq!(report, NormalizationReport::default());
    }
}
