use anyhow::Result;
use rusqlite::OptionalExtension;
use time::OffsetDateTime;

use crate::embedding::Embedding;
use crate::models::{Note, NoteId, TagId, TaggedNote};
use crate::Database;

/// Service layer providing note management operations.
///
/// NoteService owns a Database instance and provides high-level operations
/// for working with notes, tags and their links. It is also the store the
/// tag-normalization engine runs against: the analysis pipeline reads
/// tagged notes through it, and the applier mutates links through it inside
/// an explicit transaction scope.
///
/// # Examples
///
/// ```
/// use semnote::{Database, NoteService};
///
/// # fn main() -> anyhow::Result<()> {
/// let db = Database::in_memory()?;
/// let service = NoteService::new(db);
/// # Ok(())
/// # }
/// ```
pub struct NoteService {
    db: Database,
}

impl NoteService {
    /// Creates a new NoteService with the given database.
    ///
    /// Takes ownership of the database instance. The service becomes the sole
    /// owner and manages all database operations through its methods.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns a reference to the underlying database.
    ///
    /// Useful for testing or advanced operations that need direct database access.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Begins an exclusive transaction on the underlying connection.
    ///
    /// Pair with [`NoteService::commit`] on success or
    /// [`NoteService::rollback`] on failure. The tag-normalization applier
    /// wraps its whole batch in one such scope, so partial writes are never
    /// visible.
    pub fn begin(&self) -> Result<()> {
        self.db.connection().execute("BEGIN TRANSACTION", [])?;
        Ok(())
    }

    /// Commits the current transaction.
    pub fn commit(&self) -> Result<()> {
        self.db.connection().execute("COMMIT", [])?;
        Ok(())
    }

    /// Rolls back the current transaction, discarding every change made
    /// since [`NoteService::begin`].
    pub fn rollback(&self) -> Result<()> {
        self.db.connection().execute("ROLLBACK", [])?;
        Ok(())
    }

    /// Creates a new note with the given title, content, embedding and
    /// optional tags.
    ///
    /// The embedding is validated at construction ([`Embedding::new`]), so a
    /// wrong-dimension vector can never reach this method. The note row and
    /// all tag links are written in a single transaction.
    ///
    /// # Examples
    ///
    /// ```
    /// use semnote::{Database, NoteService};
    /// use semnote::embedding::{Embedding, EMBEDDING_DIM};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let db = Database::in_memory()?;
    /// let service = NoteService::new(db);
    ///
    /// let embedding = Embedding::new(vec![0.0; EMBEDDING_DIM])?;
    /// let note = service.create_note("Title", "Body", &embedding, Some(&["rust"]))?;
    /// assert!(note.id.get() > 0);
    /// assert_eq!(note.tags, vec!["rust".to_string()]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn create_note(
        &self,
        title: &str,
        content: &str,
        embedding: &Embedding,
        tags: Option<&[&str]>,
    ) -> Result<Note> {
        let conn = self.db.connection();
        let now = OffsetDateTime::now_utc().unix_timestamp();

        self.begin()?;

        let result: Result<Note> = (|| {
            conn.execute(
                "INSERT INTO notes (title, content, embedding, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (title, content, embedding.to_bytes(), now, now),
            )?;

            let note_id = NoteId::new(conn.last_insert_rowid());

            let mut tag_names = Vec::new();
            if let Some(names) = tags {
                for name in names {
                    let name = name.trim();
                    if name.is_empty() || tag_names.iter().any(|t| t == name) {
                        continue;
                    }
                    let tag_id = self.get_or_create_tag(name)?;
                    conn.execute(
                        "INSERT OR IGNORE INTO note_tags (note_id, tag_id, created_at)
                         VALUES (?1, ?2, ?3)",
                        (note_id.get(), tag_id.get(), now),
                    )?;
                    tag_names.push(name.to_string());
                }
            }

            Ok(Note {
                id: note_id,
                title: title.to_string(),
                content: content.to_string(),
                created_at: OffsetDateTime::from_unix_timestamp(now)?,
                updated_at: OffsetDateTime::from_unix_timestamp(now)?,
                tags: tag_names,
            })
        })();

        match result {
            Ok(note) => {
                self.commit()?;
                Ok(note)
            }
            Err(e) => {
                self.rollback().ok();
                Err(e)
            }
        }
    }

    /// Retrieves a note by its ID.
    ///
    /// Returns `None` if no note exists with the given ID. This is not
    /// considered an error condition.
    pub fn get_note(&self, id: NoteId) -> Result<Option<Note>> {
        let conn = self.db.connection();

        let row = conn
            .query_row(
                "SELECT id, title, content, created_at, updated_at FROM notes WHERE id = ?1",
                [id.get()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, title, content, created_at, updated_at)) = row else {
            return Ok(None);
        };

        let tags = self.note_tag_names(NoteId::new(id))?;

        Ok(Some(Note {
            id: NoteId::new(id),
            title,
            content,
            created_at: OffsetDateTime::from_unix_timestamp(created_at)?,
            updated_at: OffsetDateTime::from_unix_timestamp(updated_at)?,
            tags,
        }))
    }

    /// Returns true if a note with the given ID exists.
    pub fn note_exists(&self, id: NoteId) -> Result<bool> {
        let exists: bool = self.db.connection().query_row(
            "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?1)",
            [id.get()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Gets or creates a tag by name.
    ///
    /// Queries the tags table by name (case-insensitive via COLLATE NOCASE).
    /// If the tag exists, returns its TagId. If not found, creates a new tag
    /// and returns its TagId. Never creates duplicate rows for the same name.
    pub fn get_or_create_tag(&self, name: &str) -> Result<TagId> {
        let conn = self.db.connection();

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM tags WHERE name = ?1 COLLATE NOCASE",
                [name],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(TagId::new(id));
        }

        conn.execute("INSERT INTO tags (name) VALUES (?1)", [name])?;
        Ok(TagId::new(conn.last_insert_rowid()))
    }

    /// Returns the tag links of a note as `(tag id, tag name)` pairs.
    ///
    /// Ordered by link creation time, then tag name, so enumeration order is
    /// stable across runs.
    pub fn note_tag_links(&self, id: NoteId) -> Result<Vec<(TagId, String)>> {
        let conn = self.db.connection();

        let mut stmt = conn.prepare(
            "SELECT t.id, t.name
             FROM note_tags nt
             JOIN tags t ON nt.tag_id = t.id
             WHERE nt.note_id = ?1
             ORDER BY nt.created_at, t.name",
        )?;

        let rows = stmt.query_map([id.get()], |row| {
            Ok((TagId::new(row.get(0)?), row.get::<_, String>(1)?))
        })?;

        let mut links = Vec::new();
        for row in rows {
            links.push(row?);
        }
        Ok(links)
    }

    /// Returns the tag names of a note, in stable link order.
    pub fn note_tag_names(&self, id: NoteId) -> Result<Vec<String>> {
        Ok(self
            .note_tag_links(id)?
            .into_iter()
            .map(|(_, name)| name)
            .collect())
    }

    /// Links a note to a tag. Returns true if a link was created, false if
    /// the link already existed.
    pub fn add_tag_link(&self, note_id: NoteId, tag_id: TagId) -> Result<bool> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let changed = self.db.connection().execute(
            "INSERT OR IGNORE INTO note_tags (note_id, tag_id, created_at) VALUES (?1, ?2, ?3)",
            (note_id.get(), tag_id.get(), now),
        )?;
        Ok(changed > 0)
    }

    /// Removes the link between a note and a tag. Returns true if a link was
    /// removed, false if none existed.
    pub fn remove_tag_link(&self, note_id: NoteId, tag_id: TagId) -> Result<bool> {
        let changed = self.db.connection().execute(
            "DELETE FROM note_tags WHERE note_id = ?1 AND tag_id = ?2",
            (note_id.get(), tag_id.get()),
        )?;
        Ok(changed > 0)
    }

    /// Lists every note that has at least one tag, with its embedding and
    /// tag names.
    ///
    /// This is the input of the similarity scan. Untagged notes are excluded
    /// here, before any pairwise comparison is attempted. Notes are ordered
    /// by ascending id and tag names by link order, so downstream clustering
    /// and tallying are deterministic.
    pub fn list_tagged_notes(&self) -> Result<Vec<TaggedNote>> {
        let conn = self.db.connection();

        let mut stmt = conn.prepare(
            "SELECT n.id, n.title, n.embedding
             FROM notes n
             WHERE EXISTS (SELECT 1 FROM note_tags nt WHERE nt.note_id = n.id)
             ORDER BY n.id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })?;

        let mut notes = Vec::new();
        for row in rows {
            let (id, title, blob) = row?;
            let id = NoteId::new(id);
            let embedding = Embedding::from_bytes(&blob)?;
            let tags = self.note_tag_names(id)?;
            notes.push(TaggedNote {
                id,
                title,
                embedding,
                tags,
            });
        }
        Ok(notes)
    }

    /// Searches notes by semantic similarity to a query embedding.
    ///
    /// Computes cosine distance against every stored note (optionally
    /// restricted to one tag) and returns the closest `limit` notes in
    /// ascending distance order.
    pub fn search_by_similarity(
        &self,
        query: &Embedding,
        limit: usize,
        tag_filter: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        let conn = self.db.connection();

        let mut hits = Vec::new();
        let mut scan = |sql: &str, params: &[&dyn rusqlite::ToSql]| -> Result<()> {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map(params, |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, Vec<u8>>(5)?,
                ))
            })?;
            for row in rows {
                let (id, title, content, created_at, updated_at, blob) = row?;
                let embedding = Embedding::from_bytes(&blob)?;
                let distance = query.cosine_distance(&embedding);
                let id = NoteId::new(id);
                hits.push(SearchHit {
                    note: Note {
                        id,
                        title,
                        content,
                        created_at: OffsetDateTime::from_unix_timestamp(created_at)?,
                        updated_at: OffsetDateTime::from_unix_timestamp(updated_at)?,
                        tags: self.note_tag_names(id)?,
                    },
                    distance,
                });
            }
            Ok(())
        };

        if let Some(tag) = tag_filter {
            scan(
                "SELECT n.id, n.title, n.content, n.created_at, n.updated_at, n.embedding
                 FROM notes n
                 WHERE n.id IN (
                     SELECT nt.note_id
                     FROM note_tags nt
                     JOIN tags t ON nt.tag_id = t.id
                     WHERE t.name = ?1 COLLATE NOCASE
                 )",
                &[&tag as &dyn rusqlite::ToSql],
            )?;
        } else {
            scan(
                "SELECT id, title, content, created_at, updated_at, embedding FROM notes",
                &[],
            )?;
        }

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }

    /// Lists notes created at or after the given cutoff.
    ///
    /// Optionally filtered by tag, limited, and sorted by creation time.
    pub fn notes_since(
        &self,
        cutoff: OffsetDateTime,
        tag_filter: Option<&str>,
        limit: usize,
        order: SortOrder,
    ) -> Result<Vec<Note>> {
        let conn = self.db.connection();
        let cutoff_ts = cutoff.unix_timestamp();

        let order_clause = match order {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        };

        let ids: Vec<i64> = if let Some(tag) = tag_filter {
            let sql = format!(
                "SELECT n.id FROM notes n
                 WHERE n.created_at >= ?1
                   AND n.id IN (
                       SELECT nt.note_id
                       FROM note_tags nt
                       JOIN tags t ON nt.tag_id = t.id
                       WHERE t.name = ?2 COLLATE NOCASE
                   )
                 ORDER BY n.created_at {order_clause}
                 LIMIT ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(
                rusqlite::params![cutoff_ts, tag, limit as i64],
                |row| row.get(0),
            )?;
            rows.collect::<Result<Vec<i64>, _>>()?
        } else {
            let sql = format!(
                "SELECT id FROM notes WHERE created_at >= ?1
                 ORDER BY created_at {order_clause}
                 LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params![cutoff_ts, limit as i64], |row| {
                row.get(0)
            })?;
            rows.collect::<Result<Vec<i64>, _>>()?
        };

        let mut notes = Vec::new();
        for id in ids {
            if let Some(note) = self.get_note(NoteId::new(id))? {
                notes.push(note);
            }
        }
        Ok(notes)
    }

    /// Collects summary statistics about the store.
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.db.connection();

        let total_notes: i64 = conn.query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;

        let week_ago = (OffsetDateTime::now_utc() - time::Duration::days(7)).unix_timestamp();
        let recent_notes: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE created_at >= ?1",
            [week_ago],
            |row| row.get(0),
        )?;

        let total_tags: i64 = conn.query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(
            "SELECT t.name, COUNT(nt.note_id) AS note_count
             FROM tags t
             LEFT JOIN note_tags nt ON t.id = nt.tag_id
             GROUP BY t.name
             ORDER BY note_count DESC, t.name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut tag_usage = Vec::new();
        for row in rows {
            tag_usage.push(row?);
        }

        Ok(StoreStats {
            total_notes,
            recent_notes,
            total_tags,
            tag_usage,
        })
    }
}

/// A search result: the matching note and its cosine distance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub note: Note,
    pub distance: f32,
}

impl SearchHit {
    /// Similarity as a percentage, for display.
    pub fn similarity_percent(&self) -> f32 {
        (1.0 - self.distance) * 100.0
    }
}

/// Sort order for listing notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Oldest notes first (ascending by creation time)
    Ascending,
    /// Newest notes first (descending by creation time)
    #[default]
    Descending,
}

/// Summary statistics about the note store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreStats {
    /// Total number of notes.
    pub total_notes: i64,
    /// Notes created in the last 7 days.
    pub recent_notes: i64,
    /// Number of distinct tags.
    pub total_tags: i64,
    /// Per-tag note counts, descending by count then name.
    pub tag_usage: Vec<(String, i64)>,
}
