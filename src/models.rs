//! Domain models for notes, tags and their identifiers.

mod ids;
mod note;
mod tag;

pub use ids::{NoteId, TagId};
pub use note::{Note, TaggedNote};
pub use tag::Tag;
