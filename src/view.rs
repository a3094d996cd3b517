//! What the notes list shows, independent of how it is drawn.

use crate::note::{Note, NoteId};

/// Shown in place of the list when there are no notes.
pub const EMPTY_MESSAGE: &str = "No notes stored.";

/// Attribute a rendered list item carries its note id in.
pub const NOTE_ID_ATTRIBUTE: &str = "data-note-id";

/// Label of the per-note delete control.
pub const DELETE_LABEL: &str = "Delete";

/// One line of the rendered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEntry {
    /// A note with a delete control.
    Note(NoteEntry),
    /// The placeholder for an empty list.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEntry {
    pub id: NoteId,
    pub heading: String,
    pub text: String,
}

impl ListEntry {
    pub fn id(&self) -> Option<NoteId> {
        match self {
            ListEntry::Note(entry) => Some(entry.id),
            ListEntry::Empty => None,
        }
    }
}

/// Lay the notes out as list entries, keeping their order.
pub fn project(notes: &[Note]) -> Vec<ListEntry> {
    if notes.is_empty() {
        return vec![ListEntry::Empty];
    }

    notes
        .iter()
        .map(|note| {
            ListEntry::Note(NoteEntry {
                id: note.id,
                heading: note.title.clone(),
                text: note.body.clone(),
            })
        })
        .collect()
}

/// Read a note id back from the [`NOTE_ID_ATTRIBUTE`] of a list item.
///
/// Store keys are type-sensitive, so the attribute has to become a number again before it can
/// address a note.
pub fn parse_note_id(attribute: &str) -> Option<NoteId> {
    attribute.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::NewNote;

    #[test]
    fn empty_list_shows_placeholder() {
        assert_eq!(project(&[]), vec![ListEntry::Empty]);
    }

    #[test]
    fn notes_keep_their_order() {
        let notes = vec![
            NewNote::new("A", "B").with_id(1),
            NewNote::new("C", "D").with_id(2),
        ];

        let entries = project(&notes);
        let ids: Vec<_> = entries.iter().filter_map(ListEntry::id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(
            entries[1],
            ListEntry::Note(NoteEntry {
                id: 2,
                heading: "C".into(),
                text: "D".into(),
            })
        );
    }

    #[test]
    fn note_ids_parse_from_attributes() {
        assert_eq!(parse_note_id("12"), Some(12));
        assert_eq!(parse_note_id(" 3 "), Some(3));
        assert_eq!(parse_note_id(""), None);
        assert_eq!(parse_note_id("note-3"), None);
    }
}
