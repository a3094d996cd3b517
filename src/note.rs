use serde::{Deserialize, Serialize};

/// Key of a stored note, handed out by the store's key generator.
pub type NoteId = u32;

/// A note as it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub body: String,
}

/// A note that has not been stored yet.
///
/// It carries no `id` field: the key generator fills in `id` when the note is added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNote {
    pub title: String,
    pub body: String,
}

impl NewNote {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// The stored form of this note under `id`.
    pub fn with_id(self, id: NoteId) -> Note {
        Note {
            id,
            title: self.title,
            body: self.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_note_serializes_without_an_id() {
        let json = serde_json::to_value(NewNote::new("A", "B")).unwrap();
        assert_eq!(json, serde_json::json!({ "title": "A", "body": "B" }));
    }

    #[test]
    fn stored_note_reads_back() {
        let note: Note = serde_json::from_str(r#"{ "id": 2, "title": "C", "body": "" }"#).unwrap();
        assert_eq!(note, NewNote::new("C", "").with_id(2));
    }
}
