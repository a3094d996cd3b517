use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};

/// Errors surfaced by the note store.
///
/// Every variant is terminal for the action that produced it. Nothing is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NoteStoreError {
    /// The database could not be opened or upgraded.
    #[error("database failed to open: {0}")]
    Open(String),

    /// The upgrade step that defines the schema failed.
    #[error("schema upgrade failed: {0}")]
    Schema(String),

    /// An insert or delete failed.
    #[error("write failed: {0}")]
    Write(String),

    /// Listing or reading notes failed.
    #[error("read failed: {0}")]
    Read(String),

    /// An operation was attempted before the store finished opening.
    #[error("note store is not open")]
    NotReady,
}

pub type Result<T> = std::result::Result<T, NoteStoreError>;

impl NoteStoreError {
    pub(crate) fn write(err: JsValue) -> Self {
        NoteStoreError::Write(js_error_message(&err))
    }

    pub(crate) fn read(err: JsValue) -> Self {
        NoteStoreError::Read(js_error_message(&err))
    }
}

/// Failure modes of an open request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpenDbError {
    #[error("indexed db is not available in this environment")]
    Unavailable,

    #[error("open request blocked by another connection")]
    Blocked,

    #[error("upgrade aborted: {0}")]
    Upgrade(String),

    #[error("{0}")]
    Request(String),
}

impl From<OpenDbError> for NoteStoreError {
    fn from(err: OpenDbError) -> Self {
        match err {
            OpenDbError::Upgrade(msg) => NoteStoreError::Schema(msg),
            other => NoteStoreError::Open(other.to_string()),
        }
    }
}

/// Human readable text for an error thrown by the browser.
pub fn js_error_message(err: &JsValue) -> String {
    if let Some(exception) = err.dyn_ref::<web_sys::DomException>() {
        format!("{}: {}", exception.name(), exception.message())
    } else if let Some(msg) = err.as_string() {
        msg
    } else if err.is_undefined() || err.is_null() {
        "unknown error".to_owned()
    } else {
        format!("{:?}", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upgrade_failures_become_schema_errors() {
        let err: NoteStoreError = OpenDbError::Upgrade("store exists".into()).into();
        assert_eq!(err, NoteStoreError::Schema("store exists".into()));
    }

    #[test]
    fn other_open_failures_become_open_errors() {
        let err: NoteStoreError = OpenDbError::Blocked.into();
        assert_eq!(
            err,
            NoteStoreError::Open("open request blocked by another connection".into())
        );

        let err: NoteStoreError = OpenDbError::Request("VersionError: too low".into()).into();
        assert_eq!(err, NoteStoreError::Open("VersionError: too low".into()));
    }

    #[test]
    fn not_ready_message() {
        assert_eq!(NoteStoreError::NotReady.to_string(), "note store is not open");
    }
}
