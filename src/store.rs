use std::{
    cell::{Cell, RefCell},
    fmt,
    pin::Pin,
    rc::Rc,
};

use console_web::println;
use futures::{
    stream::{FusedStream, Stream},
    task::{Context, Poll},
    TryStreamExt,
};
use wasm_bindgen::JsValue;

use crate::{
    config::NoteStoreConfig,
    cursor::Cursor,
    db::{DbDuringUpgrade, IndexedDb},
    error::{NoteStoreError, Result},
    note::{NewNote, Note, NoteId},
    object_store::from_js,
    transaction::TransactionMode,
};

/// The object store holding the notes.
pub const NOTES_STORE: &str = "notes_os";

/// Where a [`NoteStore`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    Unopened,
    Opening,
    Open,
    Failed,
}

#[derive(Debug)]
enum State {
    Unopened,
    /// Waiting on the open with the given attempt number.
    Opening(u64),
    Open(IndexedDb),
    Failed(NoteStoreError),
}

/// The notes database.
///
/// Every data operation needs the store to be open first and fails with
/// [`NoteStoreError::NotReady`] otherwise. Clones share the same connection and state, so one
/// store can be handed to every event handler that needs it.
#[derive(Debug, Clone)]
pub struct NoteStore {
    config: NoteStoreConfig,
    state: Rc<RefCell<State>>,
    attempts: Rc<Cell<u64>>,
}

impl NoteStore {
    pub fn new(config: NoteStoreConfig) -> Self {
        NoteStore {
            config,
            state: Rc::new(RefCell::new(State::Unopened)),
            attempts: Rc::new(Cell::new(0)),
        }
    }

    pub fn config(&self) -> &NoteStoreConfig {
        &self.config
    }

    pub fn status(&self) -> StoreStatus {
        match &*self.state.borrow() {
            State::Unopened => StoreStatus::Unopened,
            State::Opening(_) => StoreStatus::Opening,
            State::Open(_) => StoreStatus::Open,
            State::Failed(_) => StoreStatus::Failed,
        }
    }

    /// The error the last open attempt failed with, if it failed.
    pub fn failure(&self) -> Option<NoteStoreError> {
        match &*self.state.borrow() {
            State::Failed(err) => Some(err.clone()),
            _ => None,
        }
    }

    /// Open the database, defining the schema if this is the first time it is opened at the
    /// configured version.
    ///
    /// Opening an open store does nothing. Opening a failed store tries again. If the store is
    /// closed before the open finishes, the new connection is dropped and the open fails.
    pub async fn open(&self) -> Result<()> {
        let attempt = self.attempts.get() + 1;
        {
            let mut state = self.state.borrow_mut();
            match *state {
                State::Open(_) => return Ok(()),
                State::Opening(_) => return Err(NoteStoreError::NotReady),
                State::Unopened | State::Failed(_) => *state = State::Opening(attempt),
            }
        }
        self.attempts.set(attempt);

        let outcome = self.connect().await;

        let mut state = self.state.borrow_mut();
        // A close (and maybe a newer open) happened in the meantime.
        if !matches!(*state, State::Opening(current) if current == attempt) {
            if let Ok(db) = outcome {
                db.close();
            }
            return Err(NoteStoreError::Open("closed while opening".to_owned()));
        }

        match outcome {
            Ok(db) => {
                *state = State::Open(db);
                Ok(())
            }
            Err(err) => {
                *state = State::Failed(err.clone());
                Err(err)
            }
        }
    }

    async fn connect(&self) -> Result<IndexedDb> {
        self.config.validate()?;
        let db = crate::open(&self.config.name, self.config.version, define_schema).await?;
        Ok(db)
    }

    /// Close the connection. The store can be opened again afterwards.
    pub fn close(&self) {
        let mut state = self.state.borrow_mut();
        if let State::Open(db) = &*state {
            db.close();
        }
        *state = State::Unopened;
    }

    fn db(&self) -> Result<IndexedDb> {
        match &*self.state.borrow() {
            State::Open(db) => Ok(db.clone()),
            _ => Err(NoteStoreError::NotReady),
        }
    }

    /// Store a new note and return the id it was given.
    ///
    /// Resolves once the write is committed.
    pub async fn insert(&self, note: &NewNote) -> Result<NoteId> {
        let db = self.db()?;
        let transaction = db
            .transaction(&[NOTES_STORE], TransactionMode::ReadWrite)
            .map_err(NoteStoreError::write)?;
        let store = transaction
            .object_store(NOTES_STORE)
            .map_err(NoteStoreError::write)?;

        let id: NoteId = store.add(note).await.map_err(NoteStoreError::write)?;
        transaction.done().await.map_err(NoteStoreError::write)?;

        Ok(id)
    }

    /// Look a single note up by id.
    pub async fn get(&self, id: NoteId) -> Result<Option<Note>> {
        let db = self.db()?;
        let transaction = db
            .transaction(&[NOTES_STORE], TransactionMode::Readonly)
            .map_err(NoteStoreError::read)?;
        let store = transaction
            .object_store(NOTES_STORE)
            .map_err(NoteStoreError::read)?;

        store.get(&id).await.map_err(NoteStoreError::read)
    }

    /// Every note, in ascending id order.
    ///
    /// The notes are read lazily as the returned stream is polled.
    pub fn list_all(&self) -> Result<NoteCursor> {
        let db = self.db()?;
        let transaction = db
            .transaction(&[NOTES_STORE], TransactionMode::Readonly)
            .map_err(NoteStoreError::read)?;
        let store = transaction
            .object_store(NOTES_STORE)
            .map_err(NoteStoreError::read)?;
        let cursor = store.cursor().map_err(NoteStoreError::read)?;

        Ok(NoteCursor { inner: cursor })
    }

    /// [`list_all`](NoteStore::list_all), collected.
    pub async fn notes(&self) -> Result<Vec<Note>> {
        self.list_all()?.try_collect().await
    }

    /// Remove the note stored under `id`. Removing a note that does not exist succeeds.
    ///
    /// Resolves once the delete is committed.
    pub async fn delete(&self, id: NoteId) -> Result<()> {
        let db = self.db()?;
        let transaction = db
            .transaction(&[NOTES_STORE], TransactionMode::ReadWrite)
            .map_err(NoteStoreError::write)?;
        let store = transaction
            .object_store(NOTES_STORE)
            .map_err(NoteStoreError::write)?;

        store.delete(&id).await.map_err(NoteStoreError::write)?;
        transaction.done().await.map_err(NoteStoreError::write)
    }
}

/// Creates the notes store on first use. An existing store is left alone.
fn define_schema(_old_version: u32, db: &DbDuringUpgrade) -> std::result::Result<(), JsValue> {
    if db.has_object_store(NOTES_STORE) {
        return Ok(());
    }

    let store = db.create_object_store(NOTES_STORE, "id", true)?;
    // Declared for lookups by field; nothing queries them yet.
    store.create_index("title", "title", false)?;
    store.create_index("body", "body", false)?;

    println!("Database setup complete");
    Ok(())
}

/// Stream of the stored notes in ascending id order. See [`NoteStore::list_all`].
pub struct NoteCursor {
    inner: Cursor,
}

impl fmt::Debug for NoteCursor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("NoteCursor").field(&self.inner).finish()
    }
}

impl Stream for NoteCursor {
    type Item = Result<Note>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner)
            .poll_next(cx)
            .map(|record| {
                record.map(|record| {
                    record
                        .and_then(|(_key, value)| from_js(value))
                        .map_err(NoteStoreError::read)
                })
            })
    }
}

impl FusedStream for NoteCursor {
    fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn new_store_is_unopened() {
        let store = NoteStore::new(NoteStoreConfig::default());
        assert_eq!(store.status(), StoreStatus::Unopened);
        assert_eq!(store.failure(), None);
    }

    #[test]
    fn operations_before_open_are_not_ready() {
        let store = NoteStore::new(NoteStoreConfig::default());

        assert_eq!(
            block_on(store.insert(&NewNote::new("A", "B"))),
            Err(NoteStoreError::NotReady)
        );
        assert_eq!(block_on(store.get(1)), Err(NoteStoreError::NotReady));
        assert_eq!(block_on(store.delete(1)), Err(NoteStoreError::NotReady));
        assert_eq!(block_on(store.notes()), Err(NoteStoreError::NotReady));
        assert!(matches!(store.list_all(), Err(NoteStoreError::NotReady)));
        assert_eq!(store.status(), StoreStatus::Unopened);
    }

    #[test]
    fn bad_version_fails_the_open() {
        let store = NoteStore::new(NoteStoreConfig::new("notes_db", 0));

        let err = block_on(store.open()).unwrap_err();
        assert!(matches!(err, NoteStoreError::Open(_)));
        assert_eq!(store.status(), StoreStatus::Failed);
        assert_eq!(store.failure(), Some(err));

        // Still not usable.
        assert_eq!(block_on(store.delete(1)), Err(NoteStoreError::NotReady));
    }

    #[test]
    fn clones_share_state() {
        let store = NoteStore::new(NoteStoreConfig::new("notes_db", 0));
        let handle = store.clone();

        let _ = block_on(store.open());
        assert_eq!(handle.status(), StoreStatus::Failed);

        handle.close();
        assert_eq!(store.status(), StoreStatus::Unopened);
    }
}
