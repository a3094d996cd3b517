//! A notes store on top of the browser's IndexedDB, with the callback API turned into rust
//! futures.
//!
//! The lower half of the crate ([`IndexedDb`], [`Transaction`], [`ObjectStore`], [`Cursor`])
//! wraps IndexedDB requests as futures and streams. [`NoteStore`] builds the notes database on
//! top of it, and [`view`] turns the stored notes into list entries for whatever renders them.
//!
//! ```no_run
//! # use indexeddb_notes::{NewNote, NoteStore, NoteStoreConfig};
//! # use futures::executor::block_on;
//! # block_on(async {
//! let store = NoteStore::new(NoteStoreConfig::default());
//! store.open().await?;
//!
//! let id = store.insert(&NewNote::new("A", "B")).await?;
//! let notes = store.notes().await?;
//! assert_eq!(notes[0].id, id);
//!
//! store.delete(id).await?;
//! # Ok::<(), indexeddb_notes::NoteStoreError>(())
//! # });
//! ```

#[macro_use]
mod macros;

pub mod config;
mod cursor;
mod db;
pub mod error;
pub mod note;
mod object_store;
mod request;
pub mod store;
mod transaction;
pub mod view;

pub use crate::{
    config::NoteStoreConfig,
    cursor::Cursor,
    db::{DbDuringUpgrade, IndexedDb},
    error::{NoteStoreError, OpenDbError},
    note::{NewNote, Note, NoteId},
    object_store::{KeyPath, ObjectStore, ObjectStoreDuringUpgrade, TransactionObjectStore},
    store::{NoteCursor, NoteStore, StoreStatus},
    transaction::{Transaction, TransactionMode},
};

use wasm_bindgen::JsValue;

use crate::{
    error::js_error_message,
    request::{IdbOpenDbRequest, IndexedDbRequest},
};

fn factory() -> Result<web_sys::IdbFactory, OpenDbError> {
    let window = web_sys::window().ok_or(OpenDbError::Unavailable)?;
    match window.indexed_db() {
        Ok(Some(factory)) => Ok(factory),
        Ok(None) => Err(OpenDbError::Unavailable),
        Err(e) => Err(OpenDbError::Request(js_error_message(&e))),
    }
}

/// Open the database `name` at `version`.
///
/// `on_upgrade_needed` runs once, before the open resolves, when the database does not exist
/// yet or is stored at a lower version. It receives the old version (`0` for a new database).
/// Returning an error from it aborts the upgrade and the open fails with
/// [`OpenDbError::Upgrade`].
pub async fn open(
    name: &str,
    version: u32,
    on_upgrade_needed: impl Fn(u32, &DbDuringUpgrade) -> Result<(), JsValue> + 'static,
) -> Result<IndexedDb, OpenDbError> {
    let request = factory()?
        .open_with_u32(name, version)
        .map_err(|e| OpenDbError::Request(js_error_message(&e)))?;

    IdbOpenDbRequest::new(request, on_upgrade_needed).await
}

/// Delete the database `name`. Deleting a database that does not exist succeeds.
pub async fn delete_database(name: &str) -> Result<(), OpenDbError> {
    let request = factory()?
        .delete_database(name)
        .map_err(|e| OpenDbError::Request(js_error_message(&e)))?;

    IndexedDbRequest::new(request.into())
        .await
        .map(|_| ())
        .map_err(|e| OpenDbError::Request(js_error_message(&e)))
}
