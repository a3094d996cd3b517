use std::{marker::PhantomData, sync::Arc};
use wasm_bindgen::{prelude::*, JsCast};

use crate::{
    error::OpenDbError,
    object_store::{KeyPath, ObjectStoreDuringUpgrade},
    transaction::{Transaction, TransactionMode},
};

/// A handle on the database during an upgrade.
#[derive(Debug)]
pub struct DbDuringUpgrade {
    db: IndexedDb,
}

impl DbDuringUpgrade {
    pub(crate) fn from_raw_unchecked(raw: JsValue) -> Self {
        DbDuringUpgrade {
            db: IndexedDb::from_raw_unchecked(raw),
        }
    }

    /// The name of the database.
    pub fn name(&self) -> String {
        self.db.name()
    }

    /// The version being upgraded to.
    pub fn version(&self) -> u64 {
        self.db.version()
    }

    /// Get the names of the object stores that already exist.
    pub fn object_store_names(&self) -> Vec<String> {
        self.db.object_store_names()
    }

    /// Creates a new object store (roughly equivalent to a table)
    ///
    /// Fails if a store with the same name already exists, so an upgrade that blindly re-runs
    /// store creation surfaces as an upgrade error rather than a silent no-op.
    pub fn create_object_store<'a>(
        &'a self,
        name: &str,
        key_path: impl Into<KeyPath>,
        auto_increment: bool,
    ) -> Result<ObjectStoreDuringUpgrade<'a>, JsValue> {
        if self.has_object_store(name) {
            return Err(format!("an object store called \"{}\" already exists", name).into());
        }

        let key_path: KeyPath = key_path.into();
        let key_path: JsValue = key_path.into();
        let parameters = web_sys::IdbObjectStoreParameters::new();

        parameters.set_key_path(&key_path);
        parameters.set_auto_increment(auto_increment);

        let store = self
            .db
            .inner
            .create_object_store_with_optional_parameters(name, &parameters)?;

        Ok(ObjectStoreDuringUpgrade::new(store, self))
    }

    /// Is there already a store with the given name?
    pub fn has_object_store(&self, name: &str) -> bool {
        self.db.inner.object_store_names().contains(name)
    }
}

/// A handle on the database
#[derive(Debug, Clone)]
pub struct IndexedDb {
    pub(crate) inner: Arc<web_sys::IdbDatabase>,
}

impl IndexedDb {
    pub(crate) fn from_raw_unchecked(raw: JsValue) -> Self {
        IndexedDb {
            inner: Arc::new(raw.unchecked_into()),
        }
    }

    pub async fn open(
        name: &str,
        version: u32,
        on_upgrade_needed: impl Fn(u32, &DbDuringUpgrade) -> Result<(), JsValue> + 'static,
    ) -> Result<IndexedDb, OpenDbError> {
        crate::open(name, version, on_upgrade_needed).await
    }

    /// The name of the database.
    pub fn name(&self) -> String {
        self.inner.name()
    }

    /// The current version.
    pub fn version(&self) -> u64 {
        self.inner.version() as u64
    }

    /// Get the names of the object stores in this database.
    pub fn object_store_names(&self) -> Vec<String> {
        to_collection!(self.inner.object_store_names() => Vec<String> : push)
    }

    /// Start a dababase transaction over the named stores.
    ///
    /// All operations on data happen within a transaction, including read-only operations. The
    /// transaction commits on its own once no request is left pending; await
    /// [`Transaction::done`] to learn that it has.
    pub fn transaction(
        &self,
        stores: &[&str],
        mode: TransactionMode,
    ) -> Result<Transaction, JsValue> {
        let stores: JsValue = from_collection!(stores.iter().copied()).into();
        let inner = self
            .inner
            .transaction_with_str_sequence_and_mode(&stores, mode.into())?;

        Ok(Transaction {
            inner,
            db: PhantomData,
        })
    }

    /// Close the connection. Pending transactions still run to completion.
    pub fn close(&self) {
        self.inner.close()
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod test {
    use crate::{IndexedDb, KeyPath};
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    async fn open() {
        crate::delete_database("db-open").await.unwrap();
        let db = IndexedDb::open("db-open", 1, |_old_version, _upgrader| Ok(()))
            .await
            .expect("Failed to open empty indexed db");

        assert_eq!(db.name(), "db-open");
        assert_eq!(db.version(), 1);
        assert!(db.object_store_names().is_empty());
        db.close();
    }

    #[wasm_bindgen_test]
    async fn create_object_stores() {
        crate::delete_database("db-create-stores").await.unwrap();
        let db = IndexedDb::open("db-create-stores", 1, |old_version, upgrader| {
            assert_eq!(old_version, 0);
            assert_eq!(upgrader.name(), "db-create-stores");
            assert_eq!(upgrader.version(), 1);
            assert!(upgrader.object_store_names().is_empty());

            let obj_store = upgrader.create_object_store("plain", KeyPath::None, false)?;
            assert_eq!(obj_store.key_path(), KeyPath::None);
            assert_eq!(obj_store.auto_increment(), false);

            drop(obj_store);

            let obj_store =
                upgrader.create_object_store("keyed", KeyPath::Single("id".into()), true)?;
            assert_eq!(obj_store.key_path(), KeyPath::Single("id".into()));
            assert_eq!(obj_store.auto_increment(), true);

            assert!(upgrader.create_object_store("keyed", "id", true).is_err());
            Ok(())
        })
        .await
        .expect("Failed to open indexed DB");

        let mut names = db.object_store_names();
        names.sort();
        assert_eq!(names, vec!["keyed".to_owned(), "plain".to_owned()]);
        db.close();
    }
}
