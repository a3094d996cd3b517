use std::{marker::PhantomData, ops::Deref};

use serde::{de::DeserializeOwned, Serialize};
use wasm_bindgen::{prelude::*, JsCast};

use crate::{
    cursor::Cursor, db::DbDuringUpgrade, request::IndexedDbRequest, transaction::Transaction,
};

/// An object store that was created during an upgrade.
///
/// Object stores and their indexes can only be created and deleted during database upgrades.
#[derive(Debug)]
pub struct ObjectStoreDuringUpgrade<'a> {
    pub(crate) inner: ObjectStore,
    pub(crate) db: PhantomData<&'a DbDuringUpgrade>,
}

impl<'a> ObjectStoreDuringUpgrade<'a> {
    pub(crate) fn new(store: web_sys::IdbObjectStore, _db: &'a DbDuringUpgrade) -> Self {
        ObjectStoreDuringUpgrade {
            inner: ObjectStore { inner: store },
            db: PhantomData,
        }
    }

    /// Declare an index over `key_path`.
    ///
    /// A non-unique index allows several records to share the same value at `key_path`.
    pub fn create_index(
        &self,
        name: &str,
        key_path: impl Into<KeyPath>,
        unique: bool,
    ) -> Result<(), JsValue> {
        if self.index_names().iter().any(|index| index == name) {
            return Err(format!("an index called \"{}\" already exists", name).into());
        }

        let parameters = web_sys::IdbIndexParameters::new();
        parameters.set_unique(unique);

        let key_path: KeyPath = key_path.into();
        match key_path {
            KeyPath::Single(path) => {
                self.inner
                    .inner
                    .create_index_with_str_and_optional_parameters(name, &path, &parameters)?;
            }
            KeyPath::Multi(paths) => {
                let paths: JsValue = from_collection!(paths).into();
                self.inner
                    .inner
                    .create_index_with_str_sequence_and_optional_parameters(
                        name,
                        &paths,
                        &parameters,
                    )?;
            }
            KeyPath::None => return Err("an index needs a key path".into()),
        }

        Ok(())
    }
}

impl<'a> Deref for ObjectStoreDuringUpgrade<'a> {
    type Target = ObjectStore;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// An object store that is bound to a transaction.
#[derive(Debug)]
pub struct TransactionObjectStore<'a> {
    pub(crate) inner: ObjectStore,
    pub(crate) transaction: PhantomData<&'a Transaction<'a>>,
}

impl<'a> Deref for TransactionObjectStore<'a> {
    type Target = ObjectStore;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Base object store that gathers all the common object store functionality.
#[derive(Debug)]
pub struct ObjectStore {
    pub(crate) inner: web_sys::IdbObjectStore,
}

impl ObjectStore {
    /// The name of the object store.
    pub fn name(&self) -> String {
        self.inner.name()
    }

    /// The names of the indexes declared on this store.
    pub fn index_names(&self) -> Vec<String> {
        to_collection!(self.inner.index_names() => Vec<String> : push)
    }

    /// Whether the index `name` only admits unique values.
    pub fn index_is_unique(&self, name: &str) -> Result<bool, JsValue> {
        Ok(self.inner.index(name)?.unique())
    }

    /// Get the value with the given key.
    ///
    /// # Arguments
    ///
    /// * `key` - The key that should be used to find the associated value in
    /// the store.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use indexeddb_notes::{IndexedDb, TransactionMode};
    /// # use futures::executor::block_on;
    /// # block_on(async {
    /// # let db = IndexedDb::open("test", 1, |_, db| {
    /// #   db.create_object_store("test", (), false)?;
    /// #   Ok(())
    /// # }).await .expect("Failed to open indexed DB");
    /// let transaction = db.transaction(&["test"], TransactionMode::Readonly).unwrap();
    /// let store = transaction.object_store("test").unwrap();
    ///
    /// let key = "Hello".to_owned();
    ///
    /// let value: String = store
    ///     .get(&key)
    ///     .await
    ///     .expect("Store error while fetching value")
    ///     .unwrap();
    /// # });
    /// ```
    pub async fn get<V: DeserializeOwned>(
        &self,
        key: &impl Serialize,
    ) -> Result<Option<V>, JsValue> {
        let key = to_js(key)?;
        let request = IndexedDbRequest::new(self.inner.get(&key)?);

        let object = request.await?;

        if object.is_undefined() || object.is_null() {
            Ok(None)
        } else {
            from_js(object).map(Some)
        }
    }

    /// Add `value` to the store, letting the store produce the key.
    ///
    /// The store needs a key generator, or a key path that `value` fills in. Resolves to the key
    /// the record was stored under. Fails if a record with that key already exists.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use indexeddb_notes::{IndexedDb, TransactionMode};
    /// # use futures::executor::block_on;
    /// # block_on(async {
    /// # let db = IndexedDb::open("test", 1, |_, db| {
    /// #   db.create_object_store("test", (), true)?;
    /// #   Ok(())
    /// # }).await .expect("Failed to open indexed DB");
    /// let transaction = db.transaction(&["test"], TransactionMode::ReadWrite).unwrap();
    /// let store = transaction.object_store("test").unwrap();
    ///
    /// let key: u32 = store.add(&"world".to_owned()).await.unwrap();
    /// transaction.done().await.unwrap();
    /// # });
    /// ```
    pub async fn add<K: DeserializeOwned>(&self, value: &impl Serialize) -> Result<K, JsValue> {
        let value = to_js(value)?;

        let request = IndexedDbRequest::new(self.inner.add(&value)?);
        let key = request.await?;

        from_js(key)
    }

    /// Store the given value under the given key in the object store.
    ///
    /// Only valid for stores without a key path.
    pub async fn add_with_key(
        &self,
        key: &impl Serialize,
        value: &impl Serialize,
    ) -> Result<(), JsValue> {
        let key = to_js(key)?;
        let value = to_js(value)?;

        let request = IndexedDbRequest::new(self.inner.add_with_key(&value, &key)?);
        let _ = request.await?;

        Ok(())
    }

    /// Delete the record stored under `key`. A missing key is not an error.
    pub async fn delete(&self, key: &impl Serialize) -> Result<(), JsValue> {
        let key = to_js(key)?;

        let request = IndexedDbRequest::new(self.inner.delete(&key)?);
        let _ = request.await?;

        Ok(())
    }

    /// Walk every record of the store in ascending key order.
    pub fn cursor(&self) -> Result<Cursor, JsValue> {
        Ok(Cursor::new(self.inner.open_cursor()?))
    }

    /// The key path of the object store. No key path means keys are stored
    /// out-of-tree.
    pub fn key_path(&self) -> KeyPath {
        self.inner
            .key_path()
            .map(KeyPath::from)
            .unwrap_or(KeyPath::None)
    }

    /// Whether the store generates its own keys.
    pub fn auto_increment(&self) -> bool {
        self.inner.auto_increment()
    }
}

pub(crate) fn to_js(value: &impl Serialize) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(JsValue::from)
}

pub(crate) fn from_js<V: DeserializeOwned>(value: JsValue) -> Result<V, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(JsValue::from)
}

/// The path to the key in an object store.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum KeyPath {
    /// Keys are stored *out-of-tree*.
    None,
    /// The path to the single key.
    Single(String),
    /// The paths to all the parts of the key.
    Multi(Vec<String>),
}

impl From<KeyPath> for JsValue {
    fn from(key_path: KeyPath) -> JsValue {
        match key_path {
            KeyPath::None => JsValue::NULL,
            KeyPath::Single(path) => JsValue::from(path),
            KeyPath::Multi(paths) => from_collection!(paths).into(),
        }
    }
}

impl From<JsValue> for KeyPath {
    fn from(val: JsValue) -> KeyPath {
        if val.is_null() || val.is_undefined() {
            KeyPath::None
        } else if let Some(s) = val.as_string() {
            KeyPath::Single(s)
        } else {
            // The browser only ever reports a string or a sequence of strings here.
            let paths = val
                .dyn_into::<js_sys::Array>()
                .map(|arr| arr.iter().filter_map(|el| el.as_string()).collect())
                .unwrap_or_default();

            KeyPath::Multi(paths)
        }
    }
}

impl From<Vec<String>> for KeyPath {
    fn from(inner: Vec<String>) -> KeyPath {
        KeyPath::Multi(inner)
    }
}

impl<S> From<&[S]> for KeyPath
where
    S: AsRef<str>,
{
    fn from(inner: &[S]) -> KeyPath {
        KeyPath::Multi(inner.iter().map(|s| s.as_ref().to_owned()).collect())
    }
}

impl From<String> for KeyPath {
    fn from(inner: String) -> KeyPath {
        KeyPath::Single(inner)
    }
}

impl<'a> From<&'a str> for KeyPath {
    fn from(inner: &'a str) -> KeyPath {
        KeyPath::Single(inner.to_owned())
    }
}

impl From<()> for KeyPath {
    fn from((): ()) -> KeyPath {
        KeyPath::None
    }
}

#[cfg(test)]
mod tests {
    use super::KeyPath;

    #[test]
    fn key_path_conversions() {
        assert_eq!(KeyPath::from(()), KeyPath::None);
        assert_eq!(KeyPath::from("id"), KeyPath::Single("id".into()));
        assert_eq!(
            KeyPath::from(&["title", "body"][..]),
            KeyPath::Multi(vec!["title".into(), "body".into()])
        );
    }
}
