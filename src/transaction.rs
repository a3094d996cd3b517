use std::{
    marker::PhantomData,
    pin::Pin,
    sync::{Arc, Mutex},
};

use futures::{
    task::{Context, Poll},
    Future,
};

use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{IdbTransaction, IdbTransactionMode};

use crate::{IndexedDb, ObjectStore, TransactionObjectStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    Readonly,
    ReadWrite,
}

impl From<TransactionMode> for IdbTransactionMode {
    fn from(mode: TransactionMode) -> IdbTransactionMode {
        match mode {
            TransactionMode::Readonly => IdbTransactionMode::Readonly,
            TransactionMode::ReadWrite => IdbTransactionMode::Readwrite,
        }
    }
}

pub struct Transaction<'a> {
    pub(crate) inner: IdbTransaction,
    pub(crate) db: PhantomData<&'a IndexedDb>,
}

impl<'a> Transaction<'a> {
    pub fn object_store(&self, name: &str) -> Result<TransactionObjectStore, JsValue> {
        let store = self.inner.object_store(name)?;

        Ok(TransactionObjectStore {
            inner: ObjectStore { inner: store },
            transaction: PhantomData,
        })
    }

    /// Wait for the transaction to commit.
    ///
    /// Resolves with an error if the transaction failed or was aborted.
    pub async fn done(self) -> Result<(), JsValue> {
        TransactionFuture::new(self.inner).await
    }

    /// Roll back every change made in the transaction.
    pub async fn abort(self) -> Result<(), JsValue> {
        let transaction = TransactionFuture::new(self.inner.clone());
        self.inner.abort()?;

        match transaction.await {
            Err(e) if e.is_undefined() => Ok(()),
            other => other,
        }
    }
}

#[derive(Clone, Copy)]
pub enum TransactionState {
    Pending,
    Completed,
    Error,
    Aborted,
}

pub struct TransactionFuture {
    inner: IdbTransaction,
    state: Arc<Mutex<TransactionState>>,
    on_completed: Mutex<Option<Closure<dyn FnMut()>>>,
    on_error: Mutex<Option<Closure<dyn FnMut()>>>,
    on_abort: Mutex<Option<Closure<dyn FnMut()>>>,
}

impl TransactionFuture {
    fn new(transaction: IdbTransaction) -> Self {
        Self {
            inner: transaction,
            state: Arc::new(Mutex::new(TransactionState::Pending)),
            on_completed: Mutex::new(None),
            on_error: Mutex::new(None),
            on_abort: Mutex::new(None),
        }
    }

    fn state(&self) -> TransactionState {
        *self.state.lock().unwrap()
    }

    fn set_on_complete(&self, closure: Option<Closure<dyn FnMut()>>) {
        self.inner
            .set_oncomplete(closure.as_ref().map(|c| c.as_ref().unchecked_ref()));
        *self.on_completed.lock().unwrap() = closure;
    }

    fn set_on_error(&self, closure: Option<Closure<dyn FnMut()>>) {
        self.inner
            .set_onerror(closure.as_ref().map(|c| c.as_ref().unchecked_ref()));
        *self.on_error.lock().unwrap() = closure;
    }

    fn set_on_abort(&self, closure: Option<Closure<dyn FnMut()>>) {
        self.inner
            .set_onabort(closure.as_ref().map(|c| c.as_ref().unchecked_ref()));
        *self.on_abort.lock().unwrap() = closure;
    }

    fn failure(&self) -> JsValue {
        self.inner
            .error()
            .map(JsValue::from)
            .unwrap_or_else(JsValue::undefined)
    }
}

impl Drop for TransactionFuture {
    fn drop(&mut self) {
        self.set_on_complete(None);
        self.set_on_error(None);
        self.set_on_abort(None);
    }
}

impl Future for TransactionFuture {
    type Output = Result<(), JsValue>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.state() {
            TransactionState::Pending => {
                let waker = cx.waker().to_owned();
                let state = self.state.clone();

                let on_complete = Closure::wrap(Box::new(move || {
                    *state.lock().unwrap() = TransactionState::Completed;
                    waker.clone().wake()
                }) as Box<dyn FnMut()>);
                self.set_on_complete(Some(on_complete));

                let waker = cx.waker().to_owned();
                let state = self.state.clone();

                let on_error = Closure::wrap(Box::new(move || {
                    *state.lock().unwrap() = TransactionState::Error;
                    waker.clone().wake()
                }) as Box<dyn FnMut()>);

                self.set_on_error(Some(on_error));

                let waker = cx.waker().to_owned();
                let state = self.state.clone();

                let on_abort = Closure::wrap(Box::new(move || {
                    *state.lock().unwrap() = TransactionState::Aborted;
                    waker.clone().wake()
                }) as Box<dyn FnMut()>);

                self.set_on_abort(Some(on_abort));

                Poll::Pending
            }
            TransactionState::Completed => Poll::Ready(Ok(())),
            TransactionState::Error => Poll::Ready(Err(self.failure())),
            TransactionState::Aborted => Poll::Ready(Err(self.failure())),
        }
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod test {
    use crate::{IndexedDb, KeyPath, TransactionMode};
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    async fn await_transaction() {
        crate::delete_database("tx-await").await.unwrap();
        let db = IndexedDb::open("tx-await", 1, |_, upgrader| {
            upgrader.create_object_store("test", KeyPath::None, false)?;
            Ok(())
        })
        .await
        .expect("Failed to open indexed DB");

        let transaction = db.transaction(&["test"], TransactionMode::ReadWrite).unwrap();

        let store = transaction.object_store("test").unwrap();
        let key = "Hello".to_owned();

        store
            .add_with_key(&key, &"world".to_owned())
            .await
            .expect("Can't write to the store");
        transaction
            .done()
            .await
            .expect("Can't await end of transaction");

        let transaction = db.transaction(&["test"], TransactionMode::Readonly).unwrap();
        let store = transaction.object_store("test").unwrap();

        let value: String = store
            .get(&key)
            .await
            .expect("Can't get string out of store")
            .unwrap();
        assert_eq!(value, "world");
        db.close();
    }

    #[wasm_bindgen_test]
    async fn aborted_transaction_discards_writes() {
        crate::delete_database("tx-abort").await.unwrap();
        let db = IndexedDb::open("tx-abort", 1, |_, upgrader| {
            upgrader.create_object_store("test", "id", true)?;
            Ok(())
        })
        .await
        .expect("Failed to open indexed DB");

        let transaction = db.transaction(&["test"], TransactionMode::ReadWrite).unwrap();
        let store = transaction.object_store("test").unwrap();
        #[derive(serde::Serialize)]
        struct Draft {
            title: &'static str,
        }

        let key: u32 = store
            .add(&Draft { title: "gone" })
            .await
            .expect("Can't write to the store");
        drop(store);
        transaction.abort().await.expect("Can't abort transaction");

        let transaction = db.transaction(&["test"], TransactionMode::Readonly).unwrap();
        let store = transaction.object_store("test").unwrap();
        let value: Option<serde_json::Value> = store.get(&key).await.unwrap();
        assert!(value.is_none());
        db.close();
    }
}
