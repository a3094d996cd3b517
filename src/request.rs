use futures::{
    task::{Context, Poll},
    Future,
};
use std::{
    fmt,
    pin::Pin,
    sync::{Arc, Mutex},
};
use web_sys::IdbRequestReadyState as ReadyState;

use wasm_bindgen::{closure::Closure, JsCast, JsValue};

use crate::{
    db::{DbDuringUpgrade, IndexedDb},
    error::{js_error_message, OpenDbError},
};

pub(crate) struct IndexedDbRequest {
    inner: Arc<web_sys::IdbRequest>,
    onsuccess: Mutex<Option<Closure<dyn FnMut()>>>,
    onerror: Mutex<Option<Closure<dyn FnMut()>>>,
}

impl IndexedDbRequest {
    pub(crate) fn new(request: web_sys::IdbRequest) -> Self {
        Self {
            inner: Arc::new(request),
            onsuccess: Mutex::new(None),
            onerror: Mutex::new(None),
        }
    }

    fn set_onsuccsess(&self, closure: Option<Closure<dyn FnMut()>>) {
        self.inner
            .set_onsuccess(closure.as_ref().map(|c| c.as_ref().unchecked_ref()));
        *self.onsuccess.lock().unwrap() = closure;
    }

    fn set_onerror(&self, closure: Option<Closure<dyn FnMut()>>) {
        self.inner
            .set_onerror(closure.as_ref().map(|c| c.as_ref().unchecked_ref()));
        *self.onerror.lock().unwrap() = closure;
    }
}

impl Drop for IndexedDbRequest {
    fn drop(&mut self) {
        // The browser must not call back into closures we are about to free.
        self.set_onsuccsess(None);
        self.set_onerror(None);
    }
}

impl Future for IndexedDbRequest {
    type Output = Result<JsValue, JsValue>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        match self.inner.ready_state() {
            ReadyState::Pending => {
                let waker = cx.waker().to_owned();

                let onsuccess =
                    Closure::wrap(Box::new(move || waker.clone().wake()) as Box<dyn FnMut()>);
                self.set_onsuccsess(Some(onsuccess));

                let waker = cx.waker().to_owned();

                let onerror =
                    Closure::wrap(Box::new(move || waker.clone().wake()) as Box<dyn FnMut()>);

                self.set_onerror(Some(onerror));

                Poll::Pending
            }
            ReadyState::Done => Poll::Ready(finished_request_result(&self.inner)),
            _ => Poll::Ready(Err(JsValue::from_str("unexpected request ready state"))),
        }
    }
}

/// The outcome of a request whose ready state is `done`.
///
/// A failed request reports `undefined` as its result, so the error has to be checked first.
pub(crate) fn finished_request_result(request: &web_sys::IdbRequest) -> Result<JsValue, JsValue> {
    match request.error() {
        Ok(Some(e)) => Err(e.into()),
        Ok(None) => request.result(),
        Err(e) => Err(e),
    }
}

/// Wraps the open db request. Private - the user interacts with the request using the function
/// passed to the `open` method.
pub(crate) struct IdbOpenDbRequest {
    // We need to move a ref for this into the upgradeneeded closure.
    pub(crate) inner: Arc<web_sys::IdbOpenDbRequest>,
    upgrade_error: Arc<Mutex<Option<String>>>,
    blocked: Arc<Mutex<bool>>,
    onsuccess: Mutex<Option<Closure<dyn FnMut()>>>,
    onerror: Mutex<Option<Closure<dyn FnMut()>>>,
    onblocked: Mutex<Option<Closure<dyn FnMut()>>>,
    onupgradeneeded: Mutex<Option<Closure<dyn FnMut(web_sys::IdbVersionChangeEvent)>>>,
}

impl IdbOpenDbRequest {
    pub(crate) fn new(
        request: web_sys::IdbOpenDbRequest,
        upgrade_callback: impl Fn(u32, &DbDuringUpgrade) -> Result<(), JsValue> + 'static,
    ) -> Self {
        let request = Arc::new(request);
        let request_copy = request.clone();
        let upgrade_error = Arc::new(Mutex::new(None));
        let upgrade_error_copy = upgrade_error.clone();

        let request = IdbOpenDbRequest {
            inner: request,
            upgrade_error,
            blocked: Arc::new(Mutex::new(false)),
            onsuccess: Mutex::new(None),
            onerror: Mutex::new(None),
            onblocked: Mutex::new(None),
            onupgradeneeded: Mutex::new(None),
        };

        let onupgradeneeded = move |event: web_sys::IdbVersionChangeEvent| {
            let old_version = event.old_version() as u32;

            let outcome = request_copy.result().and_then(|result| {
                let db = DbDuringUpgrade::from_raw_unchecked(result);
                upgrade_callback(old_version, &db)
            });

            if let Err(e) = outcome {
                *upgrade_error_copy.lock().unwrap() = Some(js_error_message(&e));
                // Aborting the versionchange transaction fails the open request.
                if let Some(transaction) = request_copy.transaction() {
                    let _ = transaction.abort();
                }
            }
        };

        let onupgradeneeded = Closure::wrap(
            Box::new(onupgradeneeded) as Box<dyn FnMut(web_sys::IdbVersionChangeEvent)>
        );
        request.set_onupgradeneeded(Some(onupgradeneeded));

        request
    }

    fn set_onsuccsess(&self, closure: Option<Closure<dyn FnMut()>>) {
        self.inner
            .set_onsuccess(closure.as_ref().map(|c| c.as_ref().unchecked_ref()));
        *self.onsuccess.lock().unwrap() = closure;
    }

    fn set_onerror(&self, closure: Option<Closure<dyn FnMut()>>) {
        self.inner
            .set_onerror(closure.as_ref().map(|c| c.as_ref().unchecked_ref()));
        *self.onerror.lock().unwrap() = closure;
    }

    fn set_onblocked(&self, closure: Option<Closure<dyn FnMut()>>) {
        self.inner
            .set_onblocked(closure.as_ref().map(|c| c.as_ref().unchecked_ref()));
        *self.onblocked.lock().unwrap() = closure;
    }

    pub(crate) fn set_onupgradeneeded(
        &self,
        closure: Option<Closure<dyn FnMut(web_sys::IdbVersionChangeEvent)>>,
    ) {
        self.inner
            .set_onupgradeneeded(closure.as_ref().map(|c| c.as_ref().unchecked_ref()));
        *self.onupgradeneeded.lock().unwrap() = closure;
    }
}

impl Drop for IdbOpenDbRequest {
    fn drop(&mut self) {
        self.set_onsuccsess(None);
        self.set_onerror(None);
        self.set_onblocked(None);
        self.set_onupgradeneeded(None);

        if self.inner.ready_state() != ReadyState::Pending {
            return;
        }

        // Still queued, most likely behind a blocking connection. Nobody is waiting for the
        // result any more, so the upgrade is rolled back and a connection that opens anyway is
        // closed straight away.
        let request = (*self.inner).clone();
        let abandon_upgrade = Closure::once_into_js(move || {
            if let Some(transaction) = request.transaction() {
                let _ = transaction.abort();
            }
        });
        self.inner.set_onupgradeneeded(Some(abandon_upgrade.unchecked_ref()));

        let request = (*self.inner).clone();
        let close_connection = Closure::once_into_js(move || {
            if let Ok(db) = request.result() {
                db.unchecked_into::<web_sys::IdbDatabase>().close();
            }
        });
        self.inner.set_onsuccess(Some(close_connection.unchecked_ref()));
    }
}

impl fmt::Debug for IdbOpenDbRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "IdbOpenDbRequest")
    }
}

impl Future for IdbOpenDbRequest {
    type Output = Result<IndexedDb, OpenDbError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        if *self.blocked.lock().unwrap() {
            return Poll::Ready(Err(OpenDbError::Blocked));
        }

        match self.inner.ready_state() {
            ReadyState::Pending => {
                let waker = cx.waker().to_owned();

                // If we're not ready set up onsuccess and onerror callbacks to notify the
                // executor.
                let onsuccess =
                    Closure::wrap(Box::new(move || waker.clone().wake()) as Box<dyn FnMut()>);
                self.set_onsuccsess(Some(onsuccess));

                let waker = cx.waker().to_owned();

                let onerror =
                    Closure::wrap(Box::new(move || waker.clone().wake()) as Box<dyn FnMut()>);

                self.set_onerror(Some(onerror));

                let waker = cx.waker().to_owned();
                let blocked = self.blocked.clone();

                let onblocked = Closure::wrap(Box::new(move || {
                    *blocked.lock().unwrap() = true;
                    waker.clone().wake()
                }) as Box<dyn FnMut()>);

                self.set_onblocked(Some(onblocked));

                Poll::Pending
            }
            ReadyState::Done => {
                if let Some(msg) = self.upgrade_error.lock().unwrap().take() {
                    return Poll::Ready(Err(OpenDbError::Upgrade(msg)));
                }

                match finished_request_result(&self.inner) {
                    Ok(val) => Poll::Ready(Ok(IndexedDb::from_raw_unchecked(val))),
                    Err(e) => Poll::Ready(Err(OpenDbError::Request(js_error_message(&e)))),
                }
            }
            _ => Poll::Ready(Err(OpenDbError::Request(
                "unexpected open request ready state".to_owned(),
            ))),
        }
    }
}
