use std::{fmt, pin::Pin, sync::Mutex};

use futures::{
    stream::{FusedStream, Stream},
    task::{Context, Poll},
};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

use crate::request::finished_request_result;

/// A cursor over an object store, as a stream of `(key, value)` pairs in ascending key order.
///
/// The cursor is advanced as soon as a record is handed out, which keeps the transaction alive
/// until the stream is drained. It cannot be rewound: once it returns `None` (or an error) it
/// stays finished. Dropping it early is fine; the outstanding advance completes unobserved.
pub struct Cursor {
    request: web_sys::IdbRequest,
    finished: bool,
    onsuccess: Mutex<Option<Closure<dyn FnMut()>>>,
    onerror: Mutex<Option<Closure<dyn FnMut()>>>,
}

impl Cursor {
    pub(crate) fn new(request: web_sys::IdbRequest) -> Self {
        Cursor {
            request,
            finished: false,
            onsuccess: Mutex::new(None),
            onerror: Mutex::new(None),
        }
    }

    fn set_onsuccess(&self, closure: Option<Closure<dyn FnMut()>>) {
        self.request
            .set_onsuccess(closure.as_ref().map(|c| c.as_ref().unchecked_ref()));
        *self.onsuccess.lock().unwrap() = closure;
    }

    fn set_onerror(&self, closure: Option<Closure<dyn FnMut()>>) {
        self.request
            .set_onerror(closure.as_ref().map(|c| c.as_ref().unchecked_ref()));
        *self.onerror.lock().unwrap() = closure;
    }

    fn take_record(&mut self) -> Option<Result<(JsValue, JsValue), JsValue>> {
        let result = match finished_request_result(&self.request) {
            Ok(result) => result,
            Err(e) => {
                self.finished = true;
                return Some(Err(e));
            }
        };

        if result.is_null() || result.is_undefined() {
            self.finished = true;
            return None;
        }

        let cursor: web_sys::IdbCursorWithValue = result.unchecked_into();
        let record = cursor
            .primary_key()
            .and_then(|key| cursor.value().map(|value| (key, value)))
            .and_then(|record| cursor.continue_().map(|()| record));

        if record.is_err() {
            self.finished = true;
        }
        Some(record)
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        // A `continue()` may still be in flight.
        self.set_onsuccess(None);
        self.set_onerror(None);
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("finished", &self.finished)
            .finish()
    }
}

impl Stream for Cursor {
    type Item = Result<(JsValue, JsValue), JsValue>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        use web_sys::IdbRequestReadyState as ReadyState;

        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match this.request.ready_state() {
            ReadyState::Pending => {
                let waker = cx.waker().to_owned();

                let onsuccess =
                    Closure::wrap(Box::new(move || waker.clone().wake()) as Box<dyn FnMut()>);
                this.set_onsuccess(Some(onsuccess));

                let waker = cx.waker().to_owned();

                let onerror =
                    Closure::wrap(Box::new(move || waker.clone().wake()) as Box<dyn FnMut()>);
                this.set_onerror(Some(onerror));

                Poll::Pending
            }
            ReadyState::Done => Poll::Ready(this.take_record()),
            _ => {
                this.finished = true;
                Poll::Ready(Some(Err(JsValue::from_str("unexpected cursor ready state"))))
            }
        }
    }
}

impl FusedStream for Cursor {
    fn is_terminated(&self) -> bool {
        self.finished
    }
}
