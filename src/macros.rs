/// Drain a `DomStringList` into a rust collection.
///
/// `to_collection!(list => Vec<String> : push)` calls `push` on a fresh
/// collection for every string in the list.
macro_rules! to_collection {
    ($list:expr => $ty:ty : $insert:ident) => {{
        let list = $list;
        let mut out = <$ty>::new();
        for idx in 0..list.length() {
            if let Some(item) = list.item(idx) {
                out.$insert(item);
            }
        }
        out
    }};
}

/// Build a `js_sys::Array` out of anything iterable whose items convert into `JsValue`.
macro_rules! from_collection {
    ($items:expr) => {{
        let array = js_sys::Array::new();
        for item in $items {
            array.push(&wasm_bindgen::JsValue::from(item));
        }
        array
    }};
}
