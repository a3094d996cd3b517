use console_web::println;
use indexeddb_notes::{
    error::js_error_message,
    view::{self, ListEntry},
    NewNote, NoteId, NoteStore, NoteStoreConfig,
};
use wasm_bindgen::{prelude::*, JsCast};
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, HtmlElement, HtmlInputElement};

/// The parts of the host page the notes widget drives.
#[derive(Debug, Clone)]
struct Page {
    document: web_sys::Document,
    list: HtmlElement,
    title_input: HtmlInputElement,
    body_input: HtmlInputElement,
    form: HtmlElement,
}

impl Page {
    fn find() -> Result<Page, JsValue> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;

        Ok(Page {
            list: select(&document, "ul")?,
            title_input: select(&document, "#title")?,
            body_input: select(&document, "#body")?,
            form: select(&document, "form")?,
            document,
        })
    }

    /// Replace the list contents with `entries`.
    fn show(&self, entries: &[ListEntry]) -> Result<(), JsValue> {
        self.list.set_inner_html("");

        for entry in entries {
            let item = self.document.create_element("li")?;

            match entry {
                ListEntry::Note(note) => {
                    let heading = self.document.create_element("h3")?;
                    heading.set_text_content(Some(&note.heading));
                    let text = self.document.create_element("p")?;
                    text.set_text_content(Some(&note.text));
                    let delete = self.document.create_element("button")?;
                    delete.set_text_content(Some(view::DELETE_LABEL));

                    item.append_child(&heading)?;
                    item.append_child(&text)?;
                    item.set_attribute(view::NOTE_ID_ATTRIBUTE, &note.id.to_string())?;
                    item.append_child(&delete)?;
                }
                ListEntry::Empty => item.set_text_content(Some(view::EMPTY_MESSAGE)),
            }

            self.list.append_child(&item)?;
        }

        Ok(())
    }

    fn clear_form(&self) {
        self.title_input.set_value("");
        self.body_input.set_value("");
    }
}

fn select<T: JsCast>(document: &web_sys::Document, selector: &str) -> Result<T, JsValue> {
    document
        .query_selector(selector)?
        .ok_or_else(|| JsValue::from_str(&format!("nothing matches \"{}\"", selector)))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("\"{}\" has the wrong element type", selector)))
}

/// The id of the note whose delete button was clicked, if a delete button was clicked.
fn delete_target(event: &web_sys::Event) -> Option<NoteId> {
    let target = event.target()?.dyn_into::<Element>().ok()?;
    target.closest("button").ok().flatten()?;
    let item = target.closest("li").ok().flatten()?;

    view::parse_note_id(&item.get_attribute(view::NOTE_ID_ATTRIBUTE)?)
}

async fn render(page: &Page, store: &NoteStore) {
    let notes = match store.notes().await {
        Ok(notes) => notes,
        Err(e) => {
            println!("Error: {}", e);
            return;
        }
    };

    match page.show(&view::project(&notes)) {
        Ok(()) => println!("Notes all displayed"),
        Err(e) => println!("Error: {}", js_error_message(&e)),
    }
}

async fn add_note(page: Page, store: NoteStore, note: NewNote) {
    match store.insert(&note).await {
        Ok(_id) => {
            page.clear_form();
            println!("Transaction completed: database modification finished.");
            render(&page, &store).await;
        }
        Err(e) => println!("Transaction not opened due to error: {}", e),
    }
}

async fn delete_note(page: Page, store: NoteStore, id: NoteId) {
    match store.delete(id).await {
        Ok(()) => {
            println!("Note {} deleted.", id);
            render(&page, &store).await;
        }
        Err(e) => println!("Error: {}", e),
    }
}

fn attach_handlers(page: &Page, store: &NoteStore) {
    let (submit_page, submit_store) = (page.clone(), store.clone());
    let on_submit = Closure::wrap(Box::new(move |event: web_sys::Event| {
        event.prevent_default();

        let note = NewNote::new(
            submit_page.title_input.value(),
            submit_page.body_input.value(),
        );
        spawn_local(add_note(submit_page.clone(), submit_store.clone(), note));
    }) as Box<dyn FnMut(web_sys::Event)>);

    // One listener on the list serves every delete button, including ones rendered later.
    let (click_page, click_store) = (page.clone(), store.clone());
    let on_click = Closure::wrap(Box::new(move |event: web_sys::Event| {
        if let Some(id) = delete_target(&event) {
            spawn_local(delete_note(click_page.clone(), click_store.clone(), id));
        }
    }) as Box<dyn FnMut(web_sys::Event)>);

    page.form.set_onsubmit(Some(on_submit.as_ref().unchecked_ref()));
    page.list.set_onclick(Some(on_click.as_ref().unchecked_ref()));

    // The handlers live as long as the page.
    on_submit.forget();
    on_click.forget();
}

/// Host pages may set `window.notesConfig = { name, version }` before the module loads.
fn config() -> NoteStoreConfig {
    let value = web_sys::window()
        .map(|window| js_sys::Reflect::get(&window, &JsValue::from_str("notesConfig")))
        .unwrap_or(Ok(JsValue::UNDEFINED))
        .unwrap_or(JsValue::UNDEFINED);

    NoteStoreConfig::from_js(value).unwrap_or_else(|e| {
        println!("Error: {}, using the default database", e);
        NoteStoreConfig::default()
    })
}

async fn main(config: NoteStoreConfig) {
    let page = match Page::find() {
        Ok(page) => page,
        Err(e) => {
            println!("Error: {}", js_error_message(&e));
            return;
        }
    };

    let store = NoteStore::new(config);
    attach_handlers(&page, &store);

    match store.open().await {
        Ok(()) => println!("Database opened successfully"),
        Err(e) => {
            println!("Database failed to open: {}", e);
            return;
        }
    }

    render(&page, &store).await;
}

#[wasm_bindgen(start)]
pub fn run() {
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));

    spawn_local(main(config()));
}
