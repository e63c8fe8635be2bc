//! Shared fixtures for the router integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use cms_router::content::{ContentFetcher, FetchError, PageData};
use cms_router::dom::NodeId;
use cms_router::{ClientConfig, ClientHooks, CmsError, Document, HeadlessHost, Router};
use serde_json::{json, Value};
use url::Url;

pub const SITE: &str = "https://site.test/";

/// In-memory content store. Unknown paths answer 404; the redirect listing
/// starts out empty. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MockFetcher {
    responses: Rc<RefCell<HashMap<String, Result<Value, FetchError>>>>,
    requests: Rc<RefCell<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        let fetcher = Self {
            responses: Rc::default(),
            requests: Rc::default(),
        };
        fetcher.redirects(json!([]))
    }

    pub fn page(self, path: &str, page: Value) -> Self {
        self.responses.borrow_mut().insert(path.to_string(), Ok(page));
        self
    }

    pub fn failure(self, path: &str, error: FetchError) -> Self {
        self.responses.borrow_mut().insert(path.to_string(), Err(error));
        self
    }

    pub fn redirects(self, listing: Value) -> Self {
        self.page("/redirects.json", listing)
    }

    /// Paths requested so far, oldest first.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl ContentFetcher for MockFetcher {
    async fn get_json(&self, path: &str) -> Result<Value, FetchError> {
        self.requests.borrow_mut().push(path.to_string());
        match self.responses.borrow().get(path) {
            Some(response) => response.clone(),
            None => Err(FetchError::Status {
                status: 404,
                body: "Not Found".to_string(),
            }),
        }
    }
}

/// Hooks recording every callback the router makes.
#[derive(Debug, Default)]
pub struct RecordingHooks {
    pub errors: RefCell<Vec<&'static str>>,
    pub not_found: RefCell<Vec<String>>,
    pub rendered: RefCell<Vec<Option<String>>>,
    pub clicks: RefCell<Vec<String>>,
    pub cancel_links: Cell<bool>,
}

impl ClientHooks for RecordingHooks {
    fn on_error(&self, error: &CmsError) {
        self.errors.borrow_mut().push(error.kind());
    }

    fn on_route_not_found(&self, url: &str) -> Option<PageData> {
        self.not_found.borrow_mut().push(url.to_string());
        Some(PageData::not_found())
    }

    fn on_page_rendered(&self, page: &PageData) {
        self.rendered.borrow_mut().push(page.title.clone());
    }

    fn on_link_click(&self, url: &str) -> bool {
        self.clicks.borrow_mut().push(url.to_string());
        !self.cancel_links.get()
    }
}

/// Element ids of the fixture page template.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub content: NodeId,
    pub title: NodeId,
    pub hidden_on_two: NodeId,
}

/// A body with a content area, a title and a template-conditional banner.
pub fn layout(doc: &mut Document) -> Layout {
    let body = doc.body();

    let title = doc.create_element("h1");
    doc.set_attribute(title, "cms-title", "");
    doc.set_text_content(title, "Site");
    doc.append_child(body, title);

    let content = doc.create_element("div");
    doc.set_attribute(content, "cms-content-editor", "page.content.body");
    doc.set_text_content(content, "Default body");
    doc.append_child(body, content);

    let hidden_on_two = doc.create_element("div");
    doc.set_attribute(hidden_on_two, "cms-template", "!two");
    doc.append_child(body, hidden_on_two);

    Layout {
        content,
        title,
        hidden_on_two,
    }
}

pub fn page(title: &str, body: &str) -> Value {
    json!({
        "title": title,
        "content": { "body": body },
    })
}

pub fn config() -> ClientConfig {
    ClientConfig {
        redirect_listing_path: Some("redirects.json".to_string()),
        ..Default::default()
    }
}

pub struct Harness {
    pub router: Router<MockFetcher>,
    pub fetcher: MockFetcher,
    pub host: Rc<HeadlessHost>,
    pub hooks: Rc<RecordingHooks>,
    pub document: Rc<RefCell<Document>>,
    pub layout: Layout,
}

impl Harness {
    pub fn new(fetcher: MockFetcher) -> Self {
        Self::with(fetcher, config(), HeadlessHost::new(location(SITE)))
    }

    pub fn with(fetcher: MockFetcher, config: ClientConfig, host: HeadlessHost) -> Self {
        let mut doc = Document::new();
        let layout = layout(&mut doc);
        let document = Rc::new(RefCell::new(doc));
        let host = Rc::new(host);
        let hooks = Rc::new(RecordingHooks::default());
        let router = Router::new(fetcher.clone(), config, host.clone(), hooks.clone(), document.clone());
        Self {
            router,
            fetcher,
            host,
            hooks,
            document,
            layout,
        }
    }

    pub fn content(&self) -> String {
        self.document.borrow().inner_html(self.layout.content)
    }

    pub fn title(&self) -> String {
        self.document.borrow().text_content(self.layout.title)
    }
}

pub fn location(url: &str) -> Url {
    Url::parse(url).unwrap()
}
