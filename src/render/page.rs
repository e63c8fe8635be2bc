//! Page renderer.
//!
//! # Responsibilities
//! - Write page header, stylesheet, SEO tags and title into `<head>`
//! - Register the binding triggers for content, title, template and
//!   on-render attributes
//! - Append the footer and report completion once the window closes
//! - Remove the previous page's head and footer fragments
//!
//! # Design Decisions
//! - Inserted fragments sit between `<script id="jshcms-insert-divider-*">`
//!   markers so they can be removed as a range
//! - Inline scripts of inserted fragments go to the host; external ones are
//!   not loaded

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::content::PageData;
use crate::dom::{Document, NodeId, SelectorList};
use crate::host::Host;
use crate::render::bindings::{self, LinkScopes, CONTENT_ATTRS, ONRENDER_ATTR, TEMPLATE_ATTR, TITLE_ATTR};
use crate::render::defaults::DefaultContentCache;
use crate::render::live::{Dedup, LiveRenderEngine, Selector};
use crate::render::onrender::HIDE_CLASS;
use crate::routing::hooks::ClientHooks;

pub const RENDER_STYLE_ID: &str = "jshcms_render_styles";
pub const PAGE_STYLE_ID: &str = "jshcms_page_render_styles";

const DIVIDER_PREFIX: &str = "jshcms-insert-divider-";

/// Named fragment ranges written by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Divider {
    Header,
    Seo,
    Footer,
}

impl Divider {
    pub fn name(self) -> &'static str {
        match self {
            Divider::Header => "header",
            Divider::Seo => "seo",
            Divider::Footer => "footer",
        }
    }

    pub fn start_id(self) -> String {
        format!("{DIVIDER_PREFIX}{}-start", self.name())
    }

    pub fn end_id(self) -> String {
        format!("{DIVIDER_PREFIX}{}-end", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Route clicks on links inside content areas through the router.
    pub bind_links: bool,
}

/// Inline JavaScript bodies of the `<script>` elements in `nodes` and their
/// descendants, in document order.
fn inline_scripts(doc: &Document, nodes: &[NodeId]) -> Vec<String> {
    let mut scripts = Vec::new();
    for node in nodes.iter().flat_map(|n| doc.descendants(*n)) {
        let Some(el) = doc.element(node).filter(|e| e.tag() == "script") else {
            continue;
        };
        if let Some(kind) = el.attribute("type").map(str::to_ascii_lowercase) {
            if !kind.is_empty() && !kind.contains("javascript") && !kind.contains("ecmascript") {
                continue;
            }
        }
        if let Some(src) = el.attribute("src") {
            tracing::debug!(src, "External script not loaded");
            continue;
        }

        let text = doc.text_content(node);
        let body = strip_wrapper(text.trim(), "<![CDATA[", "]]>");
        let body = strip_wrapper(body, "<!--", "-->");
        if !body.is_empty() {
            scripts.push(body.to_string());
        }
    }
    scripts
}

fn strip_wrapper<'a>(body: &'a str, open: &str, close: &str) -> &'a str {
    let starts = body
        .get(..open.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(open));
    if !starts {
        return body;
    }
    let inner = &body[open.len()..];
    inner.strip_suffix(close).unwrap_or(inner).trim()
}

struct RendererState {
    engine: LiveRenderEngine,
    host: Rc<dyn Host>,
    hooks: Rc<dyn ClientHooks>,
    defaults: Rc<RefCell<DefaultContentCache>>,
    links: LinkScopes,
    initial_render: Cell<bool>,
    footer_container: Option<SelectorList>,
}

/// Renders page data into the engine's document. Cheap to clone.
#[derive(Clone)]
pub struct PageRenderer {
    state: Rc<RendererState>,
}

impl std::fmt::Debug for PageRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRenderer")
            .field("initial_render", &self.state.initial_render.get())
            .field("footer_container", &self.state.footer_container)
            .finish()
    }
}

impl PageRenderer {
    pub fn new(
        engine: LiveRenderEngine,
        host: Rc<dyn Host>,
        hooks: Rc<dyn ClientHooks>,
        footer_container: Option<SelectorList>,
    ) -> Self {
        Self {
            state: Rc::new(RendererState {
                engine,
                host,
                hooks,
                defaults: Rc::new(RefCell::new(DefaultContentCache::new())),
                links: LinkScopes::default(),
                initial_render: Cell::new(true),
                footer_container,
            }),
        }
    }

    pub fn engine(&self) -> &LiveRenderEngine {
        &self.state.engine
    }

    /// Containers whose links were bound by content rendering.
    pub fn link_scopes(&self) -> &LinkScopes {
        &self.state.links
    }

    /// True until the first page render completes.
    pub fn is_initial_render(&self) -> bool {
        self.state.initial_render.get()
    }

    /// Append the stylesheet backing `showIf` once.
    pub fn append_render_css(&self) {
        let mut doc = self.state.engine.document().borrow_mut();
        if doc.get_element_by_id(RENDER_STYLE_ID).is_none() {
            append_css(&mut doc, RENDER_STYLE_ID, &format!(".{HIDE_CLASS}{{display:none !important}}"));
        }
    }

    /// Render a page into the document; resolves after `on_page_rendered`.
    pub async fn render_page(&self, page: &PageData, options: RenderOptions) {
        let page = Rc::new(page.clone());
        let engine = &self.state.engine;
        self.state.hooks.on_page_render(&page);

        let this = self.clone();
        let head_page = page.clone();
        engine.register(Selector::head(), Dedup::List, move |doc, head| {
            this.write_head(doc, head, &head_page);
        });

        let defaults = self.state.defaults.clone();
        let links = self.state.links.clone();
        let content_page = page.clone();
        engine.register(
            Selector::Query(SelectorList::any_attribute(CONTENT_ATTRS)),
            Dedup::Marker,
            move |doc, node| {
                let bound = bindings::render_content(doc, node, &content_page, &mut defaults.borrow_mut());
                if bound && options.bind_links {
                    links.bind(node);
                }
            },
        );

        let defaults = self.state.defaults.clone();
        let title_page = page.clone();
        engine.register(
            Selector::Query(SelectorList::any_attribute(&[TITLE_ATTR])),
            Dedup::Marker,
            move |doc, node| bindings::render_title(doc, node, &title_page, &mut defaults.borrow_mut()),
        );

        let template_page = page.clone();
        engine.register(
            Selector::Query(SelectorList::any_attribute(&[TEMPLATE_ATTR])),
            Dedup::Marker,
            move |doc, node| bindings::apply_template(doc, node, &template_page),
        );

        let page_value = serde_json::to_value(&*page).unwrap_or(Value::Null);
        engine.register(
            Selector::Query(SelectorList::any_attribute(&[ONRENDER_ATTR])),
            Dedup::Marker,
            move |doc, node| bindings::run_onrender(doc, node, &page_value),
        );

        if let Some(js) = page.js.as_deref().filter(|js| !js.trim().is_empty()) {
            self.state.host.execute_script(js);
        }

        let (done_tx, done_rx) = oneshot::channel();
        let this = self.clone();
        engine.register_with_completion(Selector::None, Dedup::Marker, |_, _| {}, move || {
            this.append_footer(&page);
            tokio::task::spawn_local(async move {
                tokio::task::yield_now().await;
                this.state.hooks.on_page_rendered(&page);
                this.state.initial_render.set(false);
                let _ = done_tx.send(());
            });
        });

        if done_rx.await.is_err() {
            tracing::warn!("Page render finished without completion signal");
        }
    }

    /// Render bindings below `element` in three consecutive windows:
    /// content areas, then template logic, then on-render scripts.
    pub async fn render_element(&self, element: NodeId, page: &PageData, options: RenderOptions) {
        let engine = &self.state.engine;
        let page = Rc::new(page.clone());

        let defaults = self.state.defaults.clone();
        let links = self.state.links.clone();
        let content_page = page.clone();
        engine.register(
            Selector::within(element, SelectorList::any_attribute(CONTENT_ATTRS)),
            Dedup::Marker,
            move |doc, node| {
                let bound = bindings::render_content(doc, node, &content_page, &mut defaults.borrow_mut());
                if bound && options.bind_links {
                    links.bind(node);
                }
            },
        );
        let _ = engine.when_complete().await;

        let template_page = page.clone();
        engine.register(
            Selector::within(element, SelectorList::any_attribute(&[TEMPLATE_ATTR])),
            Dedup::Marker,
            move |doc, node| bindings::apply_template(doc, node, &template_page),
        );
        let _ = engine.when_complete().await;

        let page_value = serde_json::to_value(&*page).unwrap_or(Value::Null);
        engine.register(
            Selector::within(element, SelectorList::any_attribute(&[ONRENDER_ATTR])),
            Dedup::Marker,
            move |doc, node| bindings::run_onrender(doc, node, &page_value),
        );
        let _ = engine.when_complete().await;
    }

    fn write_head(&self, doc: &mut Document, head: NodeId, page: &PageData) {
        if !self.state.initial_render.get() {
            self.destroy_page(doc);
        }

        if let Some(header) = page.header.as_deref().filter(|h| !h.trim().is_empty()) {
            self.append_html(doc, head, header, Divider::Header);
        }
        if let Some(css) = page.css.as_deref().filter(|c| !c.trim().is_empty()) {
            append_css(doc, PAGE_STYLE_ID, css);
        }

        let hooks = &self.state.hooks;
        let seo_start = Divider::Seo.start_id();
        append_tag(doc, head, "script", &[("id", seo_start.as_str())]);
        if let Some(desc) = page.seo.metadesc.as_deref().filter(|d| !d.is_empty()) {
            if hooks.on_set_meta_description(desc) {
                append_tag(doc, head, "meta", &[("name", "description"), ("content", desc)]);
            }
        }
        if let Some(keywords) = page.seo.keywords.as_deref().filter(|k| !k.is_empty()) {
            if hooks.on_set_meta_keywords(keywords) {
                append_tag(doc, head, "meta", &[("name", "keywords"), ("content", keywords)]);
            }
        }
        if let Some(canonical) = page.seo.canonical_url.as_deref().filter(|c| !c.is_empty()) {
            if hooks.on_set_canonical_url(canonical) {
                append_tag(doc, head, "link", &[("rel", "canonical"), ("href", canonical)]);
            }
        }
        let seo_end = Divider::Seo.end_id();
        append_tag(doc, head, "script", &[("id", seo_end.as_str())]);

        if let Some(title) = page.document_title() {
            if hooks.on_set_title(title) {
                doc.set_title(title);
            }
        }
    }

    /// Remove the previous page's head and footer fragments.
    pub fn destroy_page(&self, doc: &mut Document) {
        self.state.hooks.on_page_destroy();
        remove_html(doc, Divider::Header);
        remove_html(doc, Divider::Seo);
        remove_html(doc, Divider::Footer);
        doc.remove_element_by_id(PAGE_STYLE_ID);
    }

    fn append_footer(&self, page: &PageData) {
        let Some(footer) = page.footer.as_deref().filter(|f| !f.trim().is_empty()) else {
            return;
        };
        let mut doc = self.state.engine.document().borrow_mut();
        let container = match &self.state.footer_container {
            Some(selector) => doc.select(selector).into_iter().next(),
            None => Some(doc.body()),
        };
        match container {
            Some(container) => self.append_html(&mut doc, container, footer, Divider::Footer),
            None => tracing::debug!("Footer container not found, footer skipped"),
        }
    }

    /// Append `markup` to `container` between the divider's markers and run
    /// its inline scripts.
    pub fn append_html(&self, doc: &mut Document, container: NodeId, markup: &str, divider: Divider) {
        let (start, end) = (divider.start_id(), divider.end_id());
        append_tag(doc, container, "script", &[("id", start.as_str())]);
        let nodes = doc.append_html(container, markup);
        append_tag(doc, container, "script", &[("id", end.as_str())]);

        for script in inline_scripts(doc, &nodes) {
            self.state.host.execute_script(&script);
        }
    }
}

/// Remove the children of a divider's container from its start marker
/// through its end marker.
pub fn remove_html(doc: &mut Document, divider: Divider) {
    let Some(start) = doc.get_element_by_id(&divider.start_id()) else {
        return;
    };
    let Some(container) = doc.parent(start) else {
        return;
    };
    let end_id = divider.end_id();
    let siblings = doc.children(container).to_vec();
    let Some(from) = siblings.iter().position(|n| *n == start) else {
        return;
    };
    for node in &siblings[from..] {
        let is_end = doc.element(*node).and_then(|e| e.id()) == Some(end_id.as_str());
        doc.remove(*node);
        if is_end {
            break;
        }
    }
}

pub fn append_css(doc: &mut Document, id: &str, css: &str) {
    let style = doc.create_element("style");
    doc.set_attribute(style, "id", id);
    doc.set_attribute(style, "type", "text/css");
    doc.set_attribute(style, "media", "all");
    doc.set_text_content(style, css);
    let head = doc.head();
    doc.append_child(head, style);
}

pub fn append_tag(doc: &mut Document, container: NodeId, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
    let node = doc.create_element(tag);
    for (name, value) in attributes {
        doc.set_attribute(node, name, value);
    }
    doc.append_child(container, node);
    node
}
