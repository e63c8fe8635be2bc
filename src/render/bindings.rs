//! Actions applied to elements carrying binding attributes.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use serde_json::Value;

use crate::content::PageData;
use crate::dom::{Document, NodeId};
use crate::render::defaults::DefaultContentCache;
use crate::render::expr::eval_flags;
use crate::render::onrender::{show_if, Script};

pub const CONTENT_EDITOR_ATTR: &str = "cms-content-editor";
pub const COMPONENT_CONTENT_ATTR: &str = "cms-component-content";
pub const TITLE_ATTR: &str = "cms-title";
pub const TEMPLATE_ATTR: &str = "cms-template";
pub const ONRENDER_ATTR: &str = "cms-onrender";

pub const CONTENT_ATTRS: &[&str] = &[CONTENT_EDITOR_ATTR, COMPONENT_CONTENT_ATTR];

const CONTENT_KEY_PREFIX: &str = "page.content.";

/// Containers whose links are routed in-page. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct LinkScopes {
    scopes: Rc<RefCell<HashSet<NodeId>>>,
}

impl LinkScopes {
    pub fn bind(&self, node: NodeId) {
        self.scopes.borrow_mut().insert(node);
    }

    pub fn is_bound(&self, node: NodeId) -> bool {
        self.scopes.borrow().contains(&node)
    }

    /// Nearest bound inclusive ancestor of `node`.
    pub fn scope_of(&self, doc: &Document, node: NodeId) -> Option<NodeId> {
        let scopes = self.scopes.borrow();
        let mut current = Some(node);
        while let Some(n) = current {
            if scopes.contains(&n) {
                return Some(n);
            }
            current = doc.parent(n);
        }
        None
    }
}

/// Content area key of a bound element; `cms-component-content` wins.
pub fn content_key(doc: &Document, node: NodeId) -> Option<String> {
    let attr = doc
        .attribute(node, COMPONENT_CONTENT_ATTR)
        .filter(|v| !v.is_empty())
        .or_else(|| doc.attribute(node, CONTENT_EDITOR_ATTR))?;
    let key = attr.strip_prefix(CONTENT_KEY_PREFIX).unwrap_or(attr);
    (!key.is_empty()).then(|| key.to_string())
}

/// Fill a content area from the page. A key missing from the page leaves the
/// element as first seen, or restores that markup after an earlier page
/// replaced it. Returns whether the element names a content area.
pub fn render_content(
    doc: &mut Document,
    node: NodeId,
    page: &PageData,
    defaults: &mut DefaultContentCache,
) -> bool {
    let Some(key) = content_key(doc, node) else {
        return false;
    };
    let previous = defaults.restore_point(doc, node).map(str::to_string);
    match (page.content.get(&key), previous) {
        (Some(markup), _) => doc.set_inner_html(node, markup),
        (None, Some(default)) => doc.set_inner_html(node, &default),
        (None, None) => {}
    }
    true
}

pub fn render_title(
    doc: &mut Document,
    node: NodeId,
    page: &PageData,
    defaults: &mut DefaultContentCache,
) {
    let previous = defaults.restore_point(doc, node).map(str::to_string);
    match (page.title.as_deref().filter(|t| !t.is_empty()), previous) {
        (Some(title), _) => doc.set_text_content(node, title),
        (None, Some(default)) => doc.set_inner_html(node, &default),
        (None, None) => {}
    }
}

/// Show the element when its `cms-template` condition holds for the page's
/// template id.
pub fn apply_template(doc: &mut Document, node: NodeId, page: &PageData) {
    let condition = doc.attribute(node, TEMPLATE_ATTR).unwrap_or_default().to_string();
    let template = page.page_template_id.as_deref();
    let show = eval_flags(&condition, |flag| template == Some(flag));
    show_if(doc, node, show);
}

/// Run the element's `cms-onrender` script. Invalid scripts are skipped.
pub fn run_onrender(doc: &mut Document, node: NodeId, page: &Value) {
    let source = doc.attribute(node, ONRENDER_ATTR).unwrap_or_default().trim().to_string();
    if source.is_empty() {
        return;
    }
    match Script::parse(&source) {
        Ok(script) => script.run(doc, node, page),
        Err(e) => tracing::warn!(node = %node, script = %source, error = %e, "Skipping on-render script"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::onrender::HIDE_CLASS;
    use serde_json::json;

    fn bound(doc: &mut Document, attr: &str, value: &str, inner: &str) -> NodeId {
        let node = doc.create_element("div");
        doc.set_attribute(node, attr, value);
        doc.set_inner_html(node, inner);
        let body = doc.body();
        doc.append_child(body, node);
        node
    }

    fn page() -> PageData {
        let mut page = PageData {
            title: Some("About".to_string()),
            page_template_id: Some("two".to_string()),
            ..Default::default()
        };
        page.content.insert("body".to_string(), "<p>Hello</p>".to_string());
        page
    }

    #[test]
    fn test_content_key() {
        let mut doc = Document::new();
        let a = bound(&mut doc, CONTENT_EDITOR_ATTR, "page.content.body", "");
        let b = bound(&mut doc, COMPONENT_CONTENT_ATTR, "sidebar", "");
        let c = bound(&mut doc, CONTENT_EDITOR_ATTR, "", "");
        assert_eq!(content_key(&doc, a).as_deref(), Some("body"));
        assert_eq!(content_key(&doc, b).as_deref(), Some("sidebar"));
        assert_eq!(content_key(&doc, c), None);
    }

    #[test]
    fn test_content_falls_back_to_default() {
        let mut doc = Document::new();
        let mut defaults = DefaultContentCache::new();
        let body = bound(&mut doc, CONTENT_EDITOR_ATTR, "body", "default body");
        let side = bound(&mut doc, CONTENT_EDITOR_ATTR, "side", "default side");

        assert!(render_content(&mut doc, body, &page(), &mut defaults));
        assert!(render_content(&mut doc, side, &page(), &mut defaults));
        assert_eq!(doc.inner_html(body), "<p>Hello</p>");
        assert_eq!(doc.inner_html(side), "default side");

        render_content(&mut doc, body, &PageData::default(), &mut defaults);
        assert_eq!(doc.inner_html(body), "default body");
    }

    #[test]
    fn test_first_render_without_key_keeps_default_nodes() {
        let mut doc = Document::new();
        let mut defaults = DefaultContentCache::new();
        let area = bound(&mut doc, CONTENT_EDITOR_ATTR, "side", "<a href=\"/b\">b</a>");
        let link = doc.children(area)[0];
        let (_sub, mut rx) = doc.subscribe();

        assert!(render_content(&mut doc, area, &page(), &mut defaults));
        assert_eq!(doc.children(area), [link]);
        assert!(doc.is_connected(link));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_title() {
        let mut doc = Document::new();
        let mut defaults = DefaultContentCache::new();
        let node = bound(&mut doc, TITLE_ATTR, "", "Site");

        render_title(&mut doc, node, &page(), &mut defaults);
        assert_eq!(doc.text_content(node), "About");
        render_title(&mut doc, node, &PageData::default(), &mut defaults);
        assert_eq!(doc.inner_html(node), "Site");
    }

    #[test]
    fn test_template_visibility() {
        let mut doc = Document::new();
        let shown = bound(&mut doc, TEMPLATE_ATTR, "one || two", "");
        let hidden = bound(&mut doc, TEMPLATE_ATTR, "!two", "");
        apply_template(&mut doc, shown, &page());
        apply_template(&mut doc, hidden, &page());
        assert!(!doc.has_class(shown, HIDE_CLASS));
        assert!(doc.has_class(hidden, HIDE_CLASS));
    }

    #[test]
    fn test_onrender_skips_invalid_scripts() {
        let mut doc = Document::new();
        let ok = bound(&mut doc, ONRENDER_ATTR, "addClass(page.title == 'About' && 'about')", "");
        let bad = bound(&mut doc, ONRENDER_ATTR, "document.write('x'); addClass('y')", "");
        let value = json!({ "title": "About" });
        run_onrender(&mut doc, ok, &value);
        run_onrender(&mut doc, bad, &value);
        assert!(doc.has_class(ok, "about"));
        assert!(!doc.has_class(bad, "y"));
    }

    #[test]
    fn test_link_scopes() {
        let mut doc = Document::new();
        let container = bound(&mut doc, CONTENT_EDITOR_ATTR, "body", "");
        let link = doc.create_element("a");
        doc.append_child(container, link);

        let scopes = LinkScopes::default();
        assert_eq!(scopes.scope_of(&doc, link), None);
        scopes.bind(container);
        assert!(scopes.is_bound(container));
        assert_eq!(scopes.scope_of(&doc, link), Some(container));
    }
}
