//! HTML fragment parsing.
//!
//! Markup is parsed with html5ever into an `RcDom` and copied into the
//! document arena as detached nodes. The caller attaches them.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use crate::dom::document::Document;
use crate::dom::node::NodeId;

/// Parse `markup` as the content of a `<body>` element and return the new
/// top-level nodes in order.
pub fn parse_fragment(doc: &mut Document, markup: &str) -> Vec<NodeId> {
    if markup.is_empty() {
        return Vec::new();
    }
    let dom = parse_document(RcDom::default(), Default::default()).one(format!("<body>{markup}"));
    let Some(body) = find_body(&dom.document) else {
        tracing::warn!("Parsed markup has no body");
        return Vec::new();
    };
    let children = body.children.borrow();
    children.iter().filter_map(|child| convert(doc, child)).collect()
}

fn find_body(document: &Handle) -> Option<Handle> {
    let html = document
        .children
        .borrow()
        .iter()
        .find(|c| is_element(c, "html"))
        .cloned()?;
    let body = html.children.borrow().iter().find(|c| is_element(c, "body")).cloned();
    body
}

fn is_element(handle: &Handle, tag: &str) -> bool {
    matches!(&handle.data, RcNodeData::Element { name, .. } if &*name.local == tag)
}

fn convert(doc: &mut Document, handle: &Handle) -> Option<NodeId> {
    match &handle.data {
        RcNodeData::Text { contents } => Some(doc.create_text(&contents.borrow())),
        RcNodeData::Comment { contents } => Some(doc.create_comment(contents)),
        RcNodeData::Element { name, attrs, .. } => {
            let element = doc.create_element(&name.local);
            for attr in attrs.borrow().iter() {
                doc.set_attribute(element, &attr.name.local, &attr.value);
            }
            for child in handle.children.borrow().iter() {
                if let Some(node) = convert(doc, child) {
                    doc.append_child(element, node);
                }
            }
            Some(element)
        }
        RcNodeData::Document | RcNodeData::Doctype { .. } | RcNodeData::ProcessingInstruction { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_becomes_elements_and_text() {
        let mut doc = Document::new();
        let nodes = parse_fragment(&mut doc, r#"<a href="/b" class="x y">b</a> tail<!--c-->"#);
        assert_eq!(nodes.len(), 3);

        let anchor = nodes[0];
        assert_eq!(doc.tag(anchor), Some("a"));
        assert_eq!(doc.attribute(anchor, "href"), Some("/b"));
        assert!(doc.has_class(anchor, "y"));
        assert_eq!(doc.text_content(anchor), "b");
        assert!(!doc.is_connected(anchor));
        assert_eq!(doc.text_content(nodes[1]), " tail");
    }

    #[test]
    fn test_nested_and_unclosed_markup() {
        let mut doc = Document::new();
        let nodes = parse_fragment(&mut doc, "<div><p>one<p>two</div>");
        assert_eq!(nodes.len(), 1);
        let paragraphs: Vec<_> = doc.children(nodes[0]).to_vec();
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(doc.text_content(paragraphs[1]), "two");
    }

    #[test]
    fn test_empty_markup() {
        let mut doc = Document::new();
        assert!(parse_fragment(&mut doc, "").is_empty());
    }
}
