//! Live render engine behaviour under document mutation.

use std::cell::RefCell;
use std::rc::Rc;

use cms_router::dom::NodeId;
use cms_router::render::live::{Dedup, LiveRenderEngine, Selector};
use cms_router::render::{PageRenderer, RenderOptions};
use cms_router::{DefaultHooks, Document, HeadlessHost, PageData};
use tokio::task::LocalSet;
use url::Url;

fn item(doc: &mut Document) -> NodeId {
    let node = doc.create_element("div");
    doc.set_attribute(node, "class", "item");
    let body = doc.body();
    doc.append_child(body, node);
    node
}

#[tokio::test]
async fn test_overlapping_triggers_act_once_per_node() {
    LocalSet::new()
        .run_until(async {
            let document = Rc::new(RefCell::new(Document::new()));
            let first = item(&mut document.borrow_mut());
            let engine = LiveRenderEngine::new(document.clone());

            let marked = Rc::new(RefCell::new(Vec::new()));
            let listed = Rc::new(RefCell::new(Vec::new()));

            let seen = marked.clone();
            engine.register(Selector::query(".item").unwrap(), Dedup::Marker, move |doc, node| {
                seen.borrow_mut().push(node);
                if node == first {
                    item(doc);
                }
            });
            let seen = listed.clone();
            engine.register(Selector::query(".item").unwrap(), Dedup::List, move |_, node| {
                seen.borrow_mut().push(node);
            });
            assert!(engine.is_active());

            engine.when_complete().await.unwrap();

            assert!(!engine.is_active());
            assert_eq!(engine.trigger_count(), 0);
            let marked = marked.borrow().clone();
            let listed = listed.borrow().clone();
            assert_eq!(marked.len(), 2);
            assert_eq!(marked, listed);

            let doc = document.borrow();
            for node in doc.query_selector_all(".item").unwrap() {
                assert_eq!(doc.classes(node), vec!["item".to_string()]);
            }
        })
        .await;
}

#[tokio::test]
async fn test_render_element_limited_to_subtree() {
    LocalSet::new()
        .run_until(async {
            let mut doc = Document::new();
            let body = doc.body();
            let outside = doc.create_element("div");
            doc.set_attribute(outside, "cms-content-editor", "body");
            doc.set_text_content(outside, "outside");
            doc.append_child(body, outside);

            let section = doc.create_element("section");
            doc.append_child(body, section);
            let side = doc.create_element("div");
            doc.set_attribute(side, "cms-component-content", "side");
            doc.append_child(section, side);
            let flagged = doc.create_element("div");
            doc.set_attribute(flagged, "cms-onrender", "addClass('ready')");
            doc.append_child(section, flagged);

            let document = Rc::new(RefCell::new(doc));
            let engine = LiveRenderEngine::new(document.clone());
            let host = Rc::new(HeadlessHost::new(Url::parse("https://site.test/").unwrap()));
            let renderer = PageRenderer::new(engine, host, Rc::new(DefaultHooks), None);

            let mut page = PageData::default();
            page.content.insert("side".to_string(), "<b>side</b>".to_string());
            page.content.insert("body".to_string(), "<b>body</b>".to_string());

            renderer
                .render_element(section, &page, RenderOptions { bind_links: false })
                .await;

            let doc = document.borrow();
            assert_eq!(doc.inner_html(side), "<b>side</b>");
            assert_eq!(doc.inner_html(outside), "outside");
            assert!(doc.has_class(flagged, "ready"));
            assert!(!renderer.link_scopes().is_bound(side));
        })
        .await;
}
