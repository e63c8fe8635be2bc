//! Live render engine.
//!
//! # Responsibilities
//! - Keep a set of (selector, action) triggers applied to the document
//! - Run each action once per matching node per activation window
//! - Re-run reconciliation whenever the document reports a mutation
//!
//! # Design Decisions
//! - One activation window at a time; triggers registered while it is open
//!   join it and share its close
//! - The window closes on a zero-delay task, so everything registered in the
//!   same synchronous run lands in one window
//! - Actions borrow the document mutably and must not register triggers;
//!   completion callbacks run with nothing borrowed and may
//! - Must run inside a `tokio::task::LocalSet`

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tokio::sync::oneshot;

use crate::dom::{Document, NodeId, SelectorError, SelectorList, SubscriptionId};
use crate::observability::metrics;

/// Class prefix marking nodes already handled by a marker-mode trigger.
pub const RENDERED_CLASS_PREFIX: &str = "jshcms_rendered_";

pub type Action = Box<dyn FnMut(&mut Document, NodeId)>;
pub type Completion = Box<dyn FnOnce()>;
pub type Producer = Box<dyn Fn(&Document) -> Vec<NodeId>>;

/// Which nodes a trigger applies to.
pub enum Selector {
    /// CSS query over connected nodes.
    Query(SelectorList),
    /// Function producing the node list.
    Producer(Producer),
    /// Matches nothing; used for completion barriers.
    None,
}

impl Selector {
    /// Parse a CSS selector. An empty string selects nothing.
    pub fn query(css: &str) -> Result<Self, SelectorError> {
        if css.trim().is_empty() {
            return Ok(Selector::None);
        }
        SelectorList::parse(css).map(Selector::Query)
    }

    pub fn producer(f: impl Fn(&Document) -> Vec<NodeId> + 'static) -> Self {
        Selector::Producer(Box::new(f))
    }

    /// Selector yielding `<head>`.
    pub fn head() -> Self {
        Self::producer(|doc| vec![doc.head()])
    }

    /// Selector yielding `<body>`.
    pub fn body() -> Self {
        Self::producer(|doc| vec![doc.body()])
    }

    /// Descendants of `scope` matching `list`.
    pub fn within(scope: NodeId, list: SelectorList) -> Self {
        Self::producer(move |doc| doc.select_within(scope, &list))
    }

    fn nodes(&self, doc: &Document) -> Option<Vec<NodeId>> {
        match self {
            Selector::Query(list) => Some(doc.select(list)),
            Selector::Producer(f) => Some(f(doc)),
            Selector::None => None,
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Query(list) => f.debug_tuple("Query").field(list).finish(),
            Selector::Producer(_) => f.write_str("Producer"),
            Selector::None => f.write_str("None"),
        }
    }
}

/// How repeated matches of the same node are suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dedup {
    /// Node identity against the previous pass plus a per-trigger marker class.
    Marker,
    /// Node identity against the previous pass only.
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerId(u64);

impl TriggerId {
    pub fn marker_class(self) -> String {
        format!("{}{}", RENDERED_CLASS_PREFIX, self.0)
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Trigger {
    id: TriggerId,
    selector: Selector,
    action: Action,
    last_nodes: Vec<NodeId>,
    on_complete: Option<Completion>,
    dedup: Dedup,
}

#[derive(Default)]
struct Registry {
    active: bool,
    triggers: Vec<Rc<RefCell<Trigger>>>,
    next_id: u64,
    subscription: Option<SubscriptionId>,
}

/// Reconciliation engine bound to one document. Cheap to clone.
#[derive(Clone)]
pub struct LiveRenderEngine {
    document: Rc<RefCell<Document>>,
    registry: Rc<RefCell<Registry>>,
}

impl fmt::Debug for LiveRenderEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("LiveRenderEngine")
            .field("active", &registry.active)
            .field("triggers", &registry.triggers.len())
            .finish()
    }
}

impl LiveRenderEngine {
    pub fn new(document: Rc<RefCell<Document>>) -> Self {
        Self {
            document,
            registry: Rc::new(RefCell::new(Registry {
                next_id: 1,
                ..Default::default()
            })),
        }
    }

    pub fn document(&self) -> &Rc<RefCell<Document>> {
        &self.document
    }

    /// Whether an activation window is open.
    pub fn is_active(&self) -> bool {
        self.registry.borrow().active
    }

    pub fn trigger_count(&self) -> usize {
        self.registry.borrow().triggers.len()
    }

    /// Register a trigger without a completion callback.
    pub fn register(
        &self,
        selector: Selector,
        dedup: Dedup,
        action: impl FnMut(&mut Document, NodeId) + 'static,
    ) -> TriggerId {
        self.register_inner(selector, dedup, Box::new(action), None)
    }

    /// Register a trigger whose `on_complete` runs when its window closes.
    pub fn register_with_completion(
        &self,
        selector: Selector,
        dedup: Dedup,
        action: impl FnMut(&mut Document, NodeId) + 'static,
        on_complete: impl FnOnce() + 'static,
    ) -> TriggerId {
        self.register_inner(selector, dedup, Box::new(action), Some(Box::new(on_complete)))
    }

    /// Resolves once the current (or a newly opened) window has closed.
    pub fn when_complete(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.register_with_completion(Selector::None, Dedup::List, |_, _| {}, move || {
            let _ = tx.send(());
        });
        rx
    }

    fn register_inner(
        &self,
        selector: Selector,
        dedup: Dedup,
        action: Action,
        on_complete: Option<Completion>,
    ) -> TriggerId {
        let (trigger, opens_window) = {
            let mut registry = self.registry.borrow_mut();
            let id = TriggerId(registry.next_id);
            registry.next_id += 1;
            let trigger = Rc::new(RefCell::new(Trigger {
                id,
                selector,
                action,
                last_nodes: Vec::new(),
                on_complete,
                dedup,
            }));
            registry.triggers.push(trigger.clone());
            let opens_window = !registry.active;
            registry.active = true;
            (trigger, opens_window)
        };

        let id = trigger.borrow().id;
        self.refresh(&trigger);

        if opens_window {
            self.open_window();
        }
        id
    }

    fn open_window(&self) {
        let (subscription, mut events) = self.document.borrow_mut().subscribe();
        self.registry.borrow_mut().subscription = Some(subscription);
        tracing::trace!("Live render window opened");

        let listener = self.clone();
        tokio::task::spawn_local(async move {
            while events.recv().await.is_some() {
                while events.try_recv().is_ok() {}
                listener.refresh_all();
            }
        });

        let closer = self.clone();
        tokio::task::spawn_local(async move {
            tokio::task::yield_now().await;
            closer.close_window();
        });
    }

    fn close_window(&self) {
        let subscription = self.registry.borrow_mut().subscription.take();
        if let Some(subscription) = subscription {
            self.document.borrow_mut().unsubscribe(subscription);
        }

        self.refresh_all();

        let triggers = {
            let mut registry = self.registry.borrow_mut();
            registry.active = false;
            std::mem::take(&mut registry.triggers)
        };

        let mut completions = Vec::new();
        let mut markers = Vec::new();
        for trigger in &triggers {
            let mut trigger = trigger.borrow_mut();
            if let Some(on_complete) = trigger.on_complete.take() {
                completions.push(on_complete);
            }
            if trigger.dedup == Dedup::Marker {
                markers.push(trigger.id.marker_class());
            }
        }
        drop(triggers);
        tracing::trace!(completions = completions.len(), "Live render window closed");

        for on_complete in completions {
            on_complete();
        }

        let mut doc = self.document.borrow_mut();
        for node in doc.descendants(doc.root()) {
            for marker in &markers {
                doc.remove_class(node, marker);
            }
        }
    }

    /// Reconcile every trigger of the open window, in registration order.
    pub fn refresh_all(&self) {
        let triggers = {
            let registry = self.registry.borrow();
            if !registry.active {
                return;
            }
            registry.triggers.clone()
        };
        for trigger in &triggers {
            self.refresh(trigger);
        }
        metrics::record_live_render_pass(triggers.len());
    }

    fn refresh(&self, trigger: &Rc<RefCell<Trigger>>) {
        let mut trigger = trigger.borrow_mut();
        let mut doc = self.document.borrow_mut();

        let Some(current) = trigger.selector.nodes(&doc) else {
            return;
        };
        let fresh: Vec<NodeId> = current
            .iter()
            .filter(|node| !trigger.last_nodes.contains(*node))
            .copied()
            .collect();
        trigger.last_nodes = current;

        let marker = match trigger.dedup {
            Dedup::Marker => Some(trigger.id.marker_class()),
            Dedup::List => None,
        };
        for node in fresh {
            if let Some(marker) = &marker {
                if doc.has_class(node, marker) {
                    continue;
                }
                doc.add_class(node, marker);
            }
            (trigger.action)(&mut doc, node);
        }
    }
}
