//! Default content snapshots of bound elements.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::dom::{Document, NodeId};

/// Markup an element carried before the first page was rendered into it.
///
/// Entries are never replaced or evicted. Node ids are not reused by the
/// document, so a detached node can never hand its snapshot to a new one.
#[derive(Debug, Default)]
pub struct DefaultContentCache {
    entries: HashMap<NodeId, String>,
}

impl DefaultContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: NodeId) -> Option<&str> {
        self.entries.get(&node).map(String::as_str)
    }

    /// Snapshot taken by an earlier call for `node`. The first call stores
    /// the current markup and returns `None`, leaving the element untouched
    /// for the caller.
    pub fn restore_point(&mut self, doc: &Document, node: NodeId) -> Option<&str> {
        match self.entries.entry(node) {
            Entry::Occupied(entry) => Some(entry.into_mut().as_str()),
            Entry::Vacant(entry) => {
                entry.insert(doc.inner_html(node));
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_taken_once() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.set_inner_html(div, "<b>default</b>");

        let mut cache = DefaultContentCache::new();
        assert_eq!(cache.restore_point(&doc, div), None);

        doc.set_inner_html(div, "page content");
        assert_eq!(cache.restore_point(&doc, div), Some("<b>default</b>"));
        assert_eq!(cache.get(div), Some("<b>default</b>"));
        assert_eq!(cache.len(), 1);
    }
}
