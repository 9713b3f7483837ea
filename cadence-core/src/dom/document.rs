// Copyright 2025 Cadence Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Headless document tree with event dispatch.
//!
//! Elements live in an arena owned by the document. Removed subtrees stay in
//! the arena but are unreachable from the root, so queries never see them.

use super::selector::SelectorList;
use super::DomError;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Attribute carrying an element's position among its siblings.
pub const DATA_INDEX: &str = "data-index";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        DocumentId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handle to an element of a specific document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    document: DocumentId,
    index: usize,
}

impl NodeId {
    pub fn document(&self) -> DocumentId {
        self.document
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc{}:node{}", self.document.0, self.index)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag: String,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attributes: BTreeMap<String, String>,
    pub(crate) parent: Option<usize>,
    pub(crate) children: Vec<usize>,
}

impl Element {
    pub(crate) fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            id: None,
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub(crate) fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Kinds of user interaction a document can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomEventKind {
    Click,
    /// Pointer entered the target.
    HoverStart,
    /// Pointer left the target.
    HoverEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomEvent {
    pub kind: DomEventKind,
    pub target: NodeId,
}

impl DomEvent {
    pub fn click(target: NodeId) -> Self {
        Self { kind: DomEventKind::Click, target }
    }

    pub fn hover_start(target: NodeId) -> Self {
        Self { kind: DomEventKind::HoverStart, target }
    }

    pub fn hover_end(target: NodeId) -> Self {
        Self { kind: DomEventKind::HoverEnd, target }
    }
}

/// Receiver of document events.
pub trait EventListener: Send + Sync {
    fn handle_event(&self, document: &Document, event: &DomEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// An element tree shared by every carousel bound to it.
pub struct Document {
    id: DocumentId,
    elements: RwLock<Vec<Element>>,
    listeners: Mutex<Vec<(ListenerId, Weak<dyn EventListener>)>>,
    next_listener: AtomicU64,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("elements", &self.elements.read().len())
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}

impl Document {
    /// A document holding only an `html` root element.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: DocumentId::next(),
            elements: RwLock::new(vec![Element::new("html")]),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        })
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn root(&self) -> NodeId {
        self.node(0)
    }

    fn node(&self, index: usize) -> NodeId {
        NodeId { document: self.id, index }
    }

    fn index_of(&self, node: NodeId, elements: &[Element]) -> Result<usize, DomError> {
        if node.document != self.id {
            return Err(DomError::ForeignNode(node.to_string()));
        }
        if node.index >= elements.len() {
            return Err(DomError::NodeNotFound(node.to_string()));
        }
        Ok(node.index)
    }

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> NodeId {
        let mut elements = self.elements.write();
        elements.push(Element::new(tag));
        self.node(elements.len() - 1)
    }

    /// Append `child` to `parent`, moving it out of its current parent.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let mut elements = self.elements.write();
        let parent_idx = self.index_of(parent, &elements)?;
        let child_idx = self.index_of(child, &elements)?;

        let mut cursor = Some(parent_idx);
        while let Some(idx) = cursor {
            if idx == child_idx {
                return Err(DomError::HierarchyRequest(format!(
                    "{} is an ancestor of {}",
                    child, parent
                )));
            }
            cursor = elements[idx].parent;
        }

        if let Some(old_parent) = elements[child_idx].parent.take() {
            elements[old_parent].children.retain(|&c| c != child_idx);
        }
        elements[child_idx].parent = Some(parent_idx);
        elements[parent_idx].children.push(child_idx);
        Ok(())
    }

    /// Create an element with classes and append it to `parent`.
    pub fn append_element(
        &self,
        parent: NodeId,
        tag: &str,
        classes: &[&str],
    ) -> Result<NodeId, DomError> {
        let node = self.create_element(tag);
        for class in classes {
            self.add_class(node, class)?;
        }
        self.append_child(parent, node)?;
        Ok(node)
    }

    /// Detach `node` and its subtree from the tree.
    pub fn remove(&self, node: NodeId) -> Result<(), DomError> {
        let mut elements = self.elements.write();
        let idx = self.index_of(node, &elements)?;
        if idx == 0 {
            return Err(DomError::HierarchyRequest("cannot remove the root".to_string()));
        }
        if let Some(parent) = elements[idx].parent.take() {
            elements[parent].children.retain(|&c| c != idx);
        }
        Ok(())
    }

    pub fn set_id(&self, node: NodeId, id: &str) -> Result<(), DomError> {
        let mut elements = self.elements.write();
        let idx = self.index_of(node, &elements)?;
        elements[idx].id = Some(id.to_string());
        Ok(())
    }

    pub fn add_class(&self, node: NodeId, class: &str) -> Result<(), DomError> {
        let mut elements = self.elements.write();
        let idx = self.index_of(node, &elements)?;
        if !elements[idx].has_class(class) {
            elements[idx].classes.push(class.to_string());
        }
        Ok(())
    }

    pub fn remove_class(&self, node: NodeId, class: &str) -> Result<(), DomError> {
        let mut elements = self.elements.write();
        let idx = self.index_of(node, &elements)?;
        elements[idx].classes.retain(|c| c != class);
        Ok(())
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        let elements = self.elements.read();
        self.index_of(node, &elements)
            .map(|idx| elements[idx].has_class(class))
            .unwrap_or(false)
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let mut elements = self.elements.write();
        let idx = self.index_of(node, &elements)?;
        elements[idx]
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let elements = self.elements.read();
        let idx = self.index_of(node, &elements).ok()?;
        elements[idx].attributes.get(name).cloned()
    }

    pub fn set_data_index(&self, node: NodeId, index: usize) -> Result<(), DomError> {
        self.set_attribute(node, DATA_INDEX, &index.to_string())
    }

    /// The element's `data-index`, if present and numeric.
    pub fn data_index(&self, node: NodeId) -> Option<usize> {
        self.attribute(node, DATA_INDEX)?.parse().ok()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        let elements = self.elements.read();
        let idx = self.index_of(node, &elements).ok()?;
        elements[idx].parent.map(|p| self.node(p))
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        let elements = self.elements.read();
        match self.index_of(node, &elements) {
            Ok(idx) => elements[idx].children.iter().map(|&c| self.node(c)).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Attached elements matching `selector`, in document order.
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, DomError> {
        self.query_within(0, selector, true)
    }

    /// First attached element matching `selector`.
    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, DomError> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    /// Descendants of `scope` matching `selector`, in document order.
    pub fn query_selector_within(
        &self,
        scope: NodeId,
        selector: &str,
    ) -> Result<Vec<NodeId>, DomError> {
        let idx = self.index_of(scope, &self.elements.read())?;
        self.query_within(idx, selector, false)
    }

    fn query_within(
        &self,
        scope: usize,
        selector: &str,
        include_scope: bool,
    ) -> Result<Vec<NodeId>, DomError> {
        let list = SelectorList::parse(selector)?;
        let elements = self.elements.read();

        let mut found = Vec::new();
        let mut stack = vec![scope];
        while let Some(idx) = stack.pop() {
            if (include_scope || idx != scope) && list.matches(&elements, idx) {
                found.push(self.node(idx));
            }
            stack.extend(elements[idx].children.iter().rev());
        }
        Ok(found)
    }

    pub fn matches(&self, node: NodeId, selector: &str) -> Result<bool, DomError> {
        let list = SelectorList::parse(selector)?;
        let elements = self.elements.read();
        let idx = self.index_of(node, &elements)?;
        Ok(list.matches(&elements, idx))
    }

    /// Nearest inclusive ancestor of `node` matching `selector`.
    pub fn closest(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
        let list = SelectorList::parse(selector)?;
        let elements = self.elements.read();
        let mut cursor = Some(self.index_of(node, &elements)?);
        while let Some(idx) = cursor {
            if list.matches(&elements, idx) {
                return Ok(Some(self.node(idx)));
            }
            cursor = elements[idx].parent;
        }
        Ok(None)
    }

    pub fn add_listener(&self, listener: Weak<dyn EventListener>) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Deliver `event` to every live listener.
    pub fn dispatch(&self, event: DomEvent) -> Result<(), DomError> {
        self.index_of(event.target, &self.elements.read())?;

        let live: Vec<Arc<dyn EventListener>> = {
            let mut listeners = self.listeners.lock();
            listeners.retain(|(_, listener)| listener.strong_count() > 0);
            listeners
                .iter()
                .filter_map(|(_, listener)| listener.upgrade())
                .collect()
        };

        tracing::trace!(target_node = %event.target, kind = ?event.kind, listeners = live.len(), "Dispatching event");
        for listener in live {
            listener.handle_event(self, &event);
        }
        Ok(())
    }
}
