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

//! Binding of one carousel to a [`Document`].

use super::document::{Document, DomEvent, DomEventKind, EventListener, ListenerId, NodeId, DATA_INDEX};
use super::selector::SelectorList;
use super::{DomCollaborator, Interaction, SelectorAction, SelectorType};
use crate::carousel::{Carousel, WeakCarousel};
use crate::config::{DomConfig, SelectorConfig, ACTIVE_CLASS, DEFAULT_NAV_ITEM_CLASS};
use crate::error::{CadenceError, CadenceResult};
use crate::hooks::{HookId, HookKind, HookPriority, RegisteredHook};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

type ButtonAction = for<'a> fn(&'a Carousel) -> &'a Carousel;

/// [`DomCollaborator`] over a shared headless [`Document`].
///
/// Several bindings may share one document; each only reacts to events whose
/// target falls under its own selectors.
pub struct DomBinding {
    document: Arc<Document>,
    apply_active_class: bool,
    apply_indexation: bool,
    selectors: RwLock<SelectorConfig>,
    /// Selectors whose n-th match carries the active class for index n.
    active_targets: RwLock<Vec<String>>,
    /// Generated navigations: container selector to item class.
    nav_items: RwLock<HashMap<String, String>>,
    interactions: RwLock<HashSet<Interaction>>,
    carousel: RwLock<Option<WeakCarousel>>,
    listener: Mutex<Option<ListenerId>>,
    sync_hook: Mutex<Option<HookId>>,
    this: Weak<DomBinding>,
}

impl std::fmt::Debug for DomBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomBinding")
            .field("document", &self.document.id())
            .field("selectors", &*self.selectors.read())
            .field("interactions", &*self.interactions.read())
            .finish_non_exhaustive()
    }
}

impl DomBinding {
    pub fn new(document: Arc<Document>, config: &DomConfig) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            document,
            apply_active_class: config.apply_active_class,
            apply_indexation: config.apply_indexation,
            selectors: RwLock::new(config.selectors.clone()),
            active_targets: RwLock::new(Vec::new()),
            nav_items: RwLock::new(HashMap::new()),
            interactions: RwLock::new(HashSet::new()),
            carousel: RwLock::new(None),
            listener: Mutex::new(None),
            sync_hook: Mutex::new(None),
            this: this.clone(),
        })
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    /// The live selector set, including buttons added after construction.
    pub fn selectors(&self) -> SelectorConfig {
        self.selectors.read().clone()
    }

    pub fn is_enabled(&self, interaction: Interaction) -> bool {
        self.interactions.read().contains(&interaction)
    }

    fn carousel(&self) -> Option<Carousel> {
        self.carousel.read().as_ref().and_then(WeakCarousel::upgrade)
    }

    fn children(&self) -> Vec<NodeId> {
        let selector = self.selectors.read().children.clone();
        if selector.is_empty() {
            return Vec::new();
        }
        self.query_or_warn(&selector)
    }

    fn query_or_warn(&self, selector: &str) -> Vec<NodeId> {
        match self.document.query_selector_all(selector) {
            Ok(nodes) => nodes,
            Err(err) => {
                tracing::warn!(selector, error = %err, "Selector query failed");
                Vec::new()
            }
        }
    }

    /// Put the active class on the `index`-th match of every target.
    fn sync_active(&self, index: usize) {
        let targets = self.active_targets.read().clone();
        for target in targets {
            for (position, node) in self.query_or_warn(&target).into_iter().enumerate() {
                let result = if position == index {
                    self.document.add_class(node, ACTIVE_CLASS)
                } else {
                    self.document.remove_class(node, ACTIVE_CLASS)
                };
                if let Err(err) = result {
                    tracing::debug!(%node, error = %err, "Active class not updated");
                }
            }
        }
    }

    fn current_index(&self) -> Option<usize> {
        self.carousel().map(|carousel| carousel.context().curr_index)
    }

    fn add_active_target(&self, selector: String) {
        let mut targets = self.active_targets.write();
        if !targets.contains(&selector) {
            targets.push(selector);
        }
    }

    fn closest(&self, node: NodeId, selector: &str) -> Option<NodeId> {
        if selector.is_empty() {
            return None;
        }
        self.document.closest(node, selector).ok().flatten()
    }

    /// `data-index` of the nav item under `target`, if any.
    fn nav_index(&self, target: NodeId) -> Option<usize> {
        let containers = self.selectors.read().index_nav.clone();
        containers.iter().find_map(|container| {
            let item = self.closest(target, &format!("{} [{}]", container, DATA_INDEX))?;
            self.document.data_index(item)
        })
    }

    fn on_click(&self, carousel: &Carousel, target: NodeId) {
        let selectors = self.selectors.read().clone();
        let buttons: [(&Vec<String>, ButtonAction); 4] = [
            (&selectors.play, Carousel::play),
            (&selectors.pause, Carousel::pause),
            (&selectors.next, Carousel::next),
            (&selectors.prev, Carousel::prev),
        ];
        for (list, command) in buttons {
            if !list.is_empty() && self.closest(target, &list.join(", ")).is_some() {
                command(carousel);
                return;
            }
        }

        if let Some(index) = self.nav_index(target) {
            carousel.jump_to_index(index);
            return;
        }

        if self.is_enabled(Interaction::ActivateOnItemClick) {
            if let Some(index) = self.containing_child(target) {
                carousel.jump_to_index(index);
            }
        }
    }

    fn on_hover(&self, carousel: &Carousel, target: NodeId, entering: bool) {
        let child = self.containing_child(target);

        if entering {
            if self.is_enabled(Interaction::IndexNavOnHover) {
                if let Some(index) = self.nav_index(target) {
                    carousel.jump_to_index(index);
                }
            }
            if self.is_enabled(Interaction::ActivateOnItemHover) {
                if let Some(index) = child {
                    carousel.jump_to_index(index);
                }
            }
        }

        if self.is_enabled(Interaction::PauseOnHover) && child.is_some() {
            if entering {
                carousel.pause_force();
            } else {
                carousel.pause_force_off();
            }
        }
    }
}

impl EventListener for DomBinding {
    fn handle_event(&self, _document: &Document, event: &DomEvent) {
        let Some(carousel) = self.carousel() else {
            return;
        };
        match event.kind {
            DomEventKind::Click => self.on_click(&carousel, event.target),
            DomEventKind::HoverStart => self.on_hover(&carousel, event.target, true),
            DomEventKind::HoverEnd => self.on_hover(&carousel, event.target, false),
        }
    }
}

impl DomCollaborator for DomBinding {
    fn measure(&self) -> Option<usize> {
        if self.selectors.read().children.is_empty() {
            return None;
        }
        Some(self.children().len())
    }

    fn attach(&self, carousel: &Carousel) -> CadenceResult<()> {
        *self.carousel.write() = Some(carousel.downgrade());

        let children = self.children();
        if self.apply_indexation {
            for (index, child) in children.iter().enumerate() {
                self.document.set_data_index(*child, index)?;
            }
        }
        if self.apply_active_class {
            let selector = self.selectors.read().children.clone();
            if !selector.is_empty() {
                self.add_active_target(selector);
            }
        }

        // Runs ahead of relation hooks so `dom` followers read the new active child.
        let binding = self.this.clone();
        let hook_id = carousel.hooks().add_hook(
            HookKind::OnIndexChange,
            RegisteredHook::observe(move |carousel: &Carousel| {
                if let Some(binding) = binding.upgrade() {
                    binding.sync_active(carousel.context().curr_index);
                }
            })
            .with_priority(HookPriority::HIGH)
            .with_description("sync active class"),
        );
        *self.sync_hook.lock() = Some(hook_id);
        self.sync_active(carousel.context().curr_index);

        let containers = self.selectors.read().index_nav.clone();
        for container in containers {
            if let Err(err) = self.create_index_nav(&container, DEFAULT_NAV_ITEM_CLASS) {
                tracing::warn!(instance = %carousel.id(), container, error = %err, "Index navigation not built");
            }
        }

        let listener: Weak<dyn EventListener> = self.this.clone();
        *self.listener.lock() = Some(self.document.add_listener(listener));

        tracing::debug!(
            instance = %carousel.id(),
            document = ?self.document.id(),
            children = children.len(),
            "DOM binding attached"
        );
        Ok(())
    }

    fn detach(&self, carousel: &Carousel) {
        if let Some(listener) = self.listener.lock().take() {
            self.document.remove_listener(listener);
        }
        if let Some(hook_id) = self.sync_hook.lock().take() {
            carousel.hooks().remove_hook(HookKind::OnIndexChange, hook_id);
        }
        *self.carousel.write() = None;
    }

    fn active_element(&self) -> Option<NodeId> {
        self.children()
            .into_iter()
            .find(|child| self.document.has_class(*child, ACTIVE_CLASS))
    }

    fn containing_child(&self, node: NodeId) -> Option<usize> {
        if node.document() != self.document.id() {
            return None;
        }
        let selector = self.selectors.read().children.clone();
        let child = self.closest(node, &selector)?;
        self.document
            .data_index(child)
            .or_else(|| self.children().iter().position(|c| *c == child))
    }

    fn update_selector(
        &self,
        kind: SelectorType,
        selector: &str,
        action: SelectorAction,
    ) -> CadenceResult<()> {
        SelectorList::parse(selector)?;

        let mut selectors = self.selectors.write();
        let list = match kind {
            SelectorType::Play => &mut selectors.play,
            SelectorType::Pause => &mut selectors.pause,
            SelectorType::Next => &mut selectors.next,
            SelectorType::Prev => &mut selectors.prev,
            SelectorType::IndexNav => &mut selectors.index_nav,
        };
        match action {
            SelectorAction::Add => {
                if !list.iter().any(|s| s == selector) {
                    list.push(selector.to_string());
                }
            }
            SelectorAction::Remove => list.retain(|s| s != selector),
        }
        Ok(())
    }

    fn create_index_nav(&self, container: &str, item_class: &str) -> CadenceResult<()> {
        let container_node = self.document.query_selector(container)?.ok_or_else(|| {
            CadenceError::Validation(format!("No nav container found for selector: {}", container))
        })?;

        let existing = self
            .document
            .query_selector_within(container_node, &format!("[{}]", DATA_INDEX))?;
        if !existing.is_empty() {
            tracing::debug!(container, "Index navigation already present");
            return Ok(());
        }

        let count = self.children().len();
        for index in 0..count {
            let item = self.document.append_element(container_node, "div", &[item_class])?;
            self.document.set_data_index(item, index)?;
        }

        self.nav_items
            .write()
            .insert(container.to_string(), item_class.to_string());
        self.add_active_target(format!("{} .{}", container, item_class));
        {
            let mut selectors = self.selectors.write();
            if !selectors.index_nav.iter().any(|s| s == container) {
                selectors.index_nav.push(container.to_string());
            }
        }
        if let Some(index) = self.current_index() {
            self.sync_active(index);
        }

        tracing::debug!(container, items = count, "Index navigation created");
        Ok(())
    }

    fn remove_index_nav(&self, container: &str) -> CadenceResult<()> {
        let container_node = self.document.query_selector(container)?.ok_or_else(|| {
            CadenceError::Validation(format!("No nav container found for selector: {}", container))
        })?;
        self.document.remove(container_node)?;

        if let Some(item_class) = self.nav_items.write().remove(container) {
            let target = format!("{} .{}", container, item_class);
            self.active_targets.write().retain(|t| *t != target);
        }
        self.selectors.write().index_nav.retain(|s| s != container);
        Ok(())
    }

    fn enable(&self, interaction: Interaction) -> CadenceResult<()> {
        if self.interactions.write().insert(interaction) {
            tracing::debug!(?interaction, "Interaction enabled");
        }
        Ok(())
    }
}
