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

//! Hook registry holding the ordered callback slots.

use super::handlers::{HookError, HookFn};
use super::kind::HookKind;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Priority level for hook execution.
/// Higher values execute first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HookPriority(pub i32);

impl Default for HookPriority {
    fn default() -> Self {
        HookPriority::NORMAL
    }
}

impl HookPriority {
    /// Highest priority (executes first).
    pub const HIGHEST: HookPriority = HookPriority(i32::MAX);
    /// High priority.
    pub const HIGH: HookPriority = HookPriority(50);
    /// Normal priority, used when none is given.
    pub const NORMAL: HookPriority = HookPriority(10);
    /// Low priority.
    pub const LOW: HookPriority = HookPriority(1);
    /// Lowest priority (executes last).
    pub const LOWEST: HookPriority = HookPriority(i32::MIN);
}

/// Identifier of a hook registration, used to remove it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(u64);

impl HookId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        HookId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hook-{}", self.0)
    }
}

/// A hook with its handler and metadata.
pub struct RegisteredHook<T> {
    id: HookId,
    handler: HookFn<T>,
    priority: HookPriority,
    description: Option<String>,
}

impl<T> RegisteredHook<T> {
    /// Create a new hook from a fallible callback.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&T) -> Result<(), HookError> + Send + Sync + 'static,
    {
        Self {
            id: HookId::next(),
            handler: Arc::new(handler),
            priority: HookPriority::default(),
            description: None,
        }
    }

    /// Create a hook whose callback knows its own id, e.g. to unregister
    /// itself.
    pub fn new_cyclic<F>(make: impl FnOnce(HookId) -> F) -> Self
    where
        F: Fn(&T) -> Result<(), HookError> + Send + Sync + 'static,
    {
        let id = HookId::next();
        Self {
            id,
            handler: Arc::new(make(id)),
            priority: HookPriority::default(),
            description: None,
        }
    }

    /// Create a new hook from a callback that cannot fail.
    pub fn observe<F>(handler: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self::new(move |subject| {
            handler(subject);
            Ok(())
        })
    }

    /// Set the priority for this hook.
    pub fn with_priority(mut self, priority: HookPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the description for this hook.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn id(&self) -> HookId {
        self.id
    }

    pub fn priority(&self) -> HookPriority {
        self.priority
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

// Manual impls: the subject type itself need not be Clone or Debug.
impl<T> Clone for RegisteredHook<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: Arc::clone(&self.handler),
            priority: self.priority,
            description: self.description.clone(),
        }
    }
}

impl<T> fmt::Debug for RegisteredHook<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredHook")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Registry of hook slots.
///
/// Each slot is kept sorted by descending priority; equal priorities keep
/// insertion order. Dispatch works on a snapshot of the slot, so callbacks
/// may add or remove hooks without deadlocking; such changes apply from the
/// next dispatch on.
pub struct HookRegistry<T> {
    slots: RwLock<HashMap<HookKind, Vec<RegisteredHook<T>>>>,
}

impl<T> Default for HookRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HookRegistry<T> {
    /// Create a registry with an empty slot for every hook kind.
    pub fn new() -> Self {
        let slots = HookKind::ALL
            .iter()
            .map(|kind| (*kind, Vec::new()))
            .collect();
        Self {
            slots: RwLock::new(slots),
        }
    }

    /// Register a hook on a slot and return its id.
    pub fn add_hook(&self, kind: HookKind, hook: RegisteredHook<T>) -> HookId {
        let id = hook.id;
        let mut slots = self.slots.write();
        let slot = slots.entry(kind).or_default();
        // Insert after every entry of equal or higher priority.
        let position = slot
            .iter()
            .position(|existing| existing.priority < hook.priority)
            .unwrap_or(slot.len());
        slot.insert(position, hook);

        tracing::trace!(hook = %kind, hook_id = %id, position, "Hook registered");
        id
    }

    /// Remove the first hook with the given id from a slot.
    ///
    /// Returns `false` if the hook was not registered there.
    pub fn remove_hook(&self, kind: HookKind, id: HookId) -> bool {
        let mut slots = self.slots.write();
        let Some(slot) = slots.get_mut(&kind) else {
            return false;
        };
        match slot.iter().position(|hook| hook.id == id) {
            Some(position) => {
                slot.remove(position);
                tracing::trace!(hook = %kind, hook_id = %id, "Hook removed");
                true
            }
            None => false,
        }
    }

    /// Run every hook of a slot against `subject`.
    ///
    /// Stops at the first failing hook and returns its error.
    pub fn run_hooks(&self, kind: HookKind, subject: &T) -> Result<(), HookError> {
        let hooks = self.hooks_for(kind);
        if hooks.is_empty() {
            return Ok(());
        }

        tracing::trace!(hook = %kind, hook_count = hooks.len(), "Running hooks");

        for hook in hooks {
            if let Err(err) = (hook.handler)(subject) {
                tracing::debug!(
                    hook = %kind,
                    hook_id = %hook.id,
                    error = %err,
                    "Hook failed, aborting dispatch"
                );
                return Err(err);
            }
        }
        Ok(())
    }

    /// Snapshot of a slot in execution order.
    pub fn hooks_for(&self, kind: HookKind) -> Vec<RegisteredHook<T>> {
        self.slots.read().get(&kind).cloned().unwrap_or_default()
    }

    /// Number of hooks on a slot.
    pub fn hook_count(&self, kind: HookKind) -> usize {
        self.slots.read().get(&kind).map_or(0, Vec::len)
    }

    /// Number of hooks across every slot.
    pub fn total_hooks(&self) -> usize {
        self.slots.read().values().map(Vec::len).sum()
    }

    /// Clear every slot.
    pub fn remove_all_hooks(&self) {
        for slot in self.slots.write().values_mut() {
            slot.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    type Log = Mutex<Vec<&'static str>>;

    fn recorder(label: &'static str) -> RegisteredHook<Log> {
        RegisteredHook::observe(move |log: &Log| log.lock().push(label))
    }

    #[test]
    fn test_priority_ordering() {
        let registry = HookRegistry::new();
        registry.add_hook(HookKind::OnPlay, recorder("p5").with_priority(HookPriority(5)));
        registry.add_hook(HookKind::OnPlay, recorder("p10").with_priority(HookPriority(10)));
        registry.add_hook(HookKind::OnPlay, recorder("p1").with_priority(HookPriority(1)));

        let log = Log::default();
        registry.run_hooks(HookKind::OnPlay, &log).unwrap();
        assert_eq!(log.lock().as_slice(), &["p10", "p5", "p1"]);
    }

    #[test]
    fn test_equal_priority_keeps_insertion_order() {
        let registry = HookRegistry::new();
        registry.add_hook(HookKind::OnPause, recorder("first"));
        registry.add_hook(HookKind::OnPause, recorder("high").with_priority(HookPriority::HIGH));
        registry.add_hook(HookKind::OnPause, recorder("second"));
        registry.add_hook(HookKind::OnPause, recorder("third"));

        let log = Log::default();
        registry.run_hooks(HookKind::OnPause, &log).unwrap();
        assert_eq!(log.lock().as_slice(), &["high", "first", "second", "third"]);
    }

    #[test]
    fn test_failing_hook_aborts_dispatch() {
        let registry = HookRegistry::new();
        registry.add_hook(HookKind::OnNext, recorder("before"));
        registry.add_hook(
            HookKind::OnNext,
            RegisteredHook::new(|_: &Log| Err(HookError::failed("misbehaving"))),
        );
        registry.add_hook(HookKind::OnNext, recorder("after"));

        let log = Log::default();
        let err = registry.run_hooks(HookKind::OnNext, &log).unwrap_err();
        assert!(matches!(err, HookError::Failed(msg) if msg == "misbehaving"));
        assert_eq!(log.lock().as_slice(), &["before"]);
    }

    #[test]
    fn test_remove_hook() {
        let registry = HookRegistry::new();
        let hook = recorder("gone");
        let id = registry.add_hook(HookKind::OnIteration, hook);
        registry.add_hook(HookKind::OnIteration, recorder("kept"));

        assert!(registry.remove_hook(HookKind::OnIteration, id));
        assert!(!registry.remove_hook(HookKind::OnIteration, id));
        // Wrong slot is a no-op.
        assert!(!registry.remove_hook(HookKind::OnPlay, id));

        let log = Log::default();
        registry.run_hooks(HookKind::OnIteration, &log).unwrap();
        assert_eq!(log.lock().as_slice(), &["kept"]);
    }

    #[test]
    fn test_remove_hook_removes_first_match_only() {
        let registry = HookRegistry::new();
        let hook = recorder("twice");
        let id = registry.add_hook(HookKind::OnPrev, hook.clone());
        registry.add_hook(HookKind::OnPrev, hook);
        assert_eq!(registry.hook_count(HookKind::OnPrev), 2);

        registry.remove_hook(HookKind::OnPrev, id);
        assert_eq!(registry.hook_count(HookKind::OnPrev), 1);
    }

    #[test]
    fn test_hooks_added_during_dispatch_run_next_time() {
        let registry: Arc<HookRegistry<Log>> = Arc::new(HookRegistry::new());
        let inner = Arc::clone(&registry);
        registry.add_hook(
            HookKind::AfterInit,
            RegisteredHook::observe(move |log: &Log| {
                log.lock().push("outer");
                inner.add_hook(HookKind::AfterInit, recorder("late"));
            }),
        );

        let log = Log::default();
        registry.run_hooks(HookKind::AfterInit, &log).unwrap();
        assert_eq!(log.lock().as_slice(), &["outer"]);

        registry.run_hooks(HookKind::AfterInit, &log).unwrap();
        assert_eq!(log.lock().as_slice(), &["outer", "outer", "late"]);
    }

    #[test]
    fn test_hook_can_remove_itself() {
        let registry: Arc<HookRegistry<Log>> = Arc::new(HookRegistry::new());
        let inner = Arc::clone(&registry);
        let hook = RegisteredHook::new_cyclic(move |own_id| {
            move |log: &Log| {
                log.lock().push("once");
                inner.remove_hook(HookKind::OnPlay, own_id);
                Ok(())
            }
        });
        let id = hook.id();
        assert_eq!(registry.add_hook(HookKind::OnPlay, hook), id);

        let log = Log::default();
        registry.run_hooks(HookKind::OnPlay, &log).unwrap();
        registry.run_hooks(HookKind::OnPlay, &log).unwrap();
        assert_eq!(log.lock().as_slice(), &["once"]);
        assert_eq!(registry.hook_count(HookKind::OnPlay), 0);
    }

    #[test]
    fn test_remove_all_hooks() {
        let registry = HookRegistry::new();
        registry.add_hook(HookKind::BeforeInit, recorder("a"));
        registry.add_hook(HookKind::OnIndexChange, recorder("b"));
        assert_eq!(registry.total_hooks(), 2);

        registry.remove_all_hooks();
        assert_eq!(registry.total_hooks(), 0);
        assert_eq!(registry.hook_count(HookKind::OnIndexChange), 0);
    }
}
