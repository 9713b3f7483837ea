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

//! The carousel instance and its chainable command surface.
//!
//! Every public command returns `&Carousel` so calls can be chained. Critical
//! commands (`init`, hook and relation management) run before the call
//! returns; everything else goes through the instance's [`CommandQueue`] and
//! runs in order on the tokio runtime captured at construction.
//!
//! Failures never surface through the chain. Reported errors (unknown names,
//! validation, out-of-range jumps) are logged as warnings and the command is
//! a no-op; hook failures are logged as errors. Use
//! [`Carousel::execute_now`] to observe a command's result directly.

use crate::config::{CarouselConfig, RelationRecord};
use crate::context::IndexContext;
use crate::dom::{DomBinding, DomCollaborator, Document, Interaction, SelectorAction, SelectorType};
use crate::error::{CadenceError, CadenceResult};
use crate::hooks::{HookError, HookId, HookKind, HookRegistry, RegisteredHook};
use crate::iteration::{install_default_hooks, IndexStateMachine};
use crate::queue::{Command, CommandQueue, Dispatch, Operation};
use crate::relations::{RelationGraph, RelationKind};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use uuid::Uuid;

/// Unique identity of a carousel instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(Uuid);

impl InstanceId {
    pub fn new() -> Self {
        InstanceId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct CarouselInner {
    id: InstanceId,
    config: RwLock<CarouselConfig>,
    hooks: HookRegistry<Carousel>,
    machine: IndexStateMachine,
    relations: RelationGraph,
    queue: CommandQueue,
    dom: Option<Arc<dyn DomCollaborator>>,
    runtime: Handle,
    /// Held across a command or a timer tick, state change and hooks alike.
    dispatch: ReentrantMutex<()>,
    initialized: AtomicBool,
    destroyed: AtomicBool,
}

/// A cheaply cloneable handle to one carousel instance.
#[derive(Clone)]
pub struct Carousel {
    inner: Arc<CarouselInner>,
}

/// Non-owning handle, held by timers, relation hooks and DOM listeners.
#[derive(Clone)]
pub(crate) struct WeakCarousel(Weak<CarouselInner>);

impl WeakCarousel {
    pub(crate) fn upgrade(&self) -> Option<Carousel> {
        self.0.upgrade().map(|inner| Carousel { inner })
    }
}

impl fmt::Debug for Carousel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Carousel")
            .field("id", &self.inner.id)
            .field("context", &self.context())
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Carousel`].
#[derive(Default)]
pub struct CarouselBuilder {
    config: CarouselConfig,
    dom: Option<Arc<dyn DomCollaborator>>,
    document: Option<Arc<Document>>,
    runtime: Option<Handle>,
}

impl CarouselBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: CarouselConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom DOM collaborator.
    pub fn with_dom(mut self, dom: Arc<dyn DomCollaborator>) -> Self {
        self.dom = Some(dom);
        self
    }

    /// Bind to a headless document using the configured `dom` options.
    pub fn with_document(mut self, document: Arc<Document>) -> Self {
        self.document = Some(document);
        self
    }

    /// Run timers and queued commands on `runtime` instead of the current one.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> CadenceResult<Carousel> {
        self.config.validate()?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|e| CadenceError::NoRuntime(e.to_string()))?,
        };

        let dom = match (self.dom, self.document) {
            (Some(dom), _) => Some(dom),
            (None, Some(document)) => {
                Some(DomBinding::new(document, &self.config.dom) as Arc<dyn DomCollaborator>)
            }
            (None, None) => None,
        };

        let context = IndexContext::new(self.config.range.from, self.config.range.to);
        let machine = IndexStateMachine::new(context, self.config.interval(), runtime.clone());
        let hooks = HookRegistry::new();
        install_default_hooks(&hooks);

        let carousel = Carousel {
            inner: Arc::new(CarouselInner {
                id: InstanceId::new(),
                config: RwLock::new(self.config),
                hooks,
                machine,
                relations: RelationGraph::new(),
                queue: CommandQueue::default(),
                dom,
                runtime,
                dispatch: ReentrantMutex::new(()),
                initialized: AtomicBool::new(false),
                destroyed: AtomicBool::new(false),
            }),
        };

        tracing::debug!(instance = %carousel.id(), "Carousel created");
        Ok(carousel)
    }
}

impl Carousel {
    pub fn builder() -> CarouselBuilder {
        CarouselBuilder::new()
    }

    /// Create a carousel without a DOM collaborator on the current runtime.
    pub fn new(config: CarouselConfig) -> CadenceResult<Self> {
        Self::builder().with_config(config).build()
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    /// Snapshot of the index state.
    pub fn context(&self) -> IndexContext {
        self.inner.machine.snapshot()
    }

    pub fn config(&self) -> CarouselConfig {
        self.inner.config.read().clone()
    }

    /// Leaders this instance follows.
    pub fn relations(&self) -> Vec<(InstanceId, RelationKind)> {
        self.inner.relations.leaders()
    }

    pub fn hook_count(&self, kind: HookKind) -> usize {
        self.inner.hooks.hook_count(kind)
    }

    pub fn dom(&self) -> Option<&Arc<dyn DomCollaborator>> {
        self.inner.dom.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    /// Number of queued commands not yet started.
    pub fn pending_commands(&self) -> usize {
        self.inner.queue.depth()
    }

    /// Resolve once every queued command, waits included, has run.
    pub async fn settled(&self) {
        self.inner.queue.settled().await
    }

    // ------------------------------------------------------------------
    // Command surface
    // ------------------------------------------------------------------

    pub fn init(&self) -> &Self {
        self.submit(Command::Init)
    }

    pub fn destroy(&self) -> &Self {
        self.submit(Command::Destroy)
    }

    /// Delay the commands queued after this one by `ms` milliseconds.
    pub fn wait(&self, ms: u64) -> &Self {
        self.submit(Command::Wait(Duration::from_millis(ms)))
    }

    pub fn play(&self) -> &Self {
        self.submit(Command::Play)
    }

    pub fn pause(&self) -> &Self {
        self.submit(Command::Pause)
    }

    pub fn pause_force(&self) -> &Self {
        self.submit(Command::PauseForce)
    }

    pub fn pause_force_off(&self) -> &Self {
        self.submit(Command::PauseForceOff)
    }

    pub fn next(&self) -> &Self {
        self.submit(Command::Next)
    }

    pub fn prev(&self) -> &Self {
        self.submit(Command::Prev)
    }

    pub fn jump_to_index(&self, index: usize) -> &Self {
        self.submit(Command::JumpToIndex(index))
    }

    pub fn update_interval_time(&self, ms: u64) -> &Self {
        self.submit(Command::UpdateIntervalTime(Duration::from_millis(ms)))
    }

    /// Register a hook. Take its id with [`RegisteredHook::id`] beforehand to
    /// remove it later.
    pub fn add_hook(&self, kind: HookKind, hook: RegisteredHook<Carousel>) -> &Self {
        self.submit(Command::AddHook(kind, hook))
    }

    /// Register a hook on a slot given by name, e.g. `"onIndexChange"`.
    pub fn add_hook_named(&self, name: &str, hook: RegisteredHook<Carousel>) -> &Self {
        match name.parse::<HookKind>() {
            Ok(kind) => self.add_hook(kind, hook),
            Err(err) => {
                self.report(Operation::AddHook, Err(err));
                self
            }
        }
    }

    pub fn remove_hook(&self, kind: HookKind, id: HookId) -> &Self {
        self.submit(Command::RemoveHook(kind, id))
    }

    /// Follow `leader`: every index change there is mirrored here.
    pub fn set_relation_to(&self, leader: &Carousel, kind: RelationKind) -> &Self {
        self.submit(Command::SetRelationTo(leader.clone(), kind))
    }

    pub fn set_relation_to_named(&self, leader: &Carousel, kind: &str) -> &Self {
        match kind.parse::<RelationKind>() {
            Ok(kind) => self.set_relation_to(leader, kind),
            Err(err) => {
                self.report(Operation::SetRelationTo, Err(err));
                self
            }
        }
    }

    pub fn remove_relation_to(&self, leader: &Carousel) -> &Self {
        self.submit(Command::RemoveRelationTo(leader.id()))
    }

    /// Register a selector for a button family: `play`, `pause`, `next`,
    /// `prev` or `indexNav`.
    pub fn add_button(&self, kind: &str, selector: &str) -> &Self {
        self.submit(Command::AddButton {
            kind: kind.to_string(),
            selector: selector.to_string(),
        })
    }

    pub fn remove_button(&self, kind: &str, selector: &str) -> &Self {
        self.submit(Command::RemoveButton {
            kind: kind.to_string(),
            selector: selector.to_string(),
        })
    }

    pub fn create_index_nav(&self, container: &str) -> &Self {
        self.create_index_nav_with_class(container, crate::config::DEFAULT_NAV_ITEM_CLASS)
    }

    pub fn create_index_nav_with_class(&self, container: &str, item_class: &str) -> &Self {
        self.submit(Command::CreateIndexNav {
            container: container.to_string(),
            item_class: item_class.to_string(),
        })
    }

    pub fn remove_index_nav(&self, container: &str) -> &Self {
        self.submit(Command::RemoveIndexNav {
            container: container.to_string(),
        })
    }

    pub fn index_nav_on_hover(&self) -> &Self {
        self.submit(Command::Enable(Interaction::IndexNavOnHover))
    }

    pub fn activate_on_item_hover(&self) -> &Self {
        self.submit(Command::Enable(Interaction::ActivateOnItemHover))
    }

    pub fn activate_on_item_click(&self) -> &Self {
        self.submit(Command::Enable(Interaction::ActivateOnItemClick))
    }

    pub fn pause_on_hover(&self) -> &Self {
        self.submit(Command::Enable(Interaction::PauseOnHover))
    }

    /// Run `command` right away, bypassing the queue, and return its result.
    pub fn execute_now(&self, command: Command) -> CadenceResult<()> {
        if let Command::Wait(_) = command {
            return Err(CadenceError::Validation(
                "wait only applies to queued commands".to_string(),
            ));
        }
        self.execute(command)
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    fn submit(&self, command: Command) -> &Self {
        let op = command.operation();
        match self.inner.queue.classify(op) {
            Dispatch::Immediate => {
                let result = self.execute(command);
                self.report(op, result);
            }
            Dispatch::Queued => {
                if self.inner.queue.enqueue(command) {
                    self.inner.runtime.spawn(self.clone().drain());
                }
            }
        }
        self
    }

    async fn drain(self) {
        while let Some(command) = self.inner.queue.next_for_drain() {
            let op = command.operation();
            match command {
                Command::Wait(duration) => tokio::time::sleep(duration).await,
                command => {
                    let result = self.execute(command);
                    self.report(op, result);
                }
            }
            tokio::task::yield_now().await;
        }
    }

    fn report(&self, op: Operation, result: CadenceResult<()>) {
        let Err(err) = result else {
            return;
        };
        if err.is_reported() {
            tracing::warn!(instance = %self.id(), operation = %op, error = %err, "Command ignored");
        } else {
            tracing::error!(instance = %self.id(), operation = %op, error = %err, "Command failed");
        }
    }

    fn execute(&self, command: Command) -> CadenceResult<()> {
        let _dispatch = self.dispatch_lock();
        if self.is_destroyed() {
            return Err(CadenceError::Destroyed(self.id().to_string()));
        }

        let machine = &self.inner.machine;
        match command {
            Command::Init => self.initialize(),
            Command::Destroy => self.teardown(),
            Command::Wait(_) => Ok(()),
            Command::Play => machine.play(self),
            Command::Pause => machine.pause(self),
            Command::PauseForce => {
                machine.pause_force(self);
                Ok(())
            }
            Command::PauseForceOff => {
                machine.pause_force_off(self);
                Ok(())
            }
            Command::Next => machine.next(self),
            Command::Prev => machine.prev(self),
            Command::JumpToIndex(index) => machine.jump_to_index(self, index),
            Command::UpdateIntervalTime(interval) => {
                if interval.is_zero() {
                    return Err(CadenceError::Validation(
                        "intervalTime must be greater than zero".to_string(),
                    ));
                }
                self.inner.config.write().interval_time = interval.as_millis() as u64;
                machine.update_interval_time(self, interval);
                Ok(())
            }
            Command::AddHook(kind, hook) => {
                self.inner.hooks.add_hook(kind, hook);
                Ok(())
            }
            Command::RemoveHook(kind, id) => {
                if !self.inner.hooks.remove_hook(kind, id) {
                    tracing::debug!(instance = %self.id(), hook = %kind, hook_id = %id, "Hook was not registered");
                }
                Ok(())
            }
            Command::SetRelationTo(leader, kind) => {
                self.inner.relations.establish(self, &leader, kind)
            }
            Command::RemoveRelationTo(leader) => {
                self.inner.relations.release(self, leader);
                Ok(())
            }
            Command::AddButton { kind, selector } => {
                let kind: SelectorType = kind.parse()?;
                self.require_dom()?
                    .update_selector(kind, &selector, SelectorAction::Add)
            }
            Command::RemoveButton { kind, selector } => {
                let kind: SelectorType = kind.parse()?;
                self.require_dom()?
                    .update_selector(kind, &selector, SelectorAction::Remove)
            }
            Command::CreateIndexNav {
                container,
                item_class,
            } => self.require_dom()?.create_index_nav(&container, &item_class),
            Command::RemoveIndexNav { container } => {
                self.require_dom()?.remove_index_nav(&container)
            }
            Command::Enable(interaction) => self.require_dom()?.enable(interaction),
        }
    }

    fn require_dom(&self) -> CadenceResult<&Arc<dyn DomCollaborator>> {
        self.inner.dom.as_ref().ok_or_else(|| {
            CadenceError::Validation(format!("Instance {} has no DOM collaborator", self.id()))
        })
    }

    fn initialize(&self) -> CadenceResult<()> {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return Err(CadenceError::Validation(format!(
                "Instance {} is already initialized",
                self.id()
            )));
        }

        if let Err(err) = self.run_hooks(HookKind::BeforeInit) {
            // Nothing has been applied yet, so a later init may retry.
            self.inner.initialized.store(false, Ordering::SeqCst);
            return Err(err.into());
        }

        let config = self.config();
        if config.autoplay {
            self.inner.machine.play(self)?;
        }

        if config.dom.enabled {
            if let Some(dom) = &self.inner.dom {
                if !config.range.enabled {
                    match dom.measure() {
                        Some(0) => tracing::warn!(
                            instance = %self.id(),
                            "No children found, keeping configured range"
                        ),
                        Some(count) => self.inner.machine.set_bounds(0, count - 1),
                        None => {}
                    }
                }
                dom.attach(self)?;
            }
        }

        self.run_hooks(HookKind::AfterInit)?;

        let ctx = self.context();
        tracing::info!(
            instance = %self.id(),
            min = ctx.min_index,
            max = ctx.max_index,
            playing = ctx.is_playing,
            "Carousel initialized"
        );
        Ok(())
    }

    fn teardown(&self) -> CadenceResult<()> {
        self.run_hooks(HookKind::BeforeDestroy)?;

        self.inner.machine.remove_interval();
        if let Some(dom) = &self.inner.dom {
            dom.detach(self);
        }
        self.inner.relations.release_all(self);

        let after = self.run_hooks(HookKind::AfterDestroy);
        self.inner.hooks.remove_all_hooks();
        self.inner.destroyed.store(true, Ordering::SeqCst);
        let dropped = self.inner.queue.clear();

        tracing::info!(instance = %self.id(), dropped_commands = dropped, "Carousel destroyed");
        after.map_err(CadenceError::from)
    }

    // ------------------------------------------------------------------
    // Crate internals
    // ------------------------------------------------------------------

    /// Serialize with commands and timer ticks of this instance.
    ///
    /// Reentrant, so hooks may issue immediate commands on the same instance.
    pub(crate) fn dispatch_lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.inner.dispatch.lock()
    }

    pub(crate) fn downgrade(&self) -> WeakCarousel {
        WeakCarousel(Arc::downgrade(&self.inner))
    }

    pub(crate) fn hooks(&self) -> &HookRegistry<Carousel> {
        &self.inner.hooks
    }

    pub(crate) fn machine(&self) -> &IndexStateMachine {
        &self.inner.machine
    }

    pub(crate) fn relation_graph(&self) -> &RelationGraph {
        &self.inner.relations
    }

    pub(crate) fn run_hooks(&self, kind: HookKind) -> Result<(), HookError> {
        self.inner.hooks.run_hooks(kind, self)
    }

    /// Turn an operation error raised inside a hook into a hook failure.
    pub(crate) fn escalate(&self, err: CadenceError) -> HookError {
        match err {
            CadenceError::Hook(err) => err,
            other => HookError::Other(anyhow::Error::new(other)),
        }
    }

    pub(crate) fn record_relation(&self, record: RelationRecord) {
        let mut config = self.inner.config.write();
        config.relations.retain(|r| r.target != record.target);
        config.relations.push(record);
    }

    pub(crate) fn forget_relation(&self, leader: InstanceId) {
        self.inner
            .config
            .write()
            .relations
            .retain(|r| r.target != leader);
    }

    /// Handle a tick of the timer armed with `epoch`.
    ///
    /// Returns `false` when the timer is stale and its task should stop.
    pub(crate) fn on_timer_tick(&self, epoch: u64) -> bool {
        let _dispatch = self.dispatch_lock();
        if self.is_destroyed() || !self.inner.machine.is_current_timer(epoch) {
            return false;
        }
        if let Err(err) = self.run_hooks(HookKind::OnIteration) {
            tracing::error!(instance = %self.id(), error = %err, "Iteration failed");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_build_requires_runtime() {
        let err = Carousel::new(CarouselConfig::default()).unwrap_err();
        assert!(matches!(err, CadenceError::NoRuntime(_)));
    }

    #[test]
    fn test_build_with_explicit_runtime() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let carousel = Carousel::builder()
            .with_runtime(runtime.handle().clone())
            .build()
            .unwrap();
        assert_eq!(carousel.context().max_index, 10);
    }

    #[tokio::test]
    async fn test_build_rejects_invalid_config() {
        let mut config = CarouselConfig::default();
        config.interval_time = 0;
        assert!(matches!(
            Carousel::new(config).unwrap_err(),
            CadenceError::Config(_)
        ));
    }

    #[tokio::test]
    async fn test_instance_ids_are_unique() {
        let a = Carousel::new(CarouselConfig::default()).unwrap();
        let b = Carousel::new(CarouselConfig::default()).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[tokio::test]
    async fn test_execute_now_surfaces_errors() {
        let c = Carousel::new(CarouselConfig::default()).unwrap();
        let err = c.execute_now(Command::JumpToIndex(42)).unwrap_err();
        assert!(matches!(err, CadenceError::IndexOutOfRange { index: 42, .. }));

        let err = c.execute_now(Command::AddButton {
            kind: "play".into(),
            selector: ".play".into(),
        });
        assert!(matches!(err, Err(CadenceError::Validation(_))));

        assert!(c.execute_now(Command::Wait(Duration::from_millis(1))).is_err());
    }

    #[tokio::test]
    async fn test_escalate_keeps_hook_errors() {
        let c = Carousel::new(CarouselConfig::default()).unwrap();
        let err = c.escalate(CadenceError::Hook(HookError::failed("inner")));
        assert!(matches!(err, HookError::Failed(msg) if msg == "inner"));
        let err = c.escalate(CadenceError::Validation("nope".into()));
        assert!(matches!(err, HookError::Other(_)));
    }

    #[tokio::test]
    async fn test_double_init_is_rejected() {
        let c = Carousel::new(CarouselConfig::default()).unwrap();
        c.execute_now(Command::Init).unwrap();
        let err = c.execute_now(Command::Init).unwrap_err();
        assert!(err.is_reported());
    }

    #[tokio::test]
    async fn test_failed_before_init_can_be_retried() {
        let c = Carousel::new(CarouselConfig::default()).unwrap();
        let first = Arc::new(AtomicBool::new(true));
        let inits = Arc::new(AtomicUsize::new(0));

        let gate = first.clone();
        c.add_hook(
            HookKind::BeforeInit,
            RegisteredHook::new(move |_: &Carousel| {
                if gate.swap(false, Ordering::SeqCst) {
                    Err(HookError::failed("not ready"))
                } else {
                    Ok(())
                }
            }),
        );
        let seen = inits.clone();
        c.add_hook(
            HookKind::AfterInit,
            RegisteredHook::observe(move |_: &Carousel| {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let err = c.execute_now(Command::Init).unwrap_err();
        assert!(!err.is_reported());
        assert!(!c.is_initialized());
        assert_eq!(inits.load(Ordering::SeqCst), 0);

        c.execute_now(Command::Init).unwrap();
        assert!(c.is_initialized());
        assert_eq!(inits.load(Ordering::SeqCst), 1);
    }
}
