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

//! Command queue
//!
//! Public operations are either critical (executed immediately, even while
//! queued work is pending) or deferred (appended to a FIFO and executed one
//! at a time by a drain task that yields between entries). `wait` is a
//! deferred entry that sleeps, which is what makes `next().wait(500).next()`
//! space its steps.

use crate::carousel::{Carousel, InstanceId};
use crate::dom::Interaction;
use crate::hooks::{HookId, HookKind, RegisteredHook};
use crate::relations::RelationKind;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;
use tokio::sync::Notify;

/// A public operation with its arguments.
#[derive(Debug)]
pub enum Command {
    Init,
    Destroy,
    Wait(Duration),
    Play,
    Pause,
    PauseForce,
    PauseForceOff,
    Next,
    Prev,
    JumpToIndex(usize),
    UpdateIntervalTime(Duration),
    AddHook(HookKind, RegisteredHook<Carousel>),
    RemoveHook(HookKind, HookId),
    SetRelationTo(Carousel, RelationKind),
    RemoveRelationTo(InstanceId),
    AddButton { kind: String, selector: String },
    RemoveButton { kind: String, selector: String },
    CreateIndexNav { container: String, item_class: String },
    RemoveIndexNav { container: String },
    Enable(Interaction),
}

impl Command {
    pub fn operation(&self) -> Operation {
        match self {
            Command::Init => Operation::Init,
            Command::Destroy => Operation::Destroy,
            Command::Wait(_) => Operation::Wait,
            Command::Play => Operation::Play,
            Command::Pause => Operation::Pause,
            Command::PauseForce => Operation::PauseForce,
            Command::PauseForceOff => Operation::PauseForceOff,
            Command::Next => Operation::Next,
            Command::Prev => Operation::Prev,
            Command::JumpToIndex(_) => Operation::JumpToIndex,
            Command::UpdateIntervalTime(_) => Operation::UpdateIntervalTime,
            Command::AddHook(..) => Operation::AddHook,
            Command::RemoveHook(..) => Operation::RemoveHook,
            Command::SetRelationTo(..) => Operation::SetRelationTo,
            Command::RemoveRelationTo(_) => Operation::RemoveRelationTo,
            Command::AddButton { .. } => Operation::AddButton,
            Command::RemoveButton { .. } => Operation::RemoveButton,
            Command::CreateIndexNav { .. } => Operation::CreateIndexNav,
            Command::RemoveIndexNav { .. } => Operation::RemoveIndexNav,
            Command::Enable(interaction) => interaction.operation(),
        }
    }
}

/// Operation names, used to classify commands and in log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Init,
    Destroy,
    Wait,
    Play,
    Pause,
    PauseForce,
    PauseForceOff,
    Next,
    Prev,
    JumpToIndex,
    UpdateIntervalTime,
    AddHook,
    RemoveHook,
    SetRelationTo,
    RemoveRelationTo,
    AddButton,
    RemoveButton,
    CreateIndexNav,
    RemoveIndexNav,
    IndexNavOnHover,
    ActivateOnItemHover,
    ActivateOnItemClick,
    PauseOnHover,
}

impl Operation {
    pub const ALL: [Operation; 23] = [
        Operation::Init,
        Operation::Destroy,
        Operation::Wait,
        Operation::Play,
        Operation::Pause,
        Operation::PauseForce,
        Operation::PauseForceOff,
        Operation::Next,
        Operation::Prev,
        Operation::JumpToIndex,
        Operation::UpdateIntervalTime,
        Operation::AddHook,
        Operation::RemoveHook,
        Operation::SetRelationTo,
        Operation::RemoveRelationTo,
        Operation::AddButton,
        Operation::RemoveButton,
        Operation::CreateIndexNav,
        Operation::RemoveIndexNav,
        Operation::IndexNavOnHover,
        Operation::ActivateOnItemHover,
        Operation::ActivateOnItemClick,
        Operation::PauseOnHover,
    ];

    /// Operations that bypass the queue.
    pub const CRITICAL: [Operation; 5] = [
        Operation::Init,
        Operation::AddHook,
        Operation::RemoveHook,
        Operation::SetRelationTo,
        Operation::RemoveRelationTo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Init => "init",
            Operation::Destroy => "destroy",
            Operation::Wait => "wait",
            Operation::Play => "play",
            Operation::Pause => "pause",
            Operation::PauseForce => "pauseForce",
            Operation::PauseForceOff => "pauseForceOff",
            Operation::Next => "next",
            Operation::Prev => "prev",
            Operation::JumpToIndex => "jumpToIndex",
            Operation::UpdateIntervalTime => "updateIntervalTime",
            Operation::AddHook => "addHook",
            Operation::RemoveHook => "removeHook",
            Operation::SetRelationTo => "setRelationTo",
            Operation::RemoveRelationTo => "removeRelationTo",
            Operation::AddButton => "addButton",
            Operation::RemoveButton => "removeButton",
            Operation::CreateIndexNav => "createIndexNav",
            Operation::RemoveIndexNav => "removeIndexNav",
            Operation::IndexNavOnHover => "indexNavOnHover",
            Operation::ActivateOnItemHover => "activateOnItemHover",
            Operation::ActivateOnItemClick => "activateOnItemClick",
            Operation::PauseOnHover => "pauseOnHover",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an operation is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Immediate,
    Queued,
}

/// Classification of every public operation, built once per instance.
#[derive(Debug, Clone)]
pub struct CommandTable {
    routes: HashMap<Operation, Dispatch>,
}

impl Default for CommandTable {
    fn default() -> Self {
        let routes = Operation::ALL
            .iter()
            .map(|op| {
                let dispatch = if Operation::CRITICAL.contains(op) {
                    Dispatch::Immediate
                } else {
                    Dispatch::Queued
                };
                (*op, dispatch)
            })
            .collect();
        Self { routes }
    }
}

impl CommandTable {
    pub fn dispatch(&self, op: Operation) -> Dispatch {
        self.routes.get(&op).copied().unwrap_or(Dispatch::Queued)
    }
}

#[derive(Default)]
struct QueueState {
    entries: VecDeque<Command>,
    draining: bool,
}

/// FIFO of deferred commands.
///
/// The entries and the `draining` flag share a lock: a push either lands in
/// front of a running drain or tells the caller to start one, and a drain
/// only stops after observing an empty queue under that lock.
pub struct CommandQueue {
    table: CommandTable,
    state: Mutex<QueueState>,
    idle: Notify,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new(CommandTable::default())
    }
}

impl fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CommandQueue")
            .field("depth", &state.entries.len())
            .field("draining", &state.draining)
            .finish()
    }
}

impl CommandQueue {
    pub fn new(table: CommandTable) -> Self {
        Self {
            table,
            state: Mutex::new(QueueState::default()),
            idle: Notify::new(),
        }
    }

    pub fn classify(&self, op: Operation) -> Dispatch {
        self.table.dispatch(op)
    }

    /// Append a command. Returns `true` when the caller must start a drain.
    pub(crate) fn enqueue(&self, command: Command) -> bool {
        let mut state = self.state.lock();
        state.entries.push_back(command);
        if state.draining {
            false
        } else {
            state.draining = true;
            true
        }
    }

    /// Next command for the running drain; `None` ends the drain.
    pub(crate) fn next_for_drain(&self) -> Option<Command> {
        let mut state = self.state.lock();
        match state.entries.pop_front() {
            Some(command) => Some(command),
            None => {
                state.draining = false;
                drop(state);
                self.idle.notify_waiters();
                None
            }
        }
    }

    /// Pending command count, not counting one being executed.
    pub fn depth(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_idle(&self) -> bool {
        let state = self.state.lock();
        !state.draining && state.entries.is_empty()
    }

    /// Discard pending commands. A running drain finishes its current entry.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let dropped = state.entries.len();
        state.entries.clear();
        dropped
    }

    /// Resolve once no command is pending or executing.
    pub async fn settled(&self) {
        loop {
            let notified = self.idle.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}
