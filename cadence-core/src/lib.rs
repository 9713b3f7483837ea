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

//! Cadence Core
//!
//! A cyclic index engine: a position that walks a bounded range on a timer
//! or on demand, with prioritized lifecycle hooks, inter-instance relations
//! and an ordered command queue. DOM concerns live behind a collaborator
//! trait; [`dom`] ships a headless document model that implements it.
//!
//! ```no_run
//! use cadence_core::{Carousel, CarouselConfig, HookKind, RegisteredHook};
//!
//! # async fn demo() -> cadence_core::CadenceResult<()> {
//! let carousel = Carousel::new(CarouselConfig::default())?;
//! carousel
//!     .add_hook(
//!         HookKind::OnIndexChange,
//!         RegisteredHook::observe(|c: &Carousel| println!("now at {}", c.context().curr_index)),
//!     )
//!     .init()
//!     .next()
//!     .wait(500)
//!     .next();
//! carousel.settled().await;
//! # Ok(())
//! # }
//! ```

pub mod carousel;
pub mod config;
pub mod context;
pub mod dom;
pub mod error;
pub mod hooks;
pub mod iteration;
pub mod queue;
pub mod relations;

pub use carousel::{Carousel, CarouselBuilder, InstanceId};
pub use config::{
    CarouselConfig, DomConfig, RangeConfig, RelationRecord, SelectorConfig, ACTIVE_CLASS,
    DEFAULT_INTERVAL_MS, DEFAULT_NAV_ITEM_CLASS,
};
pub use context::{Direction, IndexContext};
pub use dom::{
    Document, DomBinding, DomCollaborator, DomError, DomEvent, Interaction, NodeId, SelectorAction,
    SelectorType,
};
pub use error::{CadenceError, CadenceResult};
pub use hooks::{HookError, HookFn, HookId, HookKind, HookPriority, HookRegistry, RegisteredHook};
pub use iteration::IndexStateMachine;
pub use queue::{Command, CommandQueue, CommandTable, Dispatch, Operation};
pub use relations::{Relation, RelationGraph, RelationKind};
