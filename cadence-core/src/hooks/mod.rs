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

//! Hook Infrastructure for Carousel Lifecycle Events
//!
//! Every carousel owns a [`HookRegistry`] with one slot per [`HookKind`]:
//!
//! - **beforeInit / afterInit**: bracket `init()`
//! - **beforeDestroy / afterDestroy**: bracket `destroy()`
//! - **onIteration**: every timer tick
//! - **onIndexChange**: every index change, including no-op wraps
//! - **onPlay / onPause**: playback transitions
//! - **onNext / onPrev**: manual navigation
//!
//! # Architecture
//!
//! - Dispatch: O(k) where k = hooks registered on the slot
//! - Hooks run synchronously, higher priority first, insertion order for ties
//! - The first failing hook aborts the dispatch and its error propagates
//!
//! # Example
//!
//! ```rust,ignore
//! use cadence_core::hooks::{HookKind, HookPriority, RegisteredHook};
//!
//! let hook = RegisteredHook::observe(|c: &Carousel| {
//!     println!("now at {}", c.context().curr_index);
//! })
//! .with_priority(HookPriority::LOW);
//! carousel.add_hook(HookKind::OnIndexChange, hook);
//! ```

mod handlers;
mod kind;
mod registry;

pub use handlers::{HookError, HookFn};
pub use kind::HookKind;
pub use registry::{HookId, HookPriority, HookRegistry, RegisteredHook};
