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

//! DOM collaborator interface and a headless implementation.
//!
//! The carousel never touches elements itself. Everything DOM-shaped goes
//! through [`DomCollaborator`]: measuring children, marking the active one,
//! wiring buttons and index navigation, and translating a leader's active
//! element into a follower index for `dom` relations.
//!
//! [`Document`] and [`DomBinding`] provide an in-memory implementation
//! usable from tests and the CLI.

mod binding;
mod document;
mod selector;

pub use binding::DomBinding;
pub use document::{
    Document, DocumentId, DomEvent, DomEventKind, EventListener, ListenerId, NodeId, DATA_INDEX,
};

use crate::carousel::Carousel;
use crate::error::{CadenceError, CadenceResult};
use crate::queue::Operation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised by the document model.
#[derive(Debug, Error)]
pub enum DomError {
    #[error("Invalid selector: {0:?}")]
    InvalidSelector(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Node {0} belongs to another document")]
    ForeignNode(String),

    #[error("Hierarchy request error: {0}")]
    HierarchyRequest(String),
}

/// Button families a selector can be registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectorType {
    Play,
    Pause,
    Next,
    Prev,
    IndexNav,
}

impl SelectorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorType::Play => "play",
            SelectorType::Pause => "pause",
            SelectorType::Next => "next",
            SelectorType::Prev => "prev",
            SelectorType::IndexNav => "indexNav",
        }
    }
}

impl fmt::Display for SelectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectorType {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "play" => Ok(SelectorType::Play),
            "pause" => Ok(SelectorType::Pause),
            "next" => Ok(SelectorType::Next),
            "prev" => Ok(SelectorType::Prev),
            "indexNav" => Ok(SelectorType::IndexNav),
            other => Err(CadenceError::UnknownSelectorType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorAction {
    Add,
    Remove,
}

/// Optional pointer interactions a collaborator can enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interaction {
    /// Hovering an index-nav item jumps to its index.
    IndexNavOnHover,
    /// Hovering a child jumps to its index.
    ActivateOnItemHover,
    /// Clicking a child jumps to its index.
    ActivateOnItemClick,
    /// Hovering a child holds playback until the pointer leaves.
    PauseOnHover,
}

impl Interaction {
    pub fn operation(&self) -> Operation {
        match self {
            Interaction::IndexNavOnHover => Operation::IndexNavOnHover,
            Interaction::ActivateOnItemHover => Operation::ActivateOnItemHover,
            Interaction::ActivateOnItemClick => Operation::ActivateOnItemClick,
            Interaction::PauseOnHover => Operation::PauseOnHover,
        }
    }
}

/// Seam between a carousel and whatever renders it.
pub trait DomCollaborator: Send + Sync {
    /// Number of children, or `None` when they cannot be measured.
    fn measure(&self) -> Option<usize>;

    /// Bind to `carousel`. Called once from `init`.
    fn attach(&self, carousel: &Carousel) -> CadenceResult<()>;

    /// Release everything `attach` set up. Called from `destroy`.
    fn detach(&self, carousel: &Carousel);

    /// The child currently marked active.
    fn active_element(&self) -> Option<NodeId>;

    /// Index of the child that is, or contains, `node`.
    fn containing_child(&self, node: NodeId) -> Option<usize>;

    fn update_selector(
        &self,
        kind: SelectorType,
        selector: &str,
        action: SelectorAction,
    ) -> CadenceResult<()>;

    fn create_index_nav(&self, container: &str, item_class: &str) -> CadenceResult<()>;

    fn remove_index_nav(&self, container: &str) -> CadenceResult<()>;

    fn enable(&self, interaction: Interaction) -> CadenceResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_type_names() {
        assert_eq!("indexNav".parse::<SelectorType>().unwrap(), SelectorType::IndexNav);
        assert_eq!(SelectorType::Prev.to_string(), "prev");
        let err = "wrongButton".parse::<SelectorType>().unwrap_err();
        assert!(err.is_reported());
        assert!(matches!(err, CadenceError::UnknownSelectorType(name) if name == "wrongButton"));
    }
}
