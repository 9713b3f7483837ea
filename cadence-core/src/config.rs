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

//! Carousel configuration
//!
//! Every field has a default, so a partial JSON or TOML document is merged
//! over the defaults key by key.
//!
//! # Example JSON Configuration
//!
//! ```json
//! {
//!     "intervalTime": 1000,
//!     "autoplay": true,
//!     "range": { "enabled": true, "from": 0, "to": 4 },
//!     "dom": { "selectors": { "children": ".slide", "next": [".next-btn"] } }
//! }
//! ```

use crate::error::{CadenceError, CadenceResult};
use crate::relations::RelationKind;
use crate::InstanceId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default timer cadence in milliseconds
pub const DEFAULT_INTERVAL_MS: u64 = 1200;

/// Class name applied to the active child and nav item
pub const ACTIVE_CLASS: &str = "active";

/// Class name used for generated index-navigation items
pub const DEFAULT_NAV_ITEM_CLASS: &str = "nav-item";

/// Top-level configuration of a carousel instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarouselConfig {
    /// Timer cadence for automatic advance, in milliseconds.
    #[serde(alias = "intervalTime")]
    pub interval_time: u64,

    /// Start playing during `init`.
    pub autoplay: bool,

    /// Initial bounds when DOM-measured bounds are not used.
    pub range: RangeConfig,

    /// Options handed to the DOM collaborator.
    pub dom: DomConfig,

    /// Informational record of established relations.
    pub relations: Vec<RelationRecord>,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            interval_time: DEFAULT_INTERVAL_MS,
            autoplay: false,
            range: RangeConfig::default(),
            dom: DomConfig::default(),
            relations: Vec::new(),
        }
    }
}

impl CarouselConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> CadenceResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> CadenceResult<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load a configuration file, picking the format from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> CadenceResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CadenceError::Config(format!("{}: {}", path.display(), e)))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&contents),
            Some("toml") => Self::from_toml(&contents),
            other => Err(CadenceError::Config(format!(
                "Unsupported config extension: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }

    /// The timer cadence as a Duration.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_time)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> CadenceResult<()> {
        if self.interval_time == 0 {
            return Err(CadenceError::Config(
                "intervalTime must be greater than zero".to_string(),
            ));
        }
        if self.range.from > self.range.to {
            return Err(CadenceError::Config(format!(
                "range.from ({}) is greater than range.to ({})",
                self.range.from, self.range.to
            )));
        }
        Ok(())
    }
}

/// Initial index bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeConfig {
    /// When set, these bounds win over DOM-measured ones.
    pub enabled: bool,
    pub from: usize,
    pub to: usize,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            from: 0,
            to: 10,
        }
    }
}

/// Options for the DOM collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomConfig {
    /// Whether the collaborator is attached during `init`.
    pub enabled: bool,

    #[serde(alias = "applyActiveClass")]
    pub apply_active_class: bool,

    #[serde(alias = "applyIndexation")]
    pub apply_indexation: bool,

    pub selectors: SelectorConfig,
}

impl Default for DomConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            apply_active_class: true,
            apply_indexation: true,
            selectors: SelectorConfig::default(),
        }
    }
}

/// Selectors the DOM collaborator binds to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Selector matching the carousel's children.
    pub children: String,
    pub play: Vec<String>,
    pub pause: Vec<String>,
    pub next: Vec<String>,
    pub prev: Vec<String>,
    /// Containers that host generated index navigation.
    #[serde(alias = "indexNav")]
    pub index_nav: Vec<String>,
}

/// A relation as recorded in the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationRecord {
    pub target: InstanceId,
    pub kind: RelationKind,
}
