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

//! Cadence error types

use crate::dom::DomError;
use crate::hooks::HookError;
use thiserror::Error;

/// Result type for carousel operations
pub type CadenceResult<T> = Result<T, CadenceError>;

/// Errors that can occur while driving a carousel
#[derive(Debug, Error)]
pub enum CadenceError {
    // Reported, non-fatal errors
    #[error("Hook {0} does not exist")]
    UnknownHook(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No selectors defined for type: {0}")]
    UnknownSelectorType(String),

    #[error("Index {index} is outside of range {min}..={max}")]
    IndexOutOfRange { index: usize, min: usize, max: usize },

    // Setup errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),

    #[error("Instance {0} has been destroyed")]
    Destroyed(String),

    // Collaborator errors
    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    // Propagated from hook callbacks
    #[error("Hook error: {0}")]
    Hook(#[from] HookError),
}

impl CadenceError {
    /// Whether this error is one of the reported-and-ignored kinds.
    ///
    /// Reported errors turn the operation into a no-op; everything else
    /// signals a failure the caller should see.
    pub fn is_reported(&self) -> bool {
        matches!(
            self,
            CadenceError::UnknownHook(_)
                | CadenceError::Validation(_)
                | CadenceError::UnknownSelectorType(_)
                | CadenceError::IndexOutOfRange { .. }
                | CadenceError::Destroyed(_)
        )
    }
}

impl From<serde_json::Error> for CadenceError {
    fn from(e: serde_json::Error) -> Self {
        CadenceError::Config(e.to_string())
    }
}

impl From<toml::de::Error> for CadenceError {
    fn from(e: toml::de::Error) -> Self {
        CadenceError::Config(e.to_string())
    }
}
