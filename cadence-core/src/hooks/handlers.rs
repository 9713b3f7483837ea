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

//! Hook callback type and its error.

use std::sync::Arc;
use thiserror::Error;

/// A hook callback. It receives the subject that fired the hook
/// (for carousels, the carousel itself).
pub type HookFn<T> = Arc<dyn Fn(&T) -> Result<(), HookError> + Send + Sync>;

/// Errors raised by hook callbacks.
///
/// A failing callback aborts the remaining callbacks of the dispatch and the
/// error surfaces to whoever triggered it.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("Hook callback failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HookError {
    /// Create a failure with a message.
    pub fn failed(message: impl Into<String>) -> Self {
        HookError::Failed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_message() {
        let err = HookError::failed("boom");
        assert_eq!(err.to_string(), "Hook callback failed: boom");
    }

    #[test]
    fn test_from_anyhow() {
        let err: HookError = anyhow::anyhow!("downstream exploded").into();
        assert_eq!(err.to_string(), "downstream exploded");
    }
}
