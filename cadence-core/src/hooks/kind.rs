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

use crate::error::CadenceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of hook slots a carousel exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HookKind {
    BeforeInit,
    AfterInit,
    BeforeDestroy,
    AfterDestroy,
    OnIteration,
    OnIndexChange,
    OnPlay,
    OnPause,
    OnPrev,
    OnNext,
}

impl HookKind {
    /// Every slot, in declaration order.
    pub const ALL: [HookKind; 10] = [
        HookKind::BeforeInit,
        HookKind::AfterInit,
        HookKind::BeforeDestroy,
        HookKind::AfterDestroy,
        HookKind::OnIteration,
        HookKind::OnIndexChange,
        HookKind::OnPlay,
        HookKind::OnPause,
        HookKind::OnPrev,
        HookKind::OnNext,
    ];

    /// The slot name as it appears in configuration and scripts.
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::BeforeInit => "beforeInit",
            HookKind::AfterInit => "afterInit",
            HookKind::BeforeDestroy => "beforeDestroy",
            HookKind::AfterDestroy => "afterDestroy",
            HookKind::OnIteration => "onIteration",
            HookKind::OnIndexChange => "onIndexChange",
            HookKind::OnPlay => "onPlay",
            HookKind::OnPause => "onPause",
            HookKind::OnPrev => "onPrev",
            HookKind::OnNext => "onNext",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookKind {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HookKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CadenceError::UnknownHook(s.to_string()))
    }
}
