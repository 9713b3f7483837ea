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

//! Per-instance index state.

use crate::error::{CadenceError, CadenceResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of the most recent index change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// No change observed yet.
    #[default]
    None,
    Next,
    Prev,
}

impl Direction {
    /// Infer the direction of a change from `prev` to `curr` within `[min, max]`.
    ///
    /// Wrapping from the last index to the first counts as moving forward, as
    /// does any change that does not strictly decrease the index. The mirror
    /// wrap (first to last) also counts as forward.
    pub fn infer(prev: usize, curr: usize, min: usize, max: usize) -> Direction {
        let wrapped_to_start = prev == max && curr == min;
        let wrapped_to_end = prev == min && curr == max;

        if wrapped_to_start {
            Direction::Next
        } else if curr < prev && !wrapped_to_end {
            Direction::Prev
        } else {
            Direction::Next
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::None => "",
            Direction::Next => "next",
            Direction::Prev => "prev",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable cyclic-position state of one carousel.
///
/// `min_index <= curr_index <= max_index` holds whenever no operation is in
/// flight, and `prev_index` is the value `curr_index` had before its most
/// recent change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexContext {
    pub min_index: usize,
    pub max_index: usize,
    pub curr_index: usize,
    pub prev_index: usize,
    pub is_playing: bool,
    pub is_pause_force: bool,
    pub last_direction: Direction,
    /// Whether an interval timer is currently armed.
    pub timer_active: bool,
}

impl IndexContext {
    /// A context positioned at `min` within `[min, max]`.
    pub fn new(min: usize, max: usize) -> Self {
        Self {
            min_index: min,
            max_index: max,
            curr_index: min,
            prev_index: min,
            is_playing: false,
            is_pause_force: false,
            last_direction: Direction::None,
            timer_active: false,
        }
    }

    /// Number of positions in the cycle.
    pub fn positions(&self) -> usize {
        self.max_index - self.min_index + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.min_index..=self.max_index).contains(&index)
    }

    /// Step forward by one, wrapping past `max_index` to `min_index`.
    pub fn advance(&mut self) {
        self.prev_index = self.curr_index;
        self.curr_index = if self.curr_index >= self.max_index {
            self.min_index
        } else {
            self.curr_index + 1
        };
    }

    /// Step backward by one, wrapping below `min_index` to `max_index`.
    pub fn retreat(&mut self) {
        self.prev_index = self.curr_index;
        self.curr_index = if self.curr_index <= self.min_index {
            self.max_index
        } else {
            self.curr_index - 1
        };
    }

    /// Move to `index`, rejecting positions outside the range.
    pub fn jump_to(&mut self, index: usize) -> CadenceResult<()> {
        if !self.contains(index) {
            return Err(CadenceError::IndexOutOfRange {
                index,
                min: self.min_index,
                max: self.max_index,
            });
        }
        self.prev_index = self.curr_index;
        self.curr_index = index;
        Ok(())
    }

    /// Replace the bounds, pulling the current and previous positions inside.
    pub fn set_bounds(&mut self, min: usize, max: usize) {
        self.min_index = min;
        self.max_index = max.max(min);
        self.curr_index = self.curr_index.clamp(self.min_index, self.max_index);
        self.prev_index = self.prev_index.clamp(self.min_index, self.max_index);
    }

    /// Recompute and store the direction of the latest change.
    pub fn update_direction(&mut self) -> Direction {
        self.last_direction = Direction::infer(
            self.prev_index,
            self.curr_index,
            self.min_index,
            self.max_index,
        );
        self.last_direction
    }
}
