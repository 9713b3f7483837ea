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

//! Leader/follower relations between carousels.
//!
//! A follower subscribes to its leader's `onIndexChange` slot. The follower
//! owns the edge (a strong handle to the leader plus the hook id it
//! registered there); the hook itself only holds a weak handle back to the
//! follower, so neither side keeps the other alive through the hook.
//!
//! Relations form a DAG. Establishing an edge that would close a cycle is
//! rejected.

use crate::carousel::{Carousel, InstanceId, WeakCarousel};
use crate::config::RelationRecord;
use crate::error::{CadenceError, CadenceResult};
use crate::hooks::{HookId, HookKind, RegisteredHook};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// How a follower derives its index from the leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    /// Copy the leader's current index.
    Index,
    /// Locate the leader's active element among the follower's children.
    Dom,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Index => "index",
            RelationKind::Dom => "dom",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationKind {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "index" => Ok(RelationKind::Index),
            "dom" => Ok(RelationKind::Dom),
            "" => Err(CadenceError::Validation(
                "Relation type must not be empty".to_string(),
            )),
            other => Err(CadenceError::Validation(format!(
                "Unknown relation type: {}",
                other
            ))),
        }
    }
}

/// An established edge, owned by the follower.
#[derive(Debug, Clone)]
pub struct Relation {
    pub leader: Carousel,
    pub kind: RelationKind,
    /// The hook registered on the leader's `onIndexChange` slot.
    pub hook_id: HookId,
}

/// The outgoing relations of one follower, keyed by leader id.
#[derive(Debug, Default)]
pub struct RelationGraph {
    edges: DashMap<InstanceId, Relation>,
}

impl RelationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leaders this instance follows, with the relation kind.
    pub fn leaders(&self) -> Vec<(InstanceId, RelationKind)> {
        let mut leaders: Vec<_> = self
            .edges
            .iter()
            .map(|entry| (*entry.key(), entry.value().kind))
            .collect();
        leaders.sort_by_key(|(id, _)| *id);
        leaders
    }

    pub fn get(&self, leader: InstanceId) -> Option<Relation> {
        self.edges.get(&leader).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Whether `target` is reachable by walking leader edges from here.
    pub fn reaches(&self, target: InstanceId) -> bool {
        let mut visited = HashSet::new();
        let mut to_process: Vec<Carousel> = self.leader_handles();

        while let Some(leader) = to_process.pop() {
            if leader.id() == target {
                return true;
            }
            if visited.insert(leader.id()) {
                to_process.extend(leader.relation_graph().leader_handles());
            }
        }
        false
    }

    /// Make `follower` track `leader`, replacing any previous edge to it.
    pub(crate) fn establish(
        &self,
        follower: &Carousel,
        leader: &Carousel,
        kind: RelationKind,
    ) -> CadenceResult<()> {
        if leader.id() == follower.id() {
            return Err(CadenceError::Validation(format!(
                "Instance {} cannot follow itself",
                follower.id()
            )));
        }
        if leader.is_destroyed() {
            return Err(CadenceError::Destroyed(leader.id().to_string()));
        }
        if leader.relation_graph().reaches(follower.id()) {
            return Err(CadenceError::Validation(format!(
                "Relation {} -> {} would create a cycle",
                follower.id(),
                leader.id()
            )));
        }

        self.release(follower, leader.id());

        let hook_id = leader.hooks().add_hook(
            HookKind::OnIndexChange,
            follow_hook(follower.downgrade(), kind),
        );
        self.edges.insert(
            leader.id(),
            Relation {
                leader: leader.clone(),
                kind,
                hook_id,
            },
        );
        follower.record_relation(RelationRecord {
            target: leader.id(),
            kind,
        });

        tracing::debug!(
            follower = %follower.id(),
            leader = %leader.id(),
            %kind,
            "Relation established"
        );
        Ok(())
    }

    /// Drop the edge to `leader`. Returns `false` if there was none.
    pub(crate) fn release(&self, follower: &Carousel, leader: InstanceId) -> bool {
        let Some((_, relation)) = self.edges.remove(&leader) else {
            return false;
        };
        relation
            .leader
            .hooks()
            .remove_hook(HookKind::OnIndexChange, relation.hook_id);
        follower.forget_relation(leader);

        tracing::debug!(follower = %follower.id(), %leader, "Relation removed");
        true
    }

    /// Drop every outgoing edge.
    pub(crate) fn release_all(&self, follower: &Carousel) {
        let leaders: Vec<InstanceId> = self.edges.iter().map(|entry| *entry.key()).collect();
        for leader in leaders {
            self.release(follower, leader);
        }
    }

    fn leader_handles(&self) -> Vec<Carousel> {
        self.edges
            .iter()
            .map(|entry| entry.value().leader.clone())
            .collect()
    }
}

fn follow_hook(follower: WeakCarousel, kind: RelationKind) -> RegisteredHook<Carousel> {
    RegisteredHook::new_cyclic(move |own_id| {
        move |leader: &Carousel| {
            let Some(follower) = follower.upgrade() else {
                // Dropped without destroy(): unsubscribe from the leader.
                leader.hooks().remove_hook(HookKind::OnIndexChange, own_id);
                tracing::debug!(leader = %leader.id(), hook_id = %own_id, "Follower gone, relation hook removed");
                return Ok(());
            };
            let _dispatch = follower.dispatch_lock();
            if follower.is_destroyed() {
                return Ok(());
            }

            let result = match kind {
                RelationKind::Index => follow_index(&follower, leader),
                RelationKind::Dom => follow_dom(&follower, leader),
            };
            match result {
                Ok(()) => Ok(()),
                Err(err) if err.is_reported() => {
                    tracing::warn!(
                        follower = %follower.id(),
                        leader = %leader.id(),
                        error = %err,
                        "Follower ignored leader change"
                    );
                    Ok(())
                }
                Err(err) => Err(follower.escalate(err)),
            }
        }
    })
    .with_description(format!("follow leader ({})", kind))
}

fn follow_index(follower: &Carousel, leader: &Carousel) -> CadenceResult<()> {
    let index = leader.context().curr_index;
    follower.machine().jump_to_index(follower, index)
}

fn follow_dom(follower: &Carousel, leader: &Carousel) -> CadenceResult<()> {
    let (Some(leader_dom), Some(own_dom)) = (leader.dom(), follower.dom()) else {
        tracing::debug!(
            follower = %follower.id(),
            leader = %leader.id(),
            "DOM relation without DOM collaborators"
        );
        return Ok(());
    };
    let Some(active) = leader_dom.active_element() else {
        return Ok(());
    };
    match own_dom.containing_child(active) {
        Some(index) => follower.machine().jump_to_index(follower, index),
        None => Ok(()),
    }
}
