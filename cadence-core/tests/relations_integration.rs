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

//! Integration tests for leader/follower relations

use cadence_core::{Carousel, CarouselConfig, HookKind, RelationKind};
use std::time::Duration;

fn carousel(to: usize) -> Carousel {
    let mut config = CarouselConfig::default();
    config.range.to = to;
    config.interval_time = 1000;
    Carousel::new(config).unwrap()
}

/// Test that a follower mirrors its leader's index
#[tokio::test]
async fn test_index_relation_propagates() {
    let leader = carousel(5);
    let follower = carousel(5);

    follower.set_relation_to(&leader, RelationKind::Index);
    leader.next().next();
    leader.settled().await;

    assert_eq!(leader.context().curr_index, 2);
    assert_eq!(follower.context().curr_index, 2);
    assert_eq!(follower.relations(), vec![(leader.id(), RelationKind::Index)]);
}

/// Test that removing a relation stops propagation
#[tokio::test]
async fn test_removed_relation_stops_propagation() {
    let leader = carousel(5);
    let follower = carousel(5);

    follower.set_relation_to(&leader, RelationKind::Index);
    leader.jump_to_index(2);
    leader.settled().await;

    follower.remove_relation_to(&leader);
    leader.next();
    leader.settled().await;

    assert_eq!(leader.context().curr_index, 3);
    assert_eq!(follower.context().curr_index, 2);
    assert!(follower.relations().is_empty());
    assert!(follower.config().relations.is_empty());
}

/// Test that relating twice keeps a single subscription
#[tokio::test]
async fn test_duplicate_relation_is_idempotent() {
    let leader = carousel(5);
    let follower = carousel(5);
    let baseline = leader.hook_count(HookKind::OnIndexChange);

    follower
        .set_relation_to(&leader, RelationKind::Index)
        .set_relation_to_named(&leader, "index");

    assert_eq!(leader.hook_count(HookKind::OnIndexChange), baseline + 1);
    assert_eq!(follower.config().relations.len(), 1);
}

/// Test that cycles and self relations are refused
#[tokio::test]
async fn test_cycles_are_rejected() {
    let a = carousel(5);
    let b = carousel(5);

    a.set_relation_to(&a, RelationKind::Index);
    assert!(a.relations().is_empty());

    b.set_relation_to(&a, RelationKind::Index);
    a.set_relation_to(&b, RelationKind::Index);
    assert!(a.relations().is_empty());

    // The accepted edge still works and nothing loops.
    a.next();
    a.settled().await;
    assert_eq!(b.context().curr_index, 1);
}

/// Test propagation through a chain of followers
#[tokio::test]
async fn test_relation_chain() {
    let a = carousel(5);
    let b = carousel(5);
    let c = carousel(5);

    b.set_relation_to(&a, RelationKind::Index);
    c.set_relation_to(&b, RelationKind::Index);
    a.jump_to_index(4);
    a.settled().await;

    assert_eq!(b.context().curr_index, 4);
    assert_eq!(c.context().curr_index, 4);
}

/// Test that a follower with a shorter range ignores unreachable indices
#[tokio::test]
async fn test_follower_out_of_range_is_ignored() {
    let leader = carousel(5);
    let follower = carousel(2);

    follower.set_relation_to(&leader, RelationKind::Index);
    leader.jump_to_index(1).jump_to_index(4);
    leader.settled().await;

    assert_eq!(leader.context().curr_index, 4);
    assert_eq!(follower.context().curr_index, 1);
}

/// Test that an unknown relation type is ignored
#[tokio::test]
async fn test_unknown_relation_type() {
    let leader = carousel(5);
    let follower = carousel(5);

    follower.set_relation_to_named(&leader, "").set_relation_to_named(&leader, "style");
    assert!(follower.relations().is_empty());
}

/// Test that timer ticks on the leader drive the follower
#[tokio::test(start_paused = true)]
async fn test_follower_tracks_autoplay() {
    let leader = carousel(5);
    let follower = carousel(5);

    follower.set_relation_to(&leader, RelationKind::Index);
    leader.play();
    leader.settled().await;
    tokio::time::sleep(Duration::from_millis(2500)).await;

    assert_eq!(follower.context().curr_index, 2);
    assert!(!follower.context().is_playing);
}

/// Test that destroying a follower unsubscribes it
#[tokio::test]
async fn test_destroyed_follower_unsubscribes() {
    let leader = carousel(5);
    let follower = carousel(5);
    let baseline = leader.hook_count(HookKind::OnIndexChange);

    follower.set_relation_to(&leader, RelationKind::Index);
    follower.destroy();
    follower.settled().await;

    assert_eq!(leader.hook_count(HookKind::OnIndexChange), baseline);
    leader.next();
    leader.settled().await;
    assert_eq!(follower.context().curr_index, 0);
}
