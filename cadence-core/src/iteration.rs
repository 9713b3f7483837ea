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

//! Index state machine: play/pause, stepping, jumps and the interval timer.
//!
//! # States
//!
//! ```text
//!            play()                    pause_force()
//! Stopped ----------> Playing ------------------------> Playing+ForcedPause
//!    ^                  |   ^                                  |
//!    |     pause()      |   |        pause_force_off()         |
//!    +------------------+   +----------------------------------+
//! ```
//!
//! Only `Playing` owns a live timer. Every timer start bumps an epoch and a
//! tick carrying an older epoch is discarded, so a cleared timer can never
//! advance the index.

use crate::carousel::Carousel;
use crate::context::{Direction, IndexContext};
use crate::error::CadenceResult;
use crate::hooks::{HookKind, HookRegistry, RegisteredHook};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

#[derive(Default)]
struct TimerSlot {
    handle: Option<JoinHandle<()>>,
    epoch: u64,
}

/// Owner of an [`IndexContext`] and the single interval timer of a carousel.
///
/// Transitions take the carousel as `host` so they can fire its hooks. The
/// context lock is never held while hooks run.
pub struct IndexStateMachine {
    context: Mutex<IndexContext>,
    interval: Mutex<Duration>,
    timer: Mutex<TimerSlot>,
    runtime: Handle,
}

impl IndexStateMachine {
    pub fn new(context: IndexContext, interval: Duration, runtime: Handle) -> Self {
        Self {
            context: Mutex::new(context),
            interval: Mutex::new(interval),
            timer: Mutex::new(TimerSlot::default()),
            runtime,
        }
    }

    /// Copy of the current context.
    pub fn snapshot(&self) -> IndexContext {
        self.context.lock().clone()
    }

    /// Current timer cadence.
    pub fn interval(&self) -> Duration {
        *self.interval.lock()
    }

    pub(crate) fn with_context<R>(&self, f: impl FnOnce(&mut IndexContext) -> R) -> R {
        f(&mut self.context.lock())
    }

    pub(crate) fn set_bounds(&self, min: usize, max: usize) {
        self.with_context(|ctx| ctx.set_bounds(min, max));
    }

    /// Start playing, or restart the timer if already playing.
    ///
    /// A no-op while force-paused: the playing flag, the timer and `onPlay`
    /// are all left untouched.
    pub(crate) fn play(&self, host: &Carousel) -> CadenceResult<()> {
        if self.with_context(|ctx| ctx.is_pause_force) {
            tracing::debug!(instance = %host.id(), "Play ignored while force-paused");
            return Ok(());
        }

        self.with_context(|ctx| ctx.is_playing = true);
        self.run_interval(host);
        host.run_hooks(HookKind::OnPlay)?;
        Ok(())
    }

    pub(crate) fn pause(&self, host: &Carousel) -> CadenceResult<()> {
        self.remove_interval();
        self.with_context(|ctx| ctx.is_playing = false);
        host.run_hooks(HookKind::OnPause)?;
        Ok(())
    }

    /// Hold playback regardless of play requests until released.
    pub(crate) fn pause_force(&self, host: &Carousel) {
        self.with_context(|ctx| ctx.is_pause_force = true);
        if self.remove_interval() {
            tracing::debug!(instance = %host.id(), "Timer held by forced pause");
        }
    }

    /// Release a forced pause, resuming the held timer if the carousel was
    /// playing when it was forced.
    pub(crate) fn pause_force_off(&self, host: &Carousel) {
        let resume = self.with_context(|ctx| {
            ctx.is_pause_force = false;
            ctx.is_playing
        });
        if resume {
            self.run_interval(host);
        }
    }

    pub(crate) fn next(&self, host: &Carousel) -> CadenceResult<()> {
        self.with_context(IndexContext::advance);
        host.run_hooks(HookKind::OnIndexChange)?;
        host.run_hooks(HookKind::OnNext)?;
        Ok(())
    }

    pub(crate) fn prev(&self, host: &Carousel) -> CadenceResult<()> {
        self.with_context(IndexContext::retreat);
        host.run_hooks(HookKind::OnIndexChange)?;
        host.run_hooks(HookKind::OnPrev)?;
        Ok(())
    }

    /// Move to `index`; out-of-range positions are rejected before any hook runs.
    pub(crate) fn jump_to_index(&self, host: &Carousel, index: usize) -> CadenceResult<()> {
        self.with_context(|ctx| ctx.jump_to(index))?;
        host.run_hooks(HookKind::OnIndexChange)?;
        Ok(())
    }

    /// Change the cadence, re-arming the timer only if one is live.
    pub(crate) fn update_interval_time(&self, host: &Carousel, interval: Duration) {
        *self.interval.lock() = interval;
        if self.timer_live() {
            self.run_interval(host);
        }
        tracing::debug!(
            instance = %host.id(),
            interval_ms = interval.as_millis() as u64,
            "Interval updated"
        );
    }

    /// (Re)arm the timer. The first tick is one full period away.
    pub(crate) fn run_interval(&self, host: &Carousel) {
        if self.with_context(|ctx| ctx.is_pause_force) {
            return;
        }

        let period = self.interval();
        let weak = host.downgrade();
        let mut slot = self.timer.lock();
        if let Some(handle) = slot.handle.take() {
            handle.abort();
        }
        slot.epoch += 1;
        let epoch = slot.epoch;

        slot.handle = Some(self.runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(carousel) = weak.upgrade() else {
                    break;
                };
                if !carousel.on_timer_tick(epoch) {
                    break;
                }
            }
        }));
        drop(slot);

        self.with_context(|ctx| ctx.timer_active = true);
    }

    /// Clear the timer without touching the playing flag.
    ///
    /// Returns whether a timer was live.
    pub(crate) fn remove_interval(&self) -> bool {
        let mut slot = self.timer.lock();
        slot.epoch += 1;
        let was_live = match slot.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        };
        drop(slot);

        self.with_context(|ctx| ctx.timer_active = false);
        was_live
    }

    /// Whether `epoch` belongs to the timer that is currently armed.
    pub(crate) fn is_current_timer(&self, epoch: u64) -> bool {
        let slot = self.timer.lock();
        slot.handle.is_some() && slot.epoch == epoch
    }

    fn timer_live(&self) -> bool {
        self.timer.lock().handle.is_some()
    }

    /// Advance after a timer tick. Unlike `next`, this does not fire `onNext`.
    fn advance_on_iteration(&self, host: &Carousel) -> CadenceResult<()> {
        self.with_context(IndexContext::advance);
        host.run_hooks(HookKind::OnIndexChange)?;
        Ok(())
    }

    fn update_direction(&self) -> Direction {
        self.with_context(IndexContext::update_direction)
    }
}

impl Drop for IndexStateMachine {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.get_mut().handle.take() {
            handle.abort();
        }
    }
}

/// Install the hooks every carousel starts with.
///
/// - `onIteration`: advance the index like `next()`
/// - `onIndexChange`: re-arm the timer while playing, so manual navigation
///   resets the cadence
/// - `onIndexChange`: recompute the last direction
pub(crate) fn install_default_hooks(registry: &HookRegistry<Carousel>) {
    registry.add_hook(
        HookKind::OnIteration,
        RegisteredHook::new(|carousel: &Carousel| {
            carousel
                .machine()
                .advance_on_iteration(carousel)
                .map_err(|err| carousel.escalate(err))
        })
        .with_description("advance on iteration"),
    );

    registry.add_hook(
        HookKind::OnIndexChange,
        RegisteredHook::observe(|carousel: &Carousel| {
            let machine = carousel.machine();
            if machine.with_context(|ctx| ctx.is_playing) {
                machine.run_interval(carousel);
            }
        })
        .with_description("reset interval on index change"),
    );

    registry.add_hook(
        HookKind::OnIndexChange,
        RegisteredHook::observe(|carousel: &Carousel| {
            let direction = carousel.machine().update_direction();
            tracing::trace!(instance = %carousel.id(), %direction, "Direction updated");
        })
        .with_description("track last direction"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CarouselConfig;
    use crate::hooks::{HookError, HookPriority};
    use parking_lot::Mutex as PlMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn carousel(from: usize, to: usize, interval_ms: u64) -> Carousel {
        let mut config = CarouselConfig::default();
        config.range.from = from;
        config.range.to = to;
        config.interval_time = interval_ms;
        Carousel::new(config).unwrap()
    }

    fn counter(carousel: &Carousel, kind: HookKind) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        carousel.add_hook(
            kind,
            RegisteredHook::observe(move |_: &Carousel| {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );
        count
    }

    #[tokio::test]
    async fn test_next_wraps_and_sets_direction() {
        let c = carousel(0, 3, 1000);
        c.machine().jump_to_index(&c, 3).unwrap();
        c.machine().next(&c).unwrap();

        let ctx = c.context();
        assert_eq!(ctx.curr_index, 0);
        assert_eq!(ctx.prev_index, 3);
        assert_eq!(ctx.last_direction, Direction::Next);
    }

    #[tokio::test]
    async fn test_prev_wraps_and_counts_as_forward() {
        let c = carousel(0, 3, 1000);
        c.machine().prev(&c).unwrap();

        let ctx = c.context();
        assert_eq!(ctx.curr_index, 3);
        assert_eq!(ctx.prev_index, 0);
        assert_eq!(ctx.last_direction, Direction::Next);
    }

    #[tokio::test]
    async fn test_index_change_fires_even_without_movement() {
        let c = carousel(2, 2, 1000);
        let changes = counter(&c, HookKind::OnIndexChange);
        let nexts = counter(&c, HookKind::OnNext);
        let prevs = counter(&c, HookKind::OnPrev);

        c.machine().next(&c).unwrap();
        c.machine().prev(&c).unwrap();

        assert_eq!(c.context().curr_index, 2);
        assert_eq!(changes.load(Ordering::SeqCst), 2);
        assert_eq!(nexts.load(Ordering::SeqCst), 1);
        assert_eq!(prevs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_jump_out_of_range_is_rejected_without_hooks() {
        let c = carousel(0, 3, 1000);
        let changes = counter(&c, HookKind::OnIndexChange);

        let err = c.machine().jump_to_index(&c, 7).unwrap_err();
        assert!(err.is_reported());
        assert_eq!(c.context().curr_index, 0);
        assert_eq!(changes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_hook_propagates_to_caller() {
        let c = carousel(0, 3, 1000);
        let after = counter(&c, HookKind::OnIndexChange);
        c.add_hook(
            HookKind::OnIndexChange,
            RegisteredHook::new(|_: &Carousel| Err(HookError::failed("broken observer")))
                .with_priority(HookPriority::HIGHEST),
        );

        let err = c.machine().next(&c).unwrap_err();
        assert!(!err.is_reported());
        // The index moved before dispatch; the lower-priority hook never ran.
        assert_eq!(c.context().curr_index, 1);
        assert_eq!(after.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_advances_index() {
        let c = carousel(0, 3, 1000);
        let iterations = counter(&c, HookKind::OnIteration);

        c.machine().play(&c).unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(iterations.load(Ordering::SeqCst), 2);
        assert_eq!(c.context().curr_index, 2);
        assert!(c.context().timer_active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_stops_ticks() {
        let c = carousel(0, 3, 1000);
        let iterations = counter(&c, HookKind::OnIteration);

        c.machine().play(&c).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        c.machine().pause(&c).unwrap();
        tokio::time::sleep(Duration::from_millis(5000)).await;

        assert_eq!(iterations.load(Ordering::SeqCst), 1);
        let ctx = c.context();
        assert!(!ctx.is_playing);
        assert!(!ctx.timer_active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_navigation_resets_cadence() {
        let c = carousel(0, 9, 1000);
        let iterations = counter(&c, HookKind::OnIteration);

        c.machine().play(&c).unwrap();
        tokio::time::sleep(Duration::from_millis(800)).await;
        c.machine().next(&c).unwrap();
        // Without the reset the first tick would land at t=1000.
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(iterations.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(iterations.load(Ordering::SeqCst), 1);
        assert_eq!(c.context().curr_index, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_interval_restarts_without_extra_tick() {
        let c = carousel(0, 9, 1000);
        let iterations = counter(&c, HookKind::OnIteration);

        c.machine().play(&c).unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        c.machine().update_interval_time(&c, Duration::from_millis(300));

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(iterations.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(iterations.load(Ordering::SeqCst), 1);
        assert_eq!(c.machine().interval(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_interval_while_stopped_does_not_start_timer() {
        let c = carousel(0, 3, 1000);
        let iterations = counter(&c, HookKind::OnIteration);

        c.machine().update_interval_time(&c, Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(1000)).await;

        assert_eq!(iterations.load(Ordering::SeqCst), 0);
        assert!(!c.context().timer_active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forced_pause_gates_play() {
        let c = carousel(0, 3, 1000);
        let plays = counter(&c, HookKind::OnPlay);
        let iterations = counter(&c, HookKind::OnIteration);

        c.machine().pause_force(&c);
        c.machine().play(&c).unwrap();
        tokio::time::sleep(Duration::from_millis(3000)).await;

        assert_eq!(plays.load(Ordering::SeqCst), 0);
        assert_eq!(iterations.load(Ordering::SeqCst), 0);
        let ctx = c.context();
        assert!(!ctx.is_playing);
        assert!(!ctx.timer_active);

        // Nothing was recorded, so releasing does not start playback.
        c.machine().pause_force_off(&c);
        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(plays.load(Ordering::SeqCst), 0);
        assert_eq!(iterations.load(Ordering::SeqCst), 0);
        assert!(!c.context().timer_active);

        c.machine().play(&c).unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(plays.load(Ordering::SeqCst), 1);
        assert_eq!(iterations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forced_pause_holds_running_timer() {
        let c = carousel(0, 3, 1000);
        let iterations = counter(&c, HookKind::OnIteration);

        c.machine().play(&c).unwrap();
        c.machine().pause_force(&c);
        // Navigation while held must not re-arm the timer.
        c.machine().next(&c).unwrap();
        tokio::time::sleep(Duration::from_millis(3000)).await;

        assert_eq!(iterations.load(Ordering::SeqCst), 0);
        assert!(!c.context().timer_active);
        assert!(c.context().is_playing);

        c.machine().pause_force_off(&c);
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(iterations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_default_hooks_installed() {
        let c = carousel(0, 3, 1000);
        assert_eq!(c.hook_count(HookKind::OnIteration), 1);
        assert_eq!(c.hook_count(HookKind::OnIndexChange), 2);
    }

    #[tokio::test]
    async fn test_observers_see_updated_direction() {
        let c = carousel(0, 3, 1000);
        let seen = Arc::new(PlMutex::new(Vec::new()));
        let sink = seen.clone();
        c.add_hook(
            HookKind::OnIndexChange,
            RegisteredHook::observe(move |c: &Carousel| {
                sink.lock().push(c.context().last_direction);
            }),
        );

        c.machine().next(&c).unwrap();
        c.machine().next(&c).unwrap();
        c.machine().prev(&c).unwrap();
        assert_eq!(
            seen.lock().as_slice(),
            &[Direction::Next, Direction::Next, Direction::Prev]
        );
    }
}
