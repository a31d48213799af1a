// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2026 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! The timer capability interface and the manually driven test timer.
//!
//! A timer holds at most one arming. Exactly one of fire or cancel is
//! delivered per successful arm: fires travel through the
//! [`TimerFireSender`](crate::runner::TimerFireSender) into the daemon loop,
//! while cancels are returned synchronously from [`AlarmTimer::disarm`] to the
//! queue, which is the only caller.

use std::{
    fmt::Debug,
    sync::{Arc, Mutex},
};

use chime_core::UnixTime;

use crate::{
    enums::TimerKind,
    event::Cookie,
    runner::TimerFireSender,
};

/// Standard message for a poisoned lock on a timer handle.
pub const MUTEX_POISONED: &str = "Mutex was poisoned";

/// A timer fire delivered into the daemon event loop.
///
/// `delayed` is true iff the fire is delivered strictly after the armed
/// instant (the daemon was asleep or crashed through it).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerFire {
    /// The capability class the firing timer serves.
    pub kind: TimerKind,
    /// The cookie of the armed event.
    pub token: Cookie,
    /// Whether the fire is delivered after its nominal instant.
    pub delayed: bool,
}

/// A single-shot wakeup source armed at a wall-clock instant.
pub trait AlarmTimer: Debug {
    /// Returns the capability class this timer serves in the queue.
    fn kind(&self) -> TimerKind;

    /// Schedules a fire for `token` at `at`, replacing any prior arming.
    ///
    /// Returns false on refusal (resource exhausted); the caller treats this
    /// as "event stays unqueued" and retries on the next reconciliation.
    fn arm(&mut self, at: UnixTime, token: Cookie) -> bool;

    /// Cancels the current arming.
    ///
    /// Returns the cancelled token if an arming was present; this return is
    /// the cancel notification and is delivered exactly once.
    fn disarm(&mut self) -> Option<Cookie>;

    /// Returns the currently armed token, if any.
    fn armed_token(&self) -> Option<Cookie>;

    /// Clears the internal arming state after the queue consumed a fire for
    /// `token`. Fires for other tokens are stale and ignored.
    fn confirm_fire(&mut self, token: Cookie);

    /// Re-evaluates the pending arming against the new wall clock; an armed
    /// instant now in the past MUST fire as `delayed = true`.
    fn time_changed(&mut self);

    /// Declares whether this timer can wake a powered-off device.
    fn is_powerup_capable(&self) -> bool;
}

#[derive(Debug)]
struct TestTimerInner {
    kind: TimerKind,
    powerup_capable: bool,
    armed: Option<(UnixTime, Cookie)>,
    now: UnixTime,
    refuse_arms: bool,
    sender: Arc<dyn TimerFireSender>,
}

/// A manually advanced timer for use with a `TestClock`.
///
/// `TestTimer` simulates time progression in a controlled environment. Cloned
/// handles share state, so a test can keep one handle while the queue owns
/// the other as a boxed [`AlarmTimer`].
#[derive(Clone, Debug)]
pub struct TestTimer {
    inner: Arc<Mutex<TestTimerInner>>,
}

impl TestTimer {
    /// Creates a new [`TestTimer`] instance.
    #[must_use]
    pub fn new(
        kind: TimerKind,
        powerup_capable: bool,
        start: UnixTime,
        sender: Arc<dyn TimerFireSender>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TestTimerInner {
                kind,
                powerup_capable,
                armed: None,
                now: start,
                refuse_arms: false,
                sender,
            })),
        }
    }

    /// Makes subsequent `arm` calls fail, simulating backend exhaustion.
    pub fn set_refuse_arms(&self, refuse: bool) {
        self.inner.lock().expect(MUTEX_POISONED).refuse_arms = refuse;
    }

    /// Returns the instant the timer is armed for, if any.
    #[must_use]
    pub fn armed_at(&self) -> Option<UnixTime> {
        self.inner
            .lock()
            .expect(MUTEX_POISONED)
            .armed
            .map(|(at, _)| at)
    }

    /// Advances the timer's view of the wall clock, delivering the armed fire
    /// if its instant has been reached. The fire is `delayed` only when `to`
    /// is strictly past the armed instant.
    pub fn advance(&self, to: UnixTime) {
        let mut inner = self.inner.lock().expect(MUTEX_POISONED);
        inner.now = to;
        if let Some((at, token)) = inner.armed {
            if at <= to {
                inner.armed = None;
                let fire = TimerFire {
                    kind: inner.kind,
                    token,
                    delayed: to > at,
                };
                inner.sender.send(fire);
            }
        }
    }

    /// Moves the timer's view of the wall clock without delivering fires,
    /// simulating a wall-clock jump underneath an armed timer.
    pub fn jump_clock(&self, to: UnixTime) {
        self.inner.lock().expect(MUTEX_POISONED).now = to;
    }
}

impl AlarmTimer for TestTimer {
    fn kind(&self) -> TimerKind {
        self.inner.lock().expect(MUTEX_POISONED).kind
    }

    fn arm(&mut self, at: UnixTime, token: Cookie) -> bool {
        let mut inner = self.inner.lock().expect(MUTEX_POISONED);
        if inner.refuse_arms {
            return false;
        }
        inner.armed = Some((at, token));
        true
    }

    fn disarm(&mut self) -> Option<Cookie> {
        let mut inner = self.inner.lock().expect(MUTEX_POISONED);
        inner.armed.take().map(|(_, token)| token)
    }

    fn armed_token(&self) -> Option<Cookie> {
        self.inner
            .lock()
            .expect(MUTEX_POISONED)
            .armed
            .map(|(_, token)| token)
    }

    fn confirm_fire(&mut self, token: Cookie) {
        let mut inner = self.inner.lock().expect(MUTEX_POISONED);
        if let Some((_, armed)) = inner.armed {
            if armed == token {
                inner.armed = None;
            }
        }
    }

    fn time_changed(&mut self) {
        let mut inner = self.inner.lock().expect(MUTEX_POISONED);
        let now = inner.now;
        if let Some((at, token)) = inner.armed {
            if at < now {
                inner.armed = None;
                let fire = TimerFire {
                    kind: inner.kind,
                    token,
                    delayed: true,
                };
                inner.sender.send(fire);
            }
        }
    }

    fn is_powerup_capable(&self) -> bool {
        self.inner.lock().expect(MUTEX_POISONED).powerup_capable
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use rstest::rstest;

    use super::*;
    use crate::enums::TimerKind;

    #[derive(Debug, Default)]
    struct CollectingSender {
        fires: StdMutex<Vec<TimerFire>>,
    }

    impl TimerFireSender for CollectingSender {
        fn send(&self, fire: TimerFire) {
            self.fires.lock().expect(MUTEX_POISONED).push(fire);
        }
    }

    fn timer_with_sender() -> (TestTimer, Arc<CollectingSender>) {
        let sender = Arc::new(CollectingSender::default());
        let timer = TestTimer::new(
            TimerKind::Normal,
            false,
            UnixTime::new(0),
            sender.clone(),
        );
        (timer, sender)
    }

    #[rstest]
    fn test_fire_at_exact_instant_is_not_delayed() {
        let (mut timer, sender) = timer_with_sender();
        assert!(timer.arm(UnixTime::new(10), 1));
        timer.advance(UnixTime::new(10));
        let fires = sender.fires.lock().unwrap();
        assert_eq!(
            *fires,
            vec![TimerFire {
                kind: TimerKind::Normal,
                token: 1,
                delayed: false
            }]
        );
        assert!(timer.armed_token().is_none());
    }

    #[rstest]
    fn test_fire_past_instant_is_delayed() {
        let (mut timer, sender) = timer_with_sender();
        assert!(timer.arm(UnixTime::new(10), 1));
        timer.advance(UnixTime::new(11));
        assert!(sender.fires.lock().unwrap()[0].delayed);
    }

    #[rstest]
    fn test_disarm_returns_token_exactly_once() {
        let (mut timer, sender) = timer_with_sender();
        assert!(timer.arm(UnixTime::new(10), 7));
        assert_eq!(timer.disarm(), Some(7));
        assert_eq!(timer.disarm(), None);
        assert!(sender.fires.lock().unwrap().is_empty());
    }

    #[rstest]
    fn test_arm_replaces_prior_arming() {
        let (mut timer, _sender) = timer_with_sender();
        assert!(timer.arm(UnixTime::new(10), 1));
        assert!(timer.arm(UnixTime::new(20), 2));
        assert_eq!(timer.armed_token(), Some(2));
    }

    #[rstest]
    fn test_refused_arm_leaves_timer_empty() {
        let (mut timer, _sender) = timer_with_sender();
        timer.set_refuse_arms(true);
        assert!(!timer.arm(UnixTime::new(10), 1));
        assert!(timer.armed_token().is_none());
    }

    #[rstest]
    fn test_time_changed_fires_past_arming_as_delayed() {
        let (mut timer, sender) = timer_with_sender();
        assert!(timer.arm(UnixTime::new(100), 3));
        timer.jump_clock(UnixTime::new(150));
        timer.time_changed();
        let fires = sender.fires.lock().unwrap();
        assert_eq!(fires.len(), 1);
        assert!(fires[0].delayed);
    }

    #[rstest]
    fn test_time_changed_keeps_future_arming() {
        let (mut timer, sender) = timer_with_sender();
        assert!(timer.arm(UnixTime::new(100), 3));
        timer.jump_clock(UnixTime::new(50));
        timer.time_changed();
        assert!(sender.fires.lock().unwrap().is_empty());
        assert_eq!(timer.armed_token(), Some(3));
    }
}
