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

//! The event queue: owns all events and multiplexes them across the timers.
//!
//! Every event the queue holds is in exactly one of the active set (sorted by
//! effective fire time, ties broken by insertion order) or the pending set
//! (fired, action in progress). At most one event is armed per timer
//! capability; events needing power-up are armed on the power-up timer when
//! one is present, and a sole timer serves both classes.
//!
//! Arming reconciliation runs after every mutation that could change "who
//! should be armed where". A re-entrancy guard keeps the disarm-redrive cycle
//! from nesting, so the queue is never observable with two armings on one
//! timer.

use chime_core::UnixTime;
use indexmap::IndexMap;

use crate::{
    action::{Action, ActionContext, ActionProgress},
    clock::WallClock,
    enums::{AckOutcome, DialogResponse, TimerKind, WakeMode},
    event::{AlarmEvent, Cookie},
    flags::EventFlags,
    hooks::{Hooks, IconCounter, StatusIndicator},
    timer::{AlarmTimer, TimerFire},
};

/// Default snooze step in minutes for a freshly created queue.
pub const DEFAULT_SNOOZE_MINS: u32 = 10;

/// Process-wide owner of all scheduled events.
#[derive(Debug)]
pub struct AlarmQueue {
    events: IndexMap<Cookie, AlarmEvent>,
    active: Vec<Cookie>,
    pending: Vec<Cookie>,
    armed_normal: Option<Cookie>,
    armed_powerup: Option<Cookie>,
    timer_normal: Option<Box<dyn AlarmTimer>>,
    timer_powerup: Option<Box<dyn AlarmTimer>>,
    default_snooze_mins: u32,
    next_seq: u64,
    clock: Box<dyn WallClock>,
    hooks: Hooks,
    icon: IconCounter,
    dirty: bool,
    muted: bool,
    reconciling: bool,
}

impl AlarmQueue {
    /// Creates a new [`AlarmQueue`] instance with null hooks and no timers.
    #[must_use]
    pub fn new(clock: Box<dyn WallClock>) -> Self {
        Self {
            events: IndexMap::new(),
            active: Vec::new(),
            pending: Vec::new(),
            armed_normal: None,
            armed_powerup: None,
            timer_normal: None,
            timer_powerup: None,
            default_snooze_mins: DEFAULT_SNOOZE_MINS,
            next_seq: 0,
            clock,
            hooks: Hooks::default(),
            icon: IconCounter::default(),
            dirty: false,
            muted: false,
            reconciling: false,
        }
    }

    /// Installs the collaborator hooks.
    pub fn set_hooks(&mut self, hooks: Hooks) {
        self.hooks = hooks;
    }

    /// Installs the statusbar indicator; call before adding events.
    pub fn set_indicator(&mut self, indicator: Box<dyn StatusIndicator>) {
        if self.icon.count() > 0 {
            log::warn!("Replacing statusbar indicator while {} icons held", self.icon.count());
        }
        self.icon = IconCounter::new(indicator);
    }

    /// Returns the number of active (not yet fired) events.
    #[must_use]
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Returns the number of pending (fired, unacknowledged) events.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns whether the queue holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the default snooze step in minutes.
    #[must_use]
    pub const fn default_snooze(&self) -> u32 {
        self.default_snooze_mins
    }

    /// Sets the default snooze step in minutes (must be positive).
    pub fn set_default_snooze(&mut self, mins: u32) {
        self.default_snooze_mins = mins;
        self.mark_changed();
    }

    /// Returns the cookie armed on the given timer capability, if any.
    #[must_use]
    pub const fn armed(&self, kind: TimerKind) -> Option<Cookie> {
        match kind {
            TimerKind::Normal => self.armed_normal,
            TimerKind::Powerup => self.armed_powerup,
        }
    }

    /// Installs or removes a timer capability, re-driving the arming.
    pub fn timer_set(&mut self, kind: TimerKind, timer: Option<Box<dyn AlarmTimer>>) {
        if let Some(old) = self.timer_slot_mut(kind).as_mut() {
            old.disarm();
        }
        self.set_armed(kind, None);

        if let Some(timer) = &timer {
            if kind == TimerKind::Powerup && !timer.is_powerup_capable() {
                log::warn!("Timer installed on the power-up slot is not power-up capable");
            }
        }

        *self.timer_slot_mut(kind) = timer;
        self.reconcile();
    }

    /// Adds an event, assigning a cookie when it has none.
    ///
    /// Cookies are seeded from the base time and incremented until unique.
    ///
    /// # Errors
    ///
    /// Returns an error if the event carries a negative cookie or one that is
    /// already present.
    pub fn add(&mut self, mut event: AlarmEvent) -> anyhow::Result<Cookie> {
        let mut cookie = event.cookie();
        if cookie < 0 {
            anyhow::bail!("invalid negative cookie {cookie}");
        }
        if cookie == 0 {
            cookie = event.base_time().as_i64();
            if cookie == 0 {
                cookie = 1;
            }
            while self.events.contains_key(&cookie) {
                cookie += 1;
            }
            event.set_cookie(cookie);
        } else if self.events.contains_key(&cookie) {
            anyhow::bail!("cookie {cookie} already present");
        }

        event.set_seq(self.next_seq);
        self.next_seq += 1;

        if event.flags().contains(EventFlags::SHOW_ICON) {
            self.icon.show();
        }

        log::debug!("Adding event {cookie} due {}", event.effective_time().to_rfc3339());
        self.events.insert(cookie, event);
        self.insert_active(cookie);
        self.mark_changed();
        self.reconcile();
        Ok(cookie)
    }

    /// Cancels and destroys the event with the given cookie.
    ///
    /// Returns whether it was found. An in-flight action is not aborted; its
    /// eventual acknowledgement is dropped.
    pub fn remove(&mut self, cookie: Cookie) -> bool {
        if !self.events.contains_key(&cookie) {
            return false;
        }
        log::debug!("Removing event {cookie}");
        self.disarm_if_armed(cookie);
        if self.events[&cookie].action().is_awaiting_dialog() {
            self.hooks.dialogs.dismiss(cookie);
        }
        self.destroy(cookie);
        true
    }

    /// Looks up an event across both sets.
    #[must_use]
    pub fn get(&self, cookie: Cookie) -> Option<&AlarmEvent> {
        self.events.get(&cookie)
    }

    /// Enumerates cookies of events whose effective time falls within
    /// `[time_lo, time_hi]` and whose flags match `values` under `mask`.
    ///
    /// The active set is scanned in time order with an early stop past
    /// `time_hi`; pending events are appended after.
    #[must_use]
    pub fn query(
        &self,
        time_lo: UnixTime,
        time_hi: UnixTime,
        mask: EventFlags,
        values: EventFlags,
    ) -> Vec<Cookie> {
        let matches = |event: &AlarmEvent| (event.flags() & mask) == (values & mask);
        let mut out = Vec::new();

        for cookie in &self.active {
            let event = &self.events[cookie];
            let time = event.effective_time();
            if time < time_lo {
                continue;
            }
            if time > time_hi {
                break;
            }
            if matches(event) {
                out.push(*cookie);
            }
        }

        for cookie in &self.pending {
            let event = &self.events[cookie];
            let time = event.effective_time();
            if time >= time_lo && time <= time_hi && matches(event) {
                out.push(*cookie);
            }
        }

        out
    }

    /// Returns the effective time and wake mode of the earliest event needing
    /// power-up, for the RTC hint files.
    #[must_use]
    pub fn next_boot(&self) -> Option<(UnixTime, WakeMode)> {
        let cookies = self.query(
            UnixTime::new(0),
            UnixTime::new(u64::MAX),
            EventFlags::BOOT,
            EventFlags::BOOT,
        );
        cookies.first().map(|cookie| {
            let event = &self.events[cookie];
            let mode = if event.flags().contains(EventFlags::ACTDEAD) {
                WakeMode::ActDead
            } else {
                WakeMode::Powerup
            };
            (event.effective_time(), mode)
        })
    }

    /// Handles a timer fire delivered from the event loop.
    ///
    /// Fires whose token no longer matches the armed slot are stale (the
    /// arming was replaced underneath an in-flight delivery) and are dropped.
    pub fn handle_fire(&mut self, fire: TimerFire) {
        let TimerFire { kind, token, delayed } = fire;
        if self.armed(kind) != Some(token) {
            log::debug!("Dropping stale fire for event {token} on {kind}");
            return;
        }
        self.set_armed(kind, None);
        if let Some(timer) = self.timer_slot_mut(kind).as_mut() {
            timer.confirm_fire(token);
        }
        self.fire_event(token, delayed);
        self.reconcile();
    }

    /// Delivers a dialog (or power-up UI) response to a pending event.
    pub fn handle_dialog_response(&mut self, cookie: Cookie, response: DialogResponse) {
        self.drive_action(cookie, |action, ctx| action.dialog_response(response, ctx));
    }

    /// Handles the dialog resend timeout for a pending event.
    pub fn handle_dialog_timeout(&mut self, cookie: Cookie) {
        self.drive_action(cookie, |action, ctx| action.dialog_timeout(ctx));
    }

    /// Resumes all actions gated on connectivity.
    pub fn handle_connectivity_online(&mut self) {
        let waiting: Vec<Cookie> = self
            .pending
            .iter()
            .copied()
            .filter(|c| self.events[c].action().is_awaiting_connectivity())
            .collect();
        for cookie in waiting {
            self.drive_action(cookie, |action, ctx| action.connectivity_online(ctx));
        }
    }

    /// Handles a spawned child exiting for a pending exec event.
    pub fn handle_child_exited(&mut self, cookie: Cookie, code: Option<i32>) {
        self.drive_action(cookie, |action, ctx| action.child_exited(code, ctx));
    }

    /// Propagates a wall-clock change to every event and both timers.
    ///
    /// Recurring events with BACK_RESCHEDULE pull their base back to within
    /// one interval; unarmed active events whose effective time is now in the
    /// past fire immediately as delayed.
    pub fn time_changed(&mut self) {
        let now = self.clock.now();
        log::info!("Wall clock changed, now {}", now.to_rfc3339());

        let cookies: Vec<Cookie> = self
            .active
            .iter()
            .chain(self.pending.iter())
            .copied()
            .collect();

        for cookie in cookies {
            if !self.events.contains_key(&cookie) {
                continue;
            }
            let rescheduled = self
                .events
                .get_mut(&cookie)
                .is_some_and(|event| event.back_reschedule(now));
            if rescheduled {
                self.event_time_changed(cookie);
                continue;
            }

            let armed = self.armed_normal == Some(cookie) || self.armed_powerup == Some(cookie);
            let is_active = self.active.contains(&cookie);
            if is_active && !armed && self.events[&cookie].effective_time() < now {
                self.fire_event(cookie, true);
            }
        }

        for kind in [TimerKind::Normal, TimerKind::Powerup] {
            if let Some(timer) = self.timer_slot_mut(kind).as_mut() {
                timer.time_changed();
            }
        }
        self.reconcile();
    }

    /// Returns events in persisted order: pending first, then active.
    pub fn events_save_order(&self) -> impl Iterator<Item = &AlarmEvent> {
        self.pending
            .iter()
            .chain(self.active.iter())
            .map(|c| &self.events[c])
    }

    /// Suppresses (or re-enables) change tracking; used during bulk load.
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Takes and clears the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn mark_changed(&mut self) {
        if !self.muted {
            self.dirty = true;
        }
    }

    fn timer_slot_mut(&mut self, kind: TimerKind) -> &mut Option<Box<dyn AlarmTimer>> {
        match kind {
            TimerKind::Normal => &mut self.timer_normal,
            TimerKind::Powerup => &mut self.timer_powerup,
        }
    }

    fn set_armed(&mut self, kind: TimerKind, cookie: Option<Cookie>) {
        match kind {
            TimerKind::Normal => self.armed_normal = cookie,
            TimerKind::Powerup => self.armed_powerup = cookie,
        }
    }

    fn sort_key(&self, cookie: Cookie) -> (UnixTime, u64) {
        let event = &self.events[&cookie];
        (event.effective_time(), event.seq())
    }

    fn insert_active(&mut self, cookie: Cookie) {
        let key = self.sort_key(cookie);
        let pos = self
            .active
            .partition_point(|c| self.sort_key(*c) <= key);
        self.active.insert(pos, cookie);
    }

    fn resort_active(&mut self, cookie: Cookie) {
        if let Some(pos) = self.active.iter().position(|c| *c == cookie) {
            self.active.remove(pos);
            self.insert_active(cookie);
        }
    }

    /// Re-seats an event whose effective time changed: a stale arming is
    /// released, the active ordering restored, and the arming re-driven.
    fn event_time_changed(&mut self, cookie: Cookie) {
        self.disarm_if_armed(cookie);
        self.resort_active(cookie);
        self.mark_changed();
        self.reconcile();
    }

    fn disarm_if_armed(&mut self, cookie: Cookie) {
        for kind in [TimerKind::Normal, TimerKind::Powerup] {
            if self.armed(kind) == Some(cookie) {
                if let Some(timer) = self.timer_slot_mut(kind).as_mut() {
                    timer.disarm();
                }
                self.set_armed(kind, None);
            }
        }
    }

    /// Tears down and drops an event.
    fn destroy(&mut self, cookie: Cookie) {
        self.disarm_if_armed(cookie);
        self.active.retain(|c| *c != cookie);
        self.pending.retain(|c| *c != cookie);
        if let Some(event) = self.events.swap_remove(&cookie) {
            if event.flags().contains(EventFlags::SHOW_ICON) {
                self.icon.hide();
            }
        }
        self.mark_changed();
        self.reconcile();
    }

    /// Determines which event should be armed on the given capability slot.
    fn target_for(&self, kind: TimerKind) -> Option<Cookie> {
        let (this, other) = match kind {
            TimerKind::Normal => (self.timer_normal.is_some(), self.timer_powerup.is_some()),
            TimerKind::Powerup => (self.timer_powerup.is_some(), self.timer_normal.is_some()),
        };
        if !this {
            return None;
        }
        if !other {
            // A sole timer serves both classes.
            return self.active.first().copied();
        }
        let need = kind == TimerKind::Powerup;
        self.active
            .iter()
            .copied()
            .find(|c| self.events[c].needs_power_up() == need)
    }

    /// Converges the armed slots onto the target events.
    ///
    /// Guarded against re-entry so an intentional arm replacement cannot be
    /// observed mid-swap.
    fn reconcile(&mut self) {
        if self.reconciling {
            return;
        }
        self.reconciling = true;

        loop {
            let mut moved = false;
            for kind in [TimerKind::Normal, TimerKind::Powerup] {
                let target = self.target_for(kind);
                let armed = self.armed(kind);
                if armed == target {
                    continue;
                }

                if let Some(token) = armed {
                    // The disarm return is the cancel callback; clearing the
                    // slot re-drives the arming on the next pass.
                    if let Some(timer) = self.timer_slot_mut(kind).as_mut() {
                        let cancelled = timer.disarm();
                        debug_assert_eq!(cancelled, Some(token));
                    }
                    self.set_armed(kind, None);
                    moved = true;
                    continue;
                }

                if let Some(cookie) = target {
                    let at = self.events[&cookie].effective_time();
                    if let Some(timer) = self.timer_slot_mut(kind).as_mut() {
                        if timer.arm(at, cookie) {
                            self.set_armed(kind, Some(cookie));
                            moved = true;
                        } else {
                            log::debug!("Timer {kind} refused arming for event {cookie}");
                        }
                    }
                }
            }
            if !moved {
                break;
            }
        }

        self.reconciling = false;
    }

    /// Drives an event through its fire transition.
    fn fire_event(&mut self, cookie: Cookie, delayed: bool) {
        let now = self.clock.now();

        enum Step {
            Postponed,
            Run(bool),
        }

        let step = {
            let Some(event) = self.events.get_mut(&cookie) else {
                return;
            };
            if delayed && event.flags().contains(EventFlags::POSTPONE_DELAYED) {
                if event.postpone_by_days(now) {
                    Step::Postponed
                } else {
                    // Missed by less than a day: run as if on time.
                    Step::Run(false)
                }
            } else {
                Step::Run(delayed)
            }
        };

        match step {
            Step::Postponed => {
                log::info!(
                    "Postponing missed event {cookie} to {}",
                    self.events[&cookie].effective_time().to_rfc3339()
                );
                self.event_time_changed(cookie);
            }
            Step::Run(delayed) => {
                self.active.retain(|c| *c != cookie);
                self.pending.push(cookie);
                self.mark_changed();
                self.drive_action(cookie, |action, ctx| action.run(delayed, ctx));
            }
        }
    }

    /// Runs one action step and applies any resulting acknowledgement.
    fn drive_action<F>(&mut self, cookie: Cookie, f: F)
    where
        F: FnOnce(&mut Action, &mut ActionContext) -> ActionProgress,
    {
        let progress = {
            let Some(event) = self.events.get_mut(&cookie) else {
                // Detached while the action was in flight: drop the result.
                log::debug!("Dropping action step for unknown event {cookie}");
                return;
            };
            let alarm_time = event.effective_time();
            let mut ctx = ActionContext {
                cookie,
                alarm_time,
                hooks: &mut self.hooks,
            };
            f(event.action_mut(), &mut ctx)
        };

        match progress {
            ActionProgress::Ack(outcome) => self.finish_ack(cookie, outcome),
            ActionProgress::Pending | ActionProgress::Ignored => {}
        }
    }

    /// Applies an acknowledgement outcome to a fired event.
    fn finish_ack(&mut self, cookie: Cookie, outcome: AckOutcome) {
        if !self.events.contains_key(&cookie) {
            return;
        }
        let now = self.clock.now();

        match outcome {
            AckOutcome::Snooze => {
                let default = self.default_snooze_mins;
                if let Some(event) = self.events.get_mut(&cookie) {
                    event.snooze(now, default);
                }
                self.reenter_active(cookie);
            }
            AckOutcome::Normal => {
                let recurring = self.events[&cookie].recurrence().is_some();
                if recurring {
                    let advanced = self
                        .events
                        .get_mut(&cookie)
                        .is_some_and(|event| event.advance_recurrence(now));
                    if advanced {
                        self.reenter_active(cookie);
                    } else {
                        log::debug!("Recurrence of event {cookie} exhausted");
                        self.destroy(cookie);
                    }
                } else {
                    self.destroy(cookie);
                }
            }
        }
    }

    /// Moves a fired event back into the active set after snooze/recur.
    fn reenter_active(&mut self, cookie: Cookie) {
        self.pending.retain(|c| *c != cookie);
        self.active.retain(|c| *c != cookie);
        self.insert_active(cookie);
        self.mark_changed();
        self.reconcile();
    }
}
