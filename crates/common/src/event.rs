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

//! Scheduled events and their snooze/recurrence arithmetic.
//!
//! An [`AlarmEvent`] binds a fire time to an owned [`Action`]. The queue is
//! the sole owner; everything here is pure state transition so the scheduling
//! decisions stay testable without timers.

use chime_core::{SECS_PER_DAY, SECS_PER_MIN, UnixTime};

use crate::{action::Action, flags::EventFlags};

/// Stable unique identifier of an event within a queue lifetime.
pub type Cookie = i64;

/// Marker for an unbounded recurrence count.
pub const RECUR_UNBOUNDED: i32 = -1;

/// Recurrence state for a repeating event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Recurrence {
    /// Interval between iterations in minutes (> 0).
    pub interval_mins: u32,
    /// Remaining iteration count, or [`RECUR_UNBOUNDED`].
    pub remaining: i32,
    /// The un-snoozed base of the current iteration.
    pub real_time: UnixTime,
}

impl Recurrence {
    /// Creates a new [`Recurrence`] instance.
    #[must_use]
    pub const fn new(interval_mins: u32, remaining: i32, real_time: UnixTime) -> Self {
        Self {
            interval_mins,
            remaining,
            real_time,
        }
    }

    /// Returns whether the recurrence repeats without bound.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.remaining == RECUR_UNBOUNDED
    }

    const fn interval_secs(&self) -> u64 {
        self.interval_mins as u64 * SECS_PER_MIN
    }
}

/// The scheduling unit: a fire time bound to an owned action.
#[derive(Debug)]
pub struct AlarmEvent {
    cookie: Cookie,
    base_time: UnixTime,
    snooze_accum_mins: u32,
    snooze_step_mins: u32,
    recurrence: Option<Recurrence>,
    action: Action,
    seq: u64,
}

impl AlarmEvent {
    /// Creates a new one-shot [`AlarmEvent`] instance.
    ///
    /// A `snooze_step_mins` of zero means "use the queue default".
    #[must_use]
    pub const fn new(base_time: UnixTime, snooze_step_mins: u32, action: Action) -> Self {
        Self {
            cookie: 0,
            base_time,
            snooze_accum_mins: 0,
            snooze_step_mins,
            recurrence: None,
            action,
            seq: 0,
        }
    }

    /// Creates a new recurring [`AlarmEvent`] instance.
    ///
    /// A `real_time` of zero is taken to mean "same as `base_time`", matching
    /// reloaded documents from older daemons.
    #[must_use]
    pub fn new_recurring(
        base_time: UnixTime,
        snooze_step_mins: u32,
        action: Action,
        mut recurrence: Recurrence,
    ) -> Self {
        if recurrence.real_time == UnixTime::default() {
            recurrence.real_time = base_time;
        }
        Self {
            cookie: 0,
            base_time,
            snooze_accum_mins: 0,
            snooze_step_mins,
            recurrence: Some(recurrence),
            action,
            seq: 0,
        }
    }

    /// Returns the event's cookie (zero until assigned by a queue).
    #[must_use]
    pub const fn cookie(&self) -> Cookie {
        self.cookie
    }

    pub(crate) fn set_cookie(&mut self, cookie: Cookie) {
        self.cookie = cookie;
    }

    /// Returns the nominal (un-snoozed) due time.
    #[must_use]
    pub const fn base_time(&self) -> UnixTime {
        self.base_time
    }

    /// Returns the accumulated snooze in minutes.
    #[must_use]
    pub const fn snooze_accum_mins(&self) -> u32 {
        self.snooze_accum_mins
    }

    pub(crate) fn set_snooze_accum_mins(&mut self, mins: u32) {
        self.snooze_accum_mins = mins;
    }

    /// Returns the per-event snooze step in minutes (zero = queue default).
    #[must_use]
    pub const fn snooze_step_mins(&self) -> u32 {
        self.snooze_step_mins
    }

    /// Returns the effective fire time including accumulated snooze.
    #[must_use]
    pub const fn effective_time(&self) -> UnixTime {
        UnixTime::new(self.base_time.as_u64() + self.snooze_accum_mins as u64 * SECS_PER_MIN)
    }

    /// Returns the recurrence state, if recurring.
    #[must_use]
    pub const fn recurrence(&self) -> Option<&Recurrence> {
        self.recurrence.as_ref()
    }

    /// Returns a reference to the owned action.
    #[must_use]
    pub const fn action(&self) -> &Action {
        &self.action
    }

    /// Returns a mutable reference to the owned action.
    pub fn action_mut(&mut self) -> &mut Action {
        &mut self.action
    }

    /// Returns the action's flags.
    #[must_use]
    pub const fn flags(&self) -> EventFlags {
        self.action.flags()
    }

    /// Returns whether the event must be armed on a power-up-capable timer.
    #[must_use]
    pub const fn needs_power_up(&self) -> bool {
        self.action.needs_power_up()
    }

    pub(crate) const fn seq(&self) -> u64 {
        self.seq
    }

    pub(crate) fn set_seq(&mut self, seq: u64) {
        self.seq = seq;
    }

    /// Applies one snooze step.
    ///
    /// The accumulator grows by the event's step (or `default_step_mins` when
    /// the event's step is zero). If the effective time is still in the past
    /// the accumulator is re-based so the event lands exactly one step into
    /// the future.
    pub fn snooze(&mut self, now: UnixTime, default_step_mins: u32) {
        let step = if self.snooze_step_mins > 0 {
            self.snooze_step_mins
        } else {
            default_step_mins
        };

        self.snooze_accum_mins += step;

        if self.effective_time() < now {
            let behind_mins = now.secs_since(self.base_time).div_ceil(SECS_PER_MIN);
            self.snooze_accum_mins = behind_mins as u32 + step;
        }
    }

    /// Advances the recurrence cursor past `now`.
    ///
    /// Returns false when a bounded recurrence is exhausted, in which case the
    /// event terminates.
    pub fn advance_recurrence(&mut self, now: UnixTime) -> bool {
        let Some(recurrence) = self.recurrence.as_mut() else {
            return false;
        };

        let cycles = (now.secs_since(recurrence.real_time) / recurrence.interval_secs()) as i64 + 1;

        if !recurrence.is_unbounded() {
            if i64::from(recurrence.remaining) < cycles {
                return false;
            }
            recurrence.remaining -= cycles as i32;
        }

        recurrence.real_time += cycles as u64 * recurrence.interval_secs();
        self.base_time = recurrence.real_time;
        self.snooze_accum_mins = 0;
        true
    }

    /// Applies the POSTPONE_DELAYED miss policy.
    ///
    /// When missed by more than a day, advances the base time forward in
    /// whole days past `now` and returns true; the action must not run.
    pub fn postpone_by_days(&mut self, now: UnixTime) -> bool {
        let miss = now.secs_since(self.base_time);
        if miss <= SECS_PER_DAY {
            return false;
        }
        let days = miss.div_ceil(SECS_PER_DAY);
        self.base_time += days * SECS_PER_DAY;
        true
    }

    /// Applies the BACK_RESCHEDULE policy after a wall-clock change.
    ///
    /// If the effective time ended up more than one interval in the future,
    /// pulls the recurrence base back to within one interval of `now` and
    /// clears the snooze. Returns whether a pullback happened.
    pub fn back_reschedule(&mut self, now: UnixTime) -> bool {
        if !self.flags().contains(EventFlags::BACK_RESCHEDULE) {
            return false;
        }
        let effective = self.effective_time();
        let Some(recurrence) = self.recurrence.as_mut() else {
            return false;
        };
        let interval_secs = recurrence.interval_secs();
        if interval_secs == 0 || effective.as_u64() <= now.as_u64() + interval_secs {
            return false;
        }

        let intervals = effective.secs_since(now) / interval_secs;
        recurrence.real_time = effective - intervals * interval_secs;
        self.base_time = recurrence.real_time;
        self.snooze_accum_mins = 0;
        true
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::action::Action;

    fn event_at(base: u64, step_mins: u32) -> AlarmEvent {
        AlarmEvent::new(UnixTime::new(base), step_mins, Action::null())
    }

    fn recurring_at(base: u64, interval_mins: u32, remaining: i32) -> AlarmEvent {
        AlarmEvent::new_recurring(
            UnixTime::new(base),
            0,
            Action::null(),
            Recurrence::new(interval_mins, remaining, UnixTime::new(base)),
        )
    }

    #[rstest]
    fn test_effective_time_includes_snooze() {
        let mut event = event_at(1_000, 5);
        assert_eq!(event.effective_time(), UnixTime::new(1_000));
        event.snooze(UnixTime::new(900), 10);
        assert_eq!(event.effective_time(), UnixTime::new(1_300));
    }

    #[rstest]
    fn test_snooze_accumulates_without_drift() {
        // Three snoozes measured from the original base: +5, +10, +15 min.
        let mut event = event_at(10_000, 5);
        for (i, expected) in [(1_u64, 10_300), (2, 10_600), (3, 10_900)] {
            let now = UnixTime::new(10_000 + i);
            event.snooze(now, 10);
            assert_eq!(event.effective_time(), UnixTime::new(expected));
        }
    }

    #[rstest]
    fn test_snooze_uses_queue_default_when_step_is_zero() {
        let mut event = event_at(10_000, 0);
        event.snooze(UnixTime::new(10_001), 10);
        assert_eq!(event.effective_time(), UnixTime::new(10_600));
    }

    #[rstest]
    fn test_snooze_rebases_when_still_in_past() {
        let mut event = event_at(10_000, 5);
        // Way past the base: a plain +5 min would still land in the past.
        let now = UnixTime::new(10_000 + 3 * 3_600);
        event.snooze(now, 10);

        let effective = event.effective_time();
        assert!(effective > now);
        assert!(effective.secs_since(now) <= 5 * SECS_PER_MIN);
    }

    #[rstest]
    fn test_advance_recurrence_single_cycle() {
        let mut event = recurring_at(10_000, 60, RECUR_UNBOUNDED);
        assert!(event.advance_recurrence(UnixTime::new(10_001)));
        assert_eq!(event.base_time(), UnixTime::new(13_600));
        assert_eq!(event.snooze_accum_mins(), 0);
    }

    #[rstest]
    fn test_advance_recurrence_skips_elapsed_cycles() {
        let mut event = recurring_at(10_000, 60, RECUR_UNBOUNDED);
        // Two full hours elapsed: three cycles pass at once.
        assert!(event.advance_recurrence(UnixTime::new(10_000 + 2 * 3_600)));
        assert_eq!(event.base_time(), UnixTime::new(10_000 + 3 * 3_600));
    }

    #[rstest]
    fn test_advance_recurrence_decrements_bounded_count() {
        let mut event = recurring_at(10_000, 60, 2);
        assert!(event.advance_recurrence(UnixTime::new(10_001)));
        assert_eq!(event.recurrence().unwrap().remaining, 1);
        assert!(event.advance_recurrence(UnixTime::new(13_601)));
        assert_eq!(event.recurrence().unwrap().remaining, 0);
        // Third advance exceeds the remaining count.
        assert!(!event.advance_recurrence(UnixTime::new(17_201)));
    }

    #[rstest]
    fn test_advance_recurrence_monotonic_real_time() {
        let mut event = recurring_at(50_000, 30, RECUR_UNBOUNDED);
        let old = event.recurrence().unwrap().real_time;
        let now = UnixTime::new(55_000);
        assert!(event.advance_recurrence(now));
        let new = event.recurrence().unwrap().real_time;
        assert!(new > old);
        assert!(new >= now - 30 * SECS_PER_MIN);
    }

    #[rstest]
    fn test_postpone_by_days_beyond_one_day() {
        // Missed by 25 h: jump forward two whole days.
        let base = 100_000;
        let mut event = event_at(base, 0);
        let now = UnixTime::new(base + 25 * 3_600);
        assert!(event.postpone_by_days(now));
        assert_eq!(event.base_time(), UnixTime::new(base + 2 * SECS_PER_DAY));
        assert!(event.base_time() > now);
    }

    #[rstest]
    fn test_postpone_by_days_within_one_day() {
        let mut event = event_at(100_000, 0);
        let now = UnixTime::new(100_000 + 23 * 3_600);
        assert!(!event.postpone_by_days(now));
        assert_eq!(event.base_time(), UnixTime::new(100_000));
    }

    #[rstest]
    fn test_back_reschedule_daily_after_backward_jump() {
        // Daily recurring with the clock set back seven days: the next fire
        // must come back to within one day of the new now.
        let now = UnixTime::new(1_000_000);
        let base = now + 7 * SECS_PER_DAY;
        let mut event = AlarmEvent::new_recurring(
            base,
            0,
            Action::with_flags(EventFlags::BACK_RESCHEDULE),
            Recurrence::new(24 * 60, RECUR_UNBOUNDED, base),
        );

        assert!(event.back_reschedule(now));
        let effective = event.effective_time();
        assert!(effective >= now);
        assert!(effective.secs_since(now) <= SECS_PER_DAY);
    }

    #[rstest]
    fn test_back_reschedule_requires_flag() {
        let now = UnixTime::new(1_000_000);
        let mut event = recurring_at(now.as_u64() + 7 * SECS_PER_DAY, 24 * 60, RECUR_UNBOUNDED);
        assert!(!event.back_reschedule(now));
    }

    #[rstest]
    fn test_back_reschedule_noop_within_one_interval() {
        let now = UnixTime::new(1_000_000);
        let base = now + 3_600;
        let mut event = AlarmEvent::new_recurring(
            base,
            0,
            Action::with_flags(EventFlags::BACK_RESCHEDULE),
            Recurrence::new(24 * 60, RECUR_UNBOUNDED, base),
        );
        assert!(!event.back_reschedule(now));
        assert_eq!(event.base_time(), base);
    }
}
