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

//! Wall-clock access for the scheduling core.
//!
//! The queue never reads the system clock directly; it holds a [`WallClock`]
//! so tests can drive scheduling decisions with a controlled [`TestClock`].

use std::{cell::Cell, fmt::Debug, rc::Rc};

use chime_core::UnixTime;

/// A source of the current wall-clock time.
pub trait WallClock: Debug {
    /// Returns the current wall-clock time.
    fn now(&self) -> UnixTime;
}

/// A real-time clock which uses system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> UnixTime {
        UnixTime::now()
    }
}

/// A manually controlled clock for test scenarios.
///
/// Cloned handles share the same underlying instant, so a test can hold one
/// handle while the queue owns another.
#[derive(Clone, Debug, Default)]
pub struct TestClock {
    time: Rc<Cell<u64>>,
}

impl TestClock {
    /// Creates a new [`TestClock`] instance starting at the given time.
    #[must_use]
    pub fn new(start: UnixTime) -> Self {
        Self {
            time: Rc::new(Cell::new(start.as_u64())),
        }
    }

    /// Sets the current time.
    pub fn set(&self, now: UnixTime) {
        self.time.set(now.as_u64());
    }

    /// Advances the current time by the given number of seconds.
    pub fn advance_secs(&self, secs: u64) {
        self.time.set(self.time.get() + secs);
    }

    /// Moves the current time backward by the given number of seconds.
    pub fn rewind_secs(&self, secs: u64) {
        self.time.set(self.time.get().saturating_sub(secs));
    }
}

impl WallClock for TestClock {
    fn now(&self) -> UnixTime {
        UnixTime::new(self.time.get())
    }
}
