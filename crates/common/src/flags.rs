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

//! Event behaviour flags.
//!
//! Flags travel with the action, are persisted as a plain `int32`, and are the
//! only part of an action's payload the queue itself interprets.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Behaviour flags carried by every action.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EventFlags: i32 {
        /// Suppress the user dialog.
        const NO_DIALOG = 1 << 0;
        /// Show the dialog without a snooze option.
        const NO_SNOOZE = 1 << 1;
        /// Routing hint for bus actions (system bus instead of session bus).
        const SYSTEM = 1 << 2;
        /// The event needs a power-up-capable timer.
        const BOOT = 1 << 3;
        /// Route the dialog through the power-up UI when the device is acting dead.
        const ACTDEAD = 1 << 4;
        /// Toggle the statusbar indicator while the event exists.
        const SHOW_ICON = 1 << 5;
        /// Still run the action if the fire was missed.
        const RUN_DELAYED = 1 << 6;
        /// Gate the action on connectivity being available.
        const CONNECTED = 1 << 7;
        /// Routing hint for bus actions (request service auto-start).
        const ACTIVATION = 1 << 8;
        /// If missed by more than 24 h, jump the base time forward in whole
        /// days and do not run the action.
        const POSTPONE_DELAYED = 1 << 9;
        /// For recurring events: pull the recurrence base backward when the
        /// wall clock jumps backward.
        const BACK_RESCHEDULE = 1 << 10;
    }
}

impl EventFlags {
    /// Creates flags from a persisted `int32`, discarding unknown bits.
    #[must_use]
    pub const fn from_wire(bits: i32) -> Self {
        Self::from_bits_truncate(bits)
    }

    /// Returns the persisted `int32` representation.
    #[must_use]
    pub const fn to_wire(&self) -> i32 {
        self.bits()
    }
}

impl Serialize for EventFlags {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.bits())
    }
}

impl<'de> Deserialize<'de> for EventFlags {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = i32::deserialize(deserializer)?;
        Ok(Self::from_wire(bits))
    }
}
