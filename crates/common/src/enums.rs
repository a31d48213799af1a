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

//! Enumerations for the scheduling core.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The outcome an action reports when it completes.
#[derive(
    Clone, Copy, Debug, Display, EnumString, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum AckOutcome {
    /// The action completed; a one-shot event terminates, a recurring event
    /// advances to its next cycle.
    Normal,
    /// The user snoozed; the event's effective time is bumped by the snooze
    /// step and it re-enters the active set.
    Snooze,
}

/// The two timer capability classes the queue multiplexes events across.
#[derive(
    Clone, Copy, Debug, Display, EnumString, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Fine-grained timer for a running device.
    Normal,
    /// Timer backend able to wake a powered-down device.
    Powerup,
}

/// The wake mode advertised to the external RTC programmer via the hint files.
#[derive(
    Clone, Copy, Debug, Display, EnumString, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum WakeMode {
    /// Wake into the acting-dead state (alarm UI only).
    #[strum(serialize = "actdead")]
    #[serde(rename = "actdead")]
    ActDead,
    /// Wake into a full power-up.
    #[strum(serialize = "powerup")]
    #[serde(rename = "powerup")]
    Powerup,
    /// No powered-down wake is needed.
    #[strum(serialize = "n/a")]
    #[serde(rename = "n/a")]
    NotApplicable,
}

/// A response delivered back from the UI collaborator for a shown dialog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DialogResponse {
    /// The user accepted the alarm.
    Accept,
    /// The user snoozed the alarm.
    Snooze,
    /// The dialog timed out without user input.
    Timeout,
    /// The power-up UI answered; `power_up` reports whether the user chose to
    /// boot the device fully.
    Powerup { power_up: bool },
}
