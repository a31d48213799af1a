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

//! The scheduling core of the chime alarm daemon.
//!
//! The *chime-common* crate owns everything between the transport and the
//! timer hardware:
//!
//! - [`queue::AlarmQueue`] — the event queue and dual-timer dispatch.
//! - [`event::AlarmEvent`] — events with snooze and recurrence arithmetic.
//! - [`action::Action`] — the {Null, Dialog, Bus, Exec} action machine.
//! - [`timer`] / [`live`] — the timer capability interface, a manually
//!   driven test timer, and the Tokio-backed live timer.
//! - [`persist`] — crash-safe whole-queue persistence and the RTC hint files.
//! - [`dispatch`] — the external request surface.
//! - [`hooks`] — narrow trait seams for the UI, bus, subprocess,
//!   connectivity, power, and statusbar collaborators.

pub mod action;
pub mod clock;
pub mod dispatch;
pub mod enums;
pub mod event;
pub mod factory;
pub mod flags;
pub mod hooks;
pub mod live;
pub mod logging;
pub mod persist;
pub mod props;
pub mod queue;
pub mod runner;
pub mod testing;
pub mod timer;

pub use enums::{AckOutcome, DialogResponse, TimerKind, WakeMode};
pub use event::{AlarmEvent, Cookie, Recurrence};
pub use flags::EventFlags;
pub use queue::AlarmQueue;
