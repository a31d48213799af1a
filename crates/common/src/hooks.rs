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

//! Capability hooks the core consumes.
//!
//! Everything the queue and its actions need from the outside world (the UI
//! dialog server, the message bus, subprocess spawning, connectivity,
//! power-state arbitration, the statusbar icon) passes through these narrow
//! trait seams. The daemon installs real collaborators; tests and the default
//! construction use the null implementations.

use std::{cell::RefCell, fmt::Debug, rc::Rc};

use chime_core::UnixTime;

use crate::{action::BusCall, event::Cookie, flags::EventFlags};

/// A request for the UI collaborator to show an alarm dialog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DialogRequest {
    /// Cookie of the firing event, echoed back in the response.
    pub cookie: Cookie,
    /// Effective fire time of the event.
    pub time: UnixTime,
    /// Dialog title.
    pub title: String,
    /// Dialog message body.
    pub message: String,
    /// Sound to play, empty for none.
    pub sound: String,
    /// Icon to show, empty for the default.
    pub icon: String,
    /// Whether the dialog offers a snooze option.
    pub can_snooze: bool,
}

/// External UI collaborator showing alarm and power-up dialogs.
pub trait DialogService: Debug {
    /// Enqueues an alarm dialog request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be delivered.
    fn show(&mut self, request: DialogRequest) -> anyhow::Result<()>;

    /// Enqueues a power-up dialog request for an acting-dead device.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be delivered.
    fn show_powerup(&mut self, cookie: Cookie) -> anyhow::Result<()>;

    /// Withdraws any outstanding dialog for the given cookie.
    fn dismiss(&mut self, cookie: Cookie);
}

/// External message bus used by bus actions (fire-and-forget).
pub trait BusInvoker: Debug {
    /// Emits the bus call.
    ///
    /// # Errors
    ///
    /// Returns an error if the call cannot be emitted; the caller logs and
    /// continues.
    fn invoke(&mut self, call: &BusCall, flags: EventFlags) -> anyhow::Result<()>;
}

/// Subprocess spawner used by exec actions.
pub trait CommandSpawner: Debug {
    /// Spawns the command line; the child's exit is reported back to the
    /// queue as a child-exited event carrying the cookie.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned.
    fn spawn(&mut self, cookie: Cookie, command: &str) -> anyhow::Result<()>;
}

/// Connectivity probe gating CONNECTED actions.
pub trait ConnectivityProbe: Debug {
    /// Returns whether the device currently has connectivity.
    fn is_online(&self) -> bool;
}

/// Power-mode arbitration.
pub trait PowerControl: Debug {
    /// Returns whether the device is in the acting-dead power mode.
    fn is_acting_dead(&self) -> bool;

    /// Requests a full device power-up.
    fn request_powerup(&mut self);
}

/// Statusbar icon control.
pub trait StatusIndicator: Debug {
    /// Shows the alarm indicator.
    fn show(&mut self);

    /// Hides the alarm indicator.
    fn hide(&mut self);
}

/// The bundle of collaborator hooks an action runs against.
#[derive(Debug)]
pub struct Hooks {
    /// UI dialog collaborator.
    pub dialogs: Box<dyn DialogService>,
    /// Message bus collaborator.
    pub bus: Box<dyn BusInvoker>,
    /// Subprocess spawner.
    pub spawner: Box<dyn CommandSpawner>,
    /// Connectivity probe.
    pub connectivity: Box<dyn ConnectivityProbe>,
    /// Power-mode arbitration.
    pub power: Box<dyn PowerControl>,
}

impl Default for Hooks {
    /// Creates a hook bundle of null collaborators.
    fn default() -> Self {
        Self {
            dialogs: Box::new(NullDialogService::default()),
            bus: Box::new(NullBusInvoker),
            spawner: Box::new(NullCommandSpawner),
            connectivity: Box::new(StaticConnectivity::new(true)),
            power: Box::new(NullPowerControl::default()),
        }
    }
}

/// Reference-counted statusbar icon, clamped at zero.
///
/// The indicator is visible while at least one SHOW_ICON event exists.
#[derive(Debug)]
pub struct IconCounter {
    count: u32,
    indicator: Box<dyn StatusIndicator>,
}

impl Default for IconCounter {
    fn default() -> Self {
        Self::new(Box::new(NullIndicator))
    }
}

impl IconCounter {
    /// Creates a new [`IconCounter`] instance.
    #[must_use]
    pub fn new(indicator: Box<dyn StatusIndicator>) -> Self {
        Self {
            count: 0,
            indicator,
        }
    }

    /// Returns the current reference count.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Increments the counter, showing the indicator on the first holder.
    pub fn show(&mut self) {
        self.count += 1;
        if self.count == 1 {
            self.indicator.show();
        }
    }

    /// Decrements the counter, hiding the indicator when it reaches zero.
    pub fn hide(&mut self) {
        match self.count {
            0 => {}
            1 => {
                self.count = 0;
                self.indicator.hide();
            }
            _ => self.count -= 1,
        }
    }
}

/// Dialog service that records requests and answers nothing.
#[derive(Debug, Default)]
pub struct NullDialogService {
    /// Alarm dialog requests received, newest last.
    pub shown: Vec<DialogRequest>,
    /// Power-up dialog cookies received, newest last.
    pub powerups: Vec<Cookie>,
    /// Dismissed cookies, newest last.
    pub dismissed: Vec<Cookie>,
}

impl DialogService for NullDialogService {
    fn show(&mut self, request: DialogRequest) -> anyhow::Result<()> {
        self.shown.push(request);
        Ok(())
    }

    fn show_powerup(&mut self, cookie: Cookie) -> anyhow::Result<()> {
        self.powerups.push(cookie);
        Ok(())
    }

    fn dismiss(&mut self, cookie: Cookie) {
        self.dismissed.push(cookie);
    }
}

// A shared handle doubles as the service so tests can keep a recording
// reference while the hook bundle owns the boxed clone.
impl DialogService for Rc<RefCell<NullDialogService>> {
    fn show(&mut self, request: DialogRequest) -> anyhow::Result<()> {
        self.borrow_mut().show(request)
    }

    fn show_powerup(&mut self, cookie: Cookie) -> anyhow::Result<()> {
        self.borrow_mut().show_powerup(cookie)
    }

    fn dismiss(&mut self, cookie: Cookie) {
        self.borrow_mut().dismiss(cookie);
    }
}

/// Bus invoker that only logs.
#[derive(Debug, Default)]
pub struct NullBusInvoker;

impl BusInvoker for NullBusInvoker {
    fn invoke(&mut self, call: &BusCall, _flags: EventFlags) -> anyhow::Result<()> {
        log::debug!("Dropping bus call to {}", call.service);
        Ok(())
    }
}

/// Command spawner that refuses every spawn.
#[derive(Debug, Default)]
pub struct NullCommandSpawner;

impl CommandSpawner for NullCommandSpawner {
    fn spawn(&mut self, cookie: Cookie, command: &str) -> anyhow::Result<()> {
        log::debug!("Dropping exec for event {cookie}: {command}");
        anyhow::bail!("no command spawner installed")
    }
}

/// Fixed-answer connectivity probe.
#[derive(Debug)]
pub struct StaticConnectivity {
    online: bool,
}

impl StaticConnectivity {
    /// Creates a new [`StaticConnectivity`] instance.
    #[must_use]
    pub const fn new(online: bool) -> Self {
        Self { online }
    }
}

impl ConnectivityProbe for StaticConnectivity {
    fn is_online(&self) -> bool {
        self.online
    }
}

/// Power control that never acts dead and records power-up requests.
#[derive(Debug, Default)]
pub struct NullPowerControl {
    /// Whether the device reports the acting-dead mode.
    pub acting_dead: bool,
    /// Number of power-up requests received.
    pub powerup_requests: u32,
}

impl PowerControl for NullPowerControl {
    fn is_acting_dead(&self) -> bool {
        self.acting_dead
    }

    fn request_powerup(&mut self) {
        self.powerup_requests += 1;
    }
}

/// Indicator that does nothing.
#[derive(Debug, Default)]
pub struct NullIndicator;

impl StatusIndicator for NullIndicator {
    fn show(&mut self) {}

    fn hide(&mut self) {}
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use rstest::rstest;

    use super::*;

    #[derive(Debug)]
    struct RecordingIndicator {
        log: Rc<RefCell<Vec<bool>>>,
    }

    impl StatusIndicator for RecordingIndicator {
        fn show(&mut self) {
            self.log.borrow_mut().push(true);
        }

        fn hide(&mut self) {
            self.log.borrow_mut().push(false);
        }
    }

    #[rstest]
    fn test_icon_counter_shows_once_and_hides_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut counter = IconCounter::new(Box::new(RecordingIndicator { log: log.clone() }));

        counter.show();
        counter.show();
        counter.hide();
        assert_eq!(counter.count(), 1);
        counter.hide();
        assert_eq!(counter.count(), 0);

        assert_eq!(*log.borrow(), vec![true, false]);
    }

    #[rstest]
    fn test_icon_counter_clamps_at_zero() {
        let mut counter = IconCounter::default();
        counter.hide();
        counter.hide();
        assert_eq!(counter.count(), 0);
    }
}
