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

//! Live timer implementation using Tokio for real-time scheduling.

use std::{sync::Arc, time::Duration};

use chime_core::UnixTime;
use tokio::task::JoinHandle;

use super::runtime::get_runtime;
use crate::{
    enums::TimerKind,
    event::Cookie,
    runner::TimerFireSender,
    timer::{AlarmTimer, TimerFire},
};

/// A live single-shot timer driving one queue capability slot.
///
/// `LiveTimer` sleeps on the global Tokio runtime until the armed wall-clock
/// instant and pushes the fire through its [`TimerFireSender`]. Arming an
/// instant already in the past delivers an immediate `delayed` fire. Tokio
/// sleeps run on the monotonic clock, so a wall-clock change requires
/// [`AlarmTimer::time_changed`] to recompute the pending sleep.
#[derive(Debug)]
pub struct LiveTimer {
    kind: TimerKind,
    powerup_capable: bool,
    armed: Option<(UnixTime, Cookie)>,
    task_handle: Option<JoinHandle<()>>,
    sender: Arc<dyn TimerFireSender>,
}

impl LiveTimer {
    /// Creates a new [`LiveTimer`] instance.
    #[must_use]
    pub fn new(kind: TimerKind, powerup_capable: bool, sender: Arc<dyn TimerFireSender>) -> Self {
        log::debug!("Creating live timer for {kind}");
        Self {
            kind,
            powerup_capable,
            armed: None,
            task_handle: None,
            sender,
        }
    }

    fn abort_task(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }

    fn spawn_task(&mut self, at: UnixTime, token: Cookie) {
        let kind = self.kind;
        let sender = self.sender.clone();

        let handle = get_runtime().spawn(async move {
            let now = UnixTime::now();
            let delay_secs = at.secs_since(now);
            if delay_secs > 0 {
                tokio::time::sleep(Duration::from_secs(delay_secs)).await;
            }
            let delivered_at = UnixTime::now();
            sender.send(TimerFire {
                kind,
                token,
                delayed: delivered_at > at,
            });
        });

        self.task_handle = Some(handle);
    }
}

impl Drop for LiveTimer {
    fn drop(&mut self) {
        self.abort_task();
    }
}

impl AlarmTimer for LiveTimer {
    fn kind(&self) -> TimerKind {
        self.kind
    }

    fn arm(&mut self, at: UnixTime, token: Cookie) -> bool {
        self.abort_task();
        self.armed = Some((at, token));
        self.spawn_task(at, token);
        true
    }

    fn disarm(&mut self) -> Option<Cookie> {
        self.abort_task();
        self.armed.take().map(|(_, token)| token)
    }

    fn armed_token(&self) -> Option<Cookie> {
        self.armed.map(|(_, token)| token)
    }

    fn confirm_fire(&mut self, token: Cookie) {
        if let Some((_, armed)) = self.armed {
            if armed == token {
                self.armed = None;
                self.task_handle = None;
            }
        }
    }

    fn time_changed(&mut self) {
        // The pending sleep was computed against the old wall clock.
        if let Some((at, token)) = self.armed {
            self.abort_task();
            self.spawn_task(at, token);
        }
    }

    fn is_powerup_capable(&self) -> bool {
        self.powerup_capable
    }
}
