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

//! Channel plumbing between timer backends and the daemon event loop.
//!
//! Timer backends run on runtime worker threads but the queue lives on the
//! loop thread, so fires are pushed through a [`TimerFireSender`] and drained
//! by the loop in FIFO order.

use std::{cell::OnceCell, fmt::Debug, sync::Arc};

use crate::timer::TimerFire;

/// Trait for timer fire delivery into the daemon event loop.
pub trait TimerFireSender: Debug + Send + Sync {
    /// Sends a timer fire.
    fn send(&self, fire: TimerFire);
}

/// A [`TimerFireSender`] backed by an unbounded tokio channel.
#[derive(Clone, Debug)]
pub struct ChannelTimerFireSender {
    tx: tokio::sync::mpsc::UnboundedSender<TimerFire>,
}

impl ChannelTimerFireSender {
    /// Creates a new [`ChannelTimerFireSender`] instance.
    #[must_use]
    pub const fn new(tx: tokio::sync::mpsc::UnboundedSender<TimerFire>) -> Self {
        Self { tx }
    }
}

impl TimerFireSender for ChannelTimerFireSender {
    fn send(&self, fire: TimerFire) {
        if self.tx.send(fire).is_err() {
            log::error!("Timer fire channel closed, dropping fire for {}", fire.token);
        }
    }
}

/// Gets the global timer fire sender.
///
/// # Panics
///
/// Panics if the sender is uninitialized.
#[must_use]
pub fn get_timer_fire_sender() -> Arc<dyn TimerFireSender> {
    TIMER_FIRE_SENDER.with(|sender| {
        sender
            .get()
            .expect("Timer fire sender should be initialized by the daemon loop")
            .clone()
    })
}

/// Attempts to get the global timer fire sender without panicking.
///
/// Returns `None` if the sender is not initialized (e.g., in test environments).
#[must_use]
pub fn try_get_timer_fire_sender() -> Option<Arc<dyn TimerFireSender>> {
    TIMER_FIRE_SENDER.with(|sender| sender.get().cloned())
}

/// Sets the global timer fire sender.
///
/// Can only be called once per thread.
///
/// # Panics
///
/// Panics if a sender has already been set.
pub fn set_timer_fire_sender(sender: Arc<dyn TimerFireSender>) {
    TIMER_FIRE_SENDER.with(|s| {
        assert!(
            s.set(sender).is_ok(),
            "Timer fire sender can only be set once"
        );
    });
}

thread_local! {
    static TIMER_FIRE_SENDER: OnceCell<Arc<dyn TimerFireSender>> = const { OnceCell::new() };
}
