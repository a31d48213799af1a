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

//! The chime alarm daemon.
//!
//! Bootstraps logging, configuration, and the single-instance lock, restores
//! the persisted queue, installs the live timers, and runs the event loop:
//! requests from the Unix-socket server, timer fires, collaborator events,
//! dialog resend deadlines, a wall-clock drift watcher, and POSIX signals all
//! arrive here and are processed in FIFO order. Any mutation leaves the queue
//! dirty and is persisted before the next message is taken.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use ahash::AHashMap;
use anyhow::Context;
use chime_common::{
    AlarmQueue, Cookie, TimerKind,
    action::DIALOG_RESEND_SECS,
    clock::SystemClock,
    dispatch,
    hooks::{ConnectivityProbe, Hooks},
    live::{runtime::get_runtime, timer::LiveTimer},
    logging,
    persist::{self, StorePaths},
    runner::{ChannelTimerFireSender, TimerFireSender, set_timer_fire_sender},
};
use chime_core::UnixTime;
use tokio::{
    net::UnixListener,
    signal::unix::{SignalKind, signal},
    sync::mpsc,
};

use crate::{
    config::DaemonConfig,
    events::DaemonEvent,
    hooks::{
        EnvPowerControl, FlagFileConnectivity, LoggingIndicator, SendToolBus, ShellSpawner,
        UiSocketDialog,
    },
    lock::InstanceLock,
    server::{ServerRequest, reply_line, serve},
};

mod config;
mod events;
mod hooks;
mod lock;
mod server;

/// Seconds between drift-watcher ticks.
const TICK_SECS: u64 = 10;

/// Wall-versus-monotonic divergence treated as a clock change.
const DRIFT_TOLERANCE_SECS: i64 = 2;

fn main() -> anyhow::Result<()> {
    logging::init_logging_from_env()?;
    let config = DaemonConfig::from_env();
    log::info!("Starting chimed with state dir {}", config.state_dir.display());

    let _lock = InstanceLock::acquire(&config.lock_file)
        .context("failed to acquire the instance lock")?;

    get_runtime().block_on(run(config))
}

async fn run(config: DaemonConfig) -> anyhow::Result<()> {
    let (fire_tx, mut fire_rx) = mpsc::unbounded_channel();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<DaemonEvent>();
    let (request_tx, mut request_rx) = mpsc::unbounded_channel::<ServerRequest>();

    let fire_sender: Arc<dyn TimerFireSender> = Arc::new(ChannelTimerFireSender::new(fire_tx));
    set_timer_fire_sender(fire_sender.clone());

    let connectivity = FlagFileConnectivity::new(config.offline_flag.clone());

    let mut queue = AlarmQueue::new(Box::new(SystemClock));
    queue.set_indicator(Box::new(LoggingIndicator));
    queue.set_hooks(Hooks {
        dialogs: Box::new(UiSocketDialog::new(config.ui_socket.clone(), event_tx.clone())),
        bus: Box::new(SendToolBus),
        spawner: Box::new(ShellSpawner::new(event_tx.clone())),
        connectivity: Box::new(connectivity.clone()),
        power: Box::new(EnvPowerControl::new(config.acting_dead)),
    });

    let paths = config.store_paths();
    std::fs::create_dir_all(&config.state_dir)?;
    persist::load(&mut queue, &paths).context("failed to restore the stored queue")?;

    queue.timer_set(
        TimerKind::Normal,
        Some(Box::new(LiveTimer::new(
            TimerKind::Normal,
            false,
            fire_sender.clone(),
        ))),
    );
    queue.timer_set(
        TimerKind::Powerup,
        Some(Box::new(LiveTimer::new(
            TimerKind::Powerup,
            true,
            fire_sender,
        ))),
    );
    persist_if_dirty(&mut queue, &paths);

    let _ = std::fs::remove_file(&config.socket_path);
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .with_context(|| format!("failed to bind {}", config.socket_path.display()))?;
    let server_task = tokio::spawn(serve(listener, request_tx));
    log::info!("Listening on {}", config.socket_path.display());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigusr1 = signal(SignalKind::user_defined1())?;

    let mut tick = tokio::time::interval(Duration::from_secs(TICK_SECS));
    let mut last_wall = UnixTime::now();
    let mut last_mono = Instant::now();
    let mut was_online = connectivity.is_online();
    let mut dialog_deadlines: AHashMap<Cookie, Instant> = AHashMap::new();

    loop {
        tokio::select! {
            Some(request) = request_rx.recv() => {
                let result = dispatch::dispatch(&mut queue, request.request);
                persist_if_dirty(&mut queue, &paths);
                log::debug!("Replying {}", reply_line(&result));
                let _ = request.reply.send(result);
            }
            Some(fire) = fire_rx.recv() => {
                queue.handle_fire(fire);
                persist_if_dirty(&mut queue, &paths);
            }
            Some(event) = event_rx.recv() => {
                match event {
                    DaemonEvent::DialogShown { cookie } => {
                        dialog_deadlines.insert(
                            cookie,
                            Instant::now() + Duration::from_secs(DIALOG_RESEND_SECS),
                        );
                    }
                    DaemonEvent::DialogResponse { cookie, response } => {
                        dialog_deadlines.remove(&cookie);
                        queue.handle_dialog_response(cookie, response);
                    }
                    DaemonEvent::ChildExited { cookie, code } => {
                        queue.handle_child_exited(cookie, code);
                    }
                    DaemonEvent::ConnectivityOnline => queue.handle_connectivity_online(),
                    DaemonEvent::TimeChanged => queue.time_changed(),
                }
                persist_if_dirty(&mut queue, &paths);
            }
            _ = tick.tick() => {
                let wall = UnixTime::now();
                let mono = Instant::now();
                let wall_delta = wall.as_i64() - last_wall.as_i64();
                let mono_delta = mono.duration_since(last_mono).as_secs() as i64;
                last_wall = wall;
                last_mono = mono;
                if (wall_delta - mono_delta).abs() > DRIFT_TOLERANCE_SECS {
                    log::info!("Wall clock drifted {}s against monotonic time", wall_delta - mono_delta);
                    let _ = event_tx.send(DaemonEvent::TimeChanged);
                }

                let online = connectivity.is_online();
                if online && !was_online {
                    let _ = event_tx.send(DaemonEvent::ConnectivityOnline);
                }
                was_online = online;

                let expired: Vec<Cookie> = dialog_deadlines
                    .iter()
                    .filter(|(_, deadline)| **deadline <= mono)
                    .map(|(cookie, _)| *cookie)
                    .collect();
                for cookie in expired {
                    dialog_deadlines.remove(&cookie);
                    queue.handle_dialog_timeout(cookie);
                }
                persist_if_dirty(&mut queue, &paths);
            }
            _ = sigterm.recv() => {
                log::info!("SIGTERM received, shutting down");
                break;
            }
            _ = sighup.recv() => log::debug!("SIGHUP ignored"),
            _ = sigusr1.recv() => log::debug!("SIGUSR1 ignored"),
        }
    }

    // Orderly shutdown: stop accepting requests, persist, release timers.
    server_task.abort();
    if let Err(e) = persist::save(&queue, &paths) {
        log::error!("Final persist failed: {e}");
    }
    queue.timer_set(TimerKind::Normal, None);
    queue.timer_set(TimerKind::Powerup, None);
    let _ = std::fs::remove_file(&config.socket_path);
    log::info!("chimed exiting");
    Ok(())
}

fn persist_if_dirty(queue: &mut AlarmQueue, paths: &StorePaths) {
    if queue.take_dirty() {
        if let Err(e) = persist::save(queue, paths) {
            log::error!("Persist failed: {e}");
        }
    }
}
