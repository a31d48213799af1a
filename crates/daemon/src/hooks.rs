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

//! Reference collaborator implementations behind the core's hook traits.
//!
//! The UI dialog client speaks a line protocol over a Unix socket with
//! brace-delimited, escaped string fields; the bus invoker shells out to
//! `dbus-send`; the command spawner runs through `/bin/sh -c` and reports the
//! child's exit back into the loop. All of them are fire-and-forget from the
//! core's point of view: failures are logged and the loop keeps going.

use std::path::PathBuf;

use chime_common::{
    Cookie, DialogResponse, EventFlags,
    action::{BusArg, BusCall},
    hooks::{
        BusInvoker, CommandSpawner, ConnectivityProbe, DialogRequest, DialogService, PowerControl,
        StatusIndicator,
    },
};
use chime_core::string::{escape_payload, unescape_payload};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::UnixStream,
    sync::mpsc::UnboundedSender,
};

use crate::events::DaemonEvent;

/// Dialog client speaking the UI collaborator's line protocol.
#[derive(Debug)]
pub struct UiSocketDialog {
    socket_path: PathBuf,
    events: UnboundedSender<DaemonEvent>,
}

impl UiSocketDialog {
    /// Creates a new [`UiSocketDialog`] instance.
    #[must_use]
    pub const fn new(socket_path: PathBuf, events: UnboundedSender<DaemonEvent>) -> Self {
        Self {
            socket_path,
            events,
        }
    }

    fn send_line(&self, line: String, await_response: bool) {
        let path = self.socket_path.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            match UnixStream::connect(&path).await {
                Ok(mut stream) => {
                    if let Err(e) = stream.write_all(format!("{line}\n").as_bytes()).await {
                        log::warn!("UI request write failed: {e}");
                        return;
                    }
                    if !await_response {
                        return;
                    }
                    let mut lines = BufReader::new(stream).lines();
                    match lines.next_line().await {
                        Ok(Some(reply)) => match parse_ui_response(&reply) {
                            Some((cookie, response)) => {
                                let _ = events.send(DaemonEvent::DialogResponse {
                                    cookie,
                                    response,
                                });
                            }
                            None => log::warn!("Unparsable UI response: {reply}"),
                        },
                        Ok(None) => log::warn!("UI closed without a response"),
                        Err(e) => log::warn!("UI response read failed: {e}"),
                    }
                }
                Err(e) => log::warn!("UI socket {} unreachable: {e}", path.display()),
            }
        });
    }
}

impl DialogService for UiSocketDialog {
    fn show(&mut self, request: DialogRequest) -> anyhow::Result<()> {
        let line = format_dialog_line(&request);
        self.send_line(line, true);
        let _ = self.events.send(DaemonEvent::DialogShown {
            cookie: request.cookie,
        });
        Ok(())
    }

    fn show_powerup(&mut self, cookie: Cookie) -> anyhow::Result<()> {
        self.send_line(format!("powerup {cookie}"), true);
        let _ = self.events.send(DaemonEvent::DialogShown { cookie });
        Ok(())
    }

    fn dismiss(&mut self, cookie: Cookie) {
        self.send_line(format!("close {cookie}"), false);
    }
}

/// Formats an alarm dialog request line with escaped, brace-delimited fields.
#[must_use]
pub fn format_dialog_line(request: &DialogRequest) -> String {
    format!(
        "alarm {} {} {} {{{}}} {{{}}} {{{}}} {{{}}}",
        request.cookie,
        request.time,
        u8::from(request.can_snooze),
        escape_payload(&request.title),
        escape_payload(&request.message),
        escape_payload(&request.sound),
        escape_payload(&request.icon),
    )
}

/// Parses a UI response line.
///
/// Accepted forms: `response <cookie> accept|snooze|timeout` and
/// `powerup <cookie> 0|1`.
#[must_use]
pub fn parse_ui_response(line: &str) -> Option<(Cookie, DialogResponse)> {
    let mut parts = line.split_whitespace();
    let verb = parts.next()?;
    let cookie: Cookie = parts.next()?.parse().ok()?;
    let arg = parts.next()?;

    let response = match (verb, arg) {
        ("response", "accept") => DialogResponse::Accept,
        ("response", "snooze") => DialogResponse::Snooze,
        ("response", "timeout") => DialogResponse::Timeout,
        ("powerup", "0") => DialogResponse::Powerup { power_up: false },
        ("powerup", "1") => DialogResponse::Powerup { power_up: true },
        _ => return None,
    };
    Some((cookie, response))
}

/// Bus invoker shelling out to `dbus-send`.
#[derive(Debug, Default)]
pub struct SendToolBus;

impl BusInvoker for SendToolBus {
    fn invoke(&mut self, call: &BusCall, flags: EventFlags) -> anyhow::Result<()> {
        let args = bus_send_args(call, flags);
        log::info!("Emitting bus call to {}", call.service);

        let mut command = tokio::process::Command::new("dbus-send");
        command.args(&args);
        let mut child = command.spawn()?;
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if !status.success() => {
                    log::warn!("dbus-send exited with {status}");
                }
                Ok(_) => {}
                Err(e) => log::warn!("dbus-send wait failed: {e}"),
            }
        });
        Ok(())
    }
}

/// Builds the `dbus-send` argument vector for a bus call.
#[must_use]
pub fn bus_send_args(call: &BusCall, flags: EventFlags) -> Vec<String> {
    let mut args = Vec::new();
    if flags.contains(EventFlags::SYSTEM) {
        args.push("--system".to_string());
    } else {
        args.push("--session".to_string());
    }
    args.push("--type=method_call".to_string());
    if flags.contains(EventFlags::ACTIVATION) {
        // Auto-start the destination before delivering.
        args.push("--print-reply".to_string());
    }
    args.push(format!("--dest={}", call.service));
    args.push(call.path.clone());
    args.push(format!("{}.{}", call.interface, call.name));
    for arg in &call.args {
        args.push(match arg {
            BusArg::Boolean(v) => format!("boolean:{v}"),
            BusArg::Int(v) => format!("int32:{v}"),
            BusArg::Uint(v) => format!("uint32:{v}"),
            BusArg::Int64(v) => format!("int64:{v}"),
            BusArg::Uint64(v) => format!("uint64:{v}"),
            BusArg::Double(v) => format!("double:{v}"),
            BusArg::String(v) => format!("string:{v}"),
        });
    }
    args
}

/// Command spawner running through the shell from the home directory.
#[derive(Debug)]
pub struct ShellSpawner {
    events: UnboundedSender<DaemonEvent>,
}

impl ShellSpawner {
    /// Creates a new [`ShellSpawner`] instance.
    #[must_use]
    pub const fn new(events: UnboundedSender<DaemonEvent>) -> Self {
        Self { events }
    }
}

impl CommandSpawner for ShellSpawner {
    fn spawn(&mut self, cookie: Cookie, command: &str) -> anyhow::Result<()> {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/".to_string());
        let mut child = tokio::process::Command::new("/bin/sh")
            .arg("-c")
            .arg(command)
            .current_dir(home)
            .spawn()?;

        log::info!("Running command for event {cookie}: {command}");
        let events = self.events.clone();
        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    log::warn!("Wait for event {cookie} child failed: {e}");
                    None
                }
            };
            let _ = events.send(DaemonEvent::ChildExited { cookie, code });
        });
        Ok(())
    }
}

/// Connectivity probe keyed on the presence of an offline flag file.
///
/// The device counts as online while the flag file is absent; the daemon
/// loop watches the same path for offline-to-online transitions.
#[derive(Clone, Debug)]
pub struct FlagFileConnectivity {
    offline_flag: PathBuf,
}

impl FlagFileConnectivity {
    /// Creates a new [`FlagFileConnectivity`] instance.
    #[must_use]
    pub const fn new(offline_flag: PathBuf) -> Self {
        Self { offline_flag }
    }
}

impl ConnectivityProbe for FlagFileConnectivity {
    fn is_online(&self) -> bool {
        !self.offline_flag.exists()
    }
}

/// Power control driven by configuration; power-up requests are logged for
/// the platform's power manager.
#[derive(Debug)]
pub struct EnvPowerControl {
    acting_dead: bool,
}

impl EnvPowerControl {
    /// Creates a new [`EnvPowerControl`] instance.
    #[must_use]
    pub const fn new(acting_dead: bool) -> Self {
        Self { acting_dead }
    }
}

impl PowerControl for EnvPowerControl {
    fn is_acting_dead(&self) -> bool {
        self.acting_dead
    }

    fn request_powerup(&mut self) {
        log::info!("Requesting device power-up");
    }
}

/// Statusbar indicator surfaced through the log.
#[derive(Debug, Default)]
pub struct LoggingIndicator;

impl StatusIndicator for LoggingIndicator {
    fn show(&mut self) {
        log::info!("Statusbar alarm indicator on");
    }

    fn hide(&mut self) {
        log::info!("Statusbar alarm indicator off");
    }
}

/// Unescapes the brace-delimited fields of a formatted dialog line; exposed
/// for collaborators that need to recover the original strings.
#[must_use]
pub fn unescape_dialog_field(field: &str) -> String {
    unescape_payload(field)
}

#[cfg(test)]
mod tests {
    use chime_core::UnixTime;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_format_dialog_line_escapes_fields() {
        let request = DialogRequest {
            cookie: 5,
            time: UnixTime::new(1_000),
            title: "Wake {up}".to_string(),
            message: r"back\slash".to_string(),
            sound: String::new(),
            icon: String::new(),
            can_snooze: true,
        };
        let line = format_dialog_line(&request);
        assert_eq!(line, r"alarm 5 1000 1 {Wake \{up\}} {back\\slash} {} {}");
    }

    #[rstest]
    fn test_dialog_line_fields_unescape_back() {
        assert_eq!(unescape_dialog_field(r"Wake \{up\}"), "Wake {up}");
        assert_eq!(unescape_dialog_field(r"back\\slash"), r"back\slash");
    }

    #[rstest]
    #[case("response 7 accept", 7, DialogResponse::Accept)]
    #[case("response 7 snooze", 7, DialogResponse::Snooze)]
    #[case("response 12 timeout", 12, DialogResponse::Timeout)]
    #[case("powerup 3 1", 3, DialogResponse::Powerup { power_up: true })]
    #[case("powerup 3 0", 3, DialogResponse::Powerup { power_up: false })]
    fn test_parse_ui_response(
        #[case] line: &str,
        #[case] cookie: Cookie,
        #[case] expected: DialogResponse,
    ) {
        assert_eq!(parse_ui_response(line), Some((cookie, expected)));
    }

    #[rstest]
    #[case("")]
    #[case("response accept")]
    #[case("response 7 maybe")]
    #[case("ring 7 1")]
    fn test_parse_ui_response_rejects_garbage(#[case] line: &str) {
        assert_eq!(parse_ui_response(line), None);
    }

    #[rstest]
    fn test_bus_send_args_session_call() {
        let call = BusCall {
            service: "com.example.Player".to_string(),
            path: "/com/example/Player".to_string(),
            interface: "com.example.Player".to_string(),
            name: "Ring".to_string(),
            args: vec![BusArg::Uint(3), BusArg::String("loud".to_string())],
        };
        let args = bus_send_args(&call, EventFlags::empty());
        assert_eq!(
            args,
            vec![
                "--session",
                "--type=method_call",
                "--dest=com.example.Player",
                "/com/example/Player",
                "com.example.Player.Ring",
                "uint32:3",
                "string:loud",
            ]
        );
    }

    #[rstest]
    fn test_flag_file_connectivity() {
        let dir = tempfile::tempdir().unwrap();
        let flag = dir.path().join("offline");
        let probe = FlagFileConnectivity::new(flag.clone());

        assert!(probe.is_online());
        std::fs::write(&flag, b"").unwrap();
        assert!(!probe.is_online());
        std::fs::remove_file(&flag).unwrap();
        assert!(probe.is_online());
    }

    #[rstest]
    fn test_bus_send_args_system_routing() {
        let call = BusCall::default();
        let args = bus_send_args(&call, EventFlags::SYSTEM | EventFlags::ACTIVATION);
        assert!(args.contains(&"--system".to_string()));
        assert!(args.contains(&"--print-reply".to_string()));
        assert!(!args.contains(&"--session".to_string()));
    }
}
