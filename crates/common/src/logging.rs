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

//! The logging subsystem for the chime daemon.
//!
//! Configuration comes from the `CHIMED_LOG` environment variable as a
//! semicolon-separated spec string:
//!
//! ```text
//! stdout=Info;fileout=Debug;path=/var/log/chimed.log;is_colored=false
//! ```
//!
//! | Key          | Type      | Description                              |
//! |--------------|-----------|------------------------------------------|
//! | `stdout`     | Log level | Maximum level for stderr output.         |
//! | `fileout`    | Log level | Maximum level for file output.           |
//! | `path`       | Path      | Log file location (requires `fileout`).  |
//! | `is_colored` | Boolean   | Enable ANSI colors (default: true).      |
//!
//! Log levels are case-insensitive; booleans accept a bare flag or
//! `key=true` / `key=false`.

use std::{
    env,
    fs::{File, OpenOptions},
    io::Write,
    path::PathBuf,
    str::FromStr,
    sync::Mutex,
};

use chime_core::UnixTime;
use log::LevelFilter;

/// Environment variable holding the logger spec string.
pub const CHIMED_LOG: &str = "CHIMED_LOG";

/// Configuration for the chime logger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Maximum log level for stderr output.
    pub stdout_level: LevelFilter,
    /// Maximum log level for file output (`Off` disables file logging).
    pub fileout_level: LevelFilter,
    /// Log file location.
    pub file_path: Option<PathBuf>,
    /// Use ANSI color codes in stderr output.
    pub is_colored: bool,
}

impl Default for LoggerConfig {
    /// Creates a new default [`LoggerConfig`] instance.
    fn default() -> Self {
        Self {
            stdout_level: LevelFilter::Info,
            fileout_level: LevelFilter::Off,
            file_path: None,
            is_colored: true,
        }
    }
}

impl LoggerConfig {
    /// Parses a semicolon-separated spec string.
    ///
    /// # Errors
    ///
    /// Returns an error on an unrecognised key or unparsable value.
    pub fn from_spec(spec: &str) -> anyhow::Result<Self> {
        let mut config = Self::default();
        for part in spec.split(';').filter(|p| !p.is_empty()) {
            let (key, value) = match part.split_once('=') {
                Some((key, value)) => (key.trim(), Some(value.trim())),
                None => (part.trim(), None),
            };
            match (key, value) {
                ("stdout", Some(level)) => {
                    config.stdout_level = LevelFilter::from_str(level)
                        .map_err(|e| anyhow::anyhow!("invalid stdout level '{level}': {e}"))?;
                }
                ("fileout", Some(level)) => {
                    config.fileout_level = LevelFilter::from_str(level)
                        .map_err(|e| anyhow::anyhow!("invalid fileout level '{level}': {e}"))?;
                }
                ("path", Some(path)) => config.file_path = Some(PathBuf::from(path)),
                ("is_colored", value) => config.is_colored = parse_bool(value),
                _ => anyhow::bail!("unrecognised logger spec entry '{part}'"),
            }
        }
        Ok(config)
    }

    /// Reads the config from [`CHIMED_LOG`], falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        env::var(CHIMED_LOG)
            .ok()
            .and_then(|spec| Self::from_spec(&spec).ok())
            .unwrap_or_default()
    }

    fn max_level(&self) -> LevelFilter {
        self.stdout_level.max(self.fileout_level)
    }
}

fn parse_bool(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => !matches!(v.to_ascii_lowercase().as_str(), "false" | "0" | "no"),
    }
}

#[derive(Debug)]
struct ChimeLogger {
    config: LoggerConfig,
    file: Option<Mutex<File>>,
}

impl ChimeLogger {
    fn color(level: log::Level) -> &'static str {
        match level {
            log::Level::Error => "\x1b[31m",
            log::Level::Warn => "\x1b[33m",
            log::Level::Info => "\x1b[32m",
            log::Level::Debug => "\x1b[36m",
            log::Level::Trace => "\x1b[90m",
        }
    }
}

impl log::Log for ChimeLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.config.max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let timestamp = UnixTime::now().to_rfc3339();
        let level = record.level();
        let line = format!("{timestamp} [{level}] {}: {}", record.target(), record.args());

        if level <= self.config.stdout_level {
            if self.config.is_colored {
                let color = Self::color(level);
                eprintln!("{color}{line}\x1b[0m");
            } else {
                eprintln!("{line}");
            }
        }

        if level <= self.config.fileout_level {
            if let Some(file) = &self.file {
                if let Ok(mut file) = file.lock() {
                    let _ = writeln!(file, "{line}");
                }
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }
}

/// Initializes logging with the given config.
///
/// Should only be called once during an application's run, ideally at the
/// beginning of the run.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a logger is already
/// installed.
pub fn init_logging(config: LoggerConfig) -> anyhow::Result<()> {
    let file = match (&config.file_path, config.fileout_level) {
        (Some(path), level) if level > LevelFilter::Off => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(Mutex::new(file))
        }
        _ => None,
    };

    let max_level = config.max_level();
    log::set_boxed_logger(Box::new(ChimeLogger { config, file }))
        .map_err(|e| anyhow::anyhow!("logger already installed: {e}"))?;
    log::set_max_level(max_level);
    Ok(())
}

/// Initializes logging from the [`CHIMED_LOG`] environment variable.
///
/// # Errors
///
/// Returns an error if a logger is already installed.
pub fn init_logging_from_env() -> anyhow::Result<()> {
    init_logging(LoggerConfig::from_env())
}
