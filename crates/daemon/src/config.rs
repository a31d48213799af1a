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

//! Daemon configuration resolved from environment variables.

use std::path::{Path, PathBuf};

use chime_common::persist::StorePaths;

/// Runtime configuration of the daemon.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Directory holding the queue document and hint files.
    pub state_dir: PathBuf,
    /// Unix socket the request server listens on.
    pub socket_path: PathBuf,
    /// Pidfile enforcing a single daemon instance.
    pub lock_file: PathBuf,
    /// Unix socket of the UI dialog collaborator.
    pub ui_socket: PathBuf,
    /// Flag file whose presence marks the device offline.
    pub offline_flag: PathBuf,
    /// Whether the device is in the acting-dead power mode.
    pub acting_dead: bool,
}

impl Default for DaemonConfig {
    /// Creates a new default [`DaemonConfig`] instance.
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("/var/lib/chimed"),
            socket_path: PathBuf::from("/run/chimed/chimed.sock"),
            lock_file: PathBuf::from("/run/chimed/chimed.pid"),
            ui_socket: PathBuf::from("/run/chimed/ui.sock"),
            offline_flag: PathBuf::from("/run/chimed/offline"),
            acting_dead: false,
        }
    }
}

impl DaemonConfig {
    /// Resolves the config from process environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the config from the given variable lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(dir) = lookup("CHIMED_STATE_DIR") {
            config.state_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("CHIMED_SOCKET") {
            config.socket_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("CHIMED_LOCKFILE") {
            config.lock_file = PathBuf::from(path);
        }
        if let Some(path) = lookup("CHIMED_UI_SOCKET") {
            config.ui_socket = PathBuf::from(path);
        }
        if let Some(path) = lookup("CHIMED_OFFLINE_FLAG") {
            config.offline_flag = PathBuf::from(path);
        }
        if let Some(value) = lookup("CHIMED_ACTING_DEAD") {
            config.acting_dead = matches!(value.as_str(), "1" | "true" | "yes");
        }
        config
    }

    /// Returns the persistence paths under the state directory.
    #[must_use]
    pub fn store_paths(&self) -> StorePaths {
        StorePaths::under(Path::new(&self.state_dir))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_defaults() {
        let config = DaemonConfig::from_lookup(|_| None);
        assert_eq!(config.state_dir, PathBuf::from("/var/lib/chimed"));
        assert!(!config.acting_dead);
    }

    #[rstest]
    fn test_overrides() {
        let config = DaemonConfig::from_lookup(|key| match key {
            "CHIMED_STATE_DIR" => Some("/tmp/chime-state".to_string()),
            "CHIMED_SOCKET" => Some("/tmp/chime.sock".to_string()),
            "CHIMED_ACTING_DEAD" => Some("1".to_string()),
            _ => None,
        });
        assert_eq!(config.state_dir, PathBuf::from("/tmp/chime-state"));
        assert_eq!(config.socket_path, PathBuf::from("/tmp/chime.sock"));
        assert!(config.acting_dead);
    }

    #[rstest]
    fn test_store_paths_derive_from_state_dir() {
        let config = DaemonConfig::from_lookup(|key| {
            (key == "CHIMED_STATE_DIR").then(|| "/srv/chimed".to_string())
        });
        let paths = config.store_paths();
        assert_eq!(paths.queue_file, PathBuf::from("/srv/chimed/queue.json"));
        assert_eq!(
            paths.next_time_file,
            PathBuf::from("/srv/chimed/next_alarm_time")
        );
        assert_eq!(
            paths.next_mode_file,
            PathBuf::from("/srv/chimed/next_alarm_mode")
        );
    }

    #[rstest]
    #[case("true", true)]
    #[case("yes", true)]
    #[case("0", false)]
    #[case("off", false)]
    fn test_acting_dead_parsing(#[case] value: &str, #[case] expected: bool) {
        let value = value.to_string();
        let config = DaemonConfig::from_lookup(|key| {
            (key == "CHIMED_ACTING_DEAD").then(|| value.clone())
        });
        assert_eq!(config.acting_dead, expected);
    }
}
