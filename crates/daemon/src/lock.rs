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

//! Single-instance pidfile lock.

use std::{
    fs,
    path::{Path, PathBuf},
};

/// Holds the daemon's pidfile; released (removed) on drop.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    /// Acquires the pidfile, taking over stale files from dead processes.
    ///
    /// # Errors
    ///
    /// Returns an error if another live daemon holds the lock or the file
    /// cannot be written.
    pub fn acquire(path: &Path) -> anyhow::Result<Self> {
        if let Ok(contents) = fs::read_to_string(path) {
            if let Ok(pid) = contents.trim().parse::<u32>() {
                if process_alive(pid) {
                    anyhow::bail!(
                        "another instance (pid {pid}) holds {}",
                        path.display()
                    );
                }
                log::warn!("Removing stale lock of dead pid {pid}");
            }
            fs::remove_file(path)?;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, format!("{}\n", std::process::id()))?;

        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Failed to remove lock {}: {e}", self.path.display());
        }
    }
}

fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_acquire_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chimed.pid");

        {
            let _lock = InstanceLock::acquire(&path).unwrap();
            assert!(path.exists());
            let pid: u32 = fs::read_to_string(&path).unwrap().trim().parse().unwrap();
            assert_eq!(pid, std::process::id());
        }
        assert!(!path.exists());
    }

    #[rstest]
    fn test_second_acquire_fails_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chimed.pid");

        let _lock = InstanceLock::acquire(&path).unwrap();
        assert!(InstanceLock::acquire(&path).is_err());
    }

    #[rstest]
    fn test_stale_lock_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chimed.pid");
        // No such pid on any sane system.
        fs::write(&path, "4294967294\n").unwrap();

        let _lock = InstanceLock::acquire(&path).unwrap();
        let pid: u32 = fs::read_to_string(&path).unwrap().trim().parse().unwrap();
        assert_eq!(pid, std::process::id());
    }
}
