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

//! Crash-safe persistence of the whole queue.
//!
//! Every observable mutation ends with the daemon loop calling [`save`]: the
//! queue snapshot is serialised to a versioned document and atomically
//! replaces the stored file (write-to-temp, rename). Two hint files are
//! refreshed alongside so an external collaborator can program an RTC wake
//! while the daemon is not running.
//!
//! Load is symmetric and suppresses change notifications until the bulk load
//! completes.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use chime_core::serialization::Serializable;

use crate::{
    factory,
    props::{Document, Property, TypedValue},
    queue::AlarmQueue,
};

/// Version tag written into every persisted document.
pub const DOCUMENT_VERSION: u32 = 1;

/// Locations of the persisted queue and the RTC hint files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorePaths {
    /// The queue document.
    pub queue_file: PathBuf,
    /// Hint: effective time of the earliest power-up event (`0` if none).
    pub next_time_file: PathBuf,
    /// Hint: wake mode, one of `actdead`, `powerup`, `n/a`.
    pub next_mode_file: PathBuf,
}

impl StorePaths {
    /// Derives the conventional file names under a state directory.
    #[must_use]
    pub fn under(state_dir: &Path) -> Self {
        Self {
            queue_file: state_dir.join("queue.json"),
            next_time_file: state_dir.join("next_alarm_time"),
            next_mode_file: state_dir.join("next_alarm_mode"),
        }
    }
}

/// Builds the persisted document for the queue.
#[must_use]
pub fn snapshot(queue: &AlarmQueue) -> Document {
    Document {
        kind: "queue".to_string(),
        version: DOCUMENT_VERSION,
        parameters: vec![Property {
            name: "snooze".to_string(),
            value: TypedValue::Uint(queue.default_snooze()),
        }],
        children: queue.events_save_order().map(factory::event_to_node).collect(),
    }
}

/// Serialises the queue and atomically replaces the stored document, then
/// refreshes the hint files.
///
/// # Errors
///
/// Returns an error on serialization or I/O failure; in-memory state is not
/// rolled back and the next successful write absorbs the delta.
pub fn save(queue: &AlarmQueue, paths: &StorePaths) -> anyhow::Result<()> {
    let document = snapshot(queue);
    let bytes = document.to_json_bytes()?;

    write_atomic(&paths.queue_file, &bytes)?;

    let (time, mode) = match queue.next_boot() {
        Some((time, mode)) => (time.as_u64(), mode),
        None => (0, crate::enums::WakeMode::NotApplicable),
    };
    fs::write(&paths.next_time_file, format!("{time}\n"))?;
    fs::write(&paths.next_mode_file, format!("{mode}\n"))?;

    log::debug!(
        "Persisted {} events to {}",
        document.children.len(),
        paths.queue_file.display()
    );
    Ok(())
}

/// Loads the stored document into the queue, suppressing change tracking for
/// the duration of the bulk load.
///
/// Returns the number of events restored; a missing file restores nothing.
/// Unknown event classes are skipped with a warning.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(queue: &mut AlarmQueue, paths: &StorePaths) -> anyhow::Result<usize> {
    if !paths.queue_file.exists() {
        log::info!("No stored queue at {}", paths.queue_file.display());
        return Ok(0);
    }

    let bytes = fs::read(&paths.queue_file)?;
    let document = Document::from_json_bytes(&bytes)?;

    if document.version != DOCUMENT_VERSION {
        log::warn!(
            "Stored queue has version {}, expected {DOCUMENT_VERSION}; loading best-effort",
            document.version
        );
    }

    queue.set_muted(true);

    if let Some(snooze) = document
        .parameters
        .iter()
        .find(|p| p.name == "snooze")
        .and_then(|p| p.value.as_u32())
    {
        if snooze > 0 {
            queue.set_default_snooze(snooze);
        }
    }

    let mut restored = 0;
    for child in &document.children {
        let Some(event) = factory::event_from_node(child) else {
            continue;
        };
        match queue.add(event) {
            Ok(_) => restored += 1,
            Err(e) => log::warn!("Skipping stored event: {e}"),
        }
    }

    queue.set_muted(false);
    log::info!(
        "Restored {restored} events from {}",
        paths.queue_file.display()
    );
    Ok(restored)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chime_core::UnixTime;
    use rstest::rstest;

    use super::*;
    use crate::{
        action::{Action, ActionPayload, DialogInfo},
        clock::TestClock,
        event::{AlarmEvent, Recurrence},
        flags::EventFlags,
    };

    fn test_queue() -> AlarmQueue {
        AlarmQueue::new(Box::new(TestClock::new(UnixTime::new(1_000_000))))
    }

    fn store() -> (tempfile::TempDir, StorePaths) {
        let dir = tempfile::tempdir().unwrap();
        let paths = StorePaths::under(dir.path());
        (dir, paths)
    }

    fn populate(queue: &mut AlarmQueue) {
        queue.set_default_snooze(15);
        queue
            .add(AlarmEvent::new(
                UnixTime::new(1_000_500),
                5,
                Action::new(
                    EventFlags::BOOT | EventFlags::ACTDEAD,
                    ActionPayload::Dialog(DialogInfo {
                        title: "Wake".to_string(),
                        message: "up".to_string(),
                        sound: String::new(),
                        icon: String::new(),
                    }),
                ),
            ))
            .unwrap();
        queue
            .add(AlarmEvent::new_recurring(
                UnixTime::new(1_000_900),
                0,
                Action::null(),
                Recurrence::new(60, 3, UnixTime::new(1_000_900)),
            ))
            .unwrap();
    }

    fn fingerprint(queue: &AlarmQueue) -> Vec<(i64, u64, u32, String, i32, Option<(u32, i32, u64)>)> {
        queue
            .events_save_order()
            .map(|e| {
                (
                    e.cookie(),
                    e.base_time().as_u64(),
                    e.snooze_accum_mins(),
                    format!("{:?}", std::mem::discriminant(e.action().payload())),
                    e.flags().to_wire(),
                    e.recurrence()
                        .map(|r| (r.interval_mins, r.remaining, r.real_time.as_u64())),
                )
            })
            .collect()
    }

    #[rstest]
    fn test_save_load_roundtrip_preserves_queue() {
        let (_dir, paths) = store();
        let mut queue = test_queue();
        populate(&mut queue);

        save(&queue, &paths).unwrap();

        let mut reloaded = test_queue();
        let restored = load(&mut reloaded, &paths).unwrap();
        assert_eq!(restored, 2);
        assert_eq!(reloaded.default_snooze(), 15);
        assert_eq!(fingerprint(&reloaded), fingerprint(&queue));
        // The bulk load must not leave the queue dirty.
        assert!(!reloaded.take_dirty());
    }

    #[rstest]
    fn test_save_writes_hint_files() {
        let (_dir, paths) = store();
        let mut queue = test_queue();
        populate(&mut queue);

        save(&queue, &paths).unwrap();

        let time = std::fs::read_to_string(&paths.next_time_file).unwrap();
        let mode = std::fs::read_to_string(&paths.next_mode_file).unwrap();
        assert_eq!(time, "1000500\n");
        assert_eq!(mode, "actdead\n");
    }

    #[rstest]
    fn test_hint_files_without_boot_events() {
        let (_dir, paths) = store();
        let mut queue = test_queue();
        queue
            .add(AlarmEvent::new(UnixTime::new(1_000_500), 0, Action::null()))
            .unwrap();

        save(&queue, &paths).unwrap();

        let time = std::fs::read_to_string(&paths.next_time_file).unwrap();
        let mode = std::fs::read_to_string(&paths.next_mode_file).unwrap();
        assert_eq!(time, "0\n");
        assert_eq!(mode, "n/a\n");
    }

    #[rstest]
    fn test_load_missing_file_restores_nothing() {
        let (_dir, paths) = store();
        let mut queue = test_queue();
        assert_eq!(load(&mut queue, &paths).unwrap(), 0);
        assert!(queue.is_empty());
    }

    #[rstest]
    fn test_load_skips_unknown_classes() {
        let (_dir, paths) = store();
        let mut queue = test_queue();
        populate(&mut queue);

        let mut document = snapshot(&queue);
        document.children[0].class = "event_lunar".to_string();
        std::fs::write(&paths.queue_file, document.to_json_bytes().unwrap()).unwrap();

        let mut reloaded = test_queue();
        assert_eq!(load(&mut reloaded, &paths).unwrap(), 1);
    }

    #[rstest]
    fn test_load_rejects_garbage() {
        let (_dir, paths) = store();
        std::fs::write(&paths.queue_file, b"not a document").unwrap();
        let mut queue = test_queue();
        assert!(load(&mut queue, &paths).is_err());
    }

    #[rstest]
    fn test_save_replaces_atomically() {
        let (_dir, paths) = store();
        let mut queue = test_queue();
        populate(&mut queue);
        save(&queue, &paths).unwrap();

        // A second save must replace, not append.
        save(&queue, &paths).unwrap();
        let mut reloaded = test_queue();
        assert_eq!(load(&mut reloaded, &paths).unwrap(), 2);
        assert!(!paths.queue_file.with_extension("tmp").exists());
    }
}
