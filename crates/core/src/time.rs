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

//! Wall-clock timestamps with second precision.
//!
//! The daemon schedules at whole-second granularity, so timestamps are UNIX
//! seconds wrapped in [`UnixTime`]. Arithmetic saturates at zero on the low
//! side rather than wrapping into the far future.

use std::{
    fmt::Display,
    ops::{Add, AddAssign, Sub},
    str::FromStr,
    time::{SystemTime, UNIX_EPOCH},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds per minute.
pub const SECS_PER_MIN: u64 = 60;

/// Seconds per day.
pub const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Represents a wall-clock instant as UNIX timestamp (seconds).
#[repr(transparent)]
#[derive(
    Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UnixTime(u64);

impl UnixTime {
    /// Creates a new [`UnixTime`] instance from the given UNIX seconds.
    #[must_use]
    pub const fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Reads the current wall-clock time from the system clock.
    ///
    /// # Panics
    ///
    /// Panics if the system clock is set before the UNIX epoch.
    #[must_use]
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("System clock set before UNIX epoch")
            .as_secs();
        Self(secs)
    }

    /// Returns the underlying value as `u64`.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the underlying value as `i64`.
    ///
    /// Values beyond `i64::MAX` saturate; the daemon never schedules that far out.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        if self.0 > i64::MAX as u64 {
            i64::MAX
        } else {
            self.0 as i64
        }
    }

    /// Returns the instant shifted forward by the given number of minutes.
    #[must_use]
    pub const fn add_mins(&self, mins: u64) -> Self {
        Self(self.0 + mins * SECS_PER_MIN)
    }

    /// Returns the number of seconds from `earlier` to `self`, saturating at zero.
    #[must_use]
    pub const fn secs_since(&self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Returns the instant as an RFC 3339 formatted string.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        DateTime::<Utc>::from_timestamp(self.as_i64(), 0)
            .unwrap_or_default()
            .to_rfc3339()
    }
}

impl From<u64> for UnixTime {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<UnixTime> for u64 {
    fn from(value: UnixTime) -> Self {
        value.0
    }
}

impl FromStr for UnixTime {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

impl PartialEq<u64> for UnixTime {
    fn eq(&self, other: &u64) -> bool {
        self.0 == *other
    }
}

impl Add<u64> for UnixTime {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u64> for UnixTime {
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

impl Sub<u64> for UnixTime {
    type Output = Self;

    fn sub(self, rhs: u64) -> Self::Output {
        Self(self.0.saturating_sub(rhs))
    }
}

impl Display for UnixTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_add_mins() {
        let t = UnixTime::new(1_000);
        assert_eq!(t.add_mins(5), UnixTime::new(1_300));
    }

    #[rstest]
    fn test_secs_since_saturates() {
        let earlier = UnixTime::new(100);
        let later = UnixTime::new(250);
        assert_eq!(later.secs_since(earlier), 150);
        assert_eq!(earlier.secs_since(later), 0);
    }

    #[rstest]
    fn test_sub_saturates_at_zero() {
        let t = UnixTime::new(30);
        assert_eq!(t - 100, UnixTime::new(0));
    }

    #[rstest]
    #[case("0", 0)]
    #[case("1136073600", 1_136_073_600)]
    #[case(" 42\n", 42)]
    fn test_from_str(#[case] input: &str, #[case] expected: u64) {
        assert_eq!(UnixTime::from_str(input).unwrap(), UnixTime::new(expected));
    }

    #[rstest]
    fn test_from_str_invalid() {
        assert!(UnixTime::from_str("not-a-number").is_err());
    }

    #[rstest]
    fn test_serde_transparent() {
        let t = UnixTime::new(1_136_073_600);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "1136073600");
        let back: UnixTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    #[rstest]
    fn test_to_rfc3339() {
        let t = UnixTime::new(0);
        assert_eq!(t.to_rfc3339(), "1970-01-01T00:00:00+00:00");
    }

    #[rstest]
    fn test_ordering() {
        assert!(UnixTime::new(1) < UnixTime::new(2));
        assert_eq!(UnixTime::new(7), 7_u64);
    }
}
