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

//! Correctness checks for function argument validation.
//!
//! These return `anyhow::Result` so call sites can either propagate with `?`
//! or assert a construction invariant with `.expect(FAILED)`.

/// Standard message for a failed correctness check on a construction invariant.
pub const FAILED: &str = "Condition failed";

/// Checks the `predicate` is true.
///
/// # Errors
///
/// Returns an error if `predicate` is false.
pub fn check_predicate_true(predicate: bool, fail_msg: &str) -> anyhow::Result<()> {
    if !predicate {
        anyhow::bail!("{fail_msg}")
    }
    Ok(())
}

/// Checks the `u32` value is positive (> 0).
///
/// # Errors
///
/// Returns an error if `value` is zero.
pub fn check_positive_u32(value: u32, param: &str) -> anyhow::Result<()> {
    if value == 0 {
        anyhow::bail!("invalid u32 for '{param}' not positive, was {value}")
    }
    Ok(())
}

/// Checks the `i64` value is positive (> 0).
///
/// # Errors
///
/// Returns an error if `value` is not positive.
pub fn check_positive_i64(value: i64, param: &str) -> anyhow::Result<()> {
    if value <= 0 {
        anyhow::bail!("invalid i64 for '{param}' not positive, was {value}")
    }
    Ok(())
}

/// Checks the string is not empty and contains no control characters.
///
/// # Errors
///
/// Returns an error if `value` is empty or contains a control character.
pub fn check_valid_string(value: &str, param: &str) -> anyhow::Result<()> {
    if value.is_empty() {
        anyhow::bail!("invalid string for '{param}' was empty")
    }
    if value.chars().any(char::is_control) {
        anyhow::bail!("invalid string for '{param}' contained a control character")
    }
    Ok(())
}
