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

//! Core primitives for the chime alarm daemon.
//!
//! The *chime-core* crate provides the foundational building blocks shared by
//! the daemon's components:
//!
//! - [`UnixTime`] wall-clock timestamps at second precision.
//! - Correctness checks for argument validation.
//! - Payload string escaping for brace-delimited request formats.
//! - A JSON [`serialization::Serializable`] trait for wire and store types.

pub mod correctness;
pub mod serialization;
pub mod string;
pub mod time;

pub use time::{SECS_PER_DAY, SECS_PER_MIN, UnixTime};
