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

//! Messages delivered from collaborator tasks into the daemon loop.

use chime_common::{Cookie, DialogResponse};

/// An event arriving on the daemon loop from a collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DaemonEvent {
    /// A dialog request was delivered to the UI; starts the resend clock.
    DialogShown {
        /// Cookie of the dialog's event.
        cookie: Cookie,
    },
    /// The UI answered a dialog or power-up request.
    DialogResponse {
        /// Cookie of the dialog's event.
        cookie: Cookie,
        /// The user's response.
        response: DialogResponse,
    },
    /// A spawned command finished.
    ChildExited {
        /// Cookie of the exec event.
        cookie: Cookie,
        /// Exit code, `None` when killed by a signal.
        code: Option<i32>,
    },
    /// The connectivity hook reports the device online.
    ConnectivityOnline,
    /// The wall clock jumped relative to monotonic time.
    TimeChanged,
}
