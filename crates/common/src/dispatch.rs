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

//! The request dispatcher: translates external requests into queue operations.
//!
//! The transport envelope is opaque here; the daemon's server layer peels it
//! and hands over a [`Request`]. Input errors leave the queue unchanged and
//! are reported as a typed [`DispatchError`] so the transport can form an
//! error reply.

use chime_core::{UnixTime, correctness::check_positive_u32};
use serde::{Deserialize, Serialize};

use crate::{
    event::Cookie,
    factory,
    flags::EventFlags,
    props::ObjectNode,
    queue::AlarmQueue,
};

/// A request against the queue's external surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Register a new event described by a property document.
    AddEvent {
        /// The event description.
        event: ObjectNode,
    },
    /// Cancel the event with the given cookie.
    DelEvent {
        /// Target cookie.
        cookie: Cookie,
    },
    /// Enumerate cookies within a time window matching the flag filter.
    QueryEvent {
        /// Window lower bound (UNIX seconds).
        time_lo: u64,
        /// Window upper bound (UNIX seconds).
        time_hi: u64,
        /// Flag mask (int32 wire form).
        flag_mask: i32,
        /// Flag values to match under the mask (int32 wire form).
        flag_values: i32,
    },
    /// Fetch the property document of the event with the given cookie.
    GetEvent {
        /// Target cookie.
        cookie: Cookie,
    },
    /// Set the queue default snooze in minutes (must be positive).
    SetSnooze {
        /// New default snooze in minutes.
        minutes: u32,
    },
    /// Get the queue default snooze in minutes.
    GetSnooze,
}

/// A successful reply to a [`Request`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Response {
    /// Cookie assigned to an added event.
    Cookie {
        /// The assigned cookie.
        cookie: Cookie,
    },
    /// Whether a deleted event was found.
    Found {
        /// True when the cookie was present.
        found: bool,
    },
    /// Cookies matching a query.
    Cookies {
        /// Matching cookies in scan order.
        cookies: Vec<Cookie>,
    },
    /// Property document of a fetched event.
    Event {
        /// The event description.
        event: ObjectNode,
    },
    /// Acknowledgement of a snooze default change.
    Ok,
    /// Current default snooze in minutes.
    Snooze {
        /// Default snooze in minutes.
        minutes: u32,
    },
}

/// Input errors the request surface reports without touching the queue.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The cookie does not name a known event.
    #[error("unknown cookie {0}")]
    UnknownCookie(Cookie),
    /// The event description cannot be instantiated.
    #[error("malformed event description: {0}")]
    MalformedEvent(String),
    /// The snooze default must be positive.
    #[error("snooze minutes must be positive")]
    InvalidSnooze,
}

/// Applies a request to the queue.
///
/// All mutations are applied before the reply is formed, so a transport
/// failure on the reply path cannot desynchronise the queue.
///
/// # Errors
///
/// Returns a [`DispatchError`] for invalid input; the queue is unchanged.
pub fn dispatch(queue: &mut AlarmQueue, request: Request) -> Result<Response, DispatchError> {
    match request {
        Request::AddEvent { event } => {
            let event = factory::event_from_node(&event)
                .ok_or_else(|| DispatchError::MalformedEvent("unknown event class".to_string()))?;
            let cookie = queue
                .add(event)
                .map_err(|e| DispatchError::MalformedEvent(e.to_string()))?;
            Ok(Response::Cookie { cookie })
        }
        Request::DelEvent { cookie } => Ok(Response::Found {
            found: queue.remove(cookie),
        }),
        Request::QueryEvent {
            time_lo,
            time_hi,
            flag_mask,
            flag_values,
        } => {
            let cookies = queue.query(
                UnixTime::new(time_lo),
                UnixTime::new(time_hi),
                EventFlags::from_wire(flag_mask),
                EventFlags::from_wire(flag_values),
            );
            Ok(Response::Cookies { cookies })
        }
        Request::GetEvent { cookie } => queue
            .get(cookie)
            .map(|event| Response::Event {
                event: factory::event_to_node(event),
            })
            .ok_or(DispatchError::UnknownCookie(cookie)),
        Request::SetSnooze { minutes } => {
            check_positive_u32(minutes, "minutes").map_err(|_| DispatchError::InvalidSnooze)?;
            queue.set_default_snooze(minutes);
            Ok(Response::Ok)
        }
        Request::GetSnooze => Ok(Response::Snooze {
            minutes: queue.default_snooze(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{
        action::Action,
        clock::TestClock,
        event::AlarmEvent,
    };

    fn test_queue() -> AlarmQueue {
        AlarmQueue::new(Box::new(TestClock::new(UnixTime::new(1_000_000))))
    }

    fn add_request(base: u64, flags: EventFlags) -> Request {
        let mut event = AlarmEvent::new(UnixTime::new(base), 0, Action::with_flags(flags));
        event.set_cookie(0);
        Request::AddEvent {
            event: factory::event_to_node(&event),
        }
    }

    #[rstest]
    fn test_add_get_del_cycle() {
        let mut queue = test_queue();

        let Response::Cookie { cookie } =
            dispatch(&mut queue, add_request(1_000_100, EventFlags::empty())).unwrap()
        else {
            panic!("Expected cookie response")
        };
        assert!(cookie > 0);

        let got = dispatch(&mut queue, Request::GetEvent { cookie }).unwrap();
        match &got {
            Response::Event { event } => assert_eq!(event.class, factory::CLASS_EVENT),
            other => panic!("Expected event response, was {other:?}"),
        }

        // The reply's property bag must carry the `type=<tag>` wire shape.
        let json = serde_json::to_value(&got).unwrap();
        assert_eq!(json["event"]["type"], factory::CLASS_EVENT);
        assert_eq!(
            json["event"]["parameters"][0]["value"]["type"],
            factory::CLASS_ACTION
        );

        assert_eq!(
            dispatch(&mut queue, Request::DelEvent { cookie }).unwrap(),
            Response::Found { found: true }
        );
        assert_eq!(
            dispatch(&mut queue, Request::DelEvent { cookie }).unwrap(),
            Response::Found { found: false }
        );
    }

    #[rstest]
    fn test_get_unknown_cookie_is_an_input_error() {
        let mut queue = test_queue();
        assert_eq!(
            dispatch(&mut queue, Request::GetEvent { cookie: 9 }),
            Err(DispatchError::UnknownCookie(9))
        );
    }

    #[rstest]
    fn test_add_malformed_event_leaves_queue_unchanged() {
        let mut queue = test_queue();
        let result = dispatch(
            &mut queue,
            Request::AddEvent {
                event: ObjectNode::new("event_lunar"),
            },
        );
        assert!(matches!(result, Err(DispatchError::MalformedEvent(_))));
        assert!(queue.is_empty());
    }

    #[rstest]
    fn test_query_filters_on_flags() {
        let mut queue = test_queue();
        dispatch(&mut queue, add_request(1_000_100, EventFlags::empty())).unwrap();
        let Response::Cookie { cookie: boot } =
            dispatch(&mut queue, add_request(1_000_200, EventFlags::BOOT)).unwrap()
        else {
            panic!("Expected cookie response")
        };

        let response = dispatch(
            &mut queue,
            Request::QueryEvent {
                time_lo: 1_000_000,
                time_hi: 1_001_000,
                flag_mask: EventFlags::BOOT.to_wire(),
                flag_values: EventFlags::BOOT.to_wire(),
            },
        )
        .unwrap();
        assert_eq!(
            response,
            Response::Cookies {
                cookies: vec![boot]
            }
        );
    }

    #[rstest]
    fn test_snooze_roundtrip_and_zero_rejection() {
        let mut queue = test_queue();
        assert_eq!(
            dispatch(&mut queue, Request::SetSnooze { minutes: 0 }),
            Err(DispatchError::InvalidSnooze)
        );
        assert_eq!(
            dispatch(&mut queue, Request::GetSnooze).unwrap(),
            Response::Snooze { minutes: 10 }
        );

        dispatch(&mut queue, Request::SetSnooze { minutes: 25 }).unwrap();
        assert_eq!(
            dispatch(&mut queue, Request::GetSnooze).unwrap(),
            Response::Snooze { minutes: 25 }
        );
    }

    #[rstest]
    fn test_request_serde_wire_shape() {
        let json = serde_json::to_value(Request::DelEvent { cookie: 12 }).unwrap();
        assert_eq!(json["op"], "del_event");
        assert_eq!(json["cookie"], 12);

        let request: Request =
            serde_json::from_str(r#"{"op":"set_snooze","minutes":5}"#).unwrap();
        assert_eq!(request, Request::SetSnooze { minutes: 5 });
    }
}
