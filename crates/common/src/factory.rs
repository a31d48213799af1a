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

//! Conversion between events/actions and typed property documents.
//!
//! Each type declares its property list statically; the vocabulary (class
//! tags and property names) is stable because the persisted store and the
//! request surface share it. Unknown classes and unusable values are skipped
//! with a warning so an old or damaged document loads best-effort.

use chime_core::UnixTime;

use crate::{
    action::{Action, ActionPayload, BusArg, BusCall, DialogInfo, ExecCommand},
    event::{AlarmEvent, Recurrence},
    flags::EventFlags,
    props::{ObjectNode, TypedValue},
};

/// Class tag for a plain event.
pub const CLASS_EVENT: &str = "event";
/// Class tag for a recurring event.
pub const CLASS_EVENT_RECURRING: &str = "event_recurring";
/// Class tag for a payload-less action.
pub const CLASS_ACTION: &str = "action";
/// Class tag for a dialog action.
pub const CLASS_ACTION_DIALOG: &str = "action_dialog";
/// Class tag for a bus action.
pub const CLASS_ACTION_DBUS: &str = "action_dbus";
/// Class tag for an exec action.
pub const CLASS_ACTION_EXEC: &str = "action_exec";

/// Builds the property document for an event.
#[must_use]
pub fn event_to_node(event: &AlarmEvent) -> ObjectNode {
    let class = if event.recurrence().is_some() {
        CLASS_EVENT_RECURRING
    } else {
        CLASS_EVENT
    };
    let mut node = ObjectNode::new(class);
    node.push("action", TypedValue::Object(action_to_node(event.action())));
    node.push("time", TypedValue::Int64(event.base_time().as_i64()));
    node.push(
        "snooze_interval",
        TypedValue::Uint(event.snooze_step_mins()),
    );
    node.push("snooze", TypedValue::Uint(event.snooze_accum_mins()));
    node.push("cookie", TypedValue::Long(event.cookie()));

    if let Some(recurrence) = event.recurrence() {
        node.push("recurr_interval", TypedValue::Uint(recurrence.interval_mins));
        node.push("recurr_count", TypedValue::Int(recurrence.remaining));
        node.push(
            "real_time",
            TypedValue::Uint64(recurrence.real_time.as_u64()),
        );
    }

    node
}

/// Builds the property document for an action.
#[must_use]
pub fn action_to_node(action: &Action) -> ObjectNode {
    let class = match action.payload() {
        ActionPayload::Null => CLASS_ACTION,
        ActionPayload::Dialog(_) => CLASS_ACTION_DIALOG,
        ActionPayload::Bus(_, _) => CLASS_ACTION_DBUS,
        ActionPayload::Exec(_, _) => CLASS_ACTION_EXEC,
    };
    let mut node = ObjectNode::new(class);
    node.push("flags", TypedValue::Int(action.flags().to_wire()));

    let dialog = match action.payload() {
        ActionPayload::Dialog(info)
        | ActionPayload::Bus(info, _)
        | ActionPayload::Exec(info, _) => Some(info),
        ActionPayload::Null => None,
    };
    if let Some(info) = dialog {
        node.push("title", TypedValue::String(info.title.clone()));
        node.push("message", TypedValue::String(info.message.clone()));
        node.push("sound", TypedValue::String(info.sound.clone()));
        node.push("icon", TypedValue::String(info.icon.clone()));
    }

    match action.payload() {
        ActionPayload::Bus(_, call) => {
            node.push("interface", TypedValue::String(call.interface.clone()));
            node.push("service", TypedValue::String(call.service.clone()));
            node.push("path", TypedValue::String(call.path.clone()));
            node.push("name", TypedValue::String(call.name.clone()));
            node.push(
                "arguments",
                TypedValue::ValueArray(call.args.iter().map(bus_arg_to_value).collect()),
            );
        }
        ActionPayload::Exec(_, exec) => {
            node.push("path", TypedValue::String(exec.command.clone()));
        }
        ActionPayload::Null | ActionPayload::Dialog(_) => {}
    }

    node
}

/// Instantiates an event from its property document.
///
/// Returns `None` for unknown classes. Missing or mistyped properties fall
/// back to defaults with a warning.
#[must_use]
pub fn event_from_node(node: &ObjectNode) -> Option<AlarmEvent> {
    let recurring = match node.class.as_str() {
        CLASS_EVENT => false,
        CLASS_EVENT_RECURRING => true,
        other => {
            log::warn!("Skipping unknown event class '{other}'");
            return None;
        }
    };

    let base_time = match node.get("time").and_then(TypedValue::as_u64) {
        Some(secs) => UnixTime::new(secs),
        None => {
            log::warn!("Event document missing 'time', defaulting to epoch");
            UnixTime::new(0)
        }
    };
    let snooze_step = get_u32(node, "snooze_interval");
    let snooze_accum = get_u32(node, "snooze");
    let cookie = node.get("cookie").and_then(TypedValue::as_i64).unwrap_or(0);

    let action = match node.get("action").and_then(TypedValue::as_object) {
        Some(action_node) => action_from_node(action_node).unwrap_or_else(|| {
            log::warn!("Event document carries unusable action, using null action");
            Action::null()
        }),
        None => {
            log::warn!("Event document missing 'action', using null action");
            Action::null()
        }
    };

    let mut event = if recurring {
        let interval_mins = get_u32(node, "recurr_interval");
        if interval_mins == 0 {
            log::warn!("Recurring event document has zero interval, loading as one-shot");
            AlarmEvent::new(base_time, snooze_step, action)
        } else {
            let remaining = node
                .get("recurr_count")
                .and_then(TypedValue::as_i32)
                .unwrap_or(0);
            let real_time = node
                .get("real_time")
                .and_then(TypedValue::as_u64)
                .map(UnixTime::new)
                .unwrap_or(base_time);
            AlarmEvent::new_recurring(
                base_time,
                snooze_step,
                action,
                Recurrence::new(interval_mins, remaining, real_time),
            )
        }
    } else {
        AlarmEvent::new(base_time, snooze_step, action)
    };

    event.set_cookie(cookie.max(0));
    event.set_snooze_accum_mins(snooze_accum);
    Some(event)
}

/// Instantiates an action from its property document.
///
/// Returns `None` for unknown classes.
#[must_use]
pub fn action_from_node(node: &ObjectNode) -> Option<Action> {
    let flags = EventFlags::from_wire(
        node.get("flags").and_then(TypedValue::as_i32).unwrap_or(0),
    );

    let dialog = || DialogInfo {
        title: get_string(node, "title"),
        message: get_string(node, "message"),
        sound: get_string(node, "sound"),
        icon: get_string(node, "icon"),
    };

    let payload = match node.class.as_str() {
        CLASS_ACTION => ActionPayload::Null,
        CLASS_ACTION_DIALOG => ActionPayload::Dialog(dialog()),
        CLASS_ACTION_DBUS => {
            let args = node
                .get("arguments")
                .and_then(TypedValue::as_array)
                .unwrap_or(&[])
                .iter()
                .filter_map(bus_arg_from_value)
                .collect();
            ActionPayload::Bus(
                dialog(),
                BusCall {
                    service: get_string(node, "service"),
                    path: get_string(node, "path"),
                    interface: get_string(node, "interface"),
                    name: get_string(node, "name"),
                    args,
                },
            )
        }
        CLASS_ACTION_EXEC => ActionPayload::Exec(
            dialog(),
            ExecCommand {
                command: get_string(node, "path"),
            },
        ),
        other => {
            log::warn!("Skipping unknown action class '{other}'");
            return None;
        }
    };

    Some(Action::new(flags, payload))
}

fn get_u32(node: &ObjectNode, name: &str) -> u32 {
    node.get(name).and_then(TypedValue::as_u32).unwrap_or(0)
}

fn get_string(node: &ObjectNode, name: &str) -> String {
    node.get(name)
        .and_then(TypedValue::as_str)
        .unwrap_or_default()
        .to_string()
}

fn bus_arg_to_value(arg: &BusArg) -> TypedValue {
    match arg {
        BusArg::Boolean(v) => TypedValue::Boolean(*v),
        BusArg::Int(v) => TypedValue::Int(*v),
        BusArg::Uint(v) => TypedValue::Uint(*v),
        BusArg::Int64(v) => TypedValue::Int64(*v),
        BusArg::Uint64(v) => TypedValue::Uint64(*v),
        BusArg::Double(v) => TypedValue::Double(*v),
        BusArg::String(v) => TypedValue::String(v.clone()),
    }
}

fn bus_arg_from_value(value: &TypedValue) -> Option<BusArg> {
    match value {
        TypedValue::Boolean(v) => Some(BusArg::Boolean(*v)),
        TypedValue::Int(v) => Some(BusArg::Int(*v)),
        TypedValue::Uint(v) => Some(BusArg::Uint(*v)),
        TypedValue::Int64(v) => Some(BusArg::Int64(*v)),
        TypedValue::Uint64(v) => Some(BusArg::Uint64(*v)),
        TypedValue::Double(v) => Some(BusArg::Double(*v)),
        TypedValue::String(v) => Some(BusArg::String(v.clone())),
        other => {
            log::warn!("Skipping unsupported bus argument type {other:?}");
            None
        }
    }
}
