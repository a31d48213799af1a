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

//! Actions performed when an event fires.
//!
//! An action is a tagged variant over {Null, Dialog, Bus, Exec} plus the flag
//! bitset. Suspensions ("waiting for connectivity", "waiting for the user",
//! "waiting for the child") are explicit [`ActionStage`] state so that crash
//! recovery and cancellation stay deterministic: every entry point returns an
//! [`ActionProgress`] and an acknowledgement is produced exactly once.
//!
//! Bus and exec actions extend dialog behaviour: the dialog (if any) runs
//! first, and only a NORMAL dialog outcome triggers the bus call or the
//! subprocess. The external call itself is fire-and-forget at this
//! granularity; failures are logged, never retried.

use chime_core::UnixTime;
use serde::{Deserialize, Serialize};

use crate::{
    enums::{AckOutcome, DialogResponse},
    event::Cookie,
    flags::EventFlags,
    hooks::{DialogRequest, Hooks},
};

/// Number of times a dialog request is sent before giving up on resends.
pub const DIALOG_ATTEMPTS_MAX: u32 = 3;

/// Seconds without a response after which a dialog request is re-sent.
pub const DIALOG_RESEND_SECS: u64 = 5 * 60;

/// Dialog presentation payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogInfo {
    /// Dialog title.
    pub title: String,
    /// Dialog message body.
    pub message: String,
    /// Sound to play, empty for none.
    pub sound: String,
    /// Icon to show, empty for the default.
    pub icon: String,
}

/// A single argument of a bus call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum BusArg {
    /// Boolean argument.
    Boolean(bool),
    /// Signed 32-bit argument.
    Int(i32),
    /// Unsigned 32-bit argument.
    Uint(u32),
    /// Signed 64-bit argument.
    Int64(i64),
    /// Unsigned 64-bit argument.
    Uint64(u64),
    /// Double-precision argument.
    Double(f64),
    /// String argument.
    String(String),
}

/// A method invocation on the message bus.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BusCall {
    /// Destination service name.
    pub service: String,
    /// Object path.
    pub path: String,
    /// Interface name.
    pub interface: String,
    /// Method name.
    pub name: String,
    /// Call arguments.
    pub args: Vec<BusArg>,
}

/// A command line spawned through the shell.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecCommand {
    /// The command line.
    pub command: String,
}

/// Variant-specific payload of an action.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionPayload {
    /// No payload: acknowledges NORMAL immediately.
    Null,
    /// Show a dialog only.
    Dialog(DialogInfo),
    /// Dialog (unless suppressed), then a bus call.
    Bus(DialogInfo, BusCall),
    /// Dialog (unless suppressed), then a subprocess.
    Exec(DialogInfo, ExecCommand),
}

/// Continuation state of a running action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ActionStage {
    /// Not running.
    #[default]
    Idle,
    /// Waiting for the connectivity hook to report online.
    AwaitingConnectivity,
    /// Waiting for a dialog response; `attempts` counts sends so far.
    AwaitingDialog {
        /// Dialog request sends so far (1 = initial request).
        attempts: u32,
    },
    /// Waiting for the power-up UI response.
    AwaitingPowerup,
    /// Waiting for the spawned child to exit.
    AwaitingChild,
}

/// The result of driving an action one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionProgress {
    /// The action completed with the given outcome.
    Ack(AckOutcome),
    /// The action is suspended on an external collaborator.
    Pending,
    /// The input did not apply to the action's current stage.
    Ignored,
}

/// Ambient state an action runs against.
#[derive(Debug)]
pub struct ActionContext<'a> {
    /// Cookie of the owning event.
    pub cookie: Cookie,
    /// Effective fire time of the owning event.
    pub alarm_time: UnixTime,
    /// Collaborator hooks.
    pub hooks: &'a mut Hooks,
}

/// Encapsulates what to do when an event fires.
#[derive(Debug)]
pub struct Action {
    flags: EventFlags,
    payload: ActionPayload,
    stage: ActionStage,
}

impl Action {
    /// Creates a new [`Action`] instance.
    #[must_use]
    pub const fn new(flags: EventFlags, payload: ActionPayload) -> Self {
        Self {
            flags,
            payload,
            stage: ActionStage::Idle,
        }
    }

    /// Creates an action with no payload and no flags.
    #[must_use]
    pub const fn null() -> Self {
        Self::new(EventFlags::empty(), ActionPayload::Null)
    }

    /// Creates an action with no payload and the given flags.
    #[must_use]
    pub const fn with_flags(flags: EventFlags) -> Self {
        Self::new(flags, ActionPayload::Null)
    }

    /// Returns the flag bitset.
    #[must_use]
    pub const fn flags(&self) -> EventFlags {
        self.flags
    }

    /// Returns the variant payload.
    #[must_use]
    pub const fn payload(&self) -> &ActionPayload {
        &self.payload
    }

    /// Returns the current continuation stage.
    #[must_use]
    pub const fn stage(&self) -> ActionStage {
        self.stage
    }

    /// Returns whether the action requires a power-up-capable timer.
    #[must_use]
    pub const fn needs_power_up(&self) -> bool {
        self.flags.contains(EventFlags::BOOT)
    }

    /// Returns whether the action is suspended waiting for connectivity.
    #[must_use]
    pub fn is_awaiting_connectivity(&self) -> bool {
        self.stage == ActionStage::AwaitingConnectivity
    }

    /// Returns whether the action is suspended waiting for a dialog response.
    #[must_use]
    pub const fn is_awaiting_dialog(&self) -> bool {
        matches!(self.stage, ActionStage::AwaitingDialog { .. })
    }

    /// Initiates the action.
    ///
    /// `delayed` is true when the fire was delivered strictly after its
    /// nominal instant. Missed fires without RUN_DELAYED acknowledge NORMAL
    /// without doing anything.
    pub fn run(&mut self, delayed: bool, ctx: &mut ActionContext) -> ActionProgress {
        if self.payload == ActionPayload::Null {
            return self.ack(AckOutcome::Normal);
        }

        if delayed && !self.flags.contains(EventFlags::RUN_DELAYED) {
            return self.ack(AckOutcome::Normal);
        }

        if self.flags.contains(EventFlags::CONNECTED) && !ctx.hooks.connectivity.is_online() {
            self.stage = ActionStage::AwaitingConnectivity;
            return ActionProgress::Pending;
        }

        self.present(ctx)
    }

    /// Presents the dialog (or routes to the power-up UI), or goes straight to
    /// the variant step when NO_DIALOG is set.
    fn present(&mut self, ctx: &mut ActionContext) -> ActionProgress {
        if self.flags.contains(EventFlags::NO_DIALOG) {
            return self.do_action(ctx);
        }

        if self.flags.contains(EventFlags::ACTDEAD) && ctx.hooks.power.is_acting_dead() {
            return match ctx.hooks.dialogs.show_powerup(ctx.cookie) {
                Ok(()) => {
                    self.stage = ActionStage::AwaitingPowerup;
                    ActionProgress::Pending
                }
                Err(e) => {
                    log::warn!("Power-up dialog request for event {} failed: {e}", ctx.cookie);
                    self.do_action(ctx)
                }
            };
        }

        let request = self.dialog_request(ctx);
        match ctx.hooks.dialogs.show(request) {
            Ok(()) => {
                self.stage = ActionStage::AwaitingDialog { attempts: 1 };
                ActionProgress::Pending
            }
            Err(e) => {
                log::warn!("Dialog request for event {} rejected: {e}", ctx.cookie);
                self.ack(AckOutcome::Normal)
            }
        }
    }

    /// The variant-specific step after a NORMAL dialog outcome (or with
    /// NO_DIALOG set).
    fn do_action(&mut self, ctx: &mut ActionContext) -> ActionProgress {
        match &self.payload {
            ActionPayload::Null | ActionPayload::Dialog(_) => self.ack(AckOutcome::Normal),
            ActionPayload::Bus(_, call) => {
                if let Err(e) = ctx.hooks.bus.invoke(call, self.flags) {
                    log::warn!("Bus call for event {} failed: {e}", ctx.cookie);
                }
                self.ack(AckOutcome::Normal)
            }
            ActionPayload::Exec(_, exec) => {
                match ctx.hooks.spawner.spawn(ctx.cookie, &exec.command) {
                    Ok(()) => {
                        self.stage = ActionStage::AwaitingChild;
                        ActionProgress::Pending
                    }
                    Err(e) => {
                        log::warn!("Spawn for event {} failed: {e}", ctx.cookie);
                        self.ack(AckOutcome::Normal)
                    }
                }
            }
        }
    }

    /// Delivers a dialog or power-up UI response.
    pub fn dialog_response(
        &mut self,
        response: DialogResponse,
        ctx: &mut ActionContext,
    ) -> ActionProgress {
        match (self.stage, response) {
            (ActionStage::AwaitingDialog { .. }, DialogResponse::Accept)
            | (ActionStage::AwaitingDialog { .. }, DialogResponse::Timeout) => self.do_action(ctx),
            (ActionStage::AwaitingDialog { .. }, DialogResponse::Snooze) => {
                self.ack(AckOutcome::Snooze)
            }
            (ActionStage::AwaitingPowerup, DialogResponse::Powerup { power_up }) => {
                if power_up {
                    ctx.hooks.power.request_powerup();
                }
                self.ack(AckOutcome::Normal)
            }
            (stage, response) => {
                log::debug!(
                    "Dropping dialog response {response:?} for event {} in stage {stage:?}",
                    ctx.cookie
                );
                ActionProgress::Ignored
            }
        }
    }

    /// Handles the dialog resend timeout: re-sends up to
    /// [`DIALOG_ATTEMPTS_MAX`] attempts total, then keeps waiting silently.
    pub fn dialog_timeout(&mut self, ctx: &mut ActionContext) -> ActionProgress {
        let ActionStage::AwaitingDialog { attempts } = self.stage else {
            return ActionProgress::Ignored;
        };

        if attempts >= DIALOG_ATTEMPTS_MAX {
            log::warn!(
                "Dialog for event {} unanswered after {attempts} attempts",
                ctx.cookie
            );
            return ActionProgress::Pending;
        }

        let request = self.dialog_request(ctx);
        match ctx.hooks.dialogs.show(request) {
            Ok(()) => {
                self.stage = ActionStage::AwaitingDialog {
                    attempts: attempts + 1,
                };
            }
            Err(e) => log::warn!("Dialog resend for event {} failed: {e}", ctx.cookie),
        }
        ActionProgress::Pending
    }

    /// Resumes an action that was gated on connectivity.
    pub fn connectivity_online(&mut self, ctx: &mut ActionContext) -> ActionProgress {
        if self.stage != ActionStage::AwaitingConnectivity {
            return ActionProgress::Ignored;
        }
        self.present(ctx)
    }

    /// Handles the spawned child exiting.
    pub fn child_exited(&mut self, code: Option<i32>, ctx: &mut ActionContext) -> ActionProgress {
        if self.stage != ActionStage::AwaitingChild {
            return ActionProgress::Ignored;
        }
        match code {
            Some(0) => {}
            Some(code) => log::warn!("Command for event {} exited with {code}", ctx.cookie),
            None => log::warn!("Command for event {} terminated by signal", ctx.cookie),
        }
        self.ack(AckOutcome::Normal)
    }

    fn dialog_request(&self, ctx: &ActionContext) -> DialogRequest {
        let info = match &self.payload {
            ActionPayload::Dialog(info)
            | ActionPayload::Bus(info, _)
            | ActionPayload::Exec(info, _) => info.clone(),
            ActionPayload::Null => DialogInfo::default(),
        };
        DialogRequest {
            cookie: ctx.cookie,
            time: ctx.alarm_time,
            title: info.title,
            message: info.message,
            sound: info.sound,
            icon: info.icon,
            can_snooze: !self.flags.contains(EventFlags::NO_SNOOZE),
        }
    }

    fn ack(&mut self, outcome: AckOutcome) -> ActionProgress {
        self.stage = ActionStage::Idle;
        ActionProgress::Ack(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use rstest::rstest;

    use super::*;
    use crate::hooks::{Hooks, NullDialogService, NullPowerControl, StaticConnectivity};

    type DialogRecorder = Rc<RefCell<NullDialogService>>;

    fn recording_hooks() -> (Hooks, DialogRecorder) {
        let recorder: DialogRecorder = Rc::new(RefCell::new(NullDialogService::default()));
        let hooks = Hooks {
            dialogs: Box::new(recorder.clone()),
            ..Hooks::default()
        };
        (hooks, recorder)
    }

    fn dialog_action(flags: EventFlags) -> Action {
        Action::new(
            flags,
            ActionPayload::Dialog(DialogInfo {
                title: "Wake".to_string(),
                message: "Time to get up".to_string(),
                sound: String::new(),
                icon: String::new(),
            }),
        )
    }

    fn ctx(hooks: &mut Hooks) -> ActionContext<'_> {
        ActionContext {
            cookie: 7,
            alarm_time: UnixTime::new(1_000),
            hooks,
        }
    }

    #[rstest]
    fn test_null_action_acknowledges_normal_immediately() {
        let (mut hooks, _) = recording_hooks();
        let mut action = Action::null();
        let progress = action.run(false, &mut ctx(&mut hooks));
        assert_eq!(progress, ActionProgress::Ack(AckOutcome::Normal));
        assert_eq!(action.stage(), ActionStage::Idle);
    }

    #[rstest]
    fn test_missed_fire_without_run_delayed_is_skipped() {
        let (mut hooks, recorder) = recording_hooks();
        let mut action = dialog_action(EventFlags::empty());
        let progress = action.run(true, &mut ctx(&mut hooks));
        assert_eq!(progress, ActionProgress::Ack(AckOutcome::Normal));
        assert!(recorder.borrow().shown.is_empty());
    }

    #[rstest]
    fn test_missed_fire_with_run_delayed_presents_dialog() {
        let (mut hooks, recorder) = recording_hooks();
        let mut action = dialog_action(EventFlags::RUN_DELAYED);
        let progress = action.run(true, &mut ctx(&mut hooks));
        assert_eq!(progress, ActionProgress::Pending);
        assert!(action.is_awaiting_dialog());
        assert_eq!(recorder.borrow().shown.len(), 1);
        assert_eq!(recorder.borrow().shown[0].title, "Wake");
    }

    #[rstest]
    fn test_connected_gates_on_offline_probe() {
        let (mut hooks, _) = recording_hooks();
        hooks.connectivity = Box::new(StaticConnectivity::new(false));
        let mut action = dialog_action(EventFlags::CONNECTED);

        let progress = action.run(false, &mut ctx(&mut hooks));
        assert_eq!(progress, ActionProgress::Pending);
        assert!(action.is_awaiting_connectivity());

        // Once online, the dialog is presented.
        hooks.connectivity = Box::new(StaticConnectivity::new(true));
        let progress = action.connectivity_online(&mut ctx(&mut hooks));
        assert_eq!(progress, ActionProgress::Pending);
        assert!(action.is_awaiting_dialog());
    }

    #[rstest]
    #[case(DialogResponse::Accept)]
    #[case(DialogResponse::Timeout)]
    fn test_dialog_accept_and_timeout_map_to_normal(#[case] response: DialogResponse) {
        let (mut hooks, _recorder) = recording_hooks();
        let mut action = dialog_action(EventFlags::empty());
        assert_eq!(action.run(false, &mut ctx(&mut hooks)), ActionProgress::Pending);
        let progress = action.dialog_response(response, &mut ctx(&mut hooks));
        assert_eq!(progress, ActionProgress::Ack(AckOutcome::Normal));
    }

    #[rstest]
    fn test_dialog_snooze_maps_to_snooze() {
        let (mut hooks, _recorder) = recording_hooks();
        let mut action = dialog_action(EventFlags::empty());
        assert_eq!(action.run(false, &mut ctx(&mut hooks)), ActionProgress::Pending);
        let progress = action.dialog_response(DialogResponse::Snooze, &mut ctx(&mut hooks));
        assert_eq!(progress, ActionProgress::Ack(AckOutcome::Snooze));
    }

    #[rstest]
    fn test_stale_dialog_response_is_ignored() {
        let (mut hooks, _recorder) = recording_hooks();
        let mut action = dialog_action(EventFlags::empty());
        let progress = action.dialog_response(DialogResponse::Accept, &mut ctx(&mut hooks));
        assert_eq!(progress, ActionProgress::Ignored);
    }

    #[rstest]
    fn test_bus_action_invokes_only_after_normal_dialog() {
        let (mut hooks, _recorder) = recording_hooks();
        let mut action = Action::new(
            EventFlags::empty(),
            ActionPayload::Bus(DialogInfo::default(), BusCall::default()),
        );
        assert_eq!(action.run(false, &mut ctx(&mut hooks)), ActionProgress::Pending);
        // Snooze must not emit the bus call.
        let progress = action.dialog_response(DialogResponse::Snooze, &mut ctx(&mut hooks));
        assert_eq!(progress, ActionProgress::Ack(AckOutcome::Snooze));
    }

    #[rstest]
    fn test_bus_action_with_no_dialog_acks_normal() {
        let (mut hooks, _recorder) = recording_hooks();
        let mut action = Action::new(
            EventFlags::NO_DIALOG,
            ActionPayload::Bus(DialogInfo::default(), BusCall::default()),
        );
        let progress = action.run(false, &mut ctx(&mut hooks));
        assert_eq!(progress, ActionProgress::Ack(AckOutcome::Normal));
    }

    #[rstest]
    fn test_exec_action_failed_spawn_acks_normal() {
        // The null spawner refuses; the action must not stick in pending.
        let (mut hooks, _recorder) = recording_hooks();
        let mut action = Action::new(
            EventFlags::NO_DIALOG,
            ActionPayload::Exec(
                DialogInfo::default(),
                ExecCommand {
                    command: "true".to_string(),
                },
            ),
        );
        let progress = action.run(false, &mut ctx(&mut hooks));
        assert_eq!(progress, ActionProgress::Ack(AckOutcome::Normal));
    }

    #[rstest]
    fn test_actdead_routes_through_powerup_ui() {
        let (mut hooks, _recorder) = recording_hooks();
        hooks.power = Box::new(NullPowerControl {
            acting_dead: true,
            powerup_requests: 0,
        });
        let mut action = dialog_action(EventFlags::ACTDEAD);

        let progress = action.run(false, &mut ctx(&mut hooks));
        assert_eq!(progress, ActionProgress::Pending);
        assert_eq!(action.stage(), ActionStage::AwaitingPowerup);

        let progress =
            action.dialog_response(DialogResponse::Powerup { power_up: true }, &mut ctx(&mut hooks));
        assert_eq!(progress, ActionProgress::Ack(AckOutcome::Normal));
    }

    #[rstest]
    fn test_dialog_timeout_resends_up_to_three_attempts() {
        let (mut hooks, _recorder) = recording_hooks();
        let mut action = dialog_action(EventFlags::empty());
        assert_eq!(action.run(false, &mut ctx(&mut hooks)), ActionProgress::Pending);

        assert_eq!(action.dialog_timeout(&mut ctx(&mut hooks)), ActionProgress::Pending);
        assert_eq!(action.stage(), ActionStage::AwaitingDialog { attempts: 2 });
        assert_eq!(action.dialog_timeout(&mut ctx(&mut hooks)), ActionProgress::Pending);
        assert_eq!(action.stage(), ActionStage::AwaitingDialog { attempts: 3 });

        // Third timeout stops resending but keeps waiting.
        assert_eq!(action.dialog_timeout(&mut ctx(&mut hooks)), ActionProgress::Pending);
        assert_eq!(action.stage(), ActionStage::AwaitingDialog { attempts: 3 });
        assert_eq!(_recorder.borrow().shown.len(), 3);
    }

    #[rstest]
    fn test_no_snooze_flag_reflected_in_request() {
        let mut hooks = Hooks {
            dialogs: Box::new(NullDialogService::default()),
            ..Hooks::default()
        };
        let mut action = dialog_action(EventFlags::NO_SNOOZE);
        assert_eq!(action.run(false, &mut ctx(&mut hooks)), ActionProgress::Pending);
        let debug = format!("{:?}", hooks.dialogs);
        assert!(debug.contains("can_snooze: false"));
    }
}
