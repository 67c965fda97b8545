// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
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

//! The heartbeat monitor: answers every switch `HEARTBEAT` with a `status` job.
//!
//! Route heartbeats to it with a persistent rule:
//!
//! ```toml
//! [[rules]]
//! header_name = "Event-Name"
//! header_value = "HEARTBEAT"
//! target = "Monitor"
//! persistent = true
//! ```

use switchlet_common::actor::{Actor, Context};
use switchlet_core::{UUID4, fsm::FiniteStateMachine};
use switchlet_dispatch::messages::{SwitchletContext, SwitchletMessage};
use switchlet_model::{
    api::Api,
    enums::ContentType,
    event::{EVENT_BACKGROUND_JOB, EVENT_HEARTBEAT, Event},
};
use ustr::Ustr;

/// The target name the monitor is registered under by default.
pub const MONITOR_TARGET: &str = "Monitor";

/// Heartbeats seen while a status job is outstanding before it is abandoned.
pub const MAX_PENDING_HEARTBEATS: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorState {
    NotReady,
    ExpectingHeartbeat,
    ExpectingStatusReply,
    ExpectingStatusEvent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorTrigger {
    Initialize,
    Heartbeat,
    StatusReply,
    StatusRejected,
    StatusEvent,
    StatusAbandoned,
}

/// Requests the switch status on each heartbeat and logs the result.
///
/// A watchdog timeout warns when no heartbeat arrives within `watchdog_ticks`.
#[derive(Debug)]
pub struct Monitor {
    id: Ustr,
    fsm: FiniteStateMachine<MonitorState, MonitorTrigger>,
    context: Option<SwitchletContext>,
    watchdog_ticks: u64,
    pending_job: Option<UUID4>,
    pending_heartbeats: u32,
    heartbeats: u64,
}

impl Monitor {
    /// Creates a new [`Monitor`] instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the state machine cannot be built.
    pub fn new(id: Ustr, watchdog_ticks: u64) -> anyhow::Result<Self> {
        use MonitorState as S;
        use MonitorTrigger as T;

        let fsm = FiniteStateMachine::new(
            S::NotReady,
            [
                ((S::NotReady, T::Initialize), S::ExpectingHeartbeat),
                ((S::ExpectingHeartbeat, T::Heartbeat), S::ExpectingStatusReply),
                ((S::ExpectingStatusReply, T::StatusReply), S::ExpectingStatusEvent),
                // The completion event may overtake the command reply
                ((S::ExpectingStatusReply, T::StatusEvent), S::ExpectingHeartbeat),
                ((S::ExpectingStatusEvent, T::StatusEvent), S::ExpectingHeartbeat),
                ((S::ExpectingStatusReply, T::StatusRejected), S::ExpectingHeartbeat),
                ((S::ExpectingStatusReply, T::StatusAbandoned), S::ExpectingHeartbeat),
                ((S::ExpectingStatusEvent, T::StatusAbandoned), S::ExpectingHeartbeat),
            ],
        )?;

        Ok(Self {
            id,
            fsm,
            context: None,
            watchdog_ticks,
            pending_job: None,
            pending_heartbeats: 0,
            heartbeats: 0,
        })
    }

    #[must_use]
    pub fn state(&self) -> MonitorState {
        self.fsm.state()
    }

    /// Returns the number of heartbeats received.
    #[must_use]
    pub const fn heartbeats(&self) -> u64 {
        self.heartbeats
    }

    /// Returns the job identifier of the outstanding `status` request, if any.
    #[must_use]
    pub const fn pending_job(&self) -> Option<UUID4> {
        self.pending_job
    }

    fn context(&self) -> anyhow::Result<&SwitchletContext> {
        self.context
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("{} is not initialized", self.id))
    }

    fn arm_watchdog(&self) -> anyhow::Result<()> {
        if self.watchdog_ticks > 0 {
            self.context()?.schedule_timeout(self.watchdog_ticks, false);
        }
        Ok(())
    }

    fn is_pending(&self, event: &Event) -> bool {
        self.pending_job.is_some_and(|id| event.job_uuid() == Some(id))
    }

    fn release_pending(&mut self) -> anyhow::Result<()> {
        self.pending_heartbeats = 0;
        if let Some(job_uuid) = self.pending_job.take() {
            self.context()?.unregister_observer(job_uuid);
            log::info!("Unregistered to receive events with Job-UUID: {job_uuid}");
        }
        Ok(())
    }

    fn on_event(&mut self, event: &Event) -> anyhow::Result<()> {
        let state = self.state();

        if event.content_type() == ContentType::CommandReply {
            if state != MonitorState::ExpectingStatusReply || !self.is_pending(event) {
                return Ok(());
            }
            let reply = event.reply_text().unwrap_or("");
            if event.is_ok_reply() {
                log::debug!("Status job accepted: {reply}");
                self.fsm.trigger(MonitorTrigger::StatusReply)?;
            } else {
                log::warn!("Status job rejected: {reply}");
                self.release_pending()?;
                self.fsm.trigger(MonitorTrigger::StatusRejected)?;
            }
            return Ok(());
        }

        match event.event_name() {
            Some(EVENT_HEARTBEAT) => self.on_heartbeat(),
            Some(EVENT_BACKGROUND_JOB) if self.is_pending(event) => {
                log::info!("{}", event.body().unwrap_or("").trim_end());
                self.release_pending()?;
                self.fsm.trigger(MonitorTrigger::StatusEvent)?;
                Ok(())
            }
            _ => {
                log::debug!("Ignoring {event}");
                Ok(())
            }
        }
    }

    fn on_heartbeat(&mut self) -> anyhow::Result<()> {
        self.heartbeats += 1;
        self.arm_watchdog()?;

        let state = self.state();
        if state != MonitorState::ExpectingHeartbeat {
            self.pending_heartbeats += 1;
            if self.pending_heartbeats < MAX_PENDING_HEARTBEATS {
                log::debug!("Heartbeat received in state {state}, status still pending");
                return Ok(());
            }
            log::warn!(
                "Abandoning status job after {} heartbeats without completion",
                self.pending_heartbeats
            );
            self.release_pending()?;
            self.fsm.trigger(MonitorTrigger::StatusAbandoned)?;
        }

        let job_uuid = self.context()?.execute_observed(Api::Status);
        log::info!("Registered to receive events with Job-UUID: {job_uuid}");
        self.pending_job = Some(job_uuid);
        self.fsm.trigger(MonitorTrigger::Heartbeat)?;
        Ok(())
    }
}

impl Actor for Monitor {
    type Message = SwitchletMessage;

    fn id(&self) -> Ustr {
        self.id
    }

    fn receive(&mut self, message: Self::Message, _ctx: &mut Context) -> anyhow::Result<()> {
        match message {
            SwitchletMessage::Initialize(context) => {
                self.context = Some(context);
                self.fsm.trigger(MonitorTrigger::Initialize)?;
                self.arm_watchdog()
            }
            SwitchletMessage::Event(event) => self.on_event(&event),
            SwitchletMessage::Timeout(timeout) => {
                log::warn!(
                    "No heartbeat from the switch for {} ticks (tick {})",
                    self.watchdog_ticks,
                    timeout.fired_tick
                );
                Ok(())
            }
            SwitchletMessage::Uninitialize => {
                if let Some(context) = self.context.take() {
                    context.cancel_timeout();
                    if let Some(job_uuid) = self.pending_job.take() {
                        context.unregister_observer(job_uuid);
                    }
                }
                Ok(())
            }
        }
    }
}
