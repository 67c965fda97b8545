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

//! Messages exchanged between the dispatcher, the switchlets it routes to, and the transport.

use switchlet_common::{
    actor::{ActorRef, Message},
    timer::{ScheduleTimeout, TimeoutCallback, TimeoutEvent, TimerCommand},
};
use switchlet_core::UUID4;
use switchlet_model::{api::Api, command::BackgroundCommand, event::Event, rule::HeaderMatcher};
use switchlet_network::transport::CommandSink;
use ustr::Ustr;

/// Messages handled by the [`Dispatcher`](crate::engine::Dispatcher).
#[derive(Debug)]
pub enum DispatcherMessage {
    /// The transport connected and can now accept commands.
    ConnectionEstablished(Box<dyn CommandSink>),
    /// Forwards a background job; the reply is delivered to `sender`.
    Execute {
        command: BackgroundCommand,
        sender: ActorRef<SwitchletMessage>,
    },
    /// Delivers unsolicited events bearing `job_uuid` to `observer` until unregistered.
    RegisterObserver {
        job_uuid: UUID4,
        observer: ActorRef<SwitchletMessage>,
    },
    /// Removes the observer registered for `job_uuid`.
    UnregisterObserver { job_uuid: UUID4 },
    /// Delivers a copy of every unsolicited event whose header matches to `observer`.
    Watch {
        observer: ActorRef<SwitchletMessage>,
        header_name: String,
        matcher: HeaderMatcher,
    },
    /// Removes a watch previously registered by the actor `observer_id`.
    Unwatch {
        observer_id: Ustr,
        header_name: String,
        matcher: HeaderMatcher,
    },
    /// An event decoded by the transport.
    Event(Event),
    /// Ends the session.
    Kill,
}

impl Message for DispatcherMessage {
    fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionEstablished(_) => "ConnectionEstablished",
            Self::Execute { .. } => "Execute",
            Self::RegisterObserver { .. } => "RegisterObserver",
            Self::UnregisterObserver { .. } => "UnregisterObserver",
            Self::Watch { .. } => "Watch",
            Self::Unwatch { .. } => "Unwatch",
            Self::Event(_) => "Event",
            Self::Kill => "Kill",
        }
    }

    fn correlation_id(&self) -> Option<UUID4> {
        match self {
            Self::Execute { command, .. } => Some(command.id()),
            Self::RegisterObserver { job_uuid, .. } | Self::UnregisterObserver { job_uuid } => {
                Some(*job_uuid)
            }
            Self::Event(event) => event.job_uuid(),
            _ => None,
        }
    }
}

/// Messages handled by switchlets, the targets events are routed to.
#[derive(Debug)]
pub enum SwitchletMessage {
    /// Sent once after the instance is created.
    Initialize(SwitchletContext),
    /// Sent before a singleton is stopped, so it can release what it holds.
    Uninitialize,
    /// A routed, replied or observed event.
    Event(Event),
    /// A timeout scheduled through [`SwitchletContext::schedule_timeout`] expired.
    Timeout(TimeoutEvent),
}

impl Message for SwitchletMessage {
    fn kind(&self) -> &'static str {
        match self {
            Self::Initialize(_) => "Initialize",
            Self::Uninitialize => "Uninitialize",
            Self::Event(_) => "Event",
            Self::Timeout(_) => "Timeout",
        }
    }

    fn correlation_id(&self) -> Option<UUID4> {
        match self {
            Self::Event(event) => event.job_uuid(),
            _ => None,
        }
    }
}

/// The references a switchlet needs to talk to the rest of the server.
#[derive(Clone, Debug)]
pub struct SwitchletContext {
    dispatcher: ActorRef<DispatcherMessage>,
    timer: ActorRef<TimerCommand>,
    this: ActorRef<SwitchletMessage>,
}

impl SwitchletContext {
    /// Creates a new [`SwitchletContext`] instance.
    #[must_use]
    pub const fn new(
        dispatcher: ActorRef<DispatcherMessage>,
        timer: ActorRef<TimerCommand>,
        this: ActorRef<SwitchletMessage>,
    ) -> Self {
        Self {
            dispatcher,
            timer,
            this,
        }
    }

    #[must_use]
    pub const fn dispatcher(&self) -> &ActorRef<DispatcherMessage> {
        &self.dispatcher
    }

    #[must_use]
    pub const fn timer(&self) -> &ActorRef<TimerCommand> {
        &self.timer
    }

    /// Returns the reference to the switchlet owning this context.
    #[must_use]
    pub const fn this(&self) -> &ActorRef<SwitchletMessage> {
        &self.this
    }

    /// Issues `api` as a background job and returns its job identifier.
    ///
    /// The command reply is delivered to this switchlet.
    pub fn execute(&self, api: Api) -> UUID4 {
        let command = BackgroundCommand::new(api);
        let job_uuid = command.id();
        self.dispatcher.tell(DispatcherMessage::Execute {
            command,
            sender: self.this.clone(),
        });
        job_uuid
    }

    /// Issues `api` as a background job and also observes its completion event.
    ///
    /// The observer is registered before the command is sent, so the
    /// `BACKGROUND_JOB` event cannot be missed. Call [`Self::unregister_observer`]
    /// once it has arrived.
    pub fn execute_observed(&self, api: Api) -> UUID4 {
        let command = BackgroundCommand::new(api);
        let job_uuid = command.id();
        self.dispatcher.tell(DispatcherMessage::RegisterObserver {
            job_uuid,
            observer: self.this.clone(),
        });
        self.dispatcher.tell(DispatcherMessage::Execute {
            command,
            sender: self.this.clone(),
        });
        job_uuid
    }

    pub fn unregister_observer(&self, job_uuid: UUID4) {
        self.dispatcher
            .tell(DispatcherMessage::UnregisterObserver { job_uuid });
    }

    /// Receives a copy of unsolicited events whose `header_name` matches.
    pub fn watch(&self, header_name: &str, matcher: HeaderMatcher) {
        self.dispatcher.tell(DispatcherMessage::Watch {
            observer: self.this.clone(),
            header_name: header_name.to_string(),
            matcher,
        });
    }

    pub fn unwatch(&self, header_name: &str, matcher: HeaderMatcher) {
        self.dispatcher.tell(DispatcherMessage::Unwatch {
            observer_id: self.this.id(),
            header_name: header_name.to_string(),
            matcher,
        });
    }

    /// Schedules a [`SwitchletMessage::Timeout`] for this switchlet after `ticks`.
    ///
    /// Replaces any timeout this switchlet already has pending.
    pub fn schedule_timeout(&self, ticks: u64, recurring: bool) {
        self.timer.tell(TimerCommand::Schedule(ScheduleTimeout {
            owner: self.this.id(),
            timeout_ticks: ticks,
            recurring,
            callback: TimeoutCallback::notify(self.this.clone(), SwitchletMessage::Timeout),
        }));
    }

    pub fn cancel_timeout(&self) {
        self.timer.tell(TimerCommand::Cancel {
            owner: self.this.id(),
        });
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;
    use switchlet_common::actor::mailbox;

    use super::*;

    #[rstest]
    fn test_execute_observed_registers_before_sending() {
        let (dispatcher, mut dispatcher_mailbox) = mailbox("Dispatcher");
        let (timer, _timer_mailbox) = mailbox("TimerService");
        let (this, _this_mailbox) = mailbox("Monitor");
        let ctx = SwitchletContext::new(dispatcher, timer, this);

        let job_uuid = ctx.execute_observed(Api::Status);

        let messages = dispatcher_mailbox.drain_messages();
        assert_eq!(messages.len(), 2);
        assert!(matches!(
            &messages[0],
            DispatcherMessage::RegisterObserver { job_uuid: id, observer } if *id == job_uuid && observer.id().as_str() == "Monitor"
        ));
        assert!(matches!(
            &messages[1],
            DispatcherMessage::Execute { command, .. } if command.id() == job_uuid
        ));
        assert_eq!(messages[1].correlation_id(), Some(job_uuid));
    }

    #[rstest]
    fn test_schedule_timeout_uses_own_id_as_owner() {
        let (dispatcher, _dispatcher_mailbox) = mailbox("Dispatcher");
        let (timer, mut timer_mailbox) = mailbox("TimerService");
        let (this, _this_mailbox) = mailbox("Monitor");
        let ctx = SwitchletContext::new(dispatcher, timer, this);

        ctx.schedule_timeout(50, false);
        ctx.cancel_timeout();

        let messages = timer_mailbox.drain_messages();
        assert!(matches!(
            &messages[0],
            TimerCommand::Schedule(schedule) if schedule.owner.as_str() == "Monitor" && schedule.timeout_ticks == 50
        ));
        assert!(matches!(&messages[1], TimerCommand::Cancel { owner } if owner.as_str() == "Monitor"));
    }
}
