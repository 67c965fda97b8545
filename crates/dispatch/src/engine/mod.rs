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

//! The dispatcher: the actor owning the control connection to the switch.
//!
//! The dispatcher is a state machine driven by its mailbox. Once connected it
//! authenticates, subscribes to the configured events and then routes
//! everything the switch sends:
//!
//! - A `command/reply` bearing a `Job-UUID` goes to the switchlet which issued
//!   that job, exactly once.
//! - Any other event bearing a `Job-UUID` goes to the observer registered for it.
//! - Events without a job go to every matching watcher and then to the target
//!   of the first matching dispatch rule.
//!
//! Tables are owned by the actor and only touched while handling a message.

pub mod config;

#[cfg(test)]
mod tests;

use ahash::AHashMap;
use switchlet_common::{
    actor::{Actor, ActorRef, Context},
    logging::{RECV, SEND},
};
use switchlet_core::{UUID4, fsm::FiniteStateMachine};
use switchlet_model::{
    command::{BackgroundCommand, Command},
    enums::ContentType,
    event::Event,
    rule::{HeaderMatcher, header_matches},
};
use switchlet_network::transport::CommandSink;
use tokio::sync::watch;
use ustr::Ustr;

pub use self::config::DispatcherConfig;
use crate::{
    messages::{DispatcherMessage, SwitchletMessage},
    registry::TargetRegistry,
};

/// The states of a [`Dispatcher`] session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatcherState {
    NotReady,
    Authenticating,
    Initializing,
    Dispatching,
    FailedAuthentication,
    FailedInitialization,
    Done,
}

impl DispatcherState {
    /// Returns whether the session has ended.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::FailedAuthentication | Self::FailedInitialization | Self::Done
        )
    }

    /// Returns whether the session ended because the handshake was rejected.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::FailedAuthentication | Self::FailedInitialization)
    }
}

/// The triggers moving a [`Dispatcher`] between states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatcherTrigger {
    Connect,
    AuthAccepted,
    AuthRejected,
    SubscriptionAccepted,
    SubscriptionRejected,
    Kill,
}

fn transition_table() -> Vec<((DispatcherState, DispatcherTrigger), DispatcherState)> {
    use DispatcherState as S;
    use DispatcherTrigger as T;

    vec![
        ((S::NotReady, T::Connect), S::Authenticating),
        ((S::Authenticating, T::AuthAccepted), S::Initializing),
        ((S::Authenticating, T::AuthRejected), S::FailedAuthentication),
        ((S::Initializing, T::SubscriptionAccepted), S::Dispatching),
        ((S::Initializing, T::SubscriptionRejected), S::FailedInitialization),
        ((S::NotReady, T::Kill), S::Done),
        ((S::Authenticating, T::Kill), S::Done),
        ((S::Initializing, T::Kill), S::Done),
        ((S::Dispatching, T::Kill), S::Done),
    ]
}

/// A registration for copies of unsolicited events.
#[derive(Debug)]
struct Watch {
    observer: ActorRef<SwitchletMessage>,
    header_name: String,
    matcher: HeaderMatcher,
}

impl Watch {
    fn is_for(&self, observer_id: Ustr, header_name: &str, matcher: &HeaderMatcher) -> bool {
        self.observer.id() == observer_id
            && self.header_name == header_name
            && self.matcher == *matcher
    }
}

/// Drives the session with the switch and routes its events to switchlets.
#[derive(Debug)]
pub struct Dispatcher {
    id: Ustr,
    config: DispatcherConfig,
    fsm: FiniteStateMachine<DispatcherState, DispatcherTrigger>,
    sink: Option<Box<dyn CommandSink>>,
    registry: TargetRegistry,
    transactions: AHashMap<UUID4, ActorRef<SwitchletMessage>>,
    observers: AHashMap<UUID4, ActorRef<SwitchletMessage>>,
    watches: Vec<Watch>,
    state_tx: watch::Sender<DispatcherState>,
}

impl Dispatcher {
    /// The actor identifier of the dispatcher.
    pub const ID: &'static str = "Dispatcher";

    /// Creates a new [`Dispatcher`] instance in the `NOT_READY` state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state machine cannot be built.
    pub fn new(config: DispatcherConfig, registry: TargetRegistry) -> anyhow::Result<Self> {
        let fsm = FiniteStateMachine::new(DispatcherState::NotReady, transition_table())?;
        let (state_tx, _) = watch::channel(DispatcherState::NotReady);

        Ok(Self {
            id: Ustr::from(Self::ID),
            config,
            fsm,
            sink: None,
            registry,
            transactions: AHashMap::new(),
            observers: AHashMap::new(),
            watches: Vec::new(),
            state_tx,
        })
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> DispatcherState {
        self.fsm.state()
    }

    /// Returns a receiver which observes every state change.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<DispatcherState> {
        self.state_tx.subscribe()
    }

    /// Returns the number of jobs awaiting their command reply.
    #[must_use]
    pub fn pending_transactions(&self) -> usize {
        self.transactions.len()
    }

    /// Returns the number of registered job observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Returns the number of registered watches.
    #[must_use]
    pub fn watch_count(&self) -> usize {
        self.watches.len()
    }

    #[must_use]
    pub const fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    /// Handles a single `message`.
    ///
    /// # Errors
    ///
    /// Returns an error if a trigger is invalid for the current state, a
    /// command cannot be written, or a job identifier is already in flight.
    pub fn handle(&mut self, message: DispatcherMessage, ctx: &mut Context) -> anyhow::Result<()> {
        match message {
            DispatcherMessage::ConnectionEstablished(sink) => {
                self.sink = Some(sink);
                self.transition(DispatcherTrigger::Connect, ctx)
            }
            DispatcherMessage::Event(event) => self.on_event(event, ctx),
            DispatcherMessage::Execute { command, sender } => self.on_execute(command, sender),
            DispatcherMessage::RegisterObserver { job_uuid, observer } => {
                if self.check_dispatching("RegisterObserver") {
                    log::debug!("Registered observer '{}' for job {job_uuid}", observer.id());
                    self.observers.insert(job_uuid, observer);
                }
                Ok(())
            }
            DispatcherMessage::UnregisterObserver { job_uuid } => {
                if self.observers.remove(&job_uuid).is_some() {
                    log::debug!("Unregistered observer for job {job_uuid}");
                }
                Ok(())
            }
            DispatcherMessage::Watch {
                observer,
                header_name,
                matcher,
            } => {
                if self.check_dispatching("Watch") {
                    log::debug!(
                        "Registered watch '{}' on {header_name}={matcher}",
                        observer.id()
                    );
                    self.watches.push(Watch {
                        observer,
                        header_name,
                        matcher,
                    });
                }
                Ok(())
            }
            DispatcherMessage::Unwatch {
                observer_id,
                header_name,
                matcher,
            } => {
                self.watches
                    .retain(|watch| !watch.is_for(observer_id, &header_name, &matcher));
                Ok(())
            }
            DispatcherMessage::Kill => {
                if self.fsm.can_trigger(DispatcherTrigger::Kill) {
                    self.transition(DispatcherTrigger::Kill, ctx)
                } else {
                    log::debug!("Ignoring kill in state {}", self.state());
                    Ok(())
                }
            }
        }
    }

    fn check_dispatching(&self, kind: &str) -> bool {
        let state = self.state();
        if state == DispatcherState::Dispatching {
            true
        } else {
            log::warn!("Dropping {kind} received in state {state}");
            false
        }
    }

    fn transition(&mut self, trigger: DispatcherTrigger, ctx: &mut Context) -> anyhow::Result<()> {
        let from = self.state();
        let state = self.fsm.trigger(trigger)?;
        log::info!("{from} -> {state} ({trigger})");
        self.state_tx.send_replace(state);
        self.on_enter(state, ctx)
    }

    fn on_enter(&mut self, state: DispatcherState, ctx: &mut Context) -> anyhow::Result<()> {
        match state {
            DispatcherState::NotReady | DispatcherState::Dispatching => Ok(()),
            DispatcherState::Authenticating => {
                let auth = self.config.auth().clone();
                self.send(&auth)
            }
            DispatcherState::Initializing => {
                let subscription = self.config.subscription().clone();
                self.send(&subscription)
            }
            DispatcherState::FailedAuthentication => {
                log::error!("Authentication rejected by the switch");
                self.finish(ctx);
                Ok(())
            }
            DispatcherState::FailedInitialization => {
                log::error!("Event subscription rejected by the switch");
                self.finish(ctx);
                Ok(())
            }
            DispatcherState::Done => {
                self.finish(ctx);
                Ok(())
            }
        }
    }

    fn finish(&mut self, ctx: &mut Context) {
        self.registry.shutdown();
        if !self.transactions.is_empty() {
            log::warn!("Abandoning {} pending job(s)", self.transactions.len());
        }
        self.transactions.clear();
        self.observers.clear();
        self.watches.clear();
        self.sink = None;
        ctx.stop();
    }

    fn send(&self, command: &dyn Command) -> anyhow::Result<()> {
        let sink = self
            .sink
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No connection to send {command:?}"))?;
        log::debug!("{SEND} {command:?}");
        sink.send(command.render())
    }

    fn on_execute(
        &mut self,
        command: BackgroundCommand,
        sender: ActorRef<SwitchletMessage>,
    ) -> anyhow::Result<()> {
        if !self.check_dispatching("Execute") {
            return Ok(());
        }

        let job_uuid = command.id();
        if self.transactions.contains_key(&job_uuid) {
            anyhow::bail!("Job {job_uuid} is already in flight");
        }

        self.send(&command)?;
        self.transactions.insert(job_uuid, sender);
        Ok(())
    }

    fn on_event(&mut self, event: Event, ctx: &mut Context) -> anyhow::Result<()> {
        log::trace!("{RECV} {event}");
        let content_type = event.content_type();

        if content_type == ContentType::DisconnectNotice {
            log::info!("Switch is closing the connection");
            return Ok(());
        }

        match self.state() {
            DispatcherState::Authenticating if content_type == ContentType::CommandReply => {
                let trigger = if event.is_ok_reply() {
                    DispatcherTrigger::AuthAccepted
                } else {
                    DispatcherTrigger::AuthRejected
                };
                self.transition(trigger, ctx)
            }
            DispatcherState::Initializing if content_type == ContentType::CommandReply => {
                let trigger = if event.is_ok_reply() {
                    DispatcherTrigger::SubscriptionAccepted
                } else {
                    DispatcherTrigger::SubscriptionRejected
                };
                self.transition(trigger, ctx)
            }
            DispatcherState::Dispatching => {
                self.dispatch(event);
                Ok(())
            }
            state => {
                log::debug!("Ignoring {event} in state {state}");
                Ok(())
            }
        }
    }

    fn dispatch(&mut self, event: Event) {
        let content_type = event.content_type();
        if content_type != ContentType::CommandReply && !content_type.is_event() {
            log::info!("Dropping {content_type} message: {event}");
            return;
        }

        let Some(raw_job) = event.job_uuid_str() else {
            if content_type == ContentType::CommandReply {
                log::debug!("Dropping reply without a job: {event}");
            } else {
                self.route(event);
            }
            return;
        };

        let Some(job_uuid) = event.job_uuid() else {
            log::debug!("Dropping event with foreign job id '{raw_job}'");
            return;
        };

        if content_type == ContentType::CommandReply {
            match self.transactions.remove(&job_uuid) {
                Some(sender) => sender.tell(SwitchletMessage::Event(event)),
                None => log::debug!("Dropping reply for unknown job {job_uuid}"),
            }
            return;
        }

        match self.observers.get(&job_uuid) {
            Some(observer) if observer.is_closed() => {
                log::debug!("Removing stopped observer '{}' for job {job_uuid}", observer.id());
                self.observers.remove(&job_uuid);
            }
            Some(observer) => observer.tell(SwitchletMessage::Event(event)),
            None => log::debug!("Dropping unobserved {event}"),
        }
    }

    fn route(&mut self, event: Event) {
        self.watches.retain(|watch| !watch.observer.is_closed());
        for watch in &self.watches {
            if header_matches(&event, &watch.header_name, &watch.matcher) {
                watch.observer.tell(SwitchletMessage::Event(event.clone()));
            }
        }

        let Some(rule) = self.config.rules().route(&event) else {
            log::info!("No dispatch rule matched {event}");
            return;
        };

        match self.registry.get_instance(&rule.target()) {
            Some(target) => target.tell(SwitchletMessage::Event(event)),
            None => log::error!("No target registered as '{}' for rule {rule}", rule.target()),
        }
    }
}

impl Actor for Dispatcher {
    type Message = DispatcherMessage;

    fn id(&self) -> Ustr {
        self.id
    }

    fn receive(&mut self, message: Self::Message, ctx: &mut Context) -> anyhow::Result<()> {
        self.handle(message, ctx)
    }

    fn on_stop(&mut self) {
        log::info!("Stopped in state {}", self.state());
    }
}
