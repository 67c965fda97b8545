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

//! Server bootstrap and lifecycle.

use std::{sync::Arc, time::Duration};

use indexmap::IndexMap;
use switchlet_common::{
    actor::{ActorRef, mailbox, spawn_actor, spawn_actor_with_mailbox},
    clock::TickClock,
    logging::{log_task_awaiting, log_task_error},
    timer::{TimerCommand, TimerService, service::duration_to_ticks},
};
use switchlet_dispatch::{
    engine::{Dispatcher, DispatcherState},
    messages::DispatcherMessage,
    proxy::DispatcherProxy,
    registry::{TargetFactory, TargetRegistry, actor_factory},
};
use switchlet_network::socket::EventSocketClient;
use tokio::{sync::watch, task::JoinHandle};
use ustr::Ustr;

use crate::{
    config::ValidatedConfig,
    switchlets::heartbeat::{MONITOR_TARGET, Monitor},
};

/// How long the monitor waits for a heartbeat before warning.
pub const HEARTBEAT_WATCHDOG: Duration = Duration::from_secs(60);

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds and runs a switchlet server from a [`ValidatedConfig`].
///
/// Targets named by the dispatch rules must be registered with a factory
/// before the server is started.
pub struct SwitchletServer {
    config: ValidatedConfig,
    factories: IndexMap<Ustr, TargetFactory>,
}

impl std::fmt::Debug for SwitchletServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let factories: Vec<&Ustr> = self.factories.keys().collect();
        f.debug_struct(stringify!(SwitchletServer))
            .field("config", &self.config)
            .field("factories", &factories)
            .finish()
    }
}

impl SwitchletServer {
    /// Creates a new [`SwitchletServer`] instance without any targets.
    #[must_use]
    pub fn new(config: ValidatedConfig) -> Self {
        Self {
            config,
            factories: IndexMap::new(),
        }
    }

    /// Creates a new [`SwitchletServer`] instance with the built-in targets registered.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in target cannot be registered.
    pub fn with_default_targets(config: ValidatedConfig) -> anyhow::Result<Self> {
        let watchdog_ticks = duration_to_ticks(HEARTBEAT_WATCHDOG, config.tick_interval());
        let mut server = Self::new(config);
        server.register_target(
            MONITOR_TARGET,
            Arc::new(move |id: Ustr| match Monitor::new(id, watchdog_ticks) {
                Ok(monitor) => spawn_actor(monitor).0,
                Err(e) => {
                    log::error!("Failed to create {id}: {e}");
                    // A closed reference; messages to it are dropped
                    mailbox(id).0
                }
            }),
        )?;
        Ok(server)
    }

    /// Registers the factory used for rule targets called `name`.
    ///
    /// Whether the target is a singleton or transient is decided by the
    /// `persistent` flag of the rules naming it.
    ///
    /// # Errors
    ///
    /// Returns an error if a factory is already registered under `name`.
    pub fn register_target(&mut self, name: &str, factory: TargetFactory) -> anyhow::Result<()> {
        let name = Ustr::from(name);
        if self.factories.contains_key(&name) {
            anyhow::bail!("A factory is already registered for target '{name}'");
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Registers an actor constructor for targets called `name`, see [`actor_factory`].
    ///
    /// # Errors
    ///
    /// Returns an error if a factory is already registered under `name`.
    pub fn register_actor<A, F>(&mut self, name: &str, build: F) -> anyhow::Result<()>
    where
        A: switchlet_common::actor::Actor<Message = switchlet_dispatch::messages::SwitchletMessage>,
        F: Fn(Ustr) -> A + Send + Sync + 'static,
    {
        self.register_target(name, actor_factory(build))
    }

    #[must_use]
    pub const fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    /// Builds the target registry from the dispatch rules.
    ///
    /// Each rule target is registered once: as a singleton when its rules are
    /// persistent, otherwise as transient.
    fn build_registry(
        &self,
        dispatcher: ActorRef<DispatcherMessage>,
        timer: ActorRef<TimerCommand>,
    ) -> anyhow::Result<TargetRegistry> {
        let mut targets: IndexMap<Ustr, bool> = IndexMap::new();
        for rule in self.config.dispatcher().rules() {
            let target = rule.target();
            match targets.get(&target) {
                Some(&persistent) if persistent != rule.is_persistent() => {
                    anyhow::bail!("Rules disagree on whether target '{target}' is persistent");
                }
                Some(_) => {}
                None => {
                    targets.insert(target, rule.is_persistent());
                }
            }
        }

        let mut registry = TargetRegistry::new(dispatcher, timer);
        for (name, persistent) in targets {
            let Some(factory) = self.factories.get(&name) else {
                anyhow::bail!("No factory registered for rule target '{name}'");
            };
            if persistent {
                registry.register_singleton(&name, factory)?;
            } else {
                registry.register_transient(&name, factory.clone())?;
            }
        }
        Ok(registry)
    }

    /// Starts every component and connects to the switch.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule target has no factory or the switch cannot be reached.
    pub async fn start(self) -> anyhow::Result<RunningServer> {
        let (timer, timer_task) = spawn_actor(TimerService::new());
        let mut clock = TickClock::new(self.config.tick_interval());
        clock.start(timer.clone())?;

        let (dispatcher, dispatcher_mailbox) = mailbox::<DispatcherMessage>(Dispatcher::ID);
        let engine = self
            .build_registry(dispatcher.clone(), timer.clone())
            .and_then(|registry| Dispatcher::new(self.config.dispatcher().clone(), registry));
        let engine = match engine {
            Ok(engine) => engine,
            Err(e) => {
                clock.stop();
                timer.stop();
                return Err(e);
            }
        };
        let state_rx = engine.subscribe_state();
        let dispatcher_task = spawn_actor_with_mailbox(engine, dispatcher_mailbox);

        let observer = Arc::new(DispatcherProxy::new(dispatcher.clone()));
        let client = match EventSocketClient::connect(self.config.socket(), observer).await {
            Ok(client) => client,
            Err(e) => {
                dispatcher.tell(DispatcherMessage::Kill);
                clock.stop();
                timer.stop();
                return Err(e);
            }
        };

        log::info!("Started, connected to {}", client.address());

        Ok(RunningServer {
            client,
            clock,
            timer,
            timer_task: Some(timer_task),
            dispatcher,
            dispatcher_task: Some(dispatcher_task),
            state_rx,
        })
    }

    /// Runs the server until Ctrl-C or until the session with the switch ends.
    ///
    /// # Errors
    ///
    /// Returns an error if startup fails or the switch rejected the handshake.
    pub async fn run(self) -> anyhow::Result<()> {
        let mut running = self.start().await?;

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Received SIGINT, shutting down...");
            }
            state = running.wait_for_terminal_state() => {
                log::info!("Session ended in state {state}");
            }
        }

        let state = running.shutdown().await;
        if state.is_failure() {
            anyhow::bail!("Session with the switch failed: {state}");
        }
        Ok(())
    }
}

/// Handles to the components of a started [`SwitchletServer`].
#[derive(Debug)]
pub struct RunningServer {
    client: EventSocketClient,
    clock: TickClock,
    timer: ActorRef<TimerCommand>,
    timer_task: Option<JoinHandle<()>>,
    dispatcher: ActorRef<DispatcherMessage>,
    dispatcher_task: Option<JoinHandle<()>>,
    state_rx: watch::Receiver<DispatcherState>,
}

impl RunningServer {
    /// Returns the latest dispatcher state.
    #[must_use]
    pub fn state(&self) -> DispatcherState {
        *self.state_rx.borrow()
    }

    /// Returns a reference to the dispatcher, for sending it messages.
    #[must_use]
    pub const fn dispatcher(&self) -> &ActorRef<DispatcherMessage> {
        &self.dispatcher
    }

    /// Returns a receiver observing dispatcher state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<DispatcherState> {
        self.state_rx.clone()
    }

    /// Waits until the dispatcher reaches a terminal state.
    pub async fn wait_for_terminal_state(&mut self) -> DispatcherState {
        loop {
            let state = *self.state_rx.borrow_and_update();
            if state.is_terminal() {
                return state;
            }
            if self.state_rx.changed().await.is_err() {
                return *self.state_rx.borrow();
            }
        }
    }

    /// Ends the session and stops every component, returning the final dispatcher state.
    pub async fn shutdown(mut self) -> DispatcherState {
        self.dispatcher.tell(DispatcherMessage::Kill);

        if let Some(task) = self.dispatcher_task.take() {
            log_task_awaiting(Dispatcher::ID);
            if let Err(e) = tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await {
                log_task_error(Dispatcher::ID, &anyhow::anyhow!("{e}"));
            }
        }

        self.client.close().await;
        self.clock.stop();
        self.timer.stop();
        if let Some(task) = self.timer_task.take() {
            if let Err(e) = tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await {
                log_task_error("TimerService", &anyhow::anyhow!("{e}"));
            }
        }

        let state = *self.state_rx.borrow();
        log::info!("Stopped in state {state}");
        state
    }
}
