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

//! Resolves target names from dispatch rules to running switchlets.
//!
//! Targets are registered by name at startup with a factory. A transient
//! target gets a fresh instance for every lookup, so per-call switchlets never
//! share state; a singleton is built once and reused.

use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
};

use ahash::AHashMap;
use indexmap::IndexMap;
use switchlet_common::{
    actor::{Actor, ActorRef, spawn_actor},
    timer::TimerCommand,
};
use ustr::Ustr;

use crate::messages::{DispatcherMessage, SwitchletContext, SwitchletMessage};

/// Builds and starts a switchlet under the given instance identifier.
pub type TargetFactory = Arc<dyn Fn(Ustr) -> ActorRef<SwitchletMessage> + Send + Sync>;

/// Wraps an actor constructor as a [`TargetFactory`] which spawns each instance.
///
/// Must be invoked within a Tokio runtime.
pub fn actor_factory<A, F>(build: F) -> TargetFactory
where
    A: Actor<Message = SwitchletMessage>,
    F: Fn(Ustr) -> A + Send + Sync + 'static,
{
    Arc::new(move |id| spawn_actor(build(id)).0)
}

/// How instances of a target are created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum TargetKind {
    Transient,
    Singleton,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Target '{0}' is already registered")]
    Duplicate(Ustr),
    #[error("Invalid target name '{0}'")]
    InvalidName(String),
    #[error("Target '{0}' is not registered")]
    NotFound(Ustr),
}

/// Name to switchlet resolution for the dispatcher.
///
/// Transient and singleton names share one namespace.
pub struct TargetRegistry {
    dispatcher: ActorRef<DispatcherMessage>,
    timer: ActorRef<TimerCommand>,
    transients: AHashMap<Ustr, TargetFactory>,
    singletons: IndexMap<Ustr, ActorRef<SwitchletMessage>>,
    instance_count: u64,
}

impl Debug for TargetRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let transients: Vec<&Ustr> = self.transients.keys().collect();
        let singletons: Vec<&Ustr> = self.singletons.keys().collect();
        f.debug_struct(stringify!(TargetRegistry))
            .field("transients", &transients)
            .field("singletons", &singletons)
            .field("instance_count", &self.instance_count)
            .finish()
    }
}

impl TargetRegistry {
    /// Creates a new [`TargetRegistry`] instance.
    ///
    /// Every instance it creates is initialized with a [`SwitchletContext`]
    /// referring to `dispatcher` and `timer`.
    #[must_use]
    pub fn new(dispatcher: ActorRef<DispatcherMessage>, timer: ActorRef<TimerCommand>) -> Self {
        Self {
            dispatcher,
            timer,
            transients: AHashMap::new(),
            singletons: IndexMap::new(),
            instance_count: 0,
        }
    }

    fn check_available(&self, name: &str) -> Result<Ustr, RegistryError> {
        if name.trim().is_empty() || name.chars().any(char::is_whitespace) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        let name = Ustr::from(name);
        if self.contains(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        Ok(name)
    }

    fn initialize(&self, instance: &ActorRef<SwitchletMessage>) {
        let ctx = SwitchletContext::new(
            self.dispatcher.clone(),
            self.timer.clone(),
            instance.clone(),
        );
        instance.tell(SwitchletMessage::Initialize(ctx));
    }

    /// Registers `name` as a target which gets a new instance per lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is invalid or already registered.
    pub fn register_transient(
        &mut self,
        name: &str,
        factory: TargetFactory,
    ) -> Result<(), RegistryError> {
        let name = self.check_available(name)?;
        self.transients.insert(name, factory);
        log::debug!("Registered transient target '{name}'");
        Ok(())
    }

    /// Registers `name` as a single shared instance, created and initialized now.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is invalid or already registered.
    pub fn register_singleton(
        &mut self,
        name: &str,
        factory: &TargetFactory,
    ) -> Result<ActorRef<SwitchletMessage>, RegistryError> {
        let name = self.check_available(name)?;
        let instance = factory(name);
        self.initialize(&instance);
        self.singletons.insert(name, instance.clone());
        log::debug!("Registered singleton target '{name}'");
        Ok(instance)
    }

    /// Returns an instance of the target `name`, creating one if it is transient.
    pub fn get_instance(&mut self, name: &Ustr) -> Option<ActorRef<SwitchletMessage>> {
        if let Some(instance) = self.singletons.get(name) {
            return Some(instance.clone());
        }

        let factory = self.transients.get(name)?.clone();
        self.instance_count += 1;
        let id = Ustr::from(format!("{name}-{}", self.instance_count).as_str());
        let instance = factory(id);
        self.initialize(&instance);
        log::debug!("Created transient instance '{id}'");
        Some(instance)
    }

    /// Returns how instances of `name` are created, if registered.
    #[must_use]
    pub fn kind(&self, name: &Ustr) -> Option<TargetKind> {
        if self.singletons.contains_key(name) {
            Some(TargetKind::Singleton)
        } else if self.transients.contains_key(name) {
            Some(TargetKind::Transient)
        } else {
            None
        }
    }

    #[must_use]
    pub fn contains(&self, name: &Ustr) -> bool {
        self.kind(name).is_some()
    }

    /// Returns the number of registered targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transients.len() + self.singletons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes the target `name`.
    ///
    /// A singleton is sent [`SwitchletMessage::Uninitialize`] and then stopped.
    /// Transient instances already handed out are unaffected.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not registered.
    pub fn unregister(&mut self, name: &Ustr) -> Result<(), RegistryError> {
        if let Some(instance) = self.singletons.shift_remove(name) {
            instance.tell(SwitchletMessage::Uninitialize);
            instance.stop();
            log::debug!("Unregistered singleton target '{name}'");
            return Ok(());
        }
        if self.transients.remove(name).is_some() {
            log::debug!("Unregistered transient target '{name}'");
            return Ok(());
        }
        Err(RegistryError::NotFound(*name))
    }

    /// Uninitializes and stops every singleton, in registration order.
    pub fn shutdown(&mut self) {
        let names: Vec<Ustr> = self.singletons.keys().copied().collect();
        for name in names {
            if let Err(e) = self.unregister(&name) {
                log::error!("{e}");
            }
        }
    }
}
