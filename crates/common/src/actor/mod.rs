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

//! Mailbox actors: isolated units of execution which handle one message at a time.
//!
//! An [`Actor`] owns its state outright and is only reachable through an
//! [`ActorRef`]. The runtime loop in [`spawn_actor`] delivers messages in
//! arrival order and contains failures: a handler which returns an error or
//! panics is logged with the actor identifier, message kind and correlation id,
//! and the actor goes on to handle its next message.

pub mod mailbox;


use std::{
    any::Any,
    fmt::Debug,
    panic::{self, AssertUnwindSafe},
};

use switchlet_core::UUID4;
use tokio::task::JoinHandle;
use ustr::Ustr;

use crate::logging::{log_task_started, log_task_stopped};

// Re-exports
pub use mailbox::{ActorRef, Envelope, Mailbox, mailbox};

/// A message which can be handled by an [`Actor`].
pub trait Message: Debug + Send + 'static {
    /// Returns a short name for the kind of message, used in logs.
    fn kind(&self) -> &'static str;

    /// Returns the identifier correlating this message with a background job, if any.
    fn correlation_id(&self) -> Option<UUID4> {
        None
    }
}

/// Per-delivery context handed to [`Actor::receive`].
#[derive(Debug)]
pub struct Context {
    actor_id: Ustr,
    stopped: bool,
}

impl Context {
    /// Creates a new [`Context`] instance.
    #[must_use]
    pub const fn new(actor_id: Ustr) -> Self {
        Self {
            actor_id,
            stopped: false,
        }
    }

    /// Returns the identifier of the receiving actor.
    #[must_use]
    pub const fn actor_id(&self) -> Ustr {
        self.actor_id
    }

    /// Requests the actor stop after the current message.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Returns whether a stop was requested.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }
}

pub trait Actor: Send + 'static {
    /// The type of message this actor handles.
    type Message: Message;

    /// The unique identifier for the actor.
    fn id(&self) -> Ustr;

    /// Called once on the actor task before the first message.
    fn on_start(&mut self) {}

    /// Handles the `message`.
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be handled. The error is
    /// logged and the actor continues with its next message.
    fn receive(&mut self, message: Self::Message, ctx: &mut Context) -> anyhow::Result<()>;

    /// Called once on the actor task after the last message.
    fn on_stop(&mut self) {}
}

/// Delivers a single `message` to `actor`, containing any error or panic.
///
/// Returns `true` if the message was handled successfully.
pub fn deliver<A: Actor>(actor: &mut A, message: A::Message, ctx: &mut Context) -> bool {
    let kind = message.kind();
    let correlation = message
        .correlation_id()
        .map_or_else(String::new, |id| format!(" (job {id})"));

    match panic::catch_unwind(AssertUnwindSafe(|| actor.receive(message, ctx))) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            log::error!(
                "Actor '{}' failed handling {kind}{correlation}: {e}",
                ctx.actor_id()
            );
            false
        }
        Err(payload) => {
            log::error!(
                "Actor '{}' panicked handling {kind}{correlation}: {}",
                ctx.actor_id(),
                panic_message(payload.as_ref()),
            );
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}

/// Spawns `actor` on the current Tokio runtime with a fresh mailbox.
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime.
pub fn spawn_actor<A: Actor>(actor: A) -> (ActorRef<A::Message>, JoinHandle<()>) {
    let (actor_ref, mailbox) = mailbox(actor.id());
    let handle = spawn_actor_with_mailbox(actor, mailbox);
    (actor_ref, handle)
}

/// Spawns `actor` on the current Tokio runtime, receiving from an existing `mailbox`.
///
/// This allows references to be handed out before the actor itself is built.
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime.
pub fn spawn_actor_with_mailbox<A: Actor>(actor: A, mailbox: Mailbox<A::Message>) -> JoinHandle<()> {
    tokio::spawn(run_actor(actor, mailbox))
}

async fn run_actor<A: Actor>(mut actor: A, mut mailbox: Mailbox<A::Message>) {
    let task_name = actor.id();
    log_task_started(&task_name);

    actor.on_start();
    let mut ctx = Context::new(task_name);

    while let Some(envelope) = mailbox.recv().await {
        match envelope {
            Envelope::Message(message) => {
                deliver(&mut actor, message, &mut ctx);
                if ctx.is_stopped() {
                    break;
                }
            }
            Envelope::Stop => break,
        }
    }

    mailbox.close();
    actor.on_stop();
    log_task_stopped(&task_name);
}
