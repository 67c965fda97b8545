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

//! Actor references and their unbounded, ordered mailboxes.

use std::fmt::{Debug, Formatter};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, error::TryRecvError, unbounded_channel};
use ustr::Ustr;

/// An item delivered to a mailbox.
#[derive(Debug)]
pub enum Envelope<M> {
    /// A message for the actor to handle.
    Message(M),
    /// A request for the actor to finish handling its current message and stop.
    Stop,
}

/// A cloneable handle for sending messages to an actor.
///
/// Delivery is asynchronous and never blocks. Messages from a single sender
/// arrive in the order they were sent.
pub struct ActorRef<M> {
    id: Ustr,
    tx: UnboundedSender<Envelope<M>>,
}

impl<M> Clone for ActorRef<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            tx: self.tx.clone(),
        }
    }
}

impl<M> Debug for ActorRef<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(ActorRef))
            .field("id", &self.id)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<M> PartialEq for ActorRef<M> {
    fn eq(&self, other: &Self) -> bool {
        self.tx.same_channel(&other.tx)
    }
}

impl<M> Eq for ActorRef<M> {}

impl<M> ActorRef<M> {
    /// Returns the actor identifier.
    #[must_use]
    pub const fn id(&self) -> Ustr {
        self.id
    }

    /// Sends `message` to the actor, logging if its mailbox has closed.
    pub fn tell(&self, message: M) {
        if self.tx.send(Envelope::Message(message)).is_err() {
            log::debug!("Mailbox for '{}' closed, message dropped", self.id);
        }
    }

    /// Sends `message` to the actor.
    ///
    /// # Errors
    ///
    /// Returns an error if the actor's mailbox has closed.
    pub fn try_tell(&self, message: M) -> anyhow::Result<()> {
        self.tx
            .send(Envelope::Message(message))
            .map_err(|_| anyhow::anyhow!("Mailbox for '{}' is closed", self.id))
    }

    /// Requests the actor stop once already queued messages are handled.
    pub fn stop(&self) {
        let _ = self.tx.send(Envelope::Stop);
    }

    /// Returns whether the actor's mailbox has closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The receiving side of an actor's mailbox.
pub struct Mailbox<M> {
    id: Ustr,
    rx: UnboundedReceiver<Envelope<M>>,
}

impl<M> Debug for Mailbox<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(Mailbox))
            .field("id", &self.id)
            .field("len", &self.rx.len())
            .finish()
    }
}

impl<M> Mailbox<M> {
    /// Returns the owning actor identifier.
    #[must_use]
    pub const fn id(&self) -> Ustr {
        self.id
    }

    /// Waits for the next envelope, returning `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<Envelope<M>> {
        self.rx.recv().await
    }

    /// Returns the next queued envelope without waiting.
    pub fn try_recv(&mut self) -> Option<Envelope<M>> {
        match self.rx.try_recv() {
            Ok(envelope) => Some(envelope),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Returns the next queued message without waiting, skipping stop requests.
    pub fn try_next_message(&mut self) -> Option<M> {
        while let Some(envelope) = self.try_recv() {
            if let Envelope::Message(message) = envelope {
                return Some(message);
            }
        }
        None
    }

    /// Drains every queued message without waiting.
    pub fn drain_messages(&mut self) -> Vec<M> {
        std::iter::from_fn(|| self.try_next_message()).collect()
    }

    /// Closes the mailbox, so further sends fail.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

/// Creates a connected [`ActorRef`] and [`Mailbox`] pair for the actor `id`.
#[must_use]
pub fn mailbox<M>(id: impl Into<Ustr>) -> (ActorRef<M>, Mailbox<M>) {
    let id = id.into();
    let (tx, rx) = unbounded_channel();
    (ActorRef { id, tx }, Mailbox { id, rx })
}
