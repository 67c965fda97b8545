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

//! Adapts transport notifications into dispatcher messages.

use switchlet_common::actor::ActorRef;
use switchlet_model::event::Event;
use switchlet_network::transport::{CommandSink, TransportObserver};

use crate::messages::DispatcherMessage;

/// A [`TransportObserver`] forwarding everything into the dispatcher's mailbox.
///
/// A lost connection ends the session with [`DispatcherMessage::Kill`].
#[derive(Clone, Debug)]
pub struct DispatcherProxy {
    dispatcher: ActorRef<DispatcherMessage>,
}

impl DispatcherProxy {
    /// Creates a new [`DispatcherProxy`] instance.
    #[must_use]
    pub const fn new(dispatcher: ActorRef<DispatcherMessage>) -> Self {
        Self { dispatcher }
    }
}

impl TransportObserver for DispatcherProxy {
    fn on_connected(&self, sink: Box<dyn CommandSink>) {
        self.dispatcher
            .tell(DispatcherMessage::ConnectionEstablished(sink));
    }

    fn on_event(&self, event: Event) {
        self.dispatcher.tell(DispatcherMessage::Event(event));
    }

    fn on_disconnected(&self) {
        log::info!("Connection to switch lost");
        self.dispatcher.tell(DispatcherMessage::Kill);
    }
}
