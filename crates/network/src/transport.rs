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

//! The seam between the event-socket transport and whatever consumes it.

use std::fmt::Debug;

use switchlet_model::event::Event;

/// A send-capable channel to the switch, handed over once connected.
pub trait CommandSink: Debug + Send + Sync {
    /// Queues rendered command text for writing to the switch.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is no longer writable.
    fn send(&self, text: String) -> anyhow::Result<()>;
}

/// Receives the transport's connection lifecycle and decoded events.
///
/// Callbacks run on the transport's read task and must not block.
pub trait TransportObserver: Send + Sync {
    /// Called once the connection is established, before any event is delivered.
    fn on_connected(&self, sink: Box<dyn CommandSink>);

    /// Called for every decoded inbound event, in arrival order.
    fn on_event(&self, event: Event);

    /// Called once when the connection is lost or closed.
    fn on_disconnected(&self);
}
