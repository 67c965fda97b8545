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

//! switchlet is an actor-based call-control application server for event-socket telephony
//! switches.
//!
//! This crate re-exports the member crates so an application can depend on a single crate:
//!
//! - [`core`]: identifiers, validation helpers and the finite state machine.
//! - [`model`]: events, commands, API calls and dispatch rules.
//! - [`common`]: actors, the timer wheel and logging.
//! - [`network`]: the event-socket wire codec and client.
//! - [`dispatch`]: the dispatcher state machine and target registry.
//! - [`system`]: configuration loading and the server bootstrap.

#![warn(rustc::all)]
#![deny(unsafe_code)]
#![deny(nonstandard_style)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use switchlet_common as common;
pub use switchlet_core as core;
pub use switchlet_dispatch as dispatch;
pub use switchlet_model as model;
pub use switchlet_network as network;
pub use switchlet_system as system;
