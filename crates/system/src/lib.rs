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

//! Configuration and bootstrap for the switchlet call-control server.
//!
//! The `switchlet-system` crate wires the other crates together:
//!
//! - [`SwitchletConfig`](config::SwitchletConfig) loads and validates the TOML configuration.
//! - [`SwitchletServer`](server::SwitchletServer) starts the timer service, the
//!   dispatcher and the event-socket client, then runs until interrupted or
//!   until the session with the switch ends.
//! - [`switchlets`] holds the built-in targets, such as the heartbeat [`Monitor`](switchlets::heartbeat::Monitor).

#![warn(rustc::all)]
#![deny(unsafe_code)]
#![deny(nonstandard_style)]
#![deny(missing_debug_implementations)]
#![deny(clippy::missing_errors_doc)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod server;
pub mod switchlets;
