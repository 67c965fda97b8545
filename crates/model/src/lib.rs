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

//! The domain model for the switchlet call-control server.
//!
//! The `switchlet-model` crate defines the messages exchanged with the switch
//! and the rules used to route them:
//!
//! - Inbound [`Event`](event::Event)s with ordered headers and an optional body.
//! - Outbound [`Command`](command::Command)s rendered to exact wire text.
//! - Typed [`Api`](api::Api) verbs for background jobs.
//! - Header based [`DispatchRules`](rule::DispatchRules) for unsolicited events.

#![warn(rustc::all)]
#![deny(unsafe_code)]
#![deny(nonstandard_style)]
#![deny(missing_debug_implementations)]
#![deny(clippy::missing_errors_doc)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod api;
pub mod command;
pub mod enums;
pub mod event;
pub mod rule;
