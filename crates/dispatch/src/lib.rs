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

//! Event dispatch for the switchlet call-control server.
//!
//! The `switchlet-dispatch` crate contains the [`Dispatcher`](engine::Dispatcher),
//! the single actor which owns the control connection to the switch. It drives
//! the authentication and subscription handshake, correlates background job
//! replies with the switchlets which issued them and routes unsolicited events
//! to targets resolved through the [`TargetRegistry`](registry::TargetRegistry).

#![warn(rustc::all)]
#![deny(unsafe_code)]
#![deny(nonstandard_style)]
#![deny(missing_debug_implementations)]
#![deny(clippy::missing_errors_doc)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod engine;
pub mod messages;
pub mod proxy;
pub mod registry;
