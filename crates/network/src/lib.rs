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

//! Networking for the switchlet call-control server.
//!
//! The `switchlet-network` crate speaks the switch's inbound event-socket
//! protocol over TCP:
//!
//! - [`EventDecoder`](codec::EventDecoder) frames raw bytes into events.
//! - [`EventSocketClient`](socket::EventSocketClient) owns the connection and its IO tasks.
//! - [`CommandSink`](transport::CommandSink) and [`TransportObserver`](transport::TransportObserver)
//!   decouple the connection from the component driving it.
//! - [`ExponentialBackoff`](backoff::ExponentialBackoff) paces connection attempts.

#![warn(rustc::all)]
#![deny(unsafe_code)]
#![deny(nonstandard_style)]
#![deny(missing_debug_implementations)]
#![deny(clippy::missing_errors_doc)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod backoff;
pub mod codec;
pub mod mode;
pub mod socket;
pub mod transport;
