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

//! Tick based timeouts: a hierarchical timing wheel and the actor which drives it.
//!
//! All timeouts are measured in ticks. A tick is one period of the
//! [`TickClock`](crate::clock::TickClock) (100 ms by default).

pub mod service;
pub mod wheel;

use std::{
    fmt::{Debug, Display},
    sync::Arc,
};

use ustr::Ustr;

use crate::actor::ActorRef;

// Re-exports
pub use service::{ScheduleTimeout, TimerCommand, TimerService};
pub use wheel::{TimerLocation, TimingWheel, WheelLevel};

/// Notification that the timeout registered by `owner` has expired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeoutEvent {
    /// The identity the timeout was registered under.
    pub owner: Ustr,
    /// The tick the timeout was due.
    pub deadline_tick: u64,
    /// The tick the timeout fired.
    pub fired_tick: u64,
    /// Whether the timeout will fire again.
    pub recurring: bool,
}

impl Display for TimeoutEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(owner={}, deadline_tick={}, fired_tick={}, recurring={})",
            stringify!(TimeoutEvent),
            self.owner,
            self.deadline_tick,
            self.fired_tick,
            self.recurring,
        )
    }
}

pub type RustTimeoutCallback = dyn Fn(TimeoutEvent) + Send + Sync;

/// The action run when a timeout fires.
#[derive(Clone)]
pub struct TimeoutCallback(Arc<RustTimeoutCallback>);

impl TimeoutCallback {
    /// Creates a new [`TimeoutCallback`] from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(TimeoutEvent) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Creates a callback which delivers the event to `actor`, wrapped by `wrap`.
    pub fn notify<M>(actor: ActorRef<M>, wrap: fn(TimeoutEvent) -> M) -> Self
    where
        M: Send + 'static,
    {
        Self::new(move |event| actor.tell(wrap(event)))
    }

    /// Invokes the callback with `event`.
    pub fn call(&self, event: TimeoutEvent) {
        (self.0)(event);
    }
}

impl Debug for TimeoutCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(stringify!(TimeoutCallback))
    }
}

/// A fired [`TimeoutEvent`] paired with the callback to run for it.
#[derive(Clone, Debug)]
pub struct TimeoutHandler {
    /// The fired event.
    pub event: TimeoutEvent,
    /// The callback registered with the timeout.
    pub callback: TimeoutCallback,
}

impl TimeoutHandler {
    /// Runs the callback with the event.
    pub fn run(self) {
        self.callback.call(self.event);
    }
}
