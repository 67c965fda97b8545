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

//! The timer service actor owning the [`TimingWheel`].

use std::time::Duration;

use ustr::Ustr;

use super::{TimeoutCallback, TimingWheel};
use crate::actor::{Actor, Context, Message};

/// A request to schedule a timeout.
#[derive(Clone, Debug)]
pub struct ScheduleTimeout {
    /// The identity the timeout is registered under; at most one per owner.
    pub owner: Ustr,
    /// The number of ticks until the timeout fires.
    pub timeout_ticks: u64,
    /// Whether the timeout fires every `timeout_ticks` until cancelled.
    pub recurring: bool,
    /// Invoked on the timer task when the timeout fires.
    pub callback: TimeoutCallback,
}

/// Commands accepted by the [`TimerService`].
#[derive(Clone, Debug)]
pub enum TimerCommand {
    /// Schedules a timeout, replacing any pending one for the same owner.
    Schedule(ScheduleTimeout),
    /// Cancels the pending timeout for `owner`, if any.
    Cancel { owner: Ustr },
    /// Advances the wheel by one tick.
    Tick,
}

impl Message for TimerCommand {
    fn kind(&self) -> &'static str {
        match self {
            Self::Schedule(_) => "Schedule",
            Self::Cancel { .. } => "Cancel",
            Self::Tick => "Tick",
        }
    }
}

/// Converts `duration` into a whole number of ticks of length `tick_interval`, rounding up.
///
/// The result is at least one tick.
#[must_use]
pub fn duration_to_ticks(duration: Duration, tick_interval: Duration) -> u64 {
    let interval = tick_interval.as_millis().max(1);
    let ticks = duration.as_millis().div_ceil(interval).max(1);
    u64::try_from(ticks).unwrap_or(u64::MAX)
}

/// Maintains pending timeouts and fires them as ticks arrive.
///
/// Scheduling, cancellation and ticking are all handled on this actor, so the
/// wheel is never shared.
#[derive(Debug)]
pub struct TimerService {
    id: Ustr,
    wheel: TimingWheel,
}

impl Default for TimerService {
    /// Creates a new default [`TimerService`] instance.
    fn default() -> Self {
        Self::new()
    }
}

impl TimerService {
    /// Creates a new [`TimerService`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Ustr::from("TimerService"),
            wheel: TimingWheel::new(),
        }
    }

    /// Returns the underlying wheel.
    #[must_use]
    pub const fn wheel(&self) -> &TimingWheel {
        &self.wheel
    }

    /// Handles a single command.
    pub fn handle(&mut self, command: TimerCommand) {
        match command {
            TimerCommand::Schedule(request) => {
                let deadline = self.wheel.schedule(
                    request.owner,
                    request.timeout_ticks,
                    request.recurring,
                    request.callback,
                );
                log::trace!(
                    "Scheduled timeout for '{}' at tick {deadline}",
                    request.owner
                );
            }
            TimerCommand::Cancel { owner } => {
                if !self.wheel.cancel(&owner) {
                    log::trace!("No pending timeout for '{owner}' to cancel");
                }
            }
            TimerCommand::Tick => {
                for handler in self.wheel.tick() {
                    log::trace!("Firing {}", handler.event);
                    handler.run();
                }
            }
        }
    }
}

impl Actor for TimerService {
    type Message = TimerCommand;

    fn id(&self) -> Ustr {
        self.id
    }

    fn receive(&mut self, message: TimerCommand, _ctx: &mut Context) -> anyhow::Result<()> {
        self.handle(message);
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::*;
    use crate::{
        actor::{mailbox, spawn_actor},
        timer::TimeoutEvent,
    };

    fn schedule(owner: &str, timeout_ticks: u64, recurring: bool, callback: TimeoutCallback) -> TimerCommand {
        TimerCommand::Schedule(ScheduleTimeout {
            owner: Ustr::from(owner),
            timeout_ticks,
            recurring,
            callback,
        })
    }

    #[rstest]
    #[case(Duration::from_millis(100), 1)]
    #[case(Duration::from_millis(150), 2)]
    #[case(Duration::from_millis(0), 1)]
    #[case(Duration::from_secs(30), 300)]
    fn test_duration_to_ticks(#[case] duration: Duration, #[case] expected: u64) {
        assert_eq!(duration_to_ticks(duration, Duration::from_millis(100)), expected);
    }

    #[rstest]
    fn test_handle_notifies_owner_actor() {
        let (owner_ref, mut owner_mailbox) = mailbox::<TimeoutEvent>("Owner");
        let mut service = TimerService::new();

        service.handle(schedule(
            "Owner",
            3,
            false,
            TimeoutCallback::notify(owner_ref, |event| event),
        ));
        for _ in 0..3 {
            service.handle(TimerCommand::Tick);
        }

        let events = owner_mailbox.drain_messages();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].owner.as_str(), "Owner");
        assert_eq!(events[0].fired_tick, 3);
    }

    #[rstest]
    fn test_cancel_prevents_notification() {
        let (owner_ref, mut owner_mailbox) = mailbox::<TimeoutEvent>("Owner");
        let mut service = TimerService::new();

        service.handle(schedule("Owner", 3, false, TimeoutCallback::notify(owner_ref, |e| e)));
        service.handle(TimerCommand::Tick);
        service.handle(TimerCommand::Cancel {
            owner: Ustr::from("Owner"),
        });
        service.handle(TimerCommand::Cancel {
            owner: Ustr::from("Unknown"),
        });
        for _ in 0..10 {
            service.handle(TimerCommand::Tick);
        }

        assert!(owner_mailbox.drain_messages().is_empty());
        assert!(service.wheel().is_empty());
    }

    #[tokio::test]
    async fn test_spawned_service() {
        let (owner_ref, mut owner_mailbox) = mailbox::<TimeoutEvent>("Owner");
        let (timer_ref, handle) = spawn_actor(TimerService::new());

        timer_ref.tell(schedule("Owner", 2, true, TimeoutCallback::notify(owner_ref, |e| e)));
        for _ in 0..6 {
            timer_ref.tell(TimerCommand::Tick);
        }
        timer_ref.stop();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        let ticks: Vec<u64> = owner_mailbox
            .drain_messages()
            .iter()
            .map(|e| e.fired_tick)
            .collect();
        assert_eq!(ticks, vec![2, 4, 6]);
    }
}
