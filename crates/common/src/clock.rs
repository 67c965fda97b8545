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

//! The real-time tick source driving the [`TimerService`](crate::timer::TimerService).

use std::time::Duration;

use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::{
    actor::ActorRef,
    logging::{log_task_aborted, log_task_started, log_task_stopped},
    timer::TimerCommand,
};

/// The default tick interval.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

const TASK_NAME: &str = "tick-clock";

/// Sends a [`TimerCommand::Tick`] to the timer service at a fixed interval.
///
/// Ticks missed while the runtime was busy are delivered in a burst, so the
/// tick count tracks elapsed wall time.
#[derive(Debug)]
pub struct TickClock {
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl Default for TickClock {
    /// Creates a new default [`TickClock`] instance.
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

impl TickClock {
    /// Creates a new [`TickClock`] instance.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: None,
        }
    }

    /// Returns the tick interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns whether the clock task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Starts ticking `timer`. The task ends by itself when the timer's mailbox closes.
    ///
    /// # Errors
    ///
    /// Returns an error if the clock is already running or the interval is zero.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn start(&mut self, timer: ActorRef<TimerCommand>) -> anyhow::Result<()> {
        if self.is_running() {
            anyhow::bail!("Tick clock already running");
        }
        if self.interval.is_zero() {
            anyhow::bail!("Tick interval must be positive");
        }

        let period = self.interval;
        self.task = Some(tokio::spawn(async move {
            log_task_started(TASK_NAME);
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

            loop {
                interval.tick().await;
                if timer.try_tell(TimerCommand::Tick).is_err() {
                    break;
                }
            }
            log_task_stopped(TASK_NAME);
        }));
        Ok(())
    }

    /// Stops the clock.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            log_task_aborted(TASK_NAME);
        }
    }
}

impl Drop for TickClock {
    fn drop(&mut self) {
        self.stop();
    }
}
