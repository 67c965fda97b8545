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

//! Common test related helper functions.

use std::{
    future::Future,
    thread,
    time::{Duration, Instant},
};

use crate::logging::{init_logging, logger::LoggerConfig, logging_is_initialized};

/// Initializes logging for tests at `stdout_level` (default `Trace`).
///
/// Repeated calls are a no-op, so every test may call this.
///
/// # Errors
///
/// Returns an error if another global subscriber was installed first.
pub fn init_logger_for_testing(stdout_level: Option<log::LevelFilter>) -> anyhow::Result<()> {
    if logging_is_initialized() {
        return Ok(());
    }
    let config = LoggerConfig {
        stdout_level: stdout_level.unwrap_or(log::LevelFilter::Trace),
        ..Default::default()
    };
    init_logging(&config)
}

/// Repeatedly evaluates a condition with a delay until it becomes true or a timeout occurs.
///
/// # Panics
///
/// This function will panic if the timeout duration is exceeded without the condition being met.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
///
/// use switchlet_common::testing::wait_until;
///
/// let start_time = Instant::now();
/// wait_until(|| start_time.elapsed() > Duration::from_millis(20), Duration::from_secs(5));
/// ```
pub fn wait_until<F>(mut condition: F, timeout: Duration)
where
    F: FnMut() -> bool,
{
    let start_time = Instant::now();

    loop {
        if condition() {
            break;
        }

        assert!(
            start_time.elapsed() <= timeout,
            "Timeout waiting for condition"
        );

        thread::sleep(Duration::from_millis(10));
    }
}

/// Async variant of [`wait_until`].
///
/// # Panics
///
/// This function will panic if the timeout duration is exceeded without the condition being met.
pub async fn wait_until_async<F, Fut>(mut condition: F, timeout: Duration)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start_time = Instant::now();

    loop {
        if condition().await {
            break;
        }

        assert!(
            start_time.elapsed() <= timeout,
            "Timeout waiting for condition"
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
