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

//! The logging framework for switchlet systems.
//!
//! Synchronous components log through the `log` facade and async tasks through
//! `tracing`. [`init_logging`] installs a single `tracing_subscriber` formatter
//! which also receives `log` records, so both end up in the same stream.

pub mod logger;

use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::EnvFilter;

use self::logger::LoggerConfig;

pub const RECV: &str = "<--";
pub const SEND: &str = "-->";

static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Returns whether logging has been initialized.
pub fn logging_is_initialized() -> bool {
    LOGGING_INITIALIZED.load(Ordering::Relaxed)
}

/// Initialize logging.
///
/// Installs the global subscriber filtered by `config`. Should only be called
/// once during an application's run, ideally at the beginning of the run.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a global subscriber is already set.
pub fn init_logging(config: &LoggerConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(config.env_filter_directives())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.is_colored)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    LOGGING_INITIALIZED.store(true, Ordering::Relaxed);

    if config.print_config {
        log::info!("Logging initialized with {config:?}");
    }
    Ok(())
}

/// Logs that a task has started using `tracing::debug!`.
pub fn log_task_started(task_name: &str) {
    tracing::debug!("Started task '{task_name}'");
}

/// Logs that a task has stopped using `tracing::debug!`.
pub fn log_task_stopped(task_name: &str) {
    tracing::debug!("Stopped task '{task_name}'");
}

/// Logs that a task is being awaited using `tracing::debug!`.
pub fn log_task_awaiting(task_name: &str) {
    tracing::debug!("Awaiting task '{task_name}'");
}

/// Logs that a task was aborted using `tracing::debug!`.
pub fn log_task_aborted(task_name: &str) {
    tracing::debug!("Aborted task '{task_name}'");
}

/// Logs that there was an error in a task `tracing::error!`.
pub fn log_task_error(task_name: &str, e: &anyhow::Error) {
    tracing::error!("Error in task '{task_name}': {e}");
}
