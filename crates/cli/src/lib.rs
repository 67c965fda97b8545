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

#![warn(rustc::all)]
#![deny(unsafe_code)]
#![deny(nonstandard_style)]
#![deny(missing_debug_implementations)]

pub mod opt;

use std::path::Path;

use switchlet_common::logging::{init_logging, logger::LoggerConfig};
use switchlet_system::{
    config::{SwitchletConfig, ValidatedConfig},
    server::SwitchletServer,
};

use crate::opt::{Commands, RunOpt, SwitchletCli, ValidateOpt};

/// Executes the parsed command.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the server fails.
pub async fn run(opt: SwitchletCli) -> anyhow::Result<()> {
    match opt.command {
        Commands::Run(run_opt) => run_server(&run_opt).await,
        Commands::Validate(validate_opt) => validate(&validate_opt),
    }
}

/// Loads and validates the configuration at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load_config(path: &Path) -> anyhow::Result<ValidatedConfig> {
    let config = SwitchletConfig::from_file(path)?;
    Ok(config.validate()?)
}

/// Picks the logging configuration: the command line first, then `SWITCHLET_LOG`, then the file.
///
/// # Errors
///
/// Returns an error if the command line spec is invalid.
pub fn resolve_logger_config(
    cli_spec: Option<&str>,
    config: &ValidatedConfig,
) -> anyhow::Result<LoggerConfig> {
    if let Some(spec) = cli_spec {
        return LoggerConfig::from_spec(spec);
    }
    Ok(LoggerConfig::from_env().unwrap_or_else(|_| config.logger().clone()))
}

async fn run_server(opt: &RunOpt) -> anyhow::Result<()> {
    let config = load_config(&opt.config)?;
    let logger = resolve_logger_config(opt.log.as_deref(), &config)?;
    init_logging(&logger)?;

    log::info!("Loaded configuration from {}", opt.config.display());
    SwitchletServer::with_default_targets(config)?.run().await
}

fn validate(opt: &ValidateOpt) -> anyhow::Result<()> {
    let config = load_config(&opt.config)?;
    println!(
        "{}: OK ({} dispatch rules, switch at {})",
        opt.config.display(),
        config.dispatcher().rules().len(),
        config.socket().address,
    );
    Ok(())
}
