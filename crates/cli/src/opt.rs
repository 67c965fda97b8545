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

use std::path::PathBuf;

use clap::Parser;

/// Main CLI structure for parsing command-line arguments and options.
#[derive(Debug, Parser)]
#[clap(version, about, author)]
pub struct SwitchletCli {
    #[clap(subcommand)]
    pub command: Commands,
}

/// Available top-level commands.
#[derive(Parser, Debug)]
pub enum Commands {
    /// Connects to the switch and dispatches events until interrupted.
    Run(RunOpt),
    /// Loads and validates a configuration file, then exits.
    Validate(ValidateOpt),
}

#[derive(Parser, Debug, Clone)]
pub struct RunOpt {
    /// Path to the TOML configuration file.
    #[arg(long, short)]
    pub config: PathBuf,
    /// Logging spec overriding the file and `SWITCHLET_LOG`, e.g. `stdout=debug`.
    #[arg(long)]
    pub log: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ValidateOpt {
    /// Path to the TOML configuration file.
    #[arg(long, short)]
    pub config: PathBuf,
}
