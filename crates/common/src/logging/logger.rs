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

//! Logger configuration.

use std::{env, fmt::Write, str::FromStr};

use indexmap::IndexMap;
use log::LevelFilter;
use ustr::Ustr;

/// The environment variable holding a logging spec string.
pub const LOG_ENV_VAR: &str = "SWITCHLET_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Maximum log level to write to stdout.
    pub stdout_level: LevelFilter,
    /// Per-component log levels, keyed by module path or tracing target.
    pub(crate) component_level: IndexMap<Ustr, LevelFilter>,
    /// If logger is using ANSI color codes.
    pub is_colored: bool,
    /// If the configuration should be logged at initialization.
    pub print_config: bool,
}

impl Default for LoggerConfig {
    /// Creates a new default [`LoggerConfig`] instance.
    fn default() -> Self {
        Self {
            stdout_level: LevelFilter::Info,
            component_level: IndexMap::new(),
            is_colored: false,
            print_config: false,
        }
    }
}

impl LoggerConfig {
    /// Creates a new [`LoggerConfig`] instance.
    #[must_use]
    pub const fn new(
        stdout_level: LevelFilter,
        component_level: IndexMap<Ustr, LevelFilter>,
        is_colored: bool,
        print_config: bool,
    ) -> Self {
        Self {
            stdout_level,
            component_level,
            is_colored,
            print_config,
        }
    }

    /// Returns the per-component log levels.
    #[must_use]
    pub const fn component_level(&self) -> &IndexMap<Ustr, LevelFilter> {
        &self.component_level
    }

    /// Parses a `;` separated spec such as `stdout=info;switchlet_dispatch=debug;is_colored`.
    ///
    /// # Errors
    ///
    /// Returns an error if a pair is malformed or names an unknown level.
    pub fn from_spec(spec: &str) -> anyhow::Result<Self> {
        let mut config = Self::default();
        for kv in spec.split(';') {
            let kv = kv.trim();
            if kv.is_empty() {
                continue;
            }
            match kv.to_lowercase().as_str() {
                "is_colored" => config.is_colored = true,
                "print_config" => config.print_config = true,
                _ => {
                    let Some((key, value)) = kv.split_once('=') else {
                        anyhow::bail!("Invalid spec pair: {kv}");
                    };
                    let (key, value) = (key.trim(), value.trim());
                    let level = LevelFilter::from_str(value)
                        .map_err(|_| anyhow::anyhow!("Invalid log level: {value}"))?;
                    if key.eq_ignore_ascii_case("stdout") {
                        config.stdout_level = level;
                    } else {
                        config.component_level.insert(Ustr::from(key), level);
                    }
                }
            }
        }
        Ok(config)
    }

    /// Retrieves the logger configuration from the `SWITCHLET_LOG` environment variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is unset or invalid.
    pub fn from_env() -> anyhow::Result<Self> {
        let spec = env::var(LOG_ENV_VAR)?;
        Self::from_spec(&spec)
    }

    /// Returns the equivalent `tracing_subscriber::EnvFilter` directive string.
    #[must_use]
    pub fn env_filter_directives(&self) -> String {
        let mut directives = self.stdout_level.as_str().to_lowercase();
        for (component, level) in &self.component_level {
            let _ = write!(directives, ",{component}={}", level.as_str().to_lowercase());
        }
        directives
    }
}
