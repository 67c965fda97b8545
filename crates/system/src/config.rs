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

//! Server configuration, loaded from TOML.
//!
//! ```toml
//! [host]
//! address = "127.0.0.1"
//! port = 8021
//! password = "ClueCon"
//!
//! [events]
//! format = "plain" # or "json"
//! names = ["HEARTBEAT", "CHANNEL_ANSWER"]
//!
//! [[rules]]
//! header_name = "Event-Name"
//! header_value = "HEARTBEAT"
//! target = "Monitor"
//! persistent = true
//!
//! [timer]
//! tick_interval_ms = 100
//!
//! [logging]
//! spec = "stdout=info;switchlet_dispatch=debug"
//! ```

use std::{
    fmt::{Debug, Formatter},
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use switchlet_common::logging::logger::LoggerConfig;
use switchlet_dispatch::engine::DispatcherConfig;
use switchlet_model::{
    enums::EventFormat,
    rule::{DispatchRuleConfig, DispatchRules, RuleError},
};
use switchlet_network::socket::EventSocketConfig;

/// Error returned when the configuration cannot be loaded or is invalid.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid dispatch rule: {0}")]
    Rule(#[from] RuleError),
    #[error("Invalid [{section}] configuration: {message}")]
    Invalid {
        section: &'static str,
        message: String,
    },
}

impl ConfigError {
    fn invalid(section: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            section,
            message: message.into(),
        }
    }
}

/// The `[host]` section: where the switch's event socket listens.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    pub address: String,
    pub port: u16,
    pub password: String,
}

impl Default for HostConfig {
    /// Creates a new default [`HostConfig`] instance.
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8021,
            password: "ClueCon".to_string(),
        }
    }
}

impl Debug for HostConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(HostConfig))
            .field("address", &self.address)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The `[events]` section: the subscription requested after authentication.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventsConfig {
    pub format: EventFormat,
    pub names: Vec<String>,
}

/// The `[timer]` section.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimerConfig {
    pub tick_interval_ms: u64,
}

impl Default for TimerConfig {
    /// Creates a new default [`TimerConfig`] instance.
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
        }
    }
}

/// The `[socket]` section: connection attempts to the switch.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SocketConfig {
    pub connect_attempts: u32,
    pub connect_delay_initial_ms: u64,
    pub connect_delay_max_ms: u64,
    pub connect_backoff_factor: f64,
    pub connect_jitter_ms: u64,
}

impl Default for SocketConfig {
    /// Creates a new default [`SocketConfig`] instance.
    fn default() -> Self {
        let defaults = EventSocketConfig::default();
        Self {
            connect_attempts: defaults.connect_attempts,
            connect_delay_initial_ms: defaults.connect_delay_initial_ms,
            connect_delay_max_ms: defaults.connect_delay_max_ms,
            connect_backoff_factor: defaults.connect_backoff_factor,
            connect_jitter_ms: defaults.connect_jitter_ms,
        }
    }
}

/// The `[logging]` section.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// A [`LoggerConfig`] spec string such as `stdout=info;switchlet_dispatch=debug`.
    pub spec: Option<String>,
}

/// The raw configuration as written in the TOML file.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SwitchletConfig {
    pub host: HostConfig,
    pub events: EventsConfig,
    pub rules: Vec<DispatchRuleConfig>,
    pub timer: TimerConfig,
    pub socket: SocketConfig,
    pub logging: LoggingConfig,
}

impl SwitchletConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or has unknown fields.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Validates every section and compiles the dispatch rules.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        if self.host.address.trim().is_empty() {
            return Err(ConfigError::invalid("host", "address is empty"));
        }
        if self.host.port == 0 {
            return Err(ConfigError::invalid("host", "port must be positive"));
        }
        if self.host.password.is_empty() || self.host.password.contains(char::is_whitespace) {
            return Err(ConfigError::invalid(
                "host",
                "password must be a single non-empty token",
            ));
        }
        if self.events.format == EventFormat::Xml {
            return Err(ConfigError::invalid(
                "events",
                "format 'xml' is not supported, use 'plain' or 'json'",
            ));
        }
        if self.timer.tick_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "timer",
                "tick_interval_ms must be positive",
            ));
        }
        if self.socket.connect_attempts == 0 {
            return Err(ConfigError::invalid(
                "socket",
                "connect_attempts must be positive",
            ));
        }

        let rules = DispatchRules::from_configs(&self.rules)?;
        let dispatcher = DispatcherConfig::new(
            &self.host.password,
            self.events.format,
            &self.events.names,
            rules,
        )
        .map_err(|e| ConfigError::invalid("events", e.to_string()))?;

        let logger = match &self.logging.spec {
            Some(spec) => LoggerConfig::from_spec(spec)
                .map_err(|e| ConfigError::invalid("logging", e.to_string()))?,
            None => LoggerConfig::default(),
        };

        let socket = EventSocketConfig {
            address: format!("{}:{}", self.host.address.trim(), self.host.port),
            connect_attempts: self.socket.connect_attempts,
            connect_delay_initial_ms: self.socket.connect_delay_initial_ms,
            connect_delay_max_ms: self.socket.connect_delay_max_ms,
            connect_backoff_factor: self.socket.connect_backoff_factor,
            connect_jitter_ms: self.socket.connect_jitter_ms,
        };

        Ok(ValidatedConfig {
            dispatcher,
            socket,
            tick_interval: Duration::from_millis(self.timer.tick_interval_ms),
            logger,
        })
    }
}

/// A configuration which passed [`SwitchletConfig::validate`]. Immutable from here on.
#[derive(Clone, Debug)]
pub struct ValidatedConfig {
    dispatcher: DispatcherConfig,
    socket: EventSocketConfig,
    tick_interval: Duration,
    logger: LoggerConfig,
}

impl ValidatedConfig {
    #[must_use]
    pub const fn dispatcher(&self) -> &DispatcherConfig {
        &self.dispatcher
    }

    #[must_use]
    pub const fn socket(&self) -> &EventSocketConfig {
        &self.socket
    }

    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    #[must_use]
    pub const fn logger(&self) -> &LoggerConfig {
        &self.logger
    }
}
