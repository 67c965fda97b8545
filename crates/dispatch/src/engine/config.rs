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

use std::fmt::{Debug, Formatter};

use switchlet_model::{
    command::{AuthCommand, CommandError, EventsCommand},
    enums::EventFormat,
    rule::DispatchRules,
};

/// The validated, immutable configuration of a [`Dispatcher`](super::Dispatcher).
///
/// The handshake commands are built up front, so an invalid password or event
/// name fails here rather than mid-handshake.
#[derive(Clone)]
pub struct DispatcherConfig {
    auth: AuthCommand,
    subscription: EventsCommand,
    rules: DispatchRules,
}

impl DispatcherConfig {
    /// Creates a new [`DispatcherConfig`] instance.
    ///
    /// The subscription always includes `BACKGROUND_JOB`; `events` itself is not modified.
    ///
    /// # Errors
    ///
    /// Returns an error if `password` or any of `events` is not a single token.
    pub fn new(
        password: &str,
        format: EventFormat,
        events: &[String],
        rules: DispatchRules,
    ) -> Result<Self, CommandError> {
        Ok(Self {
            auth: AuthCommand::new(password)?,
            subscription: EventsCommand::with_background_jobs(format, events)?,
            rules,
        })
    }

    #[must_use]
    pub const fn auth(&self) -> &AuthCommand {
        &self.auth
    }

    #[must_use]
    pub const fn subscription(&self) -> &EventsCommand {
        &self.subscription
    }

    #[must_use]
    pub const fn rules(&self) -> &DispatchRules {
        &self.rules
    }
}

impl Debug for DispatcherConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(DispatcherConfig))
            .field("auth", &self.auth)
            .field("subscription", &self.subscription.to_string().trim_end())
            .field("rules", &self.rules.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_subscription_appends_background_job_without_touching_input() {
        let events = vec!["HEARTBEAT".to_string(), "CHANNEL_ANSWER".to_string()];

        let config =
            DispatcherConfig::new("ClueCon", EventFormat::Plain, &events, DispatchRules::default())
                .unwrap();

        assert_eq!(
            config.subscription().to_string(),
            "event plain HEARTBEAT CHANNEL_ANSWER BACKGROUND_JOB\n\n"
        );
        assert_eq!(events.len(), 2);
    }

    #[rstest]
    fn test_debug_redacts_password() {
        let config =
            DispatcherConfig::new("s3cret", EventFormat::Json, &[], DispatchRules::default())
                .unwrap();

        let debug = format!("{config:?}");

        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("event json BACKGROUND_JOB"));
    }

    #[rstest]
    #[case("", &[])]
    #[case("Clue Con", &[])]
    #[case("ClueCon", &["CHANNEL ANSWER"])]
    fn test_invalid_arguments(#[case] password: &str, #[case] events: &[&str]) {
        let events: Vec<String> = events.iter().map(ToString::to_string).collect();
        assert!(
            DispatcherConfig::new(password, EventFormat::Plain, &events, DispatchRules::default())
                .is_err()
        );
    }
}
