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

//! Outbound commands sent to the switch.
//!
//! A command renders to its exact wire text, always terminated by a blank line.

use std::fmt::{Debug, Display, Formatter};

use switchlet_core::{
    UUID4,
    correctness::{check_slice_not_empty, check_valid_string, check_valid_token},
};

use crate::{api::Api, enums::EventFormat, event::EVENT_BACKGROUND_JOB};

/// Error returned when a command cannot be built from the given arguments.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum CommandError {
    /// An argument failed validation.
    #[error("Invalid command argument: {0}")]
    InvalidArgument(String),
}

/// Something which can be written to the switch.
pub trait Command: Display + Debug + Send {
    /// Returns the wire text for this command.
    fn render(&self) -> String {
        self.to_string()
    }

    /// Returns the job identifier this command will be correlated by, if any.
    fn job_uuid(&self) -> Option<UUID4> {
        None
    }
}

/// Authenticates the connection with a shared password.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthCommand {
    password: String,
}

impl AuthCommand {
    /// Creates a new [`AuthCommand`] instance.
    ///
    /// # Errors
    ///
    /// Returns an error if `password` is empty or contains whitespace.
    pub fn new(password: &str) -> Result<Self, CommandError> {
        check_valid_token(password, "password")
            .map_err(|e| CommandError::InvalidArgument(e.to_string()))?;
        Ok(Self {
            password: password.to_string(),
        })
    }
}

impl Debug for AuthCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(AuthCommand))
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Display for AuthCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "auth {}\n\n", self.password)
    }
}

impl Command for AuthCommand {}

/// Subscribes the connection to a set of named events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventsCommand {
    format: EventFormat,
    events: Vec<String>,
}

impl EventsCommand {
    /// Creates a new [`EventsCommand`] instance.
    ///
    /// # Errors
    ///
    /// Returns an error if `events` is empty or any name is not a single token.
    pub fn new(format: EventFormat, events: Vec<String>) -> Result<Self, CommandError> {
        check_slice_not_empty(&events, "events")
            .map_err(|e| CommandError::InvalidArgument(e.to_string()))?;
        for event in &events {
            check_valid_token(event, "events")
                .map_err(|e| CommandError::InvalidArgument(e.to_string()))?;
        }
        Ok(Self { format, events })
    }

    /// Creates a subscription which is guaranteed to include `BACKGROUND_JOB`.
    ///
    /// Job completions are only correlated when the switch delivers them, so the
    /// name is appended when the caller did not list it. The caller's list is
    /// not modified.
    ///
    /// # Errors
    ///
    /// Returns an error if any name in `events` is not a single token.
    pub fn with_background_jobs(format: EventFormat, events: &[String]) -> Result<Self, CommandError> {
        let mut events = events.to_vec();
        if !events.iter().any(|name| name == EVENT_BACKGROUND_JOB) {
            events.push(EVENT_BACKGROUND_JOB.to_string());
        }
        Self::new(format, events)
    }

    /// Returns the event format.
    #[must_use]
    pub const fn format(&self) -> EventFormat {
        self.format
    }

    /// Returns the subscribed event names.
    #[must_use]
    pub fn events(&self) -> &[String] {
        &self.events
    }
}

impl Display for EventsCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "event {} {}\n\n", self.format, self.events.join(" "))
    }
}

impl Command for EventsCommand {}

/// Executes an [`Api`] verb asynchronously, correlated by a fresh job identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct BackgroundCommand {
    job_uuid: UUID4,
    api: Api,
}

impl BackgroundCommand {
    /// Creates a new [`BackgroundCommand`] instance with a generated job identifier.
    #[must_use]
    pub fn new(api: Api) -> Self {
        Self::with_job_uuid(api, UUID4::new())
    }

    /// Creates a new [`BackgroundCommand`] instance with the given job identifier.
    #[must_use]
    pub const fn with_job_uuid(api: Api, job_uuid: UUID4) -> Self {
        Self { job_uuid, api }
    }

    /// Returns the API verb.
    #[must_use]
    pub const fn api(&self) -> &Api {
        &self.api
    }

    /// Returns the job identifier.
    #[must_use]
    pub const fn id(&self) -> UUID4 {
        self.job_uuid
    }
}

impl Display for BackgroundCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "bgapi {}\nJob-UUID: {}\n\n", self.api, self.job_uuid)
    }
}

impl Command for BackgroundCommand {
    fn job_uuid(&self) -> Option<UUID4> {
        Some(self.job_uuid)
    }
}

/// Sends a raw, pre-validated line. Used for verbs without a typed builder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawCommand {
    line: String,
}

impl RawCommand {
    /// Creates a new [`RawCommand`] instance.
    ///
    /// # Errors
    ///
    /// Returns an error if `line` is empty or contains a line break.
    pub fn new(line: &str) -> Result<Self, CommandError> {
        check_valid_string(line, "line").map_err(|e| CommandError::InvalidArgument(e.to_string()))?;
        if line.contains(['\r', '\n']) {
            return Err(CommandError::InvalidArgument(
                "raw command must be a single line".to_string(),
            ));
        }
        Ok(Self {
            line: line.to_string(),
        })
    }
}

impl Display for RawCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\n\n", self.line)
    }
}

impl Command for RawCommand {}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;
    use crate::event::Event;

    #[rstest]
    fn test_auth_render() {
        let command = AuthCommand::new("ClueCon").unwrap();
        assert_eq!(command.render(), "auth ClueCon\n\n");
        assert_eq!(command.job_uuid(), None);
    }

    #[rstest]
    fn test_auth_debug_redacts_password() {
        let command = AuthCommand::new("ClueCon").unwrap();
        assert!(!format!("{command:?}").contains("ClueCon"));
    }

    #[rstest]
    #[case("")]
    #[case("two words")]
    fn test_auth_invalid_password(#[case] password: &str) {
        assert!(AuthCommand::new(password).is_err());
    }

    #[rstest]
    fn test_events_render() {
        let command = EventsCommand::new(
            EventFormat::Plain,
            vec!["HEARTBEAT".to_string(), "CHANNEL_CREATE".to_string()],
        )
        .unwrap();

        assert_eq!(command.render(), "event plain HEARTBEAT CHANNEL_CREATE\n\n");
    }

    #[rstest]
    fn test_events_empty_is_error() {
        assert!(EventsCommand::new(EventFormat::Plain, vec![]).is_err());
    }

    #[rstest]
    fn test_with_background_jobs_appends_once() {
        let requested = vec!["HEARTBEAT".to_string()];
        let command = EventsCommand::with_background_jobs(EventFormat::Json, &requested).unwrap();

        assert_eq!(command.events(), ["HEARTBEAT", "BACKGROUND_JOB"]);
        assert_eq!(requested, vec!["HEARTBEAT".to_string()]);
        assert_eq!(command.render(), "event json HEARTBEAT BACKGROUND_JOB\n\n");

        let again = EventsCommand::with_background_jobs(EventFormat::Json, command.events()).unwrap();
        assert_eq!(again, command);
    }

    #[rstest]
    fn test_with_background_jobs_on_empty_list() {
        let command = EventsCommand::with_background_jobs(EventFormat::Plain, &[]).unwrap();
        assert_eq!(command.render(), "event plain BACKGROUND_JOB\n\n");
    }

    #[rstest]
    fn test_background_render() {
        let job_uuid = UUID4::from_str("d3418bd1-cfa4-42a9-8a8e-a04a770c808d").unwrap();
        let command =
            BackgroundCommand::with_job_uuid(Api::acl_check("192.168.1.1", "lan").unwrap(), job_uuid);

        assert_eq!(
            command.render(),
            "bgapi acl 192.168.1.1 lan\nJob-UUID: d3418bd1-cfa4-42a9-8a8e-a04a770c808d\n\n"
        );
        assert_eq!(command.job_uuid(), Some(job_uuid));
    }

    #[rstest]
    fn test_background_commands_get_distinct_ids() {
        let a = BackgroundCommand::new(Api::Status);
        let b = BackgroundCommand::new(Api::Status);
        assert_ne!(a.id(), b.id());
    }

    #[rstest]
    fn test_raw_command() {
        assert_eq!(RawCommand::new("log 7").unwrap().render(), "log 7\n\n");
        assert!(RawCommand::new("log 7\n\nexit").is_err());
    }

    proptest! {
        #[test]
        fn prop_rendered_job_uuid_parses_back(bytes in proptest::array::uniform16(any::<u8>())) {
            let value = ::uuid::Builder::from_random_bytes(bytes).into_uuid();
            let job_uuid = UUID4::from_str(&value.to_string()).unwrap();
            let command = BackgroundCommand::with_job_uuid(Api::Status, job_uuid);

            // Skip the "bgapi <verb>" line to reach the header block.
            let rendered = command.render();
            let (_, headers) = rendered.split_once('\n').unwrap();
            let parsed = Event::from_wire(headers);

            prop_assert_eq!(parsed.job_uuid(), Some(job_uuid));
            prop_assert_eq!(parsed.job_uuid_str().map(str::to_string), Some(job_uuid.to_string()));
        }
    }
}
