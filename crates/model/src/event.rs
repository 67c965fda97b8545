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

//! Inbound messages received from the switch.

use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use switchlet_core::UUID4;

use crate::enums::ContentType;

/// The header naming the message content type.
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
/// The header giving the byte length of the message body.
pub const HEADER_CONTENT_LENGTH: &str = "Content-Length";
/// The header carrying the textual reply to a command.
pub const HEADER_REPLY_TEXT: &str = "Reply-Text";
/// The header carrying the background job identifier.
pub const HEADER_JOB_UUID: &str = "Job-UUID";
/// The header naming the event.
pub const HEADER_EVENT_NAME: &str = "Event-Name";

/// The event name the switch emits when a background job completes.
pub const EVENT_BACKGROUND_JOB: &str = "BACKGROUND_JOB";
/// The event name of the switch's periodic liveness event.
pub const EVENT_HEARTBEAT: &str = "HEARTBEAT";

/// An immutable message from the switch: an ordered header map and an optional body.
///
/// Header names are case-sensitive. When a header is repeated the last value wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Event {
    headers: IndexMap<String, String>,
    body: Option<String>,
}

impl Event {
    /// Creates a new [`Event`] instance.
    #[must_use]
    pub const fn new(headers: IndexMap<String, String>, body: Option<String>) -> Self {
        Self { headers, body }
    }

    /// Creates a new [`Event`] instance from `(name, value)` header pairs, without a body.
    #[must_use]
    pub fn from_headers<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            body: None,
        }
    }

    /// Returns a copy of this event with `body` attached.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Parses wire text consisting of a header block, a blank line, then the body.
    ///
    /// Text without a blank line is treated as headers only. An empty body is `None`.
    #[must_use]
    pub fn from_wire(text: &str) -> Self {
        let (head, body) = match text.split_once("\n\n") {
            Some((head, body)) => (head, body),
            None => (text, ""),
        };
        Self {
            headers: parse_headers(head),
            body: (!body.is_empty()).then(|| body.to_string()),
        }
    }

    /// Returns the value of the header `name`, if present.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Returns all headers in arrival order.
    #[must_use]
    pub const fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    /// Returns the body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Returns the classified `Content-Type` of this event.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        ContentType::from_header(self.header(HEADER_CONTENT_TYPE))
    }

    /// Returns the `Event-Name` header, if present.
    #[must_use]
    pub fn event_name(&self) -> Option<&str> {
        self.header(HEADER_EVENT_NAME)
    }

    /// Returns the `Reply-Text` header, if present.
    #[must_use]
    pub fn reply_text(&self) -> Option<&str> {
        self.header(HEADER_REPLY_TEXT)
    }

    /// Returns the raw `Job-UUID` header, if present.
    #[must_use]
    pub fn job_uuid_str(&self) -> Option<&str> {
        self.header(HEADER_JOB_UUID)
    }

    /// Returns the parsed `Job-UUID` header.
    ///
    /// A missing or malformed value yields `None`.
    #[must_use]
    pub fn job_uuid(&self) -> Option<UUID4> {
        self.job_uuid_str().and_then(|value| value.parse().ok())
    }

    /// Returns whether this is a reply accepting the preceding command.
    #[must_use]
    pub fn is_ok_reply(&self) -> bool {
        self.reply_text().is_some_and(|text| text.starts_with("+OK"))
    }

    /// Returns whether this is a reply rejecting the preceding command.
    #[must_use]
    pub fn is_err_reply(&self) -> bool {
        self.reply_text().is_some_and(|text| text.starts_with("-ERR"))
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(content_type={}, event_name={}, job_uuid={})",
            stringify!(Event),
            self.header(HEADER_CONTENT_TYPE).unwrap_or("None"),
            self.event_name().unwrap_or("None"),
            self.job_uuid_str().unwrap_or("None"),
        )
    }
}

/// Parses a block of `Name: value` lines into an ordered header map.
///
/// Parsing stops at the first blank line. Lines without a `:` separator are
/// skipped and a single space after the separator is trimmed.
#[must_use]
pub fn parse_headers(text: &str) -> IndexMap<String, String> {
    let mut headers = IndexMap::new();
    for line in text.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let value = value.strip_prefix(' ').unwrap_or(value);
            headers.insert(name.trim().to_string(), value.to_string());
        }
    }
    headers
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_parse_headers_preserves_order() {
        let headers = parse_headers("Content-Type: command/reply\nReply-Text: +OK accepted\n");
        let names: Vec<&str> = headers.keys().map(String::as_str).collect();

        assert_eq!(names, vec!["Content-Type", "Reply-Text"]);
        assert_eq!(headers["Reply-Text"], "+OK accepted");
    }

    #[rstest]
    fn test_parse_headers_stops_at_blank_line() {
        let headers = parse_headers("A: 1\n\nB: 2\n");
        assert_eq!(headers.len(), 1);
    }

    #[rstest]
    fn test_parse_headers_skips_malformed_and_keeps_colons_in_values() {
        let headers = parse_headers("garbage\nEvent-Date-Local: 2024-01-01 10:00:00\r\n");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["Event-Date-Local"], "2024-01-01 10:00:00");
    }

    #[rstest]
    fn test_from_wire_with_body() {
        let event = Event::from_wire("Content-Type: api/response\nContent-Length: 3\n\n+OK");

        assert_eq!(event.content_type(), ContentType::ApiResponse);
        assert_eq!(event.body(), Some("+OK"));
    }

    #[rstest]
    fn test_from_wire_without_body() {
        let event = Event::from_wire("Content-Type: auth/request\n\n");

        assert_eq!(event.content_type(), ContentType::AuthRequest);
        assert_eq!(event.body(), None);
    }

    #[rstest]
    fn test_accessors() {
        let event = Event::from_headers([
            ("Content-Type", "text/event-plain"),
            ("Event-Name", "BACKGROUND_JOB"),
            ("Job-UUID", "d3418bd1-cfa4-42a9-8a8e-a04a770c808d"),
        ]);

        assert_eq!(event.event_name(), Some(EVENT_BACKGROUND_JOB));
        assert_eq!(
            event.job_uuid().map(|id| id.to_string()).as_deref(),
            Some("d3418bd1-cfa4-42a9-8a8e-a04a770c808d")
        );
        assert!(event.content_type().is_event());
    }

    #[rstest]
    fn test_malformed_job_uuid_is_present_but_unparsed() {
        let event = Event::from_headers([("Job-UUID", "bogus")]);

        assert_eq!(event.job_uuid_str(), Some("bogus"));
        assert_eq!(event.job_uuid(), None);
    }

    #[rstest]
    #[case("+OK accepted", true, false)]
    #[case("-ERR invalid", false, true)]
    #[case("+OK event listener enabled plain", true, false)]
    #[case("-ERR no keywords supplied", false, true)]
    #[case("", false, false)]
    fn test_reply_classification(#[case] reply: &str, #[case] ok: bool, #[case] err: bool) {
        let event = Event::from_headers([("Content-Type", "command/reply"), ("Reply-Text", reply)]);

        assert_eq!(event.is_ok_reply(), ok);
        assert_eq!(event.is_err_reply(), err);
    }

    #[rstest]
    fn test_display() {
        let event = Event::from_headers([("Content-Type", "text/event-plain"), ("Event-Name", "HEARTBEAT")]);
        assert_eq!(
            event.to_string(),
            "Event(content_type=text/event-plain, event_name=HEARTBEAT, job_uuid=None)"
        );
    }
}
