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

//! Enumerations for the switchlet domain model.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// The wire format in which the switch delivers subscribed events.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Hash,
    PartialEq,
    Eq,
    AsRefStr,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventFormat {
    /// Header lines with URL-encoded values.
    #[default]
    Plain,
    /// A JSON object body.
    Json,
    /// An XML document body.
    Xml,
}

/// The `Content-Type` classification of an inbound message.
///
/// Only authentication requests, command replies, disconnect notices and the
/// event variants drive dispatcher behavior; anything else is logged and dropped.
#[derive(Clone, Copy, Debug, Display, Hash, PartialEq, Eq, AsRefStr, EnumIter, EnumString)]
pub enum ContentType {
    /// The switch is requesting authentication.
    #[strum(serialize = "auth/request")]
    AuthRequest,
    /// A reply to a command (authentication, subscription or `bgapi`).
    #[strum(serialize = "command/reply")]
    CommandReply,
    /// A reply to a blocking `api` command.
    #[strum(serialize = "api/response")]
    ApiResponse,
    /// An event in the plain format.
    #[strum(serialize = "text/event-plain")]
    EventPlain,
    /// An event in the JSON format.
    #[strum(serialize = "text/event-json")]
    EventJson,
    /// An event in the XML format.
    #[strum(serialize = "text/event-xml")]
    EventXml,
    /// The switch is about to close the connection.
    #[strum(serialize = "text/disconnect-notice")]
    DisconnectNotice,
    /// The switch refused the connection outright.
    #[strum(serialize = "text/rude-rejection")]
    RudeRejection,
    /// Missing or unrecognized content type.
    #[strum(serialize = "unknown")]
    Unknown,
}

impl ContentType {
    /// Classifies the raw `Content-Type` header `value`.
    #[must_use]
    pub fn from_header(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(Self::Unknown)
    }

    /// Returns whether this content type carries a switch event.
    #[must_use]
    pub const fn is_event(&self) -> bool {
        matches!(self, Self::EventPlain | Self::EventJson | Self::EventXml)
    }
}

/// The call leg(s) an audio broadcast is played to.
#[derive(
    Clone, Copy, Debug, Default, Display, Hash, PartialEq, Eq, AsRefStr, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Leg {
    /// The A (originating) leg.
    #[default]
    Aleg,
    /// The B (terminating) leg.
    Bleg,
    /// Both legs.
    Both,
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;

    #[rstest]
    #[case(Some("auth/request"), ContentType::AuthRequest)]
    #[case(Some("command/reply"), ContentType::CommandReply)]
    #[case(Some("text/event-plain"), ContentType::EventPlain)]
    #[case(Some(" text/event-json "), ContentType::EventJson)]
    #[case(Some("text/disconnect-notice"), ContentType::DisconnectNotice)]
    #[case(Some("application/octet-stream"), ContentType::Unknown)]
    #[case(None, ContentType::Unknown)]
    fn test_content_type_from_header(#[case] value: Option<&str>, #[case] expected: ContentType) {
        assert_eq!(ContentType::from_header(value), expected);
    }

    #[rstest]
    fn test_content_type_display_round_trips() {
        for content_type in ContentType::iter() {
            let text = content_type.to_string();
            assert_eq!(ContentType::from_str(&text).unwrap(), content_type);
        }
    }

    #[rstest]
    fn test_is_event() {
        let events: Vec<ContentType> = ContentType::iter().filter(ContentType::is_event).collect();
        assert_eq!(
            events,
            vec![
                ContentType::EventPlain,
                ContentType::EventJson,
                ContentType::EventXml
            ]
        );
    }

    #[rstest]
    #[case("plain", EventFormat::Plain)]
    #[case("JSON", EventFormat::Json)]
    #[case("xml", EventFormat::Xml)]
    fn test_event_format_parse(#[case] text: &str, #[case] expected: EventFormat) {
        assert_eq!(EventFormat::from_str(text).unwrap(), expected);
    }

    #[rstest]
    fn test_event_format_rejects_unknown() {
        assert!(EventFormat::from_str("yaml").is_err());
    }

    #[rstest]
    fn test_leg_display() {
        assert_eq!(Leg::Aleg.to_string(), "aleg");
        assert_eq!(Leg::Both.as_ref(), "both");
    }
}
