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

//! Switch API verbs which can be executed as background jobs.
//!
//! Each variant renders to the verb line placed after `bgapi ` on the wire.
//! The checked constructors validate arguments so a rendered verb is always
//! a single well formed line.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use switchlet_core::correctness::{
    check_in_range_inclusive_f64, check_single_line, check_valid_string, check_valid_token,
};

use crate::{command::CommandError, enums::Leg};

/// The lowest accepted audio level adjustment.
pub const AUDIO_LEVEL_MIN: f64 = -4.0;
/// The highest accepted audio level adjustment.
pub const AUDIO_LEVEL_MAX: f64 = 4.0;

/// What an audio broadcast plays: a file path or an application invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadcastSource {
    /// A sound file path.
    Path(String),
    /// A dialplan application with its arguments.
    App {
        /// The application name.
        name: String,
        /// The raw argument string.
        args: String,
    },
}

/// Where an originated call is connected to once answered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OriginateTarget {
    /// A dialplan extension.
    Extension(String),
    /// An inline application with its arguments.
    App {
        /// The application name.
        name: String,
        /// The application arguments, joined with spaces when rendered.
        args: Vec<String>,
    },
}

/// A switch API verb.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Api {
    /// Report switch status.
    Status,
    /// Answer a channel.
    Answer { uuid: String },
    /// Hang up a channel with an optional cause.
    Kill { uuid: String, cause: Option<String> },
    /// Interrupt media playing on a channel.
    Break { uuid: String, all: bool },
    /// Bridge two channels.
    Bridge { uuid: String, other_uuid: String },
    /// Play audio to one or both legs of a channel.
    Broadcast {
        uuid: String,
        source: BroadcastSource,
        leg: Leg,
    },
    /// Send a chat message over a channel.
    Chat { uuid: String, text: String },
    /// Read the audio level of a channel.
    GetAudioLevel { uuid: String },
    /// Adjust the audio level of a channel.
    SetAudioLevel { uuid: String, level: f64 },
    /// List the media bugs attached to a channel.
    GetBugList { uuid: String },
    /// Pause media on a channel.
    Pause { uuid: String },
    /// Resume media on a channel.
    Unpause { uuid: String },
    /// Originate a new call.
    Originate {
        url: String,
        options: Vec<String>,
        target: OriginateTarget,
    },
    /// Check an address against a named access control list.
    AclCheck { ip: String, list: String },
}

fn invalid(err: anyhow::Error) -> CommandError {
    CommandError::InvalidArgument(err.to_string())
}

impl Api {
    /// Creates an `uuid_answer` verb.
    ///
    /// # Errors
    ///
    /// Returns an error if `uuid` is not a valid token.
    pub fn answer(uuid: &str) -> Result<Self, CommandError> {
        check_valid_token(uuid, "uuid").map_err(invalid)?;
        Ok(Self::Answer {
            uuid: uuid.to_string(),
        })
    }

    /// Creates an `uuid_kill` verb.
    ///
    /// # Errors
    ///
    /// Returns an error if `uuid` or `cause` is not a valid token.
    pub fn kill(uuid: &str, cause: Option<&str>) -> Result<Self, CommandError> {
        check_valid_token(uuid, "uuid").map_err(invalid)?;
        if let Some(cause) = cause {
            check_valid_token(cause, "cause").map_err(invalid)?;
        }
        Ok(Self::Kill {
            uuid: uuid.to_string(),
            cause: cause.map(str::to_string),
        })
    }

    /// Creates an `uuid_break` verb.
    ///
    /// # Errors
    ///
    /// Returns an error if `uuid` is not a valid token.
    pub fn break_media(uuid: &str, all: bool) -> Result<Self, CommandError> {
        check_valid_token(uuid, "uuid").map_err(invalid)?;
        Ok(Self::Break {
            uuid: uuid.to_string(),
            all,
        })
    }

    /// Creates an `uuid_bridge` verb.
    ///
    /// # Errors
    ///
    /// Returns an error if either channel id is not a valid token.
    pub fn bridge(uuid: &str, other_uuid: &str) -> Result<Self, CommandError> {
        check_valid_token(uuid, "uuid").map_err(invalid)?;
        check_valid_token(other_uuid, "other_uuid").map_err(invalid)?;
        Ok(Self::Bridge {
            uuid: uuid.to_string(),
            other_uuid: other_uuid.to_string(),
        })
    }

    /// Creates an `uuid_broadcast` verb playing a sound file path.
    ///
    /// # Errors
    ///
    /// Returns an error if `uuid` or `path` is not a valid token.
    pub fn broadcast_path(uuid: &str, path: &str, leg: Leg) -> Result<Self, CommandError> {
        check_valid_token(uuid, "uuid").map_err(invalid)?;
        check_valid_token(path, "path").map_err(invalid)?;
        Ok(Self::Broadcast {
            uuid: uuid.to_string(),
            source: BroadcastSource::Path(path.to_string()),
            leg,
        })
    }

    /// Creates an `uuid_broadcast` verb invoking an application.
    ///
    /// # Errors
    ///
    /// Returns an error if `uuid` or `name` is not a valid token, or `args` spans lines.
    pub fn broadcast_app(uuid: &str, name: &str, args: &str, leg: Leg) -> Result<Self, CommandError> {
        check_valid_token(uuid, "uuid").map_err(invalid)?;
        check_valid_token(name, "name").map_err(invalid)?;
        check_single_line(args, "args").map_err(invalid)?;
        Ok(Self::Broadcast {
            uuid: uuid.to_string(),
            source: BroadcastSource::App {
                name: name.to_string(),
                args: args.to_string(),
            },
            leg,
        })
    }

    /// Creates an `uuid_chat` verb.
    ///
    /// # Errors
    ///
    /// Returns an error if `uuid` is not a valid token, or `text` is empty or spans lines.
    pub fn chat(uuid: &str, text: &str) -> Result<Self, CommandError> {
        check_valid_token(uuid, "uuid").map_err(invalid)?;
        check_valid_string(text, "text").map_err(invalid)?;
        check_single_line(text, "text").map_err(invalid)?;
        Ok(Self::Chat {
            uuid: uuid.to_string(),
            text: text.to_string(),
        })
    }

    /// Creates an `uuid_audio` verb reading the level.
    ///
    /// # Errors
    ///
    /// Returns an error if `uuid` is not a valid token.
    pub fn get_audio_level(uuid: &str) -> Result<Self, CommandError> {
        check_valid_token(uuid, "uuid").map_err(invalid)?;
        Ok(Self::GetAudioLevel {
            uuid: uuid.to_string(),
        })
    }

    /// Creates an `uuid_audio` verb writing the level.
    ///
    /// # Errors
    ///
    /// Returns an error if `uuid` is not a valid token or `level` is outside
    /// [`AUDIO_LEVEL_MIN`, `AUDIO_LEVEL_MAX`].
    pub fn set_audio_level(uuid: &str, level: f64) -> Result<Self, CommandError> {
        check_valid_token(uuid, "uuid").map_err(invalid)?;
        check_in_range_inclusive_f64(level, AUDIO_LEVEL_MIN, AUDIO_LEVEL_MAX, "level")
            .map_err(invalid)?;
        Ok(Self::SetAudioLevel {
            uuid: uuid.to_string(),
            level,
        })
    }

    /// Creates an `uuid_buglist` verb.
    ///
    /// # Errors
    ///
    /// Returns an error if `uuid` is not a valid token.
    pub fn get_bug_list(uuid: &str) -> Result<Self, CommandError> {
        check_valid_token(uuid, "uuid").map_err(invalid)?;
        Ok(Self::GetBugList {
            uuid: uuid.to_string(),
        })
    }

    /// Creates a `pause ... on` verb.
    ///
    /// # Errors
    ///
    /// Returns an error if `uuid` is not a valid token.
    pub fn pause(uuid: &str) -> Result<Self, CommandError> {
        check_valid_token(uuid, "uuid").map_err(invalid)?;
        Ok(Self::Pause {
            uuid: uuid.to_string(),
        })
    }

    /// Creates a `pause ... off` verb.
    ///
    /// # Errors
    ///
    /// Returns an error if `uuid` is not a valid token.
    pub fn unpause(uuid: &str) -> Result<Self, CommandError> {
        check_valid_token(uuid, "uuid").map_err(invalid)?;
        Ok(Self::Unpause {
            uuid: uuid.to_string(),
        })
    }

    /// Creates an `originate` verb.
    ///
    /// `options` are channel variable assignments such as `origination_caller_id_number=1000`.
    ///
    /// # Errors
    ///
    /// Returns an error if `url` or any option is not a valid token, or the target is empty.
    pub fn originate(
        url: &str,
        options: Vec<String>,
        target: OriginateTarget,
    ) -> Result<Self, CommandError> {
        check_valid_token(url, "url").map_err(invalid)?;
        for option in &options {
            check_valid_token(option, "options").map_err(invalid)?;
        }
        match &target {
            OriginateTarget::Extension(extension) => {
                check_valid_token(extension, "extension").map_err(invalid)?;
            }
            OriginateTarget::App { name, args } => {
                check_valid_token(name, "name").map_err(invalid)?;
                for arg in args {
                    check_single_line(arg, "args").map_err(invalid)?;
                }
            }
        }
        Ok(Self::Originate {
            url: url.to_string(),
            options,
            target,
        })
    }

    /// Creates an `acl` check verb.
    ///
    /// # Errors
    ///
    /// Returns an error if `ip` or `list` is not a valid token.
    pub fn acl_check(ip: &str, list: &str) -> Result<Self, CommandError> {
        check_valid_token(ip, "ip").map_err(invalid)?;
        check_valid_token(list, "list").map_err(invalid)?;
        Ok(Self::AclCheck {
            ip: ip.to_string(),
            list: list.to_string(),
        })
    }
}

impl Display for Api {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status => write!(f, "status"),
            Self::Answer { uuid } => write!(f, "uuid_answer {uuid}"),
            Self::Kill { uuid, cause: None } => write!(f, "uuid_kill {uuid}"),
            Self::Kill {
                uuid,
                cause: Some(cause),
            } => write!(f, "uuid_kill {uuid} {cause}"),
            Self::Break { uuid, all: false } => write!(f, "uuid_break {uuid}"),
            Self::Break { uuid, all: true } => write!(f, "uuid_break {uuid} all"),
            Self::Bridge { uuid, other_uuid } => write!(f, "uuid_bridge {uuid} {other_uuid}"),
            Self::Broadcast { uuid, source, leg } => match source {
                BroadcastSource::Path(path) => write!(f, "uuid_broadcast {uuid} {path} {leg}"),
                BroadcastSource::App { name, args } => {
                    write!(f, "uuid_broadcast {uuid} {name}::{args} {leg}")
                }
            },
            Self::Chat { uuid, text } => write!(f, "uuid_chat {uuid} {text}"),
            Self::GetAudioLevel { uuid } => write!(f, "uuid_audio {uuid} start read level"),
            Self::SetAudioLevel { uuid, level } => {
                write!(f, "uuid_audio {uuid} start write level {level:.6}")
            }
            Self::GetBugList { uuid } => write!(f, "uuid_buglist {uuid}"),
            Self::Pause { uuid } => write!(f, "pause {uuid} on"),
            Self::Unpause { uuid } => write!(f, "pause {uuid} off"),
            Self::Originate {
                url,
                options,
                target,
            } => {
                write!(f, "originate ")?;
                if !options.is_empty() {
                    write!(f, "{{{}}}", options.join(","))?;
                }
                match target {
                    OriginateTarget::Extension(extension) => write!(f, "{url} {extension}"),
                    OriginateTarget::App { name, args } => {
                        write!(f, "{url} &{name}({})", args.join(" "))
                    }
                }
            }
            Self::AclCheck { ip, list } => write!(f, "acl {ip} {list}"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const CHANNEL: &str = "f4ba3a2a-5f2b-4a6c-9c3e-4b1b1b1b1b1b";

    #[rstest]
    #[case(Api::Status, "status")]
    #[case(Api::answer(CHANNEL).unwrap(), format!("uuid_answer {CHANNEL}"))]
    #[case(Api::kill(CHANNEL, None).unwrap(), format!("uuid_kill {CHANNEL}"))]
    #[case(Api::kill(CHANNEL, Some("USER_BUSY")).unwrap(), format!("uuid_kill {CHANNEL} USER_BUSY"))]
    #[case(Api::break_media(CHANNEL, false).unwrap(), format!("uuid_break {CHANNEL}"))]
    #[case(Api::break_media(CHANNEL, true).unwrap(), format!("uuid_break {CHANNEL} all"))]
    #[case(Api::bridge(CHANNEL, "other").unwrap(), format!("uuid_bridge {CHANNEL} other"))]
    #[case(Api::chat(CHANNEL, "hello there").unwrap(), format!("uuid_chat {CHANNEL} hello there"))]
    #[case(Api::get_audio_level(CHANNEL).unwrap(), format!("uuid_audio {CHANNEL} start read level"))]
    #[case(Api::set_audio_level(CHANNEL, -1.5).unwrap(), format!("uuid_audio {CHANNEL} start write level -1.500000"))]
    #[case(Api::get_bug_list(CHANNEL).unwrap(), format!("uuid_buglist {CHANNEL}"))]
    #[case(Api::pause(CHANNEL).unwrap(), format!("pause {CHANNEL} on"))]
    #[case(Api::unpause(CHANNEL).unwrap(), format!("pause {CHANNEL} off"))]
    #[case(Api::acl_check("192.168.1.1", "lan").unwrap(), "acl 192.168.1.1 lan")]
    fn test_render(#[case] api: Api, #[case] expected: String) {
        assert_eq!(api.to_string(), expected);
    }

    #[rstest]
    fn test_render_broadcast() {
        let path = Api::broadcast_path(CHANNEL, "/tmp/hello.wav", Leg::Both).unwrap();
        let app = Api::broadcast_app(CHANNEL, "playback", "/tmp/hello.wav", Leg::Aleg).unwrap();

        assert_eq!(
            path.to_string(),
            format!("uuid_broadcast {CHANNEL} /tmp/hello.wav both")
        );
        assert_eq!(
            app.to_string(),
            format!("uuid_broadcast {CHANNEL} playback::/tmp/hello.wav aleg")
        );
    }

    #[rstest]
    fn test_render_originate_extension_with_options() {
        let api = Api::originate(
            "user/1000",
            vec![
                "origination_caller_id_number=9999".to_string(),
                "ignore_early_media=true".to_string(),
            ],
            OriginateTarget::Extension("5000".to_string()),
        )
        .unwrap();

        assert_eq!(
            api.to_string(),
            "originate {origination_caller_id_number=9999,ignore_early_media=true}user/1000 5000"
        );
    }

    #[rstest]
    fn test_render_originate_app() {
        let api = Api::originate(
            "sofia/gateway/gw/1000",
            vec![],
            OriginateTarget::App {
                name: "playback".to_string(),
                args: vec!["/tmp/a.wav".to_string()],
            },
        )
        .unwrap();

        assert_eq!(
            api.to_string(),
            "originate sofia/gateway/gw/1000 &playback(/tmp/a.wav)"
        );
    }

    #[rstest]
    #[case(4.01)]
    #[case(-4.5)]
    #[case(f64::NAN)]
    fn test_set_audio_level_out_of_range(#[case] level: f64) {
        assert!(matches!(
            Api::set_audio_level(CHANNEL, level),
            Err(CommandError::InvalidArgument(_))
        ));
    }

    #[rstest]
    #[case("")]
    #[case("two words")]
    #[case("line\nbreak")]
    fn test_invalid_channel_uuid(#[case] uuid: &str) {
        assert!(Api::answer(uuid).is_err());
        assert!(Api::pause(uuid).is_err());
    }

    #[rstest]
    fn test_chat_rejects_line_breaks() {
        assert!(Api::chat(CHANNEL, "hello\n\nbgapi status").is_err());
    }
}
