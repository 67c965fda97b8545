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

//! A `UUID4` universally unique identifier (UUID) version 4 based on a 128-bit label.
//!
//! Background jobs are correlated on the wire by the textual form of this value
//! in the `Job-UUID` header, so [`Display`](std::fmt::Display) always yields the
//! canonical lowercase hyphenated form.

use std::{
    fmt::{Debug, Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error returned when a string is not a valid version 4 UUID.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum ParseUuidError {
    /// The string is not a well formed UUID.
    #[error("Invalid UUID string '{0}'")]
    Malformed(String),
    /// The string is a UUID of another version.
    #[error("UUID '{value}' is version {version}, expected version 4")]
    WrongVersion {
        /// The offending string.
        value: String,
        /// The version which was parsed.
        version: usize,
    },
}

/// Represents a Universally Unique Identifier (UUID) version 4.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct UUID4 {
    value: ::uuid::Uuid,
}

impl UUID4 {
    /// Creates a new randomly generated [`UUID4`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: ::uuid::Uuid::new_v4(),
        }
    }

    /// Returns the underlying [`uuid::Uuid`](::uuid::Uuid).
    #[must_use]
    pub const fn as_uuid(&self) -> ::uuid::Uuid {
        self.value
    }
}

impl Default for UUID4 {
    /// Creates a new default [`UUID4`] instance.
    ///
    /// The default is a freshly generated random value.
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for UUID4 {
    type Err = ParseUuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = ::uuid::Uuid::try_parse(s.trim())
            .map_err(|_| ParseUuidError::Malformed(s.to_string()))?;
        let version = value.get_version_num();
        if version != 4 {
            return Err(ParseUuidError::WrongVersion {
                value: s.to_string(),
                version,
            });
        }
        Ok(Self { value })
    }
}

impl Display for UUID4 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.value.hyphenated(), f)
    }
}

impl Debug for UUID4 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}('{}')", stringify!(UUID4), self)
    }
}

impl Serialize for UUID4 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UUID4 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}
