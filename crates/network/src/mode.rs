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

use std::sync::atomic::{AtomicU8, Ordering};

use strum::{AsRefStr, Display, EnumString};

/// Lifecycle of an event-socket connection, shared between the client handle
/// and its IO tasks through an [`AtomicU8`].
#[derive(Clone, Copy, Debug, Default, Display, Hash, PartialEq, Eq, AsRefStr, EnumString)]
#[repr(u8)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ConnectionMode {
    /// Connected, with the read and write tasks running.
    #[default]
    Active = 0,
    /// A close was requested and the write task is shutting the socket down.
    Disconnect = 1,
    /// The socket is gone and no more events will be delivered.
    Closed = 2,
}

impl ConnectionMode {
    /// Converts a stored `u8` back to a [`ConnectionMode`].
    ///
    /// Unknown values are treated as [`ConnectionMode::Closed`].
    #[inline]
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Active,
            1 => Self::Disconnect,
            _ => Self::Closed,
        }
    }

    #[inline]
    #[must_use]
    pub fn from_atomic(value: &AtomicU8) -> Self {
        Self::from_u8(value.load(Ordering::SeqCst))
    }

    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    #[inline]
    #[must_use]
    pub const fn is_disconnect(&self) -> bool {
        matches!(self, Self::Disconnect)
    }

    #[inline]
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(ConnectionMode::Active, "ACTIVE")]
    #[case(ConnectionMode::Disconnect, "DISCONNECT")]
    #[case(ConnectionMode::Closed, "CLOSED")]
    fn test_atomic_and_string_forms(#[case] mode: ConnectionMode, #[case] text: &str) {
        let atomic = AtomicU8::new(mode.as_u8());
        assert_eq!(ConnectionMode::from_atomic(&atomic), mode);
        assert_eq!(mode.to_string(), text);
        assert_eq!(ConnectionMode::from_str(text).unwrap(), mode);
    }

    #[rstest]
    fn test_unknown_value_is_closed() {
        assert!(ConnectionMode::from_u8(200).is_closed());
    }
}
