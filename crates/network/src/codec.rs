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

//! Incremental decoding of inbound event-socket frames.
//!
//! A frame is a block of `Name: value` lines terminated by a blank line,
//! optionally followed by a body of exactly `Content-Length` bytes. Events sent
//! in the plain format carry a second header block inside that body, with
//! URL-encoded values, and events sent in the JSON format carry a flat object
//! whose `_body` member is the event body. [`EventDecoder`] expands both so
//! callers always see the event headers (`Event-Name`, `Job-UUID` ...) at the
//! top level.

use std::borrow::Cow;

use bytes::{Buf, BytesMut};
use indexmap::IndexMap;
use memchr::memmem;
use switchlet_model::{
    enums::ContentType,
    event::{Event, HEADER_CONTENT_LENGTH, HEADER_CONTENT_TYPE, parse_headers},
};

/// The largest header block buffered while waiting for its terminating blank line.
pub const MAX_HEADER_BYTES: usize = 64 * 1024;

/// The largest body accepted from a `Content-Length` header.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

const HEADER_TERMINATOR: &[u8] = b"\n\n";

const JSON_BODY_MEMBER: &str = "_body";

/// An unrecoverable framing error; the stream cannot be resynchronized.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Invalid Content-Length header '{0}'")]
    InvalidContentLength(String),
    #[error("Content-Length {length} exceeds the limit of {limit} bytes")]
    BodyTooLarge { length: usize, limit: usize },
    #[error("Header block exceeds the limit of {limit} bytes without a terminator")]
    HeaderTooLarge { limit: usize },
    #[error("Frame is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

#[derive(Debug)]
struct PendingBody {
    headers: IndexMap<String, String>,
    length: usize,
}

/// Buffers raw socket bytes and yields complete [`Event`]s.
#[derive(Debug, Default)]
pub struct EventDecoder {
    buf: BytesMut,
    pending: Option<PendingBody>,
}

impl EventDecoder {
    /// Creates a new [`EventDecoder`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the receive buffer, for reading directly from a socket.
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Appends raw bytes to the receive buffer.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Returns the number of buffered bytes not yet decoded.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Decodes the next complete event, or returns `None` if more bytes are needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is malformed. The decoder must then be discarded.
    pub fn decode(&mut self) -> Result<Option<Event>, DecodeError> {
        if self.pending.is_none() {
            let Some(headers) = self.decode_headers()? else {
                return Ok(None);
            };

            let length = content_length(&headers)?;
            if length == 0 {
                return Ok(Some(Event::new(headers, None)));
            }
            self.pending = Some(PendingBody { headers, length });
        }

        let ready = self
            .pending
            .as_ref()
            .is_some_and(|pending| self.buf.len() >= pending.length);
        if !ready {
            return Ok(None);
        }

        let Some(PendingBody { headers, length }) = self.pending.take() else {
            return Ok(None);
        };
        let raw = self.buf.split_to(length);
        let body = std::str::from_utf8(&raw)?;

        match ContentType::from_header(headers.get(HEADER_CONTENT_TYPE).map(String::as_str)) {
            ContentType::EventPlain => expand_plain_event(headers, body).map(Some),
            ContentType::EventJson => Ok(Some(expand_json_event(headers, body))),
            _ => Ok(Some(Event::new(headers, Some(body.to_string())))),
        }
    }

    fn decode_headers(&mut self) -> Result<Option<IndexMap<String, String>>, DecodeError> {
        // Frames may be separated by stray newlines
        let leading = self
            .buf
            .iter()
            .take_while(|b| matches!(b, b'\n' | b'\r'))
            .count();
        self.buf.advance(leading);

        let Some(pos) = memmem::find(&self.buf, HEADER_TERMINATOR) else {
            if self.buf.len() > MAX_HEADER_BYTES {
                return Err(DecodeError::HeaderTooLarge {
                    limit: MAX_HEADER_BYTES,
                });
            }
            return Ok(None);
        };

        let block = self.buf.split_to(pos + HEADER_TERMINATOR.len());
        let text = std::str::from_utf8(&block)?;
        Ok(Some(parse_headers(text)))
    }
}

fn content_length(headers: &IndexMap<String, String>) -> Result<usize, DecodeError> {
    let Some(value) = headers.get(HEADER_CONTENT_LENGTH) else {
        return Ok(0);
    };
    let length: usize = value
        .trim()
        .parse()
        .map_err(|_| DecodeError::InvalidContentLength(value.clone()))?;
    if length > MAX_BODY_BYTES {
        return Err(DecodeError::BodyTooLarge {
            length,
            limit: MAX_BODY_BYTES,
        });
    }
    Ok(length)
}

/// Merges the URL-encoded header block of a plain event body into the outer headers.
///
/// The outer `Content-Type` and `Content-Length` are kept. Any inner body is
/// limited to the inner `Content-Length`.
fn expand_plain_event(
    mut headers: IndexMap<String, String>,
    body: &str,
) -> Result<Event, DecodeError> {
    let (head, rest) = body.split_once("\n\n").unwrap_or((body, ""));
    let inner = parse_headers(head);
    let inner_length = content_length(&inner)?;

    for (name, value) in inner {
        if name == HEADER_CONTENT_TYPE || name == HEADER_CONTENT_LENGTH {
            continue;
        }
        let value = match urlencoding::decode(&value) {
            Ok(Cow::Owned(decoded)) => decoded,
            Ok(Cow::Borrowed(_)) | Err(_) => value,
        };
        headers.insert(name, value);
    }

    let inner_body = if inner_length == 0 {
        rest
    } else {
        rest.get(..inner_length).unwrap_or(rest)
    };

    Ok(Event::new(
        headers,
        (!inner_body.is_empty()).then(|| inner_body.to_string()),
    ))
}

/// Merges the members of a JSON event object into the outer headers.
///
/// The `_body` member becomes the event body. Non-string values keep their JSON text.
/// A body which is not a JSON object is kept verbatim; the frame itself was
/// complete, so the stream stays in sync.
fn expand_json_event(mut headers: IndexMap<String, String>, body: &str) -> Event {
    let object: serde_json::Map<String, serde_json::Value> = match serde_json::from_str(body) {
        Ok(object) => object,
        Err(e) => {
            tracing::warn!("Invalid JSON event body: {e}");
            return Event::new(headers, Some(body.to_string()));
        }
    };
    let mut inner_body = None;

    for (name, value) in object {
        let value = match value {
            serde_json::Value::String(text) => text,
            other => other.to_string(),
        };
        if name == JSON_BODY_MEMBER {
            inner_body = Some(value);
        } else if name != HEADER_CONTENT_TYPE && name != HEADER_CONTENT_LENGTH {
            headers.insert(name, value);
        }
    }

    Event::new(headers, inner_body.filter(|b| !b.is_empty()))
}
