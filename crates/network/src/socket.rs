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

//! A TCP client for the switch's inbound event socket.
//!
//! The stream is split into read and write ends:
//! - The read end is owned by a task that feeds an [`EventDecoder`] and passes
//!   every decoded event to the [`TransportObserver`].
//! - The write end is owned by a task which receives [`WriterCommand`]s over a
//!   channel, so any number of [`SocketCommandSender`]s can queue commands.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use switchlet_common::logging::{RECV, SEND, log_task_started, log_task_stopped};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::mpsc::{UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

use crate::{
    backoff::ExponentialBackoff,
    codec::EventDecoder,
    mode::ConnectionMode,
    transport::{CommandSink, TransportObserver},
};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration for an [`EventSocketClient`] connection.
#[derive(Clone, Debug, PartialEq)]
pub struct EventSocketConfig {
    /// The `host:port` of the switch's event socket.
    pub address: String,
    /// The number of connection attempts before giving up (at least one is made).
    pub connect_attempts: u32,
    /// The delay before the second attempt (milliseconds).
    pub connect_delay_initial_ms: u64,
    /// The maximum delay between attempts (milliseconds).
    pub connect_delay_max_ms: u64,
    /// The factor applied to the delay after each failed attempt.
    pub connect_backoff_factor: f64,
    /// The maximum random jitter added to each delay (milliseconds).
    pub connect_jitter_ms: u64,
}

impl Default for EventSocketConfig {
    /// Creates a new default [`EventSocketConfig`] instance.
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8021".to_string(),
            connect_attempts: 10,
            connect_delay_initial_ms: 500,
            connect_delay_max_ms: 10_000,
            connect_backoff_factor: 2.0,
            connect_jitter_ms: 250,
        }
    }
}

/// A command for the writer task.
#[derive(Debug)]
pub enum WriterCommand {
    /// Write bytes to the switch.
    Send(Bytes),
    /// Shut down the write half of the socket.
    Close,
}

/// A cloneable [`CommandSink`] queueing writes on the client's write task.
#[derive(Clone, Debug)]
pub struct SocketCommandSender {
    writer_tx: UnboundedSender<WriterCommand>,
}

impl CommandSink for SocketCommandSender {
    fn send(&self, text: String) -> anyhow::Result<()> {
        self.writer_tx
            .send(WriterCommand::Send(Bytes::from(text)))
            .map_err(|_| anyhow::anyhow!("Event socket writer is closed"))
    }
}

/// A connected event-socket client.
///
/// Dropping the client aborts its IO tasks.
#[derive(Debug)]
pub struct EventSocketClient {
    address: String,
    connection_mode: Arc<AtomicU8>,
    writer_tx: UnboundedSender<WriterCommand>,
    read_task: Option<JoinHandle<()>>,
    write_task: Option<JoinHandle<()>>,
}

impl EventSocketClient {
    /// Connects to the switch and starts the IO tasks.
    ///
    /// `observer` receives `on_connected` before the read task is started, so
    /// the sink is always available ahead of the first event.
    ///
    /// # Errors
    ///
    /// Returns an error if the backoff settings are invalid or every connection
    /// attempt fails.
    pub async fn connect(
        config: &EventSocketConfig,
        observer: Arc<dyn TransportObserver>,
    ) -> anyhow::Result<Self> {
        let stream = Self::connect_with_backoff(config).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();

        let connection_mode = Arc::new(AtomicU8::new(ConnectionMode::Active.as_u8()));
        let (writer_tx, writer_rx) = tokio::sync::mpsc::unbounded_channel::<WriterCommand>();

        observer.on_connected(Box::new(SocketCommandSender {
            writer_tx: writer_tx.clone(),
        }));

        let write_task = Self::spawn_write_task(writer, writer_rx, connection_mode.clone());
        let read_task = Self::spawn_read_task(reader, observer, connection_mode.clone());

        Ok(Self {
            address: config.address.clone(),
            connection_mode,
            writer_tx,
            read_task: Some(read_task),
            write_task: Some(write_task),
        })
    }

    async fn connect_with_backoff(config: &EventSocketConfig) -> anyhow::Result<TcpStream> {
        let mut backoff = ExponentialBackoff::new(
            Duration::from_millis(config.connect_delay_initial_ms),
            Duration::from_millis(config.connect_delay_max_ms),
            config.connect_backoff_factor,
            config.connect_jitter_ms,
        )?;
        let attempts = config.connect_attempts.max(1);
        let address = &config.address;

        loop {
            let attempt = backoff.attempts() + 1;
            tracing::debug!("Connecting to {address} (attempt {attempt}/{attempts})");

            match TcpStream::connect(address).await {
                Ok(stream) => {
                    tracing::info!("Connected to {address}");
                    return Ok(stream);
                }
                Err(e) if attempt < attempts => {
                    let delay = backoff.next_duration();
                    tracing::warn!("Connection to {address} failed: {e}, retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    anyhow::bail!("Failed to connect to {address} after {attempts} attempt(s): {e}")
                }
            }
        }
    }

    fn spawn_read_task(
        mut reader: OwnedReadHalf,
        observer: Arc<dyn TransportObserver>,
        connection_mode: Arc<AtomicU8>,
    ) -> JoinHandle<()> {
        tokio::task::spawn(async move {
            log_task_started("read");
            let mut decoder = EventDecoder::new();

            'read: loop {
                match reader.read_buf(decoder.buffer_mut()).await {
                    Ok(0) => {
                        tracing::debug!("Connection closed by switch");
                        break;
                    }
                    Ok(bytes) => {
                        tracing::trace!("{RECV} {bytes} bytes");
                        loop {
                            match decoder.decode() {
                                Ok(Some(event)) => {
                                    tracing::trace!("{RECV} {event}");
                                    observer.on_event(event);
                                }
                                Ok(None) => break,
                                Err(e) => {
                                    tracing::error!("Failed to decode event: {e}");
                                    break 'read;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        tracing::debug!("Connection ended: {e}");
                        break;
                    }
                }
            }

            connection_mode.store(ConnectionMode::Closed.as_u8(), Ordering::SeqCst);
            observer.on_disconnected();
            log_task_stopped("read");
        })
    }

    fn spawn_write_task(
        mut writer: OwnedWriteHalf,
        mut writer_rx: UnboundedReceiver<WriterCommand>,
        connection_mode: Arc<AtomicU8>,
    ) -> JoinHandle<()> {
        tokio::task::spawn(async move {
            log_task_started("write");

            while let Some(command) = writer_rx.recv().await {
                match command {
                    WriterCommand::Send(bytes) => {
                        tracing::trace!("{SEND} {}", String::from_utf8_lossy(&bytes).trim_end());
                        if let Err(e) = writer.write_all(&bytes).await {
                            tracing::error!("Failed to send command: {e}");
                            break;
                        }
                    }
                    WriterCommand::Close => {
                        connection_mode.store(ConnectionMode::Disconnect.as_u8(), Ordering::SeqCst);
                        if let Err(e) = writer.shutdown().await {
                            tracing::debug!("Failed to shut down writer: {e}");
                        }
                        break;
                    }
                }
            }

            log_task_stopped("write");
        })
    }

    /// Returns the `host:port` this client is connected to.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns a new sender for queueing commands.
    #[must_use]
    pub fn sender(&self) -> SocketCommandSender {
        SocketCommandSender {
            writer_tx: self.writer_tx.clone(),
        }
    }

    /// Returns the current connection mode.
    #[must_use]
    pub fn connection_mode(&self) -> ConnectionMode {
        ConnectionMode::from_atomic(&self.connection_mode)
    }

    /// Returns whether the connection is up.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.connection_mode().is_active()
    }

    /// Returns whether the connection is gone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.connection_mode().is_closed()
    }

    /// Shuts the connection down and waits for the read task to finish.
    ///
    /// The observer receives `on_disconnected` unless the switch fails to close
    /// its end within a short timeout, in which case the read task is aborted.
    pub async fn close(&mut self) {
        if self.writer_tx.send(WriterCommand::Close).is_err() {
            tracing::debug!("Writer already closed");
        }

        if let Some(mut read_task) = self.read_task.take() {
            if tokio::time::timeout(CLOSE_TIMEOUT, &mut read_task)
                .await
                .is_err()
            {
                tracing::warn!("Timeout waiting for switch to close {}", self.address);
                read_task.abort();
                tracing::debug!("Aborted task 'read'");
            }
        }
        if let Some(write_task) = self.write_task.take() {
            write_task.abort();
        }

        self.connection_mode
            .store(ConnectionMode::Closed.as_u8(), Ordering::SeqCst);
    }
}

impl Drop for EventSocketClient {
    fn drop(&mut self) {
        if let Some(task) = self.read_task.take() {
            task.abort();
            tracing::debug!("Aborted task 'read'");
        }
        if let Some(task) = self.write_task.take() {
            task.abort();
            tracing::debug!("Aborted task 'write'");
        }
    }
}
