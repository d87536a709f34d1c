// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::io;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use super::Notifier;
use crate::config::consts::{DEFAULT_NOTIFICATION_PORT, NOTIFICATION_CONNECT_TIMEOUT_MS};
use crate::observability::messages::scheduler::NotificationFailed;
use crate::observability::messages::StructuredLog;

/// Publishes each message on a fresh TCP connection as `P<message>\r\n`.
///
/// A connection that is not established within the connect timeout is dropped.
#[derive(Debug, Clone)]
pub struct TcpNotifier {
    host: String,
    port: u16,
    connect_timeout: Duration,
}

impl TcpNotifier {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Duration::from_millis(NOTIFICATION_CONNECT_TIMEOUT_MS),
        }
    }

    pub fn with_default_port(host: impl Into<String>) -> Self {
        Self::new(host, DEFAULT_NOTIFICATION_PORT)
    }

    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn frame(message: &str) -> String {
        format!("P{}\r\n", message)
    }

    async fn send(host: &str, port: u16, frame: &str, connect_timeout: Duration) -> io::Result<()> {
        let mut stream = tokio::time::timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??;
        stream.write_all(frame.as_bytes()).await?;
        stream.shutdown().await
    }
}

impl Notifier for TcpNotifier {
    fn publish(&self, message: &str) {
        let target = self.target();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            NotificationFailed {
                target: &target,
                error: &"no async runtime",
            }
            .log();
            return;
        };

        let host = self.host.clone();
        let port = self.port;
        let connect_timeout = self.connect_timeout;
        let frame = Self::frame(message);
        runtime.spawn(async move {
            if let Err(error) = Self::send(&host, port, &frame, connect_timeout).await {
                NotificationFailed {
                    target: &target,
                    error: &error,
                }
                .log();
            }
        });
    }
}
