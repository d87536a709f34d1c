// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Fire-and-forget status notifications.

mod tcp;

pub use tcp::TcpNotifier;

/// Publishes short status messages to whoever is listening.
pub trait Notifier: Send + Sync {
    /// Send `message` without waiting for delivery.
    fn publish(&self, message: &str);
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn publish(&self, message: &str) {
        tracing::info!(notification = message, "{}", message);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Notifier;
    use std::sync::{Arc, Mutex};

    /// Collects published messages for assertions.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingNotifier {
        messages: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingNotifier {
        pub fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn publish(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }
}
