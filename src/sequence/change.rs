// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use tokio::sync::broadcast;

use crate::config::consts::CHANGE_FEED_CAPACITY;

/// Notification sent to editors after a sequence mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceChange {
    GroupAdded { group: String },
    GroupRemoved { group: String },
    VariableAdded { name: String },
    VariableRemoved { name: String },
    VariableChanged { name: String },
    /// Published after every re-evaluation.
    VariablesEvaluated { valid: usize, errors: usize, unresolved: usize },
    RoutineChanged { name: String },
    RoutineRemoved { name: String },
    PlaylistChanged { name: String },
    PlaylistRemoved { name: String },
    ActivePlaylistChanged { name: Option<String> },
    Cleared,
}

/// Broadcast feed of [`SequenceChange`]s shared by the parts of a sequence.
///
/// Publishing with no subscribers is not an error; slow subscribers see
/// `RecvError::Lagged` rather than blocking editors.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<SequenceChange>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, change: SequenceChange) {
        let _ = self.sender.send(change);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SequenceChange> {
        self.sender.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
