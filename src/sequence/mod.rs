// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The editable sequence: variables, routines, playlists and the channels they target.
//!
//! The three parts share one [`ChangeFeed`], so an editor subscribes once via
//! [`Sequence::subscribe`] and sees every mutation.

mod change;
mod channel;
mod playlist;
mod routine;

pub use change::{ChangeFeed, SequenceChange};
pub use channel::{Card, CardKind, Channel, ChannelId, ChannelRegistry};
pub use playlist::{NodeKind, NodePath, Playlist, PlaylistNode, PlaylistSet};
pub use routine::{Event, Routine, RoutineLibrary, Track, Waveform};

use tokio::sync::broadcast;

use crate::variables::VariableStore;

/// Variables, routines and playlists of one experiment.
#[derive(Debug)]
pub struct Sequence {
    pub variables: VariableStore,
    pub routines: RoutineLibrary,
    pub playlists: PlaylistSet,
    feed: ChangeFeed,
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequence {
    pub fn new() -> Self {
        let feed = ChangeFeed::new();
        Self {
            variables: VariableStore::with_feed(feed.clone()),
            routines: RoutineLibrary::with_feed(feed.clone()),
            playlists: PlaylistSet::with_feed(feed.clone()),
            feed,
        }
    }

    /// An empty sequence whose routines are checked against `registry`.
    pub fn with_registry(registry: ChannelRegistry) -> Self {
        let mut sequence = Self::new();
        sequence.routines.set_registry(registry);
        sequence
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SequenceChange> {
        self.feed.subscribe()
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Drop every variable, routine and playlist. The channel registry is kept.
    pub fn clear(&mut self) {
        self.variables.clear();
        self.routines.clear();
        self.playlists.clear();
        self.feed.publish(SequenceChange::Cleared);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::VariableSpec;

    #[tokio::test]
    async fn test_one_feed_for_all_parts() {
        let mut sequence = Sequence::new();
        let mut rx = sequence.subscribe();

        sequence.variables.add_group("g").unwrap();
        sequence.routines.add_routine("r", []).unwrap();
        sequence.playlists.add_playlist("p").unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            SequenceChange::GroupAdded { group: "g".into() }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            SequenceChange::RoutineChanged { name: "r".into() }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            SequenceChange::PlaylistChanged { name: "p".into() }
        );
    }

    #[test]
    fn test_clear_empties_everything() {
        let mut sequence = Sequence::new();
        sequence.variables.add_group("g").unwrap();
        sequence
            .variables
            .add_variable("g", VariableSpec::formula("a", "1"))
            .unwrap();
        sequence.routines.add_routine("r", []).unwrap();
        sequence.playlists.add_playlist("p").unwrap();

        sequence.clear();

        assert!(sequence.variables.is_empty());
        assert!(sequence.routines.is_empty());
        assert!(sequence.playlists.active().is_none());
    }
}
