// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Playlists: named trees of routine invocations and gaps.
//!
//! Nodes are addressed by [`NodePath`], the child indices from the root. The root
//! itself is implicit and has the empty path.

use indexmap::IndexMap;
use std::fmt;

use super::change::{ChangeFeed, SequenceChange};
use crate::errors::ConfigurationError;
use crate::expression::Formula;

/// What a playlist node plays.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Invoke a routine `repeat` times back to back.
    Routine { name: String, repeat: u32 },
    /// Advance time without emitting events.
    Gap { duration: Formula },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistNode {
    pub kind: NodeKind,
    pub children: Vec<PlaylistNode>,
}

impl PlaylistNode {
    pub fn routine(name: impl Into<String>, repeat: u32) -> Self {
        Self {
            kind: NodeKind::Routine {
                name: name.into(),
                repeat,
            },
            children: Vec::new(),
        }
    }

    pub fn gap(duration: impl Into<Formula>) -> Self {
        Self {
            kind: NodeKind::Gap {
                duration: duration.into(),
            },
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: PlaylistNode) -> Self {
        self.children.push(child);
        self
    }

    /// Human-readable label used in logs and interval reports.
    pub fn label(&self) -> String {
        match &self.kind {
            NodeKind::Routine { name, repeat } if *repeat > 1 => format!("{} x{}", name, repeat),
            NodeKind::Routine { name, .. } => name.clone(),
            NodeKind::Gap { duration } => format!("gap({})", duration),
        }
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if let NodeKind::Routine { repeat, .. } = self.kind {
            if repeat == 0 {
                return Err(ConfigurationError::InvalidRepeat { repeat });
            }
        }
        self.children.iter().try_for_each(PlaylistNode::validate)
    }
}

/// Child indices from the playlist root to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(pub Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Parent path and index within the parent, or `None` for the root.
    pub fn split_last(&self) -> Option<(NodePath, usize)> {
        self.0
            .split_last()
            .map(|(last, parent)| (NodePath(parent.to_vec()), *last))
    }

    /// Whether `other` is this node or lies below it.
    pub fn contains(&self, other: &NodePath) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

/// A named root with its top-level nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    pub name: String,
    pub nodes: Vec<PlaylistNode>,
}

impl Playlist {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
        }
    }

    pub fn with_node(mut self, node: PlaylistNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn node(&self, path: &NodePath) -> Option<&PlaylistNode> {
        let (first, rest) = path.0.split_first()?;
        let mut node = self.nodes.get(*first)?;
        for index in rest {
            node = node.children.get(*index)?;
        }
        Some(node)
    }

    fn node_mut(&mut self, path: &NodePath) -> Result<&mut PlaylistNode, ConfigurationError> {
        let err = ConfigurationError::InvalidNodePath {
            playlist: self.name.clone(),
            path: path.to_string(),
        };
        let Some((first, rest)) = path.0.split_first() else {
            return Err(err);
        };
        let mut node = match self.nodes.get_mut(*first) {
            Some(node) => node,
            None => return Err(err),
        };
        for index in rest {
            node = match node.children.get_mut(*index) {
                Some(child) => child,
                None => return Err(err),
            };
        }
        Ok(node)
    }

    fn children_mut(&mut self, parent: &NodePath) -> Result<&mut Vec<PlaylistNode>, ConfigurationError> {
        if parent.is_root() {
            Ok(&mut self.nodes)
        } else {
            Ok(&mut self.node_mut(parent)?.children)
        }
    }

    /// Append `node` (with its subtree) under `parent`; returns the new node's path.
    pub fn add_node(
        &mut self,
        parent: &NodePath,
        node: PlaylistNode,
    ) -> Result<NodePath, ConfigurationError> {
        node.validate()?;
        let children = self.children_mut(parent)?;
        children.push(node);
        Ok(parent.child(children.len() - 1))
    }

    pub fn remove_node(&mut self, path: &NodePath) -> Result<PlaylistNode, ConfigurationError> {
        let invalid = ConfigurationError::InvalidNodePath {
            playlist: self.name.clone(),
            path: path.to_string(),
        };
        let Some((parent, index)) = path.split_last() else {
            return Err(invalid);
        };
        let children = self.children_mut(&parent)?;
        if index >= children.len() {
            return Err(invalid);
        }
        Ok(children.remove(index))
    }

    /// Move the node at `path` (with its subtree) to the end of `new_parent`'s children.
    ///
    /// # Errors
    ///
    /// `InvalidMove` when `new_parent` is the node itself or one of its descendants;
    /// `InvalidNodePath` when either path does not address a node.
    pub fn move_node(
        &mut self,
        path: &NodePath,
        new_parent: &NodePath,
    ) -> Result<NodePath, ConfigurationError> {
        if path.is_root() || self.node(path).is_none() {
            return Err(ConfigurationError::InvalidNodePath {
                playlist: self.name.clone(),
                path: path.to_string(),
            });
        }
        if path.contains(new_parent) {
            return Err(ConfigurationError::InvalidMove {
                playlist: self.name.clone(),
                path: new_parent.to_string(),
            });
        }
        if !new_parent.is_root() && self.node(new_parent).is_none() {
            return Err(ConfigurationError::InvalidNodePath {
                playlist: self.name.clone(),
                path: new_parent.to_string(),
            });
        }

        // Removing the node shifts later siblings, which may lie on new_parent's path.
        let mut target = new_parent.clone();
        if let Some((parent, index)) = path.split_last() {
            let depth = parent.0.len();
            if target.0.len() > depth && target.0.starts_with(&parent.0) && target.0[depth] > index
            {
                target.0[depth] -= 1;
            }
        }

        let node = self.remove_node(path)?;
        let children = self.children_mut(&target)?;
        children.push(node);
        Ok(target.child(children.len() - 1))
    }

    pub fn set_repeat(&mut self, path: &NodePath, repeat: u32) -> Result<(), ConfigurationError> {
        if repeat == 0 {
            return Err(ConfigurationError::InvalidRepeat { repeat });
        }
        let path_text = path.to_string();
        match &mut self.node_mut(path)?.kind {
            NodeKind::Routine { repeat: current, .. } => {
                *current = repeat;
                Ok(())
            }
            NodeKind::Gap { .. } => Err(ConfigurationError::NodeKindMismatch {
                path: path_text,
                expected: "routine",
            }),
        }
    }

    pub fn set_gap_duration(
        &mut self,
        path: &NodePath,
        duration: impl Into<Formula>,
    ) -> Result<(), ConfigurationError> {
        let path_text = path.to_string();
        match &mut self.node_mut(path)?.kind {
            NodeKind::Gap { duration: current } => {
                *current = duration.into();
                Ok(())
            }
            NodeKind::Routine { .. } => Err(ConfigurationError::NodeKindMismatch {
                path: path_text,
                expected: "gap",
            }),
        }
    }

    /// Point a routine node at a different routine.
    pub fn set_routine(&mut self, path: &NodePath, routine: &str) -> Result<(), ConfigurationError> {
        let path_text = path.to_string();
        match &mut self.node_mut(path)?.kind {
            NodeKind::Routine { name, .. } => {
                *name = routine.to_string();
                Ok(())
            }
            NodeKind::Gap { .. } => Err(ConfigurationError::NodeKindMismatch {
                path: path_text,
                expected: "routine",
            }),
        }
    }
}

/// Every playlist of a sequence; exactly one is active when any exist.
#[derive(Debug, Default)]
pub struct PlaylistSet {
    playlists: IndexMap<String, Playlist>,
    active: Option<String>,
    feed: ChangeFeed,
}

impl PlaylistSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(feed: ChangeFeed) -> Self {
        Self {
            feed,
            ..Self::default()
        }
    }

    /// Add an empty playlist. The first playlist added becomes active.
    pub fn add_playlist(&mut self, name: &str) -> Result<(), ConfigurationError> {
        self.insert_playlist(Playlist::new(name))
    }

    /// Add a fully built playlist.
    pub fn insert_playlist(&mut self, playlist: Playlist) -> Result<(), ConfigurationError> {
        if self.playlists.contains_key(&playlist.name) {
            return Err(ConfigurationError::DuplicatePlaylist {
                name: playlist.name,
            });
        }
        playlist.nodes.iter().try_for_each(PlaylistNode::validate)?;

        let name = playlist.name.clone();
        self.playlists.insert(name.clone(), playlist);
        self.feed.publish(SequenceChange::PlaylistChanged { name: name.clone() });
        if self.active.is_none() {
            self.active = Some(name);
            self.feed.publish(SequenceChange::ActivePlaylistChanged {
                name: self.active.clone(),
            });
        }
        Ok(())
    }

    /// Remove a playlist; if it was active, the first remaining one becomes active.
    pub fn remove_playlist(&mut self, name: &str) -> Result<Playlist, ConfigurationError> {
        let playlist =
            self.playlists
                .shift_remove(name)
                .ok_or_else(|| ConfigurationError::UnknownPlaylist {
                    name: name.to_string(),
                })?;
        self.feed.publish(SequenceChange::PlaylistRemoved {
            name: name.to_string(),
        });
        if self.active.as_deref() == Some(name) {
            self.active = self.playlists.keys().next().cloned();
            self.feed.publish(SequenceChange::ActivePlaylistChanged {
                name: self.active.clone(),
            });
        }
        Ok(playlist)
    }

    /// Rename a playlist in place, keeping its position and active status.
    pub fn rename_playlist(&mut self, old: &str, new: &str) -> Result<(), ConfigurationError> {
        if !self.playlists.contains_key(old) {
            return Err(ConfigurationError::UnknownPlaylist {
                name: old.to_string(),
            });
        }
        if old == new {
            return Ok(());
        }
        if self.playlists.contains_key(new) {
            return Err(ConfigurationError::DuplicatePlaylist {
                name: new.to_string(),
            });
        }

        self.playlists = std::mem::take(&mut self.playlists)
            .into_iter()
            .map(|(name, mut playlist)| {
                if name == old {
                    playlist.name = new.to_string();
                    (new.to_string(), playlist)
                } else {
                    (name, playlist)
                }
            })
            .collect();
        if self.active.as_deref() == Some(old) {
            self.active = Some(new.to_string());
        }
        self.feed.publish(SequenceChange::PlaylistRemoved {
            name: old.to_string(),
        });
        self.feed.publish(SequenceChange::PlaylistChanged {
            name: new.to_string(),
        });
        Ok(())
    }

    pub fn set_active(&mut self, name: &str) -> Result<(), ConfigurationError> {
        if !self.playlists.contains_key(name) {
            return Err(ConfigurationError::UnknownPlaylist {
                name: name.to_string(),
            });
        }
        self.active = Some(name.to_string());
        self.feed.publish(SequenceChange::ActivePlaylistChanged {
            name: self.active.clone(),
        });
        Ok(())
    }

    pub fn active(&self) -> Option<&Playlist> {
        self.active.as_ref().and_then(|name| self.playlists.get(name))
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&Playlist> {
        self.playlists.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Playlist> {
        self.playlists.values()
    }

    pub fn len(&self) -> usize {
        self.playlists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playlists.is_empty()
    }

    pub fn clear(&mut self) {
        self.playlists.clear();
        self.active = None;
    }

    pub fn add_node(
        &mut self,
        playlist: &str,
        parent: &NodePath,
        node: PlaylistNode,
    ) -> Result<NodePath, ConfigurationError> {
        self.edit(playlist, |p| p.add_node(parent, node))
    }

    pub fn remove_node(
        &mut self,
        playlist: &str,
        path: &NodePath,
    ) -> Result<PlaylistNode, ConfigurationError> {
        self.edit(playlist, |p| p.remove_node(path))
    }

    pub fn move_node(
        &mut self,
        playlist: &str,
        path: &NodePath,
        new_parent: &NodePath,
    ) -> Result<NodePath, ConfigurationError> {
        self.edit(playlist, |p| p.move_node(path, new_parent))
    }

    pub fn set_repeat(
        &mut self,
        playlist: &str,
        path: &NodePath,
        repeat: u32,
    ) -> Result<(), ConfigurationError> {
        self.edit(playlist, |p| p.set_repeat(path, repeat))
    }

    pub fn set_gap_duration(
        &mut self,
        playlist: &str,
        path: &NodePath,
        duration: impl Into<Formula>,
    ) -> Result<(), ConfigurationError> {
        self.edit(playlist, |p| p.set_gap_duration(path, duration))
    }

    pub fn set_routine(
        &mut self,
        playlist: &str,
        path: &NodePath,
        routine: &str,
    ) -> Result<(), ConfigurationError> {
        self.edit(playlist, |p| p.set_routine(path, routine))
    }

    fn edit<T, F>(&mut self, playlist: &str, edit: F) -> Result<T, ConfigurationError>
    where
        F: FnOnce(&mut Playlist) -> Result<T, ConfigurationError>,
    {
        let p = self
            .playlists
            .get_mut(playlist)
            .ok_or_else(|| ConfigurationError::UnknownPlaylist {
                name: playlist.to_string(),
            })?;
        let result = edit(p)?;
        self.feed.publish(SequenceChange::PlaylistChanged {
            name: playlist.to_string(),
        });
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(indices: &[usize]) -> NodePath {
        NodePath(indices.to_vec())
    }

    fn sample() -> Playlist {
        // [0] load
        //   [0,0] image
        //   [0,1] gap(5)
        // [1] gap(3)
        Playlist::new("main")
            .with_node(
                PlaylistNode::routine("load", 1)
                    .with_child(PlaylistNode::routine("image", 1))
                    .with_child(PlaylistNode::gap(5)),
            )
            .with_node(PlaylistNode::gap(3))
    }

    #[test]
    fn test_add_and_lookup() {
        let mut playlist = sample();
        let added = playlist
            .add_node(&path(&[0, 0]), PlaylistNode::routine("probe", 2))
            .unwrap();
        assert_eq!(added, path(&[0, 0, 0]));
        assert_eq!(playlist.node(&added).unwrap().label(), "probe x2");
        assert!(playlist.node(&path(&[4])).is_none());
    }

    #[test]
    fn test_zero_repeat_rejected() {
        let mut playlist = sample();
        assert_eq!(
            playlist.add_node(&NodePath::root(), PlaylistNode::routine("x", 0)),
            Err(ConfigurationError::InvalidRepeat { repeat: 0 })
        );
        assert_eq!(
            playlist.set_repeat(&path(&[0]), 0),
            Err(ConfigurationError::InvalidRepeat { repeat: 0 })
        );
        playlist.set_repeat(&path(&[0]), 3).unwrap();
        assert!(matches!(
            playlist.set_repeat(&path(&[1]), 2),
            Err(ConfigurationError::NodeKindMismatch { .. })
        ));
    }

    #[test]
    fn test_move_into_descendant_rejected() {
        let mut playlist = sample();
        assert!(matches!(
            playlist.move_node(&path(&[0]), &path(&[0, 1])),
            Err(ConfigurationError::InvalidMove { .. })
        ));
        assert!(matches!(
            playlist.move_node(&path(&[0]), &path(&[0])),
            Err(ConfigurationError::InvalidMove { .. })
        ));
        assert_eq!(playlist, sample());
    }

    #[test]
    fn test_move_adjusts_shifted_target() {
        let mut playlist = sample();
        // Move the first root node under the (later) gap at [1], which becomes [0].
        let moved = playlist.move_node(&path(&[0]), &path(&[1])).unwrap();
        assert_eq!(moved, path(&[0, 0]));
        assert_eq!(playlist.nodes.len(), 1);
        assert_eq!(playlist.node(&moved).unwrap().label(), "load");
        assert_eq!(playlist.node(&path(&[0, 0, 1])).unwrap().label(), "gap(5)");
    }

    #[test]
    fn test_move_to_root() {
        let mut playlist = sample();
        let moved = playlist.move_node(&path(&[0, 0]), &NodePath::root()).unwrap();
        assert_eq!(moved, path(&[2]));
        assert_eq!(playlist.node(&path(&[0])).unwrap().children.len(), 1);
    }

    #[test]
    fn test_remove_node() {
        let mut playlist = sample();
        let removed = playlist.remove_node(&path(&[0, 1])).unwrap();
        assert_eq!(removed, PlaylistNode::gap(5));
        assert!(playlist.remove_node(&path(&[0, 5])).is_err());
        assert!(playlist.remove_node(&NodePath::root()).is_err());
    }

    #[test]
    fn test_first_playlist_is_active() {
        let mut set = PlaylistSet::new();
        set.add_playlist("main").unwrap();
        set.add_playlist("calibration").unwrap();
        assert_eq!(set.active_name(), Some("main"));

        set.set_active("calibration").unwrap();
        set.remove_playlist("calibration").unwrap();
        assert_eq!(set.active_name(), Some("main"));
    }

    #[test]
    fn test_rename_keeps_order_and_active() {
        let mut set = PlaylistSet::new();
        set.add_playlist("main").unwrap();
        set.add_playlist("other").unwrap();

        set.rename_playlist("main", "primary").unwrap();
        assert_eq!(set.active_name(), Some("primary"));
        assert_eq!(
            set.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["primary", "other"]
        );
        assert!(matches!(
            set.rename_playlist("primary", "other"),
            Err(ConfigurationError::DuplicatePlaylist { .. })
        ));
    }

    #[test]
    fn test_set_edits_publish_changes() {
        let mut set = PlaylistSet::new();
        set.add_playlist("main").unwrap();
        let mut rx = set.feed.subscribe();

        set.add_node("main", &NodePath::root(), PlaylistNode::gap(1))
            .unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            SequenceChange::PlaylistChanged {
                name: "main".into()
            }
        );
    }
}
