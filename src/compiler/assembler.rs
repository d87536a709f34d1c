// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, HashMap};

use super::routine::{CompiledRoutine, RoutineCompiler};
use crate::errors::CompileError;
use crate::expression::Bindings;
use crate::observability::messages::compiler::{NodeCompileFailed, TimelineAssembled};
use crate::observability::messages::StructuredLog;
use crate::sequence::{ChannelId, NodeKind, NodePath, Playlist, PlaylistNode, RoutineLibrary};

/// One output change at an absolute time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelinePoint {
    /// Absolute start in ms from the beginning of the run.
    pub time: f64,
    /// How long the value is driven before the next point; zero for hold markers.
    pub duration: f64,
    pub value: f64,
}

impl TimelinePoint {
    pub fn end(&self) -> f64 {
        self.time + self.duration
    }
}

/// Where a playlist node landed on the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInterval {
    pub path: NodePath,
    pub label: String,
    pub start: f64,
    pub end: f64,
}

impl NodeInterval {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeError {
    pub path: NodePath,
    pub error: CompileError,
}

/// A fully assembled run: absolute points per channel plus per-node bookkeeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    pub channels: BTreeMap<ChannelId, Vec<TimelinePoint>>,
    pub intervals: Vec<NodeInterval>,
    pub errors: Vec<NodeError>,
    /// Latest node end time.
    pub length: f64,
}

impl Timeline {
    /// Whether every node and track compiled.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn channel(&self, id: &ChannelId) -> Option<&[TimelinePoint]> {
        self.channels.get(id).map(Vec::as_slice)
    }

    pub fn point_count(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }

    /// The channels accepted by `owns`, with no interval or error bookkeeping.
    pub fn subset<F>(&self, owns: F) -> Timeline
    where
        F: Fn(&ChannelId) -> bool,
    {
        Timeline {
            channels: self
                .channels
                .iter()
                .filter(|(id, _)| owns(id))
                .map(|(id, points)| (id.clone(), points.clone()))
                .collect(),
            intervals: Vec::new(),
            errors: Vec::new(),
            length: self.length,
        }
    }
}

/// Folds a playlist tree into one absolute-time timeline.
///
/// A node starts where its parent ends (top-level nodes at zero) and each sibling
/// starts where the previous one ends. Children of a node therefore start at the
/// same time as the node's next sibling.
pub struct PlaylistAssembler<'a, B: Bindings + ?Sized> {
    routines: &'a RoutineLibrary,
    values: &'a B,
    compiler: RoutineCompiler<'a, B>,
}

impl<'a, B: Bindings + ?Sized> PlaylistAssembler<'a, B> {
    pub fn new(routines: &'a RoutineLibrary, values: &'a B) -> Self {
        Self {
            routines,
            values,
            compiler: RoutineCompiler::new(values),
        }
    }

    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.compiler = self.compiler.with_resolution(resolution);
        self
    }

    pub fn assemble(&self, playlist: &Playlist) -> Timeline {
        let mut fold = Fold {
            assembler: self,
            playlist: &playlist.name,
            cache: HashMap::new(),
            timeline: Timeline::default(),
        };
        fold.siblings(&playlist.nodes, &NodePath::root(), 0.0);

        let mut timeline = fold.timeline;
        for points in timeline.channels.values_mut() {
            points.sort_by(|a, b| a.time.total_cmp(&b.time));
            if let Some(last) = points.last().copied() {
                if last.duration != 0.0 {
                    points.push(TimelinePoint {
                        time: last.end(),
                        duration: 0.0,
                        value: last.value,
                    });
                }
            }
        }

        TimelineAssembled {
            playlist: &playlist.name,
            channels: timeline.channels.len(),
            points: timeline.point_count(),
            length: timeline.length,
            errors: timeline.errors.len(),
        }
        .log();
        timeline
    }
}

struct Fold<'s, 'a, B: Bindings + ?Sized> {
    assembler: &'s PlaylistAssembler<'a, B>,
    playlist: &'s str,
    cache: HashMap<String, CompiledRoutine>,
    timeline: Timeline,
}

impl<B: Bindings + ?Sized> Fold<'_, '_, B> {
    fn siblings(&mut self, nodes: &[PlaylistNode], parent: &NodePath, start: f64) {
        let mut cursor = start;
        for (index, node) in nodes.iter().enumerate() {
            let path = parent.child(index);
            let end = cursor + self.node(node, &path, cursor);
            self.timeline.intervals.push(NodeInterval {
                path: path.clone(),
                label: node.label(),
                start: cursor,
                end,
            });
            self.timeline.length = self.timeline.length.max(end);
            self.siblings(&node.children, &path, end);
            cursor = end;
        }
    }

    /// Emit the node's points starting at `start`; returns its duration.
    fn node(&mut self, node: &PlaylistNode, path: &NodePath, start: f64) -> f64 {
        match &node.kind {
            NodeKind::Gap { duration } => {
                let context = format!("playlist '{}' node {} gap duration", self.playlist, path);
                match crate::expression::evaluate(duration.as_str(), self.assembler.values) {
                    Ok(d) if d >= 0.0 => d,
                    Ok(d) => {
                        self.fail(path, CompileError::NegativeDuration { context, duration: d });
                        0.0
                    }
                    Err(source) => {
                        self.fail(path, CompileError::Expression { context, source });
                        0.0
                    }
                }
            }
            NodeKind::Routine { name, repeat } => {
                let Some(routine) = self.assembler.routines.get(name) else {
                    self.fail(path, CompileError::UnknownRoutine(name.clone()));
                    return 0.0;
                };
                let compiled = self
                    .cache
                    .entry(name.clone())
                    .or_insert_with(|| self.assembler.compiler.compile(routine));

                let period = compiled.duration();
                let mut errors = Vec::new();
                for (channel, track) in &compiled.tracks {
                    let track = match track {
                        Ok(track) => track,
                        Err(error) => {
                            errors.push(error.clone());
                            continue;
                        }
                    };
                    let points = self.timeline.channels.entry(channel.clone()).or_default();
                    for repetition in 0..*repeat {
                        let mut t = start + f64::from(repetition) * period + track.offset;
                        for event in &track.events {
                            points.push(TimelinePoint {
                                time: t,
                                duration: event.duration,
                                value: event.value,
                            });
                            t += event.duration;
                        }
                    }
                }
                for error in errors {
                    self.fail(path, error);
                }
                period * f64::from(*repeat)
            }
        }
    }

    fn fail(&mut self, path: &NodePath, error: CompileError) {
        NodeCompileFailed {
            playlist: self.playlist,
            path,
            error: &error,
        }
        .log();
        self.timeline.errors.push(NodeError {
            path: path.clone(),
            error,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::{Event, Routine, Track};
    use indexmap::IndexMap;

    fn dio(index: usize) -> ChannelId {
        ChannelId::new("dio0", index)
    }

    fn library() -> RoutineLibrary {
        let mut library = RoutineLibrary::new();
        library
            .insert_routine(
                Routine::new("pulse").with_track(
                    Track::new(dio(0))
                        .with_event(Event::digital(2, true))
                        .with_event(Event::digital(3, false)),
                ),
            )
            .unwrap();
        library
            .insert_routine(
                Routine::new("flash")
                    .with_track(Track::new(dio(1)).with_event(Event::digital("t_flash", true))),
            )
            .unwrap();
        library
    }

    fn values() -> IndexMap<String, f64> {
        IndexMap::from([("t_flash".to_string(), 1.0), ("t_gap".to_string(), 3.0)])
    }

    fn path(indices: &[usize]) -> NodePath {
        NodePath(indices.to_vec())
    }

    #[test]
    fn test_routine_then_gap_intervals() {
        let library = library();
        let values = values();
        let playlist = Playlist::new("main")
            .with_node(PlaylistNode::routine("pulse", 1))
            .with_node(PlaylistNode::gap("t_gap"));

        let timeline = PlaylistAssembler::new(&library, &values).assemble(&playlist);

        let intervals: Vec<(f64, f64)> = timeline.intervals.iter().map(|i| (i.start, i.end)).collect();
        assert_eq!(intervals, vec![(0.0, 5.0), (5.0, 8.0)]);
        assert_eq!(timeline.length, 8.0);
        assert!(timeline.is_complete());
    }

    #[test]
    fn test_repeat_concatenates_and_ends_with_hold() {
        let library = library();
        let values = values();
        let playlist = Playlist::new("main").with_node(PlaylistNode::routine("pulse", 2));

        let timeline = PlaylistAssembler::new(&library, &values).assemble(&playlist);
        let points = timeline.channel(&dio(0)).unwrap();
        let times: Vec<f64> = points.iter().map(|p| p.time).collect();
        assert_eq!(times, vec![0.0, 2.0, 5.0, 7.0, 10.0]);
        assert_eq!(
            points.last().copied(),
            Some(TimelinePoint { time: 10.0, duration: 0.0, value: 0.0 })
        );
        assert_eq!(timeline.length, 10.0);
    }

    #[test]
    fn test_children_start_at_parent_end() {
        let library = library();
        let values = values();
        let playlist = Playlist::new("main").with_node(
            PlaylistNode::routine("pulse", 1)
                .with_child(PlaylistNode::gap(4))
                .with_child(PlaylistNode::routine("flash", 1)),
        );

        let timeline = PlaylistAssembler::new(&library, &values).assemble(&playlist);
        let flash = timeline
            .intervals
            .iter()
            .find(|i| i.path == path(&[0, 1]))
            .unwrap();
        assert_eq!((flash.start, flash.end), (9.0, 10.0));
        assert_eq!(timeline.channel(&dio(1)).unwrap()[0].time, 9.0);
        assert_eq!(timeline.length, 10.0);
    }

    #[test]
    fn test_times_non_decreasing_across_overlapping_branches() {
        let library = library();
        let values = values();
        let playlist = Playlist::new("main")
            .with_node(PlaylistNode::routine("pulse", 1).with_child(PlaylistNode::routine("pulse", 1)))
            .with_node(PlaylistNode::routine("pulse", 1));

        let timeline = PlaylistAssembler::new(&library, &values).assemble(&playlist);
        for points in timeline.channels.values() {
            assert!(points.windows(2).all(|w| w[0].time <= w[1].time));
            assert_eq!(points.last().unwrap().duration, 0.0);
        }
    }

    #[test]
    fn test_node_errors_are_collected() {
        let library = library();
        let values = IndexMap::new();
        let playlist = Playlist::new("main")
            .with_node(PlaylistNode::routine("missing", 1))
            .with_node(PlaylistNode::gap("nowhere"))
            .with_node(PlaylistNode::routine("flash", 1))
            .with_node(PlaylistNode::routine("pulse", 1));

        let timeline = PlaylistAssembler::new(&library, &values).assemble(&playlist);
        let failed: Vec<&NodePath> = timeline.errors.iter().map(|e| &e.path).collect();
        assert_eq!(failed, vec![&path(&[0]), &path(&[1]), &path(&[2])]);
        assert_eq!(
            timeline.errors[0].error,
            CompileError::UnknownRoutine("missing".into())
        );
        assert_eq!(timeline.length, 5.0);
        assert!(timeline.channel(&dio(0)).is_some());
    }

    #[test]
    fn test_subset_keeps_only_owned_channels() {
        let library = library();
        let values = values();
        let playlist = Playlist::new("main")
            .with_node(PlaylistNode::routine("pulse", 1))
            .with_node(PlaylistNode::routine("flash", 1));

        let timeline = PlaylistAssembler::new(&library, &values).assemble(&playlist);
        let subset = timeline.subset(|id| id.index == 1);
        assert_eq!(subset.channels.keys().collect::<Vec<_>>(), vec![&dio(1)]);
        assert_eq!(subset.length, timeline.length);
    }
}
