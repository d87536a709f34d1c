// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Resampling of a channel's points onto a card's native sample grid.

use crate::compiler::TimelinePoint;
use crate::config::consts::MAX_RESAMPLE_POINTS;

/// Zero-order hold of `points` on a uniform grid of `sample_rate` samples per ms.
///
/// The grid starts at the first point and each sample holds the value of the latest
/// point at or before it. A zero-duration hold marker closes the result at the
/// original end time. Non-positive rates return the points unchanged.
///
/// Returns `None` when the grid would exceed [`MAX_RESAMPLE_POINTS`] samples.
///
/// # Examples
///
/// ```
/// use the_sequencer::compiler::TimelinePoint;
/// use the_sequencer::hardware::resample::zero_order_hold;
///
/// let points = [
///     TimelinePoint { time: 0.0, duration: 1.5, value: 1.0 },
///     TimelinePoint { time: 1.5, duration: 0.5, value: 2.0 },
///     TimelinePoint { time: 2.0, duration: 0.0, value: 2.0 },
/// ];
/// let grid = zero_order_hold(&points, 2.0).unwrap();
/// let values: Vec<f64> = grid.iter().map(|p| p.value).collect();
/// assert_eq!(values, vec![1.0, 1.0, 1.0, 2.0, 2.0]);
/// ```
pub fn zero_order_hold(points: &[TimelinePoint], sample_rate: f64) -> Option<Vec<TimelinePoint>> {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Some(Vec::new());
    };
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Some(points.to_vec());
    }

    let start = first.time;
    let end = points.iter().map(TimelinePoint::end).fold(last.end(), f64::max);
    let period = 1.0 / sample_rate;
    // Tolerate rounding so an end time exactly on the grid does not add a sliver sample.
    let count = ((end - start) / period - 1e-9).ceil().max(0.0);
    if !count.is_finite() || count >= MAX_RESAMPLE_POINTS as f64 {
        return None;
    }
    let count = count as usize;

    let mut resampled = Vec::with_capacity(count + 1);
    let mut current = 0;
    for k in 0..count {
        let time = start + k as f64 * period;
        while current + 1 < points.len() && points[current + 1].time <= time {
            current += 1;
        }
        resampled.push(TimelinePoint {
            time,
            duration: period.min(end - time),
            value: points[current].value,
        });
    }
    resampled.push(TimelinePoint {
        time: end,
        duration: 0.0,
        value: last.value,
    });
    Some(resampled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(time: f64, duration: f64, value: f64) -> TimelinePoint {
        TimelinePoint { time, duration, value }
    }

    #[test]
    fn test_grid_spacing_and_hold_marker() {
        let points = [point(0.0, 3.0, 5.0), point(3.0, 0.0, 5.0)];
        let grid = zero_order_hold(&points, 1.0).unwrap();
        assert_eq!(
            grid.iter().map(|p| p.time).collect::<Vec<_>>(),
            vec![0.0, 1.0, 2.0, 3.0]
        );
        assert!(grid[..3].iter().all(|p| p.duration == 1.0));
        assert_eq!(grid[3], point(3.0, 0.0, 5.0));
    }

    #[test]
    fn test_partial_last_sample() {
        let points = [point(0.0, 2.5, 1.0), point(2.5, 0.0, 1.0)];
        let grid = zero_order_hold(&points, 1.0).unwrap();
        assert_eq!(grid.len(), 4);
        assert_eq!(grid[2].duration, 0.5);
    }

    #[test]
    fn test_picks_latest_point_before_sample() {
        let points = [
            point(0.0, 0.2, 1.0),
            point(0.2, 0.2, 2.0),
            point(0.4, 0.8, 3.0),
            point(1.2, 0.0, 0.0),
        ];
        let grid = zero_order_hold(&points, 2.0).unwrap();
        let values: Vec<f64> = grid.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 3.0, 3.0, 0.0]);
    }

    #[test]
    fn test_empty_and_invalid_rate() {
        assert_eq!(zero_order_hold(&[], 1.0), Some(Vec::new()));
        let points = [point(0.0, 1.0, 1.0)];
        assert_eq!(zero_order_hold(&points, 0.0), Some(points.to_vec()));
    }

    #[test]
    fn test_oversized_grid_is_refused() {
        // One hour at 10 kHz per ms is far past the sample bound.
        let points = [point(0.0, 3_600_000.0, 1.0), point(3_600_000.0, 0.0, 1.0)];
        assert_eq!(zero_order_hold(&points, 10_000.0), None);
    }
}
