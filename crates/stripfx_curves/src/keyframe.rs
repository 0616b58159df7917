// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframes written to host curves.

use crate::bezier::{self, Point};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A keyframe with flat bezier handles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyframePoint {
    /// Frame of the key
    pub frame: i64,
    /// Value at the key
    pub value: f64,
    /// Incoming handle
    pub handle_left: Point,
    /// Outgoing handle
    pub handle_right: Point,
}

impl KeyframePoint {
    /// Create a key with handles `handle_offset` frames either side
    pub fn new(frame: i64, value: f64, handle_offset: f64) -> Self {
        let x = frame as f64;
        Self {
            frame,
            value,
            handle_left: [x - handle_offset, value],
            handle_right: [x + handle_offset, value],
        }
    }

    /// Control point of the key itself
    pub fn point(&self) -> Point {
        [self.frame as f64, self.value]
    }
}

/// Build sorted keyframes from merged samples
pub fn keyframes_from_samples(samples: &BTreeMap<i64, f64>, handle_offset: f64) -> Vec<KeyframePoint> {
    samples
        .iter()
        .map(|(&frame, &value)| KeyframePoint::new(frame, value, handle_offset))
        .collect()
}

/// Evaluate written keyframes at `frame`.
///
/// Values are held constant outside the keys. Between two keys the segment
/// is the cubic bezier through the left key's outgoing handle and the right
/// key's incoming handle, with both handles clamped to the segment span.
/// Returns `None` when there are no keys.
pub fn evaluate_keyframes(points: &[KeyframePoint], frame: f64) -> Option<f64> {
    let first = points.first()?;
    let last = points.last()?;

    if frame <= first.frame as f64 {
        return Some(first.value);
    }
    if frame >= last.frame as f64 {
        return Some(last.value);
    }

    let next = points.partition_point(|p| (p.frame as f64) <= frame);
    let a = &points[next - 1];
    let b = &points[next];
    if frame == a.frame as f64 {
        return Some(a.value);
    }

    let (p1, p2) = bezier::correct_handles(a.point(), a.handle_right, b.handle_left, b.point());
    let value = bezier::solve(a.point(), p1, p2, b.point(), frame).unwrap_or_else(|| {
        if frame - a.frame as f64 <= b.frame as f64 - frame {
            a.value
        } else {
            b.value
        }
    });
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(samples: &[(i64, f64)]) -> Vec<KeyframePoint> {
        keyframes_from_samples(&samples.iter().copied().collect(), 5.0)
    }

    #[test]
    fn test_handles_are_flat() {
        let key = KeyframePoint::new(10, 3.0, 5.0);
        assert_eq!(key.handle_left, [5.0, 3.0]);
        assert_eq!(key.handle_right, [15.0, 3.0]);
    }

    #[test]
    fn test_empty_curve_has_no_value() {
        assert_eq!(evaluate_keyframes(&[], 3.0), None);
    }

    #[test]
    fn test_constant_extrapolation() {
        let points = keys(&[(10, 1.0), (20, 4.0)]);
        assert_eq!(evaluate_keyframes(&points, -100.0), Some(1.0));
        assert_eq!(evaluate_keyframes(&points, 10.0), Some(1.0));
        assert_eq!(evaluate_keyframes(&points, 20.0), Some(4.0));
        assert_eq!(evaluate_keyframes(&points, 500.0), Some(4.0));
    }

    #[test]
    fn test_segment_is_eased_and_symmetric() {
        let points = keys(&[(0, 0.0), (10, 10.0)]);
        let mid = evaluate_keyframes(&points, 5.0).unwrap();
        assert!((mid - 5.0).abs() < 1e-6);

        let early = evaluate_keyframes(&points, 2.0).unwrap();
        let late = evaluate_keyframes(&points, 8.0).unwrap();
        assert!(early < 2.0, "ease-in should lag linear, got {early}");
        assert!((early + late - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_short_segment_handles_are_clamped() {
        let points = keys(&[(0, 0.0), (2, 6.0), (3, 6.0)]);
        let value = evaluate_keyframes(&points, 1.0).unwrap();
        assert!((value - 3.0).abs() < 1e-3);
        let flat = evaluate_keyframes(&points, 2.5).unwrap();
        assert!((flat - 6.0).abs() < 1e-9);
    }
}
