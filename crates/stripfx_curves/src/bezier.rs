// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cubic bezier root solving.
//!
//! A keyframe segment is a cubic bezier in (frame, value) space. To sample
//! it at a frame we solve `X(t) = frame` for the handle parameter `t` and
//! evaluate `Y(t)`.
//!
//! The cubic solver reports roots in the order its branch produces them and
//! the caller always takes the first one. There is no "smallest t" policy;
//! with looping handles this can pick a root that is not the leftmost one.

/// A point in (frame, value) space
pub type Point = [f64; 2];

/// Lower bound of the accepted handle parameter range
pub const T_MIN: f64 = -1.0e-10;
/// Upper bound of the accepted handle parameter range
pub const T_MAX: f64 = 1.000001;

/// Roots of a polynomial that fall inside `[T_MIN, T_MAX]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roots {
    values: [f64; 3],
    count: usize,
}

impl Roots {
    fn none(values: [f64; 3]) -> Self {
        Self { values, count: 0 }
    }

    /// Number of accepted roots
    pub fn len(&self) -> usize {
        self.count
    }

    /// True when no root was accepted
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// First accepted root, the one the solver uses
    pub fn first(&self) -> Option<f64> {
        (self.count > 0).then_some(self.values[0])
    }

    /// All accepted roots in branch order
    pub fn as_slice(&self) -> &[f64] {
        &self.values[..self.count]
    }
}

#[inline]
fn accepted(t: f64) -> bool {
    t >= T_MIN && t <= T_MAX
}

/// Real cube root keeping the sign of `d`
fn signed_cbrt(d: f64) -> f64 {
    if d == 0.0 {
        return 0.0;
    }
    (d.abs().ln() / 3.0).exp().copysign(d)
}

/// Solve `c0 + c1 t + c2 t^2 + c3 t^3 = 0` for roots in the accepted range.
///
/// Degrades to the quadratic, linear and constant cases when the leading
/// coefficients vanish. Rejected candidates are overwritten by the next
/// candidate, so accepted roots are packed at the front in branch order.
pub fn solve_cubic(c0: f64, c1: f64, c2: f64, c3: f64) -> Roots {
    let mut o = [0.0_f64; 3];
    let mut nr = 0;

    if c3 != 0.0 {
        let a = c2 / c3 / 3.0;
        let b = c1 / c3;
        let c = c0 / c3;

        let p = b / 3.0 - a * a;
        let q = (2.0 * a * a * a - a * b + c) / 2.0;
        let d = q * q + p * p * p;

        if d > 0.0 {
            let t = d.sqrt();
            o[0] = signed_cbrt(-q + t) + signed_cbrt(-q - t) - a;
            let count = usize::from(accepted(o[0]));
            return Roots { values: o, count };
        }

        if d == 0.0 {
            let t = signed_cbrt(-q);
            o[0] = 2.0 * t - a;
            if accepted(o[0]) {
                nr += 1;
            }
            o[nr] = -t - a;
            if accepted(o[nr]) {
                nr += 1;
            }
            return Roots { values: o, count: nr };
        }

        let phi = (-q / (-(p * p * p)).sqrt()).acos();
        let t = (-p).sqrt();
        let cos = (phi / 3.0).cos();
        let sin = (3.0 - 3.0 * cos * cos).sqrt();

        o[0] = 2.0 * t * cos - a;
        if accepted(o[0]) {
            nr += 1;
        }
        o[nr] = -t * (cos + sin) - a;
        if accepted(o[nr]) {
            nr += 1;
        }
        o[nr] = -t * (cos - sin) - a;
        if accepted(o[nr]) {
            nr += 1;
        }
        return Roots { values: o, count: nr };
    }

    let (a, b, c) = (c2, c1, c0);

    if a != 0.0 {
        let disc = b * b - 4.0 * a * c;

        if disc > 0.0 {
            let sq = disc.sqrt();
            o[0] = (-b - sq) / (2.0 * a);
            if accepted(o[0]) {
                nr += 1;
            }
            o[nr] = (-b + sq) / (2.0 * a);
            if accepted(o[nr]) {
                nr += 1;
            }
            return Roots { values: o, count: nr };
        }

        if disc == 0.0 {
            o[0] = -b / (2.0 * a);
            if accepted(o[0]) {
                return Roots { values: o, count: 1 };
            }
        }
        return Roots::none(o);
    }

    if b != 0.0 {
        o[0] = -c / b;
        let count = usize::from(accepted(o[0]));
        return Roots { values: o, count };
    }

    if c == 0.0 {
        return Roots { values: o, count: 1 };
    }
    Roots::none(o)
}

/// Evaluate a 1D cubic bezier at `t` (Bernstein form)
pub fn bezier(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    let mt = 1.0 - t;
    let mt2 = mt * mt;
    let mt3 = mt2 * mt;

    p0 * mt3 + 3.0 * p1 * mt2 * t + 3.0 * p2 * mt * t2 + p3 * t3
}

/// Roots of `X(t) - x = 0` for the X components of a cubic bezier
pub fn find_zero(x: f64, q0: f64, q1: f64, q2: f64, q3: f64) -> Roots {
    let c0 = q0 - x;
    let c1 = 3.0 * (q1 - q0);
    let c2 = 3.0 * (q0 - 2.0 * q1 + q2);
    let c3 = q3 - q0 + 3.0 * (q1 - q2);

    solve_cubic(c0, c1, c2, c3)
}

/// Sample the bezier `p0..p3` at frame `target_x`.
///
/// Returns `None` when no handle parameter in the accepted range maps to
/// `target_x`; callers fall back to the nearest endpoint.
pub fn solve(p0: Point, p1: Point, p2: Point, p3: Point, target_x: f64) -> Option<f64> {
    let t = find_zero(target_x, p0[0], p1[0], p2[0], p3[0]).first()?;
    Some(bezier(p0[1], p1[1], p2[1], p3[1], t))
}

/// Clamp segment handles so they never reach past the neighbouring key.
///
/// `p1` is the right handle of the first key, `p2` the left handle of the
/// second key. A handle longer than the segment's time span is scaled down
/// towards its key, which keeps `X(t)` from looping back on itself.
pub fn correct_handles(p0: Point, p1: Point, p2: Point, p3: Point) -> (Point, Point) {
    let h1 = [p0[0] - p1[0], p0[1] - p1[1]];
    let h2 = [p3[0] - p2[0], p3[1] - p2[1]];

    let span = p3[0] - p0[0];
    let len1 = h1[0].abs();
    let len2 = h2[0].abs();

    if len1 + len2 == 0.0 {
        return (p1, p2);
    }

    let mut p1 = p1;
    let mut p2 = p2;
    if len1 > span {
        let fac = span / len1;
        p1 = [p0[0] - fac * h1[0], p0[1] - fac * h1[1]];
    }
    if len2 > span {
        let fac = span / len2;
        p2 = [p3[0] - fac * h2[0], p3[1] - fac * h2[1]];
    }
    (p1, p2)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_symmetric_segment_midpoint() {
        let value = solve([0.0, 0.0], [1.0, 0.0], [4.0, 5.0], [5.0, 5.0], 2.5)
            .expect("midpoint has a root");
        assert!(value > 0.0 && value < 5.0);
        assert!((value - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_endpoints_map_to_endpoint_values() {
        let p = ([0.0, 2.0], [5.0, 2.0], [5.0, 8.0], [10.0, 8.0]);
        let start = solve(p.0, p.1, p.2, p.3, 0.0).unwrap();
        let end = solve(p.0, p.1, p.2, p.3, 10.0).unwrap();
        assert!((start - 2.0).abs() < 1e-6);
        assert!((end - 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_one_real_root_branch() {
        // Handles at a third of the span make X(t) linear-ish: d > 0.
        let value = solve([0.0, 0.0], [5.0, 0.0], [5.0, 10.0], [10.0, 10.0], 5.0).unwrap();
        assert!((value - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_three_root_branch_order() {
        // (t - 0.1)(t - 0.5)(t - 0.9)
        let roots = solve_cubic(-0.045, 0.59, -1.5, 1.0);
        assert_eq!(roots.len(), 3);
        for (got, want) in roots.as_slice().iter().zip([0.9, 0.1, 0.5]) {
            assert!((got - want).abs() < EPS, "{:?}", roots.as_slice());
        }
        assert!((roots.first().unwrap() - 0.9).abs() < EPS);
    }

    #[test]
    fn test_triple_root_branch() {
        let roots = solve_cubic(0.0, 0.0, 0.0, 1.0);
        assert_eq!(roots.len(), 2);
        assert!(roots.as_slice().iter().all(|t| t.abs() < EPS));
    }

    #[test]
    fn test_looping_handles_use_first_root() {
        let roots = find_zero(2.0, 0.0, 8.0, -3.0, 5.0);
        let expected = [0.760654716824873, 0.10993163292838404, 0.6294136502467429];
        assert_eq!(roots.len(), 3);
        for (got, want) in roots.as_slice().iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{:?}", roots.as_slice());
        }

        // Y is 3t here, so the sampled value identifies the root that was used.
        let value = solve([0.0, 0.0], [8.0, 1.0], [-3.0, 2.0], [5.0, 3.0], 2.0).unwrap();
        assert!((value - 3.0 * expected[0]).abs() < 1e-6);
        assert!((value - 3.0 * expected[1]).abs() > 1.0);
    }

    #[test]
    fn test_out_of_range_target_has_no_root() {
        assert_eq!(solve([0.0, 0.0], [1.0, 0.0], [2.0, 1.0], [3.0, 1.0], 7.0), None);
    }

    #[test]
    fn test_linear_fallback() {
        // c3 = c2 = 0, c1 = 2, c0 = -1 -> t = 0.5
        let roots = solve_cubic(-1.0, 2.0, 0.0, 0.0);
        assert_eq!(roots.len(), 1);
        assert!((roots.first().unwrap() - 0.5).abs() < EPS);
    }

    #[test]
    fn test_quadratic_fallback_keeps_branch_order() {
        // (t - 0.25)(t - 0.75) = t^2 - t + 0.1875
        let roots = solve_cubic(0.1875, -1.0, 1.0, 0.0);
        assert_eq!(roots.len(), 2);
        assert!((roots.as_slice()[0] - 0.25).abs() < EPS);
        assert!((roots.as_slice()[1] - 0.75).abs() < EPS);
    }

    #[test]
    fn test_constant_cases() {
        assert_eq!(solve_cubic(0.0, 0.0, 0.0, 0.0).first(), Some(0.0));
        assert!(solve_cubic(1.0, 0.0, 0.0, 0.0).is_empty());
    }

    #[test]
    fn test_accepted_range_is_strict() {
        // t = 1.0000005 is inside the tolerance, t = 1.00001 is not
        assert_eq!(solve_cubic(-1.0000005, 1.0, 0.0, 0.0).len(), 1);
        assert!(solve_cubic(-1.00001, 1.0, 0.0, 0.0).is_empty());
        assert!(solve_cubic(1.0e-9, 1.0, 0.0, 0.0).is_empty());
    }

    #[test]
    fn test_bernstein_endpoints() {
        assert_eq!(bezier(1.0, 2.0, 3.0, 4.0, 0.0), 1.0);
        assert_eq!(bezier(1.0, 2.0, 3.0, 4.0, 1.0), 4.0);
    }

    #[test]
    fn test_correct_handles_clamps_long_handles() {
        let (p1, p2) = correct_handles([0.0, 0.0], [5.0, 0.0], [-3.0, 1.0], [2.0, 1.0]);
        assert!((p1[0] - 2.0).abs() < EPS);
        assert!((p2[0] - 0.0).abs() < EPS);
        assert!((p2[1] - 1.0).abs() < EPS);
    }

    #[test]
    fn test_correct_handles_leaves_short_handles() {
        let (p1, p2) = correct_handles([0.0, 0.0], [1.0, 0.0], [9.0, 1.0], [10.0, 1.0]);
        assert_eq!(p1, [1.0, 0.0]);
        assert_eq!(p2, [9.0, 1.0]);
    }
}
