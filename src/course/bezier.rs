//! Piecewise cubic Bezier interpolation
//!
//! One cubic Bezier segment per waypoint pair, with interior control
//! points placed along Catmull-Rom tangents so heading is continuous at
//! the joins. Queries are arc-length parameterized through a per-segment
//! lookup table inverted by binary search.

use crate::common::{NavError, NavResult};

/// Samples per segment in the arc-length lookup table
const TABLE_SAMPLES: usize = 32;

fn binomial_coefficient(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    if k == 0 || k == n {
        return 1.0;
    }
    let k = if k > n - k { n - k } else { k };
    let mut result = 1.0;
    for i in 0..k {
        result *= (n - i) as f64;
        result /= (i + 1) as f64;
    }
    result
}

fn bernstein_poly(n: usize, i: usize, t: f64) -> f64 {
    binomial_coefficient(n, i) * t.powi(i as i32) * (1.0 - t).powi((n - i) as i32)
}

/// Evaluate a Bezier curve given its control points
fn bezier_point(t: f64, control_points: &[(f64, f64)]) -> (f64, f64) {
    let n = control_points.len() - 1;
    let mut x = 0.0;
    let mut y = 0.0;
    for (i, &(px, py)) in control_points.iter().enumerate() {
        let basis = bernstein_poly(n, i, t);
        x += basis * px;
        y += basis * py;
    }
    (x, y)
}

/// Control points of the derivative of a Bezier curve
fn derivative_control_points(control_points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let n = control_points.len();
    let mut derivative = Vec::with_capacity(n.saturating_sub(1));
    for j in 0..n - 1 {
        let dx = (n - 1) as f64 * (control_points[j + 1].0 - control_points[j].0);
        let dy = (n - 1) as f64 * (control_points[j + 1].1 - control_points[j].1);
        derivative.push((dx, dy));
    }
    derivative
}

struct Segment {
    control_points: [(f64, f64); 4],
    /// Cumulative arc length at t = j / TABLE_SAMPLES, starting at the
    /// curve-global length of the segment start
    arc_table: Vec<f64>,
}

/// Piecewise cubic Bezier curve through a waypoint sequence
pub struct BezierPath {
    segments: Vec<Segment>,
    total_length: f64,
}

impl BezierPath {
    pub fn new(x: &[f64], y: &[f64]) -> NavResult<Self> {
        let n = x.len();
        if n < 2 || y.len() != n {
            return Err(NavError::InvalidParameter(
                "Bezier path needs at least two points".to_string(),
            ));
        }

        // Catmull-Rom tangents, one-sided at the endpoints
        let mut tangents = Vec::with_capacity(n);
        for i in 0..n {
            let (tx, ty) = if i == 0 {
                (x[1] - x[0], y[1] - y[0])
            } else if i == n - 1 {
                (x[n - 1] - x[n - 2], y[n - 1] - y[n - 2])
            } else {
                (0.5 * (x[i + 1] - x[i - 1]), 0.5 * (y[i + 1] - y[i - 1]))
            };
            tangents.push((tx, ty));
        }

        let mut segments = Vec::with_capacity(n - 1);
        let mut running_length = 0.0;
        for i in 0..n - 1 {
            let control_points = [
                (x[i], y[i]),
                (x[i] + tangents[i].0 / 3.0, y[i] + tangents[i].1 / 3.0),
                (x[i + 1] - tangents[i + 1].0 / 3.0, y[i + 1] - tangents[i + 1].1 / 3.0),
                (x[i + 1], y[i + 1]),
            ];

            let mut arc_table = Vec::with_capacity(TABLE_SAMPLES + 1);
            arc_table.push(running_length);
            let mut prev = bezier_point(0.0, &control_points);
            for j in 1..=TABLE_SAMPLES {
                let t = j as f64 / TABLE_SAMPLES as f64;
                let p = bezier_point(t, &control_points);
                running_length +=
                    ((p.0 - prev.0).powi(2) + (p.1 - prev.1).powi(2)).sqrt();
                arc_table.push(running_length);
                prev = p;
            }

            segments.push(Segment { control_points, arc_table });
        }

        Ok(BezierPath { segments, total_length: running_length })
    }

    pub fn total_length(&self) -> f64 {
        self.total_length
    }

    /// Map a curve-global arc length to (segment index, local t)
    fn locate(&self, s: f64) -> (usize, f64) {
        let s = s.max(0.0).min(self.total_length);
        // Binary search over segment start lengths
        let mut lo = 0;
        let mut hi = self.segments.len();
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.segments[mid].arc_table[0] <= s {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let table = &self.segments[lo].arc_table;
        let mut j = match table.binary_search_by(|probe| {
            probe.partial_cmp(&s).unwrap_or(std::cmp::Ordering::Less)
        }) {
            Ok(j) => j,
            Err(j) => j.saturating_sub(1),
        };
        if j >= TABLE_SAMPLES {
            j = TABLE_SAMPLES - 1;
        }
        let span = table[j + 1] - table[j];
        let frac = if span > 0.0 { (s - table[j]) / span } else { 0.0 };
        let t = (j as f64 + frac) / TABLE_SAMPLES as f64;
        (lo, t)
    }

    pub fn position(&self, s: f64) -> (f64, f64) {
        let (i, t) = self.locate(s);
        bezier_point(t, &self.segments[i].control_points)
    }

    pub fn yaw(&self, s: f64) -> f64 {
        let (i, t) = self.locate(s);
        let d1 = derivative_control_points(&self.segments[i].control_points);
        let (dx, dy) = bezier_point(t, &d1);
        dy.atan2(dx)
    }

    pub fn curvature(&self, s: f64) -> f64 {
        let (i, t) = self.locate(s);
        let d1 = derivative_control_points(&self.segments[i].control_points);
        let d2 = derivative_control_points(&d1);
        let (dx, dy) = bezier_point(t, &d1);
        let (ddx, ddy) = bezier_point(t, &d2);
        let denominator = (dx * dx + dy * dy).powf(1.5);
        if denominator < 1e-12 {
            return 0.0;
        }
        (dx * ddy - dy * ddx) / denominator
    }
}
