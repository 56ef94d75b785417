//! Path post-processing
//!
//! Turns the planner's raw waypoint sequence into a drivable course:
//! redundant collinear waypoints are dropped, a smooth interpolant is
//! fitted through the survivors, and the curve is resampled at a fixed
//! arc-length step with heading and curvature filled in at every sample.

pub mod bezier;
pub mod cubic_spline;

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::common::{NavError, NavResult, Point2D, Waypoint};
use bezier::BezierPath;
use cubic_spline::CubicSpline2D;

/// Smoothing method for the course interpolant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Smoothing {
    CubicSpline,
    Bezier,
}

/// Configuration for course generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CourseConfig {
    /// Arc-length sampling step [m]
    #[serde(default = "default_step")]
    pub step: f64,
    /// Upper bound on the distance between consecutive samples [m]
    #[serde(default = "default_max_step")]
    pub max_step: f64,
    #[serde(default = "default_smoothing")]
    pub smoothing: Smoothing,
}

fn default_step() -> f64 {
    0.1
}

fn default_max_step() -> f64 {
    0.5
}

fn default_smoothing() -> Smoothing {
    Smoothing::CubicSpline
}

impl Default for CourseConfig {
    fn default() -> Self {
        Self {
            step: default_step(),
            max_step: default_max_step(),
            smoothing: default_smoothing(),
        }
    }
}

/// One sample of the processed course
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoursePoint {
    pub x: f64,
    pub y: f64,
    /// Tangent heading [rad]
    pub yaw: f64,
    /// Signed curvature [1/m]
    pub curvature: f64,
    /// Arc length from the course start [m]
    pub s: f64,
}

impl CoursePoint {
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// Arc-length-parameterized course, immutable once built
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    points: Vec<CoursePoint>,
}

impl Course {
    pub fn points(&self) -> &[CoursePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CoursePoint> {
        self.points.get(index)
    }

    pub fn last(&self) -> Option<&CoursePoint> {
        self.points.last()
    }

    pub fn total_length(&self) -> f64 {
        self.points.last().map(|p| p.s).unwrap_or(0.0)
    }
}

/// Builds a `Course` from raw planner waypoints
pub struct CourseBuilder {
    config: CourseConfig,
}

impl CourseBuilder {
    pub fn new(config: CourseConfig) -> NavResult<Self> {
        if config.step <= 0.0 {
            return Err(NavError::InvalidParameter(
                "course step must be positive".to_string(),
            ));
        }
        if config.step > config.max_step {
            return Err(NavError::InvalidParameter(format!(
                "course step {} exceeds max_step {}",
                config.step, config.max_step
            )));
        }
        Ok(CourseBuilder { config })
    }

    /// Refine a raw waypoint sequence into a dense course.
    ///
    /// Raw paths of two or fewer distinct waypoints are linearly
    /// interpolated without curvature fitting.
    pub fn refine(&self, raw: &[Waypoint]) -> NavResult<Course> {
        if raw.is_empty() {
            return Err(NavError::NoPath("refine called with no waypoints".to_string()));
        }

        let pruned = prune_waypoints(raw);
        debug!(
            "course: {} raw waypoints pruned to {}",
            raw.len(),
            pruned.len()
        );

        if pruned.len() == 1 {
            let p = pruned[0];
            return Ok(Course {
                points: vec![CoursePoint { x: p.x, y: p.y, yaw: 0.0, curvature: 0.0, s: 0.0 }],
            });
        }
        if pruned.len() == 2 {
            return Ok(Course { points: self.straight_line(pruned[0], pruned[1]) });
        }

        let x: Vec<f64> = pruned.iter().map(|p| p.x).collect();
        let y: Vec<f64> = pruned.iter().map(|p| p.y).collect();

        let points = match self.config.smoothing {
            Smoothing::CubicSpline => {
                let spline = CubicSpline2D::new(&x, &y)?;
                self.sample(spline.total_length(), |s| {
                    let (px, py) = spline.position(s);
                    (px, py, spline.yaw(s), spline.curvature(s))
                })
            }
            Smoothing::Bezier => {
                let path = BezierPath::new(&x, &y)?;
                self.sample(path.total_length(), |s| {
                    let (px, py) = path.position(s);
                    (px, py, path.yaw(s), path.curvature(s))
                })
            }
        };

        Ok(Course { points })
    }

    /// Sample the interpolant at the configured step, keeping the endpoint
    fn sample<F>(&self, total_length: f64, eval: F) -> Vec<CoursePoint>
    where
        F: Fn(f64) -> (f64, f64, f64, f64),
    {
        let n = (total_length / self.config.step).floor() as usize;
        let mut points = Vec::with_capacity(n + 2);
        for i in 0..=n {
            let s = i as f64 * self.config.step;
            let (x, y, yaw, curvature) = eval(s);
            points.push(CoursePoint { x, y, yaw, curvature, s });
        }
        // Close the gap to the endpoint unless the last step landed on it
        if total_length - n as f64 * self.config.step > 1e-9 {
            let (x, y, yaw, curvature) = eval(total_length);
            points.push(CoursePoint { x, y, yaw, curvature, s: total_length });
        }
        points
    }

    fn straight_line(&self, a: Waypoint, b: Waypoint) -> Vec<CoursePoint> {
        let length = a.position().distance(&b.position());
        let yaw = (b.y - a.y).atan2(b.x - a.x);
        self.sample(length, |s| {
            let t = if length > 0.0 { s / length } else { 0.0 };
            (a.x + t * (b.x - a.x), a.y + t * (b.y - a.y), yaw, 0.0)
        })
    }
}

/// Drop consecutive duplicates and collinear interior waypoints
fn prune_waypoints(raw: &[Waypoint]) -> Vec<Waypoint> {
    let mut deduped: Vec<Waypoint> = Vec::with_capacity(raw.len());
    for wp in raw {
        if deduped
            .last()
            .map_or(true, |last| last.position().distance(&wp.position()) > 1e-9)
        {
            deduped.push(*wp);
        }
    }
    if deduped.len() < 3 {
        return deduped;
    }

    let mut keep = vec![true; deduped.len()];
    for (i, (a, b, c)) in deduped.iter().tuple_windows::<(_, _, _)>().enumerate() {
        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if cross.abs() < 1e-9 {
            keep[i + 1] = false;
        }
    }
    deduped
        .into_iter()
        .zip(keep)
        .filter_map(|(wp, k)| if k { Some(wp) } else { None })
        .collect()
}
