//! Longitudinal speed policy
//!
//! The simulation loop is closed laterally by the Stanley controller; the
//! speed command comes from one of these open-loop policies instead of a
//! full longitudinal controller.

use serde::{Deserialize, Serialize};

use crate::common::{NavError, NavResult};
use crate::course::Course;

/// Speed command policy evaluated once per tick
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SpeedPolicy {
    /// Fixed target speed
    Constant { target: f64 },
    /// Target speed reduced where the upcoming course curves sharply.
    /// The reduction factor is floored at `min_factor` so the vehicle
    /// never stalls mid-course.
    CurvatureScaled {
        target: f64,
        /// Curvature-to-reduction gain [m]
        gain: f64,
        #[serde(default = "default_min_factor")]
        min_factor: f64,
        /// How many samples ahead of the match to scan for curvature
        #[serde(default = "default_lookahead")]
        lookahead: usize,
    },
}

fn default_min_factor() -> f64 {
    0.2
}

fn default_lookahead() -> usize {
    20
}

impl SpeedPolicy {
    pub fn validate(&self) -> NavResult<()> {
        match self {
            SpeedPolicy::Constant { target } => {
                if *target <= 0.0 {
                    return Err(NavError::InvalidParameter(
                        "speed target must be positive".to_string(),
                    ));
                }
            }
            SpeedPolicy::CurvatureScaled { target, gain, min_factor, .. } => {
                if *target <= 0.0 || *gain < 0.0 {
                    return Err(NavError::InvalidParameter(
                        "speed target must be positive and gain non-negative".to_string(),
                    ));
                }
                if *min_factor <= 0.0 || *min_factor > 1.0 {
                    return Err(NavError::InvalidParameter(
                        "speed min_factor must lie in (0, 1]".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Speed command for the tick, given the current course match index
    pub fn target_speed(&self, course: &Course, index: usize) -> f64 {
        match self {
            SpeedPolicy::Constant { target } => *target,
            SpeedPolicy::CurvatureScaled { target, gain, min_factor, lookahead } => {
                let points = course.points();
                let end = (index + lookahead).min(points.len().saturating_sub(1));
                let max_curvature = points[index.min(end)..=end]
                    .iter()
                    .map(|p| p.curvature.abs())
                    .fold(0.0, f64::max);
                let factor = (1.0 - gain * max_curvature).clamp(*min_factor, 1.0);
                target * factor
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Waypoint;
    use crate::course::{CourseBuilder, CourseConfig};

    fn curved_course() -> Course {
        let builder = CourseBuilder::new(CourseConfig::default()).unwrap();
        builder
            .refine(&[
                Waypoint::new(0.0, 0.0),
                Waypoint::new(10.0, 0.0),
                Waypoint::new(12.0, 4.0),
                Waypoint::new(10.0, 8.0),
                Waypoint::new(0.0, 8.0),
            ])
            .unwrap()
    }

    #[test]
    fn test_constant_policy() {
        let course = curved_course();
        let policy = SpeedPolicy::Constant { target: 3.0 };
        assert_eq!(policy.target_speed(&course, 0), 3.0);
        assert_eq!(policy.target_speed(&course, course.len() - 1), 3.0);
    }

    #[test]
    fn test_curvature_scaled_slows_in_curves() {
        let course = curved_course();
        let policy = SpeedPolicy::CurvatureScaled {
            target: 5.0,
            gain: 2.0,
            min_factor: 0.2,
            lookahead: 10,
        };

        // Straight lead-in: near-zero curvature ahead, near-full speed
        let straight_speed = policy.target_speed(&course, 0);
        // Index in the tight turn
        let apex_index = course
            .points()
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                a.curvature.abs().partial_cmp(&b.curvature.abs()).unwrap()
            })
            .map(|(i, _)| i)
            .unwrap();
        let curve_speed = policy.target_speed(&course, apex_index);

        assert!(curve_speed < straight_speed);
        // Floor keeps the vehicle moving
        assert!(curve_speed >= 5.0 * 0.2 - 1e-12);
    }

    #[test]
    fn test_lookahead_clamped_at_course_end() {
        let course = curved_course();
        let policy = SpeedPolicy::CurvatureScaled {
            target: 5.0,
            gain: 2.0,
            min_factor: 0.2,
            lookahead: 1000,
        };
        // Must not panic past the last sample
        let speed = policy.target_speed(&course, course.len() - 1);
        assert!(speed > 0.0);
    }

    #[test]
    fn test_validation() {
        assert!(SpeedPolicy::Constant { target: 0.0 }.validate().is_err());
        assert!(SpeedPolicy::Constant { target: 2.0 }.validate().is_ok());
        let bad = SpeedPolicy::CurvatureScaled {
            target: 2.0,
            gain: 1.0,
            min_factor: 0.0,
            lookahead: 5,
        };
        assert!(bad.validate().is_err());
    }
}
