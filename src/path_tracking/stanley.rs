//! Stanley steering control
//!
//! Steering law: delta = heading_error + atan2(k * cross_track_error,
//! v + k_soft), with errors measured at the front axle. The nearest
//! course sample is found by a bounded forward search seeded from the
//! previous tick's match, so the matched index never regresses while the
//! vehicle moves forward along the course.
//!
//! Ref:
//!     - Stanley: The robot that won the DARPA grand challenge
//!     - Automatic Steering Methods for Autonomous Automobile Path Tracking

use crate::common::{normalize_angle, NavError, NavResult, SteeringController, VehicleState};
use crate::course::Course;

/// Stanley controller parameters
#[derive(Debug, Clone)]
pub struct StanleyConfig {
    /// Cross-track error gain
    pub gain: f64,
    /// Speed softening term, keeps atan2 well-behaved near zero speed
    pub softening: f64,
    /// Distance from rear to front axle [m]
    pub wheelbase: f64,
    /// Steering output clamp [rad]
    pub max_steer: f64,
    /// Forward search window (samples) for the nearest-point match
    pub search_window: usize,
}

impl Default for StanleyConfig {
    fn default() -> Self {
        Self {
            gain: 1.0,
            softening: 0.5,
            wheelbase: 2.5,
            max_steer: std::f64::consts::FRAC_PI_4,
            search_window: 50,
        }
    }
}

/// One tick of tracking output
#[derive(Debug, Clone, Copy)]
pub struct TrackingUpdate {
    /// Clamped steering command [rad]
    pub steer: f64,
    /// Index of the matched course sample
    pub target_index: usize,
    /// Signed lateral distance from the front axle to the course [m]
    pub cross_track: f64,
    /// Wrapped heading error [rad]
    pub heading_error: f64,
}

/// Stanley path-tracking controller
pub struct StanleyController {
    config: StanleyConfig,
    last_index: usize,
    seeded: bool,
}

impl StanleyController {
    pub fn new(config: StanleyConfig) -> NavResult<Self> {
        if config.gain <= 0.0 {
            return Err(NavError::InvalidParameter(
                "stanley gain must be positive".to_string(),
            ));
        }
        if config.softening <= 0.0 {
            return Err(NavError::InvalidParameter(
                "stanley softening term must be positive".to_string(),
            ));
        }
        if config.search_window == 0 {
            return Err(NavError::InvalidParameter(
                "stanley search window must be at least 1".to_string(),
            ));
        }
        Ok(StanleyController { config, last_index: 0, seeded: false })
    }

    /// Compute the full tracking update for the current state.
    ///
    /// Fails with `NavError::NoPath` when the course is empty; that means
    /// the planner/post-processor contract was violated upstream.
    pub fn track(&mut self, state: &VehicleState, course: &Course) -> NavResult<TrackingUpdate> {
        if course.is_empty() {
            return Err(NavError::NoPath(
                "stanley controller called with an empty course".to_string(),
            ));
        }

        let (fx, fy) = self.front_axle(state);
        let target_index = self.match_index(fx, fy, course);
        // The match never regresses once seeded
        debug_assert!(target_index >= self.last_index || !self.seeded);
        self.last_index = target_index;
        self.seeded = true;

        let target = &course.points()[target_index];

        // Signed cross-track error of the front axle; positive when the
        // course lies to the left of the vehicle
        let dx = fx - target.x;
        let dy = fy - target.y;
        let cross_track = state.yaw.sin() * dx - state.yaw.cos() * dy;

        let heading_error = normalize_angle(target.yaw - state.yaw);
        let correction = (self.config.gain * cross_track).atan2(state.v + self.config.softening);
        let steer = (heading_error + correction)
            .clamp(-self.config.max_steer, self.config.max_steer);

        Ok(TrackingUpdate { steer, target_index, cross_track, heading_error })
    }

    fn front_axle(&self, state: &VehicleState) -> (f64, f64) {
        (
            state.x + self.config.wheelbase * state.yaw.cos(),
            state.y + self.config.wheelbase * state.yaw.sin(),
        )
    }

    /// Nearest-sample search. The first call scans the whole course to
    /// seed the match; afterwards only a bounded forward window from the
    /// previous match is searched.
    fn match_index(&self, fx: f64, fy: f64, course: &Course) -> usize {
        let points = course.points();
        let (from, to) = if self.seeded {
            (
                self.last_index,
                (self.last_index + self.config.search_window).min(points.len() - 1),
            )
        } else {
            (0, points.len() - 1)
        };

        let mut best = from;
        let mut best_d = f64::INFINITY;
        for (i, p) in points.iter().enumerate().take(to + 1).skip(from) {
            let d = (fx - p.x).powi(2) + (fy - p.y).powi(2);
            if d < best_d {
                best_d = d;
                best = i;
            }
        }
        best
    }
}

impl SteeringController for StanleyController {
    fn compute_steering(&mut self, state: &VehicleState, course: &Course) -> NavResult<f64> {
        Ok(self.track(state, course)?.steer)
    }

    fn reset(&mut self) {
        self.last_index = 0;
        self.seeded = false;
    }
}
