//! Kinematic bicycle vehicle model
//!
//! Pure state propagation: heading rate is v / L * tan(delta), position
//! integrates the heading at the commanded speed. Commands are clamped to
//! the vehicle limits before integration. No internal state is kept, so
//! the same (state, command, dt) always produces the same next state.

use serde::{Deserialize, Serialize};

use crate::common::{NavError, NavResult, VehicleState};

/// Physical vehicle parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VehicleParams {
    /// Distance between axles [m]
    pub wheelbase: f64,
    /// Maximum steering angle magnitude [rad]
    pub max_steer: f64,
    /// Maximum forward speed [m/s]
    pub max_speed: f64,
    /// Footprint length [m], used for collision checks
    #[serde(default = "default_length")]
    pub length: f64,
    /// Footprint width [m], used for collision checks
    #[serde(default = "default_width")]
    pub width: f64,
}

fn default_length() -> f64 {
    0.0
}

fn default_width() -> f64 {
    0.0
}

impl VehicleParams {
    pub fn validate(&self) -> NavResult<()> {
        if self.wheelbase <= 0.0 {
            return Err(NavError::InvalidParameter(
                "wheelbase must be positive".to_string(),
            ));
        }
        if self.max_steer <= 0.0 || self.max_steer >= std::f64::consts::FRAC_PI_2 {
            return Err(NavError::InvalidParameter(
                "max_steer must lie in (0, pi/2)".to_string(),
            ));
        }
        if self.max_speed <= 0.0 {
            return Err(NavError::InvalidParameter(
                "max_speed must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Integration scheme for the state update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Integrator {
    Euler,
    /// Midpoint method; tracks curvature better at larger dt
    Rk2,
}

impl Default for Integrator {
    fn default() -> Self {
        Integrator::Rk2
    }
}

/// Kinematic bicycle model
#[derive(Debug, Clone)]
pub struct BicycleModel {
    params: VehicleParams,
    integrator: Integrator,
}

impl BicycleModel {
    pub fn new(params: VehicleParams, integrator: Integrator) -> NavResult<Self> {
        params.validate()?;
        Ok(BicycleModel { params, integrator })
    }

    pub fn params(&self) -> &VehicleParams {
        &self.params
    }

    /// Advance the state by `dt` under a steering and speed command.
    ///
    /// Steering is clamped to the maximum magnitude, speed to
    /// [0, max_speed]. With dt = 0 the state is returned unchanged apart
    /// from the recorded (clamped) commands.
    pub fn step(
        &self,
        state: &VehicleState,
        steer_cmd: f64,
        speed_cmd: f64,
        dt: f64,
    ) -> VehicleState {
        let steer = steer_cmd.clamp(-self.params.max_steer, self.params.max_steer);
        let v = speed_cmd.clamp(0.0, self.params.max_speed);
        let yaw_rate = v / self.params.wheelbase * steer.tan();

        let (x, y, yaw) = match self.integrator {
            Integrator::Euler => (
                state.x + v * state.yaw.cos() * dt,
                state.y + v * state.yaw.sin() * dt,
                state.yaw + yaw_rate * dt,
            ),
            Integrator::Rk2 => {
                // Evaluate position advance at the half-step heading
                let mid_yaw = state.yaw + 0.5 * yaw_rate * dt;
                (
                    state.x + v * mid_yaw.cos() * dt,
                    state.y + v * mid_yaw.sin() * dt,
                    state.yaw + yaw_rate * dt,
                )
            }
        };

        VehicleState { x, y, yaw, v, steer }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn params() -> VehicleParams {
        VehicleParams {
            wheelbase: 2.5,
            max_steer: PI / 4.0,
            max_speed: 10.0,
            length: 4.0,
            width: 2.0,
        }
    }

    #[test]
    fn test_zero_dt_is_idempotent() {
        let model = BicycleModel::new(params(), Integrator::Rk2).unwrap();
        let state = VehicleState { x: 1.0, y: 2.0, yaw: 0.3, v: 5.0, steer: 0.0 };
        let next = model.step(&state, 0.0, 5.0, 0.0);
        assert_eq!(next, state);
    }

    #[test]
    fn test_straight_motion() {
        let model = BicycleModel::new(params(), Integrator::Rk2).unwrap();
        let state = VehicleState::new(0.0, 0.0, 0.0, 0.0);
        let next = model.step(&state, 0.0, 2.0, 0.5);
        assert_relative_eq!(next.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(next.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(next.yaw, 0.0, epsilon = 1e-12);
        assert_relative_eq!(next.v, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_command_clamping() {
        let model = BicycleModel::new(params(), Integrator::Rk2).unwrap();
        let state = VehicleState::new(0.0, 0.0, 0.0, 0.0);
        let next = model.step(&state, 10.0, 100.0, 0.1);
        assert_relative_eq!(next.steer, PI / 4.0, epsilon = 1e-12);
        assert_relative_eq!(next.v, 10.0, epsilon = 1e-12);

        let reversed = model.step(&state, -10.0, -5.0, 0.1);
        assert_relative_eq!(reversed.steer, -PI / 4.0, epsilon = 1e-12);
        assert_eq!(reversed.v, 0.0);
    }

    #[test]
    fn test_turning_radius() {
        // Constant steering describes a circle of radius L / tan(delta)
        let model = BicycleModel::new(params(), Integrator::Rk2).unwrap();
        let steer: f64 = 0.2;
        let radius = params().wheelbase / steer.tan();
        let v = 2.0;
        let dt = 0.01;

        let mut state = VehicleState::new(0.0, 0.0, 0.0, v);
        let steps = ((2.0 * PI * radius / v) / dt).round() as usize;
        for _ in 0..steps {
            state = model.step(&state, steer, v, dt);
        }
        // After one full revolution the vehicle is back near the start
        assert!(state.position().distance(&crate::common::Point2D::origin()) < 0.1);
    }

    #[test]
    fn test_rk2_beats_euler_on_curvature() {
        let steer: f64 = 0.3;
        let v = 5.0;
        let dt = 0.2;
        let radius = params().wheelbase / steer.tan();

        let reference_center_error = |integrator: Integrator| {
            let model = BicycleModel::new(params(), integrator).unwrap();
            let mut state = VehicleState::new(0.0, 0.0, 0.0, v);
            for _ in 0..20 {
                state = model.step(&state, steer, v, dt);
            }
            // Distance from the true turning-circle center (0, radius)
            let d = ((state.x).powi(2) + (state.y - radius).powi(2)).sqrt();
            (d - radius).abs()
        };

        assert!(
            reference_center_error(Integrator::Rk2)
                < reference_center_error(Integrator::Euler)
        );
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut bad = params();
        bad.wheelbase = 0.0;
        assert!(BicycleModel::new(bad, Integrator::Rk2).is_err());

        let mut bad = params();
        bad.max_steer = PI;
        assert!(BicycleModel::new(bad, Integrator::Rk2).is_err());
    }
}
