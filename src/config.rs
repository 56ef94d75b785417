//! Scenario configuration
//!
//! One typed value object per simulation run. Unknown fields are
//! rejected rather than ignored, and every default is written out here
//! so a config file only needs to state what differs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::{NavError, NavResult, Point2D, Pose2D};
use crate::course::CourseConfig;
use crate::grid_map::{Connectivity, GridMap};
use crate::path_planning::AStarConfig;
use crate::path_tracking::StanleyConfig;
use crate::simulation::{SimParams, SpeedPolicy};
use crate::vehicle::{Integrator, VehicleParams};

/// Map description: ASCII occupancy rows, `#` occupied, `.` free.
/// The first row is the top of the map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapConfig {
    pub rows: Vec<String>,
    /// World units per cell
    #[serde(default = "default_resolution")]
    pub resolution: f64,
}

fn default_resolution() -> f64 {
    1.0
}

impl MapConfig {
    pub fn build(&self) -> NavResult<GridMap> {
        let rows: Vec<&str> = self.rows.iter().map(|r| r.as_str()).collect();
        GridMap::from_rows(&rows, self.resolution)
    }
}

/// Planner section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlannerConfig {
    #[serde(default = "default_connectivity")]
    pub connectivity: Connectivity,
    /// Obstacle inflation radius for planning [m]. When absent it is
    /// derived from the vehicle footprint.
    #[serde(default)]
    pub clearance: Option<f64>,
}

fn default_connectivity() -> Connectivity {
    Connectivity::Eight
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self { connectivity: default_connectivity(), clearance: None }
    }
}

/// Controller section; wheelbase and steering clamp come from the
/// vehicle section so they are stated once
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    #[serde(default = "default_gain")]
    pub gain: f64,
    #[serde(default = "default_softening")]
    pub softening: f64,
    #[serde(default = "default_search_window")]
    pub search_window: usize,
}

fn default_gain() -> f64 {
    1.0
}

fn default_softening() -> f64 {
    0.5
}

fn default_search_window() -> usize {
    50
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            gain: default_gain(),
            softening: default_softening(),
            search_window: default_search_window(),
        }
    }
}

/// Complete description of one simulation scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    pub map: MapConfig,
    /// Start pose in world coordinates
    pub start: Pose2D,
    pub goal: Point2D,
    #[serde(default = "default_goal_radius")]
    pub goal_radius: f64,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub course: CourseConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    pub vehicle: VehicleParams,
    #[serde(default)]
    pub integrator: Integrator,
    pub speed: SpeedPolicy,
    /// Tick interval [s]
    #[serde(default = "default_dt")]
    pub dt: f64,
    /// Tick budget before the run times out
    #[serde(default = "default_max_ticks")]
    pub max_ticks: usize,
}

fn default_goal_radius() -> f64 {
    1.0
}

fn default_dt() -> f64 {
    0.1
}

fn default_max_ticks() -> usize {
    10_000
}

impl ScenarioConfig {
    pub fn from_json(json: &str) -> NavResult<Self> {
        serde_json::from_str(json).map_err(|e| NavError::Config(e.to_string()))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> NavResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn validate(&self) -> NavResult<()> {
        self.vehicle.validate()?;
        self.speed.validate()?;
        self.sim_params().validate()?;
        if self.map.resolution <= 0.0 {
            return Err(NavError::InvalidParameter(
                "map resolution must be positive".to_string(),
            ));
        }
        if let Some(clearance) = self.planner.clearance {
            if clearance < 0.0 {
                return Err(NavError::InvalidParameter(
                    "planner clearance must be non-negative".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Obstacle clearance used for planning: the explicit override if
    /// set, otherwise the circumscribed radius of the vehicle footprint
    /// (zero for a point vehicle).
    pub fn clearance(&self) -> f64 {
        self.planner.clearance.unwrap_or_else(|| {
            if self.vehicle.length > 0.0 && self.vehicle.width > 0.0 {
                0.5 * (self.vehicle.length.powi(2) + self.vehicle.width.powi(2)).sqrt()
            } else {
                0.0
            }
        })
    }

    pub fn planner_config(&self) -> AStarConfig {
        AStarConfig { connectivity: self.planner.connectivity }
    }

    pub fn stanley_config(&self) -> StanleyConfig {
        StanleyConfig {
            gain: self.controller.gain,
            softening: self.controller.softening,
            wheelbase: self.vehicle.wheelbase,
            max_steer: self.vehicle.max_steer,
            search_window: self.controller.search_window,
        }
    }

    pub fn sim_params(&self) -> SimParams {
        SimParams {
            dt: self.dt,
            goal: self.goal,
            goal_radius: self.goal_radius,
            max_ticks: self.max_ticks,
        }
    }
}
