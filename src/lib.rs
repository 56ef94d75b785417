//! nav_sim - grid map path planning and path tracking simulation
//!
//! Given an occupancy grid map and a start/goal pair, this crate plans a
//! collision-free route with A*, refines it into an arc-length
//! parameterized course, and drives a simulated kinematic bicycle along
//! it with a Stanley steering controller. The run produces an immutable
//! result record: trajectory, terminal status and tracking metrics.

// Core modules
pub mod common;
pub mod config;
pub mod grid_map;

// Algorithm modules
pub mod course;
pub mod path_planning;
pub mod path_tracking;
pub mod simulation;
pub mod vehicle;

// Re-export common types for convenience
pub use common::{NavError, NavResult, PathPlanner, SteeringController};
pub use common::{Point2D, Pose2D, VehicleState, Waypoint};
pub use config::ScenarioConfig;
pub use course::{Course, CourseBuilder, CourseConfig};
pub use grid_map::{Connectivity, GridMap};
pub use path_planning::{AStarConfig, AStarPlanner};
pub use path_tracking::{StanleyConfig, StanleyController};
pub use simulation::{
    run_scenario, ScenarioReport, SimParams, SimulationResult, Simulator, SpeedPolicy,
    Termination,
};
pub use vehicle::{BicycleModel, Integrator, VehicleParams};
