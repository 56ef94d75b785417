//! Common types, errors and traits shared by every module

pub mod error;
pub mod traits;
pub mod types;

pub use error::{NavError, NavResult};
pub use traits::{PathPlanner, SteeringController};
pub use types::{normalize_angle, GridCoord, Point2D, Pose2D, VehicleState, Waypoint};
