//! Traits at the planner and controller seams

use crate::common::error::NavError;
use crate::common::types::{Point2D, VehicleState, Waypoint};
use crate::course::Course;
use crate::grid_map::GridMap;

/// Trait for grid-based path planning algorithms
pub trait PathPlanner {
    /// Plan a route from start to goal in world coordinates
    fn plan(
        &self,
        map: &GridMap,
        start: Point2D,
        goal: Point2D,
    ) -> Result<Vec<Waypoint>, NavError>;
}

/// Trait for lateral path-tracking controllers
pub trait SteeringController {
    /// Compute a steering angle for the current state against the course
    fn compute_steering(
        &mut self,
        state: &VehicleState,
        course: &Course,
    ) -> Result<f64, NavError>;

    /// Forget any per-run seeding state
    fn reset(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DummyPlanner;

    impl PathPlanner for DummyPlanner {
        fn plan(
            &self,
            _map: &GridMap,
            start: Point2D,
            goal: Point2D,
        ) -> Result<Vec<Waypoint>, NavError> {
            Ok(vec![start.into(), goal.into()])
        }
    }

    #[test]
    fn test_path_planner_trait() {
        let map = GridMap::new(4, 4, 1.0);
        let planner = DummyPlanner;
        let result = planner.plan(&map, Point2D::origin(), Point2D::new(1.0, 1.0));
        assert_eq!(result.unwrap().len(), 2);
    }
}
