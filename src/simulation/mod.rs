//! Simulation loop
//!
//! Strict sequential tick process: controller output feeds the vehicle
//! model, the new pose is checked against the map and the goal, and each
//! tick appends one trajectory sample. The run owns every core entity,
//! so nothing here is shared or locked.
//!
//! State machine: Initializing -> Running -> {GoalReached, Collided,
//! TimedOut}. Terminal states are final.

pub mod speed;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::common::{NavError, NavResult, Point2D, VehicleState};
use crate::config::ScenarioConfig;
use crate::course::{Course, CourseBuilder};
use crate::grid_map::GridMap;
use crate::path_planning::AStarPlanner;
use crate::path_tracking::StanleyController;
use crate::vehicle::BicycleModel;
pub use speed::SpeedPolicy;

/// Terminal state of a simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    GoalReached,
    Collided,
    TimedOut,
}

/// One recorded tick of the trajectory
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrajectorySample {
    /// Simulated time [s]
    pub t: f64,
    pub state: VehicleState,
    /// Signed cross-track error at this tick [m]
    pub cross_track: f64,
}

/// Immutable record of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub termination: Termination,
    pub trajectory: Vec<TrajectorySample>,
    /// Ticks executed before termination
    pub ticks: usize,
    /// Simulated time at termination [s]
    pub elapsed: f64,
    /// Largest cross-track error magnitude seen during the run [m]
    pub max_cross_track: f64,
    /// Vehicle position at the moment of collision, if any
    pub collision_point: Option<Point2D>,
}

/// Per-run simulation parameters
#[derive(Debug, Clone)]
pub struct SimParams {
    /// Tick interval [s]
    pub dt: f64,
    pub goal: Point2D,
    /// Goal tolerance radius [m]
    pub goal_radius: f64,
    /// Cooperative timeout budget, checked once per tick
    pub max_ticks: usize,
}

impl SimParams {
    pub fn validate(&self) -> NavResult<()> {
        if self.dt <= 0.0 {
            return Err(NavError::InvalidParameter("dt must be positive".to_string()));
        }
        if self.goal_radius <= 0.0 {
            return Err(NavError::InvalidParameter(
                "goal_radius must be positive".to_string(),
            ));
        }
        if self.max_ticks == 0 {
            return Err(NavError::InvalidParameter(
                "max_ticks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Initializing,
    Running,
    Terminated(Termination),
}

/// Drives one vehicle along one course until a terminal state
pub struct Simulator<'a> {
    map: &'a GridMap,
    course: Course,
    model: BicycleModel,
    controller: StanleyController,
    speed: SpeedPolicy,
    params: SimParams,
    phase: Phase,
}

impl<'a> Simulator<'a> {
    pub fn new(
        map: &'a GridMap,
        course: Course,
        model: BicycleModel,
        controller: StanleyController,
        speed: SpeedPolicy,
        params: SimParams,
    ) -> NavResult<Self> {
        params.validate()?;
        speed.validate()?;
        Ok(Simulator {
            map,
            course,
            model,
            controller,
            speed,
            params,
            phase: Phase::Initializing,
        })
    }

    /// Run the loop to termination.
    ///
    /// Collisions and timeouts are outcomes, not errors; only contract
    /// violations (e.g. an empty course) surface as `Err`.
    pub fn run(mut self, initial: VehicleState) -> NavResult<SimulationResult> {
        use crate::common::SteeringController;

        debug_assert_eq!(self.phase, Phase::Initializing);
        self.controller.reset();
        self.phase = Phase::Running;

        let mut state = initial;
        let mut trajectory = Vec::with_capacity(self.params.max_ticks.min(65536) + 1);
        let mut max_cross_track: f64 = 0.0;
        let mut collision_point = None;
        let mut ticks = 0;

        for tick in 0..self.params.max_ticks {
            let update = self.controller.track(&state, &self.course)?;
            // Each sample pairs a state with the error measured at that
            // same state, so the pre-step state is recorded here and the
            // terminal state after the loop
            trajectory.push(TrajectorySample {
                t: tick as f64 * self.params.dt,
                state,
                cross_track: update.cross_track,
            });
            max_cross_track = max_cross_track.max(update.cross_track.abs());

            let speed_cmd = self.speed.target_speed(&self.course, update.target_index);
            state = self.model.step(&state, update.steer, speed_cmd, self.params.dt);
            ticks = tick + 1;
            let t = ticks as f64 * self.params.dt;

            if tick % 100 == 0 {
                debug!(
                    "tick {}: pos ({:.2}, {:.2}), v {:.2}, cross-track {:.3}",
                    tick, state.x, state.y, state.v, update.cross_track
                );
            }

            if self.collided(&state) {
                warn!(
                    "collision at ({:.2}, {:.2}) after {:.1}s",
                    state.x, state.y, t
                );
                collision_point = Some(state.position());
                self.phase = Phase::Terminated(Termination::Collided);
                break;
            }

            if state.position().distance(&self.params.goal) < self.params.goal_radius {
                info!("goal reached after {:.1}s ({} ticks)", t, ticks);
                self.phase = Phase::Terminated(Termination::GoalReached);
                break;
            }
        }

        let final_update = self.controller.track(&state, &self.course)?;
        trajectory.push(TrajectorySample {
            t: ticks as f64 * self.params.dt,
            state,
            cross_track: final_update.cross_track,
        });
        max_cross_track = max_cross_track.max(final_update.cross_track.abs());

        let termination = match self.phase {
            Phase::Terminated(termination) => termination,
            _ => {
                warn!("tick budget of {} exhausted", self.params.max_ticks);
                Termination::TimedOut
            }
        };

        Ok(SimulationResult {
            termination,
            trajectory,
            ticks,
            elapsed: ticks as f64 * self.params.dt,
            max_cross_track,
            collision_point,
        })
    }

    fn collided(&self, state: &VehicleState) -> bool {
        let params = self.model.params();
        if params.length > 0.0 && params.width > 0.0 {
            self.map
                .footprint_collides(&state.pose(), params.length, params.width)
        } else {
            self.map.is_occupied_world(state.position())
        }
    }
}

/// Outcome of a full plan-then-simulate scenario
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScenarioReport {
    /// The goal was unreachable on the map; no simulation was run
    PlanningFailed { reason: String },
    /// Planning succeeded and the loop ran to a terminal state
    Completed {
        result: SimulationResult,
        /// Planned course length [m]
        course_length: f64,
    },
}

/// Plan a route for the scenario and track it to termination.
///
/// An unreachable goal is recovered here into
/// `ScenarioReport::PlanningFailed`; malformed configuration surfaces
/// as `Err` immediately.
pub fn run_scenario(config: &ScenarioConfig) -> NavResult<ScenarioReport> {
    config.validate()?;

    let map = config.map.build()?;
    let (min_x, min_y, max_x, max_y) = map.extent();
    info!(
        "map loaded: {}x{} cells at {} m/cell, extent [{:.1}, {:.1}] x [{:.1}, {:.1}]",
        map.width(),
        map.height(),
        map.resolution(),
        min_x,
        max_x,
        min_y,
        max_y
    );

    // Plan on a clearance-inflated copy so the route stays wide enough
    // for the vehicle footprint the loop later collision-checks
    let clearance = config.clearance();
    let planning_map = map.inflated(clearance);
    if clearance > 0.0 {
        info!("planning with {:.2} m obstacle clearance", clearance);
    }

    let planner = AStarPlanner::new(config.planner_config());
    let waypoints = match planner.plan(&planning_map, config.start.position(), config.goal) {
        Ok(waypoints) => waypoints,
        Err(NavError::Unreachable(reason)) => {
            warn!("planning failed: {}", reason);
            return Ok(ScenarioReport::PlanningFailed { reason });
        }
        Err(e) => return Err(e),
    };
    info!("planned {} raw waypoints", waypoints.len());

    let builder = CourseBuilder::new(config.course.clone())?;
    let course = builder.refine(&waypoints)?;
    let course_length = course.total_length();
    info!(
        "course: {} samples over {:.1} m",
        course.len(),
        course_length
    );

    let model = BicycleModel::new(config.vehicle.clone(), config.integrator)?;
    let controller = StanleyController::new(config.stanley_config())?;
    let simulator = Simulator::new(
        &map,
        course,
        model,
        controller,
        config.speed.clone(),
        config.sim_params(),
    )?;

    let result = simulator.run(VehicleState::from_pose(config.start, 0.0))?;
    info!(
        "run finished: {:?} after {:.1}s, max cross-track {:.3} m",
        result.termination, result.elapsed, result.max_cross_track
    );
    Ok(ScenarioReport::Completed { result, course_length })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Waypoint;
    use crate::course::CourseConfig;
    use crate::path_tracking::StanleyConfig;
    use crate::vehicle::{Integrator, VehicleParams};

    fn vehicle_params() -> VehicleParams {
        VehicleParams {
            wheelbase: 2.5,
            max_steer: std::f64::consts::FRAC_PI_4,
            max_speed: 5.0,
            length: 0.0,
            width: 0.0,
        }
    }

    fn straight_course(length: f64) -> Course {
        let builder = CourseBuilder::new(CourseConfig::default()).unwrap();
        builder
            .refine(&[Waypoint::new(0.0, 0.0), Waypoint::new(length, 0.0)])
            .unwrap()
    }

    fn simulator(map: &GridMap, course: Course, params: SimParams) -> Simulator<'_> {
        let model = BicycleModel::new(vehicle_params(), Integrator::Rk2).unwrap();
        let controller = StanleyController::new(StanleyConfig::default()).unwrap();
        Simulator::new(
            map,
            course,
            model,
            controller,
            SpeedPolicy::Constant { target: 1.0 },
            params,
        )
        .unwrap()
    }

    #[test]
    fn test_straight_run_reaches_goal_with_decreasing_error() {
        // 100-unit straight path, 2-unit lateral start offset, dt = 0.1
        let map = GridMap::with_origin(110, 20, 1.0, -5.0, -10.0);
        let course = straight_course(100.0);
        let params = SimParams {
            dt: 0.1,
            goal: Point2D::new(100.0, 0.0),
            goal_radius: 2.0,
            max_ticks: 5000,
        };
        let result = simulator(&map, course, params).run(VehicleState::new(0.0, 2.0, 0.0, 1.0))
            .unwrap();

        assert_eq!(result.termination, Termination::GoalReached);
        // Cross-track magnitude shrinks over the early ticks
        let early: Vec<f64> = result
            .trajectory
            .iter()
            .take(40)
            .map(|s| s.cross_track.abs())
            .collect();
        assert!(early[10] < early[0]);
        assert!(early[20] < early[10]);
        assert!(early[39] < early[20]);
        assert!(result.max_cross_track >= early[0]);
    }

    #[test]
    fn test_wall_ahead_terminates_collided() {
        // Free corridor with a wall the course drives straight into
        let mut rows: Vec<String> = Vec::new();
        for _ in 0..11 {
            rows.push(format!("{}#{}", ".".repeat(20), ".".repeat(9)));
        }
        let row_refs: Vec<&str> = rows.iter().map(|r| r.as_str()).collect();
        let map = GridMap::from_rows(&row_refs, 1.0).unwrap();

        let builder = CourseBuilder::new(CourseConfig::default()).unwrap();
        let course = builder
            .refine(&[Waypoint::new(0.5, 5.5), Waypoint::new(29.0, 5.5)])
            .unwrap();
        let params = SimParams {
            dt: 0.1,
            goal: Point2D::new(29.0, 5.5),
            goal_radius: 1.0,
            max_ticks: 5000,
        };
        let result = simulator(&map, course, params)
            .run(VehicleState::new(0.5, 5.5, 0.0, 1.0))
            .unwrap();

        assert_eq!(result.termination, Termination::Collided);
        assert!(result.collision_point.is_some());
    }

    #[test]
    fn test_trajectory_pairs_state_with_its_error() {
        let map = GridMap::with_origin(110, 20, 1.0, -5.0, -10.0);
        let course = straight_course(100.0);
        let params = SimParams {
            dt: 0.1,
            goal: Point2D::new(100.0, 0.0),
            goal_radius: 2.0,
            max_ticks: 5000,
        };
        let initial = VehicleState::new(0.0, 2.0, 0.0, 1.0);
        let result = simulator(&map, course, params).run(initial).unwrap();

        // One sample per tick plus the terminal state
        assert_eq!(result.trajectory.len(), result.ticks + 1);

        let first = &result.trajectory[0];
        assert_eq!(first.t, 0.0);
        assert_eq!(first.state, initial);
        // Front-axle error of the initial pose against the y = 0 course
        assert!((first.cross_track + 2.0).abs() < 1e-9);

        let last = result.trajectory.last().unwrap();
        assert!((last.t - result.elapsed).abs() < 1e-12);
    }

    #[test]
    fn test_tiny_budget_times_out() {
        let map = GridMap::with_origin(110, 20, 1.0, -5.0, -10.0);
        let course = straight_course(100.0);
        let params = SimParams {
            dt: 0.1,
            goal: Point2D::new(100.0, 0.0),
            goal_radius: 1.0,
            max_ticks: 5,
        };
        let result = simulator(&map, course, params)
            .run(VehicleState::new(0.0, 0.0, 0.0, 1.0))
            .unwrap();

        assert_eq!(result.termination, Termination::TimedOut);
        assert_eq!(result.ticks, 5);
        assert!((result.elapsed - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_run_scenario_end_to_end() {
        let json = r#"{
            "map": {
                "rows": [
                    "....................",
                    "....................",
                    "....................",
                    "....................",
                    "....................",
                    "....................",
                    "....................",
                    "....................",
                    "....................",
                    "...................."
                ]
            },
            "start": { "x": 1.5, "y": 5.5, "yaw": 0.0 },
            "goal": { "x": 18.5, "y": 5.5 },
            "goal_radius": 1.5,
            "vehicle": { "wheelbase": 1.0, "max_steer": 0.6, "max_speed": 3.0 },
            "speed": { "policy": "constant", "target": 1.5 },
            "max_ticks": 2000
        }"#;
        let config = ScenarioConfig::from_json(json).unwrap();
        let report = run_scenario(&config).unwrap();
        match report {
            ScenarioReport::Completed { result, course_length } => {
                assert_eq!(result.termination, Termination::GoalReached);
                assert!(course_length >= 16.0);
                assert!(!result.trajectory.is_empty());
            }
            ScenarioReport::PlanningFailed { reason } => {
                panic!("unexpected planning failure: {}", reason)
            }
        }
    }

    #[test]
    fn test_narrow_gap_rejected_for_wide_vehicle() {
        // A one-cell gap in a full-height wall: passable for a point,
        // closed once the wall is inflated by the vehicle's clearance
        let json = r#"{
            "map": {
                "rows": [
                    "....#.....",
                    "....#.....",
                    "....#.....",
                    "....#.....",
                    "..........",
                    "....#.....",
                    "....#.....",
                    "....#.....",
                    "....#.....",
                    "....#....."
                ]
            },
            "start": { "x": 1.5, "y": 5.5, "yaw": 0.0 },
            "goal": { "x": 8.5, "y": 5.5 },
            "vehicle": {
                "wheelbase": 1.0,
                "max_steer": 0.6,
                "max_speed": 3.0,
                "length": 2.4,
                "width": 1.8
            },
            "speed": { "policy": "constant", "target": 1.0 }
        }"#;
        let config = ScenarioConfig::from_json(json).unwrap();
        let report = run_scenario(&config).unwrap();
        assert!(matches!(report, ScenarioReport::PlanningFailed { .. }));

        // The same scenario with clearance overridden to zero plans
        // straight through the gap
        let mut config = ScenarioConfig::from_json(json).unwrap();
        config.planner.clearance = Some(0.0);
        let report = run_scenario(&config).unwrap();
        assert!(matches!(report, ScenarioReport::Completed { .. }));
    }

    #[test]
    fn test_run_scenario_walled_goal_is_planning_failure() {
        let json = r#"{
            "map": {
                "rows": [
                    "....#....",
                    "....#....",
                    "....#....",
                    "....#....",
                    "....#...."
                ]
            },
            "start": { "x": 1.5, "y": 2.5, "yaw": 0.0 },
            "goal": { "x": 7.5, "y": 2.5 },
            "vehicle": { "wheelbase": 1.0, "max_steer": 0.6, "max_speed": 3.0 },
            "speed": { "policy": "constant", "target": 1.5 }
        }"#;
        let config = ScenarioConfig::from_json(json).unwrap();
        let report = run_scenario(&config).unwrap();
        assert!(matches!(report, ScenarioReport::PlanningFailed { .. }));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let map = GridMap::new(10, 10, 1.0);
        let course = straight_course(5.0);
        let model = BicycleModel::new(vehicle_params(), Integrator::Rk2).unwrap();
        let controller = StanleyController::new(StanleyConfig::default()).unwrap();
        let params = SimParams {
            dt: 0.0,
            goal: Point2D::new(5.0, 0.0),
            goal_radius: 1.0,
            max_ticks: 100,
        };
        assert!(Simulator::new(
            &map,
            course,
            model,
            controller,
            SpeedPolicy::Constant { target: 1.0 },
            params,
        )
        .is_err());
    }
}
