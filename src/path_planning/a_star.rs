//! A* path planning over an occupancy grid
//!
//! Classic A* with an admissible heuristic matched to the configured
//! connectivity: Euclidean for 4-connected grids, octile for 8-connected.
//! Open-set ties break on smaller heuristic first and insertion order
//! second, so the planner returns the same path for the same input.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use log::debug;
use ordered_float::OrderedFloat;

use crate::common::{GridCoord, NavError, PathPlanner, Point2D, Waypoint};
use crate::grid_map::{Connectivity, GridMap};

/// Configuration for the A* planner
#[derive(Debug, Clone)]
pub struct AStarConfig {
    pub connectivity: Connectivity,
}

impl Default for AStarConfig {
    fn default() -> Self {
        Self { connectivity: Connectivity::Eight }
    }
}

/// Search node held in storage; the open set refers to storage by index
#[derive(Debug, Clone)]
struct Node {
    coord: GridCoord,
    cost: f64,
    parent_index: Option<usize>,
}

/// Open-set entry ordered by (f, h, insertion sequence)
#[derive(Debug)]
struct OpenEntry {
    f: OrderedFloat<f64>,
    h: OrderedFloat<f64>,
    seq: u64,
    index: usize,
}

impl Eq for OpenEntry {}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.h == other.h && self.seq == other.seq
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior; ties prefer the entry
        // closer to the goal, then the earlier insertion.
        (other.f, other.h, other.seq).cmp(&(self.f, self.h, self.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* path planner
pub struct AStarPlanner {
    config: AStarConfig,
}

impl AStarPlanner {
    pub fn new(config: AStarConfig) -> Self {
        AStarPlanner { config }
    }

    /// Plan a route from `start` to `goal` (world coordinates).
    ///
    /// Returns the reconstructed start-to-goal waypoint sequence as grid
    /// cell centers, `NavError::Unreachable` if the open set empties with
    /// the goal never expanded.
    pub fn plan(
        &self,
        map: &GridMap,
        start: Point2D,
        goal: Point2D,
    ) -> Result<Vec<Waypoint>, NavError> {
        let start_cell = map.world_to_grid(start)?;
        let goal_cell = map.world_to_grid(goal)?;

        if map.is_occupied(start_cell)? {
            return Err(NavError::InvalidParameter(format!(
                "start ({:.3}, {:.3}) lies inside an obstacle",
                start.x, start.y
            )));
        }
        if map.is_occupied(goal_cell)? {
            return Err(NavError::InvalidParameter(format!(
                "goal ({:.3}, {:.3}) lies inside an obstacle",
                goal.x, goal.y
            )));
        }

        let mut storage: Vec<Node> = Vec::new();
        let mut open_set = BinaryHeap::new();
        let mut closed_set: HashSet<GridCoord> = HashSet::new();
        let mut best_cost: HashMap<GridCoord, f64> = HashMap::new();
        let mut seq: u64 = 0;

        storage.push(Node { coord: start_cell, cost: 0.0, parent_index: None });
        best_cost.insert(start_cell, 0.0);
        let h0 = self.heuristic(start_cell, goal_cell);
        open_set.push(OpenEntry {
            f: OrderedFloat(h0),
            h: OrderedFloat(h0),
            seq,
            index: 0,
        });

        let mut expansions = 0usize;
        while let Some(entry) = open_set.pop() {
            let current = storage[entry.index].clone();

            // Stale heap entries for already-expanded cells are skipped so
            // each cell is expanded at most once.
            if !closed_set.insert(current.coord) {
                continue;
            }
            expansions += 1;
            if expansions % 1000 == 0 {
                debug!(
                    "a_star: {} expansions, open set {}, closed set {}",
                    expansions,
                    open_set.len(),
                    closed_set.len()
                );
            }

            if current.coord == goal_cell {
                debug!("a_star: goal expanded after {} expansions", expansions);
                return self.reconstruct(map, entry.index, &storage);
            }

            for neighbor in map.neighbors(current.coord, self.config.connectivity) {
                if closed_set.contains(&neighbor) {
                    continue;
                }
                if !map.is_free(neighbor)? {
                    continue;
                }

                let dx = (neighbor.x - current.coord.x) as f64;
                let dy = (neighbor.y - current.coord.y) as f64;
                let tentative = current.cost + (dx * dx + dy * dy).sqrt();

                match best_cost.get(&neighbor) {
                    Some(&g) if g <= tentative => continue,
                    _ => {}
                }
                best_cost.insert(neighbor, tentative);

                storage.push(Node {
                    coord: neighbor,
                    cost: tentative,
                    parent_index: Some(entry.index),
                });
                seq += 1;
                let h = self.heuristic(neighbor, goal_cell);
                open_set.push(OpenEntry {
                    f: OrderedFloat(tentative + h),
                    h: OrderedFloat(h),
                    seq,
                    index: storage.len() - 1,
                });
            }
        }

        Err(NavError::Unreachable(format!(
            "open set exhausted after {} expansions",
            expansions
        )))
    }

    /// Admissible remaining-cost estimate in cell units
    fn heuristic(&self, from: GridCoord, to: GridCoord) -> f64 {
        let dx = (from.x - to.x).abs() as f64;
        let dy = (from.y - to.y).abs() as f64;
        match self.config.connectivity {
            Connectivity::Four => (dx * dx + dy * dy).sqrt(),
            Connectivity::Eight => {
                // Octile distance: diagonal moves cover min(dx, dy)
                let (lo, hi) = if dx < dy { (dx, dy) } else { (dy, dx) };
                hi + (std::f64::consts::SQRT_2 - 1.0) * lo
            }
        }
    }

    fn reconstruct(
        &self,
        map: &GridMap,
        goal_index: usize,
        storage: &[Node],
    ) -> Result<Vec<Waypoint>, NavError> {
        let mut waypoints = Vec::new();
        let mut current = Some(goal_index);
        while let Some(index) = current {
            let node = &storage[index];
            let world = map.grid_to_world(node.coord)?;
            waypoints.push(Waypoint::new(world.x, world.y));
            current = node.parent_index;
        }
        waypoints.reverse();
        Ok(waypoints)
    }
}

impl PathPlanner for AStarPlanner {
    fn plan(
        &self,
        map: &GridMap,
        start: Point2D,
        goal: Point2D,
    ) -> Result<Vec<Waypoint>, NavError> {
        AStarPlanner::plan(self, map, start, goal)
    }
}
