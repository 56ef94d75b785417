//! Occupancy grid map with world/grid coordinate transforms
//!
//! The map is read-only after construction: the planner queries cell
//! occupancy and neighbor cells, the simulation loop queries vehicle
//! footprint collisions. World coordinates map to cells through a
//! resolution + origin-offset transform; the inverse transform returns
//! cell centers, so the two transforms stay consistent for the map's
//! lifetime.

use serde::{Deserialize, Serialize};

use crate::common::{GridCoord, NavError, NavResult, Point2D, Pose2D};

/// Neighbor connectivity for grid expansion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Four,
    Eight,
}

impl Connectivity {
    /// Motion model as (dx, dy, step cost) triples
    pub fn motion_model(&self) -> &'static [(i32, i32, f64)] {
        const SQRT2: f64 = std::f64::consts::SQRT_2;
        const FOUR: [(i32, i32, f64); 4] =
            [(1, 0, 1.0), (0, 1, 1.0), (-1, 0, 1.0), (0, -1, 1.0)];
        const EIGHT: [(i32, i32, f64); 8] = [
            (1, 0, 1.0),
            (0, 1, 1.0),
            (-1, 0, 1.0),
            (0, -1, 1.0),
            (1, 1, SQRT2),
            (-1, 1, SQRT2),
            (1, -1, SQRT2),
            (-1, -1, SQRT2),
        ];
        match self {
            Connectivity::Four => &FOUR,
            Connectivity::Eight => &EIGHT,
        }
    }
}

/// Static occupancy grid
#[derive(Debug, Clone)]
pub struct GridMap {
    width: usize,
    height: usize,
    resolution: f64,
    min_x: f64,
    min_y: f64,
    /// Row-major occupancy, true = occupied
    cells: Vec<bool>,
}

impl GridMap {
    /// Create an all-free map of `width` x `height` cells with the world
    /// origin at the lower-left corner.
    pub fn new(width: usize, height: usize, resolution: f64) -> Self {
        Self::with_origin(width, height, resolution, 0.0, 0.0)
    }

    pub fn with_origin(
        width: usize,
        height: usize,
        resolution: f64,
        min_x: f64,
        min_y: f64,
    ) -> Self {
        GridMap {
            width,
            height,
            resolution,
            min_x,
            min_y,
            cells: vec![false; width * height],
        }
    }

    /// Parse a map from ASCII rows, `#` occupied and `.` free.
    ///
    /// The first row is the top of the map (highest y), matching how the
    /// rows read on screen.
    pub fn from_rows(rows: &[&str], resolution: f64) -> NavResult<Self> {
        if rows.is_empty() {
            return Err(NavError::InvalidParameter("map has no rows".to_string()));
        }
        let width = rows[0].chars().count();
        if width == 0 {
            return Err(NavError::InvalidParameter("map row is empty".to_string()));
        }
        let height = rows.len();
        let mut map = Self::new(width, height, resolution);
        for (row_idx, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(NavError::InvalidParameter(format!(
                    "map row {} has {} cells, expected {}",
                    row_idx,
                    row.chars().count(),
                    width
                )));
            }
            let y = height - 1 - row_idx;
            for (x, ch) in row.chars().enumerate() {
                match ch {
                    '#' => map.cells[y * width + x] = true,
                    '.' => {}
                    other => {
                        return Err(NavError::InvalidParameter(format!(
                            "unknown map cell '{}' at row {}, column {}",
                            other, row_idx, x
                        )))
                    }
                }
            }
        }
        Ok(map)
    }

    /// Mark a cell as occupied. Intended for map construction only; the
    /// map must not change once planning has started.
    pub fn set_occupied(&mut self, coord: GridCoord) -> NavResult<()> {
        let idx = self.index(coord)?;
        self.cells[idx] = true;
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// World extent as (min_x, min_y, max_x, max_y)
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        (
            self.min_x,
            self.min_y,
            self.min_x + self.width as f64 * self.resolution,
            self.min_y + self.height as f64 * self.resolution,
        )
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as usize) < self.width
            && (coord.y as usize) < self.height
    }

    fn index(&self, coord: GridCoord) -> NavResult<usize> {
        if !self.contains(coord) {
            return Err(NavError::OutOfBounds {
                x: coord.x as f64,
                y: coord.y as f64,
            });
        }
        Ok(coord.y as usize * self.width + coord.x as usize)
    }

    pub fn is_free(&self, coord: GridCoord) -> NavResult<bool> {
        Ok(!self.cells[self.index(coord)?])
    }

    pub fn is_occupied(&self, coord: GridCoord) -> NavResult<bool> {
        Ok(self.cells[self.index(coord)?])
    }

    pub fn world_to_grid(&self, point: Point2D) -> NavResult<GridCoord> {
        let coord = GridCoord::new(
            ((point.x - self.min_x) / self.resolution).floor() as i32,
            ((point.y - self.min_y) / self.resolution).floor() as i32,
        );
        if !self.contains(coord) {
            return Err(NavError::OutOfBounds { x: point.x, y: point.y });
        }
        Ok(coord)
    }

    /// World position of the cell center
    pub fn grid_to_world(&self, coord: GridCoord) -> NavResult<Point2D> {
        if !self.contains(coord) {
            return Err(NavError::OutOfBounds {
                x: coord.x as f64,
                y: coord.y as f64,
            });
        }
        Ok(Point2D::new(
            self.min_x + (coord.x as f64 + 0.5) * self.resolution,
            self.min_y + (coord.y as f64 + 0.5) * self.resolution,
        ))
    }

    /// Copy of the map with every obstacle dilated by `radius` [m].
    ///
    /// Planning on the inflated map keeps routes clear of cells the
    /// vehicle body would clip even though the route itself stays in
    /// free cells. A non-positive radius returns the map unchanged.
    pub fn inflated(&self, radius: f64) -> GridMap {
        let mut out = self.clone();
        if radius <= 0.0 {
            return out;
        }
        let reach = (radius / self.resolution).ceil() as i32;
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                if !self.cells[y as usize * self.width + x as usize] {
                    continue;
                }
                for dy in -reach..=reach {
                    for dx in -reach..=reach {
                        let (nx, ny) = (x + dx, y + dy);
                        if nx < 0
                            || ny < 0
                            || nx >= self.width as i32
                            || ny >= self.height as i32
                        {
                            continue;
                        }
                        let d = ((dx * dx + dy * dy) as f64).sqrt() * self.resolution;
                        if d <= radius {
                            out.cells[ny as usize * self.width + nx as usize] = true;
                        }
                    }
                }
            }
        }
        out
    }

    /// In-bounds neighbor cells. Occupancy is not filtered here; the
    /// planner decides what an occupied neighbor means.
    pub fn neighbors(&self, coord: GridCoord, connectivity: Connectivity) -> Vec<GridCoord> {
        connectivity
            .motion_model()
            .iter()
            .map(|&(dx, dy, _)| GridCoord::new(coord.x + dx, coord.y + dy))
            .filter(|&c| self.contains(c))
            .collect()
    }

    /// Whether a world point lies in an occupied cell. Points outside the
    /// map extent count as occupied.
    pub fn is_occupied_world(&self, point: Point2D) -> bool {
        match self.world_to_grid(point) {
            Ok(coord) => self.cells[coord.y as usize * self.width + coord.x as usize],
            Err(_) => true,
        }
    }

    /// Check the rectangular vehicle footprint against the map.
    ///
    /// Samples the four corners and points along each edge, the same
    /// scheme the rest of the loop uses for the per-tick collision check.
    pub fn footprint_collides(&self, pose: &Pose2D, length: f64, width: f64) -> bool {
        let (cos_yaw, sin_yaw) = (pose.yaw.cos(), pose.yaw.sin());
        let (hl, hw) = (length / 2.0, width / 2.0);

        let corners = [
            Point2D::new(
                pose.x + cos_yaw * hl - sin_yaw * hw,
                pose.y + sin_yaw * hl + cos_yaw * hw,
            ),
            Point2D::new(
                pose.x + cos_yaw * hl + sin_yaw * hw,
                pose.y + sin_yaw * hl - cos_yaw * hw,
            ),
            Point2D::new(
                pose.x - cos_yaw * hl + sin_yaw * hw,
                pose.y - sin_yaw * hl - cos_yaw * hw,
            ),
            Point2D::new(
                pose.x - cos_yaw * hl - sin_yaw * hw,
                pose.y - sin_yaw * hl + cos_yaw * hw,
            ),
        ];

        for corner in &corners {
            if self.is_occupied_world(*corner) {
                return true;
            }
        }

        // Edge samples at roughly half-cell spacing
        for i in 0..4 {
            let a = corners[i];
            let b = corners[(i + 1) % 4];
            let steps = ((a.distance(&b) / (0.5 * self.resolution)).ceil() as usize).max(1);
            for j in 1..steps {
                let t = j as f64 / steps as f64;
                let p = Point2D::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y));
                if self.is_occupied_world(p) {
                    return true;
                }
            }
        }

        false
    }
}
