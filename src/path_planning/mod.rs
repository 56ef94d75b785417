//! Path planning algorithms

pub mod a_star;

pub use a_star::{AStarConfig, AStarPlanner};
