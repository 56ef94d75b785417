//! Error types for nav_sim

use thiserror::Error;

/// Main error type for planning, tracking and simulation
#[derive(Debug, Error)]
pub enum NavError {
    /// Coordinate outside the map extent. Caller error, never retried.
    #[error("coordinate ({x:.3}, {y:.3}) is outside the map extent")]
    OutOfBounds { x: f64, y: f64 },

    /// Goal cannot be reached from the start. Reported as a terminal
    /// scenario outcome by `run_scenario`, not a crash.
    #[error("no route from start to goal: {0}")]
    Unreachable(String),

    /// Controller invoked with an empty course. Indicates a
    /// planner/post-processor contract violation upstream.
    #[error("no path available: {0}")]
    NoPath(String),

    /// Invalid parameter or malformed input
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Scenario configuration could not be parsed
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for nav_sim operations
pub type NavResult<T> = Result<T, NavError>;
