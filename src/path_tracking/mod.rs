//! Path tracking controllers

pub mod stanley;

pub use stanley::{StanleyConfig, StanleyController, TrackingUpdate};
