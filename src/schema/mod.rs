//! Schema module - Configuration types for keyframe reduction runs.

mod config;

pub use config::*;
