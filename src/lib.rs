//! Keyframe reduction - optimal keyframe selection for dense motion data.
//!
//! This crate reduces an animation sampled every frame across several channels
//! to a small set of keyframes that reconstruct the motion within a bounded
//! error, plus the cubic segments used to interpolate between them.
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - `schema`: Configuration types for reduction runs
//! - `compute`: Error tables, min-max keyframe selection, greedy budget
//!   allocation across fixed keyframes, and cubic curve fitting
//! - `animation`: CSV import/export of series, selection histories and error tables
//!
//! # Example
//!
//! ```rust,no_run
//! use keyframe_reduce::{
//!     animation::load_series,
//!     compute::{Interpolator, SelectionManager},
//!     schema::ErrorMetric,
//! };
//!
//! let series = load_series("walk.csv").unwrap();
//!
//! // Keep frame 30 as a keyframe and grow the selection to 12 keyframes
//! let mut manager = SelectionManager::new(&series, ErrorMetric::Line, &[30]).unwrap();
//! manager.increment_until_n_keyframes(12).unwrap();
//!
//! let selection = manager.combined_selection().unwrap();
//! println!("Keyframes: {:?}", selection);
//! println!("Max error: {}", manager.max_error_across_segments().unwrap());
//!
//! // Cubic segments between the chosen keyframes
//! let interpolator = Interpolator::fit(&series, &selection).unwrap();
//! println!("{} segments", interpolator.segments().len());
//! ```

pub mod animation;
pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{
    AnimationSeries, ErrorTable, Interpolator, SelectionError, SelectionHistory, SelectionManager,
    Selector,
};
pub use schema::{ErrorMetric, ReductionConfig};
