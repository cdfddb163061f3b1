//! Compute module - Error tables, keyframe selection and curve fitting.

mod cubic;
mod error;
mod error_table;
mod history;
mod interpolator;
mod manager;
mod selector;
mod series;

pub mod gpu;

pub use cubic::*;
pub use error::*;
pub use error_table::*;
pub use history::*;
pub use interpolator::*;
pub use manager::*;
pub use selector::*;
pub use series::*;
