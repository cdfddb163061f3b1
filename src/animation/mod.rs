//! Animation file I/O for keyframe reduction.
//!
//! All files are comma-separated text with a single header line.
//!
//! # Series
//!
//! ```text
//! Frame,Dimension-1,Dimension-2
//! 0,0.5,1.25
//! 1,0.75,1.5
//! ```
//!
//! One pose per row; the first column is channel 0.
//!
//! # Selection history
//!
//! ```text
//! n_keyframes,error,k1,k2,k3
//! 2,1.5,0,9,
//! 3,0.25,0,4,9
//! ```
//!
//! One row per keyframe count; shorter selections are padded with empty fields.
//!
//! # Error table
//!
//! ```text
//! i,j,errorIndex,errorValue
//! 0,1,-1,0
//! 0,2,1,0.5
//! ```
//!
//! Upper triangle only; `-1` marks a cell without a split index.

mod format;
mod reader;
mod writer;

pub use format::{
    ERROR_TABLE_HEADER, HISTORY_HEADER, SERIES_FRAME_COLUMN, format_summary, series_header,
};
pub use reader::{load_series, read_series};
pub use writer::{
    save_error_table, save_history, save_series, write_error_table, write_history, write_series,
};
