//! Text format definitions shared by the readers and writers.

use std::io;

use crate::compute::SelectionHistory;

/// First column of a series file.
pub const SERIES_FRAME_COLUMN: &str = "Frame";

/// Header of an error table file.
pub const ERROR_TABLE_HEADER: &str = "i,j,errorIndex,errorValue";

/// Fixed leading columns of a selection history file.
pub const HISTORY_HEADER: &str = "n_keyframes,error";

/// Header line for a series with `n_dims` channels.
pub fn series_header(n_dims: usize) -> String {
    let mut header = String::from(SERIES_FRAME_COLUMN);
    for d in 1..n_dims {
        header.push_str(&format!(",Dimension-{}", d));
    }
    header
}

/// Header line for a history whose largest selection has `max_keyframes` frames.
pub(crate) fn history_header(max_keyframes: usize) -> String {
    let mut header = String::from(HISTORY_HEADER);
    for k in 1..=max_keyframes {
        header.push_str(&format!(",k{}", k));
    }
    header
}

/// One `error|a,b,c` line per history entry, errors rounded to 4 decimals.
pub fn format_summary(history: &SelectionHistory) -> String {
    history
        .iter()
        .map(|(_, entry)| {
            let frames: Vec<String> = entry.selection.iter().map(|f| f.to_string()).collect();
            format!("{:.4}|{}\n", entry.error, frames.join(","))
        })
        .collect()
}

/// Parse one numeric field, reporting its 1-based line and column on failure.
pub(crate) fn parse_field(field: &str, line: usize, column: usize) -> io::Result<f32> {
    field.trim().parse::<f32>().map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Line {}, column {}: {:?} is not a number ({})", line, column, field, e),
        )
    })
}
