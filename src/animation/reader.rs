//! Series reader.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use super::format::{SERIES_FRAME_COLUMN, parse_field};
use crate::compute::AnimationSeries;

/// Read a series from CSV text, one pose per row.
///
/// A leading header line starting with `Frame` is skipped; blank lines are ignored.
pub fn read_series<R: BufRead>(reader: R) -> io::Result<AnimationSeries> {
    let mut data = Vec::new();
    let mut n_dims = None;

    for (ix, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = ix + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || (ix == 0 && trimmed.starts_with(SERIES_FRAME_COLUMN)) {
            continue;
        }

        let start = data.len();
        for (col, field) in trimmed.split(',').enumerate() {
            data.push(parse_field(field, line_no, col + 1)?);
        }
        let width = data.len() - start;

        match n_dims {
            None => n_dims = Some(width),
            Some(expected) if expected != width => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "Line {}: expected {} columns, found {}",
                        line_no, expected, width
                    ),
                ));
            }
            Some(_) => {}
        }
    }

    let n_dims = n_dims.ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, "Series file contains no frames")
    })?;
    AnimationSeries::from_flat(data, n_dims)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
}

/// Read a series CSV file.
pub fn load_series<P: AsRef<Path>>(path: P) -> io::Result<AnimationSeries> {
    let file = File::open(path)?;
    read_series(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_with_header() {
        let text = "Frame,Dimension-1\n0,1.5\n1,2.5\n\n2,-3\n";
        let series = read_series(text.as_bytes()).unwrap();
        assert_eq!(series.n_frames(), 3);
        assert_eq!(series.n_dims(), 2);
        assert_eq!(series.pose(2), &[2.0, -3.0]);
    }

    #[test]
    fn test_read_without_header() {
        let series = read_series("0, 1, 2\n1, 1, 2\n".as_bytes()).unwrap();
        assert_eq!(series.n_frames(), 2);
        assert_eq!(series.n_dims(), 3);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = read_series("Frame,Dimension-1\n0,1\n1\n".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("Line 3"));
    }

    #[test]
    fn test_bad_number_rejected() {
        let err = read_series("0,1\n1,x\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Line 2, column 2"));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(read_series("Frame,Dimension-1\n".as_bytes()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_series(dir.path().join("missing.csv")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
