//! Series, history and error table writers.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::format::{ERROR_TABLE_HEADER, history_header, series_header};
use crate::compute::{AnimationSeries, ErrorTable, NO_INDEX, SelectionHistory};

/// Write a series as CSV, one pose per row.
pub fn write_series<W: Write>(w: &mut W, series: &AnimationSeries) -> io::Result<()> {
    writeln!(w, "{}", series_header(series.n_dims()))?;
    for frame in 0..series.n_frames() {
        let row: Vec<String> = series.pose(frame).iter().map(|v| v.to_string()).collect();
        writeln!(w, "{}", row.join(","))?;
    }
    Ok(())
}

/// Write a selection history, one row per keyframe count.
pub fn write_history<W: Write>(w: &mut W, history: &SelectionHistory) -> io::Result<()> {
    let width = history.max_keyframes();
    writeln!(w, "{}", history_header(width))?;
    for (n, entry) in history.iter() {
        write!(w, "{},{}", n, entry.error)?;
        for k in 0..width {
            match entry.selection.get(k) {
                Some(frame) => write!(w, ",{}", frame)?,
                None => write!(w, ",")?,
            }
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Write every defined cell of an error table.
pub fn write_error_table<W: Write>(w: &mut W, table: &ErrorTable) -> io::Result<()> {
    writeln!(w, "{}", ERROR_TABLE_HEADER)?;
    for (i, j, cell) in table.cells() {
        let index = cell.index.map_or(i64::from(NO_INDEX), |k| k as i64);
        writeln!(w, "{},{},{},{}", i, j, index, cell.value)?;
    }
    Ok(())
}

/// Write a series CSV file.
pub fn save_series<P: AsRef<Path>>(path: P, series: &AnimationSeries) -> io::Result<()> {
    save_with(path, |w| write_series(w, series))
}

/// Write a selection history CSV file.
pub fn save_history<P: AsRef<Path>>(path: P, history: &SelectionHistory) -> io::Result<()> {
    save_with(path, |w| write_history(w, history))
}

/// Write an error table CSV file.
pub fn save_error_table<P: AsRef<Path>>(path: P, table: &ErrorTable) -> io::Result<()> {
    save_with(path, |w| write_error_table(w, table))
}

fn save_with<P, F>(path: P, write: F) -> io::Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write(&mut writer)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::load_series;
    use tempfile::tempdir;

    fn bump() -> AnimationSeries {
        AnimationSeries::from_poses(&[
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            vec![2.0, 2.0],
            vec![3.0, 1.0],
            vec![4.0, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_series_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("series.csv");

        let poses: Vec<Vec<f32>> = (0..25)
            .map(|f| {
                let t = f as f32;
                vec![t, (t * 0.3).sin() * 1.7, -0.1 * t + 1.0 / 3.0]
            })
            .collect();
        let series = AnimationSeries::from_poses(&poses).unwrap();

        save_series(&path, &series).unwrap();
        let loaded = load_series(&path).unwrap();
        assert_eq!(loaded, series);
    }

    #[test]
    fn test_series_layout() {
        let mut out = Vec::new();
        write_series(&mut out, &bump()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Frame,Dimension-1");
        assert_eq!(lines[3], "2,2");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_history_layout() {
        let mut history = SelectionHistory::new();
        history.record(vec![0, 9], 1.5);
        history.record(vec![0, 4, 9], 0.25);

        let mut out = Vec::new();
        write_history(&mut out, &history).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "n_keyframes,error,k1,k2,k3\n2,1.5,0,9,\n3,0.25,0,4,9\n"
        );
    }

    #[test]
    fn test_error_table_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.csv");
        let table = ErrorTable::using_line_based_error(bump()).unwrap();
        save_error_table(&path, &table).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], ERROR_TABLE_HEADER);
        // 5 frames: 10 upper-triangle cells
        assert_eq!(lines.len(), 11);
        assert_eq!(lines[1], "0,1,-1,0");
        assert!(lines.contains(&"0,4,2,2"));
    }

    #[test]
    fn test_history_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let mut history = SelectionHistory::new();
        history.record(vec![0, 3], 0.5);
        save_history(&path, &history).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "n_keyframes,error,k1,k2\n2,0.5,0,3\n"
        );
    }
}
