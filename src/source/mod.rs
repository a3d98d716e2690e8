use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::SourceError;
use crate::reading::SensorRow;

const COL_TIME: &str = "Time";
const COL_SMOKER: &str = "Channel1";
const COL_FOOD_A: &str = "Channel2";
const COL_FOOD_B: &str = "Channel3";

/// Reads timestamped sensor rows from a CSV export of the rig's logger.
///
/// The sequence is finite, ordered, and restartable: every call to
/// [`ReadingSource::read_rows`] re-reads the file from the top. An empty cell
/// means that channel has no sample for the row; a non-numeric value in a
/// present cell is a fatal input error.
pub struct ReadingSource {
    path: PathBuf,
}

impl ReadingSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_rows(&self) -> Result<Vec<SensorRow>, SourceError> {
        if !self.path.exists() {
            return Err(SourceError::FileNotFound {
                path: self.path.display().to_string(),
            });
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let headers = reader.headers()?.clone();
        let col = |name: &'static str| -> Result<usize, SourceError> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or(SourceError::MissingColumn { column: name })
        };
        let time_idx = col(COL_TIME)?;
        let smoker_idx = col(COL_SMOKER)?;
        let food_a_idx = col(COL_FOOD_A)?;
        let food_b_idx = col(COL_FOOD_B)?;

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            // Header is line 1, first data record is line 2.
            let row_number = line + 2;
            rows.push(SensorRow {
                timestamp: record.get(time_idx).unwrap_or("").trim().to_string(),
                smoker: parse_temp(record.get(smoker_idx), COL_SMOKER, row_number)?,
                food_a: parse_temp(record.get(food_a_idx), COL_FOOD_A, row_number)?,
                food_b: parse_temp(record.get(food_b_idx), COL_FOOD_B, row_number)?,
            });
        }

        info!(
            rows = rows.len(),
            file = %self.path.display(),
            "Loaded sensor rows"
        );
        Ok(rows)
    }
}

fn parse_temp(
    field: Option<&str>,
    column: &'static str,
    row: usize,
) -> Result<Option<f64>, SourceError> {
    let raw = field.unwrap_or("").trim();
    if raw.is_empty() {
        debug!(row, column, "No sample for channel in this row");
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| SourceError::InvalidTemperature {
            row,
            column,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::io::Write;

    fn write_fixture(contents: &str) -> PathBuf {
        let mut rng = rand::thread_rng();
        let path = std::env::temp_dir().join(format!("smokewatch-src-{}.csv", rng.gen::<u32>()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_rows_and_skips_empty_cells() {
        let path = write_fixture(
            "Time,Channel1,Channel2,Channel3\n\
             07/04/20 08:00:00,225.5,150.0,\n\
             07/04/20 08:00:30,226.0,,140.2\n",
        );
        let rows = ReadingSource::new(&path).read_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].smoker, Some(225.5));
        assert_eq!(rows[0].food_b, None);
        assert_eq!(rows[1].food_a, None);
        assert_eq!(rows[1].food_b, Some(140.2));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn non_numeric_present_field_is_fatal() {
        let path = write_fixture(
            "Time,Channel1,Channel2,Channel3\n\
             07/04/20 08:00:00,hot,150.0,140.0\n",
        );
        let err = ReadingSource::new(&path).read_rows().unwrap_err();
        match err {
            SourceError::InvalidTemperature { row, column, value } => {
                assert_eq!(row, 2);
                assert_eq!(column, "Channel1");
                assert_eq!(value, "hot");
            }
            other => panic!("expected InvalidTemperature, got {other:?}"),
        }
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_is_fatal_and_names_the_path() {
        let err = ReadingSource::new("/definitely/not/here.csv")
            .read_rows()
            .unwrap_err();
        assert!(matches!(err, SourceError::FileNotFound { .. }));
        assert!(err.to_string().contains("/definitely/not/here.csv"));
    }

    #[test]
    fn rereading_restarts_from_the_top() {
        let path = write_fixture(
            "Time,Channel1,Channel2,Channel3\n\
             07/04/20 08:00:00,225.5,150.0,140.0\n",
        );
        let source = ReadingSource::new(&path);
        let first = source.read_rows().unwrap();
        let second = source.read_rows().unwrap();
        assert_eq!(first, second);
        std::fs::remove_file(path).ok();
    }
}
