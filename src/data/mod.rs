//! Tabular data loading for count models.
//!
//! A [`Dataset`] holds numeric columns read from a CSV file. Empty cells are
//! kept as missing values until [`Dataset::dropna`] removes the rows that
//! contain them.

use faer::{Col, Mat};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Errors from loading or selecting data.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("line {line}, column '{column}': cannot parse '{value}' as a number")]
    Parse {
        line: usize,
        column: String,
        value: String,
    },

    #[error("line {line}: {message}")]
    Record { line: usize, message: String },

    #[error("unknown column '{name}'; available columns: {available:?}")]
    UnknownColumn {
        name: String,
        available: Vec<String>,
    },

    #[error("column '{column}' has a missing value at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("column '{column}' has non-integer group label {value} at row {row}")]
    NonIntegerGroup {
        column: String,
        row: usize,
        value: f64,
    },
}

/// Numeric table with optional cells, stored by column.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    names: Vec<String>,
    columns: Vec<Vec<Option<f64>>>,
}

impl Dataset {
    /// Load a dataset from a CSV file with a header row.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let path = path.as_ref();
        let reader = csv::Reader::from_path(path).map_err(|e| DataError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_csv_reader(reader)
    }

    /// Load a dataset from any CSV source with a header row.
    pub fn from_reader<R: Read>(source: R) -> Result<Self, DataError> {
        Self::from_csv_reader(csv::Reader::from_reader(source))
    }

    fn from_csv_reader<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, DataError> {
        let names: Vec<String> = reader
            .headers()
            .map_err(|e| DataError::Record {
                line: 1,
                message: format!("failed to read headers: {e}"),
            })?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); names.len()];
        let mut line = 2;

        for record in reader.records() {
            let record = record.map_err(|e| DataError::Record {
                line,
                message: e.to_string(),
            })?;

            for (j, name) in names.iter().enumerate() {
                let cell = record.get(j).unwrap_or("").trim();
                let value = if cell.is_empty() || cell.eq_ignore_ascii_case("na") {
                    None
                } else {
                    Some(cell.parse::<f64>().map_err(|_| DataError::Parse {
                        line,
                        column: name.clone(),
                        value: cell.to_string(),
                    })?)
                };
                columns[j].push(value);
            }
            line += 1;
        }

        log::debug!(
            "dataset: loaded {} rows, {} columns",
            columns.first().map_or(0, Vec::len),
            names.len()
        );

        Ok(Self { names, columns })
    }

    /// Column names in file order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of rows.
    pub fn nrows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Keep only rows without missing cells.
    pub fn dropna(&self) -> Self {
        let keep: Vec<usize> = (0..self.nrows())
            .filter(|&i| self.columns.iter().all(|col| col[i].is_some()))
            .collect();

        let dropped = self.nrows() - keep.len();
        if dropped > 0 {
            log::debug!("dataset: dropped {dropped} rows with missing values");
        }

        Self {
            names: self.names.clone(),
            columns: self
                .columns
                .iter()
                .map(|col| keep.iter().map(|&i| col[i]).collect())
                .collect(),
        }
    }

    fn index(&self, name: &str) -> Result<usize, DataError> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| DataError::UnknownColumn {
                name: name.to_string(),
                available: self.names.clone(),
            })
    }

    fn complete(&self, name: &str) -> Result<Vec<f64>, DataError> {
        let col = &self.columns[self.index(name)?];
        col.iter()
            .enumerate()
            .map(|(row, v)| {
                v.ok_or_else(|| DataError::MissingValue {
                    column: name.to_string(),
                    row,
                })
            })
            .collect()
    }

    /// A complete column as a vector.
    pub fn column(&self, name: &str) -> Result<Col<f64>, DataError> {
        let values = self.complete(name)?;
        Ok(Col::from_fn(values.len(), |i| values[i]))
    }

    /// Design matrix from the named columns, in the given order.
    pub fn design(&self, names: &[&str]) -> Result<Mat<f64>, DataError> {
        let cols = names
            .iter()
            .map(|name| self.complete(name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Mat::from_fn(self.nrows(), cols.len(), |i, j| cols[j][i]))
    }

    /// Integer group labels from a column.
    pub fn groups(&self, name: &str) -> Result<Vec<i64>, DataError> {
        self.complete(name)?
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                if value.fract() == 0.0 && value.is_finite() {
                    Ok(value as i64)
                } else {
                    Err(DataError::NonIntegerGroup {
                        column: name.to_string(),
                        row,
                        value,
                    })
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "ship,service,accident\n1,127,0\n1,,\n2,1095,3\n3,44882,39\n";

    #[test]
    fn test_from_reader_keeps_missing_cells() {
        let data = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(data.names(), &["ship", "service", "accident"]);
        assert_eq!(data.nrows(), 4);
        assert!(matches!(
            data.column("service"),
            Err(DataError::MissingValue { row: 1, .. })
        ));
    }

    #[test]
    fn test_dropna() {
        let data = Dataset::from_reader(SAMPLE.as_bytes()).unwrap().dropna();
        assert_eq!(data.nrows(), 3);

        let service = data.column("service").unwrap();
        assert_eq!(service[1], 1095.0);
        assert_eq!(data.groups("ship").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_design_column_order() {
        let data = Dataset::from_reader(SAMPLE.as_bytes()).unwrap().dropna();
        let x = data.design(&["accident", "ship"]).unwrap();
        assert_eq!(x.ncols(), 2);
        assert_eq!(x[(2, 0)], 39.0);
        assert_eq!(x[(2, 1)], 3.0);
    }

    #[test]
    fn test_unknown_column() {
        let data = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();
        assert!(matches!(
            data.column("tonnage"),
            Err(DataError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_parse_error_reports_line() {
        let bad = "a,b\n1,2\n3,x\n";
        let err = Dataset::from_reader(bad.as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::Parse { line: 3, .. }));
    }

    #[test]
    fn test_non_integer_groups() {
        let data = Dataset::from_reader("g\n1\n2.5\n".as_bytes()).unwrap();
        assert!(matches!(
            data.groups("g"),
            Err(DataError::NonIntegerGroup { row: 1, .. })
        ));
    }
}
