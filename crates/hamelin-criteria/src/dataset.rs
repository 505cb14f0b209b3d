//! Immutable dataset snapshots and row selection masks.

use std::fs::File;
use std::path::Path;

use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use tracing::info;

use crate::error::{CriteriaError, Result};

/// A read-only tabular snapshot the criteria engine evaluates rules against.
///
/// Wraps a polars [`DataFrame`]. Cloning is cheap because polars columns are
/// reference counted; the engine never mutates a snapshot and every filter
/// produces a new one.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    df: DataFrame,
}

impl Dataset {
    /// Wrap an existing DataFrame.
    pub fn new(df: DataFrame) -> Self {
        Self { df }
    }

    /// Load a snapshot from a CSV file with a header row.
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let df = CsvReadOptions::default()
            .with_infer_schema_length(Some(100))
            .with_has_header(true)
            .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;
        info!("Dataset loaded from {}: {:?}", path.display(), df.shape());
        Ok(Self::new(df))
    }

    /// Write the snapshot to a CSV file with a header row.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut file = File::create(path)?;
        let mut df = self.df.clone();
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .finish(&mut df)?;
        info!("Dataset saved: {}", path.display());
        Ok(())
    }

    /// Names of all columns in order.
    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    /// Check whether a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.df.get_column_names().iter().any(|c| c.as_str() == name)
    }

    /// Values of a single column.
    pub fn column_values(&self, name: &str) -> Result<&Series> {
        if !self.has_column(name) {
            return Err(CriteriaError::UnknownVariable(name.to_string()));
        }
        Ok(self.df.column(name)?.as_materialized_series())
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.df.height()
    }

    /// Keep the rows whose mask entry is `true`, preserving order.
    pub fn filter(&self, mask: &BooleanMask) -> Result<Dataset> {
        if mask.len() != self.row_count() {
            return Err(CriteriaError::InvalidConfig(format!(
                "mask length {} does not match row count {}",
                mask.len(),
                self.row_count()
            )));
        }
        let chunked = BooleanChunked::from_slice("keep".into(), mask.as_slice());
        Ok(Dataset::new(self.df.filter(&chunked)?))
    }

    /// Restrict the snapshot to the given columns, in the given order.
    pub fn select(&self, columns: &[String]) -> Result<Dataset> {
        for column in columns {
            if !self.has_column(column) {
                return Err(CriteriaError::UnknownVariable(column.clone()));
            }
        }
        Ok(Dataset::new(self.df.select(columns.iter().map(String::as_str))?))
    }

    /// Borrow the underlying DataFrame.
    pub fn as_dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Consume the snapshot and return the DataFrame.
    pub fn into_dataframe(self) -> DataFrame {
        self.df
    }
}

impl From<DataFrame> for Dataset {
    fn from(df: DataFrame) -> Self {
        Self::new(df)
    }
}

/// One boolean per dataset row, in row order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooleanMask(Vec<bool>);

impl BooleanMask {
    /// A mask selecting every row.
    pub fn all(len: usize) -> Self {
        Self(vec![true; len])
    }

    /// A mask selecting no row.
    pub fn none(len: usize) -> Self {
        Self(vec![false; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of selected rows.
    pub fn count_true(&self) -> usize {
        self.0.iter().filter(|&&b| b).count()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    /// Element-wise OR, in place.
    pub fn or_assign(&mut self, other: &BooleanMask) {
        debug_assert_eq!(self.len(), other.len());
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a |= *b;
        }
    }

    /// Element-wise `self AND NOT other`.
    pub fn and_not(&self, other: &BooleanMask) -> BooleanMask {
        debug_assert_eq!(self.len(), other.len());
        BooleanMask(
            self.0
                .iter()
                .zip(&other.0)
                .map(|(a, b)| *a && !*b)
                .collect(),
        )
    }

    /// Element-wise negation.
    pub fn negate(&self) -> BooleanMask {
        BooleanMask(self.0.iter().map(|b| !b).collect())
    }
}

impl From<Vec<bool>> for BooleanMask {
    fn from(values: Vec<bool>) -> Self {
        Self(values)
    }
}

impl FromIterator<bool> for BooleanMask {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
