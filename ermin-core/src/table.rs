use crate::error::{InputLoadError, OutputError};
use csv::{ReaderBuilder, WriterBuilder};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// In-memory data table: header names plus rows of raw string cells.
///
/// Every row has exactly `headers.len()` cells; loading enforces this and the
/// mutating helpers keep it true.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Build a table from string slices, mostly for tests and fixtures.
    pub fn from_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    pub fn set_cell(&mut self, row: usize, column: usize, value: impl Into<String>) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            *cell = value.into();
        }
    }

    /// Cells of one column, top to bottom.
    pub fn column_values(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[index].as_str()).collect())
    }

    /// Append a column filled with `fill`. Returns the existing index if the
    /// column is already present.
    pub fn add_column(&mut self, name: &str, fill: &str) -> usize {
        if let Some(index) = self.column_index(name) {
            return index;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(fill.to_string());
        }
        self.headers.len() - 1
    }

    /// Parse CSV data with a header row. Lines starting with `#` are skipped,
    /// as are rows whose cells are all blank.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, InputLoadError> {
        let mut raw = String::new();
        reader
            .read_to_string(&mut raw)
            .map_err(|e| InputLoadError::Csv(e.into()))?;
        Self::parse(strip_bom(&raw))
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, InputLoadError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| InputLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::parse(strip_bom(&raw))?;
        debug!(
            path = %path.display(),
            columns = table.column_count(),
            rows = table.row_count(),
            "loaded input table"
        );
        Ok(table)
    }

    fn parse(data: &str) -> Result<Self, InputLoadError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .comment(Some(b'#'))
            .flexible(true)
            .from_reader(data.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(InputLoadError::MissingHeader);
        }

        let mut seen = HashSet::new();
        for header in &headers {
            if !seen.insert(header.as_str()) {
                return Err(InputLoadError::DuplicateColumn(header.clone()));
            }
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            if record.len() != headers.len() {
                return Err(InputLoadError::RaggedRow {
                    line: record.position().map(|p| p.line()).unwrap_or(0),
                    expected: headers.len(),
                    found: record.len(),
                });
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), OutputError> {
        let mut writer = WriterBuilder::new().from_writer(writer);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush().map_err(|e| OutputError::Csv(e.into()))?;
        Ok(())
    }

    pub fn to_csv_path(&self, path: impl AsRef<Path>) -> Result<(), OutputError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| OutputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.write_csv(file)?;
        debug!(path = %path.display(), rows = self.row_count(), "wrote table");
        Ok(())
    }
}

fn strip_bom(data: &str) -> &str {
    data.strip_prefix('\u{feff}').unwrap_or(data)
}
