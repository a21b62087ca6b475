//! Tabular data source: workbooks, tables and rows.
//!
//! A workbook is a directory of CSV files, one file per named table (the file
//! stem is the table name), or a single CSV file forming a one-table workbook.
//! The first CSV record is the header row; everything after it is data.

use std::path::Path;

use crate::error::{GenError, Result};

/// One data row: string cells addressed by 1-based column position.
#[derive(Debug, Clone)]
pub struct Row {
    cells: Vec<String>,
    /// 1-based position within the table's data rows
    ordinal: usize,
}

impl Row {
    pub fn new(cells: Vec<String>, ordinal: usize) -> Self {
        Row { cells, ordinal }
    }

    /// Cell value by 1-based column position; missing cells read as empty.
    pub fn cell(&self, position: usize) -> &str {
        if position == 0 {
            return "";
        }
        self.cells.get(position - 1).map(|s| s.as_str()).unwrap_or("")
    }

    /// 1-based data-row ordinal, the identifier fallback when no ID column exists
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// True when every cell is empty or whitespace
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }
}

/// One named table: header cells plus data rows.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, cells)| Row::new(cells, i + 1))
            .collect();
        Table { name: name.into(), headers, rows }
    }
}

/// A collection of named tables loaded for one run.
#[derive(Debug, Default)]
pub struct Workbook {
    tables: Vec<Table>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, table: Table) {
        self.tables.push(table);
    }

    /// Tables in load order
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Case-insensitive lookup, matching the original tool's table filter
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Load a workbook from a directory of CSV files or a single CSV file.
    pub fn load(path: impl AsRef<Path>) -> Result<Workbook> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(GenError::SourceNotFound(path.to_path_buf()));
        }

        let mut workbook = Workbook::new();

        if path.is_file() {
            workbook.push(load_csv_table(path)?);
            return Ok(workbook);
        }

        // Directory: every .csv file is one table, in sorted order so runs are
        // deterministic across filesystems.
        let mut csv_paths = Vec::new();
        let read_dir = std::fs::read_dir(path).map_err(|e| GenError::io(path, e))?;
        for entry in read_dir {
            let entry = entry.map_err(|e| GenError::io(path, e))?;
            let entry_path = entry.path();
            if entry_path.extension().is_some_and(|ext| ext == "csv") {
                csv_paths.push(entry_path);
            }
        }
        csv_paths.sort();

        for csv_path in csv_paths {
            workbook.push(load_csv_table(&csv_path)?);
        }

        Ok(workbook)
    }
}

/// Read one CSV file into a table. Short rows are allowed (cells beyond the
/// row's length read as empty through `Row::cell`).
fn load_csv_table(path: &Path) -> Result<Table> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| GenError::SourceDecode { path: path.to_path_buf(), reason: e.to_string() })?;

    let mut headers: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<String>> = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let record = result
            .map_err(|e| GenError::SourceDecode { path: path.to_path_buf(), reason: e.to_string() })?;
        let cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
        if i == 0 {
            headers = cells;
        } else {
            rows.push(cells);
        }
    }

    Ok(Table::new(name, headers, rows))
}
