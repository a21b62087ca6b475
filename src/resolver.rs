//! Cross-table reference resolution with run-scoped memoization.
//!
//! A `RunContext` owns every cache for one generation run: parsed column specs
//! per table and one key->row index per (table, key column) pair. Indices are
//! built lazily on first lookup and dropped with the context, so nothing leaks
//! between runs even when unrelated tables share a key-column name.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::column::{parse_headers, ColumnSpec};
use crate::table::Workbook;

/// Run-scoped caches for one generation run.
///
/// Index keys are strictly `(table name, key column)`; a key-column name alone
/// is never assumed unique across tables.
pub struct RunContext<'a> {
    workbook: &'a Workbook,
    specs: HashMap<String, Vec<ColumnSpec>>,
    indices: HashMap<(String, String), IndexMap<String, usize>>,
}

impl<'a> RunContext<'a> {
    pub fn new(workbook: &'a Workbook) -> Self {
        RunContext { workbook, specs: HashMap::new(), indices: HashMap::new() }
    }

    pub fn workbook(&self) -> &'a Workbook {
        self.workbook
    }

    /// Parsed column specs for a table, memoized per run. An unknown table
    /// yields an empty list: references into it simply never resolve.
    pub fn specs_for(&mut self, table_name: &str) -> Vec<ColumnSpec> {
        let cache_key = table_name.to_ascii_lowercase();
        if let Some(specs) = self.specs.get(&cache_key) {
            return specs.clone();
        }
        let specs = match self.workbook.table(table_name) {
            Some(table) => parse_headers(&table.headers),
            None => Vec::new(),
        };
        self.specs.insert(cache_key, specs.clone());
        specs
    }

    /// Resolve a foreign-key value to a data-row index in the referenced
    /// table. `None` is a normal outcome and never an error: the reference is
    /// simply omitted from the record under construction.
    pub fn resolve(&mut self, table_name: &str, key_column: &str, key: &str) -> Option<usize> {
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        let cache_key = (table_name.to_ascii_lowercase(), key_column.to_ascii_lowercase());
        if !self.indices.contains_key(&cache_key) {
            let index = self.build_index(table_name, key_column);
            tracing::debug!(
                table = table_name,
                key_column,
                entries = index.len(),
                "built reference index"
            );
            self.indices.insert(cache_key.clone(), index);
        }
        self.indices.get(&cache_key).and_then(|index| index.get(key)).copied()
    }

    /// Scan every data row of a table once, recording the first row observed
    /// for each distinct key value. Fully empty rows are skipped.
    fn build_index(&mut self, table_name: &str, key_column: &str) -> IndexMap<String, usize> {
        let mut index = IndexMap::new();

        let Some(table) = self.workbook.table(table_name) else {
            tracing::debug!(table = table_name, "reference target table not found");
            return index;
        };
        let specs = self.specs_for(table_name);
        let Some(key_spec) =
            specs.iter().find(|s| s.property_name().eq_ignore_ascii_case(key_column))
        else {
            tracing::debug!(table = table_name, key_column, "key column not found");
            return index;
        };

        for (row_idx, row) in table.rows.iter().enumerate() {
            if row.is_empty() {
                continue;
            }
            let key = row.cell(key_spec.column_position).trim().to_string();
            if key.is_empty() {
                continue;
            }
            // First row wins on duplicate key values
            index.entry(key).or_insert(row_idx);
        }
        index
    }
}
