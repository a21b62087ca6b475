//! Per-row record materialization and XML serialization.
//!
//! A record is the value-tree counterpart of the schema tree: named groups
//! holding scalar leaves, repeated leaves from comma-separated array cells,
//! and nested records from resolved cross-table references.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::column::ColumnSpec;
use crate::error::{GenError, Result};
use crate::resolver::RunContext;
use crate::table::{Row, Table};

/// References nested past this depth are omitted, the same way an unresolved
/// key is. Schema paths cannot cycle but cross-table row data can.
const MAX_EMBED_DEPTH: usize = 16;

/// The realized value tree for one row
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub name: String,
    pub nodes: Vec<RecordNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordNode {
    Leaf { name: String, value: String },
    Group(Record),
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Record { name: name.into(), nodes: Vec::new() }
    }

    /// Find-or-create a child group by name, mirroring the schema builder's
    /// find-or-create over the value tree.
    fn group_mut(&mut self, name: &str) -> &mut Record {
        let position = self
            .nodes
            .iter()
            .position(|n| matches!(n, RecordNode::Group(g) if g.name == name));
        let position = match position {
            Some(i) => i,
            None => {
                self.nodes.push(RecordNode::Group(Record::new(name)));
                self.nodes.len() - 1
            }
        };
        match &mut self.nodes[position] {
            RecordNode::Group(group) => group,
            RecordNode::Leaf { .. } => unreachable!("position found by group match"),
        }
    }

    /// First leaf value under a group path, for tests and diagnostics
    pub fn leaf(&self, name: &str) -> Option<&str> {
        self.nodes.iter().find_map(|n| match n {
            RecordNode::Leaf { name: leaf_name, value } if leaf_name == name => {
                Some(value.as_str())
            }
            _ => None,
        })
    }

    /// Child group by name
    pub fn group(&self, name: &str) -> Option<&Record> {
        self.nodes.iter().find_map(|n| match n {
            RecordNode::Group(g) if g.name == name => Some(g),
            _ => None,
        })
    }

    /// Serialize as an indented XML document, root element `Record`.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        write_element(&mut writer, &self.name, &self.nodes)?;
        let bytes = writer.into_inner();
        let body = String::from_utf8(bytes).map_err(|e| GenError::RecordWrite(e.to_string()))?;
        Ok(format!("{}\n", body))
    }
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    nodes: &[RecordNode],
) -> Result<()> {
    if nodes.is_empty() {
        writer
            .write_event(Event::Empty(BytesStart::new(name)))
            .map_err(|e| GenError::RecordWrite(e.to_string()))?;
        return Ok(());
    }
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(|e| GenError::RecordWrite(e.to_string()))?;
    for node in nodes {
        match node {
            RecordNode::Leaf { name, value } => {
                if value.is_empty() {
                    writer
                        .write_event(Event::Empty(BytesStart::new(name.as_str())))
                        .map_err(|e| GenError::RecordWrite(e.to_string()))?;
                } else {
                    writer
                        .write_event(Event::Start(BytesStart::new(name.as_str())))
                        .map_err(|e| GenError::RecordWrite(e.to_string()))?;
                    writer
                        .write_event(Event::Text(BytesText::new(value)))
                        .map_err(|e| GenError::RecordWrite(e.to_string()))?;
                    writer
                        .write_event(Event::End(BytesEnd::new(name.as_str())))
                        .map_err(|e| GenError::RecordWrite(e.to_string()))?;
                }
            }
            RecordNode::Group(group) => {
                write_element(writer, &group.name, &group.nodes)?;
            }
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(|e| GenError::RecordWrite(e.to_string()))?;
    Ok(())
}

/// Build one record from a row, resolving references through the run context.
pub fn build_record(ctx: &mut RunContext<'_>, table: &Table, row: &Row) -> Record {
    let specs = ctx.specs_for(&table.name);
    build_record_with(ctx, &specs, row, "Record", 0)
}

fn build_record_with(
    ctx: &mut RunContext<'_>,
    specs: &[ColumnSpec],
    row: &Row,
    name: &str,
    depth: usize,
) -> Record {
    let mut record = Record::new(name);

    for spec in specs {
        let raw = row.cell(spec.column_position);

        // Descend/create groups for all but the last path segment
        let mut target = &mut record;
        for segment in &spec.path_parts[..spec.path_parts.len().saturating_sub(1)] {
            target = target.group_mut(segment);
        }
        let property = spec.property_name().to_string();

        if let Some(reference) = &spec.reference {
            if depth >= MAX_EMBED_DEPTH {
                tracing::debug!(
                    table = reference.table.as_str(),
                    "embedding depth limit reached, reference omitted"
                );
                continue;
            }
            let keys: Vec<&str> = if spec.is_array {
                raw.split(',').map(str::trim).filter(|k| !k.is_empty()).collect()
            } else {
                vec![raw.trim()]
            };
            for key in keys {
                let Some(row_idx) = ctx.resolve(&reference.table, &reference.key_column, key)
                else {
                    // Unresolved reference: omitted, never an error
                    continue;
                };
                let Some(ref_table) = ctx.workbook().table(&reference.table) else {
                    continue;
                };
                let Some(ref_row) = ref_table.rows.get(row_idx) else {
                    continue;
                };
                let ref_row = ref_row.clone();
                let ref_specs = ctx.specs_for(&reference.table);
                let nested =
                    build_record_with(ctx, &ref_specs, &ref_row, &property, depth + 1);
                target.nodes.push(RecordNode::Group(nested));
            }
        } else if spec.is_array {
            for value in raw.split(',').map(str::trim).filter(|v| !v.is_empty()) {
                target.nodes.push(RecordNode::Leaf {
                    name: property.clone(),
                    value: value.to_string(),
                });
            }
        } else {
            // Plain scalar, emitted verbatim including the empty string
            target.nodes.push(RecordNode::Leaf { name: property, value: raw.to_string() });
        }
    }

    record
}

/// The row's stable identifier: the explicit `ID` column when present and
/// non-empty, else the 1-based row ordinal.
pub fn record_id(specs: &[ColumnSpec], row: &Row) -> String {
    for spec in specs {
        if spec.is_id_column() {
            let value = row.cell(spec.column_position).trim();
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }
    row.ordinal().to_string()
}

/// Render an identifier for use in generated file names: numeric values get a
/// fixed 6-digit zero-padded form, everything else is used verbatim.
pub fn format_record_id(id: &str) -> String {
    match id.parse::<i64>() {
        Ok(n) => format!("{:06}", n),
        Err(_) => id.to_string(),
    }
}
