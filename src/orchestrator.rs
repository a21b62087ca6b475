//! Generation run orchestration.
//!
//! Sequences loading, schema inference, record building and template rendering
//! per execution mode, and owns the output file layout: record files under
//! `<out>/xml/<Table>/`, generated source under `<out>/code/`. Every run gets
//! a fresh `RunContext`; caches never leak across runs.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::column::ColumnSpec;
use crate::error::{GenError, Result};
use crate::record::{build_record, format_record_id, record_id};
use crate::resolver::RunContext;
use crate::schema::SchemaNode;
use crate::table::{Row, Table, Workbook};
use crate::template::{render_template, TemplateData};

/// Options shared by every generating mode.
pub struct RunOptions {
    /// Workbook directory or single CSV file
    pub source: PathBuf,
    /// Root of the generated output tree
    pub output: PathBuf,
    /// Restrict the run to one table, matched case-insensitively
    pub table: Option<String>,
}

/// Table names in workbook order.
pub fn list_tables(source: &Path) -> Result<Vec<String>> {
    let workbook = Workbook::load(source)?;
    Ok(workbook.tables().iter().map(|t| t.name.clone()).collect())
}

/// Write one XML record file per data row of every selected table.
/// Returns the number of files written.
pub fn generate_records(opts: &RunOptions) -> Result<usize> {
    let workbook = Workbook::load(&opts.source)?;
    let mut ctx = RunContext::new(&workbook);
    let mut written = 0;

    for table in selected_tables(&workbook, opts.table.as_deref())? {
        let specs = ctx.specs_for(&table.name);
        let table_dir = opts.output.join("xml").join(&table.name);

        for row in &table.rows {
            if row.is_empty() {
                continue;
            }
            let record = build_record(&mut ctx, table, row);
            let id = format_record_id(&record_id(&specs, row));
            let path = table_dir.join(format!("{}_{}.xml", table.name, id));
            write_atomic(&path, &record.to_xml()?)?;
            written += 1;
        }
        tracing::info!(table = table.name.as_str(), "record files written");
    }

    Ok(written)
}

/// Render the class-hierarchy template once per selected table.
/// Returns the paths written.
pub fn generate_class(opts: &RunOptions, template_path: &Path) -> Result<Vec<PathBuf>> {
    let template = read_template(template_path)?;
    let extension = template_extension(template_path);
    let workbook = Workbook::load(&opts.source)?;
    let mut ctx = RunContext::new(&workbook);
    let mut paths = Vec::new();

    for table in selected_tables(&workbook, opts.table.as_deref())? {
        let specs = ctx.specs_for(&table.name);
        let schema = SchemaNode::build(&table.name, &specs);
        let data = TemplateData {
            table_name: &table.name,
            generated_date: generated_date(),
            schema: Some(&schema),
            rows: &[],
        };
        let path = opts.output.join("code").join(format!("{}.{}", table.name, extension));
        write_atomic(&path, &render_template(&template, &data))?;
        tracing::info!(table = table.name.as_str(), path = %path.display(), "class source written");
        paths.push(path);
    }

    Ok(paths)
}

/// Render the data-script template once per selected table, with every
/// non-empty data row exposed through `${Dotted.Path}` placeholders.
pub fn generate_data_script(opts: &RunOptions, template_path: &Path) -> Result<Vec<PathBuf>> {
    let template = read_template(template_path)?;
    let extension = template_extension(template_path);
    let workbook = Workbook::load(&opts.source)?;
    let mut ctx = RunContext::new(&workbook);
    let mut paths = Vec::new();

    for table in selected_tables(&workbook, opts.table.as_deref())? {
        let specs = ctx.specs_for(&table.name);
        let schema = SchemaNode::build(&table.name, &specs);
        let rows: Vec<Vec<(String, String)>> = table
            .rows
            .iter()
            .filter(|row| !row.is_empty())
            .map(|row| row_bindings(&specs, row))
            .collect();
        let data = TemplateData {
            table_name: &table.name,
            generated_date: generated_date(),
            schema: Some(&schema),
            rows: &rows,
        };
        let path = opts.output.join("code").join(format!("{}_Data.{}", table.name, extension));
        write_atomic(&path, &render_template(&template, &data))?;
        tracing::info!(table = table.name.as_str(), path = %path.display(), "data script written");
        paths.push(path);
    }

    Ok(paths)
}

/// The inferred schema trees of the selected tables as pretty-printed JSON.
pub fn schema_json(source: &Path, table: Option<&str>) -> Result<String> {
    let workbook = Workbook::load(source)?;
    let mut ctx = RunContext::new(&workbook);
    let mut schemas = Vec::new();

    for table in selected_tables(&workbook, table)? {
        let specs = ctx.specs_for(&table.name);
        schemas.push(SchemaNode::build(&table.name, &specs));
    }

    serde_json::to_string_pretty(&schemas).map_err(|e| GenError::RecordWrite(e.to_string()))
}

/// Records plus both generated-source artifacts in one run.
pub fn generate_all(
    opts: &RunOptions,
    class_template: &Path,
    data_template: &Path,
) -> Result<usize> {
    let written = generate_records(opts)?;
    generate_class(opts, class_template)?;
    generate_data_script(opts, data_template)?;
    Ok(written)
}

fn selected_tables<'a>(workbook: &'a Workbook, filter: Option<&str>) -> Result<Vec<&'a Table>> {
    match filter {
        Some(name) => match workbook.table(name) {
            Some(table) => Ok(vec![table]),
            None => Err(GenError::TableNotFound(name.to_string())),
        },
        None => Ok(workbook.tables().iter().collect()),
    }
}

fn read_template(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(GenError::TemplateNotFound(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(|e| GenError::io(path, e))
}

/// Generated-source files take their extension from the template file name.
fn template_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_else(|| "txt".to_string())
}

fn generated_date() -> String {
    Local::now().format("%Y/%m/%d %H:%M:%S").to_string()
}

fn row_bindings(specs: &[ColumnSpec], row: &Row) -> Vec<(String, String)> {
    specs
        .iter()
        .map(|spec| (spec.path(), row.cell(spec.column_position).to_string()))
        .collect()
}

/// Write via a sibling temporary file and rename, so readers never observe a
/// half-written artifact.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| GenError::io(parent, e))?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).map_err(|e| GenError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| GenError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workbook_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Card.csv"),
            "ID:int,Properties.Suit,Owner:Pet(Code)\n1,Spade,K1\n2,Heart,K9\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("Pet.csv"), "Code,Name\nK1,Rex\n").unwrap();
        dir
    }

    #[test]
    fn test_list_tables() {
        let dir = workbook_dir();
        assert_eq!(list_tables(dir.path()).unwrap(), vec!["Card", "Pet"]);
    }

    #[test]
    fn test_generate_records_layout() {
        let dir = workbook_dir();
        let out = tempfile::tempdir().unwrap();
        let opts = RunOptions {
            source: dir.path().to_path_buf(),
            output: out.path().to_path_buf(),
            table: None,
        };

        let written = generate_records(&opts).unwrap();
        assert_eq!(written, 3);

        let card = out.path().join("xml/Card/Card_000001.xml");
        let xml = std::fs::read_to_string(card).unwrap();
        assert!(xml.contains("<Suit>Spade</Suit>"));
        assert!(xml.contains("<Name>Rex</Name>"));
        // Pet has no ID column, so the row ordinal names the file
        assert!(out.path().join("xml/Pet/Pet_000001.xml").is_file());
    }

    #[test]
    fn test_table_filter() {
        let dir = workbook_dir();
        let out = tempfile::tempdir().unwrap();
        let opts = RunOptions {
            source: dir.path().to_path_buf(),
            output: out.path().to_path_buf(),
            table: Some("pet".to_string()),
        };

        assert_eq!(generate_records(&opts).unwrap(), 1);
        assert!(!out.path().join("xml/Card").exists());

        let opts = RunOptions { table: Some("Deck".to_string()), ..opts };
        let err = generate_records(&opts).unwrap_err();
        assert!(err.to_string().contains("Deck"));
    }

    #[test]
    fn test_generate_class_uses_template_extension() {
        let dir = workbook_dir();
        let out = tempfile::tempdir().unwrap();
        let template = dir.path().join("class_template.rs");
        std::fs::write(
            &template,
            "#ForAllSubClasses\npub struct @SubClassName;\n#EndForAllSubClasses\n",
        )
        .unwrap();

        let opts = RunOptions {
            source: dir.path().to_path_buf(),
            output: out.path().to_path_buf(),
            table: Some("Card".to_string()),
        };
        let paths = generate_class(&opts, &template).unwrap();
        assert_eq!(paths, vec![out.path().join("code/Card.rs")]);
        let code = std::fs::read_to_string(&paths[0]).unwrap();
        assert_eq!(code, "pub struct Card_Properties;\n");
    }

    #[test]
    fn test_generate_data_script_binds_rows() {
        let dir = workbook_dir();
        let out = tempfile::tempdir().unwrap();
        let template = dir.path().join("data_template.rs");
        std::fs::write(
            &template,
            "#ForAllData\nadd(${ID}, \"${Properties.Suit}\");\n#EndForAllData\n",
        )
        .unwrap();

        let opts = RunOptions {
            source: dir.path().to_path_buf(),
            output: out.path().to_path_buf(),
            table: Some("Card".to_string()),
        };
        let paths = generate_data_script(&opts, &template).unwrap();
        let code = std::fs::read_to_string(&paths[0]).unwrap();
        assert_eq!(code, "add(1, \"Spade\");\nadd(2, \"Heart\");\n");
    }

    #[test]
    fn test_missing_template_is_fatal() {
        let dir = workbook_dir();
        let opts = RunOptions {
            source: dir.path().to_path_buf(),
            output: dir.path().join("out"),
            table: None,
        };
        let err = generate_class(&opts, Path::new("/nonexistent/template.cs")).unwrap_err();
        assert!(matches!(err, GenError::TemplateNotFound(_)));
    }

    #[test]
    fn test_schema_json_dump() {
        let dir = workbook_dir();
        let json = schema_json(dir.path(), Some("Card")).unwrap();
        assert!(json.contains("\"generated_name\": \"Card_Properties\""));
        assert!(json.contains("\"tag_name\": \"Card\""));
    }
}
