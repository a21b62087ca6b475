//! End-to-end tests over a workbook directory on disk.

use std::path::PathBuf;

use sheetgen::orchestrator::{self, RunOptions};

/// A small two-table workbook with a cross-table reference between them.
fn write_workbook() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("Card.csv"),
        "\
ID:int,Properties.Suit,Properties.Number:int,Tags:string[],Owner:Pet(Code),#Notes
1,Spade,3,\"rare, shiny\",K1,kept out of output
2,Heart,11,,K9,
",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("Pet.csv"),
        "ID:int,Code,Name\n7,K1,Rex\n8,K2,Mia\n",
    )
    .unwrap();
    dir
}

fn run_options(source: &tempfile::TempDir, output: &tempfile::TempDir) -> RunOptions {
    RunOptions {
        source: source.path().to_path_buf(),
        output: output.path().to_path_buf(),
        table: None,
    }
}

#[test]
fn test_records_end_to_end() {
    let source = write_workbook();
    let output = tempfile::tempdir().unwrap();

    let written = orchestrator::generate_records(&run_options(&source, &output)).unwrap();
    assert_eq!(written, 4);

    let card1 = std::fs::read_to_string(output.path().join("xml/Card/Card_000001.xml")).unwrap();
    assert!(card1.starts_with("<Record>"));
    assert!(card1.contains("<Suit>Spade</Suit>"));
    assert!(card1.contains("<Number>3</Number>"));
    // Array cell split on commas
    assert!(card1.contains("<Tags>rare</Tags>"));
    assert!(card1.contains("<Tags>shiny</Tags>"));
    // Resolved reference embedded as a nested record
    assert!(card1.contains("<Owner>"));
    assert!(card1.contains("<Name>Rex</Name>"));
    // Comment column never surfaces
    assert!(!card1.contains("Notes"));

    // Unresolved reference omitted without error; empty array cell emits nothing
    let card2 = std::fs::read_to_string(output.path().join("xml/Card/Card_000002.xml")).unwrap();
    assert!(!card2.contains("<Owner>"));
    assert!(!card2.contains("<Tags>"));

    assert!(output.path().join("xml/Pet/Pet_000007.xml").is_file());
    assert!(output.path().join("xml/Pet/Pet_000008.xml").is_file());
}

#[test]
fn test_class_and_data_script_end_to_end() {
    let source = write_workbook();
    let output = tempfile::tempdir().unwrap();

    let class_template = source.path().join("class.rs");
    std::fs::write(
        &class_template,
        "\
// @TableName
#ForAllSubClasses
pub struct @SubClassName {
#ForAllSubClassProperties
    pub @SubClassPropertyName: @SubClassPropertyType,
#EndForAllSubClassProperties
}
#EndForAllSubClasses
",
    )
    .unwrap();

    let data_template = source.path().join("data.rs");
    std::fs::write(
        &data_template,
        "\
#EraseDuplicatedLine
#ForAllData
use table::@TableName;
#EndForAllData
#EndErase
#ForAllData
#If(#Not(#Eq(${Properties.Suit}, Heart)))
add(${ID}, \"${Properties.Suit}\");
#Endif
#EndForAllData
",
    )
    .unwrap();

    let mut opts = run_options(&source, &output);
    opts.table = Some("Card".to_string());

    orchestrator::generate_all(&opts, &class_template, &data_template).unwrap();

    let class = std::fs::read_to_string(output.path().join("code/Card.rs")).unwrap();
    assert_eq!(
        class,
        "\
// Card
pub struct Card_Properties {
    pub Suit: String,
    pub Number: i32,
}
"
    );

    let data = std::fs::read_to_string(output.path().join("code/Card_Data.rs")).unwrap();
    assert_eq!(data, "use table::Card;\nadd(1, \"Spade\");\n");
}

#[test]
fn test_missing_source_is_fatal() {
    let err = orchestrator::generate_records(&RunOptions {
        source: PathBuf::from("/nonexistent/workbook"),
        output: PathBuf::from("/tmp/sheetgen-unused"),
        table: None,
    })
    .unwrap_err();
    assert!(err.to_string().contains("Source not found"));
}

#[test]
fn test_schema_dump_end_to_end() {
    let source = write_workbook();
    let json = orchestrator::schema_json(source.path(), None).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let tables = parsed.as_array().unwrap();
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0]["tag_name"], "Card");
    assert_eq!(tables[0]["children"][0]["generated_name"], "Card_Properties");
    // Reference column typed by the referenced table name
    let owner = tables[0]["properties"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == "Owner")
        .unwrap();
    assert_eq!(owner["type_name"], "Pet");
}
