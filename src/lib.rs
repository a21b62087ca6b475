//! # Sheetgen: Tabular Data to XML Records and Generated Source
//!
//! Sheetgen reads workbooks of tabular data whose column headers carry a small
//! schema language, and generates three kinds of artifacts: one hierarchical
//! XML data file per row, a source-code class hierarchy describing the row
//! schema, and a data-loading script with literal row values spliced in.
//!
//! ## Header mini-language
//!
//! A header is `Path:type` where the path may be dotted and the type may be an
//! array or a cross-table reference:
//!
//! ```text
//! ID:int                  scalar
//! Properties.Suit         nested group, string scalar
//! Tags:string[]           comma-separated array cell
//! Owner:Pet(Code)         reference into table Pet keyed by column Code
//! Friends:Pet(Code)[]     array of references
//! #Notes                  comment column, ignored
//! ```
//!
//! ## Templates
//!
//! Generated source files are rendered from text templates carrying loop
//! constructs (`#ForAllSubClasses`, `#ForAllSubClassProperties`,
//! `#ForAllData`), conditionals (`#If`/`#Elif`/`#Else`/`#Endif`), expression
//! macros (`#Eq`, `#Not`, `#And`, `#Or`, `#Contains`, `#Replace`) and a
//! duplicate-line eraser (`#EraseDuplicatedLine`/`#EndErase`).

// Core modules
pub mod column;
pub mod error;
pub mod record;
pub mod resolver;
pub mod schema;
pub mod table;

// Template engine
pub mod template;

// Run sequencing and output layout
pub mod orchestrator;

// Re-export key types
pub use column::{ColumnSpec, ReferenceSpec};
pub use error::{GenError, Result};
pub use record::{build_record, Record, RecordNode};
pub use resolver::RunContext;
pub use schema::{SchemaNode, SchemaProperty};
pub use table::{Row, Table, Workbook};
pub use template::{render_template, TemplateData};
