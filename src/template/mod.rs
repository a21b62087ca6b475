//! Text-macro template engine for generated source files.
//!
//! A template is plain text carrying loop constructs (`#ForAllSubClasses`,
//! `#ForAllSubClassProperties`, `#ForAllData`), conditional blocks
//! (`#If`/`#Elif`/`#Else`/`#Endif`), expression macros (`#Eq`, `#Not`, `#And`,
//! `#Or`, `#Contains`, `#Replace`) and a duplicate-line eraser. Rendering is
//! parse once, walk the tree, then resolve any expression macros left at the
//! top level.

pub mod expr;
pub mod parser;
pub mod render;

pub use render::TemplateData;

/// Render a template end to end. Output newlines are normalized to `\n`
/// regardless of how the template file was authored.
pub fn render_template(template: &str, data: &TemplateData<'_>) -> String {
    let nodes = parser::parse(template);
    let rendered = render::render(&nodes, data);
    let resolved = expr::resolve_macros(&rendered);
    normalize_newlines(&resolved)
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
