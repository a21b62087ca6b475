//! Tree-walking template renderer.
//!
//! Walks the parsed AST with a substitution scope. Loop nodes re-render their
//! body once per item with the item's variables pushed onto the scope, which
//! is what lets conditionals inside a loop see per-iteration values.

use std::collections::HashSet;

use crate::schema::SchemaNode;
use crate::template::expr;
use crate::template::parser::{Branch, LoopKind, Node};

/// Everything a template can draw on: table-scope variables, the schema tree
/// and the raw data rows (each row a list of dotted-path/value pairs).
pub struct TemplateData<'a> {
    pub table_name: &'a str,
    pub generated_date: String,
    pub schema: Option<&'a SchemaNode>,
    pub rows: &'a [Vec<(String, String)>],
}

/// Substitution scope for one render position. Variables are applied in
/// order, innermost first, plain string substitution with no escaping.
#[derive(Default, Clone)]
struct Scope<'a> {
    vars: Vec<(String, String)>,
    node: Option<&'a SchemaNode>,
}

impl<'a> Scope<'a> {
    fn with_vars(&self, extra: Vec<(String, String)>, node: Option<&'a SchemaNode>) -> Scope<'a> {
        let mut vars = extra;
        vars.extend(self.vars.iter().cloned());
        Scope { vars, node: node.or(self.node) }
    }
}

/// Render a parsed template against its data sources.
pub fn render(nodes: &[Node], data: &TemplateData<'_>) -> String {
    render_nodes(nodes, data, &Scope::default())
}

fn render_nodes<'a>(nodes: &[Node], data: &TemplateData<'a>, scope: &Scope<'a>) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(&substitute(text, data, scope)),
            Node::Loop { kind, body } => out.push_str(&render_loop(*kind, body, data, scope)),
            Node::Cond { branches } => out.push_str(&render_cond(branches, data, scope)),
            Node::Erase { body } => {
                let rendered = render_nodes(body, data, scope);
                // Macros resolve before line comparison so equal lines that
                // only differ in unresolved macro text still collapse
                let resolved = expr::resolve_macros(&rendered);
                out.push_str(&erase_duplicate_lines(&resolved));
            }
        }
    }
    out
}

fn substitute(text: &str, data: &TemplateData<'_>, scope: &Scope<'_>) -> String {
    let mut result = text.to_string();
    for (token, value) in &scope.vars {
        result = result.replace(token, value);
    }
    result = result.replace("@TableName", data.table_name);
    result = result.replace("@GeneratedDate", &data.generated_date);
    result
}

fn render_loop<'a>(
    kind: LoopKind,
    body: &[Node],
    data: &TemplateData<'a>,
    scope: &Scope<'a>,
) -> String {
    let mut out = String::new();
    match kind {
        LoopKind::SubClasses => {
            let Some(schema) = data.schema else {
                return out;
            };
            for node in schema.sub_nodes() {
                let vars = vec![
                    ("@SubClassName".to_string(), node.generated_name.clone()),
                    ("@SubClassTagName".to_string(), node.tag_name.clone()),
                ];
                let inner = scope.with_vars(vars, Some(node));
                out.push_str(&render_nodes(body, data, &inner));
            }
        }
        LoopKind::SubClassProperties => {
            // Outside a sub-type loop the property loop binds to the root node
            let Some(node) = scope.node.or(data.schema) else {
                return out;
            };
            for (name, type_name) in node.template_properties() {
                let vars = vec![
                    ("@SubClassPropertyName".to_string(), name),
                    ("@SubClassPropertyType".to_string(), type_name),
                ];
                let inner = scope.with_vars(vars, scope.node);
                out.push_str(&render_nodes(body, data, &inner));
            }
        }
        LoopKind::Data => {
            for row in data.rows {
                let vars = row
                    .iter()
                    .map(|(path, value)| (format!("${{{}}}", path), value.clone()))
                    .collect();
                let inner = scope.with_vars(vars, scope.node);
                out.push_str(&render_nodes(body, data, &inner));
            }
        }
    }
    out
}

/// Exactly one branch is selected: the first whose condition, after variable
/// substitution and expression-macro resolution, equals `True`; or the else
/// branch; or nothing.
fn render_cond<'a>(branches: &[Branch], data: &TemplateData<'a>, scope: &Scope<'a>) -> String {
    for branch in branches {
        let selected = match &branch.condition {
            None => true,
            Some(condition) => {
                let substituted = substitute(condition, data, scope);
                expr::resolve_macros(&substituted).trim() == "True"
            }
        };
        if selected {
            return render_nodes(&branch.body, data, scope);
        }
    }
    String::new()
}

/// Keep only the first occurrence of each distinct trimmed line, in original
/// order; blank lines deduplicate by the same rule.
pub fn erase_duplicate_lines(text: &str) -> String {
    let mut seen = HashSet::new();
    let mut out = String::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if seen.insert(trimmed.to_string()) {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::parse_headers;
    use crate::schema::SchemaNode;
    use crate::template::parser::parse;

    fn schema(table: &str, headers: &[&str]) -> SchemaNode {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        SchemaNode::build(table, &parse_headers(&headers))
    }

    fn data<'a>(table_name: &'a str, schema: Option<&'a SchemaNode>) -> TemplateData<'a> {
        TemplateData {
            table_name,
            generated_date: "2026/01/01 00:00:00".to_string(),
            schema,
            rows: &[],
        }
    }

    #[test]
    fn test_table_scope_substitution() {
        let nodes = parse("// @TableName at @GeneratedDate\n");
        let out = render(&nodes, &data("Card", None));
        assert_eq!(out, "// Card at 2026/01/01 00:00:00\n");
    }

    #[test]
    fn test_subclass_loop() {
        let schema = schema("Card", &["ID:int", "Properties.Suit", "Status.Number:int"]);
        let nodes = parse("#ForAllSubClasses\nstruct @SubClassName; // tag @SubClassTagName\n#EndForAllSubClasses\n");
        let out = render(&nodes, &data("Card", Some(&schema)));
        assert_eq!(
            out,
            "struct Card_Properties; // tag Properties\nstruct Card_Status; // tag Status\n"
        );
    }

    #[test]
    fn test_property_loop_inside_subclass_loop() {
        let schema = schema("Card", &["Properties.Suit", "Properties.Number:int"]);
        let template = "#ForAllSubClasses\n#ForAllSubClassProperties\n@SubClassName.@SubClassPropertyName: @SubClassPropertyType\n#EndForAllSubClassProperties\n#EndForAllSubClasses\n";
        let out = render(&parse(template), &data("Card", Some(&schema)));
        assert_eq!(
            out,
            "Card_Properties.Suit: String\nCard_Properties.Number: i32\n"
        );
    }

    #[test]
    fn test_property_loop_binds_to_root_outside_subclass_loop() {
        let schema = schema("Card", &["ID:int", "Info.Color"]);
        let template = "#ForAllSubClassProperties\n@SubClassPropertyName: @SubClassPropertyType\n#EndForAllSubClassProperties\n";
        let out = render(&parse(template), &data("Card", Some(&schema)));
        assert_eq!(out, "ID: i32\nInfo: Card_Info\n");
    }

    #[test]
    fn test_data_loop_with_conditional_per_row() {
        let rows = vec![
            vec![
                ("Id".to_string(), "1".to_string()),
                ("Properties.Suit".to_string(), "Spade".to_string()),
            ],
            vec![
                ("Id".to_string(), "2".to_string()),
                ("Properties.Suit".to_string(), "Heart".to_string()),
            ],
        ];
        let template = "#ForAllData\nitem${Id} = \"${Properties.Suit}\";\n#If(#Eq(${Properties.Suit}, Spade))\nitem${Id}.trumps = true;\n#Endif\n#EndForAllData\n";
        let template_data = TemplateData {
            table_name: "Card",
            generated_date: String::new(),
            schema: None,
            rows: &rows,
        };
        let out = render(&parse(template), &template_data);
        assert_eq!(
            out,
            "item1 = \"Spade\";\nitem1.trumps = true;\nitem2 = \"Heart\";\n"
        );
    }

    #[test]
    fn test_nested_conditional_suppression() {
        let template = "#If(True)\nkept\n#If(False)\nX\n#Endif\nalso kept\n#Endif\n";
        let out = render(&parse(template), &data("T", None));
        assert_eq!(out, "kept\nalso kept\n");
        assert!(!out.contains("#If"));
        assert!(!out.contains("#Endif"));
    }

    #[test]
    fn test_elif_else_selection() {
        let template = "#If(#Eq(a,b))\nfirst\n#Elif(#Eq(c,c))\nsecond\n#Else\nthird\n#Endif\n";
        let out = render(&parse(template), &data("T", None));
        assert_eq!(out, "second\n");

        let template = "#If(#Eq(a,b))\nfirst\n#Elif(#Eq(c,d))\nsecond\n#Else\nthird\n#Endif\n";
        let out = render(&parse(template), &data("T", None));
        assert_eq!(out, "third\n");
    }

    #[test]
    fn test_no_branch_selected_emits_nothing() {
        let out = render(&parse("a\n#If(False)\nx\n#Endif\nb\n"), &data("T", None));
        assert_eq!(out, "a\nb\n");
    }

    #[test]
    fn test_erase_duplicate_lines() {
        assert_eq!(erase_duplicate_lines("using A;\nusing A;\n"), "using A;\n");
        // Trim-insensitive comparison, first occurrence kept
        assert_eq!(erase_duplicate_lines("use a;\n  use a;\nuse b;\n"), "use a;\nuse b;\n");
        // Blank lines deduplicate too
        assert_eq!(erase_duplicate_lines("a\n\nb\n\nc\n"), "a\n\nb\nc\n");
    }

    #[test]
    fn test_erase_block_renders_then_dedups() {
        let rows = vec![
            vec![("Kind".to_string(), "A".to_string())],
            vec![("Kind".to_string(), "A".to_string())],
            vec![("Kind".to_string(), "B".to_string())],
        ];
        let template = "#EraseDuplicatedLine\n#ForAllData\nuse ${Kind};\n#EndForAllData\n#EndErase\n";
        let template_data = TemplateData {
            table_name: "T",
            generated_date: String::new(),
            schema: None,
            rows: &rows,
        };
        let out = render(&parse(template), &template_data);
        assert_eq!(out, "use A;\nuse B;\n");
    }
}
