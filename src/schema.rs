//! Schema tree builder.
//!
//! Folds a table's flat list of dotted column paths into a tree of record
//! types. Repeated path prefixes across columns collapse into one shared node,
//! and every node gets a globally unique generated name built from its parent
//! chain (`Card` -> `Card_Properties` -> `Card_Properties_Detail`).

use serde::Serialize;

use crate::column::ColumnSpec;

/// One leaf property of a schema node
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SchemaProperty {
    pub name: String,
    /// Declared type name; a referenced table name for reference columns
    pub type_name: String,
    pub is_array: bool,
}

/// One node of the inferred type tree for a table
#[derive(Debug, Clone, Serialize)]
pub struct SchemaNode {
    /// Last path segment, the externally visible field/element name
    pub tag_name: String,
    /// Globally unique name: parent generated name + `_` + tag name
    pub generated_name: String,
    pub is_root: bool,
    pub properties: Vec<SchemaProperty>,
    pub children: Vec<SchemaNode>,
}

impl SchemaNode {
    /// Build the full tree for one table from its parsed column specs.
    pub fn build(table_name: &str, specs: &[ColumnSpec]) -> SchemaNode {
        let mut root = SchemaNode {
            tag_name: table_name.to_string(),
            generated_name: table_name.to_string(),
            is_root: true,
            properties: Vec::new(),
            children: Vec::new(),
        };

        for spec in specs {
            // Reference columns surface as a property typed by the referenced
            // table's generated root class name.
            let type_name = match &spec.reference {
                Some(reference) => reference.table.clone(),
                None => spec.type_name.clone(),
            };
            root.add_path(&spec.path_parts, &type_name, spec.is_array);
        }

        root
    }

    fn add_path(&mut self, parts: &[String], type_name: &str, is_array: bool) {
        match parts {
            [] => {}
            [leaf] => {
                self.properties.push(SchemaProperty {
                    name: leaf.clone(),
                    type_name: type_name.to_string(),
                    is_array,
                });
            }
            [segment, rest @ ..] => {
                let position = self.children.iter().position(|c| &c.tag_name == segment);
                let child = match position {
                    Some(i) => &mut self.children[i],
                    None => {
                        let generated_name = format!("{}_{}", self.generated_name, segment);
                        self.children.push(SchemaNode {
                            tag_name: segment.clone(),
                            generated_name,
                            is_root: false,
                            properties: Vec::new(),
                            children: Vec::new(),
                        });
                        self.children.last_mut().unwrap()
                    }
                };
                child.add_path(rest, type_name, is_array);
            }
        }
    }

    /// Depth-first traversal, parent before child, every node exactly once.
    pub fn walk(&self) -> Vec<&SchemaNode> {
        let mut nodes = vec![self];
        for child in &self.children {
            nodes.extend(child.walk());
        }
        nodes
    }

    /// All non-root nodes in traversal order (the sub-type loop's data source)
    pub fn sub_nodes(&self) -> Vec<&SchemaNode> {
        self.walk().into_iter().filter(|n| !n.is_root).collect()
    }

    /// The union of scalar properties and child-node references as name/type
    /// pairs, the way the property loop exposes them: one uniform list whether
    /// the field is a scalar or a nested record type.
    pub fn template_properties(&self) -> Vec<(String, String)> {
        let mut all = Vec::new();
        for prop in &self.properties {
            all.push((prop.name.clone(), rust_type(&prop.type_name, prop.is_array)));
        }
        for child in &self.children {
            all.push((child.tag_name.clone(), child.generated_name.clone()));
        }
        all
    }
}

/// Map a declared type onto the generated-source type exposed to templates.
/// Unrecognized names pass through so headers can reference generated classes.
pub fn rust_type(type_name: &str, is_array: bool) -> String {
    let base = match type_name {
        "int" => "i32",
        "long" => "i64",
        "float" => "f32",
        "double" => "f64",
        "bool" => "bool",
        "date" | "datetime" => "String",
        "string" => "String",
        other => other,
    };
    if is_array {
        format!("Vec<{}>", base)
    } else {
        base.to_string()
    }
}
