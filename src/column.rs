//! Column-header mini-language parser.
//!
//! One header cell encodes a property path, scalar type, array-ness and an
//! optional cross-table reference:
//!
//! ```text
//! Name                      string scalar (no type part)
//! Status.Number:int         nested path, int scalar
//! Tags:string[]             comma-separated array cell
//! Owner:Pet(Code)           reference into table Pet keyed by column Code
//! Friends:Pet(Code)[]       one-to-many reference
//! #Memo                     comment column, excluded from the spec list
//! ```
//!
//! Malformed type syntax never fails: it degrades to a plain string column,
//! matching the permissive behavior downstream templates rely on.

/// Cross-table reference target parsed from `Type(KeyColumn)` syntax
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSpec {
    /// Name of the referenced table
    pub table: String,
    /// Key column in the referenced table, matched against its property names
    pub key_column: String,
}

/// Parsed metadata for one header cell
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    /// Ordered dot-separated path segments; never empty
    pub path_parts: Vec<String>,
    /// Declared scalar type, `string` when absent or unrecognized syntax
    pub type_name: String,
    /// `[]` suffix on the type part
    pub is_array: bool,
    /// Present only for `Type(KeyColumn)` reference columns
    pub reference: Option<ReferenceSpec>,
    /// 1-based physical offset into the row, comment columns included
    pub column_position: usize,
}

impl ColumnSpec {
    /// Parse one header cell. Returns `None` for comment headers (leading `#`)
    /// and for empty cells; both still occupy their column position.
    pub fn parse(header: &str, column_position: usize) -> Option<ColumnSpec> {
        let header = header.trim();
        if header.is_empty() || header.starts_with('#') {
            return None;
        }

        let (name_part, type_part) = match header.split_once(':') {
            Some((name, ty)) => (name.trim(), Some(ty.trim())),
            None => (header, None),
        };

        let path_parts: Vec<String> = name_part.split('.').map(|p| p.trim().to_string()).collect();

        let mut spec = ColumnSpec {
            path_parts,
            type_name: "string".to_string(),
            is_array: false,
            reference: None,
            column_position,
        };

        if let Some(type_part) = type_part {
            spec.apply_type_part(type_part);
        }

        Some(spec)
    }

    /// Last path segment, the externally visible property name
    pub fn property_name(&self) -> &str {
        self.path_parts.last().map(|s| s.as_str()).unwrap_or("")
    }

    /// Full dotted path, the substitution key used by the data loop
    pub fn path(&self) -> String {
        self.path_parts.join(".")
    }

    /// True when this column holds the record identifier
    pub fn is_id_column(&self) -> bool {
        self.property_name().eq_ignore_ascii_case("ID")
    }

    fn apply_type_part(&mut self, type_part: &str) {
        if type_part.is_empty() {
            return;
        }

        // 1. Reference syntax: Type(Key), Type(Key)[], Type[](Key)
        if let Some((reference, is_array)) = parse_reference(type_part) {
            self.reference = Some(reference);
            self.is_array = is_array;
            return;
        }

        // 2. Array scalar: type[]
        if let Some(base) = type_part.strip_suffix("[]") {
            self.is_array = true;
            self.type_name = normalize_scalar(base.trim());
            return;
        }

        // 3. Plain scalar. Broken reference syntax lands here too and becomes
        // an ordinary string-ish column.
        if type_part.contains('(') {
            tracing::debug!(type_part, "unparseable type syntax, kept as scalar");
        }
        self.type_name = normalize_scalar(type_part);
    }
}

/// Match `Type(KeyColumn)` with an optional `[]` on the type name or after the
/// closing paren. The key column may carry its own `:type` qualifier, which is
/// stripped. Returns `None` when the text is not reference syntax.
fn parse_reference(type_part: &str) -> Option<(ReferenceSpec, bool)> {
    let open = type_part.find('(')?;
    let close = type_part.rfind(')')?;
    if close < open {
        return None;
    }

    let mut table = type_part[..open].trim();
    let key_raw = &type_part[open + 1..close];
    let trailing = type_part[close + 1..].trim();

    let mut is_array = false;
    if let Some(stripped) = table.strip_suffix("[]") {
        table = stripped.trim_end();
        is_array = true;
    }
    match trailing {
        "" => {}
        "[]" => is_array = true,
        // Trailing junk after the parens: not reference syntax
        _ => return None,
    }

    if table.is_empty() || !table.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }

    // "Code:int" -> "Code"
    let key_column = key_raw.split(':').next().unwrap_or("").trim();
    if key_column.is_empty() {
        return None;
    }

    Some((
        ReferenceSpec { table: table.to_string(), key_column: key_column.to_string() },
        is_array,
    ))
}

/// Map a declared scalar onto the closed type set, case-insensitively.
/// Unrecognized names pass through unchanged, which lets headers reference
/// already-generated sibling class names.
fn normalize_scalar(name: &str) -> String {
    match name.to_ascii_lowercase().as_str() {
        "int" => "int".to_string(),
        "long" => "long".to_string(),
        "float" => "float".to_string(),
        "double" => "double".to_string(),
        "bool" => "bool".to_string(),
        "date" => "date".to_string(),
        "datetime" => "datetime".to_string(),
        "string" => "string".to_string(),
        _ => name.to_string(),
    }
}

/// Parse a full header row into the spec list. Comment and empty headers are
/// excluded but keep consuming column positions.
pub fn parse_headers(headers: &[String]) -> Vec<ColumnSpec> {
    headers
        .iter()
        .enumerate()
        .filter_map(|(i, header)| ColumnSpec::parse(header, i + 1))
        .collect()
}
