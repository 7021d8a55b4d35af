// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Column type model.
//!
//! A [`TypeNode`] is the structural form of one column type declaration such as
//! `Map(String, Array(Nullable(UInt8)))`. Nodes are built by the
//! [parser](parse_type) and are immutable afterwards.
//!
//! # Example
//!
//! ```rust
//! use chwire::types::{parse_type, DataKind};
//!
//! let node = parse_type("Array(Array(Nullable(UInt8)))").unwrap();
//! assert_eq!(node.kind(), DataKind::Array);
//! assert_eq!(node.array_level(), 2);
//! let base = node.array_base().unwrap();
//! assert!(base.is_nullable());
//! assert_eq!(base.kind(), DataKind::UInt8);
//! ```

mod enums;
mod kind;
mod parser;

pub use enums::EnumValues;
pub use kind::{decimal_width, DataKind};
pub use parser::{parse_column, parse_columns, parse_type, ColumnList};

use std::fmt::{self, Write as _};

/// Function name and parameters of an aggregate-function column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSpec {
    /// Function name, e.g. `quantiles`.
    pub function: String,
    /// Parameter list without whitespace, e.g. `0.5,0.9`; empty when absent.
    pub parameters: String,
}

impl AggregateSpec {
    /// `name(params)` or just `name`.
    pub fn signature(&self) -> String {
        if self.parameters.is_empty() {
            self.function.clone()
        } else {
            format!("{}({})", self.function, self.parameters)
        }
    }
}

/// Parsed column type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeNode {
    pub(crate) name: Option<String>,
    pub(crate) kind: DataKind,
    pub(crate) nullable: bool,
    pub(crate) low_cardinality: bool,
    pub(crate) precision: u32,
    pub(crate) scale: u32,
    pub(crate) fixed_length: usize,
    pub(crate) timezone: Option<String>,
    pub(crate) enum_values: Option<EnumValues>,
    pub(crate) aggregate: Option<AggregateSpec>,
    pub(crate) children: Vec<TypeNode>,
    pub(crate) declaration: String,
    pub(crate) default_expression: Option<String>,
    pub(crate) array_level: usize,
}

impl TypeNode {
    /// Bare node of the given kind. Used by the parser and by tests that
    /// build schemas by hand; containers still need children.
    pub(crate) fn of(kind: DataKind) -> Self {
        Self {
            name: None,
            kind,
            nullable: false,
            low_cardinality: false,
            precision: 0,
            scale: 0,
            fixed_length: 0,
            timezone: None,
            enum_values: None,
            aggregate: None,
            children: Vec::new(),
            declaration: String::new(),
            default_expression: None,
            array_level: 0,
        }
    }

    pub fn kind(&self) -> DataKind {
        self.kind
    }

    /// Column or element name, when the declaration carried one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_low_cardinality(&self) -> bool {
        self.low_cardinality
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Byte length of a `FixedString(N)`; zero for other kinds.
    pub fn fixed_length(&self) -> usize {
        self.fixed_length
    }

    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    pub fn enum_values(&self) -> Option<&EnumValues> {
        self.enum_values.as_ref()
    }

    pub fn aggregate(&self) -> Option<&AggregateSpec> {
        self.aggregate.as_ref()
    }

    pub fn children(&self) -> &[TypeNode] {
        &self.children
    }

    /// Trimmed declaration text this node was parsed from, excluding the column
    /// name and any `DEFAULT` clause.
    pub fn declaration(&self) -> &str {
        &self.declaration
    }

    pub fn default_expression(&self) -> Option<&str> {
        self.default_expression.as_deref()
    }

    /// Number of directly stacked `Array` wrappers (0 for non-arrays).
    pub fn array_level(&self) -> usize {
        self.array_level
    }

    /// Innermost non-array descendant of an array column.
    pub fn array_base(&self) -> Option<&TypeNode> {
        if self.kind != DataKind::Array {
            return None;
        }
        let mut node = self;
        while node.kind == DataKind::Array {
            node = node.children.first()?;
        }
        Some(node)
    }

    /// Byte width of decimal kinds, derived from the precision.
    pub fn decimal_width(&self) -> usize {
        decimal_width(self.precision)
    }

    /// Canonical declaration text. Re-parsing it yields a node with the same
    /// structure (names, flags, parameters and children).
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        self.render(&mut out);
        out
    }

    fn render(&self, out: &mut String) {
        if self.low_cardinality {
            out.push_str("LowCardinality(");
        }
        if self.nullable {
            out.push_str("Nullable(");
        }
        out.push_str(self.kind.name());
        match self.kind {
            DataKind::FixedString => {
                let _ = write!(out, "({})", self.fixed_length);
            }
            DataKind::Decimal => {
                let _ = write!(out, "({}, {})", self.precision, self.scale);
            }
            DataKind::Decimal32 | DataKind::Decimal64 | DataKind::Decimal128 | DataKind::Decimal256 => {
                let _ = write!(out, "({})", self.scale);
            }
            DataKind::DateTime | DataKind::DateTime32 => {
                if let Some(tz) = &self.timezone {
                    let _ = write!(out, "('{}')", escape_quoted(tz));
                }
            }
            DataKind::DateTime64 => {
                let _ = write!(out, "({}", self.scale);
                if let Some(tz) = &self.timezone {
                    let _ = write!(out, ", '{}'", escape_quoted(tz));
                }
                out.push(')');
            }
            DataKind::Enum8 | DataKind::Enum16 => {
                out.push('(');
                if let Some(values) = &self.enum_values {
                    for (i, (name, value)) in values.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        let _ = write!(out, "'{}' = {}", escape_quoted(name), value);
                    }
                }
                out.push(')');
            }
            DataKind::AggregateFunction | DataKind::SimpleAggregateFunction => {
                out.push('(');
                if let Some(spec) = &self.aggregate {
                    out.push_str(&spec.signature());
                }
                for child in &self.children {
                    out.push_str(", ");
                    child.render(out);
                }
                out.push(')');
            }
            DataKind::Array | DataKind::Map | DataKind::Tuple | DataKind::Nested => {
                out.push('(');
                for (i, child) in self.children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let named = matches!(self.kind, DataKind::Tuple | DataKind::Nested);
                    if let (true, Some(name)) = (named, &child.name) {
                        let _ = write!(out, "{} ", quote_identifier(name));
                    }
                    child.render(out);
                }
                out.push(')');
            }
            _ => {}
        }
        if self.nullable {
            out.push(')');
        }
        if self.low_cardinality {
            out.push(')');
        }
    }

    /// Rebuild derived fields after children change.
    pub(crate) fn finish(mut self) -> Self {
        self.array_level = match self.kind {
            DataKind::Array => 1 + self.children.first().map_or(0, |c| c.array_level),
            _ => 0,
        };
        self
    }
}

impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.declaration.is_empty() {
            f.write_str(&self.canonical())
        } else {
            f.write_str(&self.declaration)
        }
    }
}

fn escape_quoted(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

fn quote_identifier(name: &str) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if plain && DataKind::from_name(name).is_none() {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical_of(decl: &str) -> String {
        parse_type(decl).expect("parse").canonical()
    }

    #[test]
    fn test_canonical_rendering() {
        assert_eq!(canonical_of("array(nullable(uint8))"), "Array(Nullable(UInt8))");
        assert_eq!(canonical_of("Map(String,UInt64)"), "Map(String, UInt64)");
        assert_eq!(canonical_of("DateTime64(3,'UTC')"), "DateTime64(3, 'UTC')");
        assert_eq!(canonical_of("Decimal(10,2)"), "Decimal(10, 2)");
        assert_eq!(canonical_of("Decimal64(4)"), "Decimal64(4)");
        assert_eq!(canonical_of("FixedString(16)"), "FixedString(16)");
        assert_eq!(
            canonical_of("Enum8('a'=1,'it''s'=2)"),
            "Enum8('a' = 1, 'it\\'s' = 2)"
        );
        assert_eq!(
            canonical_of("LowCardinality(Nullable(String))"),
            "LowCardinality(Nullable(String))"
        );
        assert_eq!(
            canonical_of("AggregateFunction(quantiles(0.5, 0.9), UInt64)"),
            "AggregateFunction(quantiles(0.5,0.9), UInt64)"
        );
        assert_eq!(
            canonical_of("Nested(id UInt32, `order` String)"),
            "Nested(id UInt32, order String)"
        );
        assert_eq!(canonical_of("UInt16 NULL"), "Nullable(UInt16)");
    }

    #[test]
    fn test_canonical_reparses_to_same_structure() {
        let decls = [
            "Array(Array(Nullable(Int32)))",
            "Map(String, Tuple(UInt8, Nullable(String), UInt16 NULL))",
            "Tuple(a Int8, b Array(String))",
            "Enum16('x' = -300, 'y' = 300)",
            "DateTime('Europe/Berlin')",
            "AggregateFunction(groupBitmap, UInt32)",
            "SimpleAggregateFunction(sum, UInt64)",
            "MultiPolygon",
        ];
        for decl in decls {
            let first = parse_type(decl).expect("parse");
            let second = parse_type(&first.canonical()).expect("reparse");
            assert_eq!(first.canonical(), second.canonical(), "{decl}");
            assert_eq!(first.kind(), second.kind());
            assert_eq!(first.children().len(), second.children().len());
        }
    }

    #[test]
    fn test_array_base_and_level() {
        let node = parse_type("Array(Array(Array(String)))").expect("parse");
        assert_eq!(node.array_level(), 3);
        assert_eq!(node.array_base().map(TypeNode::kind), Some(DataKind::String));

        let scalar = parse_type("String").expect("parse");
        assert_eq!(scalar.array_level(), 0);
        assert!(scalar.array_base().is_none());
    }

    #[test]
    fn test_display_prefers_declaration() {
        let node = parse_type("  array( UInt8 ) ").expect("parse");
        assert_eq!(node.to_string(), "array( UInt8 )");
    }
}
