// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Column type declaration parser.
//!
//! # Grammar
//!
//! ```text
//! columns     ::= declaration (',' declaration)*
//! declaration ::= [name] type [NULL | NOT NULL] [DEFAULT expr]
//! name        ::= identifier | '`' ... '`'
//! type        ::= Nullable '(' type ')'
//!               | LowCardinality '(' type ')'
//!               | Array '(' declaration ')'
//!               | Map '(' declaration ',' declaration ')'
//!               | Tuple '(' columns ')'
//!               | Nested '(' columns ')'              -- every element named
//!               | FixedString '(' n ')'
//!               | Decimal ['(' p [',' s] ')'] | DecimalNN '(' s ')'
//!               | DateTime ['(' tz ')'] | DateTime64 '(' s [',' tz] ')'
//!               | Enum8 | Enum16 | Enum '(' 'name' '=' int (',' ...)* ')'
//!               | AggregateFunction '(' func ['(' params ')'] (',' type)+ ')'
//!               | SimpleAggregateFunction '(' func ['(' params ')'] ',' type ')'
//!               | scalar
//! ```
//!
//! Keywords and type names are case-insensitive and whitespace between tokens
//! is ignored. Compound names also accept a snake_case spelling
//! (`low_cardinality`, `fixed_string`, `aggregate_function`, ...). Only `DEFAULT` clauses are scanned with an explicit depth
//! counter; everything else nests through recursion, so only top-level commas
//! separate declarations.

use super::{AggregateSpec, DataKind, EnumValues, TypeNode};
use crate::error::ParseError;
use std::str::FromStr;

type ParseResult<T> = Result<T, ParseError>;

const MAX_DATETIME64_SCALE: u32 = 9;

/// Whether a declaration may (or must) start with a column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameMode {
    Forbidden,
    Optional,
    Required,
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
    end: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str, start: usize, end: usize) -> Self {
        Self {
            input,
            pos: start,
            end,
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.input, self.pos)
    }

    fn error_at(&self, message: impl Into<String>, offset: usize) -> ParseError {
        ParseError::new(message, self.input, offset)
    }

    fn peek_char(&self) -> Option<char> {
        if self.pos >= self.end {
            return None;
        }
        self.input[self.pos..self.end].chars().next()
    }

    fn next_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.next_char();
            } else {
                break;
            }
        }
    }

    /// Skip whitespace, then consume `ch` if it is next.
    fn eat(&mut self, ch: char) -> bool {
        self.skip_whitespace();
        if self.peek_char() == Some(ch) {
            self.next_char();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ch: char) -> ParseResult<()> {
        if self.eat(ch) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", ch)))
        }
    }

    fn read_word(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.next_char();
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    /// Unquoted column names may also contain dots (`n.id` from flattened
    /// nested columns).
    fn read_name(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_alphanumeric() || ch == '_' || ch == '.' {
                self.next_char();
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    /// Case-insensitive keyword, only when followed by a non-identifier char.
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        let saved = self.pos;
        let word = self.read_word();
        if word.eq_ignore_ascii_case(keyword) {
            true
        } else {
            self.pos = saved;
            false
        }
    }

    fn read_backtick(&mut self) -> ParseResult<String> {
        let open = self.pos;
        self.next_char();
        let mut out = String::new();
        loop {
            match self.next_char() {
                Some('`') => {
                    if self.peek_char() == Some('`') {
                        self.next_char();
                        out.push('`');
                    } else {
                        return Ok(out);
                    }
                }
                Some('\\') => match self.next_char() {
                    Some(c) => out.push(c),
                    None => return Err(self.error_at("unterminated quoted identifier", open)),
                },
                Some(c) => out.push(c),
                None => return Err(self.error_at("unterminated quoted identifier", open)),
            }
        }
    }

    /// Single-quoted literal. Accepts both `''` and `\'` as an escaped quote.
    fn read_quoted(&mut self) -> ParseResult<String> {
        self.skip_whitespace();
        let open = self.pos;
        if self.next_char() != Some('\'') {
            return Err(self.error_at("expected quoted literal", open));
        }
        let mut out = String::new();
        loop {
            match self.next_char() {
                Some('\'') => {
                    if self.peek_char() == Some('\'') {
                        self.next_char();
                        out.push('\'');
                    } else {
                        return Ok(out);
                    }
                }
                Some('\\') => match self.next_char() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some(c) => out.push(c),
                    None => return Err(self.error_at("unterminated quoted literal", open)),
                },
                Some(c) => out.push(c),
                None => return Err(self.error_at("unterminated quoted literal", open)),
            }
        }
    }

    fn read_unsigned(&mut self, what: &str) -> ParseResult<u64> {
        self.skip_whitespace();
        let start = self.pos;
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            self.next_char();
        }
        if start == self.pos {
            return Err(self.error(format!("expected integer {}", what)));
        }
        self.input[start..self.pos]
            .parse()
            .map_err(|_| self.error_at(format!("{} out of range", what), start))
    }

    fn read_signed(&mut self, what: &str) -> ParseResult<i64> {
        self.skip_whitespace();
        let start = self.pos;
        if matches!(self.peek_char(), Some('-') | Some('+')) {
            self.next_char();
        }
        let digits = self.pos;
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            self.next_char();
        }
        if digits == self.pos {
            return Err(self.error_at(format!("expected integer {}", what), start));
        }
        self.input[start..self.pos]
            .parse()
            .map_err(|_| self.error_at(format!("{} out of range", what), start))
    }

    /// Raw text of a balanced `( ... )` group, whitespace outside quotes removed.
    fn read_parameters(&mut self) -> ParseResult<String> {
        let open = self.pos;
        self.next_char();
        let mut depth = 1usize;
        let mut out = String::new();
        let mut quote: Option<char> = None;
        while let Some(ch) = self.next_char() {
            if let Some(q) = quote {
                out.push(ch);
                if ch == '\\' {
                    if let Some(escaped) = self.next_char() {
                        out.push(escaped);
                    }
                } else if ch == q {
                    quote = None;
                }
                continue;
            }
            match ch {
                '\'' | '"' | '`' => {
                    quote = Some(ch);
                    out.push(ch);
                }
                '(' => {
                    depth += 1;
                    out.push(ch);
                }
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                    out.push(ch);
                }
                c if c.is_whitespace() => {}
                c => out.push(c),
            }
        }
        Err(self.error_at("unbalanced parenthesis in parameters", open))
    }

    /// `DEFAULT` expression: everything up to a top-level ',' or ')'.
    fn read_expression(&mut self) -> ParseResult<String> {
        self.skip_whitespace();
        let start = self.pos;
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        while let Some(ch) = self.peek_char() {
            if let Some(q) = quote {
                self.next_char();
                if ch == '\\' {
                    self.next_char();
                } else if ch == q {
                    quote = None;
                }
                continue;
            }
            match ch {
                '\'' | '"' | '`' => quote = Some(ch),
                '(' => depth += 1,
                ')' if depth == 0 => break,
                ')' => depth -= 1,
                ',' if depth == 0 => break,
                _ => {}
            }
            self.next_char();
        }
        if quote.is_some() {
            return Err(self.error_at("unterminated quote in DEFAULT expression", start));
        }
        if depth != 0 {
            return Err(self.error_at("unbalanced parenthesis in DEFAULT expression", start));
        }
        let expr = self.input[start..self.pos].trim();
        if expr.is_empty() {
            return Err(self.error_at("empty DEFAULT expression", start));
        }
        Ok(expr.to_string())
    }
}

/// Parse comma-separated declarations from `input[start..end]`, appending the
/// resulting nodes to `out`.
///
/// Returns the offset just past the last consumed character. Parsing stops at
/// `end` or at an unmatched `)`, which lets callers embed a declaration list
/// inside a larger grammar.
pub fn parse_columns(
    input: &str,
    start: usize,
    end: usize,
    out: &mut Vec<TypeNode>,
) -> Result<usize, ParseError> {
    if start > end || end > input.len() {
        return Err(ParseError::new("invalid range", input, start.min(input.len())));
    }
    if !input.is_char_boundary(start) || !input.is_char_boundary(end) {
        return Err(ParseError::new("range splits a character", input, start));
    }
    let mut scanner = Scanner::new(input, start, end);
    column_list(&mut scanner, NameMode::Optional, true, out)?;
    Ok(scanner.pos)
}

/// Parse a single type declaration such as `Array(Nullable(UInt8))`.
///
/// A trailing `NULL` / `NOT NULL` is accepted; names and `DEFAULT` are not.
pub fn parse_type(input: &str) -> Result<TypeNode, ParseError> {
    let mut scanner = Scanner::new(input, 0, input.len());
    let node = declaration(&mut scanner, NameMode::Forbidden, false)?;
    finish_input(&mut scanner)?;
    Ok(node)
}

/// Parse one column definition: `` [`name`] Type [NULL|NOT NULL] [DEFAULT expr] ``.
pub fn parse_column(input: &str) -> Result<TypeNode, ParseError> {
    let mut scanner = Scanner::new(input, 0, input.len());
    let node = declaration(&mut scanner, NameMode::Optional, true)?;
    finish_input(&mut scanner)?;
    Ok(node)
}

fn finish_input(s: &mut Scanner<'_>) -> ParseResult<()> {
    s.skip_whitespace();
    if s.pos < s.end {
        return Err(s.error("unexpected trailing input"));
    }
    Ok(())
}

/// Lazy iterator over a comma-separated column list.
///
/// Yields one node per declaration and stops after the first error.
pub struct ColumnList<'a> {
    input: &'a str,
    pos: usize,
    done: bool,
}

impl<'a> ColumnList<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            done: false,
        }
    }
}

impl Iterator for ColumnList<'_> {
    type Item = Result<TypeNode, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut scanner = Scanner::new(self.input, self.pos, self.input.len());
        scanner.skip_whitespace();
        if scanner.pos == scanner.end && self.pos == 0 {
            self.done = true;
            return None;
        }
        let result = declaration(&mut scanner, NameMode::Optional, true).and_then(|node| {
            scanner.skip_whitespace();
            match scanner.peek_char() {
                None => {
                    self.done = true;
                    Ok(node)
                }
                Some(',') => {
                    scanner.next_char();
                    Ok(node)
                }
                Some(_) => Err(scanner.error("expected ',' between declarations")),
            }
        });
        self.pos = scanner.pos;
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

fn column_list(
    s: &mut Scanner<'_>,
    names: NameMode,
    top_level: bool,
    out: &mut Vec<TypeNode>,
) -> ParseResult<()> {
    s.skip_whitespace();
    if matches!(s.peek_char(), None | Some(')')) {
        return Err(s.error("empty declaration list"));
    }
    loop {
        out.push(declaration(s, names, top_level)?);
        s.skip_whitespace();
        match s.peek_char() {
            Some(',') => {
                s.next_char();
            }
            None | Some(')') => return Ok(()),
            Some(_) => return Err(s.error("expected ',' or ')'")),
        }
    }
}

fn declaration(s: &mut Scanner<'_>, names: NameMode, top_level: bool) -> ParseResult<TypeNode> {
    s.skip_whitespace();
    let name = match names {
        NameMode::Forbidden => None,
        NameMode::Optional | NameMode::Required => leading_name(s)?,
    };
    if names == NameMode::Required && name.is_none() {
        return Err(s.error("expected element name"));
    }

    s.skip_whitespace();
    let type_start = s.pos;
    let mut node = type_expr(s)?;
    let mut type_end = s.pos;

    let keyword_at = {
        s.skip_whitespace();
        s.pos
    };
    if s.eat_keyword("NULL") {
        if node.kind.is_container() {
            return Err(s.error_at(format!("{} cannot be NULL", node.kind), keyword_at));
        }
        node.nullable = true;
        type_end = s.pos;
    } else if s.eat_keyword("NOT") {
        if !s.eat_keyword("NULL") {
            return Err(s.error("expected NULL after NOT"));
        }
        // Explicit Nullable(T) followed by NOT NULL contradicts itself.
        if node.nullable {
            return Err(s.error_at("NOT NULL conflicts with Nullable", keyword_at));
        }
        type_end = s.pos;
    }
    node.declaration = s.input[type_start..type_end].trim().to_string();

    if top_level && s.eat_keyword("DEFAULT") {
        node.default_expression = Some(s.read_expression()?);
    }
    node.name = name;
    Ok(node)
}

/// Decide whether the declaration starts with a name. A word followed by
/// `(`, `,`, `)`, end of input or a modifier keyword is a type, not a name.
fn leading_name(s: &mut Scanner<'_>) -> ParseResult<Option<String>> {
    if s.peek_char() == Some('`') {
        return s.read_backtick().map(Some);
    }
    let saved = s.pos;
    let word = s.read_name();
    if word.is_empty() {
        return Ok(None);
    }
    s.skip_whitespace();
    let is_type = match s.peek_char() {
        None | Some('(') | Some(',') | Some(')') => true,
        Some(c) if c.is_alphabetic() || c == '_' => {
            let probe = s.pos;
            let next = s.read_word();
            s.pos = probe;
            ["NULL", "NOT", "DEFAULT"]
                .iter()
                .any(|k| next.eq_ignore_ascii_case(k))
        }
        Some('`') => false,
        Some(_) => true,
    };
    if is_type {
        s.pos = saved;
        Ok(None)
    } else {
        Ok(Some(word.to_string()))
    }
}

fn type_expr(s: &mut Scanner<'_>) -> ParseResult<TypeNode> {
    s.skip_whitespace();
    let start = s.pos;
    let word = s.read_word();
    if word.is_empty() {
        return Err(s.error("expected type name"));
    }

    let mut node = if word.eq_ignore_ascii_case("Nullable") {
        s.expect('(')?;
        let mut inner = type_expr(s)?;
        s.expect(')')?;
        if inner.kind.is_container() {
            return Err(s.error_at(format!("Nullable cannot wrap {}", inner.kind), start));
        }
        if inner.nullable || inner.low_cardinality {
            return Err(s.error_at("Nullable must be the innermost wrapper", start));
        }
        inner.nullable = true;
        inner
    } else if word.eq_ignore_ascii_case("LowCardinality")
        || word.eq_ignore_ascii_case("low_cardinality")
    {
        s.expect('(')?;
        let mut inner = type_expr(s)?;
        s.expect(')')?;
        if inner.kind.is_container() || inner.low_cardinality {
            return Err(s.error_at(
                format!("LowCardinality cannot wrap {}", inner.kind),
                start,
            ));
        }
        inner.low_cardinality = true;
        inner
    } else if word.eq_ignore_ascii_case("Enum") {
        let values = enum_entries(s, i16::MIN as i64, i16::MAX as i64)?;
        let kind = if values.fits_i8() {
            DataKind::Enum8
        } else {
            DataKind::Enum16
        };
        let mut node = TypeNode::of(kind);
        node.enum_values = Some(values);
        node
    } else {
        let kind = DataKind::from_name(word)
            .ok_or_else(|| s.error_at(format!("unknown type '{}'", word), start))?;
        kind_body(s, kind, start)?
    };

    node.declaration = s.input[start..s.pos].trim().to_string();
    Ok(node)
}

fn kind_body(s: &mut Scanner<'_>, kind: DataKind, start: usize) -> ParseResult<TypeNode> {
    let mut node = TypeNode::of(kind);
    match kind {
        DataKind::Array => {
            s.expect('(')?;
            node.children.push(declaration(s, NameMode::Forbidden, false)?);
            s.expect(')')?;
        }
        DataKind::Map => {
            s.expect('(')?;
            let mut key = declaration(s, NameMode::Forbidden, false)?;
            s.expect(',')?;
            let mut value = declaration(s, NameMode::Forbidden, false)?;
            s.expect(')')?;
            key.name = Some("key".into());
            value.name = Some("value".into());
            node.children = vec![key, value];
        }
        DataKind::Tuple => {
            s.expect('(')?;
            column_list(s, NameMode::Optional, false, &mut node.children)?;
            s.expect(')')?;
        }
        DataKind::Nested => {
            s.expect('(')?;
            column_list(s, NameMode::Required, false, &mut node.children)?;
            s.expect(')')?;
        }
        DataKind::FixedString => {
            s.expect('(')?;
            let at = s.pos;
            let n = s.read_unsigned("length")?;
            s.expect(')')?;
            if n == 0 {
                return Err(s.error_at("FixedString length must be positive", at));
            }
            node.fixed_length = usize::try_from(n)
                .map_err(|_| s.error_at("FixedString length out of range", at))?;
        }
        DataKind::Decimal => {
            let (precision, scale) = if s.eat('(') {
                let p = s.read_unsigned("precision")?;
                let sc = if s.eat(',') { s.read_unsigned("scale")? } else { 0 };
                s.expect(')')?;
                (p, sc)
            } else {
                (10, 0)
            };
            set_decimal(s, &mut node, precision, scale, start)?;
        }
        DataKind::Decimal32 | DataKind::Decimal64 | DataKind::Decimal128 | DataKind::Decimal256 => {
            s.expect('(')?;
            let scale = s.read_unsigned("scale")?;
            s.expect(')')?;
            let precision = kind.decimal_max_precision().unwrap_or(0) as u64;
            set_decimal(s, &mut node, precision, scale, start)?;
        }
        DataKind::DateTime | DataKind::DateTime32 => {
            if s.eat('(') {
                node.timezone = Some(timezone(s)?);
                s.expect(')')?;
            }
        }
        DataKind::DateTime64 => {
            s.expect('(')?;
            let at = s.pos;
            let scale = s.read_unsigned("scale")?;
            if scale > MAX_DATETIME64_SCALE as u64 {
                return Err(s.error_at(
                    format!("DateTime64 scale {} not in [0, 9]", scale),
                    at,
                ));
            }
            node.scale = scale as u32;
            node.precision = 18;
            if s.eat(',') {
                node.timezone = Some(timezone(s)?);
            }
            s.expect(')')?;
        }
        DataKind::Enum8 => {
            node.enum_values = Some(enum_entries(s, i8::MIN as i64, i8::MAX as i64)?);
        }
        DataKind::Enum16 => {
            node.enum_values = Some(enum_entries(s, i16::MIN as i64, i16::MAX as i64)?);
        }
        DataKind::AggregateFunction | DataKind::SimpleAggregateFunction => {
            s.expect('(')?;
            s.skip_whitespace();
            let fn_at = s.pos;
            let function = s.read_word();
            if function.is_empty() {
                return Err(s.error("expected aggregate function name"));
            }
            s.skip_whitespace();
            let parameters = if s.peek_char() == Some('(') {
                s.read_parameters()?
            } else {
                String::new()
            };
            node.aggregate = Some(AggregateSpec {
                function: function.to_string(),
                parameters,
            });
            if !s.eat(',') {
                return Err(s.error("aggregate function needs at least one argument type"));
            }
            column_list(s, NameMode::Forbidden, false, &mut node.children)?;
            s.expect(')')?;
            if kind == DataKind::SimpleAggregateFunction && node.children.len() != 1 {
                return Err(s.error_at(
                    "SimpleAggregateFunction takes exactly one argument type",
                    fn_at,
                ));
            }
        }
        _ => {
            s.skip_whitespace();
            if s.peek_char() == Some('(') {
                return Err(s.error(format!("{} takes no parameters", kind)));
            }
        }
    }
    Ok(node.finish())
}

fn set_decimal(
    s: &Scanner<'_>,
    node: &mut TypeNode,
    precision: u64,
    scale: u64,
    at: usize,
) -> ParseResult<()> {
    let max = node.kind.decimal_max_precision().unwrap_or(76) as u64;
    if precision == 0 || precision > max {
        return Err(s.error_at(
            format!("decimal precision {} not in [1, {}]", precision, max),
            at,
        ));
    }
    if scale > precision {
        return Err(s.error_at(
            format!("decimal scale {} exceeds precision {}", scale, precision),
            at,
        ));
    }
    node.precision = precision as u32;
    node.scale = scale as u32;
    Ok(())
}

fn timezone(s: &mut Scanner<'_>) -> ParseResult<String> {
    s.skip_whitespace();
    let at = s.pos;
    let tz = s.read_quoted()?;
    if chrono_tz::Tz::from_str(&tz).is_err() {
        return Err(s.error_at(format!("unknown timezone '{}'", tz), at));
    }
    Ok(tz)
}

fn enum_entries(s: &mut Scanner<'_>, min: i64, max: i64) -> ParseResult<EnumValues> {
    s.expect('(')?;
    let mut values = EnumValues::new();
    loop {
        s.skip_whitespace();
        let at = s.pos;
        if s.peek_char() != Some('\'') {
            return Err(s.error("enum name must be a quoted literal"));
        }
        let name = s.read_quoted()?;
        if !s.eat('=') {
            return Err(s.error(format!("expected '=' after enum name '{}'", name)));
        }
        let value = s.read_signed("enum value")?;
        if value < min || value > max {
            return Err(s.error_at(
                format!("enum value {} not in [{}, {}]", value, min, max),
                at,
            ));
        }
        if !values.insert(name.clone(), value as i16) {
            return Err(s.error_at(format!("duplicate enum entry '{}' = {}", name, value), at));
        }
        if !s.eat(',') {
            break;
        }
    }
    s.expect(')')?;
    Ok(values)
}
