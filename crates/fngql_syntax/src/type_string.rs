//! Parser for rendered structural type strings.
//!
//! Takes text such as `{ a: string; b?: { c: number[] } | undefined; }` and
//! returns a map from dotted field path to the field's type information. The
//! scan is deliberately shallow: values are only decomposed when they are a
//! single object shape; anything else is kept as opaque text.

use indexmap::IndexMap;
use miette::SourceSpan;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Type information for one field path.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct TypeStringEntry {
    /// The value type text with `undefined` arms removed.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub ty: String,
    /// `name?:` or a `| undefined` arm.
    pub is_optional: bool,
    pub is_array: bool,
    /// Set only by a `| undefined` arm.
    pub can_be_undefined: bool,
}

/// A path-keyed map in declaration order.
pub type TypeStringMap = IndexMap<String, TypeStringEntry>;

/// Error produced for malformed type strings.
#[derive(Debug, Clone, thiserror::Error, miette::Diagnostic)]
#[error("{message} at offset {offset}: `{excerpt}`")]
#[diagnostic(code(fngql::type_string))]
pub struct TypeStringError {
    pub message: String,
    pub offset: usize,
    pub excerpt: String,
    #[source_code]
    pub source_text: String,
    #[label("here")]
    pub span: SourceSpan,
}

/// Parses a structural type string into a path-keyed map.
///
/// Keys are prefixed with `prefix.` when a non-empty prefix is given.
pub fn parse_type_string(input: &str, prefix: &str) -> Result<TypeStringMap, TypeStringError> {
    let scanner = Scanner { src: input };
    let mut map = TypeStringMap::new();

    let (start, end) = trimmed_bounds(input, 0, input.len());
    let (_, end) = strip_undefined_suffix(input, start, end);

    if input.as_bytes().get(start) != Some(&b'{') {
        return Err(scanner.error("expected `{` at start of type", start));
    }
    let close = find_matching(input.as_bytes(), start).ok_or_else(|| scanner.error("unterminated `{`", start))?;
    if trimmed_bounds(input, close + 1, end).0 != end {
        return Err(scanner.error("unexpected text after object type", close + 1));
    }

    scanner.parse_object(start + 1, close, prefix, &mut map)?;
    Ok(map)
}

struct Scanner<'a> {
    src: &'a str,
}

impl<'a> Scanner<'a> {
    fn error(&self, message: &str, offset: usize) -> TypeStringError {
        let offset = offset.min(self.src.len());
        let excerpt_end = (offset + 24).min(self.src.len());
        let excerpt_end = (excerpt_end..=self.src.len())
            .find(|i| self.src.is_char_boundary(*i))
            .unwrap_or(self.src.len());
        TypeStringError {
            message: message.to_string(),
            offset,
            excerpt: self.src[offset..excerpt_end].trim_end().to_string(),
            source_text: self.src.to_string(),
            span: SourceSpan::new(offset.into(), 1.min(self.src.len() - offset)),
        }
    }

    /// Parses the members between `{` (exclusive `start`) and `}` (exclusive `end`).
    fn parse_object(
        &self,
        start: usize,
        end: usize,
        prefix: &str,
        map: &mut TypeStringMap,
    ) -> Result<(), TypeStringError> {
        let bytes = self.src.as_bytes();
        let mut pos = start;

        loop {
            while pos < end && (bytes[pos].is_ascii_whitespace() || matches!(bytes[pos], b';' | b',')) {
                pos += 1;
            }
            if pos >= end {
                return Ok(());
            }

            let name_start = pos;
            let mut name = self.scan_name(&mut pos, end)?;
            if name == "readonly" && pos < end && bytes[pos] == b' ' {
                skip_spaces(bytes, &mut pos, end);
                if pos < end && !matches!(bytes[pos], b':' | b'?') {
                    name = self.scan_name(&mut pos, end)?;
                }
            }

            skip_spaces(bytes, &mut pos, end);
            let mut is_optional = false;
            if pos < end && bytes[pos] == b'?' {
                is_optional = true;
                pos += 1;
                skip_spaces(bytes, &mut pos, end);
            }
            if pos >= end || bytes[pos] != b':' {
                return Err(self.error(&format!("expected `:` after property `{name}`"), pos.max(name_start)));
            }
            pos += 1;

            let value_start = pos;
            let value_end = scan_value(bytes, pos, end);
            pos = value_end;

            let (vs, ve) = trimmed_bounds(self.src, value_start, value_end);
            if vs == ve {
                return Err(self.error(&format!("missing type for property `{name}`"), value_start));
            }
            let can_be_undefined = has_undefined_arm(self.src, vs, ve);
            let ty = remove_undefined_arms(self.src, vs, ve);
            let ty = if ty.is_empty() {
                self.src[vs..ve].to_string()
            } else {
                ty
            };
            let is_optional = is_optional || can_be_undefined;

            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            map.insert(
                path.clone(),
                TypeStringEntry {
                    is_array: is_array_type(&ty),
                    ty,
                    is_optional,
                    can_be_undefined,
                },
            );

            if let Some((inner_start, inner_end)) = single_object_shape(self.src, vs, ve) {
                self.parse_object(inner_start + 1, inner_end, &path, map)?;
            }
        }
    }

    fn scan_name(&self, pos: &mut usize, end: usize) -> Result<String, TypeStringError> {
        let bytes = self.src.as_bytes();
        let start = *pos;
        if matches!(bytes[start], b'"' | b'\'') {
            let quote = bytes[start];
            let mut i = start + 1;
            while i < end && bytes[i] != quote {
                if bytes[i] == b'\\' {
                    i += 1;
                }
                i += 1;
            }
            if i >= end {
                return Err(self.error("unterminated quoted property name", start));
            }
            *pos = i + 1;
            return Ok(self.src[start + 1..i].to_string());
        }
        let mut i = start;
        while i < end && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'_' | b'$') || bytes[i] >= 0x80) {
            i += 1;
        }
        if i == start {
            return Err(self.error("expected a property name", start));
        }
        *pos = i;
        Ok(self.src[start..i].to_string())
    }
}

fn skip_spaces(bytes: &[u8], pos: &mut usize, end: usize) {
    while *pos < end && bytes[*pos].is_ascii_whitespace() {
        *pos += 1;
    }
}

fn trimmed_bounds(src: &str, mut start: usize, mut end: usize) -> (usize, usize) {
    let bytes = src.as_bytes();
    while start < end && bytes[start].is_ascii_whitespace() {
        start += 1;
    }
    while end > start && bytes[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    (start, end)
}

/// Scans a property value up to its top-level `;`/`,` or `end`.
fn scan_value(bytes: &[u8], mut pos: usize, end: usize) -> usize {
    let mut depth = 0usize;
    while pos < end {
        match bytes[pos] {
            b'"' | b'\'' | b'`' => pos = skip_quoted(bytes, pos, end),
            b'=' if bytes.get(pos + 1) == Some(&b'>') => pos += 1,
            b'{' | b'(' | b'[' | b'<' => depth += 1,
            b'}' | b')' | b']' | b'>' => depth = depth.saturating_sub(1),
            b';' | b',' if depth == 0 => return pos,
            _ => {}
        }
        pos += 1;
    }
    end
}

/// Returns the index of the closing quote.
fn skip_quoted(bytes: &[u8], start: usize, end: usize) -> usize {
    let quote = bytes[start];
    let mut pos = start + 1;
    while pos < end && bytes[pos] != quote {
        if bytes[pos] == b'\\' {
            pos += 1;
        }
        pos += 1;
    }
    pos.min(end.saturating_sub(1))
}

fn find_matching(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut pos = open;
    while pos < bytes.len() {
        match bytes[pos] {
            b'"' | b'\'' | b'`' => pos = skip_quoted(bytes, pos, bytes.len()),
            b'{' | b'(' | b'[' => depth += 1,
            b'}' | b')' | b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(pos);
                }
            }
            _ => {}
        }
        pos += 1;
    }
    None
}

/// Splits `src[start..end]` into its top-level union arms.
fn union_arms(src: &str, start: usize, end: usize) -> Vec<(usize, usize)> {
    let bytes = src.as_bytes();
    let mut arms = Vec::new();
    let mut depth = 0usize;
    let mut arm_start = start;
    let mut pos = start;
    while pos < end {
        match bytes[pos] {
            b'"' | b'\'' | b'`' => pos = skip_quoted(bytes, pos, end),
            b'=' if bytes.get(pos + 1) == Some(&b'>') => pos += 1,
            b'{' | b'(' | b'[' | b'<' => depth += 1,
            b'}' | b')' | b']' | b'>' => depth = depth.saturating_sub(1),
            b'|' if depth == 0 => {
                arms.push(trimmed_bounds(src, arm_start, pos));
                arm_start = pos + 1;
            }
            _ => {}
        }
        pos += 1;
    }
    arms.push(trimmed_bounds(src, arm_start, end));
    arms.retain(|(s, e)| s < e);
    arms
}

fn has_undefined_arm(src: &str, start: usize, end: usize) -> bool {
    union_arms(src, start, end)
        .iter()
        .any(|&(s, e)| &src[s..e] == "undefined")
}

/// Removes trailing `| undefined` arms, returning the new bounds.
fn strip_undefined_suffix(src: &str, start: usize, mut end: usize) -> (usize, usize) {
    loop {
        let trimmed = src[start..end].trim_end();
        let Some(rest) = trimmed.strip_suffix("undefined") else {
            return (start, end);
        };
        let rest = rest.trim_end();
        let Some(rest) = rest.strip_suffix('|') else {
            return (start, end);
        };
        end = start + rest.len();
    }
}

fn remove_undefined_arms(src: &str, start: usize, end: usize) -> String {
    union_arms(src, start, end)
        .into_iter()
        .map(|(s, e)| &src[s..e])
        .filter(|arm| *arm != "undefined")
        .collect::<Vec<_>>()
        .join(" | ")
}

/// True when the type, or any top-level union arm, is an array.
fn is_array_type(ty: &str) -> bool {
    union_arms(ty, 0, ty.len()).iter().any(|&(s, e)| {
        let arm = &ty[s..e];
        arm.ends_with("[]") || arm.starts_with("Array<") || arm.starts_with("ReadonlyArray<")
    })
}

/// Returns the brace bounds of the value when it is exactly one object shape
/// (optionally nullable, optionally an array of that shape).
fn single_object_shape(src: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let arms: Vec<_> = union_arms(src, start, end)
        .into_iter()
        .filter(|&(s, e)| !matches!(&src[s..e], "null" | "undefined"))
        .collect();
    let [(s, e)] = arms.as_slice() else {
        return None;
    };
    let bytes = src.as_bytes();
    if bytes[*s] != b'{' {
        return None;
    }
    let close = find_matching(bytes, *s)?;
    let mut suffix = &src[close + 1..*e];
    while let Some(rest) = suffix.trim_start().strip_prefix("[]") {
        suffix = rest;
    }
    suffix.trim().is_empty().then_some((*s, close))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ty: &str, is_optional: bool, is_array: bool, can_be_undefined: bool) -> TypeStringEntry {
        TypeStringEntry {
            ty: ty.to_string(),
            is_optional,
            is_array,
            can_be_undefined,
        }
    }

    #[test]
    fn test_flat_object() {
        let map = parse_type_string("{ a: string; b?: number; }", "").unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"], entry("string", false, false, false));
        assert_eq!(map["b"], entry("number", true, false, false));
    }

    #[test]
    fn test_nested_object_includes_parent() {
        let map = parse_type_string("{ nested: { value: boolean; items: string[] }; }", "root").unwrap();
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["root.nested", "root.nested.value", "root.nested.items"]);
        assert!(map["root.nested.items"].is_array);
        assert!(!map["root.nested"].is_array);
    }

    #[test]
    fn test_semantic_optional_keeps_can_be_undefined() {
        let map = parse_type_string("{ a: string | undefined; b?: string | undefined }", "").unwrap();
        assert_eq!(map["a"], entry("string", true, false, true));
        assert_eq!(map["b"], entry("string", true, false, true));
    }

    #[test]
    fn test_root_undefined_is_stripped() {
        let map = parse_type_string("{ a: string } | undefined", "").unwrap();
        assert_eq!(map["a"].ty, "string");
    }

    #[test]
    fn test_union_of_objects_is_opaque() {
        let map = parse_type_string("{ u: { a: string } | { b: number }; }", "").unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["u"].ty, "{ a: string } | { b: number }");
    }

    #[test]
    fn test_array_detection() {
        let map = parse_type_string(
            "{ a: (string | number)[]; b: { x: string }[]; c: string | number[]; d: Map<string, number>; }",
            "",
        )
        .unwrap();
        assert!(map["a"].is_array);
        assert!(map["b"].is_array);
        assert!(map.contains_key("b.x"));
        assert!(map["c"].is_array);
        assert!(!map["d"].is_array);
    }

    #[test]
    fn test_function_values() {
        let map = parse_type_string("{ f: (a: string, b: number) => void; g: string }", "").unwrap();
        assert_eq!(map["f"].ty, "(a: string, b: number) => void");
        assert_eq!(map["g"].ty, "string");
    }

    #[test]
    fn test_missing_colon_reports_offset() {
        let err = parse_type_string("{ a string }", "").unwrap_err();
        assert!(err.message.contains("expected `:`"));
        assert_eq!(err.offset, 4);
        assert_eq!(err.excerpt, "string }");
    }

    #[test]
    fn test_requires_object() {
        let err = parse_type_string("string", "").unwrap_err();
        assert_eq!(err.offset, 0);
    }
}
