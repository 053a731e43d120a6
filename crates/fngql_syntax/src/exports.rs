//! Fast export-name scan.
//!
//! Recognises operation files without parsing them: every line starting with
//! `export` is inspected for the declared name.

use memchr::memmem;

/// What kind of declaration an export names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Function,
    /// `async function*` or `function*`.
    Generator,
    Variable,
    Class,
    Type,
    /// A name listed in an `export { .. }` clause.
    Specifier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedName {
    pub name: String,
    pub kind: ExportKind,
}

/// Scans `source` for named exports in source order.
#[must_use]
pub fn scan_exports(source: &str) -> Vec<ExportedName> {
    let bytes = source.as_bytes();
    let mut names = Vec::new();

    for start in memmem::find_iter(bytes, b"export") {
        if !at_line_start(bytes, start) {
            continue;
        }
        let mut cursor = Cursor {
            src: source,
            pos: start + "export".len(),
        };
        if !cursor.skip_space() {
            // `exports`, `exported`, ...
            if cursor.peek() != Some(b'{') {
                continue;
            }
        }
        cursor.scan_declaration(&mut names);
    }

    names
}

/// Returns true when the scanned names include `name`.
#[must_use]
pub fn exports_name(source: &str, name: &str) -> bool {
    scan_exports(source).iter().any(|e| e.name == name)
}

fn at_line_start(bytes: &[u8], pos: usize) -> bool {
    bytes[..pos]
        .iter()
        .rev()
        .take_while(|b| **b != b'\n')
        .all(|b| matches!(b, b' ' | b'\t' | b'\r'))
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    /// Skips whitespace and returns whether any was skipped.
    fn skip_space(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn word(&mut self) -> Option<&'a str> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80)
        {
            self.pos += 1;
        }
        (self.pos > start).then(|| &self.src[start..self.pos])
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn scan_declaration(&mut self, names: &mut Vec<ExportedName>) {
        if self.eat(b'{') {
            self.scan_clause(names);
            return;
        }

        let mut generator = false;
        let kind = loop {
            let Some(word) = self.word() else {
                return;
            };
            self.skip_space();
            match word {
                "declare" | "async" | "abstract" => continue,
                // Default exports carry no usable name.
                "default" => return,
                "function" => {
                    generator = self.eat(b'*');
                    self.skip_space();
                    break ExportKind::Function;
                }
                "const" | "let" | "var" => break ExportKind::Variable,
                "class" => break ExportKind::Class,
                "type" | "interface" | "enum" => {
                    if self.peek() == Some(b'{') {
                        self.pos += 1;
                        self.scan_clause(names);
                        return;
                    }
                    break ExportKind::Type;
                }
                _ => return,
            }
        };

        if kind == ExportKind::Variable && self.src[self.pos..].starts_with("enum ") {
            self.word();
            self.skip_space();
            if let Some(name) = self.word() {
                names.push(ExportedName {
                    name: name.to_string(),
                    kind: ExportKind::Type,
                });
            }
            return;
        }

        if let Some(name) = self.word() {
            names.push(ExportedName {
                name: name.to_string(),
                kind: if generator {
                    ExportKind::Generator
                } else {
                    kind
                },
            });
        }
    }

    /// Scans `a, b as c, type d }`.
    fn scan_clause(&mut self, names: &mut Vec<ExportedName>) {
        loop {
            self.skip_space();
            if self.eat(b'}') || self.peek().is_none() {
                return;
            }
            let Some(mut name) = self.word() else {
                self.pos += 1;
                continue;
            };
            self.skip_space();
            if name == "type" && self.peek().is_some_and(|b| b != b',' && b != b'}') {
                match self.word() {
                    Some(next) => name = next,
                    None => continue,
                }
                self.skip_space();
            }
            if self.src[self.pos..].starts_with("as") {
                self.word();
                self.skip_space();
                if let Some(alias) = self.word() {
                    name = alias;
                }
                self.skip_space();
            }
            names.push(ExportedName {
                name: name.to_string(),
                kind: ExportKind::Specifier,
            });
            self.eat(b',');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(source: &str) -> Vec<String> {
        scan_exports(source).into_iter().map(|e| e.name).collect()
    }

    #[test]
    fn test_scan_declarations() {
        let source = "export function Query() {}\nexport const __typename = 'User';\nexport async function* Subscription() {}\nexport type Args = {};\nexport default function main() {}\n";
        assert_eq!(names(source), vec!["Query", "__typename", "Subscription", "Args"]);
        let exports = scan_exports(source);
        assert_eq!(exports[2].kind, ExportKind::Generator);
        assert_eq!(exports[1].kind, ExportKind::Variable);
    }

    #[test]
    fn test_scan_clause() {
        assert_eq!(
            names("const q = 1;\nexport { q as Query, type T, other };"),
            vec!["Query", "T", "other"]
        );
    }

    #[test]
    fn test_ignores_non_line_start() {
        assert_eq!(names("// export function Query() {}\nconst s = 'export const Mutation';"), Vec::<String>::new());
        assert_eq!(names("exports.Query = 1;"), Vec::<String>::new());
    }

    #[test]
    fn test_exports_name() {
        assert!(exports_name("  export const enum Kind { A }", "Kind"));
        assert!(!exports_name("export function Mutation() {}", "Query"));
    }
}
