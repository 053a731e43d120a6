//! Lexer for the TypeScript subset.

use crate::token::{Token, TokenKind};
use fngql_core::Span;

/// A lexer for TypeScript source code.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: u32,
    newline_before: bool,
    doc: Option<Span>,
}

impl<'a> Lexer<'a> {
    /// Starts lexing at offset 0, past any `#!` line.
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            newline_before: false,
            doc: None,
        };
        if lexer.bytes.starts_with(b"#!") {
            while let Some(c) = lexer.peek() {
                if c == b'\n' {
                    break;
                }
                lexer.advance();
            }
        }
        lexer
    }

    /// Byte offset of the next unread character.
    #[inline]
    pub fn pos(&self) -> u32 {
        self.pos
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos as usize).copied()
    }

    #[inline]
    fn peek_at(&self, offset: u32) -> Option<u8> {
        self.bytes.get((self.pos + offset) as usize).copied()
    }

    #[inline]
    fn advance(&mut self) {
        self.pos += 1;
    }

    #[inline]
    fn advance_by(&mut self, n: u32) {
        self.pos += n;
    }

    #[inline]
    fn slice_from(&self, start: u32) -> &'a str {
        &self.source[start as usize..self.pos as usize]
    }

    /// Produces the next token, `Eof` forever once input runs out.
    pub fn next_token(&mut self) -> Token {
        self.newline_before = false;
        self.doc = None;
        self.skip_trivia();

        let start = self.pos;

        let Some(c) = self.peek() else {
            return self.finish(TokenKind::Eof, start);
        };

        let kind = match c {
            b'{' => self.single(TokenKind::LBrace),
            b'}' => self.single(TokenKind::RBrace),
            b'(' => self.single(TokenKind::LParen),
            b')' => self.single(TokenKind::RParen),
            b'[' => self.single(TokenKind::LBracket),
            b']' => self.single(TokenKind::RBracket),
            // `<` and `>` are never combined so nested type arguments close cleanly.
            b'<' => self.single(TokenKind::LAngle),
            b'>' => self.single(TokenKind::RAngle),
            b':' => self.single(TokenKind::Colon),
            b';' => self.single(TokenKind::Semicolon),
            b',' => self.single(TokenKind::Comma),
            b'@' => self.single(TokenKind::At),
            b'#' => self.single(TokenKind::Hash),
            b'*' => self.single(TokenKind::Star),
            b'-' => self.single(TokenKind::Minus),
            b'.' => {
                if self.peek_at(1) == Some(b'.') && self.peek_at(2) == Some(b'.') {
                    self.advance_by(3);
                    TokenKind::Spread
                } else if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                    self.scan_number()
                } else {
                    self.single(TokenKind::Dot)
                }
            }
            b'=' => match self.peek_at(1) {
                Some(b'>') => {
                    self.advance_by(2);
                    TokenKind::Arrow
                }
                Some(b'=') => self.operator_run(),
                _ => self.single(TokenKind::Eq),
            },
            b'|' => self.doubled_or(b'|', TokenKind::Pipe),
            b'&' => self.doubled_or(b'&', TokenKind::Amp),
            b'?' => self.doubled_or(b'?', TokenKind::Question),
            b'"' | b'\'' => self.scan_string(c),
            b'`' => self.scan_template(),
            b'0'..=b'9' => self.scan_number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'$' | 0x80..=0xFF => self.scan_identifier(),
            b'+' | b'/' | b'%' | b'!' | b'^' | b'~' => self.operator_run(),
            _ => self.single(TokenKind::Error),
        };

        self.finish(kind, start)
    }

    fn finish(&self, kind: TokenKind, start: u32) -> Token {
        Token {
            kind,
            span: Span::new(start, self.pos),
            newline_before: self.newline_before,
            doc: self.doc,
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// `||`, `&&` and `??` are expression operators; the single form is type syntax.
    fn doubled_or(&mut self, c: u8, single: TokenKind) -> TokenKind {
        if self.peek_at(1) == Some(c) {
            self.advance_by(2);
            TokenKind::Operator
        } else {
            self.single(single)
        }
    }

    fn operator_run(&mut self) -> TokenKind {
        self.advance();
        while let Some(b'=' | b'+') = self.peek() {
            self.advance();
        }
        TokenKind::Operator
    }

    /// Consumes trivia, recording line breaks and the last doc comment.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r') => self.advance(),
                Some(b'\n') => {
                    self.newline_before = true;
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.pos;
                    let is_doc = self.peek_at(2) == Some(b'*') && self.peek_at(3) != Some(b'/');
                    self.advance_by(2);
                    let rest = &self.bytes[self.pos as usize..];
                    match memchr::memmem::find(rest, b"*/") {
                        Some(end) => {
                            if memchr::memchr(b'\n', &rest[..end]).is_some() {
                                self.newline_before = true;
                            }
                            self.advance_by(end as u32 + 2);
                        }
                        None => self.pos = self.bytes.len() as u32,
                    }
                    if is_doc {
                        self.doc = Some(Span::new(start, self.pos));
                    }
                }
                Some(0xEF) if self.peek_at(1) == Some(0xBB) && self.peek_at(2) == Some(0xBF) => {
                    // UTF-8 BOM
                    self.advance_by(3);
                }
                _ => break,
            }
        }
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;

        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' || c == b'$' || c >= 0x80 {
                self.advance();
            } else {
                break;
            }
        }

        TokenKind::from_keyword(self.slice_from(start)).unwrap_or(TokenKind::Ident)
    }

    /// Scans a number literal (decimal, hex/octal/binary, separators, bigint suffix).
    fn scan_number(&mut self) -> TokenKind {
        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x' | b'X' | b'o' | b'O' | b'b' | b'B')) {
            self.advance_by(2);
            while let Some(c) = self.peek() {
                if c.is_ascii_hexdigit() || c == b'_' {
                    self.advance();
                } else {
                    break;
                }
            }
        } else {
            self.eat_digits();
            if self.peek() == Some(b'.') && self.peek_at(1) != Some(b'.') {
                self.advance();
                self.eat_digits();
            }
            if let Some(b'e' | b'E') = self.peek() {
                self.advance();
                if let Some(b'+' | b'-') = self.peek() {
                    self.advance();
                }
                self.eat_digits();
            }
        }
        if self.peek() == Some(b'n') {
            self.advance();
        }
        TokenKind::NumberLiteral
    }

    fn eat_digits(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == b'_' {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Scans a single- or double-quoted string literal.
    fn scan_string(&mut self, quote: u8) -> TokenKind {
        self.advance();

        loop {
            match self.peek() {
                None | Some(b'\n') => return TokenKind::Error,
                Some(c) if c == quote => {
                    self.advance();
                    return TokenKind::StringLiteral;
                }
                Some(b'\\') => self.advance_by(2),
                _ => self.advance(),
            }
        }
    }

    /// Scans a template literal, including nested `${ ... }` substitutions.
    fn scan_template(&mut self) -> TokenKind {
        self.advance(); // Opening backtick

        loop {
            match self.peek() {
                None => return TokenKind::Error,
                Some(b'`') => {
                    self.advance();
                    return TokenKind::TemplateLiteral;
                }
                Some(b'\\') => self.advance_by(2),
                Some(b'$') if self.peek_at(1) == Some(b'{') => {
                    self.advance_by(2);
                    if !self.skip_substitution() {
                        return TokenKind::Error;
                    }
                }
                _ => self.advance(),
            }
        }
    }

    fn skip_substitution(&mut self) -> bool {
        let mut depth = 1u32;
        while let Some(c) = self.peek() {
            match c {
                b'{' => {
                    depth += 1;
                    self.advance();
                }
                b'}' => {
                    depth -= 1;
                    self.advance();
                    if depth == 0 {
                        return true;
                    }
                }
                b'"' | b'\'' => {
                    if self.scan_string(c) == TokenKind::Error {
                        return false;
                    }
                }
                b'`' => {
                    if self.scan_template() == TokenKind::Error {
                        return false;
                    }
                }
                _ => self.advance(),
            }
        }
        false
    }

    pub fn span_text(&self, span: Span) -> &'a str {
        &self.source[span.start as usize..span.end as usize]
    }
}

/// Lexes `source` up to and including the `Eof` token.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();

    loop {
        let token = lexer.next_token();
        let is_eof = token.kind == TokenKind::Eof;
        tokens.push(token);
        if is_eof {
            break;
        }
    }

    tokens
}

/// Extracts the text of a `/** */` comment: delimiters and leading `*` removed,
/// stopping at the first block tag (`@param`, `@returns`, ...).
#[must_use]
pub fn doc_text(raw: &str) -> Option<String> {
    let inner = raw.strip_prefix("/**")?.strip_suffix("*/")?;
    let mut lines = Vec::new();
    for line in inner.lines() {
        let line = line.trim();
        let line = line.strip_prefix('*').map_or(line, str::trim_start);
        if line.starts_with('@') {
            break;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(
            kinds("{ } ( ) [ ] < > : ; , . ... = => | & ? * -"),
            vec![
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::LAngle,
                TokenKind::RAngle,
                TokenKind::Colon,
                TokenKind::Semicolon,
                TokenKind::Comma,
                TokenKind::Dot,
                TokenKind::Spread,
                TokenKind::Eq,
                TokenKind::Arrow,
                TokenKind::Pipe,
                TokenKind::Amp,
                TokenKind::Question,
                TokenKind::Star,
                TokenKind::Minus,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_nested_generics_close_separately() {
        assert_eq!(
            kinds("Array<Array<string>>"),
            vec![
                TokenKind::Ident,
                TokenKind::LAngle,
                TokenKind::Ident,
                TokenKind::LAngle,
                TokenKind::Ident,
                TokenKind::RAngle,
                TokenKind::RAngle,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("export interface type function async readonly"),
            vec![
                TokenKind::Export,
                TokenKind::Interface,
                TokenKind::Type,
                TokenKind::Function,
                TokenKind::Async,
                TokenKind::Readonly,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            kinds(r#"42 3.14 0xff 10n "a" 'b' `c ${ "}" } d`"#),
            vec![
                TokenKind::NumberLiteral,
                TokenKind::NumberLiteral,
                TokenKind::NumberLiteral,
                TokenKind::NumberLiteral,
                TokenKind::StringLiteral,
                TokenKind::StringLiteral,
                TokenKind::TemplateLiteral,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_and_newlines() {
        let tokens = tokenize("a // line\n/* block */ b\n/** Doc */ c");
        assert_eq!(tokens.len(), 4);
        assert!(!tokens[0].newline_before);
        assert!(tokens[1].newline_before);
        assert!(tokens[1].doc.is_none());
        assert!(tokens[2].doc.is_some());
    }

    #[test]
    fn test_doc_text() {
        let raw = "/**\n * Fetches a user.\n *\n * Second line.\n * @param id the id\n */";
        assert_eq!(
            doc_text(raw),
            Some("Fetches a user.\n\nSecond line.".to_string())
        );
        assert_eq!(doc_text("/** */"), None);
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(kinds("\"abc\n"), vec![TokenKind::Error, TokenKind::Eof]);
    }
}
