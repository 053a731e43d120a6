//! Recursive descent parser for the TypeScript subset.

use crate::ast::*;
use crate::lexer::{doc_text, tokenize};
use crate::token::{Token, TokenKind};
use fngql_core::{diagnostics::codes, DiagnosticBag, Span};

/// Parser for TypeScript declaration surfaces.
pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: DiagnosticBag,
}

/// Result of parsing.
pub struct ParseResult {
    pub module: Module,
    pub diagnostics: DiagnosticBag,
}

/// Parses a source string into a module.
pub fn parse(source: &str) -> ParseResult {
    let mut parser = Parser::new(source);
    let module = parser.parse_module();
    ParseResult {
        module,
        diagnostics: parser.diagnostics,
    }
}

/// Parses a standalone type expression.
pub fn parse_type(source: &str) -> (TypeNode, DiagnosticBag) {
    let mut parser = Parser::new(source);
    let ty = parser.parse_type();
    if !parser.at_kind(TokenKind::Eof) {
        parser.error("unexpected trailing input after type");
    }
    (ty, parser.diagnostics)
}

/// Modifiers that may precede a class member or constructor parameter.
const MEMBER_MODIFIERS: &[&str] = &[
    "public",
    "private",
    "protected",
    "static",
    "readonly",
    "abstract",
    "override",
    "declare",
    "accessor",
];

impl<'a> Parser<'a> {
    /// Creates a new parser.
    pub fn new(source: &'a str) -> Self {
        let tokens = tokenize(source);
        Self {
            source,
            tokens,
            pos: 0,
            diagnostics: DiagnosticBag::new(),
        }
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    #[inline]
    fn current(&self) -> Token {
        self.nth(0)
    }

    #[inline]
    fn nth(&self, n: usize) -> Token {
        let last = self.tokens.len() - 1;
        self.tokens[(self.pos + n).min(last)]
    }

    /// Returns the current token kind.
    #[inline]
    fn at(&self) -> TokenKind {
        self.current().kind
    }

    #[inline]
    fn peek(&self, n: usize) -> TokenKind {
        self.nth(n).kind
    }

    /// Returns true if at the given kind.
    #[inline]
    fn at_kind(&self, kind: TokenKind) -> bool {
        self.at() == kind
    }

    /// Returns true if the current token is the identifier `word`.
    fn at_word(&self, word: &str) -> bool {
        self.at() == TokenKind::Ident && self.current_text() == word
    }

    fn peek_word(&self, n: usize, word: &str) -> bool {
        let token = self.nth(n);
        token.kind == TokenKind::Ident && self.text(token.span) == word
    }

    /// Advances to the next token.
    #[inline]
    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at_kind(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expects a specific token kind.
    fn expect(&mut self, kind: TokenKind) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.error_expected(kind);
            false
        }
    }

    #[inline]
    fn text(&self, span: Span) -> &'a str {
        &self.source[span.start as usize..span.end as usize]
    }

    /// Gets the text of the current token.
    fn current_text(&self) -> &'a str {
        self.text(self.current().span)
    }

    fn prev_end(&self) -> u32 {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.end
        }
    }

    fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.prev_end().max(start))
    }

    fn current_doc(&self) -> Option<String> {
        self.current().doc.and_then(|span| doc_text(self.text(span)))
    }

    /// Reports an error.
    fn error(&mut self, message: &str) {
        let span = self.current().span;
        self.diagnostics
            .error(codes::INVALID_SYNTAX, message, span, message.to_string());
    }

    /// Reports an expected token error.
    fn error_expected(&mut self, expected: TokenKind) {
        let found = self.at();
        let code = if found == TokenKind::Eof {
            codes::UNEXPECTED_EOF
        } else {
            codes::UNEXPECTED_TOKEN
        };
        self.diagnostics.error(
            code,
            "unexpected token",
            self.current().span,
            format!("expected {expected}, found {found}"),
        );
    }

    fn warn_unsupported(&mut self, what: &str, span: Span) {
        self.diagnostics.warning(
            codes::UNSUPPORTED_SYNTAX,
            format!("unsupported {what}"),
            span,
            "skipped",
        );
    }

    // ------------------------------------------------------------------
    // Skipping
    // ------------------------------------------------------------------

    /// Skips a balanced `{}`/`()`/`[]`/`<>` group starting at the current token.
    fn skip_balanced(&mut self) {
        let open = self.at();
        let close = match open {
            TokenKind::LBrace => TokenKind::RBrace,
            TokenKind::LParen => TokenKind::RParen,
            TokenKind::LBracket => TokenKind::RBracket,
            TokenKind::LAngle => TokenKind::RAngle,
            _ => {
                self.advance();
                return;
            }
        };
        let mut depth = 0usize;
        loop {
            let kind = self.at();
            if kind == TokenKind::Eof {
                return;
            }
            if kind == open {
                depth += 1;
            } else if kind == close {
                depth -= 1;
                if depth == 0 {
                    self.advance();
                    return;
                }
            }
            self.advance();
        }
    }

    /// Index of the token matching the opening bracket at `from`.
    fn matching_close(&self, from: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(from) {
            match token.kind {
                TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                TokenKind::Eof => return None,
                _ => {}
            }
        }
        None
    }

    /// Skips an expression up to its terminator at depth zero.
    fn skip_expression(&mut self) {
        let start = self.pos;
        loop {
            let token = self.current();
            match token.kind {
                TokenKind::Eof
                | TokenKind::Comma
                | TokenKind::Semicolon
                | TokenKind::RParen
                | TokenKind::RBrace
                | TokenKind::RBracket => return,
                TokenKind::LBrace | TokenKind::LParen | TokenKind::LBracket => {
                    self.skip_balanced();
                }
                kind if self.pos > start && token.newline_before && kind.starts_statement() => {
                    return;
                }
                _ => self.advance(),
            }
        }
    }

    /// Skips the rest of a statement.
    fn skip_statement(&mut self) {
        let start = self.pos;
        loop {
            let token = self.current();
            match token.kind {
                TokenKind::Eof => return,
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::LBrace | TokenKind::LParen | TokenKind::LBracket => {
                    self.skip_balanced();
                }
                TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket => {
                    // Stray closer at depth zero.
                    self.advance();
                    return;
                }
                kind if self.pos > start && token.newline_before && kind.starts_statement() => {
                    return;
                }
                _ => self.advance(),
            }
        }
    }

    fn eat_semicolon(&mut self) {
        self.eat(TokenKind::Semicolon);
    }

    // ------------------------------------------------------------------
    // Module and statements
    // ------------------------------------------------------------------

    /// Parses a module.
    pub fn parse_module(&mut self) -> Module {
        let mut items = Vec::new();

        while !self.at_kind(TokenKind::Eof) {
            let before = self.pos;
            self.parse_statement(&mut items);
            if self.pos == before {
                // Recovery: always make progress
                self.advance();
            }
        }

        Module {
            items,
            span: Span::new(0, self.source.len() as u32),
        }
    }

    fn parse_statement(&mut self, items: &mut Vec<Item>) {
        let start = self.current().span.start;
        let doc = self.current_doc();
        match self.at() {
            TokenKind::Semicolon => self.advance(),
            TokenKind::Import => {
                if let Some(import) = self.parse_import() {
                    items.push(Item::Import(import));
                }
            }
            TokenKind::Export => self.parse_export(items, doc),
            _ => {
                if let Some(item) = self.parse_declaration(false, doc) {
                    items.push(item);
                } else {
                    let span = self.current().span;
                    self.skip_statement();
                    self.warn_unsupported("statement", self.span_from(start).merge(span));
                }
            }
        }
    }

    /// Parses a declaration at the current token, if one starts here.
    fn parse_declaration(&mut self, exported: bool, doc: Option<String>) -> Option<Item> {
        let start = self.current().span.start;

        if self.at_kind(TokenKind::Declare) {
            if matches!(self.peek(1), TokenKind::StringLiteral)
                || self.peek_word(1, "module")
                || self.peek_word(1, "global")
                || self.peek_word(1, "namespace")
            {
                return None;
            }
            self.advance();
        }
        if self.at_word("abstract") && self.peek(1) == TokenKind::Class {
            self.advance();
        }

        match self.at() {
            TokenKind::Type if self.peek(1).is_identifier_name() => {
                Some(Item::TypeAlias(self.parse_type_alias(exported, doc, start)))
            }
            TokenKind::Interface => Some(Item::Interface(self.parse_interface(exported, doc, start))),
            TokenKind::Class => Some(Item::Class(self.parse_class(exported, doc, start))),
            TokenKind::Enum => Some(Item::Enum(self.parse_enum(exported, doc, start))),
            TokenKind::Const if self.peek(1) == TokenKind::Enum => {
                self.advance();
                Some(Item::Enum(self.parse_enum(exported, doc, start)))
            }
            TokenKind::Function => self
                .parse_function(exported, doc, false, start)
                .map(Item::Function),
            TokenKind::Async if self.peek(1) == TokenKind::Function => {
                self.advance();
                self.parse_function(exported, doc, true, start)
                    .map(Item::Function)
            }
            TokenKind::Const | TokenKind::Let | TokenKind::Var => {
                self.parse_variables(exported, doc, start)
            }
            _ => None,
        }
    }

    fn parse_export(&mut self, items: &mut Vec<Item>, doc: Option<String>) {
        let start = self.current().span.start;
        self.advance(); // export

        match self.at() {
            TokenKind::Default => {
                self.advance();
                // A default export never becomes a named binding.
                if self.parse_declaration(false, doc).is_none() {
                    self.skip_statement();
                }
            }
            TokenKind::Eq => {
                self.skip_statement();
                self.warn_unsupported("`export =`", self.span_from(start));
            }
            TokenKind::Star => {
                self.advance();
                let namespace = if self.at_word("as") {
                    self.advance();
                    self.parse_ident()
                } else {
                    None
                };
                let source = self.parse_from_clause();
                self.eat_semicolon();
                if let Some(source) = source {
                    items.push(Item::ExportFrom(ExportFromDecl {
                        source,
                        names: None,
                        namespace,
                        span: self.span_from(start),
                    }));
                }
            }
            TokenKind::LBrace => self.parse_export_clause(items, start),
            TokenKind::Type if self.peek(1) == TokenKind::LBrace => {
                self.advance();
                self.parse_export_clause(items, start);
            }
            _ => {
                if let Some(item) = self.parse_declaration(true, doc) {
                    items.push(item);
                } else {
                    self.skip_statement();
                    self.warn_unsupported("export", self.span_from(start));
                }
            }
        }
    }

    fn parse_export_clause(&mut self, items: &mut Vec<Item>, start: u32) {
        let names = self.parse_export_specifiers();
        if self.at_word("from") {
            let source = self.parse_from_clause();
            self.eat_semicolon();
            if let Some(source) = source {
                items.push(Item::ExportFrom(ExportFromDecl {
                    source,
                    names: Some(names),
                    namespace: None,
                    span: self.span_from(start),
                }));
            }
        } else {
            self.eat_semicolon();
            items.push(Item::ExportNames(ExportNamesDecl {
                names,
                span: self.span_from(start),
            }));
        }
    }

    fn parse_export_specifiers(&mut self) -> Vec<ExportSpecifier> {
        let mut names = Vec::new();
        self.expect(TokenKind::LBrace);
        while !self.at_kind(TokenKind::RBrace) && !self.at_kind(TokenKind::Eof) {
            if self.at_kind(TokenKind::Type) && self.peek(1).is_identifier_name() {
                self.advance();
            }
            let Some(local) = self.parse_ident() else {
                self.skip_expression();
                self.eat(TokenKind::Comma);
                continue;
            };
            let exported = if self.at_word("as") {
                self.advance();
                self.parse_ident().unwrap_or_else(|| local.clone())
            } else {
                local.clone()
            };
            names.push(ExportSpecifier { local, exported });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace);
        names
    }

    fn parse_from_clause(&mut self) -> Option<String> {
        if !self.at_word("from") {
            self.error("expected `from`");
            return None;
        }
        self.advance();
        self.parse_module_specifier()
    }

    fn parse_module_specifier(&mut self) -> Option<String> {
        if self.at_kind(TokenKind::StringLiteral) {
            let value = unquote(self.current_text());
            self.advance();
            Some(value)
        } else {
            self.error_expected(TokenKind::StringLiteral);
            None
        }
    }

    fn parse_import(&mut self) -> Option<ImportDecl> {
        let start = self.current().span.start;
        self.advance(); // import

        // import "side-effect";
        if self.at_kind(TokenKind::StringLiteral) {
            let source = self.parse_module_specifier()?;
            self.eat_semicolon();
            return Some(ImportDecl {
                source,
                type_only: false,
                default: None,
                namespace: None,
                names: Vec::new(),
                span: self.span_from(start),
            });
        }

        let type_only = self.at_kind(TokenKind::Type)
            && (self.peek(1) == TokenKind::LBrace
                || self.peek(1) == TokenKind::Star
                || (self.peek(1).is_identifier_name() && !self.peek_word(1, "from")));
        if type_only {
            self.advance();
        }

        let mut default = None;
        let mut namespace = None;
        let mut names = Vec::new();

        if self.at().is_identifier_name() && !self.at_word("from") {
            default = self.parse_ident();
            if self.at_kind(TokenKind::Eq) {
                // import x = require("...")
                self.skip_statement();
                self.warn_unsupported("import assignment", self.span_from(start));
                return None;
            }
            self.eat(TokenKind::Comma);
        }

        if self.eat(TokenKind::Star) {
            if self.at_word("as") {
                self.advance();
            } else {
                self.error("expected `as`");
            }
            namespace = self.parse_ident();
        } else if self.at_kind(TokenKind::LBrace) {
            self.advance();
            while !self.at_kind(TokenKind::RBrace) && !self.at_kind(TokenKind::Eof) {
                let spec_type_only = self.at_kind(TokenKind::Type)
                    && self.peek(1).is_identifier_name()
                    && !self.peek_word(1, "as");
                if spec_type_only {
                    self.advance();
                }
                let imported = if self.at_kind(TokenKind::StringLiteral) {
                    let ident = Ident::new(unquote(self.current_text()), self.current().span);
                    self.advance();
                    Some(ident)
                } else {
                    self.parse_ident()
                };
                let Some(imported) = imported else {
                    self.skip_expression();
                    self.eat(TokenKind::Comma);
                    continue;
                };
                let local = if self.at_word("as") {
                    self.advance();
                    self.parse_ident().unwrap_or_else(|| imported.clone())
                } else {
                    imported.clone()
                };
                names.push(ImportSpecifier {
                    imported,
                    local,
                    type_only: spec_type_only,
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RBrace);
        }

        let source = self.parse_from_clause()?;
        // Import attributes: `with { type: "json" }`
        if (self.at_word("with") || self.at_word("assert")) && self.peek(1) == TokenKind::LBrace {
            self.advance();
            self.skip_balanced();
        }
        self.eat_semicolon();

        Some(ImportDecl {
            source,
            type_only,
            default,
            namespace,
            names,
            span: self.span_from(start),
        })
    }

    fn parse_ident(&mut self) -> Option<Ident> {
        if self.at().is_identifier_name() {
            let ident = Ident::new(self.current_text(), self.current().span);
            self.advance();
            Some(ident)
        } else {
            self.error_expected(TokenKind::Ident);
            None
        }
    }

    fn expect_ident(&mut self) -> Ident {
        let span = Span::empty(self.current().span.start);
        self.parse_ident().unwrap_or_else(|| Ident::new("", span))
    }

    fn parse_type_alias(&mut self, exported: bool, doc: Option<String>, start: u32) -> TypeAliasDecl {
        self.advance(); // type
        let name = self.expect_ident();
        let type_params = self.parse_type_params();
        self.expect(TokenKind::Eq);
        let ty = self.parse_type();
        self.eat_semicolon();
        TypeAliasDecl {
            exported,
            doc,
            name,
            type_params,
            ty,
            span: self.span_from(start),
        }
    }

    fn parse_interface(&mut self, exported: bool, doc: Option<String>, start: u32) -> InterfaceDecl {
        self.advance(); // interface
        let name = self.expect_ident();
        let type_params = self.parse_type_params();
        let mut extends = Vec::new();
        if self.eat(TokenKind::Extends) {
            extends = self.parse_heritage_list();
        }
        let members = self.parse_object_members();
        InterfaceDecl {
            exported,
            doc,
            name,
            type_params,
            extends,
            members,
            span: self.span_from(start),
        }
    }

    fn parse_heritage_list(&mut self) -> Vec<TypeRefNode> {
        let mut list = Vec::new();
        loop {
            if !self.at().is_identifier_name() {
                self.error_expected(TokenKind::Ident);
                break;
            }
            list.push(self.parse_type_reference());
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        list
    }

    fn parse_class(&mut self, exported: bool, doc: Option<String>, start: u32) -> ClassDecl {
        self.advance(); // class
        let name = self.expect_ident();
        let type_params = self.parse_type_params();
        let mut extends = None;
        let mut implements = Vec::new();
        if self.eat(TokenKind::Extends) {
            if self.at().is_identifier_name() {
                extends = Some(self.parse_type_reference());
            } else {
                self.error_expected(TokenKind::Ident);
            }
        }
        if self.eat(TokenKind::Implements) {
            implements = self.parse_heritage_list();
        }

        let mut members = Vec::new();
        let mut constructor = None;

        self.expect(TokenKind::LBrace);
        while !self.at_kind(TokenKind::RBrace) && !self.at_kind(TokenKind::Eof) {
            let before = self.pos;
            self.parse_class_member(&mut members, &mut constructor);
            if self.pos == before {
                self.advance();
            }
        }
        self.expect(TokenKind::RBrace);

        ClassDecl {
            exported,
            doc,
            name,
            type_params,
            extends,
            implements,
            members,
            constructor,
            span: self.span_from(start),
        }
    }

    /// Returns true if the current identifier acts as a modifier rather than a member name.
    fn at_modifier(&self) -> bool {
        let is_modifier_word = matches!(
            self.at(),
            TokenKind::Ident | TokenKind::Readonly | TokenKind::Declare
        )
            && MEMBER_MODIFIERS.contains(&self.current_text());
        if !is_modifier_word {
            return false;
        }
        let next = self.nth(1);
        !next.newline_before
            && (next.kind.is_identifier_name()
                || matches!(
                    next.kind,
                    TokenKind::LBracket
                        | TokenKind::Hash
                        | TokenKind::StringLiteral
                        | TokenKind::NumberLiteral
                        | TokenKind::Star
                ))
    }

    fn parse_class_member(&mut self, members: &mut Vec<TypeMember>, constructor: &mut Option<Signature>) {
        let start = self.current().span.start;
        let doc = self.current_doc();

        if self.eat(TokenKind::Semicolon) {
            return;
        }
        self.skip_decorators();

        let mut hidden = false;
        let mut readonly = false;
        while self.at_modifier() {
            match self.current_text() {
                "private" | "protected" | "static" => hidden = true,
                "readonly" => readonly = true,
                _ => {}
            }
            self.advance();
        }
        if self.at_kind(TokenKind::Async) && self.peek(1) != TokenKind::LParen && !self.nth(1).newline_before {
            self.advance();
        }
        self.eat(TokenKind::Star);

        // static { ... } blocks
        if self.at_kind(TokenKind::LBrace) {
            self.skip_balanced();
            return;
        }

        if self.at_kind(TokenKind::Hash) {
            hidden = true;
            self.advance();
        }

        if self.at_kind(TokenKind::LBracket) {
            if self.is_index_signature() {
                let index = self.parse_index_signature(readonly, start);
                if !hidden {
                    members.push(TypeMember::Index(index));
                }
            } else {
                // Computed member name
                self.skip_balanced();
                self.skip_member_rest();
            }
            return;
        }

        let accessor = (self.at_word("get") || self.at_word("set"))
            && (self.peek(1).is_identifier_name()
                || matches!(self.peek(1), TokenKind::StringLiteral | TokenKind::Hash));
        let is_getter = accessor && self.at_word("get");
        if accessor {
            self.advance();
            if self.eat(TokenKind::Hash) {
                hidden = true;
            }
        }

        let Some(name) = self.parse_property_name() else {
            self.skip_member_rest();
            return;
        };

        if name == "constructor" && !accessor && self.at_kind(TokenKind::LParen) {
            let signature = self.parse_signature(TokenKind::Colon, true);
            self.skip_body_or_semicolon();
            if constructor.is_none() {
                *constructor = Some(signature);
            }
            return;
        }

        let optional = self.eat(TokenKind::Question);
        if self.at_kind(TokenKind::Operator) && self.current_text() == "!" {
            self.advance();
        }

        if self.at_kind(TokenKind::LParen) || self.at_kind(TokenKind::LAngle) {
            let signature = self.parse_signature(TokenKind::Colon, false);
            self.skip_body_or_semicolon();
            if hidden || (accessor && !is_getter) {
                return;
            }
            let span = self.span_from(start);
            if is_getter {
                members.push(TypeMember::Property(PropertySignature {
                    name,
                    optional,
                    readonly: true,
                    ty: signature.return_type.map(|ty| *ty),
                    doc,
                    span,
                }));
            } else {
                members.push(TypeMember::Method(MethodSignature {
                    name,
                    optional,
                    signature,
                    doc,
                    span,
                }));
            }
            return;
        }

        let mut ty = if self.eat(TokenKind::Colon) {
            Some(self.parse_type())
        } else {
            None
        };
        if self.eat(TokenKind::Eq) {
            let init = self.parse_initializer();
            if ty.is_none() {
                ty = initializer_type(init, readonly, self.span_from(start));
            }
        }
        self.eat_semicolon();
        if !hidden {
            members.push(TypeMember::Property(PropertySignature {
                name,
                optional,
                readonly,
                ty,
                doc,
                span: self.span_from(start),
            }));
        }
    }

    fn skip_decorators(&mut self) {
        while self.at_kind(TokenKind::At) {
            self.advance();
            while self.at().is_identifier_name() || self.at_kind(TokenKind::Dot) {
                self.advance();
            }
            if self.at_kind(TokenKind::LParen) {
                self.skip_balanced();
            }
        }
    }

    fn skip_member_rest(&mut self) {
        loop {
            match self.at() {
                TokenKind::Eof | TokenKind::RBrace => return,
                TokenKind::Semicolon | TokenKind::Comma => {
                    self.advance();
                    return;
                }
                TokenKind::LBrace => {
                    self.skip_balanced();
                    return;
                }
                TokenKind::LParen | TokenKind::LBracket => self.skip_balanced(),
                _ => self.advance(),
            }
        }
    }

    fn skip_body_or_semicolon(&mut self) {
        if self.at_kind(TokenKind::LBrace) {
            self.skip_balanced();
        } else {
            self.eat_semicolon();
        }
    }

    fn parse_enum(&mut self, exported: bool, doc: Option<String>, start: u32) -> EnumDecl {
        self.advance(); // enum
        let name = self.expect_ident();
        let mut members = Vec::new();
        self.expect(TokenKind::LBrace);
        while !self.at_kind(TokenKind::RBrace) && !self.at_kind(TokenKind::Eof) {
            let member_doc = self.current_doc();
            let member_span = self.current().span;
            let Some(member_name) = self.parse_property_name() else {
                self.skip_expression();
                self.eat(TokenKind::Comma);
                continue;
            };
            let value = if self.eat(TokenKind::Eq) {
                match self.parse_initializer() {
                    Initializer::Literal(lit) => Some(lit),
                    _ => None,
                }
            } else {
                None
            };
            members.push(EnumMember {
                name: Ident::new(member_name, member_span),
                value,
                doc: member_doc,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace);
        EnumDecl {
            exported,
            doc,
            name,
            members,
            span: self.span_from(start),
        }
    }

    fn parse_function(
        &mut self,
        exported: bool,
        doc: Option<String>,
        is_async: bool,
        start: u32,
    ) -> Option<FunctionDecl> {
        self.advance(); // function
        let is_generator = self.eat(TokenKind::Star);
        if !self.at().is_identifier_name() {
            // Anonymous `export default function`
            return None;
        }
        let name = self.expect_ident();
        let signature = self.parse_signature(TokenKind::Colon, false);
        let has_body = self.at_kind(TokenKind::LBrace);
        self.skip_body_or_semicolon();
        Some(FunctionDecl {
            exported,
            doc,
            name,
            is_async,
            is_generator,
            signature,
            has_body,
            span: self.span_from(start),
        })
    }

    /// Parses `const a: T = init, b = init;`. Only the first declarator becomes an item
    /// when destructuring is involved.
    fn parse_variables(&mut self, exported: bool, doc: Option<String>, start: u32) -> Option<Item> {
        let kind = match self.at() {
            TokenKind::Const => VariableKind::Const,
            TokenKind::Let => VariableKind::Let,
            _ => VariableKind::Var,
        };
        self.advance();

        if self.at_kind(TokenKind::LBrace) || self.at_kind(TokenKind::LBracket) {
            self.skip_statement();
            self.warn_unsupported("destructuring declaration", self.span_from(start));
            return None;
        }

        let mut first = None;
        loop {
            let name = self.parse_ident()?;
            if self.at_kind(TokenKind::Operator) && self.current_text() == "!" {
                self.advance();
            }
            let ty = if self.eat(TokenKind::Colon) {
                Some(self.parse_type())
            } else {
                None
            };
            let init = if self.eat(TokenKind::Eq) {
                Some(self.parse_initializer())
            } else {
                None
            };
            if first.is_none() {
                first = Some(VariableDecl {
                    exported,
                    doc: doc.clone(),
                    kind,
                    name,
                    ty,
                    init,
                    span: self.span_from(start),
                });
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.eat_semicolon();
        first.map(Item::Variable)
    }

    /// Parses an initializer expression, recovering its type when it is a literal,
    /// an `as` assertion, or an annotated function.
    fn parse_initializer(&mut self) -> Initializer {
        let start = self.pos;

        if let Some(lit) = self.parse_literal_value() {
            if self.at_word("as") {
                self.advance();
                let ty = self.parse_type();
                return match &ty.kind {
                    TypeNodeKind::Reference(r) if r.qualified_name() == "const" => {
                        Initializer::Literal(lit)
                    }
                    _ => Initializer::Asserted(ty),
                };
            }
            if self.at_initializer_end() {
                return Initializer::Literal(lit);
            }
            self.pos = start;
        }

        if let Some(function) = self.try_parse_function_expression() {
            return function;
        }

        self.pos = start;
        self.skip_expression();
        Initializer::Other
    }

    fn at_initializer_end(&self) -> bool {
        let token = self.current();
        matches!(
            token.kind,
            TokenKind::Eof
                | TokenKind::Semicolon
                | TokenKind::Comma
                | TokenKind::RParen
                | TokenKind::RBrace
                | TokenKind::RBracket
        ) || (token.newline_before && token.kind.starts_statement())
    }

    fn parse_literal_value(&mut self) -> Option<Literal> {
        let lit = match self.at() {
            TokenKind::StringLiteral => Literal::String(unquote(self.current_text())),
            TokenKind::TemplateLiteral if !self.current_text().contains("${") => {
                let text = self.current_text();
                Literal::String(unescape(&text[1..text.len() - 1]))
            }
            TokenKind::NumberLiteral => number_literal(self.current_text()),
            TokenKind::True => Literal::Boolean(true),
            TokenKind::False => Literal::Boolean(false),
            TokenKind::Minus if self.peek(1) == TokenKind::NumberLiteral => {
                self.advance();
                match number_literal(self.current_text()) {
                    Literal::Number(n) => Literal::Number(negate(&n)),
                    Literal::BigInt(n) => Literal::BigInt(negate(&n)),
                    other => other,
                }
            }
            _ => return None,
        };
        self.advance();
        Some(lit)
    }

    fn try_parse_function_expression(&mut self) -> Option<Initializer> {
        let start = self.pos;
        let is_async = self.at_kind(TokenKind::Async)
            && matches!(
                self.peek(1),
                TokenKind::LParen | TokenKind::LAngle | TokenKind::Function
            );
        if is_async {
            self.advance();
        }

        if self.eat(TokenKind::Function) {
            let is_generator = self.eat(TokenKind::Star);
            if self.at().is_identifier_name() {
                self.advance();
            }
            let diagnostics = self.diagnostics.len();
            let signature = self.parse_signature(TokenKind::Colon, false);
            if self.diagnostics.len() != diagnostics || !self.at_kind(TokenKind::LBrace) {
                self.rollback(start, diagnostics);
                return None;
            }
            self.skip_balanced();
            return Some(Initializer::Function {
                is_async,
                is_generator,
                signature,
            });
        }

        if !matches!(self.at(), TokenKind::LParen | TokenKind::LAngle) {
            self.pos = start;
            return None;
        }
        let diagnostics = self.diagnostics.len();
        let signature = self.parse_signature(TokenKind::Colon, false);
        if self.diagnostics.len() != diagnostics || !self.at_kind(TokenKind::Arrow) {
            self.rollback(start, diagnostics);
            return None;
        }
        self.advance(); // =>
        if self.at_kind(TokenKind::LBrace) {
            self.skip_balanced();
        } else {
            self.skip_expression();
        }
        Some(Initializer::Function {
            is_async,
            is_generator: false,
            signature,
        })
    }

    fn rollback(&mut self, pos: usize, diagnostics: usize) {
        self.pos = pos;
        self.diagnostics.truncate(diagnostics);
    }

    // ------------------------------------------------------------------
    // Signatures
    // ------------------------------------------------------------------

    fn parse_type_params(&mut self) -> Vec<TypeParam> {
        let mut params = Vec::new();
        if !self.eat(TokenKind::LAngle) {
            return params;
        }
        while !self.at_kind(TokenKind::RAngle) && !self.at_kind(TokenKind::Eof) {
            // `const T`, `in T`, `out T`
            while (self.at_kind(TokenKind::Const) || self.at_word("in") || self.at_word("out"))
                && self.peek(1).is_identifier_name()
            {
                self.advance();
            }
            let Some(name) = self.parse_ident() else {
                break;
            };
            let constraint = if self.eat(TokenKind::Extends) {
                Some(self.parse_type())
            } else {
                None
            };
            let default = if self.eat(TokenKind::Eq) {
                Some(self.parse_type())
            } else {
                None
            };
            params.push(TypeParam {
                name,
                constraint,
                default,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RAngle);
        params
    }

    /// Parses `<T>(params): R`. `return_marker` is `:` for declarations and `=>`
    /// for function types.
    fn parse_signature(&mut self, return_marker: TokenKind, allow_properties: bool) -> Signature {
        let start = self.current().span.start;
        let type_params = self.parse_type_params();
        let mut this_param = None;
        let mut params = Vec::new();

        if self.expect(TokenKind::LParen) {
            let mut index = 0usize;
            while !self.at_kind(TokenKind::RParen) && !self.at_kind(TokenKind::Eof) {
                let before = self.pos;
                let param_start = self.current().span.start;
                self.skip_decorators();
                let mut has_modifier = false;
                let mut hidden = false;
                while allow_properties && self.at_modifier() {
                    has_modifier = true;
                    hidden |= matches!(self.current_text(), "private" | "protected");
                    self.advance();
                }
                let is_property = has_modifier && !hidden;
                let rest = self.eat(TokenKind::Spread);
                let name = if matches!(self.at(), TokenKind::LBrace | TokenKind::LBracket) {
                    let span = self.current().span;
                    self.skip_balanced();
                    Ident::new(format!("__{index}"), span)
                } else {
                    self.expect_ident()
                };
                let optional = self.eat(TokenKind::Question);
                let ty = if self.eat(TokenKind::Colon) {
                    Some(self.parse_type())
                } else {
                    None
                };
                let has_initializer = if self.eat(TokenKind::Eq) {
                    self.skip_expression();
                    true
                } else {
                    false
                };

                if name.name == "this" && index == 0 && params.is_empty() && this_param.is_none() {
                    this_param = ty.map(Box::new);
                } else {
                    params.push(Param {
                        name,
                        optional,
                        rest,
                        ty,
                        has_initializer,
                        is_property,
                        span: self.span_from(param_start),
                    });
                    index += 1;
                }

                if !self.eat(TokenKind::Comma) {
                    if self.pos == before {
                        self.advance();
                    }
                    if !self.at_kind(TokenKind::RParen) {
                        self.error_expected(TokenKind::RParen);
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen);
        }

        let return_type = if self.eat(return_marker) {
            Some(Box::new(self.parse_return_type()))
        } else {
            None
        };

        Signature {
            type_params,
            this_param,
            params,
            return_type,
            span: self.span_from(start),
        }
    }

    /// Parses a return type, reducing type predicates to `boolean`.
    fn parse_return_type(&mut self) -> TypeNode {
        let start = self.current().span.start;
        if self.at_word("asserts") && (self.peek(1).is_identifier_name()) {
            self.advance();
            self.advance();
            if self.at_word("is") {
                self.advance();
                self.parse_type();
            }
            return TypeNode::new(TypeNodeKind::Keyword(KeywordType::Void), self.span_from(start));
        }
        if self.at().is_identifier_name() && self.peek_word(1, "is") && !self.nth(1).newline_before {
            self.advance();
            self.advance();
            self.parse_type();
            return TypeNode::new(
                TypeNodeKind::Keyword(KeywordType::Boolean),
                self.span_from(start),
            );
        }
        self.parse_type()
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    /// Parses a type expression.
    pub fn parse_type(&mut self) -> TypeNode {
        self.parse_type_inner(true)
    }

    fn parse_type_inner(&mut self, allow_conditional: bool) -> TypeNode {
        let start = self.current().span.start;

        if self.at_kind(TokenKind::New)
            || (self.at_word("abstract") && self.peek(1) == TokenKind::New)
        {
            if self.at_word("abstract") {
                self.advance();
            }
            self.advance(); // new
            let signature = self.parse_signature(TokenKind::Arrow, false);
            return TypeNode::new(
                TypeNodeKind::Function {
                    signature: Box::new(signature),
                    is_constructor: true,
                },
                self.span_from(start),
            );
        }

        let ty = self.parse_union_type();

        if allow_conditional && self.at_kind(TokenKind::Extends) && !self.current().newline_before {
            self.advance();
            self.parse_type_inner(false);
            self.expect(TokenKind::Question);
            self.parse_type();
            self.expect(TokenKind::Colon);
            self.parse_type();
            return TypeNode::new(
                TypeNodeKind::Unsupported("conditional type"),
                self.span_from(start),
            );
        }

        ty
    }

    fn parse_union_type(&mut self) -> TypeNode {
        let start = self.current().span.start;
        self.eat(TokenKind::Pipe);
        let first = self.parse_intersection_type();
        if !self.at_kind(TokenKind::Pipe) {
            return first;
        }
        let mut members = vec![first];
        while self.eat(TokenKind::Pipe) {
            members.push(self.parse_intersection_type());
        }
        TypeNode::new(TypeNodeKind::Union(members), self.span_from(start))
    }

    fn parse_intersection_type(&mut self) -> TypeNode {
        let start = self.current().span.start;
        self.eat(TokenKind::Amp);
        let first = self.parse_type_operator();
        if !self.at_kind(TokenKind::Amp) {
            return first;
        }
        let mut members = vec![first];
        while self.eat(TokenKind::Amp) {
            members.push(self.parse_type_operator());
        }
        TypeNode::new(TypeNodeKind::Intersection(members), self.span_from(start))
    }

    fn parse_type_operator(&mut self) -> TypeNode {
        let start = self.current().span.start;
        match self.at() {
            TokenKind::Keyof => {
                self.advance();
                let inner = self.parse_type_operator();
                TypeNode::new(TypeNodeKind::Keyof(Box::new(inner)), self.span_from(start))
            }
            TokenKind::Readonly => {
                self.advance();
                let inner = self.parse_type_operator();
                TypeNode::new(TypeNodeKind::Readonly(Box::new(inner)), self.span_from(start))
            }
            TokenKind::Ident if self.at_word("unique") && self.peek_word(1, "symbol") => {
                self.advance();
                self.advance();
                TypeNode::new(TypeNodeKind::Keyword(KeywordType::Symbol), self.span_from(start))
            }
            TokenKind::Ident if self.at_word("infer") && self.peek(1).is_identifier_name() => {
                self.advance();
                self.advance();
                if self.at_kind(TokenKind::Extends) {
                    self.advance();
                    self.parse_type_inner(false);
                }
                TypeNode::new(TypeNodeKind::Unsupported("infer type"), self.span_from(start))
            }
            _ => self.parse_postfix_type(),
        }
    }

    fn parse_postfix_type(&mut self) -> TypeNode {
        let start = self.current().span.start;
        let mut ty = self.parse_primary_type();
        while self.at_kind(TokenKind::LBracket) && !self.current().newline_before {
            self.advance();
            if self.eat(TokenKind::RBracket) {
                ty = TypeNode::new(TypeNodeKind::Array(Box::new(ty)), self.span_from(start));
            } else {
                let index = self.parse_type();
                self.expect(TokenKind::RBracket);
                ty = TypeNode::new(
                    TypeNodeKind::IndexedAccess {
                        object: Box::new(ty),
                        index: Box::new(index),
                    },
                    self.span_from(start),
                );
            }
        }
        ty
    }

    fn is_function_type_start(&self) -> bool {
        match self.at() {
            TokenKind::LAngle => true,
            TokenKind::LParen => self
                .matching_close(self.pos)
                .and_then(|close| self.tokens.get(close + 1))
                .is_some_and(|t| t.kind == TokenKind::Arrow),
            _ => false,
        }
    }

    fn parse_primary_type(&mut self) -> TypeNode {
        let start = self.current().span.start;

        if self.is_function_type_start() {
            let signature = self.parse_signature(TokenKind::Arrow, false);
            return TypeNode::new(
                TypeNodeKind::Function {
                    signature: Box::new(signature),
                    is_constructor: false,
                },
                self.span_from(start),
            );
        }

        let kind = match self.at() {
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_type();
                self.expect(TokenKind::RParen);
                return TypeNode::new(inner.kind, self.span_from(start));
            }
            TokenKind::LBrace => {
                if self.is_mapped_type() {
                    self.skip_balanced();
                    TypeNodeKind::Unsupported("mapped type")
                } else {
                    TypeNodeKind::Object(self.parse_object_members())
                }
            }
            TokenKind::LBracket => TypeNodeKind::Tuple(self.parse_tuple_elements()),
            TokenKind::StringLiteral
            | TokenKind::NumberLiteral
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Minus => match self.parse_literal_value() {
                Some(lit) => TypeNodeKind::Literal(lit),
                None => {
                    self.error("expected a type");
                    self.advance();
                    TypeNodeKind::Unsupported("expression")
                }
            },
            TokenKind::TemplateLiteral => {
                match self.parse_literal_value() {
                    Some(lit) => TypeNodeKind::Literal(lit),
                    None => {
                        self.advance();
                        TypeNodeKind::Template
                    }
                }
            }
            TokenKind::Null => {
                self.advance();
                TypeNodeKind::Keyword(KeywordType::Null)
            }
            TokenKind::Undefined => {
                self.advance();
                TypeNodeKind::Keyword(KeywordType::Undefined)
            }
            TokenKind::Void => {
                self.advance();
                TypeNodeKind::Keyword(KeywordType::Void)
            }
            TokenKind::Typeof => {
                self.advance();
                let mut path = vec![self.expect_ident()];
                while self.at_kind(TokenKind::Dot) && self.peek(1).is_identifier_name() {
                    self.advance();
                    path.push(self.expect_ident());
                }
                if self.at_kind(TokenKind::LAngle) && !self.current().newline_before {
                    self.skip_type_arguments();
                }
                TypeNodeKind::Query(path)
            }
            kind if kind.is_identifier_name() => {
                let text = self.current_text();
                let is_keyword_type = self.at() == TokenKind::Ident
                    && KeywordType::from_name(text).is_some()
                    && self.peek(1) != TokenKind::Dot;
                if is_keyword_type {
                    let keyword = KeywordType::from_name(text).unwrap_or(KeywordType::Any);
                    self.advance();
                    TypeNodeKind::Keyword(keyword)
                } else {
                    TypeNodeKind::Reference(self.parse_type_reference())
                }
            }
            _ => {
                self.error("expected a type");
                if !matches!(
                    self.at(),
                    TokenKind::Eof
                        | TokenKind::Semicolon
                        | TokenKind::RBrace
                        | TokenKind::RParen
                        | TokenKind::RBracket
                        | TokenKind::RAngle
                        | TokenKind::Comma
                ) {
                    self.advance();
                }
                TypeNodeKind::Unsupported("expression")
            }
        };

        TypeNode::new(kind, self.span_from(start))
    }

    fn skip_type_arguments(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.at() {
                TokenKind::Eof => return,
                TokenKind::LAngle => depth += 1,
                TokenKind::RAngle => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    fn parse_type_reference(&mut self) -> TypeRefNode {
        let start = self.current().span.start;
        let mut name = vec![self.expect_ident()];
        while self.at_kind(TokenKind::Dot) && self.peek(1).is_identifier_name() {
            self.advance();
            name.push(self.expect_ident());
        }
        let mut args = Vec::new();
        if self.at_kind(TokenKind::LAngle) && !self.current().newline_before {
            self.advance();
            while !self.at_kind(TokenKind::RAngle) && !self.at_kind(TokenKind::Eof) {
                let before = self.pos;
                args.push(self.parse_type());
                if !self.eat(TokenKind::Comma) {
                    if self.pos == before {
                        self.advance();
                    }
                    break;
                }
            }
            self.expect(TokenKind::RAngle);
        }
        TypeRefNode {
            name,
            args,
            span: self.span_from(start),
        }
    }

    fn is_mapped_type(&self) -> bool {
        let mut n = 1;
        if self.peek(n) == TokenKind::Readonly
            || (matches!(self.peek(n), TokenKind::Minus | TokenKind::Operator)
                && self.peek(n + 1) == TokenKind::Readonly)
        {
            n += if self.peek(n) == TokenKind::Readonly { 1 } else { 2 };
        }
        self.peek(n) == TokenKind::LBracket
            && self.peek(n + 1).is_identifier_name()
            && self.peek_word(n + 2, "in")
    }

    fn is_index_signature(&self) -> bool {
        self.at_kind(TokenKind::LBracket)
            && self.peek(1).is_identifier_name()
            && self.peek(2) == TokenKind::Colon
    }

    fn parse_index_signature(&mut self, readonly: bool, start: u32) -> IndexSignature {
        self.advance(); // [
        self.advance(); // name
        self.advance(); // :
        let key = self.parse_type();
        self.expect(TokenKind::RBracket);
        let value = if self.eat(TokenKind::Colon) {
            self.parse_type()
        } else {
            TypeNode::new(TypeNodeKind::Keyword(KeywordType::Any), self.span_from(start))
        };
        if !self.eat(TokenKind::Semicolon) {
            self.eat(TokenKind::Comma);
        }
        IndexSignature {
            key,
            value,
            readonly,
            span: self.span_from(start),
        }
    }

    fn parse_property_name(&mut self) -> Option<String> {
        let name = match self.at() {
            TokenKind::StringLiteral => unquote(self.current_text()),
            TokenKind::NumberLiteral => match number_literal(self.current_text()) {
                Literal::Number(n) | Literal::BigInt(n) => n,
                _ => self.current_text().to_string(),
            },
            kind if kind.is_identifier_name() => self.current_text().to_string(),
            _ => {
                self.error("expected a property name");
                return None;
            }
        };
        self.advance();
        Some(name)
    }

    /// Parses `{ members }` of an interface or object literal type.
    fn parse_object_members(&mut self) -> Vec<TypeMember> {
        let mut members = Vec::new();
        if !self.expect(TokenKind::LBrace) {
            return members;
        }

        while !self.at_kind(TokenKind::RBrace) && !self.at_kind(TokenKind::Eof) {
            let before = self.pos;
            if let Some(member) = self.parse_object_member() {
                members.push(member);
            }
            if !self.eat(TokenKind::Semicolon) {
                self.eat(TokenKind::Comma);
            }
            if self.pos == before {
                self.advance();
            }
        }
        self.expect(TokenKind::RBrace);
        members
    }

    fn parse_object_member(&mut self) -> Option<TypeMember> {
        let start = self.current().span.start;
        let doc = self.current_doc();

        // Call and construct signatures
        if matches!(self.at(), TokenKind::LParen | TokenKind::LAngle) {
            return Some(TypeMember::Call(self.parse_signature(TokenKind::Colon, false)));
        }
        if self.at_kind(TokenKind::New) && matches!(self.peek(1), TokenKind::LParen | TokenKind::LAngle) {
            self.advance();
            return Some(TypeMember::Construct(self.parse_signature(TokenKind::Colon, false)));
        }

        let readonly = self.at_kind(TokenKind::Readonly)
            && !matches!(
                self.peek(1),
                TokenKind::Colon | TokenKind::Question | TokenKind::LParen | TokenKind::Semicolon
            );
        if readonly {
            self.advance();
        }

        if self.at_kind(TokenKind::LBracket) {
            if self.is_index_signature() {
                return Some(TypeMember::Index(self.parse_index_signature(readonly, start)));
            }
            self.skip_balanced();
            self.skip_member_rest();
            self.warn_unsupported("computed property name", self.span_from(start));
            return None;
        }

        let accessor = (self.at_word("get") || self.at_word("set"))
            && (self.peek(1).is_identifier_name() || self.peek(1) == TokenKind::StringLiteral);
        let is_getter = accessor && self.at_word("get");
        if accessor {
            self.advance();
        }

        let name = self.parse_property_name()?;
        let optional = self.eat(TokenKind::Question);

        if matches!(self.at(), TokenKind::LParen | TokenKind::LAngle) {
            let signature = self.parse_signature(TokenKind::Colon, false);
            let span = self.span_from(start);
            if accessor {
                if !is_getter {
                    return None;
                }
                return Some(TypeMember::Property(PropertySignature {
                    name,
                    optional,
                    readonly: true,
                    ty: signature.return_type.map(|ty| *ty),
                    doc,
                    span,
                }));
            }
            return Some(TypeMember::Method(MethodSignature {
                name,
                optional,
                signature,
                doc,
                span,
            }));
        }

        let ty = if self.eat(TokenKind::Colon) {
            Some(self.parse_type())
        } else {
            None
        };
        Some(TypeMember::Property(PropertySignature {
            name,
            optional,
            readonly,
            ty,
            doc,
            span: self.span_from(start),
        }))
    }

    fn parse_tuple_elements(&mut self) -> Vec<TupleElement> {
        let mut elements = Vec::new();
        self.advance(); // [
        while !self.at_kind(TokenKind::RBracket) && !self.at_kind(TokenKind::Eof) {
            let before = self.pos;
            let rest = self.eat(TokenKind::Spread);
            let labeled = self.at().is_identifier_name()
                && (self.peek(1) == TokenKind::Colon
                    || (self.peek(1) == TokenKind::Question && self.peek(2) == TokenKind::Colon));
            let (label, mut optional) = if labeled {
                let label = self.expect_ident();
                let optional = self.eat(TokenKind::Question);
                self.advance(); // :
                (Some(label), optional)
            } else {
                (None, false)
            };
            let ty = self.parse_type();
            if !labeled && self.at_kind(TokenKind::Question) {
                self.advance();
                optional = true;
            }
            elements.push(TupleElement {
                label,
                optional,
                rest,
                ty,
            });
            if !self.eat(TokenKind::Comma) {
                if self.pos == before {
                    self.advance();
                }
                break;
            }
        }
        self.expect(TokenKind::RBracket);
        elements
    }
}

/// Computes the type of a class property from its initializer.
fn initializer_type(init: Initializer, keep_literal: bool, span: Span) -> Option<TypeNode> {
    match init {
        Initializer::Literal(lit) if keep_literal => {
            Some(TypeNode::new(TypeNodeKind::Literal(lit), span))
        }
        Initializer::Literal(lit) => {
            let keyword = match lit {
                Literal::String(_) => KeywordType::String,
                Literal::Number(_) => KeywordType::Number,
                Literal::BigInt(_) => KeywordType::BigInt,
                Literal::Boolean(_) => KeywordType::Boolean,
            };
            Some(TypeNode::new(TypeNodeKind::Keyword(keyword), span))
        }
        Initializer::Asserted(ty) => Some(ty),
        Initializer::Function {
            signature,
            ..
        } => Some(TypeNode::new(
            TypeNodeKind::Function {
                signature: Box::new(signature),
                is_constructor: false,
            },
            span,
        )),
        Initializer::Other => None,
    }
}

/// Strips the quotes of a string literal token and resolves escapes.
#[must_use]
pub fn unquote(raw: &str) -> String {
    if raw.len() >= 2 {
        unescape(&raw[1..raw.len() - 1])
    } else {
        String::new()
    }
}

/// Resolves JavaScript string escapes.
#[must_use]
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                if let Some(ch) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    out.push(ch);
                }
            }
            Some('u') => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|c| *c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                if let Some(ch) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    out.push(ch);
                }
            }
            // Line continuation
            Some('\n') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Normalises a number literal token.
fn number_literal(text: &str) -> Literal {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    if let Some(digits) = cleaned.strip_suffix('n') {
        return Literal::BigInt(radix_value(digits).map_or_else(|| digits.to_string(), |v| v.to_string()));
    }
    if let Some(value) = radix_value(&cleaned) {
        return Literal::Number(value.to_string());
    }
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => Literal::Number(format!("{value}")),
        _ => Literal::Number(cleaned),
    }
}

fn radix_value(text: &str) -> Option<u128> {
    let lower = text.to_ascii_lowercase();
    let (digits, radix) = if let Some(d) = lower.strip_prefix("0x") {
        (d, 16)
    } else if let Some(d) = lower.strip_prefix("0o") {
        (d, 8)
    } else if let Some(d) = lower.strip_prefix("0b") {
        (d, 2)
    } else if !lower.is_empty() && lower.bytes().all(|b| b.is_ascii_digit()) {
        (lower.as_str(), 10)
    } else {
        return None;
    };
    u128::from_str_radix(digits, radix).ok()
}

fn negate(value: &str) -> String {
    match value.strip_prefix('-') {
        Some(positive) => positive.to_string(),
        None if value == "0" => "0".to_string(),
        None => format!("-{value}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Module {
        let result = parse(source);
        assert!(
            !result.diagnostics.has_errors(),
            "unexpected errors: {:?}",
            result.diagnostics.errors().collect::<Vec<_>>()
        );
        result.module
    }

    fn alias_type(source: &str) -> TypeNodeKind {
        let module = parse_ok(source);
        match &module.items[0] {
            Item::TypeAlias(alias) => alias.ty.kind.clone(),
            other => panic!("expected type alias, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_function_declaration() {
        let module = parse_ok(
            "/** Greets. */\nexport async function Query(this: Ctx, name: string, age?: number): Promise<string> {\n  return `hi ${name}`;\n}\n",
        );
        assert_eq!(module.items.len(), 1);
        let Item::Function(func) = &module.items[0] else {
            panic!("expected function");
        };
        assert!(func.exported);
        assert!(func.is_async);
        assert!(func.has_body);
        assert_eq!(func.name.name, "Query");
        assert_eq!(func.doc.as_deref(), Some("Greets."));
        assert!(func.signature.this_param.is_some());
        assert_eq!(func.signature.params.len(), 2);
        assert!(func.signature.params[1].optional);
    }

    #[test]
    fn test_parse_generator_function() {
        let module = parse_ok("export async function* Subscription(): AsyncGenerator<number> { yield 1; }");
        let Item::Function(func) = &module.items[0] else {
            panic!("expected function");
        };
        assert!(func.is_generator);
        assert!(func.is_async);
    }

    #[test]
    fn test_parse_interface_members() {
        let module = parse_ok(
            "interface User extends Base<string>, Other {\n  readonly id: string;\n  name?: string\n  greet(other: User): string;\n  [key: string]: unknown;\n}",
        );
        let Item::Interface(iface) = &module.items[0] else {
            panic!("expected interface");
        };
        assert_eq!(iface.extends.len(), 2);
        assert_eq!(iface.members.len(), 4);
        assert!(matches!(&iface.members[0], TypeMember::Property(p) if p.readonly && p.name == "id"));
        assert!(matches!(&iface.members[1], TypeMember::Property(p) if p.optional));
        assert!(matches!(&iface.members[2], TypeMember::Method(m) if m.name == "greet"));
        assert!(matches!(&iface.members[3], TypeMember::Index(_)));
    }

    #[test]
    fn test_parse_union_and_array_types() {
        let TypeNodeKind::Union(members) = alias_type("type T = | 'a' | \"b\" | string[][] | null;") else {
            panic!("expected union");
        };
        assert_eq!(members.len(), 4);
        assert!(matches!(&members[0].kind, TypeNodeKind::Literal(Literal::String(s)) if s == "a"));
        let TypeNodeKind::Array(inner) = &members[2].kind else {
            panic!("expected array");
        };
        assert!(matches!(inner.kind, TypeNodeKind::Array(_)));
        assert!(matches!(members[3].kind, TypeNodeKind::Keyword(KeywordType::Null)));
    }

    #[test]
    fn test_parse_function_and_parenthesized_types() {
        assert!(matches!(
            alias_type("type F = (a: string, b?: number) => void;"),
            TypeNodeKind::Function { is_constructor: false, .. }
        ));
        assert!(matches!(
            alias_type("type A = (string | number)[];"),
            TypeNodeKind::Array(_)
        ));
        assert!(matches!(
            alias_type("type C = new (x: string) => Foo;"),
            TypeNodeKind::Function { is_constructor: true, .. }
        ));
    }

    #[test]
    fn test_parse_tuple_type() {
        let TypeNodeKind::Tuple(elements) =
            alias_type("type T = [id: string, count?: number, ...rest: boolean[]];")
        else {
            panic!("expected tuple");
        };
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0].label.as_ref().map(Ident::as_str), Some("id"));
        assert!(elements[1].optional);
        assert!(elements[2].rest);
    }

    #[test]
    fn test_parse_generic_reference() {
        let TypeNodeKind::Reference(reference) =
            alias_type("type P = Parameters<typeof ns.Query>;")
        else {
            panic!("expected reference");
        };
        assert_eq!(reference.qualified_name(), "Parameters");
        assert!(matches!(&reference.args[0].kind, TypeNodeKind::Query(path) if path.len() == 2));
    }

    #[test]
    fn test_parse_imports_and_exports() {
        let module = parse_ok(
            "import type { A, B as C } from './a';\nimport * as ns from \"./ns\";\nimport D, { type E } from '@/d';\nexport { X as Y } from './x';\nexport * from './all';\nexport { local };\n",
        );
        assert_eq!(module.items.len(), 6);
        let Item::Import(first) = &module.items[0] else {
            panic!("expected import");
        };
        assert!(first.type_only);
        assert_eq!(first.names[1].local.name, "C");
        let Item::Import(second) = &module.items[1] else {
            panic!("expected import");
        };
        assert_eq!(second.namespace.as_ref().map(Ident::as_str), Some("ns"));
        let Item::Import(third) = &module.items[2] else {
            panic!("expected import");
        };
        assert_eq!(third.default.as_ref().map(Ident::as_str), Some("D"));
        assert!(third.names[0].type_only);
        assert!(matches!(&module.items[4], Item::ExportFrom(e) if e.names.is_none()));
        assert!(matches!(&module.items[5], Item::ExportNames(_)));
    }

    #[test]
    fn test_parse_variable_initializers() {
        let module = parse_ok(
            "export const __typename = \"User\";\nexport const n = -1 as const;\nexport const f = async (a: string): Promise<number> => { return 1; };\nconst x = compute(1, 2);\nexport let y: string = make();",
        );
        assert_eq!(module.items.len(), 5);
        let Item::Variable(first) = &module.items[0] else {
            panic!("expected variable");
        };
        assert!(matches!(&first.init, Some(Initializer::Literal(Literal::String(s))) if s == "User"));
        let Item::Variable(second) = &module.items[1] else {
            panic!("expected variable");
        };
        assert!(matches!(&second.init, Some(Initializer::Literal(Literal::Number(n))) if n == "-1"));
        let Item::Variable(third) = &module.items[2] else {
            panic!("expected variable");
        };
        assert!(matches!(&third.init, Some(Initializer::Function { is_async: true, .. })));
        let Item::Variable(fourth) = &module.items[3] else {
            panic!("expected variable");
        };
        assert!(matches!(fourth.init, Some(Initializer::Other)));
        let Item::Variable(fifth) = &module.items[4] else {
            panic!("expected variable");
        };
        assert!(fifth.ty.is_some());
    }

    #[test]
    fn test_parse_class_members() {
        let module = parse_ok(
            "export class User extends Base implements Named {\n  @field() id: string;\n  private secret = 'x';\n  static count = 0;\n  count = 1;\n  #hidden: number;\n  constructor(public name: string, private token: string) { super(); }\n  get label(): string { return this.name; }\n  greet(): string { return 'hi'; }\n}",
        );
        let Item::Class(class) = &module.items[0] else {
            panic!("expected class");
        };
        let names: Vec<_> = class
            .members
            .iter()
            .filter_map(|m| match m {
                TypeMember::Property(p) => Some(p.name.as_str()),
                TypeMember::Method(m) => Some(m.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["id", "count", "label", "greet"]);
        let constructor = class.constructor.as_ref().unwrap();
        assert!(constructor.params[0].is_property);
        assert!(!constructor.params[1].is_property);
    }

    #[test]
    fn test_parse_enum() {
        let module = parse_ok("export enum Role { Admin = 'ADMIN', User = \"USER\", Guest }");
        let Item::Enum(decl) = &module.items[0] else {
            panic!("expected enum");
        };
        assert_eq!(decl.members.len(), 3);
        assert_eq!(decl.members[0].value, Some(Literal::String("ADMIN".into())));
        assert_eq!(decl.members[2].value, None);
    }

    #[test]
    fn test_skip_unsupported_statements() {
        let result = parse("console.log('x');\nif (a) { b(); }\nexport type A = string;");
        assert!(!result.diagnostics.has_errors());
        assert_eq!(result.module.items.len(), 1);
        assert!(result.diagnostics.warnings().count() >= 1);
    }

    #[test]
    fn test_conditional_type_is_unsupported() {
        assert!(matches!(
            alias_type("type X<T> = T extends string ? 'a' : 'b';"),
            TypeNodeKind::Unsupported("conditional type")
        ));
    }

    #[test]
    fn test_type_predicate_return() {
        let module = parse_ok("function isUser(x: unknown): x is User { return true; }");
        let Item::Function(func) = &module.items[0] else {
            panic!("expected function");
        };
        let ret = func.signature.return_type.as_ref().unwrap();
        assert!(matches!(ret.kind, TypeNodeKind::Keyword(KeywordType::Boolean)));
    }

    #[test]
    fn test_number_literal_normalisation() {
        assert_eq!(number_literal("0x10"), Literal::Number("16".into()));
        assert_eq!(number_literal("1_000"), Literal::Number("1000".into()));
        assert_eq!(number_literal("1.50"), Literal::Number("1.5".into()));
        assert_eq!(number_literal("10n"), Literal::BigInt("10".into()));
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unquote(r#""a\"b\n""#), "a\"b\n");
        assert_eq!(unquote(r"'A\u{42}'"), "AB");
    }

    #[test]
    fn test_syntax_error_reported() {
        let result = parse("type A = ;");
        assert!(result.diagnostics.has_errors());
    }
}
