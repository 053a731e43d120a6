//! Token kinds and structures for the TypeScript subset.

use fngql_core::Span;

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TokenKind {
    // Sentinels
    Eof,
    Error,

    // Literals
    Ident,
    NumberLiteral,
    StringLiteral,
    TemplateLiteral,

    // Keywords - Declarations
    Import,
    Export,
    Type,
    Interface,
    Class,
    Enum,
    Function,
    Const,
    Let,
    Var,
    Declare,
    Default,
    Async,

    // Keywords - Type operators
    Extends,
    Implements,
    Typeof,
    Keyof,
    Readonly,
    New,

    // Keywords - Literal values
    True,
    False,
    Null,
    Undefined,
    Void,

    // Punctuation
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LAngle,
    RAngle,
    Colon,
    Semicolon,
    Comma,
    Dot,
    Spread,
    Eq,
    Arrow,
    Pipe,
    Amp,
    Question,
    Star,
    Minus,
    At,
    Hash,
    /// Any other operator character (`+`, `/`, `%`, `!`, `^`, `~`).
    Operator,
}

impl TokenKind {
    #[must_use]
    pub const fn is_keyword(self) -> bool {
        matches!(
            self,
            Self::Import
                | Self::Export
                | Self::Type
                | Self::Interface
                | Self::Class
                | Self::Enum
                | Self::Function
                | Self::Const
                | Self::Let
                | Self::Var
                | Self::Declare
                | Self::Default
                | Self::Async
                | Self::Extends
                | Self::Implements
                | Self::Typeof
                | Self::Keyof
                | Self::Readonly
                | Self::New
                | Self::True
                | Self::False
                | Self::Null
                | Self::Undefined
                | Self::Void
        )
    }

    /// Returns true for tokens usable as identifier names (keywords included).
    #[must_use]
    pub const fn is_identifier_name(self) -> bool {
        matches!(self, Self::Ident) || self.is_keyword()
    }

    /// Returns true for tokens that begin a top-level statement.
    #[must_use]
    pub const fn starts_statement(self) -> bool {
        matches!(
            self,
            Self::Import
                | Self::Export
                | Self::Type
                | Self::Interface
                | Self::Class
                | Self::Enum
                | Self::Function
                | Self::Const
                | Self::Let
                | Self::Var
                | Self::Declare
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eof => "<eof>",
            Self::Error => "<error>",
            Self::Ident => "<ident>",
            Self::NumberLiteral => "<number>",
            Self::StringLiteral => "<string>",
            Self::TemplateLiteral => "<template>",
            Self::Import => "import",
            Self::Export => "export",
            Self::Type => "type",
            Self::Interface => "interface",
            Self::Class => "class",
            Self::Enum => "enum",
            Self::Function => "function",
            Self::Const => "const",
            Self::Let => "let",
            Self::Var => "var",
            Self::Declare => "declare",
            Self::Default => "default",
            Self::Async => "async",
            Self::Extends => "extends",
            Self::Implements => "implements",
            Self::Typeof => "typeof",
            Self::Keyof => "keyof",
            Self::Readonly => "readonly",
            Self::New => "new",
            Self::True => "true",
            Self::False => "false",
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::Void => "void",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::LAngle => "<",
            Self::RAngle => ">",
            Self::Colon => ":",
            Self::Semicolon => ";",
            Self::Comma => ",",
            Self::Dot => ".",
            Self::Spread => "...",
            Self::Eq => "=",
            Self::Arrow => "=>",
            Self::Pipe => "|",
            Self::Amp => "&",
            Self::Question => "?",
            Self::Star => "*",
            Self::Minus => "-",
            Self::At => "@",
            Self::Hash => "#",
            Self::Operator => "<operator>",
        }
    }

    #[must_use]
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "import" => Some(Self::Import),
            "export" => Some(Self::Export),
            "type" => Some(Self::Type),
            "interface" => Some(Self::Interface),
            "class" => Some(Self::Class),
            "enum" => Some(Self::Enum),
            "function" => Some(Self::Function),
            "const" => Some(Self::Const),
            "let" => Some(Self::Let),
            "var" => Some(Self::Var),
            "declare" => Some(Self::Declare),
            "default" => Some(Self::Default),
            "async" => Some(Self::Async),
            "extends" => Some(Self::Extends),
            "implements" => Some(Self::Implements),
            "typeof" => Some(Self::Typeof),
            "keyof" => Some(Self::Keyof),
            "readonly" => Some(Self::Readonly),
            "new" => Some(Self::New),
            "true" => Some(Self::True),
            "false" => Some(Self::False),
            "null" => Some(Self::Null),
            "undefined" => Some(Self::Undefined),
            "void" => Some(Self::Void),
            _ => None,
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One lexed token. Trivia is folded into the flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Whether a line break separates this token from the previous one.
    pub newline_before: bool,
    /// The closest `/** */` comment directly before this token.
    pub doc: Option<Span>,
}

impl Token {
    #[must_use]
    #[inline]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self {
            kind,
            span,
            newline_before: false,
            doc: None,
        }
    }

    #[must_use]
    #[inline]
    pub const fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}
