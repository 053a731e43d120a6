//! Checker type representation.
//!
//! Types live in an [`Arena`](fngql_core::Arena) and refer to each other by
//! [`TypeId`], which lets a declared type be allocated before its members are
//! resolved. Only the checker allocates; everything else reads.

use fngql_core::Idx;

/// Handle of a checker type.
pub type TypeId = Idx<Type>;

/// A checker type.
#[derive(Debug, Clone)]
pub struct Type {
    pub kind: TypeKind,
    /// The declaration this type was instantiated from, if any.
    pub name: Option<DeclName>,
    /// The declaration's doc comment.
    pub doc: Option<String>,
}

impl Type {
    #[must_use]
    pub const fn anonymous(kind: TypeKind) -> Self {
        Self {
            kind,
            name: None,
            doc: None,
        }
    }
}

/// The name of a declared type together with its type arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclName {
    pub name: String,
    /// Declaring file relative to the project root; `None` for built-ins.
    pub file: Option<String>,
    pub args: Vec<TypeId>,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Any,
    Unknown,
    Never,
    Void,
    Undefined,
    Null,
    String,
    Number,
    Boolean,
    BigInt,
    Symbol,
    /// The `object` keyword.
    NonPrimitive,
    Literal(LiteralType),
    Union(Vec<TypeId>),
    Intersection(Vec<TypeId>),
    Object(ObjectType),
    Array(TypeId),
    Tuple(Vec<TupleElementType>),
    Enum(Vec<EnumMemberType>),
    TypeParam {
        name: String,
        constraint: Option<TypeId>,
    },
    /// A library type whose structure is opaque.
    Builtin(Builtin, Vec<TypeId>),
    /// A type that could not be resolved; a diagnostic has been reported.
    Unresolved,
    /// A declared type whose body is still being resolved.
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiteralType {
    String(String),
    Number(String),
    BigInt(String),
    Boolean(bool),
}

impl LiteralType {
    /// Renders the literal as TypeScript source.
    #[must_use]
    pub fn to_source(&self) -> String {
        match self {
            Self::String(s) => quote_string(s),
            Self::Number(n) => n.clone(),
            Self::BigInt(n) => format!("{n}n"),
            Self::Boolean(b) => b.to_string(),
        }
    }
}

/// Quotes a string with double quotes and JSON-style escapes.
#[must_use]
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Structural members of an object type.
#[derive(Debug, Clone, Default)]
pub struct ObjectType {
    /// Own properties in declaration order.
    pub properties: Vec<Property>,
    pub call_signatures: Vec<Signature>,
    pub construct_signatures: Vec<Signature>,
    pub string_index: Option<TypeId>,
    pub number_index: Option<TypeId>,
    /// Inherited object types (`extends`).
    pub bases: Vec<TypeId>,
}

impl ObjectType {
    /// True for a type consisting of a single call signature.
    #[must_use]
    pub fn is_function(&self) -> bool {
        self.properties.is_empty()
            && self.call_signatures.len() == 1
            && self.construct_signatures.is_empty()
            && self.string_index.is_none()
            && self.number_index.is_none()
            && self.bases.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub ty: TypeId,
    pub optional: bool,
    pub readonly: bool,
    pub is_method: bool,
    pub doc: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Signature {
    pub type_params: Vec<TypeId>,
    pub this_type: Option<TypeId>,
    pub params: Vec<ParamType>,
    pub return_type: TypeId,
}

#[derive(Debug, Clone)]
pub struct ParamType {
    pub name: String,
    pub ty: TypeId,
    /// Optional or defaulted.
    pub optional: bool,
    pub rest: bool,
}

#[derive(Debug, Clone)]
pub struct TupleElementType {
    pub label: Option<String>,
    pub ty: TypeId,
    pub optional: bool,
    pub rest: bool,
}

#[derive(Debug, Clone)]
pub struct EnumMemberType {
    pub name: String,
    pub value: LiteralType,
    pub doc: Option<String>,
}

/// Library types known to the checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Promise,
    AsyncGenerator,
    AsyncIterable,
    AsyncIterableIterator,
    Generator,
    Iterable,
    IterableIterator,
    Date,
    RegExp,
    Error,
    Map,
    Set,
    Function,
    Object,
}

impl Builtin {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Promise" | "PromiseLike" => Self::Promise,
            "AsyncGenerator" => Self::AsyncGenerator,
            "AsyncIterable" => Self::AsyncIterable,
            "AsyncIterableIterator" => Self::AsyncIterableIterator,
            "Generator" => Self::Generator,
            "Iterable" => Self::Iterable,
            "IterableIterator" => Self::IterableIterator,
            "Date" => Self::Date,
            "RegExp" => Self::RegExp,
            "Error" => Self::Error,
            "Map" | "ReadonlyMap" => Self::Map,
            "Set" | "ReadonlySet" => Self::Set,
            "Function" => Self::Function,
            "Object" => Self::Object,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Promise => "Promise",
            Self::AsyncGenerator => "AsyncGenerator",
            Self::AsyncIterable => "AsyncIterable",
            Self::AsyncIterableIterator => "AsyncIterableIterator",
            Self::Generator => "Generator",
            Self::Iterable => "Iterable",
            Self::IterableIterator => "IterableIterator",
            Self::Date => "Date",
            Self::RegExp => "RegExp",
            Self::Error => "Error",
            Self::Map => "Map",
            Self::Set => "Set",
            Self::Function => "Function",
            Self::Object => "Object",
        }
    }

    /// True for the iterable protocols an async generator function may return.
    #[must_use]
    pub const fn is_async_iterable(self) -> bool {
        matches!(
            self,
            Self::AsyncGenerator | Self::AsyncIterable | Self::AsyncIterableIterator
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_source() {
        assert_eq!(LiteralType::String("a\"b".into()).to_source(), r#""a\"b""#);
        assert_eq!(LiteralType::BigInt("10".into()).to_source(), "10n");
        assert_eq!(LiteralType::Boolean(false).to_source(), "false");
    }

    #[test]
    fn test_builtin_names() {
        assert_eq!(Builtin::from_name("PromiseLike"), Some(Builtin::Promise));
        assert_eq!(Builtin::from_name("Strin"), None);
        assert!(Builtin::AsyncIterable.is_async_iterable());
        assert!(!Builtin::Generator.is_async_iterable());
    }
}
