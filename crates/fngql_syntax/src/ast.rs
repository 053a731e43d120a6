//! Abstract syntax tree for the TypeScript subset.
//!
//! Only the declaration surface is kept: function bodies and initializer
//! expressions are skipped by the parser, so the tree describes what a
//! module declares and exports, never what it computes.

use fngql_core::Span;

/// A parsed source file.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub items: Vec<Item>,
    pub span: Span,
}

/// An identifier with its span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

/// A top-level item.
#[derive(Debug, Clone)]
pub enum Item {
    Import(ImportDecl),
    TypeAlias(TypeAliasDecl),
    Interface(InterfaceDecl),
    Class(ClassDecl),
    Enum(EnumDecl),
    Function(FunctionDecl),
    Variable(VariableDecl),
    /// `export { a } from "m"` / `export * from "m"` / `export * as ns from "m"`.
    ExportFrom(ExportFromDecl),
    /// `export { a, b as c }` over local bindings.
    ExportNames(ExportNamesDecl),
}

impl Item {
    /// Returns the declared name, if the item declares one.
    #[must_use]
    pub fn declared_name(&self) -> Option<&Ident> {
        match self {
            Self::TypeAlias(d) => Some(&d.name),
            Self::Interface(d) => Some(&d.name),
            Self::Class(d) => Some(&d.name),
            Self::Enum(d) => Some(&d.name),
            Self::Function(d) => Some(&d.name),
            Self::Variable(d) => Some(&d.name),
            Self::Import(_) | Self::ExportFrom(_) | Self::ExportNames(_) => None,
        }
    }

    /// Returns true for declarations carrying a named `export` modifier.
    #[must_use]
    pub fn is_exported(&self) -> bool {
        match self {
            Self::TypeAlias(d) => d.exported,
            Self::Interface(d) => d.exported,
            Self::Class(d) => d.exported,
            Self::Enum(d) => d.exported,
            Self::Function(d) => d.exported,
            Self::Variable(d) => d.exported,
            Self::Import(_) | Self::ExportFrom(_) | Self::ExportNames(_) => false,
        }
    }
}

/// An import declaration.
#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub source: String,
    pub type_only: bool,
    pub default: Option<Ident>,
    pub namespace: Option<Ident>,
    pub names: Vec<ImportSpecifier>,
    pub span: Span,
}

/// `imported as local` inside an import clause.
#[derive(Debug, Clone)]
pub struct ImportSpecifier {
    pub imported: Ident,
    pub local: Ident,
    pub type_only: bool,
}

/// `local as exported` inside an export clause.
#[derive(Debug, Clone)]
pub struct ExportSpecifier {
    pub local: Ident,
    pub exported: Ident,
}

#[derive(Debug, Clone)]
pub struct ExportFromDecl {
    pub source: String,
    /// `None` for `export * from`.
    pub names: Option<Vec<ExportSpecifier>>,
    /// `export * as ns from`.
    pub namespace: Option<Ident>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ExportNamesDecl {
    pub names: Vec<ExportSpecifier>,
    pub span: Span,
}

/// `type Name<T> = ...`
#[derive(Debug, Clone)]
pub struct TypeAliasDecl {
    pub exported: bool,
    pub doc: Option<String>,
    pub name: Ident,
    pub type_params: Vec<TypeParam>,
    pub ty: TypeNode,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub exported: bool,
    pub doc: Option<String>,
    pub name: Ident,
    pub type_params: Vec<TypeParam>,
    pub extends: Vec<TypeRefNode>,
    pub members: Vec<TypeMember>,
    pub span: Span,
}

/// A class declaration. Only public instance members are recorded in `members`.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub exported: bool,
    pub doc: Option<String>,
    pub name: Ident,
    pub type_params: Vec<TypeParam>,
    pub extends: Option<TypeRefNode>,
    pub implements: Vec<TypeRefNode>,
    pub members: Vec<TypeMember>,
    pub constructor: Option<Signature>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub exported: bool,
    pub doc: Option<String>,
    pub name: Ident,
    pub members: Vec<EnumMember>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct EnumMember {
    pub name: Ident,
    /// The initializer, when it is a literal.
    pub value: Option<Literal>,
    pub doc: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub exported: bool,
    pub doc: Option<String>,
    pub name: Ident,
    pub is_async: bool,
    pub is_generator: bool,
    pub signature: Signature,
    /// False for overload signatures and `declare function`.
    pub has_body: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Const,
    Let,
    Var,
}

#[derive(Debug, Clone)]
pub struct VariableDecl {
    pub exported: bool,
    pub doc: Option<String>,
    pub kind: VariableKind,
    pub name: Ident,
    pub ty: Option<TypeNode>,
    pub init: Option<Initializer>,
    pub span: Span,
}

/// What the parser could recover from an initializer expression.
#[derive(Debug, Clone)]
pub enum Initializer {
    Literal(Literal),
    /// `expr as T` (other than `as const`).
    Asserted(TypeNode),
    /// An arrow function or function expression.
    Function {
        is_async: bool,
        is_generator: bool,
        signature: Signature,
    },
    /// Anything else; its type cannot be recovered without inference.
    Other,
}

/// A call signature: type parameters, parameters, and return type.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    pub type_params: Vec<TypeParam>,
    /// The annotated type of an explicit `this` parameter.
    pub this_param: Option<Box<TypeNode>>,
    pub params: Vec<Param>,
    pub return_type: Option<Box<TypeNode>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Ident,
    pub optional: bool,
    pub rest: bool,
    pub ty: Option<TypeNode>,
    pub has_initializer: bool,
    /// Set for constructor parameter properties (`constructor(public x: T)`).
    pub is_property: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TypeParam {
    pub name: Ident,
    pub constraint: Option<TypeNode>,
    pub default: Option<TypeNode>,
}

/// A literal value usable as a type.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    /// Normalised decimal text (`0x10` becomes `16`, `1.0` becomes `1`).
    Number(String),
    BigInt(String),
    Boolean(bool),
}

/// A type expression.
#[derive(Debug, Clone)]
pub struct TypeNode {
    pub kind: TypeNodeKind,
    pub span: Span,
}

impl TypeNode {
    pub fn new(kind: TypeNodeKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordType {
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
    Object,
    This,
}

impl KeywordType {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "any" => Self::Any,
            "unknown" => Self::Unknown,
            "never" => Self::Never,
            "void" => Self::Void,
            "undefined" => Self::Undefined,
            "null" => Self::Null,
            "string" => Self::String,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "bigint" => Self::BigInt,
            "symbol" => Self::Symbol,
            "object" => Self::Object,
            "this" => Self::This,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Unknown => "unknown",
            Self::Never => "never",
            Self::Void => "void",
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::BigInt => "bigint",
            Self::Symbol => "symbol",
            Self::Object => "object",
            Self::This => "this",
        }
    }
}

#[derive(Debug, Clone)]
pub enum TypeNodeKind {
    Keyword(KeywordType),
    Literal(Literal),
    Reference(TypeRefNode),
    Object(Vec<TypeMember>),
    Array(Box<TypeNode>),
    Tuple(Vec<TupleElement>),
    Union(Vec<TypeNode>),
    Intersection(Vec<TypeNode>),
    Function {
        signature: Box<Signature>,
        is_constructor: bool,
    },
    /// `typeof a.b`
    Query(Vec<Ident>),
    Keyof(Box<TypeNode>),
    /// `readonly T[]` / `readonly [A, B]`
    Readonly(Box<TypeNode>),
    IndexedAccess {
        object: Box<TypeNode>,
        index: Box<TypeNode>,
    },
    /// A template literal type; always widened to `string`.
    Template,
    /// Syntax outside the subset (conditional, mapped, `infer`), kept for diagnostics.
    Unsupported(&'static str),
}

/// A (possibly qualified) type reference with type arguments.
#[derive(Debug, Clone)]
pub struct TypeRefNode {
    pub name: Vec<Ident>,
    pub args: Vec<TypeNode>,
    pub span: Span,
}

impl TypeRefNode {
    /// Returns the dotted name.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        self.name
            .iter()
            .map(Ident::as_str)
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Debug, Clone)]
pub struct TupleElement {
    pub label: Option<Ident>,
    pub optional: bool,
    pub rest: bool,
    pub ty: TypeNode,
}

/// A member of an object type, interface, or class.
#[derive(Debug, Clone)]
pub enum TypeMember {
    Property(PropertySignature),
    Method(MethodSignature),
    Index(IndexSignature),
    Call(Signature),
    Construct(Signature),
}

#[derive(Debug, Clone)]
pub struct PropertySignature {
    pub name: String,
    pub optional: bool,
    pub readonly: bool,
    /// `None` when the member has no annotation.
    pub ty: Option<TypeNode>,
    pub doc: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct MethodSignature {
    pub name: String,
    pub optional: bool,
    pub signature: Signature,
    pub doc: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IndexSignature {
    pub key: TypeNode,
    pub value: TypeNode,
    pub readonly: bool,
    pub span: Span,
}
