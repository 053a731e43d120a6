//! Collected type metadata.
//!
//! A [`TypeMeta`] is one classified node of the type graph reachable from the
//! operations of a project. Nodes live in an arena and point at each other
//! through [`MetaId`] handles, so a self-referential type is a node whose
//! field refers back to its own id.

use fngql_core::{Arena, Idx};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Handle of a collected type.
pub type MetaId = Idx<TypeMeta>;

/// Scalars every GraphQL schema provides.
pub const BUILTIN_SCALARS: &[&str] = &["String", "Int", "Float", "Boolean", "ID"];

/// Names a synthesized type definition may never take.
pub const RESERVED_NAMES: &[&str] = &[
    "String",
    "Int",
    "Float",
    "Boolean",
    "ID",
    "Query",
    "Mutation",
    "Subscription",
];

/// Primary classification of a collected type.
///
/// For list types the kind describes the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MetaKind {
    Scalar,
    Object,
    Union,
    Enum,
    Tuple,
}

/// A reference to a collected type from a field, argument or union member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRef {
    pub meta: MetaId,
    pub is_non_null: bool,
}

impl TypeRef {
    #[must_use]
    pub const fn non_null(meta: MetaId) -> Self {
        Self {
            meta,
            is_non_null: true,
        }
    }

    #[must_use]
    pub const fn nullable(meta: MetaId) -> Self {
        Self {
            meta,
            is_non_null: false,
        }
    }
}

/// A classified type node.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    /// Deduplication key (`identifyingTypeName`).
    pub identity: String,
    /// Schema name. Provisional until the naming pass has run.
    pub name: String,
    /// TypeScript rendering of the type.
    #[serde(rename = "tsTypeName")]
    pub ts_type: String,
    pub kind: MetaKind,
    /// Array nesting depth.
    pub is_list: u32,
    /// Whether the items of each list level are non-null, outermost level first.
    pub item_non_null: Vec<bool>,
    pub is_input: bool,
    /// Element type of a list.
    pub of_type: Option<MetaId>,
    pub fields: Vec<FieldMeta>,
    pub input_fields: Vec<FieldMeta>,
    pub possible_types: Vec<TypeRef>,
    pub enum_values: Vec<EnumValueMeta>,
    pub tuple_elements: Vec<TupleElementMeta>,
    /// The type this one was first reached from. Never an ownership edge.
    pub parent_type: Option<MetaId>,
    pub description: Option<String>,
    /// Name of the declaration behind the type, as the checker prints it.
    pub original_name: Option<String>,
    /// Name requested by an operation's `__typename` export.
    pub forced_name: Option<String>,
    /// Rendering embedded in the description of a custom scalar.
    pub scalar_hint: Option<String>,
    /// Set when a type without a native schema construct was turned into a custom scalar.
    pub degraded: bool,
    /// Own references plus those of every ancestor in the parent chain.
    pub reference_count: usize,
    #[serde(skip)]
    pub named: bool,
}

impl TypeMeta {
    #[must_use]
    pub fn new(
        identity: impl Into<String>,
        name: impl Into<String>,
        ts_type: impl Into<String>,
        kind: MetaKind,
    ) -> Self {
        Self {
            identity: identity.into(),
            name: name.into(),
            ts_type: ts_type.into(),
            kind,
            is_list: 0,
            item_non_null: Vec::new(),
            is_input: false,
            of_type: None,
            fields: Vec::new(),
            input_fields: Vec::new(),
            possible_types: Vec::new(),
            enum_values: Vec::new(),
            tuple_elements: Vec::new(),
            parent_type: None,
            description: None,
            original_name: None,
            forced_name: None,
            scalar_hint: None,
            degraded: false,
            reference_count: 0,
            named: false,
        }
    }

    #[must_use]
    pub fn with_input(mut self, is_input: bool) -> Self {
        self.is_input = is_input;
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: Option<MetaId>) -> Self {
        self.parent_type = parent;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.kind == MetaKind::Scalar
    }

    #[must_use]
    pub fn is_object(&self) -> bool {
        self.kind == MetaKind::Object
    }

    #[must_use]
    pub fn is_union(&self) -> bool {
        self.kind == MetaKind::Union
    }

    #[must_use]
    pub fn is_enum(&self) -> bool {
        self.kind == MetaKind::Enum
    }

    #[must_use]
    pub fn is_tuple(&self) -> bool {
        self.kind == MetaKind::Tuple
    }

    #[must_use]
    pub fn is_list(&self) -> bool {
        self.is_list > 0
    }

    /// A scalar the schema language provides.
    #[must_use]
    pub fn is_builtin_scalar(&self) -> bool {
        self.is_scalar() && !self.degraded && BUILTIN_SCALARS.contains(&self.name.as_str())
    }

    /// True for types that need a declaration of their own.
    #[must_use]
    pub fn is_definition(&self) -> bool {
        !self.is_list() && !self.is_builtin_scalar()
    }

    /// Fields for the position the type is used in.
    #[must_use]
    pub fn active_fields(&self) -> &[FieldMeta] {
        if self.is_input {
            &self.input_fields
        } else {
            &self.fields
        }
    }
}

/// An output field or an input field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMeta {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// Arguments; only fields contributed by type-extension files carry them.
    pub args: Vec<ArgumentMeta>,
}

impl FieldMeta {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            args: Vec::new(),
        }
    }
}

/// An argument of a root field or an extension field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentMeta {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

/// One value of an enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumValueMeta {
    /// Value name in the schema (the runtime value for string members).
    pub name: String,
    /// TypeScript literal source of the value.
    pub literal: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TupleElementMeta {
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

/// Root operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub const ALL: [Self; 3] = [Self::Query, Self::Mutation, Self::Subscription];

    /// Recognizes the export name of an operation function.
    #[must_use]
    pub fn from_export_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "Query",
            Self::Mutation => "Mutation",
            Self::Subscription => "Subscription",
        }
    }

    /// Keyword of the operation in a GraphQL document.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One root field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMeta {
    /// Absolute path of the operation file.
    pub path: PathBuf,
    /// Path relative to the project root.
    pub file: String,
    pub kind: OperationKind,
    /// Root field name.
    pub name: String,
    pub description: Option<String>,
    pub args: Vec<ArgumentMeta>,
    pub result: TypeRef,
    /// Value of the file's `__typename` export.
    pub typename: Option<String>,
}

/// An object type augmented by a type-extension file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedTypeMeta {
    pub name: String,
    pub path: PathBuf,
    pub file: String,
    pub meta: MetaId,
    /// Names of the contributed fields, in export order.
    pub fields: Vec<String>,
    /// TypeScript object shape of the type before extension.
    pub shape: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomScalar {
    pub name: String,
    pub description: Option<String>,
}

/// A problem that made the gatherer skip a file, an operation or a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub file: Option<String>,
    pub path: Option<String>,
    pub message: String,
}

impl Warning {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            file: None,
            path: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    #[must_use]
    pub fn at(mut self, path: &MetaPath) -> Self {
        self.path = Some(path.to_string());
        self
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{file}: ")?;
        }
        if let Some(path) = &self.path {
            write!(f, "{path}: ")?;
        }
        f.write_str(&self.message)
    }
}

/// Location of a type occurrence: `[op, "args", arg, ..]` or `[op, "return", ..]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MetaPath(Vec<String>);

impl MetaPath {
    #[must_use]
    pub fn root(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    /// Extends the path by one segment.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// An `args` segment right after the root marks argument position.
    #[must_use]
    pub fn is_input(&self) -> bool {
        self.0.get(1).is_some_and(|s| s == "args")
    }
}

impl fmt::Display for MetaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Result of gathering a whole project.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaMeta {
    pub metas: Arena<TypeMeta>,
    /// Emission-ready type definitions, in walk order.
    pub types: Vec<MetaId>,
    pub operations: Vec<OperationMeta>,
    pub custom_scalars: Vec<CustomScalar>,
    pub extended_types: Vec<ExtendedTypeMeta>,
    pub warnings: Vec<Warning>,
}

impl SchemaMeta {
    #[must_use]
    pub fn meta(&self, id: MetaId) -> &TypeMeta {
        &self.metas[id]
    }

    /// Follows a reference.
    #[must_use]
    pub fn resolve(&self, ty: TypeRef) -> &TypeMeta {
        &self.metas[ty.meta]
    }

    /// The element type of a list, or the type itself.
    #[must_use]
    pub fn named_type(&self, id: MetaId) -> MetaId {
        let meta = &self.metas[id];
        match meta.of_type {
            Some(element) if meta.is_list() => element,
            _ => id,
        }
    }

    /// Finds an emitted type definition by final name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<MetaId> {
        self.types
            .iter()
            .copied()
            .find(|id| self.metas[*id].name == name)
    }

    pub fn operations_of(&self, kind: OperationKind) -> impl Iterator<Item = &OperationMeta> {
        self.operations.iter().filter(move |op| op.kind == kind)
    }

    #[must_use]
    pub fn has_operations(&self, kind: OperationKind) -> bool {
        self.operations_of(kind).next().is_some()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_input_position() {
        let args = MetaPath::root("userGet").child("args").child("filter");
        assert!(args.is_input());
        assert_eq!(args.to_string(), "userGet.args.filter");

        let nested = MetaPath::root("userGet").child("return").child("args");
        assert!(!nested.is_input());
    }

    #[test]
    fn test_builtin_scalar_is_not_a_definition() {
        let string = TypeMeta::new("scalar:String", "String", "string", MetaKind::Scalar);
        assert!(string.is_builtin_scalar());
        assert!(!string.is_definition());

        let mut date = TypeMeta::new("scalar:Date", "Date", "Date", MetaKind::Scalar);
        assert!(date.is_definition());
        date.is_list = 1;
        assert!(!date.is_definition());
    }

    #[test]
    fn test_operation_kind_names() {
        assert_eq!(
            OperationKind::from_export_name("Subscription"),
            Some(OperationKind::Subscription)
        );
        assert_eq!(OperationKind::from_export_name("query"), None);
        assert_eq!(OperationKind::Mutation.keyword(), "mutation");
    }

    #[test]
    fn test_warning_display() {
        let warning = Warning::new("property has no type")
            .in_file("src/operations/user.ts")
            .at(&MetaPath::root("user").child("return").child("name"));
        assert_eq!(
            warning.to_string(),
            "src/operations/user.ts: user.return.name: property has no type"
        );
    }

    #[test]
    fn test_schema_meta_serializes() {
        let mut schema = SchemaMeta::default();
        let id = schema
            .metas
            .alloc(TypeMeta::new("scalar:String", "String", "string", MetaKind::Scalar));
        schema.types.push(id);
        let json: serde_json::Value = serde_json::from_str(&schema.to_json().unwrap()).unwrap();
        assert_eq!(json["metas"][0]["tsTypeName"], "string");
        assert_eq!(json["metas"][0]["kind"], "scalar");
        assert_eq!(json["types"][0], 0);
        assert!(json["metas"][0].get("named").is_none());
    }
}
