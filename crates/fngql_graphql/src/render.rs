//! Schema renderer.
//!
//! Renders a [`SchemaMeta`] as GraphQL SDL. Definitions are emitted per
//! category in collection order: custom scalars, enums, inputs, unions,
//! objects, then the root operation types that have at least one field.

use crate::error::{GenerateError, StructureError};
use fngql_collector::{
    ArgumentMeta, FieldMeta, MetaKind, OperationKind, SchemaMeta, TypeMeta, TypeRef,
    BUILTIN_SCALARS,
};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;

/// Renders the schema and validates it.
///
/// A schema that fails validation is returned inside
/// [`GenerateError::InvalidSchema`] together with the problems found.
pub fn render_schema(meta: &SchemaMeta) -> Result<String, GenerateError> {
    let mut renderer = SchemaRenderer::new(meta);
    let schema = renderer.render()?;
    let problems = validate(meta, &renderer.definitions);
    if problems.is_empty() {
        Ok(schema)
    } else {
        Err(GenerateError::InvalidSchema { schema, problems })
    }
}

/// SDL of a type reference, e.g. `[[String!]]!`.
#[must_use]
pub fn type_ref(meta: &SchemaMeta, ty: TypeRef) -> String {
    let target = meta.resolve(ty);
    let mut out = if target.is_list() {
        let element = target.of_type.map_or(target, |id| meta.meta(id));
        let mut out = element.name.clone();
        for &non_null in target.item_non_null.iter().rev() {
            if non_null {
                out.push('!');
            }
            out = format!("[{out}]");
        }
        out
    } else {
        target.name.clone()
    };
    if ty.is_non_null {
        out.push('!');
    }
    out
}

/// A rendered definition and what it references.
#[derive(Debug)]
struct Definition {
    kind: MetaKind,
    fields: Vec<String>,
    references: Vec<String>,
    members: Vec<String>,
}

struct SchemaRenderer<'a> {
    meta: &'a SchemaMeta,
    output: String,
    indent: usize,
    /// Final name to rendered text.
    rendered: IndexMap<String, String>,
    definitions: IndexMap<String, Definition>,
}

impl<'a> SchemaRenderer<'a> {
    fn new(meta: &'a SchemaMeta) -> Self {
        Self {
            meta,
            output: String::new(),
            indent: 0,
            rendered: IndexMap::new(),
            definitions: IndexMap::new(),
        }
    }

    fn render(&mut self) -> Result<String, StructureError> {
        let meta = self.meta;
        let types: Vec<&TypeMeta> = meta.types.iter().map(|id| meta.meta(*id)).collect();

        for scalar in &meta.custom_scalars {
            self.begin();
            if let Some(description) = &scalar.description {
                self.format_block_description(description);
            }
            self.output.push_str("scalar ");
            self.output.push_str(&scalar.name);
            self.finish(&scalar.name, MetaKind::Scalar, Vec::new(), Vec::new(), Vec::new())?;
        }
        for ty in types.iter().filter(|t| t.is_enum() && !t.degraded) {
            self.format_enum(ty)?;
        }
        for ty in types.iter().filter(|t| t.is_object() && t.is_input) {
            self.format_object(ty, "input")?;
        }
        for ty in types.iter().filter(|t| t.is_union() && !t.degraded) {
            self.format_union(ty)?;
        }
        for ty in types.iter().filter(|t| t.is_object() && !t.is_input) {
            self.format_object(ty, "type")?;
        }
        for kind in OperationKind::ALL {
            if meta.has_operations(kind) {
                self.format_root(kind)?;
            }
        }

        let mut schema = self
            .rendered
            .values()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n\n");
        if !schema.is_empty() {
            schema.push('\n');
        }
        Ok(schema)
    }

    fn begin(&mut self) {
        self.output.clear();
        self.indent = 0;
    }

    /// Stores the current output under `name`, keeping the first of identical renderings.
    fn finish(
        &mut self,
        name: &str,
        kind: MetaKind,
        fields: Vec<String>,
        references: Vec<String>,
        members: Vec<String>,
    ) -> Result<(), StructureError> {
        let text = std::mem::take(&mut self.output);
        match self.rendered.get(name) {
            Some(existing) if *existing == text => Ok(()),
            Some(_) => Err(StructureError::ConflictingDefinition {
                name: name.to_string(),
            }),
            None => {
                self.rendered.insert(name.to_string(), text);
                self.definitions.insert(
                    name.to_string(),
                    Definition {
                        kind,
                        fields,
                        references,
                        members,
                    },
                );
                Ok(())
            }
        }
    }

    fn format_enum(&mut self, ty: &TypeMeta) -> Result<(), StructureError> {
        self.begin();
        if let Some(description) = &ty.description {
            self.format_description(description);
        }
        self.output.push_str("enum ");
        self.output.push_str(&ty.name);
        self.output.push_str(" {\n");
        self.indent += 1;
        let mut values = Vec::new();
        for value in &ty.enum_values {
            if let Some(description) = &value.description {
                self.push_indent();
                self.format_description(description);
            }
            self.push_indent();
            self.output.push_str(&value.name);
            self.output.push('\n');
            values.push(value.name.clone());
        }
        self.indent -= 1;
        self.output.push('}');
        self.finish(&ty.name, MetaKind::Enum, values, Vec::new(), Vec::new())
    }

    fn format_union(&mut self, ty: &TypeMeta) -> Result<(), StructureError> {
        self.begin();
        if let Some(description) = &ty.description {
            self.format_description(description);
        }
        self.output.push_str("union ");
        self.output.push_str(&ty.name);
        self.output.push_str(" = ");
        let members: Vec<String> = ty
            .possible_types
            .iter()
            .map(|member| self.meta.resolve(*member).name.clone())
            .collect();
        self.output.push_str(&members.join(" | "));
        self.finish(&ty.name, MetaKind::Union, Vec::new(), Vec::new(), members)
    }

    fn format_object(&mut self, ty: &TypeMeta, keyword: &str) -> Result<(), StructureError> {
        self.begin();
        if let Some(description) = &ty.description {
            self.format_description(description);
        }
        self.output.push_str(keyword);
        self.output.push(' ');
        self.output.push_str(&ty.name);
        self.output.push_str(" {\n");
        self.indent += 1;
        let (fields, references) = self.format_fields(ty.active_fields());
        self.indent -= 1;
        self.output.push('}');
        self.finish(&ty.name, MetaKind::Object, fields, references, Vec::new())
    }

    fn format_root(&mut self, kind: OperationKind) -> Result<(), StructureError> {
        let fields: Vec<FieldMeta> = self
            .meta
            .operations_of(kind)
            .map(|op| FieldMeta {
                name: op.name.clone(),
                description: op.description.clone(),
                ty: op.result,
                args: op.args.clone(),
            })
            .collect();

        self.begin();
        self.output.push_str("type ");
        self.output.push_str(kind.as_str());
        self.output.push_str(" {\n");
        self.indent += 1;
        let (names, references) = self.format_fields(&fields);
        self.indent -= 1;
        self.output.push('}');
        self.finish(kind.as_str(), MetaKind::Object, names, references, Vec::new())
    }

    /// Returns the field names and the type names they reference.
    fn format_fields(&mut self, fields: &[FieldMeta]) -> (Vec<String>, Vec<String>) {
        let mut names = Vec::new();
        let mut references = Vec::new();
        for field in fields {
            if let Some(description) = &field.description {
                self.push_indent();
                self.format_description(description);
            }
            self.push_indent();
            self.output.push_str(&field.name);
            if !field.args.is_empty() {
                self.format_arguments(&field.args, &mut references);
            }
            self.output.push_str(": ");
            self.output.push_str(&type_ref(self.meta, field.ty));
            self.output.push('\n');
            names.push(field.name.clone());
            references.push(self.named(field.ty));
        }
        (names, references)
    }

    fn format_arguments(&mut self, args: &[ArgumentMeta], references: &mut Vec<String>) {
        self.output.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            if let Some(description) = &arg.description {
                self.format_block_description(description);
                self.output.push(' ');
            }
            self.output.push_str(&arg.name);
            self.output.push_str(": ");
            self.output.push_str(&type_ref(self.meta, arg.ty));
            references.push(self.named(arg.ty));
        }
        self.output.push(')');
    }

    fn named(&self, ty: TypeRef) -> String {
        let id = self.meta.named_type(ty.meta);
        self.meta.meta(id).name.clone()
    }

    fn format_description(&mut self, description: &str) {
        if description.contains('\n') || description.contains('"') {
            self.output.push_str("\"\"\"\n");
            for line in description.lines() {
                self.push_indent();
                self.output.push_str(&line.replace("\"\"\"", "\\\"\"\""));
                self.output.push('\n');
            }
            self.push_indent();
            self.output.push_str("\"\"\"\n");
        } else {
            self.output.push('"');
            self.output.push_str(&escape_string(description));
            self.output.push_str("\"\n");
        }
    }

    fn format_block_description(&mut self, description: &str) {
        self.output.push_str("\"\"\"");
        self.output.push_str(&description.replace("\"\"\"", "\\\"\"\""));
        self.output.push_str("\"\"\"");
        if self.indent == 0 {
            self.output.push('\n');
        }
    }

    fn push_indent(&mut self) {
        for _ in 0..self.indent * 2 {
            self.output.push(' ');
        }
    }
}

/// Escapes text for a single-line GraphQL string.
fn escape_string(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\t' => escaped.push_str("\\t"),
            '\r' => escaped.push_str("\\r"),
            c if c.is_control() => escaped.push_str(&format!("\\u{:04X}", u32::from(c))),
            c => escaped.push(c),
        }
    }
    escaped
}

fn validate(meta: &SchemaMeta, definitions: &IndexMap<String, Definition>) -> Vec<String> {
    let mut problems = Vec::new();
    if !definitions.contains_key(OperationKind::Query.as_str()) {
        problems.push("the schema has no `Query` operation".to_string());
    }

    for (name, definition) in definitions {
        let mut seen = FxHashSet::default();
        for field in &definition.fields {
            if !seen.insert(field.as_str()) {
                problems.push(format!("`{name}` declares `{field}` more than once"));
            }
        }
        for referenced in &definition.references {
            if !BUILTIN_SCALARS.contains(&referenced.as_str()) && !definitions.contains_key(referenced) {
                problems.push(format!("`{name}` references undefined type `{referenced}`"));
            }
        }
        match definition.kind {
            MetaKind::Object | MetaKind::Enum if definition.fields.is_empty() => {
                problems.push(format!("`{name}` has no fields"));
            }
            MetaKind::Union if definition.members.is_empty() => {
                problems.push(format!("union `{name}` has no members"));
            }
            MetaKind::Union => {
                for member in &definition.members {
                    let is_object = definitions
                        .get(member)
                        .is_some_and(|d| d.kind == MetaKind::Object);
                    if !is_object {
                        problems.push(format!("union `{name}` member `{member}` is not an object type"));
                    }
                }
            }
            _ => {}
        }
    }

    for extended in &meta.extended_types {
        if !definitions.contains_key(&extended.name) {
            problems.push(format!("extended type `{}` is not emitted", extended.name));
        }
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use fngql_collector::{CustomScalar, EnumValueMeta, OperationMeta};

    fn scalar(meta: &mut SchemaMeta, name: &str) -> TypeRef {
        let id = meta.metas.alloc(TypeMeta::new(
            format!("scalar:{name}"),
            name,
            name.to_lowercase(),
            MetaKind::Scalar,
        ));
        TypeRef::non_null(id)
    }

    fn operation(name: &str, kind: OperationKind, result: TypeRef, args: Vec<ArgumentMeta>) -> OperationMeta {
        OperationMeta {
            path: format!("/p/src/operations/{name}.ts").into(),
            file: format!("src/operations/{name}.ts"),
            kind,
            name: name.to_string(),
            description: None,
            args,
            result,
            typename: None,
        }
    }

    fn user_schema() -> SchemaMeta {
        let mut meta = SchemaMeta::default();
        let string = scalar(&mut meta, "String");
        let mut user = TypeMeta::new("User@src/user.ts", "User", "User", MetaKind::Object)
            .with_description(Some("A registered user.".to_string()));
        user.fields = vec![
            FieldMeta::new("id", string),
            FieldMeta::new("nickname", TypeRef::nullable(string.meta)),
        ];
        let user = meta.metas.alloc(user);
        meta.types.push(user);

        let mut role = TypeMeta::new("Role@src/user.ts", "Role", "Role", MetaKind::Enum);
        role.enum_values = ["ADMIN", "VIEWER"]
            .into_iter()
            .map(|v| EnumValueMeta {
                name: v.to_string(),
                literal: format!("\"{v}\""),
                description: None,
            })
            .collect();
        let role = meta.metas.alloc(role);
        meta.types.push(role);

        let arg = ArgumentMeta {
            name: "id".to_string(),
            description: None,
            ty: string,
        };
        meta.operations
            .push(operation("userGet", OperationKind::Query, TypeRef::nullable(user), vec![arg]));
        let role_arg = ArgumentMeta {
            name: "role".to_string(),
            description: None,
            ty: TypeRef::non_null(role),
        };
        meta.operations.push(operation(
            "userSetRole",
            OperationKind::Mutation,
            TypeRef::non_null(role),
            vec![role_arg],
        ));
        meta
    }

    #[test]
    fn test_render_schema() {
        let schema = render_schema(&user_schema()).unwrap();
        insta::assert_snapshot!(schema, @r###"
        enum Role {
          ADMIN
          VIEWER
        }

        "A registered user."
        type User {
          id: String!
          nickname: String
        }

        type Query {
          userGet(id: String!): User
        }

        type Mutation {
          userSetRole(role: Role!): Role!
        }
        "###);
    }

    #[test]
    fn test_list_type_ref() {
        let mut meta = SchemaMeta::default();
        let string = scalar(&mut meta, "String");
        let mut list = TypeMeta::new("[!][][!]scalar:String", "[[[String]]]", "string[][][]", MetaKind::Scalar);
        list.is_list = 3;
        list.item_non_null = vec![true, false, true];
        list.of_type = Some(string.meta);
        let list = meta.metas.alloc(list);
        assert_eq!(type_ref(&meta, TypeRef::non_null(list)), "[[[String!]]!]!");
        assert_eq!(type_ref(&meta, TypeRef::nullable(list)), "[[[String!]]!]");
    }

    #[test]
    fn test_custom_scalar_hint() {
        let mut meta = user_schema();
        let id = meta.metas.alloc(
            TypeMeta::new("scalar:Date", "Date", "Date", MetaKind::Scalar),
        );
        meta.metas[id].scalar_hint = Some("Date".to_string());
        meta.custom_scalars.push(CustomScalar {
            name: "Date".to_string(),
            description: Some("tsType: Date".to_string()),
        });
        let schema = render_schema(&meta).unwrap();
        assert!(schema.starts_with("\"\"\"tsType: Date\"\"\"\nscalar Date\n\n"));
    }

    #[test]
    fn test_description_escapes() {
        let mut meta = user_schema();
        let user = meta.types[0];
        meta.metas[user].description = Some("Stored under C:\\users\tby id.".to_string());
        let schema = render_schema(&meta).unwrap();
        assert!(schema.contains("\"Stored under C:\\\\users\\tby id.\"\ntype User {"));

        meta.metas[user].description = Some("Says \"hi\" from C:\\dir".to_string());
        let schema = render_schema(&meta).unwrap();
        assert!(schema.contains("\"\"\"\nSays \"hi\" from C:\\dir\n\"\"\"\ntype User {"));
    }

    #[test]
    fn test_missing_query_is_invalid() {
        let mut meta = user_schema();
        meta.operations.retain(|op| op.kind != OperationKind::Query);
        let err = render_schema(&meta).unwrap_err();
        let GenerateError::InvalidSchema { schema, problems } = err else {
            panic!("expected an invalid schema");
        };
        assert!(schema.contains("type Mutation"));
        assert_eq!(problems, ["the schema has no `Query` operation"]);
    }

    #[test]
    fn test_undefined_reference_is_invalid() {
        let mut meta = user_schema();
        let ghost = meta
            .metas
            .alloc(TypeMeta::new("Ghost@x.ts", "Ghost", "Ghost", MetaKind::Object));
        let user = meta.types[0];
        meta.metas[user].fields.push(FieldMeta::new("ghost", TypeRef::non_null(ghost)));
        let err = render_schema(&meta).unwrap_err();
        assert!(err.to_string().contains("`User` references undefined type `Ghost`"));
    }

    #[test]
    fn test_same_name_different_text_conflicts() {
        let mut meta = user_schema();
        let string = TypeRef::non_null(meta.meta(meta.types[0]).fields[0].ty.meta);
        let mut other = TypeMeta::new("User@src/other.ts", "User", "User", MetaKind::Object);
        other.fields = vec![FieldMeta::new("email", string)];
        let other = meta.metas.alloc(other);
        meta.types.push(other);
        let err = render_schema(&meta).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Structure(StructureError::ConflictingDefinition { name }) if name == "User"
        ));
    }
}
