//! TypeScript client SDK emitter.
//!
//! `sdk.ts` declares a TypeScript type per schema type, an arguments type and
//! a typed request builder per operation, and a default selection set per
//! object type. Generated bodies are cached in the [`Collector`].

use crate::naming::pascal_case;
use crate::render::type_ref;
use fngql_collector::{
    Collector, MetaId, MetaKind, OperationKind, OperationMeta, SchemaMeta, TypeMeta, TypeRef,
};
use rustc_hash::FxHashSet;
use std::fmt::Write as _;

const HEADER: &str = "\
/** A GraphQL request ready to be sent to the server. */
export type GraphQLRequest<TVariables, TResult> = {
  query: string;
  variables: TVariables;
  /** Phantom field carrying the result type; always undefined. */
  __result?: TResult;
};
";

/// Nesting depth of generated selection sets.
const MAX_SELECTION_DEPTH: usize = 8;

/// Renders `sdk.ts`.
#[must_use]
pub fn render_sdk(meta: &SchemaMeta, collector: &mut Collector) -> String {
    SdkGenerator::new(meta, collector).generate()
}

struct SdkGenerator<'a> {
    meta: &'a SchemaMeta,
    collector: &'a mut Collector,
    output: String,
}

impl<'a> SdkGenerator<'a> {
    fn new(meta: &'a SchemaMeta, collector: &'a mut Collector) -> Self {
        Self {
            meta,
            collector,
            output: String::new(),
        }
    }

    fn generate(mut self) -> String {
        let meta = self.meta;
        self.output.push_str(HEADER);

        for scalar in &meta.custom_scalars {
            self.output.push('\n');
            if let Some(description) = &scalar.description {
                let _ = writeln!(self.output, "/** {description} */");
            }
            let _ = writeln!(
                self.output,
                "export type {} = {};",
                scalar.name,
                custom_scalar_type(&scalar.name)
            );
        }

        for &id in &meta.types {
            let ty = meta.meta(id);
            match ty.kind {
                MetaKind::Enum if !ty.degraded => self.generate_enum(id, ty),
                MetaKind::Object => self.generate_object(ty),
                MetaKind::Union if !ty.degraded => self.generate_union(ty),
                _ => {}
            }
        }

        for &id in &meta.types {
            let ty = meta.meta(id);
            if ty.is_object() && !ty.is_input {
                self.generate_selection(id, ty);
            }
        }

        for op in &meta.operations {
            self.generate_operation(op);
        }
        self.output
    }

    fn generate_enum(&mut self, id: MetaId, ty: &TypeMeta) {
        let body = match self.collector.enum_body(id) {
            Some(body) => body.to_string(),
            None => {
                let values: Vec<String> = ty
                    .enum_values
                    .iter()
                    .map(|value| format!("\"{}\"", value.name))
                    .collect();
                let body = values.join(" | ");
                self.collector.add_enum_body(id, body.clone());
                body
            }
        };
        self.output.push('\n');
        self.write_doc(ty.description.as_deref(), "");
        let _ = writeln!(self.output, "export type {} = {body};", ty.name);
    }

    fn generate_union(&mut self, ty: &TypeMeta) {
        let meta = self.meta;
        let members: Vec<&str> = ty
            .possible_types
            .iter()
            .map(|member| meta.resolve(*member).name.as_str())
            .collect();
        self.output.push('\n');
        self.write_doc(ty.description.as_deref(), "");
        let _ = writeln!(self.output, "export type {} = {};", ty.name, members.join(" | "));
    }

    fn generate_object(&mut self, ty: &TypeMeta) {
        self.output.push('\n');
        self.write_doc(ty.description.as_deref(), "");
        let _ = writeln!(self.output, "export type {} = {{", ty.name);
        for field in ty.active_fields() {
            self.write_doc(field.description.as_deref(), "  ");
            let converted = self.convert_type(field.ty);
            if field.ty.is_non_null {
                let _ = writeln!(self.output, "  {}: {converted};", field.name);
            } else if ty.is_input {
                let _ = writeln!(self.output, "  {}?: {converted} | null;", field.name);
            } else {
                let _ = writeln!(self.output, "  {}: {converted} | null;", field.name);
            }
        }
        self.output.push_str("};\n");
    }

    fn generate_selection(&mut self, id: MetaId, ty: &TypeMeta) {
        let body = match self.collector.selection_body(id) {
            Some(body) => body.to_string(),
            None => {
                let mut stack = FxHashSet::default();
                let body = self.selection(id, &mut stack, 0);
                self.collector.add_selection_body(id, body.clone());
                body
            }
        };
        self.output.push('\n');
        let _ = writeln!(
            self.output,
            "export const {}Selection = {};",
            ty.name,
            quote(&body)
        );
    }

    /// Selection set of an object or union; fields with required arguments are left out.
    fn selection(&self, id: MetaId, stack: &mut FxHashSet<MetaId>, depth: usize) -> String {
        let ty = self.meta.meta(id);
        if !stack.insert(id) || depth > MAX_SELECTION_DEPTH {
            return "__typename".to_string();
        }

        let mut parts = Vec::new();
        if ty.is_union() && !ty.degraded {
            parts.push("__typename".to_string());
            for member in &ty.possible_types {
                let name = &self.meta.resolve(*member).name;
                let inner = self.selection(member.meta, stack, depth + 1);
                parts.push(format!("... on {name} {{ {inner} }}"));
            }
        } else {
            for field in ty.active_fields() {
                if field.args.iter().any(|arg| arg.ty.is_non_null) {
                    continue;
                }
                let target = self.meta.named_type(field.ty.meta);
                if needs_selection(self.meta.meta(target)) {
                    if stack.contains(&target) {
                        continue;
                    }
                    let inner = self.selection(target, stack, depth + 1);
                    parts.push(format!("{} {{ {inner} }}", field.name));
                } else {
                    parts.push(field.name.clone());
                }
            }
        }
        stack.remove(&id);

        if parts.is_empty() {
            "__typename".to_string()
        } else {
            parts.join(" ")
        }
    }

    fn generate_operation(&mut self, op: &OperationMeta) {
        let base = format!("{}{}", pascal_case(&op.name), op.kind);
        let args_type = format!("{base}Args");
        let result_type = format!("{base}Result");
        let key = format!("{}.{}", op.kind, op.name);

        let args_body = match self.collector.argument_body(&key) {
            Some(body) => body.to_string(),
            None => {
                let body = self.arguments_body(op);
                self.collector.add_argument_body(&key, body.clone());
                body
            }
        };

        let variables: Vec<String> = op
            .args
            .iter()
            .map(|arg| format!("${}: {}", arg.name, type_ref(self.meta, arg.ty)))
            .collect();
        let passed: Vec<String> = op
            .args
            .iter()
            .map(|arg| format!("{0}: ${0}", arg.name))
            .collect();
        let mut document = op.kind.keyword().to_string();
        let _ = write!(document, " {}", op.name);
        if !variables.is_empty() {
            let _ = write!(document, "({})", variables.join(", "));
        }
        let _ = write!(document, " {{ {}", op.name);
        if !passed.is_empty() {
            let _ = write!(document, "({})", passed.join(", "));
        }
        let target = self.meta.named_type(op.result.meta);
        if needs_selection(self.meta.meta(target)) {
            let inner = self.selection(target, &mut FxHashSet::default(), 0);
            let _ = write!(document, " {{ {inner} }}");
        }
        document.push_str(" }");

        let mut result = self.convert_type(op.result);
        if !op.result.is_non_null {
            result.push_str(" | null");
        }
        self.output.push('\n');
        let _ = writeln!(self.output, "export type {args_type} = {args_body};");
        let _ = writeln!(self.output, "export type {result_type} = {{ {}: {result} }};", op.name);
        self.write_doc(op.description.as_deref(), "");
        let _ = writeln!(
            self.output,
            "export function {name}(variables: {args_type}): GraphQLRequest<{args_type}, {result_type}> {{\n  \
             return {{ query: {query}, variables }};\n}}",
            name = function_name(op),
            query = quote(&document),
        );
    }

    fn arguments_body(&self, op: &OperationMeta) -> String {
        if op.args.is_empty() {
            return "Record<string, never>".to_string();
        }
        let mut body = String::from("{ ");
        for arg in &op.args {
            let converted = self.convert_type(arg.ty);
            if arg.ty.is_non_null {
                let _ = write!(body, "{}: {converted}; ", arg.name);
            } else {
                let _ = write!(body, "{}?: {converted} | null; ", arg.name);
            }
        }
        body.push('}');
        body
    }

    /// TypeScript type of a reference without its outer nullability.
    fn convert_type(&self, ty: TypeRef) -> String {
        let target = self.meta.resolve(ty);
        if !target.is_list() {
            return convert_scalar(&target.name).map_or_else(|| target.name.clone(), str::to_string);
        }
        let element = self.meta.meta(self.meta.named_type(ty.meta));
        let mut out =
            convert_scalar(&element.name).map_or_else(|| element.name.clone(), str::to_string);
        for &non_null in target.item_non_null.iter().rev() {
            if !non_null {
                out = format!("({out} | null)");
            }
            out.push_str("[]");
        }
        out
    }

    fn write_doc(&mut self, doc: Option<&str>, indent: &str) {
        let Some(doc) = doc else {
            return;
        };
        if doc.contains('\n') {
            let _ = writeln!(self.output, "{indent}/**");
            for line in doc.lines() {
                let _ = writeln!(self.output, "{indent} * {line}");
            }
            let _ = writeln!(self.output, "{indent} */");
        } else {
            let _ = writeln!(self.output, "{indent}/** {doc} */");
        }
    }
}

fn needs_selection(ty: &TypeMeta) -> bool {
    !ty.degraded && (ty.is_object() || ty.is_union())
}

fn function_name(op: &OperationMeta) -> String {
    match op.kind {
        OperationKind::Query => op.name.clone(),
        kind => format!("{}{}", kind.keyword(), pascal_case(&op.name)),
    }
}

/// TypeScript spelling of built-in scalars.
fn convert_scalar(name: &str) -> Option<&'static str> {
    match name {
        "String" | "ID" => Some("string"),
        "Int" | "Float" => Some("number"),
        "Boolean" => Some("boolean"),
        _ => None,
    }
}

/// TypeScript type used on the wire for a custom scalar.
fn custom_scalar_type(name: &str) -> &'static str {
    match name {
        "Date" | "BigInt" => "string",
        "Void" => "null",
        _ => "unknown",
    }
}

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{text}\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fngql_collector::{ArgumentMeta, CustomScalar, EnumValueMeta, FieldMeta};

    fn schema() -> SchemaMeta {
        let mut meta = SchemaMeta::default();
        let string = meta
            .metas
            .alloc(TypeMeta::new("scalar:String", "String", "string", MetaKind::Scalar));
        let date = meta
            .metas
            .alloc(TypeMeta::new("scalar:Date", "Date", "Date", MetaKind::Scalar));
        meta.custom_scalars.push(CustomScalar {
            name: "Date".to_string(),
            description: Some("tsType: Date".to_string()),
        });

        let mut role = TypeMeta::new("Role@m.ts", "Role", "Role", MetaKind::Enum);
        role.enum_values = ["ADMIN", "VIEWER"]
            .into_iter()
            .map(|v| EnumValueMeta {
                name: v.to_string(),
                literal: format!("\"{v}\""),
                description: None,
            })
            .collect();
        let role = meta.metas.alloc(role);

        let user = meta
            .metas
            .alloc(TypeMeta::new("User@m.ts", "User", "User", MetaKind::Object));
        let mut tags = TypeMeta::new("[][!]scalar:String", "[[String]]", "string[][]", MetaKind::Scalar);
        tags.is_list = 2;
        tags.item_non_null = vec![false, true];
        tags.of_type = Some(string);
        let tags = meta.metas.alloc(tags);
        let mut friends = TypeMeta::new("[!]User@m.ts", "[User]", "User[]", MetaKind::Object);
        friends.is_list = 1;
        friends.item_non_null = vec![true];
        friends.of_type = Some(user);
        let friends = meta.metas.alloc(friends);

        let mut feed = FieldMeta::new("feed", TypeRef::non_null(friends));
        feed.args.push(ArgumentMeta {
            name: "first".to_string(),
            description: None,
            ty: TypeRef::non_null(string),
        });
        meta.metas[user].fields = vec![
            FieldMeta::new("id", TypeRef::non_null(string)),
            FieldMeta::new("role", TypeRef::nullable(role)),
            FieldMeta::new("joined", TypeRef::non_null(date)),
            FieldMeta::new("tags", TypeRef::non_null(tags)),
            FieldMeta::new("friends", TypeRef::non_null(friends)),
            feed,
        ];
        meta.types = vec![role, user];

        meta.operations.push(OperationMeta {
            path: "/p/src/operations/user/get.ts".into(),
            file: "src/operations/user/get.ts".to_string(),
            kind: OperationKind::Query,
            name: "userGet".to_string(),
            description: Some("Fetches a user.".to_string()),
            args: vec![ArgumentMeta {
                name: "id".to_string(),
                description: None,
                ty: TypeRef::non_null(string),
            }],
            result: TypeRef::nullable(user),
            typename: None,
        });
        meta
    }

    #[test]
    fn test_types() {
        let mut collector = Collector::new();
        let sdk = render_sdk(&schema(), &mut collector);
        assert!(sdk.starts_with("/** A GraphQL request"));
        assert!(sdk.contains("/** tsType: Date */\nexport type Date = string;\n"));
        assert!(sdk.contains("export type Role = \"ADMIN\" | \"VIEWER\";\n"));
        assert!(sdk.contains(
            "export type User = {\n  id: string;\n  role: Role | null;\n  joined: Date;\n  \
             tags: (string[] | null)[];\n  friends: User[];\n  feed: User[];\n};\n"
        ));
    }

    #[test]
    fn test_selection_skips_cycles_and_required_args() {
        let mut collector = Collector::new();
        let meta = schema();
        let sdk = render_sdk(&meta, &mut collector);
        assert!(sdk.contains("export const UserSelection = \"id role joined tags\";\n"));
        assert_eq!(collector.selection_body(meta.types[1]), Some("id role joined tags"));
    }

    #[test]
    fn test_request_builder() {
        let mut collector = Collector::new();
        let sdk = render_sdk(&schema(), &mut collector);
        assert!(sdk.contains("export type UserGetQueryArgs = { id: string; };\n"));
        assert!(sdk.contains("export type UserGetQueryResult = { userGet: User | null };\n"));
        assert!(sdk.contains(
            "/** Fetches a user. */\n\
             export function userGet(variables: UserGetQueryArgs): GraphQLRequest<UserGetQueryArgs, UserGetQueryResult> {\n  \
             return { query: \"query userGet($id: String!) { userGet(id: $id) { id role joined tags } }\", variables };\n}"
        ));
        assert_eq!(
            collector.argument_body("Query.userGet"),
            Some("{ id: string; }")
        );
    }
}
