//! Resolver entrypoint emitter.
//!
//! Emits `resolvers.ts`, which imports every operation function and every
//! type-extension module and wraps each with the runtime adapters. Nothing
//! here runs a resolver; the output is wiring source only.

use fngql_collector::{OperationKind, SchemaMeta};
use std::fmt::Write as _;
use std::path::{Component, Path};

/// Renders the resolver entrypoint for files written to `output_dir`.
#[must_use]
pub fn render_resolvers(meta: &SchemaMeta, output_dir: &Path, runtime_module: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "import {{ makeGraphQLFieldResolver, makeGraphQLResolverFn }} from \"{runtime_module}\";"
    );
    for op in &meta.operations {
        let _ = writeln!(
            out,
            "import {{ {kind} as {alias} }} from \"{module}\";",
            kind = op.kind,
            alias = import_alias(op.kind, &op.name),
            module = relative_import(output_dir, &op.path),
        );
    }
    for ext in &meta.extended_types {
        let _ = writeln!(
            out,
            "import * as {}_fields from \"{}\";",
            ext.name,
            relative_import(output_dir, &ext.path)
        );
    }

    out.push_str("\nexport const resolvers = {\n");
    for kind in OperationKind::ALL {
        if !meta.has_operations(kind) {
            continue;
        }
        let _ = writeln!(out, "  {kind}: {{");
        for op in meta.operations_of(kind) {
            let wrapped = format!(
                "makeGraphQLResolverFn({}, {})",
                import_alias(kind, &op.name),
                name_list(op.args.iter().map(|a| a.name.as_str()))
            );
            if kind == OperationKind::Subscription {
                let _ = writeln!(
                    out,
                    "    {}: {{ subscribe: {wrapped}, resolve: (payload: unknown) => payload }},",
                    op.name
                );
            } else {
                let _ = writeln!(out, "    {}: {wrapped},", op.name);
            }
        }
        out.push_str("  },\n");
    }
    for ext in &meta.extended_types {
        let target = meta.meta(ext.meta);
        let _ = writeln!(out, "  {}: {{", target.name);
        for field_name in &ext.fields {
            let args = target
                .fields
                .iter()
                .find(|f| &f.name == field_name)
                .map(|f| f.args.iter().map(|a| a.name.as_str()).collect::<Vec<_>>())
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "    {field_name}: makeGraphQLFieldResolver({}_fields.{field_name}, {}),",
                ext.name,
                name_list(args.into_iter())
            );
        }
        out.push_str("  },\n");
    }
    out.push_str("};\n");
    out
}

fn import_alias(kind: OperationKind, name: &str) -> String {
    format!("{kind}_{name}")
}

fn name_list<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let quoted: Vec<String> = names.map(|n| format!("\"{n}\"")).collect();
    format!("[{}]", quoted.join(", "))
}

/// Module specifier of `target` relative to `from_dir`, without extension.
#[must_use]
pub fn relative_import(from_dir: &Path, target: &Path) -> String {
    let from: Vec<Component<'_>> = from_dir.components().collect();
    let stripped = target.with_extension("");
    let to: Vec<Component<'_>> = stripped.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut segments: Vec<String> = vec!["..".to_string(); from.len() - common];
    segments.extend(
        to[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    let joined = segments.join("/");
    if joined.starts_with("..") {
        joined
    } else {
        format!("./{joined}")
    }
}
