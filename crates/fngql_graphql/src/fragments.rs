//! Declaration fragments for extended types.
//!
//! Each type-extension target gets a `types/<Name>.ts` declaration describing
//! the parent object its field functions receive.

use fngql_collector::SchemaMeta;
use fngql_syntax::{parse_type_string, TypeStringMap};
use indexmap::IndexMap;

/// Renders one declaration per extended type, keyed by type name.
#[must_use]
pub fn render_type_fragments(meta: &SchemaMeta) -> IndexMap<String, String> {
    let mut fragments = IndexMap::new();
    for ext in &meta.extended_types {
        let body = match parse_type_string(&ext.shape, "") {
            Ok(map) => {
                let mut body = String::from("{\n");
                write_members(&map, "", 1, &mut body);
                body.push('}');
                body
            }
            Err(err) => {
                tracing::warn!(r#type = %ext.name, "cannot pretty-print the parent shape: {err}");
                ext.shape.clone()
            }
        };
        fragments.insert(ext.name.clone(), format!("export type {} = {body};\n", ext.name));
    }
    fragments
}

/// Writes the direct members of `prefix`, expanding plain nested objects.
fn write_members(map: &TypeStringMap, prefix: &str, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    for (key, entry) in map {
        let Some(name) = direct_child(key, prefix) else {
            continue;
        };
        let optional = if entry.is_optional { "?" } else { "" };
        let child_prefix = key.clone();
        let has_children = map.keys().any(|k| direct_child(k, &child_prefix).is_some());
        if has_children && !entry.is_array && entry.ty.starts_with('{') && entry.ty.ends_with('}') {
            out.push_str(&format!("{indent}{name}{optional}: {{\n"));
            write_members(map, &child_prefix, depth + 1, out);
            out.push_str(&format!("{indent}}};\n"));
        } else {
            out.push_str(&format!("{indent}{name}{optional}: {};\n", entry.ty));
        }
    }
}

fn direct_child<'k>(key: &'k str, prefix: &str) -> Option<&'k str> {
    let rest = if prefix.is_empty() {
        key
    } else {
        key.strip_prefix(prefix)?.strip_prefix('.')?
    };
    (!rest.contains('.')).then_some(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fngql_collector::{ExtendedTypeMeta, MetaKind, TypeMeta};

    fn with_shape(shape: &str) -> SchemaMeta {
        let mut meta = SchemaMeta::default();
        let user = meta
            .metas
            .alloc(TypeMeta::new("User@m.ts", "User", "User", MetaKind::Object));
        meta.extended_types.push(ExtendedTypeMeta {
            name: "User".to_string(),
            path: "/p/src/types/User.ts".into(),
            file: "src/types/User.ts".to_string(),
            meta: user,
            fields: vec!["posts".to_string()],
            shape: shape.to_string(),
        });
        meta
    }

    #[test]
    fn test_nested_shape() {
        let meta = with_shape("{ id: string; profile: { bio: string; tags?: string[] }; }");
        let fragments = render_type_fragments(&meta);
        insta::assert_snapshot!(fragments["User"], @r###"
        export type User = {
          id: string;
          profile: {
            bio: string;
            tags?: string[];
          };
        };
        "###);
    }

    #[test]
    fn test_unparsable_shape_is_kept() {
        let meta = with_shape("not a shape");
        let fragments = render_type_fragments(&meta);
        assert_eq!(fragments["User"], "export type User = not a shape;\n");
    }
}
