//! Schema names for collected types.
//!
//! Names are assigned once per identity in registration order, so the first
//! occurrence of a name keeps it and later identities get a numeric suffix.

use fngql_collector::{Collector, MetaId, TypeMeta, RESERVED_NAMES};
use fngql_core::Arena;
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Component, Path};

/// Assigns final names to collected types.
#[derive(Debug, Default)]
pub struct Namer {
    /// Provisional or declared name to final name, first occurrence wins.
    renames: IndexMap<String, String>,
    taken: FxHashMap<String, MetaId>,
    in_progress: FxHashSet<MetaId>,
}

impl Namer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The rename memo.
    #[must_use]
    pub fn renames(&self) -> &IndexMap<String, String> {
        &self.renames
    }

    /// Names every meta in `order` that has no final name yet.
    pub fn assign_all(&mut self, metas: &mut Arena<TypeMeta>, order: &[MetaId]) {
        for &id in order {
            self.assign(metas, id);
        }
    }

    /// Names one meta, naming the metas its name is derived from first.
    pub fn assign(&mut self, metas: &mut Arena<TypeMeta>, id: MetaId) -> String {
        if metas[id].named || !self.in_progress.insert(id) {
            return metas[id].name.clone();
        }

        let base = if metas[id].is_list() {
            let depth = metas[id].is_list as usize;
            let inner = match metas[id].of_type {
                Some(element) => self.assign(metas, element),
                None => metas[id].name.clone(),
            };
            format!("{}{inner}{}", "[".repeat(depth), "]".repeat(depth))
        } else if metas[id].is_builtin_scalar() || metas[id].identity.starts_with("scalar:") {
            metas[id].name.clone()
        } else {
            self.base_name(metas, id)
        };

        let name = if metas[id].is_definition() {
            self.unique(&base, id)
        } else {
            base
        };

        let meta = &mut metas[id];
        let original = meta
            .original_name
            .clone()
            .unwrap_or_else(|| meta.name.clone());
        self.renames.entry(original).or_insert_with(|| name.clone());
        meta.name.clone_from(&name);
        meta.named = true;
        self.in_progress.remove(&id);
        name
    }

    fn base_name(&mut self, metas: &mut Arena<TypeMeta>, id: MetaId) -> String {
        let meta = &metas[id];
        let base = if let Some(forced) = &meta.forced_name {
            return protocol_friendly(forced);
        } else if meta.original_name.is_none()
            && meta.is_enum()
            && meta.enum_values.len() == 1
        {
            format!("Constant_{}", protocol_friendly(&meta.enum_values[0].name))
        } else if meta.original_name.is_none() && !meta.possible_types.is_empty() {
            let members: Vec<MetaId> = meta.possible_types.iter().map(|m| m.meta).collect();
            let names: Vec<String> = members
                .into_iter()
                .map(|member| self.assign(metas, member))
                .collect();
            protocol_friendly(&names.join("Or"))
        } else if let Some(original) = &meta.original_name {
            protocol_friendly(original)
        } else {
            protocol_friendly(&meta.name)
        };

        let meta = &metas[id];
        if meta.is_input && !meta.is_enum() && !meta.is_scalar() && !base.ends_with("Input") {
            format!("{base}Input")
        } else {
            base
        }
    }

    fn unique(&mut self, base: &str, id: MetaId) -> String {
        let base = if base.is_empty() { "Type" } else { base };
        let mut candidate = base.to_string();
        let mut suffix = 2;
        loop {
            let reserved = RESERVED_NAMES.contains(&candidate.as_str());
            match self.taken.get(&candidate) {
                Some(&owner) if owner == id => return candidate,
                None if !reserved => {
                    self.taken.insert(candidate.clone(), id);
                    return candidate;
                }
                _ => {}
            }
            candidate = format!("{base}{suffix}");
            suffix += 1;
        }
    }

    /// Rewrites declared names embedded in scalar hints to their final names.
    pub fn substitute_hints(&self, metas: &mut Arena<TypeMeta>) {
        let ids: Vec<MetaId> = metas
            .iter()
            .filter(|(_, meta)| meta.scalar_hint.is_some())
            .map(|(id, _)| id)
            .collect();
        for id in ids {
            if let Some(hint) = &metas[id].scalar_hint {
                let rewritten = substitute_names(hint, &self.renames);
                metas[id].scalar_hint = Some(rewritten);
            }
        }
    }
}

/// Stores on every meta its own reference count plus those of its ancestors.
pub fn count_references(metas: &mut Arena<TypeMeta>, collector: &Collector) {
    let own: Vec<usize> = metas
        .iter()
        .map(|(_, meta)| collector.type_reference(&meta.identity).map_or(0, <[_]>::len))
        .collect();
    let ids: Vec<MetaId> = metas.iter().map(|(id, _)| id).collect();

    for id in ids {
        let mut total = own[id.index()];
        let mut seen = FxHashSet::default();
        seen.insert(id);
        let mut current = metas[id].parent_type;
        while let Some(parent) = current {
            if !seen.insert(parent) {
                break;
            }
            total += own[parent.index()];
            current = metas[parent].parent_type;
        }
        metas[id].reference_count = total;
    }
}

/// Replaces whole-word occurrences of renamed names, longest name first.
#[must_use]
pub fn substitute_names(text: &str, renames: &IndexMap<String, String>) -> String {
    let mut pairs: Vec<(&str, &str)> = renames
        .iter()
        .filter(|(from, to)| !from.is_empty() && from != to)
        .map(|(from, to)| (from.as_str(), to.as_str()))
        .collect();
    if pairs.is_empty() {
        return text.to_string();
    }
    pairs.sort_by_key(|(from, _)| std::cmp::Reverse(from.len()));

    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    'scan: while i < text.len() {
        if i == 0 || !is_ident_byte(bytes[i - 1]) {
            for (from, to) in &pairs {
                if text[i..].starts_with(from) {
                    let end = i + from.len();
                    if end == text.len() || !is_ident_byte(bytes[end]) {
                        out.push_str(to);
                        i = end;
                        continue 'scan;
                    }
                }
            }
        }
        let Some(c) = text[i..].chars().next() else {
            break;
        };
        out.push(c);
        i += c.len_utf8();
    }
    out
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Makes a type name legal in GraphQL.
///
/// Disallowed characters become `_`, runs of `_` collapse, and the
/// underscores a rewrite leaves at either end are dropped.
#[must_use]
pub fn protocol_friendly(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    let keep_leading = name.starts_with('_');
    let trimmed = out.trim_end_matches('_');
    let trimmed = if keep_leading {
        trimmed
    } else {
        trimmed.trim_start_matches('_')
    };
    if trimmed.is_empty() {
        return "Type".to_string();
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{trimmed}")
    } else {
        trimmed.to_string()
    }
}

/// True for a legal GraphQL name that can also be an enum value.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    valid_start
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !matches!(name, "true" | "false" | "null")
}

/// `user-profile` and `user_profile` become `UserProfile`; `userGet` becomes `UserGet`.
#[must_use]
pub fn pascal_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for segment in s.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

fn camel_case(segments: &[String]) -> String {
    let joined: String = segments.iter().map(|s| pascal_case(s)).collect();
    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => joined,
    }
}

/// Root field name of an operation file, from its path below the operations directory.
///
/// Directory segments become camelCase prefixes and `index` files contribute nothing.
#[must_use]
pub fn operation_name(relative: &Path) -> String {
    let mut segments: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if let Some(last) = segments.pop() {
        let stem = last.split('.').next().unwrap_or_default().to_string();
        if stem != "index" {
            segments.push(stem);
        }
    }
    if segments.is_empty() {
        return "index".to_string();
    }
    camel_case(&segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fngql_collector::{EnumValueMeta, MetaKind, TypeRef};

    #[test]
    fn test_protocol_friendly() {
        assert_eq!(protocol_friendly("User"), "User");
        assert_eq!(protocol_friendly("Page<Post>"), "Page_Post");
        assert_eq!(
            protocol_friendly("Record<\"a\" | \"b\", number>"),
            "Record_a_b_number"
        );
        assert_eq!(protocol_friendly("_Internal"), "_Internal");
        assert_eq!(protocol_friendly("1st"), "_1st");
        assert_eq!(protocol_friendly("<>"), "Type");
    }

    #[test]
    fn test_operation_name() {
        assert_eq!(operation_name(Path::new("user/get.ts")), "userGet");
        assert_eq!(operation_name(Path::new("user/index.ts")), "user");
        assert_eq!(operation_name(Path::new("complex/root/mixed.ts")), "complexRootMixed");
        assert_eq!(operation_name(Path::new("get-user.ts")), "getUser");
        assert_eq!(operation_name(Path::new("index.ts")), "index");
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("ADMIN"));
        assert!(is_valid_name("_x1"));
        assert!(!is_valid_name("1"));
        assert!(!is_valid_name("needs space"));
        assert!(!is_valid_name("true"));
    }

    #[test]
    fn test_collisions_get_suffixes() {
        let mut metas = Arena::new();
        let a = metas.alloc(TypeMeta::new("User@a.ts", "User", "User", MetaKind::Object));
        let b = metas.alloc(TypeMeta::new("User@b.ts", "User", "User", MetaKind::Object));
        let q = metas.alloc(TypeMeta::new("{ x: string; }", "Query", "{ x: string; }", MetaKind::Object));
        metas[a].original_name = Some("User".into());
        metas[b].original_name = Some("User".into());

        let mut namer = Namer::new();
        namer.assign_all(&mut metas, &[a, b, q]);
        assert_eq!(metas[a].name, "User");
        assert_eq!(metas[b].name, "User2");
        assert_eq!(metas[q].name, "Query2");
        assert_eq!(namer.renames().get("User").map(String::as_str), Some("User"));
    }

    #[test]
    fn test_union_enum_and_list_names() {
        let mut metas = Arena::new();
        let cat = metas.alloc(TypeMeta::new("Cat@a.ts", "Cat", "Cat", MetaKind::Object));
        let dog = metas.alloc(TypeMeta::new("Dog@a.ts", "Dog", "Dog", MetaKind::Object));
        let pet = metas.alloc(TypeMeta::new("Cat@a.ts | Dog@a.ts", "PetsGet", "Cat | Dog", MetaKind::Union));
        metas[pet].possible_types = vec![TypeRef::non_null(cat), TypeRef::non_null(dog)];

        let kind = metas.alloc(TypeMeta::new("\"user\"", "PetsGetKind", "\"user\"", MetaKind::Enum));
        metas[kind].enum_values = vec![EnumValueMeta {
            name: "user".into(),
            literal: "\"user\"".into(),
            description: None,
        }];

        let mut list = TypeMeta::new("[!][!]Cat@a.ts", "Cat", "Cat[][]", MetaKind::Object);
        list.is_list = 2;
        list.of_type = Some(cat);
        let list = metas.alloc(list);

        let mut namer = Namer::new();
        namer.assign_all(&mut metas, &[pet, kind, list]);
        assert_eq!(metas[pet].name, "CatOrDog");
        assert_eq!(metas[kind].name, "Constant_user");
        assert_eq!(metas[list].name, "[[Cat]]");
    }

    #[test]
    fn test_input_suffix() {
        let mut metas = Arena::new();
        let filter = metas.alloc(
            TypeMeta::new("Filter@a.ts#input", "Filter", "Filter", MetaKind::Object).with_input(true),
        );
        metas[filter].original_name = Some("Filter".into());
        let anon = metas.alloc(
            TypeMeta::new("{ q: string; }#input", "SearchQueryInput", "{ q: string; }", MetaKind::Object)
                .with_input(true),
        );

        let either = metas.alloc(
            TypeMeta::new("string | boolean#input", "StringOrBoolean", "string | boolean", MetaKind::Scalar)
                .with_input(true),
        );
        metas[either].degraded = true;

        let mut namer = Namer::new();
        namer.assign_all(&mut metas, &[filter, anon, either]);
        assert_eq!(metas[filter].name, "FilterInput");
        assert_eq!(metas[anon].name, "SearchQueryInput");
        assert_eq!(metas[either].name, "StringOrBoolean");
    }

    #[test]
    fn test_substitute_names() {
        let mut renames = IndexMap::new();
        renames.insert("Page<Post>".to_string(), "Page_Post".to_string());
        renames.insert("Post".to_string(), "Post".to_string());
        renames.insert("User".to_string(), "Person".to_string());
        assert_eq!(
            substitute_names("[Page<Post>, User, Users]", &renames),
            "[Page_Post, Person, Users]"
        );
    }

    #[test]
    fn test_reference_counts_include_ancestors() {
        let mut metas = Arena::new();
        let root = metas.alloc(TypeMeta::new("Root", "Root", "Root", MetaKind::Object));
        let child = metas.alloc(
            TypeMeta::new("Child", "Child", "Child", MetaKind::Object).with_parent(Some(root)),
        );
        metas[root].parent_type = Some(child);

        let mut collector = Collector::new();
        let path = fngql_collector::MetaPath::root("op").child("return");
        collector.add_type_reference("Root", path.clone());
        collector.add_type_reference("Root", path.clone());
        collector.add_type_reference("Child", path);

        count_references(&mut metas, &collector);
        assert_eq!(metas[child].reference_count, 3);
        assert_eq!(metas[root].reference_count, 3);
    }
}
