//! The type registry used during one generation run.

use crate::meta::{MetaId, MetaPath};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

/// Registry of collected types and generated code fragments.
///
/// Type maps are keyed by identity key. The code-fragment caches are keyed by
/// [`MetaId`] (or by operation name for argument types), so two structurally
/// equal metas keep separate entries. A collector belongs to one generation
/// run; create a fresh one for every run.
#[derive(Debug, Default)]
pub struct Collector {
    type_references: IndexMap<String, Vec<MetaPath>>,
    types: IndexMap<String, MetaId>,
    custom_scalars: IndexMap<String, Option<String>>,
    enum_bodies: FxHashMap<MetaId, String>,
    argument_bodies: IndexMap<String, String>,
    selection_bodies: FxHashMap<MetaId, String>,
}

impl Collector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Type references
    // ========================================================================

    /// Records that the type with `identity` occurs at `path`.
    pub fn add_type_reference(&mut self, identity: &str, path: MetaPath) {
        self.type_references
            .entry(identity.to_string())
            .or_default()
            .push(path);
    }

    #[must_use]
    pub fn has_type_reference(&self, identity: &str) -> bool {
        self.type_references.contains_key(identity)
    }

    /// Paths at which a type occurs, in walk order.
    #[must_use]
    pub fn type_reference(&self, identity: &str) -> Option<&[MetaPath]> {
        self.type_references.get(identity).map(Vec::as_slice)
    }

    pub fn remove_type_reference(&mut self, identity: &str) -> Option<Vec<MetaPath>> {
        self.type_references.shift_remove(identity)
    }

    /// All references in first-seen order.
    pub fn type_references(&self) -> impl Iterator<Item = (&str, &[MetaPath])> {
        self.type_references
            .iter()
            .map(|(identity, paths)| (identity.as_str(), paths.as_slice()))
    }

    // ========================================================================
    // Canonical types
    // ========================================================================

    /// Registers the canonical meta of an identity. The first registration wins.
    pub fn add_type(&mut self, identity: &str, meta: MetaId) -> MetaId {
        *self.types.entry(identity.to_string()).or_insert(meta)
    }

    #[must_use]
    pub fn has_type(&self, identity: &str) -> bool {
        self.types.contains_key(identity)
    }

    #[must_use]
    pub fn get_type(&self, identity: &str) -> Option<MetaId> {
        self.types.get(identity).copied()
    }

    pub fn remove_type(&mut self, identity: &str) -> Option<MetaId> {
        self.types.shift_remove(identity)
    }

    /// Registered types in registration order.
    pub fn types(&self) -> impl Iterator<Item = (&str, MetaId)> {
        self.types.iter().map(|(identity, id)| (identity.as_str(), *id))
    }

    // ========================================================================
    // Custom scalars
    // ========================================================================

    /// Registers a custom scalar with an optional description.
    pub fn add_custom_scalar(&mut self, name: &str, description: Option<String>) {
        self.custom_scalars
            .entry(name.to_string())
            .or_insert(description);
    }

    #[must_use]
    pub fn has_custom_scalar(&self, name: &str) -> bool {
        self.custom_scalars.contains_key(name)
    }

    /// The description of a custom scalar. `Some(None)` means registered without one.
    #[must_use]
    pub fn get_custom_scalar(&self, name: &str) -> Option<Option<&str>> {
        self.custom_scalars.get(name).map(Option::as_deref)
    }

    pub fn remove_custom_scalar(&mut self, name: &str) -> Option<Option<String>> {
        self.custom_scalars.shift_remove(name)
    }

    pub fn custom_scalars(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.custom_scalars
            .iter()
            .map(|(name, description)| (name.as_str(), description.as_deref()))
    }

    // ========================================================================
    // Code fragments
    // ========================================================================

    pub fn add_enum_body(&mut self, meta: MetaId, body: String) {
        self.enum_bodies.insert(meta, body);
    }

    #[must_use]
    pub fn has_enum_body(&self, meta: MetaId) -> bool {
        self.enum_bodies.contains_key(&meta)
    }

    #[must_use]
    pub fn enum_body(&self, meta: MetaId) -> Option<&str> {
        self.enum_bodies.get(&meta).map(String::as_str)
    }

    pub fn remove_enum_body(&mut self, meta: MetaId) -> Option<String> {
        self.enum_bodies.remove(&meta)
    }

    /// Caches the arguments type of an operation.
    pub fn add_argument_body(&mut self, operation: &str, body: String) {
        self.argument_bodies.insert(operation.to_string(), body);
    }

    #[must_use]
    pub fn has_argument_body(&self, operation: &str) -> bool {
        self.argument_bodies.contains_key(operation)
    }

    #[must_use]
    pub fn argument_body(&self, operation: &str) -> Option<&str> {
        self.argument_bodies.get(operation).map(String::as_str)
    }

    pub fn remove_argument_body(&mut self, operation: &str) -> Option<String> {
        self.argument_bodies.shift_remove(operation)
    }

    /// Caches the selection of an object type.
    pub fn add_selection_body(&mut self, meta: MetaId, body: String) {
        self.selection_bodies.insert(meta, body);
    }

    #[must_use]
    pub fn has_selection_body(&self, meta: MetaId) -> bool {
        self.selection_bodies.contains_key(&meta)
    }

    #[must_use]
    pub fn selection_body(&self, meta: MetaId) -> Option<&str> {
        self.selection_bodies.get(&meta).map(String::as_str)
    }

    pub fn remove_selection_body(&mut self, meta: MetaId) -> Option<String> {
        self.selection_bodies.remove(&meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{MetaKind, TypeMeta};
    use fngql_core::Arena;

    #[test]
    fn test_first_registration_wins() {
        let mut metas = Arena::new();
        let first = metas.alloc(TypeMeta::new("User@a.ts", "User", "User", MetaKind::Object));
        let second = metas.alloc(TypeMeta::new("User@a.ts", "User", "User", MetaKind::Object));

        let mut collector = Collector::new();
        assert_eq!(collector.add_type("User@a.ts", first), first);
        assert_eq!(collector.add_type("User@a.ts", second), first);
        assert_eq!(collector.get_type("User@a.ts"), Some(first));
        assert_eq!(collector.types().count(), 1);
    }

    #[test]
    fn test_missing_entries_are_none() {
        let collector = Collector::new();
        assert!(collector.get_type("Nope").is_none());
        assert!(collector.type_reference("Nope").is_none());
        assert!(collector.get_custom_scalar("Date").is_none());
        assert!(collector.argument_body("userGet").is_none());
    }

    #[test]
    fn test_type_references_accumulate() {
        let mut collector = Collector::new();
        collector.add_type_reference("User@a.ts", MetaPath::root("a").child("return"));
        collector.add_type_reference("Post@a.ts", MetaPath::root("b").child("return"));
        collector.add_type_reference("User@a.ts", MetaPath::root("b").child("return").child("author"));

        assert_eq!(collector.type_reference("User@a.ts").map(<[_]>::len), Some(2));
        let order: Vec<_> = collector.type_references().map(|(id, _)| id).collect();
        assert_eq!(order, ["User@a.ts", "Post@a.ts"]);

        assert!(collector.remove_type_reference("User@a.ts").is_some());
        assert!(!collector.has_type_reference("User@a.ts"));
    }

    #[test]
    fn test_custom_scalar_description() {
        let mut collector = Collector::new();
        collector.add_custom_scalar("Date", Some("tsType: Date".into()));
        collector.add_custom_scalar("Date", None);
        collector.add_custom_scalar("Void", None);
        assert_eq!(collector.get_custom_scalar("Date"), Some(Some("tsType: Date")));
        assert_eq!(collector.get_custom_scalar("Void"), Some(None));
    }

    #[test]
    fn test_fragment_caches_are_keyed_by_meta() {
        let mut metas = Arena::new();
        let a = metas.alloc(TypeMeta::new("Role", "Role", "Role", MetaKind::Enum));
        let b = metas.alloc(TypeMeta::new("Role", "Role", "Role", MetaKind::Enum));

        let mut collector = Collector::new();
        collector.add_enum_body(a, "\"A\" | \"B\"".into());
        assert!(collector.has_enum_body(a));
        assert!(!collector.has_enum_body(b));

        collector.add_selection_body(b, "id".into());
        assert_eq!(collector.selection_body(b), Some("id"));
        assert_eq!(collector.remove_selection_body(b), Some("id".into()));
        assert!(collector.selection_body(b).is_none());
    }
}
