//! The type oracle.
//!
//! [`TypeChecker`] resolves the explicitly annotated declarations of a
//! [`Program`] into checker types. Declarations are resolved lazily, on first
//! reference, and every named declaration is allocated before its members are
//! resolved so that self-referential types terminate.

use crate::display::{render, Mode};
use crate::program::{FileDiagnostic, FileId, ModuleTarget, Program, SourceFile};
use crate::types::{
    Builtin, DeclName, EnumMemberType, LiteralType, ObjectType, ParamType, Property, Signature,
    TupleElementType, Type, TypeId, TypeKind,
};
use fngql_core::{diagnostics::codes, Arena, Diagnostic, Span};
use fngql_syntax as ast;
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::hash_map::Entry;
use std::rc::Rc;

const MAX_INSTANTIATION_DEPTH: usize = 50;

/// Preallocated singleton types.
#[derive(Debug, Clone, Copy)]
pub struct Primitives {
    pub any: TypeId,
    pub unknown: TypeId,
    pub never: TypeId,
    pub void: TypeId,
    pub undefined: TypeId,
    pub null: TypeId,
    pub string: TypeId,
    pub number: TypeId,
    pub boolean: TypeId,
    pub bigint: TypeId,
    pub symbol: TypeId,
    pub object: TypeId,
    pub error: TypeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meaning {
    Type,
    Value,
}

/// The declaration a name refers to after following imports and re-exports.
#[derive(Debug, Clone, Copy)]
enum Symbol<'p> {
    Local(FileId, &'p str),
    Module(FileId),
    /// Declared in an external or unresolved module.
    Opaque,
}

#[derive(Debug, Clone)]
enum LocalType<'p> {
    Interface(Vec<&'p ast::InterfaceDecl>),
    Class(&'p ast::ClassDecl),
    Alias(&'p ast::TypeAliasDecl),
    Enum(&'p ast::EnumDecl),
}

#[derive(Debug, Clone)]
enum LocalValue<'p> {
    Function(Vec<&'p ast::FunctionDecl>),
    Variable(&'p ast::VariableDecl),
    Class(&'p ast::ClassDecl),
    Enum(&'p ast::EnumDecl),
}

#[derive(Debug, Clone, Copy)]
enum ImportBinding<'p> {
    Named { target: ModuleTarget, name: &'p str },
    Module(ModuleTarget),
}

#[derive(Debug, Clone, Copy)]
enum ExportEntry<'p> {
    Local(&'p str),
    Reexport { target: ModuleTarget, name: &'p str },
    Module(ModuleTarget),
}

/// Bindings of one file.
#[derive(Debug, Default)]
struct Scope<'p> {
    types: FxHashMap<&'p str, LocalType<'p>>,
    values: FxHashMap<&'p str, LocalValue<'p>>,
    imports: FxHashMap<&'p str, ImportBinding<'p>>,
    exports: FxHashMap<&'p str, ExportEntry<'p>>,
    stars: Vec<ModuleTarget>,
}

impl<'p> Scope<'p> {
    fn build(file: &'p SourceFile) -> Self {
        let mut scope = Self::default();
        for item in &file.module.items {
            match item {
                ast::Item::Import(import) => {
                    let target = file.import_target(&import.source);
                    if let Some(namespace) = &import.namespace {
                        scope
                            .imports
                            .insert(namespace.as_str(), ImportBinding::Module(target));
                    }
                    if let Some(default) = &import.default {
                        scope.imports.insert(
                            default.as_str(),
                            ImportBinding::Named {
                                target,
                                name: "default",
                            },
                        );
                    }
                    for specifier in &import.names {
                        scope.imports.insert(
                            specifier.local.as_str(),
                            ImportBinding::Named {
                                target,
                                name: specifier.imported.as_str(),
                            },
                        );
                    }
                }
                ast::Item::TypeAlias(decl) => {
                    scope.types.insert(decl.name.as_str(), LocalType::Alias(decl));
                }
                ast::Item::Interface(decl) => match scope.types.entry(decl.name.as_str()) {
                    Entry::Occupied(mut entry) => {
                        if let LocalType::Interface(decls) = entry.get_mut() {
                            decls.push(decl);
                        }
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(LocalType::Interface(vec![decl]));
                    }
                },
                ast::Item::Class(decl) => {
                    scope.types.insert(decl.name.as_str(), LocalType::Class(decl));
                    scope.values.insert(decl.name.as_str(), LocalValue::Class(decl));
                }
                ast::Item::Enum(decl) => {
                    scope.types.insert(decl.name.as_str(), LocalType::Enum(decl));
                    scope.values.insert(decl.name.as_str(), LocalValue::Enum(decl));
                }
                ast::Item::Function(decl) => match scope.values.entry(decl.name.as_str()) {
                    Entry::Occupied(mut entry) => {
                        if let LocalValue::Function(decls) = entry.get_mut() {
                            decls.push(decl);
                        }
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(LocalValue::Function(vec![decl]));
                    }
                },
                ast::Item::Variable(decl) => {
                    scope
                        .values
                        .insert(decl.name.as_str(), LocalValue::Variable(decl));
                }
                ast::Item::ExportNames(export) => {
                    for specifier in &export.names {
                        scope.exports.insert(
                            specifier.exported.as_str(),
                            ExportEntry::Local(specifier.local.as_str()),
                        );
                    }
                }
                ast::Item::ExportFrom(export) => {
                    let target = file.import_target(&export.source);
                    match (&export.names, &export.namespace) {
                        (_, Some(namespace)) => {
                            scope
                                .exports
                                .insert(namespace.as_str(), ExportEntry::Module(target));
                        }
                        (Some(names), None) => {
                            for specifier in names {
                                scope.exports.insert(
                                    specifier.exported.as_str(),
                                    ExportEntry::Reexport {
                                        target,
                                        name: specifier.local.as_str(),
                                    },
                                );
                            }
                        }
                        (None, None) => scope.stars.push(target),
                    }
                }
            }

            if item.is_exported() {
                if let Some(name) = item.declared_name() {
                    scope
                        .exports
                        .insert(name.as_str(), ExportEntry::Local(name.as_str()));
                }
            }
        }
        scope
    }
}

/// Resolution context: the file being read and the type parameters in scope.
#[derive(Debug, Clone)]
struct Ctx {
    file: FileId,
    env: Rc<FxHashMap<String, TypeId>>,
    this_type: Option<TypeId>,
}

impl Ctx {
    fn new(file: FileId) -> Self {
        Self {
            file,
            env: Rc::default(),
            this_type: None,
        }
    }
}

type InstanceKey = (FileId, String, Vec<String>);

/// Type oracle over a [`Program`].
pub struct TypeChecker<'p> {
    program: &'p Program,
    scopes: Vec<Scope<'p>>,
    types: Arena<Type>,
    prim: Primitives,
    literals: FxHashMap<LiteralType, TypeId>,
    instances: FxHashMap<InstanceKey, TypeId>,
    values: FxHashMap<(FileId, String), TypeId>,
    resolving: FxHashSet<InstanceKey>,
    stripped: FxHashMap<TypeId, (TypeId, bool)>,
    depth: usize,
    diagnostics: Vec<FileDiagnostic>,
}

impl<'p> TypeChecker<'p> {
    /// Creates a checker and builds the symbol tables of every file.
    #[must_use]
    pub fn new(program: &'p Program) -> Self {
        let scopes = program.files().map(|(_, file)| Scope::build(file)).collect();
        let mut types = Arena::with_capacity(256);
        let mut alloc = |kind| types.alloc(Type::anonymous(kind));
        let prim = Primitives {
            any: alloc(TypeKind::Any),
            unknown: alloc(TypeKind::Unknown),
            never: alloc(TypeKind::Never),
            void: alloc(TypeKind::Void),
            undefined: alloc(TypeKind::Undefined),
            null: alloc(TypeKind::Null),
            string: alloc(TypeKind::String),
            number: alloc(TypeKind::Number),
            boolean: alloc(TypeKind::Boolean),
            bigint: alloc(TypeKind::BigInt),
            symbol: alloc(TypeKind::Symbol),
            object: alloc(TypeKind::NonPrimitive),
            error: alloc(TypeKind::Unresolved),
        };
        Self {
            program,
            scopes,
            types,
            prim,
            literals: FxHashMap::default(),
            instances: FxHashMap::default(),
            values: FxHashMap::default(),
            resolving: FxHashSet::default(),
            stripped: FxHashMap::default(),
            depth: 0,
            diagnostics: Vec::new(),
        }
    }

    /// The program being checked.
    #[must_use]
    pub fn program(&self) -> &'p Program {
        self.program
    }

    #[must_use]
    pub fn primitives(&self) -> Primitives {
        self.prim
    }

    /// Diagnostics reported while resolving types.
    #[must_use]
    pub fn diagnostics(&self) -> &[FileDiagnostic] {
        &self.diagnostics
    }

    /// Takes the diagnostics reported so far.
    pub fn take_diagnostics(&mut self) -> Vec<FileDiagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    // ========================================================================
    // Exports
    // ========================================================================

    /// Resolves an exported type declaration of `file`.
    pub fn exported_type(&mut self, file: FileId, name: &str) -> Option<TypeId> {
        let mut visited = Vec::new();
        match self.lookup_export(file, name, Meaning::Type, &mut visited)? {
            Symbol::Local(decl_file, decl_name) => {
                Some(self.instantiate(file, decl_file, decl_name, Vec::new(), Span::default()))
            }
            Symbol::Opaque => Some(self.prim.error),
            Symbol::Module(_) => None,
        }
    }

    /// Resolves the type of an exported value of `file`.
    pub fn exported_value_type(&mut self, file: FileId, name: &str) -> Option<TypeId> {
        let mut visited = Vec::new();
        match self.lookup_export(file, name, Meaning::Value, &mut visited)? {
            Symbol::Local(decl_file, decl_name) => Some(self.value_type(decl_file, decl_name)),
            Symbol::Opaque => Some(self.prim.error),
            Symbol::Module(_) => None,
        }
    }

    /// The doc comment of an exported value.
    #[must_use]
    pub fn exported_value_doc(&self, file: FileId, name: &str) -> Option<String> {
        let mut visited = Vec::new();
        let Symbol::Local(decl_file, decl_name) =
            self.lookup_export(file, name, Meaning::Value, &mut visited)?
        else {
            return None;
        };
        match self.scopes[decl_file.index()].values.get(decl_name)? {
            LocalValue::Function(decls) => decls.iter().find_map(|d| d.doc.clone()),
            LocalValue::Variable(decl) => decl.doc.clone(),
            LocalValue::Class(decl) => decl.doc.clone(),
            LocalValue::Enum(decl) => decl.doc.clone(),
        }
    }

    /// The literal type of an exported constant, such as `export const __typename = "User"`.
    pub fn exported_literal(&mut self, file: FileId, name: &str) -> Option<LiteralType> {
        let ty = self.exported_value_type(file, name)?;
        self.literal(ty).cloned()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[must_use]
    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id]
    }

    #[must_use]
    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.types[id].kind
    }

    /// Renders a type the way `tsc` prints it.
    #[must_use]
    pub fn display(&self, id: TypeId) -> String {
        render(&self.types, id, Mode::Display)
    }

    /// Identity of a type: its rendering with declared names qualified by file.
    #[must_use]
    pub fn type_key(&self, id: TypeId) -> String {
        render(&self.types, id, Mode::Key)
    }

    #[must_use]
    pub fn is_error(&self, id: TypeId) -> bool {
        matches!(self.types[id].kind, TypeKind::Unresolved)
    }

    #[must_use]
    pub fn is_nullish(&self, id: TypeId) -> bool {
        matches!(
            self.types[id].kind,
            TypeKind::Null | TypeKind::Undefined | TypeKind::Void
        )
    }

    #[must_use]
    pub fn literal(&self, id: TypeId) -> Option<&LiteralType> {
        match &self.types[id].kind {
            TypeKind::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    #[must_use]
    pub fn array_element(&self, id: TypeId) -> Option<TypeId> {
        match self.types[id].kind {
            TypeKind::Array(element) => Some(element),
            _ => None,
        }
    }

    #[must_use]
    pub fn union_members(&self, id: TypeId) -> Option<&[TypeId]> {
        match &self.types[id].kind {
            TypeKind::Union(members) => Some(members),
            _ => None,
        }
    }

    #[must_use]
    pub fn intersection_members(&self, id: TypeId) -> Option<&[TypeId]> {
        match &self.types[id].kind {
            TypeKind::Intersection(members) => Some(members),
            _ => None,
        }
    }

    #[must_use]
    pub fn tuple_elements(&self, id: TypeId) -> Option<&[TupleElementType]> {
        match &self.types[id].kind {
            TypeKind::Tuple(elements) => Some(elements),
            _ => None,
        }
    }

    /// Type arguments of a generic instantiation.
    #[must_use]
    pub fn type_arguments(&self, id: TypeId) -> &[TypeId] {
        let ty = &self.types[id];
        match (&ty.name, &ty.kind) {
            (Some(name), _) => &name.args,
            (None, TypeKind::Builtin(_, args)) => args,
            _ => &[],
        }
    }

    /// The item type of `AsyncGenerator<T>`, `AsyncIterable<T>` and `AsyncIterableIterator<T>`.
    #[must_use]
    pub fn async_iterable_item(&self, id: TypeId) -> Option<TypeId> {
        match &self.types[id].kind {
            TypeKind::Builtin(builtin, args) if builtin.is_async_iterable() => {
                Some(args.first().copied().unwrap_or(self.prim.any))
            }
            _ => None,
        }
    }

    /// Removes `null`, `undefined` and `void` arms of a union.
    ///
    /// Returns the remaining type and whether anything was removed.
    pub fn strip_nullish(&mut self, id: TypeId) -> (TypeId, bool) {
        if let Some(&cached) = self.stripped.get(&id) {
            return cached;
        }
        let result = match &self.types[id].kind {
            TypeKind::Union(members) => {
                let kept: Vec<TypeId> = members
                    .iter()
                    .copied()
                    .filter(|&m| !self.is_nullish(m))
                    .collect();
                if kept.len() == members.len() {
                    (id, false)
                } else {
                    match kept.as_slice() {
                        [] => (self.prim.null, true),
                        [single] => (*single, true),
                        _ => {
                            let name = self.types[id].name.clone();
                            let doc = self.types[id].doc.clone();
                            let stripped = self.types.alloc(Type {
                                kind: TypeKind::Union(kept),
                                name,
                                doc,
                            });
                            (stripped, true)
                        }
                    }
                }
            }
            _ => (id, false),
        };
        self.stripped.insert(id, result);
        result
    }

    /// Merged property list: own members first, then inherited and intersected ones.
    ///
    /// When two sources declare the same name, the first one wins.
    #[must_use]
    pub fn properties_of(&self, id: TypeId) -> Vec<Property> {
        let mut out = IndexMap::new();
        let mut visited = FxHashSet::default();
        self.collect_properties(id, &mut out, &mut visited);
        out.into_values().collect()
    }

    fn collect_properties(
        &self,
        id: TypeId,
        out: &mut IndexMap<String, Property>,
        visited: &mut FxHashSet<TypeId>,
    ) {
        if !visited.insert(id) {
            return;
        }
        match &self.types[id].kind {
            TypeKind::Object(object) => {
                for property in &object.properties {
                    out.entry(property.name.clone())
                        .or_insert_with(|| property.clone());
                }
                for &base in &object.bases {
                    self.collect_properties(base, out, visited);
                }
            }
            TypeKind::Intersection(members) => {
                for &member in members {
                    self.collect_properties(member, out, visited);
                }
            }
            TypeKind::TypeParam {
                constraint: Some(constraint),
                ..
            } => self.collect_properties(*constraint, out, visited),
            _ => {}
        }
    }

    /// The first object type reachable from `id` for which `has` holds.
    fn find_object(&self, id: TypeId, has: impl Fn(&ObjectType) -> bool + Copy) -> Option<&ObjectType> {
        let mut visited = FxHashSet::default();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if !visited.insert(current) {
                continue;
            }
            match &self.types[current].kind {
                TypeKind::Object(object) if has(object) => return Some(object),
                TypeKind::Object(object) => pending.extend(object.bases.iter().rev()),
                TypeKind::Intersection(members) => pending.extend(members.iter().rev()),
                TypeKind::TypeParam {
                    constraint: Some(constraint),
                    ..
                } => pending.push(*constraint),
                _ => {}
            }
        }
        None
    }

    #[must_use]
    pub fn call_signatures(&self, id: TypeId) -> &[Signature] {
        self.find_object(id, |o| !o.call_signatures.is_empty())
            .map(|o| o.call_signatures.as_slice())
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn construct_signatures(&self, id: TypeId) -> &[Signature] {
        self.find_object(id, |o| !o.construct_signatures.is_empty())
            .map(|o| o.construct_signatures.as_slice())
            .unwrap_or(&[])
    }

    /// The `(string, number)` index signature value types.
    #[must_use]
    pub fn index_signatures(&self, id: TypeId) -> (Option<TypeId>, Option<TypeId>) {
        let string = self
            .find_object(id, |o| o.string_index.is_some())
            .and_then(|o| o.string_index);
        let number = self
            .find_object(id, |o| o.number_index.is_some())
            .and_then(|o| o.number_index);
        (string, number)
    }

    /// True when `id` is an object type with call or construct signatures.
    #[must_use]
    pub fn is_callable(&self, id: TypeId) -> bool {
        !self.call_signatures(id).is_empty() || !self.construct_signatures(id).is_empty()
    }

    // ========================================================================
    // Symbol lookup
    // ========================================================================

    fn lookup(
        &self,
        file: FileId,
        name: &str,
        meaning: Meaning,
        visited: &mut Vec<(FileId, String)>,
    ) -> Option<Symbol<'p>> {
        let scope = &self.scopes[file.index()];
        let local = match meaning {
            Meaning::Type => scope.types.get_key_value(name).map(|(k, _)| *k),
            Meaning::Value => scope.values.get_key_value(name).map(|(k, _)| *k),
        };
        if let Some(local) = local {
            return Some(Symbol::Local(file, local));
        }
        match *scope.imports.get(name)? {
            ImportBinding::Named {
                target: ModuleTarget::File(target),
                name,
            } => self.lookup_export(target, name, meaning, visited),
            ImportBinding::Module(ModuleTarget::File(target)) => Some(Symbol::Module(target)),
            ImportBinding::Named { .. } | ImportBinding::Module(_) => Some(Symbol::Opaque),
        }
    }

    fn lookup_export(
        &self,
        file: FileId,
        name: &str,
        meaning: Meaning,
        visited: &mut Vec<(FileId, String)>,
    ) -> Option<Symbol<'p>> {
        if visited.iter().any(|(f, n)| *f == file && n == name) {
            return None;
        }
        visited.push((file, name.to_string()));

        let scope = &self.scopes[file.index()];
        match scope.exports.get(name).copied() {
            Some(ExportEntry::Local(local)) => return self.lookup(file, local, meaning, visited),
            Some(ExportEntry::Reexport {
                target: ModuleTarget::File(target),
                name,
            }) => return self.lookup_export(target, name, meaning, visited),
            Some(ExportEntry::Module(ModuleTarget::File(target))) => {
                return Some(Symbol::Module(target))
            }
            Some(ExportEntry::Reexport { .. } | ExportEntry::Module(_)) => {
                return Some(Symbol::Opaque)
            }
            None => {}
        }
        for star in &scope.stars {
            if let ModuleTarget::File(target) = *star {
                if let Some(symbol) = self.lookup_export(target, name, meaning, visited) {
                    return Some(symbol);
                }
            }
        }
        None
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    fn report(&mut self, file: FileId, diagnostic: Diagnostic) {
        self.diagnostics.push(FileDiagnostic { file, diagnostic });
    }

    fn alloc(&mut self, kind: TypeKind) -> TypeId {
        self.types.alloc(Type::anonymous(kind))
    }

    fn alloc_named(
        &mut self,
        kind: TypeKind,
        name: &str,
        file: Option<FileId>,
        args: Vec<TypeId>,
        doc: Option<String>,
    ) -> TypeId {
        let file = file.map(|f| self.program.display_path(f));
        self.types.alloc(Type {
            kind,
            name: Some(DeclName {
                name: name.to_string(),
                file,
                args,
            }),
            doc,
        })
    }

    fn literal_type(&mut self, literal: LiteralType) -> TypeId {
        if let Some(&id) = self.literals.get(&literal) {
            return id;
        }
        let id = self.alloc(TypeKind::Literal(literal.clone()));
        self.literals.insert(literal, id);
        id
    }

    fn widen(&self, literal: &LiteralType) -> TypeId {
        match literal {
            LiteralType::String(_) => self.prim.string,
            LiteralType::Number(_) => self.prim.number,
            LiteralType::BigInt(_) => self.prim.bigint,
            LiteralType::Boolean(_) => self.prim.boolean,
        }
    }

    fn resolve(&mut self, ctx: &Ctx, node: &'p ast::TypeNode) -> TypeId {
        match &node.kind {
            ast::TypeNodeKind::Keyword(keyword) => self.keyword(ctx, *keyword),
            ast::TypeNodeKind::Literal(literal) => self.literal_type(literal_of(literal)),
            ast::TypeNodeKind::Reference(reference) => self.resolve_reference(ctx, reference),
            ast::TypeNodeKind::Object(members) => {
                let mut object = ObjectType::default();
                self.add_members(ctx, members, &mut object);
                self.alloc(TypeKind::Object(object))
            }
            ast::TypeNodeKind::Array(element) => {
                let element = self.resolve(ctx, element);
                self.alloc(TypeKind::Array(element))
            }
            ast::TypeNodeKind::Tuple(elements) => {
                let elements = elements
                    .iter()
                    .map(|element| TupleElementType {
                        label: element.label.as_ref().map(|l| l.name.clone()),
                        ty: self.resolve(ctx, &element.ty),
                        optional: element.optional,
                        rest: element.rest,
                    })
                    .collect();
                self.alloc(TypeKind::Tuple(elements))
            }
            ast::TypeNodeKind::Union(members) => {
                let members = members.iter().map(|m| self.resolve(ctx, m)).collect();
                self.union(members)
            }
            ast::TypeNodeKind::Intersection(members) => {
                let members = members.iter().map(|m| self.resolve(ctx, m)).collect();
                self.intersection(members)
            }
            ast::TypeNodeKind::Function {
                signature,
                is_constructor,
            } => {
                let signature = self.resolve_signature(ctx, signature, None);
                let mut object = ObjectType::default();
                if *is_constructor {
                    object.construct_signatures.push(signature);
                } else {
                    object.call_signatures.push(signature);
                }
                self.alloc(TypeKind::Object(object))
            }
            ast::TypeNodeKind::Query(path) => self.resolve_value_path(ctx, path, node.span),
            ast::TypeNodeKind::Keyof(inner) => {
                let inner = self.resolve(ctx, inner);
                self.keyof(inner)
            }
            ast::TypeNodeKind::Readonly(inner) => self.resolve(ctx, inner),
            ast::TypeNodeKind::IndexedAccess { object, index } => {
                let object = self.resolve(ctx, object);
                let index = self.resolve(ctx, index);
                self.indexed_access(ctx.file, object, index, node.span)
            }
            ast::TypeNodeKind::Template => self.prim.string,
            ast::TypeNodeKind::Unsupported(what) => {
                self.report(
                    ctx.file,
                    Diagnostic::warning(
                        codes::UNSUPPORTED_SYNTAX,
                        format!("{what}s are not supported"),
                    )
                    .with_span(node.span, "this type is treated as unresolved"),
                );
                self.prim.error
            }
        }
    }

    fn keyword(&self, ctx: &Ctx, keyword: ast::KeywordType) -> TypeId {
        match keyword {
            ast::KeywordType::Any => self.prim.any,
            ast::KeywordType::Unknown => self.prim.unknown,
            ast::KeywordType::Never => self.prim.never,
            ast::KeywordType::Void => self.prim.void,
            ast::KeywordType::Undefined => self.prim.undefined,
            ast::KeywordType::Null => self.prim.null,
            ast::KeywordType::String => self.prim.string,
            ast::KeywordType::Number => self.prim.number,
            ast::KeywordType::Boolean => self.prim.boolean,
            ast::KeywordType::BigInt => self.prim.bigint,
            ast::KeywordType::Symbol => self.prim.symbol,
            ast::KeywordType::Object => self.prim.object,
            ast::KeywordType::This => ctx.this_type.unwrap_or(self.prim.any),
        }
    }

    fn add_members(&mut self, ctx: &Ctx, members: &'p [ast::TypeMember], object: &mut ObjectType) {
        for member in members {
            match member {
                ast::TypeMember::Property(property) => {
                    let ty = match &property.ty {
                        Some(ty) => self.resolve(ctx, ty),
                        None => self.prim.any,
                    };
                    object.properties.push(Property {
                        name: property.name.clone(),
                        ty,
                        optional: property.optional,
                        readonly: property.readonly,
                        is_method: false,
                        doc: property.doc.clone(),
                    });
                }
                ast::TypeMember::Method(method) => {
                    let signature = self.resolve_signature(ctx, &method.signature, None);
                    let overload = object
                        .properties
                        .iter()
                        .find(|p| p.is_method && p.name == method.name)
                        .map(|p| p.ty);
                    if let Some(existing) = overload {
                        if let TypeKind::Object(o) = &mut self.types[existing].kind {
                            o.call_signatures.push(signature);
                        }
                        continue;
                    }
                    let ty = self.alloc(TypeKind::Object(ObjectType {
                        call_signatures: vec![signature],
                        ..ObjectType::default()
                    }));
                    object.properties.push(Property {
                        name: method.name.clone(),
                        ty,
                        optional: method.optional,
                        readonly: false,
                        is_method: true,
                        doc: method.doc.clone(),
                    });
                }
                ast::TypeMember::Index(index) => {
                    let key = self.resolve(ctx, &index.key);
                    let value = self.resolve(ctx, &index.value);
                    if matches!(self.types[key].kind, TypeKind::Number) {
                        object.number_index = Some(value);
                    } else {
                        object.string_index = Some(value);
                    }
                }
                ast::TypeMember::Call(signature) => {
                    let signature = self.resolve_signature(ctx, signature, None);
                    object.call_signatures.push(signature);
                }
                ast::TypeMember::Construct(signature) => {
                    let signature = self.resolve_signature(ctx, signature, None);
                    object.construct_signatures.push(signature);
                }
            }
        }
    }

    /// Resolves a signature. A missing return annotation is reported when
    /// `declared` names the declaration; otherwise it is `any`.
    fn resolve_signature(
        &mut self,
        ctx: &Ctx,
        signature: &'p ast::Signature,
        declared: Option<(&str, Span)>,
    ) -> Signature {
        let mut type_params = Vec::with_capacity(signature.type_params.len());
        let ctx = if signature.type_params.is_empty() {
            ctx.clone()
        } else {
            let mut env = (*ctx.env).clone();
            for param in &signature.type_params {
                let id = self.alloc(TypeKind::TypeParam {
                    name: param.name.name.clone(),
                    constraint: None,
                });
                env.insert(param.name.name.clone(), id);
                type_params.push(id);
            }
            let inner = Ctx {
                env: Rc::new(env),
                ..ctx.clone()
            };
            for (param, &id) in signature.type_params.iter().zip(&type_params) {
                if let Some(constraint) = &param.constraint {
                    let resolved = self.resolve(&inner, constraint);
                    if let TypeKind::TypeParam { constraint, .. } = &mut self.types[id].kind {
                        *constraint = Some(resolved);
                    }
                }
            }
            inner
        };

        let this_type = signature
            .this_param
            .as_ref()
            .map(|this| self.resolve(&ctx, this));
        let params = signature
            .params
            .iter()
            .map(|param| ParamType {
                name: param.name.name.clone(),
                ty: match &param.ty {
                    Some(ty) => self.resolve(&ctx, ty),
                    None => self.prim.any,
                },
                optional: param.optional || param.has_initializer,
                rest: param.rest,
            })
            .collect();
        let return_type = match (&signature.return_type, declared) {
            (Some(ty), _) => self.resolve(&ctx, ty),
            (None, Some((name, span))) => {
                self.report(
                    ctx.file,
                    Diagnostic::error(
                        codes::UNINFERABLE_TYPE,
                        format!("cannot infer the return type of `{name}`"),
                    )
                    .with_span(span, "add a return type annotation"),
                );
                self.prim.error
            }
            (None, None) => self.prim.any,
        };

        Signature {
            type_params,
            this_type,
            params,
            return_type,
        }
    }

    fn resolve_reference(&mut self, ctx: &Ctx, reference: &'p ast::TypeRefNode) -> TypeId {
        let span = reference.span;
        let args: Vec<TypeId> = reference
            .args
            .iter()
            .map(|arg| self.resolve(ctx, arg))
            .collect();
        let Some((first, rest)) = reference.name.split_first() else {
            return self.prim.error;
        };
        if rest.is_empty() && args.is_empty() {
            if let Some(&param) = ctx.env.get(first.as_str()) {
                return param;
            }
        }

        let mut visited = Vec::new();
        let mut symbol = self.lookup(ctx.file, first.as_str(), Meaning::Type, &mut visited);
        for (i, segment) in rest.iter().enumerate() {
            match symbol {
                Some(Symbol::Module(file)) => {
                    visited.clear();
                    symbol = self.lookup_export(file, segment.as_str(), Meaning::Type, &mut visited);
                }
                Some(Symbol::Local(file, name)) if i + 1 == rest.len() => {
                    return self.enum_member_type(ctx.file, file, name, segment);
                }
                Some(Symbol::Opaque) => return self.prim.error,
                _ => {
                    symbol = None;
                    break;
                }
            }
        }

        match symbol {
            Some(Symbol::Local(file, name)) => self.instantiate(ctx.file, file, name, args, span),
            Some(Symbol::Opaque) => self.prim.error,
            Some(Symbol::Module(_)) => {
                self.report(
                    ctx.file,
                    Diagnostic::error(
                        codes::UNRESOLVED_TYPE,
                        format!("module `{}` is used as a type", reference.qualified_name()),
                    )
                    .with_span(span, "not a type"),
                );
                self.prim.error
            }
            None => {
                if rest.is_empty() {
                    if let Some(builtin) = self.builtin(ctx, first.as_str(), &args, span) {
                        return builtin;
                    }
                }
                self.report(
                    ctx.file,
                    Diagnostic::error(
                        codes::UNRESOLVED_TYPE,
                        format!("cannot find type `{}`", reference.qualified_name()),
                    )
                    .with_span(span, "not found in this scope"),
                );
                self.prim.error
            }
        }
    }

    fn enum_member_type(
        &mut self,
        from: FileId,
        file: FileId,
        name: &str,
        member: &ast::Ident,
    ) -> TypeId {
        let value = match self.scopes[file.index()].types.get(name) {
            Some(LocalType::Enum(decl)) => enum_members(decl)
                .into_iter()
                .find(|m| m.name == member.name)
                .map(|m| m.value),
            _ => None,
        };
        match value {
            Some(value) => self.literal_type(value),
            None => {
                self.report(
                    from,
                    Diagnostic::error(
                        codes::UNRESOLVED_TYPE,
                        format!("`{name}` has no member `{}`", member.name),
                    )
                    .with_span(member.span, "unknown member"),
                );
                self.prim.error
            }
        }
    }

    /// Instantiates a named declaration with type arguments, reusing earlier instances.
    fn instantiate(
        &mut self,
        from: FileId,
        file: FileId,
        name: &'p str,
        args: Vec<TypeId>,
        span: Span,
    ) -> TypeId {
        let Some(decl) = self.scopes[file.index()].types.get(name).cloned() else {
            return self.prim.error;
        };
        let key: InstanceKey = (
            file,
            name.to_string(),
            args.iter().map(|&arg| self.type_key(arg)).collect(),
        );
        if let Some(&id) = self.instances.get(&key) {
            return id;
        }
        if self.depth >= MAX_INSTANTIATION_DEPTH {
            self.report(
                from,
                Diagnostic::error(
                    codes::UNRESOLVED_TYPE,
                    format!("instantiation of `{name}` is excessively deep"),
                )
                .with_span(span, "possibly infinite"),
            );
            return self.prim.error;
        }

        self.depth += 1;
        let id = match decl {
            LocalType::Interface(decls) => {
                let doc = decls.iter().find_map(|d| d.doc.clone());
                let slot = self.alloc_named(TypeKind::Pending, name, Some(file), args.clone(), doc);
                self.instances.insert(key, slot);

                let first = decls[0];
                let ctx = self.decl_ctx(file, &first.type_params, &args, Some(slot));
                let mut object = ObjectType::default();
                for decl in decls.iter().copied() {
                    for base in &decl.extends {
                        let base = self.resolve_reference(&ctx, base);
                        object.bases.push(base);
                    }
                    self.add_members(&ctx, &decl.members, &mut object);
                }
                self.types[slot].kind = TypeKind::Object(object);
                slot
            }
            LocalType::Class(decl) => {
                let slot = self.alloc_named(
                    TypeKind::Pending,
                    name,
                    Some(file),
                    args.clone(),
                    decl.doc.clone(),
                );
                self.instances.insert(key, slot);

                let ctx = self.decl_ctx(file, &decl.type_params, &args, Some(slot));
                let mut object = ObjectType::default();
                if let Some(base) = &decl.extends {
                    let base = self.resolve_reference(&ctx, base);
                    object.bases.push(base);
                }
                if let Some(constructor) = &decl.constructor {
                    for param in constructor.params.iter().filter(|p| p.is_property) {
                        let ty = match &param.ty {
                            Some(ty) => self.resolve(&ctx, ty),
                            None => self.prim.any,
                        };
                        object.properties.push(Property {
                            name: param.name.name.clone(),
                            ty,
                            optional: param.optional,
                            readonly: false,
                            is_method: false,
                            doc: None,
                        });
                    }
                }
                self.add_members(&ctx, &decl.members, &mut object);
                self.types[slot].kind = TypeKind::Object(object);
                slot
            }
            LocalType::Alias(decl) if alias_needs_slot(&decl.ty) => {
                let slot = self.alloc_named(
                    TypeKind::Pending,
                    name,
                    Some(file),
                    args.clone(),
                    decl.doc.clone(),
                );
                self.instances.insert(key, slot);

                let ctx = self.decl_ctx(file, &decl.type_params, &args, None);
                let body = self.resolve(&ctx, &decl.ty);
                let kind = self.types[body].kind.clone();
                self.types[slot].kind = kind;
                slot
            }
            LocalType::Alias(decl) => {
                if self.resolving.insert(key.clone()) {
                    let ctx = self.decl_ctx(file, &decl.type_params, &args, None);
                    let body = self.resolve(&ctx, &decl.ty);
                    self.resolving.remove(&key);
                    self.instances.insert(key, body);
                    body
                } else {
                    self.report(
                        file,
                        Diagnostic::error(
                            codes::CIRCULAR_ALIAS,
                            format!("type alias `{name}` circularly references itself"),
                        )
                        .with_span(decl.name.span, "defined here"),
                    );
                    self.prim.error
                }
            }
            LocalType::Enum(decl) => {
                let members = enum_members(decl);
                let id = self.alloc_named(
                    TypeKind::Enum(members),
                    name,
                    Some(file),
                    Vec::new(),
                    decl.doc.clone(),
                );
                self.instances.insert(key, id);
                id
            }
        };
        self.depth -= 1;
        id
    }

    /// Binds the type parameters of a declaration to `args`, falling back to defaults.
    fn decl_ctx(
        &mut self,
        file: FileId,
        params: &'p [ast::TypeParam],
        args: &[TypeId],
        this_type: Option<TypeId>,
    ) -> Ctx {
        let mut ctx = Ctx {
            this_type,
            ..Ctx::new(file)
        };
        let mut env = FxHashMap::default();
        for (i, param) in params.iter().enumerate() {
            let ty = match (args.get(i), &param.default) {
                (Some(&arg), _) => arg,
                (None, Some(default)) => {
                    ctx.env = Rc::new(env.clone());
                    self.resolve(&ctx, default)
                }
                (None, None) => self.prim.unknown,
            };
            env.insert(param.name.name.clone(), ty);
        }
        ctx.env = Rc::new(env);
        ctx
    }

    // ========================================================================
    // Values
    // ========================================================================

    fn resolve_value_path(&mut self, ctx: &Ctx, path: &'p [ast::Ident], span: Span) -> TypeId {
        let Some((first, rest)) = path.split_first() else {
            return self.prim.error;
        };
        let mut visited = Vec::new();
        let mut symbol = self.lookup(ctx.file, first.as_str(), Meaning::Value, &mut visited);
        let mut remaining = rest;
        while let (Some(Symbol::Module(file)), Some((segment, tail))) = (symbol, remaining.split_first()) {
            visited.clear();
            symbol = self.lookup_export(file, segment.as_str(), Meaning::Value, &mut visited);
            remaining = tail;
        }

        let mut ty = match symbol {
            Some(Symbol::Local(file, name)) => self.value_type(file, name),
            Some(Symbol::Opaque) => return self.prim.error,
            Some(Symbol::Module(_)) | None => {
                let name = path.iter().map(ast::Ident::as_str).collect::<Vec<_>>().join(".");
                self.report(
                    ctx.file,
                    Diagnostic::error(codes::UNRESOLVED_VALUE, format!("cannot find value `{name}`"))
                        .with_span(span, "not found in this scope"),
                );
                return self.prim.error;
            }
        };

        for segment in remaining {
            if self.is_error(ty) {
                return ty;
            }
            match self.property_type(ty, segment.as_str()) {
                Some(property) => ty = property,
                None => {
                    let shown = self.display(ty);
                    self.report(
                        ctx.file,
                        Diagnostic::error(
                            codes::UNRESOLVED_VALUE,
                            format!("property `{}` does not exist on `{shown}`", segment.name),
                        )
                        .with_span(segment.span, "unknown property"),
                    );
                    return self.prim.error;
                }
            }
        }
        ty
    }

    fn value_type(&mut self, file: FileId, name: &'p str) -> TypeId {
        let cache_key = (file, name.to_string());
        if let Some(&id) = self.values.get(&cache_key) {
            return id;
        }
        let Some(value) = self.scopes[file.index()].values.get(name).cloned() else {
            return self.prim.error;
        };
        let ctx = Ctx::new(file);
        let id = match value {
            LocalValue::Function(decls) => {
                let overloads: Vec<_> = if decls.len() > 1 && decls.iter().any(|d| !d.has_body) {
                    decls.into_iter().filter(|d| !d.has_body).collect()
                } else {
                    decls
                };
                let call_signatures = overloads
                    .iter()
                    .map(|decl| {
                        self.resolve_signature(
                            &ctx,
                            &decl.signature,
                            Some((decl.name.as_str(), decl.name.span)),
                        )
                    })
                    .collect();
                self.alloc(TypeKind::Object(ObjectType {
                    call_signatures,
                    ..ObjectType::default()
                }))
            }
            LocalValue::Variable(decl) => self.variable_type(&ctx, decl),
            LocalValue::Class(decl) => {
                let instance = self.instantiate(file, file, name, Vec::new(), decl.name.span);
                let ctor_ctx = Ctx {
                    this_type: Some(instance),
                    ..ctx.clone()
                };
                let mut signature = match &decl.constructor {
                    Some(constructor) => self.resolve_signature(&ctor_ctx, constructor, None),
                    None => Signature {
                        type_params: Vec::new(),
                        this_type: None,
                        params: Vec::new(),
                        return_type: instance,
                    },
                };
                signature.return_type = instance;
                self.alloc(TypeKind::Object(ObjectType {
                    construct_signatures: vec![signature],
                    ..ObjectType::default()
                }))
            }
            LocalValue::Enum(decl) => {
                let properties = enum_members(decl)
                    .into_iter()
                    .map(|member| Property {
                        name: member.name,
                        ty: self.literal_type(member.value),
                        optional: false,
                        readonly: true,
                        is_method: false,
                        doc: member.doc,
                    })
                    .collect();
                self.alloc(TypeKind::Object(ObjectType {
                    properties,
                    ..ObjectType::default()
                }))
            }
        };
        self.values.insert(cache_key, id);
        id
    }

    fn variable_type(&mut self, ctx: &Ctx, decl: &'p ast::VariableDecl) -> TypeId {
        if let Some(ty) = &decl.ty {
            return self.resolve(ctx, ty);
        }
        match &decl.init {
            Some(ast::Initializer::Literal(literal)) => {
                let literal = literal_of(literal);
                if decl.kind == ast::VariableKind::Const {
                    self.literal_type(literal)
                } else {
                    self.widen(&literal)
                }
            }
            Some(ast::Initializer::Asserted(ty)) => self.resolve(ctx, ty),
            Some(ast::Initializer::Function { signature, .. }) => {
                let signature = self.resolve_signature(
                    ctx,
                    signature,
                    Some((decl.name.as_str(), decl.name.span)),
                );
                self.alloc(TypeKind::Object(ObjectType {
                    call_signatures: vec![signature],
                    ..ObjectType::default()
                }))
            }
            Some(ast::Initializer::Other) | None => {
                self.report(
                    ctx.file,
                    Diagnostic::error(
                        codes::UNINFERABLE_TYPE,
                        format!("cannot infer the type of `{}`", decl.name.name),
                    )
                    .with_span(decl.name.span, "add a type annotation"),
                );
                self.prim.error
            }
        }
    }

    // ========================================================================
    // Type operators
    // ========================================================================

    /// Builds a normalised union.
    fn union(&mut self, members: Vec<TypeId>) -> TypeId {
        let mut flat = Vec::with_capacity(members.len());
        let mut seen = FxHashSet::default();
        self.flatten(&members, true, &mut flat, &mut seen);

        let has = |kind: fn(&TypeKind) -> bool| flat.iter().any(|&m| kind(&self.types[m].kind));
        if has(|k| matches!(k, TypeKind::Any)) {
            return self.prim.any;
        }
        if has(|k| matches!(k, TypeKind::Unknown)) {
            return self.prim.unknown;
        }
        let has_string = has(|k| matches!(k, TypeKind::String));
        let has_number = has(|k| matches!(k, TypeKind::Number));
        let has_bigint = has(|k| matches!(k, TypeKind::BigInt));
        let has_boolean = has(|k| matches!(k, TypeKind::Boolean));
        let both_booleans = has(|k| matches!(k, TypeKind::Literal(LiteralType::Boolean(true))))
            && has(|k| matches!(k, TypeKind::Literal(LiteralType::Boolean(false))));

        let mut normalized = Vec::with_capacity(flat.len());
        let mut boolean_placed = false;
        for member in flat {
            match &self.types[member].kind {
                TypeKind::Never => {}
                TypeKind::Literal(LiteralType::String(_)) if has_string => {}
                TypeKind::Literal(LiteralType::Number(_)) if has_number => {}
                TypeKind::Literal(LiteralType::BigInt(_)) if has_bigint => {}
                TypeKind::Literal(LiteralType::Boolean(_)) if has_boolean => {}
                TypeKind::Literal(LiteralType::Boolean(_)) if both_booleans => {
                    if !boolean_placed {
                        normalized.push(self.prim.boolean);
                        boolean_placed = true;
                    }
                }
                _ => normalized.push(member),
            }
        }

        match normalized.as_slice() {
            [] => self.prim.never,
            [single] => *single,
            _ => self.alloc(TypeKind::Union(normalized)),
        }
    }

    fn intersection(&mut self, members: Vec<TypeId>) -> TypeId {
        let mut flat = Vec::with_capacity(members.len());
        let mut seen = FxHashSet::default();
        self.flatten(&members, false, &mut flat, &mut seen);
        if flat
            .iter()
            .any(|&m| matches!(self.types[m].kind, TypeKind::Never))
        {
            return self.prim.never;
        }
        if flat.iter().any(|&m| matches!(self.types[m].kind, TypeKind::Any)) {
            return self.prim.any;
        }
        flat.retain(|&m| !matches!(self.types[m].kind, TypeKind::Unknown));
        match flat.as_slice() {
            [] => self.prim.unknown,
            [single] => *single,
            _ => self.alloc(TypeKind::Intersection(flat)),
        }
    }

    /// Flattens nested unions (or intersections) and removes duplicates by key.
    fn flatten(
        &self,
        members: &[TypeId],
        union: bool,
        out: &mut Vec<TypeId>,
        seen: &mut FxHashSet<String>,
    ) {
        for &member in members {
            match &self.types[member].kind {
                TypeKind::Union(inner) if union => self.flatten(inner, union, out, seen),
                TypeKind::Intersection(inner) if !union => self.flatten(inner, union, out, seen),
                _ => {
                    if seen.insert(self.type_key(member)) {
                        out.push(member);
                    }
                }
            }
        }
    }

    /// Union members of `id`, with enums expanded to their member literals.
    fn key_members(&mut self, id: TypeId) -> Vec<TypeId> {
        match &self.types[id].kind {
            TypeKind::Union(members) => members.clone(),
            TypeKind::Enum(members) => {
                let values: Vec<LiteralType> = members.iter().map(|m| m.value.clone()).collect();
                values.into_iter().map(|v| self.literal_type(v)).collect()
            }
            _ => vec![id],
        }
    }

    fn literal_keys(&mut self, id: TypeId) -> Vec<String> {
        self.key_members(id)
            .into_iter()
            .filter_map(|m| match &self.types[m].kind {
                TypeKind::Literal(LiteralType::String(s) | LiteralType::Number(s)) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    fn keyof(&mut self, id: TypeId) -> TypeId {
        if matches!(self.types[id].kind, TypeKind::Any) {
            return self.union(vec![self.prim.string, self.prim.number, self.prim.symbol]);
        }
        let mut members: Vec<TypeId> = self
            .properties_of(id)
            .into_iter()
            .map(|p| self.literal_type(LiteralType::String(p.name)))
            .collect();
        let (string, number) = self.index_signatures(id);
        if string.is_some() {
            members.push(self.prim.string);
            members.push(self.prim.number);
        } else if number.is_some() {
            members.push(self.prim.number);
        }
        self.union(members)
    }

    /// Type of a named property, tuple element or string index.
    fn property_type(&self, id: TypeId, name: &str) -> Option<TypeId> {
        if let Some(property) = self.properties_of(id).into_iter().find(|p| p.name == name) {
            return Some(property.ty);
        }
        if let (Some(elements), Ok(index)) = (self.tuple_elements(id), name.parse::<usize>()) {
            return elements.get(index).map(|e| e.ty);
        }
        self.index_signatures(id).0
    }

    fn indexed_access(&mut self, file: FileId, object: TypeId, index: TypeId, span: Span) -> TypeId {
        if self.is_error(object) || self.is_error(index) {
            return self.prim.error;
        }
        let mut results = Vec::new();
        for key in self.key_members(index) {
            let found = match &self.types[key].kind {
                TypeKind::Literal(LiteralType::String(name) | LiteralType::Number(name)) => {
                    let name = name.clone();
                    self.property_type(object, &name)
                }
                TypeKind::Number => match &self.types[object].kind {
                    TypeKind::Array(element) => Some(*element),
                    TypeKind::Tuple(elements) => {
                        let members = elements.iter().map(|e| e.ty).collect();
                        Some(self.union(members))
                    }
                    _ => {
                        let (string, number) = self.index_signatures(object);
                        number.or(string)
                    }
                },
                TypeKind::String => self.index_signatures(object).0,
                _ => None,
            };
            match found {
                Some(ty) => results.push(ty),
                None => {
                    let shown_key = self.display(key);
                    let shown = self.display(object);
                    self.report(
                        file,
                        Diagnostic::error(
                            codes::UNRESOLVED_TYPE,
                            format!("`{shown_key}` cannot index type `{shown}`"),
                        )
                        .with_span(span, "invalid indexed access"),
                    );
                    return self.prim.error;
                }
            }
        }
        self.union(results)
    }

    fn awaited(&mut self, id: TypeId) -> TypeId {
        match &self.types[id].kind {
            TypeKind::Builtin(Builtin::Promise, args) => {
                let inner = args.first().copied().unwrap_or(self.prim.any);
                self.awaited(inner)
            }
            TypeKind::Union(members)
                if members.iter().any(|&m| {
                    matches!(self.types[m].kind, TypeKind::Builtin(Builtin::Promise, _))
                }) =>
            {
                let members = members.clone();
                let awaited = members.into_iter().map(|m| self.awaited(m)).collect();
                self.union(awaited)
            }
            _ => id,
        }
    }

    /// Structural assignability, sufficient for `Exclude` and `Extract`.
    fn is_assignable(&self, source: TypeId, target: TypeId) -> bool {
        if source == target || self.type_key(source) == self.type_key(target) {
            return true;
        }
        match (&self.types[source].kind, &self.types[target].kind) {
            (_, TypeKind::Any | TypeKind::Unknown) | (TypeKind::Never, _) => true,
            (_, TypeKind::Union(members)) => members.iter().any(|&m| self.is_assignable(source, m)),
            (TypeKind::Literal(literal), _) => self.widen(literal) == target,
            (TypeKind::Undefined, TypeKind::Void) => true,
            _ => false,
        }
    }

    fn builtin(&mut self, ctx: &Ctx, name: &str, args: &[TypeId], span: Span) -> Option<TypeId> {
        let first = args.first().copied();
        let ty = match name {
            "Array" | "ReadonlyArray" => {
                let element = first.unwrap_or(self.prim.any);
                self.alloc(TypeKind::Array(element))
            }
            "Awaited" => {
                let inner = first.unwrap_or(self.prim.any);
                self.awaited(inner)
            }
            "Parameters" | "ReturnType" | "ConstructorParameters" | "InstanceType" => {
                self.signature_part(ctx.file, name, first.unwrap_or(self.prim.error), span)
            }
            "Partial" | "Required" | "Readonly" => {
                self.map_properties(name, first.unwrap_or(self.prim.any))
            }
            "NonNullable" => self.strip_nullish(first.unwrap_or(self.prim.any)).0,
            "Record" => self.record(args),
            "Pick" | "Omit" => self.pick(name, args),
            "Exclude" | "Extract" => {
                let (Some(&source), Some(&filter)) = (args.first(), args.get(1)) else {
                    return Some(self.prim.error);
                };
                let keep = name == "Extract";
                let kept = self
                    .key_members(source)
                    .into_iter()
                    .filter(|&m| self.is_assignable(m, filter) == keep)
                    .collect();
                self.union(kept)
            }
            "Capitalize" | "Uncapitalize" | "Uppercase" | "Lowercase" | "String" => self.prim.string,
            "Number" => self.prim.number,
            "Boolean" => self.prim.boolean,
            "BigInt" => self.prim.bigint,
            "Symbol" => self.prim.symbol,
            _ => {
                let builtin = Builtin::from_name(name)?;
                self.alloc(TypeKind::Builtin(builtin, args.to_vec()))
            }
        };
        Some(ty)
    }

    /// `Parameters`, `ReturnType`, `ConstructorParameters` and `InstanceType`.
    fn signature_part(&mut self, file: FileId, name: &str, target: TypeId, span: Span) -> TypeId {
        if self.is_error(target) {
            return target;
        }
        let construct = matches!(name, "ConstructorParameters" | "InstanceType");
        let signatures = if construct {
            self.construct_signatures(target)
        } else {
            self.call_signatures(target)
        };
        // The last overload is the one `tsc` infers from.
        let Some(signature) = signatures.last().cloned() else {
            let shown = self.display(target);
            self.report(
                file,
                Diagnostic::error(
                    codes::UNRESOLVED_TYPE,
                    format!("`{name}` requires a function type, found `{shown}`"),
                )
                .with_span(span, "not callable"),
            );
            return self.prim.error;
        };

        match name {
            "ReturnType" | "InstanceType" => signature.return_type,
            _ => {
                let elements = signature
                    .params
                    .into_iter()
                    .map(|param| TupleElementType {
                        label: Some(param.name),
                        ty: param.ty,
                        optional: param.optional,
                        rest: param.rest,
                    })
                    .collect();
                self.alloc(TypeKind::Tuple(elements))
            }
        }
    }

    fn map_properties(&mut self, name: &str, target: TypeId) -> TypeId {
        if !matches!(
            self.types[target].kind,
            TypeKind::Object(_) | TypeKind::Intersection(_) | TypeKind::TypeParam { .. }
        ) {
            return target;
        }
        let properties = self
            .properties_of(target)
            .into_iter()
            .map(|mut property| {
                match name {
                    "Partial" => property.optional = true,
                    "Required" => property.optional = false,
                    _ => property.readonly = true,
                }
                property
            })
            .collect();
        let (string_index, number_index) = self.index_signatures(target);
        let object = ObjectType {
            properties,
            string_index,
            number_index,
            ..ObjectType::default()
        };
        self.alloc_named(TypeKind::Object(object), name, None, vec![target], None)
    }

    fn record(&mut self, args: &[TypeId]) -> TypeId {
        let (Some(&keys), Some(&value)) = (args.first(), args.get(1)) else {
            return self.prim.error;
        };
        let mut object = ObjectType::default();
        for key in self.key_members(keys) {
            match &self.types[key].kind {
                TypeKind::Literal(LiteralType::String(name) | LiteralType::Number(name)) => {
                    object.properties.push(Property {
                        name: name.clone(),
                        ty: value,
                        optional: false,
                        readonly: false,
                        is_method: false,
                        doc: None,
                    });
                }
                TypeKind::Number => object.number_index = Some(value),
                TypeKind::String | TypeKind::Any => object.string_index = Some(value),
                _ => {}
            }
        }
        self.alloc_named(TypeKind::Object(object), "Record", None, vec![keys, value], None)
    }

    fn pick(&mut self, name: &str, args: &[TypeId]) -> TypeId {
        let (Some(&target), Some(&keys)) = (args.first(), args.get(1)) else {
            return self.prim.error;
        };
        let keys = self.literal_keys(keys);
        let keep = name == "Pick";
        let properties = self
            .properties_of(target)
            .into_iter()
            .filter(|p| keys.contains(&p.name) == keep)
            .collect();
        let object = ObjectType {
            properties,
            ..ObjectType::default()
        };
        self.alloc_named(
            TypeKind::Object(object),
            name,
            None,
            vec![target, args[1]],
            None,
        )
    }
}

fn alias_needs_slot(body: &ast::TypeNode) -> bool {
    matches!(
        body.kind,
        ast::TypeNodeKind::Object(_)
            | ast::TypeNodeKind::Union(_)
            | ast::TypeNodeKind::Intersection(_)
            | ast::TypeNodeKind::Tuple(_)
            | ast::TypeNodeKind::Function { .. }
    )
}

fn literal_of(literal: &ast::Literal) -> LiteralType {
    match literal {
        ast::Literal::String(s) => LiteralType::String(s.clone()),
        ast::Literal::Number(n) => LiteralType::Number(n.clone()),
        ast::Literal::BigInt(n) => LiteralType::BigInt(n.clone()),
        ast::Literal::Boolean(b) => LiteralType::Boolean(*b),
    }
}

/// Enum member values; members without an initializer continue the numbering.
fn enum_members(decl: &ast::EnumDecl) -> Vec<EnumMemberType> {
    let mut next = 0_f64;
    decl.members
        .iter()
        .map(|member| {
            let value = match &member.value {
                Some(ast::Literal::Number(n)) => {
                    next = n.parse::<f64>().unwrap_or(next) + 1.0;
                    LiteralType::Number(n.clone())
                }
                Some(literal) => literal_of(literal),
                None => {
                    let value = next;
                    next += 1.0;
                    LiteralType::Number(format_number(value))
                }
            };
            EnumMemberType {
                name: member.name.name.clone(),
                value,
                doc: member.doc.clone(),
            }
        })
        .collect()
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use crate::program::ProgramBuilder;
    use std::path::{Path, PathBuf};

    fn program(files: &[(&str, &str)]) -> Program {
        let mut host = MemoryHost::new();
        for (path, text) in files {
            host.insert(path, *text);
        }
        let roots: Vec<PathBuf> = files.iter().map(|(p, _)| PathBuf::from(p)).collect();
        ProgramBuilder::new(&host, "/p", Vec::new())
            .build(&roots)
            .unwrap()
    }

    fn file(program: &Program, path: &str) -> FileId {
        program.file_id(Path::new(path)).unwrap()
    }

    #[test]
    fn test_interface_properties() {
        let program = program(&[(
            "/p/a.ts",
            "/** A user. */\nexport interface User { id: string; name?: string; tags: string[] }",
        )]);
        let mut checker = TypeChecker::new(&program);
        let user = checker.exported_type(file(&program, "/p/a.ts"), "User").unwrap();
        assert_eq!(checker.display(user), "User");
        assert_eq!(checker.type_key(user), "User@a.ts");
        assert_eq!(checker.get(user).doc.as_deref(), Some("A user."));

        let properties = checker.properties_of(user);
        let names: Vec<_> = properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "tags"]);
        assert!(properties[1].optional);
        assert_eq!(checker.display(properties[2].ty), "string[]");
    }

    #[test]
    fn test_self_reference_terminates() {
        let program = program(&[(
            "/p/a.ts",
            "export interface Node { value: number; children: Node[]; parent: Node | null }",
        )]);
        let mut checker = TypeChecker::new(&program);
        let node = checker.exported_type(file(&program, "/p/a.ts"), "Node").unwrap();
        let properties = checker.properties_of(node);
        assert_eq!(checker.array_element(properties[1].ty), Some(node));
        let (parent, nullable) = checker.strip_nullish(properties[2].ty);
        assert!(nullable);
        assert_eq!(parent, node);
    }

    #[test]
    fn test_union_normalisation() {
        let program = program(&[(
            "/p/a.ts",
            "export type A = true | false | null;\nexport type B = 'x' | string;\nexport type C = 'a' | 'b' | 'a';",
        )]);
        let mut checker = TypeChecker::new(&program);
        let id = file(&program, "/p/a.ts");
        let a = checker.exported_type(id, "A").unwrap();
        assert_eq!(checker.union_members(a).map(<[_]>::len), Some(2));
        let (stripped, _) = checker.strip_nullish(a);
        assert!(matches!(checker.kind(stripped), TypeKind::Boolean));

        let b = checker.exported_type(id, "B").unwrap();
        assert!(matches!(checker.kind(b), TypeKind::String));
        let c = checker.exported_type(id, "C").unwrap();
        assert_eq!(checker.union_members(c).map(<[_]>::len), Some(2));
    }

    #[test]
    fn test_imports_and_reexports() {
        let program = program(&[
            ("/p/ops/get.ts", "import { User } from '../models';\nexport function Query(id: string): User { return u; }"),
            ("/p/models/index.ts", "export * from './user';"),
            ("/p/models/user.ts", "interface User { id: string }\nexport { User };"),
        ]);
        let mut checker = TypeChecker::new(&program);
        let query = checker
            .exported_value_type(file(&program, "/p/ops/get.ts"), "Query")
            .unwrap();
        let signature = checker.call_signatures(query)[0].clone();
        assert_eq!(signature.params[0].name, "id");
        assert_eq!(checker.type_key(signature.return_type), "User@models/user.ts");
        assert!(checker.diagnostics().is_empty());
    }

    #[test]
    fn test_parameters_and_return_type() {
        let program = program(&[(
            "/p/a.ts",
            "type Ctx = { user: string };\nexport async function Query(this: Ctx, first: string, limit?: number, ...rest: boolean[]): Promise<string[]> { return []; }\nexport type P = Parameters<typeof Query>;\nexport type R = Awaited<ReturnType<typeof Query>>;",
        )]);
        let mut checker = TypeChecker::new(&program);
        let id = file(&program, "/p/a.ts");
        let params = checker.exported_type(id, "P").unwrap();
        let elements = checker.tuple_elements(params).unwrap();
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0].label.as_deref(), Some("first"));
        assert!(elements[1].optional);
        assert!(elements[2].rest);
        let result = checker.exported_type(id, "R").unwrap();
        assert_eq!(checker.display(result), "string[]");
    }

    #[test]
    fn test_generic_instantiation() {
        let program = program(&[(
            "/p/a.ts",
            "interface Page<T> { items: T[]; total: number }\ninterface Post { title: string }\nexport type Posts = Page<Post>;\nexport type Again = Page<Post>;",
        )]);
        let mut checker = TypeChecker::new(&program);
        let id = file(&program, "/p/a.ts");
        let posts = checker.exported_type(id, "Posts").unwrap();
        let again = checker.exported_type(id, "Again").unwrap();
        assert_eq!(posts, again);
        assert_eq!(checker.display(posts), "Page<Post>");
        assert_eq!(checker.type_key(posts), "Page<Post@a.ts>@a.ts");
        let items = checker.properties_of(posts)[0].ty;
        assert_eq!(checker.display(items), "Post[]");
        assert_eq!(checker.type_arguments(posts).len(), 1);
    }

    #[test]
    fn test_mapped_utilities() {
        let program = program(&[(
            "/p/a.ts",
            "interface User { id: string; name: string; age?: number }\nexport type A = Partial<User>;\nexport type B = Pick<User, 'id' | 'name'>;\nexport type C = Omit<User, 'id'>;\nexport type D = Record<'x' | 'y', number>;\nexport type E = Exclude<'a' | 'b' | 'c', 'a'>;\nexport type F = keyof User;\nexport type G = User['age'];",
        )]);
        let mut checker = TypeChecker::new(&program);
        let id = file(&program, "/p/a.ts");

        let a = checker.exported_type(id, "A").unwrap();
        assert!(checker.properties_of(a).iter().all(|p| p.optional));
        assert_eq!(checker.display(a), "Partial<User>");
        let b = checker.exported_type(id, "B").unwrap();
        assert_eq!(checker.properties_of(b).len(), 2);
        let c = checker.exported_type(id, "C").unwrap();
        let names: Vec<_> = checker.properties_of(c).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["name", "age"]);
        let d = checker.exported_type(id, "D").unwrap();
        assert_eq!(checker.properties_of(d).len(), 2);
        let e = checker.exported_type(id, "E").unwrap();
        assert_eq!(checker.display(e), r#""b" | "c""#);
        assert_eq!(checker.union_members(e).map(<[_]>::len), Some(2));
        let f = checker.exported_type(id, "F").unwrap();
        assert_eq!(checker.union_members(f).map(<[_]>::len), Some(3));
        let g = checker.exported_type(id, "G").unwrap();
        assert!(matches!(checker.kind(g), TypeKind::Number));
    }

    #[test]
    fn test_enum_members() {
        let program = program(&[(
            "/p/a.ts",
            "export enum Role { Admin = 'ADMIN', User = 'USER' }\nexport enum Level { Low, Mid = 5, High }\nexport type Admin = Role.Admin;",
        )]);
        let mut checker = TypeChecker::new(&program);
        let id = file(&program, "/p/a.ts");
        let level = checker.exported_type(id, "Level").unwrap();
        let TypeKind::Enum(members) = checker.kind(level) else {
            panic!("expected an enum");
        };
        let values: Vec<_> = members.iter().map(|m| m.value.to_source()).collect();
        assert_eq!(values, vec!["0", "5", "6"]);
        let admin = checker.exported_type(id, "Admin").unwrap();
        assert_eq!(checker.display(admin), "\"ADMIN\"");
    }

    #[test]
    fn test_class_instance_members() {
        let program = program(&[(
            "/p/a.ts",
            "class Base { id: string = ''; }\nexport class User extends Base {\n  private secret = 1;\n  constructor(public name: string, other: number) { super(); }\n  greet(): string { return ''; }\n}",
        )]);
        let mut checker = TypeChecker::new(&program);
        let user = checker.exported_type(file(&program, "/p/a.ts"), "User").unwrap();
        let properties = checker.properties_of(user);
        let names: Vec<_> = properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["name", "greet", "id"]);
        assert!(properties[1].is_method);
    }

    #[test]
    fn test_const_literal_and_missing_annotation() {
        let program = program(&[(
            "/p/a.ts",
            "export const __typename = \"User\";\nexport let n = 1;\nexport const x = compute();\nexport function f() { return 1; }",
        )]);
        let mut checker = TypeChecker::new(&program);
        let id = file(&program, "/p/a.ts");
        assert_eq!(
            checker.exported_literal(id, "__typename"),
            Some(LiteralType::String("User".into()))
        );
        let n = checker.exported_value_type(id, "n").unwrap();
        assert!(matches!(checker.kind(n), TypeKind::Number));
        let x = checker.exported_value_type(id, "x").unwrap();
        assert!(checker.is_error(x));
        let f = checker.exported_value_type(id, "f").unwrap();
        assert!(checker.is_error(checker.call_signatures(f)[0].return_type));

        let found: Vec<_> = checker.diagnostics().iter().map(|d| d.diagnostic.code).collect();
        assert_eq!(found, vec![codes::UNINFERABLE_TYPE, codes::UNINFERABLE_TYPE]);
    }

    #[test]
    fn test_unresolved_and_circular() {
        let program = program(&[(
            "/p/a.ts",
            "import { Ext } from 'some-package';\nexport type A = Missing;\nexport type B = C;\ntype C = B;\nexport type D = Ext;",
        )]);
        let mut checker = TypeChecker::new(&program);
        let id = file(&program, "/p/a.ts");
        let a = checker.exported_type(id, "A").unwrap();
        assert!(checker.is_error(a));
        let b = checker.exported_type(id, "B").unwrap();
        assert!(checker.is_error(b));
        let d = checker.exported_type(id, "D").unwrap();
        assert!(checker.is_error(d));

        let found: Vec<_> = checker.diagnostics().iter().map(|d| d.diagnostic.code).collect();
        assert_eq!(found, vec![codes::UNRESOLVED_TYPE, codes::CIRCULAR_ALIAS]);
    }

    #[test]
    fn test_overloads_use_declarations_without_body() {
        let program = program(&[(
            "/p/a.ts",
            "export function f(a: string): string;\nexport function f(a: number): number;\nexport function f(a: any): any { return a; }",
        )]);
        let mut checker = TypeChecker::new(&program);
        let f = checker.exported_value_type(file(&program, "/p/a.ts"), "f").unwrap();
        assert_eq!(checker.call_signatures(f).len(), 2);
        assert_eq!(checker.display(f), "{ (a: string): string; (a: number): number; }");
    }

    #[test]
    fn test_async_generator_item() {
        let program = program(&[(
            "/p/a.ts",
            "export async function* Subscription(): AsyncGenerator<{ count: number }> { yield { count: 1 }; }\nexport type R = Awaited<ReturnType<typeof Subscription>>;",
        )]);
        let mut checker = TypeChecker::new(&program);
        let r = checker.exported_type(file(&program, "/p/a.ts"), "R").unwrap();
        let item = checker.async_iterable_item(r).unwrap();
        assert_eq!(checker.display(item), "{ count: number; }");
    }

    #[test]
    fn test_intersection_merges_properties() {
        let program = program(&[(
            "/p/a.ts",
            "type A = { a: string };\ntype B = { b: number; a: boolean };\nexport type AB = A & B;",
        )]);
        let mut checker = TypeChecker::new(&program);
        let ab = checker.exported_type(file(&program, "/p/a.ts"), "AB").unwrap();
        assert!(checker.intersection_members(ab).is_some());
        let properties = checker.properties_of(ab);
        assert_eq!(properties.len(), 2);
        assert!(matches!(checker.kind(properties[0].ty), TypeKind::String));
    }
}
