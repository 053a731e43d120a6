//! The meta gatherer.
//!
//! Every operation file gets a probe companion that re-exports the inferred
//! parameter tuple and awaited return type of its operation function:
//!
//! ```ts
//! import { Query } from "./get";
//! export type RESOLVER = [Parameters<typeof Query>, Awaited<ReturnType<typeof Query>>];
//! ```
//!
//! The gatherer resolves `RESOLVER` through the [`TypeChecker`] and walks the
//! resulting types depth first. A [`TypeMeta`] is registered in the
//! [`Collector`] under its identity key before its children are walked, so a
//! reference back to a type that is still being populated returns the
//! existing id and cycles terminate.

use crate::error::{GenerateError, StructureError};
use crate::naming::{self, is_valid_name, operation_name, pascal_case, protocol_friendly, Namer};
use crate::options::GeneratorOptions;
use fngql_checker::{
    Builtin, ConfigError, LiteralType, Primitives, Program, ProgramBuilder, ProgramError,
    ProjectConfig, SourceHost, TupleElementType, TypeChecker, TypeId, TypeKind, PROBE_SUFFIX,
};
use fngql_collector::{
    ArgumentMeta, Collector, CustomScalar, EnumValueMeta, ExtendedTypeMeta, FieldMeta, MetaId,
    MetaKind, MetaPath, OperationKind, OperationMeta, SchemaMeta, TupleElementMeta, TypeMeta,
    TypeRef, Warning,
};
use fngql_core::Arena;
use fngql_syntax::{scan_exports, ExportKind};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Nesting depth at which the walk gives up on a type.
const MAX_WALK_DEPTH: usize = 64;

/// An operation file found by the export scan.
#[derive(Debug, Clone)]
pub struct OperationFile {
    pub path: PathBuf,
    pub kind: OperationKind,
    pub name: String,
}

/// A type-extension file `types/<Name>.ts`.
#[derive(Debug, Clone)]
pub struct ExtensionFile {
    pub path: PathBuf,
    pub type_name: String,
    pub fields: Vec<String>,
}

/// Gathers the schema metadata of a project.
pub fn gather_meta(
    host: &dyn SourceHost,
    options: &GeneratorOptions,
    config: &ProjectConfig,
    collector: &mut Collector,
) -> Result<SchemaMeta, GenerateError> {
    let operations = discover_operations(host, &options.operations_path())?;
    let extensions = discover_extensions(host, &options.types_path())?;
    tracing::info!(
        operations = operations.len(),
        extensions = extensions.len(),
        "discovered sources"
    );

    let mut probes = FxHashMap::default();
    let mut files = Vec::new();
    for operation in &operations {
        probes.insert(operation.path.clone(), operation_probe(&operation.path, operation.kind));
        files.push(operation.path.clone());
    }
    for extension in &extensions {
        probes.insert(extension.path.clone(), extension_probe(&extension.path, &extension.fields));
        files.push(extension.path.clone());
    }

    let program = ProgramBuilder::new(host, options.root_path(), config.paths.clone())
        .with_base_url(config.base_url.clone())
        .with_helper(move |path: &Path, _: &str| probes.get(path).cloned())
        .build(&files)?;
    let mut warnings = program_warnings(&program);

    let mut gatherer = Gatherer::new(TypeChecker::new(&program), collector, options);
    gatherer.warnings.append(&mut warnings);

    let mut gathered = Vec::new();
    for operation in &operations {
        if let Some(meta) = gatherer.gather_operation(operation) {
            gathered.push(meta);
        }
    }
    gatherer.normalize();
    gatherer.name_types();

    let mut extended = Vec::new();
    for extension in &extensions {
        if let Some(meta) = gatherer.gather_extension(extension)? {
            extended.push(meta);
        }
    }
    gatherer.normalize();
    gatherer.name_types();

    Ok(gatherer.finish(gathered, extended))
}

/// Finds the operation files below `dir`.
pub fn discover_operations(
    host: &dyn SourceHost,
    dir: &Path,
) -> Result<Vec<OperationFile>, GenerateError> {
    let paths = host.list_files(dir).map_err(|err| {
        ConfigError::Invalid(format!(
            "cannot read operations directory `{}`: {err}",
            dir.display()
        ))
    })?;

    let mut found: Vec<OperationFile> = Vec::new();
    for path in paths.into_iter().filter(|p| is_source_file(p)) {
        let text = host.read(&path).map_err(|source| ProgramError::Read {
            path: path.clone(),
            source,
        })?;
        let exports = scan_exports(&text);
        let mut kinds = exports
            .iter()
            .filter_map(|export| OperationKind::from_export_name(&export.name));
        let Some(kind) = kinds.next() else {
            tracing::debug!(file = %path.display(), "no operation export, skipped");
            continue;
        };
        if let Some(other) = kinds.next() {
            tracing::warn!(
                file = %path.display(),
                "file exports both `{kind}` and `{other}`; using `{kind}`"
            );
        }

        let relative = path.strip_prefix(dir).unwrap_or(path.as_path());
        let name = operation_name(relative);
        if let Some(first) = found.iter().find(|o| o.kind == kind && o.name == name) {
            return Err(StructureError::DuplicateOperation {
                kind: kind.as_str(),
                name,
                first: first.path.display().to_string(),
                second: path.display().to_string(),
            }
            .into());
        }
        found.push(OperationFile { path, kind, name });
    }
    Ok(found)
}

/// Finds the type-extension files in `dir`. A missing directory means none.
pub fn discover_extensions(
    host: &dyn SourceHost,
    dir: &Path,
) -> Result<Vec<ExtensionFile>, GenerateError> {
    let Ok(paths) = host.list_files(dir) else {
        tracing::debug!(dir = %dir.display(), "no types directory");
        return Ok(Vec::new());
    };

    let mut found = Vec::new();
    for path in paths.into_iter().filter(|p| is_source_file(p)) {
        let Some(type_name) = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
        else {
            continue;
        };
        if !is_valid_name(&type_name) {
            tracing::warn!(file = %path.display(), "`{type_name}` is not a type name, skipped");
            continue;
        }

        let text = host.read(&path).map_err(|source| ProgramError::Read {
            path: path.clone(),
            source,
        })?;
        let mut fields: Vec<String> = Vec::new();
        for export in scan_exports(&text) {
            let is_value = matches!(
                export.kind,
                ExportKind::Function
                    | ExportKind::Generator
                    | ExportKind::Variable
                    | ExportKind::Specifier
            );
            if is_value
                && export.name != "default"
                && !export.name.starts_with("__")
                && !fields.contains(&export.name)
            {
                fields.push(export.name);
            }
        }
        if fields.is_empty() {
            continue;
        }
        found.push(ExtensionFile {
            path,
            type_name,
            fields,
        });
    }
    Ok(found)
}

fn is_source_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    (name.ends_with(".ts") || name.ends_with(".tsx"))
        && !name.ends_with(".d.ts")
        && !name.contains(PROBE_SUFFIX)
}

fn module_specifier(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("./{stem}")
}

/// Probe text exposing the signature of an operation function.
#[must_use]
pub fn operation_probe(path: &Path, kind: OperationKind) -> String {
    format!(
        "import {{ {kind} }} from \"{module}\";\n\
         export type RESOLVER = [Parameters<typeof {kind}>, Awaited<ReturnType<typeof {kind}>>];\n",
        module = module_specifier(path),
    )
}

/// Probe text exposing the signatures of the field functions of a type-extension file.
#[must_use]
pub fn extension_probe(path: &Path, fields: &[String]) -> String {
    let mut text = format!(
        "import {{ {} }} from \"{}\";\nexport type FIELDS = {{\n",
        fields.join(", "),
        module_specifier(path)
    );
    for field in fields {
        let _ = writeln!(
            text,
            "  {field}: [Parameters<typeof {field}>, Awaited<ReturnType<typeof {field}>>];"
        );
    }
    text.push_str("};\n");
    text
}

fn program_warnings(program: &Program) -> Vec<Warning> {
    let mut warnings = Vec::new();
    for entry in program.diagnostics() {
        let location = match entry.diagnostic.primary_span() {
            Some(span) => program.location(entry.file, span),
            None => program.display_path(entry.file),
        };
        if entry.diagnostic.is_error() {
            tracing::warn!("{location}: {}", entry.diagnostic);
            warnings.push(Warning::new(entry.diagnostic.to_string()).in_file(location));
        } else {
            tracing::debug!("{location}: {}", entry.diagnostic);
        }
    }
    warnings
}

/// How a checker type maps onto the schema.
enum Shape {
    Scalar {
        name: &'static str,
        hint: Option<&'static str>,
    },
    Enum(Vec<EnumValueMeta>),
    Union(Vec<TypeId>),
    Object,
    Tuple(Vec<TupleElementType>),
    /// Callable or index-signature-only types; always a custom scalar.
    Opaque,
}

impl Shape {
    const fn scalar(name: &'static str, hint: Option<&'static str>) -> Self {
        Self::Scalar { name, hint }
    }

    const fn kind(&self) -> MetaKind {
        match self {
            Self::Scalar { .. } | Self::Opaque => MetaKind::Scalar,
            Self::Enum(_) => MetaKind::Enum,
            Self::Union(_) => MetaKind::Union,
            Self::Object => MetaKind::Object,
            Self::Tuple(_) => MetaKind::Tuple,
        }
    }
}

struct Gatherer<'a, 'p> {
    checker: TypeChecker<'p>,
    prim: Primitives,
    collector: &'a mut Collector,
    options: &'a GeneratorOptions,
    metas: Arena<TypeMeta>,
    namer: Namer,
    warnings: Vec<Warning>,
    /// Display path of the file being gathered.
    file: String,
    depth: usize,
}

impl<'a, 'p> Gatherer<'a, 'p> {
    fn new(
        checker: TypeChecker<'p>,
        collector: &'a mut Collector,
        options: &'a GeneratorOptions,
    ) -> Self {
        let prim = checker.primitives();
        Self {
            checker,
            prim,
            collector,
            options,
            metas: Arena::new(),
            namer: Namer::new(),
            warnings: Vec::new(),
            file: String::new(),
            depth: 0,
        }
    }

    fn warn(&mut self, path: &MetaPath, message: impl Into<String>) {
        let warning = Warning::new(message).in_file(self.file.clone()).at(path);
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    // ========================================================================
    // Operations
    // ========================================================================

    fn gather_operation(&mut self, operation: &OperationFile) -> Option<OperationMeta> {
        let program = self.checker.program();
        let file = program.file_id(&operation.path)?;
        self.file = program.display_path(file);
        let root = MetaPath::root(operation.name.clone());
        if program.has_errors_in(file) {
            self.warn(&root, "file has syntax errors, skipped");
            return None;
        }
        let probe = program.probe_of(&operation.path)?;

        let kind = operation.kind;
        let signature = self
            .checker
            .exported_type(probe, "RESOLVER")
            .and_then(|resolver| self.checker.tuple_elements(resolver).map(<[_]>::to_vec))
            .unwrap_or_default();
        let [params, result] = signature.as_slice() else {
            self.warn(&root, format!("cannot infer the signature of `{kind}`, skipped"));
            return None;
        };
        let (params, mut result) = (params.ty, result.ty);
        let Some(params) = self.checker.tuple_elements(params).map(<[_]>::to_vec) else {
            self.warn(&root, format!("cannot infer the parameters of `{kind}`, skipped"));
            return None;
        };
        if self.checker.is_error(result) {
            self.warn(&root, format!("cannot infer the return type of `{kind}`, skipped"));
            return None;
        }
        if kind == OperationKind::Subscription {
            let Some(item) = self.checker.async_iterable_item(result) else {
                let shown = self.checker.display(result);
                self.warn(
                    &root,
                    format!("`Subscription` must return an async iterable, found `{shown}`; skipped"),
                );
                return None;
            };
            result = item;
        }

        let mut args = Vec::new();
        for (i, param) in params.iter().enumerate() {
            let name = param.label.clone().unwrap_or_else(|| format!("arg{i}"));
            let path = root.child("args").child(name.clone());
            if param.rest {
                self.warn(&path, format!("rest parameter `{name}` is not supported, skipped"));
                continue;
            }
            let hint = format!("{}{}", pascal_case(&operation.name), pascal_case(&name));
            match self.walk(param.ty, &path, None, &hint) {
                Some(ty) => args.push(ArgumentMeta {
                    name,
                    description: None,
                    ty: TypeRef {
                        meta: ty.meta,
                        is_non_null: ty.is_non_null && !param.optional,
                    },
                }),
                None => {
                    self.warn(&root, format!("cannot resolve the type of argument `{name}`, skipped"));
                    return None;
                }
            }
        }

        let path = root.child("return");
        let Some(result) = self.walk(result, &path, None, &pascal_case(&operation.name)) else {
            self.warn(&root, "cannot resolve the result type, skipped");
            return None;
        };

        let typename = match self.checker.exported_literal(file, "__typename") {
            Some(LiteralType::String(name)) => Some(name),
            _ => None,
        };
        if let Some(typename) = &typename {
            let target = self.named_type(result.meta);
            if self.metas[target].is_object() && !self.metas[target].is_input {
                self.metas[target].forced_name = Some(typename.clone());
            } else {
                self.warn(&root, "`__typename` ignored: the result is not an object type");
            }
        }

        tracing::debug!(operation = %operation.name, %kind, "gathered operation");
        Some(OperationMeta {
            path: operation.path.clone(),
            file: self.file.clone(),
            kind,
            name: operation.name.clone(),
            description: self.checker.exported_value_doc(file, kind.as_str()),
            args,
            result,
            typename,
        })
    }

    // ========================================================================
    // Type extensions
    // ========================================================================

    fn gather_extension(
        &mut self,
        extension: &ExtensionFile,
    ) -> Result<Option<ExtendedTypeMeta>, StructureError> {
        let program = self.checker.program();
        let Some(file) = program.file_id(&extension.path) else {
            return Ok(None);
        };
        self.file = program.display_path(file);
        let type_name = extension.type_name.as_str();
        let root = MetaPath::root(type_name);
        if program.has_errors_in(file) {
            self.warn(&root, "file has syntax errors, skipped");
            return Ok(None);
        }
        let target = self.find_output_object(type_name)?;
        let Some(probe) = program.probe_of(&extension.path) else {
            return Ok(None);
        };
        let Some(fields_type) = self.checker.exported_type(probe, "FIELDS") else {
            return Ok(None);
        };

        let shape = self.object_shape(target);
        let properties = self.checker.properties_of(fields_type);
        let mut added = Vec::new();
        for field_name in &extension.fields {
            let root = MetaPath::root(format!("{type_name}.{field_name}"));
            let signature = properties
                .iter()
                .find(|p| &p.name == field_name)
                .and_then(|p| self.checker.tuple_elements(p.ty).map(<[_]>::to_vec))
                .unwrap_or_default();
            let [params, result] = signature.as_slice() else {
                self.warn(&root, "cannot infer the signature of the field function, skipped");
                continue;
            };
            let (params, result) = (params.ty, result.ty);
            if self.checker.is_error(result) {
                self.warn(&root, "cannot infer the return type of the field function, skipped");
                continue;
            }

            let params = self
                .checker
                .tuple_elements(params)
                .map(<[_]>::to_vec)
                .unwrap_or_default();
            let mut args = Vec::new();
            if let Some(arg_param) = params.get(1) {
                let (arg_type, _) = self.unwrap(arg_param.ty);
                for property in self.checker.properties_of(arg_type) {
                    let path = root.child("args").child(property.name.clone());
                    let hint = format!(
                        "{type_name}{}{}",
                        pascal_case(field_name),
                        pascal_case(&property.name)
                    );
                    match self.walk(property.ty, &path, None, &hint) {
                        Some(ty) => args.push(ArgumentMeta {
                            name: property.name,
                            description: property.doc,
                            ty: TypeRef {
                                meta: ty.meta,
                                is_non_null: ty.is_non_null && !property.optional,
                            },
                        }),
                        None => self.warn(&path, "cannot resolve the argument type, skipped"),
                    }
                }
            }

            let hint = format!("{type_name}{}", pascal_case(field_name));
            let Some(ty) = self.walk(result, &root.child("return"), Some(target), &hint) else {
                self.warn(&root, "cannot resolve the result type, skipped");
                continue;
            };
            let field = FieldMeta {
                name: field_name.clone(),
                description: self.checker.exported_value_doc(file, field_name),
                ty,
                args,
            };
            let fields = &mut self.metas[target].fields;
            match fields.iter_mut().find(|f| f.name == field.name) {
                Some(existing) => *existing = field,
                None => fields.push(field),
            }
            added.push(field_name.clone());
        }

        tracing::debug!(r#type = type_name, fields = added.len(), "extended type");
        Ok(Some(ExtendedTypeMeta {
            name: type_name.to_string(),
            path: extension.path.clone(),
            file: self.file.clone(),
            meta: target,
            fields: added,
            shape,
        }))
    }

    fn find_output_object(&self, name: &str) -> Result<MetaId, StructureError> {
        let mut candidates = self
            .metas
            .iter()
            .filter(|(_, meta)| meta.named && !meta.is_input && !meta.is_list() && meta.name == name)
            .peekable();
        if candidates.peek().is_none() {
            return Err(StructureError::MissingExtendedType {
                name: name.to_string(),
                file: self.file.clone(),
            });
        }
        candidates
            .find(|(_, meta)| meta.is_object())
            .map(|(id, _)| id)
            .ok_or_else(|| StructureError::NotAnObjectType {
                name: name.to_string(),
                file: self.file.clone(),
            })
    }

    /// TypeScript shape of an object meta, from its current fields.
    fn object_shape(&self, id: MetaId) -> String {
        let mut shape = String::from("{ ");
        for field in &self.metas[id].fields {
            let ty = &self.metas[field.ty.meta].ts_type;
            if field.ty.is_non_null {
                let _ = write!(shape, "{}: {ty}; ", field.name);
            } else {
                let _ = write!(shape, "{}?: {ty} | null; ", field.name);
            }
        }
        shape.push('}');
        shape
    }

    // ========================================================================
    // Walk
    // ========================================================================

    /// Removes nullish arms and unwraps promises and type parameters.
    fn unwrap(&mut self, ty: TypeId) -> (TypeId, bool) {
        let mut current = ty;
        let mut nullable = false;
        for _ in 0..16 {
            let (stripped, removed) = self.checker.strip_nullish(current);
            nullable |= removed;
            current = match self.checker.kind(stripped) {
                TypeKind::Builtin(Builtin::Promise, args) => {
                    args.first().copied().unwrap_or(self.prim.any)
                }
                TypeKind::TypeParam { constraint, .. } => constraint.unwrap_or(self.prim.unknown),
                _ => {
                    current = stripped;
                    break;
                }
            };
        }
        nullable |= self.checker.is_nullish(current);
        (current, nullable)
    }

    fn walk(
        &mut self,
        ty: TypeId,
        path: &MetaPath,
        parent: Option<MetaId>,
        hint: &str,
    ) -> Option<TypeRef> {
        let (ty, nullable) = self.unwrap(ty);
        if self.checker.is_error(ty) {
            return None;
        }
        let meta = self.walk_stripped(ty, path, parent, hint)?;
        Some(TypeRef {
            meta,
            is_non_null: !nullable,
        })
    }

    fn walk_stripped(
        &mut self,
        ty: TypeId,
        path: &MetaPath,
        parent: Option<MetaId>,
        hint: &str,
    ) -> Option<MetaId> {
        if self.checker.array_element(ty).is_some() {
            return self.walk_list(ty, path, parent, hint);
        }

        let shape = self.classify(ty);
        let identity = match &shape {
            Shape::Scalar { name, .. } => format!("scalar:{name}"),
            Shape::Enum(_) => self.checker.type_key(ty),
            _ if path.is_input() => format!("{}#input", self.checker.type_key(ty)),
            _ => self.checker.type_key(ty),
        };
        self.collector.add_type_reference(&identity, path.clone());
        if let Some(existing) = self.collector.get_type(&identity) {
            return Some(existing);
        }
        if self.depth >= MAX_WALK_DEPTH {
            self.warn(path, "type is nested too deeply, skipped");
            return None;
        }

        self.depth += 1;
        let id = self.create(ty, shape, identity, path, parent, hint);
        self.depth -= 1;
        Some(id)
    }

    /// Folds nested arrays into one list meta over the innermost element.
    fn walk_list(
        &mut self,
        ty: TypeId,
        path: &MetaPath,
        parent: Option<MetaId>,
        hint: &str,
    ) -> Option<MetaId> {
        let mut levels = Vec::new();
        let mut current = ty;
        while let Some(element) = self.checker.array_element(current) {
            let (element, nullable) = self.unwrap(element);
            levels.push(!nullable);
            current = element;
        }
        if self.checker.is_error(current) {
            return None;
        }
        let element = self.walk_stripped(current, path, parent, hint)?;

        let markers: String = levels
            .iter()
            .map(|&non_null| if non_null { "[!]" } else { "[]" })
            .collect();
        let identity = format!("{markers}{}", self.metas[element].identity);
        self.collector.add_type_reference(&identity, path.clone());
        if let Some(existing) = self.collector.get_type(&identity) {
            return Some(existing);
        }

        let element_meta = &self.metas[element];
        let operand = &element_meta.ts_type;
        let operand = if operand.contains(" | ") || operand.contains(" & ") || operand.contains("=>") {
            format!("({operand})")
        } else {
            operand.clone()
        };
        let depth = u32::try_from(levels.len()).unwrap_or(u32::MAX);
        let mut meta = TypeMeta::new(
            identity.clone(),
            element_meta.name.clone(),
            format!("{operand}{}", "[]".repeat(levels.len())),
            element_meta.kind,
        )
        .with_input(element_meta.is_input)
        .with_parent(parent);
        meta.is_list = depth;
        meta.item_non_null = levels;
        meta.of_type = Some(element);

        let id = self.metas.alloc(meta);
        self.collector.add_type(&identity, id);
        Some(id)
    }

    fn classify(&self, ty: TypeId) -> Shape {
        let number = self.options.number_scalar.as_str();
        match self.checker.kind(ty) {
            TypeKind::Any
            | TypeKind::Unknown
            | TypeKind::NonPrimitive
            | TypeKind::Symbol
            | TypeKind::TypeParam { .. }
            | TypeKind::Unresolved
            | TypeKind::Pending => Shape::scalar("JSON", None),
            TypeKind::Never | TypeKind::Void | TypeKind::Undefined | TypeKind::Null => {
                Shape::scalar("Void", Some("void"))
            }
            TypeKind::String => Shape::scalar("String", None),
            TypeKind::Number => Shape::scalar(number, None),
            TypeKind::Boolean => Shape::scalar("Boolean", None),
            TypeKind::BigInt => Shape::scalar("BigInt", Some("bigint")),
            TypeKind::Literal(literal) => match literal {
                LiteralType::String(value) => Shape::Enum(vec![EnumValueMeta {
                    name: value.clone(),
                    literal: literal.to_source(),
                    description: None,
                }]),
                LiteralType::Number(_) => Shape::scalar(number, None),
                LiteralType::Boolean(_) => Shape::scalar("Boolean", None),
                LiteralType::BigInt(_) => Shape::scalar("BigInt", Some("bigint")),
            },
            TypeKind::Union(members) => {
                let values: Option<Vec<EnumValueMeta>> = members
                    .iter()
                    .map(|member| {
                        let literal = self.checker.literal(*member)?;
                        let LiteralType::String(value) = literal else {
                            return None;
                        };
                        Some(EnumValueMeta {
                            name: value.clone(),
                            literal: literal.to_source(),
                            description: self.checker.get(*member).doc.clone(),
                        })
                    })
                    .collect();
                match values {
                    Some(values) => Shape::Enum(values),
                    None => Shape::Union(members.clone()),
                }
            }
            TypeKind::Intersection(_) => Shape::Object,
            TypeKind::Object(object) => {
                let structural = !object.call_signatures.is_empty()
                    || !object.construct_signatures.is_empty()
                    || object.string_index.is_some()
                    || object.number_index.is_some();
                if object.properties.is_empty() && object.bases.is_empty() && structural {
                    Shape::Opaque
                } else {
                    Shape::Object
                }
            }
            TypeKind::Array(_) => Shape::Opaque,
            TypeKind::Tuple(elements) => Shape::Tuple(elements.clone()),
            TypeKind::Enum(members) => Shape::Enum(
                members
                    .iter()
                    .map(|member| EnumValueMeta {
                        name: match &member.value {
                            LiteralType::String(value) => value.clone(),
                            other => other.to_source(),
                        },
                        literal: member.value.to_source(),
                        description: member.doc.clone(),
                    })
                    .collect(),
            ),
            TypeKind::Builtin(builtin, _) => match builtin {
                Builtin::Date => Shape::scalar("Date", Some("Date")),
                Builtin::RegExp | Builtin::Error | Builtin::Map | Builtin::Set => {
                    Shape::scalar(builtin.as_str(), Some(builtin.as_str()))
                }
                _ => Shape::scalar("JSON", None),
            },
        }
    }

    fn create(
        &mut self,
        ty: TypeId,
        shape: Shape,
        identity: String,
        path: &MetaPath,
        parent: Option<MetaId>,
        hint: &str,
    ) -> MetaId {
        let ts_type = self.checker.display(ty);
        let mut meta = match &shape {
            Shape::Scalar { name, hint } => {
                let mut meta = TypeMeta::new(identity.clone(), *name, ts_type, MetaKind::Scalar);
                meta.scalar_hint = hint.map(str::to_string);
                meta
            }
            _ => {
                let declared = self.checker.get(ty).name.is_some();
                let original_name = declared.then(|| ts_type.clone());
                let name = original_name
                    .as_deref()
                    .map_or_else(|| hint.to_string(), protocol_friendly);
                let positional = !matches!(shape, Shape::Enum(_));
                let mut meta = TypeMeta::new(identity.clone(), name, ts_type.clone(), shape.kind())
                    .with_input(positional && path.is_input())
                    .with_description(self.checker.get(ty).doc.clone());
                meta.original_name = original_name;
                if matches!(shape, Shape::Opaque) {
                    meta.degraded = true;
                    meta.scalar_hint = Some(ts_type);
                }
                meta
            }
        };
        meta.parent_type = parent;

        let id = self.metas.alloc(meta);
        self.collector.add_type(&identity, id);
        tracing::trace!(identity = %identity, path = %path, "registered type");

        match shape {
            Shape::Scalar { .. } | Shape::Opaque => {}
            Shape::Enum(values) => self.metas[id].enum_values = values,
            Shape::Union(members) => self.populate_union(id, members, path),
            Shape::Object => self.populate_object(id, ty, path),
            Shape::Tuple(elements) => self.populate_tuple(id, &elements, path),
        }
        id
    }

    fn populate_union(&mut self, id: MetaId, members: Vec<TypeId>, path: &MetaPath) {
        let own_name = self.metas[id].name.clone();
        let mut possible = Vec::new();
        for (i, member) in members.into_iter().enumerate() {
            let hint = format!("{own_name}Variant{}", i + 1);
            match self.walk(member, path, Some(id), &hint) {
                Some(ty) => possible.push(TypeRef::non_null(ty.meta)),
                None => self.warn(path, "cannot resolve a union member, skipped"),
            }
        }
        self.metas[id].possible_types = possible;
    }

    fn populate_tuple(&mut self, id: MetaId, elements: &[TupleElementType], path: &MetaPath) {
        let own_name = self.metas[id].name.clone();
        let mut walked = Vec::new();
        for (i, element) in elements.iter().enumerate() {
            let hint = format!("{own_name}Item{}", i + 1);
            if let Some(ty) = self.walk(element.ty, &path.child(i.to_string()), Some(id), &hint) {
                walked.push(TupleElementMeta {
                    label: element.label.clone(),
                    ty: TypeRef {
                        meta: ty.meta,
                        is_non_null: ty.is_non_null && !element.optional,
                    },
                });
            }
        }
        self.metas[id].tuple_elements = walked;
    }

    fn populate_object(&mut self, id: MetaId, ty: TypeId, path: &MetaPath) {
        let own_name = self.metas[id].name.clone();

        // Type arguments and intersection members are walked for registration only.
        let arguments = self.checker.type_arguments(ty).to_vec();
        for (i, argument) in arguments.into_iter().enumerate() {
            let hint = format!("{own_name}Arg{}", i + 1);
            let _ = self.walk(argument, &path.child(format!("<{i}>")), Some(id), &hint);
        }
        if let Some(members) = self.checker.intersection_members(ty).map(<[_]>::to_vec) {
            for (i, member) in members.into_iter().enumerate() {
                let hint = format!("{own_name}Part{}", i + 1);
                let _ = self.walk(member, &path.child(format!("&{i}")), Some(id), &hint);
            }
        }

        let mut fields = Vec::new();
        for property in self.checker.properties_of(ty) {
            let field_path = path.child(property.name.clone());
            let hint = format!("{own_name}{}", pascal_case(&property.name));
            if property.is_method {
                self.walk_signatures(property.ty, &field_path, id, &hint);
                continue;
            }
            match self.walk(property.ty, &field_path, Some(id), &hint) {
                Some(ty) => fields.push(FieldMeta {
                    name: property.name,
                    description: property.doc,
                    ty: TypeRef {
                        meta: ty.meta,
                        is_non_null: ty.is_non_null && !property.optional,
                    },
                    args: Vec::new(),
                }),
                None => self.warn(
                    &field_path,
                    format!("cannot resolve the type of property `{}`, skipped", property.name),
                ),
            }
        }

        let (string_index, number_index) = self.checker.index_signatures(ty);
        for (segment, value) in [("[string]", string_index), ("[number]", number_index)] {
            if let Some(value) = value {
                let hint = format!("{own_name}Value");
                let _ = self.walk(value, &path.child(segment), Some(id), &hint);
            }
        }
        self.walk_signatures(ty, path, id, &own_name);

        let meta = &mut self.metas[id];
        if meta.is_input {
            meta.input_fields = fields;
        } else {
            meta.fields = fields;
        }
    }

    /// Walks parameter, return and type parameter types of call and construct signatures.
    fn walk_signatures(&mut self, ty: TypeId, path: &MetaPath, parent: MetaId, hint: &str) {
        let mut signatures = self.checker.call_signatures(ty).to_vec();
        signatures.extend(self.checker.construct_signatures(ty).iter().cloned());
        for signature in signatures {
            for type_param in signature.type_params {
                let _ = self.walk(type_param, &path.child("<T>"), Some(parent), hint);
            }
            for param in &signature.params {
                let hint = format!("{hint}{}", pascal_case(&param.name));
                let _ = self.walk(param.ty, &path.child(param.name.clone()), Some(parent), &hint);
            }
            let hint = format!("{hint}Result");
            let _ = self.walk(signature.return_type, &path.child("()"), Some(parent), &hint);
        }
    }

    fn named_type(&self, id: MetaId) -> MetaId {
        match self.metas[id].of_type {
            Some(element) if self.metas[id].is_list() => element,
            _ => id,
        }
    }

    // ========================================================================
    // Post-processing
    // ========================================================================

    /// Turns types without a native schema construct into custom scalars.
    fn normalize(&mut self) {
        let ids: Vec<MetaId> = self.metas.iter().map(|(id, _)| id).collect();
        loop {
            let mut changed = false;
            for &id in &ids {
                let meta = &self.metas[id];
                if meta.is_list() || meta.degraded {
                    continue;
                }
                let degrade = match meta.kind {
                    MetaKind::Scalar => false,
                    MetaKind::Tuple => true,
                    MetaKind::Enum => {
                        meta.enum_values.is_empty()
                            || meta.enum_values.iter().any(|v| !is_valid_name(&v.name))
                    }
                    MetaKind::Object => meta.active_fields().is_empty(),
                    MetaKind::Union => {
                        meta.is_input
                            || meta.possible_types.is_empty()
                            || meta.possible_types.iter().any(|member| {
                                let member = &self.metas[member.meta];
                                member.is_list() || !member.is_object() || member.degraded
                            })
                    }
                };
                if degrade {
                    let meta = &mut self.metas[id];
                    tracing::debug!(r#type = %meta.ts_type, "rendering as a custom scalar");
                    meta.kind = MetaKind::Scalar;
                    meta.degraded = true;
                    meta.scalar_hint = Some(meta.ts_type.clone());
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        for &id in &ids {
            if let Some(element) = self.metas[id].of_type {
                let (kind, degraded) = (self.metas[element].kind, self.metas[element].degraded);
                let meta = &mut self.metas[id];
                meta.kind = kind;
                meta.degraded = degraded;
            }
        }
    }

    fn name_types(&mut self) {
        let order: Vec<MetaId> = self.collector.types().map(|(_, id)| id).collect();
        self.namer.assign_all(&mut self.metas, &order);
    }

    /// Types reachable from root fields through emitted constructs.
    fn reachable(&self, operations: &[OperationMeta]) -> FxHashSet<MetaId> {
        let mut stack: Vec<MetaId> = operations
            .iter()
            .flat_map(|op| {
                op.args
                    .iter()
                    .map(|arg| arg.ty.meta)
                    .chain([op.result.meta])
            })
            .collect();
        let mut seen = FxHashSet::default();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let meta = &self.metas[id];
            if let Some(element) = meta.of_type {
                stack.push(element);
                continue;
            }
            match meta.kind {
                MetaKind::Object => {
                    for field in meta.active_fields() {
                        stack.push(field.ty.meta);
                        stack.extend(field.args.iter().map(|arg| arg.ty.meta));
                    }
                }
                MetaKind::Union => stack.extend(meta.possible_types.iter().map(|m| m.meta)),
                MetaKind::Scalar | MetaKind::Enum | MetaKind::Tuple => {}
            }
        }
        seen
    }

    fn finish(
        mut self,
        operations: Vec<OperationMeta>,
        extended_types: Vec<ExtendedTypeMeta>,
    ) -> SchemaMeta {
        naming::count_references(&mut self.metas, self.collector);
        self.namer.substitute_hints(&mut self.metas);

        let reachable = self.reachable(&operations);
        let registered: Vec<MetaId> = self.collector.types().map(|(_, id)| id).collect();
        let types: Vec<MetaId> = registered
            .into_iter()
            .filter(|id| reachable.contains(id) && self.metas[*id].is_definition())
            .collect();

        let mut custom_scalars: Vec<CustomScalar> = Vec::new();
        for &id in &types {
            let meta = &self.metas[id];
            if !meta.is_scalar() || custom_scalars.iter().any(|s| s.name == meta.name) {
                continue;
            }
            let description = meta.scalar_hint.as_ref().map(|hint| format!("tsType: {hint}"));
            self.collector.add_custom_scalar(&meta.name, description.clone());
            custom_scalars.push(CustomScalar {
                name: meta.name.clone(),
                description,
            });
        }

        let program = self.checker.program();
        for entry in self.checker.take_diagnostics() {
            let location = match entry.diagnostic.primary_span() {
                Some(span) => program.location(entry.file, span),
                None => program.display_path(entry.file),
            };
            tracing::debug!("{location}: {}", entry.diagnostic);
            self.warnings
                .push(Warning::new(entry.diagnostic.to_string()).in_file(location));
        }

        tracing::info!(
            types = types.len(),
            operations = operations.len(),
            warnings = self.warnings.len(),
            "gathered schema metadata"
        );
        SchemaMeta {
            metas: self.metas,
            types,
            operations,
            custom_scalars,
            extended_types,
            warnings: self.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fngql_checker::MemoryHost;

    fn project(files: &[(&str, &str)]) -> MemoryHost {
        let mut host = MemoryHost::new().with_file("/p/tsconfig.json", "{}");
        for (path, text) in files {
            host.insert(format!("/p/{path}"), *text);
        }
        host
    }

    fn gather(host: &MemoryHost) -> (SchemaMeta, Collector) {
        let options = GeneratorOptions::new("/p");
        let config = ProjectConfig::load(host, Path::new("/p/tsconfig.json")).unwrap();
        let mut collector = Collector::new();
        let meta = gather_meta(host, &options, &config, &mut collector).unwrap();
        (meta, collector)
    }

    fn find<'m>(meta: &'m SchemaMeta, name: &str) -> &'m TypeMeta {
        let id = meta.find(name).unwrap_or_else(|| panic!("no type `{name}`"));
        meta.meta(id)
    }

    #[test]
    fn test_probe_text() {
        let probe = operation_probe(Path::new("/p/src/operations/user/get.ts"), OperationKind::Query);
        assert_eq!(
            probe,
            "import { Query } from \"./get\";\n\
             export type RESOLVER = [Parameters<typeof Query>, Awaited<ReturnType<typeof Query>>];\n"
        );
        let probe = extension_probe(Path::new("/p/src/types/User.ts"), &["posts".into()]);
        assert!(probe.starts_with("import { posts } from \"./User\";"));
        assert!(probe.contains("  posts: [Parameters<typeof posts>, Awaited<ReturnType<typeof posts>>];"));
    }

    #[test]
    fn test_discovery_skips_helpers() {
        let host = project(&[
            ("src/operations/user/get.ts", "export function Query(): string { return \"\"; }\n"),
            ("src/operations/user/helpers.ts", "export function helper() {}\n"),
            ("src/operations/user/index.ts", "export async function Mutation(): Promise<boolean> { return true; }\n"),
            ("src/operations/types.d.ts", "export function Query(): string;\n"),
        ]);
        let found = discover_operations(&host, Path::new("/p/src/operations")).unwrap();
        let names: Vec<_> = found.iter().map(|o| (o.kind, o.name.as_str())).collect();
        assert_eq!(
            names,
            [(OperationKind::Query, "userGet"), (OperationKind::Mutation, "user")]
        );
    }

    #[test]
    fn test_duplicate_operation_is_fatal() {
        let host = project(&[
            ("src/operations/user.ts", "export function Query(): string { return \"\"; }\n"),
            ("src/operations/user/index.ts", "export function Query(): string { return \"\"; }\n"),
        ]);
        let err = discover_operations(&host, Path::new("/p/src/operations")).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Structure(StructureError::DuplicateOperation { .. })
        ));
    }

    #[test]
    fn test_cycle_points_at_same_meta() {
        let host = project(&[(
            "src/operations/node.ts",
            "interface Node { id: string; next: Node | null; children: Node[]; }\n\
             export function Query(): Node { return null!; }\n",
        )]);
        let (meta, _) = gather(&host);
        let id = meta.find("Node").unwrap();
        let node = meta.meta(id);
        assert_eq!(node.fields[1].ty.meta, id);
        assert!(!node.fields[1].ty.is_non_null);
        let children = meta.resolve(node.fields[2].ty);
        assert_eq!(children.of_type, Some(id));
        assert_eq!(meta.types.iter().filter(|t| meta.meta(**t).name.starts_with("Node")).count(), 1);
    }

    #[test]
    fn test_nested_arrays_fold_into_one_list() {
        let host = project(&[(
            "src/operations/grid.ts",
            "export function Query(): string[][][] { return []; }\n",
        )]);
        let (meta, _) = gather(&host);
        let list = meta.resolve(meta.operations[0].result);
        assert_eq!(list.is_list, 3);
        assert_eq!(list.item_non_null, [true, true, true]);
        assert_eq!(list.name, "[[[String]]]");
        assert_eq!(list.ts_type, "string[][][]");
        let element = meta.meta(list.of_type.unwrap());
        assert_eq!(element.is_list, 0);
        assert!(element.is_builtin_scalar());
    }

    #[test]
    fn test_string_literal_union_is_enum() {
        let host = project(&[(
            "src/operations/role.ts",
            "type Role = \"ADMIN\" | \"EDITOR\" | \"VIEWER\";\n\
             export function Query(role: Role): Role { return role; }\n",
        )]);
        let (meta, _) = gather(&host);
        let role = find(&meta, "Role");
        assert!(role.is_enum());
        assert_eq!(role.enum_values.len(), 3);
        assert!(role.possible_types.is_empty());
        assert_eq!(meta.operations[0].args[0].ty.meta, meta.operations[0].result.meta);
    }

    #[test]
    fn test_single_member_union_unwraps() {
        let host = project(&[(
            "src/operations/user.ts",
            "interface User { id: string }\n\
             export function Query(): User | null | undefined { return null; }\n",
        )]);
        let (meta, _) = gather(&host);
        let result = meta.operations[0].result;
        assert!(!result.is_non_null);
        let user = meta.resolve(result);
        assert_eq!(user.name, "User");
        assert!(!user.is_union());
    }

    #[test]
    fn test_reused_type_registered_once() {
        let host = project(&[
            ("src/models.ts", "export interface User { id: string; name: string }\n"),
            (
                "src/operations/a.ts",
                "import { User } from \"../models\";\nexport function Query(): User { return null!; }\n",
            ),
            (
                "src/operations/b.ts",
                "import type { User } from \"../models\";\nexport async function Query(): Promise<User> { return null!; }\n",
            ),
        ]);
        let (meta, collector) = gather(&host);
        assert_eq!(meta.operations.len(), 2);
        assert_eq!(meta.operations[0].result.meta, meta.operations[1].result.meta);
        let identity = &meta.resolve(meta.operations[0].result).identity;
        assert_eq!(identity, "User@src/models.ts");
        assert_eq!(collector.type_reference(identity).map(<[_]>::len), Some(2));
        assert_eq!(meta.resolve(meta.operations[0].result).reference_count, 2);
    }

    #[test]
    fn test_input_and_output_are_separate() {
        let host = project(&[(
            "src/operations/search.ts",
            "interface Filter { text: string; limit?: number }\n\
             export function Query(filter: Filter, page?: number): Filter[] { return []; }\n",
        )]);
        let (meta, _) = gather(&host);
        let op = &meta.operations[0];
        assert_eq!(op.name, "search");
        let filter = meta.resolve(op.args[0].ty);
        assert_eq!(filter.name, "FilterInput");
        assert_eq!(filter.input_fields.len(), 2);
        assert!(!filter.input_fields[1].ty.is_non_null);
        assert!(!op.args[1].ty.is_non_null);

        let output = meta.meta(meta.named_type(op.result.meta));
        assert_eq!(output.name, "Filter");
        assert_eq!(output.fields.len(), 2);
    }

    #[test]
    fn test_degradation_to_custom_scalars() {
        let host = project(&[(
            "src/operations/misc.ts",
            "interface Cat { meow: string }\n\
             export function Query(): {\n\
               pair: [string, number];\n\
               either: Cat | string;\n\
               lookup: Record<string, number>;\n\
               when: Date;\n\
               anything: unknown;\n\
             } { return null!; }\n",
        )]);
        let (meta, _) = gather(&host);
        let misc = find(&meta, "Misc");
        let kinds: Vec<(&str, &str)> = misc
            .fields
            .iter()
            .map(|f| (f.name.as_str(), meta.resolve(f.ty).name.as_str()))
            .collect();
        assert_eq!(
            kinds,
            [
                ("pair", "MiscPair"),
                ("either", "CatOrString"),
                ("lookup", "Record_string_number"),
                ("when", "Date"),
                ("anything", "JSON"),
            ]
        );
        assert!(misc.fields.iter().all(|f| meta.resolve(f.ty).is_scalar()));
        let pair = find(&meta, "MiscPair");
        assert_eq!(pair.scalar_hint.as_deref(), Some("[string, number]"));
        let names: Vec<_> = meta.custom_scalars.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names,
            ["MiscPair", "CatOrString", "Record_string_number", "Date", "JSON"]);
    }

    #[test]
    fn test_intersection_merges_members() {
        let host = project(&[(
            "src/operations/person.ts",
            "type Named = { name: string };\n\
             type Aged = { age: number };\n\
             export function Query(): Named & Aged { return null!; }\n",
        )]);
        let (meta, collector) = gather(&host);
        let person = find(&meta, "Person");
        assert!(person.is_object());
        let fields: Vec<(&str, &str)> = person
            .fields
            .iter()
            .map(|f| (f.name.as_str(), meta.resolve(f.ty).name.as_str()))
            .collect();
        assert_eq!(fields, [("name", "String"), ("age", "Int")]);
        assert!(person.fields.iter().all(|f| f.ty.is_non_null));
        assert!(meta.find("Named").is_none());
        assert!(collector.has_type_reference("Named@src/operations/person.ts"));
    }

    #[test]
    fn test_input_union_becomes_scalar() {
        let host = project(&[(
            "src/operations/adopt.ts",
            "interface Cat { meow: string }\n\
             interface Dog { bark: string }\n\
             type Pet = Cat | Dog;\n\
             export function Query(pet: Pet, tag: string | boolean): string { return \"\"; }\n",
        )]);
        let (meta, _) = gather(&host);
        let args = &meta.operations[0].args;
        let pet = meta.resolve(args[0].ty);
        assert!(pet.is_scalar() && pet.degraded);
        assert_eq!(pet.name, "Pet");
        let tag = meta.resolve(args[1].ty);
        assert!(tag.is_scalar());
        assert_eq!(tag.name, "StringOrBoolean");
        let names: Vec<_> = meta.custom_scalars.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Pet", "StringOrBoolean"]);
        assert!(meta.find("CatInput").is_none());
    }

    #[test]
    fn test_typename_forces_result_name() {
        let host = project(&[(
            "src/operations/me.ts",
            "export const __typename = \"Viewer\";\n\
             export function Query(): { id: string } { return { id: \"\" }; }\n",
        )]);
        let (meta, _) = gather(&host);
        assert_eq!(meta.resolve(meta.operations[0].result).name, "Viewer");
        assert_eq!(meta.operations[0].typename.as_deref(), Some("Viewer"));
    }

    #[test]
    fn test_unresolvable_operation_is_skipped() {
        let host = project(&[
            ("src/operations/ok.ts", "export function Query(): string { return \"\"; }\n"),
            (
                "src/operations/broken.ts",
                "export function Query(): Missing { return null!; }\n",
            ),
        ]);
        let (meta, _) = gather(&host);
        assert_eq!(meta.operations.len(), 1);
        assert_eq!(meta.operations[0].name, "ok");
        assert!(meta
            .warnings
            .iter()
            .any(|w| w.file.as_deref() == Some("src/operations/broken.ts")));
    }

    #[test]
    fn test_subscription_item_type() {
        let host = project(&[(
            "src/operations/ticks.ts",
            "export async function* Subscription(): AsyncGenerator<number> { yield 1; }\n",
        )]);
        let (meta, _) = gather(&host);
        let op = &meta.operations[0];
        assert_eq!(op.kind, OperationKind::Subscription);
        assert_eq!(meta.resolve(op.result).name, "Int");
    }
}
