//! Program construction: the set of parsed files a [`TypeChecker`] works on.
//!
//! Every root file can be paired with a virtual companion produced by a helper
//! callback. Imports are followed transitively and read eagerly, so the checker
//! never touches the host once the program exists.
//!
//! [`TypeChecker`]: crate::TypeChecker

use crate::config::PathAlias;
use crate::host::{display_relative, normalize_path, SourceHost};
use fngql_core::{diagnostics::codes, Diagnostic, LineIndex, Span};
use fngql_syntax::{parse, Item, Module};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Suffix inserted before `.ts` in virtual companion file names.
pub const PROBE_SUFFIX: &str = "__probe__";

/// Index of a file in a [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u32);

impl FileId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where an import specifier points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleTarget {
    File(FileId),
    /// A bare specifier that names a package.
    External,
    Unresolved,
}

/// A parsed source file.
#[derive(Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
    pub module: Module,
    pub is_virtual: bool,
    pub line_index: LineIndex,
    imports: FxHashMap<String, ModuleTarget>,
}

impl SourceFile {
    /// Returns the resolved target of an import specifier used in this file.
    #[must_use]
    pub fn import_target(&self, specifier: &str) -> ModuleTarget {
        self.imports
            .get(specifier)
            .copied()
            .unwrap_or(ModuleTarget::Unresolved)
    }
}

/// A diagnostic attached to a file.
#[derive(Debug, Clone)]
pub struct FileDiagnostic {
    pub file: FileId,
    pub diagnostic: Diagnostic,
}

/// Errors raised while building a program.
#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("failed to read `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A compilation unit.
#[derive(Debug)]
pub struct Program {
    root: PathBuf,
    files: Vec<SourceFile>,
    by_path: FxHashMap<PathBuf, FileId>,
    diagnostics: Vec<FileDiagnostic>,
}

impl Program {
    /// The project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Gets a file.
    #[must_use]
    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.index()]
    }

    /// Iterates over files in load order.
    pub fn files(&self) -> impl Iterator<Item = (FileId, &SourceFile)> {
        self.files
            .iter()
            .enumerate()
            .map(|(i, f)| (FileId(i as u32), f))
    }

    /// Looks a file up by path.
    #[must_use]
    pub fn file_id(&self, path: &Path) -> Option<FileId> {
        self.by_path.get(&normalize_path(path)).copied()
    }

    /// The virtual companion of `path`, if one was synthesized.
    #[must_use]
    pub fn probe_of(&self, path: &Path) -> Option<FileId> {
        self.file_id(&probe_path(path))
            .filter(|id| self.file(*id).is_virtual)
    }

    /// The path of a file relative to the root, `/`-separated.
    #[must_use]
    pub fn display_path(&self, id: FileId) -> String {
        display_relative(&self.file(id).path, &self.root)
    }

    /// All diagnostics.
    #[must_use]
    pub fn diagnostics(&self) -> &[FileDiagnostic] {
        &self.diagnostics
    }

    /// Diagnostics of one file.
    pub fn diagnostics_for(&self, file: FileId) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.file == file)
            .map(|d| &d.diagnostic)
    }

    /// Returns true if `file` has error diagnostics.
    #[must_use]
    pub fn has_errors_in(&self, file: FileId) -> bool {
        self.diagnostics_for(file).any(Diagnostic::is_error)
    }

    /// Renders a diagnostic of `file` as a report with source context.
    #[must_use]
    pub fn report(&self, file: FileId, diagnostic: &Diagnostic) -> miette::Report {
        let source = self.file(file);
        diagnostic.to_report(&self.display_path(file), &source.text)
    }

    /// Formats a span of `file` as `path:line:column`.
    #[must_use]
    pub fn location(&self, file: FileId, span: Span) -> String {
        let position = self.file(file).line_index.line_col(span.start);
        format!("{}:{position}", self.display_path(file))
    }
}

/// Returns the companion path `<dir>/<stem>.__probe__.ts` of a file.
#[must_use]
pub fn probe_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    normalize_path(&path.with_file_name(format!("{stem}.{PROBE_SUFFIX}.ts")))
}

type HelperFn<'h> = Box<dyn Fn(&Path, &str) -> Option<String> + 'h>;

/// Builds a [`Program`].
pub struct ProgramBuilder<'h> {
    host: &'h dyn SourceHost,
    root: PathBuf,
    aliases: Vec<PathAlias>,
    base_url: Option<PathBuf>,
    helper: Option<HelperFn<'h>>,
}

impl<'h> ProgramBuilder<'h> {
    /// Creates a builder reading from `host`.
    pub fn new(host: &'h dyn SourceHost, root: impl Into<PathBuf>, aliases: Vec<PathAlias>) -> Self {
        Self {
            host,
            root: normalize_path(&root.into()),
            aliases,
            base_url: None,
            helper: None,
        }
    }

    /// Resolves bare specifiers against `base_url` before treating them as packages.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Option<PathBuf>) -> Self {
        self.base_url = base_url;
        self
    }

    /// Sets the callback producing the virtual companion text of a root file.
    #[must_use]
    pub fn with_helper(mut self, helper: impl Fn(&Path, &str) -> Option<String> + 'h) -> Self {
        self.helper = Some(Box::new(helper));
        self
    }

    /// Reads and parses `files`, their companions, and everything they import.
    pub fn build(self, files: &[PathBuf]) -> Result<Program, ProgramError> {
        let mut program = Program {
            root: self.root.clone(),
            files: Vec::new(),
            by_path: FxHashMap::default(),
            diagnostics: Vec::new(),
        };

        for path in files {
            let path = normalize_path(path);
            if program.by_path.contains_key(&path) {
                continue;
            }
            let text = self.host.read(&path).map_err(|source| ProgramError::Read {
                path: path.clone(),
                source,
            })?;
            let helper_text = self.helper.as_ref().and_then(|helper| helper(&path, &text));
            add_file(&mut program, path.clone(), text, false);
            if let Some(helper_text) = helper_text {
                tracing::trace!(file = %path.display(), "synthesized companion");
                add_file(&mut program, probe_path(&path), helper_text, true);
            }
        }

        // Files are appended while iterating, so walk by index.
        let mut next = 0;
        while next < program.files.len() {
            let id = FileId(next as u32);
            next += 1;

            let specifiers = import_specifiers(&program.files[id.index()].module);
            for (specifier, span) in specifiers {
                if program.files[id.index()].imports.contains_key(&specifier) {
                    continue;
                }
                let from = program.files[id.index()].path.clone();
                let target = self.resolve(&mut program, &from, &specifier);
                match target {
                    ModuleTarget::External => program.diagnostics.push(FileDiagnostic {
                        file: id,
                        diagnostic: Diagnostic::warning(
                            codes::EXTERNAL_MODULE,
                            format!("module `{specifier}` is external"),
                        )
                        .with_span(span, "types from this module are opaque"),
                    }),
                    ModuleTarget::Unresolved => program.diagnostics.push(FileDiagnostic {
                        file: id,
                        diagnostic: Diagnostic::warning(
                            codes::UNRESOLVED_MODULE,
                            format!("cannot resolve module `{specifier}`"),
                        )
                        .with_span(span, "imported here"),
                    }),
                    ModuleTarget::File(_) => {}
                }
                program.files[id.index()].imports.insert(specifier, target);
            }
        }

        tracing::debug!(files = program.files.len(), "program built");
        Ok(program)
    }

    fn resolve(&self, program: &mut Program, from: &Path, specifier: &str) -> ModuleTarget {
        for alias in &self.aliases {
            if let Some(captured) = alias.capture(specifier) {
                for target in alias.expand(captured) {
                    if let Some(id) = self.load_candidate(program, &target) {
                        return ModuleTarget::File(id);
                    }
                }
            }
        }

        if specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/') {
            let base = from.parent().map(|dir| dir.join(specifier)).unwrap_or_default();
            return self
                .load_candidate(program, &base)
                .map_or(ModuleTarget::Unresolved, ModuleTarget::File);
        }

        if let Some(base_url) = &self.base_url {
            if let Some(id) = self.load_candidate(program, &base_url.join(specifier)) {
                return ModuleTarget::File(id);
            }
        }
        ModuleTarget::External
    }

    /// Tries the resolution candidates of `base` and loads the first existing one.
    fn load_candidate(&self, program: &mut Program, base: &Path) -> Option<FileId> {
        for candidate in candidates(&normalize_path(base)) {
            if let Some(id) = program.by_path.get(&candidate) {
                return Some(*id);
            }
            if self.host.is_file(&candidate) {
                return match self.host.read(&candidate) {
                    Ok(text) => Some(add_file(program, candidate, text, false)),
                    Err(err) => {
                        tracing::warn!(file = %candidate.display(), error = %err, "unreadable import");
                        None
                    }
                };
            }
        }
        None
    }
}

fn add_file(program: &mut Program, path: PathBuf, text: String, is_virtual: bool) -> FileId {
    let id = FileId(program.files.len() as u32);
    let result = parse(&text);
    for diagnostic in result.diagnostics.iter() {
        program.diagnostics.push(FileDiagnostic {
            file: id,
            diagnostic: diagnostic.clone(),
        });
    }
    program.by_path.insert(path.clone(), id);
    program.files.push(SourceFile {
        line_index: LineIndex::new(&text),
        path,
        text,
        module: result.module,
        is_virtual,
        imports: FxHashMap::default(),
    });
    id
}

fn import_specifiers(module: &Module) -> Vec<(String, Span)> {
    module
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Import(import) => Some((import.source.clone(), import.span)),
            Item::ExportFrom(export) => Some((export.source.clone(), export.span)),
            _ => None,
        })
        .collect()
}

/// Candidate files for a module path, in resolution order.
fn candidates(base: &Path) -> Vec<PathBuf> {
    let text = base.to_string_lossy();
    if let Some(stem) = text.strip_suffix(".js").or_else(|| text.strip_suffix(".jsx")) {
        return vec![
            PathBuf::from(format!("{stem}.ts")),
            PathBuf::from(format!("{stem}.tsx")),
            PathBuf::from(format!("{stem}.d.ts")),
        ];
    }
    let mut list = Vec::with_capacity(7);
    if text.ends_with(".ts") || text.ends_with(".tsx") {
        list.push(base.to_path_buf());
    }
    for ext in [".ts", ".tsx", ".d.ts"] {
        list.push(PathBuf::from(format!("{text}{ext}")));
    }
    for index in ["index.ts", "index.tsx", "index.d.ts"] {
        list.push(base.join(index));
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    fn alias(pattern: &str, target: &str) -> PathAlias {
        PathAlias {
            pattern: pattern.to_string(),
            targets: vec![target.to_string()],
        }
    }

    #[test]
    fn test_probe_path() {
        assert_eq!(
            probe_path(Path::new("/p/src/operations/user/get.ts")),
            PathBuf::from("/p/src/operations/user/get.__probe__.ts")
        );
    }

    #[test]
    fn test_build_follows_imports() {
        let host = MemoryHost::new()
            .with_file("/p/src/ops/a.ts", "import { User } from '../models/user';\nimport type { Ctx } from '@/ctx';\nexport function Query(): User { return u; }")
            .with_file("/p/src/models/user/index.ts", "export * from './types.js';")
            .with_file("/p/src/models/user/types.ts", "export interface User { id: string }")
            .with_file("/p/src/ctx.ts", "export type Ctx = {};");
        let program = ProgramBuilder::new(&host, "/p", vec![alias("@/*", "/p/src/*")])
            .build(&[PathBuf::from("/p/src/ops/a.ts")])
            .unwrap();

        assert_eq!(program.files().count(), 4);
        let a = program.file_id(Path::new("/p/src/ops/a.ts")).unwrap();
        let target = program.file(a).import_target("../models/user");
        let ModuleTarget::File(index) = target else {
            panic!("expected a file");
        };
        assert_eq!(program.display_path(index), "src/models/user/index.ts");
        assert!(matches!(program.file(a).import_target("@/ctx"), ModuleTarget::File(_)));
        assert!(program.diagnostics().is_empty());
    }

    #[test]
    fn test_helper_adds_virtual_companion() {
        let host = MemoryHost::new().with_file("/p/src/ops/a.ts", "export function Query(): string { return ''; }");
        let program = ProgramBuilder::new(&host, "/p", Vec::new())
            .with_helper(|path, _| {
                let stem = path.file_stem()?.to_string_lossy().into_owned();
                Some(format!("import {{ Query }} from './{stem}';\nexport type RESOLVER = ReturnType<typeof Query>;"))
            })
            .build(&[PathBuf::from("/p/src/ops/a.ts")])
            .unwrap();

        let probe = program.probe_of(Path::new("/p/src/ops/a.ts")).unwrap();
        assert!(program.file(probe).is_virtual);
        assert_eq!(
            program.file(probe).import_target("./a"),
            ModuleTarget::File(program.file_id(Path::new("/p/src/ops/a.ts")).unwrap())
        );
    }

    #[test]
    fn test_unresolved_and_external_modules_warn() {
        let host = MemoryHost::new()
            .with_file("/p/a.ts", "import x from 'graphql';\nimport { y } from './missing';");
        let program = ProgramBuilder::new(&host, "/p", Vec::new())
            .build(&[PathBuf::from("/p/a.ts")])
            .unwrap();
        let found: Vec<_> = program.diagnostics().iter().map(|d| d.diagnostic.code).collect();
        assert_eq!(found, vec![codes::EXTERNAL_MODULE, codes::UNRESOLVED_MODULE]);
        let file = program.file_id(Path::new("/p/a.ts")).unwrap();
        assert!(!program.has_errors_in(file));
    }

    #[test]
    fn test_missing_root_file_is_an_error() {
        let host = MemoryHost::new();
        let result = ProgramBuilder::new(&host, "/p", Vec::new()).build(&[PathBuf::from("/p/a.ts")]);
        assert!(matches!(result, Err(ProgramError::Read { .. })));
    }
}
