//! Source hosts: where the program builder reads files from.

use indexmap::IndexMap;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Read access to source files.
pub trait SourceHost {
    /// Reads a file to a string.
    fn read(&self, path: &Path) -> io::Result<String>;

    /// Checks if a file exists.
    fn is_file(&self, path: &Path) -> bool;

    /// Lists every file below `dir`, recursively, sorted by path.
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
}

/// File system host.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystemHost;

impl SourceHost for FileSystemHost {
    fn read(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![dir.to_path_buf()];
        while let Some(current) = pending.pop() {
            for entry in std::fs::read_dir(&current)? {
                let entry = entry?;
                let path = entry.path();
                if entry.file_type()?.is_dir() {
                    pending.push(path);
                } else {
                    files.push(normalize_path(&path));
                }
            }
        }
        files.sort();
        Ok(files)
    }
}

/// In-memory host.
#[derive(Debug, Default, Clone)]
pub struct MemoryHost {
    files: IndexMap<PathBuf, String>,
}

impl MemoryHost {
    /// Creates an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file.
    pub fn insert(&mut self, path: impl AsRef<Path>, text: impl Into<String>) {
        self.files.insert(normalize_path(path.as_ref()), text.into());
    }

    /// Builder-style [`MemoryHost::insert`].
    #[must_use]
    pub fn with_file(mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }
}

impl SourceHost for MemoryHost {
    fn read(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(&normalize_path(path))
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let dir = normalize_path(dir);
        let mut files: Vec<_> = self
            .files
            .keys()
            .filter(|path| path.starts_with(&dir) && **path != dir)
            .cloned()
            .collect();
        if files.is_empty() {
            return Err(io::Error::new(io::ErrorKind::NotFound, dir.display().to_string()));
        }
        files.sort();
        Ok(files)
    }
}

impl<H: SourceHost + ?Sized> SourceHost for &H {
    fn read(&self, path: &Path) -> io::Result<String> {
        (**self).read(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        (**self).is_file(path)
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        (**self).list_files(dir)
    }
}

/// Removes `.` and resolves `..` components lexically.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Renders `path` relative to `root` with `/` separators.
#[must_use]
pub fn display_relative(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/a/./b/../c/d.ts")),
            PathBuf::from("/a/c/d.ts")
        );
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_memory_host_lists_sorted() {
        let host = MemoryHost::new()
            .with_file("/p/src/b.ts", "")
            .with_file("/p/src/a/z.ts", "")
            .with_file("/p/other.ts", "");
        let files = host.list_files(Path::new("/p/src")).unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("/p/src/a/z.ts"), PathBuf::from("/p/src/b.ts")]
        );
        assert!(host.is_file(Path::new("/p/src/./b.ts")));
        assert!(host.read(Path::new("/p/missing.ts")).is_err());
    }

    #[test]
    fn test_display_relative() {
        assert_eq!(
            display_relative(Path::new("/p/src/a.ts"), Path::new("/p")),
            "src/a.ts"
        );
    }
}
