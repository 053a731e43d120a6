//! Project configuration from `tsconfig.json`.

use crate::host::{normalize_path, SourceHost};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading project configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("project root `{0}` does not exist or contains no tsconfig")]
    MissingTsconfig(PathBuf),

    #[error("failed to read `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("circular `extends` chain at `{0}`")]
    CircularExtends(PathBuf),

    #[error("{0}")]
    Invalid(String),
}

/// One `compilerOptions.paths` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathAlias {
    /// The pattern, with at most one `*`.
    pub pattern: String,
    /// Candidate targets, already joined to the base url.
    pub targets: Vec<String>,
}

impl PathAlias {
    /// Matches `specifier` against the pattern and returns the captured `*` text.
    #[must_use]
    pub fn capture<'s>(&self, specifier: &'s str) -> Option<&'s str> {
        match self.pattern.split_once('*') {
            Some((prefix, suffix)) => specifier
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(suffix)),
            None => (specifier == self.pattern).then_some(""),
        }
    }

    /// Expands the targets for a captured `*` text.
    pub fn expand<'a>(&'a self, captured: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
        self.targets
            .iter()
            .map(move |target| PathBuf::from(target.replacen('*', captured, 1)))
    }
}

/// Module resolution settings of a project.
#[derive(Debug, Clone, Default)]
pub struct ProjectConfig {
    /// The tsconfig file the settings were read from.
    pub tsconfig: PathBuf,
    pub base_url: Option<PathBuf>,
    /// Aliases ordered by decreasing prefix length.
    pub paths: Vec<PathAlias>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTsconfig {
    extends: Option<String>,
    #[serde(default)]
    compiler_options: RawCompilerOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCompilerOptions {
    base_url: Option<String>,
    paths: Option<indexmap::IndexMap<String, Vec<String>>>,
}

impl ProjectConfig {
    /// Loads `tsconfig` (following relative `extends`).
    pub fn load(host: &dyn SourceHost, tsconfig: &Path) -> Result<Self, ConfigError> {
        let tsconfig = normalize_path(tsconfig);
        if !host.is_file(&tsconfig) {
            return Err(ConfigError::MissingTsconfig(tsconfig));
        }

        let mut base_url = None;
        let mut paths: Option<(PathBuf, indexmap::IndexMap<String, Vec<String>>)> = None;
        let mut visited = Vec::new();
        let mut current = Some(tsconfig.clone());

        // Values from the nearest file win.
        while let Some(path) = current.take() {
            if visited.contains(&path) {
                return Err(ConfigError::CircularExtends(path));
            }
            visited.push(path.clone());

            let text = host.read(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let raw: RawTsconfig =
                serde_json::from_str(&strip_jsonc(&text)).map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?;

            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            if base_url.is_none() {
                base_url = raw
                    .compiler_options
                    .base_url
                    .map(|url| normalize_path(&dir.join(url)));
            }
            if paths.is_none() {
                paths = raw.compiler_options.paths.map(|p| (dir.clone(), p));
            }

            if let Some(extends) = raw.extends {
                if extends.starts_with('.') {
                    let file = if extends.ends_with(".json") {
                        extends
                    } else {
                        format!("{extends}.json")
                    };
                    current = Some(normalize_path(&dir.join(file)));
                } else {
                    tracing::debug!(extends = %extends, "ignoring package tsconfig base");
                }
            }
        }

        let mut aliases = Vec::new();
        if let Some((declaring_dir, entries)) = paths {
            // Targets are relative to baseUrl, or to the declaring file when absent.
            let base = base_url.clone().unwrap_or(declaring_dir);
            for (pattern, targets) in entries {
                if pattern.matches('*').count() > 1 {
                    return Err(ConfigError::Invalid(format!(
                        "path pattern `{pattern}` may contain at most one `*`"
                    )));
                }
                aliases.push(PathAlias {
                    pattern,
                    targets: targets
                        .iter()
                        .map(|t| normalize_path(&base.join(t)).to_string_lossy().into_owned())
                        .collect(),
                });
            }
        }
        aliases.sort_by_key(|alias| {
            std::cmp::Reverse(alias.pattern.split('*').next().map_or(0, str::len))
        });

        Ok(Self {
            tsconfig,
            base_url,
            paths: aliases,
        })
    }
}

/// Strips `//` and `/* */` comments and trailing commas from JSONC text.
#[must_use]
pub fn strip_jsonc(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let mut last = 0;
    let mut in_string = false;

    while i < bytes.len() {
        let c = bytes[i];
        if in_string {
            if c == b'\\' {
                i += 2;
                continue;
            }
            if c == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match c {
            b'"' => {
                in_string = true;
                i += 1;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                out.push_str(&text[last..i]);
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                last = i;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                out.push_str(&text[last..i]);
                i = memchr::memmem::find(&bytes[i + 2..], b"*/").map_or(bytes.len(), |end| i + 2 + end + 2);
                last = i;
            }
            b',' => {
                let next = bytes[i + 1..]
                    .iter()
                    .position(|b| !b.is_ascii_whitespace())
                    .map(|offset| bytes[i + 1 + offset]);
                if matches!(next, Some(b'}' | b']')) {
                    out.push_str(&text[last..i]);
                    last = i + 1;
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    out.push_str(&text[last.min(text.len())..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    #[test]
    fn test_strip_jsonc() {
        let text = "{\n  // comment\n  \"a\": \"http://x\", /* b */\n  \"list\": [1, 2,],\n}";
        let value: serde_json::Value = serde_json::from_str(&strip_jsonc(text)).unwrap();
        assert_eq!(value["a"], "http://x");
        assert_eq!(value["list"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_load_paths_and_extends() {
        let host = MemoryHost::new()
            .with_file(
                "/p/tsconfig.json",
                r#"{ "extends": "./tsconfig.base", "compilerOptions": { "strict": true } }"#,
            )
            .with_file(
                "/p/tsconfig.base.json",
                r#"{
                    "compilerOptions": {
                        "baseUrl": ".",
                        "paths": { "@/*": ["src/*"], "$$types": ["src/types/index.ts"] },
                    },
                }"#,
            );
        let config = ProjectConfig::load(&host, Path::new("/p/tsconfig.json")).unwrap();
        assert_eq!(config.base_url, Some(PathBuf::from("/p")));
        assert_eq!(config.paths.len(), 2);
        assert_eq!(config.paths[0].pattern, "$$types");

        let alias = &config.paths[1];
        assert_eq!(alias.capture("@/lib/db"), Some("lib/db"));
        assert_eq!(alias.capture("lodash"), None);
        let expanded: Vec<_> = alias.expand("lib/db").collect();
        assert_eq!(expanded, vec![PathBuf::from("/p/src/lib/db")]);
    }

    #[test]
    fn test_missing_tsconfig_is_fatal() {
        let host = MemoryHost::new();
        let err = ProjectConfig::load(&host, Path::new("/p/tsconfig.json")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingTsconfig(_)));
    }

    #[test]
    fn test_circular_extends() {
        let host = MemoryHost::new()
            .with_file("/p/a.json", r#"{ "extends": "./b.json" }"#)
            .with_file("/p/b.json", r#"{ "extends": "./a.json" }"#);
        let err = ProjectConfig::load(&host, Path::new("/p/a.json")).unwrap_err();
        assert!(matches!(err, ConfigError::CircularExtends(_)));
    }
}
