//! Generator options and `fngql.json`.

use fngql_checker::{normalize_path, ConfigError, SourceHost};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the optional project configuration file.
pub const CONFIG_FILE: &str = "fngql.json";

/// GraphQL scalar used for TypeScript `number`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum NumberScalar {
    #[default]
    Int,
    Float,
}

impl NumberScalar {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Int => "Int",
            Self::Float => "Float",
        }
    }
}

/// Generation options. Relative paths are resolved against `root`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorOptions {
    pub root: PathBuf,
    pub operations_dir: PathBuf,
    /// Defaults to the `types` sibling of the operations directory.
    pub types_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub tsconfig: PathBuf,
    /// Module providing `makeGraphQLResolverFn` and `makeGraphQLFieldResolver`.
    pub runtime_module: String,
    pub number_scalar: NumberScalar,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            operations_dir: PathBuf::from("src/operations"),
            types_dir: None,
            output_dir: PathBuf::from(".fngql"),
            tsconfig: PathBuf::from("tsconfig.json"),
            runtime_module: "fngql/runtime".to_string(),
            number_scalar: NumberScalar::Int,
        }
    }
}

impl GeneratorOptions {
    /// Creates default options for a project root.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Reads `<root>/fngql.json` when present, otherwise returns the defaults.
    pub fn load(host: &dyn SourceHost, root: &Path) -> Result<Self, ConfigError> {
        let path = normalize_path(&root.join(CONFIG_FILE));
        let mut options = if host.is_file(&path) {
            let text = host.read(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str::<Self>(&text)
                .map_err(|source| ConfigError::Parse { path, source })?
        } else {
            Self::default()
        };
        options.root = root.to_path_buf();
        Ok(options)
    }

    #[must_use]
    pub fn root_path(&self) -> PathBuf {
        normalize_path(&self.root)
    }

    #[must_use]
    pub fn operations_path(&self) -> PathBuf {
        self.resolve(&self.operations_dir)
    }

    #[must_use]
    pub fn types_path(&self) -> PathBuf {
        match &self.types_dir {
            Some(dir) => self.resolve(dir),
            None => {
                let operations = self.operations_path();
                normalize_path(&operations.join("..").join("types"))
            }
        }
    }

    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output_dir)
    }

    #[must_use]
    pub fn tsconfig_path(&self) -> PathBuf {
        self.resolve(&self.tsconfig)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        normalize_path(&self.root.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fngql_checker::MemoryHost;

    #[test]
    fn test_defaults() {
        let options = GeneratorOptions::new("/p");
        assert_eq!(options.operations_path(), PathBuf::from("/p/src/operations"));
        assert_eq!(options.types_path(), PathBuf::from("/p/src/types"));
        assert_eq!(options.output_path(), PathBuf::from("/p/.fngql"));
        assert_eq!(options.number_scalar, NumberScalar::Int);
    }

    #[test]
    fn test_load_config_file() {
        let host = MemoryHost::new().with_file(
            "/p/fngql.json",
            r#"{ "operationsDir": "api/ops", "numberScalar": "Float", "outputDir": "gen" }"#,
        );
        let options = GeneratorOptions::load(&host, Path::new("/p")).unwrap();
        assert_eq!(options.operations_path(), PathBuf::from("/p/api/ops"));
        assert_eq!(options.types_path(), PathBuf::from("/p/api/types"));
        assert_eq!(options.output_path(), PathBuf::from("/p/gen"));
        assert_eq!(options.number_scalar.as_str(), "Float");
        assert_eq!(options.runtime_module, "fngql/runtime");
    }

    #[test]
    fn test_invalid_config_file() {
        let host = MemoryHost::new().with_file("/p/fngql.json", "{ nope }");
        let err = GeneratorOptions::load(&host, Path::new("/p")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
