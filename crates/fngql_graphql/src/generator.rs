//! The generation entry point.

use crate::error::GenerateError;
use crate::fragments::render_type_fragments;
use crate::gather::gather_meta;
use crate::options::GeneratorOptions;
use crate::render::render_schema;
use crate::resolvers::render_resolvers;
use crate::sdk::render_sdk;
use fngql_checker::{ProjectConfig, SourceHost};
use fngql_collector::{Collector, SchemaMeta};
use indexmap::IndexMap;

/// Everything one generation run produces.
#[derive(Debug)]
pub struct GeneratedArtifacts {
    /// `schema.graphql`
    pub schema: String,
    /// `resolvers.ts`
    pub resolvers: String,
    /// `sdk.ts`
    pub sdk: String,
    /// `types/<Name>.ts`, keyed by type name.
    pub type_fragments: IndexMap<String, String>,
    pub meta: SchemaMeta,
}

/// Generates a schema from an operations directory.
///
/// Every call uses a fresh [`Collector`], so calls are independent.
pub struct Generator<'h> {
    host: &'h dyn SourceHost,
    options: GeneratorOptions,
}

impl<'h> Generator<'h> {
    pub fn new(host: &'h dyn SourceHost, options: GeneratorOptions) -> Self {
        Self { host, options }
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Runs the gatherer only, registering into `collector`.
    pub fn gather(&self, collector: &mut Collector) -> Result<SchemaMeta, GenerateError> {
        let config = ProjectConfig::load(self.host, &self.options.tsconfig_path())?;
        gather_meta(self.host, &self.options, &config, collector)
    }

    /// Gathers and renders every artifact.
    pub fn generate(&self) -> Result<GeneratedArtifacts, GenerateError> {
        let mut collector = Collector::new();
        let meta = self.gather(&mut collector)?;
        let schema = render_schema(&meta)?;
        let resolvers = render_resolvers(
            &meta,
            &self.options.output_path(),
            &self.options.runtime_module,
        );
        let sdk = render_sdk(&meta, &mut collector);
        let type_fragments = render_type_fragments(&meta);

        tracing::info!(
            types = meta.types.len(),
            operations = meta.operations.len(),
            extended = meta.extended_types.len(),
            warnings = meta.warnings.len(),
            "generated schema"
        );
        Ok(GeneratedArtifacts {
            schema,
            resolvers,
            sdk,
            type_fragments,
            meta,
        })
    }
}
