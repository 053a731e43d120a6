//! Command-line interface for fngql.
//!
//! # Usage
//!
//! ```bash
//! # Generate schema.graphql, resolvers.ts and sdk.ts into .fngql/
//! fngql generate ./app
//!
//! # Gather and validate without writing anything
//! fngql check ./app --strict
//!
//! # Dump the collected type metadata
//! fngql meta ./app
//!
//! # Inspect how a structural type string is decomposed
//! fngql parse-type "{ a: string; b?: { c: number[] } }"
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use fngql_checker::FileSystemHost;
use fngql_collector::{Collector, Warning};
use fngql_graphql::{GenerateError, GeneratedArtifacts, Generator, GeneratorOptions, NumberScalar};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "fngql")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum NumberScalarArg {
    Int,
    Float,
}

impl From<NumberScalarArg> for NumberScalar {
    fn from(arg: NumberScalarArg) -> Self {
        match arg {
            NumberScalarArg::Int => Self::Int,
            NumberScalarArg::Float => Self::Float,
        }
    }
}

/// Options shared by every command that reads a project.
#[derive(clap::Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Project root containing tsconfig.json
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Operations directory, relative to the root
    #[arg(long)]
    pub operations: Option<PathBuf>,

    /// Type-extension directory, relative to the root
    #[arg(long)]
    pub types: Option<PathBuf>,

    /// tsconfig.json path, relative to the root
    #[arg(long)]
    pub tsconfig: Option<PathBuf>,

    /// GraphQL scalar for TypeScript `number`
    #[arg(long, value_enum)]
    pub number_scalar: Option<NumberScalarArg>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the schema, resolver entrypoint and SDK
    #[command(alias = "gen")]
    Generate {
        #[command(flatten)]
        project: ProjectArgs,

        /// Output directory, relative to the root
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Module providing the resolver adapters
        #[arg(long)]
        runtime_module: Option<String>,
    },

    /// Gather and validate the schema without writing files
    Check {
        #[command(flatten)]
        project: ProjectArgs,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Print the collected schema metadata as JSON
    Meta {
        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Parse a structural type string and print its field map as JSON
    ParseType {
        /// Type text, e.g. `{ a: string; b?: number[] }`
        input: String,

        /// Prefix for the field paths
        #[arg(long, default_value = "")]
        prefix: String,
    },

    /// Print version information
    Version,
}

pub fn run(cli: Cli) -> Result<i32, Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Generate {
            project,
            output,
            runtime_module,
        } => {
            let mut options = load_options(&project)?;
            if let Some(output) = output {
                options.output_dir = output;
            }
            if let Some(module) = runtime_module {
                options.runtime_module = module;
            }
            generate(options, cli.quiet)
        }
        Commands::Check { project, strict } => {
            check(load_options(&project)?, strict, cli.verbose)
        }
        Commands::Meta { project } => {
            let options = load_options(&project)?;
            let mut collector = Collector::new();
            match Generator::new(&FileSystemHost, options).gather(&mut collector) {
                Ok(meta) => {
                    println!("{}", meta.to_json()?);
                    Ok(0)
                }
                Err(err) => Ok(report_error(&err)),
            }
        }
        Commands::ParseType { input, prefix } => {
            match fngql_syntax::parse_type_string(&input, &prefix) {
                Ok(map) => {
                    println!("{}", serde_json::to_string_pretty(&map)?);
                    Ok(0)
                }
                Err(err) => {
                    eprintln!("{:?}", miette::Report::new(err));
                    Ok(1)
                }
            }
        }
        Commands::Version => {
            println!("fngql {}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
    }
}

fn load_options(project: &ProjectArgs) -> Result<GeneratorOptions, Box<dyn std::error::Error>> {
    let mut options = GeneratorOptions::load(&FileSystemHost, &project.root)?;
    if let Some(dir) = &project.operations {
        options.operations_dir.clone_from(dir);
    }
    if let Some(dir) = &project.types {
        options.types_dir = Some(dir.clone());
    }
    if let Some(tsconfig) = &project.tsconfig {
        options.tsconfig.clone_from(tsconfig);
    }
    if let Some(scalar) = project.number_scalar {
        options.number_scalar = scalar.into();
    }
    Ok(options)
}

fn generate(options: GeneratorOptions, quiet: bool) -> Result<i32, Box<dyn std::error::Error>> {
    let output = options.output_path();
    match Generator::new(&FileSystemHost, options).generate() {
        Ok(artifacts) => {
            print_warnings(&artifacts.meta.warnings);
            write_artifacts(&output, &artifacts)?;
            if !quiet {
                println!(
                    "{} {} operation(s), {} type(s) -> {}",
                    "Generated".green().bold(),
                    artifacts.meta.operations.len(),
                    artifacts.meta.types.len(),
                    output.display()
                );
            }
            Ok(0)
        }
        Err(GenerateError::InvalidSchema { schema, problems }) => {
            std::fs::create_dir_all(&output)?;
            let debug = output.join("schema.debug.graphql");
            std::fs::write(&debug, schema)?;
            eprintln!("{} generated schema is invalid", "Error:".red().bold());
            for problem in &problems {
                eprintln!("  {} {problem}", "-->".blue());
            }
            eprintln!("  {} {}", "schema written to".dimmed(), debug.display());
            Ok(1)
        }
        Err(err) => Ok(report_error(&err)),
    }
}

fn write_artifacts(output: &Path, artifacts: &GeneratedArtifacts) -> std::io::Result<()> {
    tracing::debug!(output = %output.display(), "writing artifacts");
    std::fs::create_dir_all(output)?;
    std::fs::write(output.join("schema.graphql"), &artifacts.schema)?;
    std::fs::write(output.join("resolvers.ts"), &artifacts.resolvers)?;
    std::fs::write(output.join("sdk.ts"), &artifacts.sdk)?;
    if !artifacts.type_fragments.is_empty() {
        let types = output.join("types");
        std::fs::create_dir_all(&types)?;
        for (name, text) in &artifacts.type_fragments {
            std::fs::write(types.join(format!("{name}.ts")), text)?;
        }
    }
    Ok(())
}

fn check(options: GeneratorOptions, strict: bool, verbose: bool) -> Result<i32, Box<dyn std::error::Error>> {
    match Generator::new(&FileSystemHost, options).generate() {
        Ok(artifacts) => {
            let warnings = &artifacts.meta.warnings;
            print_warnings(warnings);
            if verbose {
                for op in &artifacts.meta.operations {
                    println!("{} {}.{} ({})", "OK".green(), op.kind, op.name, op.file);
                }
            }
            if strict && !warnings.is_empty() {
                eprintln!("{} {} warning(s)", "Error:".red().bold(), warnings.len());
                return Ok(1);
            }
            println!(
                "{} {} operation(s) checked",
                "Success:".green().bold(),
                artifacts.meta.operations.len()
            );
            Ok(0)
        }
        Err(GenerateError::InvalidSchema { problems, .. }) => {
            eprintln!("{} generated schema is invalid", "Error:".red().bold());
            for problem in &problems {
                eprintln!("  {} {problem}", "-->".blue());
            }
            Ok(1)
        }
        Err(err) => Ok(report_error(&err)),
    }
}

fn print_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("{} {warning}", "Warning:".yellow().bold());
    }
}

fn report_error(err: &GenerateError) -> i32 {
    eprintln!("{} {err}", "Error:".red().bold());
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_project_args() {
        let cli = Cli::parse_from([
            "fngql",
            "generate",
            "app",
            "--operations",
            "api",
            "--number-scalar",
            "float",
            "-o",
            "gen",
        ]);
        let Commands::Generate { project, output, .. } = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(project.root, PathBuf::from("app"));
        assert_eq!(project.operations, Some(PathBuf::from("api")));
        assert!(matches!(project.number_scalar, Some(NumberScalarArg::Float)));
        assert_eq!(output, Some(PathBuf::from("gen")));
    }
}
