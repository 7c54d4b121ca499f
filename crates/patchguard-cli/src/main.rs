mod config;
mod logging;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use config::{CliConfig, LogFormat, load_config, render_config};
use logging::init_logging;
use patchguard_core::{Error as CoreError, SchemaNode, resolve};
use patchguard_validate::{
    JsonSchemaShapeCheck, OpKind, ShapeCheckError, ValidateOptions, Validator,
    operation_json_schema, options_json_schema, schema_json_schema,
};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("toml encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("shape check error: {0}")]
    ShapeCheck(#[from] ShapeCheckError),
    #[error("logging error: {0}")]
    Logging(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

type CliResult<T> = Result<T, CliError>;

/// Exit code for a patch or pointer the schema rejects.
const EXIT_REJECTED: u8 = 1;
/// Exit code for usage and infrastructure failures.
const EXIT_FAILURE: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "patchguard",
    version,
    about = "Validate JSON Patch operations against a document schema"
)]
struct Cli {
    /// Path to a patchguard.toml configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Log output format.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,
    /// Append JSON log lines to this file instead of stderr.
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a patch file against a schema file.
    Check(CheckArgs),
    /// Print the schema node governing a JSON Pointer.
    Resolve(ResolveArgs),
    /// Print a JSON Schema describing one of the input formats.
    EmitSchema(EmitSchemaArgs),
    /// Print the effective configuration as TOML.
    Config(ValidationArgs),
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Schema document (JSON).
    #[arg(long, value_name = "FILE")]
    schema: PathBuf,
    /// Patch document (JSON); `-` reads stdin.
    #[arg(value_name = "PATCH")]
    patch: PathBuf,
    #[command(flatten)]
    validation: ValidationArgs,
}

#[derive(Args, Debug, Default)]
struct ValidationArgs {
    /// Report every failing operation instead of stopping at the first.
    #[arg(long, default_value_t = false)]
    no_abort_early: bool,
    /// Let operations on paths unknown to the schema pass through.
    #[arg(long, default_value_t = false)]
    allow_unknown: bool,
    /// Disable value coercion.
    #[arg(long, default_value_t = false)]
    no_convert: bool,
    /// Restrict accepted operations (repeatable).
    #[arg(long = "allow-op", value_name = "OP")]
    allow_ops: Vec<OpKind>,
}

impl ValidationArgs {
    /// Layer command line flags over options from the config file.
    fn apply(&self, mut options: ValidateOptions) -> ValidateOptions {
        if self.no_abort_early {
            options.abort_early = false;
        }
        if self.allow_unknown {
            options.allow_unknown = true;
        }
        if self.no_convert {
            options.convert = false;
        }
        if !self.allow_ops.is_empty() {
            options.allowed_ops = self.allow_ops.iter().copied().collect();
        }
        options
    }
}

#[derive(Args, Debug)]
struct ResolveArgs {
    /// Schema document (JSON).
    #[arg(long, value_name = "FILE")]
    schema: PathBuf,
    /// JSON Pointer to resolve (ex.: /author/name).
    #[arg(value_name = "POINTER", allow_hyphen_values = true)]
    pointer: String,
}

#[derive(Args, Debug)]
struct EmitSchemaArgs {
    #[arg(value_enum)]
    target: SchemaTarget,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SchemaTarget {
    /// Well formed patch operations.
    Operation,
    /// Schema documents.
    Schema,
    /// The `[validate]` configuration table.
    Options,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run(cli: Cli) -> CliResult<ExitCode> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(format) = cli.log_format {
        config.log.format = format;
    }
    if let Some(file) = cli.log_file {
        config.log.file = Some(file);
    }
    init_logging(&config.log)?;

    match cli.command {
        Command::Check(args) => run_check(args, config),
        Command::Resolve(args) => run_resolve(args),
        Command::EmitSchema(args) => run_emit_schema(args),
        Command::Config(args) => run_config(args, config),
    }
}

fn run_check(args: CheckArgs, config: CliConfig) -> CliResult<ExitCode> {
    let options = args.validation.apply(config.validate);
    let schema = load_schema(&args.schema)?;
    let patch = read_patch(&args.patch)?;

    tracing::info!(
        event = "check_started",
        schema = %args.schema.display(),
        patch = %args.patch.display()
    );
    let timer = Instant::now();

    let validator = Validator::new().with_shape_check(JsonSchemaShapeCheck::new()?);
    let outcome = validator.validate(&patch, &schema, &options);
    let report = outcome.report();

    println!("{}", serde_json::to_string_pretty(&report)?);

    let duration_ms = timer.elapsed().as_millis();
    tracing::info!(
        event = "check_finished",
        valid = report.valid,
        operations = report.operations.len(),
        duration_ms = duration_ms
    );

    if report.valid {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_REJECTED))
    }
}

fn run_resolve(args: ResolveArgs) -> CliResult<ExitCode> {
    let schema = load_schema(&args.schema)?;

    match resolve(&schema, &args.pointer) {
        Some(node) => {
            println!("{}", serde_json::to_string_pretty(&node.to_node())?);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("{} is not defined by the schema", args.pointer);
            Ok(ExitCode::from(EXIT_REJECTED))
        }
    }
}

fn run_emit_schema(args: EmitSchemaArgs) -> CliResult<ExitCode> {
    let json = match args.target {
        SchemaTarget::Operation => serde_json::to_string_pretty(&operation_json_schema())?,
        SchemaTarget::Schema => serde_json::to_string_pretty(&schema_json_schema())?,
        SchemaTarget::Options => serde_json::to_string_pretty(&options_json_schema())?,
    };
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}

fn run_config(args: ValidationArgs, mut config: CliConfig) -> CliResult<ExitCode> {
    config.validate = args.apply(config.validate);
    print!("{}", render_config(&config)?);
    Ok(ExitCode::SUCCESS)
}

fn load_schema(path: &Path) -> CliResult<SchemaNode> {
    let contents = std::fs::read_to_string(path)?;
    let schema = SchemaNode::from_json_str(&contents)?;
    Ok(schema)
}

fn read_patch(path: &Path) -> CliResult<Value> {
    let contents = if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(path)?
    };
    let patch = serde_json::from_str(&contents)?;
    Ok(patch)
}
