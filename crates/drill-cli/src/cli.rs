//! Command definitions and handlers for `streamdrill`.

use crate::config::RunConfig;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use drill_catalog::{Catalog, CatalogEntry};
use drill_core::{FunctionRegistry, Namespace};
use drill_report::OutputFormat;
use drill_verify::Verifier;
use std::io::Write;
use tracing::{debug, info};

/// Exercise verifier for the stream-processing lessons.
#[derive(Parser)]
#[command(name = "streamdrill")]
#[command(about = "Run stream-processing exercises and report which ones pass")]
#[command(version)]
#[command(
    long_about = "streamdrill evaluates exercise pipelines (filter, map, distinct, skip, limit, reduce...) over fixed inputs and compares each result with its expected value.\n\nExample usage:\n  streamdrill run --builtin --filter '^phase0'\n  streamdrill run --catalog my_lessons.yaml --format json"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "warn", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Verify exercises and print a report.
    ///
    /// Exits with 0 when every selected exercise passes, 1 when any fails or
    /// cannot be evaluated, and 2 when the run itself cannot start.
    Run(RunArgs),

    /// List the selected exercises and their pipelines.
    #[command(alias = "ls")]
    List(SelectArgs),

    /// List the built-in predicates, transforms and operators.
    Functions,
}

/// Which catalogs and exercises to use.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectArgs {
    /// Catalog file to load (repeatable).
    #[arg(long = "catalog", value_name = "PATH")]
    pub catalogs: Vec<String>,

    /// Load the embedded lessons.
    #[arg(long)]
    pub builtin: bool,

    /// Only exercises whose id matches this regex.
    #[arg(long, value_name = "REGEX")]
    pub filter: Option<String>,

    /// YAML run configuration.
    #[arg(long, value_name = "PATH", conflicts_with = "preset")]
    pub config: Option<String>,

    /// Named configuration (lessons, phase0, phase1, ci).
    #[arg(long)]
    pub preset: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    /// Output format (text, json).
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Also list passing exercises and run provenance.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse CLI arguments.
///
/// Lets main.rs read the log level before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the parsed command. `Ok(false)` means some exercise did not pass.
pub fn run_with_cli(cli: Cli) -> Result<bool> {
    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Commands::Run(args) => run_command(&args, &mut stdout),
        Commands::List(args) => list_command(&args, &mut stdout).map(|_| true),
        Commands::Functions => functions_command(&mut stdout).map(|_| true),
    }
}

/// Merge preset or config file with command line flags
pub fn resolve_config(
    select: &SelectArgs,
    format: Option<OutputFormat>,
    verbose: bool,
) -> Result<RunConfig> {
    let mut config = match (&select.preset, &select.config) {
        (Some(name), _) => RunConfig::preset(name)?,
        (None, Some(path)) => RunConfig::load(path)?,
        (None, None) => RunConfig::default(),
    };

    if !select.catalogs.is_empty() {
        config.catalogs = select.catalogs.clone();
    }
    if select.builtin {
        config.builtin = true;
    }
    if let Some(filter) = &select.filter {
        config.filter = Some(filter.clone());
    }
    if let Some(format) = format {
        config.format = format;
    }
    if verbose {
        config.verbose = true;
    }

    // Nothing named: run the embedded lessons.
    if !config.has_sources() {
        config.builtin = true;
    }

    debug!(?config, "resolved run configuration");
    Ok(config)
}

/// Load every configured catalog, embedded lessons first
pub fn load_catalogs(config: &RunConfig) -> Result<Vec<Catalog>> {
    let mut catalogs = Vec::new();
    if config.builtin {
        let lessons = drill_catalog::builtin().context("Failed to compile the embedded lessons")?;
        catalogs.extend(lessons);
    }
    for path in &config.catalogs {
        catalogs.push(Catalog::load(path)?);
    }
    info!(catalogs = catalogs.len(), "catalogs loaded");
    Ok(catalogs)
}

fn verifier(config: &RunConfig) -> Result<Verifier> {
    Ok(match &config.filter {
        Some(pattern) => Verifier::with_filter(pattern)?,
        None => Verifier::new(),
    })
}

pub fn run_command(args: &RunArgs, out: &mut impl Write) -> Result<bool> {
    let config = resolve_config(&args.select, args.format, args.verbose)?;
    let verifier = verifier(&config)?;
    let catalogs = load_catalogs(&config)?;

    let report = verifier.run(&catalogs);
    let rendered = drill_report::render(&report, config.format, config.verbose)
        .context("Failed to render report")?;
    out.write_all(rendered.as_bytes())?;

    Ok(report.all_passed())
}

pub fn list_command(args: &SelectArgs, out: &mut impl Write) -> Result<()> {
    let config = resolve_config(args, None, false)?;
    let verifier = verifier(&config)?;
    let catalogs = load_catalogs(&config)?;

    for catalog in &catalogs {
        for entry in verifier.select(catalog) {
            match entry {
                CatalogEntry::Ready(spec) => {
                    writeln!(out, "{}  {}", spec.id, spec.pipeline_text())?
                }
                CatalogEntry::Invalid { id, error } => {
                    writeln!(out, "{}  (invalid: {})", id, error)?
                }
            }
        }
    }
    Ok(())
}

pub fn functions_command(out: &mut impl Write) -> Result<()> {
    let registry = FunctionRegistry::builtin();
    for namespace in [Namespace::Predicate, Namespace::Transform, Namespace::Operator] {
        writeln!(out, "{}s: {}", namespace, registry.ids(namespace).join(", "))?;
    }
    Ok(())
}
