//! shape-fusion
//!
//! Command-line interface for SHACL-scoped OWL fusion.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indexmap::IndexMap;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use shape_fusion::format::{serialize, to_turtle};
use shape_fusion::{
    parse_with_base, ConfigError, Dataset, ErrorResponse, Fusion, FusionConfig, FusionError, FusionMode,
    FusionOutcome, LogLevel, OutputFormat, ParseError, ShapesGraph, Store, Term,
};

#[derive(Parser)]
#[command(name = "shape-fusion")]
#[command(version)]
#[command(about = "Fuse a data graph under OWL 2 RL rules, scoped by SHACL shapes", long_about = None)]
struct Cli {
    /// Data graph files (Turtle)
    #[arg(long, value_name = "FILE", required = true, num_args = 1..)]
    data: Vec<PathBuf>,

    /// Shapes graph files (Turtle)
    #[arg(long, value_name = "FILE", required = true, num_args = 1..)]
    shapes: Vec<PathBuf>,

    /// What to output once the data is fused
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the canonical alias map as JSON ("-" for stdout)
    #[arg(long, value_name = "FILE")]
    aliases: Option<String>,

    /// Fuse each data file as its own graph
    #[arg(long)]
    per_file: bool,

    /// Maximum number of outer fixpoint rounds
    #[arg(long, value_name = "N")]
    max_rounds: Option<usize>,

    /// Base URI for relative references
    #[arg(long)]
    base: Option<String>,

    /// Configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print run statistics to stderr
    #[arg(long)]
    stats: bool,

    /// Verbose output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Whole fused graph
    Fuse,
    /// Fused graph with out-of-scope facts deleted
    ProjectSubtractive,
    /// Only in-scope facts, copied into a new graph
    ProjectAdditive,
}

impl From<ModeArg> for FusionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Fuse => FusionMode::Fuse,
            ModeArg::ProjectSubtractive => FusionMode::ProjectSubtractive,
            ModeArg::ProjectAdditive => FusionMode::ProjectAdditive,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    /// Turtle grouped by subject
    Turtle,
    /// N-Triples (N-Quads with --per-file)
    Ntriples,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Turtle => OutputFormat::Turtle,
            FormatArg::Ntriples => OutputFormat::NTriples,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

/// Structured errors go to stderr as JSON with exit code 2
fn report(err: &anyhow::Error) -> ExitCode {
    let response = if let Some(e) = err.downcast_ref::<FusionError>() {
        Some(ErrorResponse::from(e))
    } else if let Some(e) = err.downcast_ref::<ParseError>() {
        Some(ErrorResponse::from(e))
    } else {
        err.downcast_ref::<ConfigError>().map(ErrorResponse::from)
    };

    match response {
        Some(mut response) => {
            response.message = format!("{:#}", err);
            eprintln!("{}", response.to_json_pretty());
            ExitCode::from(2)
        }
        None => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<FusionConfig> {
    let mut config = match &cli.config {
        Some(path) => FusionConfig::load_with_file(path)?,
        None => FusionConfig::load()?,
    };
    if let Some(mode) = cli.mode {
        config.fusion.mode = mode.into();
    }
    if let Some(format) = cli.format {
        config.general.format = format.into();
    }
    if let Some(rounds) = cli.max_rounds {
        config.fusion.max_rounds = rounds;
    }
    if cli.base.is_some() {
        config.general.base_uri = cli.base.clone();
    }
    config.validate()?;
    Ok(config)
}

fn init_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("shape_fusion={}", level.filter_directive())));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn file_iri(path: &Path) -> String {
    let absolute = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

/// Parse one Turtle file into a store
fn load_graph(path: &Path, base: Option<&str>) -> Result<Store> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let base = base.map(str::to_string).unwrap_or_else(|| file_iri(path));
    let parsed = parse_with_base(&content, &base).with_context(|| format!("Failed to parse {}", path.display()))?;
    debug!(file = %path.display(), triples = parsed.triples.len(), "loaded graph");
    Ok(parsed.into_store())
}

fn load_merged(paths: &[PathBuf], base: Option<&str>) -> Result<Store> {
    let mut store = Store::new();
    for path in paths {
        store.extend(load_graph(path, base)?.iter());
    }
    Ok(store)
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    init_logging(config.general.log_level.adjusted(cli.verbose, cli.quiet));

    let base = config.general.base_uri.as_deref();
    let shapes_store = load_merged(&cli.shapes, base)?;
    let shapes = ShapesGraph::from_store(&shapes_store)?;
    info!(shapes = shapes.len(), "loaded shapes");

    let fusion = Fusion::with_options(config.fusion_options());
    let outcomes: Vec<(Option<Term>, FusionOutcome)> = if cli.per_file {
        let mut dataset = Dataset::new();
        for path in &cli.data {
            dataset.insert_graph(Term::uri(file_iri(path)), load_graph(path, base)?);
        }
        fusion
            .run_dataset(dataset, shapes.shapes())?
            .into_iter()
            .filter(|(name, _)| name.is_some())
            .collect()
    } else {
        let data = load_merged(&cli.data, base)?;
        vec![(None, fusion.run(data, shapes.shapes())?)]
    };

    let output = render(&outcomes, config.general.format, &config.prefixes);
    match &cli.output {
        Some(path) => fs::write(path, output).with_context(|| format!("Failed to write {}", path.display()))?,
        None => io::stdout().write_all(output.as_bytes())?,
    }

    if let Some(target) = &cli.aliases {
        write_aliases(&outcomes, target)?;
    }

    if cli.stats {
        for (name, outcome) in &outcomes {
            if let Some(name) = name {
                eprintln!("# {}", name);
            }
            eprintln!("{}", outcome.stats);
        }
    }
    Ok(())
}

fn render(outcomes: &[(Option<Term>, FusionOutcome)], format: OutputFormat, prefixes: &IndexMap<String, String>) -> String {
    let mut output = String::new();
    for (name, outcome) in outcomes {
        match (name, format) {
            (Some(name), OutputFormat::NTriples) => {
                for t in outcome.store.sorted() {
                    output.push_str(&format!("{} {} {} {} .\n", t.subject, t.predicate, t.object, name));
                }
            }
            (Some(name), OutputFormat::Turtle) => {
                output.push_str(&format!("# graph {}\n", name));
                output.push_str(&to_turtle(&outcome.store, prefixes));
                output.push('\n');
            }
            (None, format) => output.push_str(&serialize(&outcome.store, format, prefixes)),
        }
    }
    output
}

fn write_aliases(outcomes: &[(Option<Term>, FusionOutcome)], target: &str) -> Result<()> {
    let json = match outcomes {
        [(None, outcome)] => outcome.aliases.to_json_pretty()?,
        _ => {
            let by_graph: IndexMap<String, &shape_fusion::AliasMap> = outcomes
                .iter()
                .map(|(name, outcome)| (name.as_ref().map(Term::to_string).unwrap_or_default(), &outcome.aliases))
                .collect();
            serde_json::to_string_pretty(&by_graph)?
        }
    };

    if target == "-" {
        println!("{}", json);
    } else {
        fs::write(target, json).with_context(|| format!("Failed to write {}", target))?;
    }
    Ok(())
}
