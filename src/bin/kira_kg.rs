use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_kg_normalizer::app::{App, NormalizationSummary, NormalizeRequest};
use kira_kg_normalizer::cache::{CachedResolutionClient, JsonFileCache};
use kira_kg_normalizer::config::{ConfigLoader, ResolvedConfig, default_cache_path};
use kira_kg_normalizer::conflation::ConflationConfig;
use kira_kg_normalizer::error::KgError;
use kira_kg_normalizer::nodenorm::NodeNormHttpClient;
use kira_kg_normalizer::output::JsonOutput;

#[derive(Parser)]
#[command(name = "kira-kg")]
#[command(about = "Normalize knowledge-graph identifiers against a node normalization service")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Normalize KGX JSON Lines node and edge files")]
    Normalize(NormalizeArgs),
    #[command(about = "Resolve CURIEs and print their equivalence classes")]
    Resolve(ResolveArgs),
}

#[derive(Args, Clone)]
struct ConflationArgs {
    #[arg(
        long,
        overrides_with = "no_gp_conflate",
        help = "Merge genes with their protein products"
    )]
    gp_conflate: bool,

    #[arg(long, help = "Keep genes and their protein products separate")]
    no_gp_conflate: bool,

    #[arg(
        long,
        overrides_with = "no_dc_conflate",
        help = "Merge drugs with their broader chemical identities"
    )]
    dc_conflate: bool,

    #[arg(long, help = "Keep drugs and chemicals separate")]
    no_dc_conflate: bool,
}

#[derive(Args, Clone)]
struct CacheArgs {
    #[arg(long, conflicts_with = "no_cache")]
    cache: bool,

    #[arg(long)]
    no_cache: bool,

    #[arg(long)]
    cache_path: Option<Utf8PathBuf>,
}

#[derive(Args, Clone)]
struct NormalizeArgs {
    #[arg(long)]
    nodes: Utf8PathBuf,

    #[arg(long)]
    edges: Option<Utf8PathBuf>,

    #[arg(long)]
    out_dir: Utf8PathBuf,

    #[arg(long)]
    merge_duplicates: bool,

    #[arg(long, help = "Print the summary as JSON")]
    json: bool,

    #[command(flatten)]
    conflation: ConflationArgs,

    #[command(flatten)]
    cache: CacheArgs,
}

#[derive(Args, Clone)]
struct ResolveArgs {
    #[arg(required = true)]
    curies: Vec<String>,

    #[command(flatten)]
    conflation: ConflationArgs,

    #[command(flatten)]
    cache: CacheArgs,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<KgError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KgError) -> u8 {
    match error {
        KgError::InvalidInput(_)
        | KgError::InvalidCurie(_)
        | KgError::ConfigRead(_)
        | KgError::ConfigParse(_)
        | KgError::GraphRead(_)
        | KgError::GraphParse { .. } => 2,
        error if error.is_resolution_service_error() => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(endpoint) = cli.endpoint {
        config.nodenorm.endpoint = endpoint;
    }

    match cli.command {
        Commands::Normalize(args) => run_normalize(args, &config),
        Commands::Resolve(args) => run_resolve(args, &config),
    }
}

fn run_normalize(args: NormalizeArgs, config: &ResolvedConfig) -> miette::Result<()> {
    let request = NormalizeRequest {
        nodes_path: args.nodes,
        edges_path: args.edges,
        out_dir: args.out_dir,
        conflation: resolve_conflation(&args.conflation, config),
        merge_duplicates: args.merge_duplicates || config.merge_duplicates,
    };
    let client = NodeNormHttpClient::with_settings(&config.nodenorm)?;

    let summary = match open_cache(&args.cache, config)? {
        Some(cache) => {
            let app = App::new(CachedResolutionClient::new(client, cache));
            let summary = app.normalize_files(&request)?;
            app.client().cache().flush()?;
            summary
        }
        None => App::new(client).normalize_files(&request)?,
    };

    if args.json {
        JsonOutput::print_summary(&summary).into_diagnostic()?;
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn run_resolve(args: ResolveArgs, config: &ResolvedConfig) -> miette::Result<()> {
    let conflation = resolve_conflation(&args.conflation, config);
    let client = NodeNormHttpClient::with_settings(&config.nodenorm)?;

    let result = match open_cache(&args.cache, config)? {
        Some(cache) => {
            let app = App::new(CachedResolutionClient::new(client, cache));
            let result = app.resolve(&args.curies, conflation)?;
            app.client().cache().flush()?;
            result
        }
        None => App::new(client).resolve(&args.curies, conflation)?,
    };
    JsonOutput::print_resolve(&result).into_diagnostic()?;
    Ok(())
}

fn resolve_conflation(args: &ConflationArgs, config: &ResolvedConfig) -> ConflationConfig {
    config.conflation.with_overrides(
        flag_override(args.gp_conflate, args.no_gp_conflate),
        flag_override(args.dc_conflate, args.no_dc_conflate),
    )
}

fn flag_override(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn open_cache(args: &CacheArgs, config: &ResolvedConfig) -> miette::Result<Option<JsonFileCache>> {
    let enabled = !args.no_cache && (args.cache || config.cache.enabled);
    if !enabled {
        return Ok(None);
    }
    let path = match args.cache_path.clone().or_else(|| config.cache.path.clone()) {
        Some(path) => path,
        None => default_cache_path()?,
    };
    let cache = JsonFileCache::open(path)?;
    Ok(Some(cache))
}

fn print_summary(summary: &NormalizationSummary) {
    let stats = &summary.stats;
    println!(
        "nodes: {} in, {} out, {} dropped, {} merged",
        stats.nodes_in, stats.nodes_out, stats.nodes_dropped, stats.nodes_merged
    );
    println!(
        "edges: {} in, {} out, {} dropped",
        stats.edges_in, stats.edges_out, stats.edges_dropped
    );
    println!("conflation: {}", summary.conflation.tag());
    println!("wrote {} and {}", summary.output_nodes, summary.output_edges);
}
