use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use curator_engine::{ComposeRequest, TitleEngine};
use curator_extractor::{extract, normalize};
use curator_grouping::{FileStabilityStore, MemoryStabilityStore, StabilityStore};
use curator_keyword_index::{HashEmbedder, KeywordCorpus, KeywordIndex, QueryPlanner};
use curator_protocol::{EngineConfig, TruthAttributes};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "listing-curator")]
#[command(about = "Keyword curation and constrained title composition", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a curated title for one product listing
    Compose(ComposeArgs),

    /// Print the retrieval queries planned for a title (debugging aid)
    Plan(PlanArgs),

    /// Show keyword corpus statistics
    #[command(name = "corpus-info")]
    CorpusInfo(CorpusInfoArgs),
}

#[derive(Args)]
struct ComposeArgs {
    /// Raw listing title
    #[arg(long)]
    title: String,

    /// Truth attributes as inline JSON (mutually exclusive with --truth-file)
    #[arg(long, conflicts_with = "truth_file")]
    truth: Option<String>,

    /// Path to a JSON file with truth attributes
    #[arg(long)]
    truth_file: Option<PathBuf>,

    /// Path to the keyword corpus JSON
    #[arg(long)]
    corpus: PathBuf,

    /// Product id keying the hysteresis store
    #[arg(long, default_value = "unknown")]
    product_id: String,

    /// Engine configuration TOML (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Hysteresis store file; in-memory when omitted
    #[arg(long)]
    stability_file: Option<PathBuf>,

    /// Override the configured global maximum length
    #[arg(long)]
    max_chars: Option<usize>,

    /// Output the full composition report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct PlanArgs {
    /// Raw listing title
    #[arg(long)]
    title: String,

    /// Truth attributes as inline JSON
    #[arg(long)]
    truth: Option<String>,

    /// Engine configuration TOML
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CorpusInfoArgs {
    /// Path to the keyword corpus JSON
    #[arg(long)]
    corpus: PathBuf,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    let json_output = match &cli.command {
        Commands::Compose(args) => args.json,
        Commands::Plan(args) => args.json,
        Commands::CorpusInfo(args) => args.json,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Compose(args) => run_compose(args).await,
        Commands::Plan(args) => run_plan(args),
        Commands::CorpusInfo(args) => run_corpus_info(args).await,
    }
}

async fn run_compose(args: ComposeArgs) -> Result<()> {
    let mut config = load_config(args.config.clone())?;
    if let Some(max_chars) = args.max_chars {
        config.max_title_chars = max_chars;
    }
    let max_chars = config.max_title_chars;

    let truth = load_truth(args.truth.as_deref(), args.truth_file.clone())?;

    let corpus = KeywordCorpus::load(&args.corpus)
        .await
        .with_context(|| format!("Failed to load corpus from {}", args.corpus.display()))?;
    let embedder = Arc::new(HashEmbedder::new(corpus.dimension));
    let index = Arc::new(
        KeywordIndex::build(&corpus, embedder.clone()).context("Failed to build keyword index")?,
    );

    let file_store = match &args.stability_file {
        Some(path) => Some(Arc::new(
            FileStabilityStore::open(path)
                .await
                .with_context(|| format!("Failed to open stability store {}", path.display()))?,
        )),
        None => None,
    };
    let store: Arc<dyn StabilityStore> = match &file_store {
        Some(store) => Arc::clone(store) as Arc<dyn StabilityStore>,
        None => Arc::new(MemoryStabilityStore::new()),
    };

    let engine = TitleEngine::new(config, index, embedder, store)
        .context("Invalid engine configuration")?;

    let request = ComposeRequest {
        product_id: args.product_id.clone(),
        raw_title: args.title.clone(),
        truth,
    };
    let report = engine.compose(&request).await?;

    if let Some(store) = &file_store {
        store
            .save()
            .await
            .context("Failed to persist stability store")?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.final_title);
        eprintln!();
        eprintln!("length: {} / {} chars", report.length, max_chars);
        for zone in &report.zones {
            eprintln!(
                "zone {}: {}/{} chars, {} tokens",
                zone.zone.as_str(),
                zone.used_chars,
                zone.budget_chars,
                zone.tokens.len()
            );
        }
        if !report.conflicts.is_empty() {
            eprintln!("truth conflicts resolved: {}", report.conflicts.len());
        }
        if !report.rejected.is_empty() {
            eprintln!("rejected candidates: {}", report.rejected.len());
        }
    }

    Ok(())
}

fn run_plan(args: PlanArgs) -> Result<()> {
    let config = load_config(args.config)?;
    let truth = load_truth(args.truth.as_deref(), None)?;

    let normalized = normalize(extract(&args.title), &truth, &args.title);
    let planner = QueryPlanner::new(config.max_queries, config.suggested_query_quota);
    let queries = planner.plan(&normalized.tokens);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&queries)?);
    } else {
        for query in &queries {
            println!("{query}");
        }
        eprintln!("{} queries planned", queries.len());
    }
    Ok(())
}

async fn run_corpus_info(args: CorpusInfoArgs) -> Result<()> {
    let corpus = KeywordCorpus::load(&args.corpus)
        .await
        .with_context(|| format!("Failed to load corpus from {}", args.corpus.display()))?;

    if args.json {
        println!(
            "{}",
            serde_json::json!({
                "entries": corpus.len(),
                "dimension": corpus.dimension,
                "embedder_id": corpus.embedder_id,
                "schema_version": corpus.schema_version,
            })
        );
    } else {
        eprintln!("entries: {}", corpus.len());
        eprintln!("dimension: {}", corpus.dimension);
        eprintln!("embedder: {}", corpus.embedder_id);
    }
    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: EngineConfig =
        toml::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))?;
    config
        .validate()
        .map_err(|err| anyhow::anyhow!("Invalid config {}: {err}", path.display()))?;
    Ok(config)
}

fn load_truth(inline: Option<&str>, file: Option<PathBuf>) -> Result<TruthAttributes> {
    let raw = match (inline, file) {
        (Some(raw), _) => raw.to_string(),
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read truth file {}", path.display()))?,
        (None, None) => return Ok(TruthAttributes::new()),
    };
    let mut truth: TruthAttributes =
        serde_json::from_str(&raw).context("Invalid truth attributes JSON")?;
    let dropped = truth.sanitize();
    for token_type in dropped {
        log::warn!(
            "ignoring non-truth-bearing attribute '{}'",
            token_type.as_str()
        );
    }
    Ok(truth)
}
