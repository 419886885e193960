//! CLI entry point for the `lineage` command-line tool.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use topic_lineage::cli::commands::{self, EvolveOutputs};
use topic_lineage::config::{EvolutionConfig, MatchingStrategy};
use topic_lineage::types::DEFAULT_DIMENSION;
use topic_lineage::LineageError;

#[derive(Parser)]
#[command(
    name = "lineage",
    about = "Topic lineage: track entity clusters and their identities across years"
)]
struct Cli {
    /// Output format: "text" (default) or "json"
    #[arg(long, default_value = "text")]
    format: String,

    /// Enable debug logging
    #[arg(long)]
    verbose: bool,

    /// Configuration file (TOML). Defaults to ./lineage.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration
    Config,
    /// Show cumulative entity counts per slice year
    Slices {
        /// Corpus JSON file
        corpus: PathBuf,
    },
    /// Embed every corpus entity into a .lemb cache
    Embed {
        /// Corpus JSON file
        corpus: PathBuf,
        /// Path of the cache file to write
        cache: PathBuf,
        /// Precomputed vectors ({"entity": [..]}) instead of hashed n-grams
        #[arg(long)]
        vectors: Option<PathBuf>,
        /// Hashed n-gram dimension
        #[arg(long, default_value_t = DEFAULT_DIMENSION)]
        dimension: usize,
    },
    /// Describe a .lemb cache file
    Info {
        /// Path to the cache file
        cache: PathBuf,
    },
    /// Cluster every slice and propagate identities
    Evolve {
        /// Corpus JSON file
        corpus: PathBuf,
        /// Embedding cache; hashed n-grams are used when absent
        #[arg(long)]
        cache: Option<PathBuf>,
        /// Evolution output file
        #[arg(long, default_value = "evolution.json")]
        out: PathBuf,
        /// Also write the identity -> name table here
        #[arg(long)]
        names: Option<PathBuf>,
        /// Also write 2-D entity coordinates here
        #[arg(long)]
        projection: Option<PathBuf>,
        /// Override the similarity threshold
        #[arg(long)]
        threshold: Option<f64>,
        /// Matching strategy: greedy or optimal
        #[arg(long)]
        strategy: Option<String>,
        /// Pretty-print JSON outputs
        #[arg(long)]
        pretty: bool,
    },
    /// Derive unique names for an evolution file
    Name {
        /// Evolution JSON file
        evolution: PathBuf,
        /// Write the name table here
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Birth year, last year and sizes of every identity
    Summary {
        /// Evolution JSON file
        evolution: PathBuf,
        /// Name table from `evolve --names` or `name --out`
        #[arg(long)]
        names: Option<PathBuf>,
    },
    /// Per-document cluster count vectors for one year
    Vectors {
        /// Corpus JSON file
        corpus: PathBuf,
        /// Evolution JSON file
        evolution: PathBuf,
        /// Slice year
        #[arg(long)]
        year: i32,
    },
}

fn main() {
    let cli = Cli::parse();
    let json = cli.format == "json";

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let config = match EvolutionConfig::load_or_default(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(3);
        }
    };

    let result = match cli.command {
        Commands::Config => commands::cmd_config(&config, json),
        Commands::Slices { corpus } => commands::cmd_slices(&corpus, &config, json),
        Commands::Embed {
            corpus,
            cache,
            vectors,
            dimension,
        } => commands::cmd_embed(&corpus, &cache, vectors.as_deref(), dimension, json),
        Commands::Info { cache } => commands::cmd_info(&cache, json),
        Commands::Evolve {
            corpus,
            cache,
            out,
            names,
            projection,
            threshold,
            strategy,
            pretty,
        } => {
            let mut config = config;
            if let Some(t) = threshold {
                config.propagation.similarity_threshold = t;
            }
            match strategy.as_deref() {
                None => {}
                Some("greedy") => config.propagation.strategy = MatchingStrategy::Greedy,
                Some("optimal") | Some("optimal_bipartite") => {
                    config.propagation.strategy = MatchingStrategy::OptimalBipartite
                }
                Some(other) => {
                    eprintln!("Invalid matching strategy: {}", other);
                    process::exit(3);
                }
            }
            commands::cmd_evolve(
                &corpus,
                cache.as_deref(),
                config,
                EvolveOutputs {
                    evolution: &out,
                    names: names.as_deref(),
                    projection: projection.as_deref(),
                    pretty,
                },
                json,
            )
        }
        Commands::Name { evolution, out } => {
            commands::cmd_name(&evolution, &config, out.as_deref(), json)
        }
        Commands::Summary { evolution, names } => {
            commands::cmd_summary(&evolution, names.as_deref(), &config, json)
        }
        Commands::Vectors {
            corpus,
            evolution,
            year,
        } => commands::cmd_vectors(&corpus, &evolution, year, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let code = match &e {
            LineageError::Io(_) => 1,
            LineageError::InvalidMagic
            | LineageError::UnsupportedVersion(_)
            | LineageError::Truncated
            | LineageError::Corrupt(_)
            | LineageError::Compression(_) => 2,
            LineageError::Config(_)
            | LineageError::InvalidThreshold(_)
            | LineageError::InvalidCandidateRange(_) => 3,
            LineageError::NoUsableSlices { .. } | LineageError::EmptySlice(_) => 4,
            _ => 5,
        };
        process::exit(code);
    }
}
