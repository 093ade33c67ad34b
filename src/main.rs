use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jurisearch::cli;

#[derive(Parser)]
#[command(name = "jurisearch")]
#[command(about = "Hybrid lexical + semantic retrieval over legal documents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the corpus with a single query
    Search {
        /// Corpus CSV path (KEY, ENUNCIADO, EXCERTO columns)
        #[arg(short, long)]
        corpus: String,

        /// Query text
        #[arg(short, long)]
        query: String,

        /// Number of results to return
        #[arg(short = 'k', long, default_value = "10")]
        top_k: usize,

        /// Embedding backend: token, mock, or none (lexical-only)
        #[arg(short, long, default_value = "token")]
        backend: String,

        /// Embedding dimension for the built-in backends
        #[arg(long, default_value = "256")]
        dimension: usize,

        /// Maximum documents to load from the corpus
        #[arg(long)]
        limit: Option<usize>,

        /// Also report near-duplicate result pairs
        #[arg(long)]
        show_pairs: bool,
    },

    /// Run a query batch and export ranked candidates as CSV
    Candidates {
        /// Corpus CSV path
        #[arg(short, long)]
        corpus: String,

        /// Queries CSV path (ID, TEXT columns)
        #[arg(short, long)]
        queries: String,

        /// Output CSV path (QUERY_ID, DOC_ID, SCORE, RANK)
        #[arg(short, long)]
        output: String,

        /// Number of candidates per query
        #[arg(short = 'k', long, default_value = "20")]
        top_k: usize,

        /// Embedding backend: token, mock, or none
        #[arg(short, long, default_value = "token")]
        backend: String,

        /// Embedding dimension for the built-in backends
        #[arg(long, default_value = "256")]
        dimension: usize,

        /// Maximum documents to load from the corpus
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Evaluate exported candidates against relevance judgments
    Eval {
        /// Candidates CSV path (as written by the candidates command)
        #[arg(short, long)]
        candidates: String,

        /// Qrels CSV path (QUERY_ID, DOC_ID, SCORE columns)
        #[arg(short, long)]
        qrels: String,

        /// Cutoff for the @K metrics
        #[arg(short = 'k', long, default_value = "10")]
        k: usize,

        /// Print metrics as JSON instead of plain text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jurisearch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            corpus,
            query,
            top_k,
            backend,
            dimension,
            limit,
            show_pairs,
        } => {
            cli::search(corpus, query, top_k, backend, dimension, limit, show_pairs)?;
        }

        Commands::Candidates {
            corpus,
            queries,
            output,
            top_k,
            backend,
            dimension,
            limit,
        } => {
            cli::candidates(corpus, queries, output, top_k, backend, dimension, limit)?;
        }

        Commands::Eval {
            candidates,
            qrels,
            k,
            json,
        } => {
            cli::eval(candidates, qrels, k, json)?;
        }
    }

    Ok(())
}
