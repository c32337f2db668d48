//! Graph Embed CLI
//!
//! Attaches embeddings to an export directory, either from a precomputed
//! vectors file (a JSON object mapping node id to an array of numbers) or by
//! running an embedding program over every node:
//!
//! ```text
//! graph-embed --vectors vectors.json
//! graph-embed --dir graph -- python3 embed.py --model minilm
//! ```
//!
//! Without either, the program from `embedding.command` is used.

use anyhow::Context;
use clap::Parser;
use paper_graph::embedding::{apply_embeddings, embed_graph, l2_normalize, CommandEmbedder};
use paper_graph::graph::{IntegrityValidator, KnowledgeGraph};
use paper_graph::{read_graph, write_graph, GraphConfig, NodeId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const NO_EMBEDDER: &str =
    "Nothing to embed with: pass --vectors, a program after --, or set embedding.command";

#[derive(Parser)]
#[command(name = "graph-embed")]
#[command(about = "Attach embedding vectors to exported nodes")]
struct Cli {
    /// JSON file mapping node id to vector
    #[arg(short, long, conflicts_with = "command")]
    vectors: Option<PathBuf>,

    /// Export directory (defaults to paths.output_dir)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Extra config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Embedding program and its arguments (defaults to embedding.command)
    #[arg(last = true)]
    command: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = GraphConfig::load_from(cli.config.as_deref())?;
    let dir = cli.dir.unwrap_or_else(|| config.paths.output_dir.clone());

    let mut graph = read_graph(&dir)
        .with_context(|| format!("Failed to read export {}", dir.display()))?;
    println!("📖 Loaded {} nodes from {:?}", graph.node_count(), dir);

    match &cli.vectors {
        Some(path) => attach_vectors(&mut graph, path, config.embedding.normalize)?,
        None => {
            let embedder = if cli.command.is_empty() {
                config.embedding.embedder()
            } else {
                CommandEmbedder::from_argv(&cli.command).ok()
            }
            .context(NO_EMBEDDER)?;

            println!("🧮 Embedding with '{}'", embedder.program());
            let total = embed_graph(
                &mut graph,
                &embedder,
                config.embedding.batch_size,
                config.embedding.normalize,
            )?;
            println!("✅ {} node(s) embedded", total);
        }
    }

    write_graph(&dir, &graph, config.export.batch_size)?;

    let missing: usize = IntegrityValidator::new(&graph)
        .check_embeddings()
        .values()
        .map(|c| c.empty_embedding)
        .sum();
    if missing > 0 {
        println!("⚠️  {} node(s) still without an embedding", missing);
    }

    Ok(())
}

fn attach_vectors(graph: &mut KnowledgeGraph, path: &Path, normalize: bool) -> anyhow::Result<()> {
    let vectors = load_vectors(path, normalize)?;
    let summary = apply_embeddings(graph, &vectors);

    println!("✅ {} node(s) embedded", summary.matched);
    if summary.unmatched > 0 {
        println!("⚠️  {} vector(s) matched no node", summary.unmatched);
    }
    Ok(())
}

/// Read an `{id: [f32...]}` object, optionally normalizing every vector
fn load_vectors(path: &Path, normalize: bool) -> anyhow::Result<HashMap<NodeId, Vec<f32>>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read vectors from {}", path.display()))?;
    let mut vectors: HashMap<NodeId, Vec<f32>> = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse JSON in {}: {}", path.display(), e))?;
    if normalize {
        vectors.values_mut().for_each(|v| l2_normalize(v));
    }
    Ok(vectors)
}
