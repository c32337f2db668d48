//! Graph Build CLI
//!
//! Turns a JSON array of paper records into an export directory, optionally
//! writing the quality report alongside.

use clap::Parser;
use paper_graph::graph::{build_graph, BuildOutput, IntegrityValidator, NodeKind, Severity};
use paper_graph::{load_records, write_graph, GraphConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "graph-build")]
#[command(about = "Build the paper knowledge graph and export it as flat tables")]
struct Cli {
    /// Input JSON file (defaults to paths.input)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory (defaults to paths.output_dir)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Extra config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write the quality report
    #[arg(long)]
    validate: bool,
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

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = GraphConfig::load_from(cli.config.as_deref())?;
    if let Some(input) = cli.input {
        config.paths.input = input;
    }
    if let Some(output) = cli.output {
        config.paths.output_dir = output;
    }
    let policy = config.policy()?;

    println!("📖 Reading records from {:?}", config.paths.input);
    let records = load_records(&config.paths.input)?;
    println!("   {} records", records.len());

    let BuildOutput { graph, stats } = build_graph(&records, &policy);

    println!();
    println!("📊 Nodes");
    for (kind, count) in graph.node_counts() {
        println!("   {:20} {:6}", kind, count);
    }
    println!("   {:20} {:6}", "total", graph.node_count());

    println!();
    println!("🔗 Relations: {} kept, {} dropped", stats.edges_retained, stats.total_dropped());
    for (reason, count) in &stats.edges_dropped {
        println!("   └─ {}: {}", reason, count);
    }
    if stats.duplicate_papers > 0 {
        println!("⚠️  {} duplicate paper record(s) dropped", stats.duplicate_papers);
    }
    if stats.papers_without_id > 0 {
        println!("⚠️  {} record(s) without paper_id", stats.papers_without_id);
    }

    let summary = write_graph(&config.paths.output_dir, &graph, config.export.batch_size)?;
    println!();
    println!(
        "✅ Exported {} nodes and {} relations to {:?}",
        summary.nodes, summary.edges, config.paths.output_dir
    );

    if cli.validate {
        let report = IntegrityValidator::new(&graph)
            .with_records(&records)
            .with_max_details(config.validation.max_details)
            .validate();
        let diagnostics = report.diagnostics();

        let path = config.quality_report_path();
        std::fs::write(&path, config.export.output_format.to_json(&report)?)?;

        println!();
        println!(
            "🔍 Quality: {} error(s), {} warning(s), {} paper(s) checked",
            diagnostics.count(Severity::Error),
            diagnostics.count(Severity::Warning),
            graph.nodes(NodeKind::Paper).len()
        );
        println!("✅ Report written to {:?}", path);
    }

    Ok(())
}
