//! Graph Statistics CLI

use clap::Parser;
use paper_graph::{read_graph, GraphConfig, StatisticsReport};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "graph-stats")]
#[command(about = "Summarize nodes, relations, papers and connectivity of an export")]
struct Cli {
    /// Export directory (defaults to paths.output_dir)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Report file (defaults to paths.statistics_report inside the directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Extra config file
    #[arg(short, long)]
    config: Option<PathBuf>,
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
    if let Some(dir) = cli.dir {
        config.paths.output_dir = dir;
    }

    let graph = read_graph(&config.paths.output_dir)?;
    let report = StatisticsReport::compute(
        &graph,
        config.statistics.top_nodes,
        config.statistics.top_categories,
    );

    println!("📊 Nodes");
    for (kind, count) in &report.node_counts {
        println!("   {:20} {:6}", kind, count);
    }
    println!("   {:20} {:6}", "total", report.total_nodes);

    println!();
    println!("📊 Relations: {}", report.relations.total);
    for (relation, count) in &report.relations.by_type {
        println!(
            "   {:30} {:6} ({:5.1}%)",
            relation,
            count,
            report.relations.percentage(*count)
        );
    }

    println!();
    println!("📊 Papers: {}", report.papers.total_papers);
    if let (Some(min), Some(max)) = (report.papers.year_range.min, report.papers.year_range.max) {
        println!("   years {} - {}", min, max);
    }
    for (category, count) in &report.papers.top_categories {
        println!("   {:40} {:4}", category, count);
    }

    println!();
    match &report.connectivity {
        Some(connectivity) => {
            println!("📊 Connectivity: {} connected node(s)", connectivity.nodes_with_relations);
            println!(
                "   degree min {} / max {} / mean {:.2} / median {}",
                connectivity.min_degree,
                connectivity.max_degree,
                connectivity.mean_degree,
                connectivity.median_degree
            );
            for node in &connectivity.top_nodes {
                println!("   └─ {} ({})", node.id, node.degree);
            }
        }
        None => println!("📊 Connectivity: no relations"),
    }
    println!("   {} component(s)", report.components);

    let path = cli.output.unwrap_or_else(|| config.statistics_report_path());
    std::fs::write(&path, config.export.output_format.to_json(&report)?)?;
    println!();
    println!("✅ Report written to {:?}", path);

    Ok(())
}
