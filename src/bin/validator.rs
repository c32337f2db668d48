//! Graph Validator CLI
//!
//! Checks an export directory and writes the quality report. Findings never
//! change the exit status; only unreadable input does.

use clap::Parser;
use paper_graph::graph::{IntegrityReport, IntegrityValidator};
use paper_graph::{load_records, read_graph, GraphConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "graph-validator")]
#[command(about = "Check duplicates, orphans, dangling relations and embedding coverage")]
struct Cli {
    /// Export directory (defaults to paths.output_dir)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Source records to audit for repeated paper ids
    #[arg(short, long)]
    records: Option<PathBuf>,

    /// Report file (defaults to paths.quality_report inside the directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Extra config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print every finding
    #[arg(short, long)]
    verbose: bool,
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
    let records = match &cli.records {
        Some(path) => Some(load_records(path)?),
        None => None,
    };

    let mut validator =
        IntegrityValidator::new(&graph).with_max_details(config.validation.max_details);
    if let Some(records) = &records {
        validator = validator.with_records(records);
    }
    let report = validator.validate();

    print_report(&report);

    if cli.verbose {
        let diagnostics = report.diagnostics();
        if !diagnostics.is_empty() {
            println!();
            print!("{}", diagnostics);
        }
    }

    let path = cli.output.unwrap_or_else(|| config.quality_report_path());
    std::fs::write(&path, config.export.output_format.to_json(&report)?)?;
    println!();
    println!("✅ Report written to {:?}", path);

    Ok(())
}

fn print_report(report: &IntegrityReport) {
    println!("🔍 Duplicates");
    if report.duplicates.is_empty() {
        println!("   ✅ no duplicate keys");
    }
    for (kind, groups) in &report.duplicates {
        println!("   ❌ {}: {} duplicate key(s)", kind, groups.len());
        for group in groups.iter().take(5) {
            println!("      └─ '{}' x{}", group.key, group.count);
        }
    }
    for duplicate in &report.duplicate_records {
        println!(
            "   ⚠️  paper_id '{}' in {} input records",
            duplicate.paper_id,
            duplicate.records.len()
        );
    }
    for collision in &report.id_collisions {
        println!("   ❌ id {} shared by {:?}", collision.id, collision.kinds);
    }

    println!();
    println!("🔍 Orphan nodes");
    for (kind, orphans) in &report.orphans {
        if orphans.total == 0 {
            continue;
        }
        println!(
            "   {:20} {:6} total, {:6} orphan ({:5.1}%)",
            kind, orphans.total, orphans.orphan, orphans.percentage
        );
    }

    println!();
    println!("🔍 Relations");
    let relations = &report.relations;
    println!("   {} total", relations.total_relations);
    if relations.invalid_relations == 0 {
        println!("   ✅ all endpoints resolve");
    } else {
        println!(
            "   ❌ {} invalid ({} missing source, {} missing target)",
            relations.invalid_relations, relations.missing_from, relations.missing_to
        );
        for invalid in relations.invalid_details.iter().take(5) {
            println!(
                "      └─ {} {} -> {}",
                invalid.rel_type, invalid.from_id, invalid.to_id
            );
        }
    }

    println!();
    println!("🔍 Embedding coverage");
    for (kind, coverage) in &report.embeddings {
        if coverage.total == 0 {
            continue;
        }
        println!(
            "   {:20} {:6}/{:<6} ({:5.1}%)",
            kind, coverage.with_embedding, coverage.total, coverage.coverage
        );
    }

    println!();
    if report.is_clean() {
        println!("✅ No integrity problems found");
    } else {
        println!(
            "⚠️  {} duplicate group(s), {} orphan(s), {} invalid relation endpoint(s)",
            report.total_duplicates(),
            report.total_orphans(),
            relations.invalid_relations
        );
    }
}
