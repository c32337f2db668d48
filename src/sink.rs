//! Flat export
//!
//! The graph leaves this crate as flat rows handed to a [`GraphSink`] in
//! fixed-size batches: node tables kind by kind, then the relation table.
//! Whatever the sink does with them (files, a graph store, retries) is its
//! own business.
//!
//! [`DirectorySink`] is the file-backed sink. It writes one JSON Lines file
//! per table:
//!
//! ```text
//! out/
//! ├── nodes_Paper.jsonl
//! ├── nodes_Task.jsonl
//! ├── ...
//! └── relations.jsonl
//! ```
//!
//! and [`read_graph`] reads such a directory back into a [`KnowledgeGraph`].

use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{GraphError, Result};
use crate::graph::{Edge, KnowledgeGraph, Node, NodeKind};

/// File stem of the relation table
pub const RELATIONS_TABLE: &str = "relations";

/// Default number of rows per batch
pub const DEFAULT_BATCH_SIZE: usize = 50;

// =============================================================================
// Sink Trait
// =============================================================================

/// Destination for deduplicated node and edge rows
pub trait GraphSink {
    /// Accept one batch of nodes, all of the same kind
    fn write_nodes(&mut self, kind: NodeKind, batch: &[Node]) -> Result<()>;

    /// Accept one batch of edges
    fn write_edges(&mut self, batch: &[Edge]) -> Result<()>;

    /// Called once after the last batch
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// What [`load_graph`] delivered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub nodes: usize,
    pub edges: usize,
    pub batches: usize,
}

/// Deliver a graph to a sink: every node kind in canonical order, then edges.
///
/// The first sink error aborts the load.
pub fn load_graph(
    sink: &mut dyn GraphSink,
    graph: &KnowledgeGraph,
    batch_size: usize,
) -> Result<LoadSummary> {
    let batch_size = batch_size.max(1);
    let mut summary = LoadSummary::default();

    for kind in NodeKind::ALL {
        for batch in graph.nodes(kind).chunks(batch_size) {
            sink.write_nodes(kind, batch)?;
            summary.nodes += batch.len();
            summary.batches += 1;
        }
    }

    for batch in graph.edges().chunks(batch_size) {
        sink.write_edges(batch)?;
        summary.edges += batch.len();
        summary.batches += 1;
    }

    sink.finish()?;
    debug!(
        nodes = summary.nodes,
        edges = summary.edges,
        batches = summary.batches,
        "graph loaded into sink"
    );
    Ok(summary)
}

// =============================================================================
// Directory Sink
// =============================================================================

/// Writes JSON Lines tables into a directory
pub struct DirectorySink {
    dir: PathBuf,
    writers: HashMap<String, BufWriter<File>>,
}

impl DirectorySink {
    /// Create the directory and truncate every table in it.
    ///
    /// All tables exist afterwards, so an empty kind shows up as an empty
    /// file rather than a missing one.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut writers = HashMap::new();
        let tables = NodeKind::ALL
            .iter()
            .map(NodeKind::table_name)
            .chain(std::iter::once(RELATIONS_TABLE.to_string()));
        for table in tables {
            let file = File::create(table_path(&dir, &table))?;
            writers.insert(table, BufWriter::new(file));
        }

        Ok(Self { dir, writers })
    }

    fn write_rows<T: Serialize>(&mut self, table: &str, rows: &[T]) -> Result<()> {
        let writer = self
            .writers
            .get_mut(table)
            .ok_or_else(|| GraphError::Sink(format!("no open table '{}'", table)))?;
        for row in rows {
            serde_json::to_writer(&mut *writer, row)?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }
}

impl GraphSink for DirectorySink {
    fn write_nodes(&mut self, kind: NodeKind, batch: &[Node]) -> Result<()> {
        if let Some(node) = batch.iter().find(|n| n.kind() != kind) {
            return Err(GraphError::Sink(format!(
                "{} node {} in a {} batch",
                node.kind(),
                node.id,
                kind
            )));
        }
        self.write_rows(&kind.table_name(), batch)
    }

    fn write_edges(&mut self, batch: &[Edge]) -> Result<()> {
        self.write_rows(RELATIONS_TABLE, batch)
    }

    fn finish(&mut self) -> Result<()> {
        for writer in self.writers.values_mut() {
            writer.flush()?;
        }
        debug!(dir = %self.dir.display(), tables = self.writers.len(), "tables flushed");
        Ok(())
    }
}

/// Export a graph into `dir` through a [`DirectorySink`]
pub fn write_graph(dir: &Path, graph: &KnowledgeGraph, batch_size: usize) -> Result<LoadSummary> {
    let mut sink = DirectorySink::create(dir)?;
    let summary = load_graph(&mut sink, graph, batch_size)?;
    info!(dir = %dir.display(), nodes = summary.nodes, edges = summary.edges, "graph exported");
    Ok(summary)
}

// =============================================================================
// Reading Back
// =============================================================================

/// Read an export directory back into a graph.
///
/// Missing tables read as empty. Blank lines are skipped; any other row that
/// does not parse, or a node row filed under the wrong kind, is an error.
pub fn read_graph(dir: &Path) -> Result<KnowledgeGraph> {
    if !dir.is_dir() {
        return Err(GraphError::InvalidInput(format!(
            "export directory not found: {}",
            dir.display()
        )));
    }

    let mut graph = KnowledgeGraph::new();

    for kind in NodeKind::ALL {
        let table = kind.table_name();
        for (line, node) in read_rows::<Node>(dir, &table)? {
            if node.kind() != kind {
                return Err(GraphError::MalformedRow {
                    file: table_file_name(&table),
                    line,
                    message: format!("{} row in the {} table", node.kind(), kind),
                });
            }
            graph.push_node(node);
        }
    }

    for (_, edge) in read_rows::<Edge>(dir, RELATIONS_TABLE)? {
        graph.push_edge(edge);
    }

    debug!(
        dir = %dir.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "graph read"
    );
    Ok(graph)
}

/// Parse every non-blank line of a table, keeping 1-based line numbers
fn read_rows<T>(dir: &Path, table: &str) -> Result<Vec<(usize, T)>>
where
    T: serde::de::DeserializeOwned,
{
    let path = table_path(dir, table);
    if !path.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(&path)?);
    let mut rows = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(&line).map_err(|e| GraphError::MalformedRow {
            file: table_file_name(table),
            line: index + 1,
            message: e.to_string(),
        })?;
        rows.push((index + 1, row));
    }
    Ok(rows)
}

fn table_file_name(table: &str) -> String {
    format!("{}.jsonl", table)
}

fn table_path(dir: &Path, table: &str) -> PathBuf {
    dir.join(table_file_name(table))
}
