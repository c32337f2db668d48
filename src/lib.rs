//! Paper Knowledge Graph
//!
//! Builds a typed knowledge graph from semi-structured paper records, checks
//! its integrity, and exports it as flat tables for a graph-store loader.
//!
//! ## Pipeline
//!
//! - **Records**: lenient JSON input, one record per paper
//! - **Construction**: deduplicating registry plus relation resolution
//! - **Validation**: duplicates, orphans, dangling edges, embedding coverage
//! - **Reporting**: node, relation, paper and connectivity statistics
//! - **Export**: batched delivery to a sink (JSON Lines directory by default)
//!
//! ## Export Layout
//!
//! ```text
//! graph/
//! ├── nodes_Paper.jsonl
//! ├── nodes_Task.jsonl
//! ├── nodes_ImagingModality.jsonl
//! ├── nodes_AnatomicalStructure.jsonl
//! ├── nodes_Method.jsonl
//! ├── nodes_Dataset.jsonl
//! ├── nodes_Metric.jsonl
//! ├── nodes_Innovation.jsonl
//! ├── relations.jsonl
//! ├── quality_report.json
//! └── statistics_report.json
//! ```

pub mod config;
pub mod embedding;
pub mod error;
pub mod graph;
pub mod identity;
pub mod record;
pub mod sink;

pub use config::{GraphConfig, OutputFormat};
pub use embedding::{apply_embeddings, embed_graph, CommandEmbedder, Embedder};
pub use error::{GraphError, Result};
pub use graph::{
    build_graph, BuildOutput, Edge, IntegrityReport, IntegrityValidator, KnowledgeGraph, Node,
    NodeAttrs, NodeKind, ResolutionPolicy, StatisticsReport,
};
pub use identity::{generate_id, NodeId};
pub use record::{load_records, parse_records, PaperRecord};
pub use sink::{load_graph, read_graph, write_graph, DirectorySink, GraphSink};
