//! The Read Pipeline (C6): search, retrieval planning, relation-graph
//! expansion, and layered snippet assembly, plus the direct `readFile` path.

mod diagnostics;
mod layering;
mod pipeline;
mod ranking;
mod readfile;
mod registry;
mod relations;
mod types;

pub use diagnostics::{
    DiagnosticsSnapshot, ExplainabilitySnapshot, LayerCounts, LayeringSnapshot,
    RankingSnapshot, RelationExpansionSnapshot,
};
pub use pipeline::ReadPipeline;
pub use registry::ReadPipelineRegistry;
pub use types::{ReadFileResult, ReadOptions, ReadResultRow};
