// Pipeline execution and monitoring module
// Records progress of the segmentation pipeline

pub mod trace;

pub use trace::{read_trace_file, PipelineStage, TraceBuilder, TraceEntry, TraceError, TraceWriter};
