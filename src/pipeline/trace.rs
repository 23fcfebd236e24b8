// Pipeline progress tracing
// Append-only JSONL record of ingestion, segmentation, and export runs

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during trace operations
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Stage of the segmentation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Ingest,
    Segmentation,
    Spectrogram,
    Export,
}

impl PipelineStage {
    pub fn to_string(&self) -> &'static str {
        match self {
            PipelineStage::Ingest => "ingest",
            PipelineStage::Segmentation => "segmentation",
            PipelineStage::Spectrogram => "spectrogram",
            PipelineStage::Export => "export",
        }
    }
}

/// A single trace line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// ISO 8601 timestamp of when this entry was created
    pub timestamp: String,

    pub stage: PipelineStage,

    /// Progress within the stage [0.0, 1.0]
    pub progress: f32,

    pub message: String,

    /// Counters for the stage (segment counts, digests, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TraceEntry {
    pub fn new(stage: PipelineStage, progress: f32, message: String) -> Self {
        TraceEntry {
            timestamp: Utc::now().to_rfc3339(),
            stage,
            progress: progress.clamp(0.0, 1.0),
            message,
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Serialize to JSON line (with newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Appends entries to a JSONL trace file
pub struct TraceWriter {
    file_path: PathBuf,
}

impl TraceWriter {
    pub fn new(file_path: PathBuf) -> Self {
        TraceWriter { file_path }
    }

    /// Append a trace entry, creating the file if needed
    pub fn write(&self, entry: &TraceEntry) -> Result<(), TraceError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        file.write_all(entry.to_json_line()?.as_bytes())?;
        file.flush()?;

        log::debug!(
            "[{}] {:.0}% {}",
            entry.stage.to_string(),
            entry.progress * 100.0,
            entry.message
        );
        Ok(())
    }
}

/// Helper builder for creating trace entries
pub struct TraceBuilder {
    stage: PipelineStage,
}

impl TraceBuilder {
    pub fn stage(stage: PipelineStage) -> Self {
        TraceBuilder { stage }
    }

    pub fn start(self, message: impl Into<String>) -> TraceEntry {
        TraceEntry::new(self.stage, 0.0, message.into())
    }

    pub fn progress(self, progress: f32, message: impl Into<String>) -> TraceEntry {
        TraceEntry::new(self.stage, progress, message.into())
    }

    pub fn complete(self, message: impl Into<String>) -> TraceEntry {
        TraceEntry::new(self.stage, 1.0, message.into())
    }
}

/// Read trace entries from a JSONL file
pub fn read_trace_file(path: &Path) -> Result<Vec<TraceEntry>, TraceError> {
    let contents = std::fs::read_to_string(path)?;

    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(TraceError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_progress_clamping() {
        let entry = TraceEntry::new(PipelineStage::Ingest, -0.5, "test".to_string());
        assert_eq!(entry.progress, 0.0);

        let entry = TraceEntry::new(PipelineStage::Ingest, 1.5, "test".to_string());
        assert_eq!(entry.progress, 1.0);
    }

    #[test]
    fn test_trace_builder() {
        let start = TraceBuilder::stage(PipelineStage::Segmentation).start("Scanning markers");
        assert_eq!(start.stage, PipelineStage::Segmentation);
        assert_eq!(start.progress, 0.0);

        let complete = TraceBuilder::stage(PipelineStage::Export)
            .complete("Done")
            .with_data(serde_json::json!({ "items": 12 }));
        assert_eq!(complete.progress, 1.0);
        assert_eq!(complete.data.unwrap()["items"], 12);

        let partial = TraceBuilder::stage(PipelineStage::Spectrogram).progress(0.25, "100 of 400");
        assert_eq!(partial.stage, PipelineStage::Spectrogram);
        assert_eq!(partial.progress, 0.25);
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        let entry = TraceEntry::new(PipelineStage::Segmentation, 0.5, "half".to_string());
        let line = entry.to_json_line().unwrap();
        assert!(line.ends_with('\n'));
        assert!(line.contains("\"stage\":\"segmentation\""));
    }

    #[test]
    fn test_trace_writer_appends() {
        let temp_dir = TempDir::new().unwrap();
        let trace_path = temp_dir.path().join("trace.jsonl");
        let writer = TraceWriter::new(trace_path.clone());

        writer.write(&TraceBuilder::stage(PipelineStage::Ingest).start("Reading")).unwrap();
        writer
            .write(
                &TraceBuilder::stage(PipelineStage::Segmentation)
                    .complete("Segmented")
                    .with_data(serde_json::json!({ "segments": 3 })),
            )
            .unwrap();

        let entries = read_trace_file(&trace_path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].stage, PipelineStage::Ingest);
        assert_eq!(entries[1].progress, 1.0);
        assert_eq!(entries[1].data.as_ref().unwrap()["segments"], 3);
    }
}
