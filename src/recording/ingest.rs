// Recording ingestion
// Reads the interval-marker log and the EEG export, trims the configured
// row ranges, and strips diagnostic columns

use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::events::{EegSample, MarkerEvent, MarkerType};

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("File has no header row")]
    MissingHeader,

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Row {row}: cannot parse {column} value {value:?}")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Row {row} has {found} channel values, expected {expected}")]
    ChannelCountMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Row {row}: timestamp goes backwards")]
    NonMonotonicTimestamp { row: usize },
}

/// Half-open range of data rows to keep; `end = None` keeps the rest of the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl RowRange {
    pub fn all() -> Self {
        RowRange {
            start: 0,
            end: None,
        }
    }

    pub fn contains(&self, row: usize) -> bool {
        row >= self.start && self.end.map_or(true, |end| row < end)
    }
}

/// Where to find marker fields in the interval-marker CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerSource {
    /// Data rows to keep (the session preliminaries are dropped)
    pub keep: RowRange,

    pub type_column: String,

    /// Column holding event durations, in EEG timestamp units
    pub duration_column: String,

    /// Optional timestamp column; when absent, timestamps accumulate durations
    pub timestamp_column: Option<String>,
}

impl Default for MarkerSource {
    fn default() -> Self {
        MarkerSource {
            keep: RowRange {
                start: 30,
                end: Some(384),
            },
            type_column: "type".to_string(),
            duration_column: "duration".to_string(),
            timestamp_column: Some("timestamp".to_string()),
        }
    }
}

/// Layout of the EEG export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EegSource {
    /// Data rows to keep
    pub keep: RowRange,

    /// Metadata lines before the header row
    pub header_rows_to_skip: usize,

    pub timestamp_column: String,

    /// This column and every column after it are dropped (contact quality, battery, ...)
    pub first_dropped_column: Option<String>,

    /// Additional columns to drop by name
    pub drop_columns: Vec<String>,
}

impl Default for EegSource {
    fn default() -> Self {
        EegSource {
            keep: RowRange {
                start: 6069,
                end: Some(18649),
            },
            header_rows_to_skip: 1,
            timestamp_column: "Timestamp".to_string(),
            first_dropped_column: Some("EEG.RawCq".to_string()),
            drop_columns: vec!["EEG.Counter".to_string(), "EEG.Interpolated".to_string()],
        }
    }
}

/// EEG samples with the names of their channel columns
#[derive(Debug, Clone, PartialEq)]
pub struct EegRecording {
    pub channels: Vec<String>,
    pub samples: Vec<EegSample>,
}

impl EegRecording {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Recording span in timestamp units
    pub fn duration(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0.0,
        }
    }
}

fn column_index(header: &StringRecord, name: &str) -> Result<usize, RecordingError> {
    header
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| RecordingError::MissingColumn(name.to_string()))
}

fn parse_number(
    record: &StringRecord,
    idx: usize,
    row: usize,
    column: &str,
) -> Result<f64, RecordingError> {
    let raw = record.get(idx).unwrap_or("");
    raw.trim()
        .parse::<f64>()
        .map_err(|_| RecordingError::InvalidNumber {
            row,
            column: column.to_string(),
            value: raw.to_string(),
        })
}

/// Parse marker events from CSV data
pub fn read_markers<R: Read>(
    reader: R,
    source: &MarkerSource,
) -> Result<Vec<MarkerEvent>, RecordingError> {
    let mut csv = ReaderBuilder::new().has_headers(true).flexible(true).from_reader(reader);

    let header = csv.headers()?.clone();
    if header.is_empty() {
        return Err(RecordingError::MissingHeader);
    }

    let type_idx = column_index(&header, &source.type_column)?;
    let duration_idx = column_index(&header, &source.duration_column)?;
    let timestamp_idx = match &source.timestamp_column {
        Some(name) => match column_index(&header, name) {
            Ok(idx) => Some(idx),
            Err(_) => {
                log::warn!("Marker timestamp column {:?} not found, accumulating durations", name);
                None
            }
        },
        None => None,
    };

    let mut markers = Vec::new();
    let mut clock = 0.0;

    for (row, record) in csv.records().enumerate() {
        let record = record?;
        if !source.keep.contains(row) {
            continue;
        }

        let kind = MarkerType::from_string(record.get(type_idx).unwrap_or(""));
        let duration = parse_number(&record, duration_idx, row, &source.duration_column)?;
        let timestamp = match (timestamp_idx, &source.timestamp_column) {
            (Some(idx), Some(name)) => parse_number(&record, idx, row, name)?,
            _ => clock,
        };
        clock = timestamp + duration;

        markers.push(MarkerEvent::new(timestamp, duration, kind));
    }

    log::info!("Read {} markers", markers.len());
    Ok(markers)
}

/// Parse EEG samples from CSV data
pub fn read_eeg<R: Read>(reader: R, source: &EegSource) -> Result<EegRecording, RecordingError> {
    let mut csv = ReaderBuilder::new().has_headers(false).flexible(true).from_reader(reader);
    let mut records = csv.records();

    for _ in 0..source.header_rows_to_skip {
        if records.next().transpose()?.is_none() {
            return Err(RecordingError::MissingHeader);
        }
    }
    let header = records.next().transpose()?.ok_or(RecordingError::MissingHeader)?;

    let timestamp_idx = column_index(&header, &source.timestamp_column)?;
    let cutoff = match &source.first_dropped_column {
        Some(name) => column_index(&header, name)?,
        None => header.len(),
    };

    let channel_idx: Vec<usize> = (0..cutoff)
        .filter(|&i| i != timestamp_idx)
        .filter(|&i| {
            let name = header.get(i).unwrap_or("").trim();
            !source.drop_columns.iter().any(|d| d == name)
        })
        .collect();
    let channels: Vec<String> = channel_idx
        .iter()
        .map(|&i| header.get(i).unwrap_or("").trim().to_string())
        .collect();

    let mut samples: Vec<EegSample> = Vec::new();

    for (row, record) in records.enumerate() {
        let record = record?;
        if !source.keep.contains(row) {
            continue;
        }

        let timestamp = parse_number(&record, timestamp_idx, row, &source.timestamp_column)?;
        if let Some(prev) = samples.last() {
            if timestamp < prev.timestamp {
                return Err(RecordingError::NonMonotonicTimestamp { row });
            }
        }

        let available = channel_idx.iter().filter(|&&i| i < record.len()).count();
        if available != channel_idx.len() {
            return Err(RecordingError::ChannelCountMismatch {
                row,
                expected: channel_idx.len(),
                found: available,
            });
        }

        let values = channel_idx
            .iter()
            .zip(channels.iter())
            .map(|(&i, name)| parse_number(&record, i, row, name))
            .collect::<Result<Vec<_>, _>>()?;

        samples.push(EegSample::new(timestamp, values));
    }

    log::info!("Read {} EEG samples over {} channels", samples.len(), channels.len());
    Ok(EegRecording { channels, samples })
}

pub fn load_markers(
    path: &Path,
    source: &MarkerSource,
) -> Result<Vec<MarkerEvent>, RecordingError> {
    let file = File::open(path)?;
    read_markers(file, source)
}

pub fn load_eeg(path: &Path, source: &EegSource) -> Result<EegRecording, RecordingError> {
    let file = File::open(path)?;
    read_eeg(file, source)
}
