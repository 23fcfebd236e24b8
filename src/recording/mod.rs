// Recording module
// Loads marker logs and EEG exports into in-memory sequences

pub mod ingest;

pub use ingest::{
    load_eeg, load_markers, read_eeg, read_markers, EegRecording, EegSource, MarkerSource,
    RecordingError, RowRange,
};
