// Dataset module
// Segment persistence and the indexable filterbank dataset

pub mod loader;
pub mod store;

use thiserror::Error;

use crate::spectrogram::SpectrogramError;

pub use loader::{DatasetItem, EegDataset};
pub use store::{calculate_sha256, SegmentLookup, SegmentStore};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Segment ids are not dense from zero")]
    SparseIds,

    #[error("Index {index} out of range for dataset of {len} segments")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Segment {0} not found")]
    MissingSegment(usize),

    #[error("Segment {id}: {source}")]
    Spectrogram {
        id: usize,
        #[source]
        source: SpectrogramError,
    },
}
