// Event segmentation module
// Marker types, the admission rule, and EEG windowing per admitted marker

pub mod admission;
pub mod segmenter;
pub mod types;

pub use admission::{admit, Admission, SkipReason};
pub use segmenter::{
    collect_window, segment, EegCursor, SegmentMap, Segmentation, SegmentationReport,
};
pub use types::{EegSample, MarkerEvent, MarkerType, Segment, SegmentLabel};
