// Event segmentation
// Aligns the marker timeline against the EEG timeline and cuts one labeled
// window of EEG samples per admitted marker

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::events::admission::{admit, Admission, SkipReason};
use crate::events::types::{EegSample, MarkerEvent, Segment, SegmentLabel};

/// Forward-only position in the EEG sample stream
///
/// The cursor is shared by every segment in a pass: each window starts where
/// the previous one stopped. Markers and EEG must therefore be chronologically
/// synchronized; out-of-order input produces wrong (but never panicking) windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EegCursor(usize);

impl EegCursor {
    pub fn new(position: usize) -> Self {
        EegCursor(position)
    }

    /// Index of the next unconsumed EEG sample
    pub fn position(&self) -> usize {
        self.0
    }

    pub fn is_exhausted(&self, eeg: &[EegSample]) -> bool {
        self.0 >= eeg.len()
    }
}

/// Collect the EEG rows of one window starting at `cursor`
///
/// The window opens at the timestamp of the sample under the cursor and spans
/// `duration`; every sample with `start <= t < start + duration` is taken.
/// Returns the channel rows and the advanced cursor.
pub fn collect_window(
    eeg: &[EegSample],
    cursor: EegCursor,
    duration: f64,
) -> (Vec<Vec<f64>>, EegCursor) {
    let mut position = cursor.position();
    let Some(first) = eeg.get(position) else {
        return (Vec::new(), cursor);
    };

    let start = first.timestamp;
    let end = start + duration;
    let mut rows = Vec::new();

    while let Some(sample) = eeg.get(position).filter(|s| s.timestamp < end) {
        rows.push(sample.channels.clone());
        position += 1;
    }

    (rows, EegCursor(position))
}

/// Ordered mapping from dense segment id to segment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentMap(BTreeMap<usize, Segment>);

impl SegmentMap {
    pub fn new() -> Self {
        SegmentMap(BTreeMap::new())
    }

    /// Append a segment under the next free id
    pub fn push(&mut self, label: SegmentLabel, samples: Vec<Vec<f64>>) -> usize {
        let id = self.0.len();
        self.0.insert(id, Segment::new(id, label, samples));
        id
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&Segment> {
        self.0.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.0.values()
    }

    /// True when the keys are exactly 0..len and each segment carries its own key
    /// Overwrite every segment's id with its key
    pub(crate) fn sync_ids(&mut self) {
        for (&key, segment) in self.0.iter_mut() {
            segment.id = key;
        }
    }

    pub fn is_dense(&self) -> bool {
        self.0
            .iter()
            .enumerate()
            .all(|(expected, (&key, segment))| key == expected && segment.id == expected)
    }
}

/// Counters collected during one segmentation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentationReport {
    pub markers_scanned: usize,
    pub admitted: usize,
    pub empty_segments: usize,
    pub eeg_samples_consumed: usize,
    pub skipped: BTreeMap<String, usize>,
}

impl SegmentationReport {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    fn record_skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason.to_string().to_string()).or_insert(0) += 1;
    }
}

/// State of a segmentation pass: segments emitted so far plus the EEG cursor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segmentation {
    pub segments: SegmentMap,
    pub cursor: EegCursor,
    pub report: SegmentationReport,
}

impl Segmentation {
    /// Process the marker at `index` and return the updated state
    pub fn advance(mut self, markers: &[MarkerEvent], index: usize, eeg: &[EegSample]) -> Self {
        self.report.markers_scanned += 1;

        let label = match admit(markers, index) {
            Admission::Admit(label) => label,
            Admission::Skip(reason) => {
                log::debug!("Marker {} skipped: {}", index, reason.to_string());
                self.report.record_skip(reason);
                return self;
            }
        };

        let duration = markers[index].duration;
        let (rows, cursor) = collect_window(eeg, self.cursor, duration);

        self.report.eeg_samples_consumed += cursor.position() - self.cursor.position();
        if rows.is_empty() {
            self.report.empty_segments += 1;
        }
        self.report.admitted += 1;

        let id = self.segments.push(label, rows);
        log::debug!(
            "Segment {} ({}) from marker {}: EEG rows {}..{}",
            id,
            label.to_string(),
            index,
            self.cursor.position(),
            cursor.position()
        );

        self.cursor = cursor;
        self
    }
}

/// Segment a full recording
/// Scans markers once, in order, threading a single EEG cursor through every step
pub fn segment(markers: &[MarkerEvent], eeg: &[EegSample]) -> Segmentation {
    let result = (0..markers.len()).fold(Segmentation::default(), |state, index| {
        state.advance(markers, index, eeg)
    });

    log::info!(
        "Segmented {} markers into {} segments ({} skipped, {} empty, {}/{} EEG samples used)",
        result.report.markers_scanned,
        result.report.admitted,
        result.report.skipped_total(),
        result.report.empty_segments,
        result.report.eeg_samples_consumed,
        eeg.len()
    );

    result
}
