// Marker and segment types
// Defines marker classes from the stimulus log, EEG samples, and labeled segments

use serde::{Deserialize, Serialize};

/// Type of a behavioral marker from the interval marker log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerType {
    /// Participant key press
    Keydown,

    /// Start of a rhythmic pattern
    Pattern,

    /// Regular hit inside a pattern
    PlainHit,

    /// Hit that lands on a gap in the rhythm
    GapElement,

    /// Anything else the recorder logged
    Other,
}

impl MarkerType {
    /// Parse the marker type column
    /// Unknown strings map to `Other` and are later skipped by the admission rule
    pub fn from_string(s: &str) -> Self {
        match s.trim() {
            "keydown" => MarkerType::Keydown,
            "pattern" => MarkerType::Pattern,
            "plain_hit" => MarkerType::PlainHit,
            "gap_element" => MarkerType::GapElement,
            _ => MarkerType::Other,
        }
    }

    pub fn to_string(&self) -> &'static str {
        match self {
            MarkerType::Keydown => "keydown",
            MarkerType::Pattern => "pattern",
            MarkerType::PlainHit => "plain_hit",
            MarkerType::GapElement => "gap_element",
            MarkerType::Other => "other",
        }
    }
}

/// Label attached to an emitted segment
/// Only marker types that can pass admission have a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentLabel {
    Pattern,
    PlainHit,
    GapElement,
}

impl SegmentLabel {
    pub fn to_string(&self) -> &'static str {
        match self {
            SegmentLabel::Pattern => "pattern",
            SegmentLabel::PlainHit => "plain_hit",
            SegmentLabel::GapElement => "gap_element",
        }
    }

    /// Two-class one-hot encoding: index 0 is gap_element, index 1 is every other label
    pub fn one_hot(&self) -> [f32; 2] {
        match self {
            SegmentLabel::GapElement => [1.0, 0.0],
            SegmentLabel::Pattern | SegmentLabel::PlainHit => [0.0, 1.0],
        }
    }
}

/// A single marker from the stimulus/response log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerEvent {
    /// Marker timestamp (same clock as the EEG timestamps)
    pub timestamp: f64,

    /// Event duration, in the unit of the EEG timestamp column
    pub duration: f64,

    #[serde(rename = "type")]
    pub kind: MarkerType,
}

impl MarkerEvent {
    pub fn new(timestamp: f64, duration: f64, kind: MarkerType) -> Self {
        MarkerEvent {
            timestamp,
            duration,
            kind,
        }
    }
}

/// One multi-channel EEG sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EegSample {
    pub timestamp: f64,

    /// Channel values in recording order; length is fixed per recording
    pub channels: Vec<f64>,
}

impl EegSample {
    pub fn new(timestamp: f64, channels: Vec<f64>) -> Self {
        EegSample {
            timestamp,
            channels,
        }
    }
}

/// EEG samples and label for one admitted marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Dense, zero-based id in emission order
    /// Stores keyed by id may omit it; the key fills it in on load
    #[serde(default)]
    pub id: usize,

    pub label: SegmentLabel,

    /// Channel rows in [time][channel] layout, timestamps excluded
    #[serde(alias = "eeg_dat")]
    pub samples: Vec<Vec<f64>>,
}

impl Segment {
    pub fn new(id: usize, label: SegmentLabel, samples: Vec<Vec<f64>>) -> Self {
        Segment { id, label, samples }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}
