// Marker admission rule
// Decides which markers produce a segment and which are suppressed as
// intermediate or redundant events

use crate::events::types::{MarkerEvent, MarkerType, SegmentLabel};

/// Why a marker did not produce a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    /// The marker is a key press
    Keydown,

    /// A pattern marker immediately followed by a key press
    PatternBeforeKeydown,

    /// A plain hit immediately followed by a gap element
    PlainHitBeforeGap,

    /// A marker type that never carries a label
    Unlabeled,
}

impl SkipReason {
    pub fn to_string(&self) -> &'static str {
        match self {
            SkipReason::Keydown => "keydown",
            SkipReason::PatternBeforeKeydown => "pattern_before_keydown",
            SkipReason::PlainHitBeforeGap => "plain_hit_before_gap",
            SkipReason::Unlabeled => "unlabeled",
        }
    }
}

/// Outcome of the admission rule for one marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit(SegmentLabel),
    Skip(SkipReason),
}

/// Apply the admission rule to the marker at `index`
/// The one-marker lookahead past the end of the stream counts as "no match"
pub fn admit(markers: &[MarkerEvent], index: usize) -> Admission {
    let Some(current) = markers.get(index) else {
        return Admission::Skip(SkipReason::Unlabeled);
    };
    let next = markers.get(index + 1).map(|m| m.kind);

    match current.kind {
        MarkerType::Keydown => Admission::Skip(SkipReason::Keydown),
        MarkerType::Other => Admission::Skip(SkipReason::Unlabeled),
        MarkerType::Pattern => {
            if next == Some(MarkerType::Keydown) {
                Admission::Skip(SkipReason::PatternBeforeKeydown)
            } else {
                Admission::Admit(SegmentLabel::Pattern)
            }
        }
        MarkerType::PlainHit => {
            if next == Some(MarkerType::GapElement) {
                Admission::Skip(SkipReason::PlainHitBeforeGap)
            } else {
                Admission::Admit(SegmentLabel::PlainHit)
            }
        }
        MarkerType::GapElement => Admission::Admit(SegmentLabel::GapElement),
    }
}
