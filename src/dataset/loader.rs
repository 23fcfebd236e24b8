// Filterbank dataset
// Indexable view over stored segments returning a fixed-size spectrogram and
// a one-hot label per item

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dataset::store::SegmentLookup;
use crate::dataset::DatasetError;
use crate::events::SegmentLabel;
use crate::spectrogram::{to_spectrogram, AugmentConfig, SpectrogramConfig};

/// One training or evaluation example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetItem {
    pub segment_id: usize,

    /// [time_frame][frequency_bin]
    pub frames: Vec<Vec<f64>>,

    /// One-hot: [gap_element, other]
    pub label: [f32; 2],
}

/// Dataset over a segment store
///
/// Spectrograms are recomputed on every access. `get` takes `&self` and keeps
/// no state between calls, so items can be computed from several threads.
pub struct EegDataset<S: SegmentLookup> {
    store: S,
    spectrogram: SpectrogramConfig,
    augment: AugmentConfig,
}

impl<S: SegmentLookup> EegDataset<S> {
    pub fn new(store: S, spectrogram: SpectrogramConfig) -> Self {
        EegDataset {
            store,
            spectrogram,
            augment: AugmentConfig::disabled(),
        }
    }

    /// Enable SpecAugment masking for `get_augmented`
    pub fn with_augment(mut self, augment: AugmentConfig) -> Self {
        self.augment = augment;
        self
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn config(&self) -> &SpectrogramConfig {
        &self.spectrogram
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Evaluation item: the plain filterbank
    pub fn get(&self, index: usize) -> Result<DatasetItem, DatasetError> {
        if index >= self.len() {
            return Err(DatasetError::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }

        let segment = self
            .store
            .get(index)
            .ok_or(DatasetError::MissingSegment(index))?;

        let spectrogram = to_spectrogram(segment, &self.spectrogram).map_err(|source| {
            log::warn!("Segment {} failed: {}", index, source);
            DatasetError::Spectrogram { id: index, source }
        })?;

        Ok(DatasetItem {
            segment_id: index,
            frames: spectrogram.frames,
            label: spectrogram.label.one_hot(),
        })
    }

    /// Training item: the filterbank with frequency and time masks applied
    pub fn get_augmented<R: Rng + ?Sized>(
        &self,
        index: usize,
        rng: &mut R,
    ) -> Result<DatasetItem, DatasetError> {
        let mut item = self.get(index)?;
        if self.augment.is_enabled() {
            self.augment.masker().apply(&mut item.frames, rng);
        }
        Ok(item)
    }

    /// All evaluation items in id order
    pub fn iter(&self) -> impl Iterator<Item = Result<DatasetItem, DatasetError>> + '_ {
        self.store.ids().map(move |index| self.get(index))
    }

    /// Segment count per label
    pub fn label_counts(&self) -> BTreeMap<SegmentLabel, usize> {
        let mut counts = BTreeMap::new();
        for id in self.store.ids() {
            if let Some(segment) = self.store.get(id) {
                *counts.entry(segment.label).or_insert(0) += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{segment, EegSample, MarkerEvent, MarkerType, SegmentMap};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> SpectrogramConfig {
        SpectrogramConfig {
            channel_count: 3,
            ..SpectrogramConfig::default()
        }
    }

    /// 1 sample per ms, three channels of slow sines
    fn build_segments(kinds: &[(MarkerType, f64)]) -> SegmentMap {
        let markers: Vec<MarkerEvent> = kinds
            .iter()
            .map(|&(kind, duration)| MarkerEvent::new(0.0, duration, kind))
            .collect();
        let eeg: Vec<EegSample> = (0..2000)
            .map(|t| {
                let x = t as f64;
                EegSample::new(x, vec![(x * 0.3).sin(), (x * 0.11).cos(), (x * 0.05).sin() + 2.0])
            })
            .collect();
        segment(&markers, &eeg).segments
    }

    #[test]
    fn test_length_matches_segment_count() {
        let segments = build_segments(&[
            (MarkerType::Pattern, 100.0),
            (MarkerType::PlainHit, 80.0),
            (MarkerType::Keydown, 10.0),
            (MarkerType::GapElement, 90.0),
        ]);
        let dataset = EegDataset::new(segments, config());
        assert_eq!(dataset.len(), 3);
    }

    #[test]
    fn test_items_have_fixed_shape_and_one_hot_labels() {
        let segments = build_segments(&[
            (MarkerType::GapElement, 30.0),
            (MarkerType::PlainHit, 200.0),
            (MarkerType::Pattern, 5.0),
        ]);
        let dataset = EegDataset::new(segments, config());

        let labels: Vec<[f32; 2]> = dataset.iter().map(|item| item.unwrap().label).collect();
        assert_eq!(labels, vec![[1.0, 0.0], [0.0, 1.0], [0.0, 1.0]]);

        for item in dataset.iter() {
            let item = item.unwrap();
            assert_eq!(item.frames.len(), 62);
            assert!(item.frames.iter().all(|f| f.len() == 64));
        }
    }

    #[test]
    fn test_empty_segment_gives_zero_item() {
        // The first marker consumes the entire stream
        let segments = build_segments(&[
            (MarkerType::Pattern, 5000.0),
            (MarkerType::GapElement, 50.0),
        ]);
        let dataset = EegDataset::new(segments, config());

        let item = dataset.get(1).unwrap();
        assert_eq!(item.label, [1.0, 0.0]);
        assert!(item.frames.iter().flatten().all(|&v| v == 0.0));
    }

    #[test]
    fn test_index_out_of_range() {
        let dataset = EegDataset::new(build_segments(&[(MarkerType::PlainHit, 10.0)]), config());
        assert!(matches!(
            dataset.get(1),
            Err(DatasetError::IndexOutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    fn test_spectrogram_error_names_segment() {
        let segments = build_segments(&[
            (MarkerType::Pattern, 10.0),
            (MarkerType::GapElement, 10.0),
        ]);
        let wrong_channels = SpectrogramConfig {
            channel_count: 4,
            ..SpectrogramConfig::default()
        };
        let dataset = EegDataset::new(segments, wrong_channels);

        match dataset.get(1) {
            Err(DatasetError::Spectrogram { id, .. }) => assert_eq!(id, 1),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_label_counts() {
        // A plain hit directly before a gap element would be skipped
        let segments = build_segments(&[
            (MarkerType::GapElement, 10.0),
            (MarkerType::GapElement, 10.0),
            (MarkerType::PlainHit, 10.0),
        ]);
        let counts = EegDataset::new(segments, config()).label_counts();
        assert_eq!(counts.get(&SegmentLabel::GapElement), Some(&2));
        assert_eq!(counts.get(&SegmentLabel::PlainHit), Some(&1));
        assert_eq!(counts.get(&SegmentLabel::Pattern), None);
    }

    #[test]
    fn test_augmented_item_keeps_shape() {
        let segments = build_segments(&[(MarkerType::GapElement, 300.0)]);
        let dataset = EegDataset::new(segments, config()).with_augment(AugmentConfig::default());

        let plain = dataset.get(0).unwrap();
        let masked = dataset.get_augmented(0, &mut StdRng::seed_from_u64(5)).unwrap();

        assert_eq!(masked.frames.len(), plain.frames.len());
        assert_eq!(masked.label, plain.label);
        let masked_power: f64 = masked.frames.iter().flatten().sum();
        let plain_power: f64 = plain.frames.iter().flatten().sum();
        assert!(masked_power <= plain_power);
    }

    #[test]
    fn test_augment_disabled_by_default() {
        let segments = build_segments(&[(MarkerType::GapElement, 300.0)]);
        let dataset = EegDataset::new(segments, config());
        let plain = dataset.get(0).unwrap();
        let same = dataset.get_augmented(0, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(plain, same);
    }
}
