// Segment store
// Keyed lookup over segments, with JSON persistence and a content fingerprint

use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::ops::Range;
use std::path::Path;

use crate::dataset::DatasetError;
use crate::events::{Segment, SegmentMap};

/// Keyed lookup by segment id
pub trait SegmentLookup {
    fn len(&self) -> usize;

    fn get(&self, id: usize) -> Option<&Segment>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids in ascending order; stores are dense from zero
    fn ids(&self) -> Range<usize> {
        0..self.len()
    }
}

impl SegmentLookup for SegmentMap {
    fn len(&self) -> usize {
        SegmentMap::len(self)
    }

    fn get(&self, id: usize) -> Option<&Segment> {
        SegmentMap::get(self, id)
    }
}

/// Segments persisted as a JSON object keyed by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentStore {
    segments: SegmentMap,
}

impl SegmentStore {
    pub fn new(segments: SegmentMap) -> Self {
        SegmentStore { segments }
    }

    pub fn segments(&self) -> &SegmentMap {
        &self.segments
    }

    /// Serialize to JSON bytes; identical segments always give identical bytes
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, DatasetError> {
        Ok(serde_json::to_vec_pretty(&self.segments)?)
    }

    /// Deserialize and check that ids are dense from zero
    ///
    /// Keys are authoritative. Entries may carry their rows under `eeg_dat`
    /// and leave out `id`, the layout of stores written by the earlier
    /// preprocessing scripts.
    pub fn from_json_bytes(data: &[u8]) -> Result<Self, DatasetError> {
        let mut segments: SegmentMap = serde_json::from_slice(data)?;
        segments.sync_ids();
        if !segments.is_dense() {
            return Err(DatasetError::SparseIds);
        }
        Ok(SegmentStore { segments })
    }

    /// Write the store to `path` and return the SHA256 of the written bytes
    pub fn save(&self, path: &Path) -> Result<String, DatasetError> {
        let data = self.to_json_bytes()?;
        let mut file = fs::File::create(path)?;
        file.write_all(&data)?;

        let hash = calculate_sha256(&data);
        log::info!(
            "Saved {} segments to {} (sha256 {})",
            self.segments.len(),
            path.display(),
            hash
        );
        Ok(hash)
    }

    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let data = fs::read(path)?;
        let store = Self::from_json_bytes(&data)?;
        log::info!("Loaded {} segments from {}", store.segments.len(), path.display());
        Ok(store)
    }
}

impl SegmentLookup for SegmentStore {
    fn len(&self) -> usize {
        self.segments.len()
    }

    fn get(&self, id: usize) -> Option<&Segment> {
        self.segments.get(id)
    }
}

/// Calculate SHA256 hash of data
pub fn calculate_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{segment, EegSample, MarkerEvent, MarkerType, SegmentLabel};
    use tempfile::TempDir;

    fn sample_segments() -> SegmentMap {
        let markers = vec![
            MarkerEvent::new(0.0, 2.0, MarkerType::Pattern),
            MarkerEvent::new(2.0, 3.0, MarkerType::GapElement),
        ];
        let eeg: Vec<EegSample> = (0..10)
            .map(|t| EegSample::new(t as f64, vec![t as f64 * 0.5]))
            .collect();
        segment(&markers, &eeg).segments
    }

    #[test]
    fn test_calculate_sha256() {
        let hash = calculate_sha256(b"hello world");
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("segments.json");

        let store = SegmentStore::new(sample_segments());
        let hash = store.save(&path).unwrap();
        assert_eq!(hash.len(), 64);

        let loaded = SegmentStore::load(&path).unwrap();
        assert_eq!(loaded, store);
        assert_eq!(SegmentLookup::len(&loaded), 2);
        assert_eq!(loaded.get(1).unwrap().label, SegmentLabel::GapElement);
        assert!(SegmentLookup::get(&loaded, 2).is_none());
        assert_eq!(loaded.ids().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_saving_twice_gives_same_digest() {
        let temp_dir = TempDir::new().unwrap();
        let a = SegmentStore::new(sample_segments())
            .save(&temp_dir.path().join("a.json"))
            .unwrap();
        let b = SegmentStore::new(sample_segments())
            .save(&temp_dir.path().join("b.json"))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_keys_are_string_ids() {
        let bytes = SegmentStore::new(sample_segments()).to_json_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["0"]["label"], "pattern");
        assert_eq!(value["1"]["label"], "gap_element");
        assert_eq!(value["1"]["samples"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_sparse_ids_rejected() {
        let data = br#"{"0": {"id": 0, "label": "pattern", "samples": []},
                        "2": {"id": 2, "label": "plain_hit", "samples": []}}"#;
        let err = SegmentStore::from_json_bytes(data).unwrap_err();
        assert!(matches!(err, DatasetError::SparseIds));
    }

    #[test]
    fn test_reads_eeg_dat_layout() {
        let data = br#"{
            "0": {"eeg_dat": [[1.0, 2.0], [3.0, 4.0]], "label": "pattern"},
            "1": {"eeg_dat": [], "label": "gap_element"}
        }"#;
        let store = SegmentStore::from_json_bytes(data).unwrap();

        assert_eq!(store.len(), 2);
        let first = store.get(0).unwrap();
        assert_eq!(first.id, 0);
        assert_eq!(first.samples, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let second = store.get(1).unwrap();
        assert_eq!(second.id, 1);
        assert_eq!(second.label, SegmentLabel::GapElement);
        assert!(second.is_empty());

        // Written back in the native layout
        let value: serde_json::Value =
            serde_json::from_slice(&store.to_json_bytes().unwrap()).unwrap();
        assert_eq!(value["0"]["samples"][1][0], 3.0);
        assert_eq!(value["1"]["id"], 1);
    }
}
