// SpecAugment-style masking
// Zeroes one random run of frames and one random band of frequency bins,
// used only when building training items

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration for spectrogram masking
///
/// Widths are named by the axis of the [frame][bin] item they cut across.
/// The defaults reproduce the training setup of the recorded experiment,
/// whose masks ran 24 wide over frames and 52 wide over bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentConfig {
    /// Maximum width of the frame mask (0 disables)
    pub frame_mask_param: usize,

    /// Maximum width of the bin mask (0 disables)
    pub bin_mask_param: usize,

    /// Fixed RNG seed for reproducible training runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        AugmentConfig {
            frame_mask_param: 24,
            bin_mask_param: 52,
            seed: None,
        }
    }
}

impl AugmentConfig {
    /// Masking off entirely
    pub fn disabled() -> Self {
        AugmentConfig {
            frame_mask_param: 0,
            bin_mask_param: 0,
            seed: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.frame_mask_param > 0 || self.bin_mask_param > 0
    }

    pub fn masker(&self) -> SpecAugment {
        SpecAugment {
            frame_mask_param: self.frame_mask_param,
            bin_mask_param: self.bin_mask_param,
        }
    }

    /// RNG for a training pass: seeded when configured, otherwise from entropy
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// One frame mask and one bin mask over a [frame][bin] spectrogram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecAugment {
    pub frame_mask_param: usize,
    pub bin_mask_param: usize,
}

impl SpecAugment {
    pub fn apply<R: Rng + ?Sized>(&self, frames: &mut [Vec<f64>], rng: &mut R) {
        if let Some((start, end)) = mask_bounds(self.frame_mask_param, frames.len(), rng) {
            for frame in frames[start..end].iter_mut() {
                frame.fill(0.0);
            }
        }

        let bins = frames.first().map_or(0, |f| f.len());
        if let Some((start, end)) = mask_bounds(self.bin_mask_param, bins, rng) {
            for frame in frames.iter_mut() {
                frame[start..end].fill(0.0);
            }
        }
    }
}

/// Pick a mask `[start, end)` of width below `param` inside an axis of `size`
///
/// `width = u * param`, `start = floor(v * (size - width))` and
/// `end = floor(v * (size - width) + width)`, as torchaudio's `mask_along_axis`.
/// Returns None when masking is disabled or the mask is empty.
fn mask_bounds<R: Rng + ?Sized>(
    param: usize,
    size: usize,
    rng: &mut R,
) -> Option<(usize, usize)> {
    if param == 0 || size == 0 {
        return None;
    }

    let width = rng.gen::<f64>() * param as f64;
    let offset = (rng.gen::<f64>() * (size as f64 - width)).max(0.0);

    let start = (offset.floor() as usize).min(size);
    let end = ((offset + width).floor() as usize).min(size);

    if start < end {
        Some((start, end))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_masks_leave_frames_untouched() {
        let mut frames = vec![vec![1.0; 64]; 62];
        let masker = AugmentConfig::disabled().masker();
        masker.apply(&mut frames, &mut StdRng::seed_from_u64(7));
        assert!(frames.iter().flatten().all(|&v| v == 1.0));
    }

    #[test]
    fn test_mask_bounds_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            if let Some((start, end)) = mask_bounds(52, 62, &mut rng) {
                assert!(start < end);
                assert!(end <= 62);
                assert!(end - start <= 52);
            }
            // Mask parameter wider than the axis
            if let Some((start, end)) = mask_bounds(100, 10, &mut rng) {
                assert!(end <= 10);
                assert!(start < end);
            }
        }
    }

    #[test]
    fn test_masks_zero_whole_rows_and_columns() {
        let mut frames = vec![vec![1.0; 64]; 62];
        let masker = AugmentConfig::default().masker();
        masker.apply(&mut frames, &mut StdRng::seed_from_u64(3));

        // Shape is preserved
        assert_eq!(frames.len(), 62);
        assert!(frames.iter().all(|f| f.len() == 64));

        // Any zeroed bin is either a zeroed frame or a zeroed column
        let zero_frames: Vec<bool> = frames.iter().map(|f| f.iter().all(|&v| v == 0.0)).collect();
        let zero_bins: Vec<bool> = (0..64)
            .map(|b| frames.iter().enumerate().all(|(t, f)| f[b] == 0.0 || zero_frames[t]))
            .collect();
        for (t, frame) in frames.iter().enumerate() {
            for (b, &v) in frame.iter().enumerate() {
                if v == 0.0 {
                    assert!(zero_frames[t] || zero_bins[b]);
                }
            }
        }
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let config = AugmentConfig {
            seed: Some(11),
            ..AugmentConfig::default()
        };
        let mut a = vec![vec![1.0; 64]; 62];
        let mut b = a.clone();
        config.masker().apply(&mut a, &mut config.rng());
        config.masker().apply(&mut b, &mut config.rng());
        assert_eq!(a, b);
    }

    fn zeroed_frames(frames: &[Vec<f64>]) -> usize {
        frames.iter().filter(|f| f.iter().all(|&v| v == 0.0)).count()
    }

    fn zeroed_bins(frames: &[Vec<f64>]) -> usize {
        let bins = frames.first().map_or(0, |f| f.len());
        (0..bins)
            .filter(|&b| frames.iter().all(|f| f[b] == 0.0))
            .count()
    }

    #[test]
    fn test_each_param_limits_its_own_axis() {
        let masker = AugmentConfig::default().masker();
        let mut max_frames = 0;
        let mut max_bins = 0;

        for seed in 0..2000 {
            let mut frames = vec![vec![1.0; 64]; 62];
            masker.apply(&mut frames, &mut StdRng::seed_from_u64(seed));

            // A fully zeroed frame count of 64 would mean the bin mask covered everything
            let frames_hit = zeroed_frames(&frames);
            let bins_hit = zeroed_bins(&frames);
            if bins_hit < 64 {
                max_frames = max_frames.max(frames_hit);
            }
            if frames_hit < 62 {
                max_bins = max_bins.max(bins_hit);
            }
        }

        assert!(max_frames <= 24, "frame mask reached {} frames", max_frames);
        assert!(max_bins <= 52, "bin mask reached {} bins", max_bins);
        // Over 2000 draws the bin mask goes well past anything the frame mask can reach
        assert!(max_bins > 24);
    }

    #[test]
    fn test_frame_mask_only() {
        let masker = SpecAugment {
            frame_mask_param: 10,
            bin_mask_param: 0,
        };
        for seed in 0..200 {
            let mut frames = vec![vec![1.0; 64]; 62];
            masker.apply(&mut frames, &mut StdRng::seed_from_u64(seed));
            assert_eq!(zeroed_bins(&frames), 0);
            assert!(zeroed_frames(&frames) <= 10);
        }
    }

    #[test]
    fn test_mask_end_floors_unrounded_sum() {
        // offset 2.6 and width 2.6 cover [2, 5), not [2, 4)
        let mut rng = StdRng::seed_from_u64(9);
        let mut widths_seen = std::collections::BTreeSet::new();
        for _ in 0..2000 {
            if let Some((start, end)) = mask_bounds(3, 62, &mut rng) {
                widths_seen.insert(end - start);
            }
        }
        // A width below 3 can still span 3 cells when the offset is fractional
        assert!(widths_seen.contains(&3));
    }
}
