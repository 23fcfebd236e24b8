// EEG filterbank construction
// Turns one segment's raw multi-channel samples into a fixed-size,
// channel-averaged power spectrogram

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::{Segment, SegmentLabel};
use crate::spectrogram::stft::{Stft, StftParams};

#[derive(Debug, Error)]
pub enum SpectrogramError {
    #[error("Invalid spectrogram configuration: {0}")]
    InvalidConfig(String),

    #[error("Sample row {row} has {found} channels, expected {expected}")]
    RaggedSamples {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Non-finite value at sample row {row}, channel {channel}")]
    NonFiniteSample { row: usize, channel: usize },

    #[error("FFT failed: {0}")]
    Fft(String),
}

/// Configuration for filterbank extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramConfig {
    /// EEG sample rate in Hz
    pub sample_rate_hz: f64,

    /// Analysis window length in milliseconds
    pub window_length_ms: f64,

    /// Hop between frames in milliseconds
    pub hop_length_ms: f64,

    /// Number of frequency bins in the output
    pub freq_bin_count: usize,

    /// Signal duration the output frames should cover, in seconds
    pub target_duration_sec: f64,

    /// Channels per sample row
    pub channel_count: usize,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        SpectrogramConfig {
            sample_rate_hz: 128.0,
            window_length_ms: 25.0,
            hop_length_ms: 10.0,
            freq_bin_count: 64,
            // 80 samples at 128 Hz
            target_duration_sec: 0.625,
            channel_count: 14,
        }
    }
}

impl SpectrogramConfig {
    /// Set the target duration from a sample count at the configured rate
    pub fn with_target_samples(mut self, samples: usize) -> Self {
        self.target_duration_sec = samples as f64 / self.sample_rate_hz;
        self
    }

    pub fn window_samples(&self) -> usize {
        (self.sample_rate_hz * self.window_length_ms / 1000.0).round() as usize
    }

    pub fn hop_samples(&self) -> usize {
        (self.sample_rate_hz * self.hop_length_ms / 1000.0).round() as usize
    }

    /// Number of hops that fit in the target duration
    pub fn target_frame_count(&self) -> usize {
        let frames = self.target_duration_sec * 1000.0 / self.hop_length_ms;
        (frames + 1e-9).floor().max(0.0) as usize
    }

    pub fn validate(&self) -> Result<(), SpectrogramError> {
        let invalid = |msg: &str| Err(SpectrogramError::InvalidConfig(msg.to_string()));

        if !(self.sample_rate_hz > 0.0) || !self.sample_rate_hz.is_finite() {
            return invalid("sample_rate_hz must be positive");
        }
        if !(self.window_length_ms > 0.0) || !(self.hop_length_ms > 0.0) {
            return invalid("window and hop lengths must be positive");
        }
        if self.window_samples() == 0 {
            return invalid("window length rounds to zero samples");
        }
        if self.hop_samples() == 0 {
            return invalid("hop length rounds to zero samples");
        }
        if self.freq_bin_count == 0 {
            return invalid("freq_bin_count must be at least 1");
        }
        if self.channel_count == 0 {
            return invalid("channel_count must be at least 1");
        }
        if !(self.target_duration_sec > 0.0) || !self.target_duration_sec.is_finite() {
            return invalid("target_duration_sec must be positive");
        }
        if self.target_frame_count() == 0 {
            return invalid("target duration is shorter than one hop");
        }

        Ok(())
    }
}

/// Fixed-size time-frequency power representation of one segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrogram {
    /// [time_frame][frequency_bin]
    pub frames: Vec<Vec<f64>>,

    pub label: SegmentLabel,
}

impl Spectrogram {
    /// (frames, bins)
    pub fn shape(&self) -> (usize, usize) {
        (self.frames.len(), self.frames.first().map_or(0, |f| f.len()))
    }

    pub fn total_power(&self) -> f64 {
        self.frames.iter().flatten().sum()
    }

    pub fn is_silent(&self) -> bool {
        self.frames.iter().flatten().all(|&v| v == 0.0)
    }
}

/// Build the spectrogram for a segment
///
/// Steps: transpose to [channel][time], subtract the global mean, STFT each
/// channel, average power across channels, transpose to [frame][bin], then
/// pad or crop both axes to the configured shape.
pub fn to_spectrogram(
    segment: &Segment,
    config: &SpectrogramConfig,
) -> Result<Spectrogram, SpectrogramError> {
    config.validate()?;
    check_samples(&segment.samples, config.channel_count)?;

    let target_frames = config.target_frame_count();
    let bins = config.freq_bin_count;

    if segment.samples.is_empty() {
        return Ok(Spectrogram {
            frames: vec![vec![0.0; bins]; target_frames],
            label: segment.label,
        });
    }

    let mut signal = transpose(&segment.samples);
    subtract_global_mean(&mut signal);

    let power = channel_mean_power(&signal, config)?;
    let frames = fit_to_shape(transpose(&power), target_frames, bins);

    Ok(Spectrogram {
        frames,
        label: segment.label,
    })
}

/// Reject ragged rows and non-finite values before any arithmetic
fn check_samples(samples: &[Vec<f64>], channel_count: usize) -> Result<(), SpectrogramError> {
    for (row, values) in samples.iter().enumerate() {
        if values.len() != channel_count {
            return Err(SpectrogramError::RaggedSamples {
                row,
                expected: channel_count,
                found: values.len(),
            });
        }
        if let Some(channel) = values.iter().position(|v| !v.is_finite()) {
            return Err(SpectrogramError::NonFiniteSample { row, channel });
        }
    }
    Ok(())
}

/// Remove one scalar DC offset computed over every channel and sample
/// This is not per-channel centering: all channels share the same mean
fn subtract_global_mean(signal: &mut [Vec<f64>]) {
    let count: usize = signal.iter().map(|ch| ch.len()).sum();
    if count == 0 {
        return;
    }

    let mean = signal.iter().flatten().sum::<f64>() / count as f64;
    for value in signal.iter_mut().flatten() {
        *value -= mean;
    }
}

/// Per-channel STFT power averaged across channels, in [bin][frame] layout
fn channel_mean_power(
    signal: &[Vec<f64>],
    config: &SpectrogramConfig,
) -> Result<Vec<Vec<f64>>, SpectrogramError> {
    let input_len = signal.first().map_or(0, |ch| ch.len());
    let params = StftParams::clamped(
        config.freq_bin_count,
        config.window_samples(),
        config.hop_samples(),
        input_len,
    );

    if params.is_degenerate() {
        log::debug!(
            "Segment of {} samples too short for a transform, emitting zeros",
            input_len
        );
        return Ok(Vec::new());
    }

    let stft = Stft::new(params);
    let mut mean: Vec<Vec<f64>> = Vec::new();

    for channel in signal {
        let power = stft.power(channel)?;
        if mean.is_empty() {
            mean = power;
            continue;
        }
        for (acc_row, row) in mean.iter_mut().zip(power.iter()) {
            for (acc, value) in acc_row.iter_mut().zip(row.iter()) {
                *acc += value;
            }
        }
    }

    let channels = signal.len() as f64;
    for value in mean.iter_mut().flatten() {
        *value /= channels;
    }

    Ok(mean)
}

/// Swap the two axes of a rectangular 2D array
fn transpose(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let width = rows.first().map_or(0, |r| r.len());
    (0..width)
        .map(|col| rows.iter().map(|row| row[col]).collect())
        .collect()
}

/// Zero-pad at the end or truncate, first along time then along frequency
pub fn fit_to_shape(
    mut frames: Vec<Vec<f64>>,
    target_frames: usize,
    bins: usize,
) -> Vec<Vec<f64>> {
    frames.resize_with(target_frames, Vec::new);
    for frame in frames.iter_mut() {
        frame.resize(bins, 0.0);
    }
    frames
}
