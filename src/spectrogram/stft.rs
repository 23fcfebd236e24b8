// Short-time Fourier transform
// Centered, Hann-windowed STFT over a single channel, returning power per
// frequency bin and frame

use realfft::{RealFftPlanner, RealToComplex};
use std::sync::Arc;

use crate::spectrogram::SpectrogramError;

/// Periodic Hann window of `len` samples
pub fn hann_window(len: usize) -> Vec<f64> {
    if len == 0 {
        return Vec::new();
    }

    (0..len)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / len as f64).cos()))
        .collect()
}

/// Transform geometry, all in samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StftParams {
    /// FFT length
    pub n_fft: usize,

    /// Analysis window length, at most `n_fft`
    pub win_length: usize,

    /// Advance between frames
    pub hop_length: usize,
}

impl StftParams {
    /// Transform size for a signal of `input_len` samples
    ///
    /// The requested size (`2 * freq_bins`) is clamped to half the input so short
    /// segments still transform. The window shrinks with it when it would not fit.
    pub fn clamped(
        freq_bins: usize,
        window_samples: usize,
        hop_samples: usize,
        input_len: usize,
    ) -> Self {
        let n_fft = (2 * freq_bins).min(input_len / 2);
        StftParams {
            n_fft,
            win_length: window_samples.min(n_fft),
            hop_length: hop_samples,
        }
    }

    /// One-sided bin count
    pub fn bin_count(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Frame count for a signal of `input_len` samples after centering
    pub fn frame_count(&self, input_len: usize) -> usize {
        if self.hop_length == 0 {
            return 0;
        }
        let padded = input_len + 2 * (self.n_fft / 2);
        if padded < self.n_fft {
            return 0;
        }
        1 + (padded - self.n_fft) / self.hop_length
    }

    /// Too small to produce a meaningful spectrum
    pub fn is_degenerate(&self) -> bool {
        self.n_fft < 2 || self.win_length == 0 || self.hop_length == 0
    }
}

/// Planned STFT for one transform geometry
/// Reusable across the channels of a segment
pub struct Stft {
    params: StftParams,
    fft: Arc<dyn RealToComplex<f64>>,
    window: Vec<f64>,
}

impl Stft {
    pub fn new(params: StftParams) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(params.n_fft);

        // Window is centered inside the FFT frame and zero elsewhere
        let mut window = vec![0.0; params.n_fft];
        let offset = (params.n_fft - params.win_length) / 2;
        window[offset..offset + params.win_length]
            .copy_from_slice(&hann_window(params.win_length));

        Stft {
            params,
            fft,
            window,
        }
    }

    pub fn params(&self) -> StftParams {
        self.params
    }

    /// Power spectrogram (|X|^2) in [frequency_bin][frame] layout
    pub fn power(&self, signal: &[f64]) -> Result<Vec<Vec<f64>>, SpectrogramError> {
        let n_fft = self.params.n_fft;
        let n_frames = self.params.frame_count(signal.len());
        let n_bins = self.params.bin_count();

        let mut power = vec![vec![0.0; n_frames]; n_bins];
        if signal.is_empty() || n_frames == 0 {
            return Ok(power);
        }

        let padded = reflect_pad(signal, n_fft / 2);
        let mut input = self.fft.make_input_vec();
        let mut spectrum = self.fft.make_output_vec();

        for frame in 0..n_frames {
            let start = frame * self.params.hop_length;
            for (k, slot) in input.iter_mut().enumerate() {
                *slot = padded[start + k] * self.window[k];
            }

            self.fft
                .process(&mut input, &mut spectrum)
                .map_err(|e| SpectrogramError::Fft(e.to_string()))?;

            for (bin, c) in spectrum.iter().enumerate() {
                power[bin][frame] = c.re * c.re + c.im * c.im;
            }
        }

        Ok(power)
    }
}

/// Mirror the signal by `pad` samples on each side, excluding the edge sample
fn reflect_pad(signal: &[f64], pad: usize) -> Vec<f64> {
    let len = signal.len() as isize;
    let mut padded = Vec::with_capacity(signal.len() + 2 * pad);

    for i in -(pad as isize)..(len + pad as isize) {
        padded.push(signal[reflect_index(i, len)]);
    }

    padded
}

fn reflect_index(i: isize, len: isize) -> usize {
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let mut j = i.rem_euclid(period);
    if j >= len {
        j = period - j;
    }
    j as usize
}
