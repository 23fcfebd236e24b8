// Spectrogram module
// STFT, fixed-shape filterbank construction, and training-time masking

pub mod augment;
pub mod filterbank;
pub mod stft;

pub use augment::{AugmentConfig, SpecAugment};
pub use filterbank::{
    fit_to_shape, to_spectrogram, Spectrogram, SpectrogramConfig, SpectrogramError,
};
pub use stft::{hann_window, Stft, StftParams};
