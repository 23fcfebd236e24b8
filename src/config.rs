// Experiment configuration
// Input layout, filterbank geometry and augmentation settings, loadable from JSON

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::recording::{EegSource, MarkerSource};
use crate::spectrogram::{AugmentConfig, SpectrogramConfig, SpectrogramError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Spectrogram(#[from] SpectrogramError),

    #[error("Invalid row range for {0}: start is past end")]
    RowRange(&'static str),
}

/// Full configuration for one recording session
/// Every field falls back to the values used for the recorded session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub markers: MarkerSource,
    pub eeg: EegSource,
    pub spectrogram: SpectrogramConfig,
    pub augment: AugmentConfig,
}

impl ExperimentConfig {
    /// Load from a JSON file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let data = fs::read(path)?;
                let config = Self::from_json_bytes(&data)?;
                log::info!("Loaded config from {}", path.display());
                config
            }
            None => ExperimentConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_json_bytes(data: &[u8]) -> Result<Self, ConfigError> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.spectrogram.validate()?;

        for (name, range) in [("markers", self.markers.keep), ("eeg", self.eeg.keep)] {
            if range.end.is_some_and(|end| end < range.start) {
                return Err(ConfigError::RowRange(name));
            }
        }

        Ok(())
    }
}
