// Cerebral Circles - EEG segmentation and filterbank dataset
// Module declarations

use clap::Parser;
use std::process::ExitCode;

pub mod commands;
pub mod config;
pub mod dataset;
pub mod events;
pub mod pipeline;
pub mod recording;
pub mod spectrogram;

pub use config::{ConfigError, ExperimentConfig};
pub use dataset::{DatasetError, DatasetItem, EegDataset, SegmentLookup, SegmentStore};
pub use events::{segment, EegSample, MarkerEvent, MarkerType, Segment, SegmentLabel, SegmentMap};
pub use spectrogram::{to_spectrogram, Spectrogram, SpectrogramConfig, SpectrogramError};

pub fn run() -> ExitCode {
    let cli = commands::Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    log::debug!("circles v{}", env!("CARGO_PKG_VERSION"));

    match commands::execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e.message());
            ExitCode::FAILURE
        }
    }
}
