// CLI commands
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ExperimentConfig;
use crate::dataset::{DatasetItem, EegDataset, SegmentLookup, SegmentStore};
use crate::events;
use crate::pipeline::{PipelineStage, TraceBuilder, TraceEntry, TraceWriter};
use crate::recording;

#[derive(Debug, Serialize)]
pub struct CommandError {
    message: String,
}

impl<E: std::fmt::Display> From<E> for CommandError {
    fn from(error: E) -> Self {
        CommandError {
            message: error.to_string(),
        }
    }
}

impl CommandError {
    pub fn message(&self) -> &str {
        &self.message
    }
}

type CommandResult<T> = Result<T, CommandError>;

/// Items between spectrogram progress lines during export
const EXPORT_PROGRESS_INTERVAL: usize = 100;

/// Segment Cerebral Circles EEG recordings into labeled filterbanks
#[derive(Parser, Debug)]
#[command(name = "circles")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Experiment config (JSON); defaults to the recorded session layout
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cut marker-aligned EEG segments and save them as JSON
    Segment {
        /// Interval marker CSV
        #[arg(long)]
        markers: PathBuf,

        /// EEG export CSV
        #[arg(long)]
        eeg: PathBuf,

        /// Output segment store
        #[arg(short, long)]
        output: PathBuf,

        /// Append progress to this JSONL trace file
        #[arg(long)]
        trace: Option<PathBuf>,
    },

    /// Show one segment and its filterbank
    Inspect {
        /// Segment store written by `segment`
        #[arg(short, long)]
        segments: PathBuf,

        /// Segment id
        #[arg(long)]
        id: usize,
    },

    /// Compute every dataset item and write them as JSON
    Export {
        #[arg(short, long)]
        segments: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Apply frequency and time masking
        #[arg(long)]
        train: bool,

        #[arg(long)]
        trace: Option<PathBuf>,
    },

    /// Label counts and segment length summary
    Stats {
        #[arg(short, long)]
        segments: PathBuf,
    },
}

/// Writes to the trace file when one was requested
struct Tracer(Option<TraceWriter>);

impl Tracer {
    fn new(path: Option<PathBuf>) -> Self {
        Tracer(path.map(TraceWriter::new))
    }

    fn record(&self, entry: TraceEntry) -> CommandResult<()> {
        if let Some(writer) = &self.0 {
            writer.write(&entry)?;
        }
        Ok(())
    }
}

pub fn execute(cli: Cli) -> CommandResult<()> {
    let config = ExperimentConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Segment {
            markers,
            eeg,
            output,
            trace,
        } => segment_recording(&config, &markers, &eeg, &output, Tracer::new(trace)),
        Commands::Inspect { segments, id } => inspect_segment(&config, &segments, id),
        Commands::Export {
            segments,
            output,
            train,
            trace,
        } => export_dataset(&config, &segments, &output, train, Tracer::new(trace)),
        Commands::Stats { segments } => segment_stats(&segments),
    }
}

fn segment_recording(
    config: &ExperimentConfig,
    markers_path: &Path,
    eeg_path: &Path,
    output: &Path,
    tracer: Tracer,
) -> CommandResult<()> {
    tracer.record(TraceBuilder::stage(PipelineStage::Ingest).start("Reading recordings"))?;

    let markers = recording::load_markers(markers_path, &config.markers)?;
    let eeg = recording::load_eeg(eeg_path, &config.eeg)?;

    if eeg.channel_count() != config.spectrogram.channel_count {
        log::warn!(
            "EEG export has {} channels but the filterbank expects {}",
            eeg.channel_count(),
            config.spectrogram.channel_count
        );
    }

    tracer.record(
        TraceBuilder::stage(PipelineStage::Ingest)
            .complete("Recordings loaded")
            .with_data(serde_json::json!({
                "markers": markers.len(),
                "eeg_samples": eeg.samples.len(),
                "channels": eeg.channels,
            })),
    )?;

    let result = events::segment(&markers, &eeg.samples);
    let store = SegmentStore::new(result.segments);
    let digest = store.save(output)?;

    tracer.record(
        TraceBuilder::stage(PipelineStage::Segmentation)
            .complete("Segments saved")
            .with_data(serde_json::json!({
                "report": result.report,
                "output": output.display().to_string(),
                "sha256": digest,
            })),
    )?;

    println!(
        "{} segments from {} markers ({} skipped) -> {}",
        result.report.admitted,
        result.report.markers_scanned,
        result.report.skipped_total(),
        output.display()
    );
    println!("sha256 {}", digest);
    Ok(())
}

fn inspect_segment(config: &ExperimentConfig, segments: &Path, id: usize) -> CommandResult<()> {
    let store = SegmentStore::load(segments)?;
    let segment = store
        .get(id)
        .ok_or_else(|| CommandError::from(format!("Segment {} not found", id)))?;

    println!("segment {}: {}", id, segment.label.to_string());
    println!("samples: {}", segment.sample_count());

    let label = segment.label;
    let dataset = EegDataset::new(store, config.spectrogram.clone());
    let item = dataset.get(id)?;

    let frame_power: Vec<f64> = item.frames.iter().map(|f| f.iter().sum()).collect();
    let total: f64 = frame_power.iter().sum();
    let active = frame_power.iter().filter(|&&p| p > 0.0).count();

    println!(
        "filterbank: {} frames x {} bins",
        item.frames.len(),
        item.frames.first().map_or(0, |f| f.len())
    );
    println!("total power: {:.6}", total);
    println!("non-zero frames: {}", active);
    println!("one-hot ({}): {:?}", label.to_string(), item.label);
    Ok(())
}

fn export_dataset(
    config: &ExperimentConfig,
    segments: &Path,
    output: &Path,
    train: bool,
    tracer: Tracer,
) -> CommandResult<()> {
    let store = SegmentStore::load(segments)?;
    let dataset =
        EegDataset::new(store, config.spectrogram.clone()).with_augment(config.augment.clone());

    tracer.record(
        TraceBuilder::stage(PipelineStage::Spectrogram)
            .start(format!("Computing {} items", dataset.len())),
    )?;

    let mut rng = config.augment.rng();
    let mut items: Vec<DatasetItem> = Vec::with_capacity(dataset.len());
    for index in 0..dataset.len() {
        let item = if train {
            dataset.get_augmented(index, &mut rng)?
        } else {
            dataset.get(index)?
        };
        items.push(item);

        if items.len() % EXPORT_PROGRESS_INTERVAL == 0 {
            tracer.record(TraceBuilder::stage(PipelineStage::Spectrogram).progress(
                items.len() as f32 / dataset.len() as f32,
                format!("{} of {} items", items.len(), dataset.len()),
            ))?;
        }
    }

    fs::write(output, serde_json::to_vec(&items)?)?;

    tracer.record(
        TraceBuilder::stage(PipelineStage::Export)
            .complete("Dataset written")
            .with_data(serde_json::json!({
                "items": items.len(),
                "train": train,
                "output": output.display().to_string(),
            })),
    )?;

    println!("{} items -> {}", items.len(), output.display());
    Ok(())
}

fn segment_stats(segments: &Path) -> CommandResult<()> {
    let store = SegmentStore::load(segments)?;
    let lengths: Vec<usize> = store.segments().iter().map(|s| s.sample_count()).collect();

    println!("segments: {}", store.len());
    let dataset = EegDataset::new(store, Default::default());
    for (label, count) in dataset.label_counts() {
        println!("  {}: {}", label.to_string(), count);
    }

    if let (Some(min), Some(max)) = (lengths.iter().min(), lengths.iter().max()) {
        let mean = lengths.iter().sum::<usize>() as f64 / lengths.len() as f64;
        let empty = lengths.iter().filter(|&&l| l == 0).count();
        println!("samples per segment: min {}, max {}, mean {:.1}", min, max, mean);
        println!("empty segments: {}", empty);
    }
    Ok(())
}
