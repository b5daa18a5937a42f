//! Dataset preparation for a training run and hand-off to a backend.
//!
//! [`train_image_classification_model`] loads and splits the configured
//! dataset, then passes it to a [`Trainer`]. [`ManifestTrainer`] is the
//! bundled backend: it writes the prepared run to disk for an external
//! tensor framework to consume.

use std::path::{Path, PathBuf};

use thiserror::Error;
use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};
use tracing::info;

use crate::config::{self, ConfigError, MisoConfig};
use crate::dataset::export::{ExportError, ExportOptions, ExportSummary, write_split_manifest};
use crate::dataset::{DatasetError, FilenamesDataset};

/// Errors that may occur while preparing or running a training job.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Export(#[from] ExportError),
    /// The run directory could not be created.
    #[error("Failed to create run directory {path}: {source}")]
    RunDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format run timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
    /// Backend-specific failure.
    #[error("Training backend failed: {0}")]
    Backend(String),
}

/// Everything a backend needs to train one model.
#[derive(Debug)]
pub struct TrainingJob<'a> {
    pub config: &'a MisoConfig,
    pub dataset: &'a FilenamesDataset,
    /// Inverse-frequency loss weights, present when enabled in the config.
    pub class_weights: Option<Vec<f64>>,
}

/// What a backend produced.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Directory holding the run's artifacts.
    pub run_dir: PathBuf,
    pub export: Option<ExportSummary>,
}

/// A model training backend.
pub trait Trainer {
    fn train(&mut self, job: &TrainingJob<'_>) -> Result<TrainingOutcome, TrainingError>;
}

/// Load and split the configured dataset, then train with `trainer`.
pub fn train_image_classification_model(
    config: &MisoConfig,
    trainer: &mut dyn Trainer,
) -> Result<TrainingOutcome, TrainingError> {
    config.validate()?;
    let settings = &config.dataset;

    let mut dataset = FilenamesDataset::new(&settings.source, settings.source_options());
    dataset.load(settings.min_count, settings.map_others)?;
    dataset.split(settings.val_split, settings.stratify, settings.random_seed)?;

    let class_weights = config
        .training
        .use_class_weights
        .then(|| dataset.class_weights());

    info!("{}", "-".repeat(60));
    info!(
        "Training {} on {} classes: {} train, {} test images",
        config.cnn.kind,
        dataset.num_classes(),
        dataset.train()?.len(),
        dataset.test()?.len()
    );
    if let Some(weights) = &class_weights {
        for (label, weight) in dataset.cls_labels().iter().zip(weights) {
            info!("- {label}: weight {weight:.3}");
        }
    }

    let job = TrainingJob {
        config,
        dataset: &dataset,
        class_weights,
    };
    let outcome = trainer.train(&job)?;
    info!("Run finished, results in {}", outcome.run_dir.display());
    Ok(outcome)
}

/// Writes the split export and the effective configuration to a fresh run
/// directory under `output.save_dir`.
#[derive(Debug, Default)]
pub struct ManifestTrainer {
    timestamp: Option<OffsetDateTime>,
}

impl ManifestTrainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed time for the run directory name.
    pub fn with_timestamp(timestamp: OffsetDateTime) -> Self {
        Self {
            timestamp: Some(timestamp),
        }
    }

    /// Create `<save_dir>/<kind>_<timestamp>`, adding `_2`, `_3`, ... when a run
    /// started within the same second already took the name.
    fn create_run_dir(&self, save_dir: &Path, kind: &str) -> Result<PathBuf, TrainingError> {
        const RUN_FORMAT: &[FormatItem<'_>] =
            format_description!("[year][month][day]-[hour][minute][second]");
        let now = self
            .timestamp
            .unwrap_or_else(crate::logging::now_local_or_utc);
        let stem = format!("{kind}_{}", now.format(RUN_FORMAT)?);
        std::fs::create_dir_all(save_dir).map_err(|source| TrainingError::RunDir {
            path: save_dir.to_path_buf(),
            source,
        })?;
        let mut attempt = 1usize;
        loop {
            let run_dir = if attempt == 1 {
                save_dir.join(&stem)
            } else {
                save_dir.join(format!("{stem}_{attempt}"))
            };
            match std::fs::create_dir(&run_dir) {
                Ok(()) => return Ok(run_dir),
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(source) => {
                    return Err(TrainingError::RunDir {
                        path: run_dir,
                        source,
                    });
                }
            }
        }
    }
}

impl Trainer for ManifestTrainer {
    fn train(&mut self, job: &TrainingJob<'_>) -> Result<TrainingOutcome, TrainingError> {
        let run_dir = self.create_run_dir(&job.config.output.save_dir, &job.config.cnn.kind)?;

        let options = ExportOptions {
            val_split: job.config.dataset.val_split,
            random_seed: job.config.dataset.random_seed,
            class_weights: job.class_weights.clone(),
        };
        let summary = write_split_manifest(job.dataset, &run_dir, &options)?;
        config::save_to_path(job.config, &run_dir.join(config::CONFIG_FILE_NAME))?;
        info!(
            "Wrote {} and {}",
            summary.manifest_path.display(),
            summary.samples_path.display()
        );
        Ok(TrainingOutcome {
            run_dir,
            export: Some(summary),
        })
    }
}
