use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dataset::{CsvColumns, DirectoryOptions, SourceOptions};

use super::augmentation::AugmentationParam;
use super::defaults::*;
use super::errors::ConfigError;

/// Complete configuration of one training run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MisoConfig {
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub cnn: CnnConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub augmentation: AugmentationConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub run: RunConfig,
}

/// Where the labelled images come from and how they are filtered and split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Class-per-folder directory, label CSV, or XML project file.
    #[serde(default)]
    pub source: PathBuf,
    /// Classes with fewer images are removed (0 keeps every class).
    #[serde(default = "default_min_count")]
    pub min_count: usize,
    /// Collect the images of removed classes into an "others" class.
    #[serde(default = "default_false")]
    pub map_others: bool,
    /// Fraction of images held out for validation.
    #[serde(default = "default_val_split")]
    pub val_split: f64,
    /// Seed of the train/validation split.
    #[serde(default)]
    pub random_seed: u64,
    /// Preserve class proportions in both partitions.
    #[serde(default = "default_true")]
    pub stratify: bool,
    /// Images are arranged in per-class subdirectories.
    #[serde(default = "default_true")]
    pub has_classes: bool,
    /// Class subdirectories starting with this character are ignored.
    #[serde(default = "default_skip_prefix")]
    pub skip_prefix: char,
    /// Column layout of CSV sources.
    #[serde(default)]
    pub csv_columns: CsvColumns,
    /// Directory CSV filenames are relative to (defaults to the CSV's folder).
    #[serde(default)]
    pub csv_root: Option<PathBuf>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            min_count: default_min_count(),
            map_others: default_false(),
            val_split: default_val_split(),
            random_seed: 0,
            stratify: default_true(),
            has_classes: default_true(),
            skip_prefix: default_skip_prefix(),
            csv_columns: CsvColumns::default(),
            csv_root: None,
        }
    }
}

impl DatasetConfig {
    /// Parser options derived from this section.
    pub fn source_options(&self) -> SourceOptions {
        SourceOptions {
            directory: DirectoryOptions {
                skip_prefix: self.skip_prefix,
                has_classes: self.has_classes,
            },
            csv_columns: self.csv_columns,
            csv_root: self.csv_root.clone(),
        }
    }
}

/// Colour space fed to the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    #[default]
    Greyscale,
    Rgb,
}

/// Global pooling applied after the convolutional blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlobalPooling {
    #[default]
    Avg,
    Max,
    None,
}

/// Network selection, passed through to the training backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CnnConfig {
    /// Architecture name, e.g. `base_cyclic`, `resnet50_tl`, `efficientnetB0`.
    #[serde(default = "default_cnn_kind")]
    pub kind: String,
    /// Input shape `[height, width, channels]`; `None` (`"auto"` in TOML) uses the
    /// architecture default.
    #[serde(default = "default_img_shape", with = "auto_shape")]
    pub img_shape: Option<[usize; 3]>,
    #[serde(default)]
    pub img_type: ImageType,
    /// Filters in the first block of custom networks.
    #[serde(default = "default_filters")]
    pub filters: usize,
    /// Number of blocks of custom networks; `None` picks from the input size.
    #[serde(default)]
    pub blocks: Option<usize>,
    /// Dense layer sizes of the classifier head.
    #[serde(default)]
    pub dense: Option<Vec<usize>>,
    #[serde(default = "default_true")]
    pub use_batch_norm: bool,
    #[serde(default)]
    pub global_pooling: GlobalPooling,
    #[serde(default = "default_activation")]
    pub activation: String,
    #[serde(default = "default_false")]
    pub use_asoftmax: bool,
}

impl Default for CnnConfig {
    fn default() -> Self {
        Self {
            kind: default_cnn_kind(),
            img_shape: default_img_shape(),
            img_type: ImageType::default(),
            filters: default_filters(),
            blocks: None,
            dense: None,
            use_batch_norm: default_true(),
            global_pooling: GlobalPooling::default(),
            activation: default_activation(),
            use_asoftmax: default_false(),
        }
    }
}

/// Training loop knobs, passed through to the training backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Hard stop regardless of the learning rate schedule.
    #[serde(default = "default_max_epochs")]
    pub max_epochs: usize,
    /// Epochs without improvement before the learning rate is halved.
    #[serde(default = "default_alr_epochs")]
    pub alr_epochs: usize,
    /// Learning rate drops after which training stops.
    #[serde(default = "default_alr_drops")]
    pub alr_drops: usize,
    #[serde(default = "default_false")]
    pub monitor_val_loss: bool,
    /// Weight the loss by inverse class frequency.
    #[serde(default = "default_true")]
    pub use_class_weights: bool,
    #[serde(default = "default_false")]
    pub use_class_undersampling: bool,
    #[serde(default = "default_true")]
    pub use_augmentation: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_epochs: default_max_epochs(),
            alr_epochs: default_alr_epochs(),
            alr_drops: default_alr_drops(),
            monitor_val_loss: default_false(),
            use_class_weights: default_true(),
            use_class_undersampling: default_false(),
            use_augmentation: default_true(),
        }
    }
}

/// Train-time augmentation lists; see [`AugmentationParam`] for their meaning.
///
/// `None` disables an augmentation and is written as an empty list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AugmentationConfig {
    /// Rotation in degrees.
    #[serde(default = "default_rotation", with = "disabled_list")]
    pub rotation: Option<Vec<f64>>,
    /// `I' = I * gain`
    #[serde(default = "default_gain", with = "disabled_list")]
    pub gain: Option<Vec<f64>>,
    /// `I' = I ^ gamma`
    #[serde(default = "default_gamma", with = "disabled_list")]
    pub gamma: Option<Vec<f64>>,
    /// `I' = I + bias`
    #[serde(default, with = "disabled_list")]
    pub bias: Option<Vec<f64>>,
    #[serde(default = "default_zoom", with = "disabled_list")]
    pub zoom: Option<Vec<f64>>,
    /// Gaussian noise standard deviation.
    #[serde(default, with = "disabled_list")]
    pub gaussian_noise: Option<Vec<f64>>,
    /// Random crop shape; requires `orig_img_shape`.
    #[serde(default)]
    pub random_crop: Option<[usize; 3]>,
    #[serde(default = "default_orig_img_shape")]
    pub orig_img_shape: [usize; 3],
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self {
            rotation: default_rotation(),
            gain: default_gain(),
            gamma: default_gamma(),
            bias: None,
            zoom: default_zoom(),
            gaussian_noise: None,
            random_crop: None,
            orig_img_shape: default_orig_img_shape(),
        }
    }
}

impl AugmentationConfig {
    /// Interpreted augmentation parameters, skipping unset ones.
    pub fn params(&self) -> Result<Vec<(&'static str, AugmentationParam)>, ConfigError> {
        let lists = [
            ("augmentation.rotation", &self.rotation),
            ("augmentation.gain", &self.gain),
            ("augmentation.gamma", &self.gamma),
            ("augmentation.bias", &self.bias),
            ("augmentation.zoom", &self.zoom),
            ("augmentation.gaussian_noise", &self.gaussian_noise),
        ];
        let mut params = Vec::new();
        for (field, values) in lists {
            let Some(values) = values else {
                continue;
            };
            let param = AugmentationParam::from_values(values)
                .map_err(|message| ConfigError::invalid(field, message))?;
            params.push((field, param));
        }
        Ok(params)
    }
}

/// Where results are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,
    #[serde(default = "default_true")]
    pub save_model: bool,
    /// Save the mislabelled image analysis.
    #[serde(default = "default_false")]
    pub save_mislabeled: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            save_dir: default_save_dir(),
            save_model: default_true(),
            save_mislabeled: default_false(),
        }
    }
}

/// Coordination between concurrent training invocations on one host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Lock file shared by every run that must not overlap.
    #[serde(default = "default_lock_file")]
    pub lock_file: PathBuf,
    /// Seconds between lock acquisition attempts.
    #[serde(default = "default_retry_seconds")]
    pub retry_seconds: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            lock_file: default_lock_file(),
            retry_seconds: default_retry_seconds(),
        }
    }
}

impl RunConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_seconds)
    }
}

impl MisoConfig {
    /// Default configuration reading from `source`.
    pub fn with_source(source: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        config.dataset.source = source.into();
        config
    }

    /// Check ranges and cross-field consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dataset = &self.dataset;
        if dataset.source.as_os_str().is_empty() {
            return Err(ConfigError::invalid("dataset.source", "must be set"));
        }
        if !dataset.val_split.is_finite() || !(0.0..1.0).contains(&dataset.val_split) {
            return Err(ConfigError::invalid(
                "dataset.val_split",
                format!("{} is outside [0, 1)", dataset.val_split),
            ));
        }
        let columns = dataset.csv_columns;
        if columns.file == columns.class
            || columns.file == columns.label
            || columns.class == columns.label
        {
            return Err(ConfigError::invalid(
                "dataset.csv_columns",
                "file, class and label columns must differ",
            ));
        }
        if self.cnn.kind.trim().is_empty() {
            return Err(ConfigError::invalid("cnn.kind", "must be set"));
        }
        if self.cnn.filters == 0 {
            return Err(ConfigError::invalid("cnn.filters", "must be positive"));
        }
        if let Some(shape) = self.cnn.img_shape
            && shape.contains(&0)
        {
            return Err(ConfigError::invalid("cnn.img_shape", "dimensions must be positive"));
        }
        if self.training.batch_size == 0 {
            return Err(ConfigError::invalid("training.batch_size", "must be positive"));
        }
        if self.training.max_epochs == 0 {
            return Err(ConfigError::invalid("training.max_epochs", "must be positive"));
        }
        self.augmentation.params()?;
        if let Some(crop) = self.augmentation.random_crop {
            let orig = self.augmentation.orig_img_shape;
            if crop.iter().zip(orig.iter()).any(|(c, o)| c > o) {
                return Err(ConfigError::invalid(
                    "augmentation.random_crop",
                    format!("{crop:?} does not fit inside orig_img_shape {orig:?}"),
                ));
            }
        }
        if self.run.retry_seconds == 0 {
            return Err(ConfigError::invalid("run.retry_seconds", "must be positive"));
        }
        Ok(())
    }
}

/// `Option<[usize; 3]>` as either a shape or the keyword `"auto"`.
mod auto_shape {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    const AUTO: &str = "auto";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Shape([usize; 3]),
        Keyword(String),
    }

    pub(super) fn serialize<S: Serializer>(
        value: &Option<[usize; 3]>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(shape) => shape.serialize(serializer),
            None => serializer.serialize_str(AUTO),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<[usize; 3]>, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Shape(shape) => Ok(Some(shape)),
            Repr::Keyword(word) if word == AUTO => Ok(None),
            Repr::Keyword(word) => Err(D::Error::custom(format!(
                "expected [height, width, channels] or \"{AUTO}\", got \"{word}\""
            ))),
        }
    }
}

/// `Option<Vec<f64>>` where an empty list stands for `None`.
mod disabled_list {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub(super) fn serialize<S: Serializer>(
        value: &Option<Vec<f64>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.as_deref().unwrap_or_default().serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<f64>>, D::Error> {
        let values = Vec::<f64>::deserialize(deserializer)?;
        Ok((!values.is_empty()).then_some(values))
    }
}
