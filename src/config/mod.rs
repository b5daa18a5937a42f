//! Typed run configuration stored as TOML.

mod augmentation;
mod defaults;
mod errors;
mod io;
mod types;

pub use augmentation::AugmentationParam;
pub use errors::ConfigError;
pub use io::{
    CONFIG_FILE_NAME, config_path, load_from_path, parse_str, read_from_path, save_to_path,
};
pub use types::{
    AugmentationConfig, CnnConfig, DatasetConfig, GlobalPooling, ImageType, MisoConfig,
    OutputConfig, RunConfig, TrainingConfig,
};
