//! Labelled image discovery, class balancing, and train/test splitting.

mod balance;
mod class_map;
mod error;
pub mod export;
mod filenames;
pub mod sources;
mod split;

pub use balance::{BalanceReport, OTHERS_CLASS, apply_min_count};
pub use class_map::ClassLabelMap;
pub use error::DatasetError;
pub use filenames::FilenamesDataset;
pub use sources::{CsvColumns, DirectoryOptions, SourceKind, SourceOptions, parse_source};
pub use split::{LabelledFilenames, SplitOptions, train_test_split};
