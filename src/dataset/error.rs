use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while parsing, balancing, or splitting a labelled image set.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The source parsed cleanly but contained no images at all.
    #[error("Did not find any images in {source_path}")]
    Empty {
        /// Source locator that was parsed.
        source_path: PathBuf,
    },
    /// Every class fell below the minimum count.
    #[error("No classes left in {source_path} after removing classes with fewer than {min_count} images")]
    NoClassesAfterFilter {
        /// Source locator that was parsed.
        source_path: PathBuf,
        /// Threshold that removed every class.
        min_count: usize,
    },
    /// A CSV or XML label source is structurally invalid.
    #[error("Invalid label source {path}: {message}")]
    ParseFormat {
        /// File that failed to parse.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },
    /// The CSV reader rejected the file.
    #[error("Failed to read CSV {path}: {source}")]
    Csv {
        /// CSV file path.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },
    /// The XML document is not well formed.
    #[error("Failed to parse XML {path}: {source}")]
    Xml {
        /// XML file path.
        path: PathBuf,
        /// Underlying XML error.
        source: roxmltree::Error,
    },
    /// File system access failed.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// The locator names something this crate cannot read (e.g. a URL).
    #[error("Unsupported dataset source: {0}")]
    UnsupportedSource(String),
    /// Split fraction outside `[0, 1)`.
    #[error("Invalid validation split {0}; expected a value in [0, 1)")]
    InvalidSplit(f64),
    /// Filename and class index slices of different lengths.
    #[error("Got {filenames} filenames but {cls} class indices")]
    LengthMismatch { filenames: usize, cls: usize },
    /// `split` was called before `load`.
    #[error("Dataset has not been loaded")]
    NotLoaded,
    /// Partitions were requested before `split`.
    #[error("Dataset has not been split")]
    NotSplit,
}

impl DatasetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ParseFormat {
            path: path.into(),
            message: message.into(),
        }
    }
}
