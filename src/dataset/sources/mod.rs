//! Label sources: class-per-directory trees, label CSVs, and XML project exports.

mod csv_file;
mod directory;
mod xml_project;

use std::path::{Path, PathBuf};

use super::class_map::ClassLabelMap;
use super::error::DatasetError;

pub use csv_file::{CsvColumns, parse_csv};
pub use directory::{DirectoryOptions, IMAGE_EXTENSIONS, UNLABELLED_CLASS, parse_directory};
pub use xml_project::parse_xml;

/// The kind of label source a locator points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Directory,
    Csv,
    Xml,
}

impl SourceKind {
    /// Detect the source kind from the locator's extension.
    pub fn detect(source: &Path) -> Result<Self, DatasetError> {
        let text = source.to_string_lossy();
        if text.contains("://") {
            return Err(DatasetError::UnsupportedSource(text.to_string()));
        }
        let ext = source.extension().and_then(|ext| ext.to_str());
        Ok(match ext {
            Some(ext) if ext.eq_ignore_ascii_case("xml") => Self::Xml,
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Directory,
        })
    }
}

/// Everything needed to turn a locator into a class map.
#[derive(Clone, Debug, Default)]
pub struct SourceOptions {
    /// Directory-mode scanning options.
    pub directory: DirectoryOptions,
    /// CSV column layout.
    pub csv_columns: CsvColumns,
    /// Directory CSV filenames are relative to; defaults to the CSV's parent.
    pub csv_root: Option<PathBuf>,
}

/// Parse any supported source into a class map.
pub fn parse_source(source: &Path, options: &SourceOptions) -> Result<ClassLabelMap, DatasetError> {
    match SourceKind::detect(source)? {
        SourceKind::Xml => parse_xml(source),
        SourceKind::Csv => {
            let root = options
                .csv_root
                .clone()
                .unwrap_or_else(|| source.parent().map(Path::to_path_buf).unwrap_or_default());
            parse_csv(source, &root, options.csv_columns)
        }
        SourceKind::Directory => parse_directory(source, options.directory),
    }
}
