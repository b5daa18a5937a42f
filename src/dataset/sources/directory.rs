use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::super::class_map::ClassLabelMap;
use super::super::error::DatasetError;

/// Image extensions in the order their files are concatenated per class.
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "tif", "tiff", "bmp"];

/// Class name used when the files are not arranged in class subdirectories.
pub const UNLABELLED_CLASS: &str = "null";

/// Subdirectory prefixes that are always skipped.
const ALWAYS_SKIPPED: [char; 2] = ['_', '.'];

/// Options for scanning a class-per-subdirectory layout.
#[derive(Clone, Copy, Debug)]
pub struct DirectoryOptions {
    /// Subdirectories starting with this character are skipped.
    pub skip_prefix: char,
    /// When false the root itself is scanned as a single `"null"` class.
    pub has_classes: bool,
}

impl Default for DirectoryOptions {
    fn default() -> Self {
        Self {
            skip_prefix: '~',
            has_classes: true,
        }
    }
}

/// Parse `root/<class>/<image>` into a class map.
pub fn parse_directory(
    root: &Path,
    options: DirectoryOptions,
) -> Result<ClassLabelMap, DatasetError> {
    let mut filenames = ClassLabelMap::new();
    if !options.has_classes {
        filenames.insert(UNLABELLED_CLASS, collect_images(root)?);
        return Ok(filenames);
    }
    for (class_id, dir) in class_dirs(root, options.skip_prefix)? {
        let files = collect_images(&dir)?;
        debug!("Class {class_id}: {} files", files.len());
        filenames.insert(class_id, files);
    }
    Ok(filenames)
}

fn class_dirs(root: &Path, skip_prefix: char) -> Result<Vec<(String, PathBuf)>, DatasetError> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(root).map_err(|err| DatasetError::io(root, err))? {
        let entry = entry.map_err(|err| DatasetError::io(root, err))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with(skip_prefix) || name.starts_with(ALWAYS_SKIPPED) {
            continue;
        }
        dirs.push((name, path));
    }
    dirs.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(dirs)
}

/// Collect the images of one directory, grouped by extension in declared order.
fn collect_images(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir).map_err(|err| DatasetError::io(dir, err))? {
        let entry = entry.map_err(|err| DatasetError::io(dir, err))?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden || !path.is_file() {
            continue;
        }
        candidates.push(path);
    }

    let mut files = Vec::with_capacity(candidates.len());
    for ext in IMAGE_EXTENSIONS {
        if cfg!(target_os = "linux") {
            files.extend(sorted_with_extension(&candidates, |e| e == ext));
            let upper = ext.to_ascii_uppercase();
            files.extend(sorted_with_extension(&candidates, |e| e == upper));
        } else {
            files.extend(sorted_with_extension(&candidates, |e| {
                e.eq_ignore_ascii_case(ext)
            }));
        }
    }
    Ok(files)
}

fn sorted_with_extension(candidates: &[PathBuf], matches: impl Fn(&str) -> bool) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = candidates
        .iter()
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(&matches)
        })
        .cloned()
        .collect();
    out.sort();
    out
}
