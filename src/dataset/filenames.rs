use std::path::{Path, PathBuf};

use tracing::info;

use super::balance::apply_min_count;
use super::class_map::ClassLabelMap;
use super::error::DatasetError;
use super::sources::{SourceOptions, parse_source};
use super::split::{LabelledFilenames, SplitOptions, train_test_split};

/// A labelled image set discovered from a directory, CSV, or XML source.
///
/// `load` parses and balances the source; `split` then partitions the
/// flattened files into train and test sets. Calling `load` again discards
/// everything derived from the previous load, including partitions.
#[derive(Clone, Debug)]
pub struct FilenamesDataset {
    source: PathBuf,
    options: SourceOptions,
    cls_filenames: ClassLabelMap,
    filenames: Vec<PathBuf>,
    cls: Vec<usize>,
    cls_labels: Vec<String>,
    cls_counts: Vec<usize>,
    loaded: bool,
    partitions: Option<(LabelledFilenames, LabelledFilenames)>,
}

impl FilenamesDataset {
    pub fn new(source: impl Into<PathBuf>, options: SourceOptions) -> Self {
        Self {
            source: source.into(),
            options,
            cls_filenames: ClassLabelMap::new(),
            filenames: Vec::new(),
            cls: Vec::new(),
            cls_labels: Vec::new(),
            cls_counts: Vec::new(),
            loaded: false,
            partitions: None,
        }
    }

    /// Parse the source, then drop classes with fewer than `min_count` images.
    ///
    /// State is only replaced once every step has succeeded.
    pub fn load(&mut self, min_count: usize, map_others: bool) -> Result<(), DatasetError> {
        info!("{}", "-".repeat(60));
        info!("Parsing {}", self.source.display());
        let parsed = parse_source(&self.source, &self.options)?;
        if parsed.total_files() == 0 {
            return Err(DatasetError::Empty {
                source_path: self.source.clone(),
            });
        }
        for (class_id, files) in parsed.iter() {
            info!("- {class_id}: {} images", files.len());
        }

        let (balanced, report) = apply_min_count(parsed, min_count, map_others);
        if !report.removed.is_empty() {
            info!("Removed classes with less than {min_count} images");
            for (class_id, count) in &report.removed {
                info!("- {class_id}: {count} images");
            }
        }
        if report.merged_into_others > 0 {
            info!(
                "These images have been placed in the 'others' class, {} total",
                report.merged_into_others
            );
        }
        if balanced.is_empty() {
            return Err(DatasetError::NoClassesAfterFilter {
                source_path: self.source.clone(),
                min_count,
            });
        }

        let (filenames, cls) = balanced.flatten();
        self.cls_labels = balanced.class_ids();
        self.cls_counts = balanced.counts();
        self.filenames = filenames;
        self.cls = cls;
        self.cls_filenames = balanced;
        self.loaded = true;
        self.partitions = None;
        Ok(())
    }

    /// Partition the loaded files into train and test sets.
    pub fn split(&mut self, test_size: f64, stratify: bool, seed: u64) -> Result<(), DatasetError> {
        if !self.loaded {
            return Err(DatasetError::NotLoaded);
        }
        let options = SplitOptions {
            test_size,
            stratify,
            seed,
        };
        let (train, test) = train_test_split(&self.filenames, &self.cls, options)?;
        info!(
            "Split {} images: {} train, {} test (seed {seed})",
            self.filenames.len(),
            train.len(),
            test.len()
        );
        self.partitions = Some((train, test));
        Ok(())
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The balanced class map.
    pub fn class_filenames(&self) -> &ClassLabelMap {
        &self.cls_filenames
    }

    /// All files in class order.
    pub fn filenames(&self) -> &[PathBuf] {
        &self.filenames
    }

    /// Class index of each entry in [`filenames`](Self::filenames).
    pub fn cls(&self) -> &[usize] {
        &self.cls
    }

    pub fn cls_labels(&self) -> &[String] {
        &self.cls_labels
    }

    pub fn cls_counts(&self) -> &[usize] {
        &self.cls_counts
    }

    pub fn num_classes(&self) -> usize {
        self.cls_labels.len()
    }

    pub fn train(&self) -> Result<&LabelledFilenames, DatasetError> {
        self.partitions
            .as_ref()
            .map(|(train, _)| train)
            .ok_or(DatasetError::NotSplit)
    }

    pub fn test(&self) -> Result<&LabelledFilenames, DatasetError> {
        self.partitions
            .as_ref()
            .map(|(_, test)| test)
            .ok_or(DatasetError::NotSplit)
    }

    /// Balanced class weights: `total / (num_classes * count)`, 0 for empty classes.
    pub fn class_weights(&self) -> Vec<f64> {
        let total = self.filenames.len() as f64;
        let num_classes = self.num_classes() as f64;
        self.cls_counts
            .iter()
            .map(|&count| {
                if count == 0 {
                    0.0
                } else {
                    total / (num_classes * count as f64)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_class(root: &Path, class_id: &str, n: usize) {
        let dir = root.join(class_id);
        fs::create_dir_all(&dir).unwrap();
        for i in 0..n {
            fs::write(dir.join(format!("{i:03}.png")), b"x").unwrap();
        }
    }

    #[test]
    fn load_then_split_exposes_partitions() {
        let dir = tempdir().unwrap();
        write_class(dir.path(), "A", 15);
        write_class(dir.path(), "B", 12);
        let mut dataset = FilenamesDataset::new(dir.path(), SourceOptions::default());
        dataset.load(10, false).unwrap();
        assert_eq!(dataset.cls_labels(), ["A", "B"]);
        assert_eq!(dataset.cls_counts(), [15, 12]);
        assert_eq!(dataset.num_classes(), 2);

        dataset.split(0.2, true, 0).unwrap();
        let train = dataset.train().unwrap();
        let test = dataset.test().unwrap();
        assert_eq!(test.class_counts(2), vec![3, 2]);
        assert_eq!(train.len() + test.len(), 27);
        assert_eq!(test.cls.len(), test.filenames.len());
    }

    #[test]
    fn empty_source_is_an_error() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("A")).unwrap();
        let mut dataset = FilenamesDataset::new(dir.path(), SourceOptions::default());
        let err = dataset.load(0, false).unwrap_err();
        assert!(matches!(err, DatasetError::Empty { .. }));
        assert!(!dataset.is_loaded());
    }

    #[test]
    fn split_before_load_is_rejected() {
        let mut dataset = FilenamesDataset::new("unused", SourceOptions::default());
        assert!(matches!(dataset.split(0.2, true, 0), Err(DatasetError::NotLoaded)));
        assert!(matches!(dataset.train(), Err(DatasetError::NotSplit)));
    }

    #[test]
    fn reload_discards_previous_partitions() {
        let dir = tempdir().unwrap();
        write_class(dir.path(), "A", 10);
        let mut dataset = FilenamesDataset::new(dir.path(), SourceOptions::default());
        dataset.load(0, false).unwrap();
        dataset.split(0.2, true, 0).unwrap();
        write_class(dir.path(), "B", 4);
        dataset.load(0, false).unwrap();
        assert_eq!(dataset.num_classes(), 2);
        assert!(dataset.train().is_err());
    }

    #[test]
    fn all_classes_filtered_is_an_error() {
        let dir = tempdir().unwrap();
        write_class(dir.path(), "A", 2);
        let mut dataset = FilenamesDataset::new(dir.path(), SourceOptions::default());
        let err = dataset.load(5, true).unwrap_err();
        assert!(matches!(err, DatasetError::NoClassesAfterFilter { min_count: 5, .. }));
    }

    #[test]
    fn class_weights_are_balanced() {
        let dir = tempdir().unwrap();
        write_class(dir.path(), "A", 30);
        write_class(dir.path(), "B", 10);
        let mut dataset = FilenamesDataset::new(dir.path(), SourceOptions::default());
        dataset.load(0, false).unwrap();
        let weights = dataset.class_weights();
        assert!((weights[0] - 40.0 / 60.0).abs() < 1e-12);
        assert!((weights[1] - 2.0).abs() < 1e-12);
    }
}
