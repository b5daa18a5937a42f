//! Writes prepared partitions to disk for an external training backend.
//!
//! Layout of the export directory:
//! - `manifest.json`: class vocabulary, counts, split parameters
//! - `samples.jsonl`: one record per image with its class and partition

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use super::error::DatasetError;
use super::filenames::FilenamesDataset;
use super::split::LabelledFilenames;

/// Manifest format written by [`write_split_manifest`].
pub const MANIFEST_FORMAT_VERSION: i64 = 1;
pub const MANIFEST_FILE_NAME: &str = "manifest.json";
pub const SAMPLES_FILE_NAME: &str = "samples.jsonl";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Split parameters recorded in the manifest.
#[derive(Clone, Debug, Default)]
pub struct ExportOptions {
    pub val_split: f64,
    pub random_seed: u64,
    /// Per-class weights to record, when the trainer should use them.
    pub class_weights: Option<Vec<f64>>,
}

/// Files written and how many samples each partition holds.
#[derive(Clone, Debug)]
pub struct ExportSummary {
    pub manifest_path: PathBuf,
    pub samples_path: PathBuf,
    pub train_len: usize,
    pub test_len: usize,
}

#[derive(Serialize)]
struct Manifest<'a> {
    format_version: i64,
    source: &'a Path,
    classes: &'a [String],
    class_counts: &'a [usize],
    num_classes: usize,
    val_split: f64,
    random_seed: u64,
    train_len: usize,
    test_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    class_weights: Option<&'a [f64]>,
    files: ManifestFiles<'a>,
}

#[derive(Serialize)]
struct ManifestFiles<'a> {
    samples: &'a str,
}

#[derive(Serialize)]
struct SampleRecord<'a> {
    path: &'a Path,
    class_idx: usize,
    class_id: &'a str,
    split: &'a str,
}

/// Write `manifest.json` and `samples.jsonl` for a split dataset into `out_dir`.
pub fn write_split_manifest(
    dataset: &FilenamesDataset,
    out_dir: &Path,
    options: &ExportOptions,
) -> Result<ExportSummary, ExportError> {
    let train = dataset.train()?;
    let test = dataset.test()?;
    fs::create_dir_all(out_dir).map_err(|source| ExportError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let samples_path = out_dir.join(SAMPLES_FILE_NAME);
    write_samples(&samples_path, dataset.cls_labels(), &[("train", train), ("test", test)])?;

    let manifest = Manifest {
        format_version: MANIFEST_FORMAT_VERSION,
        source: dataset.source(),
        classes: dataset.cls_labels(),
        class_counts: dataset.cls_counts(),
        num_classes: dataset.num_classes(),
        val_split: options.val_split,
        random_seed: options.random_seed,
        train_len: train.len(),
        test_len: test.len(),
        class_weights: options.class_weights.as_deref(),
        files: ManifestFiles {
            samples: SAMPLES_FILE_NAME,
        },
    };
    let manifest_path = out_dir.join(MANIFEST_FILE_NAME);
    let json = serde_json::to_string_pretty(&manifest).map_err(|source| ExportError::Json {
        path: manifest_path.clone(),
        source,
    })?;
    fs::write(&manifest_path, json).map_err(|source| ExportError::Io {
        path: manifest_path.clone(),
        source,
    })?;

    Ok(ExportSummary {
        manifest_path,
        samples_path,
        train_len: train.len(),
        test_len: test.len(),
    })
}

fn write_samples(
    path: &Path,
    classes: &[String],
    partitions: &[(&str, &LabelledFilenames)],
) -> Result<(), ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    for &(split, partition) in partitions {
        for (file, class_idx) in partition.iter() {
            let record = SampleRecord {
                path: file,
                class_idx,
                class_id: classes.get(class_idx).map(String::as_str).unwrap_or_default(),
                split,
            };
            serde_json::to_writer(&mut writer, &record).map_err(|source| ExportError::Json {
                path: path.to_path_buf(),
                source,
            })?;
            writer.write_all(b"\n").map_err(io_err)?;
        }
    }
    writer.flush().map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::sources::SourceOptions;
    use tempfile::tempdir;

    fn split_dataset(root: &Path) -> FilenamesDataset {
        for (class_id, n) in [("diatom", 10), ("foram", 5)] {
            let dir = root.join(class_id);
            fs::create_dir_all(&dir).unwrap();
            for i in 0..n {
                fs::write(dir.join(format!("{i}.png")), b"x").unwrap();
            }
        }
        let mut dataset = FilenamesDataset::new(root, SourceOptions::default());
        dataset.load(0, false).unwrap();
        dataset.split(0.2, true, 1).unwrap();
        dataset
    }

    #[test]
    fn writes_manifest_and_one_record_per_sample() {
        let data = tempdir().unwrap();
        let out = tempdir().unwrap();
        let dataset = split_dataset(data.path());
        let options = ExportOptions {
            val_split: 0.2,
            random_seed: 1,
            class_weights: Some(dataset.class_weights()),
        };
        let summary = write_split_manifest(&dataset, out.path(), &options).unwrap();
        assert_eq!(summary.train_len, 12);
        assert_eq!(summary.test_len, 3);

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&summary.manifest_path).unwrap()).unwrap();
        assert_eq!(manifest["format_version"], 1);
        assert_eq!(manifest["classes"], serde_json::json!(["diatom", "foram"]));
        assert_eq!(manifest["class_counts"], serde_json::json!([10, 5]));
        assert_eq!(manifest["class_weights"].as_array().unwrap().len(), 2);

        let samples = fs::read_to_string(&summary.samples_path).unwrap();
        let records: Vec<serde_json::Value> = samples
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 15);
        assert!(records[..12].iter().all(|r| r["split"] == "train"));
        assert!(records[12..].iter().all(|r| r["split"] == "test"));
        let first_test = &records[12];
        let idx = first_test["class_idx"].as_u64().unwrap() as usize;
        assert_eq!(first_test["class_id"], ["diatom", "foram"][idx]);
    }

    #[test]
    fn unsplit_dataset_cannot_be_exported() {
        let out = tempdir().unwrap();
        let dataset = FilenamesDataset::new("unused", SourceOptions::default());
        let err = write_split_manifest(&dataset, out.path(), &ExportOptions::default()).unwrap_err();
        assert!(matches!(err, ExportError::Dataset(DatasetError::NotSplit)));
        assert_eq!(err.to_string(), DatasetError::NotSplit.to_string());
    }
}
