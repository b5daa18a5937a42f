use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::super::class_map::ClassLabelMap;
use super::super::error::DatasetError;

/// Column positions inside a label CSV.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvColumns {
    /// Column holding the image filename.
    #[serde(default = "default_file_column")]
    pub file: usize,
    /// Column holding the integer class index.
    #[serde(default = "default_class_column")]
    pub class: usize,
    /// Column holding the human readable class label.
    #[serde(default = "default_label_column")]
    pub label: usize,
}

fn default_file_column() -> usize {
    0
}

fn default_class_column() -> usize {
    1
}

fn default_label_column() -> usize {
    2
}

impl Default for CsvColumns {
    fn default() -> Self {
        Self {
            file: default_file_column(),
            class: default_class_column(),
            label: default_label_column(),
        }
    }
}

struct CsvRow {
    file: String,
    class_idx: usize,
    label: String,
}

/// Parse a label CSV (header row first) into a class map.
///
/// Filenames are joined onto `root`. Classes appear in class index order.
pub fn parse_csv(
    csv_path: &Path,
    root: &Path,
    columns: CsvColumns,
) -> Result<ClassLabelMap, DatasetError> {
    info!(
        "Parsing csv file {} for directory {}",
        csv_path.display(),
        root.display()
    );
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(csv_path)
        .map_err(|source| DatasetError::Csv {
            path: csv_path.to_path_buf(),
            source,
        })?;

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|source| DatasetError::Csv {
            path: csv_path.to_path_buf(),
            source,
        })?;
        // +2: one for the header, one for 1-based line numbers
        rows.push(parse_row(csv_path, &record, columns, idx + 2)?);
    }

    let Some(num_classes) = rows.iter().map(|row| row.class_idx + 1).max() else {
        return Ok(ClassLabelMap::new());
    };

    let mut filenames = ClassLabelMap::new();
    for class_idx in 0..num_classes {
        let mut members = rows.iter().filter(|row| row.class_idx == class_idx).peekable();
        let Some(first) = members.peek() else {
            return Err(DatasetError::format(
                csv_path,
                format!("class index {class_idx} has no rows (classes must be numbered 0..{num_classes})"),
            ));
        };
        let label = first.label.clone();
        if filenames.contains(&label) {
            return Err(DatasetError::format(
                csv_path,
                format!("label '{label}' is used by more than one class index"),
            ));
        }
        let paths: Vec<PathBuf> = members.map(|row| root.join(&row.file)).collect();
        info!("- {label} ({} files)", paths.len());
        filenames.insert(label, paths);
    }
    Ok(filenames)
}

fn parse_row(
    csv_path: &Path,
    record: &StringRecord,
    columns: CsvColumns,
    line: usize,
) -> Result<CsvRow, DatasetError> {
    let field = |col: usize| {
        record.get(col).ok_or_else(|| {
            DatasetError::format(
                csv_path,
                format!("line {line}: missing column {col} ({} columns present)", record.len()),
            )
        })
    };
    let raw_class = field(columns.class)?;
    let class_idx = raw_class.parse::<usize>().map_err(|_| {
        DatasetError::format(
            csv_path,
            format!("line {line}: class index '{raw_class}' is not a non-negative integer"),
        )
    })?;
    Ok(CsvRow {
        file: field(columns.file)?.to_string(),
        class_idx,
        label: field(columns.label)?.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_csv(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("labels.csv");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn groups_rows_by_class_index_order() {
        let dir = tempdir().unwrap();
        let csv = write_csv(
            dir.path(),
            "file,cls,label\nb.png,1,forams\na.png,0,diatoms\nc.png,1,forams\n",
        );
        let map = parse_csv(&csv, dir.path(), CsvColumns::default()).unwrap();
        assert_eq!(map.class_ids(), vec!["diatoms", "forams"]);
        assert_eq!(
            map.get("forams").unwrap(),
            &[dir.path().join("b.png"), dir.path().join("c.png")]
        );
    }

    #[test]
    fn label_comes_from_first_row_of_class() {
        let dir = tempdir().unwrap();
        let csv = write_csv(dir.path(), "f,c,l\na.png,0,first\nb.png,0,second\n");
        let map = parse_csv(&csv, dir.path(), CsvColumns::default()).unwrap();
        assert_eq!(map.class_ids(), vec!["first"]);
        assert_eq!(map.counts(), vec![2]);
    }

    #[test]
    fn custom_column_positions() {
        let dir = tempdir().unwrap();
        let csv = write_csv(dir.path(), "label,cls,file\nrads,0,r.png\n");
        let columns = CsvColumns {
            file: 2,
            class: 1,
            label: 0,
        };
        let map = parse_csv(&csv, dir.path(), columns).unwrap();
        assert_eq!(map.get("rads").unwrap(), &[dir.path().join("r.png")]);
    }

    #[test]
    fn gap_in_class_indices_is_rejected() {
        let dir = tempdir().unwrap();
        let csv = write_csv(dir.path(), "f,c,l\na.png,0,x\nb.png,2,y\n");
        let err = parse_csv(&csv, dir.path(), CsvColumns::default()).unwrap_err();
        assert!(matches!(err, DatasetError::ParseFormat { .. }));
    }

    #[test]
    fn non_numeric_class_index_is_rejected() {
        let dir = tempdir().unwrap();
        let csv = write_csv(dir.path(), "f,c,l\na.png,one,x\n");
        let err = parse_csv(&csv, dir.path(), CsvColumns::default()).unwrap_err();
        assert!(err.to_string().contains("not a non-negative integer"));
    }

    #[test]
    fn header_only_yields_empty_map() {
        let dir = tempdir().unwrap();
        let csv = write_csv(dir.path(), "f,c,l\n");
        let map = parse_csv(&csv, dir.path(), CsvColumns::default()).unwrap();
        assert!(map.is_empty());
    }
}
