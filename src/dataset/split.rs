//! Seeded train/test partitioning of flattened class maps.

use std::collections::BTreeMap;
use std::path::PathBuf;

use rand::seq::{SliceRandom, index};
use rand::{SeedableRng, rngs::StdRng};

use super::error::DatasetError;

/// Filenames with their class indices, index aligned.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelledFilenames {
    pub filenames: Vec<PathBuf>,
    pub cls: Vec<usize>,
}

impl LabelledFilenames {
    pub fn len(&self) -> usize {
        self.filenames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, usize)> {
        self.filenames.iter().zip(self.cls.iter().copied())
    }

    /// Per-class sample counts for `num_classes` classes.
    pub fn class_counts(&self, num_classes: usize) -> Vec<usize> {
        let mut counts = vec![0usize; num_classes];
        for &class_idx in &self.cls {
            if let Some(slot) = counts.get_mut(class_idx) {
                *slot += 1;
            }
        }
        counts
    }

    fn from_indices(indices: &[usize], filenames: &[PathBuf], cls: &[usize]) -> Self {
        Self {
            filenames: indices.iter().map(|&i| filenames[i].clone()).collect(),
            cls: indices.iter().map(|&i| cls[i]).collect(),
        }
    }
}

/// Parameters of a train/test split.
#[derive(Clone, Copy, Debug)]
pub struct SplitOptions {
    /// Fraction of samples placed in the test partition, in `[0, 1)`.
    pub test_size: f64,
    /// Split each class independently so class proportions are preserved.
    pub stratify: bool,
    pub seed: u64,
}

/// Split parallel filename/class vectors into `(train, test)`.
///
/// Stratified: for each class in index order, `round(n * test_size)` members
/// are drawn without replacement as test samples. Both partitions are then
/// shuffled. One seeded generator drives every draw, so equal inputs and
/// seeds give equal partitions.
pub fn train_test_split(
    filenames: &[PathBuf],
    cls: &[usize],
    options: SplitOptions,
) -> Result<(LabelledFilenames, LabelledFilenames), DatasetError> {
    let test_size = options.test_size;
    if !test_size.is_finite() || !(0.0..1.0).contains(&test_size) {
        return Err(DatasetError::InvalidSplit(test_size));
    }
    if filenames.len() != cls.len() {
        return Err(DatasetError::LengthMismatch {
            filenames: filenames.len(),
            cls: cls.len(),
        });
    }

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    if options.stratify {
        for members in group_by_class(cls) {
            let take = test_count(members.len(), test_size);
            let mut is_test = vec![false; members.len()];
            for pos in index::sample(&mut rng, members.len(), take).into_iter() {
                is_test[pos] = true;
            }
            for (pos, sample) in members.into_iter().enumerate() {
                if is_test[pos] {
                    test.push(sample);
                } else {
                    train.push(sample);
                }
            }
        }
    } else {
        let mut all: Vec<usize> = (0..cls.len()).collect();
        all.shuffle(&mut rng);
        let take = test_count(all.len(), test_size);
        train = all.split_off(take);
        test = all;
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok((
        LabelledFilenames::from_indices(&train, filenames, cls),
        LabelledFilenames::from_indices(&test, filenames, cls),
    ))
}

fn test_count(n: usize, test_size: f64) -> usize {
    ((n as f64 * test_size).round() as usize).min(n)
}

/// Sample indices per present class, classes ascending, input order within a class.
fn group_by_class(cls: &[usize]) -> impl Iterator<Item = Vec<usize>> {
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (sample, &class_idx) in cls.iter().enumerate() {
        groups.entry(class_idx).or_default().push(sample);
    }
    groups.into_values()
}
