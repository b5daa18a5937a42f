//! Minimum-count filtering with an optional catch-all class.

use std::path::PathBuf;

use super::class_map::ClassLabelMap;

/// Name of the catch-all class that collects images of small classes.
pub const OTHERS_CLASS: &str = "others";

/// What the balancer removed, for reporting.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BalanceReport {
    /// Removed classes with their image counts, in map order.
    pub removed: Vec<(String, usize)>,
    /// Number of images moved into the others class (0 when discarded).
    pub merged_into_others: usize,
}

impl BalanceReport {
    pub fn removed_images(&self) -> usize {
        self.removed.iter().map(|(_, count)| count).sum()
    }
}

/// Drop classes with fewer than `min_count` images.
///
/// With `map_others`, removed images go to [`OTHERS_CLASS`] only when there
/// are strictly more than `min_count` of them; otherwise they are discarded.
/// An existing others class keeps its position, a new one is appended.
pub fn apply_min_count(
    filenames: ClassLabelMap,
    min_count: usize,
    map_others: bool,
) -> (ClassLabelMap, BalanceReport) {
    let mut report = BalanceReport::default();
    if min_count == 0 {
        return (filenames, report);
    }

    let mut others: Vec<PathBuf> = Vec::new();
    let mut filtered = ClassLabelMap::new();
    for (class_id, files) in filenames {
        if files.len() < min_count {
            report.removed.push((class_id, files.len()));
            others.extend(files);
        } else {
            filtered.insert(class_id, files);
        }
    }

    if map_others && others.len() > min_count {
        report.merged_into_others = others.len();
        filtered.extend_class(OTHERS_CLASS, others);
    }
    (filtered, report)
}
