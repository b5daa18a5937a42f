//! Ordered class name -> filenames association.

use std::collections::HashMap;
use std::path::PathBuf;

/// Ordered mapping from class name to the image files of that class.
///
/// Iteration follows insertion order, which is the order the label source
/// discovered the classes in. Class indices handed to the trainer are
/// positions in this order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassLabelMap {
    entries: Vec<(String, Vec<PathBuf>)>,
    index: HashMap<String, usize>,
}

impl ClassLabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a class, replacing the files of an existing class in place.
    pub fn insert(&mut self, class_id: impl Into<String>, files: Vec<PathBuf>) {
        let class_id = class_id.into();
        match self.index.get(&class_id) {
            Some(&pos) => self.entries[pos].1 = files,
            None => {
                self.index.insert(class_id.clone(), self.entries.len());
                self.entries.push((class_id, files));
            }
        }
    }

    /// Append files to a class, creating it at the end if missing.
    pub fn extend_class(&mut self, class_id: &str, files: impl IntoIterator<Item = PathBuf>) {
        match self.index.get(class_id) {
            Some(&pos) => self.entries[pos].1.extend(files),
            None => self.insert(class_id, files.into_iter().collect()),
        }
    }

    pub fn get(&self, class_id: &str) -> Option<&[PathBuf]> {
        self.index
            .get(class_id)
            .map(|&pos| self.entries[pos].1.as_slice())
    }

    pub fn contains(&self, class_id: &str) -> bool {
        self.index.contains_key(class_id)
    }

    /// Position of a class in discovery order.
    pub fn position(&self, class_id: &str) -> Option<usize> {
        self.index.get(class_id).copied()
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of files across all classes.
    pub fn total_files(&self) -> usize {
        self.entries.iter().map(|(_, files)| files.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.entries
            .iter()
            .map(|(name, files)| (name.as_str(), files.as_slice()))
    }

    pub fn class_ids(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn counts(&self) -> Vec<usize> {
        self.entries.iter().map(|(_, files)| files.len()).collect()
    }

    /// Flatten into parallel filename / class index vectors.
    pub fn flatten(&self) -> (Vec<PathBuf>, Vec<usize>) {
        let total = self.total_files();
        let mut filenames = Vec::with_capacity(total);
        let mut cls = Vec::with_capacity(total);
        for (class_idx, (_, files)) in self.entries.iter().enumerate() {
            filenames.extend(files.iter().cloned());
            cls.extend(std::iter::repeat_n(class_idx, files.len()));
        }
        (filenames, cls)
    }
}

impl IntoIterator for ClassLabelMap {
    type Item = (String, Vec<PathBuf>);
    type IntoIter = std::vec::IntoIter<(String, Vec<PathBuf>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, Vec<PathBuf>)> for ClassLabelMap {
    fn from_iter<I: IntoIterator<Item = (String, Vec<PathBuf>)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (class_id, files) in iter {
            map.insert(class_id, files);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn keeps_insertion_order_not_alphabetical() {
        let mut map = ClassLabelMap::new();
        map.insert("zeta", paths(&["z1"]));
        map.insert("alpha", paths(&["a1", "a2"]));
        assert_eq!(map.class_ids(), vec!["zeta", "alpha"]);
        assert_eq!(map.counts(), vec![1, 2]);
    }

    #[test]
    fn reinsert_replaces_in_place() {
        let mut map = ClassLabelMap::new();
        map.insert("a", paths(&["1"]));
        map.insert("b", paths(&["2"]));
        map.insert("a", paths(&["3", "4"]));
        assert_eq!(map.class_ids(), vec!["a", "b"]);
        assert_eq!(map.get("a").unwrap(), paths(&["3", "4"]).as_slice());
    }

    #[test]
    fn flatten_assigns_positional_indices() {
        let mut map = ClassLabelMap::new();
        map.insert("b", paths(&["b1", "b2"]));
        map.insert("a", paths(&["a1"]));
        let (filenames, cls) = map.flatten();
        assert_eq!(filenames, paths(&["b1", "b2", "a1"]));
        assert_eq!(cls, vec![0, 0, 1]);
    }
}
