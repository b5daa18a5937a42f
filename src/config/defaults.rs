use std::path::PathBuf;

use crate::run_lock::DEFAULT_LOCK_FILE;

pub(super) fn default_true() -> bool {
    true
}

pub(super) fn default_false() -> bool {
    false
}

pub(super) fn default_min_count() -> usize {
    10
}

pub(super) fn default_val_split() -> f64 {
    0.2
}

pub(super) fn default_skip_prefix() -> char {
    '~'
}

pub(super) fn default_cnn_kind() -> String {
    "base_cyclic".to_string()
}

pub(super) fn default_img_shape() -> Option<[usize; 3]> {
    Some([128, 128, 1])
}

pub(super) fn default_filters() -> usize {
    4
}

pub(super) fn default_activation() -> String {
    "relu".to_string()
}

pub(super) fn default_batch_size() -> usize {
    64
}

pub(super) fn default_max_epochs() -> usize {
    10_000
}

pub(super) fn default_alr_epochs() -> usize {
    10
}

pub(super) fn default_alr_drops() -> usize {
    4
}

pub(super) fn default_rotation() -> Option<Vec<f64>> {
    Some(vec![0.0, 360.0])
}

pub(super) fn default_gain() -> Option<Vec<f64>> {
    Some(vec![0.8, 1.0, 1.2])
}

pub(super) fn default_gamma() -> Option<Vec<f64>> {
    Some(vec![0.5, 1.0, 2.0])
}

pub(super) fn default_zoom() -> Option<Vec<f64>> {
    Some(vec![0.9, 1.0, 1.1])
}

pub(super) fn default_orig_img_shape() -> [usize; 3] {
    [256, 256, 3]
}

pub(super) fn default_save_dir() -> PathBuf {
    PathBuf::from("output")
}

pub(super) fn default_lock_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOCK_FILE)
}

pub(super) fn default_retry_seconds() -> u64 {
    10
}
