#![allow(dead_code)]

pub mod fixtures;
pub mod miso_env;
