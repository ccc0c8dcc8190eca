//! Conversion of a COCO subset into sharded TFRecord files.
//!
//! Images are selected by super-category with a per-category cap, their
//! boxes are normalized to the image size, and the resulting
//! `tf.train.Example` records are distributed round-robin over a fixed
//! number of shard files per partition.

pub mod common;
pub mod config;
pub mod error;
pub mod example;
pub mod pipeline;
pub mod selector;
pub mod shard;
pub mod store;
pub mod utils;

pub use pipeline::{start, PartitionReport};
