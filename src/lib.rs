//! Ground/object classification of elevation samples by skewness balancing.
//!
//! This crate provides tools for:
//! - Loading `(id, elevation)` samples from delimited point files
//! - Searching the elevation-sorted samples for the split whose lower part
//!   has skewness closest to zero
//! - Writing the ground rows back out, untouched and in source order
//!
//! # Example
//!
//! ```no_run
//! use skewness_balance::{processors::pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::new("points.csv", "ground.csv");
//! let summary = pipeline::run(&config).unwrap();
//! println!("split at index {}", summary.bound_index);
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;

pub use config::{IoConfig, PipelineConfig, SearchConfig};
pub use core::loaders::{Sample, SortedSamples};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
