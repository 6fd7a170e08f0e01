//! Core data types and I/O operations.

pub mod loaders;
pub mod writers;

pub use loaders::{load_samples, read_samples, LoaderError, Sample, SampleSet, SortedSamples};
pub use writers::{filter_rows, write_filtered_csv, write_object_points, FilterCounts, WriteError};
