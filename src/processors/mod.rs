//! Classification stages: statistics, threshold search, partition and the
//! end-to-end pipeline.

pub mod filtering;
pub mod pipeline;
pub mod statistics;
pub mod threshold;

// Re-export key types for convenience
pub use filtering::{partition, Partition, RemovedIds};
pub use pipeline::{analyze, classify, run, Classification, PipelineError, PipelineSummary};
pub use statistics::{
    mean, sample_std_dev, skewness, skewness_up_to, Moments, StatsError, UndefinedReason,
};
pub use threshold::{find_minimal_skewness_index, SearchOutcome, SearchStep};
