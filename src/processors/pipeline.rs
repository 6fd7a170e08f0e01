//! End-to-end ground filtering.
//!
//! load → sort → threshold search → partition → filter pass. The input file is
//! read twice: once to collect samples, once more (re-opened from the start)
//! to copy the surviving rows.

use std::path::Path;

use log::info;
use thiserror::Error;

use super::filtering::{partition, RemovedIds};
use super::statistics::StatsError;
use super::threshold::{find_minimal_skewness_index, SearchOutcome};
use crate::config::{ConfigError, PipelineConfig};
use crate::core::loaders::{load_samples, LoaderError, SortedSamples};
use crate::core::writers::{write_filtered_csv, write_object_points, FilterCounts, WriteError};

/// Errors from any pipeline stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to load samples: {0}")]
    Load(#[from] LoaderError),

    #[error("threshold search failed: {0}")]
    Stats(#[from] StatsError),

    #[error("failed to write output: {0}")]
    Write(#[from] WriteError),

    /// The filter pass saw a different number of data rows than the load pass.
    #[error("filter pass read {filtered} data rows but {loaded} were loaded")]
    RowCountMismatch { loaded: usize, filtered: usize },
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Classification of a sample file, before anything is written.
#[derive(Debug, Clone)]
pub struct Classification {
    pub samples: SortedSamples,
    pub search: SearchOutcome,
    pub removed: RemovedIds,
    /// Elevation of the lowest object point.
    pub split_elevation: Option<f64>,
}

impl Classification {
    /// Number of data rows loaded.
    #[inline]
    pub fn total_rows(&self) -> usize {
        self.samples.len()
    }

    /// Number of samples classified as ground.
    #[inline]
    pub fn ground_count(&self) -> usize {
        self.search.bound_index.min(self.samples.len())
    }

    /// Number of samples classified as object points.
    #[inline]
    pub fn object_count(&self) -> usize {
        self.samples.len() - self.ground_count()
    }
}

/// Outcome of a full run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSummary {
    pub total_rows: usize,
    pub bound_index: usize,
    pub initial_skewness: f64,
    pub final_skewness: f64,
    pub iterations: usize,
    pub split_elevation: Option<f64>,
    /// Row counts from the filter pass; `None` for a dry run.
    pub filtered: Option<FilterCounts>,
}

impl PipelineSummary {
    fn new(classification: &Classification, filtered: Option<FilterCounts>) -> Self {
        Self {
            total_rows: classification.total_rows(),
            bound_index: classification.search.bound_index,
            initial_skewness: classification.search.initial_skewness,
            final_skewness: classification.search.final_skewness,
            iterations: classification.search.iterations(),
            split_elevation: classification.split_elevation,
            filtered,
        }
    }
}

/// Load, sort and search `input`, without writing anything.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded or the search hits an
/// undefined statistic.
pub fn classify<P: AsRef<Path>>(input: P, tolerance: f64) -> Result<Classification> {
    let input = input.as_ref();

    let set = load_samples(input)?;
    info!("Loaded {} data points from {}", set.len(), input.display());

    let samples = set.into_sorted();
    debug_assert!(samples.is_sorted());

    let search = find_minimal_skewness_index(samples.elevations(), tolerance)?;

    let split = partition(&samples, search.bound_index);
    let removed = RemovedIds::from_samples(split.objects);
    let split_elevation = split.split_elevation();
    info!("Points to remove from data: {}", split.objects.len());

    Ok(Classification {
        samples,
        search,
        removed,
        split_elevation,
    })
}

/// Checks that the filter pass saw every loaded row exactly once.
fn ensure_rows_match(loaded: usize, counts: FilterCounts) -> Result<()> {
    if counts.total() != loaded {
        return Err(PipelineError::RowCountMismatch {
            loaded,
            filtered: counts.total(),
        });
    }
    Ok(())
}

/// Classify the configured input without writing any output.
pub fn analyze(config: &PipelineConfig) -> Result<PipelineSummary> {
    config.validate()?;
    let classification = classify(&config.io.input, config.search.tolerance)?;
    Ok(PipelineSummary::new(&classification, None))
}

/// Run the whole pipeline described by `config`.
///
/// Writes the ground rows to `config.io.output` and, when configured, the
/// object points to `config.io.objects_output`.
///
/// # Errors
///
/// Any stage failure aborts the run, as does a filter pass whose row count
/// differs from the load pass. The output file may be missing or incomplete
/// afterwards.
pub fn run(config: &PipelineConfig) -> Result<PipelineSummary> {
    config.validate()?;

    let classification = classify(&config.io.input, config.search.tolerance)?;

    let counts = write_filtered_csv(&config.io.input, &config.io.output, &classification.removed)?;
    ensure_rows_match(classification.total_rows(), counts)?;
    info!(
        "Wrote {} rows to {} ({} removed)",
        counts.kept,
        config.io.output.display(),
        counts.removed
    );

    if let Some(objects_path) = &config.io.objects_output {
        let split = partition(&classification.samples, classification.search.bound_index);
        write_object_points(objects_path, split.objects)?;
        info!(
            "Wrote {} object points to {}",
            split.objects.len(),
            objects_path.display()
        );
    }

    Ok(PipelineSummary::new(&classification, Some(counts)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    const OUTLIER_INPUT: &str =
        "id,x,y,z\n1,0.0,0.0,10.0\n2,0.0,0.0,11.0\n3,0.0,0.0,12.0\n4,0.0,0.0,13.0\n5,0.0,0.0,90.0\n";

    fn write_input(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    /// Ground terrain around 100 m with a canopy layer on top.
    fn terrain_input() -> String {
        let mut content = String::from("id,x,y,z,intensity\n");
        for i in 0..400u32 {
            let ground = 100.0 + ((i * 37) % 23) as f64 * 0.05 - ((i * 11) % 17) as f64 * 0.05;
            let z = if i % 5 == 0 {
                ground + 8.0 + ((i * 13) % 29) as f64 * 0.5
            } else {
                ground
            };
            content.push_str(&format!("{},{},{},{:.3},{}\n", 1000 + i, i % 20, i / 20, z, i % 7));
        }
        content
    }

    fn ids(content: &str) -> Vec<i64> {
        content
            .lines()
            .skip(1)
            .map(|l| l.split(',').next().unwrap().parse().unwrap())
            .collect()
    }

    #[test]
    fn test_outlier_fixture_end_to_end() {
        let dir = tempdir().unwrap();
        let input = write_input(&dir, "points.csv", OUTLIER_INPUT);
        let output = dir.path().join("ground.csv");
        let config = PipelineConfig::new(&input, &output);

        let summary = run(&config).unwrap();

        // Search stops at index 2 ({10, 11, 12} has zero skewness); the
        // bound is the first object point.
        assert_eq!(summary.total_rows, 5);
        assert_eq!(summary.bound_index, 2);
        assert_eq!(summary.final_skewness, 0.0);
        assert_eq!(summary.split_elevation, Some(12.0));
        assert_eq!(summary.filtered, Some(FilterCounts { kept: 2, removed: 3 }));

        let content = fs::read_to_string(&output).unwrap();
        assert_eq!(content, "id,x,y,z\n1,0.0,0.0,10.0\n2,0.0,0.0,11.0\n");
    }

    #[test]
    fn test_outlier_is_always_removed() {
        let dir = tempdir().unwrap();
        let input = write_input(&dir, "points.csv", OUTLIER_INPUT);
        let output = dir.path().join("ground.csv");

        run(&PipelineConfig::new(&input, &output)).unwrap();
        assert!(!ids(&fs::read_to_string(&output).unwrap()).contains(&5));
    }

    #[test]
    fn test_row_preservation() {
        let dir = tempdir().unwrap();
        let content = terrain_input();
        let input = write_input(&dir, "terrain.csv", &content);
        let output = dir.path().join("ground.csv");

        let summary = run(&PipelineConfig::new(&input, &output)).unwrap();
        let counts = summary.filtered.unwrap();

        let input_ids = ids(&content);
        let output_content = fs::read_to_string(&output).unwrap();
        let output_ids = ids(&output_content);

        assert_eq!(counts.total(), input_ids.len());
        assert_eq!(output_ids.len(), counts.kept);
        assert_eq!(output_ids.len() + (summary.total_rows - summary.bound_index), input_ids.len());

        let unique: HashSet<i64> = output_ids.iter().copied().collect();
        assert_eq!(unique.len(), output_ids.len());

        // Kept rows are a subsequence of the input, in input order
        let mut input_iter = input_ids.iter();
        for id in &output_ids {
            assert!(input_iter.any(|i| i == id), "id {} out of order or unknown", id);
        }

        // Every kept line is an exact copy of an input line
        let input_lines: HashSet<&str> = content.lines().collect();
        assert!(output_content.lines().all(|l| input_lines.contains(l)));
        assert_eq!(output_content.lines().next(), Some("id,x,y,z,intensity"));
    }

    #[test]
    fn test_removes_high_points_first() {
        let dir = tempdir().unwrap();
        let input = write_input(&dir, "terrain.csv", &terrain_input());
        let output = dir.path().join("ground.csv");

        let summary = run(&PipelineConfig::new(&input, &output)).unwrap();
        let split = summary.split_elevation.unwrap();

        let set = load_samples(&output).unwrap();
        assert!(set.samples().iter().all(|s| s.elevation <= split));
    }

    #[test]
    fn test_deterministic_output() {
        let dir = tempdir().unwrap();
        let input = write_input(&dir, "terrain.csv", &terrain_input());
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");

        run(&PipelineConfig::new(&input, &first)).unwrap();
        run(&PipelineConfig::new(&input, &second)).unwrap();

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn test_refiltering_removes_little() {
        let dir = tempdir().unwrap();
        let input = write_input(&dir, "terrain.csv", &terrain_input());
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");

        let pass1 = run(&PipelineConfig::new(&input, &first).with_tolerance(0.05)).unwrap();
        let pass2 = run(&PipelineConfig::new(&first, &second).with_tolerance(0.05)).unwrap();

        let removed1 = pass1.filtered.unwrap().removed;
        let removed2 = pass2.filtered.unwrap().removed;
        assert!(removed1 > 0);
        assert!(
            removed2 <= removed1,
            "second pass removed {} rows, first removed {}",
            removed2,
            removed1
        );
    }

    #[test]
    fn test_objects_output() {
        let dir = tempdir().unwrap();
        let input = write_input(&dir, "points.csv", OUTLIER_INPUT);
        let output = dir.path().join("ground.csv");
        let objects = dir.path().join("objects.csv");

        let mut config = PipelineConfig::new(&input, &output);
        config.io.objects_output = Some(objects.clone());
        run(&config).unwrap();

        let content = fs::read_to_string(&objects).unwrap();
        assert_eq!(content, "id,elevation\n3,12\n4,13\n5,90\n");
    }

    #[test]
    fn test_analyze_writes_nothing() {
        let dir = tempdir().unwrap();
        let input = write_input(&dir, "points.csv", OUTLIER_INPUT);
        let output = dir.path().join("ground.csv");

        let summary = analyze(&PipelineConfig::new(&input, &output)).unwrap();
        assert_eq!(summary.bound_index, 2);
        assert_eq!(summary.filtered, None);
        assert!(!output.exists());
    }

    #[test]
    fn test_classify_counts() {
        let dir = tempdir().unwrap();
        let input = write_input(&dir, "points.csv", OUTLIER_INPUT);

        let classification = classify(&input, 0.0).unwrap();
        assert_eq!(classification.total_rows(), 5);
        assert_eq!(classification.ground_count(), 2);
        assert_eq!(classification.object_count(), 3);
        assert_eq!(classification.removed.iter().collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[test]
    fn test_empty_input_is_reported() {
        let dir = tempdir().unwrap();
        let input = write_input(&dir, "empty.csv", "id,x,y,z\n");
        let output = dir.path().join("ground.csv");

        let err = run(&PipelineConfig::new(&input, &output)).unwrap_err();
        assert!(matches!(err, PipelineError::Load(LoaderError::EmptyInput(_))));
        assert!(!output.exists());
    }

    #[test]
    fn test_malformed_row_aborts() {
        let dir = tempdir().unwrap();
        let input = write_input(&dir, "bad.csv", "id,x,y,z\n1,0,0,1.0\n2,0,0,2.0\n3,0,0\n");
        let output = dir.path().join("ground.csv");

        let err = run(&PipelineConfig::new(&input, &output)).unwrap_err();
        assert!(err.to_string().contains("line 4"), "unexpected message: {}", err);
        match err {
            PipelineError::Load(LoaderError::MalformedRow { line, .. }) => assert_eq!(line, 4),
            other => panic!("Expected MalformedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_single_sample_is_undefined() {
        let dir = tempdir().unwrap();
        let input = write_input(&dir, "one.csv", "id,x,y,z\n1,0,0,5.0\n");
        let output = dir.path().join("ground.csv");

        let err = run(&PipelineConfig::new(&input, &output)).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Stats(StatsError::UndefinedStatistic { .. })
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = tempdir().unwrap();
        let input = write_input(&dir, "points.csv", OUTLIER_INPUT);

        let err = run(&PipelineConfig::new(&input, &input)).unwrap_err();
        assert!(matches!(err, PipelineError::Config(ConfigError::SamePath(_))));
        assert_eq!(fs::read_to_string(&input).unwrap(), OUTLIER_INPUT);
    }

    #[test]
    fn test_cr_line_endings_end_to_end() {
        let dir = tempdir().unwrap();
        let input = write_input(&dir, "points.csv", &OUTLIER_INPUT.replace('\n', "\r"));
        let output = dir.path().join("ground.csv");

        let summary = run(&PipelineConfig::new(&input, &output)).unwrap();

        assert_eq!(summary.total_rows, 5);
        assert_eq!(summary.filtered, Some(FilterCounts { kept: 2, removed: 3 }));
        let content = fs::read_to_string(&output).unwrap();
        assert_eq!(content, "id,x,y,z\r1,0.0,0.0,10.0\r2,0.0,0.0,11.0\r");
    }

    #[test]
    fn test_row_count_mismatch() {
        assert!(ensure_rows_match(5, FilterCounts { kept: 2, removed: 3 }).is_ok());

        let err = ensure_rows_match(5, FilterCounts { kept: 0, removed: 0 }).unwrap_err();
        match err {
            PipelineError::RowCountMismatch { loaded, filtered } => {
                assert_eq!(loaded, 5);
                assert_eq!(filtered, 0);
            }
            other => panic!("Expected RowCountMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_aliased_output_leaves_input_intact() {
        let dir = tempdir().unwrap();
        let input = write_input(&dir, "points.csv", OUTLIER_INPUT);
        fs::create_dir(dir.path().join("sub")).unwrap();
        let alias = dir.path().join("sub").join("..").join("points.csv");

        let err = run(&PipelineConfig::new(&input, &alias)).unwrap_err();
        assert!(matches!(err, PipelineError::Config(ConfigError::SamePath(_))));
        assert_eq!(fs::read_to_string(&input).unwrap(), OUTLIER_INPUT);
    }
}
