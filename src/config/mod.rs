//! Configuration types for the skewness balancing pipeline.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading, saving or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("tolerance must be a finite, non-negative number (got {0})")]
    InvalidTolerance(f64),

    #[error("'{0}' names the same file as another configured path")]
    SamePath(PathBuf),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Input and output locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoConfig {
    /// Delimited file holding the raw samples (header + data rows)
    #[serde(default = "default_input")]
    pub input: PathBuf,

    /// File receiving the ground rows. Overwritten if it exists.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Optional CSV listing the removed object points (id, elevation)
    #[serde(default)]
    pub objects_output: Option<PathBuf>,
}

fn default_input() -> PathBuf {
    PathBuf::from("DC.csv")
}

fn default_output() -> PathBuf {
    PathBuf::from("output.csv")
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output: default_output(),
            objects_output: None,
        }
    }
}

/// Threshold search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Acceptable distance from zero skewness. 0 runs the search until the
    /// step size bottoms out.
    #[serde(default)]
    pub tolerance: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { tolerance: 0.0 }
    }
}

impl SearchConfig {
    /// Rejects a negative or non-finite tolerance.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance(self.tolerance));
        }
        Ok(())
    }
}

/// True if both paths name the same file, either literally or after
/// resolving `..` and symlinks. Paths that don't exist yet compare literally.
fn same_location(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub io: IoConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

impl PipelineConfig {
    /// Builds a config for the given paths with the default search settings.
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(input: P, output: Q) -> Self {
        Self {
            io: IoConfig {
                input: input.into(),
                output: output.into(),
                objects_output: None,
            },
            search: SearchConfig::default(),
        }
    }

    /// Sets the search tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.search.tolerance = tolerance;
        self
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Checks the settings the pipeline relies on.
    ///
    /// The filter pass streams the input while writing the output, so input,
    /// output and objects output must all name different files.
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;

        let io = &self.io;
        if same_location(&io.input, &io.output) {
            return Err(ConfigError::SamePath(io.output.clone()));
        }
        if let Some(objects) = &io.objects_output {
            if same_location(objects, &io.input) || same_location(objects, &io.output) {
                return Err(ConfigError::SamePath(objects.clone()));
            }
        }

        Ok(())
    }
}
