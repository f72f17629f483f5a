pub mod jobs;
pub mod run;
pub mod steps;

use std::path::Path;

use anyhow::{Context, Result};
use stepflow_engine::{load_file, IntegrationConfig, StepRegistry};

/// Load the configuration with the built-in step types.
pub(crate) fn load(config_path: &Path) -> Result<IntegrationConfig> {
    load_file(config_path, StepRegistry::new(), &[])
        .with_context(|| format!("Failed to load configuration: {}", config_path.display()))
}
