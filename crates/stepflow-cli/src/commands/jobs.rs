use std::path::Path;

use anyhow::Result;
use stepflow_engine::IntegrationConfig;

/// Execute the `jobs` command: list job ids and descriptions.
pub fn execute(config_path: &Path) -> Result<()> {
    let config = super::load(config_path)?;
    print_jobs(config_path, &config);
    Ok(())
}

pub(crate) fn print_jobs(config_path: &Path, config: &IntegrationConfig) {
    println!("Jobs defined in {}:", config_path.display());
    let mut any = false;
    for job in config.jobs() {
        any = true;
        match job.description() {
            Some(description) => println!("  {:<24} {}", job.id(), description),
            None => println!("  {}", job.id()),
        }
    }
    if !any {
        println!("  (none)");
    }
}
