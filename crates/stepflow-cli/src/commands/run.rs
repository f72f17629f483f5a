use std::path::Path;

use anyhow::{bail, Context, Result};

/// Execute the `run` command: load the configuration, then run one job.
pub fn execute(config_path: &Path, job_id: &str, json: bool) -> Result<()> {
    let mut config = super::load(config_path)?;

    let Some(job) = config.take_job(job_id) else {
        super::jobs::print_jobs(config_path, &config);
        bail!("Job '{job_id}' is not defined in {}", config_path.display());
    };

    tracing::info!(job = job_id, steps = job.len(), "Job loaded");

    let result = job
        .run()
        .with_context(|| format!("Job '{job_id}' failed validation"))?;

    println!("Job '{}' {}.", result.job_id, result.status);
    for step in &result.steps {
        let input = step
            .records_in
            .map_or_else(|| "-".to_string(), |n| n.to_string());
        println!(
            "  {:<20} {:<20} in: {:>8}  out: {:>8}  {:.3}s{}",
            step.step_id,
            step.step_type,
            input,
            step.records_out,
            step.duration_secs,
            if step.succeeded { "" } else { "  FAILED" },
        );
    }
    if !result.skipped.is_empty() {
        println!("  Skipped:   {}", result.skipped.join(", "));
    }
    println!("  Duration:  {:.2}s", result.duration_secs);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    if let Some(failure) = &result.failure {
        bail!(
            "Job '{}' stopped at step '{}': {}",
            result.job_id,
            failure.step_id,
            failure.message
        );
    }
    Ok(())
}
