use crate::config::AppConfig;
use crate::error::{Result, SubmitError};
use crate::protein_table::ProteinTable;
use crate::scheduler::Scheduler;
use crate::submitter::{SubmissionReport, Submitter};
use crate::template::JobTemplate;
use log::{debug, info};
use std::fs;
use std::path::PathBuf;

/// Built-in records overlaid with the proteins declared in the configuration.
pub fn build_table(config: &AppConfig) -> ProteinTable {
    let mut table = ProteinTable::builtin();
    table.extend(config.extra_proteins.iter().cloned());
    table
}

/// The configured template file, or the workflow's built-in template.
pub fn load_template(config: &AppConfig) -> Result<JobTemplate> {
    match &config.template {
        Some(path) => {
            let source = fs::read_to_string(path).map_err(|e| SubmitError::io(path, e))?;
            info!("using job template {}", path.display());
            Ok(JobTemplate::parse(path.display().to_string(), &source)?)
        }
        None => Ok(config.workflow.template()?),
    }
}

/// Writes the record table into the base directory and returns its path.
pub fn write_records(config: &AppConfig, table: &ProteinTable) -> Result<PathBuf> {
    fs::create_dir_all(&config.base_dir).map_err(|e| SubmitError::io(&config.base_dir, e))?;
    let path = config.records_path();
    table.write_csv(&path)?;
    Ok(path)
}

/// Runs one complete batch: validation, template, records, then the submission loop.
///
/// Configuration and template problems surface before anything is written to disk.
pub fn run<S: Scheduler>(config: &AppConfig, scheduler: S) -> Result<SubmissionReport> {
    let table = build_table(config);
    config.plan.validate(&table)?;
    let template = load_template(config)?;
    // every job fills the same keys, so the first one stands for the batch
    if let Some(job) = config.plan.jobs(config.workflow, &config.resources).first() {
        template.check(&job.parameters(&config.context))?;
    }
    let records = write_records(config, &table)?;
    debug!("record table written to {}", records.display());

    let mut submitter = Submitter::new(
        scheduler,
        config.base_dir.clone(),
        config.workflow,
        template,
        config.context.clone(),
    )
    .set_resources(config.resources.clone())
    .set_throttle(config.throttle.clone())
    .set_failure_policy(config.failure_policy);
    submitter.run(&config.plan)
}
