use crate::submission_outcome::SubmissionOutcome;
use log::{debug, info};
use std::path::Path;
use std::process::Command;

/// Something that accepts job scripts for execution.
pub trait Scheduler {
    /// Submits `script` (relative to `workdir`) to `partition`.
    fn submit(&mut self, script: &Path, partition: &str, workdir: &Path) -> SubmissionOutcome;
}

/// Submits through the `sbatch` command line.
pub struct Sbatch {
    program: String,
}

impl Sbatch {
    pub fn new() -> Sbatch {
        Sbatch {
            program: String::from("sbatch"),
        }
    }

    pub fn with_program(program: String) -> Sbatch {
        Sbatch { program }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for Sbatch {
    fn default() -> Self {
        Sbatch::new()
    }
}

/// Extracts the job number from `Submitted batch job <id>`.
pub fn parse_job_id(stdout: &str) -> Option<u64> {
    stdout.split_whitespace().last()?.parse().ok()
}

impl Scheduler for Sbatch {
    fn submit(&mut self, script: &Path, partition: &str, workdir: &Path) -> SubmissionOutcome {
        debug!(
            "running {} --partition {} {} in {}",
            self.program,
            partition,
            script.display(),
            workdir.display()
        );
        match Command::new(&self.program)
            .arg("--partition")
            .arg(partition)
            .arg(script)
            .current_dir(workdir)
            .output()
        {
            Ok(output) if output.status.success() => {
                let out = String::from_utf8_lossy(&output.stdout);
                SubmissionOutcome::Submitted {
                    job_id: parse_job_id(&out),
                }
            }
            Ok(output) => SubmissionOutcome::Rejected {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            },
            Err(bad) => SubmissionOutcome::SchedulerUnavailable(bad.to_string()),
        }
    }
}

/// Leaves scripts on disk without submitting them.
#[derive(Default)]
pub struct DryRun;

impl Scheduler for DryRun {
    fn submit(&mut self, script: &Path, partition: &str, _workdir: &Path) -> SubmissionOutcome {
        info!(
            "dry run: would submit {} to partition {}",
            script.display(),
            partition
        );
        SubmissionOutcome::DryRun
    }
}
