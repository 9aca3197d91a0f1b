use std::fmt::{Display, Formatter};

/// What happened when a script was handed to the scheduler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The scheduler accepted the script. The id is absent if its reply could not be parsed.
    Submitted { job_id: Option<u64> },
    /// The submit command ran and exited unsuccessfully.
    Rejected { code: Option<i32>, stderr: String },
    /// The submit command could not be started.
    SchedulerUnavailable(String),
    /// The script was written but not submitted.
    DryRun,
}

impl SubmissionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SubmissionOutcome::Rejected { .. } | SubmissionOutcome::SchedulerUnavailable(_)
        )
    }
}

impl Display for SubmissionOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionOutcome::Submitted { job_id: Some(id) } => {
                write!(f, "submitted as job {}", id)
            }
            SubmissionOutcome::Submitted { job_id: None } => f.write_str("submitted"),
            SubmissionOutcome::Rejected { code, stderr } => {
                match code {
                    Some(code) => write!(f, "rejected with exit code {}", code)?,
                    None => f.write_str("rejected (terminated by signal)")?,
                }
                if !stderr.is_empty() {
                    write!(f, ": {}", stderr)?;
                }
                Ok(())
            }
            SubmissionOutcome::SchedulerUnavailable(reason) => {
                write!(f, "scheduler unavailable: {}", reason)
            }
            SubmissionOutcome::DryRun => f.write_str("not submitted (dry run)"),
        }
    }
}
