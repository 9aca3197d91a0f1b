use crate::submission_outcome::SubmissionOutcome;
use crate::template::TemplateError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SubmitError>;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("I/O error on '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("record table error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to parse config file '{path}': {source}", path = path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown model '{0}' (expected one of M1, M2, M3, AVG, HPSUrry, HPS)")]
    UnknownModel(String),

    #[error("unknown workflow '{0}' (expected simulate or pulchra)")]
    UnknownWorkflow(String),

    #[error("unknown failure policy '{0}' (expected ignore, warn or abort)")]
    UnknownPolicy(String),

    #[error("unknown throttle scope '{0}' (expected never, same-protein or every-submission)")]
    UnknownThrottleScope(String),

    #[error("invalid memory amount '{0}'")]
    InvalidMemory(String),

    #[error("protein '{0}' is not defined in the record table")]
    UnknownProtein(String),

    #[error("no {0} configured for submission")]
    EmptyAxis(&'static str),

    #[error("submission of {job} failed: {outcome}")]
    SubmissionFailed {
        job: String,
        outcome: SubmissionOutcome,
    },
}

impl SubmitError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> SubmitError {
        SubmitError::Io {
            path: path.into(),
            source,
        }
    }
}
