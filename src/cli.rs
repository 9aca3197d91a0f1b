use clap::{Args, Parser, Subcommand};
use idp_submit::config::{AppConfig, FileConfig, Overrides};
use idp_submit::error::Result;
use idp_submit::model::ModelVariant;
use idp_submit::submitter::FailurePolicy;
use idp_submit::workflow::Workflow;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Render and submit SLURM jobs for coarse-grained IDP simulations."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the record table, then render and submit one script per job.
    Submit(SubmitArgs),
    /// Write the protein record table only.
    Records(RecordsArgs),
    /// Print the scripts a submission would write, without touching the disk or the scheduler.
    Render(RenderArgs),
}

/// Options shared by every subcommand. They override the configuration file.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// TOML configuration file
    #[arg(short, long, env = "IDP_SUBMIT_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// simulate or pulchra
    #[arg(short, long, value_name = "NAME")]
    pub workflow: Option<Workflow>,

    /// Directory receiving scripts, working directories and the record file
    #[arg(long, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Name of the record file inside the base directory
    #[arg(long, value_name = "FILE")]
    pub records_file: Option<String>,

    /// Job template replacing the workflow's built-in one
    #[arg(long, value_name = "PATH")]
    pub template: Option<PathBuf>,

    /// Protein to submit; repeat for several
    #[arg(short = 'p', long = "protein", value_name = "NAME")]
    pub proteins: Vec<String>,

    /// Model variant (M1, M2, M3, AVG, HPSUrry, HPS); repeat for several
    #[arg(short = 'm', long = "model", value_name = "MODEL")]
    pub models: Vec<ModelVariant>,

    /// Replicate index; repeat for several
    #[arg(short = 'r', long = "replicate", value_name = "N")]
    pub replicates: Vec<u32>,

    /// SLURM partition
    #[arg(long, value_name = "NAME")]
    pub partition: Option<String>,
}

impl ConfigArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            workflow: self.workflow,
            base_dir: self.base_dir.clone(),
            records_file: self.records_file.clone(),
            template: self.template.clone(),
            proteins: self.proteins.clone(),
            models: self.models.clone(),
            replicates: self.replicates.clone(),
            partition: self.partition.clone(),
            ..Overrides::default()
        }
    }

    pub fn resolve(&self, overrides: Overrides) -> Result<AppConfig> {
        let file = match &self.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        AppConfig::resolve(file, overrides)
    }
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Seconds to wait between throttled submissions
    #[arg(long, value_name = "SECS")]
    pub delay: Option<f64>,

    /// What a failed submission does to the batch: warn, ignore or abort
    #[arg(long, value_name = "POLICY")]
    pub failure_policy: Option<FailurePolicy>,

    /// Submission command
    #[arg(long, env = "IDP_SUBMIT_SBATCH", default_value = "sbatch", value_name = "PROGRAM")]
    pub sbatch: String,

    /// Write scripts and records but do not call the scheduler
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct RecordsArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Write the table here instead of the configured record file
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}
