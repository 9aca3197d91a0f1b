use crate::error::{Result, SubmitError};
use crate::job::{JobResources, ScriptContext};
use crate::memory_size::{Memory, MemoryRequest};
use crate::model::ModelVariant;
use crate::protein::ProteinRecord;
use crate::protein_table::{DEFAULT_IONIC_STRENGTH, DEFAULT_PH, DEFAULT_TEMPERATURE};
use crate::submitter::{FailurePolicy, SubmissionPlan, Throttle, ThrottleScope};
use crate::workflow::Workflow;
use log::debug;
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

const DEFAULT_PROTEIN: &str = "NEWSEQ";
const DEFAULT_RECORDS_FILE: &str = "proteins.csv";

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileThrottleConfig {
    pub delay_secs: Option<f64>,
    pub scope: Option<ThrottleScope>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileResourcesConfig {
    pub cpus: Option<usize>,
    pub memory: Option<Memory>,
    pub memory_per_cpu: Option<bool>,
    pub time: Option<String>,
    pub partition: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileEnvironmentConfig {
    pub bashrc: Option<String>,
    pub conda_env: Option<String>,
    pub pulchra: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileProtein {
    pub name: String,
    pub fasta: String,
    pub temperature: Option<f64>,
    pub ph: Option<f64>,
    pub ionic_strength: Option<f64>,
}

impl From<FileProtein> for ProteinRecord {
    fn from(p: FileProtein) -> Self {
        ProteinRecord::new(
            p.name,
            &p.fasta,
            p.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            p.ph.unwrap_or(DEFAULT_PH),
            p.ionic_strength.unwrap_or(DEFAULT_IONIC_STRENGTH),
        )
    }
}

/// Contents of the TOML configuration file; every key is optional.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub workflow: Option<Workflow>,
    pub base_dir: Option<PathBuf>,
    pub records_file: Option<String>,
    pub template: Option<PathBuf>,
    pub proteins: Option<Vec<String>>,
    pub models: Option<Vec<ModelVariant>>,
    pub replicates: Option<Vec<u32>>,
    pub failure_policy: Option<FailurePolicy>,
    pub throttle: Option<FileThrottleConfig>,
    pub resources: Option<FileResourcesConfig>,
    pub environment: Option<FileEnvironmentConfig>,
    #[serde(rename = "protein", default)]
    pub extra_proteins: Vec<FileProtein>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<FileConfig> {
        let content = fs::read_to_string(path).map_err(|e| SubmitError::io(path, e))?;
        let config = FileConfig::from_toml(&content).map_err(|source| SubmitError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> std::result::Result<FileConfig, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Values given on the command line or through the environment. They win over the file.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Overrides {
    pub workflow: Option<Workflow>,
    pub base_dir: Option<PathBuf>,
    pub records_file: Option<String>,
    pub template: Option<PathBuf>,
    pub proteins: Vec<String>,
    pub models: Vec<ModelVariant>,
    pub replicates: Vec<u32>,
    pub partition: Option<String>,
    pub delay_secs: Option<f64>,
    pub failure_policy: Option<FailurePolicy>,
}

/// Fully resolved settings for one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub workflow: Workflow,
    pub base_dir: PathBuf,
    pub records_file: String,
    pub template: Option<PathBuf>,
    pub plan: SubmissionPlan,
    pub resources: JobResources,
    pub context: ScriptContext,
    pub throttle: Throttle,
    pub failure_policy: FailurePolicy,
    pub extra_proteins: Vec<ProteinRecord>,
}

fn non_empty<T>(values: Vec<T>) -> Option<Vec<T>> {
    if values.is_empty() { None } else { Some(values) }
}

/// The record file is staged by name from the submit directory, so it must sit directly in it.
fn check_records_file(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Ok(()),
        _ => Err(SubmitError::Config(format!(
            "records file must be a plain file name inside the base directory, got '{}'",
            name
        ))),
    }
}

fn delay_from_secs(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| SubmitError::Config(format!("invalid throttle delay: {} seconds", secs)))
}

impl AppConfig {
    /// Merges command-line overrides, file values and workflow defaults, in that order.
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<AppConfig> {
        let workflow = overrides
            .workflow
            .or(file.workflow)
            .unwrap_or(Workflow::Simulate);

        let proteins = non_empty(overrides.proteins)
            .or(file.proteins)
            .unwrap_or_else(|| vec![DEFAULT_PROTEIN.to_string()]);
        let models = non_empty(overrides.models)
            .or(file.models)
            .unwrap_or_else(|| workflow.default_models());
        let replicates = non_empty(overrides.replicates)
            .or(file.replicates)
            .unwrap_or_else(|| workflow.default_replicates());

        let defaults = workflow.default_resources();
        let resources_file = file.resources.unwrap_or_default();
        let memory = match (resources_file.memory, resources_file.memory_per_cpu) {
            (None, None) => defaults.memory,
            (memory, per_cpu) => {
                let amount = memory.unwrap_or(Memory::MegaByte(2000));
                if per_cpu.unwrap_or(true) {
                    MemoryRequest::PerCpu(amount)
                } else {
                    MemoryRequest::PerNode(amount)
                }
            }
        };
        let resources = JobResources {
            cpus: resources_file.cpus.unwrap_or(defaults.cpus),
            memory,
            max_run_time: resources_file.time.unwrap_or(defaults.max_run_time),
            partition: overrides
                .partition
                .or(resources_file.partition)
                .unwrap_or(defaults.partition),
        };

        let records_file = overrides
            .records_file
            .or(file.records_file)
            .unwrap_or_else(|| DEFAULT_RECORDS_FILE.to_string());
        check_records_file(&records_file)?;
        let environment = file.environment.unwrap_or_default();
        let context_defaults = ScriptContext::default();
        let context = ScriptContext {
            bashrc: environment.bashrc.unwrap_or(context_defaults.bashrc),
            conda_env: environment.conda_env.unwrap_or(context_defaults.conda_env),
            pulchra: environment.pulchra.unwrap_or(context_defaults.pulchra),
            records_file: records_file.clone(),
        };

        let throttle_file = file.throttle.unwrap_or_default();
        let delay = match overrides.delay_secs.or(throttle_file.delay_secs) {
            Some(secs) => delay_from_secs(secs)?,
            None => Throttle::DEFAULT_DELAY,
        };
        let throttle = Throttle::new(
            delay,
            throttle_file
                .scope
                .unwrap_or_else(|| workflow.default_throttle_scope()),
        );

        Ok(AppConfig {
            workflow,
            base_dir: overrides
                .base_dir
                .or(file.base_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            records_file,
            template: overrides.template.or(file.template),
            plan: SubmissionPlan::new(proteins, models, replicates),
            resources,
            context,
            throttle,
            failure_policy: overrides
                .failure_policy
                .or(file.failure_policy)
                .unwrap_or(FailurePolicy::Warn),
            extra_proteins: file
                .extra_proteins
                .into_iter()
                .map(ProteinRecord::from)
                .collect(),
        })
    }

    pub fn records_path(&self) -> PathBuf {
        self.base_dir.join(&self.records_file)
    }
}
