use crate::memory_size::{Memory, MemoryRequest};
use crate::model::ModelVariant;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// Resource request copied verbatim into the `#SBATCH` directives.
#[derive(Clone, Debug, PartialEq)]
pub struct JobResources {
    pub cpus: usize,
    pub memory: MemoryRequest,
    pub max_run_time: String, // HH:MM:SS or D-HH:MM:SS
    pub partition: String,
}

impl Default for JobResources {
    fn default() -> Self {
        JobResources {
            cpus: 1,
            memory: MemoryRequest::PerCpu(Memory::MegaByte(2000)),
            max_run_time: String::from("16:00:00"),
            partition: String::from("sbinlab"),
        }
    }
}

/// Values shared by every script of a batch: environment activation, tool paths and the
/// record file staged next to the scripts.
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptContext {
    pub bashrc: String,
    pub conda_env: String,
    pub pulchra: String,
    pub records_file: String,
}

impl Default for ScriptContext {
    fn default() -> Self {
        ScriptContext {
            bashrc: String::from("/groups/sbinlab/giulio/.bashrc"),
            conda_env: String::from("hoomd"),
            pulchra: String::from("/groups/sbinlab/giulio/pulchra_306/pulchra"),
            records_file: String::from("proteins.csv"),
        }
    }
}

/// One (protein, model, replicate) submission.
#[derive(Clone, Debug, PartialEq)]
pub struct JobSpec {
    pub(crate) protein_name: String,
    pub(crate) model: ModelVariant,
    pub(crate) replicate: u32,
    pub(crate) resources: JobResources,
    pub(crate) script_stem: String,
}

impl Display for JobSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/run{}",
            self.protein_name, self.model, self.replicate
        )
    }
}

impl JobSpec {
    pub fn protein_name(&self) -> &str {
        &self.protein_name
    }

    pub fn model(&self) -> ModelVariant {
        self.model
    }

    pub fn replicate(&self) -> u32 {
        self.replicate
    }

    pub fn resources(&self) -> &JobResources {
        &self.resources
    }

    pub fn script_stem(&self) -> &str {
        &self.script_stem
    }

    pub fn script_name(&self) -> String {
        format!("{}.sh", self.script_stem)
    }

    /// Template parameters for this job.
    pub fn parameters(&self, context: &ScriptContext) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert("name".to_string(), self.protein_name.clone());
        params.insert("model".to_string(), self.model.to_string());
        params.insert("run".to_string(), self.replicate.to_string());
        params.insert("stem".to_string(), self.script_stem.clone());
        params.insert("cpus".to_string(), self.resources.cpus.to_string());
        params.insert("memory".to_string(), self.resources.memory.directive());
        params.insert("time".to_string(), self.resources.max_run_time.clone());
        params.insert("partition".to_string(), self.resources.partition.clone());
        params.insert("bashrc".to_string(), context.bashrc.clone());
        params.insert("conda_env".to_string(), context.conda_env.clone());
        params.insert("pulchra".to_string(), context.pulchra.clone());
        params.insert("records".to_string(), context.records_file.clone());
        params
    }
}
