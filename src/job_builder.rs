use crate::job::{JobResources, JobSpec};
use crate::memory_size::MemoryRequest;
use crate::model::ModelVariant;

pub struct JobSpecBuilder {
    protein_name: String,
    model: ModelVariant,
    replicate: u32,
    resources: JobResources,
    script_stem: Option<String>,
}

impl JobSpecBuilder {
    pub fn new(protein_name: String, model: ModelVariant) -> JobSpecBuilder {
        JobSpecBuilder {
            protein_name,
            model,
            replicate: 1,
            resources: JobResources::default(),
            script_stem: None,
        }
    }

    pub fn set_replicate(mut self, replicate: u32) -> JobSpecBuilder {
        self.replicate = replicate;
        self
    }

    pub fn set_resources(mut self, resources: JobResources) -> JobSpecBuilder {
        self.resources = resources;
        self
    }

    pub fn set_cpus(mut self, cpus: usize) -> JobSpecBuilder {
        self.resources.cpus = cpus;
        self
    }

    pub fn set_memory(mut self, memory: MemoryRequest) -> JobSpecBuilder {
        self.resources.memory = memory;
        self
    }

    pub fn set_max_run_time(mut self, max_run_time: String) -> JobSpecBuilder {
        self.resources.max_run_time = max_run_time;
        self
    }

    pub fn set_partition(mut self, partition: String) -> JobSpecBuilder {
        self.resources.partition = partition;
        self
    }

    /// File stem of the script and its logs; defaults to the protein name.
    pub fn set_script_stem(mut self, stem: String) -> JobSpecBuilder {
        self.script_stem = Some(stem);
        self
    }

    pub fn build(&self) -> JobSpec {
        JobSpec {
            protein_name: self.protein_name.clone(),
            model: self.model,
            replicate: self.replicate,
            resources: self.resources.clone(),
            script_stem: self
                .script_stem
                .clone()
                .unwrap_or_else(|| self.protein_name.clone()),
        }
    }
}
