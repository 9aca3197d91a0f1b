use crate::error::SubmitError;
use crate::job::JobResources;
use crate::model::ModelVariant;
use crate::submitter::ThrottleScope;
use crate::template::{JobTemplate, TemplateError};
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const SIMULATE_TEMPLATE: &str = r#"#!/bin/bash
#SBATCH --job-name={{stem}}
#SBATCH --nodes=1
#SBATCH --partition={{partition}}
#SBATCH --ntasks-per-node=1
#SBATCH --cpus-per-task={{cpus}}
#SBATCH --ntasks=1
#SBATCH -t {{time}}
#SBATCH -o {{stem}}.out
#SBATCH -e {{stem}}.err
#SBATCH {{memory}}

source {{bashrc}}
conda activate {{conda_env}}

python ./simulate.py --name {{name}} --model {{model}}
"#;

const PULCHRA_TEMPLATE: &str = r#"#!/bin/bash
#SBATCH --job-name=PULCHRA{{model}}
#SBATCH --ntasks=1
#SBATCH --cpus-per-task={{cpus}}
#SBATCH --exclusive
#SBATCH --threads-per-core=1
#SBATCH {{memory}}
#SBATCH -t {{time}}
#SBATCH -o {{stem}}.out
#SBATCH -e {{stem}}.err
#SBATCH --partition={{partition}}

source {{bashrc}}
conda activate {{conda_env}}

echo $SCRATCH

cp *.py $SCRATCH
cp {{records}} $SCRATCH
mkdir -p $SCRATCH/{{name}}/{{model}}
cp -r {{name}}/{{model}}/run{{run}} $SCRATCH/{{name}}/{{model}}

echo $SLURM_CPUS_PER_TASK

cd $SCRATCH

start=$(date +%s.%N)

python ./pulchra.py --name {{name}} --num_cpus $SLURM_CPUS_PER_TASK --ff {{model}} --run {{run}} --pulchra {{pulchra}}

cp -r {{name}}/{{model}}/run{{run}}/* $SLURM_SUBMIT_DIR/{{name}}/{{model}}/run{{run}}

duration=$(echo "$(date +%s.%N) - $start" | bc)
execution_time=`printf "%.2f seconds" $duration`

echo $execution_time
"#;

/// The two submission scripts this tool drives: single-chain simulation and the
/// all-atom back-mapping of finished trajectories with pulchra.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Workflow {
    Simulate,
    Pulchra,
}

impl Workflow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Workflow::Simulate => "simulate",
            Workflow::Pulchra => "pulchra",
        }
    }

    pub fn template_source(&self) -> &'static str {
        match self {
            Workflow::Simulate => SIMULATE_TEMPLATE,
            Workflow::Pulchra => PULCHRA_TEMPLATE,
        }
    }

    pub fn template(&self) -> Result<JobTemplate, TemplateError> {
        JobTemplate::parse(self.as_str(), self.template_source())
    }

    pub fn default_resources(&self) -> JobResources {
        match self {
            Workflow::Simulate => JobResources::default(),
            Workflow::Pulchra => JobResources {
                cpus: 64,
                max_run_time: String::from("20:00:00"),
                ..JobResources::default()
            },
        }
    }

    pub fn default_models(&self) -> Vec<ModelVariant> {
        match self {
            Workflow::Simulate => vec![ModelVariant::M1],
            Workflow::Pulchra => vec![ModelVariant::M1, ModelVariant::M2, ModelVariant::M3],
        }
    }

    pub fn default_replicates(&self) -> Vec<u32> {
        match self {
            Workflow::Simulate => vec![1],
            Workflow::Pulchra => vec![10],
        }
    }

    pub fn default_throttle_scope(&self) -> ThrottleScope {
        match self {
            Workflow::Simulate => ThrottleScope::SameProtein,
            Workflow::Pulchra => ThrottleScope::EverySubmission,
        }
    }

    /// Stem of the script and log files for one combination.
    ///
    /// Simulation scripts are named after the protein and only grow a model or replicate
    /// suffix when the plan varies that axis; back-mapping scripts always carry both.
    pub fn script_stem(
        &self,
        name: &str,
        model: ModelVariant,
        replicate: u32,
        several_models: bool,
        several_replicates: bool,
    ) -> String {
        match self {
            Workflow::Simulate => {
                let mut stem = name.to_string();
                if several_models {
                    stem += format!("_{}", model).as_str();
                }
                if several_replicates {
                    stem += format!("_run{}", replicate).as_str();
                }
                stem
            }
            Workflow::Pulchra => format!("p_{}_{}_{}", name, model, replicate),
        }
    }
}

impl Display for Workflow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Workflow {
    type Err = SubmitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulate" => Ok(Workflow::Simulate),
            "pulchra" => Ok(Workflow::Pulchra),
            _ => Err(SubmitError::UnknownWorkflow(s.to_string())),
        }
    }
}

impl TryFrom<String> for Workflow {
    type Error = SubmitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
