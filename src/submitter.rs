use crate::error::{Result, SubmitError};
use crate::job::{JobResources, JobSpec, ScriptContext};
use crate::job_builder::JobSpecBuilder;
use crate::model::ModelVariant;
use crate::protein_table::ProteinTable;
use crate::scheduler::Scheduler;
use crate::submission_outcome::SubmissionOutcome;
use crate::template::JobTemplate;
use crate::workflow::Workflow;
use chrono::{DateTime, Local, TimeDelta};
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::thread;
use std::time::Duration;
use uuid::Uuid;

/// How a failed submission affects the rest of the batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum FailurePolicy {
    /// Fire and forget: failures are only visible at debug level.
    Ignore,
    /// Log a warning and keep submitting.
    Warn,
    /// Stop at the first failure.
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = SubmitError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(FailurePolicy::Ignore),
            "warn" => Ok(FailurePolicy::Warn),
            "abort" => Ok(FailurePolicy::Abort),
            _ => Err(SubmitError::UnknownPolicy(s.to_string())),
        }
    }
}

impl TryFrom<String> for FailurePolicy {
    type Error = SubmitError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Which consecutive submissions are separated by the throttle delay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum ThrottleScope {
    Never,
    SameProtein,
    EverySubmission,
}

impl FromStr for ThrottleScope {
    type Err = SubmitError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "never" => Ok(ThrottleScope::Never),
            "same-protein" => Ok(ThrottleScope::SameProtein),
            "every-submission" => Ok(ThrottleScope::EverySubmission),
            _ => Err(SubmitError::UnknownThrottleScope(s.to_string())),
        }
    }
}

impl TryFrom<String> for ThrottleScope {
    type Error = SubmitError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Throttle {
    pub delay: Duration,
    pub scope: ThrottleScope,
}

impl Throttle {
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

    pub fn new(delay: Duration, scope: ThrottleScope) -> Throttle {
        Throttle { delay, scope }
    }

    pub fn should_pause(&self, previous: &JobSpec, next: &JobSpec) -> bool {
        if self.delay.is_zero() {
            return false;
        }
        match self.scope {
            ThrottleScope::Never => false,
            ThrottleScope::SameProtein => previous.protein_name() == next.protein_name(),
            ThrottleScope::EverySubmission => true,
        }
    }
}

fn dedup<T: PartialEq>(items: Vec<T>) -> Vec<T> {
    let mut ret: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !ret.contains(&item) {
            ret.push(item);
        }
    }
    ret
}

/// The explicit protein × model × replicate axes of one batch.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmissionPlan {
    proteins: Vec<String>,
    models: Vec<ModelVariant>,
    replicates: Vec<u32>,
}

impl SubmissionPlan {
    /// Repeated entries on an axis are dropped, keeping the first occurrence.
    pub fn new(
        proteins: Vec<String>,
        models: Vec<ModelVariant>,
        replicates: Vec<u32>,
    ) -> SubmissionPlan {
        SubmissionPlan {
            proteins: dedup(proteins),
            models: dedup(models),
            replicates: dedup(replicates),
        }
    }

    pub fn proteins(&self) -> &[String] {
        &self.proteins
    }

    pub fn models(&self) -> &[ModelVariant] {
        &self.models
    }

    pub fn replicates(&self) -> &[u32] {
        &self.replicates
    }

    pub fn len(&self) -> usize {
        self.proteins.len() * self.models.len() * self.replicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validate(&self, table: &ProteinTable) -> Result<()> {
        if self.proteins.is_empty() {
            return Err(SubmitError::EmptyAxis("proteins"));
        }
        if self.models.is_empty() {
            return Err(SubmitError::EmptyAxis("models"));
        }
        if self.replicates.is_empty() {
            return Err(SubmitError::EmptyAxis("replicates"));
        }
        match self.proteins.iter().find(|name| !table.contains(name)) {
            Some(unknown) => Err(SubmitError::UnknownProtein(unknown.clone())),
            None => Ok(()),
        }
    }

    /// All combinations in protein, model, replicate order.
    pub fn jobs(&self, workflow: Workflow, resources: &JobResources) -> Vec<JobSpec> {
        let several_models = self.models.len() > 1;
        let several_replicates = self.replicates.len() > 1;
        let mut jobs = Vec::with_capacity(self.len());
        for name in &self.proteins {
            for model in &self.models {
                for replicate in &self.replicates {
                    let stem = workflow.script_stem(
                        name,
                        *model,
                        *replicate,
                        several_models,
                        several_replicates,
                    );
                    jobs.push(
                        JobSpecBuilder::new(name.clone(), *model)
                            .set_replicate(*replicate)
                            .set_resources(resources.clone())
                            .set_script_stem(stem)
                            .build(),
                    );
                }
            }
        }
        jobs
    }
}

#[derive(Clone, Debug)]
pub struct SubmissionRecord {
    pub job: JobSpec,
    pub script: PathBuf,
    pub outcome: SubmissionOutcome,
}

#[derive(Clone, Debug)]
pub struct SubmissionReport {
    pub batch_id: Uuid,
    pub started: DateTime<Local>,
    pub finished: DateTime<Local>,
    pub records: Vec<SubmissionRecord>,
    pub pauses: usize,
}

impl SubmissionReport {
    pub fn submitted(&self) -> usize {
        self.records
            .iter()
            .filter(|record| matches!(record.outcome, SubmissionOutcome::Submitted { .. }))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SubmissionRecord> {
        self.records.iter().filter(|record| record.outcome.is_failure())
    }

    pub fn elapsed(&self) -> TimeDelta {
        self.finished - self.started
    }
}

/// Writes one script per job and hands it to the scheduler, one job at a time.
pub struct Submitter<S: Scheduler> {
    scheduler: S,
    base_dir: PathBuf,
    workflow: Workflow,
    template: JobTemplate,
    context: ScriptContext,
    resources: JobResources,
    throttle: Throttle,
    failure_policy: FailurePolicy,
}

impl<S: Scheduler> Submitter<S> {
    pub fn new(
        scheduler: S,
        base_dir: PathBuf,
        workflow: Workflow,
        template: JobTemplate,
        context: ScriptContext,
    ) -> Submitter<S> {
        Submitter {
            scheduler,
            base_dir,
            workflow,
            template,
            context,
            resources: workflow.default_resources(),
            throttle: Throttle::new(Throttle::DEFAULT_DELAY, workflow.default_throttle_scope()),
            failure_policy: FailurePolicy::Warn,
        }
    }

    pub fn set_resources(mut self, resources: JobResources) -> Submitter<S> {
        self.resources = resources;
        self
    }

    pub fn set_throttle(mut self, throttle: Throttle) -> Submitter<S> {
        self.throttle = throttle;
        self
    }

    pub fn set_failure_policy(mut self, policy: FailurePolicy) -> Submitter<S> {
        self.failure_policy = policy;
        self
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Creates `<base_dir>/<protein>` unless it already exists.
    pub fn ensure_working_directory(&self, protein: &str) -> Result<PathBuf> {
        let dir = self.base_dir.join(protein);
        if !dir.is_dir() {
            fs::create_dir_all(&dir).map_err(|e| SubmitError::io(&dir, e))?;
            debug!("created working directory {}", dir.display());
        }
        Ok(dir)
    }

    pub fn render(&self, job: &JobSpec) -> Result<String> {
        Ok(self.template.render(&job.parameters(&self.context))?)
    }

    /// Renders the script for `job` and writes it, replacing any script of the same name.
    pub fn write_script(&self, job: &JobSpec) -> Result<PathBuf> {
        let script = self.render(job)?;
        let path = self.base_dir.join(job.script_name());
        fs::write(&path, script).map_err(|e| SubmitError::io(&path, e))?;
        Ok(path)
    }

    fn check_outcome(&self, job: &JobSpec, outcome: &SubmissionOutcome) -> Result<()> {
        match outcome {
            SubmissionOutcome::Submitted { job_id: Some(id) } => {
                info!("submitted {} as job {}", job, id)
            }
            SubmissionOutcome::Submitted { job_id: None } => {
                warn!("submitted {} but could not read the job id", job)
            }
            SubmissionOutcome::DryRun => debug!("skipped submission of {}", job),
            failed => match self.failure_policy {
                FailurePolicy::Ignore => {
                    debug!("ignoring failed submission of {}: {}", job, failed)
                }
                FailurePolicy::Warn => warn!("submission of {} failed: {}", job, failed),
                FailurePolicy::Abort => {
                    error!("submission of {} failed, aborting: {}", job, failed);
                    return Err(SubmitError::SubmissionFailed {
                        job: job.to_string(),
                        outcome: failed.clone(),
                    });
                }
            },
        }
        Ok(())
    }

    pub fn run(&mut self, plan: &SubmissionPlan) -> Result<SubmissionReport> {
        let batch_id = Uuid::new_v4();
        let started = Local::now();
        let jobs = plan.jobs(self.workflow, &self.resources);
        info!(
            "batch {}: {} {} jobs ({} proteins x {} models x {} replicates)",
            batch_id,
            jobs.len(),
            self.workflow,
            plan.proteins().len(),
            plan.models().len(),
            plan.replicates().len()
        );

        let mut records: Vec<SubmissionRecord> = Vec::with_capacity(jobs.len());
        let mut pauses = 0;
        for job in jobs {
            if let Some(previous) = records.last() {
                if self.throttle.should_pause(&previous.job, &job) {
                    debug!("waiting {:?} before submitting {}", self.throttle.delay, job);
                    thread::sleep(self.throttle.delay);
                    pauses += 1;
                }
            }
            self.ensure_working_directory(job.protein_name())?;
            let script = self.write_script(&job)?;
            let outcome = self.scheduler.submit(
                Path::new(&job.script_name()),
                &job.resources().partition,
                &self.base_dir,
            );
            self.check_outcome(&job, &outcome)?;
            records.push(SubmissionRecord {
                job,
                script,
                outcome,
            });
        }

        let report = SubmissionReport {
            batch_id,
            started,
            finished: Local::now(),
            records,
            pauses,
        };
        info!(
            "batch {}: {} of {} jobs submitted, {} failed, took {} seconds",
            batch_id,
            report.submitted(),
            report.records.len(),
            report.failures().count(),
            report.elapsed().as_seconds_f32()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protein::ProteinRecord;
    use std::collections::HashSet;
    use tempfile::tempdir;

    /// Records every call and answers from a fixed script of outcomes.
    #[derive(Default)]
    struct FakeScheduler {
        calls: Vec<(PathBuf, String)>,
        outcomes: Vec<SubmissionOutcome>,
    }

    impl Scheduler for FakeScheduler {
        fn submit(&mut self, script: &Path, partition: &str, _workdir: &Path) -> SubmissionOutcome {
            self.calls.push((script.to_path_buf(), partition.to_string()));
            if self.outcomes.is_empty() {
                SubmissionOutcome::Submitted {
                    job_id: Some(self.calls.len() as u64),
                }
            } else {
                self.outcomes.remove(0)
            }
        }
    }

    fn rejected() -> SubmissionOutcome {
        SubmissionOutcome::Rejected {
            code: Some(1),
            stderr: String::from("sbatch: error: Batch job submission failed"),
        }
    }

    fn submitter(
        base: &Path,
        workflow: Workflow,
        scheduler: FakeScheduler,
    ) -> Submitter<FakeScheduler> {
        Submitter::new(
            scheduler,
            base.to_path_buf(),
            workflow,
            workflow.template().unwrap(),
            ScriptContext::default(),
        )
        .set_throttle(Throttle::new(Duration::ZERO, ThrottleScope::EverySubmission))
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bad_setting_names_say_which_setting() {
        let scope = "sometimes".parse::<ThrottleScope>().unwrap_err();
        assert!(matches!(scope, SubmitError::UnknownThrottleScope(ref s) if s == "sometimes"));
        assert!(scope.to_string().contains("throttle scope"));
        assert_eq!(
            "Same-Protein".parse::<ThrottleScope>().unwrap(),
            ThrottleScope::SameProtein
        );

        let policy = "retry".parse::<FailurePolicy>().unwrap_err();
        assert!(matches!(policy, SubmitError::UnknownPolicy(_)));
        assert!(policy.to_string().contains("failure policy"));
    }

    #[test]
    fn plan_drops_duplicates() {
        let plan = SubmissionPlan::new(
            names(&["A1", "A1", "FUS"]),
            vec![ModelVariant::M1, ModelVariant::M1],
            vec![1, 2, 1],
        );
        assert_eq!(plan.proteins(), ["A1", "FUS"]);
        assert_eq!(plan.models(), [ModelVariant::M1]);
        assert_eq!(plan.replicates(), [1, 2]);
        assert_eq!(plan.len(), 4);
    }

    #[test]
    fn plan_validation_rejects_unknown_and_empty_axes() {
        let table = ProteinTable::builtin();
        let unknown = SubmissionPlan::new(names(&["A1", "TDP43"]), vec![ModelVariant::M1], vec![1]);
        assert!(matches!(
            unknown.validate(&table),
            Err(SubmitError::UnknownProtein(ref name)) if name == "TDP43"
        ));
        let empty = SubmissionPlan::new(names(&["A1"]), vec![], vec![1]);
        assert!(matches!(empty.validate(&table), Err(SubmitError::EmptyAxis("models"))));
        let ok = SubmissionPlan::new(names(&["A1NLS"]), vec![ModelVariant::Hps], vec![3]);
        assert!(ok.validate(&table).is_ok());
    }

    #[test]
    fn every_combination_gets_its_own_script() {
        for workflow in [Workflow::Simulate, Workflow::Pulchra] {
            let dir = tempdir().unwrap();
            let plan = SubmissionPlan::new(
                names(&["A1", "A1NLS"]),
                vec![ModelVariant::M1, ModelVariant::M2, ModelVariant::M3],
                vec![1, 2],
            );
            let mut submitter = submitter(dir.path(), workflow, FakeScheduler::default());
            let report = submitter.run(&plan).unwrap();

            assert_eq!(report.records.len(), 12);
            let scripts: HashSet<&PathBuf> =
                report.records.iter().map(|record| &record.script).collect();
            assert_eq!(scripts.len(), 12, "{}", workflow);
            let on_disk = fs::read_dir(dir.path())
                .unwrap()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sh"))
                .count();
            assert_eq!(on_disk, 12);
            assert_eq!(submitter.scheduler().calls.len(), 12);
        }
    }

    #[test]
    fn working_directory_creation_is_idempotent() {
        let dir = tempdir().unwrap();
        let submitter = submitter(dir.path(), Workflow::Simulate, FakeScheduler::default());
        let first = submitter.ensure_working_directory("A1").unwrap();
        fs::write(first.join("keep.txt"), "x").unwrap();
        let second = submitter.ensure_working_directory("A1").unwrap();
        assert_eq!(first, second);
        assert!(second.join("keep.txt").exists());
    }

    #[test]
    fn missing_parameter_aborts_before_writing() {
        let dir = tempdir().unwrap();
        let template =
            JobTemplate::parse("custom", "#!/bin/bash\necho {{name}} {{queue}}\n").unwrap();
        let mut submitter = Submitter::new(
            FakeScheduler::default(),
            dir.path().to_path_buf(),
            Workflow::Simulate,
            template,
            ScriptContext::default(),
        );
        let plan = SubmissionPlan::new(names(&["A1"]), vec![ModelVariant::M1], vec![1]);
        let err = submitter.run(&plan).unwrap_err();
        assert!(err.to_string().contains("queue"));
        assert!(!dir.path().join("A1.sh").exists());
        assert!(submitter.scheduler().calls.is_empty());
    }

    #[test]
    fn warn_policy_records_failures_and_continues() {
        let dir = tempdir().unwrap();
        let scheduler = FakeScheduler {
            outcomes: vec![
                rejected(),
                SubmissionOutcome::SchedulerUnavailable(String::from("No such file")),
            ],
            ..FakeScheduler::default()
        };
        let plan = SubmissionPlan::new(names(&["A1"]), vec![ModelVariant::M1], vec![1, 2, 3]);
        let mut submitter = submitter(dir.path(), Workflow::Simulate, scheduler);
        let report = submitter.run(&plan).unwrap();
        assert_eq!(report.records.len(), 3);
        assert_eq!(report.failures().count(), 2);
        assert_eq!(report.submitted(), 1);
    }

    #[test]
    fn ignore_policy_still_reports_failures() {
        let dir = tempdir().unwrap();
        let scheduler = FakeScheduler {
            outcomes: vec![rejected()],
            ..FakeScheduler::default()
        };
        let plan = SubmissionPlan::new(names(&["A1", "NEWSEQ"]), vec![ModelVariant::M1], vec![1]);
        let mut submitter = submitter(dir.path(), Workflow::Simulate, scheduler)
            .set_failure_policy(FailurePolicy::Ignore);
        let report = submitter.run(&plan).unwrap();
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn abort_policy_stops_at_first_failure() {
        let dir = tempdir().unwrap();
        let scheduler = FakeScheduler {
            outcomes: vec![rejected()],
            ..FakeScheduler::default()
        };
        let plan = SubmissionPlan::new(names(&["A1", "NEWSEQ"]), vec![ModelVariant::M1], vec![1]);
        let mut submitter = submitter(dir.path(), Workflow::Simulate, scheduler)
            .set_failure_policy(FailurePolicy::Abort);
        let err = submitter.run(&plan).unwrap_err();
        assert!(matches!(
            err,
            SubmitError::SubmissionFailed { ref job, .. } if job == "A1/M1/run1"
        ));
        assert_eq!(submitter.scheduler().calls.len(), 1);
        assert!(!dir.path().join("NEWSEQ.sh").exists());
    }

    #[test]
    fn throttle_scopes() {
        let a1 = JobSpecBuilder::new(String::from("A1"), ModelVariant::M1).build();
        let a1_again = JobSpecBuilder::new(String::from("A1"), ModelVariant::M2).build();
        let fus = JobSpecBuilder::new(String::from("FUS"), ModelVariant::M1).build();
        let delay = Duration::from_millis(5);

        let same = Throttle::new(delay, ThrottleScope::SameProtein);
        assert!(same.should_pause(&a1, &a1_again));
        assert!(!same.should_pause(&a1, &fus));

        let every = Throttle::new(delay, ThrottleScope::EverySubmission);
        assert!(every.should_pause(&a1, &fus));
        assert!(!Throttle::new(delay, ThrottleScope::Never).should_pause(&a1, &a1_again));
        let disabled = Throttle::new(Duration::ZERO, ThrottleScope::EverySubmission);
        assert!(!disabled.should_pause(&a1, &fus));
    }

    #[test]
    fn pauses_are_taken_between_replicates_only() {
        let dir = tempdir().unwrap();
        let plan = SubmissionPlan::new(names(&["A1", "A1NLS"]), vec![ModelVariant::M1], vec![1, 2]);
        let mut submitter = submitter(dir.path(), Workflow::Simulate, FakeScheduler::default())
            .set_throttle(Throttle::new(Duration::from_millis(1), ThrottleScope::SameProtein));
        let report = submitter.run(&plan).unwrap();
        assert_eq!(report.pauses, 2);
    }

    #[test]
    fn scripts_are_submitted_relative_to_base_dir() {
        let dir = tempdir().unwrap();
        let mut table = ProteinTable::builtin();
        table.insert(ProteinRecord::new("FUS", "MASNDYTQQATQSYGAYPTQPGQ", 298.0, 7.0, 0.15));
        let plan = SubmissionPlan::new(names(&["FUS"]), vec![ModelVariant::M2], vec![10]);
        plan.validate(&table).unwrap();
        let mut submitter = submitter(dir.path(), Workflow::Pulchra, FakeScheduler::default());
        submitter.run(&plan).unwrap();
        assert_eq!(
            submitter.scheduler().calls,
            vec![(PathBuf::from("p_FUS_M2_10.sh"), String::from("sbinlab"))]
        );
        assert!(dir.path().join("FUS").is_dir());
    }
}
