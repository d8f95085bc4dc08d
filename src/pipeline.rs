//! Generation pipeline orchestrator.
//!
//! A [`Pipeline`] executes [`Step`]s strictly in the declared order, with
//! explicit fan-out groups whose members run concurrently and join. The
//! first failing step (or group member) aborts the rest of the run; the
//! error is wrapped with the failing step's name and returned to the caller.
//!
//! Known limitation, preserved on purpose: a fan-out group is not
//! transactional. When one member fails, side effects already performed by
//! its siblings remain, and no rollback or cancellation is attempted.
//! Timeouts are the caller's responsibility.

use crate::config::{ConfigError, GenerationConfig};
use crate::context::{ContextError, ContextSnapshot, SessionContext};
use crate::writer::WriteError;
use async_trait::async_trait;
use futures_util::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Errors a step action can fail with.
#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Assist(#[from] crate::assist::AssistError),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl StepError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Errors from a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid generation config; nothing ran.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The declared step sequence violates a predecessor constraint;
    /// nothing ran.
    #[error("invalid pipeline configuration: {0}")]
    Configuration(String),

    /// A step's action failed; subsequent steps did not run.
    #[error("step '{step}' failed: {source}")]
    Step {
        step: String,
        #[source]
        source: StepError,
    },
}

/// A named unit of asynchronous pipeline work with declared predecessors.
#[async_trait]
pub trait Step: Send + Sync {
    /// Step name, unique within a pipeline.
    fn name(&self) -> &str;

    /// Names of steps that must have completed before this one runs.
    fn depends_on(&self) -> &[&str] {
        &[]
    }

    async fn run(&self, ctx: &mut SessionContext) -> Result<(), StepError>;
}

/// One slot in the declared run order: a single step or a fan-out group.
pub enum StepUnit {
    Single(Arc<dyn Step>),
    /// Members run concurrently and join; no ordering between them.
    Concurrent(Vec<Arc<dyn Step>>),
}

impl StepUnit {
    pub fn single(step: impl Step + 'static) -> Self {
        Self::Single(Arc::new(step))
    }

    pub fn concurrent(steps: Vec<Arc<dyn Step>>) -> Self {
        Self::Concurrent(steps)
    }

    fn names(&self) -> Vec<&str> {
        match self {
            Self::Single(step) => vec![step.name()],
            Self::Concurrent(steps) => steps.iter().map(|s| s.name()).collect(),
        }
    }
}

/// Outcome of a successful run: which steps executed, and the final
/// context snapshot. Discarded after the run; nothing is persisted.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub executed: Vec<String>,
    pub context: ContextSnapshot,
}

/// Orders and executes steps against a fresh session context.
pub struct Pipeline {
    units: Vec<StepUnit>,
}

impl Pipeline {
    pub fn new(units: Vec<StepUnit>) -> Self {
        Self { units }
    }

    /// Validate the declared order and execute.
    ///
    /// Validation checks that step names are unique and that every declared
    /// predecessor appears in an earlier unit. A predecessor inside the same
    /// fan-out group is rejected: members of a group have no ordering
    /// between them.
    pub async fn run(&self, config: &GenerationConfig) -> Result<PipelineReport, PipelineError> {
        config.validate()?;
        self.validate_order()?;

        let mut ctx = SessionContext::new();
        let mut executed = Vec::new();

        for unit in &self.units {
            match unit {
                StepUnit::Single(step) => {
                    let name = step.name().to_string();
                    tracing::info!(step = %name, "step started");
                    step.run(&mut ctx)
                        .await
                        .map_err(|source| {
                            tracing::error!(step = %name, error = %source, "step failed");
                            PipelineError::Step {
                                step: name.clone(),
                                source,
                            }
                        })?;
                    tracing::info!(step = %name, "step completed");
                    executed.push(name);
                }
                StepUnit::Concurrent(members) => {
                    self.run_group(members, &mut ctx, &mut executed).await?;
                }
            }
        }

        Ok(PipelineReport {
            executed,
            context: ctx.snapshot(),
        })
    }

    /// Launch all group members, join, merge successful members' context
    /// writes, then report the first failure (if any). Siblings are never
    /// cancelled and their side effects are kept.
    async fn run_group(
        &self,
        members: &[Arc<dyn Step>],
        ctx: &mut SessionContext,
        executed: &mut Vec<String>,
    ) -> Result<(), PipelineError> {
        let futures = members.iter().map(|step| {
            let step = Arc::clone(step);
            let mut local = ctx.clone();
            async move {
                let name = step.name().to_string();
                tracing::info!(step = %name, "step started (fan-out)");
                let result = step.run(&mut local).await;
                (name, local, result)
            }
        });

        let mut first_failure: Option<PipelineError> = None;
        for (name, local, result) in join_all(futures).await {
            match result {
                Ok(()) => {
                    tracing::info!(step = %name, "step completed (fan-out)");
                    if let Err(conflict) = ctx.merge_from(local) {
                        if first_failure.is_none() {
                            first_failure = Some(PipelineError::Step {
                                step: name.clone(),
                                source: conflict.into(),
                            });
                        }
                        continue;
                    }
                    executed.push(name);
                }
                Err(source) => {
                    tracing::error!(step = %name, error = %source, "step failed (fan-out)");
                    if first_failure.is_none() {
                        first_failure = Some(PipelineError::Step { step: name, source });
                    }
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn validate_order(&self) -> Result<(), PipelineError> {
        let mut seen: HashSet<String> = HashSet::new();
        for unit in &self.units {
            let names = unit.names();
            for name in &names {
                if seen.contains(*name) {
                    return Err(PipelineError::Configuration(format!(
                        "duplicate step name '{}'",
                        name
                    )));
                }
            }
            match unit {
                StepUnit::Single(step) => {
                    check_predecessors(step.as_ref(), &seen)?;
                }
                StepUnit::Concurrent(members) => {
                    // Group members may not depend on each other.
                    for step in members {
                        check_predecessors(step.as_ref(), &seen)?;
                    }
                }
            }
            for name in names {
                seen.insert(name.to_string());
            }
        }
        Ok(())
    }
}

fn check_predecessors(step: &dyn Step, seen: &HashSet<String>) -> Result<(), PipelineError> {
    for dep in step.depends_on() {
        if !seen.contains(*dep) {
            return Err(PipelineError::Configuration(format!(
                "step '{}' declares predecessor '{}' which does not appear earlier",
                step.name(),
                dep
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Step that records its invocation into a shared log.
    struct RecordingStep {
        name: String,
        deps: Vec<&'static str>,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl RecordingStep {
        fn new(name: &str, log: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name: name.to_string(),
                deps: Vec::new(),
                log,
                fail: false,
            }
        }

        fn with_deps(mut self, deps: Vec<&'static str>) -> Self {
            self.deps = deps;
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }
    }

    #[async_trait]
    impl Step for RecordingStep {
        fn name(&self) -> &str {
            &self.name
        }

        fn depends_on(&self) -> &[&str] {
            &self.deps
        }

        async fn run(&self, ctx: &mut SessionContext) -> Result<(), StepError> {
            self.log.lock().unwrap().push(self.name.clone());
            if self.fail {
                return Err(StepError::other("boom"));
            }
            ctx.set(format!("{}_done", self.name), true)?;
            Ok(())
        }
    }

    fn config() -> GenerationConfig {
        GenerationConfig::new("App", "App", "/p")
    }

    #[test]
    fn test_runs_in_declared_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(vec![
            StepUnit::single(RecordingStep::new("a", log.clone())),
            StepUnit::single(RecordingStep::new("b", log.clone()).with_deps(vec!["a"])),
            StepUnit::single(RecordingStep::new("c", log.clone()).with_deps(vec!["b"])),
        ]);

        let report = tokio_test::block_on(pipeline.run(&config())).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(report.executed, vec!["a", "b", "c"]);
        assert_eq!(report.context.get("c_done").and_then(|v| v.as_bool()), Some(true));
    }

    #[test]
    fn test_failure_stops_later_steps_and_names_culprit() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(vec![
            StepUnit::single(RecordingStep::new("a", log.clone())),
            StepUnit::single(RecordingStep::new("b", log.clone()).failing()),
            StepUnit::single(RecordingStep::new("c", log.clone())),
        ]);

        let err = tokio_test::block_on(pipeline.run(&config())).unwrap_err();
        match err {
            PipelineError::Step { step, .. } => assert_eq!(step, "b"),
            other => panic!("expected step failure, got {:?}", other),
        }
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_predecessor_not_earlier_is_configuration_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(vec![
            StepUnit::single(RecordingStep::new("a", log.clone()).with_deps(vec!["missing"])),
        ]);

        let err = tokio_test::block_on(pipeline.run(&config())).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_predecessor_inside_same_group_is_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(vec![StepUnit::concurrent(vec![
            Arc::new(RecordingStep::new("a", log.clone())),
            Arc::new(RecordingStep::new("b", log.clone()).with_deps(vec!["a"])),
        ])]);

        let err = tokio_test::block_on(pipeline.run(&config())).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_duplicate_step_names_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(vec![
            StepUnit::single(RecordingStep::new("a", log.clone())),
            StepUnit::single(RecordingStep::new("a", log.clone())),
        ]);

        let err = tokio_test::block_on(pipeline.run(&config())).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_invalid_config_runs_nothing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(vec![StepUnit::single(RecordingStep::new("a", log.clone()))]);
        let bad = GenerationConfig::new("", "App", "/p");

        let err = tokio_test::block_on(pipeline.run(&bad)).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_fan_out_failure_keeps_sibling_side_effects() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(vec![
            StepUnit::single(RecordingStep::new("init", log.clone())),
            StepUnit::concurrent(vec![
                Arc::new(RecordingStep::new("m1", log.clone()).with_deps(vec!["init"])),
                Arc::new(RecordingStep::new("m2", log.clone()).with_deps(vec!["init"]).failing()),
                Arc::new(RecordingStep::new("m3", log.clone()).with_deps(vec!["init"])),
            ]),
            StepUnit::single(RecordingStep::new("after", log.clone())),
        ]);

        let err = tokio_test::block_on(pipeline.run(&config())).unwrap_err();
        match err {
            PipelineError::Step { step, .. } => assert_eq!(step, "m2"),
            other => panic!("expected step failure, got {:?}", other),
        }

        let recorded = log.lock().unwrap().clone();
        // All members ran (side effects kept), the step after the group did not.
        assert!(recorded.contains(&"m1".to_string()));
        assert!(recorded.contains(&"m2".to_string()));
        assert!(recorded.contains(&"m3".to_string()));
        assert!(!recorded.contains(&"after".to_string()));
    }

    #[test]
    fn test_fan_out_merges_context_from_members() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(vec![StepUnit::concurrent(vec![
            Arc::new(RecordingStep::new("m1", log.clone())),
            Arc::new(RecordingStep::new("m2", log.clone())),
        ])]);

        let report = tokio_test::block_on(pipeline.run(&config())).unwrap();
        assert_eq!(
            report.context.get("m1_done").and_then(|v| v.as_bool()),
            Some(true)
        );
        assert_eq!(
            report.context.get("m2_done").and_then(|v| v.as_bool()),
            Some(true)
        );
    }
}
