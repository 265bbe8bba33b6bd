//! Task composition: sequence, parallel, and settled nodes over transforms.
//!
//! A [`Task`] is a tree built once at startup. Leaves are shared
//! `Arc<dyn Transform>` handles, so the same pages transform can sit in the
//! `build` tree, the `default` tree, and the watcher at once.
//!
//! ```text
//! build    = sequence(clean, parallel(pages, styles, images, ...))
//! default  = sequence(settled(parallel(pages, ...)), parallel(watch, server))
//! ```
//!
//! Running a tree never returns an error. Every leaf outcome lands in the
//! [`RunReport`] and the report's `failed` flag carries the composite result:
//!
//! - **Sequence**: steps run in order; the first failure stops it and the
//!   remaining steps never start.
//! - **Parallel**: all children start together on the current task and are
//!   polled to completion; a failure does not stop siblings.
//! - **Settled**: the child's failures stay in the report but the node
//!   itself counts as complete.

use crate::transform::{Context, Transform};
use futures::future::{BoxFuture, join_all};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A node in the task tree.
#[derive(Clone)]
pub enum Task {
    Leaf(Arc<dyn Transform>),
    Sequence(Vec<Task>),
    Parallel(Vec<Task>),
    Settled(Box<Task>),
}

impl Task {
    pub fn leaf(transform: Arc<dyn Transform>) -> Self {
        Task::Leaf(transform)
    }

    pub fn sequence(steps: impl IntoIterator<Item = Task>) -> Self {
        Task::Sequence(steps.into_iter().collect())
    }

    pub fn parallel(steps: impl IntoIterator<Item = Task>) -> Self {
        Task::Parallel(steps.into_iter().collect())
    }

    pub fn settled(step: Task) -> Self {
        Task::Settled(Box::new(step))
    }

    /// Run the tree to completion.
    pub fn run<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, RunReport> {
        Box::pin(async move {
            match self {
                Task::Leaf(transform) => {
                    RunReport::from_step(run_leaf(transform.as_ref(), ctx).await)
                }
                Task::Sequence(steps) => {
                    let mut report = RunReport::default();
                    for step in steps {
                        let sub = step.run(ctx).await;
                        let failed = sub.failed;
                        report.absorb(sub);
                        if failed {
                            break;
                        }
                    }
                    report
                }
                Task::Parallel(steps) => {
                    let mut report = RunReport::default();
                    for sub in join_all(steps.iter().map(|step| step.run(ctx))).await {
                        report.absorb(sub);
                    }
                    report
                }
                Task::Settled(step) => {
                    let mut report = step.run(ctx).await;
                    if report.failed {
                        tracing::warn!(
                            "{} step(s) failed, continuing",
                            report.failures().len()
                        );
                    }
                    report.failed = false;
                    report
                }
            }
        })
    }

    /// One-line rendering of the tree, e.g. `sequence(clean, parallel(pages, styles))`.
    pub fn describe(&self) -> String {
        match self {
            Task::Leaf(transform) => transform.name().to_string(),
            Task::Sequence(steps) => format!("sequence({})", describe_all(steps)),
            Task::Parallel(steps) => format!("parallel({})", describe_all(steps)),
            Task::Settled(step) => format!("settled({})", step.describe()),
        }
    }
}

fn describe_all(steps: &[Task]) -> String {
    steps
        .iter()
        .map(Task::describe)
        .collect::<Vec<_>>()
        .join(", ")
}

async fn run_leaf(transform: &dyn Transform, ctx: &Context) -> StepReport {
    let name = transform.name().to_string();
    tracing::info!("{name}: started");
    let start = Instant::now();
    let status = match transform.run(ctx).await {
        Ok(out) => {
            tracing::info!(
                "{name}: finished, {} files in {:?}",
                out.written.len(),
                start.elapsed()
            );
            StepStatus::Succeeded {
                written: out.written.len(),
            }
        }
        Err(e) => {
            tracing::error!("{name}: {e}");
            StepStatus::Failed {
                error: e.to_string(),
            }
        }
    };
    StepReport {
        name,
        status,
        elapsed: start.elapsed(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded { written: usize },
    Failed { error: String },
}

/// Outcome of one leaf.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub name: String,
    pub status: StepStatus,
    pub elapsed: Duration,
}

impl StepReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, StepStatus::Failed { .. })
    }
}

/// Every leaf that ran, in tree order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub steps: Vec<StepReport>,
    /// Composite result of the tree. Can be `false` while `steps` still holds
    /// failures that a settled node absorbed.
    pub failed: bool,
}

impl RunReport {
    fn from_step(step: StepReport) -> Self {
        Self {
            failed: step.is_failure(),
            steps: vec![step],
        }
    }

    fn absorb(&mut self, other: RunReport) {
        self.failed |= other.failed;
        self.steps.extend(other.steps);
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn failures(&self) -> Vec<&StepReport> {
        self.steps.iter().filter(|s| s.is_failure()).collect()
    }

    pub fn written_count(&self) -> usize {
        self.steps
            .iter()
            .map(|s| match s.status {
                StepStatus::Succeeded { written } => written,
                StepStatus::Failed { .. } => 0,
            })
            .sum()
    }

    pub fn step(&self, name: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.name == name)
    }
}
