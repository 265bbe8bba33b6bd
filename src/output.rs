//! CLI output formatting for task runs and the registry listing.
//!
//! Logs go to stderr through `tracing`; this module renders the human summary
//! that goes to stdout once a task finishes.
//!
//! # Output Format
//!
//! ## Run report
//!
//! ```text
//! ==> build
//!     ok      clean       0 files    2ms
//!     ok      pages       3 files    4ms
//!     FAILED  styles      Sass compile failed for src/styles/main.scss: ...
//!     ok      images      5 files  310ms
//! ==> build failed: 1 of 4 steps failed, 8 files written
//! ```
//!
//! ## Registry (`list`)
//!
//! ```text
//! default   sequence(settled(parallel(pages, styles, ...)), parallel(watch, server))
//! build     sequence(clean, parallel(pages, styles, ...))
//! pages     pages
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure.

use crate::registry::Registry;
use crate::task::{RunReport, StepStatus};
use std::time::Duration;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `850ms`, `1.25s`.
pub fn format_duration(elapsed: Duration) -> String {
    if elapsed < Duration::from_secs(1) {
        format!("{}ms", elapsed.as_millis())
    } else {
        format!("{:.2}s", elapsed.as_secs_f64())
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Format the result of running one named task.
pub fn format_run_report(task: &str, report: &RunReport) -> Vec<String> {
    let mut lines = vec![format!("==> {task}")];
    let width = report
        .steps
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(0);

    for step in &report.steps {
        let line = match &step.status {
            StepStatus::Succeeded { written } => format!(
                "{}ok      {:<width$}  {:>9}  {:>6}",
                indent(1),
                step.name,
                plural(*written, "file"),
                format_duration(step.elapsed),
            ),
            StepStatus::Failed { error } => {
                format!("{}FAILED  {:<width$}  {error}", indent(1), step.name)
            }
        };
        lines.push(line);
    }

    let failures = report.failures().len();
    let written = plural(report.written_count(), "file");
    lines.push(if report.failed() {
        format!(
            "==> {task} failed: {failures} of {} steps failed, {written} written",
            report.steps.len()
        )
    } else if failures > 0 {
        format!("==> {task} continued past {failures} failed steps, {written} written")
    } else {
        format!("==> {task} complete: {written} written")
    });
    lines
}

/// Format every registered task with its composition.
pub fn format_registry(registry: &Registry) -> Vec<String> {
    let width = registry.names().iter().map(|n| n.len()).max().unwrap_or(0);
    registry
        .iter()
        .map(|(name, task)| format!("{name:<width$}  {}", task.describe()))
        .collect()
}

pub fn print_run_report(task: &str, report: &RunReport) {
    for line in format_run_report(task, report) {
        println!("{line}");
    }
}

pub fn print_registry(registry: &Registry) {
    for line in format_registry(registry) {
        println!("{line}");
    }
}
