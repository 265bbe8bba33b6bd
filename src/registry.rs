//! Named entry points.
//!
//! The registry is the one place task trees are assembled. Leaves are built
//! once and shared through `Arc`, so `build`, `default`, the individual
//! category tasks, and the watcher all re-run the same transform instances.

use crate::clean::CleanTransform;
use crate::config::{Category, ConfigError};
use crate::server::ServerTransform;
use crate::task::Task;
use crate::transform::{Context, CopyTransform, ImagesTransform, StylesTransform, Transform};
use crate::watch::{WatchBinding, WatchTransform};
use std::sync::Arc;

/// Task run when the CLI gets no name.
pub const DEFAULT_TASK: &str = "default";

/// Entry points that only end when interrupted.
const LONG_RUNNING: [&str; 3] = [DEFAULT_TASK, "watch", "server"];

/// Whether a Ctrl-C is the normal way for the named task to end.
pub fn is_long_running(name: &str) -> bool {
    LONG_RUNNING.contains(&name)
}

/// Dev-mode shape: one asset pass whose failures are reported but do not
/// block, then watch and serve side by side.
pub fn dev_task(assets: Task, watch: Task, server: Task) -> Task {
    Task::sequence([Task::settled(assets), Task::parallel([watch, server])])
}

/// Insertion-ordered name → task map.
#[derive(Clone, Default)]
pub struct Registry {
    entries: Vec<(String, Task)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a named task.
    pub fn register(&mut self, name: impl Into<String>, task: Task) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = task,
            None => self.entries.push((name, task)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, task)| task)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Task)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t))
    }

    /// The stock entry points over a loaded config.
    ///
    /// Fails when a browserslist query or a source glob is invalid, so bad
    /// config never reaches a running task.
    pub fn standard(ctx: &Context) -> Result<Self, ConfigError> {
        let config = ctx.config();
        let assets: Vec<(Category, Arc<dyn Transform>)> = Category::ALL
            .into_iter()
            .map(|category| asset_transform(category, ctx).map(|t| (category, t)))
            .collect::<Result<_, _>>()?;

        let bindings = assets
            .iter()
            .map(|(category, transform)| {
                WatchBinding::new(
                    *category,
                    &config.paths.get(*category).src,
                    Arc::clone(transform),
                )
                .map_err(|e| ConfigError::Validation(format!("paths.{category}.src: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let clean = Task::leaf(Arc::new(CleanTransform));
        let watch = Task::leaf(Arc::new(WatchTransform::new(bindings)));
        let server = Task::leaf(Arc::new(ServerTransform::new()));
        let all_assets =
            || Task::parallel(assets.iter().map(|(_, t)| Task::leaf(Arc::clone(t))));

        let mut registry = Self::new();
        registry.register(
            DEFAULT_TASK,
            dev_task(all_assets(), watch.clone(), server.clone()),
        );
        registry.register("build", Task::sequence([clean.clone(), all_assets()]));
        for (category, transform) in &assets {
            registry.register(category.name(), Task::leaf(Arc::clone(transform)));
        }
        registry.register("clean", clean);
        registry.register("watch", watch);
        registry.register("server", server);
        Ok(registry)
    }
}

fn asset_transform(category: Category, ctx: &Context) -> Result<Arc<dyn Transform>, ConfigError> {
    let transform: Arc<dyn Transform> = match category {
        Category::Styles => Arc::new(StylesTransform::from_config(&ctx.config().styles)?),
        Category::Images => Arc::new(ImagesTransform::new()),
        Category::Htaccess => Arc::new(CopyTransform::renamed(category, ".htaccess")),
        Category::Pages | Category::Favicon | Category::Fonts => {
            Arc::new(CopyTransform::new(category))
        }
    };
    Ok(transform)
}
