use anyhow::{Context as _, bail};
use asset_pipeline::registry::{DEFAULT_TASK, Registry, is_long_running};
use asset_pipeline::transform::Context;
use asset_pipeline::{config, output};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "asset-pipeline")]
#[command(version)]
#[command(about = "Static-site asset pipeline with a live-reload dev server")]
#[command(long_about = "\
Static-site asset pipeline with a live-reload dev server

Copies pages, compiles Sass, optimizes images, moves fonts and favicons,
and renames src/ht.access to build/.htaccess.

Tasks:
  default    build every asset (failures reported), then watch and serve
  build      delete the output root, then build every asset
  pages | styles | images | favicon | fonts | htaccess
             build one category
  clean      delete the output root
  watch      rebuild a category when its sources change
  server     serve the output root with live reload

Project layout (stock config):

  project/
  ├── pipeline.toml          # Optional overrides
  └── src/
      ├── pages/**/*.html    → build/
      ├── styles/**/*.scss   → build/assets/styles/*.min.css
      ├── img/**/*.{jpg,png,gif}  → build/assets/img/
      ├── img/favicon/*.*    → build/
      ├── fonts/**/*.*       → build/assets/fonts/
      └── ht.access          → build/.htaccess

Run 'asset-pipeline list' to see every task and what it runs.
Run 'asset-pipeline gen-config' to print a documented pipeline.toml.")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Task to run
    #[arg(default_value = DEFAULT_TASK)]
    task: String,

    /// Project root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file (default: <root>/pipeline.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List tasks and their composition
    List,
    /// Print a stock pipeline.toml with all options documented
    GenConfig,
}

/// Logs go to stderr so stdout carries only reports and listings.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "asset_pipeline=info,tower_http=info".into()),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    if let Some(Command::GenConfig) = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(ExitCode::SUCCESS);
    }

    init_tracing();

    let root = cli
        .root
        .canonicalize()
        .with_context(|| format!("project root {} not found", cli.root.display()))?;
    let pipeline = config::load_config(&root, cli.config.as_deref())
        .context("failed to load pipeline config")?;
    let ctx = Context::new(root, pipeline);
    let registry = Registry::standard(&ctx).context("invalid pipeline config")?;

    if let Some(Command::List) = cli.command {
        output::print_registry(&registry);
        return Ok(ExitCode::SUCCESS);
    }

    let Some(task) = registry.get(&cli.task) else {
        bail!(
            "unknown task '{}'. Available: {}",
            cli.task,
            registry.names().join(", ")
        );
    };

    tracing::info!("running '{}' in {}", cli.task, ctx.root().display());
    tokio::select! {
        report = task.run(&ctx) => {
            output::print_run_report(&cli.task, &report);
            Ok(if report.failed() { ExitCode::FAILURE } else { ExitCode::SUCCESS })
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            tracing::info!("interrupted, stopping");
            // Ctrl-C is a normal end only for the dev entry points
            Ok(if is_long_running(&cli.task) {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(130)
            })
        }
    }
}
