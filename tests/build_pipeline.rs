//! End-to-end runs of the `build` entry point against a temp project.
//!
//! Exercises the public API the binary uses: load config, build the
//! registry, run a named task, inspect the report and the output tree.

use asset_pipeline::config::{self, PipelineConfig};
use asset_pipeline::registry::Registry;
use asset_pipeline::task::{RunReport, StepStatus};
use asset_pipeline::transform::Context;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;

fn write(root: &Path, rel: &str, contents: impl AsRef<[u8]>) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 9) as u8, (y * 3) as u8, 200])
    }));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// A project in the stock layout with one file of every kind.
fn fixture_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "src/pages/index.html", "<html><body><h1>Home</h1></body></html>");
    write(root, "src/pages/blog/post.html", "<html><body>Post</body></html>");
    write(root, "src/styles/_colors.scss", "$ink: #333333;\n");
    write(
        root,
        "src/styles/main.scss",
        "@use 'colors';\n\nbody { color: colors.$ink; }\n",
    );
    write(root, "src/img/logo.png", png(32, 32));
    write(root, "src/img/favicon/favicon.ico", [0u8, 0, 1, 0, 1, 0]);
    write(root, "src/fonts/inter.woff2", b"wOF2fake");
    write(root, "src/ht.access", "Options -Indexes\n");
    tmp
}

fn files_under(dir: &Path) -> Vec<String> {
    if !dir.exists() {
        return Vec::new();
    }
    let mut files: Vec<String> = WalkDir::new(dir)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(dir)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}

fn hash_tree(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    files_under(dir)
        .into_iter()
        .map(|rel| {
            let bytes = std::fs::read(dir.join(&rel)).unwrap();
            (rel, Sha256::digest(&bytes).to_vec())
        })
        .collect()
}

async fn run_task(root: &Path, name: &str) -> RunReport {
    let config = config::load_config(root, None).unwrap();
    run_with(root, config, name).await
}

async fn run_with(root: &Path, config: PipelineConfig, name: &str) -> RunReport {
    let ctx = Context::new(root, config);
    let registry = Registry::standard(&ctx).unwrap();
    registry.get(name).unwrap().run(&ctx).await
}

#[tokio::test]
async fn build_produces_exactly_the_transform_outputs() {
    let project = fixture_project();

    let report = run_task(project.path(), "build").await;

    assert!(!report.failed(), "{:?}", report.failures());
    assert_eq!(
        files_under(&project.path().join("build")),
        vec![
            ".htaccess",
            "assets/fonts/inter.woff2",
            "assets/img/logo.png",
            "assets/styles/main.min.css",
            "blog/post.html",
            "favicon.ico",
            "index.html",
        ]
    );
    assert_eq!(report.steps[0].name, "clean");
    assert_eq!(report.steps.len(), 7);
    assert_eq!(report.written_count(), 7);
}

#[tokio::test]
async fn build_output_contents() {
    let project = fixture_project();
    let build = project.path().join("build");

    run_task(project.path(), "build").await;

    assert_eq!(
        std::fs::read_to_string(build.join("index.html")).unwrap(),
        "<html><body><h1>Home</h1></body></html>"
    );
    assert_eq!(
        std::fs::read_to_string(build.join(".htaccess")).unwrap(),
        "Options -Indexes\n"
    );
    let css = std::fs::read_to_string(build.join("assets/styles/main.min.css")).unwrap();
    assert!(css.contains("body{color:#333}"), "got: {css}");

    let logo_in = std::fs::metadata(project.path().join("src/img/logo.png")).unwrap().len();
    let logo_out = std::fs::metadata(build.join("assets/img/logo.png")).unwrap().len();
    assert!(logo_out <= logo_in);
}

#[tokio::test]
async fn build_removes_stale_output() {
    let project = fixture_project();
    write(project.path(), "build/old-page.html", "stale");
    write(project.path(), "build/assets/styles/removed.min.css", "stale");

    run_task(project.path(), "build").await;

    let files = files_under(&project.path().join("build"));
    assert!(!files.contains(&"old-page.html".to_string()));
    assert!(!files.contains(&"assets/styles/removed.min.css".to_string()));
}

#[tokio::test]
async fn rebuild_is_byte_identical() {
    let project = fixture_project();
    let build = project.path().join("build");

    run_task(project.path(), "build").await;
    let first = hash_tree(&build);
    run_task(project.path(), "build").await;
    let second = hash_tree(&build);

    assert_eq!(first, second);
}

#[tokio::test]
async fn failing_stylesheet_fails_build_but_siblings_finish() {
    let project = fixture_project();
    write(project.path(), "src/styles/main.scss", "body { color: ; ");

    let report = run_task(project.path(), "build").await;

    assert!(report.failed());
    let styles = report.step("styles").unwrap();
    let StepStatus::Failed { error } = &styles.status else {
        panic!("styles should have failed");
    };
    assert!(error.contains("main.scss"));

    let files = files_under(&project.path().join("build"));
    assert!(files.contains(&"index.html".to_string()));
    assert!(files.contains(&"assets/img/logo.png".to_string()));
    assert!(!files.contains(&"assets/styles/main.min.css".to_string()));
}

#[tokio::test]
async fn empty_project_builds_nothing() {
    let project = TempDir::new().unwrap();

    let report = run_task(project.path(), "build").await;

    assert!(!report.failed());
    assert_eq!(report.written_count(), 0);
    assert!(files_under(&project.path().join("build")).is_empty());
}

#[tokio::test]
async fn single_category_task_touches_only_its_output() {
    let project = fixture_project();

    let report = run_task(project.path(), "fonts").await;

    assert!(!report.failed());
    assert_eq!(
        files_under(&project.path().join("build")),
        vec!["assets/fonts/inter.woff2"]
    );
}

#[tokio::test]
async fn clean_task_removes_output_root() {
    let project = fixture_project();
    run_task(project.path(), "build").await;

    let report = run_task(project.path(), "clean").await;

    assert!(!report.failed());
    assert!(!project.path().join("build").exists());
    assert!(project.path().join("src/pages/index.html").exists());
}

#[tokio::test]
async fn pipeline_toml_overrides_layout() {
    let project = fixture_project();
    write(
        project.path(),
        "pipeline.toml",
        r#"
output = "public"

[paths.pages]
dest = "public"
[paths.styles]
dest = "public/css"
[paths.images]
dest = "public/img"
[paths.favicon]
dest = "public"
[paths.fonts]
dest = "public/fonts"
[paths.htaccess]
dest = "public"

[styles]
suffix = ""
"#,
    );

    let report = run_task(project.path(), "build").await;

    assert!(!report.failed(), "{:?}", report.failures());
    assert!(!project.path().join("build").exists());
    assert_eq!(
        files_under(&project.path().join("public")),
        vec![
            ".htaccess",
            "blog/post.html",
            "css/main.css",
            "favicon.ico",
            "fonts/inter.woff2",
            "img/logo.png",
            "index.html",
        ]
    );
}

#[test]
fn dest_outside_output_root_is_rejected_at_load() {
    let project = TempDir::new().unwrap();
    write(
        project.path(),
        "pipeline.toml",
        "[paths.fonts]\ndest = \"fonts\"\n",
    );

    let err = config::load_config(project.path(), None).unwrap_err();
    assert!(err.to_string().contains("paths.fonts.dest"));
}

#[test]
fn output_root_over_the_sources_is_rejected_before_anything_runs() {
    let project = fixture_project();
    write(
        project.path(),
        "pipeline.toml",
        r#"
output = "src"

[paths.pages]
dest = "src"
[paths.styles]
dest = "src/assets/styles"
[paths.images]
dest = "src/assets/img"
[paths.favicon]
dest = "src"
[paths.fonts]
dest = "src/assets/fonts"
[paths.htaccess]
dest = "src"
"#,
    );

    let err = config::load_config(project.path(), None).unwrap_err();

    assert!(err.to_string().contains("overlaps the output root"), "{err}");
    assert!(project.path().join("src/pages/index.html").exists());
}
