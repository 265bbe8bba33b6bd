use super::{Context, StepOutput, Transform, TransformError};
use crate::config::Category;
use crate::sources;
use futures::future::BoxFuture;
use std::path::Path;

/// Copies every matched file into the category's destination unchanged.
///
/// With a rename set, each file keeps its directory but takes the new name.
/// That is how `src/ht.access` becomes `build/.htaccess`.
#[derive(Debug, Clone)]
pub struct CopyTransform {
    category: Category,
    rename: Option<String>,
}

impl CopyTransform {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            rename: None,
        }
    }

    pub fn renamed(category: Category, file_name: impl Into<String>) -> Self {
        Self {
            category,
            rename: Some(file_name.into()),
        }
    }

    async fn copy_all(&self, ctx: &Context) -> Result<StepOutput, TransformError> {
        let entry = ctx.config().paths.get(self.category);
        let dest = ctx.resolve(&entry.dest);
        let files = sources::expand(ctx.root(), &entry.src)?;

        let mut written = Vec::with_capacity(files.len());
        for file in files {
            let mut target = file.target_in(&dest);
            if let Some(name) = &self.rename {
                target.set_file_name(name);
            }
            copy_file(&file.path, &target).await?;
            tracing::debug!("{}: {} → {}", self.category, file.path.display(), target.display());
            written.push(target);
        }
        Ok(StepOutput { written })
    }
}

async fn copy_file(from: &Path, to: &Path) -> Result<(), TransformError> {
    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(TransformError::io(parent))?;
    }
    tokio::fs::copy(from, to)
        .await
        .map_err(TransformError::io(from))?;
    Ok(())
}

impl Transform for CopyTransform {
    fn name(&self) -> &str {
        self.category.name()
    }

    fn run<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, Result<StepOutput, TransformError>> {
        Box::pin(self.copy_all(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{list_files, test_context, write_file};
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn pages_copied_to_output_root_with_structure() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "src/pages/index.html", "<p>home</p>");
        write_file(tmp.path(), "src/pages/about/index.html", "<p>about</p>");
        let ctx = test_context(tmp.path());

        let out = CopyTransform::new(Category::Pages).run(&ctx).await.unwrap();

        assert_eq!(out.written.len(), 2);
        assert_eq!(
            list_files(&tmp.path().join("build")),
            vec!["about/index.html", "index.html"]
        );
        assert_eq!(
            fs::read_to_string(tmp.path().join("build/about/index.html")).unwrap(),
            "<p>about</p>"
        );
    }

    #[tokio::test]
    async fn favicon_lands_in_output_root() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "src/img/favicon/favicon.ico", "ico");
        write_file(tmp.path(), "src/img/favicon/apple-touch-icon.png", "png");
        let ctx = test_context(tmp.path());

        CopyTransform::new(Category::Favicon).run(&ctx).await.unwrap();

        assert_eq!(
            list_files(&tmp.path().join("build")),
            vec!["apple-touch-icon.png", "favicon.ico"]
        );
    }

    #[tokio::test]
    async fn fonts_go_under_assets() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "src/fonts/inter/inter.woff2", "font");
        let ctx = test_context(tmp.path());

        CopyTransform::new(Category::Fonts).run(&ctx).await.unwrap();

        assert!(tmp.path().join("build/assets/fonts/inter/inter.woff2").exists());
    }

    #[tokio::test]
    async fn htaccess_is_renamed() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "src/ht.access", "Options -Indexes\n");
        let ctx = test_context(tmp.path());

        let out = CopyTransform::renamed(Category::Htaccess, ".htaccess")
            .run(&ctx)
            .await
            .unwrap();

        assert_eq!(out.written, vec![tmp.path().join("build/.htaccess")]);
        assert_eq!(
            fs::read_to_string(tmp.path().join("build/.htaccess")).unwrap(),
            "Options -Indexes\n"
        );
        assert!(!tmp.path().join("build/ht.access").exists());
    }

    #[tokio::test]
    async fn empty_match_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let ctx = test_context(tmp.path());

        for category in [Category::Pages, Category::Favicon, Category::Fonts] {
            let out = CopyTransform::new(category).run(&ctx).await.unwrap();
            assert!(out.written.is_empty());
        }
        let out = CopyTransform::renamed(Category::Htaccess, ".htaccess")
            .run(&ctx)
            .await
            .unwrap();
        assert!(out.written.is_empty());
        assert!(!tmp.path().join("build").exists());
    }

    #[test]
    fn name_is_category_name() {
        assert_eq!(CopyTransform::new(Category::Fonts).name(), "fonts");
        assert_eq!(
            CopyTransform::renamed(Category::Htaccess, ".htaccess").name(),
            "htaccess"
        );
    }
}
