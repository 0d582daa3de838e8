use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};

/// Produces a content address for everything under a directory. Real object stores are out of
/// scope here; `ContentHashCapture` stands in for one and is a pure function of file content, so
/// the same tree always produces the same id and an empty or missing directory is distinguishable
/// from one that genuinely changed.
pub trait Capture: Send + Sync {
    fn capture<'a>(&'a self, root: &'a Path) -> BoxFuture<'a, Result<String>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ContentHashCapture;

impl Capture for ContentHashCapture {
    fn capture<'a>(&'a self, root: &'a Path) -> BoxFuture<'a, Result<String>> {
        async move {
            let mut files = Vec::new();
            walk(root, root, &mut files)
                .await
                .with_context(|| format!("failed to walk {}", root.display()))?;
            files.sort_unstable_by(|a, b| a.0.cmp(&b.0));

            let mut hasher = DefaultHasher::new();
            for (relative_path, contents) in &files {
                relative_path.hash(&mut hasher);
                contents.hash(&mut hasher);
            }
            Ok(format!("{:016x}", hasher.finish()))
        }
        .boxed()
    }
}

fn walk<'a>(base: &'a Path, dir: &'a Path, out: &'a mut Vec<(String, Vec<u8>)>) -> BoxFuture<'a, std::io::Result<()>> {
    async move {
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                walk(base, &path, out).await?;
            } else if file_type.is_file() {
                let contents = tokio::fs::read(&path).await?;
                let relative = path.strip_prefix(base).unwrap_or(&path).to_string_lossy().into_owned();
                out.push((relative, contents));
            }
        }
        Ok(())
    }
    .boxed()
}
