//! Static files served from a document root.

use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::File;

use crate::gemini::mime::mime_for_path;
use crate::resolver::{ContentResolver, Resolved};

/// Serves regular files below `root`.
///
/// A request path naming a directory resolves to `<dir>/<index>`; one naming
/// a regular file resolves to that file. Paths containing `..` never
/// resolve.
#[derive(Debug, Clone)]
pub struct FileResolver {
    root: PathBuf,
    index: String,
}

impl FileResolver {
    pub fn new(root: impl Into<PathBuf>, index: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            index: index.into(),
        }
    }

    /// Maps a URL path onto the document root.
    ///
    /// Returns `None` for paths that try to climb out of the root.
    pub fn local_path(&self, path: &str) -> Option<PathBuf> {
        let mut local = self.root.clone();

        for segment in path.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return None,
                s if s.contains('\\') || s.contains('\0') => return None,
                s => local.push(s),
            }
        }

        Some(local)
    }
}

/// Stats `path`, mapping "nothing there" to `None`.
///
/// `NotADirectory` counts as absent: `/notes.txt/x` names a child of a file.
async fn stat(path: &Path) -> Result<Option<Metadata>> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => Ok(Some(metadata)),
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("stat {}", path.display())),
    }
}

impl ContentResolver for FileResolver {
    async fn resolve(&self, path: &str) -> Result<Option<Resolved>> {
        let Some(local) = self.local_path(path) else {
            return Ok(None);
        };
        let Some(metadata) = stat(&local).await? else {
            return Ok(None);
        };

        // Directory: only its index can be served. File: served directly.
        let target = if metadata.is_dir() {
            let index = local.join(&self.index);
            match stat(&index).await? {
                Some(m) if m.is_file() => index,
                _ => return Ok(None),
            }
        } else if metadata.is_file() {
            local
        } else {
            return Ok(None);
        };

        let file = File::open(&target)
            .await
            .with_context(|| format!("open {}", target.display()))?;

        tracing::trace!(path, file = %target.display(), "Resolved file");

        Ok(Some(Resolved {
            mime: mime_for_path(&target).to_string(),
            body: Box::pin(file),
        }))
    }
}
