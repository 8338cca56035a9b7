//! In-memory documents, keyed by request path.

use std::collections::HashMap;
use std::io::Cursor;

use bytes::Bytes;

use crate::resolver::{ContentResolver, Resolved};

#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    documents: HashMap<String, (String, Bytes)>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a document at `path`.
    ///
    /// Paths ending in `/` act as directory indexes: `/docs/` answers both
    /// `/docs/` and `/docs`.
    pub fn with_document(
        mut self,
        path: impl Into<String>,
        mime: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        self.documents
            .insert(path.into(), (mime.into(), content.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn lookup(&self, path: &str) -> Option<&(String, Bytes)> {
        let index = if path.ends_with('/') {
            path.to_string()
        } else {
            format!("{}/", path)
        };

        self.documents
            .get(&index)
            .or_else(|| self.documents.get(path))
    }
}

impl ContentResolver for StaticResolver {
    async fn resolve(&self, path: &str) -> anyhow::Result<Option<Resolved>> {
        Ok(self.lookup(path).map(|(mime, content)| Resolved {
            mime: mime.clone(),
            body: Box::pin(Cursor::new(content.clone())),
        }))
    }
}
