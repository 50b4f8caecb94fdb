use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::reader::FileReader;

/// A read-only text document handed to the graph builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub text: String,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        filename: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            text: text.into(),
        }
    }
}

/// Which documents a build covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DocumentScope {
    #[default]
    All,
    Single(String),
}

/// Fetch capability over the document store.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<Document>>;

    async fn fetch(&self, id: &str) -> Result<Option<Document>>;

    /// Resolve a scope to a snapshot of documents. Unknown ids resolve to nothing.
    async fn fetch_scope(&self, scope: &DocumentScope) -> Result<Vec<Document>> {
        match scope {
            DocumentScope::All => self.fetch_all().await,
            DocumentScope::Single(id) => Ok(self.fetch(id).await?.into_iter().collect()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    documents: Vec<Document>,
}

impl InMemorySource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl DocumentSource for InMemorySource {
    async fn fetch_all(&self) -> Result<Vec<Document>> {
        Ok(self.documents.clone())
    }

    async fn fetch(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.documents.iter().find(|d| d.id == id).cloned())
    }
}

/// Documents read from `.txt`/`.md` files in one directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl DocumentSource for DirectorySource {
    async fn fetch_all(&self) -> Result<Vec<Document>> {
        FileReader::read_directory(&self.dir).await
    }

    async fn fetch(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.fetch_all().await?.into_iter().find(|d| d.id == id))
    }
}
