//! Documents and the sources that load them.

use async_trait::async_trait;
use fitcoach_core::error::KnowledgeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where a piece of text came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocator {
    pub path: String,

    /// 1-based page number for paged formats
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl SourceLocator {
    pub fn new(path: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            path: path.into(),
            page,
        }
    }
}

impl std::fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.page {
            Some(page) => write!(f, "{} (page {page})", self.path),
            None => f.write_str(&self.path),
        }
    }
}

/// A loaded unit of text (a whole file, or one page of a PDF).
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub text: String,
    pub source: SourceLocator,
}

impl Document {
    pub fn new(text: impl Into<String>, source: SourceLocator) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }
}

/// Anything that can produce the corpus to index.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// A short description for logs (e.g., the directory path).
    fn describe(&self) -> String;

    async fn load(&self) -> Result<Vec<Document>, KnowledgeError>;
}

/// An in-memory corpus, mainly for tests and embedding callers.
#[derive(Debug, Clone, Default)]
pub struct StaticDocuments {
    documents: Vec<Document>,
}

impl StaticDocuments {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Build a corpus from `(path, text)` pairs.
    pub fn from_texts<I, P, T>(items: I) -> Self
    where
        I: IntoIterator<Item = (P, T)>,
        P: Into<String>,
        T: Into<String>,
    {
        Self::new(
            items
                .into_iter()
                .map(|(path, text)| Document::new(text, SourceLocator::new(path, None)))
                .collect(),
        )
    }
}

#[async_trait]
impl DocumentSource for StaticDocuments {
    fn describe(&self) -> String {
        format!("{} in-memory documents", self.documents.len())
    }

    async fn load(&self) -> Result<Vec<Document>, KnowledgeError> {
        Ok(self.documents.clone())
    }
}

/// Loads `.pdf`, `.txt`, and `.md` files from one directory (not recursive).
///
/// Files are visited in path order. A missing directory yields no documents;
/// an unreadable file is skipped with a warning.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    dir: PathBuf,
}

impl DirectoryLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DocumentSource for DirectoryLoader {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    async fn load(&self) -> Result<Vec<Document>, KnowledgeError> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || load_directory(&dir))
            .await
            .map_err(|e| KnowledgeError::Load {
                path: self.dir.display().to_string(),
                reason: e.to_string(),
            })?
    }
}

fn load_directory(dir: &Path) -> Result<Vec<Document>, KnowledgeError> {
    if !dir.exists() {
        warn!(dir = %dir.display(), "Documents directory does not exist");
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| KnowledgeError::Load {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && FileKind::of(path).is_some())
        .collect();
    paths.sort();

    let mut documents = Vec::new();
    for path in &paths {
        match load_file(path) {
            Ok(mut docs) => {
                debug!(path = %path.display(), units = docs.len(), "Loaded document");
                documents.append(&mut docs);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable document"),
        }
    }

    info!(dir = %dir.display(), files = paths.len(), units = documents.len(), "Documents loaded");
    Ok(documents)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Pdf,
    Text,
}

impl FileKind {
    fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "md" => Some(Self::Text),
            _ => None,
        }
    }
}

fn load_file(path: &Path) -> Result<Vec<Document>, KnowledgeError> {
    let display = path.display().to_string();
    match FileKind::of(path) {
        Some(FileKind::Text) => {
            let text = std::fs::read_to_string(path).map_err(|e| KnowledgeError::Load {
                path: display.clone(),
                reason: e.to_string(),
            })?;
            if text.trim().is_empty() {
                return Ok(Vec::new());
            }
            Ok(vec![Document::new(text, SourceLocator::new(display, None))])
        }
        Some(FileKind::Pdf) => load_pdf(path),
        None => Ok(Vec::new()),
    }
}

/// One document per non-empty page.
#[cfg(feature = "pdf")]
fn load_pdf(path: &Path) -> Result<Vec<Document>, KnowledgeError> {
    let source = path.display().to_string();
    let pdf = lopdf::Document::load(path).map_err(|e| KnowledgeError::Load {
        path: source.clone(),
        reason: e.to_string(),
    })?;

    let mut documents = Vec::new();
    for page in pdf.get_pages().into_keys() {
        match pdf.extract_text(&[page]) {
            Ok(text) if !text.trim().is_empty() => {
                documents.push(Document::new(
                    text,
                    SourceLocator::new(source.clone(), Some(page)),
                ));
            }
            Ok(_) => {}
            Err(e) => debug!(path = %path.display(), page, error = %e, "No text on page"),
        }
    }
    Ok(documents)
}

#[cfg(not(feature = "pdf"))]
fn load_pdf(path: &Path) -> Result<Vec<Document>, KnowledgeError> {
    Err(KnowledgeError::Load {
        path: path.display().to_string(),
        reason: "PDF support is disabled (enable the `pdf` feature)".into(),
    })
}
