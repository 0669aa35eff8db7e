pub mod splitter;

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub use splitter::TextSplitter;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to extract text from {name}: {message}")]
    Pdf { name: String, message: String },
    #[error("Unsupported file type: {0}")]
    Unsupported(String),
    #[error("{0} contains no extractable text")]
    Empty(String),
}

/// A chunk of document text plus where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub source: String,
    /// 1-based page number, when the source is paginated.
    pub page: Option<u32>,
}

impl Passage {
    pub fn new(text: impl Into<String>, source: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            page,
        }
    }

    pub fn locator(&self) -> String {
        match self.page {
            Some(page) => format!("{} (page {})", self.source, page),
            None => self.source.clone(),
        }
    }
}

/// An uploaded PDF held in memory.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl PdfDocument {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub async fn open(path: &Path) -> Result<Self, DocumentError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| DocumentError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    /// Extracts one passage per page that has text.
    pub fn pages(&self) -> Result<Vec<Passage>, DocumentError> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(&self.bytes).map_err(|e| {
            DocumentError::Pdf {
                name: self.name.clone(),
                message: e.to_string(),
            }
        })?;

        Ok(pages_to_passages(&self.name, pages))
    }

    /// Page passages, with pages larger than the splitter's chunk size broken up.
    pub fn load_and_split(&self, splitter: &TextSplitter) -> Result<Vec<Passage>, DocumentError> {
        let passages: Vec<Passage> = self
            .pages()?
            .into_iter()
            .flat_map(|page| splitter.split_passage(&page))
            .collect();

        if passages.is_empty() {
            return Err(DocumentError::Empty(self.name.clone()));
        }
        Ok(passages)
    }
}

pub(crate) fn pages_to_passages(name: &str, pages: Vec<String>) -> Vec<Passage> {
    pages
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(idx, text)| Passage::new(text.trim(), name, Some(idx as u32 + 1)))
        .collect()
}

pub fn is_pdf(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Loads a file for index ingestion: PDFs per page, text and markdown whole.
pub async fn load_source(
    path: &Path,
    splitter: &TextSplitter,
) -> Result<Vec<Passage>, DocumentError> {
    let name = path.display().to_string();
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => PdfDocument::open(path).await?.load_and_split(splitter),
        "txt" | "md" | "markdown" => {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|source| DocumentError::Read {
                    path: name.clone(),
                    source,
                })?;
            let passages = splitter.split_passage(&Passage::new(text, name.clone(), None));
            if passages.is_empty() {
                return Err(DocumentError::Empty(name));
            }
            Ok(passages)
        }
        _ => Err(DocumentError::Unsupported(name)),
    }
}
