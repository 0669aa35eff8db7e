use crate::database::{LocalIndex, VectorStore};
use crate::document::{DocumentError, Passage, PdfDocument, TextSplitter};
use crate::invoice::record::{InvoiceRecord, INVOICE_FIELDS};
use crate::llm::semantic_search::SemanticSearch;
use crate::providers::traits::{CompletionProvider, EmbeddingProvider};
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;

pub const EXTRACTION_TEMPLATE: &str = "Extract all the following values : invoice no., Description, Quantity, date, \
Unit price , Amount, Total, email, phone number and address from the following Invoice content \
(create a JSON output with the extracted fields only):
{context}
The fields and values in the above content may be jumbled up as they are extracted from a PDF. \
Please use your judgement to align the fields and values correctly based on the fields asked for in the question above.
Expected JSON output format as follows:
{'Invoice no.': 'xxxxxxxx','Description': 'xxxxxx','Quantity': 'x','Date': 'dd/mm/yyyy',
'Unit price': 'xxx.xx','Amount': 'xxx.xx','Total': 'xxx.xx','Email': 'xxx@xxx.xxx','Phone number': 'xxxxxxxxxx','Address': 'xxxxxxxxx'}
Remove any dollar symbols or currency symbols from the extracted values.";

pub fn build_extraction_prompt(context: &str) -> String {
    EXTRACTION_TEMPLATE.replace("{context}", context)
}

/// Query used to pick the pages that go into the prompt.
pub fn retrieval_query() -> String {
    INVOICE_FIELDS.join(", ")
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceExtraction {
    pub file_name: String,
    /// Distinct source pages, not chunks.
    pub pages: usize,
    /// Model output exactly as returned.
    pub raw: String,
    /// Present when `raw` could be read as a JSON object.
    pub fields: Option<InvoiceRecord>,
}

fn page_count(passages: &[Passage]) -> usize {
    let mut pages: Vec<u32> = passages.iter().filter_map(|p| p.page).collect();
    pages.sort_unstable();
    pages.dedup();
    pages.len().max(1)
}

pub struct InvoiceExtractor {
    llm: Arc<dyn CompletionProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    splitter: TextSplitter,
    top_k: usize,
}

impl InvoiceExtractor {
    pub fn new(
        llm: Arc<dyn CompletionProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        top_k: usize,
    ) -> Self {
        Self {
            llm,
            embedder,
            splitter: TextSplitter::default(),
            top_k,
        }
    }

    pub async fn extract(&self, document: &PdfDocument) -> Result<InvoiceExtraction> {
        log::info!("Processing - {}", document.name);
        let passages = document.load_and_split(&self.splitter)?;
        self.extract_passages(&document.name, passages).await
    }

    /// Indexes one document's passages in a throwaway index and runs the
    /// single extraction query against it.
    pub async fn extract_passages(
        &self,
        file_name: &str,
        passages: Vec<Passage>,
    ) -> Result<InvoiceExtraction> {
        if passages.is_empty() {
            return Err(DocumentError::Empty(file_name.to_string()).into());
        }
        let pages = page_count(&passages);

        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let embeddings = self
            .embedder
            .generate_batch_embeddings(&texts)
            .await
            .with_context(|| format!("Failed to embed {}", file_name))?;

        let index = LocalIndex::new(self.embedder.embedding_model());
        index.add(passages, embeddings).await?;

        let search = SemanticSearch::new(self.embedder.clone(), Arc::new(index), self.top_k);
        let context = search.search(&retrieval_query()).await?;
        let prompt = build_extraction_prompt(&SemanticSearch::format_context(&context));

        let raw = self
            .llm
            .complete(&prompt)
            .await
            .with_context(|| format!("Failed to extract data from {}", file_name))?;
        log::debug!("Extracted data for {}: {}", file_name, raw);

        let fields = InvoiceRecord::parse_lenient(&raw);
        if fields.is_none() {
            log::warn!("Model output for {} is not a JSON object; keeping raw text", file_name);
        }

        Ok(InvoiceExtraction {
            file_name: file_name.to_string(),
            pages,
            raw,
            fields,
        })
    }

    /// Extracts every document in order. The first failure aborts the batch.
    pub async fn extract_all(&self, documents: &[PdfDocument]) -> Result<Vec<InvoiceExtraction>> {
        let mut extractions = Vec::with_capacity(documents.len());
        for document in documents {
            extractions.push(self.extract(document).await?);
        }
        Ok(extractions)
    }
}
