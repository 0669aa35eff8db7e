pub mod extraction;
pub mod record;

pub use extraction::{build_extraction_prompt, InvoiceExtraction, InvoiceExtractor};
pub use record::{InvoiceRecord, INVOICE_FIELDS};
