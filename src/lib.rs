pub mod api;
pub mod commands;
pub mod config;
pub mod database;
pub mod document;
pub mod employees;
pub mod invoice;
pub mod llm;
pub mod providers;

// Re-export commonly used items
pub use config::AppConfig;
pub use employees::{EmployeeDataGenerator, RecordCount};
pub use invoice::{InvoiceExtraction, InvoiceExtractor};
pub use llm::{ConversationalRetrievalChain, SessionStore, Turn};
