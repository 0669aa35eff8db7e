use std::env;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_HR_INDEX_PATH: &str = "HR-ChatBot/faiss_index";
pub const DEFAULT_HR_COLLECTION: &str = "hr_policies";
pub const DEFAULT_EMPLOYEE_CSV_PATH: &str = "employee_data.csv";
pub const DEFAULT_RETRIEVAL_TOP_K: usize = 4;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set in the environment or .env file")]
    MissingVar(&'static str),
}

/// Per-provider settings, read from `<PROVIDER>_*` variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: String,
    pub temperature: f32,
}

impl ProviderConfig {
    pub fn from_env(provider: &str) -> Self {
        Self::from_lookup(provider, |key| env::var(key).ok())
    }

    pub fn from_lookup<F>(provider: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = provider.to_uppercase();

        let api_key = match provider {
            // Gemini keys are issued per Google project
            "gemini" => lookup("GOOGLE_API_KEY"),
            _ => lookup(&format!("{}_API_KEY", prefix)),
        }
        .filter(|k| !k.trim().is_empty());

        let model = lookup(&format!("{}_MODEL", prefix))
            .or_else(|| lookup(&format!("{}_CHAT_MODEL", prefix)))
            .unwrap_or_else(|| match provider {
                "openai" => "gpt-4o".to_string(),
                "gemini" => "gemini-pro".to_string(),
                _ => String::new(),
            });

        let api_url = lookup(&format!("{}_API_URL", prefix)).unwrap_or_else(|| match provider {
            "openai" => "https://api.openai.com/v1".to_string(),
            "gemini" => "https://generativelanguage.googleapis.com/v1beta".to_string(),
            _ => String::new(),
        });

        // Extraction and QA both run deterministic
        let temperature = lookup(&format!("{}_TEMPERATURE", prefix))
            .and_then(|t| t.parse().ok())
            .unwrap_or(0.0);

        Self {
            api_key,
            model,
            api_url,
            temperature,
        }
    }

    pub fn require_api_key(&self, var: &'static str) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingVar(var))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub openai: ProviderConfig,
    pub gemini: ProviderConfig,
    pub embedding_model: String,
    pub hr_index_path: PathBuf,
    pub qdrant_url: Option<String>,
    pub hr_collection: String,
    pub retrieval_top_k: usize,
    pub employee_csv_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let openai = ProviderConfig::from_lookup("openai", &lookup);
        let gemini = ProviderConfig::from_lookup("gemini", &lookup);

        Self {
            openai,
            gemini,
            embedding_model: lookup("OPENAI_EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-ada-002".to_string()),
            hr_index_path: lookup("HR_INDEX_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_HR_INDEX_PATH)),
            qdrant_url: lookup("QDRANT_URL").filter(|u| !u.trim().is_empty()),
            hr_collection: lookup("HR_COLLECTION")
                .unwrap_or_else(|| DEFAULT_HR_COLLECTION.to_string()),
            retrieval_top_k: lookup("RETRIEVAL_TOP_K")
                .and_then(|k| k.parse().ok())
                .filter(|k: &usize| *k > 0)
                .unwrap_or(DEFAULT_RETRIEVAL_TOP_K),
            employee_csv_path: lookup("EMPLOYEE_CSV_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_EMPLOYEE_CSV_PATH)),
        }
    }
}
