use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;
use validator::Validate;

use crate::document::{is_pdf, DocumentError, PdfDocument};
use crate::employees::{
    employee_csv_bytes, write_employee_csv_file, EmployeeDataGenerator, GeneratorError,
    RecordCount,
};
use crate::invoice::{InvoiceExtraction, InvoiceExtractor};
use crate::llm::{ConversationalRetrievalChain, SessionStore, Turn};

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
const MAX_IN_FLIGHT: usize = 4;

/// Shared handles for the three pipelines. A pipeline is `None` when its
/// credentials or index were unavailable at start-up.
#[derive(Clone)]
pub struct AppState {
    pub chatbot: Option<Arc<ConversationalRetrievalChain>>,
    pub invoices: Option<Arc<InvoiceExtractor>>,
    pub employees: Option<Arc<EmployeeDataGenerator>>,
    pub sessions: SessionStore,
    pub employee_csv_path: PathBuf,
}

#[derive(Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 1000))]
    message: String,
    session_id: Option<Uuid>,
}

#[derive(Serialize, Deserialize)]
pub struct SourceRef {
    pub source: String,
    pub page: Option<u32>,
    pub score: f32,
}

#[derive(Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: Uuid,
    pub answer: String,
    pub standalone_question: String,
    pub sources: Vec<SourceRef>,
}

#[derive(Deserialize, Validate)]
pub struct GenerateRequest {
    #[validate(range(min = 1, max = 100))]
    count: u32,
}

#[derive(Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("{0} is not configured on this server")]
    Unavailable(&'static str),
    #[error("Upload error: {0}")]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error("{0:#}")]
    Pipeline(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) | ApiError::Multipart(_) | ApiError::Document(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Validation(_) | ApiError::Generator(GeneratorError::CountOutOfRange(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Generator(_) | ApiError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            log::error!("{}", self);
        }

        (status, Json(ApiResponse { status: self.to_string() })).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Create and configure the API router
pub fn create_api(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_check))
        .route("/hr/chat", post(chat_handler))
        .route("/hr/sessions/:id", delete(end_session_handler))
        .route("/invoices/extract", post(extract_handler))
        .route("/employees/generate", post(generate_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        // one semaphore shared by every route
        .layer(GlobalConcurrencyLimitLayer::new(MAX_IN_FLIGHT))
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> Json<ApiResponse> {
    Json(ApiResponse {
        status: "Server is running and healthy".to_string(),
    })
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    request.validate()?;
    let chatbot = state.chatbot.as_ref().ok_or(ApiError::Unavailable("HR chatbot"))?;

    let (session_id, history) = state.sessions.get_or_create(request.session_id).await;
    let answer = chatbot.ask(&request.message, &history).await?;
    state
        .sessions
        .record(session_id, Turn::new(request.message, answer.answer.clone()))
        .await;

    Ok(Json(ChatResponse {
        session_id,
        answer: answer.answer,
        standalone_question: answer.standalone_question,
        sources: answer
            .context
            .into_iter()
            .map(|r| SourceRef {
                source: r.passage.source,
                page: r.passage.page,
                score: r.score,
            })
            .collect(),
    }))
}

async fn end_session_handler(State(state): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    if state.sessions.remove(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn extract_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<Vec<InvoiceExtraction>>> {
    let extractor = state.invoices.as_ref().ok_or(ApiError::Unavailable("Invoice extraction"))?;

    let mut documents = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Every upload part must be a file".to_string()))?;
        if !is_pdf(&file_name) {
            return Err(ApiError::BadRequest(format!(
                "{} rejected: only PDF files allowed",
                file_name
            )));
        }
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(ApiError::BadRequest(format!("{} is empty", file_name)));
        }
        documents.push(PdfDocument::new(file_name, bytes.to_vec()));
    }

    if documents.is_empty() {
        return Err(ApiError::BadRequest(
            "Upload invoices here, only PDF files allowed".to_string(),
        ));
    }

    let extractions = extractor
        .extract_all(&documents)
        .await
        .map_err(|e| match e.downcast::<DocumentError>() {
            Ok(document_error) => ApiError::Document(document_error),
            Err(e) => ApiError::Pipeline(e),
        })?;
    Ok(Json(extractions))
}

async fn generate_handler(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<Response> {
    request.validate()?;
    let count = RecordCount::try_from(request.count)?;
    let generator = state
        .employees
        .as_ref()
        .ok_or(ApiError::Unavailable("Employee data generator"))?;

    let generated = generator.generate(count).await?;
    write_employee_csv_file(&state.employee_csv_path, &generated.rows)?;
    let body = employee_csv_bytes(&generated.rows)?;

    let file_name = state
        .employee_csv_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "employee_data.csv".to_string());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::database::{LocalIndex, VectorStore};
    use crate::document::tests::{BLANK_PDF, INVOICE_PDF};
    use crate::document::Passage;
    use crate::llm::SemanticSearch;
    use crate::providers::mock::{HashEmbedder, ScriptedProvider};
    use crate::providers::traits::{ChatMessage, CompletionProvider, EmbeddingProvider};
    use crate::providers::GeminiProvider;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;
    use tower::ServiceExt;

    /// Holds every call until the test releases the gate.
    struct GatedProvider {
        started: AtomicUsize,
        gate: Semaphore,
    }

    impl Default for GatedProvider {
        fn default() -> Self {
            Self {
                started: AtomicUsize::new(0),
                gate: Semaphore::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for GatedProvider {
        async fn chat(&self, _messages: &[ChatMessage]) -> anyhow::Result<String> {
            self.started.fetch_add(1, Ordering::SeqCst);
            self.gate.acquire().await?.forget();
            Ok("E001,Ann Lee,Finance,55000,5000,2021-03-14".to_string())
        }

        fn model_name(&self) -> &str {
            "gated"
        }
    }

    fn invoice_extractor(llm: Arc<ScriptedProvider>) -> Arc<InvoiceExtractor> {
        Arc::new(InvoiceExtractor::new(llm, Arc::new(HashEmbedder::default()), 4))
    }

    fn upload_request(file_name: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--XBOUNDARY\r\n\
             Content-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n",
            file_name
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n--XBOUNDARY--\r\n");

        Request::builder()
            .method("POST")
            .uri("/invoices/extract")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap()
    }

    fn empty_state(csv_path: PathBuf) -> AppState {
        AppState {
            chatbot: None,
            invoices: None,
            employees: None,
            sessions: SessionStore::new(),
            employee_csv_path: csv_path,
        }
    }

    async fn chatbot(llm: Arc<ScriptedProvider>) -> Arc<ConversationalRetrievalChain> {
        let embedder = Arc::new(HashEmbedder::default());
        let index = Arc::new(LocalIndex::new("hash"));
        let passage = Passage::new("Annual leave is twenty days per year", "leave.md", None);
        let embedding = embedder.generate_embedding(&passage.text).await.unwrap();
        index.add(vec![passage], vec![embedding]).await.unwrap();
        Arc::new(ConversationalRetrievalChain::new(llm, SemanticSearch::new(embedder, index, 4)))
    }

    fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_api(empty_state(dir.path().join("e.csv")));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn generate_rejects_out_of_range_counts() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedProvider::new(["unused"]));
        let mut state = empty_state(dir.path().join("e.csv"));
        state.employees = Some(Arc::new(EmployeeDataGenerator::new(llm.clone())));
        let app = create_api(state);

        for count in [0, 101] {
            let response = app
                .clone()
                .oneshot(json_request("/employees/generate", serde_json::json!({ "count": count })))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn generate_returns_csv_download_and_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("employee_data.csv");
        let llm = Arc::new(ScriptedProvider::new([
            "E001,Ann Lee,Finance,55000,5000,2021-03-14\nE002,Bo Chen,IT,60000,4000,2020-07-01",
        ]));
        let mut state = empty_state(csv_path.clone());
        state.employees = Some(Arc::new(EmployeeDataGenerator::new(llm)));

        let response = create_api(state)
            .oneshot(json_request("/employees/generate", serde_json::json!({ "count": 2 })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("employee_data.csv"));
        let body = body_string(response).await;
        assert!(body.starts_with(
            "Employee Id,Name,Department,Basic Salary,Incentives,Date of Joining"
        ));
        assert_eq!(body.lines().count(), 3);
        assert_eq!(std::fs::read_to_string(&csv_path).unwrap(), body);
    }

    #[tokio::test]
    async fn missing_pipelines_answer_service_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let response = create_api(empty_state(dir.path().join("e.csv")))
            .oneshot(json_request("/hr/chat", serde_json::json!({ "message": "hi" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn chat_keeps_history_per_session() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedProvider::new([
            "Twenty days a year.",
            "Does unused annual leave carry over?",
            "Up to five days.",
        ]));
        let mut state = empty_state(dir.path().join("e.csv"));
        state.chatbot = Some(chatbot(llm.clone()).await);
        let app = create_api(state);

        let first = app
            .clone()
            .oneshot(json_request(
                "/hr/chat",
                serde_json::json!({ "message": "What is the leave policy?" }),
            ))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let first: ChatResponse = serde_json::from_str(&body_string(first).await).unwrap();
        assert_eq!(first.answer, "Twenty days a year.");
        assert_eq!(first.sources.len(), 1);

        let second = app
            .oneshot(json_request(
                "/hr/chat",
                serde_json::json!({
                    "message": "Does it carry over?",
                    "session_id": first.session_id,
                }),
            ))
            .await
            .unwrap();
        let second: ChatResponse = serde_json::from_str(&body_string(second).await).unwrap();

        assert_eq!(second.session_id, first.session_id);
        assert_eq!(second.standalone_question, "Does unused annual leave carry over?");
        assert_eq!(second.answer, "Up to five days.");
        // rewrite call saw the first exchange
        assert_eq!(llm.calls()[1].len(), 4);
    }

    #[tokio::test]
    async fn chat_rejects_empty_messages() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedProvider::default());
        let mut state = empty_state(dir.path().join("e.csv"));
        state.chatbot = Some(chatbot(llm).await);

        let response = create_api(state)
            .oneshot(json_request("/hr/chat", serde_json::json!({ "message": "" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn extract_rejects_non_pdf_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = empty_state(dir.path().join("e.csv"));
        state.invoices = Some(invoice_extractor(Arc::new(ScriptedProvider::default())));

        let response = create_api(state)
            .oneshot(upload_request("notes.txt", b"hello"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("only PDF files allowed"));
    }

    #[tokio::test]
    async fn extract_rejects_empty_pdf_parts() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedProvider::default());
        let mut state = empty_state(dir.path().join("e.csv"));
        state.invoices = Some(invoice_extractor(llm.clone()));

        let response = create_api(state)
            .oneshot(upload_request("a.pdf", b""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("a.pdf is empty"));
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn extract_rejects_unreadable_or_textless_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = empty_state(dir.path().join("e.csv"));
        state.invoices = Some(invoice_extractor(Arc::new(ScriptedProvider::default())));
        let app = create_api(state);

        for (name, bytes) in [("broken.pdf", &b"not a pdf"[..]), ("blank.pdf", BLANK_PDF)] {
            let response = app.clone().oneshot(upload_request(name, bytes)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", name);
        }
    }

    #[tokio::test]
    async fn extract_returns_fields_for_uploaded_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let reply = "{'Invoice no.': '123', 'Total': '50'}";
        let llm = Arc::new(ScriptedProvider::new([reply]));
        let mut state = empty_state(dir.path().join("e.csv"));
        state.invoices = Some(invoice_extractor(llm.clone()));

        let response = create_api(state)
            .oneshot(upload_request("invoice.pdf", INVOICE_PDF))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        let extractions = body.as_array().unwrap();
        assert_eq!(extractions.len(), 1);
        assert_eq!(extractions[0]["file_name"], "invoice.pdf");
        assert_eq!(extractions[0]["pages"], 1);
        assert_eq!(extractions[0]["raw"], reply);
        assert_eq!(extractions[0]["fields"]["Invoice no."], "123");
        assert!(llm.calls()[0][0].content.contains("Total: $50"));
    }

    #[tokio::test]
    async fn generate_failures_do_not_leak_the_google_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ProviderConfig::from_lookup("gemini", |_| None);
        config.api_key = Some("SECRET-KEY-123".to_string());
        config.api_url = "http://127.0.0.1:9".to_string();
        let gemini = Arc::new(GeminiProvider::new(&config).unwrap());
        let mut state = empty_state(dir.path().join("e.csv"));
        state.employees = Some(Arc::new(EmployeeDataGenerator::new(gemini)));

        let response = create_api(state)
            .oneshot(json_request("/employees/generate", serde_json::json!({ "count": 2 })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_string(response).await;
        assert!(body.contains("Failed to generate employee data"), "{}", body);
        assert!(!body.contains("SECRET-KEY-123"), "{}", body);
    }

    #[tokio::test]
    async fn in_flight_limit_is_shared_across_routes() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(GatedProvider::default());
        let mut state = empty_state(dir.path().join("e.csv"));
        state.employees = Some(Arc::new(EmployeeDataGenerator::new(llm.clone())));
        let app = create_api(state);

        let mut pending = Vec::new();
        for _ in 0..MAX_IN_FLIGHT {
            let app = app.clone();
            pending.push(tokio::spawn(async move {
                app.oneshot(json_request("/employees/generate", serde_json::json!({ "count": 1 })))
                    .await
                    .unwrap()
                    .status()
            }));
        }
        while llm.started.load(Ordering::SeqCst) < MAX_IN_FLIGHT {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let health = || Request::builder().uri("/health").body(Body::empty()).unwrap();
        let blocked = tokio::time::timeout(
            Duration::from_millis(100),
            app.clone().oneshot(health()),
        )
        .await;
        assert!(blocked.is_err());

        llm.gate.add_permits(MAX_IN_FLIGHT);
        for handle in pending {
            assert_eq!(handle.await.unwrap(), StatusCode::OK);
        }
        let response = app.oneshot(health()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn end_session_reports_unknown_ids() {
        let dir = tempfile::tempdir().unwrap();
        let state = empty_state(dir.path().join("e.csv"));
        let (id, _) = state.sessions.get_or_create(None).await;
        let app = create_api(state);

        let delete_request = |id: Uuid| {
            Request::builder()
                .method("DELETE")
                .uri(format!("/hr/sessions/{}", id))
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(delete_request(id)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = app.oneshot(delete_request(id)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
