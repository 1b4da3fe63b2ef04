use axum::{
    routing::{get, post},
    Router,
    Json,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    response::{IntoResponse, Response},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use validator::Validate;

use crate::config::AppConfig;
use crate::database::Database;
use crate::grading::{CorrectionReport, EssayCorrector, ExamFormat, GradingError};
use crate::ocr::{OcrError, VisionOcr};
use crate::providers::deepseek::deepseek::DeepSeekProvider;
use crate::providers::gemini::gemini::GeminiProvider;
use crate::providers::openai::openai::OpenAIProvider;
use crate::providers::traits::CompletionProvider;
use crate::rag::{RagEngine, RagError};

/// Essay photos come from phone cameras; the axum default of 2 MB is too
/// small for them.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Deserialize, Clone)]
pub enum LLMProvider {
    Gemini,
    OpenAI,
    DeepSeek,
}

impl Default for LLMProvider {
    fn default() -> Self {
        LLMProvider::Gemini
    }
}

impl FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(LLMProvider::Gemini),
            "openai" => Ok(LLMProvider::OpenAI),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            other => Err(format!("Provedor desconhecido: {}", other)),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    gemini: Arc<GeminiProvider>,
    openai: Option<Arc<OpenAIProvider>>,
    deepseek: Option<Arc<DeepSeekProvider>>,
    ocr: Arc<VisionOcr>,
    rag: Arc<RagEngine>,
    db: Arc<Database>,
    grading_temperature: f32,
}

#[derive(Deserialize, Validate)]
pub struct CorrigirTextoRequest {
    #[validate(length(min = 1, max = 50000))]
    texto: String,
    #[serde(default)]
    formato: ExamFormat,
    tema: Option<String>,
    #[serde(default)]
    provider: LLMProvider,
}

#[derive(Deserialize, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1, max = 1000))]
    question: String,
}

#[derive(Serialize)]
pub struct QueryResponse {
    answer: String,
}

#[derive(Serialize)]
pub struct UploadResponse {
    message: String,
    filename: String,
    chunks: usize,
}

#[derive(Serialize)]
pub struct HistoricoEntry {
    timestamp: String,
    formato: String,
    nota_final: f32,
    analise_geral: String,
}

#[derive(Deserialize)]
pub struct HistoricoParams {
    limit: Option<i64>,
}

#[derive(Serialize)]
struct ApiResponse {
    status: String,
}

/// Create and configure the API router
pub fn create_api(
    gemini: GeminiProvider,
    ocr: VisionOcr,
    db: Database,
    rag: RagEngine,
    config: &AppConfig,
) -> Router {
    // Alternate providers come up only when their keys are present.
    let openai = std::env::var("OPENAI_API_KEY")
        .ok()
        .map(|key| Arc::new(OpenAIProvider::new(key)));

    let deepseek = std::env::var("DEEPSEEK_API_KEY")
        .ok()
        .map(|key| Arc::new(DeepSeekProvider::new(key)));

    let state = AppState {
        gemini: Arc::new(gemini),
        openai,
        deepseek,
        ocr: Arc::new(ocr),
        rag: Arc::new(rag),
        db: Arc::new(db),
        grading_temperature: config.grading_temperature,
    };

    println!("Setting up API server with CORS...");

    // Fully permissive CORS, same contract as the original service.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/redacao/corrigir", post(corrigir_handler))
        .route("/redacao/corrigir-texto", post(corrigir_texto_handler))
        .route("/redacao/historico", get(historico_handler))
        .route("/rag/upload", post(rag_upload_handler))
        .route("/rag/query", post(rag_query_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> Response {
    Json(ApiResponse {
        status: "API online!".to_string(),
    })
    .into_response()
}

/// Grades a photographed essay: multipart with a `foto` part plus optional
/// `formato`, `tema` and `provider` text parts.
async fn corrigir_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let mut foto: Option<Vec<u8>> = None;
    let mut formato = ExamFormat::default();
    let mut tema: Option<String> = None;
    let mut provider = LLMProvider::default();

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "foto" => match field.bytes().await {
                Ok(bytes) => foto = Some(bytes.to_vec()),
                Err(e) => {
                    return error_response(
                        StatusCode::BAD_REQUEST,
                        format!("Falha ao ler o arquivo enviado: {}", e),
                    );
                }
            },
            "formato" => {
                let value = field.text().await.unwrap_or_default();
                match value.parse() {
                    Ok(parsed) => formato = parsed,
                    Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
                }
            }
            "tema" => {
                tema = field.text().await.ok().filter(|t| !t.trim().is_empty());
            }
            "provider" => {
                let value = field.text().await.unwrap_or_default();
                match value.parse() {
                    Ok(parsed) => provider = parsed,
                    Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
                }
            }
            _ => {}
        }
    }

    let foto = match foto {
        Some(bytes) => bytes,
        None => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Campo 'foto' ausente no formulário.".to_string(),
            );
        }
    };

    println!("Correcting photographed essay ({} bytes, format {})", foto.len(), formato);

    let texto = match state.ocr.extract_text(&foto).await {
        Ok(texto) => texto,
        Err(e) => return ocr_error_response(e),
    };

    grade_and_respond(&state, &texto, formato, tema.as_deref(), &provider).await
}

/// Grades raw essay text, skipping OCR.
async fn corrigir_texto_handler(
    State(state): State<AppState>,
    Json(request): Json<CorrigirTextoRequest>,
) -> Response {
    if let Err(e) = request.validate() {
        return error_response(StatusCode::BAD_REQUEST, format!("Requisição inválida: {}", e));
    }

    grade_and_respond(
        &state,
        &request.texto,
        request.formato,
        request.tema.as_deref(),
        &request.provider,
    )
    .await
}

async fn grade_and_respond(
    state: &AppState,
    texto: &str,
    formato: ExamFormat,
    tema: Option<&str>,
    provider: &LLMProvider,
) -> Response {
    let provider = match select_provider(state, provider) {
        Ok(provider) => provider,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    };

    let corrector = EssayCorrector::new(provider, state.grading_temperature);

    let report = match corrector.correct(texto, formato, tema).await {
        Ok(report) => report,
        Err(e) => return grading_error_response(e),
    };

    save_history(state, texto, formato, &report).await;

    Json(report).into_response()
}

async fn save_history(state: &AppState, texto: &str, formato: ExamFormat, report: &CorrectionReport) {
    let relatorio_json = serde_json::to_string(report).unwrap_or_default();

    if let Err(e) = state.db
        .save_correction(
            formato.to_string(),
            report.nota_final,
            report.analise_geral.clone(),
            texto.to_string(),
            relatorio_json,
        )
        .await
    {
        eprintln!("Warning: Failed to save correction to database: {}", e);
    }
}

async fn historico_handler(
    State(state): State<AppState>,
    Query(params): Query<HistoricoParams>,
) -> Response {
    let limit = params.limit.unwrap_or(10).clamp(1, 100);

    match state.db.recent_corrections(limit).await {
        Ok(records) => {
            let entries: Vec<HistoricoEntry> = records
                .into_iter()
                .map(|r| HistoricoEntry {
                    timestamp: r.timestamp,
                    formato: r.formato,
                    nota_final: r.nota_final,
                    analise_geral: r.analise_geral,
                })
                .collect();
            Json(entries).into_response()
        }
        Err(e) => {
            eprintln!("Database error: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Erro no banco de dados: {}", e))
        }
    }
}

/// Ingests a study document into the RAG collection.
async fn rag_upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let mut filename: Option<String> = None;
    let mut bytes: Option<Vec<u8>> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            filename = field.file_name().map(|n| n.to_string());
            match field.bytes().await {
                Ok(data) => bytes = Some(data.to_vec()),
                Err(e) => {
                    return error_response(
                        StatusCode::BAD_REQUEST,
                        format!("Falha ao ler o arquivo enviado: {}", e),
                    );
                }
            }
        }
    }

    let (filename, bytes) = match (filename, bytes) {
        (Some(filename), Some(bytes)) => (filename, bytes),
        _ => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Campo 'file' ausente no formulário.".to_string(),
            );
        }
    };

    println!("Ingesting document {} ({} bytes)", filename, bytes.len());

    let chunks = match state.rag.ingest(&filename, &bytes).await {
        Ok(chunks) => chunks,
        Err(e) => return rag_error_response(e),
    };

    if let Err(e) = state.db.register_document(filename.clone(), chunks as i64).await {
        eprintln!("Warning: Failed to register document: {}", e);
    }

    Json(UploadResponse {
        message: "Arquivo processado e armazenado com sucesso.".to_string(),
        filename,
        chunks,
    })
    .into_response()
}

/// Answers a question from the uploaded material.
async fn rag_query_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Response {
    if let Err(e) = request.validate() {
        return error_response(StatusCode::BAD_REQUEST, format!("Requisição inválida: {}", e));
    }

    match state.rag.answer(&request.question).await {
        Ok(answer) => Json(QueryResponse { answer }).into_response(),
        Err(e) => rag_error_response(e),
    }
}

/// Resolves the per-request provider choice. Gemini is always available;
/// the alternates depend on their keys being configured.
fn select_provider(
    state: &AppState,
    provider: &LLMProvider,
) -> Result<Box<dyn CompletionProvider + Send + Sync>, String> {
    match provider {
        LLMProvider::Gemini => Ok(state.gemini.as_ref().clone_box()),
        LLMProvider::OpenAI => state.openai
            .as_ref()
            .map(|p| p.as_ref().clone_box())
            .ok_or_else(|| "OpenAI provider not initialized".to_string()),
        LLMProvider::DeepSeek => state.deepseek
            .as_ref()
            .map(|p| p.as_ref().clone_box())
            .ok_or_else(|| "DeepSeek provider not initialized".to_string()),
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    eprintln!("Request failed ({}): {}", status, message);
    (status, Json(ApiResponse { status: message })).into_response()
}

fn ocr_error_response(error: OcrError) -> Response {
    let status = match &error {
        OcrError::NoTextDetected | OcrError::InvalidImage(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, error.to_string())
}

fn grading_error_response(error: GradingError) -> Response {
    let status = match &error {
        GradingError::EmptyEssay | GradingError::NotPortuguese(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, error.to_string())
}

fn rag_error_response(error: RagError) -> Response {
    let status = match &error {
        RagError::Extract(_) => StatusCode::BAD_REQUEST,
        RagError::EmptyCollection => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parsing() {
        assert!(matches!("gemini".parse::<LLMProvider>(), Ok(LLMProvider::Gemini)));
        assert!(matches!("OpenAI".parse::<LLMProvider>(), Ok(LLMProvider::OpenAI)));
        assert!(matches!("deepseek".parse::<LLMProvider>(), Ok(LLMProvider::DeepSeek)));
        assert!("claude".parse::<LLMProvider>().is_err());
    }

    #[test]
    fn test_query_request_validation() {
        let empty = QueryRequest { question: String::new() };
        assert!(empty.validate().is_err());

        let ok = QueryRequest { question: "O que é mitose?".to_string() };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_texto_request_validation() {
        let request = CorrigirTextoRequest {
            texto: String::new(),
            formato: ExamFormat::Enem,
            tema: None,
            provider: LLMProvider::Gemini,
        };
        assert!(request.validate().is_err());
    }
}
