use thiserror::Error;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde_json::{json, Value};
use log;

const VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("GOOGLE_VISION_API_KEY not set")]
    MissingApiKey,
    #[error("Imagem inválida ou corrompida: {0}")]
    InvalidImage(String),
    #[error("Nenhum texto detectado na imagem.")]
    NoTextDetected,
    #[error("Erro na API do Vision: {0}")]
    Upstream(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Google Cloud Vision client used to read photographed essays.
///
/// `DOCUMENT_TEXT_DETECTION` is the dense-text variant of the annotate API,
/// tuned for handwriting and full pages rather than scene text.
#[derive(Clone)]
pub struct VisionOcr {
    api_key: String,
    client: Client,
    endpoint: String,
}

impl VisionOcr {
    pub fn new(api_key: String) -> Self {
        let endpoint = std::env::var("VISION_API_URL")
            .unwrap_or_else(|_| VISION_ENDPOINT.to_string());

        Self {
            api_key,
            client: Client::new(),
            endpoint,
        }
    }

    pub fn from_env() -> Result<Self, OcrError> {
        let api_key = std::env::var("GOOGLE_VISION_API_KEY")
            .map_err(|_| OcrError::MissingApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Extracts the full text annotation from an essay photo. The bytes are
    /// decoded locally first so corrupt uploads fail without an API call.
    pub async fn extract_text(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
        validate_image(image_bytes)?;

        let encoded = STANDARD.encode(image_bytes);

        let response = self.client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "requests": [{
                    "image": { "content": encoded },
                    "features": [{ "type": "DOCUMENT_TEXT_DETECTION" }]
                }]
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Upstream(format!("Status {}: {}", status, body)));
        }

        let response_json: Value = response.json().await?;
        parse_annotate_response(&response_json)
    }
}

/// Decodes just enough of the upload to confirm it is a readable image.
fn validate_image(bytes: &[u8]) -> Result<(), OcrError> {
    if bytes.is_empty() {
        return Err(OcrError::InvalidImage("arquivo vazio".to_string()));
    }

    image::load_from_memory(bytes)
        .map(|_| ())
        .map_err(|e| OcrError::InvalidImage(e.to_string()))
}

fn parse_annotate_response(response: &Value) -> Result<String, OcrError> {
    let first = response["responses"]
        .get(0)
        .ok_or_else(|| OcrError::Upstream("empty annotate response".to_string()))?;

    if let Some(error) = first.get("error") {
        let message = error["message"].as_str().unwrap_or("unknown error");
        log::error!("Vision API error: {}", message);
        return Err(OcrError::Upstream(message.to_string()));
    }

    let text = first["fullTextAnnotation"]["text"]
        .as_str()
        .unwrap_or("")
        .trim()
        .to_string();

    if text.is_empty() {
        return Err(OcrError::NoTextDetected);
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_text_annotation() {
        let response = json!({
            "responses": [{
                "fullTextAnnotation": { "text": "A redação do aluno.\n" }
            }]
        });

        let text = parse_annotate_response(&response).unwrap();
        assert_eq!(text, "A redação do aluno.");
    }

    #[test]
    fn test_parse_vision_error() {
        let response = json!({
            "responses": [{
                "error": { "code": 3, "message": "Bad image data." }
            }]
        });

        match parse_annotate_response(&response) {
            Err(OcrError::Upstream(msg)) => assert_eq!(msg, "Bad image data."),
            other => panic!("expected upstream error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_parse_no_text() {
        let response = json!({ "responses": [{}] });

        assert!(matches!(
            parse_annotate_response(&response),
            Err(OcrError::NoTextDetected)
        ));
    }

    #[test]
    fn test_empty_upload_rejected() {
        assert!(matches!(
            validate_image(&[]),
            Err(OcrError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        assert!(matches!(
            validate_image(b"definitely not an image"),
            Err(OcrError::InvalidImage(_))
        ));
    }
}
