use async_trait::async_trait;
use anyhow::{Result, anyhow};
use crate::config::ProviderConfig;
use crate::providers::traits::CompletionProvider;
use reqwest::Client;
use serde_json::{json, Value};

/// Dimension of the `embedding-001` vectors.
const GEMINI_EMBEDDING_DIM: u64 = 768;

/// Google Generative Language API client. Primary provider: the grading
/// pipeline and the tutor both default to it.
#[derive(Clone)]
pub struct GeminiProvider {
    api_key: String,
    client: Client,
    base_url: String,
    model: String,
    embedding_model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String) -> Self {
        let config = ProviderConfig::from_env("gemini");

        Self {
            api_key,
            client: Client::new(),
            base_url: config.api_url,
            model: config.model,
            embedding_model: config.embedding_model,
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow!("GEMINI_API_KEY not set"))?;
        Ok(Self::new(api_key))
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self.client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "contents": [{
                    "role": "user",
                    "parts": [{ "text": prompt }]
                }],
                "generationConfig": {
                    "temperature": temperature
                }
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!("Gemini request failed: Status {}, Body: {}", status, error_text));
        }

        let response_json: Value = response.json().await?;

        if let Some(error) = response_json.get("error") {
            return Err(anyhow!("Gemini returned error: {}", error));
        }

        response_json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("Invalid Gemini response format"))
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/models/{}:embedContent", self.base_url, self.embedding_model);

        let response = self.client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "model": format!("models/{}", self.embedding_model),
                "content": {
                    "parts": [{ "text": text }]
                }
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!("Gemini embedding failed: Status {}, Body: {}", status, error_text));
        }

        let response_json: Value = response.json().await?;

        let values = response_json["embedding"]["values"]
            .as_array()
            .ok_or_else(|| anyhow!("Invalid embedding response format"))?;

        let embedding: Vec<f32> = values.iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect();

        if embedding.len() != GEMINI_EMBEDDING_DIM as usize {
            return Err(anyhow!(
                "Embedding has wrong size: {} (expected {})",
                embedding.len(),
                GEMINI_EMBEDDING_DIM
            ));
        }

        Ok(embedding)
    }

    fn embedding_dim(&self) -> u64 {
        GEMINI_EMBEDDING_DIM
    }

    async fn model_info(&self) -> Result<String> {
        Ok(self.model.clone())
    }

    fn clone_box(&self) -> Box<dyn CompletionProvider + Send + Sync> {
        Box::new(self.clone())
    }
}
