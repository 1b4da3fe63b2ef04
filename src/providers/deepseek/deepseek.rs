use async_trait::async_trait;
use anyhow::{Result, anyhow};
use crate::config::ProviderConfig;
use crate::providers::traits::CompletionProvider;
use reqwest::Client;
use serde_json::{json, Value};

/// Alternate chat provider. DeepSeek has no embeddings endpoint, so it can
/// grade essays but cannot back the RAG collection.
#[derive(Clone)]
pub struct DeepSeekProvider {
    api_key: String,
    client: Client,
    api_url: String,
    model: String,
}

impl DeepSeekProvider {
    pub fn new(api_key: String) -> Self {
        let config = ProviderConfig::from_env("deepseek");

        Self {
            api_key,
            client: Client::new(),
            api_url: config.api_url,
            model: config.model,
        }
    }
}

#[async_trait]
impl CompletionProvider for DeepSeekProvider {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
        let response = self.client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": self.model,
                "messages": [
                    {
                        "role": "user",
                        "content": prompt
                    }
                ],
                "temperature": temperature
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!("DeepSeek request failed: Status {}, Body: {}", status, error_text));
        }

        let response_json: Value = response.json().await?;

        if let Some(error) = response_json.get("error") {
            return Err(anyhow!("DeepSeek returned error: {}", error));
        }

        response_json
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                let debug_json = serde_json::to_string_pretty(&response_json).unwrap_or_default();
                anyhow!("Invalid DeepSeek response format. Response JSON: {}", debug_json)
            })
    }

    async fn generate_embedding(&self, _text: &str) -> Result<Vec<f32>> {
        Err(anyhow!("DeepSeek does not expose an embeddings endpoint; use Gemini or OpenAI for the RAG pipeline"))
    }

    fn embedding_dim(&self) -> u64 {
        0
    }

    async fn model_info(&self) -> Result<String> {
        Ok(self.model.clone())
    }

    fn clone_box(&self) -> Box<dyn CompletionProvider + Send + Sync> {
        Box::new(self.clone())
    }
}
