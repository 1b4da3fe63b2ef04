use async_trait::async_trait;
use anyhow::Result;

/// Seam between the grading/RAG pipelines and the hosted LLM APIs.
///
/// `complete` takes the temperature per call: essay correction runs cold
/// (0.1) while the tutor answers run slightly warmer (0.3).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String>;

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>>;

    /// Dimension of the vectors returned by `generate_embedding`. The RAG
    /// collection is created with this size, so it must stay stable for the
    /// lifetime of the stored data.
    fn embedding_dim(&self) -> u64;

    async fn model_info(&self) -> Result<String>;

    fn clone_box(&self) -> Box<dyn CompletionProvider + Send + Sync>;
}

impl Clone for Box<dyn CompletionProvider + Send + Sync> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
