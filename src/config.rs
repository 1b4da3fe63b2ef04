use std::env;

/// Per-provider settings resolved from the environment, with defaults
/// matching the hosted endpoints.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub model: String,
    pub embedding_model: String,
    pub api_url: String,
}

impl ProviderConfig {
    pub fn from_env(provider: &str) -> Self {
        let prefix = provider.to_uppercase();

        let model = env::var(format!("{}_MODEL", prefix))
            .unwrap_or_else(|_| match provider {
                "gemini" => "gemini-2.5-pro".to_string(),
                "openai" => "gpt-4-turbo-preview".to_string(),
                "deepseek" => "deepseek-chat".to_string(),
                _ => String::new(),
            });

        let embedding_model = env::var(format!("{}_EMBEDDING_MODEL", prefix))
            .unwrap_or_else(|_| match provider {
                "gemini" => "embedding-001".to_string(),
                "openai" => "text-embedding-3-small".to_string(),
                _ => String::new(),
            });

        let api_url = env::var(format!("{}_API_URL", prefix))
            .unwrap_or_else(|_| match provider {
                "gemini" => "https://generativelanguage.googleapis.com/v1beta".to_string(),
                "openai" => "https://api.openai.com/v1".to_string(),
                "deepseek" => "https://api.deepseek.com/v1/chat/completions".to_string(),
                _ => String::new(),
            });

        Self {
            model,
            embedding_model,
            api_url,
        }
    }
}

/// Service-wide settings: storage endpoints, grading temperatures and the
/// chunking knobs used by the RAG pipeline.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub qdrant_url: String,
    pub collection_name: String,
    pub sqlite_path: String,
    pub grading_temperature: f32,
    pub tutor_temperature: f32,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub search_limit: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            qdrant_url: env::var("QDRANT_URL")
                .unwrap_or_else(|_| "http://localhost:6333".to_string()),
            collection_name: env::var("RAG_COLLECTION")
                .unwrap_or_else(|_| "documentos_estudo".to_string()),
            sqlite_path: env::var("SQLITE_PATH")
                .unwrap_or_else(|_| "data/corretor.db".to_string()),
            grading_temperature: env_f32("GRADING_TEMPERATURE", 0.1),
            tutor_temperature: env_f32("TUTOR_TEMPERATURE", 0.3),
            chunk_size: env_usize("CHUNK_SIZE", 1000),
            chunk_overlap: env_usize("CHUNK_OVERLAP", 100),
            search_limit: env::var("SEARCH_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_defaults() {
        let config = ProviderConfig::from_env("gemini");
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.embedding_model, "embedding-001");
        assert!(config.api_url.contains("generativelanguage.googleapis.com"));
    }

    #[test]
    fn test_unknown_provider_is_empty() {
        let config = ProviderConfig::from_env("nonexistent");
        assert!(config.model.is_empty());
        assert!(config.api_url.is_empty());
    }

    #[test]
    fn test_app_config_defaults() {
        let config = AppConfig::from_env();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 100);
        assert_eq!(config.search_limit, 5);
        assert!((config.grading_temperature - 0.1).abs() < f32::EPSILON);
    }
}
