use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use thiserror::Error;

use crate::config::AppConfig;
use crate::database::vector_db::{ChunkRecord, ScoredChunk, VectorDB, VectorDBError};
use crate::providers::traits::CompletionProvider;
use crate::rag::chunker::DocumentChunker;
use crate::rag::extractor::{extract_text, ExtractError};

#[derive(Error, Debug)]
pub enum RagError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("Nenhum documento foi enviado ainda. Faça o upload primeiro.")]
    EmptyCollection,
    #[error("Erro ao processar o arquivo: {0}")]
    VectorDB(#[from] VectorDBError),
    #[error("Erro na API do modelo: {0}")]
    Provider(#[from] anyhow::Error),
}

/// Tutor prompt ported from the tutoring product: the retrieved chunks are
/// the model's only source of truth and the answer must be an HTML fragment.
const TUTOR_PROMPT: &str = r#"Persona: Você é um tutor de IA. Sua única função é ensinar usando apenas o conteúdo dos documentos fornecidos.

Regra Principal: Sua única fonte de verdade é o material fornecido. Não use nenhum conhecimento externo. Se a resposta não estiver no material, diga isso claramente, mas sempre dentro do formato HTML.

Formato de Saída OBRIGATÓRIO:
Sua resposta deve ser APENAS código HTML, sem nenhuma outra palavra ou texto antes ou depois. Use a seguinte estrutura:
Um div principal com a classe resposta-tutor para conter tudo.
Um cabeçalho <h3> para o título principal da explicação.
Parágrafos <p> para o texto explicativo.
Use <ul> e <li> para listas de itens ou passos.
Use <b> ou <strong> para destacar termos importantes.
Não inclua as tags <html> ou <body>. Comece diretamente com o div.

Exemplo de Resposta para uma Pergunta:

<div class="resposta-tutor">
    <h3>O Processo de Mitose</h3>
    <p>Com base no material, a mitose é um processo fundamental de <b>divisão celular</b> que resulta em duas células-filhas geneticamente idênticas.</p>
    <p>As etapas principais são:</p>
    <ul>
        <li><b>Prófase:</b> Os cromossomos se condensam.</li>
        <li><b>Metáfase:</b> Os cromossomos se alinham no centro.</li>
        <li><b>Anáfase:</b> As cromátides-irmãs são separadas.</li>
        <li><b>Telófase:</b> Formam-se novos núcleos.</li>
    </ul>
</div>

Exemplo de Resposta Quando a Informação Não é Encontrada:

<div class="resposta-tutor">
    <h3>Informação Não Encontrada</h3>
    <p>Consultei todo o material disponível, mas não encontrei uma resposta para a sua pergunta. O conteúdo aborda outros tópicos. Por favor, faça outra pergunta relacionada ao material.</p>
</div>

Contexto:
{contexto}

Pergunta do Usuário:
{pergunta}

Resposta concisa e direta:"#;

/// Orchestrates the two RAG flows: document ingestion (extract, chunk,
/// embed, upsert) and question answering (embed, retrieve, complete).
pub struct RagEngine {
    provider: Box<dyn CompletionProvider + Send + Sync>,
    vector_db: VectorDB,
    chunker: DocumentChunker,
    collection: String,
    search_limit: u64,
    temperature: f32,
    query_cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl RagEngine {
    /// Creates the engine and its Qdrant collection, sized to the embedding
    /// dimension of the provider that will populate it.
    pub async fn new(
        provider: Box<dyn CompletionProvider + Send + Sync>,
        vector_db: VectorDB,
        config: &AppConfig,
    ) -> Result<Self, RagError> {
        vector_db
            .ensure_collection(&config.collection_name, provider.embedding_dim())
            .await?;

        Ok(Self {
            provider,
            vector_db,
            chunker: DocumentChunker::new(config.chunk_size, config.chunk_overlap),
            collection: config.collection_name.clone(),
            search_limit: config.search_limit,
            temperature: config.tutor_temperature,
            query_cache: Mutex::new(LruCache::new(NonZeroUsize::new(100).unwrap())),
        })
    }

    /// Ingests one uploaded document. Returns how many chunks were stored.
    pub async fn ingest(&self, filename: &str, bytes: &[u8]) -> Result<usize, RagError> {
        let text = extract_text(filename, bytes)?;
        let chunks = self.chunker.chunk(&text);

        let mut records = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.into_iter().enumerate() {
            let embedding = self.provider.generate_embedding(&chunk).await?;
            records.push(ChunkRecord {
                text: chunk,
                source: filename.to_string(),
                chunk_index: index as i64,
                embedding,
            });
        }

        let stored = records.len();
        self.vector_db.upsert_chunks(&self.collection, records).await?;

        log::info!("Ingested {} chunks from {}", stored, filename);
        Ok(stored)
    }

    /// Answers a question from the stored material. Errors with
    /// `EmptyCollection` when nothing has been uploaded yet.
    pub async fn answer(&self, question: &str) -> Result<String, RagError> {
        if self.vector_db.count(&self.collection).await? == 0 {
            return Err(RagError::EmptyCollection);
        }

        let embedding = self.question_embedding(question).await?;
        let hits = self.vector_db
            .search_chunks(&self.collection, embedding, self.search_limit)
            .await?;

        let prompt = build_tutor_prompt(&hits, question);
        let answer = self.provider.complete(&prompt, self.temperature).await?;

        Ok(answer.trim().to_string())
    }

    /// Number of chunks currently stored.
    pub async fn stored_chunks(&self) -> Result<u64, RagError> {
        Ok(self.vector_db.count(&self.collection).await?)
    }

    /// Drops every chunk ingested from the given file.
    pub async fn remove_document(&self, filename: &str) -> Result<(), RagError> {
        self.vector_db.delete_by_source(&self.collection, filename).await?;
        Ok(())
    }

    /// Embeds the question, reusing cached vectors for repeated questions.
    async fn question_embedding(&self, question: &str) -> Result<Vec<f32>, RagError> {
        if let Ok(mut cache) = self.query_cache.lock() {
            if let Some(cached) = cache.get(question) {
                return Ok(cached.clone());
            }
        }

        let embedding = self.provider.generate_embedding(question).await?;

        if let Ok(mut cache) = self.query_cache.lock() {
            cache.put(question.to_string(), embedding.clone());
        }

        Ok(embedding)
    }
}

/// Fills the tutor template with the retrieved chunks and the question.
fn build_tutor_prompt(hits: &[ScoredChunk], question: &str) -> String {
    let contexto = hits
        .iter()
        .map(|hit| format!("[Fonte: {}]\n{}", hit.source, hit.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    TUTOR_PROMPT
        .replace("{contexto}", &contexto)
        .replace("{pergunta}", question)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(text: &str, source: &str) -> ScoredChunk {
        ScoredChunk {
            text: text.to_string(),
            source: source.to_string(),
            chunk_index: 0,
            score: 0.9,
        }
    }

    #[test]
    fn test_tutor_prompt_fills_placeholders() {
        let hits = vec![
            hit("A mitose é a divisão celular.", "biologia.pdf"),
            hit("A prófase é a primeira etapa.", "biologia.pdf"),
        ];

        let prompt = build_tutor_prompt(&hits, "O que é mitose?");

        assert!(!prompt.contains("{contexto}"));
        assert!(!prompt.contains("{pergunta}"));
        assert!(prompt.contains("A mitose é a divisão celular."));
        assert!(prompt.contains("[Fonte: biologia.pdf]"));
        assert!(prompt.contains("O que é mitose?"));
    }

    #[test]
    fn test_tutor_prompt_separates_chunks() {
        let hits = vec![hit("primeiro", "a.pdf"), hit("segundo", "b.md")];
        let prompt = build_tutor_prompt(&hits, "?");

        let first = prompt.find("primeiro").unwrap();
        let separator = prompt.find("\n\n---\n\n").unwrap();
        let second = prompt.find("segundo").unwrap();
        assert!(first < separator && separator < second);
    }

    #[test]
    fn test_tutor_prompt_keeps_html_contract() {
        let prompt = build_tutor_prompt(&[], "?");
        assert!(prompt.contains("resposta-tutor"));
        assert!(prompt.contains("APENAS código HTML"));
    }
}
