use chrono::Utc;
use tokio_rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use log::info;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
    #[error("Database connection error: {0}")]
    Connection(String),
}

/// One row of the correction history.
#[derive(Debug, Clone)]
pub struct CorrectionRecord {
    pub timestamp: String,
    pub formato: String,
    pub nota_final: f32,
    pub analise_geral: String,
    pub relatorio_json: String,
}

/// One uploaded study document registered after ingestion.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub timestamp: String,
    pub filename: String,
    pub chunks: i64,
}

/// SQLite store for correction history and the uploaded-document registry.
/// The vector data itself lives in Qdrant; this keeps the audit trail.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Connection>,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::Connection(e.to_string()))?;
            }
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        let db = Self {
            conn: Arc::new(conn),
        };
        db.initialize().await?;
        Ok(db)
    }

    async fn initialize(&self) -> Result<(), DatabaseError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS correcoes (
                        id INTEGER PRIMARY KEY,
                        timestamp TEXT NOT NULL,
                        formato TEXT NOT NULL,
                        nota_final REAL NOT NULL,
                        analise_geral TEXT NOT NULL,
                        texto TEXT NOT NULL,
                        relatorio TEXT NOT NULL
                    );
                    CREATE TABLE IF NOT EXISTS documentos (
                        id INTEGER PRIMARY KEY,
                        timestamp TEXT NOT NULL,
                        filename TEXT NOT NULL,
                        chunks INTEGER NOT NULL
                    );",
                )
            })
            .await?;

        info!("Database initialized successfully");
        Ok(())
    }

    pub async fn save_correction(
        &self,
        formato: String,
        nota_final: f32,
        analise_geral: String,
        texto: String,
        relatorio_json: String,
    ) -> Result<(), DatabaseError> {
        let timestamp = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO correcoes (timestamp, formato, nota_final, analise_geral, texto, relatorio)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    [
                        &timestamp,
                        &formato,
                        &nota_final.to_string(),
                        &analise_geral,
                        &texto,
                        &relatorio_json,
                    ],
                )
            })
            .await?;

        Ok(())
    }

    pub async fn recent_corrections(&self, limit: i64) -> Result<Vec<CorrectionRecord>, DatabaseError> {
        let result = self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT timestamp, formato, nota_final, analise_geral, relatorio
                     FROM correcoes
                     ORDER BY timestamp DESC
                     LIMIT ?",
                )?;

                let rows = stmt.query_map([limit], |row| {
                    Ok(CorrectionRecord {
                        timestamp: row.get::<_, String>(0)?,
                        formato: row.get::<_, String>(1)?,
                        nota_final: row.get::<_, f64>(2)? as f32,
                        analise_geral: row.get::<_, String>(3)?,
                        relatorio_json: row.get::<_, String>(4)?,
                    })
                })?;

                let mut corrections = Vec::new();
                for row in rows {
                    corrections.push(row?);
                }

                Ok(corrections)
            })
            .await?;

        Ok(result)
    }

    pub async fn register_document(
        &self,
        filename: String,
        chunks: i64,
    ) -> Result<(), DatabaseError> {
        let timestamp = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO documentos (timestamp, filename, chunks) VALUES (?1, ?2, ?3)",
                    [&timestamp, &filename, &chunks.to_string()],
                )
            })
            .await?;

        Ok(())
    }

    pub async fn list_documents(&self) -> Result<Vec<DocumentRecord>, DatabaseError> {
        let result = self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT timestamp, filename, chunks
                     FROM documentos
                     ORDER BY timestamp DESC",
                )?;

                let rows = stmt.query_map([], |row| {
                    Ok(DocumentRecord {
                        timestamp: row.get::<_, String>(0)?,
                        filename: row.get::<_, String>(1)?,
                        chunks: row.get::<_, i64>(2)?,
                    })
                })?;

                let mut documents = Vec::new();
                for row in rows {
                    documents.push(row?);
                }

                Ok(documents)
            })
            .await?;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_correction_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db")).await.unwrap();

        db.save_correction(
            "ENEM".to_string(),
            840.0,
            "Bom texto.".to_string(),
            "A redação...".to_string(),
            "{}".to_string(),
        )
        .await
        .unwrap();

        let history = db.recent_corrections(10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].formato, "ENEM");
        assert_eq!(history[0].nota_final, 840.0);
    }

    #[tokio::test]
    async fn test_document_registry() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db")).await.unwrap();

        db.register_document("apostila.pdf".to_string(), 42).await.unwrap();
        db.register_document("resumo.md".to_string(), 3).await.unwrap();

        let docs = db.list_documents().await.unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().any(|d| d.filename == "apostila.pdf" && d.chunks == 42));
    }

    #[tokio::test]
    async fn test_history_limit() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db")).await.unwrap();

        for i in 0..5 {
            db.save_correction(
                "UFSC".to_string(),
                7.5,
                format!("Análise {}", i),
                "Texto".to_string(),
                "{}".to_string(),
            )
            .await
            .unwrap();
        }

        let history = db.recent_corrections(3).await.unwrap();
        assert_eq!(history.len(), 3);
    }
}
