pub mod database;
pub mod qdrant_config;
pub mod vector_db;

pub use database::{CorrectionRecord, Database, DatabaseError, DocumentRecord};
pub use vector_db::{ChunkRecord, ScoredChunk, VectorDB, VectorDBError};
