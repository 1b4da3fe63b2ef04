pub mod chunker;
pub mod engine;
pub mod extractor;

pub use chunker::DocumentChunker;
pub use engine::{RagEngine, RagError};
pub use extractor::{extract_text, ExtractError};
