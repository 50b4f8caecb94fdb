pub mod chunk;
pub mod chunker;
pub mod document;
pub mod reader;

pub use chunk::Chunk;
pub use chunker::{chunk, Chunker, ChunkerConfig};
pub use document::{DirectorySource, Document, DocumentScope, DocumentSource, InMemorySource};
pub use reader::FileReader;

use sha2::{Digest, Sha256};

/// Generate a stable document ID from file path
pub fn generate_doc_id(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// Chunk every document with one chunker, in document order.
pub fn chunk_documents(chunker: &Chunker, documents: &[Document]) -> Vec<Chunk> {
    documents
        .iter()
        .flat_map(|doc| chunker.chunk_document(doc))
        .collect()
}
