//! On-disk record shapes (SPEC_FULL.md §6.3): one `schema: 1` version tag per record, three
//! logical collections (`libraries`, `documents`, `chunks`). These are plain serde DTOs,
//! kept separate from the entity types in `crate::model` so a future schema bump only
//! touches the conversion functions here.

use serde::{Deserialize, Serialize};

use crate::model::{Chunk, Document, IndexParams, Library};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryRecord {
    pub schema: u32,
    pub id: String,
    pub name: String,
    pub dims: usize,
    pub index_params: IndexParams,
    pub metadata: crate::model::Metadata,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Library> for LibraryRecord {
    fn from(l: &Library) -> Self {
        LibraryRecord {
            schema: SCHEMA_VERSION,
            id: l.id.clone(),
            name: l.name.clone(),
            dims: l.dims,
            index_params: l.index_params.clone(),
            metadata: l.metadata.clone(),
            created_at: l.created_at,
            updated_at: l.updated_at,
        }
    }
}

impl From<LibraryRecord> for Library {
    fn from(r: LibraryRecord) -> Self {
        Library {
            id: r.id,
            name: r.name,
            dims: r.dims,
            index_kind: r.index_params.kind(),
            index_params: r.index_params,
            metadata: r.metadata,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub schema: u32,
    pub id: String,
    pub library_id: String,
    pub title: String,
    pub metadata: crate::model::Metadata,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Document> for DocumentRecord {
    fn from(d: &Document) -> Self {
        DocumentRecord {
            schema: SCHEMA_VERSION,
            id: d.id.clone(),
            library_id: d.library_id.clone(),
            title: d.title.clone(),
            metadata: d.metadata.clone(),
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

impl From<DocumentRecord> for Document {
    fn from(r: DocumentRecord) -> Self {
        Document {
            id: r.id,
            library_id: r.library_id,
            title: r.title,
            metadata: r.metadata,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub schema: u32,
    pub id: String,
    pub library_id: String,
    pub document_id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: crate::model::Metadata,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Chunk> for ChunkRecord {
    fn from(c: &Chunk) -> Self {
        ChunkRecord {
            schema: SCHEMA_VERSION,
            id: c.id.clone(),
            library_id: c.library_id.clone(),
            document_id: c.document_id.clone(),
            text: c.text.clone(),
            embedding: c.embedding.clone(),
            metadata: c.metadata.clone(),
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

impl From<ChunkRecord> for Chunk {
    fn from(r: ChunkRecord) -> Self {
        Chunk {
            id: r.id,
            library_id: r.library_id,
            document_id: r.document_id,
            text: r.text,
            embedding: r.embedding,
            metadata: r.metadata,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
