use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::backend::DecodedDocument;

/// Identifier of one loaded document, unique per load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub id: DocumentId,
    pub display_name: String,
    pub page_count: u32,
}

/// The decoded document shared with in-flight renders. Holding it behind a
/// mutex lets the registry drop its entry while a render on another thread
/// finishes with its own clone.
pub type SharedDocument = Arc<Mutex<Box<dyn DecodedDocument>>>;

pub struct DocumentHandle {
    pub id: DocumentId,
    pub display_name: String,
    pub page_count: u32,
    pub document: SharedDocument,
}

impl DocumentHandle {
    pub fn info(&self) -> DocumentInfo {
        DocumentInfo {
            id: self.id,
            display_name: self.display_name.clone(),
            page_count: self.page_count,
        }
    }
}

#[derive(Default)]
pub struct DocumentRegistry {
    documents: HashMap<DocumentId, DocumentHandle>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a freshly decoded document under a generated identifier.
    pub fn insert(
        &mut self,
        display_name: impl Into<String>,
        document: Box<dyn DecodedDocument>,
    ) -> DocumentInfo {
        let handle = DocumentHandle {
            id: DocumentId::generate(),
            display_name: display_name.into(),
            page_count: document.page_count(),
            document: Arc::new(Mutex::new(document)),
        };
        let info = handle.info();
        self.documents.insert(handle.id, handle);
        info
    }

    pub fn get(&self, id: DocumentId) -> Option<&DocumentHandle> {
        self.documents.get(&id)
    }

    pub fn contains(&self, id: DocumentId) -> bool {
        self.documents.contains_key(&id)
    }

    /// Drops the handle and its decoded resource. Removing an unknown id is
    /// a no-op.
    pub fn remove(&mut self, id: DocumentId) -> bool {
        self.documents.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
