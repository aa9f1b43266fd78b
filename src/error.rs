use crate::render::registry::DocumentId;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("failed to decode document: {0}")]
    Decode(String),
    #[error("document not found: {0}")]
    DocumentNotFound(DocumentId),
    #[error("page {page} is out of range 1..={page_count}")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("render failed for page {page}")]
    Render {
        page: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<std::io::Error> for EngineError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            context: "I/O operation failed".to_string(),
        }
    }
}

impl EngineError {
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn page_out_of_range(page: u32, page_count: u32) -> Self {
        Self::PageOutOfRange { page, page_count }
    }

    pub fn render(page: u32, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Render {
            page,
            source: Box::new(source),
        }
    }

    pub fn render_message(page: u32, message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::Render {
            page,
            source: message.into(),
        }
    }

    pub fn io_with_context(source: std::io::Error, context: impl Into<String>) -> Self {
        Self::Io {
            source,
            context: context.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::EngineError;

    #[test]
    fn render_error_wraps_page_and_source() {
        let err = EngineError::render(7, EngineError::decode("bad page stream"));
        assert!(matches!(err, EngineError::Render { page: 7, .. }));
        assert_eq!(err.to_string(), "render failed for page 7");
    }

    #[test]
    fn page_out_of_range_reports_valid_bounds() {
        let err = EngineError::page_out_of_range(0, 12);
        assert_eq!(err.to_string(), "page 0 is out of range 1..=12");
    }
}
