use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task;
use tracing::{debug, info, warn};

use crate::backend::{RasterBackend, default_backend};
use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::render::cache::{CacheCounters, PageKey, RenderCache, RenderedPage, ThumbKey};
use crate::render::registry::{DocumentId, DocumentInfo, DocumentRegistry, SharedDocument};
use crate::search::{HighlightBox, resolve_highlights};

/// The render coordinator: owns the document registry and both render
/// caches, and drives the rasterization capability on cache misses.
///
/// Each mapping sits behind its own mutex; locks are never held across an
/// await point, so a slow render does not block unrelated lookups.
pub struct RenderEngine {
    backend: Arc<dyn RasterBackend>,
    registry: Mutex<DocumentRegistry>,
    page_cache: Mutex<RenderCache<PageKey>>,
    thumbnail_cache: Mutex<RenderCache<ThumbKey>>,
    config: Config,
}

impl RenderEngine {
    pub fn new(backend: Arc<dyn RasterBackend>, config: Config) -> Self {
        Self {
            backend,
            registry: Mutex::new(DocumentRegistry::new()),
            page_cache: Mutex::new(RenderCache::new(config.cache.page_max_entries)),
            thumbnail_cache: Mutex::new(RenderCache::new(config.cache.thumbnail_max_entries)),
            config,
        }
    }

    pub fn with_default_backend(config: Config) -> Self {
        Self::new(default_backend(), config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Decodes `bytes` and registers the document under a fresh identifier.
    pub async fn load_document(
        &self,
        display_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> EngineResult<DocumentInfo> {
        let backend = Arc::clone(&self.backend);
        let bytes = Arc::new(bytes);
        let document = task::spawn_blocking(move || backend.decode(bytes))
            .await
            .map_err(|err| EngineError::decode(format!("decode task failed: {err}")))??;

        let info = self.registry.lock().insert(display_name, document);
        info!(
            id = %info.id,
            name = %info.display_name,
            pages = info.page_count,
            "document loaded"
        );
        Ok(info)
    }

    pub fn document(&self, id: DocumentId) -> Option<DocumentInfo> {
        self.registry.lock().get(id).map(|handle| handle.info())
    }

    /// Renders one page at `scale`, serving from the page cache when the
    /// exact (document, page, scale) triple was rendered before. A miss
    /// performs exactly one render and one text extraction.
    pub async fn render_page(
        &self,
        id: DocumentId,
        page_number: u32,
        scale: f32,
    ) -> EngineResult<RenderedPage> {
        // Scale validation comes before the key is built: key quantization
        // collapses every non-positive scale onto one bucket, and a lookup
        // with a rejected scale must never alias a legitimate entry.
        self.validate_scale(scale)?;
        let key = PageKey::new(id, page_number, scale);
        if let Some(page) = self.page_cache.lock().get(&key) {
            debug!(%id, page_number, scale, "page cache hit");
            return Ok(page);
        }
        debug!(%id, page_number, scale, "page cache miss");

        let (document, page_count) = self.resolve_document(id)?;
        self.validate_page(id, page_number, page_count)?;

        let rendered = render_blocking(document, page_number, scale, true).await?;

        // A document removed while the render was in flight must not
        // reappear in the cache; the computed result is still returned.
        // The registry lock is held across the insert so a concurrent
        // removal cannot land between the check and the insert.
        {
            let registry = self.registry.lock();
            if registry.contains(id) {
                self.page_cache.lock().insert(key, rendered.clone());
            }
        }
        Ok(rendered)
    }

    /// Renders a low-resolution thumbnail at the configured fixed scale.
    /// Thumbnails skip text extraction.
    pub async fn thumbnail(&self, id: DocumentId, page_number: u32) -> EngineResult<RenderedPage> {
        let key = ThumbKey::new(id, page_number);
        if let Some(page) = self.thumbnail_cache.lock().get(&key) {
            debug!(%id, page_number, "thumbnail cache hit");
            return Ok(page);
        }
        debug!(%id, page_number, "thumbnail cache miss");

        let scale = self.config.render.thumbnail_scale;
        let (document, page_count) = self.resolve_document(id)?;
        self.validate_page(id, page_number, page_count)?;

        let rendered = render_blocking(document, page_number, scale, false).await?;

        {
            let registry = self.registry.lock();
            if registry.contains(id) {
                self.thumbnail_cache.lock().insert(key, rendered.clone());
            }
        }
        Ok(rendered)
    }

    /// Renders the page (cache-aware) and resolves `query` into highlight
    /// boxes in top-left screen coordinates.
    pub async fn search_page(
        &self,
        id: DocumentId,
        page_number: u32,
        scale: f32,
        query: &str,
    ) -> EngineResult<Vec<HighlightBox>> {
        let page = self.render_page(id, page_number, scale).await?;
        Ok(resolve_highlights(
            &page.fragments,
            query,
            page.frame.height as f32,
        ))
    }

    /// Drops the document and purges every cache entry derived from it.
    /// Idempotent.
    pub fn remove_document(&self, id: DocumentId) {
        let removed = self.registry.lock().remove(id);
        self.page_cache.lock().purge_document(id);
        self.thumbnail_cache.lock().purge_document(id);
        if removed {
            info!(%id, "document removed");
        }
    }

    /// Bounds memory explicitly: keeps the `keep_recent` most recently
    /// inserted entries in each cache.
    pub fn trim_cache(&self, keep_recent: usize) {
        self.page_cache.lock().evict_except(keep_recent);
        self.thumbnail_cache.lock().evict_except(keep_recent);
        debug!(keep_recent, "render caches trimmed");
    }

    /// Trims both caches to the configured keep-count.
    pub fn trim_cache_default(&self) {
        self.trim_cache(self.config.cache.trim_keep_recent);
    }

    pub fn cached_page_entries(&self) -> usize {
        self.page_cache.lock().len()
    }

    pub fn cached_thumbnail_entries(&self) -> usize {
        self.thumbnail_cache.lock().len()
    }

    pub fn page_cache_counters(&self) -> CacheCounters {
        self.page_cache.lock().counters()
    }

    pub fn thumbnail_cache_counters(&self) -> CacheCounters {
        self.thumbnail_cache.lock().counters()
    }

    fn resolve_document(&self, id: DocumentId) -> EngineResult<(SharedDocument, u32)> {
        let registry = self.registry.lock();
        let handle = registry
            .get(id)
            .ok_or(EngineError::DocumentNotFound(id))?;
        Ok((Arc::clone(&handle.document), handle.page_count))
    }

    fn validate_page(&self, id: DocumentId, page_number: u32, page_count: u32) -> EngineResult<()> {
        if page_number == 0 || page_number > page_count {
            // Callers are expected to clamp navigation; reaching this is a
            // caller bug worth logging.
            warn!(%id, page_number, page_count, "page request out of range");
            return Err(EngineError::page_out_of_range(page_number, page_count));
        }
        Ok(())
    }

    fn validate_scale(&self, scale: f32) -> EngineResult<()> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(EngineError::invalid_argument(
                "scale must be a positive finite value",
            ));
        }
        if scale > self.config.render.max_render_scale {
            return Err(EngineError::invalid_argument(format!(
                "scale {scale} exceeds configured maximum {}",
                self.config.render.max_render_scale
            )));
        }
        Ok(())
    }
}

async fn render_blocking(
    document: SharedDocument,
    page_number: u32,
    scale: f32,
    extract: bool,
) -> EngineResult<RenderedPage> {
    task::spawn_blocking(move || {
        let document = document.lock();
        let frame = document.render_page(page_number, scale)?;
        let fragments = if extract {
            document.extract_text(page_number)?
        } else {
            Vec::new()
        };
        Ok(RenderedPage {
            page_number,
            frame,
            fragments: fragments.into(),
        })
    })
    .await
    .map_err(|err| EngineError::render(page_number, err))?
}
