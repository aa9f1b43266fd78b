use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use crate::backend::{RgbaFrame, TextFragment};
use crate::render::registry::DocumentId;

/// One fully rendered page: pixel buffer plus the ordered text fragments
/// extracted for it. Thumbnail entries carry an empty fragment list.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub page_number: u32,
    pub frame: RgbaFrame,
    pub fragments: Arc<[TextFragment]>,
}

impl RenderedPage {
    pub fn byte_len(&self) -> usize {
        self.frame.byte_len()
    }
}

/// Cache keys carry the document they belong to so a whole document can be
/// purged.
pub trait DocScopedKey: Hash + Eq + Copy {
    fn document_id(&self) -> DocumentId;
}

/// Key for full-page renders. The scale is quantized to milli-units so the
/// key stays hashable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub document: DocumentId,
    pub page_number: u32,
    pub scale_milli: u32,
}

impl PageKey {
    pub fn new(document: DocumentId, page_number: u32, scale: f32) -> Self {
        Self {
            document,
            page_number,
            scale_milli: (scale.max(0.0) * 1000.0).round() as u32,
        }
    }
}

impl DocScopedKey for PageKey {
    fn document_id(&self) -> DocumentId {
        self.document
    }
}

/// Key for thumbnails; the thumbnail scale is fixed, so it is not part of
/// the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThumbKey {
    pub document: DocumentId,
    pub page_number: u32,
}

impl ThumbKey {
    pub fn new(document: DocumentId, page_number: u32) -> Self {
        Self {
            document,
            page_number,
        }
    }
}

impl DocScopedKey for ThumbKey {
    fn document_id(&self) -> DocumentId {
        self.document
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Bounded render cache with insertion-order retention: reads go through
/// `peek`, so re-fetching an entry never renews its position, and replacing
/// a key counts as a fresh insertion.
pub struct RenderCache<K: DocScopedKey> {
    max_entries: usize,
    memory_bytes: usize,
    entries: LruCache<K, RenderedPage>,
    counters: CacheCounters,
}

impl<K: DocScopedKey> RenderCache<K> {
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            max_entries,
            memory_bytes: 0,
            entries: LruCache::new(
                NonZeroUsize::new(max_entries).expect("max entries is non-zero"),
            ),
            counters: CacheCounters::default(),
        }
    }

    pub fn get(&mut self, key: &K) -> Option<RenderedPage> {
        match self.entries.peek(key) {
            Some(page) => {
                self.counters.hits += 1;
                Some(page.clone())
            }
            None => {
                self.counters.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: K, page: RenderedPage) {
        if let Some(prev) = self.entries.pop(&key) {
            self.memory_bytes = self.memory_bytes.saturating_sub(prev.byte_len());
        }
        if self.entries.len() >= self.max_entries
            && let Some((_key, evicted)) = self.entries.pop_lru()
        {
            self.memory_bytes = self.memory_bytes.saturating_sub(evicted.byte_len());
            self.counters.evictions += 1;
        }

        self.memory_bytes += page.byte_len();
        self.entries.put(key, page);
    }

    /// Retains the `keep_count` most recently inserted entries and removes
    /// the rest, oldest insertion first.
    pub fn evict_except(&mut self, keep_count: usize) {
        while self.entries.len() > keep_count {
            let Some((_key, evicted)) = self.entries.pop_lru() else {
                break;
            };
            self.memory_bytes = self.memory_bytes.saturating_sub(evicted.byte_len());
            self.counters.evictions += 1;
        }
    }

    /// Removes every entry belonging to `document`.
    pub fn purge_document(&mut self, document: DocumentId) {
        let doomed: Vec<K> = self
            .entries
            .iter()
            .filter_map(|(key, _)| (key.document_id() == document).then_some(*key))
            .collect();

        for key in doomed {
            if let Some(evicted) = self.entries.pop(&key) {
                self.memory_bytes = self.memory_bytes.saturating_sub(evicted.byte_len());
                self.counters.evictions += 1;
            }
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.peek(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn memory_bytes(&self) -> usize {
        self.memory_bytes
    }

    pub fn counters(&self) -> CacheCounters {
        self.counters
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::backend::RgbaFrame;
    use crate::render::registry::DocumentId;

    use super::{PageKey, RenderCache, RenderedPage, ThumbKey};

    fn page(page_number: u32, side: u32) -> RenderedPage {
        let pixels = vec![page_number as u8; side as usize * side as usize * 4];
        RenderedPage {
            page_number,
            frame: RgbaFrame {
                width: side,
                height: side,
                pixels: pixels.into(),
            },
            fragments: Arc::from(Vec::new()),
        }
    }

    #[test]
    fn get_counts_hits_and_misses() {
        let doc = DocumentId::generate();
        let mut cache = RenderCache::new(4);
        cache.insert(PageKey::new(doc, 1, 1.0), page(1, 4));

        assert!(cache.get(&PageKey::new(doc, 1, 1.0)).is_some());
        assert!(cache.get(&PageKey::new(doc, 2, 1.0)).is_none());

        let counters = cache.counters();
        assert_eq!(counters.hits, 1);
        assert_eq!(counters.misses, 1);
    }

    #[test]
    fn evict_except_keeps_most_recent_insertions() {
        let doc = DocumentId::generate();
        let mut cache = RenderCache::new(8);
        for number in 1..=5 {
            cache.insert(PageKey::new(doc, number, 1.0), page(number, 4));
        }

        cache.evict_except(2);

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&PageKey::new(doc, 4, 1.0)));
        assert!(cache.contains(&PageKey::new(doc, 5, 1.0)));
        assert!(!cache.contains(&PageKey::new(doc, 1, 1.0)));
    }

    #[test]
    fn evict_except_with_large_keep_count_is_a_no_op() {
        let doc = DocumentId::generate();
        let mut cache = RenderCache::new(8);
        cache.insert(PageKey::new(doc, 1, 1.0), page(1, 4));

        cache.evict_except(10);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn reads_do_not_renew_retention_position() {
        let doc = DocumentId::generate();
        let mut cache = RenderCache::new(3);
        for number in 1..=3 {
            cache.insert(PageKey::new(doc, number, 1.0), page(number, 4));
        }

        // A hit on the oldest entry must not protect it from eviction.
        assert!(cache.get(&PageKey::new(doc, 1, 1.0)).is_some());
        cache.insert(PageKey::new(doc, 4, 1.0), page(4, 4));

        assert!(!cache.contains(&PageKey::new(doc, 1, 1.0)));
        assert!(cache.contains(&PageKey::new(doc, 2, 1.0)));
        assert!(cache.contains(&PageKey::new(doc, 4, 1.0)));
    }

    #[test]
    fn replacing_a_key_does_not_double_count_memory() {
        let doc = DocumentId::generate();
        let mut cache = RenderCache::new(4);
        let key = PageKey::new(doc, 1, 1.0);
        cache.insert(key, page(1, 4));
        cache.insert(key, page(1, 8));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.memory_bytes(), page(1, 8).byte_len());
    }

    #[test]
    fn purge_document_removes_only_that_document() {
        let kept_doc = DocumentId::generate();
        let purged_doc = DocumentId::generate();
        let mut cache = RenderCache::new(8);
        cache.insert(ThumbKey::new(purged_doc, 1), page(1, 4));
        cache.insert(ThumbKey::new(purged_doc, 2), page(2, 4));
        cache.insert(ThumbKey::new(kept_doc, 1), page(1, 4));

        cache.purge_document(purged_doc);

        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&ThumbKey::new(kept_doc, 1)));
        assert_eq!(cache.memory_bytes(), page(1, 4).byte_len());
    }

    #[test]
    fn insert_at_capacity_evicts_oldest_insertion() {
        let doc = DocumentId::generate();
        let mut cache = RenderCache::new(2);
        cache.insert(PageKey::new(doc, 1, 1.0), page(1, 4));
        cache.insert(PageKey::new(doc, 2, 1.0), page(2, 4));
        cache.insert(PageKey::new(doc, 3, 1.0), page(3, 4));

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&PageKey::new(doc, 1, 1.0)));
        assert_eq!(cache.counters().evictions, 1);
    }
}
