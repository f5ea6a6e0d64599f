use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Maximum number of cached entries per media kind.
/// Limits disk usage while keeping a full plan's worth of media resident.
const MAX_MEDIA_CACHE_ENTRIES: usize = 512;

/// Media kinds are cached in parallel maps: images are prefetched eagerly
/// after every fetch, videos only on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Default)]
struct KindCache {
    entries: HashMap<String, PathBuf>,
    /// Tracks keys in insertion order (oldest first) for eviction
    order: Vec<String>,
}

/// URL-to-file cache for plan media.
///
/// The index is in-memory only and starts empty each session; the files
/// themselves live under the media directory and are simply overwritten
/// when a URL is downloaded again.
pub struct MediaCache {
    media_dir: PathBuf,
    capacity: usize,
    images: Mutex<KindCache>,
    videos: Mutex<KindCache>,
}

impl MediaCache {
    pub fn new(media_dir: PathBuf) -> Result<Self> {
        Self::with_capacity(media_dir, MAX_MEDIA_CACHE_ENTRIES)
    }

    pub fn with_capacity(media_dir: PathBuf, capacity: usize) -> Result<Self> {
        std::fs::create_dir_all(&media_dir)?;
        Ok(Self {
            media_dir,
            capacity,
            images: Mutex::new(KindCache::default()),
            videos: Mutex::new(KindCache::default()),
        })
    }

    pub fn contains(&self, url: &str, kind: MediaKind) -> bool {
        self.kind_cache(kind).entries.contains_key(url)
    }

    /// Local file for a cached URL, if present
    pub fn cached_path(&self, url: &str, kind: MediaKind) -> Option<PathBuf> {
        self.kind_cache(kind).entries.get(url).cloned()
    }

    /// The subset of `urls` not yet cached, deduplicated in input order
    pub fn uncached(&self, urls: &[String], kind: MediaKind) -> Vec<String> {
        let cache = self.kind_cache(kind);
        let mut seen = std::collections::HashSet::new();
        urls.iter()
            .filter(|u| !u.is_empty())
            .filter(|u| !cache.entries.contains_key(u.as_str()))
            .filter(|u| seen.insert(u.as_str()))
            .cloned()
            .collect()
    }

    /// Write downloaded bytes to disk and record the URL as cached
    pub fn store(&self, url: &str, kind: MediaKind, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.media_dir.join(file_name_for(url));
        std::fs::write(&path, bytes)?;

        let mut cache = self.kind_cache(kind);

        // Evict oldest entries if cache is at capacity
        if cache.entries.len() >= self.capacity && !cache.entries.contains_key(url) {
            let evict_count = self.capacity / 2;
            let drain_end = evict_count.min(cache.order.len());
            let to_remove: Vec<_> = cache.order.drain(..drain_end).collect();
            for key in &to_remove {
                if let Some(stale) = cache.entries.remove(key) {
                    let _ = std::fs::remove_file(stale);
                }
            }
            debug!(evicted = to_remove.len(), "Evicted oldest media cache entries");
        }

        if let Some(pos) = cache.order.iter().position(|k| k == url) {
            cache.order.remove(pos);
        }
        cache.order.push(url.to_string());
        cache.entries.insert(url.to_string(), path.clone());

        Ok(path)
    }

    pub fn len(&self, kind: MediaKind) -> usize {
        self.kind_cache(kind).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len(MediaKind::Image) == 0 && self.len(MediaKind::Video) == 0
    }

    /// Drop every entry and best-effort delete the backing files
    pub fn clear(&self) {
        for kind in [MediaKind::Image, MediaKind::Video] {
            let mut cache = self.kind_cache(kind);
            for path in cache.entries.values() {
                let _ = std::fs::remove_file(path);
            }
            cache.entries.clear();
            cache.order.clear();
        }
    }

    fn kind_cache(&self, kind: MediaKind) -> MutexGuard<'_, KindCache> {
        let lock = match kind {
            MediaKind::Image => &self.images,
            MediaKind::Video => &self.videos,
        };
        lock.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Digest the URL into a stable file name, keeping a recognizable extension
fn file_name_for(url: &str) -> String {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    match url.rsplit('.').next() {
        Some(ext) if ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            format!("{}.{}", digest, ext)
        }
        _ => digest,
    }
}

// ============================================================================
// Tests
// ============================================================================
