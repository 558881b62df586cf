//! In-memory art entries, owned by the render thread.
//!
//! Access recency is a logical clock rather than wall time so two touches in
//! the same instant still order deterministically.

use crate::core::gfx::TextureBackend;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtStatus {
    Absent,
    Queued,
    Loaded,
    Failed,
}

#[derive(Debug)]
pub struct CacheEntry<T> {
    pub texture: Option<T>,
    pub blurred: Option<T>,
    pub loaded: bool,
    pub queued: bool,
    pub failed: bool,
    pub generation: u64,
    pub last_access: u64,
}

impl<T> CacheEntry<T> {
    fn queued(generation: u64) -> Self {
        Self {
            texture: None,
            blurred: None,
            loaded: false,
            queued: true,
            failed: false,
            generation,
            last_access: 0,
        }
    }

    /// Holds GPU resources.
    #[inline(always)]
    pub fn is_resident(&self) -> bool {
        self.texture.is_some()
    }

    pub fn status(&self) -> ArtStatus {
        if self.queued {
            ArtStatus::Queued
        } else if self.loaded {
            ArtStatus::Loaded
        } else if self.failed {
            ArtStatus::Failed
        } else {
            ArtStatus::Absent
        }
    }

    /// Releases both textures. Handles are always cleared before `loaded`.
    pub fn destroy<B: TextureBackend<Texture = T>>(&mut self, backend: &mut B) {
        if let Some(tex) = self.texture.take() {
            backend.destroy_texture(tex);
        }
        if let Some(tex) = self.blurred.take() {
            backend.destroy_texture(tex);
        }
        self.loaded = false;
    }
}

pub struct EntryCache<T> {
    entries: FxHashMap<String, CacheEntry<T>>,
    clock: u64,
    max_resident: usize,
}

impl<T> EntryCache<T> {
    /// `max_resident == 0` disables the ceiling.
    pub fn new(max_resident: usize) -> Self {
        Self {
            entries: FxHashMap::default(),
            clock: 0,
            max_resident,
        }
    }

    pub const fn max_resident(&self) -> usize {
        self.max_resident
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry<T>> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut CacheEntry<T>> {
        self.entries.get_mut(key)
    }

    pub fn status(&self, key: &str) -> ArtStatus {
        self.entries
            .get(key)
            .map_or(ArtStatus::Absent, CacheEntry::status)
    }

    /// Creates a fresh queued entry, replacing any previous one.
    pub fn insert_queued(&mut self, key: &str, generation: u64) {
        self.entries
            .insert(key.to_string(), CacheEntry::queued(generation));
    }

    pub fn remove(&mut self, key: &str) -> Option<CacheEntry<T>> {
        self.entries.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn drain(&mut self) -> impl Iterator<Item = (String, CacheEntry<T>)> + '_ {
        self.entries.drain()
    }

    /// Advances the clock and stamps `key` with it.
    pub fn touch(&mut self, key: &str) {
        self.clock += 1;
        let now = self.clock;
        if let Some(entry) = self.entries.get_mut(key) {
            entry.last_access = now;
        }
    }

    pub fn resident_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_resident()).count()
    }

    /// True when materializing one more texture-holding entry would break the
    /// ceiling.
    pub fn at_capacity(&self) -> bool {
        self.max_resident > 0 && self.resident_count() >= self.max_resident
    }

    /// Least recently accessed entry that holds textures, other than `except`.
    pub fn lru_resident(&self, except: &str) -> Option<String> {
        self.entries
            .iter()
            .filter(|(k, e)| e.is_resident() && k.as_str() != except)
            .min_by_key(|(_, e)| e.last_access)
            .map(|(k, _)| k.clone())
    }
}
