//! Box art acquisition for the carousel.
//!
//! The render thread owns an [`ArtManager`]: it submits requests, polls
//! finished work once per frame, and is the only place textures are created
//! or destroyed. Workers see nothing but the task queue and hand back raw
//! surfaces through the completion queue.

use super::cache::{ArtStatus, EntryCache};
use super::disk::DiskCache;
use super::index::RemoteIndex;
use super::queue::{CompletionQueue, FetchResult, FetchTask, TaskQueue};
use super::worker::{ArtStats, StatsSnapshot, WorkerContext, WorkerPool};
use crate::config::Config;
use crate::core::gfx::{SamplerDesc, TextureBackend};
use crate::core::network::Fetch;
use image::{Rgba, RgbaImage};
use log::{debug, info, warn};
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

const PLACEHOLDER_W: u32 = 512;
const PLACEHOLDER_H: u32 = 357;
const PLACEHOLDER_RGBA: [u8; 4] = [40, 40, 50, 255];

/// What the renderer should draw for an item.
#[derive(Debug)]
pub enum Art<'a, T> {
    Ready(&'a T),
    Placeholder(&'a T),
}

impl<'a, T> Art<'a, T> {
    pub fn texture(&self) -> &'a T {
        match self {
            Self::Ready(t) | Self::Placeholder(t) => *t,
        }
    }

    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

pub struct ArtManager<B: TextureBackend> {
    entries: EntryCache<B::Texture>,
    placeholder: B::Texture,
    queue: Arc<TaskQueue>,
    completions: Arc<CompletionQueue>,
    ctx: Arc<WorkerContext>,
    pool: WorkerPool,
    uploads_per_frame: usize,
    sampler: SamplerDesc,
    next_generation: u64,
}

impl<B: TextureBackend> ArtManager<B> {
    pub fn new(cfg: &Config, fetch: Arc<dyn Fetch>, backend: &mut B) -> Result<Self, Box<dyn Error>> {
        Self::with_worker_count(cfg, fetch, backend, cfg.worker_count())
    }

    /// Fails if not a single worker thread could be started, since nothing
    /// submitted would ever settle.
    fn with_worker_count(
        cfg: &Config,
        fetch: Arc<dyn Fetch>,
        backend: &mut B,
        workers: usize,
    ) -> Result<Self, Box<dyn Error>> {
        let disk = DiskCache::new(&cfg.cache_dir, cfg.min_file_bytes);
        if let Err(e) = disk.ensure_dir() {
            warn!(
                "Failed to create art cache directory '{}': {e}",
                disk.dir().display()
            );
        }

        let placeholder_img = RgbaImage::from_pixel(
            PLACEHOLDER_W,
            PLACEHOLDER_H,
            Rgba(PLACEHOLDER_RGBA),
        );
        let sampler = SamplerDesc::default();
        let placeholder = backend.create_texture(&placeholder_img, sampler)?;

        let ctx = Arc::new(WorkerContext {
            disk,
            index: RemoteIndex::new(cfg.base_url.clone()),
            fetch,
            target_w: cfg.target_width.max(1),
            target_h: cfg.target_height.max(1),
            blur_radius: AtomicU32::new(cfg.blur_radius),
            throttle: Duration::from_millis(cfg.throttle_ms),
            stats: ArtStats::default(),
        });
        let queue = Arc::new(TaskQueue::new());
        let completions = Arc::new(CompletionQueue::new());
        let pool = WorkerPool::spawn(
            workers,
            Arc::clone(&queue),
            Arc::clone(&completions),
            Arc::clone(&ctx),
        );
        if pool.is_empty() {
            backend.destroy_texture(placeholder);
            return Err("no art worker thread could be started".into());
        }

        info!(
            "Art manager ready: cache='{}', workers={}, max_loaded={}, uploads/frame={}.",
            ctx.disk.dir().display(),
            pool.len(),
            cfg.max_loaded,
            cfg.uploads_per_frame
        );

        Ok(Self {
            entries: EntryCache::new(cfg.max_loaded),
            placeholder,
            queue,
            completions,
            ctx,
            pool,
            uploads_per_frame: cfg.uploads_per_frame,
            sampler,
            next_generation: 0,
        })
    }

    pub fn cache_dir(&self) -> &Path {
        self.ctx.disk.dir()
    }

    pub fn set_blur_radius(&self, radius: u32) {
        self.ctx.blur_radius.store(radius, Ordering::Relaxed);
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.ctx.stats.snapshot()
    }

    pub fn status(&self, key: &str) -> ArtStatus {
        self.entries.status(key)
    }

    pub fn is_ready(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(|e| e.is_resident())
    }

    pub fn loaded_count(&self) -> usize {
        self.entries.resident_count()
    }

    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    /// Blocks until the workers have nothing pending or in flight.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.queue.wait_idle(timeout)
    }

    pub fn has_completions(&self) -> bool {
        !self.completions.is_empty()
    }

    /// Requests art for `key`.
    ///
    /// Existing queued, loaded, or failed entries are left alone, except that
    /// a priority request for a still-pending task moves it to the front and
    /// upgrades it to a display request if needed. An entry that only warmed
    /// the disk cache is re-queued when a display request arrives.
    pub fn submit(&mut self, key: &str, display_name: &str, priority: bool, download_only: bool) {
        if let Some(entry) = self.entries.get(key) {
            let disk_only = entry.loaded && !entry.is_resident();
            if entry.queued {
                if priority && self.queue.promote(key, download_only) {
                    debug!("Promoted art task for '{key}'.");
                }
                return;
            }
            if !(disk_only && !download_only) {
                return;
            }
        }

        let generation = self.queue_entry(key);
        self.queue.push(
            FetchTask {
                key: key.to_string(),
                generation,
                display_name: display_name.to_string(),
                download_only,
            },
            priority,
        );
    }

    /// Starts a new queued entry for `key` and returns its generation.
    fn queue_entry(&mut self, key: &str) -> u64 {
        self.next_generation += 1;
        self.entries.insert_queued(key, self.next_generation);
        self.next_generation
    }

    /// True if `result` answers the task of the entry currently stored under
    /// its key.
    fn is_current(&self, result: &FetchResult) -> bool {
        self.entries
            .get(&result.key)
            .is_some_and(|e| e.generation == result.generation)
    }

    /// Drops the entry for `key`, its textures, and any task not yet picked up
    /// by a worker. A task already in flight still completes; its result is
    /// discarded by [`Self::poll`].
    pub fn unload(&mut self, backend: &mut B, key: &str) {
        if let Some(mut entry) = self.entries.remove(key) {
            entry.destroy(backend);
        }
        self.queue.purge(key);
    }

    fn evict_one(&mut self, backend: &mut B, except: &str) -> bool {
        let Some(victim) = self.entries.lru_resident(except) else {
            return false;
        };
        debug!("Evicting art for '{victim}'.");
        if let Some(mut entry) = self.entries.remove(&victim) {
            entry.destroy(backend);
        }
        true
    }

    fn mark_failed(&mut self, key: &str) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.queued = false;
            entry.loaded = false;
            entry.failed = true;
        }
    }

    fn materialize(&mut self, backend: &mut B, result: FetchResult) {
        let FetchResult {
            key,
            generation: _,
            surface,
            blurred,
            success,
            display,
        } = result;

        if !success {
            if display {
                info!("Art load failed for '{key}'.");
            }
            self.mark_failed(&key);
            return;
        }
        if !display {
            if let Some(entry) = self.entries.get_mut(&key) {
                entry.queued = false;
                entry.failed = false;
                entry.loaded = true;
            }
            return;
        }
        let Some(surface) = surface else {
            self.mark_failed(&key);
            return;
        };

        // Replacing the textures of an entry that already has some adds
        // nothing to the resident count, so nothing is evicted for it.
        let replacing = match self.entries.get_mut(&key) {
            Some(entry) if entry.is_resident() => {
                entry.destroy(backend);
                true
            }
            _ => false,
        };
        if !replacing {
            while self.entries.at_capacity() {
                if !self.evict_one(backend, &key) {
                    break;
                }
            }
        }

        let texture = match backend.create_texture(&surface, self.sampler) {
            Ok(tex) => tex,
            Err(e) => {
                warn!("Failed to create texture for '{key}': {e}");
                self.mark_failed(&key);
                return;
            }
        };
        let blurred = blurred.and_then(|img| {
            backend
                .create_texture(&img, self.sampler)
                .inspect_err(|e| warn!("Failed to create blurred texture for '{key}': {e}"))
                .ok()
        });

        let Some(entry) = self.entries.get_mut(&key) else {
            backend.destroy_texture(texture);
            if let Some(tex) = blurred {
                backend.destroy_texture(tex);
            }
            return;
        };
        entry.texture = Some(texture);
        entry.blurred = blurred;
        entry.queued = false;
        entry.failed = false;
        entry.loaded = true;
        self.entries.touch(&key);
    }

    /// Drains finished work and turns it into textures. Call once per frame
    /// from the render thread. At most `uploads_per_frame` results that need
    /// a texture are handled per call; the rest wait for the next frame.
    pub fn poll(&mut self, backend: &mut B) {
        let mut results = self.completions.drain();
        let mut uploads = 0usize;

        while let Some(result) = results.pop_front() {
            if !self.is_current(&result) {
                // Unloaded (and maybe re-requested) while the worker was busy;
                // the surfaces die here.
                debug!("Dropping stale art result for '{}'.", result.key);
                continue;
            }

            let needs_upload = result.success && result.display && result.surface.is_some();
            if needs_upload && self.uploads_per_frame > 0 && uploads >= self.uploads_per_frame {
                results.push_front(result);
                break;
            }
            if needs_upload {
                uploads += 1;
            }
            self.materialize(backend, result);
        }

        if !results.is_empty() {
            self.completions.requeue_front(results);
        }
    }

    /// Returns the art for `key`, or the placeholder if it is not ready.
    /// A hit refreshes the entry's LRU position.
    pub fn get(&mut self, key: &str, want_blurred: bool) -> Art<'_, B::Texture> {
        if self.is_ready(key) {
            self.entries.touch(key);
        }
        let placeholder = &self.placeholder;
        match self.entries.get(key) {
            Some(entry) if entry.loaded => {
                let tex = if want_blurred {
                    entry.blurred.as_ref().or(entry.texture.as_ref())
                } else {
                    entry.texture.as_ref()
                };
                tex.map_or(Art::Placeholder(placeholder), Art::Ready)
            }
            _ => Art::Placeholder(placeholder),
        }
    }

    /// Stops and joins the workers, then releases every texture.
    pub fn shutdown(self, backend: &mut B) {
        let Self {
            mut entries,
            placeholder,
            completions,
            mut pool,
            ..
        } = self;
        pool.shutdown();
        drop(completions.drain());
        for (_, mut entry) in entries.drain() {
            entry.destroy(backend);
        }
        backend.destroy_texture(placeholder);
        info!("Art manager shut down.");
    }
}
