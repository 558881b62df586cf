use super::disk::DiskCache;
use super::error::{ArtError, Result};
use super::index::RemoteIndex;
use super::pipeline;
use super::queue::{CompletionQueue, FetchResult, FetchTask, TaskQueue};
use crate::core::network::Fetch;
use image::RgbaImage;
use log::{debug, error, info, warn};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct ArtStats {
    downloads: AtomicUsize,
    decodes: AtomicUsize,
    failures: AtomicUsize,
    corrupt_removed: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub downloads: usize,
    pub decodes: usize,
    pub failures: usize,
    pub corrupt_removed: usize,
}

impl ArtStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            downloads: self.downloads.load(Ordering::Relaxed),
            decodes: self.decodes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            corrupt_removed: self.corrupt_removed.load(Ordering::Relaxed),
        }
    }

    #[inline(always)]
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Everything a worker needs to turn a task into a result. Shared read-only
/// across the pool; the index guards its own state.
pub struct WorkerContext {
    pub disk: DiskCache,
    pub index: RemoteIndex,
    pub fetch: Arc<dyn Fetch>,
    pub target_w: u32,
    pub target_h: u32,
    pub blur_radius: AtomicU32,
    pub throttle: Duration,
    pub stats: ArtStats,
}

impl WorkerContext {
    fn locate_or_fetch(&self, key: &str) -> Result<PathBuf> {
        if let Some(path) = self.disk.resolve_local_path(key) {
            return Ok(path);
        }
        if !self.index.ensure_loaded(self.fetch.as_ref()) {
            return Err(ArtError::IndexUnavailable);
        }
        let matched = self
            .index
            .best_match(key)
            .ok_or_else(|| ArtError::NoMatch(key.to_string()))?;
        debug!("Matched '{key}' -> '{matched}'");
        let url = self.index.artwork_url(&matched);
        let path = self.disk.download(self.fetch.as_ref(), &url, key)?;
        ArtStats::bump(&self.stats.downloads);
        Ok(path)
    }

    fn render(&self, path: &Path) -> Result<(RgbaImage, Option<RgbaImage>)> {
        ArtStats::bump(&self.stats.decodes);
        let decoded = pipeline::decode(path)?;
        let surface = pipeline::fit_to_target(&decoded, self.target_w, self.target_h);
        let radius = self.blur_radius.load(Ordering::Relaxed);
        let blurred = (radius > 0).then(|| pipeline::box_blur(&surface, radius));
        Ok((surface, blurred))
    }

    /// Runs one task to completion. Always yields a result, success or not.
    pub fn process(&self, task: &FetchTask) -> FetchResult {
        let display = !task.download_only;
        let mut result = FetchResult::failed(task.key.clone(), task.generation, display);

        let path = match self.locate_or_fetch(&task.key) {
            Ok(path) => path,
            Err(e) => {
                warn!("No art for '{}' ({}): {e}", task.key, task.display_name);
                ArtStats::bump(&self.stats.failures);
                return result;
            }
        };

        if task.download_only {
            result.success = true;
            return result;
        }

        match self.render(&path) {
            Ok((surface, blurred)) => {
                result.surface = Some(surface);
                result.blurred = blurred;
                result.success = true;
            }
            Err(e) => {
                warn!(
                    "Corrupt art '{}' ({e}); deleting for re-download.",
                    path.display()
                );
                self.disk.discard(&path);
                ArtStats::bump(&self.stats.corrupt_removed);
                ArtStats::bump(&self.stats.failures);
            }
        }
        result
    }
}

pub struct WorkerPool {
    queue: Arc<TaskQueue>,
    handles: Vec<JoinHandle<()>>,
}

fn worker_loop(queue: &TaskQueue, completions: &CompletionQueue, ctx: &WorkerContext) {
    while let Some(task) = queue.pop_blocking() {
        let result = panic::catch_unwind(AssertUnwindSafe(|| ctx.process(&task)))
            .unwrap_or_else(|_| {
                error!("Art worker panicked while processing '{}'", task.key);
                ArtStats::bump(&ctx.stats.failures);
                FetchResult::failed(task.key.clone(), task.generation, !task.download_only)
            });
        completions.push(result);
        queue.finish_one();
        if !ctx.throttle.is_zero() {
            thread::sleep(ctx.throttle);
        }
    }
}

impl WorkerPool {
    pub fn spawn(
        count: usize,
        queue: Arc<TaskQueue>,
        completions: Arc<CompletionQueue>,
        ctx: Arc<WorkerContext>,
    ) -> Self {
        let mut handles = Vec::with_capacity(count);
        for n in 0..count {
            let queue = Arc::clone(&queue);
            let completions = Arc::clone(&completions);
            let ctx = Arc::clone(&ctx);
            match thread::Builder::new()
                .name(format!("art-worker-{n}"))
                .spawn(move || worker_loop(&queue, &completions, &ctx))
            {
                Ok(handle) => handles.push(handle),
                Err(e) => error!("Failed to spawn art worker {n}: {e}"),
            }
        }
        info!("Started {} art worker thread(s).", handles.len());
        Self { queue, handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Stops the queue and joins every worker. In-flight tasks finish first.
    pub fn shutdown(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        self.queue.stop();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                error!("Art worker thread panicked during shutdown.");
            }
        }
        info!("Art workers stopped.");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
