//! Pending-task and completion queues shared between the render thread and
//! the art workers.
//!
//! The pending queue is strictly front-to-back. High-priority submissions go
//! to the front; promotion moves a still-pending task to the front. Nothing
//! already popped by a worker is ever touched again from here.

use image::RgbaImage;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTask {
    pub key: String,
    /// Identifies the entry this task was queued for. Results carry it back so
    /// a result for an entry that was unloaded and re-requested is not mistaken
    /// for the new one's.
    pub generation: u64,
    pub display_name: String,
    /// Only warm the disk cache; no surfaces are produced.
    pub download_only: bool,
}

/// Outcome of one task. The surfaces are owned by the result until the poll
/// step either uploads them or drops them.
#[derive(Debug)]
pub struct FetchResult {
    pub key: String,
    pub generation: u64,
    pub surface: Option<RgbaImage>,
    pub blurred: Option<RgbaImage>,
    pub success: bool,
    pub display: bool,
}

impl FetchResult {
    pub fn failed(key: String, generation: u64, display: bool) -> Self {
        Self {
            key,
            generation,
            surface: None,
            blurred: None,
            success: false,
            display,
        }
    }
}

#[derive(Default)]
struct PendingState {
    tasks: VecDeque<FetchTask>,
    in_flight: usize,
    stop: bool,
}

#[derive(Default)]
pub struct TaskQueue {
    state: Mutex<PendingState>,
    work_ready: Condvar,
    idle: Condvar,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PendingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, task: FetchTask, priority: bool) {
        {
            let mut state = self.lock();
            if priority {
                state.tasks.push_front(task);
            } else {
                state.tasks.push_back(task);
            }
        }
        self.work_ready.notify_one();
    }

    /// Moves the pending task for `key` to the front. A display request wins
    /// over a download-only one. Returns false if no pending task exists,
    /// i.e. a worker already owns it.
    pub fn promote(&self, key: &str, download_only: bool) -> bool {
        let mut state = self.lock();
        let Some(pos) = state.tasks.iter().position(|t| t.key == key) else {
            return false;
        };
        let Some(mut task) = state.tasks.remove(pos) else {
            return false;
        };
        task.download_only &= download_only;
        state.tasks.push_front(task);
        true
    }

    /// Drops every not-yet-started task for `key`.
    pub fn purge(&self, key: &str) -> usize {
        let removed = {
            let mut state = self.lock();
            let before = state.tasks.len();
            state.tasks.retain(|t| t.key != key);
            before - state.tasks.len()
        };
        if removed > 0 {
            self.idle.notify_all();
        }
        removed
    }

    /// Blocks until a task is available. Returns `None` once the queue is
    /// stopped; pending tasks are abandoned at that point.
    pub fn pop_blocking(&self) -> Option<FetchTask> {
        let mut state = self.lock();
        loop {
            if state.stop {
                return None;
            }
            if let Some(task) = state.tasks.pop_front() {
                state.in_flight += 1;
                return Some(task);
            }
            state = self
                .work_ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Marks one popped task as finished. Must be called after its result is
    /// on the completion queue.
    pub fn finish_one(&self) {
        {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        self.idle.notify_all();
    }

    pub fn stop(&self) {
        {
            let mut state = self.lock();
            state.stop = true;
            state.tasks.clear();
        }
        self.work_ready.notify_all();
        self.idle.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stop
    }

    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().tasks.iter().any(|t| t.key == key)
    }

    pub fn pending(&self) -> Vec<FetchTask> {
        self.lock().tasks.iter().cloned().collect()
    }

    pub fn is_idle(&self) -> bool {
        let state = self.lock();
        state.tasks.is_empty() && state.in_flight == 0
    }

    /// Waits until nothing is pending or in flight. Returns false on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if state.tasks.is_empty() && state.in_flight == 0 {
                return true;
            }
            if state.stop && state.in_flight == 0 {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self
                .idle
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

#[derive(Default)]
pub struct CompletionQueue {
    results: Mutex<VecDeque<FetchResult>>,
}

impl CompletionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<FetchResult>> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, result: FetchResult) {
        self.lock().push_back(result);
    }

    /// Takes everything queued so far in one swap.
    pub fn drain(&self) -> VecDeque<FetchResult> {
        std::mem::take(&mut *self.lock())
    }

    /// Puts unprocessed results back ahead of anything that arrived since the
    /// last drain, keeping their order.
    pub fn requeue_front(&self, mut leftover: VecDeque<FetchResult>) {
        if leftover.is_empty() {
            return;
        }
        let mut results = self.lock();
        leftover.append(&mut results);
        *results = leftover;
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn task(key: &str, download_only: bool) -> FetchTask {
        FetchTask {
            key: key.to_string(),
            generation: 0,
            display_name: key.to_string(),
            download_only,
        }
    }

    fn keys(queue: &TaskQueue) -> Vec<String> {
        queue.pending().into_iter().map(|t| t.key).collect()
    }

    #[test]
    fn priority_goes_to_front() {
        let queue = TaskQueue::new();
        queue.push(task("a", false), false);
        queue.push(task("b", false), false);
        queue.push(task("c", false), true);
        assert_eq!(keys(&queue), ["c", "a", "b"]);
    }

    #[test]
    fn promote_moves_and_upgrades() {
        let queue = TaskQueue::new();
        queue.push(task("a", false), false);
        queue.push(task("b", true), false);
        assert!(queue.promote("b", false));
        let pending = queue.pending();
        assert_eq!(pending[0].key, "b");
        assert!(!pending[0].download_only);
        assert!(!queue.promote("missing", false));
    }

    #[test]
    fn promote_never_downgrades_display_task() {
        let queue = TaskQueue::new();
        queue.push(task("a", false), false);
        assert!(queue.promote("a", true));
        assert!(!queue.pending()[0].download_only);
    }

    #[test]
    fn purge_removes_only_matching() {
        let queue = TaskQueue::new();
        queue.push(task("a", false), false);
        queue.push(task("b", false), false);
        queue.push(task("a", true), false);
        assert_eq!(queue.purge("a"), 2);
        assert_eq!(keys(&queue), ["b"]);
    }

    #[test]
    fn pop_tracks_in_flight_until_finished() {
        let queue = TaskQueue::new();
        queue.push(task("a", false), false);
        let popped = queue.pop_blocking().unwrap();
        assert_eq!(popped.key, "a");
        assert!(queue.is_empty());
        assert!(!queue.is_idle());
        assert!(!queue.wait_idle(Duration::from_millis(10)));
        queue.finish_one();
        assert!(queue.wait_idle(Duration::from_millis(10)));
    }

    #[test]
    fn stop_wakes_blocked_worker() {
        let queue = Arc::new(TaskQueue::new());
        let worker = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || queue.pop_blocking())
        };
        std::thread::sleep(Duration::from_millis(20));
        queue.stop();
        assert_eq!(worker.join().unwrap(), None);
        assert!(queue.is_stopped());
    }

    #[test]
    fn completion_drain_and_requeue_keep_order() {
        let completions = CompletionQueue::new();
        for key in ["a", "b", "c"] {
            completions.push(FetchResult::failed(key.into(), 0, true));
        }
        let mut drained = completions.drain();
        assert!(completions.is_empty());
        let first = drained.pop_front().unwrap();
        assert_eq!(first.key, "a");
        completions.push(FetchResult::failed("d".into(), 0, true));
        completions.requeue_front(drained);
        let order: Vec<String> = completions.drain().into_iter().map(|r| r.key).collect();
        assert_eq!(order, ["b", "c", "d"]);
    }
}
