//! Shared fixtures for the art tests: a scripted HTTP double, PNG bytes, and
//! a config pointed at a temp directory.

use super::error::{ArtError, Result};
use crate::config::Config;
use crate::core::network::Fetch;
use image::{ImageFormat, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};

pub const TEST_BASE_URL: &str = "https://art.example/boxarts/";

#[derive(Default)]
pub struct MockFetch {
    listing: Option<String>,
    files: HashMap<String, Vec<u8>>,
    index_calls: AtomicUsize,
    download_calls: AtomicUsize,
    gate: Option<(Mutex<bool>, Condvar)>,
}

impl MockFetch {
    /// Every request fails.
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn with_listing(html: &str) -> Self {
        Self {
            listing: Some(html.to_string()),
            ..Self::default()
        }
    }

    pub fn serve(mut self, url: &str, body: Vec<u8>) -> Self {
        self.files.insert(url.to_string(), body);
        self
    }

    /// Index fetches block until [`Self::open_gate`] is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some((Mutex::new(false), Condvar::new()));
        self
    }

    pub fn open_gate(&self) {
        if let Some((open, cv)) = &self.gate {
            *open.lock().unwrap() = true;
            cv.notify_all();
        }
    }

    fn wait_gate(&self) {
        if let Some((open, cv)) = &self.gate {
            let mut guard = open.lock().unwrap();
            while !*guard {
                guard = cv.wait(guard).unwrap();
            }
        }
    }

    pub fn index_calls(&self) -> usize {
        self.index_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }
}

impl Fetch for MockFetch {
    fn get_text(&self, _url: &str) -> Result<String> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate();
        self.listing.clone().ok_or(ArtError::Http("offline".into()))
    }

    fn download(&self, url: &str, out: &mut dyn Write) -> Result<u64> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        let body = self.files.get(url).ok_or(ArtError::Status(404))?;
        out.write_all(body)?;
        Ok(body.len() as u64)
    }
}

/// PNG with enough per-pixel variation that it never compresses below the
/// corrupt-file threshold.
pub fn noisy_png(w: u32, h: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(w, h, |x, y| {
        let v = x.wrapping_mul(2_654_435_761).wrapping_add(y.wrapping_mul(40_503));
        Rgba([(v >> 24) as u8, (v >> 16) as u8, (v >> 8) as u8, 255])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

pub fn test_config(cache_dir: &Path) -> Config {
    Config {
        base_url: TEST_BASE_URL.to_string(),
        cache_dir: cache_dir.to_path_buf(),
        workers: 1,
        blur_radius: 1,
        max_loaded: 0,
        uploads_per_frame: 0,
        throttle_ms: 0,
        min_file_bytes: 100,
        target_width: 64,
        target_height: 45,
        ..Config::default()
    }
}
