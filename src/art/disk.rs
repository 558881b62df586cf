use super::error::{ArtError, Result};
use crate::core::network::Fetch;
use log::{debug, info, warn};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const ART_EXTENSION: &str = "png";
const PARTIAL_SUFFIX: &str = ".part";

/// Flat on-disk artwork cache: one `<key>.png` per library item.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
    min_file_bytes: u64,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>, min_file_bytes: u64) -> Self {
        Self {
            dir: dir.into(),
            min_file_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{ART_EXTENSION}"))
    }

    /// Returns the cached file for `key` if it is present and plausibly
    /// complete. Undersized files are leftovers of interrupted downloads and
    /// are deleted on sight.
    pub fn resolve_local_path(&self, key: &str) -> Option<PathBuf> {
        let path = self.path_for(key);
        let meta = fs::metadata(&path).ok()?;
        if !meta.is_file() {
            return None;
        }
        if meta.len() < self.min_file_bytes {
            warn!(
                "Cached art '{}' is only {} bytes; removing.",
                path.display(),
                meta.len()
            );
            self.discard(&path);
            return None;
        }
        Some(path)
    }

    /// Removes a cache file so the next request downloads it again.
    pub fn discard(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!("Failed to remove cached art '{}': {e}", path.display());
        }
    }

    /// Downloads `url` into the cache slot for `key`. The body is streamed to
    /// a uniquely named `.part` file in the cache directory that is renamed
    /// into place only after a complete 200 response. Concurrent downloads of
    /// the same key never share a partial file; the partial file is removed on
    /// any failure.
    pub fn download(&self, fetch: &dyn Fetch, url: &str, key: &str) -> Result<PathBuf> {
        let path = self.path_for(key);
        info!("Downloading '{url}' -> '{}'", path.display());

        let mut partial = tempfile::Builder::new()
            .prefix(&format!("{key}."))
            .suffix(PARTIAL_SUFFIX)
            .tempfile_in(&self.dir)?;
        let bytes = {
            let mut out = BufWriter::new(partial.as_file_mut());
            let bytes = fetch.download(url, &mut out)?;
            out.flush()?;
            bytes
        };
        if bytes < self.min_file_bytes {
            return Err(ArtError::Corrupt(path));
        }
        partial.persist(&path).map_err(|e| ArtError::Io(e.error))?;
        debug!("Downloaded {bytes} bytes for '{key}'.");
        Ok(path)
    }
}
