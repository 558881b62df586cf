//! Remote artwork index: the list of names available on the thumbnail server.
//!
//! The listing is fetched at most once per successful load. A failed fetch
//! leaves the index empty and unloaded so a later task can retry.

use super::matcher::{self, best_match_normalized};
use crate::core::network::Fetch;
use log::{info, warn};
use std::sync::{Mutex, MutexGuard, PoisonError};

const NAME_SUFFIX: &str = ".png\"";
const ANCHOR_OPEN: &str = "href=\"";
const MAX_ANCHOR_SPAN: usize = 256;

struct IndexedName {
    raw: String,
    normalized: String,
}

#[derive(Default)]
struct IndexState {
    loaded: bool,
    names: Vec<IndexedName>,
}

pub struct RemoteIndex {
    base_url: String,
    state: Mutex<IndexState>,
}

/// Extracts `.png` filenames from an HTML directory listing. Each `.png"`
/// marker is paired with the nearest preceding `href="`; markers with no
/// plausible anchor are skipped.
pub fn parse_listing(html: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut pos = 0usize;
    while let Some(rel) = html[pos..].find(NAME_SUFFIX) {
        let marker = pos + rel;
        pos = marker + NAME_SUFFIX.len();

        let Some(start) = html[..marker].rfind(ANCHOR_OPEN) else {
            continue;
        };
        if marker - start >= MAX_ANCHOR_SPAN {
            continue;
        }
        let encoded = &html[start + ANCHOR_OPEN.len()..marker + ".png".len()];
        if encoded.contains('"') || encoded.contains('<') || encoded.contains('>') {
            continue;
        }
        let name = matcher::url_decode(encoded);
        if name.len() > ".png".len() {
            names.push(name);
        }
    }
    names
}

impl RemoteIndex {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            base_url,
            state: Mutex::new(IndexState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, IndexState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn artwork_url(&self, name: &str) -> String {
        format!("{}{}", self.base_url, matcher::url_encode(name))
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().loaded
    }

    pub fn len(&self) -> usize {
        self.lock().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetches and parses the listing unless a previous call already did.
    /// The lock is held for the duration of the fetch so concurrent callers
    /// wait for the first one instead of issuing their own request.
    pub fn ensure_loaded(&self, fetch: &dyn Fetch) -> bool {
        let mut state = self.lock();
        if state.loaded {
            return true;
        }

        info!("Fetching remote art index from {}", self.base_url);
        match fetch.get_text(&self.base_url) {
            Ok(html) => {
                let names = parse_listing(&html);
                state.names.extend(names.into_iter().map(|raw| IndexedName {
                    normalized: matcher::normalize(&raw),
                    raw,
                }));
                state.loaded = true;
                info!("Indexed {} remote images.", state.names.len());
                true
            }
            Err(e) => {
                warn!("Failed to fetch remote art index: {e}");
                false
            }
        }
    }

    pub fn best_match(&self, rom_name: &str) -> Option<String> {
        let target = matcher::normalize(rom_name);
        let state = self.lock();
        best_match_normalized(
            &target,
            state
                .names
                .iter()
                .map(|n| (n.raw.as_str(), n.normalized.as_str())),
        )
        .map(str::to_owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::art::error::{ArtError, Result};
    use crate::art::testutil::MockFetch;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct ListingFetch {
        html: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl Fetch for ListingFetch {
        fn get_text(&self, _url: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.html.map(str::to_owned).ok_or(ArtError::Status(503))
        }

        fn download(&self, _url: &str, _out: &mut dyn Write) -> Result<u64> {
            Err(ArtError::Status(404))
        }
    }

    const LISTING: &str = r#"<html><body><pre>
<a href="../">../</a>
<a href="Super%20Game.png">Super Game.png</a>   01-Jan-2020 10:00   12345
<a href="F-Zero%20(USA).png">F-Zero (USA).png</a>
<a href="readme.txt">readme.txt</a>
</pre></body></html>"#;

    #[test]
    fn parse_listing_decodes_anchor_names() {
        assert_eq!(
            parse_listing(LISTING),
            vec!["Super Game.png".to_string(), "F-Zero (USA).png".to_string()]
        );
    }

    #[test]
    fn parse_listing_skips_unmatched_markers() {
        let html = concat!(
            "no anchor here.png\" then ",
            "<a title=\"x.png\" href=\"Good.png\">",
            "<a href=\"broken>oops.png\">",
            "<a href=\"Tail.png",
        );
        assert_eq!(parse_listing(html), vec!["Good.png".to_string()]);
    }

    #[test]
    fn parse_listing_ignores_far_anchors() {
        let html = format!("href=\"{}.png\"", "a".repeat(MAX_ANCHOR_SPAN));
        assert!(parse_listing(&html).is_empty());
    }

    #[test]
    fn ensure_loaded_fetches_once() {
        let fetch = ListingFetch {
            html: Some(LISTING),
            calls: AtomicUsize::new(0),
        };
        let index = RemoteIndex::new("https://example.invalid/boxarts");
        assert!(index.ensure_loaded(&fetch));
        assert!(index.ensure_loaded(&fetch));
        assert_eq!(fetch.calls.load(Ordering::SeqCst), 1);
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.best_match("Super Game (USA).sfc").as_deref(),
            Some("Super Game.png")
        );
        assert_eq!(
            index.artwork_url("Super Game.png"),
            "https://example.invalid/boxarts/Super%20Game.png"
        );
    }

    #[test]
    fn concurrent_callers_share_one_fetch() {
        let fetch = MockFetch::with_listing(LISTING).gated();
        let index = RemoteIndex::new("https://example.invalid/boxarts/");
        let loaded: Vec<bool> = std::thread::scope(|s| {
            let callers: Vec<_> = (0..4)
                .map(|_| s.spawn(|| index.ensure_loaded(&fetch)))
                .collect();
            // Let the callers pile up behind the first fetch.
            std::thread::sleep(Duration::from_millis(50));
            fetch.open_gate();
            callers.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(loaded, [true; 4]);
        assert_eq!(fetch.index_calls(), 1);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn failed_fetch_allows_retry() {
        let fetch = ListingFetch {
            html: None,
            calls: AtomicUsize::new(0),
        };
        let index = RemoteIndex::new("https://example.invalid/");
        assert!(!index.ensure_loaded(&fetch));
        assert!(!index.is_loaded());
        assert!(index.is_empty());
        assert!(!index.ensure_loaded(&fetch));
        assert_eq!(fetch.calls.load(Ordering::SeqCst), 2);
        assert_eq!(index.best_match("anything"), None);
    }
}
