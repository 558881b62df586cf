use crate::art::error::{ArtError, Result};
use log::debug;
use std::io::Write;
use std::time::Duration;

/// Directory listings for large systems run to several megabytes.
const INDEX_BODY_LIMIT: u64 = 32 * 1024 * 1024;

/// Blocking HTTP access used by the art workers. Implementations must treat
/// anything other than a 200 response as an error.
pub trait Fetch: Send + Sync {
    fn get_text(&self, url: &str) -> Result<String>;

    /// Streams the response body into `out`, returning the number of bytes
    /// written.
    fn download(&self, url: &str, out: &mut dyn Write) -> Result<u64>;
}

fn agent_with_timeout(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

pub struct HttpFetcher {
    index_agent: ureq::Agent,
    download_agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(index_timeout: Duration, download_timeout: Duration) -> Self {
        Self {
            index_agent: agent_with_timeout(index_timeout),
            download_agent: agent_with_timeout(download_timeout),
        }
    }

    pub fn from_config(cfg: &crate::config::Config) -> Self {
        Self::new(
            Duration::from_secs(u64::from(cfg.index_timeout_secs.max(1))),
            Duration::from_secs(u64::from(cfg.request_timeout_secs.max(1))),
        )
    }
}

#[inline(always)]
fn expect_ok(status: u16) -> Result<()> {
    if status == 200 {
        Ok(())
    } else {
        Err(ArtError::Status(status))
    }
}

impl Fetch for HttpFetcher {
    fn get_text(&self, url: &str) -> Result<String> {
        debug!("GET {url}");
        let resp = self.index_agent.get(url).call()?;
        expect_ok(resp.status().as_u16())?;
        let mut body = resp.into_body();
        Ok(body.with_config().limit(INDEX_BODY_LIMIT).read_to_string()?)
    }

    fn download(&self, url: &str, out: &mut dyn Write) -> Result<u64> {
        debug!("GET {url} (download)");
        let resp = self.download_agent.get(url).call()?;
        expect_ok(resp.status().as_u16())?;
        let mut reader = resp.into_body().into_reader();
        Ok(std::io::copy(&mut reader, out)?)
    }
}
