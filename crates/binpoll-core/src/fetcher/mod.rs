//! Polling fetcher: one per monitored URL.
//!
//! Each call to [`Fetcher::fetch`] is one polling cycle: wait for the
//! interval (except on the first call), HEAD the URL, compare the check
//! headers against the previous cycle, and GET the artifact only when they
//! differ.

pub mod decode;
pub mod detect;

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use url::Url;

use crate::error::{FetchError, Method};
use crate::transport::{ResponseHeaders, SharedTransport};
use decode::{DecodePolicy, SuffixGzip};
use detect::{HeaderLedger, Verdict};

/// Interval used when the target leaves it at zero.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// If any of these change, the artifact has been updated.
pub const DEFAULT_CHECK_HEADERS: [&str; 4] =
    ["ETag", "If-Modified-Since", "Last-Modified", "Content-Length"];

pub fn default_check_headers() -> Vec<String> {
    DEFAULT_CHECK_HEADERS.iter().map(|h| h.to_string()).collect()
}

/// Per-URL polling configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchTarget {
    /// URL to poll for new artifacts.
    pub url: String,
    /// Pause between cycles; zero means [`DEFAULT_INTERVAL`].
    pub interval: Duration,
    /// Headers compared between cycles; empty means [`DEFAULT_CHECK_HEADERS`].
    pub check_headers: Vec<String>,
    /// Treat a HEAD response carrying none of the check headers as a change.
    /// Off by default, in which case such a response always reads as
    /// "unchanged", even on the first cycle.
    pub treat_missing_headers_as_change: bool,
}

impl FetchTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_check_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.check_headers = headers.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollState {
    Uninitialized,
    /// Initialized; the next cycle runs immediately.
    NotYetPolled,
    /// At least one cycle ran; the next one waits for the interval first.
    Polled,
}

/// New content returned by a cycle that detected a change.
///
/// Reading to the end and dropping it releases the connection.
pub struct Artifact {
    reader: Box<dyn Read + Send>,
    headers: ResponseHeaders,
    gunzipped: bool,
}

impl Artifact {
    /// Headers of the GET response.
    pub fn headers(&self) -> &ResponseHeaders {
        &self.headers
    }

    /// True when the body is being gzip-decoded on read.
    pub fn is_gunzipped(&self) -> bool {
        self.gunzipped
    }
}

impl Read for Artifact {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("headers", &self.headers)
            .field("gunzipped", &self.gunzipped)
            .finish_non_exhaustive()
    }
}

/// Polls one URL. Calls to `fetch` must be sequenced by the caller, which
/// `&mut self` enforces.
pub struct Fetcher {
    target: FetchTarget,
    transport: Arc<SharedTransport>,
    decode: Box<dyn DecodePolicy>,
    url: Option<Url>,
    ledger: HeaderLedger,
    state: PollState,
}

impl Fetcher {
    pub fn new(target: FetchTarget, transport: Arc<SharedTransport>) -> Self {
        Self {
            target,
            transport,
            decode: Box::new(SuffixGzip),
            url: None,
            ledger: HeaderLedger::default(),
            state: PollState::Uninitialized,
        }
    }

    /// Replace the gzip decision (default [`SuffixGzip`]).
    pub fn with_decode_policy(mut self, policy: Box<dyn DecodePolicy>) -> Self {
        self.decode = policy;
        self
    }

    /// Validate the target and apply defaults.
    ///
    /// Calling again forgets the stored header values, so the next cycle
    /// fetches whenever any check header is present. Pacing is kept: a
    /// fetcher that already polled still waits for the interval.
    pub fn init(&mut self) -> Result<(), FetchError> {
        if self.target.url.is_empty() {
            return Err(FetchError::Config("URL required".to_string()));
        }
        let url = Url::parse(&self.target.url)
            .map_err(|e| FetchError::Config(format!("invalid URL {:?}: {}", self.target.url, e)))?;
        if self.target.interval.is_zero() {
            self.target.interval = DEFAULT_INTERVAL;
        }
        if self.target.check_headers.is_empty() {
            self.target.check_headers = default_check_headers();
        }
        self.url = Some(url);
        self.ledger = HeaderLedger::default();
        if self.state == PollState::Uninitialized {
            self.state = PollState::NotYetPolled;
        }
        Ok(())
    }

    /// Target with defaults applied (after `init`).
    pub fn target(&self) -> &FetchTarget {
        &self.target
    }

    /// Header values recorded by previous cycles.
    pub fn ledger(&self) -> &HeaderLedger {
        &self.ledger
    }

    /// Run one polling cycle.
    ///
    /// Returns `Ok(None)` when the artifact is unchanged and `Ok(Some(_))`
    /// with a stream of the new content otherwise. Blocks for the interval
    /// on every call but the first, and on the network requests.
    pub fn fetch(&mut self) -> Result<Option<Artifact>, FetchError> {
        let url = match (&self.url, self.state) {
            (Some(url), state) if state != PollState::Uninitialized => url.clone(),
            _ => return Err(FetchError::Config("fetcher not initialized".to_string())),
        };

        if self.state == PollState::Polled {
            thread::sleep(self.target.interval);
        }
        self.state = PollState::Polled;

        let head = self.transport.head(url.as_str())?;
        if head.code != 200 {
            return Err(FetchError::Status {
                method: Method::Head,
                code: head.code,
            });
        }

        let obs = self.ledger.observe(&self.target.check_headers, &head.headers);
        if obs.verdict(self.target.treat_missing_headers_as_change) == Verdict::Unchanged {
            tracing::debug!(url = %url, matches = obs.matches, total = obs.total, "artifact unchanged");
            return Ok(None);
        }
        tracing::info!(url = %url, matches = obs.matches, total = obs.total, "new artifact detected, fetching");

        let resp = self.transport.get(url.as_str())?;
        if resp.code != 200 {
            return Err(FetchError::Status {
                method: Method::Get,
                code: resp.code,
            });
        }

        let gunzipped = self.decode.should_gunzip(&url, &resp.headers);
        if gunzipped {
            tracing::debug!(url = %url, "decoding gzip artifact");
        }
        Ok(Some(Artifact {
            reader: decode::wrap(resp.body, gunzipped),
            headers: resp.headers,
            gunzipped,
        }))
    }
}

impl fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("target", &self.target)
            .field("state", &self.state)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}
