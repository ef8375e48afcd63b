//! Shared HTTP transport.
//!
//! One `SharedTransport` is built at startup and handed to every fetcher as
//! an `Arc`. It owns a pool of idle curl easy handles; a handle keeps its
//! connection cache between transfers, so reusing handles reuses
//! connections and bounds the number of open sockets.

mod body;
mod headers;

pub use body::Body;
pub use headers::ResponseHeaders;

use std::str;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use curl::easy::Easy;

use crate::error::{FetchError, Method};
use body::{Event, CHANNEL_DEPTH};

/// Default bound on connection establishment.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
/// Default number of idle handles kept for reuse.
pub const DEFAULT_MAX_IDLE_HANDLES: usize = 8;
const MAX_REDIRECTS: u32 = 10;

/// Transport policy, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// Fail a request whose TCP/TLS connect takes longer than this.
    pub connect_timeout: Duration,
    /// Upper bound on a whole transfer. `None` means a stalled server can
    /// block a request indefinitely.
    pub transfer_timeout: Option<Duration>,
    /// Verify TLS certificates and host names. Off by default: the operator
    /// is trusted to configure the right URL.
    pub verify_tls: bool,
    /// Idle handles kept in the pool; extra handles are dropped on return.
    pub max_idle_handles: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            transfer_timeout: None,
            verify_tls: false,
            max_idle_handles: DEFAULT_MAX_IDLE_HANDLES,
        }
    }
}

impl TransportOptions {
    fn apply(&self, easy: &mut Easy) -> Result<(), curl::Error> {
        easy.follow_location(true)?;
        easy.max_redirections(MAX_REDIRECTS)?;
        easy.connect_timeout(self.connect_timeout)?;
        if let Some(limit) = self.transfer_timeout {
            easy.timeout(limit)?;
        }
        easy.ssl_verify_peer(self.verify_tls)?;
        easy.ssl_verify_host(self.verify_tls)?;
        Ok(())
    }
}

/// Result of a HEAD request. The connection is already back in the pool.
#[derive(Debug, Clone)]
pub struct HeadResponse {
    pub code: u32,
    pub headers: ResponseHeaders,
}

/// Result of a GET request; `body` streams the content.
#[derive(Debug)]
pub struct GetResponse {
    pub code: u32,
    pub headers: ResponseHeaders,
    pub body: Body,
}

/// Connection-pooling HTTP client shared by all fetchers. `Send + Sync`.
#[derive(Debug)]
pub struct SharedTransport {
    options: TransportOptions,
    idle: Mutex<Vec<Easy>>,
}

impl SharedTransport {
    pub fn new(options: TransportOptions) -> Self {
        Self {
            options,
            idle: Mutex::new(Vec::new()),
        }
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    /// Number of idle handles currently pooled.
    pub fn idle_handles(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn checkout(&self) -> Result<Easy, curl::Error> {
        let pooled = self.idle.lock().unwrap_or_else(PoisonError::into_inner).pop();
        let mut easy = match pooled {
            Some(mut easy) => {
                // Clears options but keeps live connections.
                easy.reset();
                easy
            }
            None => Easy::new(),
        };
        self.options.apply(&mut easy)?;
        Ok(easy)
    }

    fn checkin(&self, easy: Easy) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.options.max_idle_handles {
            idle.push(easy);
        }
    }

    /// Issue `HEAD url` and return the status and headers of the final response.
    ///
    /// Runs in the current thread.
    pub fn head(&self, url: &str) -> Result<HeadResponse, FetchError> {
        let mut easy = self.checkout().map_err(FetchError::transport(Method::Head))?;
        let mut headers = ResponseHeaders::default();
        let outcome = perform_head(&mut easy, url, &mut headers).and_then(|()| easy.response_code());
        self.checkin(easy);
        let code = outcome.map_err(FetchError::transport(Method::Head))?;
        tracing::debug!(url, code, headers = headers.len(), "HEAD complete");
        Ok(HeadResponse { code, headers })
    }

    /// Issue `GET url`. Returns once the final response headers arrived;
    /// the body is streamed by a worker thread and read through `Body`.
    ///
    /// `Accept-Encoding: gzip` is sent and a gzip-encoded response is
    /// decoded by curl; the `Content-Encoding` header is still reported.
    pub fn get(self: &Arc<Self>, url: &str) -> Result<GetResponse, FetchError> {
        let mut easy = self.checkout().map_err(FetchError::transport(Method::Get))?;
        // GET only: curl decodes a declared gzip encoding and keeps the
        // header visible. HEAD stays unencoded so Content-Length is stable.
        let prepared = easy
            .url(url)
            .and_then(|()| easy.get(true))
            .and_then(|()| easy.accept_encoding("gzip"));
        if let Err(e) = prepared {
            self.checkin(easy);
            return Err(FetchError::Transport {
                method: Method::Get,
                source: e,
            });
        }

        let (tx, rx) = mpsc::sync_channel(CHANNEL_DEPTH);
        let transport = Arc::clone(self);
        thread::Builder::new()
            .name("binpoll-get".to_string())
            .spawn(move || {
                let result = body::run_transfer(&mut easy, &tx);
                // Back in the pool before the reader sees the end of the body,
                // so the next request on this thread reuses the connection.
                transport.checkin(easy);
                let _ = tx.send(Event::Finished(result));
            })
            .map_err(|e| {
                tracing::warn!("could not spawn transfer worker: {}", e);
                FetchError::NoResponse {
                    method: Method::Get,
                }
            })?;

        match rx.recv() {
            Ok(Event::Response(headers)) => {
                let code = headers.status().unwrap_or(0);
                tracing::debug!(url, code, "GET response headers received");
                Ok(GetResponse {
                    code,
                    headers,
                    body: Body::new(rx),
                })
            }
            Ok(Event::Finished(Err(source))) => Err(FetchError::Transport {
                method: Method::Get,
                source,
            }),
            Ok(_) | Err(_) => Err(FetchError::NoResponse {
                method: Method::Get,
            }),
        }
    }
}

fn perform_head(
    easy: &mut Easy,
    url: &str,
    headers: &mut ResponseHeaders,
) -> Result<(), curl::Error> {
    easy.url(url)?;
    easy.nobody(true)?;
    let mut transfer = easy.transfer();
    transfer.header_function(|data| {
        if let Ok(line) = str::from_utf8(data) {
            headers.push_line(line);
        }
        true
    })?;
    transfer.perform()
}
