//! Error type returned by a polling cycle.

use std::fmt;

/// HTTP method of the request that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Head,
    Get,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Head => write!(f, "HEAD"),
            Method::Get => write!(f, "GET"),
        }
    }
}

/// Error returned by `Fetcher::init` and `Fetcher::fetch`.
///
/// Transport and status failures leave the fetcher's stored header values
/// untouched, so the next cycle compares against the same baseline.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Missing or invalid URL, or `fetch` called before `init`.
    #[error("invalid fetch target: {0}")]
    Config(String),

    /// Curl could not complete the request (DNS, connect timeout, reset, ...).
    #[error("{method} request failed ({source})")]
    Transport {
        method: Method,
        #[source]
        source: curl::Error,
    },

    /// The server answered with something other than 200 OK.
    #[error("{method} request failed (status code {code})")]
    Status { method: Method, code: u32 },

    /// The transfer worker went away before any response arrived.
    #[error("{method} request ended without a response")]
    NoResponse { method: Method },
}

impl FetchError {
    pub(crate) fn transport(method: Method) -> impl FnOnce(curl::Error) -> FetchError {
        move |source| FetchError::Transport { method, source }
    }

    /// Status code carried by a `Status` error, if any.
    pub fn status_code(&self) -> Option<u32> {
        match self {
            FetchError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}
