pub mod config;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod storage;
pub mod transport;

pub use error::{FetchError, Method};
pub use fetcher::{Artifact, FetchTarget, Fetcher};
pub use transport::{SharedTransport, TransportOptions};
