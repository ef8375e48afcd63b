//! Decide whether a retrieved body needs application-level gzip decoding.

use std::io::Read;

use flate2::read::MultiGzDecoder;
use url::Url;

use crate::transport::ResponseHeaders;

/// Policy deciding whether to gunzip a GET body.
pub trait DecodePolicy: Send + Sync {
    fn should_gunzip(&self, url: &Url, headers: &ResponseHeaders) -> bool;
}

/// Gunzip when the URL path ends in `.gz` and the server did not declare
/// `Content-Encoding: gzip`. A declared encoding is passed through as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuffixGzip;

impl DecodePolicy for SuffixGzip {
    fn should_gunzip(&self, url: &Url, headers: &ResponseHeaders) -> bool {
        url.path().ends_with(".gz") && headers.get_or_empty("Content-Encoding") != "gzip"
    }
}

/// Wrap `reader` in a gzip decoder when asked to. Every member of a
/// concatenated stream is decoded (`pigz`, `cat a.gz b.gz`). Malformed input
/// surfaces as an `io::Error` from `read`, not here.
pub(crate) fn wrap<R>(reader: R, gunzip: bool) -> Box<dyn Read + Send>
where
    R: Read + Send + 'static,
{
    if gunzip {
        Box::new(MultiGzDecoder::new(reader))
    } else {
        Box::new(reader)
    }
}
