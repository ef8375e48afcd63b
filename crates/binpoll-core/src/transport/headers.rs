//! Parse raw header lines collected from curl into a lookup table.

/// Headers of the final response of a transfer.
///
/// Curl reports every header block it sees, including those of redirects it
/// followed. Only the block after the last status line is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    status: Option<u32>,
    fields: Vec<(String, String)>,
}

impl ResponseHeaders {
    /// Build from header lines as delivered by curl's header callback.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut headers = ResponseHeaders::default();
        for line in lines {
            headers.push_line(line.as_ref());
        }
        headers
    }

    /// Feed one raw header line. A status line starts a new block.
    pub(crate) fn push_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        if line.starts_with("HTTP/") {
            self.status = line
                .split_whitespace()
                .nth(1)
                .and_then(|code| code.parse::<u32>().ok());
            self.fields.clear();
            return;
        }
        if let Some((name, value)) = line.split_once(':') {
            self.fields
                .push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    /// Status code from the last status line seen, if any.
    pub fn status(&self) -> Option<u32> {
        self.status
    }

    /// First value for `name` (case-insensitive). Values are returned verbatim.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Like `get`, but an absent header reads as the empty string.
    pub fn get_or_empty(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_status_and_fields() {
        let h = ResponseHeaders::from_lines(&[
            "HTTP/1.1 200 OK\r\n",
            "ETag: \"abc-123\"\r\n",
            "Content-Length: 12345\r\n",
            "\r\n",
        ]);
        assert_eq!(h.status(), Some(200));
        assert_eq!(h.get("etag"), Some("\"abc-123\""));
        assert_eq!(h.get("CONTENT-LENGTH"), Some("12345"));
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn redirect_blocks_are_discarded() {
        let h = ResponseHeaders::from_lines(&[
            "HTTP/1.1 302 Found",
            "Location: /elsewhere",
            "ETag: \"old\"",
            "",
            "HTTP/1.1 200 OK",
            "Last-Modified: Wed, 21 Oct 2015 07:28:00 GMT",
        ]);
        assert_eq!(h.status(), Some(200));
        assert_eq!(h.get("Location"), None);
        assert_eq!(h.get("ETag"), None);
        assert_eq!(
            h.get("Last-Modified"),
            Some("Wed, 21 Oct 2015 07:28:00 GMT")
        );
    }

    #[test]
    fn missing_header_reads_empty() {
        let h = ResponseHeaders::from_lines(&["HTTP/2 200"]);
        assert_eq!(h.status(), Some(200));
        assert!(h.is_empty());
        assert_eq!(h.get_or_empty("ETag"), "");
    }

    #[test]
    fn first_value_wins_for_repeated_names() {
        let h = ResponseHeaders::from_lines(&["ETag: one", "etag: two"]);
        assert_eq!(h.get("ETag"), Some("one"));
    }

    #[test]
    fn value_with_colons_kept_intact() {
        let h = ResponseHeaders::from_lines(&["Last-Modified: Wed, 21 Oct 2015 07:28:00 GMT"]);
        assert_eq!(
            h.get_or_empty("last-modified"),
            "Wed, 21 Oct 2015 07:28:00 GMT"
        );
    }
}
