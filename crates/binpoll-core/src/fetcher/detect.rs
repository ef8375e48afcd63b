//! Header-based change detection.
//!
//! Each configured check header present in a HEAD response is counted; a
//! header whose value equals the one stored from the previous check is a
//! match. All present headers matching means the artifact is unchanged.

use std::collections::HashMap;

use crate::transport::ResponseHeaders;

/// Outcome of comparing one HEAD response against the stored values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Check headers that were present with a non-empty value.
    pub total: usize,
    /// Present headers whose value equals the stored one.
    pub matches: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Unchanged,
    Changed,
}

impl Observation {
    /// `matches == total` means unchanged, including `0 == 0` unless
    /// `missing_means_change` is set.
    pub fn verdict(&self, missing_means_change: bool) -> Verdict {
        if self.total == 0 && missing_means_change {
            return Verdict::Changed;
        }
        if self.matches == self.total {
            Verdict::Unchanged
        } else {
            Verdict::Changed
        }
    }
}

/// Last observed value per check header. Entries are overwritten, never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderLedger {
    last: HashMap<String, String>,
}

impl HeaderLedger {
    /// Compare `headers` against the stored values and record the new ones.
    ///
    /// Empty or absent headers are skipped entirely. Values compare as exact,
    /// case-sensitive strings.
    pub fn observe(&mut self, check_headers: &[String], headers: &ResponseHeaders) -> Observation {
        let mut obs = Observation {
            total: 0,
            matches: 0,
        };
        for name in check_headers {
            let current = headers.get_or_empty(name);
            if current.is_empty() {
                continue;
            }
            obs.total += 1;
            if self.last.get(name).is_some_and(|last| last == current) {
                obs.matches += 1;
            }
            self.last.insert(name.clone(), current.to_string());
        }
        obs
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.last.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}
