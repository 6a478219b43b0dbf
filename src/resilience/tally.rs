//! Process-wide failure tally, reported at shutdown

use std::collections::BTreeMap;
use std::fmt;

/// Code a failure is tallied under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureCode {
    /// Transport-level failure (timeout, connection reset, DNS)
    Network,

    /// Non-success HTTP status
    Http(u16),

    /// Response body could not be decoded
    Malformed,

    /// Feed returned items out of reverse-chronological order
    Unordered,
}

impl FailureCode {
    pub fn to_db_string(&self) -> String {
        match self {
            Self::Network => "network".to_string(),
            Self::Http(status) => status.to_string(),
            Self::Malformed => "malformed".to_string(),
            Self::Unordered => "unordered".to_string(),
        }
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(status) => write!(f, "HTTP {}", status),
            other => f.write_str(&other.to_db_string()),
        }
    }
}

/// Occurrence count per failure code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorTally {
    counts: BTreeMap<FailureCode, u64>,
}

impl ErrorTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, code: FailureCode) {
        *self.counts.entry(code).or_insert(0) += 1;
    }

    pub fn count(&self, code: FailureCode) -> u64 {
        self.counts.get(&code).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Codes with their counts, most frequent first
    pub fn by_frequency(&self) -> Vec<(FailureCode, u64)> {
        let mut entries: Vec<_> = self.counts.iter().map(|(c, n)| (*c, *n)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        entries
    }
}

impl fmt::Display for ErrorTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .counts
            .iter()
            .map(|(code, count)| format!("{}={}", code, count))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}
