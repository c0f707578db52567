use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Store location identifier such as `L07`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(String);

impl LocationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric suffix of ids following the `L<n>` pattern.
    pub fn number(&self) -> Option<u32> {
        let caps = location_pattern()?.captures(&self.0)?;
        caps[1].parse().ok()
    }

    pub fn from_number(number: u32) -> Self {
        Self(format!("L{number:02}"))
    }

    /// Next free id after the highest numbered one in `existing`.
    pub fn next_after<'a>(existing: impl IntoIterator<Item = &'a LocationId>) -> Self {
        let max = existing.into_iter().filter_map(LocationId::number).max();
        Self::from_number(max.map(|value| value + 1).unwrap_or(1))
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocationId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

fn location_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[Ll]0*(\d+)$").ok())
        .as_ref()
}
