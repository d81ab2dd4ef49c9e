use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::KgError;

static CURIE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*:\S+$").expect("CURIE pattern is valid")
});

/// A compact `prefix:local-id` identifier such as `HGNC:12791`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Curie(String);

impl Curie {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn prefix(&self) -> &str {
        self.0.split_once(':').map(|(prefix, _)| prefix).unwrap_or("")
    }

    pub fn local_id(&self) -> &str {
        self.0.split_once(':').map(|(_, local)| local).unwrap_or("")
    }
}

impl fmt::Display for Curie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Curie {
    type Err = KgError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if !CURIE_RE.is_match(trimmed) {
            return Err(KgError::InvalidCurie(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl TryFrom<String> for Curie {
    type Error = KgError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Curie> for String {
    fn from(value: Curie) -> Self {
        value.0
    }
}
