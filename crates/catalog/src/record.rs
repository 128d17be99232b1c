use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::Status;

/// Store-assigned identifier of a catalog record.
pub type RecordId = u64;

/// Opaque value that changes on every successful write of a record.
///
/// Only ever compared for equality. The textual form is 32 lowercase hex
/// characters so it can travel in an `ETag` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionToken(Uuid);

impl VersionToken {
    /// Mint a token that has not been handed out before.
    pub fn fresh() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed version token '{0}'")]
pub struct ParseVersionError(String);

impl FromStr for VersionToken {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches("W/").trim_matches('"');
        Uuid::try_parse(trimmed)
            .map(Self)
            .map_err(|_| ParseVersionError(s.to_string()))
    }
}

/// A persisted catalog entry as the store holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRecord {
    pub id: RecordId,
    pub title: String,
    pub author: Option<String>,
    pub catalog_number: String,
    pub status: Status,
    pub version: VersionToken,
}

impl CatalogRecord {
    /// External-facing projection; never carries the version token.
    pub fn view(&self) -> RecordView {
        RecordView::from(self)
    }
}

/// Fields needed to create a record. Every new record starts on the shelf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    pub catalog_number: String,
}

/// Incoming edit of an existing record.
///
/// `expected_versions` are the tokens the caller is prepared to overwrite;
/// the edit goes ahead if the stored token is any of them. When empty, the
/// token of the record loaded at update time is used instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    pub title: String,
    pub author: Option<String>,
    pub status: Status,
    pub expected_versions: Vec<VersionToken>,
}

impl EditRequest {
    pub fn new(title: impl Into<String>, author: Option<String>, status: Status) -> Self {
        Self {
            title: title.into(),
            author,
            status,
            expected_versions: Vec::new(),
        }
    }

    pub fn with_expected_version(mut self, version: VersionToken) -> Self {
        self.expected_versions.push(version);
        self
    }
}

/// Record shape exposed to callers outside the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordView {
    pub id: RecordId,
    pub title: String,
    pub author: Option<String>,
    pub catalog_number: String,
    pub status: Status,
}

impl From<&CatalogRecord> for RecordView {
    fn from(record: &CatalogRecord) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            author: record.author.clone(),
            catalog_number: record.catalog_number.clone(),
            status: record.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tokens_differ() {
        assert_ne!(VersionToken::fresh(), VersionToken::fresh());
    }

    #[test]
    fn token_text_accepts_quoted_etag() {
        let token = VersionToken::fresh();
        let text = token.to_string();
        assert_eq!(text.len(), 32);
        assert_eq!(format!("\"{text}\"").parse::<VersionToken>().unwrap(), token);
        assert_eq!(format!("W/\"{text}\"").parse::<VersionToken>().unwrap(), token);
        assert!("not-a-token".parse::<VersionToken>().is_err());
    }

    #[test]
    fn token_bytes_round_trip() {
        let token = VersionToken::fresh();
        assert_eq!(VersionToken::from_bytes(*token.as_bytes()), token);
    }
}
