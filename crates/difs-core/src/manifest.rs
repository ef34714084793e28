//! Manifest records describing the segment range and shard layout of a file.
//!
//! The manifest JSON text is part of the external repository contract: a put
//! publishes `{"name","start","end"}` for its single logical range, a get
//! receives the same record extended with the `repos` shard list.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// One repository shard owning a contiguous sub-range of segment indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRange {
    /// Name prefix of the shard serving this range.
    pub name: String,
    /// First segment index owned by the shard.
    pub start: u64,
    /// Last segment index owned by the shard (inclusive).
    pub end: u64,
}

/// Manifest for one stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// URI of the stored file's data name.
    pub name: String,
    /// First segment index of the logical range.
    #[serde(default)]
    pub start: u64,
    /// Last segment index of the logical range (inclusive).
    #[serde(default)]
    pub end: u64,
    /// Shard layout. Empty on the put side; populated by the repository.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repos: Vec<RepoRange>,
}

impl Manifest {
    /// Manifest for a single logical range, as emitted on put.
    pub fn single(name: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            repos: Vec::new(),
        }
    }

    /// Manifest with an explicit shard layout, as returned on get.
    pub fn sharded(name: impl Into<String>, repos: Vec<RepoRange>) -> Self {
        let start = repos.iter().map(|r| r.start).min().unwrap_or(0);
        let end = repos.iter().map(|r| r.end).max().unwrap_or(0);
        Self {
            name: name.into(),
            start,
            end,
            repos,
        }
    }

    /// Number of segments in the logical range.
    pub fn segment_count(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CoreError::Manifest(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| CoreError::Manifest(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_manifest_shape() {
        let manifest = Manifest::single("/files/a.bin", 0, 2);
        let json = manifest.to_json().unwrap();
        assert_eq!(json, r#"{"name":"/files/a.bin","start":0,"end":2}"#);
    }

    #[test]
    fn test_get_manifest_round_trip() {
        let json = r#"{"name":"/files/a.bin","repos":[{"name":"/node0","start":0,"end":1},{"name":"/node1","start":2,"end":2}]}"#;
        let manifest = Manifest::from_json(json).unwrap();
        assert_eq!(manifest.name, "/files/a.bin");
        assert_eq!(manifest.repos.len(), 2);
        assert_eq!(manifest.repos[1].start, 2);
    }

    #[test]
    fn test_sharded_range_spans_shards() {
        let manifest = Manifest::sharded(
            "/f",
            vec![
                RepoRange {
                    name: "/node0".to_string(),
                    start: 0,
                    end: 99,
                },
                RepoRange {
                    name: "/node1".to_string(),
                    start: 100,
                    end: 249,
                },
            ],
        );
        assert_eq!(manifest.start, 0);
        assert_eq!(manifest.end, 249);
        assert_eq!(manifest.segment_count(), 250);
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(Manifest::from_json("{not json").is_err());
        assert!(Manifest::from_json(r#"{"start":0}"#).is_err());
    }
}
