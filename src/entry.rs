// Copyright 2021 Datafuse Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Listing entries and the few object metadata fields a listing inspects.

use std::borrow::Cow;

use log::warn;
use serde::Deserialize;
use serde::Serialize;

/// Values at least this long have their part location list stripped before being returned.
pub const TRIM_METADATA_MIN_BLOB_SIZE: usize = 10_000;

/// A record returned by a backend range scan.
///
/// `key` is in physical form, i.e., it may carry a v1 namespace prefix.
/// `value` is a serialized object metadata record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingEntry {
    pub key: String,
    pub value: String,
}

impl ListingEntry {
    pub fn new(key: impl ToString, value: impl ToString) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// The fields of an object metadata record that drive listing decisions.
///
/// Every other field is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ObjectMd {
    #[serde(rename = "versionId", default)]
    pub version_id: Option<String>,

    #[serde(rename = "last-modified", default)]
    pub last_modified: Option<String>,

    #[serde(rename = "isDeleteMarker", default)]
    pub is_delete_marker: Option<bool>,

    /// A placeholder master whose real current version is being repaired.
    #[serde(rename = "isPHD", default)]
    pub is_phd: Option<bool>,

    #[serde(rename = "dataStoreName", default)]
    pub data_store_name: Option<String>,
}

impl ObjectMd {
    pub fn parse(value: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(value)
    }

    /// Parse a record, logging and returning `None` if it is malformed.
    pub fn parse_or_warn(key: &str, value: &str) -> Option<Self> {
        match Self::parse(value) {
            Ok(md) => Some(md),
            Err(e) => {
                warn!(
                    "could not parse object metadata while listing: key={:?} error={}",
                    key, e
                );
                None
            }
        }
    }

    pub fn is_delete_marker(&self) -> bool {
        self.is_delete_marker.unwrap_or(false)
    }

    pub fn is_phd(&self) -> bool {
        self.is_phd.unwrap_or(false)
    }

    /// The version id of a master record; a master without one is the `"null"` version.
    pub fn master_version_id(&self) -> &str {
        self.version_id.as_deref().unwrap_or("null")
    }
}

/// Remove the part location list from a large metadata record.
///
/// Small values are returned as is. If the value can not be parsed, it is returned
/// untrimmed: a bigger response is preferred over a failed listing.
pub fn trim_metadata(value: &str) -> Cow<'_, str> {
    if value.len() < TRIM_METADATA_MIN_BLOB_SIZE {
        return Cow::Borrowed(value);
    }

    let mut md = match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(value) {
        Ok(md) => md,
        Err(e) => {
            warn!(
                "could not parse object metadata to trim it, returning it untrimmed: len={} error={}",
                value.len(),
                e
            );
            return Cow::Borrowed(value);
        }
    };

    if md.remove("location").is_none() {
        return Cow::Borrowed(value);
    }

    match serde_json::to_string(&md) {
        Ok(trimmed) => Cow::Owned(trimmed),
        Err(e) => {
            warn!("could not serialize trimmed object metadata: error={}", e);
            Cow::Borrowed(value)
        }
    }
}

/// An object in a `Contents` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectEntry {
    pub key: String,
    pub value: String,
}

impl ObjectEntry {
    pub fn new(key: impl ToString, value: impl ToString) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// A specific version of an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub key: String,
    pub version_id: String,
    pub value: String,

    /// When this version became non-current: the last-modified time of the version that
    /// replaced it. Only set by non-current version listings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_date: Option<String>,
}

impl VersionEntry {
    pub fn new(key: impl ToString, version_id: impl ToString, value: impl ToString) -> Self {
        Self {
            key: key.to_string(),
            version_id: version_id.to_string(),
            value: value.to_string(),
            stale_date: None,
        }
    }

    pub fn with_stale_date(mut self, stale_date: impl ToString) -> Self {
        self.stale_date = Some(stale_date.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_md_parse() {
        let md = ObjectMd::parse(
            r#"{"versionId":"v1","last-modified":"2024-01-01T00:00:00.000Z","isDeleteMarker":true,"dataStoreName":"cold","content-length":0}"#,
        )
        .unwrap();

        assert_eq!(md.version_id.as_deref(), Some("v1"));
        assert_eq!(md.last_modified.as_deref(), Some("2024-01-01T00:00:00.000Z"));
        assert!(md.is_delete_marker());
        assert!(!md.is_phd());
        assert_eq!(md.data_store_name.as_deref(), Some("cold"));
        assert_eq!(md.master_version_id(), "v1");

        let md = ObjectMd::parse("{}").unwrap();
        assert_eq!(md.master_version_id(), "null");

        assert!(ObjectMd::parse("not json").is_err());
        assert_eq!(ObjectMd::parse_or_warn("k", "not json"), None);
    }

    #[test]
    fn test_trim_metadata_small_value_untouched() {
        let v = r#"{"location":[{"key":"1"}]}"#;
        assert!(matches!(trim_metadata(v), Cow::Borrowed(_)));
        assert_eq!(trim_metadata(v), v);
    }

    #[test]
    fn test_trim_metadata_large_value() {
        let parts = (0..1000)
            .map(|i| format!(r#"{{"key":"part-{:04}"}}"#, i))
            .collect::<Vec<_>>()
            .join(",");
        let v = format!(r#"{{"versionId":"v1","location":[{}]}}"#, parts);
        assert!(v.len() >= TRIM_METADATA_MIN_BLOB_SIZE);

        let trimmed = trim_metadata(&v);
        assert_eq!(trimmed, r#"{"versionId":"v1"}"#);
    }

    #[test]
    fn test_trim_metadata_unparsable_large_value() {
        let v = "x".repeat(TRIM_METADATA_MIN_BLOB_SIZE);
        assert_eq!(trim_metadata(&v), v.as_str());
    }
}
