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

//! Lifecycle listing of non-current versions.

use std::time::Duration;

use log::info;
use serde::Serialize;

use crate::delimiter::grouping::DelimiterState;
use crate::delimiter::grouping::Grouping;
use crate::delimiter::lifecycle::LifecycleParams;
use crate::delimiter::lifecycle::ScanBudget;
use crate::delimiter::lifecycle::VersionFilter;
use crate::delimiter::versions::after_version_marker;
use crate::delimiter::versions::is_internal_key;
use crate::delimiter::versions::ChainEntry;
use crate::delimiter::versions::VersionChain;
use crate::entry::trim_metadata;
use crate::entry::ListingEntry;
use crate::entry::ObjectMd;
use crate::entry::VersionEntry;
use crate::extension::Extension;
use crate::extension::FilterResult;
use crate::extension::SkipTarget;
use crate::key_format::DbPrefix;
use crate::key_format::KeyLayout;
use crate::key_format::VFormat;
use crate::key_format::VersionKey;
use crate::range_params::MdParams;

/// Result of [`DelimiterNonCurrent`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NonCurrentResult {
    pub contents: Vec<VersionEntry>,
    pub is_truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_key_marker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_version_id_marker: Option<String>,
}

/// Lists every version that is no longer the current version of its object.
///
/// Versions of an object come newest first: the first one is current and is not reported,
/// every following one is reported with a `staleDate`, the last-modified date of the
/// version right before it.
///
/// The continuation pair is the last examined version. A listing resuming from it reads
/// it again, as the current version of the resumed chain, to recover the stale date of
/// the version after it.
#[derive(Debug)]
pub struct DelimiterNonCurrent {
    layout: &'static dyn KeyLayout,
    key_marker: Option<String>,
    version_id_marker: Option<String>,

    grouping: Grouping,
    state: DelimiterState,
    chain: VersionChain,
    filter: VersionFilter,
    budget: ScanBudget,

    prev_key: Option<String>,
    stale_date: Option<String>,

    contents: Vec<VersionEntry>,
    next_key_marker: Option<String>,
    next_version_id_marker: Option<String>,
}

impl DelimiterNonCurrent {
    pub fn new(params: LifecycleParams, vformat: VFormat) -> Self {
        let key_marker = params.marker.clone().filter(|m| !m.is_empty());
        let version_id_marker = key_marker
            .as_ref()
            .and(params.version_id_marker.clone())
            .filter(|m| !m.is_empty());

        Self {
            layout: vformat.layout(),
            filter: VersionFilter::new(&params),
            budget: ScanBudget::new(params.max_scanned_lifecycle_listing_entries),
            grouping: Grouping::new(params.prefix, None, params.max_keys),
            state: DelimiterState::NotSkipping,
            chain: VersionChain::default(),
            prev_key: None,
            stale_date: None,
            contents: vec![],
            next_key_marker: key_marker.clone(),
            next_version_id_marker: version_id_marker.clone(),
            key_marker,
            version_id_marker,
        }
    }

    /// Replace the default wall-clock budget of [`DELIMITER_TIMEOUT`](crate::DELIMITER_TIMEOUT).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.budget = self.budget.with_timeout(timeout);
        self
    }

    fn add_version(&mut self, object_key: &str, version_id: String, value: &str) {
        let md = ObjectMd::parse_or_warn(object_key, value);

        if self.prev_key.as_deref() == Some(object_key) {
            if let (Some(stale_date), Some(md)) = (&self.stale_date, &md) {
                if self.filter.is_before(Some(stale_date)) && self.filter.is_included_store(md) {
                    let entry = VersionEntry::new(object_key, &version_id, trim_metadata(value))
                        .with_stale_date(stale_date);
                    self.contents.push(entry);
                    self.grouping.keys += 1;
                }
            }
        } else {
            self.prev_key = Some(object_key.to_string());
        }

        self.stale_date = md.and_then(|md| md.last_modified);
        self.next_key_marker = Some(object_key.to_string());
        self.next_version_id_marker = Some(version_id);
    }
}

impl Extension for DelimiterNonCurrent {
    type Output = NonCurrentResult;

    fn gen_md_params(&self) -> MdParams {
        let mut params = self.grouping.range(None);

        if let Some(key_marker) = &self.key_marker {
            params = match &self.version_id_marker {
                Some(version_id) => params.starting_from(VersionKey::format(key_marker, version_id)),
                None => params.starting_after(&after_version_marker(key_marker, None)),
            };
        }

        self.layout.version_records_params(params)
    }

    fn filter(&mut self, entry: &ListingEntry) -> FilterResult {
        if let Err(exhausted) = self.budget.consume() {
            self.grouping.is_truncated = true;
            info!(
                "non-current version listing stopped by {} after {} entries, next markers: {:?} {:?}",
                exhausted, self.budget.scanned, self.next_key_marker, self.next_version_id_marker
            );
            return FilterResult::End;
        }

        let key = self.layout.object_key(&entry.key);

        if let DelimiterState::SkippingPrefix(prefix) = &self.state {
            if key.starts_with(prefix.as_str()) {
                return FilterResult::Skip;
            }
            self.state = DelimiterState::NotSkipping;
        }

        if is_internal_key(self.layout, key) {
            self.state = DelimiterState::SkippingPrefix(DbPrefix::REPLAY.to_string());
            return FilterResult::Skip;
        }

        if !self.grouping.matches_prefix(key) {
            return FilterResult::Skip;
        }

        let (object_key, version_id) = match self.chain.classify(key, &entry.value) {
            ChainEntry::Placeholder | ChainEntry::MasterDuplicate => return FilterResult::Accept,
            ChainEntry::Version {
                object_key,
                version_id,
            } => (object_key, version_id),
        };

        if self.grouping.reached_max_keys() {
            return FilterResult::End;
        }

        self.add_version(object_key, version_id, &entry.value);
        FilterResult::Accept
    }

    fn skipping(&self) -> SkipTarget {
        match &self.state {
            DelimiterState::SkippingPrefix(prefix) => SkipTarget::Single(prefix.clone()),
            DelimiterState::NotSkipping => SkipTarget::None,
        }
    }

    fn result(&mut self) -> NonCurrentResult {
        let truncated = self.grouping.is_truncated;

        NonCurrentResult {
            contents: self.contents.clone(),
            is_truncated: truncated,
            next_key_marker: self.next_key_marker.clone().filter(|_| truncated),
            next_version_id_marker: self.next_version_id_marker.clone().filter(|_| truncated),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn md(version_id: &str, last_modified: &str) -> String {
        format!(
            r#"{{"versionId":"{}","last-modified":"{}","dataStoreName":"us-east-1"}}"#,
            version_id, last_modified
        )
    }

    fn feed(ext: &mut DelimiterNonCurrent, entries: &[(&str, String)]) -> Vec<FilterResult> {
        entries
            .iter()
            .map(|(k, v)| ext.filter(&ListingEntry::new(k, v)))
            .collect()
    }

    fn chain_v1() -> Vec<(&'static str, String)> {
        vec![
            ("\x7fVkey\0va", md("va", "t2")),
            ("\x7fVkey\0vb", md("vb", "t1")),
            ("\x7fVkey\0vc", md("vc", "t0")),
        ]
    }

    #[test]
    fn test_three_version_chain() {
        let mut ext = DelimiterNonCurrent::new(LifecycleParams::default(), VFormat::V1);

        let got = feed(&mut ext, &chain_v1());
        assert_eq!(got, vec![FilterResult::Accept; 3]);

        let res = ext.result();
        assert_eq!(res.contents, vec![
            VersionEntry::new("key", "vb", md("vb", "t1")).with_stale_date("t2"),
            VersionEntry::new("key", "vc", md("vc", "t0")).with_stale_date("t1"),
        ]);
        assert!(!res.is_truncated);
        assert_eq!(res.next_key_marker, None);
    }

    #[test]
    fn test_three_version_chain_v0() {
        let mut ext = DelimiterNonCurrent::new(LifecycleParams::default(), VFormat::V0);

        feed(&mut ext, &[
            ("key", md("va", "t2")),
            ("key\0va", md("va", "t2")),
            ("key\0vb", md("vb", "t1")),
            ("key\0vc", md("vc", "t0")),
            ("other", md("vd", "t5")),
            ("other\0vd", md("vd", "t5")),
        ]);

        let res = ext.result();
        assert_eq!(res.contents, vec![
            VersionEntry::new("key", "vb", md("vb", "t1")).with_stale_date("t2"),
            VersionEntry::new("key", "vc", md("vc", "t0")).with_stale_date("t1"),
        ]);
    }

    #[test]
    fn test_before_date_applies_to_stale_date() {
        let mut ext = DelimiterNonCurrent::new(
            LifecycleParams {
                before_date: Some("t2".to_string()),
                ..Default::default()
            },
            VFormat::V1,
        );

        feed(&mut ext, &chain_v1());

        let res = ext.result();
        assert_eq!(res.contents, vec![
            VersionEntry::new("key", "vc", md("vc", "t0")).with_stale_date("t1"),
        ]);
    }

    #[test]
    fn test_malformed_payload_is_dropped() {
        let mut ext = DelimiterNonCurrent::new(LifecycleParams::default(), VFormat::V1);

        feed(&mut ext, &[
            ("\x7fVkey\0va", md("va", "t2")),
            ("\x7fVkey\0vb", "{not json".to_string()),
            ("\x7fVkey\0vc", md("vc", "t0")),
        ]);

        // The malformed version has no date to pass on either.
        assert!(ext.result().contents.is_empty());
    }

    #[test]
    fn test_max_keys_and_resume() {
        let mut ext = DelimiterNonCurrent::new(
            LifecycleParams {
                max_keys: Some(1),
                ..Default::default()
            },
            VFormat::V1,
        );

        let got = feed(&mut ext, &chain_v1());
        assert_eq!(got, vec![
            FilterResult::Accept,
            FilterResult::Accept,
            FilterResult::End
        ]);

        let res = ext.result();
        assert!(res.is_truncated);
        assert_eq!(res.next_key_marker.as_deref(), Some("key"));
        assert_eq!(res.next_version_id_marker.as_deref(), Some("vb"));

        let mut ext = DelimiterNonCurrent::new(
            LifecycleParams {
                marker: res.next_key_marker,
                version_id_marker: res.next_version_id_marker,
                ..Default::default()
            },
            VFormat::V1,
        );

        let MdParams::Single(range) = ext.gen_md_params() else {
            panic!("expect a single range");
        };
        assert_eq!(range.gte.as_deref(), Some("\x7fVkey\0vb"));

        feed(&mut ext, &chain_v1()[1..]);
        assert_eq!(ext.result().contents, vec![
            VersionEntry::new("key", "vc", md("vc", "t0")).with_stale_date("t1"),
        ]);
    }

    #[test]
    fn test_scanned_cap() {
        let mut ext = DelimiterNonCurrent::new(
            LifecycleParams {
                max_scanned_lifecycle_listing_entries: Some(1),
                ..Default::default()
            },
            VFormat::V1,
        );

        let got = feed(&mut ext, &chain_v1()[..2]);
        assert_eq!(got, vec![FilterResult::Accept, FilterResult::End]);

        let res = ext.result();
        assert!(res.is_truncated);
        assert!(res.contents.is_empty());
        assert_eq!(res.next_key_marker.as_deref(), Some("key"));
        assert_eq!(res.next_version_id_marker.as_deref(), Some("va"));
    }

    #[test]
    fn test_timeout_truncates() {
        let mut ext = DelimiterNonCurrent::new(LifecycleParams::default(), VFormat::V1);
        assert_eq!(feed(&mut ext, &chain_v1()[..1]), vec![FilterResult::Accept]);

        let mut ext = ext.with_timeout(Duration::ZERO);
        assert_eq!(feed(&mut ext, &chain_v1()[1..]), vec![FilterResult::End]);

        let res = ext.result();
        assert!(res.is_truncated);
        assert!(res.contents.is_empty());
        assert_eq!(res.next_key_marker.as_deref(), Some("key"));
        assert_eq!(res.next_version_id_marker.as_deref(), Some("va"));

        // Nothing examined: resume where the request started.
        let mut ext = DelimiterNonCurrent::new(
            LifecycleParams {
                marker: Some("key".to_string()),
                version_id_marker: Some("vb".to_string()),
                ..Default::default()
            },
            VFormat::V1,
        )
        .with_timeout(Duration::ZERO);
        assert_eq!(feed(&mut ext, &chain_v1()[1..2]), vec![FilterResult::End]);

        let res = ext.result();
        assert!(res.is_truncated);
        assert_eq!(res.next_key_marker.as_deref(), Some("key"));
        assert_eq!(res.next_version_id_marker.as_deref(), Some("vb"));
    }

    #[test]
    fn test_key_marker_without_version_skips_the_object() {
        let ext = DelimiterNonCurrent::new(
            LifecycleParams {
                marker: Some("key".to_string()),
                ..Default::default()
            },
            VFormat::V0,
        );

        let MdParams::Single(range) = ext.gen_md_params() else {
            panic!("expect a single range");
        };
        assert_eq!(range.gt.as_deref(), Some("key\u{1}"));
        assert_eq!(range.gte, None);
    }
}
