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

//! Listing of every version of every object.

use serde::Deserialize;
use serde::Serialize;

use crate::delimiter::grouping::DelimiterState;
use crate::delimiter::grouping::Grouping;
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
use crate::key_format::VID_SEP;
use crate::range_params::MdParams;
use crate::range_params::RangeParams;
use crate::util::inc;

/// What a record is within its object's version chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChainEntry<'k> {
    /// A placeholder master: consumed, never reported, the chain is left untouched.
    Placeholder,
    /// The version key of the master just seen: consumed, never reported twice.
    MasterDuplicate,
    /// A master or version record to report.
    Version {
        object_key: &'k str,
        version_id: String,
    },
}

/// Recognizes masters and their duplicate version keys while walking keys in order.
///
/// Versions of an object follow its master, newest first, so remembering the last master
/// is enough to tell whether a version key duplicates it.
#[derive(Debug, Clone, Default)]
pub(crate) struct VersionChain {
    master_key: Option<String>,
    master_version_id: Option<String>,
}

impl VersionChain {
    /// Classify a namespace-stripped key.
    pub(crate) fn classify<'k>(&mut self, key: &'k str, value: &str) -> ChainEntry<'k> {
        let parsed = VersionKey::parse(key);

        let Some(version_id) = parsed.version_id else {
            let md = ObjectMd::parse_or_warn(key, value);

            if md.as_ref().is_some_and(|md| md.is_phd()) {
                return ChainEntry::Placeholder;
            }

            let version_id = md
                .as_ref()
                .map_or("null", |md| md.master_version_id())
                .to_string();

            self.master_key = Some(key.to_string());
            self.master_version_id = Some(version_id.clone());

            return ChainEntry::Version {
                object_key: key,
                version_id,
            };
        };

        if self.master_key.as_deref() == Some(parsed.object_key)
            && self.master_version_id.as_deref() == Some(version_id)
        {
            return ChainEntry::MasterDuplicate;
        }

        ChainEntry::Version {
            object_key: parsed.object_key,
            version_id: version_id.to_string(),
        }
    }
}

/// Keys of the internal replay namespace share the v0 key space but are never listed.
pub(crate) fn is_internal_key(layout: &dyn KeyLayout, key: &str) -> bool {
    layout.vformat() == VFormat::V0 && key.starts_with(DbPrefix::REPLAY)
}

/// The lower bound of a listing resuming after `(key_marker, version_id_marker)`.
///
/// Without a version id marker, every version of `key_marker` is skipped.
pub(crate) fn after_version_marker(key_marker: &str, version_id_marker: Option<&str>) -> String {
    match version_id_marker {
        Some(version_id) => VersionKey::format(key_marker, version_id),
        None => format!("{}{}", key_marker, inc(&VID_SEP.to_string())),
    }
}

/// Request parameters of a version listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VersionsParams {
    pub delimiter: Option<String>,
    pub prefix: Option<String>,
    pub key_marker: Option<String>,
    pub version_id_marker: Option<String>,
    pub max_keys: Option<i64>,
}

/// Result of [`DelimiterVersions`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionsResult {
    pub common_prefixes: Vec<String>,
    pub versions: Vec<VersionEntry>,
    pub is_truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_key_marker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_version_id_marker: Option<String>,
}

/// Lists every version of every object, masters first, grouping keys by delimiter.
///
/// A master record is reported as the version its payload names; the version key that
/// duplicates it is consumed without being reported again. Placeholder masters are
/// consumed silently.
///
/// In v1 the listing needs one scan per namespace, merged by object key by the caller;
/// [`Extension::skipping`] then returns a target for each namespace.
#[derive(Debug)]
pub struct DelimiterVersions {
    layout: &'static dyn KeyLayout,
    key_marker: Option<String>,
    version_id_marker: Option<String>,

    grouping: Grouping,
    state: DelimiterState,
    chain: VersionChain,

    versions: Vec<VersionEntry>,
    next_key_marker: Option<String>,
    next_version_id_marker: Option<String>,
}

impl DelimiterVersions {
    pub fn new(params: VersionsParams, vformat: VFormat) -> Self {
        Self {
            layout: vformat.layout(),
            key_marker: params.key_marker.filter(|m| !m.is_empty()),
            version_id_marker: params.version_id_marker.filter(|m| !m.is_empty()),
            grouping: Grouping::new(params.prefix, params.delimiter, params.max_keys),
            state: DelimiterState::NotSkipping,
            chain: VersionChain::default(),
            versions: vec![],
            next_key_marker: None,
            next_version_id_marker: None,
        }
    }

    fn add_common_prefix_or_version(&mut self, object_key: &str, version_id: String, value: &str) {
        if let Some(common_prefix) = self.grouping.common_prefix(object_key) {
            self.grouping.add_common_prefix(&common_prefix);
            self.next_key_marker = Some(common_prefix.clone());
            self.next_version_id_marker = None;
            self.state = DelimiterState::SkippingPrefix(common_prefix);
            return;
        }

        self.versions.push(VersionEntry::new(
            object_key,
            &version_id,
            trim_metadata(value),
        ));
        self.grouping.keys += 1;
        self.next_key_marker = Some(object_key.to_string());
        self.next_version_id_marker = Some(version_id);
    }
}

impl Extension for DelimiterVersions {
    type Output = VersionsResult;

    fn gen_md_params(&self) -> MdParams {
        let mut params: RangeParams = self.grouping.range(self.key_marker.as_deref());

        if let Some(key_marker) = &self.key_marker {
            let after = after_version_marker(key_marker, self.version_id_marker.as_deref());
            params = params.starting_after(&after);
        }

        self.layout.versions_params(params)
    }

    fn filter(&mut self, entry: &ListingEntry) -> FilterResult {
        let key = self.layout.object_key(&entry.key);

        if is_internal_key(self.layout, key) {
            self.state = DelimiterState::SkippingPrefix(DbPrefix::REPLAY.to_string());
            return FilterResult::Skip;
        }

        let object_key = VersionKey::parse(key).object_key;
        if !self.grouping.matches_prefix(object_key) {
            return FilterResult::Skip;
        }

        if let DelimiterState::SkippingPrefix(prefix) = &self.state {
            if object_key.starts_with(prefix.as_str()) {
                return FilterResult::Skip;
            }
            self.state = DelimiterState::NotSkipping;
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

        self.add_common_prefix_or_version(object_key, version_id, &entry.value);
        FilterResult::Accept
    }

    fn skipping(&self) -> SkipTarget {
        match &self.state {
            DelimiterState::SkippingPrefix(prefix) => self.layout.versions_skip(prefix),
            DelimiterState::NotSkipping => SkipTarget::None,
        }
    }

    fn result(&mut self) -> VersionsResult {
        let truncated = self.grouping.is_truncated;

        VersionsResult {
            common_prefixes: self.grouping.common_prefixes.clone(),
            versions: self.versions.clone(),
            is_truncated: truncated,
            delimiter: self.grouping.delimiter.clone(),
            next_key_marker: self.next_key_marker.clone().filter(|_| truncated),
            next_version_id_marker: self.next_version_id_marker.clone().filter(|_| truncated),
        }
    }
}
