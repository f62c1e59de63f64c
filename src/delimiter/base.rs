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

//! Flat and delimiter listing of master keys.

use serde::Deserialize;
use serde::Serialize;

use crate::delimiter::grouping::DelimiterState;
use crate::delimiter::grouping::Grouping;
use crate::entry::trim_metadata;
use crate::entry::ListingEntry;
use crate::entry::ObjectEntry;
use crate::extension::Extension;
use crate::extension::FilterResult;
use crate::extension::SkipTarget;
use crate::key_format::KeyLayout;
use crate::key_format::VFormat;
use crate::range_params::MdParams;

/// Request parameters of a (non-versioned) object listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DelimiterParams {
    pub delimiter: Option<String>,
    pub prefix: Option<String>,
    pub marker: Option<String>,
    pub max_keys: Option<i64>,

    /// Use the `ListObjectsV2` convention: `startAfter`/`continuationToken` instead of
    /// `marker`, and `NextContinuationToken` instead of `NextMarker`.
    pub v2: bool,
    pub start_after: Option<String>,
    pub continuation_token: Option<String>,
}

impl DelimiterParams {
    /// The key after which this listing starts.
    pub fn start_marker(&self) -> Option<String> {
        let marker = if self.v2 {
            self.continuation_token.as_ref().or(self.start_after.as_ref())
        } else {
            self.marker.as_ref()
        };
        marker.filter(|m| !m.is_empty()).cloned()
    }
}

/// Result of [`Delimiter`], [`DelimiterMaster`](crate::DelimiterMaster) and
/// [`DelimiterCurrent`](crate::DelimiterCurrent).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DelimiterResult {
    pub common_prefixes: Vec<String>,
    pub contents: Vec<ObjectEntry>,
    pub is_truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_marker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_continuation_token: Option<String>,
}

/// The contents accumulated by a master-key listing and its continuation position.
#[derive(Debug, Clone)]
pub(crate) struct MasterContents {
    pub(crate) grouping: Grouping,
    pub(crate) contents: Vec<ObjectEntry>,
    /// The last examined position: the last reported key or common prefix, or the marker
    /// of the request if nothing was examined yet.
    pub(crate) next_marker: Option<String>,
    pub(crate) v2: bool,
}

impl MasterContents {
    pub(crate) fn new(params: &DelimiterParams) -> Self {
        Self {
            grouping: Grouping::new(
                params.prefix.clone(),
                params.delimiter.clone(),
                params.max_keys,
            ),
            contents: vec![],
            next_marker: params.start_marker(),
            v2: params.v2,
        }
    }

    /// Report `key` or its common prefix. Returns the common prefix if one was reported.
    pub(crate) fn add_common_prefix_or_contents(&mut self, key: &str, value: &str) -> Option<String> {
        if let Some(common_prefix) = self.grouping.common_prefix(key) {
            self.grouping.add_common_prefix(&common_prefix);
            self.next_marker = Some(common_prefix.clone());
            return Some(common_prefix);
        }

        self.contents
            .push(ObjectEntry::new(key, trim_metadata(value)));
        self.grouping.keys += 1;
        self.next_marker = Some(key.to_string());
        None
    }

    pub(crate) fn result(&self) -> DelimiterResult {
        let truncated = self.grouping.is_truncated;
        let next = if truncated {
            self.next_marker.clone()
        } else {
            None
        };

        let (next_marker, next_continuation_token) = if self.v2 {
            (None, next)
        } else {
            (next, None)
        };

        DelimiterResult {
            common_prefixes: self.grouping.common_prefixes.clone(),
            contents: self.contents.clone(),
            is_truncated: truncated,
            delimiter: self.grouping.delimiter.clone(),
            next_marker,
            next_continuation_token,
        }
    }
}

/// Lists the keys of a non-versioned bucket, grouping them by delimiter.
///
/// Every key under a reported common prefix is skipped; [`Extension::skipping`] then
/// returns that prefix so a driver can jump over it.
#[derive(Debug)]
pub struct Delimiter {
    layout: &'static dyn KeyLayout,
    marker: Option<String>,
    state: DelimiterState,
    listed: MasterContents,
}

impl Delimiter {
    pub fn new(params: DelimiterParams, vformat: VFormat) -> Self {
        Self {
            layout: vformat.layout(),
            marker: params.start_marker(),
            state: DelimiterState::NotSkipping,
            listed: MasterContents::new(&params),
        }
    }

    /// Whether `key` lies under the common prefix being skipped. Leaves the skipping state
    /// on the first key out of it.
    fn skips_common_prefix(&mut self, key: &str) -> bool {
        if let DelimiterState::SkippingPrefix(prefix) = &self.state {
            if key.starts_with(prefix.as_str()) {
                return true;
            }
            self.state = DelimiterState::NotSkipping;
        }
        false
    }

    fn handle_key(&mut self, key: &str, value: &str) -> FilterResult {
        if let Some(common_prefix) = self.listed.add_common_prefix_or_contents(key, value) {
            self.state = DelimiterState::SkippingPrefix(common_prefix);
        }
        FilterResult::Accept
    }
}

impl Extension for Delimiter {
    type Output = DelimiterResult;

    fn gen_md_params(&self) -> MdParams {
        let mut params = self.listed.grouping.range(self.marker.as_deref());
        if let Some(marker) = &self.marker {
            params = params.starting_after(marker);
        }
        self.layout.master_params(params)
    }

    fn filter(&mut self, entry: &ListingEntry) -> FilterResult {
        let key = self.layout.object_key(&entry.key);

        if !self.listed.grouping.matches_prefix(key) {
            return FilterResult::Skip;
        }
        // Keys folded into an already reported common prefix do not count against maxKeys.
        if self.skips_common_prefix(key) {
            return FilterResult::Skip;
        }
        if self.listed.grouping.reached_max_keys() {
            return FilterResult::End;
        }
        self.handle_key(key, &entry.value)
    }

    fn skipping(&self) -> SkipTarget {
        match &self.state {
            DelimiterState::SkippingPrefix(prefix) => self.layout.master_skip(prefix),
            DelimiterState::NotSkipping => SkipTarget::None,
        }
    }

    fn result(&mut self) -> DelimiterResult {
        self.listed.result()
    }
}
