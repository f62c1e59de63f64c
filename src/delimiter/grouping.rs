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

//! Prefix filtering, delimiter grouping and key counting shared by the listing variants.

use crate::range_params::RangeParams;
use crate::util::check_limit;
use crate::util::inc;
use crate::util::DEFAULT_MAX_KEYS;

/// State of the common-prefix state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) enum DelimiterState {
    #[default]
    NotSkipping,
    /// A common prefix was just reported; every key under it is skipped.
    SkippingPrefix(String),
}

/// Listing-wide bookkeeping: prefix, delimiter, common prefixes and the `maxKeys` cap.
#[derive(Debug, Clone)]
pub(crate) struct Grouping {
    pub(crate) prefix: String,
    pub(crate) delimiter: Option<String>,
    pub(crate) max_keys: i64,

    /// Number of entries and common prefixes reported so far.
    pub(crate) keys: i64,
    pub(crate) is_truncated: bool,
    pub(crate) common_prefixes: Vec<String>,
}

impl Grouping {
    pub(crate) fn new(prefix: Option<String>, delimiter: Option<String>, max_keys: Option<i64>) -> Self {
        Self {
            prefix: prefix.unwrap_or_default(),
            delimiter: delimiter.filter(|d| !d.is_empty()),
            max_keys: check_limit(max_keys, DEFAULT_MAX_KEYS),
            keys: 0,
            is_truncated: false,
            common_prefixes: vec![],
        }
    }

    pub(crate) fn matches_prefix(&self, key: &str) -> bool {
        key.starts_with(&self.prefix)
    }

    /// The part of `key` up to and including the first delimiter after the prefix.
    pub(crate) fn common_prefix(&self, key: &str) -> Option<String> {
        let delimiter = self.delimiter.as_deref()?;
        let rest = key.strip_prefix(self.prefix.as_str())?;
        let pos = rest.find(delimiter)?;
        let end = self.prefix.len() + pos + delimiter.len();
        Some(key[..end].to_string())
    }

    /// Whether no more entry can be reported. Marks the listing truncated if so.
    pub(crate) fn reached_max_keys(&mut self) -> bool {
        if self.keys >= self.max_keys {
            self.is_truncated = self.max_keys > 0;
            return true;
        }
        false
    }

    /// Record a common prefix. Returns `false` if it was already the last one reported.
    pub(crate) fn add_common_prefix(&mut self, common_prefix: &str) -> bool {
        if self.common_prefixes.last().map(|p| p.as_str()) == Some(common_prefix) {
            return false;
        }
        self.common_prefixes.push(common_prefix.to_string());
        self.keys += 1;
        true
    }

    /// The logical range of the request before the marker is applied.
    ///
    /// If the marker lies under a common prefix, that prefix was already reported by a
    /// previous page, so the range starts right after it.
    pub(crate) fn range(&self, marker: Option<&str>) -> RangeParams {
        let params = RangeParams::prefix(&self.prefix);

        match marker.and_then(|m| self.common_prefix(m)) {
            Some(common_prefix) => params.starting_from(inc(&common_prefix)),
            None => params,
        }
    }
}
