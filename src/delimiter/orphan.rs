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

//! Lifecycle listing of orphan delete markers.

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
use crate::range_params::MdParams;

/// Result of [`DelimiterOrphanDeleteMarker`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrphanResult {
    pub contents: Vec<VersionEntry>,
    pub is_truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_marker: Option<String>,
}

/// The newest version of the object being walked.
///
/// `value` is cleared once an older version shows up: the object is then not an orphan.
#[derive(Debug, Clone)]
struct Candidate {
    key: String,
    version_id: String,
    value: Option<String>,
}

/// Lists the delete markers that are the only remaining version of their object.
///
/// Whether a delete marker is an orphan is only known when the scan moves on to another
/// object, so the newest version of the current object is buffered until then. At the end
/// of the data the buffered version is flushed, unless the listing was truncated: a
/// truncated scan did not prove there is no older version.
#[derive(Debug)]
pub struct DelimiterOrphanDeleteMarker {
    layout: &'static dyn KeyLayout,
    marker: Option<String>,

    grouping: Grouping,
    state: DelimiterState,
    chain: VersionChain,
    filter: VersionFilter,
    budget: ScanBudget,

    candidate: Option<Candidate>,
    finished: bool,

    contents: Vec<VersionEntry>,
    /// The last object known to be fully examined.
    next_marker: Option<String>,
}

impl DelimiterOrphanDeleteMarker {
    pub fn new(params: LifecycleParams, vformat: VFormat) -> Self {
        Self {
            layout: vformat.layout(),
            filter: VersionFilter::new(&params),
            budget: ScanBudget::new(params.max_scanned_lifecycle_listing_entries),
            marker: params.marker.filter(|m| !m.is_empty()),
            grouping: Grouping::new(params.prefix, None, params.max_keys),
            state: DelimiterState::NotSkipping,
            chain: VersionChain::default(),
            candidate: None,
            finished: false,
            contents: vec![],
            next_marker: None,
        }
    }

    /// Replace the default wall-clock budget of [`DELIMITER_TIMEOUT`](crate::DELIMITER_TIMEOUT).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.budget = self.budget.with_timeout(timeout);
        self
    }

    fn add_version(&mut self, object_key: &str, version_id: String, value: &str) {
        if let Some(candidate) = &mut self.candidate {
            if candidate.key == object_key {
                candidate.value = None;
                self.next_marker = Some(object_key.to_string());
                return;
            }
        }

        if let Some(prev) = self.candidate.take() {
            self.next_marker = Some(prev.key.clone());
            self.add_orphan(&prev);
        }

        self.candidate = Some(Candidate {
            key: object_key.to_string(),
            version_id,
            value: Some(value.to_string()),
        });
    }

    /// The entry to report if `candidate` is an orphan delete marker.
    fn orphan_entry(&self, candidate: &Candidate) -> Option<VersionEntry> {
        let value = candidate.value.as_deref()?;
        let md = ObjectMd::parse_or_warn(&candidate.key, value)?;

        if !md.is_delete_marker() || !self.filter.is_before(md.last_modified.as_deref()) {
            return None;
        }

        Some(VersionEntry::new(
            &candidate.key,
            &candidate.version_id,
            trim_metadata(value),
        ))
    }

    fn add_orphan(&mut self, candidate: &Candidate) {
        if let Some(entry) = self.orphan_entry(candidate) {
            self.contents.push(entry);
            self.grouping.keys += 1;
        }
    }

    /// Decide on the buffered candidate once the scan is over.
    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        if self.grouping.is_truncated || self.grouping.max_keys <= 0 {
            return;
        }

        let Some(candidate) = self.candidate.take() else {
            return;
        };

        if self.grouping.keys < self.grouping.max_keys {
            self.next_marker = Some(candidate.key.clone());
            self.add_orphan(&candidate);
        } else if self.orphan_entry(&candidate).is_some() {
            self.grouping.is_truncated = true;
        }
    }
}

impl Extension for DelimiterOrphanDeleteMarker {
    type Output = OrphanResult;

    fn gen_md_params(&self) -> MdParams {
        let mut params = self.grouping.range(None);

        if let Some(marker) = &self.marker {
            params = params.starting_after(&after_version_marker(marker, None));
        }

        self.layout.version_records_params(params)
    }

    fn filter(&mut self, entry: &ListingEntry) -> FilterResult {
        if let Err(exhausted) = self.budget.consume() {
            self.grouping.is_truncated = true;
            info!(
                "orphan delete marker listing stopped by {} after {} entries, next marker: {:?}",
                exhausted,
                self.budget.scanned,
                self.next_marker.as_ref().or(self.marker.as_ref())
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

    fn result(&mut self) -> OrphanResult {
        self.finish();

        let truncated = self.grouping.is_truncated;
        let next_marker = self.next_marker.as_ref().or(self.marker.as_ref());

        OrphanResult {
            contents: self.contents.clone(),
            is_truncated: truncated,
            next_marker: next_marker.filter(|_| truncated).cloned(),
        }
    }
}
