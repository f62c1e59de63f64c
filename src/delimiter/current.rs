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

//! Lifecycle listing of current versions.

use std::time::Duration;

use log::info;

use crate::delimiter::base::DelimiterParams;
use crate::delimiter::base::DelimiterResult;
use crate::delimiter::lifecycle::LifecycleParams;
use crate::delimiter::lifecycle::ScanBudget;
use crate::delimiter::lifecycle::VersionFilter;
use crate::delimiter::master::DelimiterMaster;
use crate::entry::ListingEntry;
use crate::extension::Extension;
use crate::extension::FilterResult;
use crate::extension::SkipTarget;
use crate::key_format::VFormat;
use crate::range_params::MdParams;

/// Lists the current versions that a lifecycle expiration rule may apply to.
///
/// Only versions modified before `beforeDate` and not stored in `excludedDataStoreName`
/// are reported. Versions that fail these predicates still advance `NextMarker`, so a
/// listing that stops on its time or scan budget always makes progress.
#[derive(Debug)]
pub struct DelimiterCurrent {
    master: DelimiterMaster,
    filter: VersionFilter,
    sort_by_last_modified: bool,
    budget: ScanBudget,
}

impl DelimiterCurrent {
    pub fn new(params: LifecycleParams, vformat: VFormat) -> Self {
        let filter = VersionFilter::new(&params);

        let delimiter_params = DelimiterParams {
            prefix: params.prefix.clone(),
            marker: params.marker.clone(),
            max_keys: params.max_keys,
            ..Default::default()
        };

        Self {
            master: DelimiterMaster::new(delimiter_params, vformat).with_filter(filter.clone()),
            filter,
            sort_by_last_modified: params.sort_by_last_modified,
            budget: ScanBudget::new(params.max_scanned_lifecycle_listing_entries),
        }
    }

    /// Replace the default wall-clock budget of [`DELIMITER_TIMEOUT`](crate::DELIMITER_TIMEOUT).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.budget = self.budget.with_timeout(timeout);
        self
    }
}

impl Extension for DelimiterCurrent {
    type Output = DelimiterResult;

    fn gen_md_params(&self) -> MdParams {
        self.master.gen_md_params().map(|params| {
            let mut params = self.filter.push_down(params);
            params.sort_by_last_modified = self.sort_by_last_modified;
            params
        })
    }

    fn filter(&mut self, entry: &ListingEntry) -> FilterResult {
        if let Err(exhausted) = self.budget.consume() {
            self.master.listed.grouping.is_truncated = true;
            info!(
                "current version listing stopped by {} after {} entries, next marker: {:?}",
                exhausted, self.budget.scanned, self.master.listed.next_marker
            );
            return FilterResult::End;
        }
        self.master.filter(entry)
    }

    fn skipping(&self) -> SkipTarget {
        self.master.skipping()
    }

    fn result(&mut self) -> DelimiterResult {
        self.master.result()
    }
}
