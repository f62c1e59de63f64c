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

//! Parameters and guards shared by the lifecycle listings.

use std::fmt;
use std::time::Duration;
use std::time::Instant;

use serde::Deserialize;

use crate::entry::ObjectMd;
use crate::range_params::DataStoreNameFilter;
use crate::range_params::LastModifiedFilter;
use crate::range_params::RangeParams;

/// Wall-clock budget of one lifecycle listing request.
pub const DELIMITER_TIMEOUT: Duration = Duration::from_secs(10);

/// Request parameters of the lifecycle listings:
/// [`DelimiterCurrent`](crate::DelimiterCurrent),
/// [`DelimiterNonCurrent`](crate::DelimiterNonCurrent) and
/// [`DelimiterOrphanDeleteMarker`](crate::DelimiterOrphanDeleteMarker).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LifecycleParams {
    pub prefix: Option<String>,

    /// The key to start after. Non-current listings also accept it as `keyMarker`.
    #[serde(alias = "keyMarker")]
    pub marker: Option<String>,

    /// With `marker`, the version to resume from, for non-current listings.
    pub version_id_marker: Option<String>,

    pub max_keys: Option<i64>,

    /// Only report entries whose reference date is strictly before this date.
    pub before_date: Option<String>,

    /// Do not report entries stored in this data store.
    pub excluded_data_store_name: Option<String>,

    /// Stop after examining this many entries, whatever was found.
    pub max_scanned_lifecycle_listing_entries: Option<usize>,

    /// Ask a backend that supports it to enumerate by last-modified date.
    pub sort_by_last_modified: bool,
}

/// The date and data store predicates of a lifecycle listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct VersionFilter {
    pub(crate) before_date: Option<String>,
    pub(crate) excluded_data_store_name: Option<String>,
}

impl VersionFilter {
    pub(crate) fn new(params: &LifecycleParams) -> Self {
        Self {
            before_date: params.before_date.clone().filter(|d| !d.is_empty()),
            excluded_data_store_name: params
                .excluded_data_store_name
                .clone()
                .filter(|d| !d.is_empty()),
        }
    }

    /// Whether `date` is before the cutoff. An unknown date never is, unless there is no cutoff.
    pub(crate) fn is_before(&self, date: Option<&str>) -> bool {
        match &self.before_date {
            None => true,
            Some(before) => date.is_some_and(|d| d < before.as_str()),
        }
    }

    pub(crate) fn is_included_store(&self, md: &ObjectMd) -> bool {
        match &self.excluded_data_store_name {
            None => true,
            Some(excluded) => md.data_store_name.as_deref() != Some(excluded.as_str()),
        }
    }

    /// Ask the backend to apply the predicates itself, if it can.
    pub(crate) fn push_down(&self, mut params: RangeParams) -> RangeParams {
        if let Some(lt) = &self.before_date {
            params.last_modified = Some(LastModifiedFilter { lt: lt.clone() });
        }
        if let Some(ne) = &self.excluded_data_store_name {
            params.data_store_name = Some(DataStoreNameFilter { ne: ne.clone() });
        }
        params
    }
}

/// Why a lifecycle listing stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Exhausted {
    Timeout,
    MaxScannedEntries,
}

impl fmt::Display for Exhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exhausted::Timeout => write!(f, "listing timeout"),
            Exhausted::MaxScannedEntries => write!(f, "maximum scanned entries limit"),
        }
    }
}

/// Bounds the cost of one lifecycle listing, in time and in entries examined.
///
/// Exhausting the budget is not an error: the listing completes truncated, with a
/// continuation marker at the last examined position.
#[derive(Debug, Clone)]
pub(crate) struct ScanBudget {
    start: Instant,
    timeout: Duration,
    max_scanned: Option<usize>,
    pub(crate) scanned: usize,
}

impl ScanBudget {
    pub(crate) fn new(max_scanned: Option<usize>) -> Self {
        Self {
            start: Instant::now(),
            timeout: DELIMITER_TIMEOUT,
            max_scanned,
            scanned: 0,
        }
    }

    pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Account for one more entry, or tell why no more entry may be examined.
    pub(crate) fn consume(&mut self) -> Result<(), Exhausted> {
        if self.start.elapsed() >= self.timeout {
            return Err(Exhausted::Timeout);
        }
        if let Some(max) = self.max_scanned {
            if self.scanned >= max {
                return Err(Exhausted::MaxScannedEntries);
            }
        }
        self.scanned += 1;
        Ok(())
    }
}
