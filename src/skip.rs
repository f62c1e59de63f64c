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

//! Drives an [`Extension`] over a range scan, jumping over long runs of skipped entries.

use log::debug;
use log::warn;

use crate::entry::ListingEntry;
use crate::extension::Extension;
use crate::extension::FilterResult;
use crate::range_params::MdParams;
use crate::util::inc;

/// Number of consecutive skipped entries after which the scan is reopened further.
pub const MAX_STREAK_LENGTH: usize = 100;

/// What the owner of the scan has to do after an entry was filtered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipAction {
    /// Feed the next entry.
    Continue,
    /// Close the scan; the listing is complete.
    End,
    /// Close the scan and open a new one with these ranges.
    SkipRange(MdParams),
}

/// Feeds entries to an [`Extension`] and decides when to reopen the scan.
///
/// Entries under an already reported common prefix are rejected one by one. Once
/// [`MAX_STREAK_LENGTH`] of them are rejected in a row, and the extension can tell where
/// the rejected run ends, it is cheaper to start a new scan right after the run.
#[derive(Debug)]
pub struct Skip<E> {
    extension: E,
    params: MdParams,
    streak_length: usize,
}

impl<E> Skip<E>
where E: Extension
{
    pub fn new(extension: E) -> Self {
        let params = extension.gen_md_params();
        Self {
            extension,
            params,
            streak_length: 0,
        }
    }

    /// The ranges currently being scanned.
    pub fn params(&self) -> &MdParams {
        &self.params
    }

    pub fn extension(&self) -> &E {
        &self.extension
    }

    pub fn into_extension(self) -> E {
        self.extension
    }

    pub fn result(&mut self) -> E::Output {
        self.extension.result()
    }

    pub fn filter(&mut self, entry: &ListingEntry) -> SkipAction {
        match self.extension.filter(entry) {
            FilterResult::End => return SkipAction::End,
            FilterResult::Accept => {
                self.streak_length = 0;
                return SkipAction::Continue;
            }
            FilterResult::Skip => {}
        }

        let skipping = self.extension.skipping();
        if skipping.is_none() {
            self.streak_length = 0;
            return SkipAction::Continue;
        }

        self.streak_length += 1;
        if self.streak_length < MAX_STREAK_LENGTH {
            return SkipAction::Continue;
        }

        // The skip target is the last key to jump over; the new scan starts right after it.
        let target = skipping.map(inc);

        if self.params.starts_at(&target) {
            // Reopening at the same place would loop forever.
            self.streak_length = 0;
            return SkipAction::Continue;
        }

        self.streak_length = 0;

        let Some(params) = self.params.resume_at(&target) else {
            warn!(
                "skip target {:?} does not match the scanned ranges {:?}, keep scanning",
                target, self.params
            );
            return SkipAction::Continue;
        };

        debug!("reopen listing scan at {:?}", target);

        self.params = params.clone();
        SkipAction::SkipRange(params)
    }
}
