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

//! The protocol every listing variant implements.
//!
//! A caller asks the extension for its range scan(s) with [`Extension::gen_md_params`],
//! feeds every scanned entry to [`Extension::filter`] until it returns
//! [`FilterResult::End`] or the scan is exhausted, then reads [`Extension::result`].
//! [`Extension::skipping`] tells a driver where a scan may be reopened to jump over entries
//! the extension would reject anyway, see [`crate::skip::Skip`].

use crate::entry::ListingEntry;
use crate::range_params::MdParams;

/// Outcome of filtering one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterResult {
    /// The entry is consumed; it may or may not be added to the output.
    Accept,
    /// The entry is rejected and listing continues.
    Skip,
    /// Listing must stop now.
    End,
}

/// A physical key from which a scan can be resumed without missing any wanted entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SkipTarget {
    #[default]
    None,
    Single(String),
    /// Master namespace key and version namespace key, for v1 version listings.
    Pair(String, String),
}

impl SkipTarget {
    pub fn is_none(&self) -> bool {
        matches!(self, SkipTarget::None)
    }

    pub fn map(&self, f: impl Fn(&str) -> String) -> Self {
        match self {
            SkipTarget::None => SkipTarget::None,
            SkipTarget::Single(k) => SkipTarget::Single(f(k)),
            SkipTarget::Pair(m, v) => SkipTarget::Pair(f(m), f(v)),
        }
    }
}

/// A listing variant: a per-request state machine over ordered entries.
///
/// An instance serves exactly one listing request and must never be fed the same entry twice.
pub trait Extension {
    type Output;

    /// The range scan(s) to run against the backend.
    fn gen_md_params(&self) -> MdParams;

    /// Consume one entry.
    fn filter(&mut self, entry: &ListingEntry) -> FilterResult;

    /// Where the scan may be resumed given the current state, without side effects.
    fn skipping(&self) -> SkipTarget;

    /// Build the listing result.
    ///
    /// Meaningful once filtering stopped. Continuation markers are only set when the result
    /// is truncated. Calling it more than once returns the same result.
    fn result(&mut self) -> Self::Output;
}

impl<E> Extension for Box<E>
where E: Extension + ?Sized
{
    type Output = E::Output;

    fn gen_md_params(&self) -> MdParams {
        (**self).gen_md_params()
    }

    fn filter(&mut self, entry: &ListingEntry) -> FilterResult {
        (**self).filter(entry)
    }

    fn skipping(&self) -> SkipTarget {
        (**self).skipping()
    }

    fn result(&mut self) -> Self::Output {
        (**self).result()
    }
}
