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

//! Key and limit helpers shared by all listing variants.

use std::io;

use crate::entry::ListingEntry;
use crate::key_format::VFormat;

/// Number of keys returned by a listing when the request does not say otherwise.
pub const DEFAULT_MAX_KEYS: i64 = 1000;

/// Return the smallest string that is greater than every string prefixed with `s`.
///
/// The last character's code point is incremented by one, so `inc("a") == "b"` and
/// `inc(prefix)` is the exclusive upper bound of a prefix range.
/// A character that can not be incremented (`char::MAX`) is dropped and the increment
/// carries into the previous one. An empty string is returned unchanged.
pub fn inc(s: &str) -> String {
    let mut chars = s.chars().collect::<Vec<_>>();

    while let Some(last) = chars.pop() {
        if let Some(next) = next_char(last) {
            chars.push(next);
            return chars.into_iter().collect();
        }
    }

    s.to_string()
}

fn next_char(c: char) -> Option<char> {
    match c {
        // Skip the surrogate range, which is not a valid `char`.
        '\u{D7FF}' => Some('\u{E000}'),
        char::MAX => None,
        c => char::from_u32(c as u32 + 1),
    }
}

/// Clamp a requested number of keys to `limit`.
///
/// A missing value means `limit`. Values above `limit` are clamped; values at or below zero
/// are kept as is, and produce an empty, non-truncated listing.
pub fn check_limit(requested: Option<i64>, limit: i64) -> i64 {
    match requested {
        Some(n) if n <= limit => n,
        _ => limit,
    }
}

/// Comparator to merge the master and version namespace scans of a v1 bucket.
///
/// Entries are ordered by their namespace-stripped key, so that a master record comes right
/// before the version records of the same object.
///
/// Returns `true` if `r1` should be placed before `r2`.
pub fn by_object_key(r1: &Result<ListingEntry, io::Error>, r2: &Result<ListingEntry, io::Error>) -> bool {
    match (r1, r2) {
        (Ok(e1), Ok(e2)) => {
            let layout = VFormat::V1.layout();
            layout.object_key(&e1.key) <= layout.object_key(&e2.key)
        }
        // Errors are yielded as soon as possible, the consumer stops on the first one.
        _ => true,
    }
}
