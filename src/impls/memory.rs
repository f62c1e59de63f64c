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

//! Provides an in-memory backend for listings.
//!
//! [`MemoryStore`] keeps entries in a [`BTreeMap`]. It's primarily intended for testing and
//! demonstration purposes.

use std::collections::BTreeMap;
use std::io;
use std::ops::Bound;

use futures_util::StreamExt;
use log::debug;
use log::warn;

use crate::entry::ListingEntry;
use crate::range_params::RangeParams;
use crate::range_scan::RangeScan;
use crate::IOResultStream;

/// An in-memory ordered index of object metadata records.
///
/// Pushdown filters are not supported and are ignored.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore(BTreeMap<String, String>);

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl ToString, value: impl ToString) {
        self.0.insert(key.to_string(), value.to_string());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for MemoryStore
where
    K: ToString,
    V: ToString,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (k, v) in iter {
            store.insert(k, v);
        }
        store
    }
}

/// Convert the bounds of `params` to `BTreeMap` range bounds.
///
/// Returns `None` if the range is empty: `BTreeMap::range()` panics on some of them.
fn range_bounds(params: &RangeParams) -> Option<(Bound<String>, Bound<String>)> {
    let start = match (&params.gt, &params.gte) {
        (Some(k), _) => Bound::Excluded(k.clone()),
        (None, Some(k)) => Bound::Included(k.clone()),
        (None, None) => Bound::Unbounded,
    };

    let end = match (&params.lt, &params.lte) {
        (Some(k), _) => Bound::Excluded(k.clone()),
        (None, Some(k)) => Bound::Included(k.clone()),
        (None, None) => Bound::Unbounded,
    };

    let empty = match (&start, &end) {
        (Bound::Included(s), Bound::Included(e)) => s > e,
        (Bound::Included(s) | Bound::Excluded(s), Bound::Included(e) | Bound::Excluded(e)) => s >= e,
        _ => false,
    };

    if empty {
        None
    } else {
        Some((start, end))
    }
}

#[async_trait::async_trait]
impl RangeScan for MemoryStore {
    async fn scan(&self, params: RangeParams) -> Result<IOResultStream<ListingEntry>, io::Error> {
        if params.last_modified.is_some()
            || params.data_store_name.is_some()
            || params.sort_by_last_modified
        {
            debug!("MemoryStore::scan() ignores pushdown filters: {:?}", params);
        }

        // The store is borrowed. It has to copy the result to make the returning stream static.
        let mut vec = match range_bounds(&params) {
            None => vec![],
            Some(bounds) => self
                .0
                .range::<String, _>(bounds)
                .map(|(k, v)| {
                    let value = if params.values { v.as_str() } else { "" };
                    ListingEntry::new(k, value)
                })
                .collect::<Vec<_>>(),
        };

        if params.reverse {
            vec.reverse();
        }
        if let Some(limit) = params.limit {
            vec.truncate(limit);
        }

        if vec.len() > 1000 {
            warn!("MemoryStore::scan() returns big range of len={}", vec.len());
        }

        let strm = futures::stream::iter(vec).map(Ok).boxed();
        Ok(strm)
    }
}
