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

//! Defines the backend interface a listing runs against.
//!
//! The backend only has to execute ordered range scans described by [`RangeParams`]; every
//! listing semantic is computed by the [`Extension`](crate::Extension) fed with the scanned
//! entries.

use std::io;

use crate::entry::ListingEntry;
use crate::range_params::RangeParams;
use crate::IOResultStream;

/// An ordered key-value index that can be scanned by range.
///
/// # Examples
///
/// ```rust,no_run
/// use std::io;
///
/// use futures_util::TryStreamExt;
/// use listing_api::impls::memory::MemoryStore;
/// use listing_api::RangeParams;
/// use listing_api::RangeScan;
///
/// #[tokio::main]
/// async fn main() -> io::Result<()> {
///     let store = MemoryStore::from_iter([("a", "{}"), ("b", "{}")]);
///
///     let strm = store.scan(RangeParams::prefix("a")).await?;
///     let entries = strm.try_collect::<Vec<_>>().await?;
///     assert_eq!(entries.len(), 1);
///
///     Ok(())
/// }
/// ```
#[async_trait::async_trait]
pub trait RangeScan: Send + Sync {
    /// Scan the entries within `params`, in key order, or in reverse key order if
    /// `params.reverse` is set.
    ///
    /// A backend may ignore the pushdown filters of `params`: listings apply them anyway.
    async fn scan(&self, params: RangeParams) -> Result<IOResultStream<ListingEntry>, io::Error>;
}

#[async_trait::async_trait]
impl<T> RangeScan for &T
where T: RangeScan + ?Sized
{
    async fn scan(&self, params: RangeParams) -> Result<IOResultStream<ListingEntry>, io::Error> {
        (**self).scan(params).await
    }
}
