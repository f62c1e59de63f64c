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

//! Runs a listing against a [`RangeScan`] backend.

use std::io;

use futures_util::StreamExt;
use futures_util::TryStreamExt;
use stream_more::KMerge;

use crate::entry::ListingEntry;
use crate::extension::Extension;
use crate::range_params::MdParams;
use crate::range_scan::RangeScan;
use crate::skip::Skip;
use crate::skip::SkipAction;
use crate::util;
use crate::IOResultStream;

/// Run `extension` to completion over `store` and return its result.
///
/// The ranges of [`Extension::gen_md_params`] are scanned; the two scans of a v1 version
/// listing are merged by object key. The scan is reopened whenever the [`Skip`] driver
/// finds a long run of rejected entries, and stops when the extension ends the listing
/// or the data is exhausted.
pub async fn list<S, E>(store: &S, extension: E) -> Result<E::Output, io::Error>
where
    S: RangeScan + ?Sized,
    E: Extension,
{
    let mut skip = Skip::new(extension);
    let mut strm = open_scan(store, skip.params()).await?;

    while let Some(entry) = strm.try_next().await? {
        match skip.filter(&entry) {
            SkipAction::Continue => {}
            SkipAction::End => break,
            SkipAction::SkipRange(params) => {
                strm = open_scan(store, &params).await?;
            }
        }
    }

    Ok(skip.result())
}

async fn open_scan<S>(store: &S, params: &MdParams) -> Result<IOResultStream<ListingEntry>, io::Error>
where S: RangeScan + ?Sized {
    match params {
        MdParams::Single(p) => store.scan(p.clone()).await,
        MdParams::Pair(master, version) => {
            let master = store.scan(master.clone()).await?;
            let version = store.scan(version.clone()).await?;

            let kmerge = KMerge::by(util::by_object_key);
            let kmerge = kmerge.merge(master).merge(version);
            Ok(kmerge.boxed())
        }
    }
}
