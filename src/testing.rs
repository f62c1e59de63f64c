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

//! Test fixtures: object sets laid out as v0 or v1 stores.

use std::io;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use serde_json::json;

use crate::impls::memory::MemoryStore;
use crate::key_format::DbPrefix;
use crate::key_format::VFormat;
use crate::key_format::VersionKey;
use crate::range_params::RangeParams;
use crate::range_scan::RangeScan;
use crate::IOResultStream;
use crate::ListingEntry;

/// A version created at time `t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Version {
    pub(crate) t: u64,
    pub(crate) delete_marker: bool,
}

pub(crate) fn put(t: u64) -> Version {
    Version {
        t,
        delete_marker: false,
    }
}

pub(crate) fn del(t: u64) -> Version {
    Version {
        t,
        delete_marker: true,
    }
}

/// Version ids sort newest first, as in a real bucket.
pub(crate) fn vid(t: u64) -> String {
    format!("{:08}", 99_999_999 - t)
}

pub(crate) fn date(t: u64) -> String {
    format!("1970-01-01T00:00:00.{:03}Z", t)
}

pub(crate) fn md(v: Version) -> String {
    let mut md = json!({
        "versionId": vid(v.t),
        "last-modified": date(v.t),
        "dataStoreName": "us-east-1",
    });
    if v.delete_marker {
        md["isDeleteMarker"] = json!(true);
    }
    md.to_string()
}

#[derive(Debug, Clone)]
pub(crate) struct Object {
    pub(crate) key: String,
    /// Newest first.
    pub(crate) versions: Vec<Version>,
}

pub(crate) fn object(key: &str, versions: impl IntoIterator<Item = Version>) -> Object {
    let mut versions = versions.into_iter().collect::<Vec<_>>();
    versions.sort_by(|a, b| b.t.cmp(&a.t));
    Object {
        key: key.to_string(),
        versions,
    }
}

/// Lay `objects` out in the key format `vformat`.
pub(crate) fn store(vformat: VFormat, objects: &[Object]) -> MemoryStore {
    let mut store = MemoryStore::new();

    for obj in objects {
        let Some(current) = obj.versions.first() else {
            continue;
        };

        match vformat {
            VFormat::V0 => {
                store.insert(&obj.key, md(*current));
                for v in &obj.versions {
                    store.insert(VersionKey::format(&obj.key, &vid(v.t)), md(*v));
                }
            }
            VFormat::V1 => {
                store.insert(format!("{}{}", DbPrefix::MASTER, obj.key), md(*current));
                for v in &obj.versions {
                    let key = VersionKey::format(&obj.key, &vid(v.t));
                    store.insert(format!("{}{}", DbPrefix::VERSION, key), md(*v));
                }
            }
        }
    }

    store
}

/// A [`RangeScan`] that counts the scans opened on it.
#[derive(Debug, Default)]
pub(crate) struct CountingStore {
    pub(crate) inner: MemoryStore,
    pub(crate) scans: AtomicUsize,
}

impl CountingStore {
    pub(crate) fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            scans: AtomicUsize::new(0),
        }
    }

    pub(crate) fn scans(&self) -> usize {
        self.scans.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl RangeScan for CountingStore {
    async fn scan(&self, params: RangeParams) -> Result<IOResultStream<ListingEntry>, io::Error> {
        self.scans.fetch_add(1, Ordering::Relaxed);
        self.inner.scan(params).await
    }
}
