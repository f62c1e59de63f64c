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

//! # Listing API
//!
//! S3-style listings computed over an ordered index of object metadata records.
//!
//! A listing request is served by an [`Extension`]: it tells which key ranges to scan, then
//! consumes the scanned entries one by one and builds the result: flat or delimiter listings,
//! version listings, and the lifecycle views of current versions, non-current versions and
//! orphan delete markers. The backend only has to implement ordered range scans,
//! [`RangeScan`].
//!
//! ## Core Components
//!
//! - [`Extension`]: the per-request listing state machine, implemented by every variant in
//!   [`delimiter`]
//! - [`KeyLayout`]: the physical key layout of master and version records, see [`VFormat`]
//! - [`Skip`]: reopens the scan after a long run of skipped entries
//! - [`list()`]: runs an extension against a [`RangeScan`] backend
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::io;
//!
//! use listing_api::impls::memory::MemoryStore;
//! use listing_api::list;
//! use listing_api::Delimiter;
//! use listing_api::DelimiterParams;
//! use listing_api::VFormat;
//!
//! #[tokio::main]
//! async fn main() -> io::Result<()> {
//!     let store = MemoryStore::from_iter([
//!         ("notes/spring/1.txt", "{}"),
//!         ("notes/summer/1.txt", "{}"),
//!         ("notes/year.txt", "{}"),
//!     ]);
//!
//!     let params = DelimiterParams {
//!         prefix: Some("notes/".to_string()),
//!         delimiter: Some("/".to_string()),
//!         ..Default::default()
//!     };
//!
//!     let res = list(&store, Delimiter::new(params, VFormat::V0)).await?;
//!     assert_eq!(res.common_prefixes, vec!["notes/spring/", "notes/summer/"]);
//!
//!     Ok(())
//! }
//! ```

use std::io;

use futures_util::stream::BoxStream;

pub mod delimiter;
pub mod entry;
pub mod errors;
pub mod extension;
pub mod impls;
pub mod key_format;
pub mod list;
pub mod listing_type;
pub mod range_params;
pub mod range_scan;
pub mod skip;
pub mod util;

#[cfg(test)]
mod testing;

pub use crate::delimiter::Delimiter;
pub use crate::delimiter::DelimiterCurrent;
pub use crate::delimiter::DelimiterMaster;
pub use crate::delimiter::DelimiterNonCurrent;
pub use crate::delimiter::DelimiterOrphanDeleteMarker;
pub use crate::delimiter::DelimiterParams;
pub use crate::delimiter::DelimiterResult;
pub use crate::delimiter::DelimiterVersions;
pub use crate::delimiter::LifecycleParams;
pub use crate::delimiter::NonCurrentResult;
pub use crate::delimiter::OrphanResult;
pub use crate::delimiter::VersionsParams;
pub use crate::delimiter::VersionsResult;
pub use crate::delimiter::DELIMITER_TIMEOUT;
pub use crate::entry::ListingEntry;
pub use crate::entry::ObjectEntry;
pub use crate::entry::VersionEntry;
pub use crate::errors::ListingError;
pub use crate::extension::Extension;
pub use crate::extension::FilterResult;
pub use crate::extension::SkipTarget;
pub use crate::key_format::KeyLayout;
pub use crate::key_format::VFormat;
pub use crate::list::list;
pub use crate::listing_type::new_listing;
pub use crate::listing_type::BoxedExtension;
pub use crate::listing_type::ListingResult;
pub use crate::listing_type::ListingType;
pub use crate::range_params::MdParams;
pub use crate::range_params::RangeParams;
pub use crate::range_scan::RangeScan;
pub use crate::skip::Skip;
pub use crate::skip::SkipAction;
pub use crate::skip::MAX_STREAK_LENGTH;

/// A boxed stream that yields `Result` of entries or an `io::Error`.
/// The stream is 'static so that it does not borrow the backend it is scanned from.
pub type IOResultStream<T> = BoxStream<'static, Result<T, io::Error>>;
