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

//! The listing variants.
//!
//! Every variant is an [`Extension`](crate::Extension) composed from a few shared parts:
//! the key layout of the bucket, the prefix and delimiter grouping, the version chain
//! classifier and, for lifecycle listings, the version filter and scan budget.

mod base;
mod current;
mod grouping;
mod lifecycle;
mod master;
mod non_current;
mod orphan;
mod versions;

pub use base::Delimiter;
pub use base::DelimiterParams;
pub use base::DelimiterResult;
pub use current::DelimiterCurrent;
pub use lifecycle::LifecycleParams;
pub use lifecycle::DELIMITER_TIMEOUT;
pub use master::DelimiterMaster;
pub use non_current::DelimiterNonCurrent;
pub use non_current::NonCurrentResult;
pub use orphan::DelimiterOrphanDeleteMarker;
pub use orphan::OrphanResult;
pub use versions::DelimiterVersions;
pub use versions::VersionsParams;
pub use versions::VersionsResult;
