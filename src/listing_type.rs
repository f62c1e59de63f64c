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

//! Selecting a listing variant at runtime.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::delimiter::Delimiter;
use crate::delimiter::DelimiterCurrent;
use crate::delimiter::DelimiterMaster;
use crate::delimiter::DelimiterNonCurrent;
use crate::delimiter::DelimiterOrphanDeleteMarker;
use crate::delimiter::DelimiterResult;
use crate::delimiter::DelimiterVersions;
use crate::delimiter::NonCurrentResult;
use crate::delimiter::OrphanResult;
use crate::delimiter::VersionsResult;
use crate::entry::ListingEntry;
use crate::extension::Extension;
use crate::extension::FilterResult;
use crate::extension::SkipTarget;
use crate::key_format::VFormat;
use crate::range_params::MdParams;
use crate::ListingError;

/// The listing variants, by their request name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingType {
    Delimiter,
    DelimiterVersions,
    DelimiterMaster,
    DelimiterCurrent,
    DelimiterNonCurrent,
    DelimiterOrphanDeleteMarker,
}

impl ListingType {
    pub fn name(&self) -> &'static str {
        match self {
            ListingType::Delimiter => "Delimiter",
            ListingType::DelimiterVersions => "DelimiterVersions",
            ListingType::DelimiterMaster => "DelimiterMaster",
            ListingType::DelimiterCurrent => "DelimiterCurrent",
            ListingType::DelimiterNonCurrent => "DelimiterNonCurrent",
            ListingType::DelimiterOrphanDeleteMarker => "DelimiterOrphanDeleteMarker",
        }
    }

    /// Build a listing of this type from its JSON request parameters.
    pub fn build(
        self,
        params: serde_json::Value,
        vformat: VFormat,
    ) -> Result<BoxedExtension, ListingError> {
        let ext: BoxedExtension = match self {
            ListingType::Delimiter => {
                Box::new(Erased(Delimiter::new(serde_json::from_value(params)?, vformat)))
            }
            ListingType::DelimiterVersions => Box::new(Erased(DelimiterVersions::new(
                serde_json::from_value(params)?,
                vformat,
            ))),
            ListingType::DelimiterMaster => Box::new(Erased(DelimiterMaster::new(
                serde_json::from_value(params)?,
                vformat,
            ))),
            ListingType::DelimiterCurrent => Box::new(Erased(DelimiterCurrent::new(
                serde_json::from_value(params)?,
                vformat,
            ))),
            ListingType::DelimiterNonCurrent => Box::new(Erased(DelimiterNonCurrent::new(
                serde_json::from_value(params)?,
                vformat,
            ))),
            ListingType::DelimiterOrphanDeleteMarker => Box::new(Erased(
                DelimiterOrphanDeleteMarker::new(serde_json::from_value(params)?, vformat),
            )),
        };
        Ok(ext)
    }
}

impl fmt::Display for ListingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ListingType {
    type Err = ListingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = match s {
            "Delimiter" => ListingType::Delimiter,
            "DelimiterVersions" => ListingType::DelimiterVersions,
            "DelimiterMaster" => ListingType::DelimiterMaster,
            "DelimiterCurrent" => ListingType::DelimiterCurrent,
            "DelimiterNonCurrent" => ListingType::DelimiterNonCurrent,
            "DelimiterOrphanDeleteMarker" => ListingType::DelimiterOrphanDeleteMarker,
            _ => return Err(ListingError::not_implemented(format!("listing type {:?}", s))),
        };
        Ok(t)
    }
}

/// The result of any listing variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ListingResult {
    Delimiter(DelimiterResult),
    Versions(VersionsResult),
    NonCurrent(NonCurrentResult),
    Orphan(OrphanResult),
}

impl From<DelimiterResult> for ListingResult {
    fn from(r: DelimiterResult) -> Self {
        ListingResult::Delimiter(r)
    }
}

impl From<VersionsResult> for ListingResult {
    fn from(r: VersionsResult) -> Self {
        ListingResult::Versions(r)
    }
}

impl From<NonCurrentResult> for ListingResult {
    fn from(r: NonCurrentResult) -> Self {
        ListingResult::NonCurrent(r)
    }
}

impl From<OrphanResult> for ListingResult {
    fn from(r: OrphanResult) -> Self {
        ListingResult::Orphan(r)
    }
}

/// A listing variant chosen at runtime.
pub type BoxedExtension = Box<dyn Extension<Output = ListingResult> + Send>;

/// Build a listing from the request names of its type and key format.
pub fn new_listing(
    listing_type: &str,
    params: serde_json::Value,
    vformat: &str,
) -> Result<BoxedExtension, ListingError> {
    let listing_type: ListingType = listing_type.parse()?;
    let vformat: VFormat = vformat.parse()?;
    listing_type.build(params, vformat)
}

/// Converts the result of a concrete variant into a [`ListingResult`].
struct Erased<E>(E);

impl<E> Extension for Erased<E>
where
    E: Extension,
    E::Output: Into<ListingResult>,
{
    type Output = ListingResult;

    fn gen_md_params(&self) -> MdParams {
        self.0.gen_md_params()
    }

    fn filter(&mut self, entry: &ListingEntry) -> FilterResult {
        self.0.filter(entry)
    }

    fn skipping(&self) -> SkipTarget {
        self.0.skipping()
    }

    fn result(&mut self) -> ListingResult {
        self.0.result().into()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::entry::ObjectEntry;
    use crate::impls::memory::MemoryStore;
    use crate::list;

    #[test]
    fn test_listing_type_names() {
        for t in [
            ListingType::Delimiter,
            ListingType::DelimiterVersions,
            ListingType::DelimiterMaster,
            ListingType::DelimiterCurrent,
            ListingType::DelimiterNonCurrent,
            ListingType::DelimiterOrphanDeleteMarker,
        ] {
            assert_eq!(t.to_string().parse::<ListingType>().ok(), Some(t));
        }

        let err = "DelimiterFoo".parse::<ListingType>().err().map(|e| e.to_string());
        assert_eq!(
            err.as_deref(),
            Some(r#"NotImplemented: listing type "DelimiterFoo""#)
        );
    }

    #[test]
    fn test_unsupported_vformat() {
        let res = new_listing("Delimiter", json!({}), "v2");
        let err = res.err().map(|e| e.to_string());
        assert_eq!(err.as_deref(), Some(r#"NotImplemented: vFormat "v2""#));
    }

    #[test]
    fn test_invalid_params() {
        let res = new_listing("Delimiter", json!({"maxKeys": "ten"}), "v0");
        assert!(matches!(res, Err(ListingError::InvalidParams(_))));
    }

    #[tokio::test]
    async fn test_build_and_list() -> anyhow::Result<()> {
        let store = MemoryStore::from_iter([
            ("a", r#"{"versionId":"v1"}"#),
            ("a\0v1", r#"{"versionId":"v1"}"#),
            ("b", r#"{"versionId":"v2"}"#),
        ]);

        let ext = new_listing("DelimiterMaster", json!({"maxKeys": 1}), "v0")?;
        let res = list(&store, ext).await?;

        assert_eq!(
            res,
            ListingResult::Delimiter(DelimiterResult {
                contents: vec![ObjectEntry::new("a", r#"{"versionId":"v1"}"#)],
                is_truncated: true,
                next_marker: Some("a".to_string()),
                ..Default::default()
            })
        );

        Ok(())
    }
}
