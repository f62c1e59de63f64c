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

//! Range-scan descriptors handed to the backend.

use serde::Serialize;

use crate::extension::SkipTarget;
use crate::util::inc;

/// Pushdown filter: only records last modified strictly before `lt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastModifiedFilter {
    pub lt: String,
}

/// Pushdown filter: only records whose data store name is not `ne`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataStoreNameFilter {
    pub ne: String,
}

/// One ordered range scan over the backend.
///
/// `gt`/`gte` and `lt`/`lte` are mutually exclusive lower and upper bounds.
/// The pushdown filters are hints: a backend that does not support them returns unfiltered
/// records and the listing filters them itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    pub keys: bool,
    pub values: bool,
    pub reverse: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<LastModifiedFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_store_name: Option<DataStoreNameFilter>,
    pub sort_by_last_modified: bool,
}

impl Default for RangeParams {
    fn default() -> Self {
        Self {
            gt: None,
            gte: None,
            lt: None,
            lte: None,
            limit: None,
            keys: true,
            values: true,
            reverse: false,
            last_modified: None,
            data_store_name: None,
            sort_by_last_modified: false,
        }
    }
}

impl RangeParams {
    /// The range of every key starting with `prefix`; an empty prefix is unbounded.
    pub fn prefix(prefix: &str) -> Self {
        if prefix.is_empty() {
            return Self::default();
        }

        Self {
            gte: Some(prefix.to_string()),
            lt: Some(inc(prefix)),
            ..Default::default()
        }
    }

    /// Raise the lower bound to `key`, inclusive, unless the range already starts later.
    pub fn starting_from(mut self, key: String) -> Self {
        if self.lower_bound().map_or(true, |lb| lb < key.as_str()) {
            self.gt = None;
            self.gte = Some(key);
        }
        self
    }

    /// Start strictly after `marker`, unless the range already starts later.
    pub fn starting_after(mut self, marker: &str) -> Self {
        if let Some(gte) = &self.gte {
            if gte.as_str() > marker {
                return self;
            }
        }
        self.gte = None;
        self.gt = Some(marker.to_string());
        self
    }

    /// The lower bound key, inclusive or not.
    pub fn lower_bound(&self) -> Option<&str> {
        self.gte.as_deref().or(self.gt.as_deref())
    }

    /// Move the lower bound to `key`, inclusive, keeping every other parameter.
    pub fn resume_at(&self, key: &str) -> Self {
        Self {
            gt: None,
            gte: Some(key.to_string()),
            ..self.clone()
        }
    }

    /// Prefix the bounds of a v0 range with a v1 namespace.
    ///
    /// Missing bounds become the bounds of the namespace itself, so the result never leaks
    /// into a neighbor namespace.
    pub fn into_namespace(mut self, namespace: &str) -> Self {
        let ns = |k: &String| format!("{}{}", namespace, k);

        if self.gt.is_some() {
            self.gt = self.gt.take().map(|k| ns(&k));
        } else if self.gte.is_some() {
            self.gte = self.gte.take().map(|k| ns(&k));
        } else {
            self.gte = Some(namespace.to_string());
        }

        if self.lt.is_some() {
            self.lt = self.lt.take().map(|k| ns(&k));
        } else if self.lte.is_some() {
            self.lte = self.lte.take().map(|k| ns(&k));
        } else {
            self.lt = Some(inc(namespace));
        }

        self
    }

    /// Whether `key` lies within the bounds.
    pub fn contains(&self, key: &str) -> bool {
        if let Some(gt) = &self.gt {
            if key <= gt.as_str() {
                return false;
            }
        }
        if let Some(gte) = &self.gte {
            if key < gte.as_str() {
                return false;
            }
        }
        if let Some(lt) = &self.lt {
            if key >= lt.as_str() {
                return false;
            }
        }
        if let Some(lte) = &self.lte {
            if key > lte.as_str() {
                return false;
            }
        }
        true
    }
}

/// The range scan(s) a listing needs: one, or one per v1 namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MdParams {
    Single(RangeParams),
    /// Master namespace range and version namespace range, to be merged by object key.
    Pair(RangeParams, RangeParams),
}

impl MdParams {
    pub fn ranges(&self) -> Vec<&RangeParams> {
        match self {
            MdParams::Single(p) => vec![p],
            MdParams::Pair(m, v) => vec![m, v],
        }
    }

    pub fn map(self, f: impl Fn(RangeParams) -> RangeParams) -> Self {
        match self {
            MdParams::Single(p) => MdParams::Single(f(p)),
            MdParams::Pair(m, v) => MdParams::Pair(f(m), f(v)),
        }
    }

    /// Whether the ranges already start exactly at `target`.
    pub fn starts_at(&self, target: &SkipTarget) -> bool {
        match (self, target) {
            (MdParams::Single(p), SkipTarget::Single(k)) => p.gte.as_ref() == Some(k),
            (MdParams::Pair(m, v), SkipTarget::Pair(km, kv)) => {
                m.gte.as_ref() == Some(km) && v.gte.as_ref() == Some(kv)
            }
            _ => false,
        }
    }

    /// Reopen the ranges at `target`.
    ///
    /// Returns `None` if the target does not have the same shape as the ranges.
    pub fn resume_at(&self, target: &SkipTarget) -> Option<Self> {
        match (self, target) {
            (MdParams::Single(p), SkipTarget::Single(k)) => Some(MdParams::Single(p.resume_at(k))),
            (MdParams::Pair(m, v), SkipTarget::Pair(km, kv)) => {
                Some(MdParams::Pair(m.resume_at(km), v.resume_at(kv)))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix() {
        let p = RangeParams::prefix("notes/");
        assert_eq!(p.gte.as_deref(), Some("notes/"));
        assert_eq!(p.lt.as_deref(), Some("notes0"));
        assert!(p.keys && p.values && !p.reverse);

        assert_eq!(RangeParams::prefix(""), RangeParams::default());
    }

    #[test]
    fn test_starting_after() {
        let p = RangeParams::prefix("b").starting_after("a");
        assert_eq!(p.gte.as_deref(), Some("b"));
        assert_eq!(p.gt, None);

        let p = RangeParams::prefix("b").starting_after("b1");
        assert_eq!(p.gte, None);
        assert_eq!(p.gt.as_deref(), Some("b1"));
        assert_eq!(p.lt.as_deref(), Some("c"));
    }

    #[test]
    fn test_starting_from() {
        let p = RangeParams::default().starting_after("a").starting_from("b".to_string());
        assert_eq!(p.gt, None);
        assert_eq!(p.gte.as_deref(), Some("b"));

        let p = RangeParams::prefix("c").starting_from("b".to_string());
        assert_eq!(p.gte.as_deref(), Some("c"));
    }

    #[test]
    fn test_into_namespace() {
        let p = RangeParams::default().into_namespace("\x7fM");
        assert_eq!(p.gte.as_deref(), Some("\x7fM"));
        assert_eq!(p.lt.as_deref(), Some("\x7fN"));

        let p = RangeParams::prefix("a").starting_after("a1").into_namespace("\x7fV");
        assert_eq!(p.gt.as_deref(), Some("\x7fVa1"));
        assert_eq!(p.gte, None);
        assert_eq!(p.lt.as_deref(), Some("\x7fVb"));

        let p = RangeParams {
            lte: Some("z".to_string()),
            ..Default::default()
        }
        .into_namespace("\x7fM");
        assert_eq!(p.lte.as_deref(), Some("\x7fMz"));
        assert_eq!(p.lt, None);
    }

    #[test]
    fn test_contains() {
        let p = RangeParams::prefix("b").starting_after("b1");
        assert!(!p.contains("b"));
        assert!(!p.contains("b1"));
        assert!(p.contains("b2"));
        assert!(!p.contains("c"));

        let p = RangeParams {
            lte: Some("m".to_string()),
            ..Default::default()
        };
        assert!(p.contains("m"));
        assert!(!p.contains("m0"));
    }

    #[test]
    fn test_md_params_resume_at() {
        let params = MdParams::Single(RangeParams::prefix("a").starting_after("a1"));
        let target = SkipTarget::Single("a5".to_string());
        assert!(!params.starts_at(&target));

        let resumed = params.resume_at(&target).unwrap();
        assert!(resumed.starts_at(&target));
        let MdParams::Single(p) = &resumed else {
            panic!("expect single range");
        };
        assert_eq!(p.gt, None);
        assert_eq!(p.lt.as_deref(), Some("b"));

        let pair = SkipTarget::Pair("m".to_string(), "v".to_string());
        assert_eq!(params.resume_at(&pair), None);
    }
}
