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

//! Physical key layouts of master and version records.
//!
//! Two mutually exclusive layouts exist, selected per bucket:
//!
//! - [`VFormat::V0`]: one namespace. The master record lives under the bare object key and
//!   every version under `<key><VID_SEP><versionId>`, so both kinds interleave in key order.
//! - [`VFormat::V1`]: master records live under [`DbPrefix::MASTER`] and every version,
//!   including the current one, under [`DbPrefix::VERSION`].
//!
//! The per-format behavior is captured by the [`KeyLayout`] strategy, chosen once when a
//! listing is built.

use std::fmt;
use std::str::FromStr;

use crate::extension::SkipTarget;
use crate::range_params::MdParams;
use crate::range_params::RangeParams;
use crate::ListingError;

/// Separates an object key from its version id in a version key.
///
/// It never appears in an object key.
pub const VID_SEP: char = '\0';

/// Namespace prefixes of the v1 layout.
pub struct DbPrefix;

impl DbPrefix {
    pub const MASTER: &'static str = "\x7fM";
    pub const VERSION: &'static str = "\x7fV";
    /// Internal records that must never be listed.
    pub const REPLAY: &'static str = "\x7fR";
}

/// A physical key split into its object key and optional version id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionKey<'k> {
    pub object_key: &'k str,
    pub version_id: Option<&'k str>,
}

impl<'k> VersionKey<'k> {
    /// Split a namespace-stripped key at the first [`VID_SEP`].
    pub fn parse(key: &'k str) -> Self {
        match key.find(VID_SEP) {
            Some(pos) => Self {
                object_key: &key[..pos],
                version_id: Some(&key[pos + VID_SEP.len_utf8()..]),
            },
            None => Self {
                object_key: key,
                version_id: None,
            },
        }
    }

    pub fn is_master(&self) -> bool {
        self.version_id.is_none()
    }

    pub fn format(object_key: &str, version_id: &str) -> String {
        format!("{}{}{}", object_key, VID_SEP, version_id)
    }
}

/// Key format version of a bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum VFormat {
    #[default]
    V0,
    V1,
}

impl VFormat {
    /// The layout strategy of this format.
    pub fn layout(self) -> &'static dyn KeyLayout {
        match self {
            VFormat::V0 => &V0Layout,
            VFormat::V1 => &V1Layout,
        }
    }
}

impl fmt::Display for VFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VFormat::V0 => write!(f, "v0"),
            VFormat::V1 => write!(f, "v1"),
        }
    }
}

impl FromStr for VFormat {
    type Err = ListingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v0" => Ok(VFormat::V0),
            "v1" => Ok(VFormat::V1),
            _ => Err(ListingError::not_implemented(format!("vFormat {:?}", s))),
        }
    }
}

/// Per-format translation between logical (v0-shaped) listing positions and physical keys.
pub trait KeyLayout: fmt::Debug + Send + Sync {
    fn vformat(&self) -> VFormat;

    /// Strip the namespace prefix, if any, from a physical key.
    fn object_key<'k>(&self, key: &'k str) -> &'k str;

    /// Physical range of master records only.
    fn master_params(&self, v0: RangeParams) -> MdParams;

    /// Physical range(s) covering master and version records, for version listings.
    ///
    /// In v1 this is one range per namespace; the caller merges them by object key.
    fn versions_params(&self, v0: RangeParams) -> MdParams;

    /// Physical range covering at least every version record.
    fn version_records_params(&self, v0: RangeParams) -> MdParams;

    /// Skip target for a logical position in a master-only listing.
    fn master_skip(&self, v0_key: &str) -> SkipTarget;

    /// Skip target for a logical position in a listing built with
    /// [`KeyLayout::versions_params`].
    fn versions_skip(&self, v0_key: &str) -> SkipTarget;
}

#[derive(Debug, Clone, Copy)]
pub struct V0Layout;

impl KeyLayout for V0Layout {
    fn vformat(&self) -> VFormat {
        VFormat::V0
    }

    fn object_key<'k>(&self, key: &'k str) -> &'k str {
        key
    }

    fn master_params(&self, v0: RangeParams) -> MdParams {
        MdParams::Single(v0)
    }

    fn versions_params(&self, v0: RangeParams) -> MdParams {
        MdParams::Single(v0)
    }

    fn version_records_params(&self, v0: RangeParams) -> MdParams {
        MdParams::Single(v0)
    }

    fn master_skip(&self, v0_key: &str) -> SkipTarget {
        SkipTarget::Single(v0_key.to_string())
    }

    fn versions_skip(&self, v0_key: &str) -> SkipTarget {
        SkipTarget::Single(v0_key.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct V1Layout;

impl KeyLayout for V1Layout {
    fn vformat(&self) -> VFormat {
        VFormat::V1
    }

    fn object_key<'k>(&self, key: &'k str) -> &'k str {
        key.strip_prefix(DbPrefix::MASTER)
            .or_else(|| key.strip_prefix(DbPrefix::VERSION))
            .unwrap_or(key)
    }

    fn master_params(&self, v0: RangeParams) -> MdParams {
        MdParams::Single(v0.into_namespace(DbPrefix::MASTER))
    }

    fn versions_params(&self, v0: RangeParams) -> MdParams {
        let master = v0.clone().into_namespace(DbPrefix::MASTER);
        let version = v0.into_namespace(DbPrefix::VERSION);
        MdParams::Pair(master, version)
    }

    fn version_records_params(&self, v0: RangeParams) -> MdParams {
        MdParams::Single(v0.into_namespace(DbPrefix::VERSION))
    }

    fn master_skip(&self, v0_key: &str) -> SkipTarget {
        SkipTarget::Single(format!("{}{}", DbPrefix::MASTER, v0_key))
    }

    fn versions_skip(&self, v0_key: &str) -> SkipTarget {
        SkipTarget::Pair(
            format!("{}{}", DbPrefix::MASTER, v0_key),
            format!("{}{}", DbPrefix::VERSION, v0_key),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_key_parse() {
        let k = VersionKey::parse("foo");
        assert_eq!(k.object_key, "foo");
        assert_eq!(k.version_id, None);
        assert!(k.is_master());

        let k = VersionKey::parse("foo\0v1");
        assert_eq!(k.object_key, "foo");
        assert_eq!(k.version_id, Some("v1"));
        assert!(!k.is_master());

        // The null version key carries an empty version id.
        let k = VersionKey::parse("foo\0");
        assert_eq!(k.version_id, Some(""));

        assert_eq!(VersionKey::format("a/b", "v9"), "a/b\0v9");
    }

    #[test]
    fn test_vformat_from_str() {
        assert_eq!("v0".parse::<VFormat>().unwrap(), VFormat::V0);
        assert_eq!("v1".parse::<VFormat>().unwrap(), VFormat::V1);

        let err = "v2".parse::<VFormat>().unwrap_err();
        assert!(matches!(err, ListingError::NotImplemented { .. }));
        assert_eq!(VFormat::V1.to_string(), "v1");
    }

    #[test]
    fn test_object_key() {
        assert_eq!(V0Layout.object_key("foo\0v1"), "foo\0v1");
        assert_eq!(V1Layout.object_key("\x7fMfoo"), "foo");
        assert_eq!(V1Layout.object_key("\x7fVfoo\0v1"), "foo\0v1");
        assert_eq!(V1Layout.object_key("plain"), "plain");
    }

    #[test]
    fn test_skip_targets() {
        assert_eq!(
            V0Layout.versions_skip("a/"),
            SkipTarget::Single("a/".to_string())
        );
        assert_eq!(
            V1Layout.master_skip("a/"),
            SkipTarget::Single("\x7fMa/".to_string())
        );
        assert_eq!(
            V1Layout.versions_skip("a/"),
            SkipTarget::Pair("\x7fMa/".to_string(), "\x7fVa/".to_string())
        );
    }

    #[test]
    fn test_versions_params_v1() {
        let v0 = RangeParams::prefix("a/");
        let MdParams::Pair(m, v) = V1Layout.versions_params(v0) else {
            panic!("expect two ranges");
        };
        assert_eq!(m.gte.as_deref(), Some("\x7fMa/"));
        assert_eq!(m.lt.as_deref(), Some("\x7fMa0"));
        assert_eq!(v.gte.as_deref(), Some("\x7fVa/"));
        assert_eq!(v.lt.as_deref(), Some("\x7fVa0"));
    }
}
