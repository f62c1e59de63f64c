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

//! Listing of the current version of every object of a versioned bucket.

use crate::delimiter::base::DelimiterParams;
use crate::delimiter::base::DelimiterResult;
use crate::delimiter::base::MasterContents;
use crate::delimiter::lifecycle::VersionFilter;
use crate::delimiter::versions::after_version_marker;
use crate::delimiter::versions::is_internal_key;
use crate::entry::ListingEntry;
use crate::entry::ObjectMd;
use crate::extension::Extension;
use crate::extension::FilterResult;
use crate::extension::SkipTarget;
use crate::key_format::DbPrefix;
use crate::key_format::KeyLayout;
use crate::key_format::VFormat;
use crate::key_format::VersionKey;
use crate::key_format::VID_SEP;
use crate::range_params::MdParams;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum MasterState {
    #[default]
    NotSkipping,
    SkippingPrefix(String),
    /// Skip the version keys of this master, v0 only.
    SkippingVersions(String),
    /// This master is a placeholder: its first version key, if any, is the current version.
    WaitVersionAfterPhd(String),
}

fn is_version_of(key: &str, master_key: &str) -> bool {
    let parsed = VersionKey::parse(key);
    !parsed.is_master() && parsed.object_key == master_key
}

/// Lists current versions only, as `Contents`.
///
/// Objects whose current version is a delete marker are not listed. In v0 the version keys
/// following a master are skipped, and a placeholder master is replaced by the first
/// version key that follows it.
#[derive(Debug)]
pub struct DelimiterMaster {
    layout: &'static dyn KeyLayout,
    marker: Option<String>,
    state: MasterState,
    pub(crate) listed: MasterContents,

    /// Lifecycle predicates; a master that fails them is consumed but not reported.
    filter: Option<VersionFilter>,
}

impl DelimiterMaster {
    pub fn new(params: DelimiterParams, vformat: VFormat) -> Self {
        Self {
            layout: vformat.layout(),
            marker: params.start_marker(),
            state: MasterState::NotSkipping,
            listed: MasterContents::new(&params),
            filter: None,
        }
    }

    pub(crate) fn with_filter(mut self, filter: VersionFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    fn handle_key(&mut self, key: &str, value: &str) -> FilterResult {
        loop {
            match &self.state {
                MasterState::NotSkipping => return self.on_key(key, value),
                MasterState::SkippingPrefix(prefix) => {
                    if key.starts_with(prefix.as_str()) {
                        return FilterResult::Skip;
                    }
                }
                MasterState::SkippingVersions(master_key) => {
                    if is_version_of(key, master_key) {
                        return FilterResult::Skip;
                    }
                }
                MasterState::WaitVersionAfterPhd(master_key) => {
                    if is_version_of(key, master_key) {
                        let master_key = master_key.clone();
                        return self.on_new_master(&master_key, value);
                    }
                }
            }
            self.state = MasterState::NotSkipping;
        }
    }

    fn on_key(&mut self, key: &str, value: &str) -> FilterResult {
        if is_internal_key(self.layout, key) {
            self.state = MasterState::SkippingPrefix(DbPrefix::REPLAY.to_string());
            return FilterResult::Skip;
        }

        // A version key without a master in front of it is not a current version.
        if !VersionKey::parse(key).is_master() {
            return FilterResult::Skip;
        }

        self.on_new_master(key, value)
    }

    fn on_new_master(&mut self, key: &str, value: &str) -> FilterResult {
        let md = ObjectMd::parse_or_warn(key, value);

        if md.as_ref().is_some_and(|md| md.is_delete_marker()) {
            if self.filter.is_some() {
                self.listed.next_marker = Some(key.to_string());
            }
            self.state = MasterState::SkippingVersions(key.to_string());
            return FilterResult::Accept;
        }

        if md.as_ref().is_some_and(|md| md.is_phd()) {
            self.state = MasterState::WaitVersionAfterPhd(key.to_string());
            return FilterResult::Accept;
        }

        if self.listed.grouping.reached_max_keys() {
            return FilterResult::End;
        }

        if let Some(filter) = &self.filter {
            let wanted = md.as_ref().is_some_and(|md| {
                filter.is_before(md.last_modified.as_deref()) && filter.is_included_store(md)
            });

            if !wanted {
                // Not reported, but a retried listing must not examine it again.
                self.listed.next_marker = Some(key.to_string());
                self.state = MasterState::SkippingVersions(key.to_string());
                return FilterResult::Accept;
            }
        }

        self.state = match self.listed.add_common_prefix_or_contents(key, value) {
            Some(common_prefix) => MasterState::SkippingPrefix(common_prefix),
            None => MasterState::SkippingVersions(key.to_string()),
        };
        FilterResult::Accept
    }
}

impl Extension for DelimiterMaster {
    type Output = DelimiterResult;

    fn gen_md_params(&self) -> MdParams {
        let mut params = self.listed.grouping.range(self.marker.as_deref());
        if let Some(marker) = &self.marker {
            // The version keys of the marker are not listed either.
            params = params.starting_after(&after_version_marker(marker, None));
        }
        self.layout.master_params(params)
    }

    fn filter(&mut self, entry: &ListingEntry) -> FilterResult {
        let key = self.layout.object_key(&entry.key);

        if !self.listed.grouping.matches_prefix(key) {
            return FilterResult::Skip;
        }
        self.handle_key(key, &entry.value)
    }

    fn skipping(&self) -> SkipTarget {
        match &self.state {
            MasterState::SkippingPrefix(prefix) => self.layout.master_skip(prefix),
            MasterState::SkippingVersions(master_key) => self
                .layout
                .master_skip(&format!("{}{}", master_key, VID_SEP)),
            MasterState::NotSkipping | MasterState::WaitVersionAfterPhd(_) => SkipTarget::None,
        }
    }

    fn result(&mut self) -> DelimiterResult {
        self.listed.result()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::entry::ObjectEntry;

    fn md(version_id: &str) -> String {
        format!(r#"{{"versionId":"{}"}}"#, version_id)
    }

    fn dm(version_id: &str) -> String {
        format!(r#"{{"versionId":"{}","isDeleteMarker":true}}"#, version_id)
    }

    fn phd(version_id: &str) -> String {
        format!(r#"{{"versionId":"{}","isPHD":true}}"#, version_id)
    }

    fn master(vformat: VFormat) -> DelimiterMaster {
        DelimiterMaster::new(DelimiterParams::default(), vformat)
    }

    fn feed(ext: &mut DelimiterMaster, entries: &[(&str, String)]) -> Vec<FilterResult> {
        entries
            .iter()
            .map(|(k, v)| ext.filter(&ListingEntry::new(k, v)))
            .collect()
    }

    #[test]
    fn test_current_versions_v0() {
        let mut ext = master(VFormat::V0);

        let got = feed(&mut ext, &[
            ("a", md("v2")),
            ("a\0v2", md("v2")),
            ("a\0v1", md("v1")),
            ("b", dm("v3")),
            ("b\0v3", dm("v3")),
            ("c", phd("v6")),
            ("c\0v5", md("v5")),
            ("c\0v4", md("v4")),
            ("d", md("v7")),
        ]);
        assert_eq!(got, vec![
            FilterResult::Accept,
            FilterResult::Skip,
            FilterResult::Skip,
            FilterResult::Accept,
            FilterResult::Skip,
            FilterResult::Accept,
            FilterResult::Accept,
            FilterResult::Skip,
            FilterResult::Accept,
        ]);

        let res = ext.result();
        assert_eq!(res.contents, vec![
            ObjectEntry::new("a", md("v2")),
            ObjectEntry::new("c", md("v5")),
            ObjectEntry::new("d", md("v7")),
        ]);
        assert!(!res.is_truncated);
    }

    #[test]
    fn test_phd_without_versions() {
        let mut ext = master(VFormat::V0);

        feed(&mut ext, &[("a", phd("v1")), ("b", md("v2"))]);
        assert_eq!(ext.result().contents, vec![ObjectEntry::new("b", md("v2"))]);
    }

    #[test]
    fn test_skipping_versions_v0() {
        let mut ext = master(VFormat::V0);

        assert_eq!(ext.skipping(), SkipTarget::None);
        feed(&mut ext, &[("a", md("v2"))]);
        assert_eq!(ext.skipping(), SkipTarget::Single("a\0".to_string()));
    }

    #[test]
    fn test_current_versions_v1() {
        let mut ext = master(VFormat::V1);

        feed(&mut ext, &[
            ("\x7fMa", md("v2")),
            ("\x7fMb", dm("v3")),
            ("\x7fMc", md("v5")),
        ]);
        assert_eq!(ext.skipping(), SkipTarget::Single("\x7fMc\0".to_string()));

        let res = ext.result();
        assert_eq!(res.contents, vec![
            ObjectEntry::new("a", md("v2")),
            ObjectEntry::new("c", md("v5")),
        ]);
    }

    #[test]
    fn test_common_prefixes() {
        let mut ext = DelimiterMaster::new(
            DelimiterParams {
                delimiter: Some("/".to_string()),
                ..Default::default()
            },
            VFormat::V0,
        );

        feed(&mut ext, &[
            ("x/1", md("v1")),
            ("x/1\0v1", md("v1")),
            ("x/2", md("v2")),
            ("y", md("v3")),
        ]);

        let res = ext.result();
        assert_eq!(res.common_prefixes, vec!["x/".to_string()]);
        assert_eq!(res.contents, vec![ObjectEntry::new("y", md("v3"))]);
    }

    #[test]
    fn test_delete_markers_do_not_create_common_prefix() {
        let mut ext = DelimiterMaster::new(
            DelimiterParams {
                delimiter: Some("/".to_string()),
                ..Default::default()
            },
            VFormat::V0,
        );

        feed(&mut ext, &[("x/1", dm("v1")), ("x/1\0v1", dm("v1")), ("y", md("v3"))]);

        let res = ext.result();
        assert!(res.common_prefixes.is_empty());
        assert_eq!(res.contents, vec![ObjectEntry::new("y", md("v3"))]);
    }

    #[test]
    fn test_resume_after_marker_skips_its_versions() {
        let ext = DelimiterMaster::new(
            DelimiterParams {
                prefix: Some("a".to_string()),
                marker: Some("ab".to_string()),
                ..Default::default()
            },
            VFormat::V0,
        );

        assert_eq!(
            ext.gen_md_params(),
            MdParams::Single(crate::range_params::RangeParams {
                gt: Some("ab\u{1}".to_string()),
                lt: Some("b".to_string()),
                ..Default::default()
            })
        );

        let ext = DelimiterMaster::new(
            DelimiterParams {
                marker: Some("ab".to_string()),
                ..Default::default()
            },
            VFormat::V1,
        );

        let MdParams::Single(range) = ext.gen_md_params() else {
            panic!("expect a single range");
        };
        assert_eq!(range.gt.as_deref(), Some("\x7fMab\u{1}"));
        assert_eq!(range.lt.as_deref(), Some("\x7fN"));
    }

    #[test]
    fn test_replay_namespace_is_skipped() {
        let mut ext = master(VFormat::V0);

        let got = feed(&mut ext, &[("\x7fRa", md("v1")), ("\x7fRb", md("v1"))]);
        assert_eq!(got, vec![FilterResult::Skip, FilterResult::Skip]);
        assert_eq!(ext.skipping(), SkipTarget::Single("\x7fR".to_string()));
        assert!(ext.result().contents.is_empty());
    }

    #[test]
    fn test_max_keys() {
        let mut ext = DelimiterMaster::new(
            DelimiterParams {
                max_keys: Some(1),
                ..Default::default()
            },
            VFormat::V0,
        );

        let got = feed(&mut ext, &[("a", md("v1")), ("a\0v1", md("v1")), ("b", md("v2"))]);
        assert_eq!(got, vec![
            FilterResult::Accept,
            FilterResult::Skip,
            FilterResult::End
        ]);

        let res = ext.result();
        assert!(res.is_truncated);
        assert_eq!(res.next_marker.as_deref(), Some("a"));
    }
}
