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

use std::io;

/// Errors returned when building or running a listing.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    /// The requested key format or listing type is not supported.
    #[error("NotImplemented: {what}")]
    NotImplemented { what: String },

    /// The listing parameters could not be decoded.
    #[error("InvalidArgument: {0}")]
    InvalidParams(#[from] serde_json::Error),

    /// The backend range scan failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ListingError {
    pub fn not_implemented(what: impl ToString) -> Self {
        Self::NotImplemented {
            what: what.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = ListingError::not_implemented("vFormat: v2");
        assert_eq!(e.to_string(), "NotImplemented: vFormat: v2");

        let e = ListingError::from(io::Error::new(io::ErrorKind::Other, "backend down"));
        assert_eq!(e.to_string(), "backend down");

        let e = ListingError::from(serde_json::from_str::<u64>("x").unwrap_err());
        assert!(e.to_string().starts_with("InvalidArgument: "));
    }
}
