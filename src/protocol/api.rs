//! Closed set of message kinds known to this crate.

use crate::error::{Result, WireError};
use std::fmt;

const API_API_VERSIONS: i16 = 18;
const API_INIT_PRODUCER_ID: i16 = 22;

/// Numeric api key carried in every request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApiKey {
    ApiVersions,
    InitProducerId,
}

impl ApiKey {
    pub const ALL: [ApiKey; 2] = [ApiKey::ApiVersions, ApiKey::InitProducerId];

    pub fn id(self) -> i16 {
        match self {
            ApiKey::ApiVersions => API_API_VERSIONS,
            ApiKey::InitProducerId => API_INIT_PRODUCER_ID,
        }
    }

    pub fn from_id(id: i16) -> Result<Self> {
        match id {
            API_API_VERSIONS => Ok(ApiKey::ApiVersions),
            API_INIT_PRODUCER_ID => Ok(ApiKey::InitProducerId),
            other => Err(WireError::UnknownApiKey(other)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ApiKey::ApiVersions => "ApiVersions",
            ApiKey::InitProducerId => "InitProducerId",
        }
    }

    /// First version using compact encodings and tagged fields, if any.
    pub fn first_flexible_version(self) -> Option<i16> {
        match self {
            // ApiVersions v3 is flexible but not implemented here.
            ApiKey::ApiVersions => None,
            ApiKey::InitProducerId => Some(2),
        }
    }

    pub fn is_flexible(self, version: i16) -> bool {
        self.first_flexible_version()
            .map(|first| version >= first)
            .unwrap_or(false)
    }

    /// Request header version for a given api version.
    pub fn request_header_version(self, version: i16) -> i16 {
        if self.is_flexible(version) {
            2
        } else {
            1
        }
    }

    /// Response header version for a given api version.
    pub fn response_header_version(self, version: i16) -> i16 {
        // ApiVersions responses always use header v0 so that clients can
        // parse them before any version is negotiated.
        if self != ApiKey::ApiVersions && self.is_flexible(version) {
            1
        } else {
            0
        }
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.id())
    }
}
