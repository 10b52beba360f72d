//! ApiVersions: discover which versions of each api a peer serves.

use crate::error::Result;
use crate::message::{check_version, ProtocolRequest, ProtocolResponse, RequestBuilder};
use crate::protocol::{ApiKey, ErrorCode, FieldValue, SchemaRegistry, Struct};
use serde::Serialize;

const ERROR_CODE: usize = 0;
const API_KEYS: usize = 1;
const THROTTLE_TIME_MS: usize = 2;

const ENTRY_API_KEY: usize = 0;
const ENTRY_MIN_VERSION: usize = 1;
const ENTRY_MAX_VERSION: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApiVersionsRequestBuilder;

impl ApiVersionsRequestBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl RequestBuilder for ApiVersionsRequestBuilder {
    type Request = ApiVersionsRequest;

    fn build_for<S: SchemaRegistry + ?Sized>(
        &self,
        version: i16,
        registry: &S,
    ) -> Result<ApiVersionsRequest> {
        check_version(registry, ApiKey::ApiVersions, version)?;
        Ok(ApiVersionsRequest { version })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiVersionsRequest {
    version: i16,
}

impl ProtocolRequest for ApiVersionsRequest {
    const API_KEY: ApiKey = ApiKey::ApiVersions;

    type Response = ApiVersionsResponse;

    fn version(&self) -> i16 {
        self.version
    }

    fn to_struct(&self) -> Struct {
        Struct::default()
    }

    fn from_struct(_s: Struct, version: i16) -> Result<Self> {
        Ok(Self { version })
    }
}

/// Version range served for one api key. `api_key` is the raw id so that
/// ranges for apis this crate does not know survive decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApiVersion {
    pub api_key: i16,
    pub min_version: i16,
    pub max_version: i16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiVersionsResponse {
    pub error_code: ErrorCode,
    pub api_keys: Vec<ApiVersion>,
    pub throttle_time_ms: i32,
}

impl ApiVersionsResponse {
    /// Advertise every api `registry` serves.
    pub fn from_registry<S: SchemaRegistry + ?Sized>(registry: &S) -> Self {
        let api_keys = ApiKey::ALL
            .iter()
            .filter_map(|api| {
                registry
                    .supported_versions(*api)
                    .map(|(min_version, max_version)| ApiVersion {
                        api_key: api.id(),
                        min_version,
                        max_version,
                    })
            })
            .collect();
        Self {
            error_code: ErrorCode::None,
            api_keys,
            throttle_time_ms: 0,
        }
    }

    pub fn find(&self, api: ApiKey) -> Option<&ApiVersion> {
        self.api_keys.iter().find(|v| v.api_key == api.id())
    }

    /// Highest version of `api` served by the peer and supported by `local`.
    pub fn negotiate<S: SchemaRegistry + ?Sized>(&self, api: ApiKey, local: &S) -> Option<i16> {
        let theirs = self.find(api)?;
        let (min, max) = local.supported_versions(api)?;
        let lo = min.max(theirs.min_version);
        let hi = max.min(theirs.max_version);
        (lo <= hi).then_some(hi)
    }
}

impl ProtocolResponse for ApiVersionsResponse {
    const API_KEY: ApiKey = ApiKey::ApiVersions;

    fn to_struct(&self) -> Struct {
        let entries = self
            .api_keys
            .iter()
            .map(|v| {
                Struct::new(vec![
                    FieldValue::Int16(v.api_key),
                    FieldValue::Int16(v.min_version),
                    FieldValue::Int16(v.max_version),
                ])
            })
            .collect();
        Struct::new(vec![
            FieldValue::Int16(self.error_code.code()),
            FieldValue::Array(Some(entries)),
            FieldValue::Int32(self.throttle_time_ms),
        ])
    }

    fn from_struct(mut s: Struct) -> Result<Self> {
        let api_keys = s
            .take_array(API_KEYS)?
            .unwrap_or_default()
            .iter()
            .map(|e| {
                Ok(ApiVersion {
                    api_key: e.int16(ENTRY_API_KEY)?,
                    min_version: e.int16(ENTRY_MIN_VERSION)?,
                    max_version: e.int16(ENTRY_MAX_VERSION)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            error_code: ErrorCode::from_code(s.int16(ERROR_CODE)?),
            api_keys,
            // v0 has no throttle field.
            throttle_time_ms: s.int32_or(THROTTLE_TIME_MS, 0)?,
        })
    }

    fn error_code(&self) -> ErrorCode {
        self.error_code
    }

    fn from_error_code(code: ErrorCode) -> Self {
        Self {
            error_code: code,
            api_keys: Vec::new(),
            throttle_time_ms: 0,
        }
    }
}
