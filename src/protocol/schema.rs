//! Version-specific field layouts and the registry that hands them out.
//!
//! A [`Schema`] is an ordered list of typed fields. Field names exist for
//! diagnostics only; the codec matches values to fields by slot.

use crate::error::{Result, WireError};
use crate::protocol::api::ApiKey;
use std::fmt;

/// Wire type of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Int16,
    Int32,
    Int64,
    /// int16 length, -1 = null.
    NullableString,
    /// unsigned varint length+1, 0 = null.
    CompactNullableString,
    /// int32 count followed by elements of the given layout.
    Array(&'static Schema),
    /// unsigned varint count+1 followed by elements of the given layout.
    CompactArray(&'static Schema),
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int16 => f.write_str("INT16"),
            FieldType::Int32 => f.write_str("INT32"),
            FieldType::Int64 => f.write_str("INT64"),
            FieldType::NullableString => f.write_str("NULLABLE_STRING"),
            FieldType::CompactNullableString => f.write_str("COMPACT_NULLABLE_STRING"),
            FieldType::Array(inner) => write!(f, "ARRAY{}", inner),
            FieldType::CompactArray(inner) => write!(f, "COMPACT_ARRAY{}", inner),
        }
    }
}

/// One field of a layout. `slot` is the position of the value in the
/// message's logical value list; a layout may omit slots that only exist in
/// other versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub slot: usize,
    pub name: &'static str,
    pub ty: FieldType,
}

impl Field {
    pub const fn new(slot: usize, name: &'static str, ty: FieldType) -> Self {
        Self { slot, name, ty }
    }
}

/// Ordered field layout. Flexible layouts end with a tagged-field section.
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    pub fields: &'static [Field],
    pub flexible: bool,
}

impl Schema {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", field.name, field.ty)?;
        }
        if self.flexible {
            if !self.fields.is_empty() {
                f.write_str(", ")?;
            }
            f.write_str("TAGGED_FIELDS")?;
        }
        f.write_str("]")
    }
}

/// Source of field layouts for (api key, version) pairs.
///
/// Implementations must return the same layout for a given pair for the
/// lifetime of the process.
pub trait SchemaRegistry: Send + Sync {
    fn request_schema(&self, api: ApiKey, version: i16) -> Result<&Schema>;

    fn response_schema(&self, api: ApiKey, version: i16) -> Result<&Schema>;

    /// Inclusive (min, max) version range, or `None` if the api is not served.
    fn supported_versions(&self, api: ApiKey) -> Option<(i16, i16)>;

    fn is_supported(&self, api: ApiKey, version: i16) -> bool {
        self.supported_versions(api)
            .map(|(min, max)| version >= min && version <= max)
            .unwrap_or(false)
    }
}

// InitProducerId

static INIT_PRODUCER_ID_REQUEST_V0: Schema = Schema {
    fields: &[
        Field::new(0, "transactional_id", FieldType::NullableString),
        Field::new(1, "transaction_timeout_ms", FieldType::Int32),
    ],
    flexible: false,
};

static INIT_PRODUCER_ID_REQUEST_V2: Schema = Schema {
    fields: &[
        Field::new(0, "transactional_id", FieldType::CompactNullableString),
        Field::new(1, "transaction_timeout_ms", FieldType::Int32),
    ],
    flexible: true,
};

const INIT_PRODUCER_ID_RESPONSE_FIELDS: &[Field] = &[
    Field::new(0, "throttle_time_ms", FieldType::Int32),
    Field::new(1, "error_code", FieldType::Int16),
    Field::new(2, "producer_id", FieldType::Int64),
    Field::new(3, "producer_epoch", FieldType::Int16),
];

static INIT_PRODUCER_ID_RESPONSE_V0: Schema = Schema {
    fields: INIT_PRODUCER_ID_RESPONSE_FIELDS,
    flexible: false,
};
static INIT_PRODUCER_ID_RESPONSE_V2: Schema = Schema {
    fields: INIT_PRODUCER_ID_RESPONSE_FIELDS,
    flexible: true,
};

// ApiVersions

static API_VERSIONS_REQUEST_V0: Schema = Schema {
    fields: &[],
    flexible: false,
};

static API_VERSIONS_ENTRY: Schema = Schema {
    fields: &[
        Field::new(0, "api_key", FieldType::Int16),
        Field::new(1, "min_version", FieldType::Int16),
        Field::new(2, "max_version", FieldType::Int16),
    ],
    flexible: false,
};

static API_VERSIONS_RESPONSE_V0: Schema = Schema {
    fields: &[
        Field::new(0, "error_code", FieldType::Int16),
        Field::new(1, "api_keys", FieldType::Array(&API_VERSIONS_ENTRY)),
    ],
    flexible: false,
};

static API_VERSIONS_RESPONSE_V1: Schema = Schema {
    fields: &[
        Field::new(0, "error_code", FieldType::Int16),
        Field::new(1, "api_keys", FieldType::Array(&API_VERSIONS_ENTRY)),
        Field::new(2, "throttle_time_ms", FieldType::Int32),
    ],
    flexible: false,
};

/// Built-in layouts for every message this crate implements.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticRegistry;

impl StaticRegistry {
    fn unsupported(api: ApiKey, version: i16) -> WireError {
        WireError::UnsupportedVersion {
            api: api.name().to_string(),
            version,
        }
    }
}

impl SchemaRegistry for StaticRegistry {
    fn request_schema(&self, api: ApiKey, version: i16) -> Result<&Schema> {
        match (api, version) {
            (ApiKey::InitProducerId, 0 | 1) => Ok(&INIT_PRODUCER_ID_REQUEST_V0),
            (ApiKey::InitProducerId, 2) => Ok(&INIT_PRODUCER_ID_REQUEST_V2),
            (ApiKey::ApiVersions, 0..=2) => Ok(&API_VERSIONS_REQUEST_V0),
            _ => Err(Self::unsupported(api, version)),
        }
    }

    fn response_schema(&self, api: ApiKey, version: i16) -> Result<&Schema> {
        match (api, version) {
            (ApiKey::InitProducerId, 0 | 1) => Ok(&INIT_PRODUCER_ID_RESPONSE_V0),
            (ApiKey::InitProducerId, 2) => Ok(&INIT_PRODUCER_ID_RESPONSE_V2),
            (ApiKey::ApiVersions, 0) => Ok(&API_VERSIONS_RESPONSE_V0),
            (ApiKey::ApiVersions, 1 | 2) => Ok(&API_VERSIONS_RESPONSE_V1),
            _ => Err(Self::unsupported(api, version)),
        }
    }

    fn supported_versions(&self, api: ApiKey) -> Option<(i16, i16)> {
        match api {
            ApiKey::InitProducerId => Some((0, 2)),
            ApiKey::ApiVersions => Some((0, 2)),
        }
    }
}
