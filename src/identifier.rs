// 🆔 Binary Identifiers - Extended-JSON UUID wrappers to canonical strings
//
// Document-store exports wrap UUIDs as base64 binaries:
//   {"$binary": {"base64": "...", "subType": "03"}}   (extended JSON v2)
//   {"$binary": "...", "$type": "03"}                  (extended JSON v1)
//   {"$uuid": "00112233-4455-6677-8899-aabbccddeeff"}
//
// The 16 payload bytes are NOT text. Subtype 04 is RFC 4122 byte order;
// subtype 03 is whatever the writing driver used, which for .NET means the
// first three groups are little-endian.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Size of a decoded identifier payload
pub const IDENTIFIER_LEN: usize = 16;

const STANDARD_SUBTYPE: u8 = 0x04;
const LEGACY_SUBTYPE: u8 = 0x03;

/// Why an identifier wrapper could not be decoded or encoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("'$binary' has no string 'base64' payload")]
    MissingPayload,

    #[error("'$binary' is neither an object nor a string")]
    InvalidBinary,

    #[error("'$uuid' is not a string")]
    UuidNotString,

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("decoded {0} bytes, expected 16")]
    WrongLength(usize),

    #[error("invalid UUID '{text}': {source}")]
    InvalidUuid { text: String, source: uuid::Error },
}

// ============================================================================
// UUID REPRESENTATION
// ============================================================================

/// Byte layout of a 16-byte identifier payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UuidRepresentation {
    /// .NET `Guid` layout: groups 1-3 little-endian
    #[default]
    CSharpLegacy,

    /// Java driver layout: each 8-byte half reversed
    JavaLegacy,

    /// RFC 4122 big-endian layout (subtype 04)
    Standard,
}

impl UuidRepresentation {
    pub fn uuid_from_bytes(&self, bytes: [u8; IDENTIFIER_LEN]) -> Uuid {
        match self {
            UuidRepresentation::CSharpLegacy => Uuid::from_bytes_le(bytes),
            UuidRepresentation::JavaLegacy => Uuid::from_bytes(java_swap(bytes)),
            UuidRepresentation::Standard => Uuid::from_bytes(bytes),
        }
    }

    pub fn uuid_to_bytes(&self, uuid: &Uuid) -> [u8; IDENTIFIER_LEN] {
        match self {
            UuidRepresentation::CSharpLegacy => uuid.to_bytes_le(),
            UuidRepresentation::JavaLegacy => java_swap(*uuid.as_bytes()),
            UuidRepresentation::Standard => *uuid.as_bytes(),
        }
    }

    /// Binary subtype written when encoding with this representation
    pub fn subtype(&self) -> u8 {
        match self {
            UuidRepresentation::Standard => STANDARD_SUBTYPE,
            _ => LEGACY_SUBTYPE,
        }
    }
}

fn java_swap(mut bytes: [u8; IDENTIFIER_LEN]) -> [u8; IDENTIFIER_LEN] {
    bytes[..8].reverse();
    bytes[8..].reverse();
    bytes
}

// ============================================================================
// DECODING
// ============================================================================

/// A recognized identifier wrapper, borrowed from the source tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryIdentifier<'a> {
    Binary {
        base64: &'a str,
        subtype: Option<&'a str>,
    },
    Uuid(&'a str),
}

impl<'a> BinaryIdentifier<'a> {
    /// Recognize a wrapper object.
    ///
    /// Returns `None` for anything that is not a wrapper, including objects
    /// that carry fields besides the wrapper's own, and `Some(Err)` for a
    /// wrapper whose payload is not a string.
    pub fn detect(value: &'a Value) -> Option<Result<Self, IdentifierError>> {
        let map = value.as_object()?;

        if let Some(binary) = map.get("$binary") {
            if !only_keys(map, &["$binary", "$type"]) {
                return None;
            }
            let found = match binary {
                Value::Object(inner) => match inner.get("base64").and_then(Value::as_str) {
                    Some(base64) => Ok(BinaryIdentifier::Binary {
                        base64,
                        subtype: inner.get("subType").and_then(Value::as_str),
                    }),
                    None => Err(IdentifierError::MissingPayload),
                },
                Value::String(base64) => Ok(BinaryIdentifier::Binary {
                    base64: base64.as_str(),
                    subtype: map.get("$type").and_then(Value::as_str),
                }),
                _ => Err(IdentifierError::InvalidBinary),
            };
            return Some(found);
        }

        if !only_keys(map, &["$uuid"]) {
            return None;
        }
        match map.get("$uuid") {
            Some(Value::String(text)) => Some(Ok(BinaryIdentifier::Uuid(text.as_str()))),
            Some(_) => Some(Err(IdentifierError::UuidNotString)),
            None => None,
        }
    }

    /// Decode to the canonical lowercase 8-4-4-4-12 form
    pub fn to_canonical(&self, legacy: UuidRepresentation) -> Result<String, IdentifierError> {
        match self {
            BinaryIdentifier::Binary { base64, subtype } => {
                let bytes = STANDARD.decode(base64.trim())?;

                let bytes: [u8; IDENTIFIER_LEN] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| IdentifierError::WrongLength(bytes.len()))?;

                let representation = match subtype.and_then(parse_subtype) {
                    Some(STANDARD_SUBTYPE) => UuidRepresentation::Standard,
                    _ => legacy,
                };

                Ok(representation.uuid_from_bytes(bytes).hyphenated().to_string())
            }
            BinaryIdentifier::Uuid(text) => parse_uuid(text).map(|uuid| uuid.hyphenated().to_string()),
        }
    }
}

fn only_keys(map: &Map<String, Value>, allowed: &[&str]) -> bool {
    map.keys().all(|k| allowed.contains(&k.as_str()))
}

fn parse_uuid(text: &str) -> Result<Uuid, IdentifierError> {
    Uuid::parse_str(text).map_err(|source| IdentifierError::InvalidUuid {
        text: text.to_string(),
        source,
    })
}

fn parse_subtype(subtype: &str) -> Option<u8> {
    u8::from_str_radix(subtype.trim(), 16).ok()
}

/// Decode `value` if it is an identifier wrapper.
///
/// `None` means the value is not a wrapper and should be left alone.
pub fn decode_identifier(
    value: &Value,
    legacy: UuidRepresentation,
) -> Option<Result<String, IdentifierError>> {
    BinaryIdentifier::detect(value).map(|found| found.and_then(|id| id.to_canonical(legacy)))
}

/// Encode a canonical UUID string back into an extended-JSON v2 wrapper
pub fn encode_identifier(
    canonical: &str,
    representation: UuidRepresentation,
) -> Result<Value, IdentifierError> {
    let uuid = parse_uuid(canonical)?;
    let bytes = representation.uuid_to_bytes(&uuid);

    Ok(json!({
        "$binary": {
            "base64": STANDARD.encode(bytes),
            "subType": format!("{:02x}", representation.subtype()),
        }
    }))
}

// ============================================================================
// TESTS
// ============================================================================
