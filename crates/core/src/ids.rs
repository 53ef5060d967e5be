//! Global object identification.
//!
//! A [`GlobalId`] pairs an entity type tag with the entity's native key and
//! renders both as one opaque string:
//!
//! ```text
//! base64url_nopad("<type tag>:<kind>:<key>")      kind = i | u | s
//! ```
//!
//! The type tag is always embedded, so an integer user key and an integer
//! video key never collide. Nothing in the encoding depends on process
//! state, so IDs stay valid across restarts.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use uuid::Uuid;

use crate::error::DecodeError;
use crate::models::RawKey;

/// Maximum length of an encoded ID accepted by [`GlobalId::decode`].
pub const MAX_ID_LENGTH: usize = 512;

/// Maximum length of a type tag.
pub const MAX_TYPE_TAG_LENGTH: usize = 64;

/// Opaque, type-tagged node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlobalId {
    type_tag: String,
    key: RawKey,
}

impl GlobalId {
    /// Build an ID from a type tag and a raw key.
    ///
    /// The tag must satisfy [`is_valid_type_tag`]; registered node types
    /// are checked at registration time.
    pub fn new(type_tag: impl Into<String>, key: impl Into<RawKey>) -> Self {
        let type_tag = type_tag.into();
        debug_assert!(is_valid_type_tag(&type_tag), "invalid type tag {type_tag:?}");
        Self {
            type_tag,
            key: key.into(),
        }
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn key(&self) -> &RawKey {
        &self.key
    }

    pub fn into_parts(self) -> (String, RawKey) {
        (self.type_tag, self.key)
    }

    /// Encode to the opaque wire form.
    pub fn encode(&self) -> String {
        let kind = match self.key {
            RawKey::Int(_) => 'i',
            RawKey::Uuid(_) => 'u',
            RawKey::Text(_) => 's',
        };
        let payload = format!("{}:{}:{}", self.type_tag, kind, self.key);
        URL_SAFE_NO_PAD.encode(payload.as_bytes())
    }

    /// Decode the opaque wire form.
    ///
    /// Only structure is checked here; whether the tag belongs to a
    /// registered type is up to the node registry.
    pub fn decode(s: &str) -> Result<Self, DecodeError> {
        if s.len() > MAX_ID_LENGTH {
            return Err(DecodeError::TooLong { max: MAX_ID_LENGTH });
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|e| DecodeError::Encoding(e.to_string()))?;
        let payload = String::from_utf8(bytes)
            .map_err(|_| DecodeError::Malformed("payload is not UTF-8".into()))?;

        let mut parts = payload.splitn(3, ':');
        let (Some(type_tag), Some(kind), Some(value)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(DecodeError::Malformed(
                "expected <type>:<kind>:<key>".into(),
            ));
        };

        if !is_valid_type_tag(type_tag) {
            return Err(DecodeError::InvalidTypeTag(type_tag.to_string()));
        }

        let key = match kind {
            "i" => RawKey::Int(parse_int_key(value)?),
            "u" => RawKey::Uuid(parse_uuid_key(value)?),
            "s" => RawKey::Text(value.to_string()),
            other => {
                return Err(DecodeError::Malformed(format!("unknown key kind {:?}", other)));
            }
        };

        Ok(Self {
            type_tag: type_tag.to_string(),
            key,
        })
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for GlobalId {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

/// Check that a type tag can be embedded in an ID: an ASCII letter followed
/// by letters, digits or underscores.
pub fn is_valid_type_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    tag.len() <= MAX_TYPE_TAG_LENGTH && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Integer keys must be in canonical decimal form so every key has exactly
/// one encoding.
fn parse_int_key(value: &str) -> Result<i64, DecodeError> {
    let invalid = || DecodeError::InvalidKey {
        kind: "int",
        value: value.to_string(),
    };
    let n: i64 = value.parse().map_err(|_| invalid())?;
    if n.to_string() != value {
        return Err(invalid());
    }
    Ok(n)
}

fn parse_uuid_key(value: &str) -> Result<Uuid, DecodeError> {
    let invalid = || DecodeError::InvalidKey {
        kind: "uuid",
        value: value.to_string(),
    };
    let uuid = Uuid::parse_str(value).map_err(|_| invalid())?;
    if uuid.hyphenated().to_string() != value {
        return Err(invalid());
    }
    Ok(uuid)
}
