//! Domain models for entities exposed through the node interface.
//!
//! These models are storage-agnostic and represent the canonical
//! form of entities within the domain layer.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::GlobalId;

// =============================================================================
// Raw Keys
// =============================================================================

/// Native primary-key value of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RawKey {
    /// Integer key (auto-increment).
    Int(i64),
    /// UUID key.
    Uuid(Uuid),
    /// Textual key.
    Text(String),
}

/// Representation of a raw key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Int,
    Uuid,
    Text,
}

impl KeyKind {
    /// Human-readable name, used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Int => "int",
            KeyKind::Uuid => "uuid",
            KeyKind::Text => "text",
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RawKey {
    /// Kind of this key.
    pub fn kind(&self) -> KeyKind {
        match self {
            RawKey::Int(_) => KeyKind::Int,
            RawKey::Uuid(_) => KeyKind::Uuid,
            RawKey::Text(_) => KeyKind::Text,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            RawKey::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            RawKey::Uuid(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for RawKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawKey::Int(v) => write!(f, "{}", v),
            RawKey::Uuid(v) => write!(f, "{}", v.hyphenated()),
            RawKey::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for RawKey {
    fn from(v: i64) -> Self {
        RawKey::Int(v)
    }
}

impl From<Uuid> for RawKey {
    fn from(v: Uuid) -> Self {
        RawKey::Uuid(v)
    }
}

impl From<RawKey> for FieldValue {
    fn from(key: RawKey) -> Self {
        match key {
            RawKey::Int(v) => FieldValue::Int(v),
            RawKey::Uuid(v) => FieldValue::Uuid(v),
            RawKey::Text(v) => FieldValue::Text(v),
        }
    }
}

// =============================================================================
// Field Values
// =============================================================================

/// A scalar column value, used for sort positions and filter operands.
///
/// The serde representation is the compact tagged form stored in cursors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldValue {
    #[serde(rename = "i")]
    Int(i64),
    #[serde(rename = "s")]
    Text(String),
    #[serde(rename = "u")]
    Uuid(Uuid),
    #[serde(rename = "t")]
    Timestamp(DateTime<Utc>),
}

/// Type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Text,
    Uuid,
    Timestamp,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::Text => "text",
            ValueKind::Uuid => "uuid",
            ValueKind::Timestamp => "timestamp",
        }
    }
}

impl FieldValue {
    /// Kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            FieldValue::Int(_) => ValueKind::Int,
            FieldValue::Text(_) => ValueKind::Text,
            FieldValue::Uuid(_) => ValueKind::Uuid,
            FieldValue::Timestamp(_) => ValueKind::Timestamp,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<Uuid> for FieldValue {
    fn from(v: Uuid) -> Self {
        FieldValue::Uuid(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(v)
    }
}

// =============================================================================
// Entity Traits
// =============================================================================

/// Column access for filtering and ordering rows outside of SQL.
pub trait Record {
    /// Value of `column`, or `None` if the entity has no such column.
    fn field(&self, column: &str) -> Option<FieldValue>;
}

/// An entity reachable through the node interface.
pub trait NodeType {
    /// Type tag embedded in global IDs of this entity.
    const TYPE_TAG: &'static str;

    /// Native primary key.
    fn raw_key(&self) -> RawKey;

    /// Global ID of this entity.
    fn global_id(&self) -> GlobalId {
        GlobalId::new(Self::TYPE_TAG, self.raw_key())
    }
}

// =============================================================================
// User
// =============================================================================

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
}

impl User {
    pub const COLUMNS: &'static [(&'static str, ValueKind)] = &[
        ("id", ValueKind::Int),
        ("name", ValueKind::Text),
        ("created_at", ValueKind::Timestamp),
    ];
}

impl NodeType for User {
    const TYPE_TAG: &'static str = "User";

    fn raw_key(&self) -> RawKey {
        RawKey::Int(self.id)
    }
}

impl Record for User {
    fn field(&self, column: &str) -> Option<FieldValue> {
        match column {
            "id" => Some(FieldValue::Int(self.id)),
            "name" => Some(FieldValue::Text(self.name.clone())),
            "created_at" => Some(FieldValue::Timestamp(self.created_at)),
            _ => None,
        }
    }
}

// =============================================================================
// Video
// =============================================================================

/// A video, keyed by UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Video {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a video.
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub name: String,
}

impl Video {
    pub const COLUMNS: &'static [(&'static str, ValueKind)] = &[
        ("id", ValueKind::Uuid),
        ("name", ValueKind::Text),
        ("created_at", ValueKind::Timestamp),
    ];
}

impl NodeType for Video {
    const TYPE_TAG: &'static str = "Video";

    fn raw_key(&self) -> RawKey {
        RawKey::Uuid(self.id)
    }
}

impl Record for Video {
    fn field(&self, column: &str) -> Option<FieldValue> {
        match column {
            "id" => Some(FieldValue::Uuid(self.id)),
            "name" => Some(FieldValue::Text(self.name.clone())),
            "created_at" => Some(FieldValue::Timestamp(self.created_at)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test critique: un User et une Video ne partagent jamais d'ID global
    #[test]
    fn test_global_id_embeds_type_tag() {
        let now = Utc::now();
        let user = User { id: 1, name: "U1".into(), created_at: now };
        let gid = user.global_id();
        assert_eq!(gid.type_tag(), "User");
        assert_eq!(gid.key(), &RawKey::Int(1));

        let video = Video { id: Uuid::nil(), name: "V".into(), created_at: now };
        assert_ne!(video.global_id().encode(), user.global_id().encode());
    }

    // Test critique: l'ordre des valeurs suit l'ordre naturel par variante
    #[test]
    fn test_field_values_order_within_kind() {
        assert!(FieldValue::Int(1) < FieldValue::Int(2));
        assert!(FieldValue::from("a") < FieldValue::from("b"));
        assert!(vec![FieldValue::from("a"), FieldValue::Int(9)]
            < vec![FieldValue::from("b"), FieldValue::Int(1)]);
    }
}
