//! Identifier types shared across the engine
//!
//! - RecordId: stable record identifier, client-generated for new records
//! - TypeName: record type identifier plus its collection-node naming

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// RecordId
// =============================================================================

/// Stable record identifier
///
/// Ids are plain strings so caller-supplied ids (including numeric
/// strings) round-trip untouched. New records get a client-generated
/// UUID v4 via [`RecordId::generate`], so an id is addressable before
/// the record is ever persisted.
///
/// # Examples
///
/// ```
/// use treesync_core::RecordId;
///
/// let generated = RecordId::generate();
/// assert!(!generated.as_str().is_empty());
///
/// let numeric = RecordId::from("1");
/// assert_eq!(numeric.as_str(), "1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Generate a fresh client-side id for a new record
    pub fn generate() -> Self {
        RecordId(Uuid::new_v4().to_string())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the id, returning the inner string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId(s)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// TypeName
// =============================================================================

/// Record type identifier
///
/// Also derives the collection node name records of the type nest
/// under in the tree (`posts/<id>` for type `post`). The default rule
/// appends `s`; schemas may override it where that is wrong.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    /// Create a type name
    pub fn new(name: impl Into<String>) -> Self {
        TypeName(name.into())
    }

    /// Get the type name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Default collection node name: the type name with `s` appended
    pub fn default_collection(&self) -> String {
        format!("{}s", self.0)
    }
}

impl From<&str> for TypeName {
    fn from(s: &str) -> Self {
        TypeName(s.to_string())
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
