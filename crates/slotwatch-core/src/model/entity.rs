// ── Entity identity ──
//
// EntityId is the process id as the node knows it. It is embedded
// verbatim in node URL paths, so it must stay path-safe.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Identifier of a tracked process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    /// Validate and wrap a raw id.
    ///
    /// Rejects empty ids and characters that would change the meaning of
    /// a node URL (`/ ? # & %` and whitespace).
    pub fn new(raw: impl Into<String>) -> Result<Self, CoreError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidEntityId {
                id: raw,
                reason: "id is empty".into(),
            });
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '&' | '%'))
        {
            return Err(CoreError::InvalidEntityId {
                reason: format!("contains {bad:?}"),
                id: raw,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for EntityId {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A tracked process and its static metadata. Never mutated once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedEntity {
    pub id: EntityId,
    pub name: String,
    pub category: String,
}

/// Outcome of a registration call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Registration {
    /// `false` when the id was already registered; metadata is unchanged.
    pub inserted: bool,
}
