use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordering scope of a mutation. Mutations sharing a scope key are delivered
/// to the remote endpoint in authoring order; unrelated scopes may interleave.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeKey(String);

impl ScopeKey {
    pub fn new(value: String) -> Result<Self, String> {
        if value.trim().is_empty() {
            return Err("Scope key cannot be empty".to_string());
        }
        Ok(Self(value))
    }

    pub fn work_order(id: &crate::domain::value_objects::RecordId) -> Self {
        Self(format!("work_order:{id}"))
    }

    pub fn conversation(id: &crate::domain::value_objects::RecordId) -> Self {
        Self(format!("conversation:{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ScopeKey> for String {
    fn from(value: ScopeKey) -> Self {
        value.0
    }
}
