use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboxStatus {
    Pending,
    Dead,
    Unknown(String),
}

impl OutboxStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Dead => "dead",
            OutboxStatus::Unknown(value) => value.as_str(),
        }
    }
}

impl From<&str> for OutboxStatus {
    fn from(value: &str) -> Self {
        match value {
            "pending" => OutboxStatus::Pending,
            "dead" => OutboxStatus::Dead,
            other => OutboxStatus::Unknown(other.to_string()),
        }
    }
}
