use serde::{Deserialize, Serialize};

/// Customer equipment mirrored from the remote system; read-only on device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub serial_number: String,
    pub model: String,
    pub description: Option<String>,
    pub customer_name: Option<String>,
}
