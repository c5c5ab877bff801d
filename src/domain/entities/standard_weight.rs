use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Calibration standard weight mirrored from the remote system; read-only on
/// device, used to fill in checklist measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardWeight {
    pub code: String,
    pub nominal_value: f64,
    pub precision_class: String,
    pub certificate_number: Option<String>,
    pub certificate_expiry: Option<DateTime<Utc>>,
}
