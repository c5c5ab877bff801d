use crate::domain::value_objects::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub work_order_id: RecordId,
    pub signer_name: String,
    pub signer_role: Option<String>,
    pub image_png_base64: String,
    pub signed_at: DateTime<Utc>,
}
