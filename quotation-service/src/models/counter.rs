use serde::{Deserialize, Serialize};

/// Per-day sequence record, keyed by the number prefix (`QT-20240501-`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceCounter {
    #[serde(rename = "_id")]
    pub key: String,
    pub seq: i64,
}
