//! Cache statistics reported to administrators

use crate::store::StoreInfo;
use serde::{Deserialize, Serialize};

/// Snapshot of cache state.
///
/// Only `enabled` is always present; a disabled cache reports nothing else,
/// and a failed lookup reports `error` instead of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_clients: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_days: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CacheStats {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_info(info: StoreInfo, keys: u64) -> Self {
        Self {
            enabled: true,
            keys: Some(keys),
            memory_used: Some(info.memory_used),
            connected_clients: Some(info.connected_clients),
            uptime_days: Some(info.uptime_days),
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            enabled: true,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }
}
