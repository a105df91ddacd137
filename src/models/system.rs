// Static system identity

use serde::{Deserialize, Serialize};

/// Static system identity; read once at startup and exposed via GET /api/info.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub os_name: String,
    pub os_version: String,
    pub os_pretty: String,
    pub kernel: String,
    pub hostname: String,
    pub arch: String,
    pub cpu_model: String,
    pub cpu_count: u32,
}
