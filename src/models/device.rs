use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A push capable device registered by a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub token: String,
    pub device_id: String,
    pub is_active: bool,
    pub last_active: i64,
    #[serde(default)]
    pub user_agent: String,
}

/// Per user document holding the device list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDevices {
    pub user_id: String,
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

/// Pick the active device with the greatest `last_active`.
/// Ties keep the earliest one in list order.
pub fn most_recent_active(devices: &[DeviceRecord]) -> Option<&DeviceRecord> {
    devices
        .iter()
        .filter(|device| device.is_active)
        .fold(None, |best: Option<&DeviceRecord>, device| match best {
            Some(best) if best.last_active >= device.last_active => Some(best),
            _ => Some(device),
        })
}
