use serde::{Deserialize, Serialize};

use crate::utils::deserialize_flexible_ts;

/// Display details of a retailer or wholesaler user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDetails {
    pub display_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// Current layout, details nested under `profile`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentProfile {
    pub id: String,
    pub profile: ProfileDetails,
    #[serde(default, deserialize_with = "deserialize_flexible_ts")]
    pub created_at: Option<i64>,
}

/// Older flat layout still present on some user documents
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flexible_ts")]
    pub created_at: Option<i64>,
}

/// Either stored layout of a user document
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoredProfile {
    Current(CurrentProfile),
    Legacy(LegacyProfile),
}

impl From<StoredProfile> for Profile {
    fn from(stored: StoredProfile) -> Self {
        match stored {
            StoredProfile::Current(current) => Self {
                id: current.id,
                name: current.profile.display_name,
                phone: current.profile.phone_number,
            },
            StoredProfile::Legacy(legacy) => Self {
                id: legacy.id,
                name: legacy.name,
                phone: legacy.phone,
            },
        }
    }
}
