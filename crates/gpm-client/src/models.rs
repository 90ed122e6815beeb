//! Wire types shared with the server.

use chrono::{DateTime, Utc};
use gpm_core::models::practice::SubscriptionTier;
use gpm_core::models::user::UserRole;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub practice_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub expires_in: u64,
    pub user: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialStatus {
    pub practice_name: String,
    pub is_trial: bool,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub trial_expired: bool,
    pub hours_remaining: i64,
    pub subscription_tier: SubscriptionTier,
    pub is_active: bool,
}

/// Error body returned by the server.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MessageBody {
    pub message: String,
}
