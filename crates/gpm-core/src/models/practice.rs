//! Practice (tenant) domain model.
//!
//! A practice is the isolation boundary: every user and clinical record
//! carries the practice id it belongs to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subscription plan a practice is billed on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Trial,
    Starter,
    Professional,
    Enterprise,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Trial => "trial",
            SubscriptionTier::Starter => "starter",
            SubscriptionTier::Professional => "professional",
            SubscriptionTier::Enterprise => "enterprise",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "trial" => Some(SubscriptionTier::Trial),
            "starter" => Some(SubscriptionTier::Starter),
            "professional" => Some(SubscriptionTier::Professional),
            "enterprise" => Some(SubscriptionTier::Enterprise),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Practice {
    pub id: Uuid,
    /// Display name, e.g. `Riverside Family Practice`.
    pub name: String,
    /// URL-safe unique identifier.
    pub slug: String,
    /// Whether the practice is still on its free trial.
    pub is_trial: bool,
    /// End of the trial window. Only meaningful while `is_trial` is set.
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub subscription_tier: SubscriptionTier,
    /// Administratively disabled practices cannot sign in at all.
    pub is_active: bool,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to register a new practice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePractice {
    pub name: String,
    pub slug: String,
    /// `None` registers a paying practice with no trial window.
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub subscription_tier: SubscriptionTier,
    pub metadata: Option<serde_json::Value>,
}

/// Fields that can be updated on an existing practice.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePractice {
    pub name: Option<String>,
    pub is_trial: Option<bool>,
    /// `Some(Some(ts))` = set, `Some(None)` = clear, `None` = no change.
    pub trial_ends_at: Option<Option<DateTime<Utc>>>,
    pub subscription_tier: Option<SubscriptionTier>,
    pub is_active: Option<bool>,
    pub metadata: Option<serde_json::Value>,
}
