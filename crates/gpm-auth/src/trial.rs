//! Free-trial gating.
//!
//! Trial state is never stored. It is recomputed from the practice's plan
//! fields on every check, so the only thing that moves a practice from
//! `TrialActive` to `TrialExpired` is the clock passing `trial_ends_at`.

use chrono::{DateTime, Utc};
use gpm_core::models::practice::{Practice, SubscriptionTier};
use gpm_core::models::user::UserRole;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AuthError;

const SECS_PER_HOUR: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    /// Not on a trial (paying, or trial flag cleared by an administrator).
    ActiveSubscription,
    TrialActive,
    TrialExpired,
}

/// Derived trial view of a practice at a point in time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialStatus {
    #[serde(skip)]
    pub practice_id: Uuid,
    pub practice_name: String,
    pub is_trial: bool,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub trial_expired: bool,
    /// Whole hours left, rounded up, never negative.
    pub hours_remaining: i64,
    pub subscription_tier: SubscriptionTier,
    pub is_active: bool,
}

impl TrialStatus {
    pub fn evaluate(practice: &Practice, now: DateTime<Utc>) -> Self {
        // A trial without an end date has nothing left to run.
        let remaining_secs = practice
            .trial_ends_at
            .map(|end| (end - now).num_seconds())
            .unwrap_or(0);
        let hours_remaining = if remaining_secs > 0 {
            (remaining_secs + SECS_PER_HOUR - 1) / SECS_PER_HOUR
        } else {
            0
        };

        Self {
            practice_id: practice.id,
            practice_name: practice.name.clone(),
            is_trial: practice.is_trial,
            trial_ends_at: practice.trial_ends_at,
            trial_expired: practice.is_trial && hours_remaining <= 0,
            hours_remaining,
            subscription_tier: practice.subscription_tier,
            is_active: practice.is_active,
        }
    }

    pub fn state(&self) -> TrialState {
        match (self.is_trial, self.trial_expired) {
            (false, _) => TrialState::ActiveSubscription,
            (true, false) => TrialState::TrialActive,
            (true, true) => TrialState::TrialExpired,
        }
    }
}

/// Decide whether a request may proceed.
///
/// Administrators and exempt endpoints (trial status, logout) pass even
/// while the trial is expired.
pub fn enforce(status: &TrialStatus, role: UserRole, exempt: bool) -> Result<(), AuthError> {
    if exempt || role.is_admin() {
        return Ok(());
    }
    match status.state() {
        TrialState::TrialExpired => Err(AuthError::TrialExpired),
        TrialState::ActiveSubscription | TrialState::TrialActive => Ok(()),
    }
}
