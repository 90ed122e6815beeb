//! What the UI should show for a trial status.

use crate::models::TrialStatus;

const URGENT_HOURS: i64 = 12;
const WARNING_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    /// Under 12 hours left.
    Urgent,
    /// Under 24 hours left.
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrialNotice {
    /// The trial is over; block the app behind the lockout screen.
    Lockout,
    Banner { urgency: Urgency, hours_remaining: i64 },
}

impl TrialNotice {
    /// `None` when the practice is not on a trial.
    pub fn from_status(status: &TrialStatus) -> Option<Self> {
        if !status.is_trial {
            return None;
        }
        if status.trial_expired {
            return Some(Self::Lockout);
        }
        let hours = status.hours_remaining;
        let urgency = if hours < URGENT_HOURS {
            Urgency::Urgent
        } else if hours < WARNING_HOURS {
            Urgency::Warning
        } else {
            Urgency::Info
        };
        Some(Self::Banner {
            urgency,
            hours_remaining: hours,
        })
    }

    pub fn message(&self) -> String {
        match self {
            Self::Lockout => {
                "Your free trial has ended. Please contact us to continue using the service."
                    .to_string()
            }
            Self::Banner {
                hours_remaining: 1,
                ..
            } => "Your free trial ends in 1 hour.".to_string(),
            Self::Banner {
                hours_remaining, ..
            } => format!("Your free trial ends in {hours_remaining} hours."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpm_core::models::practice::SubscriptionTier;

    fn status(is_trial: bool, expired: bool, hours: i64) -> TrialStatus {
        TrialStatus {
            practice_name: "Riverside".into(),
            is_trial,
            trial_ends_at: None,
            trial_expired: expired,
            hours_remaining: hours,
            subscription_tier: SubscriptionTier::Trial,
            is_active: true,
        }
    }

    #[test]
    fn paying_practices_get_no_notice() {
        assert_eq!(TrialNotice::from_status(&status(false, false, 0)), None);
    }

    #[test]
    fn expired_trial_locks_out() {
        assert_eq!(
            TrialNotice::from_status(&status(true, true, 0)),
            Some(TrialNotice::Lockout)
        );
    }

    #[test]
    fn banner_urgency_buckets() {
        let urgency = |h| match TrialNotice::from_status(&status(true, false, h)) {
            Some(TrialNotice::Banner { urgency, .. }) => urgency,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(urgency(1), Urgency::Urgent);
        assert_eq!(urgency(11), Urgency::Urgent);
        assert_eq!(urgency(12), Urgency::Warning);
        assert_eq!(urgency(23), Urgency::Warning);
        assert_eq!(urgency(24), Urgency::Info);
        assert_eq!(urgency(24 * 14), Urgency::Info);
    }

    #[test]
    fn messages() {
        let one = TrialNotice::Banner {
            urgency: Urgency::Urgent,
            hours_remaining: 1,
        };
        assert_eq!(one.message(), "Your free trial ends in 1 hour.");
        let ten = TrialNotice::Banner {
            urgency: Urgency::Urgent,
            hours_remaining: 10,
        };
        assert_eq!(ten.message(), "Your free trial ends in 10 hours.");
    }
}
