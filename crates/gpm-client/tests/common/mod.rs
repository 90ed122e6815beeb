//! Scripted [`AuthApi`] for client tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use gpm_client::models::{LoginResponse, TrialStatus, UserProfile};
use gpm_client::{AuthApi, ClientError};
use gpm_core::models::practice::SubscriptionTier;
use gpm_core::models::user::UserRole;
use uuid::Uuid;

pub const EMAIL: &str = "ada@riverside.example";
pub const PASSWORD: &str = "correct-horse-battery";
pub const TOKEN: &str = "header.payload.signature";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeMode {
    Valid,
    Rejected,
    TrialExpired,
    Offline,
}

pub enum Poll {
    Status(TrialStatus),
    Fail,
}

pub struct FakeApi {
    pub user: UserProfile,
    pub me_mode: Mutex<MeMode>,
    polls: Mutex<VecDeque<Poll>>,
    last_status: Mutex<Option<TrialStatus>>,
    pub trial_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    /// `(endpoint, fingerprint)` for every call that carries one.
    pub seen_fingerprints: Mutex<Vec<(&'static str, String)>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            user: UserProfile {
                id: Uuid::new_v4(),
                email: EMAIL.into(),
                first_name: "Ada".into(),
                last_name: "Jones".into(),
                role: UserRole::Doctor,
                practice_id: Uuid::new_v4(),
            },
            me_mode: Mutex::new(MeMode::Valid),
            polls: Mutex::new(VecDeque::new()),
            last_status: Mutex::new(None),
            trial_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            seen_fingerprints: Mutex::new(Vec::new()),
        }
    }

    pub fn set_me_mode(&self, mode: MeMode) {
        *self.me_mode.lock().unwrap() = mode;
    }

    pub fn push_poll(&self, poll: Poll) {
        self.polls.lock().unwrap().push_back(poll);
    }

    pub fn trial_calls(&self) -> usize {
        self.trial_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    /// Fingerprints sent to `endpoint`, in call order.
    pub fn fingerprints_for(&self, endpoint: &str) -> Vec<String> {
        self.seen_fingerprints
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| *e == endpoint)
            .map(|(_, fp)| fp.clone())
            .collect()
    }

    fn record(&self, endpoint: &'static str, fingerprint: &str) {
        self.seen_fingerprints
            .lock()
            .unwrap()
            .push((endpoint, fingerprint.to_string()));
    }
}

pub fn trial(hours_remaining: i64) -> TrialStatus {
    TrialStatus {
        practice_name: "Riverside Family Practice".into(),
        is_trial: true,
        trial_ends_at: None,
        trial_expired: hours_remaining <= 0,
        hours_remaining: hours_remaining.max(0),
        subscription_tier: SubscriptionTier::Trial,
        is_active: true,
    }
}

impl AuthApi for FakeApi {
    async fn login(
        &self,
        email: &str,
        password: &str,
        fingerprint: &str,
    ) -> Result<LoginResponse, ClientError> {
        self.record("login", fingerprint);
        if email != EMAIL || password != PASSWORD {
            return Err(ClientError::InvalidCredentials);
        }
        Ok(LoginResponse {
            access_token: TOKEN.into(),
            expires_in: 28_800,
            user: self.user.clone(),
        })
    }

    async fn me(&self, token: &str, fingerprint: &str) -> Result<UserProfile, ClientError> {
        self.record("me", fingerprint);
        let mode = *self.me_mode.lock().unwrap();
        match mode {
            MeMode::Valid if token == TOKEN => Ok(self.user.clone()),
            MeMode::Valid | MeMode::Rejected => Err(ClientError::Unauthenticated),
            MeMode::TrialExpired => Err(ClientError::TrialExpired),
            MeMode::Offline => Err(ClientError::Server {
                status: 503,
                message: "unavailable".into(),
            }),
        }
    }

    async fn trial_status(&self, _token: &str, fingerprint: &str) -> Result<TrialStatus, ClientError> {
        self.record("trial_status", fingerprint);
        self.trial_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.polls.lock().unwrap().pop_front();
        match next {
            Some(Poll::Status(status)) => {
                *self.last_status.lock().unwrap() = Some(status.clone());
                Ok(status)
            }
            Some(Poll::Fail) => Err(ClientError::Server {
                status: 502,
                message: "bad gateway".into(),
            }),
            None => self
                .last_status
                .lock()
                .unwrap()
                .clone()
                .ok_or(ClientError::Server {
                    status: 500,
                    message: "no status scripted".into(),
                }),
        }
    }

    async fn logout(&self, _token: &str, fingerprint: &str) -> Result<(), ClientError> {
        self.record("logout", fingerprint);
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn forgot_password(&self, _email: &str) -> Result<String, ClientError> {
        Ok("sent".into())
    }

    async fn reset_password(&self, _token: &str, _password: &str) -> Result<String, ClientError> {
        Ok("reset".into())
    }
}
