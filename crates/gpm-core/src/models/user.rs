//! User (staff member) domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::credential::Credential;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    PracticeManager,
    Doctor,
    Nurse,
    Receptionist,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::PracticeManager => "practice_manager",
            UserRole::Doctor => "doctor",
            UserRole::Nurse => "nurse",
            UserRole::Receptionist => "receptionist",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(UserRole::Admin),
            "practice_manager" => Some(UserRole::PracticeManager),
            "doctor" => Some(UserRole::Doctor),
            "nurse" => Some(UserRole::Nurse),
            "receptionist" => Some(UserRole::Receptionist),
            _ => None,
        }
    }

    /// Administrators keep access while their practice's trial is expired.
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UserStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub practice_id: Uuid,
    /// Login identifier; unique across all practices.
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub credential: Credential,
    pub status: UserStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub practice_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    /// Already-encoded credential; hashing happens in the auth layer.
    pub credential: Credential,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
}
