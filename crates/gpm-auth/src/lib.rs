//! GPM Auth: credential verification, session token issuance and
//! authentication, free-trial gating, and password reset.

pub mod config;
pub mod credential;
pub mod error;
pub mod notify;
pub mod service;
pub mod token;
pub mod trial;

pub use config::AuthConfig;
pub use error::AuthError;
pub use notify::{LogNotifier, ResetNotifier};
pub use service::{AuthService, LoginInput, LoginOutput, UserProfile};
pub use token::SessionClaims;
pub use trial::{TrialState, TrialStatus};
