//! GPM Client: the client half of the authentication core: device
//! fingerprinting, persisted session state, trial status polling and the
//! HTTP API client.

pub mod api;
pub mod error;
pub mod fingerprint;
pub mod models;
pub mod notice;
pub mod poller;
pub mod session;

pub use api::{ApiClient, AuthApi};
pub use error::ClientError;
pub use fingerprint::{FINGERPRINT_HEADER, HostSignals, SignalSource, StaticSignals};
pub use models::{LoginResponse, TrialStatus, UserProfile};
pub use notice::{TrialNotice, Urgency};
pub use poller::TrialPoller;
pub use session::{ClientSession, FileSessionStore, MemorySessionStore, SessionStore, StoredSession};
