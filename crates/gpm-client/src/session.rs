//! Client session state.
//!
//! The session is restored explicitly at startup and revalidated against
//! the server before it is trusted. Identity (token and user) and device
//! identity (fingerprint) are stored together but cleared separately:
//! logout keeps the fingerprint, [`ClientSession::clear_device`] drops it.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::AuthApi;
use crate::error::ClientError;
use crate::fingerprint::{self, SignalSource};
use crate::models::{TrialStatus, UserProfile};
use crate::poller::{DEFAULT_INTERVAL, TrialPoller};

const SESSION_FILE: &str = "session.json";

/// Persisted session keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub access_token: Option<String>,
    pub user: Option<UserProfile>,
    pub device_fingerprint: Option<String>,
}

impl StoredSession {
    fn without_identity(&self) -> Self {
        Self {
            access_token: None,
            user: None,
            device_fingerprint: self.device_fingerprint.clone(),
        }
    }
}

/// Durable storage for [`StoredSession`]. Each `save` replaces the whole
/// record.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<StoredSession, ClientError>;
    fn save(&self, session: &StoredSession) -> Result<(), ClientError>;
}

/// JSON file store. Writes go to a sibling temp file and are renamed into
/// place.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `session.json` under the platform data directory.
    pub fn default_location() -> Result<Self, ClientError> {
        let dirs = ProjectDirs::from("", "", "gpm")
            .ok_or_else(|| ClientError::Storage("could not find data directory".into()))?;
        Ok(Self::new(dirs.data_dir().join(SESSION_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<StoredSession, ClientError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoredSession::default());
            }
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&contents) {
            Ok(session) => Ok(session),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "discarding unreadable session file");
                Ok(StoredSession::default())
            }
        }
    }

    fn save(&self, session: &StoredSession) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&serde_json::to_vec_pretty(session)?)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<StoredSession>,
}

impl MemorySessionStore {
    pub fn new(session: StoredSession) -> Self {
        Self {
            inner: Mutex::new(session),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<StoredSession, ClientError> {
        Ok(self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, session: &StoredSession) -> Result<(), ClientError> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = session.clone();
        Ok(())
    }
}

/// The signed-in state of this client.
pub struct ClientSession<A: AuthApi, S: SessionStore> {
    api: Arc<A>,
    store: S,
    current: StoredSession,
    poller: Option<TrialPoller>,
    poll_interval: Duration,
}

impl<A: AuthApi, S: SessionStore> ClientSession<A, S> {
    pub fn new(api: Arc<A>, store: S) -> Self {
        Self {
            api,
            store,
            current: StoredSession::default(),
            poller: None,
            poll_interval: DEFAULT_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.current.user.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.current.access_token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.access_token.is_some()
    }

    /// Trial status updates, while signed in.
    pub fn trial_updates(&self) -> Option<watch::Receiver<Option<TrialStatus>>> {
        self.poller.as_ref().map(TrialPoller::subscribe)
    }

    /// The stored device fingerprint, generating and persisting one on
    /// first use.
    pub fn device_fingerprint(&mut self, source: &impl SignalSource) -> Result<String, ClientError> {
        if self.current.device_fingerprint.is_none() {
            self.current = self.store.load()?;
        }
        if let Some(fp) = &self.current.device_fingerprint {
            return Ok(fp.clone());
        }
        let fp = fingerprint::generate(source);
        let mut next = self.current.clone();
        next.device_fingerprint = Some(fp.clone());
        self.commit(next)?;
        Ok(fp)
    }

    /// Load the stored session and confirm it with the server.
    ///
    /// Returns the signed-in user, or `None` if there was no session or the
    /// server rejected it (the stale identity is cleared). If the server is
    /// unreachable the cached identity is kept.
    pub async fn restore(&mut self) -> Result<Option<UserProfile>, ClientError> {
        self.current = self.store.load()?;
        if self.current.access_token.is_none() {
            return Ok(None);
        }
        self.revalidate().await
    }

    /// Re-check the current token via the profile endpoint.
    pub async fn revalidate(&mut self) -> Result<Option<UserProfile>, ClientError> {
        let Some(token) = self.current.access_token.clone() else {
            return Ok(None);
        };
        let fp = self.current.device_fingerprint.clone().unwrap_or_default();

        match self.api.me(&token, &fp).await {
            Ok(user) => {
                let mut next = self.current.clone();
                next.user = Some(user.clone());
                self.commit(next)?;
                self.start_poller(token);
                Ok(Some(user))
            }
            // Still signed in; the trial gate blocks everything but the
            // lockout view.
            Err(ClientError::TrialExpired) => {
                self.start_poller(token);
                Ok(self.current.user.clone())
            }
            Err(ClientError::Unauthenticated) => {
                debug!("stored session rejected; clearing identity");
                self.clear_identity()?;
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "could not revalidate session; keeping cached identity");
                Ok(self.current.user.clone())
            }
        }
    }

    pub async fn login(
        &mut self,
        email: &str,
        password: &str,
        source: &impl SignalSource,
    ) -> Result<UserProfile, ClientError> {
        let fp = self.device_fingerprint(source)?;
        let response = self.api.login(email, password, &fp).await?;

        let mut next = self.current.clone();
        next.access_token = Some(response.access_token.clone());
        next.user = Some(response.user.clone());
        self.commit(next)?;
        self.start_poller(response.access_token);

        info!(user_id = %response.user.id, "signed in");
        Ok(response.user)
    }

    /// Sign out: notify the server (best effort), stop polling and clear the
    /// identity keys in one write. The device fingerprint is kept.
    pub async fn logout(&mut self) -> Result<(), ClientError> {
        if let Some(poller) = self.poller.take() {
            poller.stop().await;
        }
        // Not restored yet: start from what is on disk so the fingerprint
        // survives.
        if self.current == StoredSession::default() {
            self.current = self.store.load()?;
        }
        if let Some(token) = self.current.access_token.as_deref() {
            let fp = self.current.device_fingerprint.as_deref().unwrap_or_default();
            if let Err(e) = self.api.logout(token, fp).await {
                debug!(error = %e, "server logout failed");
            }
        }
        self.clear_identity()?;
        info!("signed out");
        Ok(())
    }

    /// Forget this device as well as the identity.
    pub async fn clear_device(&mut self) -> Result<(), ClientError> {
        self.logout().await?;
        self.commit(StoredSession::default())
    }

    fn clear_identity(&mut self) -> Result<(), ClientError> {
        self.poller = None;
        let next = self.current.without_identity();
        self.commit(next)
    }

    fn commit(&mut self, next: StoredSession) -> Result<(), ClientError> {
        self.store.save(&next)?;
        self.current = next;
        Ok(())
    }

    fn start_poller(&mut self, token: String) {
        // Replacing the old poller drops and cancels it.
        let fp = self.current.device_fingerprint.clone().unwrap_or_default();
        self.poller = Some(TrialPoller::spawn(
            Arc::clone(&self.api),
            token,
            fp,
            self.poll_interval,
        ));
    }
}
