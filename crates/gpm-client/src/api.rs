//! HTTP access to the authentication API.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::error::ClientError;
use crate::fingerprint::FINGERPRINT_HEADER;
use crate::models::{ErrorBody, LoginResponse, MessageBody, TrialStatus, UserProfile};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Operations the client needs from the server.
///
/// Abstracted so the session and the trial poller can run against a fake
/// in tests.
pub trait AuthApi: Send + Sync + 'static {
    fn login(
        &self,
        email: &str,
        password: &str,
        fingerprint: &str,
    ) -> impl Future<Output = Result<LoginResponse, ClientError>> + Send;

    fn me(
        &self,
        token: &str,
        fingerprint: &str,
    ) -> impl Future<Output = Result<UserProfile, ClientError>> + Send;

    fn trial_status(
        &self,
        token: &str,
        fingerprint: &str,
    ) -> impl Future<Output = Result<TrialStatus, ClientError>> + Send;

    fn logout(
        &self,
        token: &str,
        fingerprint: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn forgot_password(&self, email: &str) -> impl Future<Output = Result<String, ClientError>> + Send;

    fn reset_password(
        &self,
        token: &str,
        password: &str,
    ) -> impl Future<Output = Result<String, ClientError>> + Send;
}

/// `reqwest`-backed [`AuthApi`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        parse(response).await
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let body = response.json::<ErrorBody>().await.unwrap_or_default();
    Err(classify(status, body))
}

/// Map a non-success response to a [`ClientError`].
fn classify(status: StatusCode, body: ErrorBody) -> ClientError {
    let code = body.code.as_deref().unwrap_or_default();
    match (status, code) {
        (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS") => ClientError::InvalidCredentials,
        (StatusCode::UNAUTHORIZED, _) => ClientError::Unauthenticated,
        (StatusCode::FORBIDDEN, "TRIAL_EXPIRED") => ClientError::TrialExpired,
        _ => {
            debug!(status = status.as_u16(), code, "request failed");
            ClientError::Server {
                status: status.as_u16(),
                message: body.error,
            }
        }
    }
}

impl AuthApi for ApiClient {
    async fn login(
        &self,
        email: &str,
        password: &str,
        fingerprint: &str,
    ) -> Result<LoginResponse, ClientError> {
        let request = self
            .http
            .post(self.url("/api/auth/login"))
            .header(FINGERPRINT_HEADER, fingerprint)
            .json(&json!({ "email": email, "password": password }));
        self.send(request).await
    }

    async fn me(&self, token: &str, fingerprint: &str) -> Result<UserProfile, ClientError> {
        let request = self
            .http
            .get(self.url("/api/auth/me"))
            .bearer_auth(token)
            .header(FINGERPRINT_HEADER, fingerprint);
        self.send(request).await
    }

    async fn trial_status(&self, token: &str, fingerprint: &str) -> Result<TrialStatus, ClientError> {
        let request = self
            .http
            .get(self.url("/api/practice/trial-status"))
            .bearer_auth(token)
            .header(FINGERPRINT_HEADER, fingerprint);
        self.send(request).await
    }

    async fn logout(&self, token: &str, fingerprint: &str) -> Result<(), ClientError> {
        let request = self
            .http
            .post(self.url("/api/auth/logout"))
            .bearer_auth(token)
            .header(FINGERPRINT_HEADER, fingerprint);
        let _: MessageBody = self.send(request).await?;
        Ok(())
    }

    async fn forgot_password(&self, email: &str) -> Result<String, ClientError> {
        let request = self
            .http
            .post(self.url("/api/auth/forgot-password"))
            .json(&json!({ "email": email }));
        let body: MessageBody = self.send(request).await?;
        Ok(body.message)
    }

    async fn reset_password(&self, token: &str, password: &str) -> Result<String, ClientError> {
        let request = self
            .http
            .post(self.url("/api/auth/reset-password"))
            .json(&json!({ "token": token, "password": password }));
        let body: MessageBody = self.send(request).await?;
        Ok(body.message)
    }
}
