//! Device fingerprint generation.
//!
//! A fingerprint is the hex SHA-256 of a fixed, ordered set of device
//! attributes serialized as JSON. It is sent on every request in the
//! [`FINGERPRINT_HEADER`] header. Generation never fails: when the full
//! attribute set cannot be gathered, a reduced input is hashed instead.

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

pub const FINGERPRINT_HEADER: &str = "x-device-fingerprint";

/// Only the tail of the canvas export is hashed.
const CANVAS_SUFFIX_LEN: usize = 50;

#[derive(Debug, Error)]
#[error("signal unavailable: {0}")]
pub struct SignalError(pub String);

/// Attributes gathered in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSignals {
    pub user_agent: String,
    pub language: String,
    pub platform: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub timezone: String,
    pub session_storage: bool,
    pub local_storage: bool,
    pub indexed_db: bool,
    pub color_depth: u32,
    pub hardware_concurrency: u32,
    pub device_memory: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebGlInfo {
    pub vendor: String,
    pub renderer: String,
}

/// Where fingerprint attributes come from.
pub trait SignalSource {
    fn collect(&self) -> Result<DeviceSignals, SignalError>;

    /// Exported canvas data. Best effort.
    fn canvas_data(&self) -> Result<String, SignalError>;

    /// Best effort.
    fn webgl_info(&self) -> Result<WebGlInfo, SignalError>;

    /// `(user_agent, language, screen_width, screen_height)` for the
    /// fallback digest. Must not fail.
    fn basic(&self) -> (String, String, u32, u32);
}

/// Serialized form. Field order is part of the fingerprint.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FingerprintInput<'a> {
    user_agent: &'a str,
    language: &'a str,
    platform: &'a str,
    screen_width: u32,
    screen_height: u32,
    timezone: &'a str,
    session_storage: bool,
    local_storage: bool,
    indexed_db: bool,
    color_depth: u32,
    hardware_concurrency: u32,
    device_memory: Option<u32>,
    canvas: &'a str,
    webgl_vendor: &'a str,
    webgl_renderer: &'a str,
}

/// Compute the device fingerprint for `source`.
pub fn generate(source: &impl SignalSource) -> String {
    match full_digest(source) {
        Ok(digest) => digest,
        Err(e) => {
            debug!(error = %e, "falling back to reduced fingerprint");
            fallback_digest(source)
        }
    }
}

fn full_digest(source: &impl SignalSource) -> Result<String, SignalError> {
    let signals = source.collect()?;
    let canvas = source.canvas_data().unwrap_or_default();
    let webgl = source.webgl_info().unwrap_or(WebGlInfo {
        vendor: String::new(),
        renderer: String::new(),
    });

    let input = FingerprintInput {
        user_agent: &signals.user_agent,
        language: &signals.language,
        platform: &signals.platform,
        screen_width: signals.screen_width,
        screen_height: signals.screen_height,
        timezone: &signals.timezone,
        session_storage: signals.session_storage,
        local_storage: signals.local_storage,
        indexed_db: signals.indexed_db,
        color_depth: signals.color_depth,
        hardware_concurrency: signals.hardware_concurrency,
        device_memory: signals.device_memory,
        canvas: canvas_suffix(&canvas),
        webgl_vendor: &webgl.vendor,
        webgl_renderer: &webgl.renderer,
    };
    let json = serde_json::to_vec(&input).map_err(|e| SignalError(e.to_string()))?;
    Ok(sha256_hex(&json))
}

fn fallback_digest(source: &impl SignalSource) -> String {
    let (user_agent, language, width, height) = source.basic();
    sha256_hex(format!("{user_agent}|{language}|{width}x{height}").as_bytes())
}

/// Last [`CANVAS_SUFFIX_LEN`] characters of `data`.
fn canvas_suffix(data: &str) -> &str {
    let start = data
        .char_indices()
        .rev()
        .nth(CANVAS_SUFFIX_LEN - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &data[start..]
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Signals for a desktop client, read from the process environment.
///
/// The screen size is not discoverable without a windowing toolkit, so the
/// embedding application supplies it.
#[derive(Debug, Clone)]
pub struct HostSignals {
    pub screen_width: u32,
    pub screen_height: u32,
}

impl HostSignals {
    pub fn new(screen_width: u32, screen_height: u32) -> Self {
        Self {
            screen_width,
            screen_height,
        }
    }

    fn user_agent() -> String {
        format!(
            "gpm-client/{} ({}; {})",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH
        )
    }

    /// `en_GB.UTF-8` becomes `en-GB`.
    fn language() -> String {
        std::env::var("LC_ALL")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| std::env::var("LANG").ok())
            .and_then(|v| v.split('.').next().map(|tag| tag.replace('_', "-")))
            .filter(|tag| !tag.is_empty() && tag != "C" && tag != "POSIX")
            .unwrap_or_else(|| "en-US".to_string())
    }
}

impl SignalSource for HostSignals {
    fn collect(&self) -> Result<DeviceSignals, SignalError> {
        let cores = std::thread::available_parallelism()
            .map_err(|e| SignalError(format!("hardware concurrency: {e}")))?;
        Ok(DeviceSignals {
            user_agent: Self::user_agent(),
            language: Self::language(),
            platform: std::env::consts::OS.to_string(),
            screen_width: self.screen_width,
            screen_height: self.screen_height,
            timezone: std::env::var("TZ").unwrap_or_else(|_| "UTC".to_string()),
            session_storage: true,
            local_storage: true,
            indexed_db: false,
            color_depth: 24,
            hardware_concurrency: cores.get() as u32,
            device_memory: None,
        })
    }

    fn canvas_data(&self) -> Result<String, SignalError> {
        Err(SignalError("no canvas on desktop".into()))
    }

    fn webgl_info(&self) -> Result<WebGlInfo, SignalError> {
        Err(SignalError("no webgl on desktop".into()))
    }

    fn basic(&self) -> (String, String, u32, u32) {
        (
            Self::user_agent(),
            Self::language(),
            self.screen_width,
            self.screen_height,
        )
    }
}

/// Fixed signals, for tests and for replaying a known device.
#[derive(Debug, Clone)]
pub struct StaticSignals {
    pub signals: DeviceSignals,
    pub canvas: Option<String>,
    pub webgl: Option<WebGlInfo>,
    /// Make `collect` fail, forcing the reduced digest.
    pub fail_collect: bool,
}

impl StaticSignals {
    pub fn new(signals: DeviceSignals) -> Self {
        Self {
            signals,
            canvas: None,
            webgl: None,
            fail_collect: false,
        }
    }
}

impl SignalSource for StaticSignals {
    fn collect(&self) -> Result<DeviceSignals, SignalError> {
        if self.fail_collect {
            return Err(SignalError("collection disabled".into()));
        }
        Ok(self.signals.clone())
    }

    fn canvas_data(&self) -> Result<String, SignalError> {
        self.canvas
            .clone()
            .ok_or_else(|| SignalError("no canvas".into()))
    }

    fn webgl_info(&self) -> Result<WebGlInfo, SignalError> {
        self.webgl
            .clone()
            .ok_or_else(|| SignalError("no webgl".into()))
    }

    fn basic(&self) -> (String, String, u32, u32) {
        (
            self.signals.user_agent.clone(),
            self.signals.language.clone(),
            self.signals.screen_width,
            self.signals.screen_height,
        )
    }
}
