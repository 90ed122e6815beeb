//! Stored password representation.
//!
//! Two encodings coexist in the user table: Argon2 PHC strings for every
//! account created through the application, and base64-encoded plaintext
//! for imported seed/demo accounts. The encoding is identified once, when a
//! row is loaded, and carried as a tagged variant from then on.
//!
//! The legacy variant is reversible and unsalted. It is accepted for
//! compatibility only; see `AuthConfig::allow_legacy_credentials`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix shared by every Argon2 PHC string (`$argon2id$`, `$argon2i$`, ...).
pub const ADAPTIVE_HASH_MARKER: &str = "$argon2";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Credential {
    /// Argon2 PHC-format hash.
    Hashed(String),
    /// Base64 of the plaintext password.
    LegacyEncoded(String),
}

impl Credential {
    /// Classify a stored credential string by its prefix.
    pub fn from_stored(stored: &str) -> Self {
        if stored.starts_with(ADAPTIVE_HASH_MARKER) {
            Credential::Hashed(stored.to_string())
        } else {
            Credential::LegacyEncoded(stored.to_string())
        }
    }

    /// The exact string persisted in the credential column.
    pub fn as_stored(&self) -> &str {
        match self {
            Credential::Hashed(s) | Credential::LegacyEncoded(s) => s,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Credential::LegacyEncoded(_))
    }
}

impl From<String> for Credential {
    fn from(stored: String) -> Self {
        if stored.starts_with(ADAPTIVE_HASH_MARKER) {
            Credential::Hashed(stored)
        } else {
            Credential::LegacyEncoded(stored)
        }
    }
}

impl From<Credential> for String {
    fn from(credential: Credential) -> Self {
        match credential {
            Credential::Hashed(s) | Credential::LegacyEncoded(s) => s,
        }
    }
}

// Legacy values decode straight back to the password, so neither variant
// is printed.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Hashed(_) => f.write_str("Credential::Hashed(..)"),
            Credential::LegacyEncoded(_) => f.write_str("Credential::LegacyEncoded(..)"),
        }
    }
}
