//! Password verification and hashing.
//!
//! Stored credentials come in two shapes (see [`Credential`]): Argon2 PHC
//! strings and legacy base64-encoded seed passwords. Verification never
//! fails on a wrong password; it only returns `Ok(false)`.

use std::sync::LazyLock;

use argon2::password_hash::{Error as PhcError, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use gpm_core::models::credential::Credential;
use tracing::warn;

use crate::error::AuthError;

/// Hash verified against when the account does not exist, so that an
/// unknown email costs about as much as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("gpm-dummy-password", None).ok());

fn peppered<'a>(password: &'a str, pepper: Option<&str>, buf: &'a mut String) -> &'a [u8] {
    match pepper {
        Some(p) => {
            *buf = format!("{p}{password}");
            buf.as_bytes()
        }
        None => password.as_bytes(),
    }
}

/// Verify a supplied password against a stored credential.
///
/// `allow_legacy` gates the base64 path; when it is `false` legacy
/// credentials never match.
pub fn verify(
    credential: &Credential,
    password: &str,
    pepper: Option<&str>,
    allow_legacy: bool,
) -> Result<bool, AuthError> {
    match credential {
        Credential::Hashed(hash) => verify_hashed(hash, password, pepper),
        Credential::LegacyEncoded(encoded) => {
            if !allow_legacy {
                warn!("legacy credential rejected: legacy verification disabled");
                return Ok(false);
            }
            Ok(verify_legacy(encoded, password))
        }
    }
}

/// Verify a raw stored string, classifying it by prefix first.
pub fn verify_stored(stored: &str, password: &str) -> Result<bool, AuthError> {
    verify(&Credential::from_stored(stored), password, None, true)
}

fn verify_hashed(hash: &str, password: &str, pepper: Option<&str>) -> Result<bool, AuthError> {
    let mut buf = String::new();
    let input = peppered(password, pepper, &mut buf);

    let parsed_hash = match argon2::PasswordHash::new(hash) {
        Ok(h) => h,
        Err(e) => {
            warn!(error = %e, "stored credential is not a valid PHC string");
            return Ok(false);
        }
    };

    match Argon2::default().verify_password(input, &parsed_hash) {
        Ok(()) => Ok(true),
        Err(PhcError::Password) => Ok(false),
        Err(e) if is_malformed(&e) => {
            warn!(error = %e, "stored credential has unusable argon2 parameters");
            Ok(false)
        }
        Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
    }
}

/// Errors that describe the stored hash itself rather than a failure to
/// compute one.
fn is_malformed(err: &PhcError) -> bool {
    matches!(
        err,
        PhcError::Algorithm
            | PhcError::B64Encoding(_)
            | PhcError::OutputSize { .. }
            | PhcError::ParamNameDuplicated
            | PhcError::ParamNameInvalid
            | PhcError::ParamValueInvalid(_)
            | PhcError::ParamsMaxExceeded
            | PhcError::PhcStringField
            | PhcError::PhcStringTrailingData
            | PhcError::SaltInvalid(_)
            | PhcError::Version
    )
}

fn verify_legacy(encoded: &str, password: &str) -> bool {
    STANDARD.encode(password.as_bytes()) == encoded
}

/// Burn one Argon2 verification for a login against an unknown account.
pub fn verify_dummy(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_hashed(hash, password, None);
    }
}

/// Hash a password with Argon2id using OWASP-recommended parameters
/// (m=19456, t=2, p=1) and a fresh random salt.
pub fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, AuthError> {
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| AuthError::Crypto(format!("argon2 params error: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut buf = String::new();
    let input = peppered(password, pepper, &mut buf);

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(input, &salt)
        .map_err(|e| AuthError::Crypto(format!("password hash error: {e}")))?;

    Ok(hash.to_string())
}

/// Hash a password into a storable [`Credential::Hashed`].
pub fn new_credential(password: &str, pepper: Option<&str>) -> Result<Credential, AuthError> {
    hash_password(password, pepper).map(Credential::Hashed)
}
