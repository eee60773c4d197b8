#[allow(unused)]
pub use anyhow::{anyhow, bail, ensure, Error};

use crate::common::KeyFamily;

#[derive(Debug, thiserror::Error)]
pub enum KeygenError {
    #[error("{0} key generation requires asymmetric cryptography support, which this build does not include")]
    CapabilityUnavailable(KeyFamily),
    #[error("Secure random source unavailable: {0}")]
    EntropyUnavailable(String),
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),
    #[error("Generated {0} public key does not match its private key")]
    KeyPairMismatch(KeyFamily),
    #[error("Unsupported RSA modulus: {0} bits")]
    UnsupportedRSAModulus(usize),
    #[error("Unsupported HMAC key size: {0} bits")]
    UnsupportedHMACKeySize(usize),
    #[error("Invalid {0}: {1}")]
    InvalidSetting(&'static str, String),
    #[error("Token expiry must be between 1 and {max} hours, got {0}", max = crate::config::MAX_TOKEN_EXPIRY_HOURS)]
    InvalidTokenExpiry(u64),
    #[error("JWT compact encoding error")]
    CompactEncodingError,
    #[error("JWT header too large")]
    HeaderTooLarge,
    #[error("JWT algorithm mismatch")]
    AlgorithmMismatch,
    #[error("Authentication tag didn't verify")]
    InvalidAuthenticationTag,
    #[error("Clock drift detected")]
    ClockDrift,
    #[error("Token has expired")]
    TokenHasExpired,
    #[error("Required issuer mismatch")]
    RequiredIssuerMismatch,
    #[error("Required issuer missing")]
    RequiredIssuerMissing,
    #[error("Required subject mismatch")]
    RequiredSubjectMismatch,
    #[error("Required subject missing")]
    RequiredSubjectMissing,
    #[error("Required audience mismatch")]
    RequiredAudienceMismatch,
    #[error("Required audience missing")]
    RequiredAudienceMissing,
    #[error("Key is too short")]
    WeakKey,
    #[error("Not a JWT token")]
    NotJWT,
}

impl KeygenError {
    /// Process exit status for a fatal error of this kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            KeygenError::CapabilityUnavailable(_) => 3,
            KeygenError::EntropyUnavailable(_)
            | KeygenError::KeyGeneration(_)
            | KeygenError::KeyPairMismatch(_) => 4,
            _ => 1,
        }
    }
}

impl From<rand::Error> for KeygenError {
    fn from(e: rand::Error) -> KeygenError {
        KeygenError::EntropyUnavailable(e.to_string())
    }
}

/// Exit status for an arbitrary fatal error, looking through to a `KeygenError` if present.
pub fn exit_code(err: &Error) -> i32 {
    err.downcast_ref::<KeygenError>()
        .map(KeygenError::exit_code)
        .unwrap_or(1)
}
