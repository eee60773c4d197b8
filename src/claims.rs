use coarsetime::{Clock, Duration, UnixTimeStamp};
use ct_codecs::{Encoder, Hex};
use rand::{rngs::OsRng, RngCore};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::common::VerificationOptions;
use crate::error::*;
use crate::serde_additions;

pub const DEFAULT_TIME_TOLERANCE_SECS: u64 = 900;

/// Type representing the fact that no application-defined claims is necessary.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoCustomClaims {}

/// A set of JWT claims.
///
/// The `CustomClaims` parameter can be set to `NoCustomClaims` if only standard claims are used,
/// or to a user-defined type that must be `serde`-serializable if custom claims are required.
///
/// Timestamps are whole seconds, so a set of claims survives a round trip through a token
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JWTClaims<CustomClaims> {
    /// Issuer
    #[serde(rename = "iss", default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// Subject
    #[serde(rename = "sub", default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Audience
    #[serde(rename = "aud", default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,

    /// Time the claims were created at
    #[serde(
        rename = "iat",
        default,
        skip_serializing_if = "Option::is_none",
        with = "self::serde_additions::unix_timestamp"
    )]
    pub issued_at: Option<UnixTimeStamp>,

    /// Time the claims expire at
    #[serde(
        rename = "exp",
        default,
        skip_serializing_if = "Option::is_none",
        with = "self::serde_additions::unix_timestamp"
    )]
    pub expires_at: Option<UnixTimeStamp>,

    /// JWT identifier
    #[serde(rename = "jti", default, skip_serializing_if = "Option::is_none")]
    pub jwt_id: Option<String>,

    /// Custom (application-defined) claims
    #[serde(flatten)]
    pub custom: CustomClaims,
}

impl<CustomClaims> JWTClaims<CustomClaims> {
    pub(crate) fn validate(&self, options: &VerificationOptions) -> Result<(), Error> {
        let now = Clock::now_since_epoch();
        let time_tolerance = options
            .time_tolerance
            .unwrap_or_else(|| Duration::from_secs(DEFAULT_TIME_TOLERANCE_SECS));

        if let Some(time_issued) = self.issued_at {
            ensure!(time_issued <= now + time_tolerance, KeygenError::ClockDrift);
        }
        if let Some(expires_at) = self.expires_at {
            ensure!(
                now <= expires_at + time_tolerance,
                KeygenError::TokenHasExpired
            );
        }
        check_required(
            &options.required_issuer,
            &self.issuer,
            KeygenError::RequiredIssuerMismatch,
            KeygenError::RequiredIssuerMissing,
        )?;
        check_required(
            &options.required_subject,
            &self.subject,
            KeygenError::RequiredSubjectMismatch,
            KeygenError::RequiredSubjectMissing,
        )?;
        check_required(
            &options.required_audience,
            &self.audience,
            KeygenError::RequiredAudienceMismatch,
            KeygenError::RequiredAudienceMissing,
        )?;
        Ok(())
    }

    /// Set the issuer
    pub fn with_issuer(mut self, issuer: impl ToString) -> Self {
        self.issuer = Some(issuer.to_string());
        self
    }

    /// Set the subject
    pub fn with_subject(mut self, subject: impl ToString) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    /// Set the audience
    pub fn with_audience(mut self, audience: impl ToString) -> Self {
        self.audience = Some(audience.to_string());
        self
    }

    /// Create a random JWT identifier, attach it and return it
    pub fn create_jwt_id(&mut self) -> Result<&str, Error> {
        let mut raw_id = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut raw_id)
            .map_err(KeygenError::from)?;
        self.jwt_id = Some(Hex::encode_to_string(raw_id)?);
        Ok(self.jwt_id.as_deref().unwrap_or_default())
    }
}

fn check_required(
    required: &Option<String>,
    actual: &Option<String>,
    mismatch: KeygenError,
    missing: KeygenError,
) -> Result<(), Error> {
    if let Some(required) = required {
        match actual {
            Some(actual) => ensure!(actual == required, mismatch),
            None => bail!(missing),
        }
    }
    Ok(())
}

pub struct Claims;

impl Claims {
    /// Create a new set of claims, without custom data, expiring in `valid_for`.
    pub fn create(valid_for: Duration) -> JWTClaims<NoCustomClaims> {
        Claims::with_custom_claims(NoCustomClaims {}, valid_for)
    }

    /// Create a new set of claims, with custom data, expiring in `valid_for`.
    pub fn with_custom_claims<CustomClaims: Serialize + DeserializeOwned>(
        custom_claims: CustomClaims,
        valid_for: Duration,
    ) -> JWTClaims<CustomClaims> {
        let now = UnixTimeStamp::from_secs(Clock::now_since_epoch().as_secs());
        JWTClaims {
            issuer: None,
            subject: None,
            audience: None,
            issued_at: Some(now),
            expires_at: Some(now + valid_for),
            jwt_id: None,
            custom: custom_claims,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_their_own_field() {
        let claims = Claims::create(Duration::from_hours(1))
            .with_issuer("iss")
            .with_subject("sub")
            .with_audience("aud");
        assert_eq!(claims.issuer.as_deref(), Some("iss"));
        assert_eq!(claims.subject.as_deref(), Some("sub"));
        assert_eq!(claims.audience.as_deref(), Some("aud"));
    }

    #[test]
    fn expiry_is_whole_seconds_after_issue() {
        let claims = Claims::create(Duration::from_hours(24));
        let iat = claims.issued_at.unwrap();
        let exp = claims.expires_at.unwrap();
        assert_eq!(exp.as_secs() - iat.as_secs(), 24 * 3600);
        assert_eq!(iat, UnixTimeStamp::from_secs(iat.as_secs()));
    }

    #[test]
    fn jwt_ids_are_random_hex() {
        let mut a = Claims::create(Duration::from_hours(1));
        let mut b = Claims::create(Duration::from_hours(1));
        let id_a = a.create_jwt_id().unwrap().to_string();
        let id_b = b.create_jwt_id().unwrap().to_string();
        assert_eq!(id_a.len(), 32);
        assert!(id_a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id_a, id_b);
    }

    #[test]
    fn expired_claims_are_rejected() {
        let mut claims = Claims::create(Duration::from_hours(1));
        claims.expires_at = Some(UnixTimeStamp::from_secs(1000));
        let err = claims
            .validate(&VerificationOptions::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<KeygenError>(),
            Some(KeygenError::TokenHasExpired)
        ));
    }

    #[test]
    fn required_audience_must_match() {
        let claims = Claims::create(Duration::from_hours(1)).with_audience("api.example.com");
        let options = VerificationOptions {
            required_audience: Some("other".to_string()),
            ..Default::default()
        };
        assert!(claims.validate(&options).is_err());
        let options = VerificationOptions {
            required_audience: Some("api.example.com".to_string()),
            ..Default::default()
        };
        claims.validate(&options).unwrap();
    }
}
