use coarsetime::Duration;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::algorithms::HmacAlgorithm;
use crate::claims::*;
use crate::common::VerificationOptions;
use crate::config::MAX_TOKEN_EXPIRY_HOURS;
use crate::error::*;
use crate::material::HmacSecret;

pub const EXAMPLE_ISSUER: &str = "jwt-key-generator";
pub const EXAMPLE_SUBJECT: &str = "test_user";
pub const EXAMPLE_AUDIENCE: &str = "api.example.com";

/// Placeholder application data carried by the example token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationData {
    pub user_id: u64,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
}

impl Default for ApplicationData {
    fn default() -> Self {
        ApplicationData {
            user_id: 12345,
            username: "test_user".to_string(),
            email: "user@example.com".to_string(),
            roles: vec!["user".to_string(), "admin".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleData {
    pub data: ApplicationData,
}

pub type ExampleClaims = JWTClaims<ExampleData>;

/// What came out of verifying the example token.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DecodedPayload {
    Claims(ExampleClaims),
    Invalid(String),
}

pub const INVALID_TOKEN: &str = "Invalid token";

/// A signed example token along with the recorded result of verifying it.
#[derive(Debug, Clone, Serialize)]
pub struct ExampleToken {
    pub algorithm: HmacAlgorithm,
    #[serde(rename = "secret_key")]
    pub secret: String,
    pub payload: ExampleClaims,
    #[serde(rename = "jwt_token")]
    pub token: String,
    pub verification_result: bool,
    pub decoded_payload: DecodedPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_error: Option<String>,
}

impl ExampleToken {
    /// Decoded claims, only if verification succeeded
    pub fn decoded_claims(&self) -> Option<&ExampleClaims> {
        match &self.decoded_payload {
            DecodedPayload::Claims(claims) => Some(claims),
            DecodedPayload::Invalid(_) => None,
        }
    }
}

/// Builds an example token for a freshly generated secret and checks it.
#[derive(Debug, Clone)]
pub struct ExampleTokenBuilder {
    issuer: String,
    subject: String,
    audience: String,
    data: ApplicationData,
}

impl Default for ExampleTokenBuilder {
    fn default() -> Self {
        ExampleTokenBuilder {
            issuer: EXAMPLE_ISSUER.to_string(),
            subject: EXAMPLE_SUBJECT.to_string(),
            audience: EXAMPLE_AUDIENCE.to_string(),
            data: ApplicationData::default(),
        }
    }
}

impl ExampleTokenBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh payload: issued now, expiring `expiry_hours` later, with a random identifier.
    pub fn claims(&self, expiry_hours: u64) -> Result<ExampleClaims, Error> {
        ensure!(
            (1..=MAX_TOKEN_EXPIRY_HOURS).contains(&expiry_hours),
            KeygenError::InvalidTokenExpiry(expiry_hours)
        );
        let mut claims = Claims::with_custom_claims(
            ExampleData {
                data: self.data.clone(),
            },
            Duration::from_hours(expiry_hours),
        )
        .with_issuer(&self.issuer)
        .with_subject(&self.subject)
        .with_audience(&self.audience);
        claims.create_jwt_id()?;
        Ok(claims)
    }

    /// Sign a new payload with `secret`, then verify and decode the result with the same secret.
    ///
    /// Verification failure does not make this fail: it is recorded in the returned token.
    pub fn build(&self, secret: &HmacSecret, expiry_hours: u64) -> Result<ExampleToken, Error> {
        let payload = self.claims(expiry_hours)?;
        let token = secret
            .algorithm
            .authenticate(secret.key_bytes(), &payload)?;
        Ok(self.examine(secret, payload, token))
    }

    /// Verify `token` against `secret`, requiring this builder's issuer, subject and audience.
    pub fn verify(&self, secret: &HmacSecret, token: &str) -> Result<ExampleClaims, Error> {
        let options = VerificationOptions {
            required_issuer: Some(self.issuer.clone()),
            required_subject: Some(self.subject.clone()),
            required_audience: Some(self.audience.clone()),
            ..Default::default()
        };
        secret
            .algorithm
            .verify_token::<ExampleData>(secret.key_bytes(), token, Some(options))
    }

    pub(crate) fn examine(
        &self,
        secret: &HmacSecret,
        payload: ExampleClaims,
        token: String,
    ) -> ExampleToken {
        let (verification_result, decoded_payload, verification_error) =
            match self.verify(secret, &token) {
                Ok(decoded) => {
                    debug!("Example {} token verified", secret.algorithm);
                    (true, DecodedPayload::Claims(decoded), None)
                }
                Err(e) => {
                    warn!(
                        "Example {} token failed verification with its own secret: {}",
                        secret.algorithm, e
                    );
                    (
                        false,
                        DecodedPayload::Invalid(INVALID_TOKEN.to_string()),
                        Some(e.to_string()),
                    )
                }
            };
        ExampleToken {
            algorithm: secret.algorithm,
            secret: secret.secret.clone(),
            payload,
            token,
            verification_result,
            decoded_payload,
            verification_error,
        }
    }
}

/// Build an example token with the default placeholder claims.
pub fn build_example_token(secret: &HmacSecret, expiry_hours: u64) -> Result<ExampleToken, Error> {
    ExampleTokenBuilder::new().build(secret, expiry_hours)
}
