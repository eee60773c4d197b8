use ct_codecs::{Base64UrlSafeNoPadding, Decoder, Encoder};
use serde::{de::DeserializeOwned, Serialize};

use crate::claims::*;
use crate::common::*;
use crate::error::*;
use crate::jwt_header::*;

pub const MAX_HEADER_LENGTH: usize = 8192;

/// Compact JWS encoding shared by the HMAC algorithms
pub struct Token;

impl Token {
    pub(crate) fn build<AuthenticationFn, CustomClaims: Serialize>(
        jwt_header: &JWTHeader,
        claims: &JWTClaims<CustomClaims>,
        authentication_fn: AuthenticationFn,
    ) -> Result<String, Error>
    where
        AuthenticationFn: FnOnce(&str) -> Result<Vec<u8>, Error>,
    {
        let jwt_header_json = serde_json::to_string(&jwt_header)?;
        let claims_json = serde_json::to_string(claims)?;
        let authenticated = format!(
            "{}.{}",
            Base64UrlSafeNoPadding::encode_to_string(jwt_header_json)?,
            Base64UrlSafeNoPadding::encode_to_string(claims_json)?
        );
        let authentication_tag = authentication_fn(&authenticated)?;
        let mut token = authenticated;
        token.push('.');
        token.push_str(&Base64UrlSafeNoPadding::encode_to_string(
            authentication_tag,
        )?);
        Ok(token)
    }

    pub(crate) fn verify<AuthenticationFn, CustomClaims: DeserializeOwned>(
        jwt_alg_name: &'static str,
        token: &str,
        options: Option<VerificationOptions>,
        authentication_fn: AuthenticationFn,
    ) -> Result<JWTClaims<CustomClaims>, Error>
    where
        AuthenticationFn: FnOnce(&str, &[u8]) -> Result<(), Error>,
    {
        let options = options.unwrap_or_default();

        let mut parts = token.split('.');
        let jwt_header_b64 = parts.next().ok_or(KeygenError::CompactEncodingError)?;
        ensure!(
            jwt_header_b64.len() <= MAX_HEADER_LENGTH,
            KeygenError::HeaderTooLarge
        );
        let claims_b64 = parts.next().ok_or(KeygenError::CompactEncodingError)?;
        let authentication_tag_b64 = parts.next().ok_or(KeygenError::CompactEncodingError)?;
        ensure!(parts.next().is_none(), KeygenError::CompactEncodingError);
        let jwt_header: JWTHeader = serde_json::from_slice(
            &Base64UrlSafeNoPadding::decode_to_vec(jwt_header_b64, None)?,
        )?;
        if let Some(signature_type) = &jwt_header.signature_type {
            let signature_type_uc = signature_type.to_uppercase();
            ensure!(
                signature_type_uc == "JWT" || signature_type_uc.ends_with("+JWT"),
                KeygenError::NotJWT
            );
        }
        ensure!(
            jwt_header.algorithm == jwt_alg_name,
            KeygenError::AlgorithmMismatch
        );
        let authentication_tag =
            Base64UrlSafeNoPadding::decode_to_vec(authentication_tag_b64, None)?;
        let authenticated = &token[..jwt_header_b64.len() + 1 + claims_b64.len()];
        authentication_fn(authenticated, &authentication_tag)?;
        let claims: JWTClaims<CustomClaims> =
            serde_json::from_slice(&Base64UrlSafeNoPadding::decode_to_vec(claims_b64, None)?)?;
        claims.validate(&options)?;
        Ok(claims)
    }
}

#[test]
fn should_verify_token() {
    use crate::prelude::*;

    let key = HS256Key::from_bytes(b"a shared secret long enough");

    let claims = Claims::create(Duration::from_mins(10))
        .with_issuer("issuer")
        .with_audience("recipient");
    let token = key.authenticate(&claims).unwrap();

    let options = VerificationOptions {
        required_issuer: Some("issuer".to_string()),
        required_audience: Some("recipient".to_string()),
        ..Default::default()
    };
    let decoded = key
        .verify_token::<NoCustomClaims>(&token, Some(options))
        .unwrap();
    assert_eq!(decoded, claims);
}

#[test]
fn header_names_the_algorithm() {
    use crate::prelude::*;

    let key = HS384Key::from_bytes(b"a shared secret long enough");
    let token = key
        .authenticate(&Claims::create(Duration::from_mins(10)))
        .unwrap();
    let header_b64 = token.split('.').next().unwrap();
    let header: serde_json::Value = serde_json::from_slice(
        &Base64UrlSafeNoPadding::decode_to_vec(header_b64, None).unwrap(),
    )
    .unwrap();
    assert_eq!(header, serde_json::json!({"alg": "HS384", "typ": "JWT"}));
}

#[test]
fn rejects_malformed_tokens() {
    use crate::prelude::*;

    let key = HS256Key::from_bytes(b"a shared secret long enough");
    for token in ["", "a.b", "a.b.c.d"] {
        assert!(key.verify_token::<NoCustomClaims>(token, None).is_err());
    }
}
