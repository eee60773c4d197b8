use ct_codecs::{Base64UrlSafe, Base64UrlSafeNoPadding, Decoder, Encoder};
use hmac_sha512::sha384 as hmac_sha384;
use rand::{rngs::OsRng, RngCore};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

use crate::claims::*;
use crate::common::*;
use crate::error::*;
use crate::jwt_header::*;
use crate::token::*;

/// Minimum accepted key length, in bytes, when authenticating or verifying tokens.
pub const MIN_KEY_LENGTH: usize = 12;

/// HMAC signing algorithms, selected by the length of the shared secret.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum HmacAlgorithm {
    HS256,
    HS384,
    HS512,
}

impl HmacAlgorithm {
    pub const ALL: [HmacAlgorithm; 3] = [
        HmacAlgorithm::HS256,
        HmacAlgorithm::HS384,
        HmacAlgorithm::HS512,
    ];

    /// The algorithm matching a secret of `bits` bits.
    pub fn from_bits(bits: usize) -> Result<Self, Error> {
        match bits {
            256 => Ok(HmacAlgorithm::HS256),
            384 => Ok(HmacAlgorithm::HS384),
            512 => Ok(HmacAlgorithm::HS512),
            _ => bail!(KeygenError::UnsupportedHMACKeySize(bits)),
        }
    }

    pub fn bits(&self) -> usize {
        match self {
            HmacAlgorithm::HS256 => 256,
            HmacAlgorithm::HS384 => 384,
            HmacAlgorithm::HS512 => 512,
        }
    }

    pub fn jwt_alg_name(&self) -> &'static str {
        match self {
            HmacAlgorithm::HS256 => HS256Key::jwt_alg_name(),
            HmacAlgorithm::HS384 => HS384Key::jwt_alg_name(),
            HmacAlgorithm::HS512 => HS512Key::jwt_alg_name(),
        }
    }

    /// Authenticate `claims` with `key` using this algorithm.
    pub fn authenticate<CustomClaims: Serialize>(
        &self,
        key: &[u8],
        claims: &JWTClaims<CustomClaims>,
    ) -> Result<String, Error> {
        match self {
            HmacAlgorithm::HS256 => HS256Key::from_bytes(key).authenticate(claims),
            HmacAlgorithm::HS384 => HS384Key::from_bytes(key).authenticate(claims),
            HmacAlgorithm::HS512 => HS512Key::from_bytes(key).authenticate(claims),
        }
    }

    /// Verify a token authenticated with `key` using this algorithm.
    pub fn verify_token<CustomClaims: DeserializeOwned>(
        &self,
        key: &[u8],
        token: &str,
        options: Option<VerificationOptions>,
    ) -> Result<JWTClaims<CustomClaims>, Error> {
        match self {
            HmacAlgorithm::HS256 => HS256Key::from_bytes(key).verify_token(token, options),
            HmacAlgorithm::HS384 => HS384Key::from_bytes(key).verify_token(token, options),
            HmacAlgorithm::HS512 => HS512Key::from_bytes(key).verify_token(token, options),
        }
    }
}

impl fmt::Display for HmacAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.jwt_alg_name())
    }
}

/// Generate a random shared secret of `bits` bits, encoded as URL-safe base64.
///
/// `bits` must be 256, 384 or 512. The random bytes come straight from the
/// operating system; a failing random source is reported, never retried.
pub fn generate_secret(bits: usize) -> Result<String, Error> {
    HmacAlgorithm::from_bits(bits)?;
    let key = HMACKey::generate(bits / 8)?;
    Ok(Base64UrlSafe::encode_to_string(key.as_ref())?)
}

/// Decode a secret produced by [`generate_secret`], with or without padding.
pub fn decode_secret(secret: &str) -> Result<Vec<u8>, Error> {
    let unpadded = secret.trim().trim_end_matches('=');
    Ok(Base64UrlSafeNoPadding::decode_to_vec(unpadded, None)?)
}

#[doc(hidden)]
#[derive(Debug, Clone)]
pub struct HMACKey {
    raw_key: Vec<u8>,
}

impl Drop for HMACKey {
    fn drop(&mut self) {
        self.raw_key.zeroize();
    }
}

impl HMACKey {
    /// Create a HMAC key from a byte slice.
    pub fn from_bytes(raw_key: &[u8]) -> Self {
        HMACKey {
            raw_key: raw_key.to_vec(),
        }
    }

    /// Generate a random HMAC key of `len` bytes.
    pub fn generate(len: usize) -> Result<Self, Error> {
        let mut raw_key = vec![0u8; len];
        OsRng
            .try_fill_bytes(&mut raw_key)
            .map_err(KeygenError::from)?;
        Ok(HMACKey { raw_key })
    }
}

impl AsRef<[u8]> for HMACKey {
    /// Get the raw key, as a byte slice
    fn as_ref(&self) -> &[u8] {
        &self.raw_key
    }
}

pub trait MACLike {
    fn jwt_alg_name() -> &'static str;
    fn key(&self) -> &HMACKey;
    fn authentication_tag(&self, authenticated: &[u8]) -> Vec<u8>;

    /// Authenticate a token.
    fn authenticate<CustomClaims: Serialize>(
        &self,
        claims: &JWTClaims<CustomClaims>,
    ) -> Result<String, Error> {
        ensure!(
            self.key().as_ref().len() >= MIN_KEY_LENGTH,
            KeygenError::WeakKey
        );
        let jwt_header = JWTHeader::new(Self::jwt_alg_name().to_string());
        Token::build(&jwt_header, claims, |authenticated| {
            Ok(self.authentication_tag(authenticated.as_bytes()))
        })
    }

    /// Verify a token.
    fn verify_token<CustomClaims: DeserializeOwned>(
        &self,
        token: &str,
        options: Option<VerificationOptions>,
    ) -> Result<JWTClaims<CustomClaims>, Error> {
        ensure!(
            self.key().as_ref().len() >= MIN_KEY_LENGTH,
            KeygenError::WeakKey
        );
        Token::verify(
            Self::jwt_alg_name(),
            token,
            options,
            |authenticated, authentication_tag| {
                ensure!(
                    ct_codecs::verify(
                        &self.authentication_tag(authenticated.as_bytes()),
                        authentication_tag
                    ),
                    KeygenError::InvalidAuthenticationTag
                );
                Ok(())
            },
        )
    }
}

#[derive(Debug, Clone)]
pub struct HS256Key {
    key: HMACKey,
}

impl MACLike for HS256Key {
    fn jwt_alg_name() -> &'static str {
        "HS256"
    }

    fn key(&self) -> &HMACKey {
        &self.key
    }

    fn authentication_tag(&self, authenticated: &[u8]) -> Vec<u8> {
        hmac_sha256::HMAC::mac(authenticated, self.key().as_ref()).to_vec()
    }
}

impl HS256Key {
    pub fn from_bytes(raw_key: &[u8]) -> Self {
        HS256Key {
            key: HMACKey::from_bytes(raw_key),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HS384Key {
    key: HMACKey,
}

impl MACLike for HS384Key {
    fn jwt_alg_name() -> &'static str {
        "HS384"
    }

    fn key(&self) -> &HMACKey {
        &self.key
    }

    fn authentication_tag(&self, authenticated: &[u8]) -> Vec<u8> {
        hmac_sha384::HMAC::mac(authenticated, self.key().as_ref()).to_vec()
    }
}

impl HS384Key {
    pub fn from_bytes(raw_key: &[u8]) -> Self {
        HS384Key {
            key: HMACKey::from_bytes(raw_key),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HS512Key {
    key: HMACKey,
}

impl MACLike for HS512Key {
    fn jwt_alg_name() -> &'static str {
        "HS512"
    }

    fn key(&self) -> &HMACKey {
        &self.key
    }

    fn authentication_tag(&self, authenticated: &[u8]) -> Vec<u8> {
        hmac_sha512::HMAC::mac(authenticated, self.key().as_ref()).to_vec()
    }
}

impl HS512Key {
    pub fn from_bytes(raw_key: &[u8]) -> Self {
        HS512Key {
            key: HMACKey::from_bytes(raw_key),
        }
    }
}
