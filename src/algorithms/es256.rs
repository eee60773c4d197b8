use p256::ecdsa::{
    signature::{Signer as _, Verifier as _},
    Signature, SigningKey, VerifyingKey,
};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroize;

use crate::common::KeyFamily;
use crate::error::*;
use crate::material::KeyPairPem;

fn encoding_error(e: impl std::fmt::Display) -> KeygenError {
    KeygenError::KeyGeneration(e.to_string())
}

#[doc(hidden)]
#[derive(Debug, Clone)]
pub struct P256PublicKey(VerifyingKey);

impl P256PublicKey {
    pub fn from_pem(pem: &str) -> Result<Self, Error> {
        let p256_pk = VerifyingKey::from_public_key_pem(pem.trim()).map_err(encoding_error)?;
        Ok(P256PublicKey(p256_pk))
    }

    /// SubjectPublicKeyInfo PEM ("BEGIN PUBLIC KEY")
    pub fn to_pem(&self) -> Result<String, Error> {
        Ok(self
            .0
            .to_public_key_pem(LineEnding::LF)
            .map_err(encoding_error)?)
    }

    /// Verify an ES256 signature.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match Signature::from_slice(signature) {
            Ok(signature) => self.0.verify(message, &signature).is_ok(),
            Err(_) => false,
        }
    }
}

#[doc(hidden)]
#[derive(Debug, Clone)]
pub struct P256KeyPair {
    p256_sk: SigningKey,
}

impl P256KeyPair {
    pub fn from_pem(pem: &str) -> Result<Self, Error> {
        let p256_sk = SigningKey::from_pkcs8_pem(pem.trim()).map_err(encoding_error)?;
        Ok(P256KeyPair { p256_sk })
    }

    /// Unencrypted PKCS#8 PEM ("BEGIN PRIVATE KEY")
    pub fn to_pem(&self) -> Result<String, Error> {
        let pem = self
            .p256_sk
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(encoding_error)?;
        Ok(pem.to_string())
    }

    /// The public key derived from the private scalar.
    pub fn public_key(&self) -> P256PublicKey {
        P256PublicKey(*self.p256_sk.verifying_key())
    }

    /// Sign with ES256, returning the fixed-size `r || s` signature.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature: Signature = self.p256_sk.sign(message);
        signature.to_bytes().to_vec()
    }

    pub fn generate() -> Result<Self, Error> {
        let mut raw = [0u8; 32];
        OsRng.try_fill_bytes(&mut raw).map_err(KeygenError::from)?;
        let p256_sk = SigningKey::from_slice(&raw).map_err(encoding_error);
        raw.zeroize();
        Ok(P256KeyPair { p256_sk: p256_sk? })
    }
}

/// Generate a P-256 key pair and serialize both halves as PEM.
pub fn generate_ec() -> Result<KeyPairPem, Error> {
    let key_pair = P256KeyPair::generate()?;
    let pair = KeyPairPem {
        private_key: key_pair.to_pem()?,
        public_key: key_pair.public_key().to_pem()?,
    };
    check_pair(&pair)?;
    Ok(pair)
}

/// Re-parse both PEM documents and prove that the public key verifies what the private key signs.
pub fn check_pair(pair: &KeyPairPem) -> Result<(), Error> {
    const PROBE: &[u8] = b"jwt-keygen EC pair check";

    let key_pair = P256KeyPair::from_pem(&pair.private_key)?;
    let public_key = P256PublicKey::from_pem(&pair.public_key)?;
    ensure!(
        public_key.verify(PROBE, &key_pair.sign(PROBE)),
        KeygenError::KeyPairMismatch(KeyFamily::Ec)
    );
    Ok(())
}
