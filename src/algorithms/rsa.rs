use boring::hash::MessageDigest;
use boring::pkey::{PKey, Private, Public};
use boring::rsa::Rsa;
use boring::sign::{Signer, Verifier};

use crate::common::KeyFamily;
use crate::config::RSA_KEY_SIZES;
use crate::error::*;
use crate::material::KeyPairPem;

/// Public exponent used for every generated key (F4).
pub const PUBLIC_EXPONENT: u32 = 65537;

fn crypto_error(e: boring::error::ErrorStack) -> KeygenError {
    KeygenError::KeyGeneration(e.to_string())
}

#[doc(hidden)]
#[derive(Debug, Clone)]
pub struct RSAPublicKey(Rsa<Public>);

impl RSAPublicKey {
    pub fn from_pem(pem: &str) -> Result<Self, Error> {
        let pem = pem.trim();
        let rsa_pk = Rsa::<Public>::public_key_from_pem(pem.as_bytes())
            .or_else(|_| Rsa::<Public>::public_key_from_pem_pkcs1(pem.as_bytes()))
            .map_err(crypto_error)?;
        Ok(RSAPublicKey(rsa_pk))
    }

    /// SubjectPublicKeyInfo PEM ("BEGIN PUBLIC KEY")
    pub fn to_pem(&self) -> Result<String, Error> {
        let bytes = self.0.public_key_to_pem().map_err(crypto_error)?;
        Ok(String::from_utf8(bytes)?)
    }

    pub fn modulus_bits(&self) -> usize {
        self.0.size() as usize * 8
    }

    pub fn exponent(&self) -> Vec<u8> {
        self.0.e().to_vec()
    }

    /// Verify an RS256 (PKCS#1 v1.5, SHA-256) signature.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool, Error> {
        let pkey = PKey::from_rsa(self.0.clone()).map_err(crypto_error)?;
        let mut verifier = Verifier::new(MessageDigest::sha256(), &pkey).map_err(crypto_error)?;
        verifier.update(message).map_err(crypto_error)?;
        Ok(verifier.verify(signature).unwrap_or(false))
    }
}

#[doc(hidden)]
#[derive(Debug, Clone)]
pub struct RSAKeyPair {
    rsa_sk: Rsa<Private>,
}

impl RSAKeyPair {
    pub fn from_pem(pem: &str) -> Result<Self, Error> {
        let pem = pem.trim();
        let pkey = PKey::private_key_from_pem(pem.as_bytes()).map_err(crypto_error)?;
        let rsa_sk = pkey.rsa().map_err(crypto_error)?;
        if !(rsa_sk.check_key().map_err(crypto_error)?) {
            bail!(KeygenError::KeyPairMismatch(KeyFamily::Rsa));
        }
        Ok(RSAKeyPair { rsa_sk })
    }

    /// Unencrypted PKCS#8 PEM ("BEGIN PRIVATE KEY")
    pub fn to_pem(&self) -> Result<String, Error> {
        let pkey = PKey::from_rsa(self.rsa_sk.clone()).map_err(crypto_error)?;
        let bytes = pkey.private_key_to_pem_pkcs8().map_err(crypto_error)?;
        Ok(String::from_utf8(bytes)?)
    }

    /// The public half, rebuilt from the private key's modulus and exponent.
    pub fn public_key(&self) -> Result<RSAPublicKey, Error> {
        let n = self.rsa_sk.n().to_owned().map_err(crypto_error)?;
        let e = self.rsa_sk.e().to_owned().map_err(crypto_error)?;
        let rsa_pk = Rsa::<Public>::from_public_components(n, e).map_err(crypto_error)?;
        Ok(RSAPublicKey(rsa_pk))
    }

    /// Sign with RS256 (PKCS#1 v1.5, SHA-256).
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Error> {
        let pkey = PKey::from_rsa(self.rsa_sk.clone()).map_err(crypto_error)?;
        let mut signer = Signer::new(MessageDigest::sha256(), &pkey).map_err(crypto_error)?;
        signer.update(message).map_err(crypto_error)?;
        Ok(signer.sign_to_vec().map_err(crypto_error)?)
    }

    pub fn generate(modulus_bits: usize) -> Result<Self, Error> {
        ensure!(
            RSA_KEY_SIZES.contains(&modulus_bits),
            KeygenError::UnsupportedRSAModulus(modulus_bits)
        );
        // BoringSSL always generates with e = 65537
        let rsa_sk = Rsa::<Private>::generate(modulus_bits as _).map_err(crypto_error)?;
        Ok(RSAKeyPair { rsa_sk })
    }
}

/// Generate an RSA key pair and serialize both halves as PEM.
pub fn generate_rsa(modulus_bits: usize) -> Result<KeyPairPem, Error> {
    let key_pair = RSAKeyPair::generate(modulus_bits)?;
    let pair = KeyPairPem {
        private_key: key_pair.to_pem()?,
        public_key: key_pair.public_key()?.to_pem()?,
    };
    check_pair(&pair)?;
    Ok(pair)
}

/// Re-parse both PEM documents and prove that the public key verifies what the private key signs.
pub fn check_pair(pair: &KeyPairPem) -> Result<(), Error> {
    const PROBE: &[u8] = b"jwt-keygen RSA pair check";

    let key_pair = RSAKeyPair::from_pem(&pair.private_key)?;
    let public_key = RSAPublicKey::from_pem(&pair.public_key)?;
    let signature = key_pair.sign(PROBE)?;
    ensure!(
        public_key.verify(PROBE, &signature)?,
        KeygenError::KeyPairMismatch(KeyFamily::Rsa)
    );
    Ok(())
}
