use std::collections::BTreeMap;

use crate::algorithms::HmacAlgorithm;
use crate::common::KeyFamily;

/// A private key and the public key derived from it, both PEM-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPairPem {
    pub private_key: String,
    pub public_key: String,
}

/// A shared secret together with the algorithm it is meant for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HmacSecret {
    pub algorithm: HmacAlgorithm,
    pub secret: String,
}

impl HmacSecret {
    /// Key bytes as a consumer configures them: the secret text itself.
    pub fn key_bytes(&self) -> &[u8] {
        self.secret.as_bytes()
    }
}

/// Key material produced by one generator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    Hmac(HmacSecret),
    Rsa(KeyPairPem),
    Ec(KeyPairPem),
}

impl KeyMaterial {
    pub fn family(&self) -> KeyFamily {
        match self {
            KeyMaterial::Hmac(_) => KeyFamily::Hmac,
            KeyMaterial::Rsa(_) => KeyFamily::Rsa,
            KeyMaterial::Ec(_) => KeyFamily::Ec,
        }
    }
}

/// Everything a single run generated, before it is written out.
#[derive(Debug, Clone, Default)]
pub struct GeneratedKeys {
    pub materials: Vec<KeyMaterial>,
    /// Families left out because their capability is missing
    pub skipped: Vec<KeyFamily>,
}

/// The document stored in `{prefix}_hmac_{ts}.json`
pub type HmacSecretMap = BTreeMap<HmacAlgorithm, String>;

impl GeneratedKeys {
    pub fn hmac_secrets(&self) -> impl Iterator<Item = &HmacSecret> {
        self.materials.iter().filter_map(|m| match m {
            KeyMaterial::Hmac(secret) => Some(secret),
            _ => None,
        })
    }

    pub fn hmac_secret(&self, algorithm: HmacAlgorithm) -> Option<&HmacSecret> {
        self.hmac_secrets().find(|s| s.algorithm == algorithm)
    }

    pub fn hmac_secret_map(&self) -> HmacSecretMap {
        self.hmac_secrets()
            .map(|s| (s.algorithm, s.secret.clone()))
            .collect()
    }

    pub fn rsa(&self) -> Option<&KeyPairPem> {
        self.materials.iter().find_map(|m| match m {
            KeyMaterial::Rsa(pair) => Some(pair),
            _ => None,
        })
    }

    pub fn ec(&self) -> Option<&KeyPairPem> {
        self.materials.iter().find_map(|m| match m {
            KeyMaterial::Ec(pair) => Some(pair),
            _ => None,
        })
    }

    pub fn families(&self) -> Vec<KeyFamily> {
        let mut families: Vec<_> = self.materials.iter().map(KeyMaterial::family).collect();
        families.dedup();
        families
    }
}
