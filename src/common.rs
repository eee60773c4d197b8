use coarsetime::Duration;
use std::fmt;

/// Additional checks to perform when verifying a token
#[derive(Clone, Debug, Default)]
pub struct VerificationOptions {
    /// Require a specific issuer to be present
    pub required_issuer: Option<String>,

    /// Require a specific subject to be present
    pub required_subject: Option<String>,

    /// Require a specific audience to be present
    pub required_audience: Option<String>,

    /// Time tolerance for validating expiration dates
    pub time_tolerance: Option<Duration>,
}

/// A family of JWT signing algorithms the generator can produce keys for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum KeyFamily {
    /// Shared secrets for HS256, HS384 and HS512
    Hmac,
    /// RSA key pairs (RS256 and friends)
    Rsa,
    /// ECDSA key pairs on NIST P-256 (ES256)
    Ec,
}

impl KeyFamily {
    pub const ALL: [KeyFamily; 3] = [KeyFamily::Hmac, KeyFamily::Rsa, KeyFamily::Ec];

    /// Whether generating this family needs asymmetric cryptography support
    pub fn is_asymmetric(&self) -> bool {
        !matches!(self, KeyFamily::Hmac)
    }
}

impl fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyFamily::Hmac => "HMAC",
            KeyFamily::Rsa => "RSA",
            KeyFamily::Ec => "EC",
        })
    }
}

/// Which families a run should produce.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum FamilySelection {
    /// Every family whose capability is available; the others are skipped.
    #[default]
    All,
    /// Exactly one family; an unavailable capability is fatal.
    Only(KeyFamily),
}

impl FamilySelection {
    pub fn families(&self) -> Vec<KeyFamily> {
        match self {
            FamilySelection::All => KeyFamily::ALL.to_vec(),
            FamilySelection::Only(family) => vec![*family],
        }
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, FamilySelection::Only(_))
    }
}

/// Cryptographic capabilities available to the engine.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Capabilities {
    pub asymmetric: bool,
}

impl Capabilities {
    /// Capabilities compiled into this build
    pub fn detect() -> Self {
        Capabilities {
            asymmetric: cfg!(feature = "asymmetric"),
        }
    }

    /// Only what both `self` and `other` provide
    pub fn intersection(&self, other: Capabilities) -> Self {
        Capabilities {
            asymmetric: self.asymmetric && other.asymmetric,
        }
    }

    pub fn supports(&self, family: KeyFamily) -> bool {
        !family.is_asymmetric() || self.asymmetric
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::detect()
    }
}

#[test]
fn selection_families() {
    assert_eq!(FamilySelection::All.families().len(), 3);
    assert_eq!(
        FamilySelection::Only(KeyFamily::Ec).families(),
        vec![KeyFamily::Ec]
    );
    assert!(!FamilySelection::All.is_explicit());
}

#[test]
fn intersection_never_adds_support() {
    let none = Capabilities { asymmetric: false };
    let all = Capabilities { asymmetric: true };
    assert_eq!(all.intersection(none), none);
    assert_eq!(none.intersection(all), none);
    assert_eq!(all.intersection(all), all);
}

#[test]
fn hmac_needs_no_asymmetric_support() {
    let caps = Capabilities { asymmetric: false };
    assert!(caps.supports(KeyFamily::Hmac));
    assert!(!caps.supports(KeyFamily::Rsa));
    assert!(!caps.supports(KeyFamily::Ec));
}
