mod hmac;

#[cfg(feature = "asymmetric")]
pub mod es256;
#[cfg(feature = "asymmetric")]
pub mod rsa;

pub use self::hmac::*;

#[cfg(feature = "asymmetric")]
pub use self::es256::generate_ec;
#[cfg(feature = "asymmetric")]
pub use self::rsa::generate_rsa;

#[cfg(not(feature = "asymmetric"))]
mod unavailable {
    use crate::common::KeyFamily;
    use crate::error::*;
    use crate::material::KeyPairPem;

    pub fn generate_rsa(_modulus_bits: usize) -> Result<KeyPairPem, Error> {
        bail!(KeygenError::CapabilityUnavailable(KeyFamily::Rsa))
    }

    pub fn generate_ec() -> Result<KeyPairPem, Error> {
        bail!(KeygenError::CapabilityUnavailable(KeyFamily::Ec))
    }
}

#[cfg(not(feature = "asymmetric"))]
pub use self::unavailable::*;
