//! Cryptographic primitives for the ICAO 9303 handshakes.
//!
//! Key agreement and signature verification are implemented over [`ruint`]
//! big integers; the symmetric ciphers live with the secure-messaging layer.

mod ecdsa;
mod elliptic_curve;
mod modp_group;
pub mod named;
mod rsa;

pub use self::{
    ecdsa::{EcdsaPublicKey, EcdsaSignature},
    elliptic_curve::{EcPoint, EllipticCurve, FieldUint},
    modp_group::{DhUint, ModPGroup},
    rsa::{RsaPublicKey, RsaUint},
};
use {
    rand::{CryptoRng, RngCore},
    sha1::{Digest, Sha1},
    sha2::{Sha224, Sha256, Sha384, Sha512},
};

/// Digest algorithms the LDS and its PKI use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashAlgo {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgo {
    pub const fn len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha224 => 28,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => Sha1::digest(data).to_vec(),
            Self::Sha224 => Sha224::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

pub trait CryptoCoreRng: CryptoRng + RngCore {}

impl<T> CryptoCoreRng for T where T: CryptoRng + RngCore {}

/// Domain parameters a PACE or Chip Authentication run can operate in.
#[derive(Clone, Debug)]
pub enum DomainParameters {
    Ec(EllipticCurve),
    Dh(ModPGroup),
}

/// Key seed from the MRZ-derived key string (document number, date of birth
/// and date of expiry, each with check digit).
///
/// See ICAO 9303-11 section 9.7.2.
pub fn seed_from_mrz(mrz_key: &str) -> [u8; 16] {
    let mut hasher = Sha1::new();
    hasher.update(mrz_key.as_bytes());
    let hash = hasher.finalize();
    hash[0..16].try_into().unwrap()
}

/// Full 20-byte SHA-1 of the MRZ key, used as the PACE password π.
///
/// See ICAO 9303-11 section 9.7.3.
pub fn k_from_mrz(mrz_key: &str) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(mrz_key.as_bytes());
    hasher.finalize().into()
}

/// Force odd parity on every byte, as DES key schedules require. The low
/// bit is the parity bit.
pub fn set_parity_bits(key: &mut [u8]) {
    for byte in key {
        let data_bits = *byte & 0xFE;
        *byte = data_bits | ((data_bits.count_ones() as u8 + 1) & 1);
    }
}
