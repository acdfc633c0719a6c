//! Diffie-Hellman key exchange on mod-p groups.
//!
//! PACE's standardized DH parameters are the RFC 5114 MODP groups with
//! prime-order subgroups; see ICAO 9303-11 section 9.5.1.

use {
    super::CryptoCoreRng,
    crate::{ensure_err, Error, Result},
    ruint::Uint,
};

pub type DhUint = Uint<2048, 32>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModPGroup {
    modulus:   DhUint,
    generator: DhUint,
    order:     DhUint,
}

impl ModPGroup {
    pub fn new(modulus: DhUint, generator: DhUint, order: DhUint) -> Result<Self> {
        ensure_err!(
            generator < modulus,
            Error::Parse("DH generator not in group".into())
        );
        Ok(Self {
            modulus,
            generator,
            order,
        })
    }

    pub const fn modulus(&self) -> DhUint {
        self.modulus
    }

    pub const fn generator(&self) -> DhUint {
        self.generator
    }

    pub const fn order(&self) -> DhUint {
        self.order
    }

    /// Same group with a different generator, as produced by the PACE
    /// mapping phase.
    pub fn with_generator(&self, generator: DhUint) -> Result<Self> {
        ensure_err!(
            generator > DhUint::from(1u64) && generator < self.modulus,
            Error::Pace("mapped DH generator out of range".into())
        );
        Ok(Self {
            generator,
            ..self.clone()
        })
    }

    /// Group element byte length.
    pub fn element_bytes_len(&self) -> usize {
        (self.modulus.bit_len() + 7) / 8
    }

    pub fn random_scalar(&self, rng: &mut dyn CryptoCoreRng) -> DhUint {
        let mut bytes = [0u8; 256];
        rng.fill_bytes(&mut bytes);
        let wide = DhUint::from_be_bytes(bytes);
        wide % (self.order - DhUint::from(1u64)) + DhUint::from(1u64)
    }

    pub fn generate_keypair(&self, rng: &mut dyn CryptoCoreRng) -> (DhUint, DhUint) {
        let private = self.random_scalar(rng);
        let public = self.generator.pow_mod(private, self.modulus);
        (private, public)
    }

    /// DH shared secret, left-padded to the modulus length.
    pub fn shared_secret(&self, private: DhUint, public: DhUint) -> Result<Vec<u8>> {
        ensure_err!(
            public > DhUint::from(1u64) && public < self.modulus,
            Error::Parse("DH public value out of range".into())
        );
        let shared = public.pow_mod(private, self.modulus);
        Ok(self.element_bytes(shared))
    }

    /// PACE generic mapping: `g' = g^s · h mod p` where `h` is the shared
    /// secret from the ephemeral mapping exchange.
    pub fn map_generator(&self, nonce: DhUint, h: DhUint) -> Result<DhUint> {
        let mapped = self
            .generator
            .pow_mod(nonce, self.modulus)
            .mul_mod(h, self.modulus);
        ensure_err!(
            mapped > DhUint::from(1u64),
            Error::Pace("degenerate mapped generator".into())
        );
        Ok(mapped)
    }

    /// Big-endian group element, left-padded to the modulus length.
    pub fn element_bytes(&self, value: DhUint) -> Vec<u8> {
        let len = self.element_bytes_len();
        let bytes = value.to_be_bytes_vec();
        bytes[bytes.len() - len..].to_vec()
    }

    pub fn element_from_bytes(&self, bytes: &[u8]) -> Result<DhUint> {
        DhUint::try_from_be_slice(bytes)
            .filter(|v| *v < self.modulus)
            .ok_or(Error::Parse("DH element out of range".into()))
    }
}
