//! RSA signature verification.
//!
//! Verifying only: RSASSA-PKCS1-v1_5 for certificate and SOD signatures, and
//! the ISO/IEC 9796-2 digital signature scheme 1 used by Active
//! Authentication (ICAO 9303-11 section 6.1). No signing.

use {
    super::HashAlgo,
    crate::{ensure_err, Error, Result},
    ruint::Uint,
    subtle::ConstantTimeEq,
};

pub type RsaUint = Uint<4096, 64>;

#[derive(Clone, Debug)]
pub struct RsaPublicKey {
    modulus:  RsaUint,
    exponent: RsaUint,
}

/// DER DigestInfo prefixes for EMSA-PKCS1-v1_5, per RFC 8017 section 9.2.
fn digest_info_prefix(algo: HashAlgo) -> &'static [u8] {
    match algo {
        HashAlgo::Sha1 => &[
            0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x0e, 0x03, 0x02, 0x1a, 0x05, 0x00, 0x04,
            0x14,
        ],
        HashAlgo::Sha224 => &[
            0x30, 0x2d, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02,
            0x04, 0x05, 0x00, 0x04, 0x1c,
        ],
        HashAlgo::Sha256 => &[
            0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02,
            0x01, 0x05, 0x00, 0x04, 0x20,
        ],
        HashAlgo::Sha384 => &[
            0x30, 0x41, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02,
            0x02, 0x05, 0x00, 0x04, 0x30,
        ],
        HashAlgo::Sha512 => &[
            0x30, 0x51, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02,
            0x03, 0x05, 0x00, 0x04, 0x40,
        ],
    }
}

/// ISO/IEC 10118 hash identifiers used by the 9796-2 trailer field.
fn hash_from_trailer_id(id: u8) -> Option<HashAlgo> {
    match id {
        0x33 => Some(HashAlgo::Sha1),
        0x34 => Some(HashAlgo::Sha256),
        0x35 => Some(HashAlgo::Sha512),
        0x36 => Some(HashAlgo::Sha384),
        0x38 => Some(HashAlgo::Sha224),
        _ => None,
    }
}

impl RsaPublicKey {
    pub fn new(modulus: &[u8], exponent: &[u8]) -> Result<Self> {
        let strip = |b: &'_ [u8]| -> Vec<u8> {
            let skip = b.iter().position(|&v| v != 0).unwrap_or(b.len());
            b[skip..].to_vec()
        };
        let modulus = RsaUint::try_from_be_slice(&strip(modulus))
            .ok_or(Error::Parse("RSA modulus larger than 4096 bits".into()))?;
        let exponent = RsaUint::try_from_be_slice(&strip(exponent))
            .ok_or(Error::Parse("RSA exponent larger than 4096 bits".into()))?;
        ensure_err!(
            modulus.bit_len() >= 512,
            Error::Parse("RSA modulus implausibly small".into())
        );
        Ok(Self { modulus, exponent })
    }

    fn modulus_bytes(&self) -> usize {
        (self.modulus.bit_len() + 7) / 8
    }

    /// `signature^e mod n`, left-padded to the modulus length.
    fn public_op(&self, signature: &[u8]) -> Result<Vec<u8>> {
        let sig = RsaUint::try_from_be_slice(signature)
            .filter(|s| *s < self.modulus)
            .ok_or(Error::Parse("RSA signature out of range".into()))?;
        let em = sig.pow_mod(self.exponent, self.modulus);
        let bytes = em.to_be_bytes_vec();
        Ok(bytes[bytes.len() - self.modulus_bytes()..].to_vec())
    }

    /// RSASSA-PKCS1-v1_5 verification per RFC 8017 section 8.2.2.
    pub fn verify_pkcs1_v15(
        &self,
        algo: HashAlgo,
        message: &[u8],
        signature: &[u8],
    ) -> Result<()> {
        let em = self.public_op(signature)?;
        let hash = algo.digest(message);
        let prefix = digest_info_prefix(algo);
        let pad_len = em
            .len()
            .checked_sub(3 + prefix.len() + hash.len())
            .ok_or(Error::Parse("RSA modulus too small for digest".into()))?;

        let mut expected = Vec::with_capacity(em.len());
        expected.push(0x00);
        expected.push(0x01);
        expected.resize(2 + pad_len, 0xFF);
        expected.push(0x00);
        expected.extend_from_slice(prefix);
        expected.extend_from_slice(&hash);

        ensure_err!(
            bool::from(em.as_slice().ct_eq(&expected)),
            Error::Parse("RSA signature mismatch".into())
        );
        Ok(())
    }

    /// ISO/IEC 9796-2 scheme 1 verification with message recovery.
    ///
    /// `suffix` is the non-recoverable part M2 (the terminal's challenge for
    /// Active Authentication). Returns the recovered part M1.
    pub fn verify_iso9796_2_ds1(&self, signature: &[u8], suffix: &[u8]) -> Result<Vec<u8>> {
        let mut em = self.public_op(signature)?;
        // The signer may have used min(f, n - f); normalize on the trailer.
        if em.last() != Some(&0xBC) && em.last().map(|b| b & 0x0F) != Some(0x0C) {
            let f = RsaUint::from_be_slice(&em);
            let alt = self.modulus - f;
            let bytes = alt.to_be_bytes_vec();
            em = bytes[bytes.len() - self.modulus_bytes()..].to_vec();
        }

        let (algo, trailer_len) = match em.last() {
            Some(0xBC) => (HashAlgo::Sha1, 1),
            Some(0xCC) => {
                let id = em[em.len() - 2];
                let algo = hash_from_trailer_id(id)
                    .ok_or(Error::Parse(format!("unknown 9796-2 hash id {id:#04x}")))?;
                (algo, 2)
            }
            _ => return Err(Error::Parse("bad ISO 9796-2 trailer".into())),
        };

        // Header: 0b01xx...; bit 0x20 selects partial recovery.
        let header = em[0];
        ensure_err!(
            header & 0xC0 == 0x40,
            Error::Parse("bad ISO 9796-2 header".into())
        );
        let digest_len = algo.len();
        ensure_err!(
            em.len() > 1 + digest_len + trailer_len,
            Error::Parse("ISO 9796-2 message too short".into())
        );
        let m1 = &em[1..em.len() - digest_len - trailer_len];
        let digest = &em[em.len() - digest_len - trailer_len..em.len() - trailer_len];

        // Recoverable part is 0x80-delimited from padding when present.
        let m1 = match m1.iter().position(|&b| b == 0x80) {
            Some(i) if header & 0x20 == 0x20 && m1[..i].iter().all(|&b| b == 0x00) => &m1[i + 1..],
            _ => m1,
        };

        let mut message = m1.to_vec();
        message.extend_from_slice(suffix);
        let expected = algo.digest(&message);
        ensure_err!(
            bool::from(digest.ct_eq(&expected)),
            Error::Parse("ISO 9796-2 digest mismatch".into())
        );
        Ok(m1.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex};

    #[test]
    fn test_digest_info_prefix_lengths() {
        for (algo, expect) in [
            (HashAlgo::Sha1, 15 + 20),
            (HashAlgo::Sha256, 19 + 32),
            (HashAlgo::Sha512, 19 + 64),
        ] {
            assert_eq!(digest_info_prefix(algo).len() + algo.len(), expect);
        }
    }

    #[test]
    fn test_reject_oversized_signature() {
        let key = RsaPublicKey::new(&[0xFF; 128], &hex!("010001")).unwrap();
        assert!(key.public_op(&[0xFF; 129]).is_err());
    }
}
