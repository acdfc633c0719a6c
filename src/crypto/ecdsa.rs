//! ECDSA signature verification.

use {
    super::{EcPoint, EllipticCurve, FieldUint},
    crate::{ensure_err, Error, Result},
    der::{asn1::Uint as DerUint, Decode, Sequence},
};

#[derive(Clone, Debug)]
pub struct EcdsaPublicKey<'c> {
    curve: &'c EllipticCurve,
    point: EcPoint,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EcdsaSignature {
    pub r: FieldUint,
    pub s: FieldUint,
}

/// RFC 5480 ECDSA-Sig-Value
#[derive(Clone, Debug, Sequence)]
struct EcdsaSigValue {
    r: DerUint,
    s: DerUint,
}

impl EcdsaSignature {
    /// TR-03111 plain format: `r || s`, both padded to the same length.
    pub fn from_plain(bytes: &[u8]) -> Result<Self> {
        ensure_err!(
            !bytes.is_empty() && bytes.len() % 2 == 0,
            Error::Parse("plain ECDSA signature must split evenly".into())
        );
        let (r, s) = bytes.split_at(bytes.len() / 2);
        Ok(Self {
            r: FieldUint::try_from_be_slice(r)
                .ok_or(Error::Parse("ECDSA r out of range".into()))?,
            s: FieldUint::try_from_be_slice(s)
                .ok_or(Error::Parse("ECDSA s out of range".into()))?,
        })
    }

    /// X9.62 DER format: `SEQUENCE { r INTEGER, s INTEGER }`.
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let sig = EcdsaSigValue::from_der(bytes)?;
        Ok(Self {
            r: FieldUint::try_from_be_slice(strip_leading_zeros(sig.r.as_bytes()))
                .ok_or(Error::Parse("ECDSA r out of range".into()))?,
            s: FieldUint::try_from_be_slice(strip_leading_zeros(sig.s.as_bytes()))
                .ok_or(Error::Parse("ECDSA s out of range".into()))?,
        })
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let skip = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[skip..]
}

impl<'c> EcdsaPublicKey<'c> {
    pub fn new(curve: &'c EllipticCurve, point: EcPoint) -> Self {
        Self { curve, point }
    }

    /// Verify over a precomputed message digest.
    pub fn verify(&self, digest: &[u8], signature: &EcdsaSignature) -> Result<()> {
        let n = self.curve.order();
        let EcdsaSignature { r, s } = *signature;
        let valid_scalar = |v: FieldUint| v > FieldUint::ZERO && v < n;
        ensure_err!(
            valid_scalar(r) && valid_scalar(s),
            Error::Parse("ECDSA signature scalars out of range".into())
        );

        // e = leftmost order-bits of the digest
        let mut e = FieldUint::try_from_be_slice(digest)
            .ok_or(Error::Parse("digest too wide".into()))?;
        let digest_bits = digest.len() * 8;
        if digest_bits > n.bit_len() {
            e >>= digest_bits - n.bit_len();
        }
        let e = e % n;

        let w = s
            .inv_mod(n)
            .ok_or(Error::Parse("ECDSA s not invertible".into()))?;
        let u1 = e.mul_mod(w, n);
        let u2 = r.mul_mod(w, n);

        let point = self.curve.add(
            self.curve.mul(self.curve.generator(), u1)?,
            self.curve.mul(self.point, u2)?,
        )?;
        let (x, _) = point
            .0
            .ok_or(Error::Parse("ECDSA verification hit infinity".into()))?;
        ensure_err!(x % n == r, Error::Parse("ECDSA signature mismatch".into()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{super::named, *},
        rand::thread_rng,
    };

    /// Sign-then-verify round trip; signing only exists here in the test.
    #[test]
    fn test_verify_roundtrip() {
        let curve = named::nist_p256();
        let rng = &mut thread_rng();
        let (sk, pk) = curve.generate_keypair(rng).unwrap();
        let n = curve.order();

        let digest = [0xAB; 32];
        let e = FieldUint::try_from_be_slice(&digest).unwrap() % n;

        let k = curve.random_scalar(rng);
        let (kx, _) = curve.mul(curve.generator(), k).unwrap().0.unwrap();
        let r = kx % n;
        let s = k
            .inv_mod(n)
            .unwrap()
            .mul_mod(e.add_mod(r.mul_mod(sk, n), n), n);
        let signature = EcdsaSignature { r, s };

        let key = EcdsaPublicKey::new(&curve, pk);
        key.verify(&digest, &signature).unwrap();

        let bad = EcdsaSignature {
            r,
            s: s.add_mod(FieldUint::from(1u64), n),
        };
        assert!(key.verify(&digest, &bad).is_err());
    }

    #[test]
    fn test_plain_split() {
        let sig = EcdsaSignature::from_plain(&[0x01; 64]).unwrap();
        assert_eq!(sig.r, sig.s);
        assert!(EcdsaSignature::from_plain(&[0x01; 63]).is_err());
    }
}
