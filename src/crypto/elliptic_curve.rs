//! Short-Weierstrass elliptic curves over prime fields.
//!
//! Affine arithmetic over a single 576-bit limb width, wide enough for every
//! standardized eMRTD curve up to Brainpool P512r1 and NIST P-521. Curves are
//! runtime values because eMRTDs frequently carry explicit (non-named)
//! parameters in DG14.

use {
    super::CryptoCoreRng,
    crate::{ensure_err, Error, Result},
    ruint::Uint,
};

/// Field and scalar element width; covers all ICAO 9303-11 9.5.1 curves.
pub type FieldUint = Uint<576, 9>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EllipticCurve {
    modulus:   FieldUint,
    a:         FieldUint,
    b:         FieldUint,
    generator: (FieldUint, FieldUint),
    order:     FieldUint,
    cofactor:  u64,
}

/// Affine point; `None` coordinates are the point at infinity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EcPoint(pub Option<(FieldUint, FieldUint)>);

impl EllipticCurve {
    pub fn new(
        modulus: FieldUint,
        a: FieldUint,
        b: FieldUint,
        generator: (FieldUint, FieldUint),
        order: FieldUint,
        cofactor: u64,
    ) -> Result<Self> {
        ensure_err!(a < modulus, Error::Parse("curve a not in field".into()));
        ensure_err!(b < modulus, Error::Parse("curve b not in field".into()));
        let curve = Self {
            modulus,
            a,
            b,
            generator,
            order,
            cofactor,
        };
        ensure_err!(
            curve.is_on_curve(generator.0, generator.1),
            Error::Parse("curve generator not on curve".into())
        );
        Ok(curve)
    }

    pub const fn modulus(&self) -> FieldUint {
        self.modulus
    }

    pub const fn order(&self) -> FieldUint {
        self.order
    }

    pub const fn a(&self) -> FieldUint {
        self.a
    }

    pub const fn b(&self) -> FieldUint {
        self.b
    }

    pub const fn generator(&self) -> EcPoint {
        EcPoint(Some(self.generator))
    }

    /// Same curve with a different base point, as produced by the PACE
    /// mapping phase.
    pub fn with_generator(&self, generator: EcPoint) -> Result<Self> {
        let (x, y) = generator
            .0
            .ok_or(Error::Pace("mapped generator is at infinity".into()))?;
        ensure_err!(
            self.is_on_curve(x, y),
            Error::Pace("mapped generator not on curve".into())
        );
        Ok(Self {
            generator: (x, y),
            ..self.clone()
        })
    }

    /// Field element byte length (also the coordinate length on the wire).
    pub fn field_bytes(&self) -> usize {
        (self.modulus.bit_len() + 7) / 8
    }

    fn fadd(&self, lhs: FieldUint, rhs: FieldUint) -> FieldUint {
        lhs.add_mod(rhs, self.modulus)
    }

    fn fsub(&self, lhs: FieldUint, rhs: FieldUint) -> FieldUint {
        lhs.add_mod(self.modulus - rhs, self.modulus)
    }

    fn fmul(&self, lhs: FieldUint, rhs: FieldUint) -> FieldUint {
        lhs.mul_mod(rhs, self.modulus)
    }

    fn finv(&self, value: FieldUint) -> Result<FieldUint> {
        value
            .inv_mod(self.modulus)
            .ok_or_else(|| Error::Parse("field element not invertible".into()))
    }

    pub fn is_on_curve(&self, x: FieldUint, y: FieldUint) -> bool {
        if x >= self.modulus || y >= self.modulus {
            return false;
        }
        let lhs = self.fmul(y, y);
        let rhs = self.fadd(
            self.fadd(self.fmul(self.fmul(x, x), x), self.fmul(self.a, x)),
            self.b,
        );
        lhs == rhs
    }

    pub fn add(&self, p: EcPoint, q: EcPoint) -> Result<EcPoint> {
        let (x1, y1) = match p.0 {
            None => return Ok(q),
            Some(c) => c,
        };
        let (x2, y2) = match q.0 {
            None => return Ok(p),
            Some(c) => c,
        };
        if x1 == x2 {
            if y1 == y2 && y1 != FieldUint::ZERO {
                return self.double(p);
            }
            return Ok(EcPoint(None));
        }
        // https://hyperelliptic.org/EFD/g1p/auto-shortw.html
        let lambda = self.fmul(self.fsub(y2, y1), self.finv(self.fsub(x2, x1))?);
        let x3 = self.fsub(self.fsub(self.fmul(lambda, lambda), x1), x2);
        let y3 = self.fsub(self.fmul(lambda, self.fsub(x1, x3)), y1);
        Ok(EcPoint(Some((x3, y3))))
    }

    pub fn double(&self, p: EcPoint) -> Result<EcPoint> {
        let (x, y) = match p.0 {
            None => return Ok(p),
            Some(c) => c,
        };
        if y == FieldUint::ZERO {
            return Ok(EcPoint(None));
        }
        let three = FieldUint::from(3u64);
        let two = FieldUint::from(2u64);
        let lambda = self.fmul(
            self.fadd(self.fmul(three, self.fmul(x, x)), self.a),
            self.finv(self.fmul(two, y))?,
        );
        let x3 = self.fsub(self.fmul(lambda, lambda), self.fmul(two, x));
        let y3 = self.fsub(self.fmul(lambda, self.fsub(x, x3)), y);
        Ok(EcPoint(Some((x3, y3))))
    }

    /// Scalar multiplication, double-and-add from the most significant bit.
    pub fn mul(&self, p: EcPoint, scalar: FieldUint) -> Result<EcPoint> {
        let mut result = EcPoint(None);
        for i in (0..scalar.bit_len()).rev() {
            result = self.double(result)?;
            if scalar.bit(i) {
                result = self.add(result, p)?;
            }
        }
        Ok(result)
    }

    /// Random scalar in `[1, order - 1]`.
    pub fn random_scalar(&self, rng: &mut dyn CryptoCoreRng) -> FieldUint {
        let mut bytes = [0u8; 72];
        rng.fill_bytes(&mut bytes);
        let wide = FieldUint::from_be_bytes(bytes);
        wide % (self.order - FieldUint::from(1u64)) + FieldUint::from(1u64)
    }

    /// Generate an ephemeral key pair on the current generator.
    pub fn generate_keypair(
        &self,
        rng: &mut dyn CryptoCoreRng,
    ) -> Result<(FieldUint, EcPoint)> {
        let private = self.random_scalar(rng);
        let public = self.mul(self.generator(), private)?;
        Ok((private, public))
    }

    /// ECKA shared secret: x-coordinate of `[private] public`, left-padded to
    /// the field length. See TR-03111 section 4.3.
    pub fn shared_secret(&self, private: FieldUint, public: EcPoint) -> Result<Vec<u8>> {
        let point = self.mul(public, private)?;
        let (x, _) = point
            .0
            .ok_or(Error::Parse("key agreement yielded infinity".into()))?;
        Ok(self.element_bytes(x))
    }

    /// Big-endian field element, left-padded to the coordinate length.
    pub fn element_bytes(&self, value: FieldUint) -> Vec<u8> {
        let len = self.field_bytes();
        let bytes = value.to_be_bytes_vec();
        bytes[bytes.len() - len..].to_vec()
    }

    /// Uncompressed point encoding `04 || X || Y` per TR-03111.
    pub fn point_to_bytes(&self, point: EcPoint) -> Result<Vec<u8>> {
        let (x, y) = point
            .0
            .ok_or(Error::Parse("cannot encode point at infinity".into()))?;
        let mut out = Vec::with_capacity(1 + 2 * self.field_bytes());
        out.push(0x04);
        out.extend_from_slice(&self.element_bytes(x));
        out.extend_from_slice(&self.element_bytes(y));
        Ok(out)
    }

    pub fn point_from_bytes(&self, bytes: &[u8]) -> Result<EcPoint> {
        let len = self.field_bytes();
        ensure_err!(
            bytes.len() == 1 + 2 * len && bytes[0] == 0x04,
            Error::Parse("expected uncompressed point encoding".into())
        );
        let x = FieldUint::try_from_be_slice(&bytes[1..1 + len])
            .ok_or(Error::Parse("point x out of range".into()))?;
        let y = FieldUint::try_from_be_slice(&bytes[1 + len..])
            .ok_or(Error::Parse("point y out of range".into()))?;
        ensure_err!(
            self.is_on_curve(x, y),
            Error::Parse("point not on curve".into())
        );
        Ok(EcPoint(Some((x, y))))
    }

    /// Map a field element to a curve point (simplified SWU for p ≡ 3 mod 4),
    /// used by the PACE integrated mapping.
    pub fn map_to_point(&self, t: FieldUint) -> Result<EcPoint> {
        let p = self.modulus;
        let t = t % p;
        // alpha = -t^2
        let alpha = self.fsub(FieldUint::ZERO, self.fmul(t, t));
        let denom = self.fadd(self.fmul(alpha, alpha), alpha);
        ensure_err!(
            denom != FieldUint::ZERO,
            Error::Pace("degenerate mapping input".into())
        );
        // x2 = -b/a * (1 + 1/(alpha^2 + alpha))
        let neg_b_over_a = self.fmul(self.fsub(FieldUint::ZERO, self.b), self.finv(self.a)?);
        let x2 = self.fmul(
            neg_b_over_a,
            self.fadd(FieldUint::from(1u64), self.finv(denom)?),
        );
        let x3 = self.fmul(alpha, x2);
        let sqrt_exp = (p + FieldUint::from(1u64)) >> 2;
        for x in [x2, x3] {
            let rhs = self.fadd(
                self.fadd(self.fmul(self.fmul(x, x), x), self.fmul(self.a, x)),
                self.b,
            );
            let y = rhs.pow_mod(sqrt_exp, p);
            if self.fmul(y, y) == rhs {
                return Ok(EcPoint(Some((x, y))));
            }
        }
        Err(Error::Pace("integrated mapping found no curve point".into()))
    }
}

#[cfg(test)]
mod tests {
    use {super::super::named, super::*, rand::thread_rng};

    #[test]
    fn test_generator_order() {
        for curve in [
            named::nist_p256(),
            named::brainpool_p256r1(),
            named::brainpool_p384r1(),
        ] {
            let infinity = curve.mul(curve.generator(), curve.order()).unwrap();
            assert_eq!(infinity, EcPoint(None));
        }
    }

    #[test]
    fn test_dh() {
        let curve = named::brainpool_p256r1();
        let rng = &mut thread_rng();
        let (sk_a, pk_a) = curve.generate_keypair(rng).unwrap();
        let (sk_b, pk_b) = curve.generate_keypair(rng).unwrap();
        let shared_a = curve.shared_secret(sk_a, pk_b).unwrap();
        let shared_b = curve.shared_secret(sk_b, pk_a).unwrap();
        assert_eq!(shared_a, shared_b);
        assert_eq!(shared_a.len(), curve.field_bytes());
    }

    #[test]
    fn test_point_roundtrip() {
        let curve = named::nist_p256();
        let rng = &mut thread_rng();
        let (_, pk) = curve.generate_keypair(rng).unwrap();
        let bytes = curve.point_to_bytes(pk).unwrap();
        assert_eq!(bytes.len(), 65);
        assert_eq!(curve.point_from_bytes(&bytes).unwrap(), pk);
    }

    #[test]
    fn test_map_to_point() {
        let curve = named::brainpool_p256r1();
        let point = curve.map_to_point(FieldUint::from(0x1234_5678u64)).unwrap();
        let (x, y) = point.0.unwrap();
        assert!(curve.is_on_curve(x, y));
    }
}
