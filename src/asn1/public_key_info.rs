//! SubjectPublicKeyInfo with the key types eMRTDs actually carry.
//!
//! **Note**: explicit `EcParameters` are allowed in addition to named curves,
//! deviating from RFC 5480; several European documents encode their Brainpool
//! domain parameters explicitly in DG14.

use {
    super::{AnyAlgorithmIdentifier, ApplicationTagged},
    crate::{
        crypto::{DhUint, EcPoint, EllipticCurve, FieldUint, ModPGroup, RsaPublicKey},
        Error,
    },
    der::{
        asn1::{BitString, Null, ObjectIdentifier as Oid, OctetString, Uint},
        Any, Decode, DecodeValue, Encode, EncodeValue, Header, Length, Reader, Sequence, ValueOrd,
        Writer,
    },
    std::cmp::Ordering,
};

pub const ID_RSA: Oid = Oid::new_unwrap("1.2.840.113549.1.1.1");
pub const ID_EC_PUBLIC_KEY: Oid = Oid::new_unwrap("1.2.840.10045.2.1");
pub const ID_DH_PUBLIC_NUMBER: Oid = Oid::new_unwrap("1.2.840.10046.2.1");

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubjectPublicKeyInfo {
    pub algorithm:          PubkeyAlgorithmIdentifier,
    pub subject_public_key: BitString,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PubkeyAlgorithmIdentifier {
    Rsa,
    Ec(ECAlgoParameters),
    Dh(DhAlgoParameters),
    Unknown(AnyAlgorithmIdentifier),
}

/// X9.42 domain parameters; the subgroup order is kept optional to tolerate
/// PKCS#3-style encodings.
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct DhAlgoParameters {
    pub prime: Uint,
    pub base:  Uint,
    pub order: Option<Uint>,
}

/// [TR-03111] `Parameters`
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ECAlgoParameters {
    EcParameters(EcParameters),
    NamedCurve(Oid),
    ImplicitlyCA(Null),
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct EcParameters {
    pub version:  u64,
    pub field_id: FieldId,
    pub curve:    Curve,
    pub base:     ECPoint,
    pub order:    Uint,
    pub cofactor: Option<Uint>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct FieldId {
    pub field_type: Oid,
    pub parameters: Any,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct Curve {
    pub a:    FieldElement,
    pub b:    FieldElement,
    pub seed: Option<BitString>,
}

pub type FieldElement = OctetString;

pub type ECPoint = OctetString;

pub const ID_PRIME_FIELD: Oid = Oid::new_unwrap("1.2.840.10045.1.1");

/// EF.DG15 wraps the Active Authentication public key in `[APPLICATION 15]`
/// (tag 0x6F). See ICAO 9303-10 4.7.15.
pub type EfDg15 = ApplicationTagged<15, SubjectPublicKeyInfo>;

/// `RSAPublicKey ::= SEQUENCE { modulus INTEGER, publicExponent INTEGER }`
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct RsaPublicKeyDer {
    pub modulus:         Uint,
    pub public_exponent: Uint,
}

impl<'a> DecodeValue<'a> for SubjectPublicKeyInfo {
    fn decode_value<R: Reader<'a>>(reader: &mut R, _header: Header) -> der::Result<Self> {
        let algorithm = PubkeyAlgorithmIdentifier::decode(reader)?;
        let subject_public_key = BitString::decode(reader)?;
        Ok(Self {
            algorithm,
            subject_public_key,
        })
    }
}

impl EncodeValue for SubjectPublicKeyInfo {
    fn value_len(&self) -> der::Result<Length> {
        self.algorithm.encoded_len()? + self.subject_public_key.encoded_len()?
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.algorithm.encode(writer)?;
        self.subject_public_key.encode(writer)
    }
}

impl Sequence<'_> for SubjectPublicKeyInfo {}

impl ValueOrd for SubjectPublicKeyInfo {
    fn value_cmp(&self, other: &Self) -> der::Result<Ordering> {
        let lhs = self.to_der()?;
        let rhs = other.to_der()?;
        Ok(lhs.as_slice().cmp(rhs.as_slice()))
    }
}

impl EncodeValue for PubkeyAlgorithmIdentifier {
    fn value_len(&self) -> der::Result<Length> {
        match self {
            Self::Rsa => ID_RSA.encoded_len()? + Null.encoded_len()?,
            Self::Ec(params) => ID_EC_PUBLIC_KEY.encoded_len()? + params.encoded_len()?,
            Self::Dh(params) => ID_DH_PUBLIC_NUMBER.encoded_len()? + params.encoded_len()?,
            Self::Unknown(any) => any.algorithm.encoded_len()? + any.parameters.encoded_len()?,
        }
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        match self {
            Self::Rsa => {
                ID_RSA.encode(writer)?;
                Null.encode(writer)
            }
            Self::Ec(params) => {
                ID_EC_PUBLIC_KEY.encode(writer)?;
                params.encode(writer)
            }
            Self::Dh(params) => {
                ID_DH_PUBLIC_NUMBER.encode(writer)?;
                params.encode(writer)
            }
            Self::Unknown(any) => {
                any.algorithm.encode(writer)?;
                any.parameters.encode(writer)
            }
        }
    }
}

impl<'a> DecodeValue<'a> for PubkeyAlgorithmIdentifier {
    fn decode_value<R: Reader<'a>>(reader: &mut R, _header: Header) -> der::Result<Self> {
        let oid = Oid::decode(reader)?;
        Ok(match oid {
            ID_RSA => {
                Option::<Null>::decode(reader)?;
                Self::Rsa
            }
            ID_EC_PUBLIC_KEY => Self::Ec(ECAlgoParameters::decode(reader)?),
            ID_DH_PUBLIC_NUMBER => Self::Dh(DhAlgoParameters::decode(reader)?),
            _ => Self::Unknown(AnyAlgorithmIdentifier {
                algorithm:  oid,
                parameters: Option::<Any>::decode(reader)?,
            }),
        })
    }
}

impl Sequence<'_> for PubkeyAlgorithmIdentifier {}

impl<'a> Decode<'a> for ECAlgoParameters {
    fn decode<R: Reader<'a>>(reader: &mut R) -> der::Result<Self> {
        let any = Any::decode(reader)?;
        if let Ok(params) = any.decode_as::<EcParameters>() {
            Ok(Self::EcParameters(params))
        } else if let Ok(oid) = any.decode_as::<Oid>() {
            Ok(Self::NamedCurve(oid))
        } else {
            any.decode_as::<Null>().map(Self::ImplicitlyCA)
        }
    }
}

impl Encode for ECAlgoParameters {
    fn encoded_len(&self) -> der::Result<Length> {
        match self {
            Self::EcParameters(p) => p.encoded_len(),
            Self::NamedCurve(oid) => oid.encoded_len(),
            Self::ImplicitlyCA(null) => null.encoded_len(),
        }
    }

    fn encode(&self, writer: &mut impl Writer) -> der::Result<()> {
        match self {
            Self::EcParameters(p) => p.encode(writer),
            Self::NamedCurve(oid) => oid.encode(writer),
            Self::ImplicitlyCA(null) => null.encode(writer),
        }
    }
}

fn uint_to_field(value: &Uint) -> Result<FieldUint, Error> {
    FieldUint::try_from_be_slice(value.as_bytes())
        .ok_or(Error::Parse("integer exceeds 576 bits".into()))
}

impl EcParameters {
    /// Build the runtime curve from explicit parameters.
    pub fn to_curve(&self) -> Result<EllipticCurve, Error> {
        if self.field_id.field_type != ID_PRIME_FIELD {
            return Err(Error::Parse("only prime field curves supported".into()));
        }
        let p = self
            .field_id
            .parameters
            .decode_as::<Uint>()
            .map_err(Error::from)?;
        let modulus = uint_to_field(&p)?;
        let a = FieldUint::try_from_be_slice(self.curve.a.as_bytes())
            .ok_or(Error::Parse("curve a exceeds 576 bits".into()))?;
        let b = FieldUint::try_from_be_slice(self.curve.b.as_bytes())
            .ok_or(Error::Parse("curve b exceeds 576 bits".into()))?;
        let order = uint_to_field(&self.order)?;
        let cofactor = self
            .cofactor
            .as_ref()
            .map(|c| {
                FieldUint::try_from_be_slice(c.as_bytes())
                    .map(|v| v.try_into().unwrap_or(u64::MAX))
                    .ok_or(Error::Parse("cofactor out of range".into()))
            })
            .transpose()?
            .unwrap_or(1);

        let generator = decode_point(modulus, self.base.as_bytes())?;
        EllipticCurve::new(modulus, a, b, generator, order, cofactor)
    }
}

fn decode_point(modulus: FieldUint, bytes: &[u8]) -> Result<(FieldUint, FieldUint), Error> {
    let len = (modulus.bit_len() + 7) / 8;
    if bytes.len() != 1 + 2 * len || bytes[0] != 0x04 {
        return Err(Error::Parse("expected uncompressed base point".into()));
    }
    let x = FieldUint::try_from_be_slice(&bytes[1..1 + len])
        .ok_or(Error::Parse("base point x out of range".into()))?;
    let y = FieldUint::try_from_be_slice(&bytes[1 + len..])
        .ok_or(Error::Parse("base point y out of range".into()))?;
    Ok((x, y))
}

impl SubjectPublicKeyInfo {
    pub fn raw_key_bytes(&self) -> Result<&[u8], Error> {
        self.subject_public_key
            .as_bytes()
            .ok_or(Error::Parse("public key bits not octet aligned".into()))
    }

    /// The RSA key, if this is an RSA SubjectPublicKeyInfo.
    pub fn rsa_key(&self) -> Result<RsaPublicKey, Error> {
        match self.algorithm {
            PubkeyAlgorithmIdentifier::Rsa => {
                let der = RsaPublicKeyDer::from_der(self.raw_key_bytes()?)?;
                RsaPublicKey::new(der.modulus.as_bytes(), der.public_exponent.as_bytes())
            }
            _ => Err(Error::Parse("not an RSA public key".into())),
        }
    }

    /// The EC curve and point, if this is an EC SubjectPublicKeyInfo with
    /// explicit parameters.
    pub fn ec_key(&self) -> Result<(EllipticCurve, EcPoint), Error> {
        match &self.algorithm {
            PubkeyAlgorithmIdentifier::Ec(ECAlgoParameters::EcParameters(params)) => {
                let curve = params.to_curve()?;
                let point = curve.point_from_bytes(self.raw_key_bytes()?)?;
                Ok((curve, point))
            }
            PubkeyAlgorithmIdentifier::Ec(_) => {
                Err(Error::Parse("named or implicit curve without parameters".into()))
            }
            _ => Err(Error::Parse("not an EC public key".into())),
        }
    }

    /// The DH group and public value, if this is a DH SubjectPublicKeyInfo.
    pub fn dh_key(&self) -> Result<(ModPGroup, DhUint), Error> {
        match &self.algorithm {
            PubkeyAlgorithmIdentifier::Dh(params) => {
                let to_dh = |u: &Uint| {
                    DhUint::try_from_be_slice(u.as_bytes())
                        .ok_or(Error::Parse("DH integer exceeds 2048 bits".into()))
                };
                let prime = to_dh(&params.prime)?;
                let base = to_dh(&params.base)?;
                let order = params
                    .order
                    .as_ref()
                    .map(to_dh)
                    .transpose()?
                    // PKCS#3 parameters omit q; fall back to (p-1)/2.
                    .unwrap_or_else(|| (prime - DhUint::from(1u64)) >> 1);
                let group = ModPGroup::new(prime, base, order)?;
                let public = Uint::from_der(self.raw_key_bytes()?)?;
                let y = to_dh(&public)?;
                Ok((group, y))
            }
            _ => Err(Error::Parse("not a DH public key".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::crypto::named, der::Encode};

    fn brainpool_params_der() -> Vec<u8> {
        let curve = named::brainpool_p256r1();
        let fe = |v: FieldUint| {
            OctetString::new(curve.element_bytes(v)).unwrap()
        };
        EcParameters {
            version:  1,
            field_id: FieldId {
                field_type: ID_PRIME_FIELD,
                parameters: Any::encode_from(&Uint::new(&curve.modulus().to_be_bytes_vec()[40..]).unwrap())
                    .unwrap(),
            },
            curve:    Curve {
                a:    fe(curve.a()),
                b:    fe(curve.b()),
                seed: None,
            },
            base:     OctetString::new(curve.point_to_bytes(curve.generator()).unwrap()).unwrap(),
            order:    Uint::new(&curve.order().to_be_bytes_vec()[40..]).unwrap(),
            cofactor: Some(Uint::new(&[1]).unwrap()),
        }
        .to_der()
        .unwrap()
    }

    #[test]
    fn test_explicit_ec_parameters_roundtrip() {
        let der = brainpool_params_der();
        let params = EcParameters::from_der(&der).unwrap();
        let curve = params.to_curve().unwrap();
        assert_eq!(curve, named::brainpool_p256r1());
    }
}
