//! Digest AlgorithmIdentifier with the two real-world parameter encodings.
//!
//! "No parameters" is encoded either as an absent field or an explicit NULL;
//! both occur in fielded documents, and re-encoding must preserve the input
//! form, so the choice is kept.

use {
    super::AnyAlgorithmIdentifier,
    crate::crypto::HashAlgo,
    der::{
        asn1::{Null, ObjectIdentifier as Oid},
        Any, Decode, DecodeValue, Encode, EncodeValue, Header, Length, Reader, Sequence, ValueOrd,
        Writer,
    },
    std::cmp::Ordering,
};

pub const ID_SHA1: Oid = Oid::new_unwrap("1.3.14.3.2.26");
pub const ID_SHA224: Oid = Oid::new_unwrap("2.16.840.1.101.3.4.2.4");
pub const ID_SHA256: Oid = Oid::new_unwrap("2.16.840.1.101.3.4.2.1");
pub const ID_SHA384: Oid = Oid::new_unwrap("2.16.840.1.101.3.4.2.2");
pub const ID_SHA512: Oid = Oid::new_unwrap("2.16.840.1.101.3.4.2.3");

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Parameters {
    Absent,
    Null,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DigestAlgorithmIdentifier {
    Sha1(Parameters),
    Sha224(Parameters),
    Sha256(Parameters),
    Sha384(Parameters),
    Sha512(Parameters),
    Unknown(AnyAlgorithmIdentifier),
}

impl DigestAlgorithmIdentifier {
    pub const fn hash_algo(&self) -> Option<HashAlgo> {
        match self {
            Self::Sha1(_) => Some(HashAlgo::Sha1),
            Self::Sha224(_) => Some(HashAlgo::Sha224),
            Self::Sha256(_) => Some(HashAlgo::Sha256),
            Self::Sha384(_) => Some(HashAlgo::Sha384),
            Self::Sha512(_) => Some(HashAlgo::Sha512),
            Self::Unknown(_) => None,
        }
    }

    const fn oid(&self) -> Option<Oid> {
        match self {
            Self::Sha1(_) => Some(ID_SHA1),
            Self::Sha224(_) => Some(ID_SHA224),
            Self::Sha256(_) => Some(ID_SHA256),
            Self::Sha384(_) => Some(ID_SHA384),
            Self::Sha512(_) => Some(ID_SHA512),
            Self::Unknown(_) => None,
        }
    }

    const fn parameters(&self) -> Parameters {
        match self {
            Self::Sha1(p)
            | Self::Sha224(p)
            | Self::Sha256(p)
            | Self::Sha384(p)
            | Self::Sha512(p) => *p,
            Self::Unknown(_) => Parameters::Absent,
        }
    }
}

impl EncodeValue for DigestAlgorithmIdentifier {
    fn value_len(&self) -> der::Result<Length> {
        match (self.oid(), self.parameters()) {
            (Some(oid), Parameters::Absent) => oid.encoded_len(),
            (Some(oid), Parameters::Null) => oid.encoded_len()? + Null.encoded_len()?,
            (None, _) => match self {
                Self::Unknown(any) => any.algorithm.encoded_len()? + any.parameters.encoded_len()?,
                _ => unreachable!(),
            },
        }
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        match (self.oid(), self.parameters()) {
            (Some(oid), Parameters::Absent) => oid.encode(writer),
            (Some(oid), Parameters::Null) => {
                oid.encode(writer)?;
                Null.encode(writer)
            }
            (None, _) => match self {
                Self::Unknown(any) => {
                    any.algorithm.encode(writer)?;
                    any.parameters.encode(writer)
                }
                _ => unreachable!(),
            },
        }
    }
}

impl<'a> DecodeValue<'a> for DigestAlgorithmIdentifier {
    fn decode_value<R: Reader<'a>>(reader: &mut R, _header: Header) -> der::Result<Self> {
        let oid = Oid::decode(reader)?;
        let raw_params = Option::<Any>::decode(reader)?;
        let params = match &raw_params {
            Some(any) if any.decode_as::<Null>().is_ok() => Parameters::Null,
            Some(_) | None => Parameters::Absent,
        };
        Ok(match oid {
            ID_SHA1 => Self::Sha1(params),
            ID_SHA224 => Self::Sha224(params),
            ID_SHA256 => Self::Sha256(params),
            ID_SHA384 => Self::Sha384(params),
            ID_SHA512 => Self::Sha512(params),
            _ => Self::Unknown(AnyAlgorithmIdentifier {
                algorithm:  oid,
                parameters: raw_params,
            }),
        })
    }
}

impl Sequence<'_> for DigestAlgorithmIdentifier {}

impl ValueOrd for DigestAlgorithmIdentifier {
    fn value_cmp(&self, other: &Self) -> der::Result<Ordering> {
        let lhs = self.to_der()?;
        let rhs = other.to_der()?;
        Ok(lhs.as_slice().cmp(rhs.as_slice()))
    }
}
