//! RFC 5652 ContentInfo with a typed SignedData payload.

use der::{
    asn1::{ContextSpecific, ContextSpecificRef, ObjectIdentifier as Oid},
    Decode, DecodeValue, Encode, EncodeValue, Header, Length, Reader, Sequence, Tag, TagMode,
    TagNumber, Tagged, Writer,
};

pub const ID_SIGNED_DATA: Oid = Oid::new_unwrap("1.2.840.113549.1.7.2");

/// OIDs of the encapsulated content types this crate understands.
pub trait ContentType {
    const CONTENT_TYPE: Oid;
}

/// `ContentInfo ::= SEQUENCE { contentType OID, content [0] EXPLICIT ANY }`
///
/// The content type is pinned to id-signedData; both EF.SOD and the CSCA
/// master list wrap a single SignedData this way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentInfo<T>(pub T);

impl<'a, T: Decode<'a>> DecodeValue<'a> for ContentInfo<T> {
    fn decode_value<R: Reader<'a>>(reader: &mut R, _header: Header) -> der::Result<Self> {
        let content_type = Oid::decode(reader)?;
        if content_type != ID_SIGNED_DATA {
            return Err(der::Error::new(
                der::ErrorKind::OidUnknown { oid: content_type },
                reader.position(),
            ));
        }
        let content = ContextSpecific::<T>::decode_explicit(reader, TagNumber::N0)?
            .ok_or_else(|| {
                der::Error::new(
                    der::ErrorKind::TagUnexpected {
                        expected: None,
                        actual:   Tag::Null,
                    },
                    reader.position(),
                )
            })?
            .value;
        Ok(Self(content))
    }
}

impl<T: EncodeValue + Tagged> EncodeValue for ContentInfo<T> {
    fn value_len(&self) -> der::Result<Length> {
        ID_SIGNED_DATA.encoded_len()? + self.content_ref().encoded_len()?
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        ID_SIGNED_DATA.encode(writer)?;
        self.content_ref().encode(writer)
    }
}

impl<T: EncodeValue + Tagged> ContentInfo<T> {
    fn content_ref(&self) -> ContextSpecificRef<'_, T> {
        ContextSpecificRef {
            tag_number: TagNumber::N0,
            tag_mode:   TagMode::Explicit,
            value:      &self.0,
        }
    }
}

impl<'a, T: Decode<'a> + Sequence<'a>> Sequence<'a> for ContentInfo<T> {}
