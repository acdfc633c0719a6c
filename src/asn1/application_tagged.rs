//! Generic wrapper for constructed APPLICATION-class TLVs.
//!
//! The LDS wraps most elementary files this way: EF.SOD is `[APPLICATION 23]`
//! (tag byte 0x77), EF.DG14 is `[APPLICATION 14]` (0x6E), and so on.

use der::{
    DecodeValue, EncodeValue, FixedTag, Header, Length, Reader, Tag, TagNumber, Writer,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplicationTagged<const TAG: u8, T>(pub T);

impl<const TAG: u8, T> FixedTag for ApplicationTagged<TAG, T> {
    const TAG: Tag = Tag::Application {
        constructed: true,
        number:      TagNumber::new(TAG),
    };
}

impl<'a, const TAG: u8, T: der::Decode<'a>> DecodeValue<'a> for ApplicationTagged<TAG, T> {
    fn decode_value<R: Reader<'a>>(reader: &mut R, _header: Header) -> der::Result<Self> {
        Ok(Self(T::decode(reader)?))
    }
}

impl<const TAG: u8, T: der::Encode> EncodeValue for ApplicationTagged<TAG, T> {
    fn value_len(&self) -> der::Result<Length> {
        self.0.encoded_len()
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.0.encode(writer)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        der::{asn1::OctetString, Decode, Encode},
    };

    #[test]
    fn test_roundtrip() {
        let value = ApplicationTagged::<1, OctetString>(OctetString::new(vec![1, 2, 3]).unwrap());
        let der = value.to_der().unwrap();
        // 0x61 = constructed application tag number 1
        assert_eq!(der[0], 0x61);
        let back = ApplicationTagged::<1, OctetString>::from_der(&der).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_wrong_tag_rejected() {
        let value = ApplicationTagged::<2, OctetString>(OctetString::new(vec![]).unwrap());
        let der = value.to_der().unwrap();
        assert!(ApplicationTagged::<3, OctetString>::from_der(&der).is_err());
    }
}
