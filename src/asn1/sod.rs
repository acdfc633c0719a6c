//! EF.SOD: the Document Security Object.

use {
    super::{ApplicationTagged, ContentInfo, ContentType, DigestAlgorithmIdentifier},
    cms::signed_data::{EncapsulatedContentInfo, SignedData, SignerInfo},
    der::{
        asn1::{ObjectIdentifier as Oid, OctetString, PrintableString},
        Decode, Error, ErrorKind, Length, Result, Sequence, Tag,
    },
};

/// EF.SOD is a wrapped [`SignedData`] structure.
///
/// See ICAO 9303-10 4.7.14. The 0x77 tag is an ASN.1 constructed application
/// tag with the value 23.
pub type EfSod = ApplicationTagged<23, ContentInfo<SignedData>>;

/// ICAO 9303-10 4.6.2.3
#[derive(Clone, Debug, PartialEq, Eq, Sequence)]
pub struct LdsSecurityObject {
    pub version:                u64,
    pub hash_algorithm:         DigestAlgorithmIdentifier,
    pub data_group_hash_values: Vec<DataGroupHash>,
    pub lds_version_info:       Option<LdsVersionInfo>,
}

/// ICAO 9303-10 4.6.2.3
#[derive(Clone, Debug, PartialEq, Eq, Sequence)]
pub struct LdsVersionInfo {
    pub lds_version:     PrintableString,
    pub unicode_version: PrintableString,
}

/// ICAO 9303-10 4.6.2.3
#[derive(Clone, Debug, PartialEq, Eq, Sequence)]
pub struct DataGroupHash {
    pub data_group_number: u64,
    pub hash_value:        OctetString,
}

impl ContentType for LdsSecurityObject {
    /// ICAO 9303-10 4.6.2.3
    const CONTENT_TYPE: Oid = Oid::new_unwrap("2.23.136.1.1.1");
}

impl EfSod {
    pub fn signed_data(&self) -> &SignedData {
        &self.0 .0
    }

    pub fn signer_info(&self) -> Result<&SignerInfo> {
        self.signed_data()
            .signer_infos
            .0
            .as_slice()
            .first()
            .ok_or_else(|| Error::new(ErrorKind::Failed, Length::ZERO))
    }

    pub fn signature(&self) -> Result<&[u8]> {
        Ok(self.signer_info()?.signature.as_bytes())
    }

    /// Blake3 hash of the document signature, a stable fingerprint for the
    /// physical document.
    pub fn document_hash(&self) -> Result<[u8; 32]> {
        Ok(*blake3::hash(self.signature()?).as_bytes())
    }

    pub fn encapsulated_content(&self) -> &EncapsulatedContentInfo {
        &self.signed_data().encap_content_info
    }

    pub fn lds_security_object(&self) -> Result<LdsSecurityObject> {
        let econ = self.encapsulated_content();
        if econ.econtent_type != LdsSecurityObject::CONTENT_TYPE {
            return Err(Error::new(
                ErrorKind::OidUnknown {
                    oid: econ.econtent_type,
                },
                Length::ZERO,
            ));
        }
        let octet_string = econ
            .econtent
            .as_ref()
            .ok_or(Error::new(
                ErrorKind::TagUnexpected {
                    expected: Some(Tag::OctetString),
                    actual:   Tag::Null, // Actually None
                },
                Length::ZERO,
            ))?
            .decode_as::<OctetString>()?;
        LdsSecurityObject::from_der(octet_string.as_bytes())
    }
}

impl LdsSecurityObject {
    pub fn hash_for_dg(&self, dg_number: u64) -> Option<&[u8]> {
        self.data_group_hash_values
            .iter()
            .find(|entry| entry.data_group_number == dg_number)
            .map(|entry| entry.hash_value.as_bytes())
    }
}
