//! CSCA master list structures.
//!
//! Master Lists are instances of the ContentInfo type, as specified in
//! [RFC 5652]; the ContentInfo contains a single SignedData whose content is
//! the certificate set. See ICAO 9303-12 section 9.

use {
    super::{ContentInfo, ContentType},
    cms::{
        cert::{x509::Certificate, CertificateChoices},
        signed_data::{EncapsulatedContentInfo, SignedData},
    },
    der::{
        asn1::{ObjectIdentifier as Oid, OctetString, SetOfVec},
        Decode, Error, ErrorKind, Length, Result, Sequence, Tag,
    },
};

pub type MasterList = ContentInfo<SignedData>;

#[derive(Clone, Debug, PartialEq, Eq, Sequence)]
pub struct CscaMasterList {
    pub version:   u64,
    pub cert_list: SetOfVec<Certificate>,
}

impl ContentType for CscaMasterList {
    /// ICAO 9303-12 9.2
    const CONTENT_TYPE: Oid = Oid::new_unwrap("2.23.136.1.1.2");
}

impl MasterList {
    pub fn signed_data(&self) -> &SignedData {
        &self.0
    }

    pub fn encapsulated_content(&self) -> &EncapsulatedContentInfo {
        &self.0.encap_content_info
    }

    /// The CSCA Master List carried as encapsulated content.
    pub fn csca_certificates(&self) -> Result<CscaMasterList> {
        let econ = self.encapsulated_content();
        if econ.econtent_type != CscaMasterList::CONTENT_TYPE {
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
        CscaMasterList::from_der(octet_string.as_bytes())
    }
}

/// First plain certificate among the CMS `CertificateChoices`.
pub fn first_certificate(choices: &[CertificateChoices]) -> Option<&Certificate> {
    choices.iter().find_map(|choice| match choice {
        CertificateChoices::Certificate(cert) => Some(cert),
        _ => None,
    })
}
