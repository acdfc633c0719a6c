//! Pure ASN.1 types, no protocol logic.
//!
//! Parsing goes as deep as the known OIDs allow: a `SecurityInfo` classifies
//! into the PACE / Chip Authentication / Active Authentication variants with
//! a catch-all for everything else, so the application gets rich types while
//! all valid inputs still parse.

mod application_tagged;
mod content_info;
pub mod digest_algorithm_identifier;
pub mod pki;
pub mod public_key_info;
pub mod security_info;
pub mod sod;

pub use self::{
    application_tagged::ApplicationTagged,
    content_info::{ContentInfo, ContentType},
    digest_algorithm_identifier::DigestAlgorithmIdentifier,
    security_info::{EfCardAccess, EfDg14, SecurityInfo, SecurityInfos},
    sod::{EfSod, LdsSecurityObject},
};
use der::{asn1::ObjectIdentifier as Oid, Any, Sequence, ValueOrd};

#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct AnyAlgorithmIdentifier {
    pub algorithm:  Oid,
    pub parameters: Option<Any>,
}

/// Best-effort name for an OID, for diagnostics.
pub fn oid_name(oid: &Oid) -> String {
    const_oid::db::DB
        .by_oid(oid)
        .map_or_else(|| oid.to_string(), str::to_string)
}
