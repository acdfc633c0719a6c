//! `SecurityInfos` from EF.CardAccess and EF.DG14.
//!
//! See ICAO 9303-11 section 9.2 and BSI TR-03110 part 3. Each entry is a
//! `SEQUENCE { protocol OID, requiredData, optionalData? }`; the protocol OID
//! selects the concrete shape.

use {
    super::{public_key_info::SubjectPublicKeyInfo, AnyAlgorithmIdentifier, ApplicationTagged},
    crate::secure_messaging::SmCipher,
    der::{
        asn1::{ObjectIdentifier as Oid, SetOfVec},
        Any, Decode, Encode, Sequence, ValueOrd,
    },
    tracing::warn,
};

/// BSI TR-03110 base arc `bsi-de(0.4.0.127.0.7) protocols(2) smartcard(2)`.
const BSI_PROTOCOLS: [u32; 8] = [0, 4, 0, 127, 0, 7, 2, 2];

pub const ID_ACTIVE_AUTHENTICATION: Oid = Oid::new_unwrap("2.23.136.1.1.5");

/// Catch-all shape every SecurityInfo shares.
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct AnySecurityInfo {
    pub protocol:      Oid,
    pub required_data: Any,
    pub optional_data: Option<Any>,
}

/// ICAO 9303-11 9.2.1
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct PaceInfo {
    pub protocol:     Oid,
    pub version:      u64,
    pub parameter_id: Option<u64>,
}

/// ICAO 9303-11 9.2.2
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct PaceDomainParameterInfo {
    pub protocol:         Oid,
    pub domain_parameter: AnyAlgorithmIdentifier,
    pub parameter_id:     Option<u64>,
}

/// ICAO 9303-11 9.2.5
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct ChipAuthenticationInfo {
    pub protocol: Oid,
    pub version:  u64,
    pub key_id:   Option<u64>,
}

/// ICAO 9303-11 9.2.6
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct ChipAuthenticationPublicKeyInfo {
    pub protocol: Oid,
    pub chip_authentication_public_key: SubjectPublicKeyInfo,
    pub key_id:   Option<u64>,
}

/// ICAO 9303-11 9.2.7
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct ActiveAuthenticationInfo {
    pub protocol:            Oid,
    pub version:             u64,
    pub signature_algorithm: Oid,
}

/// ICAO 9303-11 9.2.4; the optional efCVCA reference is kept opaque.
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct TerminalAuthenticationInfo {
    pub protocol: Oid,
    pub version:  u64,
    pub ef_cvca:  Option<Any>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SecurityInfo {
    Pace(PaceInfo),
    PaceDomainParameter(PaceDomainParameterInfo),
    ChipAuthentication(ChipAuthenticationInfo),
    ChipAuthenticationPublicKey(ChipAuthenticationPublicKeyInfo),
    ActiveAuthentication(ActiveAuthenticationInfo),
    TerminalAuthentication(TerminalAuthenticationInfo),
    Unknown(AnySecurityInfo),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAgreement {
    Dh,
    Ecdh,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaceMapping {
    Generic,
    Integrated,
    ChipAuthentication,
}

/// Decoded id-PACE-* protocol OID.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaceProtocol {
    pub key_agreement: KeyAgreement,
    pub mapping:       PaceMapping,
    pub cipher:        SmCipher,
}

/// Decoded id-CA-* protocol OID.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChipAuthenticationProtocol {
    pub key_agreement: KeyAgreement,
    pub cipher:        SmCipher,
}

fn arcs(oid: &Oid) -> Vec<u32> {
    oid.arcs().collect()
}

fn cipher_from_arc(arc: u32) -> Option<SmCipher> {
    Some(match arc {
        1 => SmCipher::Tdes,
        2 => SmCipher::Aes128,
        3 => SmCipher::Aes192,
        4 => SmCipher::Aes256,
        _ => return None,
    })
}

impl PaceProtocol {
    /// Parse an id-PACE protocol OID (`bsi-de 2.2.4 <mapping> <cipher>`).
    pub fn from_oid(oid: &Oid) -> Option<Self> {
        let arcs = arcs(oid);
        if arcs.len() != 11 || arcs[..8] != BSI_PROTOCOLS || arcs[8] != 4 {
            return None;
        }
        let (key_agreement, mapping) = match arcs[9] {
            1 => (KeyAgreement::Dh, PaceMapping::Generic),
            2 => (KeyAgreement::Ecdh, PaceMapping::Generic),
            3 => (KeyAgreement::Dh, PaceMapping::Integrated),
            4 => (KeyAgreement::Ecdh, PaceMapping::Integrated),
            6 => (KeyAgreement::Ecdh, PaceMapping::ChipAuthentication),
            _ => return None,
        };
        let cipher = cipher_from_arc(arcs[10])?;
        if mapping == PaceMapping::ChipAuthentication && cipher == SmCipher::Tdes {
            return None;
        }
        Some(Self {
            key_agreement,
            mapping,
            cipher,
        })
    }
}

impl ChipAuthenticationProtocol {
    /// Parse an id-CA protocol OID (`bsi-de 2.2.3 <agreement> <cipher>`).
    pub fn from_oid(oid: &Oid) -> Option<Self> {
        let arcs = arcs(oid);
        if arcs.len() != 11 || arcs[..8] != BSI_PROTOCOLS || arcs[8] != 3 {
            return None;
        }
        let key_agreement = match arcs[9] {
            1 => KeyAgreement::Dh,
            2 => KeyAgreement::Ecdh,
            _ => return None,
        };
        Some(Self {
            key_agreement,
            cipher: cipher_from_arc(arcs[10])?,
        })
    }
}

impl SecurityInfo {
    /// Classify a raw entry by its protocol OID.
    pub fn classify(any: &AnySecurityInfo) -> der::Result<Self> {
        let der = any.to_der()?;
        let arcs = arcs(&any.protocol);
        Ok(if any.protocol == ID_ACTIVE_AUTHENTICATION {
            Self::ActiveAuthentication(ActiveAuthenticationInfo::from_der(&der)?)
        } else if arcs.len() >= 9 && arcs[..8] == BSI_PROTOCOLS {
            match arcs[8] {
                1 => Self::ChipAuthenticationPublicKey(ChipAuthenticationPublicKeyInfo::from_der(
                    &der,
                )?),
                2 => Self::TerminalAuthentication(TerminalAuthenticationInfo::from_der(&der)?),
                3 => Self::ChipAuthentication(ChipAuthenticationInfo::from_der(&der)?),
                4 if arcs.len() == 11 => Self::Pace(PaceInfo::from_der(&der)?),
                4 if arcs.len() == 10 => {
                    Self::PaceDomainParameter(PaceDomainParameterInfo::from_der(&der)?)
                }
                _ => Self::Unknown(any.clone()),
            }
        } else {
            Self::Unknown(any.clone())
        })
    }
}

/// The SET OF SecurityInfo carried by EF.CardAccess and EF.DG14.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SecurityInfos(pub SetOfVec<AnySecurityInfo>);

/// EF.CardAccess is a [`SecurityInfos`] with no further wrapping.
///
/// See ICAO 9303-10 3.11.3
pub type EfCardAccess = SecurityInfos;

/// EF.DG14 wraps [`SecurityInfos`] in `[APPLICATION 14]` (tag 0x6E).
///
/// See ICAO 9303-10 3.11.4
pub type EfDg14 = ApplicationTagged<14, SecurityInfos>;

impl<'a> Decode<'a> for SecurityInfos {
    fn decode<R: der::Reader<'a>>(reader: &mut R) -> der::Result<Self> {
        Ok(Self(SetOfVec::decode(reader)?))
    }
}

impl Encode for SecurityInfos {
    fn encoded_len(&self) -> der::Result<der::Length> {
        self.0.encoded_len()
    }

    fn encode(&self, writer: &mut impl der::Writer) -> der::Result<()> {
        self.0.encode(writer)
    }
}

impl SecurityInfos {
    /// Classified entries; unparseable ones degrade to `Unknown` with a log
    /// line rather than failing the whole file.
    pub fn iter(&self) -> impl Iterator<Item = SecurityInfo> + '_ {
        self.0.iter().map(|any| {
            SecurityInfo::classify(any).unwrap_or_else(|err| {
                warn!(
                    %err,
                    protocol = %super::oid_name(&any.protocol),
                    "malformed SecurityInfo"
                );
                SecurityInfo::Unknown(any.clone())
            })
        })
    }

    /// All PACEInfos whose protocol OID this crate can drive.
    pub fn pace_infos(&self) -> Vec<(PaceInfo, PaceProtocol)> {
        self.iter()
            .filter_map(|si| match si {
                SecurityInfo::Pace(info) => {
                    PaceProtocol::from_oid(&info.protocol).map(|p| (info, p))
                }
                _ => None,
            })
            .collect()
    }

    /// The Chip Authentication pairing, matched on key id.
    pub fn chip_authentication(
        &self,
    ) -> Option<(ChipAuthenticationInfo, ChipAuthenticationPublicKeyInfo)> {
        let infos: Vec<_> = self.iter().collect();
        let pk = infos.iter().find_map(|si| match si {
            SecurityInfo::ChipAuthenticationPublicKey(pk) => Some(pk.clone()),
            _ => None,
        })?;
        let ca = infos
            .iter()
            .find_map(|si| match si {
                SecurityInfo::ChipAuthentication(ca) if ca.key_id == pk.key_id => Some(ca.clone()),
                _ => None,
            })
            .or_else(|| {
                infos.iter().find_map(|si| match si {
                    SecurityInfo::ChipAuthentication(ca) => Some(ca.clone()),
                    _ => None,
                })
            })?;
        (ca.version == 1).then_some((ca, pk))
    }

    pub fn active_authentication(&self) -> Option<ActiveAuthenticationInfo> {
        self.iter().find_map(|si| match si {
            SecurityInfo::ActiveAuthentication(aa) => Some(aa),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex};

    /// PACEInfo from ICAO 9303-11 appendix G: id-PACE-ECDH-GM-AES-CBC-CMAC-128
    /// with standardized brainpoolP256r1 parameters (id 13).
    #[test]
    fn test_decode_pace_info() {
        let der = hex!("3012060A 04007F00 07020204 02020201 0202010D");
        let info = PaceInfo::from_der(&der).unwrap();
        assert_eq!(info.version, 2);
        assert_eq!(info.parameter_id, Some(13));

        let protocol = PaceProtocol::from_oid(&info.protocol).unwrap();
        assert_eq!(protocol.key_agreement, KeyAgreement::Ecdh);
        assert_eq!(protocol.mapping, PaceMapping::Generic);
        assert_eq!(protocol.cipher, SmCipher::Aes128);
    }

    #[test]
    fn test_classify_card_access() {
        // EF.CardAccess with a single PACEInfo.
        let der = hex!("31143012060A 04007F00 07020204 02020201 0202010D");
        let infos = SecurityInfos::from_der(&der).unwrap();
        let pace = infos.pace_infos();
        assert_eq!(pace.len(), 1);
        assert!(infos.chip_authentication().is_none());
    }

    #[test]
    fn test_ca_protocol_oid() {
        // id-CA-ECDH-AES-CBC-CMAC-256
        let oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.3.2.4");
        let protocol = ChipAuthenticationProtocol::from_oid(&oid).unwrap();
        assert_eq!(protocol.key_agreement, KeyAgreement::Ecdh);
        assert_eq!(protocol.cipher, SmCipher::Aes256);
    }
}
