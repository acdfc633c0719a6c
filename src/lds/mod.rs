//! The Logical Data Structure: data group identifiers, decoded forms and the
//! tag-based parser dispatch. See ICAO 9303-10.

pub mod com;
pub mod dg1;
pub mod dg2;
pub mod dg7;
pub mod dg11;
pub mod dg12;
pub mod tlv;

pub use self::{
    com::EfCom,
    dg1::Dg1,
    dg2::Dg2,
    dg7::Dg7,
    dg11::Dg11,
    dg12::Dg12,
};
use {
    crate::{
        asn1::{public_key_info::EfDg15, EfDg14, EfSod},
        crypto::HashAlgo,
        Error, Result,
    },
    der::Decode,
    num_enum::{IntoPrimitive, TryFromPrimitive},
    std::fmt::{self, Display, Formatter},
};

/// The elementary files of the eMRTD application, identified by their ICAO
/// tag byte. Numeric (file) order is the derive order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum DataGroupId {
    Com = 0x60,
    Dg1 = 0x61,
    Dg2 = 0x75,
    Dg3 = 0x63,
    Dg4 = 0x76,
    Dg5 = 0x65,
    Dg6 = 0x66,
    Dg7 = 0x67,
    Dg8 = 0x68,
    Dg9 = 0x69,
    Dg10 = 0x6A,
    Dg11 = 0x6B,
    Dg12 = 0x6C,
    Dg13 = 0x6D,
    Dg14 = 0x6E,
    Dg15 = 0x6F,
    Dg16 = 0x70,
    Sod = 0x77,
}

impl DataGroupId {
    pub const ALL: [Self; 18] = [
        Self::Com,
        Self::Dg1,
        Self::Dg2,
        Self::Dg3,
        Self::Dg4,
        Self::Dg5,
        Self::Dg6,
        Self::Dg7,
        Self::Dg8,
        Self::Dg9,
        Self::Dg10,
        Self::Dg11,
        Self::Dg12,
        Self::Dg13,
        Self::Dg14,
        Self::Dg15,
        Self::Dg16,
        Self::Sod,
    ];

    /// The DG number used in the SOD hash table; COM and SOD have none.
    pub const fn number(self) -> Option<u64> {
        match self {
            Self::Com | Self::Sod => None,
            Self::Dg1 => Some(1),
            Self::Dg2 => Some(2),
            Self::Dg3 => Some(3),
            Self::Dg4 => Some(4),
            Self::Dg5 => Some(5),
            Self::Dg6 => Some(6),
            Self::Dg7 => Some(7),
            Self::Dg8 => Some(8),
            Self::Dg9 => Some(9),
            Self::Dg10 => Some(10),
            Self::Dg11 => Some(11),
            Self::Dg12 => Some(12),
            Self::Dg13 => Some(13),
            Self::Dg14 => Some(14),
            Self::Dg15 => Some(15),
            Self::Dg16 => Some(16),
        }
    }

    /// File identifier under the eMRTD application DF.
    /// See ICAO 9303-10 figure 3.
    pub const fn file_id(self) -> u16 {
        match self {
            Self::Com => 0x011E,
            Self::Sod => 0x011D,
            Self::Dg1 => 0x0101,
            Self::Dg2 => 0x0102,
            Self::Dg3 => 0x0103,
            Self::Dg4 => 0x0104,
            Self::Dg5 => 0x0105,
            Self::Dg6 => 0x0106,
            Self::Dg7 => 0x0107,
            Self::Dg8 => 0x0108,
            Self::Dg9 => 0x0109,
            Self::Dg10 => 0x010A,
            Self::Dg11 => 0x010B,
            Self::Dg12 => 0x010C,
            Self::Dg13 => 0x010D,
            Self::Dg14 => 0x010E,
            Self::Dg15 => 0x010F,
            Self::Dg16 => 0x0110,
        }
    }

    /// Short EF identifier for implicit selection via READ BINARY.
    pub const fn short_ef(self) -> u8 {
        (self.file_id() & 0x1F) as u8
    }

    /// The ICAO tag byte that opens the file's TLV.
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// DG3 and DG4 hold fingerprints and iris data behind terminal
    /// authentication.
    pub const fn is_secure_element(self) -> bool {
        matches!(self, Self::Dg3 | Self::Dg4)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Com => "EF.COM",
            Self::Sod => "EF.SOD",
            Self::Dg1 => "DG1",
            Self::Dg2 => "DG2",
            Self::Dg3 => "DG3",
            Self::Dg4 => "DG4",
            Self::Dg5 => "DG5",
            Self::Dg6 => "DG6",
            Self::Dg7 => "DG7",
            Self::Dg8 => "DG8",
            Self::Dg9 => "DG9",
            Self::Dg10 => "DG10",
            Self::Dg11 => "DG11",
            Self::Dg12 => "DG12",
            Self::Dg13 => "DG13",
            Self::Dg14 => "DG14",
            Self::Dg15 => "DG15",
            Self::Dg16 => "DG16",
        }
    }
}

impl DataGroupId {
    /// Position in numeric file order: COM, DG1..DG16, SOD.
    const fn ordinal(self) -> u8 {
        match self {
            Self::Com => 0,
            Self::Sod => 17,
            other => {
                // DG numbers are 1-based.
                match other.number() {
                    Some(n) => n as u8,
                    None => unreachable!(),
                }
            }
        }
    }
}

impl Ord for DataGroupId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ordinal().cmp(&other.ordinal())
    }
}

impl PartialOrd for DataGroupId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for DataGroupId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A data group as read from the chip: raw bytes plus the decoded form.
#[derive(Clone, Debug)]
pub struct DataGroup {
    pub id:      DataGroupId,
    pub raw:     Vec<u8>,
    pub content: DataGroupContent,
}

#[derive(Clone, Debug)]
pub enum DataGroupContent {
    Com(EfCom),
    Sod(Box<EfSod>),
    Mrz(Dg1),
    Face(Dg2),
    DisplayedSignature(Dg7),
    AdditionalPersonalDetails(Dg11),
    AdditionalDocumentDetails(Dg12),
    SecurityInfos(Box<EfDg14>),
    ActiveAuthenticationKey(Box<EfDg15>),
    /// Data groups without a decoded form (biometric templates behind EAC,
    /// optional details); raw bytes only.
    Opaque,
}

impl DataGroup {
    /// Decode a file read from the chip. The outer tag must match the id.
    pub fn parse(id: DataGroupId, raw: Vec<u8>) -> Result<Self> {
        if raw.first() != Some(&id.tag()) {
            return Err(Error::Parse(format!(
                "{id}: expected tag {:#04X}, found {:?}",
                id.tag(),
                raw.first()
            )));
        }
        let content = match id {
            DataGroupId::Com => DataGroupContent::Com(EfCom::parse(&raw)?),
            DataGroupId::Sod => DataGroupContent::Sod(Box::new(EfSod::from_der(&raw)?)),
            DataGroupId::Dg1 => DataGroupContent::Mrz(Dg1::parse(&raw)?),
            DataGroupId::Dg2 => DataGroupContent::Face(Dg2::parse(&raw)?),
            DataGroupId::Dg7 => DataGroupContent::DisplayedSignature(Dg7::parse(&raw)?),
            DataGroupId::Dg11 => {
                DataGroupContent::AdditionalPersonalDetails(Dg11::parse(&raw)?)
            }
            DataGroupId::Dg12 => {
                DataGroupContent::AdditionalDocumentDetails(Dg12::parse(&raw)?)
            }
            DataGroupId::Dg14 => DataGroupContent::SecurityInfos(Box::new(EfDg14::from_der(&raw)?)),
            DataGroupId::Dg15 => {
                DataGroupContent::ActiveAuthenticationKey(Box::new(EfDg15::from_der(&raw)?))
            }
            _ => DataGroupContent::Opaque,
        };
        Ok(Self { id, raw, content })
    }

    /// Hash of the raw file with the algorithm the SOD declares.
    pub fn hash(&self, algo: HashAlgo) -> Vec<u8> {
        algo.digest(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_mapping() {
        assert_eq!(DataGroupId::try_from(0x77u8), Ok(DataGroupId::Sod));
        assert_eq!(DataGroupId::try_from(0x6Eu8), Ok(DataGroupId::Dg14));
        assert!(DataGroupId::try_from(0x42u8).is_err());
    }

    #[test]
    fn test_file_ids() {
        assert_eq!(DataGroupId::Com.file_id(), 0x011E);
        assert_eq!(DataGroupId::Com.short_ef(), 0x1E);
        assert_eq!(DataGroupId::Dg14.file_id(), 0x010E);
        assert_eq!(DataGroupId::Dg14.short_ef(), 0x0E);
    }

    #[test]
    fn test_ordering_numeric() {
        let mut ids = vec![DataGroupId::Sod, DataGroupId::Dg2, DataGroupId::Com];
        ids.sort();
        assert_eq!(ids, vec![DataGroupId::Com, DataGroupId::Dg2, DataGroupId::Sod]);
    }

    #[test]
    fn test_secure_elements() {
        assert!(DataGroupId::Dg3.is_secure_element());
        assert!(DataGroupId::Dg4.is_secure_element());
        assert!(!DataGroupId::Dg2.is_secure_element());
    }
}
