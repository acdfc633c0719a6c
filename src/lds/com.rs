//! EF.COM: LDS version info and the data group presence list.
//! See ICAO 9303-10 4.6.1.

use {
    super::{tlv::Tlv, DataGroupId},
    crate::{Error, Result},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EfCom {
    pub lds_version:     String,
    pub unicode_version: String,
    pub tag_list:        Vec<u8>,
}

impl EfCom {
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let tlv = Tlv::decode(raw)?;
        let field = |tag: u16| -> Result<Vec<u8>> {
            Ok(tlv
                .find(tag)
                .ok_or_else(|| Error::Parse(format!("EF.COM missing tag {tag:#06X}")))?
                .as_primitive()?
                .to_vec())
        };
        Ok(Self {
            lds_version:     String::from_utf8_lossy(&field(0x5F01)?).into_owned(),
            unicode_version: String::from_utf8_lossy(&field(0x5F36)?).into_owned(),
            tag_list:        field(0x5C)?,
        })
    }

    /// The data groups the document claims to carry.
    pub fn data_groups(&self) -> Vec<DataGroupId> {
        self.tag_list
            .iter()
            .filter_map(|&tag| DataGroupId::try_from(tag).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex};

    #[test]
    fn test_parse() {
        // LDS 1.7, Unicode 4.0.0, containing DG1, DG2, DG11, DG14.
        let raw = hex!(
            "6016"
            "5F0104 30313037"
            "5F3606 303430303030"
            "5C04 61756B6E"
        );
        let com = EfCom::parse(&raw).unwrap();
        assert_eq!(com.lds_version, "0107");
        assert_eq!(com.unicode_version, "040000");
        assert_eq!(com.data_groups(), vec![
            DataGroupId::Dg1,
            DataGroupId::Dg2,
            DataGroupId::Dg11,
            DataGroupId::Dg14,
        ]);
    }

    #[test]
    fn test_unknown_tags_skipped() {
        let raw = hex!("600A 5F010430313037 5C0142");
        assert!(EfCom::parse(&raw).is_err()); // missing unicode version
    }
}
