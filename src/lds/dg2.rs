//! DG2: encoded face biometrics.
//!
//! The biometric template nests CBEFF headers around an ISO/IEC 19794-5 face
//! record; the image payload is located by its JPEG / JPEG2000 magic rather
//! than by walking the 19794-5 header, which varies between issuers.
//! See ICAO 9303-10 4.7.2.

use {
    super::tlv::Tlv,
    crate::{Error, Result},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Jpeg2000,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaceImage {
    pub format: ImageFormat,
    pub data:   Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dg2 {
    pub images: Vec<FaceImage>,
}

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const JP2_CODESTREAM_MAGIC: &[u8] = &[0xFF, 0x4F, 0xFF, 0x51];
const JP2_CONTAINER_MAGIC: &[u8] = &[0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20];

fn find_image(block: &[u8]) -> Option<FaceImage> {
    for start in 0..block.len() {
        let rest = &block[start..];
        if rest.starts_with(JPEG_MAGIC) {
            return Some(FaceImage {
                format: ImageFormat::Jpeg,
                data:   rest.to_vec(),
            });
        }
        if rest.starts_with(JP2_CODESTREAM_MAGIC) || rest.starts_with(JP2_CONTAINER_MAGIC) {
            return Some(FaceImage {
                format: ImageFormat::Jpeg2000,
                data:   rest.to_vec(),
            });
        }
    }
    None
}

impl Dg2 {
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let tlv = Tlv::decode(raw)?;
        let template = tlv
            .find_deep(0x7F61)
            .ok_or(Error::Parse("DG2 missing biometric info template".into()))?;

        let mut images = Vec::new();
        for info in template.children()? {
            if info.tag != 0x7F60 {
                continue;
            }
            // Biometric data block, primitive (5F2E) or constructed (7F2E).
            let block = info
                .find_deep(0x5F2E)
                .or_else(|| info.find_deep(0x7F2E))
                .ok_or(Error::Parse("DG2 missing biometric data block".into()))?;
            let bytes = match block.as_primitive() {
                Ok(bytes) => bytes.to_vec(),
                Err(_) => block.encode(),
            };
            if let Some(image) = find_image(&bytes) {
                images.push(image);
            }
        }
        if images.is_empty() {
            return Err(Error::Parse("DG2 contains no decodable face image".into()));
        }
        Ok(Self { images })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_dg2(image: &[u8]) -> Vec<u8> {
        // 46-byte stand-in for the ISO 19794-5 face record header.
        let mut block = vec![0u8; 46];
        block[..4].copy_from_slice(b"FAC\0");
        block.extend_from_slice(image);
        Tlv::constructed(0x75, vec![Tlv::constructed(0x7F61, vec![
            Tlv::primitive(0x02, vec![1]),
            Tlv::constructed(0x7F60, vec![
                Tlv::constructed(0xA1, vec![Tlv::primitive(0x81, vec![0x02])]),
                Tlv::primitive(0x5F2E, block),
            ]),
        ])])
        .encode()
    }

    #[test]
    fn test_parse_jpeg() {
        let mut image = vec![0xFF, 0xD8, 0xFF, 0xE0];
        image.extend_from_slice(&[0x00; 16]);
        let dg2 = Dg2::parse(&build_dg2(&image)).unwrap();
        assert_eq!(dg2.images.len(), 1);
        assert_eq!(dg2.images[0].format, ImageFormat::Jpeg);
        assert_eq!(dg2.images[0].data, image);
    }

    #[test]
    fn test_parse_jp2() {
        let image = [0xFF, 0x4F, 0xFF, 0x51, 0x00, 0x29];
        let dg2 = Dg2::parse(&build_dg2(&image)).unwrap();
        assert_eq!(dg2.images[0].format, ImageFormat::Jpeg2000);
    }

    #[test]
    fn test_no_image() {
        assert!(Dg2::parse(&build_dg2(&[0x00; 8])).is_err());
    }
}
