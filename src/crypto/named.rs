//! Standardized domain parameters.
//!
//! ICAO 9303-11 section 9.5.1 references the RFC 5114 MODP groups (ids 0-2)
//! and the NIST / Brainpool curves (ids 8-18). Ids 3-7 are reserved.

use {
    super::{DhUint, DomainParameters, EllipticCurve, FieldUint, ModPGroup},
    hex_literal::hex,
};

/// Resolve a PACE `parameterId` to its domain parameters.
pub fn standardized_domain_parameters(id: u64) -> Option<DomainParameters> {
    Some(match id {
        0 => DomainParameters::Dh(modp_1024_160()),
        1 => DomainParameters::Dh(modp_2048_224()),
        2 => DomainParameters::Dh(modp_2048_256()),
        8 => DomainParameters::Ec(nist_p192()),
        9 => DomainParameters::Ec(brainpool_p192r1()),
        10 => DomainParameters::Ec(nist_p224()),
        11 => DomainParameters::Ec(brainpool_p224r1()),
        12 => DomainParameters::Ec(nist_p256()),
        13 => DomainParameters::Ec(brainpool_p256r1()),
        14 => DomainParameters::Ec(brainpool_p320r1()),
        15 => DomainParameters::Ec(nist_p384()),
        16 => DomainParameters::Ec(brainpool_p384r1()),
        17 => DomainParameters::Ec(brainpool_p512r1()),
        18 => DomainParameters::Ec(nist_p521()),
        _ => return None,
    })
}

fn fe(bytes: &[u8]) -> FieldUint {
    FieldUint::from_be_slice(bytes)
}

fn curve(p: &[u8], a: &[u8], b: &[u8], gx: &[u8], gy: &[u8], n: &[u8]) -> EllipticCurve {
    EllipticCurve::new(fe(p), fe(a), fe(b), (fe(gx), fe(gy)), fe(n), 1)
        .expect("standardized curve parameters are valid")
}

/// RFC 5114 1024-bit MODP Group with 160-bit Prime Order Subgroup
pub fn modp_1024_160() -> ModPGroup {
    ModPGroup::new(
        DhUint::from_be_slice(&hex!(
            "B10B8F96A080E01DDE92DE5EAE5D54EC52C99FBCFB06A3C69A6A9DCA52D23B61"
            "6073E28675A23D189838EF1E2EE652C013ECB4AEA906112324975C3CD49B83BF"
            "ACCBDD7D90C4BD7098488E9C219A73724EFFD6FAE5644738FAA31A4FF55BCCC0"
            "A151AF5F0DC8B4BD45BF37DF365C1A65E68CFDA76D4DA708DF1FB2BC2E4A4371"
        )),
        DhUint::from_be_slice(&hex!(
            "A4D1CBD5C3FD34126765A442EFB99905F8104DD258AC507FD6406CFF14266D31"
            "266FEA1E5C41564B777E690F5504F213160217B4B01B886A5E91547F9E2749F4"
            "D7FBD7D3B9A92EE1909D0D2263F80A76A6A24C087A091F531DBF0A0169B6A28A"
            "D662A4D18E73AFA32D779D5918D08BC8858F4DCEF97C2A24855E6EEB22B3B2E5"
        )),
        DhUint::from_be_slice(&hex!("F518AA8781A8DF278ABA4E7D64B7CB9D49462353")),
    )
    .expect("standardized group parameters are valid")
}

/// RFC 5114 2048-bit MODP Group with 224-bit Prime Order Subgroup
pub fn modp_2048_224() -> ModPGroup {
    ModPGroup::new(
        DhUint::from_be_slice(&hex!(
            "AD107E1E9123A9D0D660FAA79559C51FA20D64E5683B9FD1B54B1597B61D0A75"
            "E6FA141DF95A56DBAF9A3C407BA1DF15EB3D688A309C180E1DE6B85A1274A0A6"
            "6D3F8152AD6AC2129037C9EDEFDA4DF8D91E8FEF55B7394B7AD5B7D0B6C12207"
            "C9F98D11ED34DBF6C6BA0B2C8BBC27BE6A00E0A0B9C49708B3BF8A3170918836"
            "81286130BC8985DB1602E714415D9330278273C7DE31EFDC7310F7121FD5A074"
            "15987D9ADC0A486DCDF93ACC44328387315D75E198C641A480CD86A1B9E587E8"
            "BE60E69CC928B2B9C52172E413042E9B23F10B0E16E79763C9B53DCF4BA80A29"
            "E3FB73C16B8E75B97EF363E2FFA31F71CF9DE5384E71B81C0AC4DFFE0C10E64F"
        )),
        DhUint::from_be_slice(&hex!(
            "AC4032EF4F2D9AE39DF30B5C8FFDAC506CDEBE7B89998CAF74866A08CFE4FFE3"
            "A6824A4E10B9A6F0DD921F01A70C4AFAAB739D7700C29F52C57DB17C620A8652"
            "BE5E9001A8D66AD7C17669101999024AF4D027275AC1348BB8A762D0521BC98A"
            "E247150422EA1ED409939D54DA7460CDB5F6C6B250717CBEF180EB34118E98D1"
            "19529A45D6F834566E3025E316A330EFBB77A86F0C1AB15B051AE3D428C8F8AC"
            "B70A8137150B8EEB10E183EDD19963DDD9E263E4770589EF6AA21E7F5F2FF381"
            "B539CCE3409D13CD566AFBB48D6C019181E1BCFE94B30269EDFE72FE9B6AA4BD"
            "7B5A0F1C71CFFF4C19C418E1F6EC017981BC087F2A7065B384B890D3191F2BFA"
        )),
        DhUint::from_be_slice(&hex!(
            "801C0D34C58D93FE997177101F80535A4738CEBCBF389A99B36371EB"
        )),
    )
    .expect("standardized group parameters are valid")
}

/// RFC 5114 2048-bit MODP Group with 256-bit Prime Order Subgroup
pub fn modp_2048_256() -> ModPGroup {
    ModPGroup::new(
        DhUint::from_be_slice(&hex!(
            "87A8E61DB4B6663CFFBBD19C651959998CEEF608660DD0F25D2CEED4435E3B00"
            "E00DF8F1D61957D4FAF7DF4561B2AA3016C3D91134096FAA3BF4296D830E9A7C"
            "209E0C6497517ABD5A8A9D306BCF67ED91F9E6725B4758C022E0B1EF4275BF7B"
            "6C5BFC11D45F9088B941F54EB1E59BB8BC39A0BF12307F5C4FDB70C581B23F76"
            "B63ACAE1CAA6B7902D52526735488A0EF13C6D9A51BFA4AB3AD8347796524D8E"
            "F6A167B5A41825D967E144E5140564251CCACB83E6B486F6B3CA3F7971506026"
            "C0B857F689962856DED4010ABD0BE621C3A3960A54E710C375F26375D7014103"
            "A4B54330C198AF126116D2276E11715F693877FAD7EF09CADB094AE91E1A1597"
        )),
        DhUint::from_be_slice(&hex!(
            "3FB32C9B73134D0B2E77506660EDBD484CA7B18F21EF205407F4793A1A0BA125"
            "10DBC15077BE463FFF4FED4AAC0BB555BE3A6C1B0C6B47B1BC3773BF7E8C6F62"
            "901228F8C28CBB18A55AE31341000A650196F931C77A57F2DDF463E5E9EC144B"
            "777DE62AAAB8A8628AC376D282D6ED3864E67982428EBC831D14348F6F2F9193"
            "B5045AF2767164E1DFC967C1FB3F2E55A4BD1BFFE83B9C80D052B985D182EA0A"
            "DB2A3B7313D3FE14C8484B1E052588B9B7D2BBD2DF016199ECD06E1557CD0915"
            "B3353BBB64E0EC377FD028370DF92B52C7891428CDC67EB6184B523D1DB246C3"
            "2F63078490F00EF8D647D148D47954515E2327CFEF98C582664B4C0F6CC41659"
        )),
        DhUint::from_be_slice(&hex!(
            "8CF83642A709A097B447997640129DA299B1A47D1EB3750BA308B0FE64F5FBD3"
        )),
    )
    .expect("standardized group parameters are valid")
}

/// NIST P-192, secp192r1
pub fn nist_p192() -> EllipticCurve {
    curve(
        &hex!("fffffffffffffffffffffffffffffffeffffffffffffffff"),
        &hex!("fffffffffffffffffffffffffffffffefffffffffffffffc"),
        &hex!("64210519e59c80e70fa7e9ab72243049feb8deecc146b9b1"),
        &hex!("188da80eb03090f67cbf20eb43a18800f4ff0afd82ff1012"),
        &hex!("07192b95ffc8da78631011ed6b24cdd573f977a11e794811"),
        &hex!("ffffffffffffffffffffffff99def836146bc9b1b4d22831"),
    )
}

/// NIST P-224, secp224r1
pub fn nist_p224() -> EllipticCurve {
    curve(
        &hex!("ffffffffffffffffffffffffffffffff000000000000000000000001"),
        &hex!("fffffffffffffffffffffffffffffffefffffffffffffffffffffffe"),
        &hex!("b4050a850c04b3abf54132565044b0b7d7bfd8ba270b39432355ffb4"),
        &hex!("b70e0cbd6bb4bf7f321390b94a03c1d356c21122343280d6115c1d21"),
        &hex!("bd376388b5f723fb4c22dfe6cd4375a05a07476444d5819985007e34"),
        &hex!("ffffffffffffffffffffffffffff16a2e0b8f03e13dd29455c5c2a3d"),
    )
}

/// NIST P-256, secp256r1
pub fn nist_p256() -> EllipticCurve {
    curve(
        &hex!("ffffffff00000001000000000000000000000000ffffffffffffffffffffffff"),
        &hex!("ffffffff00000001000000000000000000000000fffffffffffffffffffffffc"),
        &hex!("5ac635d8aa3a93e7b3ebbd55769886bc651d06b0cc53b0f63bce3c3e27d2604b"),
        &hex!("6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296"),
        &hex!("4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5"),
        &hex!("ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551"),
    )
}

/// NIST P-384, secp384r1
pub fn nist_p384() -> EllipticCurve {
    curve(
        &hex!("fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffe"
              "ffffffff0000000000000000ffffffff"),
        &hex!("fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffe"
              "ffffffff0000000000000000fffffffc"),
        &hex!("b3312fa7e23ee7e4988e056be3f82d19181d9c6efe8141120314088f5013875a"
              "c656398d8a2ed19d2a85c8edd3ec2aef"),
        &hex!("aa87ca22be8b05378eb1c71ef320ad746e1d3b628ba79b9859f741e082542a38"
              "5502f25dbf55296c3a545e3872760ab7"),
        &hex!("3617de4a96262c6f5d9e98bf9292dc29f8f41dbd289a147ce9da3113b5f0b8c0"
              "0a60b1ce1d7e819d7a431d7c90ea0e5f"),
        &hex!("ffffffffffffffffffffffffffffffffffffffffffffffffc7634d81f4372ddf"
              "581a0db248b0a77aecec196accc52973"),
    )
}

/// NIST P-521, secp521r1
pub fn nist_p521() -> EllipticCurve {
    curve(
        &hex!("01ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
              "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
              "ffff"),
        &hex!("01ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
              "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
              "fffc"),
        &hex!("0051953eb9618e1c9a1f929a21a0b68540eea2da725b99b315f3b8b489918ef1"
              "09e156193951ec7e937b1652c0bd3bb1bf073573df883d2c34f1ef451fd46b50"
              "3f00"),
        &hex!("00c6858e06b70404e9cd9e3ecb662395b4429c648139053fb521f828af606b4d"
              "3dbaa14b5e77efe75928fe1dc127a2ffa8de3348b3c1856a429bf97e7e31c2e5"
              "bd66"),
        &hex!("011839296a789a3bc0045c8a5fb42c7d1bd998f54449579b446817afbd17273e"
              "662c97ee72995ef42640c550b9013fad0761353c7086a272c24088be94769fd1"
              "6650"),
        &hex!("01fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffa"
              "51868783bf2f966b7fcc0148f709a5d03bb5c9b8899c47aebb6fb71e91386409"),
    )
}

/// RFC 5639 brainpoolP192r1
pub fn brainpool_p192r1() -> EllipticCurve {
    curve(
        &hex!("c302f41d932a36cda7a3463093d18db78fce476de1a86297"),
        &hex!("6a91174076b1e0e19c39c031fe8685c1cae040e5c69a28ef"),
        &hex!("469a28ef7c28cca3dc721d044f4496bcca7ef4146fbf25c9"),
        &hex!("c0a0647eaab6a48753b033c56cb0f0900a2f5c4853375fd6"),
        &hex!("14b690866abd5bb88b5f4828c1490002e6773fa2fa299b8f"),
        &hex!("c302f41d932a36cda7a3462f9e9e916b5be8f1029ac4acc1"),
    )
}

/// RFC 5639 brainpoolP224r1
pub fn brainpool_p224r1() -> EllipticCurve {
    curve(
        &hex!("d7c134aa264366862a18302575d1d787b09f075797da89f57ec8c0ff"),
        &hex!("68a5e62ca9ce6c1c299803a6c1530b514e182ad8b0042a59cad29f43"),
        &hex!("2580f63ccfe44138870713b1a92369e33e2135d266dbb372386c400b"),
        &hex!("0d9029ad2c7e5cf4340823b2a87dc68c9e4ce3174c1e6efdee12c07d"),
        &hex!("58aa56f772c0726f24c6b89e4ecdac24354b9e99caa3f6d3761402cd"),
        &hex!("d7c134aa264366862a18302575d0fb98d116bc4b6ddebca3a5a7939f"),
    )
}

/// RFC 5639 brainpoolP256r1
pub fn brainpool_p256r1() -> EllipticCurve {
    curve(
        &hex!("a9fb57dba1eea9bc3e660a909d838d726e3bf623d52620282013481d1f6e5377"),
        &hex!("7d5a0975fc2c3057eef67530417affe7fb8055c126dc5c6ce94a4b44f330b5d9"),
        &hex!("26dc5c6ce94a4b44f330b5d9bbd77cbf958416295cf7e1ce6bccdc18ff8c07b6"),
        &hex!("8bd2aeb9cb7e57cb2c4b482ffc81b7afb9de27e1e3bd23c23a4453bd9ace3262"),
        &hex!("547ef835c3dac4fd97f8461a14611dc9c27745132ded8e545c1d54c72f046997"),
        &hex!("a9fb57dba1eea9bc3e660a909d838d718c397aa3b561a6f7901e0e82974856a7"),
    )
}

/// RFC 5639 brainpoolP320r1
pub fn brainpool_p320r1() -> EllipticCurve {
    curve(
        &hex!("d35e472036bc4fb7e13c785ed201e065f98fcfa6f6f40def4f92b9ec7893ec28"
              "fcd412b1f1b32e27"),
        &hex!("3ee30b568fbab0f883ccebd46d3f3bb8a2a73513f5eb79da66190eb085ffa9f4"
              "92f375a97d860eb4"),
        &hex!("520883949dfdbc42d3ad198640688a6fe13f41349554b49acc31dccd88453981"
              "6f5eb4ac8fb1f1a6"),
        &hex!("43bd7e9afb53d8b85289bcc48ee5bfe6f20137d10a087eb6e7871e2a10a599c7"
              "10af8d0d39e20611"),
        &hex!("14fdd05545ec1cc8ab4093247f77275e0743ffed117182eaa9c77877aaac6ac7"
              "d35245d1692e8ee1"),
        &hex!("d35e472036bc4fb7e13c785ed201e065f98fcfa5b68f12a32d482ec7ee8658e9"
              "8691555b44c59311"),
    )
}

/// RFC 5639 brainpoolP384r1
pub fn brainpool_p384r1() -> EllipticCurve {
    curve(
        &hex!("8cb91e82a3386d280f5d6f7e50e641df152f7109ed5456b412b1da197fb71123"
              "acd3a729901d1a71874700133107ec53"),
        &hex!("7bc382c63d8c150c3c72080ace05afa0c2bea28e4fb22787139165efba91f90f"
              "8aa5814a503ad4eb04a8c7dd22ce2826"),
        &hex!("04a8c7dd22ce28268b39b55416f0447c2fb77de107dcd2a62e880ea53eeb62d5"
              "7cb4390295dbc9943ab78696fa504c11"),
        &hex!("1d1c64f068cf45ffa2a63a81b7c13f6b8847a3e77ef14fe3db7fcafe0cbd10e8"
              "e826e03436d646aaef87b2e247d4af1e"),
        &hex!("8abe1d7520f9c2a45cb1eb8e95cfd55262b70b29feec5864e19c054ff9912928"
              "0e4646217791811142820341263c5315"),
        &hex!("8cb91e82a3386d280f5d6f7e50e641df152f7109ed5456b31f166e6cac0425a7"
              "cf3ab6af6b7fc3103b883202e9046565"),
    )
}

/// RFC 5639 brainpoolP512r1
pub fn brainpool_p512r1() -> EllipticCurve {
    curve(
        &hex!("aadd9db8dbe9c48b3fd4e6ae33c9fc07cb308db3b3c9d20ed6639cca70330871"
              "7d4d9b009bc66842aecda12ae6a380e62881ff2f2d82c68528aa6056583a48f3"),
        &hex!("7830a3318b603b89e2327145ac234cc594cbdd8d3df91610a83441caea9863bc"
              "2ded5d5aa8253aa10a2ef1c98b9ac8b57f1117a72bf2c7b9e7c1ac4d77fc94ca"),
        &hex!("3df91610a83441caea9863bc2ded5d5aa8253aa10a2ef1c98b9ac8b57f1117a7"
              "2bf2c7b9e7c1ac4d77fc94cadc083e67984050b75ebae5dd2809bd638016f723"),
        &hex!("81aee4bdd82ed9645a21322e9c4c6a9385ed9f70b5d916c1b43b62eef4d0098e"
              "ff3b1f78e2d0d48d50d1687b93b97d5f7c6d5047406a5e688b352209bcb9f822"),
        &hex!("7dde385d566332ecc0eabfa9cf7822fdf209f70024a57b1aa000c55b881f8111"
              "b2dcde494a5f485e5bca4bd88a2763aed1ca2b2fa8f0540678cd1e0f3ad80892"),
        &hex!("aadd9db8dbe9c48b3fd4e6ae33c9fc07cb308db3b3c9d20ed6639cca70330870"
              "553e5c414ca92619418661197fac10471db1d381085ddaddb58796829ca90069"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_standardized_ids_resolve() {
        for id in [0, 1, 2, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18] {
            assert!(standardized_domain_parameters(id).is_some(), "id {id}");
        }
        for id in [3, 4, 5, 6, 7, 19, 255] {
            assert!(standardized_domain_parameters(id).is_none(), "id {id}");
        }
    }
}
