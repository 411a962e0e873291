use core::fmt;

use serde::Serialize;

/// Basic (GPRS) or enhanced (EGPRS) coding family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CodingFamily {
    Gprs,
    Egprs,
}

/// Coding identity of a radio block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CodingScheme {
    Cs1,
    Cs2,
    Cs3,
    Cs4,
    Mcs1,
    Mcs2,
    Mcs3,
    Mcs4,
    Mcs5,
    Mcs6,
    Mcs7,
    Mcs8,
    Mcs9,
}

/// Header layout of an enhanced block. Type 1 carries two data blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HeaderType {
    Gprs,
    EgprsType1,
    EgprsType2,
    EgprsType3,
}

impl CodingScheme {
    pub const ALL: [CodingScheme; 13] = [
        CodingScheme::Cs1,
        CodingScheme::Cs2,
        CodingScheme::Cs3,
        CodingScheme::Cs4,
        CodingScheme::Mcs1,
        CodingScheme::Mcs2,
        CodingScheme::Mcs3,
        CodingScheme::Mcs4,
        CodingScheme::Mcs5,
        CodingScheme::Mcs6,
        CodingScheme::Mcs7,
        CodingScheme::Mcs8,
        CodingScheme::Mcs9,
    ];

    pub fn family(self) -> CodingFamily {
        match self {
            CodingScheme::Cs1 | CodingScheme::Cs2 | CodingScheme::Cs3 | CodingScheme::Cs4 => CodingFamily::Gprs,
            _ => CodingFamily::Egprs,
        }
    }

    pub fn is_egprs(self) -> bool {
        self.family() == CodingFamily::Egprs
    }

    /// Captured block size in octets, the same for both directions
    pub fn block_len(self) -> usize {
        match self {
            CodingScheme::Cs1 => 23,
            CodingScheme::Cs2 => 34,
            CodingScheme::Cs3 => 40,
            CodingScheme::Cs4 => 54,
            CodingScheme::Mcs1 => 27,
            CodingScheme::Mcs2 => 33,
            CodingScheme::Mcs3 => 42,
            CodingScheme::Mcs4 => 49,
            CodingScheme::Mcs5 => 61,
            CodingScheme::Mcs6 => 79,
            CodingScheme::Mcs7 => 119,
            CodingScheme::Mcs8 => 143,
            CodingScheme::Mcs9 => 155,
        }
    }

    /// RLC data octets in one data block, LI octets included
    pub fn data_octets(self) -> usize {
        match self {
            CodingScheme::Cs1 => 20,
            CodingScheme::Cs2 => 30,
            CodingScheme::Cs3 => 36,
            CodingScheme::Cs4 => 50,
            CodingScheme::Mcs1 => 22,
            CodingScheme::Mcs2 => 28,
            CodingScheme::Mcs3 => 37,
            CodingScheme::Mcs4 => 44,
            CodingScheme::Mcs5 => 56,
            CodingScheme::Mcs6 => 74,
            CodingScheme::Mcs7 => 56,
            CodingScheme::Mcs8 => 68,
            CodingScheme::Mcs9 => 74,
        }
    }

    pub fn header_type(self) -> HeaderType {
        match self {
            CodingScheme::Cs1 | CodingScheme::Cs2 | CodingScheme::Cs3 | CodingScheme::Cs4 => HeaderType::Gprs,
            CodingScheme::Mcs1 | CodingScheme::Mcs2 | CodingScheme::Mcs3 | CodingScheme::Mcs4 => HeaderType::EgprsType3,
            CodingScheme::Mcs5 | CodingScheme::Mcs6 => HeaderType::EgprsType2,
            CodingScheme::Mcs7 | CodingScheme::Mcs8 | CodingScheme::Mcs9 => HeaderType::EgprsType1,
        }
    }

    /// Number of RLC data blocks carried by one radio block
    pub fn data_blocks(self) -> usize {
        match self.header_type() {
            HeaderType::EgprsType1 => 2,
            _ => 1,
        }
    }

    /// Coding scheme whose captured size is `len` octets
    pub fn from_block_len(len: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|cs| cs.block_len() == len)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cs| cs.to_string().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for CodingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CodingScheme::Cs1 => "CS1",
            CodingScheme::Cs2 => "CS2",
            CodingScheme::Cs3 => "CS3",
            CodingScheme::Cs4 => "CS4",
            CodingScheme::Mcs1 => "MCS1",
            CodingScheme::Mcs2 => "MCS2",
            CodingScheme::Mcs3 => "MCS3",
            CodingScheme::Mcs4 => "MCS4",
            CodingScheme::Mcs5 => "MCS5",
            CodingScheme::Mcs6 => "MCS6",
            CodingScheme::Mcs7 => "MCS7",
            CodingScheme::Mcs8 => "MCS8",
            CodingScheme::Mcs9 => "MCS9",
        };
        write!(f, "{}", name)
    }
}

impl HeaderType {
    /// Header size in bits, MAC and RLC parts together
    pub fn header_bits(self, direction: rlcmac_core::Direction) -> usize {
        use rlcmac_core::Direction::{Dl, Ul};
        match (self, direction) {
            (HeaderType::Gprs, _) => 24,
            (HeaderType::EgprsType1, Dl) => 40,
            (HeaderType::EgprsType2, Dl) => 28,
            (HeaderType::EgprsType3, Dl) => 31,
            (HeaderType::EgprsType1, Ul) => 46,
            (HeaderType::EgprsType2, Ul) => 37,
            (HeaderType::EgprsType3, Ul) => 31,
        }
    }

    /// 1-based enhanced header type number
    pub fn egprs_number(self) -> Option<usize> {
        match self {
            HeaderType::Gprs => None,
            HeaderType::EgprsType1 => Some(1),
            HeaderType::EgprsType2 => Some(2),
            HeaderType::EgprsType3 => Some(3),
        }
    }

    /// Whether the coding and puncturing scheme value announces a padded data block.
    /// Padded blocks carry the payload of a larger scheme retransmitted in a smaller one.
    pub fn cps_has_padding(self, cps: u64) -> bool {
        match self {
            // MCS-6 P1/P2 with padding
            HeaderType::EgprsType2 => matches!(cps, 0b010 | 0b011),
            // MCS-3 P1/P2/P3 with padding
            HeaderType::EgprsType3 => matches!(cps, 0b0110..=0b1000),
            HeaderType::Gprs | HeaderType::EgprsType1 => false,
        }
    }
}

impl fmt::Display for HeaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.egprs_number() {
            Some(n) => write!(f, "EGPRS header type {}", n),
            None => write!(f, "GPRS header"),
        }
    }
}


#[cfg(test)]
mod tests {
    use rlcmac_core::Direction;

    use super::*;

    #[test]
    fn test_block_lengths_unique() {
        for cs in CodingScheme::ALL {
            assert_eq!(CodingScheme::from_block_len(cs.block_len()), Some(cs));
        }
        assert_eq!(CodingScheme::from_block_len(60), None);
    }

    #[test]
    fn test_data_blocks_fit() {
        for cs in CodingScheme::ALL {
            for dir in [Direction::Ul, Direction::Dl] {
                let header = cs.header_type().header_bits(dir);
                let data = match cs.family() {
                    CodingFamily::Gprs => 8 * cs.data_octets(),
                    CodingFamily::Egprs => cs.data_blocks() * (2 + 8 * cs.data_octets()),
                };
                assert!(header + data <= cs.block_len() * 8, "{} {} does not fit", cs, dir);
            }
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(CodingScheme::from_name("mcs7"), Some(CodingScheme::Mcs7));
        assert_eq!(CodingScheme::from_name("CS2"), Some(CodingScheme::Cs2));
        assert_eq!(CodingScheme::from_name("mcs10"), None);
        assert_eq!(HeaderType::EgprsType2.to_string(), "EGPRS header type 2");
    }

    #[test]
    fn test_cps_padding() {
        assert!(HeaderType::EgprsType2.cps_has_padding(0b010));
        assert!(!HeaderType::EgprsType2.cps_has_padding(0b100));
        assert!(HeaderType::EgprsType3.cps_has_padding(0b0111));
        assert!(!HeaderType::EgprsType3.cps_has_padding(0b0000));
        assert!(!HeaderType::EgprsType1.cps_has_padding(0b010));
    }
}
