use core::fmt;
use core::ops::Range;

use serde::Serialize;

use rlcmac_core::{Direction, assert_warn};

use crate::coding::{CodingScheme, HeaderType};

/// Bits in front of each enhanced data block that belong to the header tail, not to the data
pub const SPARE_PREFIX_BITS: usize = 6;

/// Offset of the data area in a basic block, right after the 3 header octets
pub const GPRS_DATA_OFFSET: usize = 3;

/// Payload shift and shrink for padded enhanced blocks
pub const PADDING_BITS: usize = 48;

/// Which part of a block a call targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Target {
    #[default]
    All,
    Header,
    /// Data block by 1-based index
    Data(usize),
}

impl Target {
    pub fn includes_data(self, index: usize) -> bool {
        match self {
            Target::All => true,
            Target::Header => false,
            Target::Data(n) => n == index,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "all" => Some(Target::All),
            "header" => Some(Target::Header),
            "data1" => Some(Target::Data(1)),
            "data2" => Some(Target::Data(2)),
            _ => None,
        }
    }
}

/// Side-channel knowledge about a block. Without hints, length and direction decide the framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FramingHints {
    pub coding: Option<CodingScheme>,
    pub target: Target,
}

/// One enhanced data block inside a radio block.
/// `offset_bits` counts bits least significant first and points at the spare prefix in front of the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubBlock {
    /// 1-based data block index
    pub index: usize,
    pub offset_bits: usize,
    /// Data bits: the two leading flag bits followed by the data octets
    pub data_bits: usize,
}

impl SubBlock {
    /// First data bit
    pub fn start_bits(&self) -> usize {
        self.offset_bits + SPARE_PREFIX_BITS
    }

    /// Spare prefix plus data
    pub fn window_bits(&self) -> usize {
        SPARE_PREFIX_BITS + self.data_bits
    }

    /// Size of the aligned copy in octets
    pub fn aligned_len(&self) -> usize {
        self.window_bits().div_ceil(8)
    }

    /// Data octets after the two leading flag bits
    pub fn data_octets(&self) -> usize {
        self.data_bits.saturating_sub(2) / 8
    }

    fn padded(self) -> Self {
        SubBlock {
            index: self.index,
            offset_bits: self.offset_bits + PADDING_BITS,
            data_bits: self.data_bits.saturating_sub(PADDING_BITS),
        }
    }
}

/// Framing of one captured block, derived from its length and direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockDescriptor {
    pub coding: CodingScheme,
    pub direction: Direction,
    pub header: HeaderType,
    pub header_bits: usize,
    /// Captured length in bits
    pub len_bits: usize,
    /// Non-aligned data blocks of enhanced schemes. Empty for basic schemes, whose data area
    /// follows the header octet aligned.
    pub data_blocks: Vec<SubBlock>,
    /// Data blocks moved behind padding, as announced by the header
    pub padded: bool,
}

impl BlockDescriptor {
    pub fn new(coding: CodingScheme, direction: Direction, len_bits: usize) -> Self {
        let header = coding.header_type();
        let header_bits = header.header_bits(direction);
        let data_blocks = if coding.is_egprs() {
            let data_bits = 2 + 8 * coding.data_octets();
            (0..coding.data_blocks())
                .map(|k| SubBlock {
                    index: k + 1,
                    offset_bits: header_bits + k * data_bits - SPARE_PREFIX_BITS,
                    data_bits,
                })
                .collect()
        } else {
            Vec::new()
        };
        BlockDescriptor { coding, direction, header, header_bits, len_bits, data_blocks, padded: false }
    }

    /// Header plus data blocks
    pub fn sub_block_count(&self) -> usize {
        1 + self.data_blocks.len()
    }

    pub fn data_block(&self, index: usize) -> Option<&SubBlock> {
        self.data_blocks.iter().find(|b| b.index == index)
    }

    /// Octet range of the data area of a basic block
    pub fn gprs_data(&self) -> Option<Range<usize>> {
        if self.coding.is_egprs() {
            return None;
        }
        Some(GPRS_DATA_OFFSET..GPRS_DATA_OFFSET + self.coding.data_octets())
    }

    /// Bits the header and every data block need
    pub fn required_bits(&self) -> usize {
        match self.data_blocks.last() {
            Some(last) => last.start_bits() + last.data_bits,
            None => self.header_bits + 8 * self.coding.data_octets(),
        }
    }

    /// Descriptor for a block whose header announced padding
    pub fn with_padding(&self) -> Self {
        let mut padded = self.clone();
        if !self.padded {
            padded.data_blocks = self.data_blocks.iter().map(|b| b.padded()).collect();
            padded.padded = true;
        }
        padded
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Framing {
    /// Uplink access burst of 8 or 11 bits, captured in 1 or 2 octets
    AccessBurst { bits: usize },
    Block(BlockDescriptor),
}

/// No coding identity fits the captured length and direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnsupportedFraming {
    pub len: usize,
    pub direction: Direction,
    pub coding: Option<CodingScheme>,
}

impl fmt::Display for UnsupportedFraming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.coding {
            Some(cs) => write!(f, "{} octet {} block too short for {}", self.len, self.direction, cs),
            None => write!(f, "no coding scheme for a {} octet {} block", self.len, self.direction),
        }
    }
}

impl std::error::Error for UnsupportedFraming {}

/// Selects the framing of captured blocks
#[derive(Debug, Clone, Copy)]
pub struct Framer {
    pub accept_access_bursts: bool,
}

impl Default for Framer {
    fn default() -> Self {
        Framer { accept_access_bursts: true }
    }
}

impl Framer {
    pub fn new(accept_access_bursts: bool) -> Self {
        Framer { accept_access_bursts }
    }

    pub fn frame(&self, len: usize, direction: Direction, hints: &FramingHints) -> Result<Framing, UnsupportedFraming> {
        let unsupported = UnsupportedFraming { len, direction, coding: hints.coding };

        if direction.is_ul() && self.accept_access_bursts && hints.coding.is_none() {
            match len {
                1 => return Ok(Framing::AccessBurst { bits: 8 }),
                2 => return Ok(Framing::AccessBurst { bits: 11 }),
                _ => {}
            }
        }

        let coding = match hints.coding {
            Some(cs) => {
                assert_warn!(cs.block_len() == len, "{} block captured with {} octets", cs, len);
                cs
            }
            None => CodingScheme::from_block_len(len).ok_or(unsupported)?,
        };

        let descriptor = BlockDescriptor::new(coding, direction, len * 8);
        if descriptor.required_bits() > descriptor.len_bits {
            tracing::debug!("{}: need {} bits, have {}", unsupported, descriptor.required_bits(), descriptor.len_bits);
            return Err(unsupported);
        }

        tracing::debug!(
            "{} {} octets: {}, {}, {} sub-blocks",
            direction,
            len,
            coding,
            descriptor.header,
            descriptor.sub_block_count()
        );
        Ok(Framing::Block(descriptor))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn frame(len: usize, direction: Direction) -> Result<Framing, UnsupportedFraming> {
        Framer::default().frame(len, direction, &FramingHints::default())
    }

    fn descriptor(len: usize, direction: Direction) -> BlockDescriptor {
        match frame(len, direction) {
            Ok(Framing::Block(d)) => d,
            other => panic!("unexpected framing {:?}", other),
        }
    }

    #[test]
    fn test_enhanced_type2_downlink_61_octets() {
        let d = descriptor(61, Direction::Dl);
        assert_eq!(d.coding, CodingScheme::Mcs5);
        assert_eq!(d.header, HeaderType::EgprsType2);
        assert_eq!(d.sub_block_count(), 2);
        let first = d.data_block(1).unwrap();
        assert_eq!(first.start_bits(), 28);
        assert_eq!(first.offset_bits, 22);
        assert_eq!(first.data_bits, 2 + 8 * 56);
    }

    #[test]
    fn test_type1_has_two_data_blocks() {
        let d = descriptor(155, Direction::Ul);
        assert_eq!(d.coding, CodingScheme::Mcs9);
        assert_eq!(d.sub_block_count(), 3);
        assert_eq!(d.data_blocks[0].start_bits(), 46);
        assert_eq!(d.data_blocks[1].start_bits(), 46 + 2 + 8 * 74);
    }

    #[test]
    fn test_basic_block() {
        let d = descriptor(23, Direction::Dl);
        assert_eq!(d.coding, CodingScheme::Cs1);
        assert_eq!(d.sub_block_count(), 1);
        assert_eq!(d.gprs_data(), Some(3..23));
    }

    #[test]
    fn test_access_bursts() {
        assert_eq!(frame(1, Direction::Ul), Ok(Framing::AccessBurst { bits: 8 }));
        assert_eq!(frame(2, Direction::Ul), Ok(Framing::AccessBurst { bits: 11 }));
        assert!(frame(2, Direction::Dl).is_err());
        assert!(Framer::new(false).frame(1, Direction::Ul, &FramingHints::default()).is_err());
    }

    #[test]
    fn test_unknown_length_is_unsupported() {
        assert_eq!(frame(60, Direction::Dl), Err(UnsupportedFraming { len: 60, direction: Direction::Dl, coding: None }));
    }

    #[test]
    fn test_coding_hint() {
        let hints = FramingHints { coding: Some(CodingScheme::Cs2), target: Target::All };
        // Hinted scheme wins over the captured length when the block is long enough
        let framing = Framer::default().frame(40, Direction::Dl, &hints).unwrap();
        assert!(matches!(framing, Framing::Block(d) if d.coding == CodingScheme::Cs2));
        // Too short for the hinted scheme
        let err = Framer::default().frame(23, Direction::Dl, &hints).unwrap_err();
        assert_eq!(err.coding, Some(CodingScheme::Cs2));
    }

    #[test]
    fn test_padding_moves_data() {
        let d = descriptor(79, Direction::Dl);
        assert_eq!(d.coding, CodingScheme::Mcs6);
        let padded = d.with_padding();
        assert_eq!(padded.data_blocks[0].offset_bits, d.data_blocks[0].offset_bits + 48);
        assert_eq!(padded.data_blocks[0].data_octets(), 68);
        // Applying twice changes nothing
        assert_eq!(padded.with_padding(), padded);
    }

    #[test]
    fn test_target_names() {
        assert_eq!(Target::from_name("data2"), Some(Target::Data(2)));
        assert!(Target::Data(1).includes_data(1));
        assert!(!Target::Data(1).includes_data(2));
        assert!(!Target::Header.includes_data(1));
    }
}
