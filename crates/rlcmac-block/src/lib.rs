//! Block-level handling of captured RLC/MAC radio blocks
//!
//! - coding: the basic and enhanced coding schemes and their block geometry
//! - framer: maps a capture length and direction to a coding scheme and data block positions
//! - align: octet-aligned copies of the non-aligned enhanced data blocks
//! - segmenter: splits a data area into PDU segments following its length indicators
//! - block_decoder: runs framing, header decoding, alignment and segmentation for one capture

pub mod align;
pub mod block_decoder;
pub mod coding;
pub mod framer;
pub mod segmenter;

pub use align::align_sub_block;
pub use block_decoder::{BlockDecoder, BlockKind, BlockReport, DataBlockReport, DecodedPart};
pub use coding::{CodingFamily, CodingScheme, HeaderType};
pub use framer::{BlockDescriptor, Framer, Framing, FramingHints, SubBlock, Target, UnsupportedFraming};
pub use segmenter::{
    AbandonReason, BlockStart, LengthIndicator, LiMeaning, PduSegment, SegmentKind, SegmentOutcome, SegmentRequest,
    Segmentation, segment,
};
