use core::fmt;

use serde::Serialize;

use rlcmac_config::DecoderConfig;
use rlcmac_core::{BitCursor, DecodeErr, Direction, ViolationKind};
use rlcmac_csn::{Catalogue, DecodedRecord, Decoder, SchemaId, catalogue};

use crate::align::align_sub_block;
use crate::coding::CodingFamily;
use crate::framer::{BlockDescriptor, Framer, Framing, FramingHints, SubBlock, Target, UnsupportedFraming};
use crate::segmenter::{SegmentOutcome, SegmentRequest, segment};

/// Payload type of a basic block, the two leading bits of octet 0
const PAYLOAD_TYPE_DATA: u8 = 0b00;
const PAYLOAD_TYPE_CONTROL: u8 = 0b01;
const PAYLOAD_TYPE_CONTROL_OPT: u8 = 0b10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockKind {
    Data,
    Control,
    /// Payload type value reserved for future use, left undecoded
    Reserved,
}

/// Result of decoding one schema, with the partial record kept on failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedPart {
    pub record: DecodedRecord,
    pub error: Option<DecodeErr>,
}

impl DecodedPart {
    fn new(record: DecodedRecord, result: Result<(), DecodeErr>) -> Self {
        if let Err(ref e) = result {
            tracing::warn!("partial decode: {}", e);
        }
        DecodedPart { record, error: result.err() }
    }

    fn failed(error: DecodeErr) -> Self {
        tracing::warn!("not decoded: {}", error);
        DecodedPart { record: DecodedRecord::new(), error: Some(error) }
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// One RLC data block of a radio block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataBlockReport {
    /// 1-based data block index
    pub index: usize,
    /// Position inside the radio block, enhanced blocks only
    pub sub_block: Option<SubBlock>,
    /// FBI/TI and E bits of an enhanced data block
    pub head: Option<DecodedPart>,
    /// Data area: indicators, extras and payload
    pub data: Vec<u8>,
    /// None when the E bit could not be decoded
    pub segments: Option<SegmentOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BlockReport {
    /// No framing fits; the capture is left undecoded
    Opaque(UnsupportedFraming),
    AccessBurst { bits: usize, value: u64 },
    Block {
        descriptor: BlockDescriptor,
        kind: BlockKind,
        header: DecodedPart,
        data_blocks: Vec<DataBlockReport>,
    },
}

impl BlockReport {
    pub fn header(&self) -> Option<&DecodedPart> {
        match self {
            BlockReport::Block { header, .. } => Some(header),
            _ => None,
        }
    }

    pub fn data_blocks(&self) -> &[DataBlockReport] {
        match self {
            BlockReport::Block { data_blocks, .. } => data_blocks,
            _ => &[],
        }
    }
}

/// Fields steering segmentation, taken from the header and the data block head
#[derive(Debug, Clone, Copy, Default)]
struct SegmentFlags {
    ext: Option<bool>,
    tlli: bool,
    pfi: bool,
}

/// Frames, decodes and segments captured radio blocks against the process-wide catalogue
#[derive(Debug, Clone)]
pub struct BlockDecoder {
    catalogue: &'static Catalogue,
    framer: Framer,
    decoder: Decoder<'static>,
    decode_data_blocks: bool,
}

impl Default for BlockDecoder {
    fn default() -> Self {
        Self::new(&DecoderConfig::default())
    }
}

impl BlockDecoder {
    pub fn new(config: &DecoderConfig) -> Self {
        let catalogue = catalogue();
        BlockDecoder {
            catalogue,
            framer: Framer::new(config.framing.accept_access_bursts),
            decoder: catalogue.decoder(config.decoder.limits()),
            decode_data_blocks: config.framing.decode_data_blocks,
        }
    }

    pub fn decode(&self, bytes: &[u8], direction: Direction, hints: &FramingHints) -> BlockReport {
        let descriptor = match self.framer.frame(bytes.len(), direction, hints) {
            Ok(Framing::Block(d)) => d,
            Ok(Framing::AccessBurst { bits }) => return access_burst(bytes, bits),
            Err(e) => {
                tracing::warn!("{}", e);
                return BlockReport::Opaque(e);
            }
        };

        match descriptor.coding.family() {
            CodingFamily::Gprs => self.decode_gprs(bytes, descriptor, hints.target),
            CodingFamily::Egprs => self.decode_egprs(bytes, descriptor, hints.target),
        }
    }

    fn decode_gprs(&self, bytes: &[u8], descriptor: BlockDescriptor, target: Target) -> BlockReport {
        let payload_type = bytes.first().map(|b| b >> 6).unwrap_or(PAYLOAD_TYPE_DATA);
        let headers = &self.catalogue.headers;

        let (kind, schema) = match (payload_type, descriptor.direction) {
            (PAYLOAD_TYPE_DATA, Direction::Dl) => (BlockKind::Data, headers.gprs_dl_data),
            (PAYLOAD_TYPE_DATA, Direction::Ul) => (BlockKind::Data, headers.gprs_ul_data),
            (PAYLOAD_TYPE_CONTROL | PAYLOAD_TYPE_CONTROL_OPT, Direction::Dl) => {
                (BlockKind::Control, self.catalogue.dl_control_block)
            }
            (PAYLOAD_TYPE_CONTROL, Direction::Ul) => (BlockKind::Control, self.catalogue.ul_control_block),
            _ => {
                let header = DecodedPart::failed(DecodeErr::violation(
                    "payload_type",
                    ViolationKind::NoMatchingBranch { found: payload_type as u64 },
                ));
                return BlockReport::Block { descriptor, kind: BlockKind::Reserved, header, data_blocks: Vec::new() };
            }
        };

        // Control messages run to the end of the block; data headers stop after their own bits
        let mut cursor = match kind {
            BlockKind::Data => BitCursor::with_len_bits(bytes, descriptor.header_bits),
            _ => BitCursor::new(bytes),
        };
        let header = self.decode_part(schema, &mut cursor);

        let mut data_blocks = Vec::new();
        if kind == BlockKind::Data && self.decode_data_blocks && target.includes_data(1) {
            if let Some(range) = descriptor.gprs_data() {
                let data = bytes.get(range).unwrap_or(&[]).to_vec();
                let flags = SegmentFlags {
                    ext: header.record.uint("e").map(|e| e == 1),
                    tlli: header.record.uint("ti") == Some(1),
                    pfi: header.record.uint("pi") == Some(1),
                };
                let segments = segment_data(CodingFamily::Gprs, &data, flags);
                data_blocks.push(DataBlockReport { index: 1, sub_block: None, head: None, data, segments });
            }
        }

        BlockReport::Block { descriptor, kind, header, data_blocks }
    }

    fn decode_egprs(&self, bytes: &[u8], descriptor: BlockDescriptor, target: Target) -> BlockReport {
        let Some(header_type) = descriptor.header.egprs_number() else {
            return BlockReport::Opaque(UnsupportedFraming {
                len: bytes.len(),
                direction: descriptor.direction,
                coding: Some(descriptor.coding),
            });
        };
        let headers = &self.catalogue.headers;
        let (schema, head_schema) = match descriptor.direction {
            Direction::Dl => (headers.egprs_dl[header_type - 1], headers.egprs_dl_data_head),
            Direction::Ul => (headers.egprs_ul[header_type - 1], headers.egprs_ul_data_head),
        };

        let mut cursor = BitCursor::with_len_bits(bytes, descriptor.header_bits);
        let header = self.decode_part(schema, &mut cursor);

        let descriptor = match header.record.uint("cps") {
            Some(cps) if descriptor.header.cps_has_padding(cps) => {
                tracing::debug!("CPS {:#b} announces padding", cps);
                descriptor.with_padding()
            }
            _ => descriptor,
        };

        let mut data_blocks = Vec::new();
        if self.decode_data_blocks {
            let pfi = header.record.uint("pi") == Some(1);
            for sub in descriptor.data_blocks.iter().filter(|b| target.includes_data(b.index)) {
                data_blocks.push(self.decode_egprs_data_block(bytes, sub, head_schema, pfi));
            }
        }

        BlockReport::Block { descriptor, kind: BlockKind::Data, header, data_blocks }
    }

    fn decode_egprs_data_block(&self, bytes: &[u8], sub: &SubBlock, head_schema: SchemaId, pfi: bool) -> DataBlockReport {
        let aligned = align_sub_block(bytes, sub);
        let (head_octet, data) = aligned.split_at(usize::min(1, aligned.len()));

        let head = self.decode_part(head_schema, &mut BitCursor::new(head_octet));
        let flags = SegmentFlags {
            ext: head.record.uint("e").map(|e| e == 1),
            tlli: head.record.uint("ti") == Some(1),
            pfi,
        };
        let segments = segment_data(CodingFamily::Egprs, data, flags);

        DataBlockReport { index: sub.index, sub_block: Some(*sub), head: Some(head), data: data.to_vec(), segments }
    }

    fn decode_part(&self, schema: SchemaId, cursor: &mut BitCursor<'_>) -> DecodedPart {
        let (record, result) = self.decoder.decode_record(schema, cursor);
        DecodedPart::new(record, result)
    }
}

fn access_burst(bytes: &[u8], bits: usize) -> BlockReport {
    let value = BitCursor::new(bytes).read_bits(bits).unwrap_or(0);
    tracing::debug!("{} bit access burst {:#x}", bits, value);
    BlockReport::AccessBurst { bits, value }
}

fn segment_data(family: CodingFamily, data: &[u8], flags: SegmentFlags) -> Option<SegmentOutcome> {
    let Some(ext) = flags.ext else {
        tracing::warn!("E bit not decoded, payload left unsegmented");
        return None;
    };
    let req = SegmentRequest::new(family, data, ext).with_extras(flags.tlli, flags.pfi);
    Some(segment(&req))
}

impl fmt::Display for DecodedPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.record)?;
        if let Some(ref e) = self.error {
            writeln!(f, "error: {}", e)?;
        }
        Ok(())
    }
}

impl fmt::Display for BlockReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReport::Opaque(e) => writeln!(f, "opaque block: {}", e),
            BlockReport::AccessBurst { bits, value } => writeln!(f, "{} bit access burst: {:#x}", bits, value),
            BlockReport::Block { descriptor, kind, header, data_blocks } => {
                writeln!(
                    f,
                    "{} {} {:?} block, {}{}",
                    descriptor.direction,
                    descriptor.coding,
                    kind,
                    descriptor.header,
                    if descriptor.padded { ", padded" } else { "" }
                )?;
                match kind {
                    BlockKind::Control => writeln!(f, "-- control message")?,
                    _ => writeln!(f, "-- header")?,
                }
                write!(f, "{}", header)?;
                for block in data_blocks {
                    match block.sub_block {
                        Some(sub) => writeln!(f, "-- data block {} at bit {}", block.index, sub.start_bits())?,
                        None => writeln!(f, "-- data block {}", block.index)?,
                    }
                    if let Some(ref head) = block.head {
                        write!(f, "{}", head)?;
                    }
                    match block.segments {
                        Some(ref s) => writeln!(f, "{}", s)?,
                        None => writeln!(f, "unsegmented")?,
                    }
                }
                Ok(())
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use rlcmac_core::debug;

    use super::*;
    use crate::coding::CodingScheme;

    #[test]
    fn test_unsupported_length_is_opaque() {
        debug::setup_logging_verbose();
        let report = BlockDecoder::default().decode(&[0u8; 60], Direction::Dl, &FramingHints::default());
        assert!(matches!(report, BlockReport::Opaque(UnsupportedFraming { len: 60, .. })));
    }

    #[test]
    fn test_access_burst_value() {
        let report = BlockDecoder::default().decode(&[0xAB, 0xE0], Direction::Ul, &FramingHints::default());
        assert_eq!(report, BlockReport::AccessBurst { bits: 11, value: 0b101_0101_1111 });
    }

    #[test]
    fn test_reserved_payload_type() {
        let mut block = [0x2Bu8; 23];
        block[0] = 0b1100_0000;
        let report = BlockDecoder::default().decode(&block, Direction::Dl, &FramingHints::default());
        match report {
            BlockReport::Block { kind, header, data_blocks, .. } => {
                assert_eq!(kind, BlockKind::Reserved);
                assert!(header.error.is_some());
                assert!(data_blocks.is_empty());
            }
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[test]
    fn test_header_target_skips_data() {
        let hints = FramingHints { coding: None, target: Target::Header };
        let report = BlockDecoder::default().decode(&[0u8; 155], Direction::Dl, &hints);
        assert!(report.header().is_some());
        assert!(report.data_blocks().is_empty());
    }

    #[test]
    fn test_data_blocks_disabled_by_config() {
        let mut cfg = DecoderConfig::default();
        cfg.framing.decode_data_blocks = false;
        let hints = FramingHints { coding: Some(CodingScheme::Cs1), target: Target::All };
        let report = BlockDecoder::new(&cfg).decode(&[0u8; 23], Direction::Ul, &hints);
        assert!(report.header().is_some_and(DecodedPart::is_complete));
        assert!(report.data_blocks().is_empty());
    }
}
