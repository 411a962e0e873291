mod common;

use common::{put_lsb_first, put_octets};
use rlcmac_block::{
    BlockDecoder, BlockKind, BlockReport, BlockStart, CodingScheme, FramingHints, HeaderType, SegmentKind,
    SegmentOutcome, Target,
};
use rlcmac_core::{Direction, debug};
use rlcmac_csn::Value;

fn decode(block: &[u8], direction: Direction) -> BlockReport {
    BlockDecoder::default().decode(block, direction, &FramingHints::default())
}

fn segments(outcome: Option<&SegmentOutcome>) -> Vec<(usize, usize, SegmentKind)> {
    outcome
        .and_then(SegmentOutcome::segmentation)
        .map(|s| s.segments.iter().map(|p| (p.offset, p.len, p.kind)).collect())
        .unwrap_or_default()
}

/// Enhanced LI octet
fn eli(len: u8, ext: bool) -> u8 {
    (len << 1) | ext as u8
}

#[test]
fn test_egprs_dl_mcs5_header_and_data_block() {
    debug::setup_logging_verbose();
    let mut block = vec![0u8; 61];
    put_lsb_first(&mut block, 0, 3, 3);
    put_lsb_first(&mut block, 7, 5, 21);
    put_lsb_first(&mut block, 14, 11, 1234);
    put_lsb_first(&mut block, 25, 3, 0b100);
    // E = 0, FBI = 1
    put_lsb_first(&mut block, 28, 2, 0b10);
    put_octets(&mut block, 30, &[eli(10, false), eli(127, true), 0xC1, 0xC2]);

    let report = decode(&block, Direction::Dl);
    let BlockReport::Block { descriptor, kind, header, data_blocks } = report else {
        panic!("block expected");
    };
    assert_eq!(descriptor.coding, CodingScheme::Mcs5);
    assert_eq!(descriptor.header, HeaderType::EgprsType2);
    assert_eq!(descriptor.sub_block_count(), 2);
    assert_eq!(descriptor.data_blocks[0].offset_bits, 22);
    assert_eq!(kind, BlockKind::Data);

    assert!(header.is_complete());
    assert_eq!(header.record.uint("usf"), Some(3));
    assert_eq!(header.record.uint("tfi"), Some(21));
    assert_eq!(header.record.uint("bsn1"), Some(1234));
    assert_eq!(header.record.uint("cps"), Some(0b100));

    assert_eq!(data_blocks.len(), 1);
    let data = &data_blocks[0];
    assert_eq!(data.data.len(), 56);
    assert_eq!(&data.data[2..4], &[0xC1, 0xC2]);
    let head = data.head.as_ref().unwrap();
    assert_eq!(head.record.uint("fbi"), Some(1));
    assert_eq!(head.record.uint("e"), Some(0));
    assert_eq!(
        segments(data.segments.as_ref()),
        vec![(2, 10, SegmentKind::Complete), (12, 44, SegmentKind::Filler)]
    );
}

#[test]
fn test_gprs_dl_data_block() {
    let mut block = vec![0x05, 0x0E, 10 << 1, 0x05];
    block.extend([0xAA; 19]);

    let report = decode(&block, Direction::Dl);
    let header = report.header().unwrap();
    assert_eq!(header.record.uint("usf"), Some(5));
    assert_eq!(header.record.uint("tfi"), Some(7));
    assert_eq!(header.record.uint("bsn"), Some(10));
    assert_eq!(header.record.uint("e"), Some(0));

    let data = &report.data_blocks()[0];
    assert_eq!(data.data.len(), 20);
    assert_eq!(
        segments(data.segments.as_ref()),
        vec![(1, 1, SegmentKind::Complete), (2, 18, SegmentKind::Filler)]
    );
}

#[test]
fn test_gprs_ul_data_block_with_tlli_and_pfi() {
    let mut block = vec![0x3C, 0x47, 0x07, 0xDE, 0xAD, 0xBE, 0xEF, 0x0B];
    block.extend([0u8; 15]);

    let report = decode(&block, Direction::Ul);
    let header = report.header().unwrap();
    assert_eq!(header.record.uint("countdown_value"), Some(15));
    assert_eq!(header.record.uint("tfi"), Some(3));
    assert_eq!(header.record.uint("ti"), Some(1));
    assert_eq!(header.record.uint("pi"), Some(1));

    let outcome = report.data_blocks()[0].segments.as_ref();
    let seg = outcome.and_then(SegmentOutcome::segmentation).unwrap();
    assert_eq!(seg.tlli, Some(0xDEADBEEF));
    assert_eq!(seg.pfi, Some(5));
    assert_eq!(segments(outcome), vec![(5, 15, SegmentKind::Continuing)]);
}

#[test]
fn test_egprs_ul_mcs1_with_tlli() {
    let mut block = vec![0u8; 27];
    put_lsb_first(&mut block, 1, 1, 1);
    put_lsb_first(&mut block, 2, 4, 15);
    put_lsb_first(&mut block, 6, 5, 9);
    put_lsb_first(&mut block, 11, 11, 100);
    put_lsb_first(&mut block, 29, 1, 1);
    // E = 1, TI = 1
    put_lsb_first(&mut block, 31, 2, 0b11);
    put_octets(&mut block, 33, &[0xDE, 0xAD, 0xBE, 0xEF, (9 << 1) | 1]);

    let report = decode(&block, Direction::Ul);
    let BlockReport::Block { descriptor, header, data_blocks, .. } = report else {
        panic!("block expected");
    };
    assert_eq!(descriptor.coding, CodingScheme::Mcs1);
    assert_eq!(header.record.uint("si"), Some(1));
    assert_eq!(header.record.uint("cv"), Some(15));
    assert_eq!(header.record.uint("tfi"), Some(9));
    assert_eq!(header.record.uint("bsn1"), Some(100));
    assert_eq!(header.record.uint("pi"), Some(1));

    let data = &data_blocks[0];
    assert_eq!(data.data.len(), 22);
    let head = data.head.as_ref().unwrap();
    assert_eq!(head.record.uint("ti"), Some(1));
    assert_eq!(head.record.uint("e"), Some(1));
    let seg = data.segments.as_ref().and_then(SegmentOutcome::segmentation).unwrap();
    assert_eq!(seg.start, BlockStart::Continuation);
    assert_eq!(seg.tlli, Some(0xDEADBEEF));
    assert_eq!(seg.pfi, Some(9));
    assert_eq!(segments(data.segments.as_ref()), vec![(5, 17, SegmentKind::Continuing)]);
}

fn mcs9_block() -> Vec<u8> {
    let mut block = vec![0u8; 155];
    put_lsb_first(&mut block, 14, 11, 2000);
    put_lsb_first(&mut block, 40, 1, 1);
    put_octets(&mut block, 42, &[0x11]);
    let second = 40 + 2 + 8 * 74;
    put_lsb_first(&mut block, second, 1, 1);
    put_octets(&mut block, second + 2, &[0x5A]);
    block
}

#[test]
fn test_egprs_dl_mcs9_two_data_blocks() {
    let report = decode(&mcs9_block(), Direction::Dl);
    assert_eq!(report.header().and_then(|h| h.record.uint("bsn1")), Some(2000));

    let blocks = report.data_blocks();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].sub_block.map(|s| s.start_bits()), Some(40));
    assert_eq!(blocks[1].sub_block.map(|s| s.start_bits()), Some(634));
    assert_eq!(blocks[0].data[0], 0x11);
    assert_eq!(blocks[1].data[0], 0x5A);
    for block in blocks {
        assert_eq!(segments(block.segments.as_ref()), vec![(0, 74, SegmentKind::Continuing)]);
    }
}

#[test]
fn test_target_selects_second_data_block() {
    let hints = FramingHints { coding: None, target: Target::Data(2) };
    let report = BlockDecoder::default().decode(&mcs9_block(), Direction::Dl, &hints);
    let blocks = report.data_blocks();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].index, 2);
    assert_eq!(blocks[0].data[0], 0x5A);
}

#[test]
fn test_egprs_dl_mcs6_with_padding() {
    let mut block = vec![0u8; 79];
    put_lsb_first(&mut block, 25, 3, 0b010);
    put_lsb_first(&mut block, 76, 1, 1);
    put_octets(&mut block, 78, &[0x77]);

    let BlockReport::Block { descriptor, data_blocks, .. } = decode(&block, Direction::Dl) else {
        panic!("block expected");
    };
    assert!(descriptor.padded);
    assert_eq!(descriptor.data_blocks[0].start_bits(), 76);
    assert_eq!(data_blocks[0].data.len(), 68);
    assert_eq!(data_blocks[0].data[0], 0x77);
}

#[test]
fn test_gprs_dl_control_block() {
    let mut block = vec![0x2Bu8; 23];
    block[0] = 0x47;
    block[1] = 0x94;

    let report = decode(&block, Direction::Dl);
    let BlockReport::Block { kind, header, data_blocks, .. } = report else {
        panic!("block expected");
    };
    assert_eq!(kind, BlockKind::Control);
    assert!(header.is_complete());
    assert_eq!(
        header.record.get("message").and_then(Value::branch),
        Some("packet_downlink_dummy_control_block")
    );
    assert!(data_blocks.is_empty());
}

#[test]
fn test_report_serializes_to_json() {
    let report = decode(&mcs9_block(), Direction::Dl);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["Block"]["descriptor"]["coding"], "Mcs9");
    assert_eq!(json["Block"]["header"]["record"]["bsn1"], 2000);
    assert!(report.to_string().contains("MCS9"));
}
