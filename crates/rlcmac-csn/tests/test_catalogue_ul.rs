mod common;

use common::BitVecBuilder;
use rlcmac_core::{BitCursor, DecodeErr, debug};
use rlcmac_csn::catalogue::{MS_ACCESS_CAPABILITIES_CODEC, uplink};
use rlcmac_csn::{CodecRegistry, DecodedRecord, Decoder, DecoderLimits, ExternalCodec, Value, catalogue};

fn decode_ul_control(block: &[u8]) -> (DecodedRecord, Result<(), DecodeErr>) {
    let cat = catalogue();
    let mut cursor = BitCursor::new(block);
    cat.decoder(DecoderLimits::default()).decode_record(cat.ul_control_block, &mut cursor)
}

fn mac_header() -> BitVecBuilder {
    BitVecBuilder::new().put(0b01, 2).put(0, 5).put(0, 1)
}

#[test]
fn test_control_ack_without_release_additions() {
    debug::setup_logging_verbose();
    let block = mac_header()
        .put(uplink::PACKET_CONTROL_ACKNOWLEDGEMENT, 6)
        .put(0xC0FFEE01, 32)
        .put(0b11, 2)
        .bits("0")
        .into_block(23);

    let (rec, res) = decode_ul_control(&block);
    res.unwrap();
    let msg = "message.packet_control_acknowledgement";
    assert_eq!(rec.uint(&format!("{msg}.tlli")), Some(0xC0FFEE01));
    assert_eq!(rec.uint(&format!("{msg}.ctrl_ack")), Some(3));
    let levels = rec.get(&format!("{msg}.additions")).and_then(Value::as_list).unwrap();
    assert_eq!(levels.len(), 2);
    assert!(levels.iter().all(Value::is_absent));
}

#[test]
fn test_control_ack_with_release_additions() {
    let block = mac_header()
        .put(uplink::PACKET_CONTROL_ACKNOWLEDGEMENT, 6)
        .put(0x01020304, 32)
        .put(0b01, 2)
        .bits("1").put(5, 3).put(9, 4)
        .bits("1").put(300, 9)
        .into_block(23);

    let (rec, res) = decode_ul_control(&block);
    res.unwrap();
    let msg = "message.packet_control_acknowledgement";
    assert_eq!(rec.uint(&format!("{msg}.additions.0.tn_rrbp")), Some(5));
    assert_eq!(rec.uint(&format!("{msg}.additions.0.g_rnti_extension")), Some(9));
    assert_eq!(rec.uint(&format!("{msg}.additions.1.ctrl_ack_extension")), Some(300));
}

#[test]
fn test_downlink_ack_nack() {
    let block = mac_header()
        .put(uplink::PACKET_DOWNLINK_ACK_NACK, 6)
        .put(12, 5)
        .put(1, 1).put(100, 7).put(0xF0F0_0000_FFFF_0001, 64)
        .bits("1").put(3, 4).put(1, 2).put(0, 1).put(1, 1).put(1500, 16)
        .put(40, 6).put(2, 3).put(7, 6)
        .bits("1").put(11, 4).bits("0000000")
        .bits("1").bits("1").put(66, 7)
        .into_block(23);

    let (rec, res) = decode_ul_control(&block);
    res.unwrap();
    let msg = "message.packet_downlink_ack_nack";
    assert_eq!(rec.uint(&format!("{msg}.downlink_tfi")), Some(12));
    assert_eq!(rec.uint(&format!("{msg}.ack_nack_description.starting_sequence_number")), Some(100));
    let bitmap = rec.bits(&format!("{msg}.ack_nack_description.received_block_bitmap")).unwrap();
    assert_eq!(bitmap.len(), 64);
    assert_eq!(bitmap.count_ones(), 8 + 16 + 1);
    assert_eq!(rec.uint(&format!("{msg}.channel_request_description.rlc_octet_count")), Some(1500));
    assert_eq!(rec.uint(&format!("{msg}.channel_quality_report.c_value")), Some(40));
    assert_eq!(rec.uint(&format!("{msg}.channel_quality_report.i_level.0.i_level")), Some(11));
    assert!(rec.get(&format!("{msg}.channel_quality_report.i_level.7")).is_some_and(Value::is_absent));
    assert_eq!(rec.uint(&format!("{msg}.additions.0.pfi.pfi")), Some(66));
}

#[test]
fn test_egprs_ack_nack_filling_the_block() {
    let block = mac_header()
        .put(uplink::EGPRS_PACKET_DOWNLINK_ACK_NACK, 6)
        .put(3, 5)
        .put(0, 1)
        .bits("0000")
        .bits("0")
        .put(1, 1).put(0, 1).put(1, 1).put(1234, 11)
        .bits("0")
        .into_block(23);

    let (rec, res) = decode_ul_control(&block);
    res.unwrap();
    let desc = "message.egprs_packet_downlink_ack_nack.egprs_ack_nack_description";
    assert_eq!(rec.get(desc).and_then(Value::branch), Some("fills_block"));
    assert_eq!(rec.uint(&format!("{desc}.description.starting_sequence_number")), Some(1234));
    assert!(rec.get(&format!("{desc}.description.compressed")).is_some_and(Value::is_absent));
    // Left-aligned bitmap runs to the end of the block
    let bitmap = rec.bits(&format!("{desc}.description.uncompressed_received_block_bitmap")).unwrap();
    assert_eq!(bitmap.len(), 23 * 8 - 40);
}

#[test]
fn test_egprs_ack_nack_length_prefixed() {
    let description = BitVecBuilder::new()
        .put(0, 1).put(1, 1).put(0, 1).put(2047, 11)
        .bits("1").put(5, 7).put(1, 1).bits("10110")
        .bits("1111100000");
    assert_eq!(description.len(), 38);

    let block = mac_header()
        .put(uplink::EGPRS_PACKET_DOWNLINK_ACK_NACK, 6)
        .put(30, 5)
        .put(1, 1)
        // Channel quality report with GMSK BEP and one per-timeslot BEP
        .bits("1")
        .bits("1").put(20, 5).put(3, 3)
        .bits("0")
        .put(40, 6)
        .bits("1").bits("1").bits("0").put(5, 4).bits("0000000")
        .bits("0")
        .bits("0")
        .bits("0")
        // Extension bits: length 3 announces 4 bits
        .bits("1").put(3, 6).bits("1010")
        .bits("1").put(38, 8).bits(description.as_str())
        .into_block(23);

    let (rec, res) = decode_ul_control(&block);
    res.unwrap();
    let msg = "message.egprs_packet_downlink_ack_nack";
    assert_eq!(rec.uint(&format!("{msg}.ms_out_of_memory")), Some(1));
    assert_eq!(rec.uint(&format!("{msg}.egprs_channel_quality_report.gmsk.mean_bep")), Some(20));
    assert_eq!(
        rec.get(&format!("{msg}.egprs_channel_quality_report.bep_measurements.tn.0.mean_bep")).and_then(Value::branch),
        Some("gmsk")
    );
    assert_eq!(
        rec.uint(&format!("{msg}.egprs_channel_quality_report.bep_measurements.tn.0.mean_bep.mean_bep")),
        Some(5)
    );
    assert_eq!(rec.bits(&format!("{msg}.extension_bits.bits")).map(|b| b.to_bitstr()), Some("1010".to_string()));

    let desc = format!("{msg}.egprs_ack_nack_description");
    assert_eq!(rec.get(&desc).and_then(Value::branch), Some("length_prefixed"));
    assert_eq!(rec.uint(&format!("{desc}.description_length")), Some(38));
    assert_eq!(rec.uint(&format!("{desc}.description.starting_sequence_number")), Some(2047));
    assert_eq!(
        rec.bits(&format!("{desc}.description.compressed.received_block_bitmap")).map(|b| b.to_bitstr()),
        Some("10110".to_string())
    );
    // The remaining-width bitmap stops at the end of the length-prefixed window
    assert_eq!(
        rec.bits(&format!("{desc}.description.uncompressed_received_block_bitmap")).map(|b| b.to_bitstr()),
        Some("1111100000".to_string())
    );
}

fn resource_request_block() -> Vec<u8> {
    mac_header()
        .put(uplink::PACKET_RESOURCE_REQUEST, 6)
        .bits("1").put(2, 2)
        .bits("1").put(0xAABBCCDD, 32)
        // MS radio access capability: two access technologies
        .bits("1")
        .put(1, 4).put(10, 7).bits("1100110011")
        .bits("1")
        .put(3, 4).put(3, 7).bits("101")
        .bits("0")
        .put(4, 4).put(2, 2).put(1, 1).put(0, 1).put(800, 16)
        .bits("0")
        .put(33, 6)
        .bits("0")
        .bits("00000000")
        .into_block(23)
}

#[test]
fn test_resource_request_keeps_unregistered_capabilities_raw() {
    let (rec, res) = decode_ul_control(&resource_request_block());
    res.unwrap();
    let msg = "message.packet_resource_request";
    assert_eq!(rec.uint(&format!("{msg}.access_type.access_type")), Some(2));
    assert_eq!(rec.uint(&format!("{msg}.id.tlli")), Some(0xAABBCCDD));

    let rac = format!("{msg}.ms_radio_access_capability.value_part");
    assert_eq!(rec.uint(&format!("{rac}.access_technology_type")), Some(1));
    assert_eq!(rec.uint(&format!("{rac}.length")), Some(10));
    assert_eq!(
        rec.bits(&format!("{rac}.access_capabilities")).map(|b| b.to_bitstr()),
        Some("1100110011".to_string())
    );
    assert_eq!(rec.uint(&format!("{rac}.next.value_part.access_technology_type")), Some(3));
    assert!(rec.get(&format!("{rac}.next.value_part.next")).is_some_and(Value::is_absent));

    assert_eq!(rec.uint(&format!("{msg}.channel_request_description.rlc_octet_count")), Some(800));
    assert_eq!(rec.uint(&format!("{msg}.c_value")), Some(33));
}

struct CountOnes;

impl ExternalCodec for CountOnes {
    fn decode(&self, _decoder: &Decoder<'_>, cursor: &mut BitCursor<'_>) -> Result<Value, DecodeErr> {
        let n = cursor.remaining_bits();
        Ok(Value::UInt(cursor.read_bitmap(n, "capabilities")?.count_ones() as u64))
    }
}

#[test]
fn test_resource_request_with_registered_capabilities_codec() {
    let cat = catalogue();
    let mut codecs = CodecRegistry::new();
    codecs.register(MS_ACCESS_CAPABILITIES_CODEC, Box::new(CountOnes));
    let decoder = Decoder::new(&cat.table).with_codecs(&codecs);

    let block = resource_request_block();
    let (rec, res) = decoder.decode_record(cat.ul_control_block, &mut BitCursor::new(&block));
    res.unwrap();
    let rac = "message.packet_resource_request.ms_radio_access_capability.value_part";
    assert_eq!(rec.uint(&format!("{rac}.access_capabilities")), Some(6));
    assert_eq!(rec.uint(&format!("{rac}.next.value_part.access_capabilities")), Some(2));
}
