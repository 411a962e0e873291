//! RLC/MAC headers of data blocks.
//!
//! Basic (GPRS) headers are plain MSB-first octets. Enhanced (EGPRS) headers pack their fields least
//! significant bit first and split several of them across octet boundaries, so every field is declared
//! through crumbs computed from its LSB-first start bit.

use crate::schema::{Node, SchemaId, SchemaTable};

/// Handles of every header schema in the catalogue
#[derive(Debug, Clone, Copy)]
pub struct HeaderSchemas {
    pub gprs_dl_data: SchemaId,
    pub gprs_ul_data: SchemaId,
    /// Downlink EGPRS headers, indexed by header type - 1
    pub egprs_dl: [SchemaId; 3],
    /// Uplink EGPRS headers, indexed by header type - 1
    pub egprs_ul: [SchemaId; 3],
    /// First octet of an aligned downlink EGPRS data block
    pub egprs_dl_data_head: SchemaId,
    /// First octet of an aligned uplink EGPRS data block
    pub egprs_ul_data_head: SchemaId,
}

pub(super) fn add(table: &mut SchemaTable) -> HeaderSchemas {
    let gprs_dl_data = table.add("gprs_dl_data_header", vec![
        Node::fixed("payload_type", 2, 0b00),
        Node::uint("rrbp", 2),
        Node::uint("s_p", 1),
        Node::uint("usf", 3),
        Node::uint("pr", 2),
        Node::uint("tfi", 5),
        Node::uint("fbi", 1),
        Node::uint("bsn", 7),
        Node::uint("e", 1),
    ]);

    let gprs_ul_data = table.add("gprs_ul_data_header", vec![
        Node::fixed("payload_type", 2, 0b00),
        Node::uint("countdown_value", 4),
        Node::uint("si", 1),
        Node::uint("r", 1),
        Node::spare("spare", 1),
        Node::uint("pi", 1),
        Node::uint("tfi", 5),
        Node::uint("ti", 1),
        Node::uint("bsn", 7),
        Node::uint("e", 1),
    ]);

    let egprs_dl = [
        table.add("egprs_dl_header_type1", egprs_dl_common(vec![
            Node::lsb_first("bsn1", 14, 11),
            Node::lsb_first("bsn2_offset", 25, 10),
            Node::lsb_first("cps", 35, 5),
        ])),
        table.add("egprs_dl_header_type2", egprs_dl_common(vec![
            Node::lsb_first("bsn1", 14, 11),
            Node::lsb_first("cps", 25, 3),
        ])),
        table.add("egprs_dl_header_type3", egprs_dl_common(vec![
            Node::lsb_first("bsn1", 14, 11),
            Node::lsb_first("cps", 25, 4),
            Node::lsb_first("spb", 29, 2),
        ])),
    ];

    let egprs_ul = [
        table.add("egprs_ul_header_type1", egprs_ul_common(vec![
            Node::lsb_first("bsn1", 11, 11),
            Node::lsb_first("bsn2_offset", 22, 10),
            Node::lsb_first("cps", 32, 5),
            Node::lsb_first("rsb", 37, 1),
            Node::lsb_first("pi", 38, 1),
            Node::spare("spare", 7),
        ])),
        table.add("egprs_ul_header_type2", egprs_ul_common(vec![
            Node::lsb_first("bsn1", 11, 11),
            Node::lsb_first("cps", 22, 3),
            Node::lsb_first("rsb", 25, 1),
            Node::lsb_first("pi", 26, 1),
            Node::spare("spare", 10),
        ])),
        table.add("egprs_ul_header_type3", egprs_ul_common(vec![
            Node::lsb_first("bsn1", 11, 11),
            Node::lsb_first("cps", 22, 4),
            Node::lsb_first("spb", 26, 2),
            Node::lsb_first("rsb", 28, 1),
            Node::lsb_first("pi", 29, 1),
            Node::spare("spare", 1),
        ])),
    ];

    // After alignment the two leading data bits sit at the top of the first octet
    let egprs_dl_data_head = table.add("egprs_dl_data_head", vec![
        Node::uint("fbi", 1),
        Node::uint("e", 1),
        Node::fixed("spare", 6, 0),
    ]);
    let egprs_ul_data_head = table.add("egprs_ul_data_head", vec![
        Node::uint("ti", 1),
        Node::uint("e", 1),
        Node::fixed("spare", 6, 0),
    ]);

    HeaderSchemas { gprs_dl_data, gprs_ul_data, egprs_dl, egprs_ul, egprs_dl_data_head, egprs_ul_data_head }
}

fn egprs_dl_common(tail: Vec<Node>) -> Vec<Node> {
    let mut nodes = vec![
        Node::lsb_first("usf", 0, 3),
        Node::lsb_first("es_p", 3, 2),
        Node::lsb_first("rrbp", 5, 2),
        Node::lsb_first("tfi", 7, 5),
        Node::lsb_first("pr", 12, 2),
    ];
    nodes.extend(tail);
    nodes
}

fn egprs_ul_common(tail: Vec<Node>) -> Vec<Node> {
    let mut nodes = vec![
        Node::lsb_first("r", 0, 1),
        Node::lsb_first("si", 1, 1),
        Node::lsb_first("cv", 2, 4),
        Node::lsb_first("tfi", 6, 5),
    ];
    nodes.extend(tail);
    nodes
}
