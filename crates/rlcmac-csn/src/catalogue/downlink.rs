//! Downlink RLC/MAC control blocks

use super::ies;
use crate::schema::{Branch, Node, SchemaId, SchemaTable, StopRule};

pub const PACKET_POLLING_REQUEST: u64 = 0b000100;
pub const PACKET_TBF_RELEASE: u64 = 0b001000;
pub const PACKET_ACCESS_REJECT: u64 = 0b100001;
pub const PACKET_DOWNLINK_DUMMY_CONTROL_BLOCK: u64 = 0b100101;

pub(super) fn add(table: &mut SchemaTable) -> SchemaId {
    let polling_request = table.add("packet_polling_request", vec![
        Node::uint("page_mode", 2),
        Node::union("id", vec![
            Branch::new("global_tfi", 1, 0b0, vec![ies::global_tfi("global_tfi")]),
            Branch::new("tlli", 2, 0b10, vec![Node::uint("tlli", 32)]),
            Branch::new("tqi", 3, 0b110, vec![Node::uint("tqi", 16)]),
        ]),
        Node::uint("type_of_ack", 1),
        Node::padding(),
    ]);

    let tbf_release = table.add("packet_tbf_release", vec![
        Node::uint("page_mode", 2),
        Node::fixed("distribution", 1, 0),
        ies::global_tfi("global_tfi"),
        Node::uint("uplink_release", 1),
        Node::uint("downlink_release", 1),
        Node::uint("tbf_release_cause", 4),
        Node::padding(),
    ]);

    let reject = table.add("reject_struct", vec![
        Node::union("id", vec![
            Branch::new("tlli", 1, 0b0, vec![Node::uint("tlli", 32)]),
            Branch::new("packet_request_reference", 2, 0b10, vec![
                ies::packet_request_reference("packet_request_reference"),
            ]),
            Branch::new("global_tfi", 2, 0b11, vec![ies::global_tfi("global_tfi")]),
        ]),
        Node::optional("wait", vec![
            Node::uint("wait_indication", 8),
            Node::uint("wait_indication_size", 1),
        ]),
    ]);
    let access_reject = table.add("packet_access_reject", vec![
        Node::uint("page_mode", 2),
        Node::reference("reject", reject),
        Node::array("additional_rejects", Node::reference("reject", reject), StopRule::Flagged),
        Node::padding(),
    ]);

    let dummy = table.add("packet_downlink_dummy_control_block", vec![
        Node::uint("page_mode", 2),
        Node::optional("persistence_levels", vec![
            Node::array("level", Node::uint("level", 4), StopRule::Fixed(4)),
        ]),
        Node::padding(),
    ]);

    table.add("dl_control_block", vec![
        Node::union("mac_header", vec![
            Branch::new("control", 2, 0b01, vec![
                Node::uint("rrbp", 2),
                Node::uint("s_p", 1),
                Node::uint("usf", 3),
            ]),
            Branch::new("control_optional_octets", 2, 0b10, vec![
                Node::uint("rrbp", 2),
                Node::uint("s_p", 1),
                Node::uint("usf", 3),
                Node::uint("rbsn", 1),
                Node::uint("rti", 5),
                Node::uint("fs", 1),
                Node::optional("ac", vec![
                    Node::uint("pr", 2),
                    Node::uint("tfi", 5),
                    Node::uint("d", 1),
                ]),
            ]),
        ]),
        Node::union("message", vec![
            Branch::refer("packet_polling_request", 6, PACKET_POLLING_REQUEST, polling_request),
            Branch::refer("packet_tbf_release", 6, PACKET_TBF_RELEASE, tbf_release),
            Branch::refer("packet_access_reject", 6, PACKET_ACCESS_REJECT, access_reject),
            Branch::refer("packet_downlink_dummy_control_block", 6, PACKET_DOWNLINK_DUMMY_CONTROL_BLOCK, dummy),
        ]),
    ])
}
