//! Information elements shared by several messages

use crate::schema::{Branch, Node, SchemaId, SchemaTable, StopRule, Width};

/// Global TFI IE: the TFI of either an uplink or a downlink TBF
pub fn global_tfi(id: &'static str) -> Node {
    Node::union(id, vec![
        Branch::new("uplink", 1, 0, vec![Node::uint("uplink_tfi", 5)]),
        Branch::new("downlink", 1, 1, vec![Node::uint("downlink_tfi", 5)]),
    ])
}

pub fn packet_request_reference(id: &'static str) -> Node {
    Node::structure(id, vec![
        Node::uint("random_access_information", 11),
        Node::uint("frame_number", 16),
    ])
}

pub fn channel_request_description(id: &'static str) -> Node {
    Node::structure(id, channel_request_description_fields())
}

pub fn channel_request_description_fields() -> Vec<Node> {
    vec![
        Node::uint("peak_throughput_class", 4),
        Node::uint("radio_priority", 2),
        Node::uint("rlc_mode", 1),
        Node::uint("llc_pdu_type", 1),
        Node::uint("rlc_octet_count", 16),
    ]
}

pub fn ack_nack_description(id: &'static str) -> Node {
    Node::structure(id, vec![
        Node::uint("final_ack_indication", 1),
        Node::uint("starting_sequence_number", 7),
        Node::bitmap("received_block_bitmap", Width::Fixed(64)),
    ])
}

/// Eight `{ 0 | 1 <value> }` entries, one per timeslot
pub fn per_timeslot(id: &'static str, field: &'static str, bits: usize) -> Node {
    Node::array(id, Node::optional("tn", vec![Node::uint(field, bits)]), StopRule::Fixed(8))
}

pub fn channel_quality_report(id: &'static str) -> Node {
    Node::structure(id, vec![
        Node::uint("c_value", 6),
        Node::uint("rxqual", 3),
        Node::uint("sign_var", 6),
        per_timeslot("i_level", "i_level", 4),
    ])
}

/// MS Radio Access Capability value part. Each access technology entry may be followed by another one,
/// so the schema refers to itself. The capability bits are length-prefixed and handed to an external codec.
pub fn add_ms_ra_capability(table: &mut SchemaTable) -> SchemaId {
    let id = table.reserve("ms_ra_capability_value_part");
    table.define(id, vec![
        Node::uint("access_technology_type", 4),
        Node::delegate("access_capabilities", 7, 1, super::MS_ACCESS_CAPABILITIES_CODEC).with_len_field("length"),
        Node::optional("next", vec![Node::reference("value_part", id)]),
    ]);
    id
}
