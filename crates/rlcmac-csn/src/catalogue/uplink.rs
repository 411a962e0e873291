//! Uplink RLC/MAC control blocks

use super::ies;
use crate::schema::{Branch, FieldRef, Level, Node, SchemaId, SchemaTable, StopRule, Width};

pub const PACKET_CONTROL_ACKNOWLEDGEMENT: u64 = 0b000001;
pub const PACKET_DOWNLINK_ACK_NACK: u64 = 0b000010;
pub const PACKET_UPLINK_DUMMY_CONTROL_BLOCK: u64 = 0b000011;
pub const PACKET_RESOURCE_REQUEST: u64 = 0b000101;
pub const EGPRS_PACKET_DOWNLINK_ACK_NACK: u64 = 0b001000;

pub(super) struct UplinkSchemas {
    pub control_block: SchemaId,
    /// EGPRS Ack/Nack Description struct, also decoded through a length-prefixed window
    pub egprs_ack_nack_description: SchemaId,
}

pub(super) fn add(table: &mut SchemaTable) -> UplinkSchemas {
    let control_ack = table.add("packet_control_acknowledgement", vec![
        Node::uint("tlli", 32),
        Node::uint("ctrl_ack", 2),
        Node::extension("additions", vec![
            // Release 5
            Level::new(vec![
                Node::uint("tn_rrbp", 3),
                Node::uint("g_rnti_extension", 4),
            ]),
            // Release 6
            Level::new(vec![Node::uint("ctrl_ack_extension", 9)]),
        ]),
        Node::padding(),
    ]);

    let dl_ack_nack = table.add("packet_downlink_ack_nack", vec![
        Node::uint("downlink_tfi", 5),
        ies::ack_nack_description("ack_nack_description"),
        Node::optional("channel_request_description", ies::channel_request_description_fields()),
        ies::channel_quality_report("channel_quality_report"),
        Node::extension("additions", vec![
            // Release 5
            Level::new(vec![Node::optional("pfi", vec![Node::uint("pfi", 7)])]),
        ]),
        Node::padding(),
    ]);

    let ul_dummy = table.add("packet_uplink_dummy_control_block", vec![
        Node::uint("tlli", 32),
        Node::padding(),
    ]);

    let ms_ra_capability = ies::add_ms_ra_capability(table);
    let resource_request = table.add("packet_resource_request", vec![
        Node::optional("access_type", vec![Node::uint("access_type", 2)]),
        Node::union("id", vec![
            Branch::new("global_tfi", 1, 0, vec![ies::global_tfi("global_tfi")]),
            Branch::new("tlli", 1, 1, vec![Node::uint("tlli", 32)]),
        ]),
        Node::optional("ms_radio_access_capability", vec![
            Node::reference("value_part", ms_ra_capability),
        ]),
        ies::channel_request_description("channel_request_description"),
        Node::optional("change_mark", vec![Node::uint("change_mark", 2)]),
        Node::uint("c_value", 6),
        Node::optional("sign_var", vec![Node::uint("sign_var", 6)]),
        ies::per_timeslot("i_level", "i_level", 4),
        Node::padding(),
    ]);

    let egprs_ack_nack_description = table.add("egprs_ack_nack_description", vec![
        Node::uint("final_ack_indication", 1),
        Node::uint("beginning_of_window", 1),
        Node::uint("end_of_window", 1),
        Node::uint("starting_sequence_number", 11),
        Node::optional("compressed", vec![
            Node::uint("length", 7),
            Node::uint("starting_color_code", 1),
            Node::bitmap("received_block_bitmap", Width::Field(FieldRef::new("length"))),
        ]),
        // Left aligned: takes whatever the description window leaves
        Node::bitmap("uncompressed_received_block_bitmap", Width::Remaining { tail: 0 }),
    ]);

    let egprs_dl_ack_nack = table.add("egprs_packet_downlink_ack_nack", vec![
        Node::uint("downlink_tfi", 5),
        Node::uint("ms_out_of_memory", 1),
        Node::optional("egprs_channel_quality_report", vec![
            Node::optional("gmsk", vec![Node::uint("mean_bep", 5), Node::uint("cv_bep", 3)]),
            Node::optional("psk8", vec![Node::uint("mean_bep", 5), Node::uint("cv_bep", 3)]),
            Node::uint("c_value", 6),
            Node::optional("bep_measurements", vec![Node::array(
                "tn",
                Node::optional("tn", vec![Node::union("mean_bep", vec![
                    Branch::new("gmsk", 1, 0, vec![Node::uint("mean_bep", 4)]),
                    Branch::new("psk8", 1, 1, vec![Node::uint("mean_bep", 4)]),
                ])]),
                StopRule::Fixed(8),
            )]),
            Node::optional("interference_measurements", vec![ies::per_timeslot("tn", "i_level", 4)]),
        ]),
        Node::optional("channel_request_description", ies::channel_request_description_fields()),
        Node::optional("pfi", vec![Node::uint("pfi", 7)]),
        Node::optional("extension_bits", vec![
            Node::uint("length", 6),
            Node::bitmap("bits", Width::Field(FieldRef::new("length").plus(1))),
        ]),
        Node::union("egprs_ack_nack_description", vec![
            Branch::new("fills_block", 1, 0, vec![Node::reference("description", egprs_ack_nack_description)]),
            Branch::new("length_prefixed", 1, 1, vec![
                Node::delegate("description", 8, 1, super::EGPRS_ACK_NACK_DESCRIPTION_CODEC)
                    .with_len_field("description_length"),
            ]),
        ]),
        Node::padding(),
    ]);

    let control_block = table.add("ul_control_block", vec![
        Node::fixed("payload_type", 2, 0b01),
        Node::spare("spare", 5),
        Node::uint("r", 1),
        Node::union("message", vec![
            Branch::refer("packet_control_acknowledgement", 6, PACKET_CONTROL_ACKNOWLEDGEMENT, control_ack),
            Branch::refer("packet_downlink_ack_nack", 6, PACKET_DOWNLINK_ACK_NACK, dl_ack_nack),
            Branch::refer("packet_uplink_dummy_control_block", 6, PACKET_UPLINK_DUMMY_CONTROL_BLOCK, ul_dummy),
            Branch::refer("packet_resource_request", 6, PACKET_RESOURCE_REQUEST, resource_request),
            Branch::refer("egprs_packet_downlink_ack_nack", 6, EGPRS_PACKET_DOWNLINK_ACK_NACK, egprs_dl_ack_nack),
        ]),
    ]);

    UplinkSchemas { control_block, egprs_ack_nack_description }
}
