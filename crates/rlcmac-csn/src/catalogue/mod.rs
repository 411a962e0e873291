//! Schema catalogue: data block headers and a selection of control messages for both directions.
//!
//! The catalogue is built once, on first use, and shared read-only by every decode call.

pub mod downlink;
pub mod headers;
pub mod ies;
pub mod uplink;

use std::sync::OnceLock;

use crate::codec::{CodecRegistry, SchemaCodec};
use crate::decoder::{Decoder, DecoderLimits};
use crate::schema::{SchemaId, SchemaTable};

pub use headers::HeaderSchemas;

/// Codec name of the length-prefixed EGPRS Ack/Nack Description
pub const EGPRS_ACK_NACK_DESCRIPTION_CODEC: &str = "egprs_ack_nack_description";
/// Codec name of the MS access capabilities bits. Not registered by default; the bits are kept raw.
pub const MS_ACCESS_CAPABILITIES_CODEC: &str = "ms_access_capabilities";

#[derive(Debug)]
pub struct Catalogue {
    pub table: SchemaTable,
    pub codecs: CodecRegistry,
    pub headers: HeaderSchemas,
    pub dl_control_block: SchemaId,
    pub ul_control_block: SchemaId,
}

static CATALOGUE: OnceLock<Catalogue> = OnceLock::new();

/// The process-wide catalogue, built on first call
pub fn catalogue() -> &'static Catalogue {
    CATALOGUE.get_or_init(Catalogue::build)
}

impl Catalogue {
    fn build() -> Self {
        let mut table = SchemaTable::new();
        let headers = headers::add(&mut table);
        let dl_control_block = downlink::add(&mut table);
        let uplink = uplink::add(&mut table);

        let mut codecs = CodecRegistry::new();
        codecs.register(
            EGPRS_ACK_NACK_DESCRIPTION_CODEC,
            Box::new(SchemaCodec { schema: uplink.egprs_ack_nack_description }),
        );

        tracing::info!("schema catalogue ready: {} schemas", table.len());
        Catalogue { table, codecs, headers, dl_control_block, ul_control_block: uplink.control_block }
    }

    /// Decoder over this catalogue's schemas and codecs
    pub fn decoder(&self, limits: DecoderLimits) -> Decoder<'_> {
        Decoder::new(&self.table).with_codecs(&self.codecs).with_limits(limits)
    }

    pub fn schema(&self, name: &str) -> Option<SchemaId> {
        self.table.lookup(name)
    }
}
