//! Declarative bit-level schema engine for RLC/MAC control messages and headers
//!
//! - schema: node kinds and the table of schemas addressed by stable handles
//! - decoder: evaluates a schema against a BitCursor into a DecodedRecord
//! - record: the decoded value tree, addressed by dotted paths
//! - codec: externally supplied decoders for delegated bit windows
//! - catalogue: the process-wide set of header and message schemas

pub mod catalogue;
pub mod codec;
pub mod decoder;
pub mod record;
pub mod schema;

pub use catalogue::{Catalogue, catalogue};
pub use codec::{CodecRegistry, ExternalCodec, SchemaCodec};
pub use decoder::{Decoder, DecoderLimits};
pub use record::{DecodedRecord, Value};
pub use schema::{Branch, FieldRef, Level, Node, NodeKind, SchemaId, SchemaTable, StopRule, Width};
