use std::collections::HashMap;

use rlcmac_core::{BitCursor, DecodeErr};

use crate::decoder::Decoder;
use crate::record::{DecodedRecord, Value};
use crate::schema::SchemaId;

/// Decoder for bits whose layout is defined outside the schema language.
/// The cursor handed in is windowed to exactly the delegated bits.
pub trait ExternalCodec: Send + Sync {
    /// Schema of the decoder's own table that describes the window.
    /// When set, the window is evaluated in place: nesting counts against the depth bound, field
    /// references reach the enclosing records and a partial record is kept on failure.
    fn schema(&self) -> Option<SchemaId> {
        None
    }

    /// Decode the window outside any enclosing evaluation. An error means nothing usable was produced.
    fn decode(&self, decoder: &Decoder<'_>, cursor: &mut BitCursor<'_>) -> Result<Value, DecodeErr>;
}

/// Named external codecs. Delegate nodes naming a codec that is not registered keep their raw bits.
#[derive(Default)]
pub struct CodecRegistry {
    codecs: HashMap<&'static str, Box<dyn ExternalCodec>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, codec: Box<dyn ExternalCodec>) {
        if self.codecs.insert(name, codec).is_some() {
            tracing::warn!("codec {} registered twice, keeping the last one", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn ExternalCodec> {
        self.codecs.get(name).map(|c| c.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.codecs.contains_key(name)
    }
}

impl core::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut names: Vec<_> = self.codecs.keys().collect();
        names.sort();
        f.debug_struct("CodecRegistry").field("codecs", &names).finish()
    }
}

/// Decodes the delegated bits with another schema of the same table.
/// Used for structures whose length is given by a prefix, so the inner schema may
/// consume the window with remaining-width bitmaps.
pub struct SchemaCodec {
    pub schema: SchemaId,
}

impl ExternalCodec for SchemaCodec {
    fn schema(&self) -> Option<SchemaId> {
        Some(self.schema)
    }

    fn decode(&self, decoder: &Decoder<'_>, cursor: &mut BitCursor<'_>) -> Result<Value, DecodeErr> {
        let mut record = DecodedRecord::new();
        decoder.decode(self.schema, cursor, &mut record)?;
        Ok(Value::Record(record))
    }
}
