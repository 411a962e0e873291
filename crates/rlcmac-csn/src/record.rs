use core::fmt;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

use rlcmac_core::BitString;

/// A decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    UInt(u64),
    Bits(BitString),
    Record(DecodedRecord),
    List(Vec<Value>),
    /// Selected union alternative
    Choice { branch: &'static str, record: DecodedRecord },
    /// Optional element or extension level not present on the wire
    Absent,
    /// Fixed-value field that did not carry its mandated value
    Invalid { expected: u64, found: u64 },
}

impl Value {
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bits(&self) -> Option<&BitString> {
        match self {
            Value::Bits(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&DecodedRecord> {
        match self {
            Value::Record(r) | Value::Choice { record: r, .. } => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn branch(&self) -> Option<&'static str> {
        match self {
            Value::Choice { branch, .. } => Some(branch),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }
}

/// Ordered collection of named values produced by decoding one schema
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedRecord {
    fields: Vec<(&'static str, Value)>,
}

impl DecodedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. A field decoded again under the same name replaces the earlier value in place.
    pub fn insert(&mut self, name: &'static str, value: Value) {
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Direct field of this record
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub(crate) fn take(&mut self, name: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(n, _)| *n == name)?;
        Some(self.fields.remove(idx).1)
    }

    /// Look up a value by dotted path. Records and choices are entered by field name, lists by index,
    /// e.g. `message.packet_access_reject.additional_rejects.0.wait.wait_indication`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut cur = self.field(segments.next()?)?;
        for seg in segments {
            cur = match cur {
                Value::Record(r) | Value::Choice { record: r, .. } => r.field(seg)?,
                Value::List(items) => items.get(seg.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(cur)
    }

    pub fn uint(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(Value::as_uint)
    }

    pub fn bits(&self, path: &str) -> Option<&BitString> {
        self.get(path).and_then(Value::as_bits)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.fields.iter().map(|(n, v)| (*n, v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        for (name, value) in &self.fields {
            write!(f, "{:indent$}{}: ", "", name, indent = indent)?;
            value.fmt_indented(f, indent)?;
        }
        Ok(())
    }
}

impl Value {
    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        match self {
            Value::UInt(v) => writeln!(f, "{}", v),
            Value::Bits(b) => writeln!(f, "{}", b.to_bitstr()),
            Value::Absent => writeln!(f, "-"),
            Value::Invalid { expected, found } => writeln!(f, "INVALID {} (expected {})", found, expected),
            Value::Record(r) => {
                writeln!(f)?;
                r.fmt_indented(f, indent + 2)
            }
            Value::Choice { branch, record } => {
                writeln!(f, "<{}>", branch)?;
                record.fmt_indented(f, indent + 2)
            }
            Value::List(items) => {
                writeln!(f, "[{}]", items.len())?;
                for (i, item) in items.iter().enumerate() {
                    write!(f, "{:indent$}{}: ", "", i, indent = indent + 2)?;
                    item.fmt_indented(f, indent + 2)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for DecodedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

impl Serialize for DecodedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::UInt(v) => serializer.serialize_u64(*v),
            Value::Bits(b) => b.serialize(serializer),
            Value::Record(r) => r.serialize(serializer),
            Value::List(items) => items.serialize(serializer),
            Value::Absent => serializer.serialize_none(),
            Value::Choice { branch, record } => {
                let mut s = serializer.serialize_struct("Choice", 2)?;
                s.serialize_field("branch", branch)?;
                s.serialize_field("fields", record)?;
                s.end()
            }
            Value::Invalid { expected, found } => {
                let mut s = serializer.serialize_struct("Invalid", 2)?;
                s.serialize_field("expected", expected)?;
                s.serialize_field("found", found)?;
                s.end()
            }
        }
    }
}
