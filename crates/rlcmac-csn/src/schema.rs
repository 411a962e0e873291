//! Declarative description of a message layout.
//!
//! A schema is an ordered list of [Node]s. Nodes are immutable once built and refer to other
//! schemas only through [SchemaId] handles, so schemas may reference themselves or each other.

use std::collections::HashMap;

use rlcmac_core::Crumb;

/// Stable handle of a schema inside a [SchemaTable]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaId(usize);

impl SchemaId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Reference to an integer decoded earlier in the same message, plus a constant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    /// Dotted path, searched in the record being filled first and then in enclosing records
    pub name: &'static str,
    pub add: i64,
}

impl FieldRef {
    pub const fn new(name: &'static str) -> Self {
        FieldRef { name, add: 0 }
    }

    pub const fn plus(self, add: i64) -> Self {
        FieldRef { name: self.name, add }
    }
}

/// Width of a bitmap leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Width {
    Fixed(usize),
    /// Value of an already decoded field
    Field(FieldRef),
    /// Everything left in the cursor window except `tail` bits
    Remaining { tail: usize },
}

/// Termination rule of a repeated array
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopRule {
    Fixed(usize),
    /// Element count taken from an already decoded field
    Count(FieldRef),
    /// Each element is preceded by a `1` bit, a `0` bit ends the array
    Flagged,
    /// Elements are read until the next `bits` equal `value`; the sentinel is consumed, not stored
    Sentinel { bits: usize, value: u64 },
}

/// One alternative of a union
#[derive(Debug, Clone)]
pub struct Branch {
    pub label: &'static str,
    /// Discriminant width for ordered unions. Unused by index-selected unions.
    pub bits: usize,
    pub pattern: u64,
    pub body: Vec<Node>,
}

impl Branch {
    pub fn new(label: &'static str, bits: usize, pattern: u64, body: Vec<Node>) -> Self {
        assert!(bits <= 64, "discriminant of {} wider than 64 bits", label);
        assert!(bits == 64 || pattern >> bits == 0, "pattern of {} exceeds {} bits", label, bits);
        Branch { label, bits, pattern, body }
    }

    /// Alternative whose body is a single reference to another schema, recorded under the branch label
    pub fn refer(label: &'static str, bits: usize, pattern: u64, schema: SchemaId) -> Self {
        Branch::new(label, bits, pattern, vec![Node::reference(label, schema)])
    }

    /// Arm of an index-selected union
    pub fn arm(label: &'static str, body: Vec<Node>) -> Self {
        Branch { label, bits: 0, pattern: 0, body }
    }
}

/// One level of a backward-compatible extension chain
#[derive(Debug, Clone)]
pub struct Level {
    pub flag_bits: usize,
    pub present: u64,
    pub body: Vec<Node>,
}

impl Level {
    /// Level announced by a single `1` bit
    pub fn new(body: Vec<Node>) -> Self {
        Level { flag_bits: 1, present: 1, body }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Unsigned integer of up to 64 bits
    UInt(usize),
    /// Integer assembled from non-contiguous bit ranges
    Crumbs(Vec<Crumb>),
    Bitmap(Width),
    /// Mandated value; a mismatch invalidates only this field
    Fixed { bits: usize, expected: u64 },
    /// Spare bits, consumed and not recorded
    Spare(usize),
    /// Sub-structure gated by a flag read immediately before it
    Presence { flag_bits: usize, present: u64, then: Vec<Node> },
    /// Chain of optional levels, each flag gating an attempt at the next level
    Extension(Vec<Level>),
    /// Alternatives tried in declared order, first matching discriminant wins
    Union(Vec<Branch>),
    /// Alternative selected by the value of a fixed-width index
    Switch { bits: usize, branches: Vec<Branch> },
    /// Another schema, by handle
    Ref(SchemaId),
    /// Inline sub-structure
    Struct(Vec<Node>),
    Array { element: Box<Node>, stop: StopRule },
    /// Length-prefixed bits handed to an externally registered codec
    Delegate { len_bits: usize, scale: usize, codec: &'static str, len_id: Option<&'static str> },
    /// Rest of the window, consumed and not recorded
    Padding,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: &'static str,
    pub kind: NodeKind,
}

impl Node {
    pub fn uint(id: &'static str, bits: usize) -> Self {
        assert!(bits <= 64, "{}: integer wider than 64 bits", id);
        Node { id, kind: NodeKind::UInt(bits) }
    }

    /// Integer assembled from crumbs; the first crumb supplies the most significant bits
    pub fn crumbs(id: &'static str, crumbs: Vec<Crumb>) -> Self {
        let total: usize = crumbs.iter().map(|c| c.len).sum();
        assert!(!crumbs.is_empty() && total <= 64, "{}: crumbs must cover 1..=64 bits", id);
        for (i, a) in crumbs.iter().enumerate() {
            assert!(a.len > 0, "{}: empty crumb", id);
            for b in &crumbs[i + 1..] {
                assert!(!a.overlaps(b), "{}: overlapping crumbs {:?} and {:?}", id, a, b);
            }
        }
        Node { id, kind: NodeKind::Crumbs(crumbs) }
    }

    /// Field stored least significant bit first, starting at wire bit `start` (LSB-first numbering)
    pub fn lsb_first(id: &'static str, start: usize, bits: usize) -> Self {
        Node::crumbs(id, Crumb::lsb_first(start, bits))
    }

    pub fn bitmap(id: &'static str, width: Width) -> Self {
        Node { id, kind: NodeKind::Bitmap(width) }
    }

    pub fn fixed(id: &'static str, bits: usize, expected: u64) -> Self {
        assert!(bits <= 64 && (bits == 64 || expected >> bits == 0), "{}: expected value exceeds width", id);
        Node { id, kind: NodeKind::Fixed { bits, expected } }
    }

    pub fn spare(id: &'static str, bits: usize) -> Self {
        Node { id, kind: NodeKind::Spare(bits) }
    }

    /// The common `{ 0 | 1 <body> }` form
    pub fn optional(id: &'static str, then: Vec<Node>) -> Self {
        Node::presence(id, 1, 1, then)
    }

    pub fn presence(id: &'static str, flag_bits: usize, present: u64, then: Vec<Node>) -> Self {
        Node { id, kind: NodeKind::Presence { flag_bits, present, then } }
    }

    pub fn extension(id: &'static str, levels: Vec<Level>) -> Self {
        Node { id, kind: NodeKind::Extension(levels) }
    }

    pub fn union(id: &'static str, branches: Vec<Branch>) -> Self {
        assert!(!branches.is_empty(), "{}: union without alternatives", id);
        Node { id, kind: NodeKind::Union(branches) }
    }

    pub fn switch(id: &'static str, bits: usize, branches: Vec<Branch>) -> Self {
        assert!(bits <= 16, "{}: index width {} too large", id, bits);
        Node { id, kind: NodeKind::Switch { bits, branches } }
    }

    pub fn reference(id: &'static str, schema: SchemaId) -> Self {
        Node { id, kind: NodeKind::Ref(schema) }
    }

    pub fn structure(id: &'static str, nodes: Vec<Node>) -> Self {
        Node { id, kind: NodeKind::Struct(nodes) }
    }

    pub fn array(id: &'static str, element: Node, stop: StopRule) -> Self {
        Node { id, kind: NodeKind::Array { element: Box::new(element), stop } }
    }

    pub fn delegate(id: &'static str, len_bits: usize, scale: usize, codec: &'static str) -> Self {
        assert!(len_bits <= 16 && scale > 0, "{}: invalid delegate length prefix", id);
        Node { id, kind: NodeKind::Delegate { len_bits, scale, codec, len_id: None } }
    }

    /// Also record the delegate's length prefix, as read from the wire, under `len_id`
    pub fn with_len_field(mut self, len_id: &'static str) -> Self {
        match self.kind {
            NodeKind::Delegate { len_id: ref mut slot, .. } => *slot = Some(len_id),
            _ => panic!("{}: only delegates carry a length prefix", self.id),
        }
        self
    }

    pub fn padding() -> Self {
        Node { id: "padding", kind: NodeKind::Padding }
    }
}

/// Process-wide collection of schemas addressed by [SchemaId].
/// Handles can be reserved before their schema is defined, which allows mutual recursion.
#[derive(Debug, Default)]
pub struct SchemaTable {
    schemas: Vec<(&'static str, Option<Vec<Node>>)>,
    names: HashMap<&'static str, SchemaId>,
}

impl SchemaTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a handle for a schema that is defined later
    pub fn reserve(&mut self, name: &'static str) -> SchemaId {
        assert!(!self.names.contains_key(name), "schema {} declared twice", name);
        let id = SchemaId(self.schemas.len());
        self.schemas.push((name, None));
        self.names.insert(name, id);
        id
    }

    pub fn define(&mut self, id: SchemaId, nodes: Vec<Node>) {
        let slot = &mut self.schemas[id.0];
        assert!(slot.1.is_none(), "schema {} defined twice", slot.0);
        slot.1 = Some(nodes);
    }

    pub fn add(&mut self, name: &'static str, nodes: Vec<Node>) -> SchemaId {
        let id = self.reserve(name);
        self.define(id, nodes);
        id
    }

    /// Nodes of a defined schema. None for reserved but undefined handles.
    pub fn nodes(&self, id: SchemaId) -> Option<&[Node]> {
        self.schemas.get(id.0).and_then(|(_, nodes)| nodes.as_deref())
    }

    pub fn name(&self, id: SchemaId) -> Option<&'static str> {
        self.schemas.get(id.0).map(|(name, _)| *name)
    }

    pub fn lookup(&self, name: &str) -> Option<SchemaId> {
        self.names.get(name).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = SchemaId> {
        (0..self.schemas.len()).map(SchemaId)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
