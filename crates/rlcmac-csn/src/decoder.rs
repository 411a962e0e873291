use rlcmac_core::{BitCursor, DecodeErr, ViolationKind, expect_value};

use crate::codec::CodecRegistry;
use crate::record::{DecodedRecord, Value};
use crate::schema::{Branch, FieldRef, Level, Node, NodeKind, SchemaId, SchemaTable, StopRule, Width};

/// Bounds applied to every decode call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderLimits {
    /// Maximum number of nested schema references
    pub max_depth: usize,
    /// Maximum number of elements in one repeated array
    pub max_array_elements: usize,
}

impl Default for DecoderLimits {
    fn default() -> Self {
        DecoderLimits { max_depth: 32, max_array_elements: 128 }
    }
}

/// Evaluates schemas of one table against bit cursors.
/// Holds no per-call state, so one decoder can serve any number of blocks, also from several threads.
#[derive(Debug, Clone, Copy)]
pub struct Decoder<'t> {
    table: &'t SchemaTable,
    codecs: Option<&'t CodecRegistry>,
    limits: DecoderLimits,
}

impl<'t> Decoder<'t> {
    pub fn new(table: &'t SchemaTable) -> Self {
        Decoder { table, codecs: None, limits: DecoderLimits::default() }
    }

    pub fn with_codecs(mut self, codecs: &'t CodecRegistry) -> Self {
        self.codecs = Some(codecs);
        self
    }

    pub fn with_limits(mut self, limits: DecoderLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn table(&self) -> &'t SchemaTable {
        self.table
    }

    pub fn limits(&self) -> DecoderLimits {
        self.limits
    }

    /// Decode `schema` at the cursor position into `out`.
    ///
    /// On failure `out` keeps every field decoded so far. Structural failures (out of data, no matching
    /// union alternative, exceeded bounds) stop the decode immediately. Fixed-value mismatches, failing
    /// external codecs and failures inside a delegated schema window only mark the offending field;
    /// decoding continues and the first such violation is returned once the schema is complete.
    pub fn decode(&self, schema: SchemaId, cursor: &mut BitCursor<'_>, out: &mut DecodedRecord) -> Result<(), DecodeErr> {
        let Some(nodes) = self.table.nodes(schema) else {
            return Err(unresolved_schema("schema", schema));
        };
        tracing::debug!(
            "decoding {} from {} bits",
            self.table.name(schema).unwrap_or("?"),
            cursor.remaining_bits()
        );

        let mut eval = Eval { decoder: self, depth: 0, violation: None };
        let result = eval.eval_seq(nodes, cursor, out, None);
        if let Err(e) = &result {
            tracing::debug!("decode stopped: {} at bit {}", e, cursor.position());
        }
        result?;
        match eval.violation {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Decode `schema` into a fresh record, returning the record together with the outcome
    pub fn decode_record(&self, schema: SchemaId, cursor: &mut BitCursor<'_>) -> (DecodedRecord, Result<(), DecodeErr>) {
        let mut record = DecodedRecord::new();
        let result = self.decode(schema, cursor, &mut record);
        (record, result)
    }
}

fn unresolved_schema(field: &'static str, schema: SchemaId) -> DecodeErr {
    DecodeErr::violation(field, ViolationKind::UnresolvedField { name: format!("schema #{}", schema.index()) })
}

/// Records enclosing the one being filled, searched outward by field references
struct Scope<'s> {
    record: &'s DecodedRecord,
    parent: Option<&'s Scope<'s>>,
}

impl Scope<'_> {
    fn lookup(&self, path: &str) -> Option<u64> {
        self.record.uint(path).or_else(|| self.parent.and_then(|p| p.lookup(path)))
    }
}

/// State of a single decode call
struct Eval<'d, 't> {
    decoder: &'d Decoder<'t>,
    depth: usize,
    violation: Option<DecodeErr>,
}

impl Eval<'_, '_> {
    fn eval_seq(
        &mut self,
        nodes: &[Node],
        cursor: &mut BitCursor<'_>,
        out: &mut DecodedRecord,
        scope: Option<&Scope<'_>>,
    ) -> Result<(), DecodeErr> {
        for node in nodes {
            self.eval_node(node, cursor, out, scope)?;
        }
        Ok(())
    }

    /// Evaluate `body` into a new record. The caller stores the record whatever the outcome.
    fn eval_child(
        &mut self,
        body: &[Node],
        cursor: &mut BitCursor<'_>,
        out: &DecodedRecord,
        scope: Option<&Scope<'_>>,
    ) -> (DecodedRecord, Result<(), DecodeErr>) {
        let mut child = DecodedRecord::new();
        let enclosing = Scope { record: out, parent: scope };
        let result = self.eval_seq(body, cursor, &mut child, Some(&enclosing));
        (child, result)
    }

    fn eval_node(
        &mut self,
        node: &Node,
        cursor: &mut BitCursor<'_>,
        out: &mut DecodedRecord,
        scope: Option<&Scope<'_>>,
    ) -> Result<(), DecodeErr> {
        tracing::trace!("{:<32} @{:>4}", node.id, cursor.position());

        match &node.kind {
            NodeKind::UInt(bits) => {
                let v = cursor.read_uint(*bits, node.id)?;
                tracing::trace!("{} = {}", node.id, v);
                out.insert(node.id, Value::UInt(v));
            }
            NodeKind::Crumbs(crumbs) => {
                let v = cursor.read_crumb(crumbs, node.id)?;
                tracing::trace!("{} = {}", node.id, v);
                out.insert(node.id, Value::UInt(v));
            }
            NodeKind::Bitmap(width) => {
                let n = self.width(width, node.id, cursor, out, scope)?;
                let bits = cursor.read_bitmap(n, node.id)?;
                out.insert(node.id, Value::Bits(bits));
            }
            NodeKind::Fixed { bits, expected } => {
                let found = cursor.read_uint(*bits, node.id)?;
                match expect_value!(found, *expected, node.id) {
                    Ok(()) => out.insert(node.id, Value::UInt(found)),
                    Err(e) => {
                        tracing::warn!("{}", e);
                        out.insert(node.id, Value::Invalid { expected: *expected, found });
                        self.note_violation(e);
                    }
                }
            }
            NodeKind::Spare(bits) => cursor.skip(*bits, node.id)?,
            NodeKind::Padding => {
                let n = cursor.remaining_bits();
                cursor.skip(n, node.id)?;
            }
            NodeKind::Presence { flag_bits, present, then } => {
                let flag = cursor.read_uint(*flag_bits, node.id)?;
                if flag != *present {
                    out.insert(node.id, Value::Absent);
                    return Ok(());
                }
                let (child, result) = self.eval_child(then, cursor, out, scope);
                out.insert(node.id, Value::Record(child));
                return result;
            }
            NodeKind::Extension(levels) => return self.eval_extension(node.id, levels, cursor, out, scope),
            NodeKind::Union(branches) => {
                for branch in branches {
                    if cursor.peek_bits(branch.bits) == Some(branch.pattern) {
                        cursor.skip(branch.bits, node.id)?;
                        tracing::trace!("{} -> {}", node.id, branch.label);
                        return self.eval_branch(node.id, branch, cursor, out, scope);
                    }
                }
                return Err(unmatched_union(node.id, branches, cursor));
            }
            NodeKind::Switch { bits, branches } => {
                let index = cursor.read_uint(*bits, node.id)?;
                let Some(branch) = usize::try_from(index).ok().and_then(|i| branches.get(i)) else {
                    return Err(DecodeErr::violation(node.id, ViolationKind::NoMatchingBranch { found: index }));
                };
                return self.eval_branch(node.id, branch, cursor, out, scope);
            }
            NodeKind::Ref(schema) => {
                if self.depth >= self.decoder.limits.max_depth {
                    return Err(DecodeErr::violation(node.id, ViolationKind::DepthExceeded));
                }
                let Some(nodes) = self.decoder.table.nodes(*schema) else {
                    return Err(unresolved_schema(node.id, *schema));
                };
                self.depth += 1;
                let (child, result) = self.eval_child(nodes, cursor, out, scope);
                self.depth -= 1;
                out.insert(node.id, Value::Record(child));
                return result;
            }
            NodeKind::Struct(nodes) => {
                let (child, result) = self.eval_child(nodes, cursor, out, scope);
                out.insert(node.id, Value::Record(child));
                return result;
            }
            NodeKind::Array { element, stop } => {
                let mut items = Vec::new();
                let result = self.eval_array(node.id, element, stop, cursor, out, scope, &mut items);
                out.insert(node.id, Value::List(items));
                return result;
            }
            NodeKind::Delegate { len_bits, scale, codec, len_id } => {
                let prefix = cursor.read_uint(*len_bits, node.id)?;
                if let Some(len_id) = len_id {
                    out.insert(*len_id, Value::UInt(prefix));
                }
                let window = cursor.sub_cursor(prefix as usize * scale, node.id)?;
                let (value, result) = self.eval_delegate(node.id, *codec, window, out, scope);
                if let Some(value) = value {
                    out.insert(node.id, value);
                }
                return result;
            }
        }
        Ok(())
    }

    fn eval_branch(
        &mut self,
        id: &'static str,
        branch: &Branch,
        cursor: &mut BitCursor<'_>,
        out: &mut DecodedRecord,
        scope: Option<&Scope<'_>>,
    ) -> Result<(), DecodeErr> {
        let (record, result) = self.eval_child(&branch.body, cursor, out, scope);
        out.insert(id, Value::Choice { branch: branch.label, record });
        result
    }

    /// A level is attempted only if its flag is present; a missing or false flag closes the chain and
    /// every level from there on is recorded absent. Running out of bits exactly where a flag is due
    /// ends the chain too, so messages from older releases decode without error.
    fn eval_extension(
        &mut self,
        id: &'static str,
        levels: &[Level],
        cursor: &mut BitCursor<'_>,
        out: &mut DecodedRecord,
        scope: Option<&Scope<'_>>,
    ) -> Result<(), DecodeErr> {
        let mut decoded = Vec::with_capacity(levels.len());
        let mut result = Ok(());
        let mut open = true;

        for level in levels {
            if open && cursor.remaining_bits() >= level.flag_bits {
                open = cursor.read_uint(level.flag_bits, id)? == level.present;
            } else {
                open = false;
            }
            if !open {
                decoded.push(Value::Absent);
                continue;
            }

            let (child, level_result) = self.eval_child(&level.body, cursor, out, scope);
            decoded.push(Value::Record(child));
            if let Err(e) = level_result {
                result = Err(e);
                open = false;
            }
        }

        tracing::trace!("{}: {} of {} levels", id, decoded.iter().filter(|v| !v.is_absent()).count(), levels.len());
        out.insert(id, Value::List(decoded));
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn eval_array(
        &mut self,
        id: &'static str,
        element: &Node,
        stop: &StopRule,
        cursor: &mut BitCursor<'_>,
        out: &DecodedRecord,
        scope: Option<&Scope<'_>>,
        items: &mut Vec<Value>,
    ) -> Result<(), DecodeErr> {
        let limit = self.decoder.limits.max_array_elements;
        let count = match stop {
            StopRule::Fixed(n) => Some(*n),
            StopRule::Count(field) => Some(usize::try_from(self.resolve(field, id, out, scope)?).unwrap_or(usize::MAX)),
            StopRule::Flagged | StopRule::Sentinel { .. } => None,
        };
        if count.is_some_and(|n| n > limit) {
            return Err(DecodeErr::violation(id, ViolationKind::TooManyElements));
        }

        loop {
            match (stop, count) {
                (_, Some(n)) => {
                    if items.len() == n {
                        return Ok(());
                    }
                }
                (StopRule::Flagged, _) => {
                    if cursor.read_uint(1, id)? == 0 {
                        return Ok(());
                    }
                }
                (StopRule::Sentinel { bits, value }, _) => {
                    if cursor.peek_uint(*bits, id)? == *value {
                        return cursor.skip(*bits, id);
                    }
                }
                _ => {}
            }
            if items.len() >= limit {
                return Err(DecodeErr::violation(id, ViolationKind::TooManyElements));
            }

            let mut slot = DecodedRecord::new();
            let result = {
                let enclosing = Scope { record: out, parent: scope };
                self.eval_node(element, cursor, &mut slot, Some(&enclosing))
            };
            items.push(slot.take(element.id).unwrap_or(Value::Absent));
            result?;
        }
    }

    /// Hand a length-delimited window to a registered codec. The window is consumed whatever the
    /// codec does, so a failing codec leaves the following fields decodable.
    fn eval_delegate(
        &mut self,
        id: &'static str,
        codec: &'static str,
        window: BitCursor<'_>,
        out: &DecodedRecord,
        scope: Option<&Scope<'_>>,
    ) -> (Option<Value>, Result<(), DecodeErr>) {
        let len = window.remaining_bits();
        let mut raw = window.clone();

        match self.decoder.codecs.and_then(|c| c.get(codec)) {
            Some(external) => match external.schema() {
                Some(schema) => return self.eval_delegated_schema(id, schema, window, out, scope),
                None => {
                    let mut window = window;
                    match external.decode(self.decoder, &mut window) {
                        Ok(value) => return (Some(value), Ok(())),
                        Err(e) => {
                            tracing::warn!("{}: codec {} rejected {} bits: {}", id, codec, len, e);
                            self.note_violation(DecodeErr::violation(id, ViolationKind::ExternalCodec { codec }));
                        }
                    }
                }
            },
            None => tracing::debug!("{}: no codec {} registered, keeping {} raw bits", id, codec, len),
        }
        match raw.read_bitmap(len, id) {
            Ok(bits) => (Some(Value::Bits(bits)), Ok(())),
            Err(e) => (None, Err(e)),
        }
    }

    /// Evaluate a schema over a delegated window as one more nesting level. Failures inside the window
    /// are local to it: the partial record is kept and decoding resumes after the window. Exceeded
    /// bounds still stop the whole decode.
    fn eval_delegated_schema(
        &mut self,
        id: &'static str,
        schema: SchemaId,
        mut window: BitCursor<'_>,
        out: &DecodedRecord,
        scope: Option<&Scope<'_>>,
    ) -> (Option<Value>, Result<(), DecodeErr>) {
        if self.depth >= self.decoder.limits.max_depth {
            return (None, Err(DecodeErr::violation(id, ViolationKind::DepthExceeded)));
        }
        let Some(nodes) = self.decoder.table.nodes(schema) else {
            return (None, Err(unresolved_schema(id, schema)));
        };

        self.depth += 1;
        let (child, result) = self.eval_child(nodes, &mut window, out, scope);
        self.depth -= 1;

        let result = match result {
            Err(e) if is_bound_violation(&e) => Err(e),
            Err(e) => {
                tracing::warn!("{}: inside delegated window: {}", id, e);
                self.note_violation(e);
                Ok(())
            }
            Ok(()) => Ok(()),
        };
        (Some(Value::Record(child)), result)
    }

    fn width(
        &self,
        width: &Width,
        id: &'static str,
        cursor: &BitCursor<'_>,
        out: &DecodedRecord,
        scope: Option<&Scope<'_>>,
    ) -> Result<usize, DecodeErr> {
        match width {
            Width::Fixed(n) => Ok(*n),
            Width::Field(field) => Ok(usize::try_from(self.resolve(field, id, out, scope)?).unwrap_or(usize::MAX)),
            Width::Remaining { tail } => cursor.remaining_bits().checked_sub(*tail).ok_or(DecodeErr::OutOfData {
                field: id,
                needed: *tail,
                remaining: cursor.remaining_bits(),
            }),
        }
    }

    /// Value of a previously decoded integer, searched from the innermost record outward
    fn resolve(&self, field: &FieldRef, id: &'static str, out: &DecodedRecord, scope: Option<&Scope<'_>>) -> Result<u64, DecodeErr> {
        out.uint(field.name)
            .or_else(|| scope.and_then(|s| s.lookup(field.name)))
            .and_then(|v| v.checked_add_signed(field.add))
            .ok_or_else(|| DecodeErr::violation(id, ViolationKind::UnresolvedField { name: field.name.to_string() }))
    }

    fn note_violation(&mut self, e: DecodeErr) {
        if self.violation.is_none() {
            self.violation = Some(e);
        }
    }
}

fn is_bound_violation(e: &DecodeErr) -> bool {
    matches!(
        e,
        DecodeErr::SchemaViolation { kind: ViolationKind::DepthExceeded | ViolationKind::TooManyElements, .. }
    )
}

/// No alternative matched. Too few bits for even the narrowest discriminant is reported as missing data.
fn unmatched_union(id: &'static str, branches: &[Branch], cursor: &BitCursor<'_>) -> DecodeErr {
    let narrowest = branches.iter().map(|b| b.bits).min().unwrap_or(0);
    let widest = branches.iter().map(|b| b.bits).max().unwrap_or(0);
    let remaining = cursor.remaining_bits();
    if remaining < narrowest {
        return DecodeErr::OutOfData { field: id, needed: narrowest, remaining };
    }
    let found = cursor.peek_bits(usize::min(widest, remaining)).unwrap_or(0);
    tracing::debug!("{}: no alternative for {:#b}", id, found);
    DecodeErr::violation(id, ViolationKind::NoMatchingBranch { found })
}
