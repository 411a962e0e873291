use std::fmt;

use serde::{Serialize, Serializer};

use crate::decode_error::{DecodeErr, ViolationKind};

/// One contiguous piece of a logical field whose bits are interleaved with other fields on the wire.
/// `offset` is absolute within the cursor window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crumb {
    pub offset: usize,
    pub len: usize,
}

impl Crumb {
    pub const fn new(offset: usize, len: usize) -> Self {
        Crumb { offset, len }
    }

    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    pub fn overlaps(&self, other: &Crumb) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }

    /// Crumbs for a field packed least significant bit first, as the enhanced data headers are.
    /// `start` counts bits from the least significant bit of the first octet; the returned crumbs
    /// use the MSB-first offsets a [BitCursor] expects, most significant piece first.
    pub fn lsb_first(start: usize, width: usize) -> Vec<Crumb> {
        let end = start + width;
        let mut crumbs = Vec::new();
        let mut bit = start;
        while bit < end {
            let lo = bit % 8;
            let hi = usize::min(7, lo + (end - bit) - 1);
            crumbs.push(Crumb::new((bit / 8) * 8 + 7 - hi, hi - lo + 1));
            bit += hi - lo + 1;
        }
        crumbs.reverse();
        crumbs
    }
}

/// A run of bits of arbitrary length, packed MSB-first. Unused trailing bits of the last octet are zero.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct BitString {
    bytes: Vec<u8>,
    len: usize,
}

impl BitString {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        BitString { bytes: bytes.to_vec(), len: bytes.len() * 8 }
    }

    /// Parse a string of '0'/'1' characters. Returns None on any other character.
    pub fn parse_bitstr(bitstr: &str) -> Option<Self> {
        let mut bytes = vec![0u8; bitstr.len().div_ceil(8)];
        for (i, c) in bitstr.chars().enumerate() {
            match c {
                '0' => {}
                '1' => bytes[i / 8] |= 0x80 >> (i % 8),
                _ => return None,
            }
        }
        Some(BitString { bytes, len: bitstr.len() })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Bit `i`, counted from the first bit of the string
    pub fn bit(&self, i: usize) -> Option<u8> {
        if i >= self.len {
            return None;
        }
        Some((self.bytes[i / 8] >> (7 - (i % 8))) & 1)
    }

    pub fn count_ones(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn to_bitstr(&self) -> String {
        (0..self.len)
            .map(|i| if self.bit(i) == Some(1) { '1' } else { '0' })
            .collect()
    }

    /// Cursor over the bits of this string, bounded to its exact length
    pub fn cursor(&self) -> BitCursor<'_> {
        BitCursor::with_len_bits(&self.bytes, self.len)
    }
}

impl fmt::Debug for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitString {{ {} bits: {} }}", self.len, self.to_bitstr())
    }
}

impl Serialize for BitString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_bitstr())
    }
}

/// Bounds-checked, MSB-first reader over a borrowed octet buffer.
/// The cursor never owns or mutates the buffer; reading only moves `pos`.
#[derive(Clone)]
pub struct BitCursor<'a> {
    buffer: &'a [u8],
    start: usize,       // bits before this are out of window
    pos: usize,         // next bit offset to read (absolute)
    end: usize,         // bits at or after this are out of window
}

impl<'a> BitCursor<'a> {
    /// Cursor over every bit of `buffer`
    pub fn new(buffer: &'a [u8]) -> Self {
        BitCursor { buffer, start: 0, pos: 0, end: buffer.len() * 8 }
    }

    /// Cursor over the first `len_bits` bits of `buffer`. The length is clamped to the buffer size.
    pub fn with_len_bits(buffer: &'a [u8], len_bits: usize) -> Self {
        let end = usize::min(len_bits, buffer.len() * 8);
        BitCursor { buffer, start: 0, pos: 0, end }
    }

    /// Current position, relative to the window start
    pub fn position(&self) -> usize {
        self.pos - self.start
    }

    /// Number of bits left in the window, from pos to end
    pub fn remaining_bits(&self) -> usize {
        self.end - self.pos
    }

    /// Window length in bits, from start to end
    pub fn len_bits(&self) -> usize {
        self.end - self.start
    }

    /// Seek to `offset` relative to the window start. Fails if the offset lies beyond the window.
    pub fn seek(&mut self, offset: usize) -> Result<(), DecodeErr> {
        if self.start + offset > self.end {
            return Err(DecodeErr::OutOfData { field: "seek", needed: offset, remaining: self.len_bits() });
        }
        self.pos = self.start + offset;
        Ok(())
    }

    /// Peek `num_bits` at the current pos, without advancing.
    /// Returns None on overflow or if `num_bits > 64`.
    pub fn peek_bits(&self, num_bits: usize) -> Option<u64> {
        if num_bits > 64 || self.pos + num_bits > self.end {
            return None;
        }
        Some(self.read_bits_at_unchecked(self.pos, num_bits))
    }

    /// Read `num_bits` at the current pos, advancing on success.
    pub fn read_bits(&mut self, num_bits: usize) -> Option<u64> {
        let v = self.peek_bits(num_bits)?;
        self.pos += num_bits;
        Some(v)
    }

    /// Peek an unsigned integer for discriminant matching. Fails with OutOfData instead of returning None.
    pub fn peek_uint(&self, num_bits: usize, field: &'static str) -> Result<u64, DecodeErr> {
        self.check_width(num_bits, field)?;
        self.peek_bits(num_bits).ok_or(DecodeErr::OutOfData {
            field,
            needed: num_bits,
            remaining: self.remaining_bits(),
        })
    }

    /// Read an unsigned integer of up to 64 bits, advancing on success
    pub fn read_uint(&mut self, num_bits: usize, field: &'static str) -> Result<u64, DecodeErr> {
        let v = self.peek_uint(num_bits, field)?;
        self.pos += num_bits;
        Ok(v)
    }

    /// Read `num_bits` of any length as a bit string, advancing on success
    pub fn read_bitmap(&mut self, num_bits: usize, field: &'static str) -> Result<BitString, DecodeErr> {
        if num_bits > self.remaining_bits() {
            return Err(DecodeErr::OutOfData { field, needed: num_bits, remaining: self.remaining_bits() });
        }
        let mut bytes = Vec::with_capacity(num_bits.div_ceil(8));
        let mut done = 0;
        while done < num_bits {
            let take = usize::min(8, num_bits - done);
            let chunk = self.read_bits_at_unchecked(self.pos + done, take) as u8;
            bytes.push(chunk << (8 - take));
            done += take;
        }
        self.pos += num_bits;
        Ok(BitString { bytes, len: num_bits })
    }

    /// Assemble one logical field from disjoint absolute bit ranges, concatenated in declaration order
    /// (the first crumb supplies the most significant bits).
    /// The cursor advances once, by the summed crumb width, after every crumb has been read.
    pub fn read_crumb(&mut self, crumbs: &[Crumb], field: &'static str) -> Result<u64, DecodeErr> {
        let total: usize = crumbs.iter().map(|c| c.len).sum();
        self.check_width(total, field)?;
        if total > self.remaining_bits() {
            return Err(DecodeErr::OutOfData { field, needed: total, remaining: self.remaining_bits() });
        }

        let mut value = 0u64;
        for crumb in crumbs {
            if self.start + crumb.end() > self.end {
                return Err(DecodeErr::OutOfData {
                    field,
                    needed: crumb.end(),
                    remaining: self.len_bits(),
                });
            }
            let part = self.read_bits_at_unchecked(self.start + crumb.offset, crumb.len);
            value = if crumb.len >= 64 { part } else { (value << crumb.len) | part };
        }

        self.pos += total;
        Ok(value)
    }

    /// Advance past `num_bits` without decoding them
    pub fn skip(&mut self, num_bits: usize, field: &'static str) -> Result<(), DecodeErr> {
        if num_bits > self.remaining_bits() {
            return Err(DecodeErr::OutOfData { field, needed: num_bits, remaining: self.remaining_bits() });
        }
        self.pos += num_bits;
        Ok(())
    }

    /// Split off the next `num_bits` as an independent cursor, advancing this cursor past them
    pub fn sub_cursor(&mut self, num_bits: usize, field: &'static str) -> Result<BitCursor<'a>, DecodeErr> {
        if num_bits > self.remaining_bits() {
            return Err(DecodeErr::OutOfData { field, needed: num_bits, remaining: self.remaining_bits() });
        }
        let sub = BitCursor { buffer: self.buffer, start: self.pos, pos: self.pos, end: self.pos + num_bits };
        self.pos += num_bits;
        Ok(sub)
    }

    fn check_width(&self, num_bits: usize, field: &'static str) -> Result<(), DecodeErr> {
        if num_bits > 64 {
            return Err(DecodeErr::violation(field, ViolationKind::WidthTooLarge { bits: num_bits }));
        }
        Ok(())
    }

    // String representations /////////////////////////////

    /// Dump bits in window [start, end) as hex, the last nibble padded on the right with zeros.
    pub fn dump_hex(&self) -> String {
        let len = self.end - self.start;
        let mut s = String::with_capacity(len.div_ceil(4));
        for i in 0..len.div_ceil(4) {
            let take = usize::min(4, len - i * 4);
            let v = self.read_bits_at_unchecked(self.start + i * 4, take) as u8;
            s.push_str(&format!("{:X}", v << (4 - take)));
        }
        s
    }

    /// Dump bits in window [start, end) as a binary string, with a ^ marker before the current pos.
    pub fn dump_bin(&self) -> String {
        let mut s = String::with_capacity(self.end - self.start + 1);
        for i in self.start..self.end {
            if i == self.pos {
                s.push('^');
            }
            s.push(if self.read_bits_at_unchecked(i, 1) != 0 { '1' } else { '0' });
        }
        if self.pos == self.end {
            s.push('^');
        }
        s
    }

    /// Reads exactly `num_bits` bits starting at absolute `bit_pos`,
    /// returning them as the low `num_bits` of a `u64`, regardless of window.
    /// Caller must ensure `num_bits <= 64` and `bit_pos + num_bits <= buffer.len() * 8`.
    fn read_bits_at_unchecked(&self, mut bit_pos: usize, num_bits: usize) -> u64 {
        let mut result = 0u64;
        let mut remaining = num_bits;

        // 1) head bits up to the next octet boundary
        let head = bit_pos % 8;
        if head != 0 && remaining > 0 {
            let take = usize::min(8 - head, remaining);
            let byte = self.buffer[bit_pos / 8];
            let mask = ((1u16 << take) - 1) as u8;
            result = ((byte >> (8 - head - take)) & mask) as u64;
            bit_pos += take;
            remaining -= take;
        }

        // 2) whole octets
        while remaining >= 8 {
            result = (result << 8) | self.buffer[bit_pos / 8] as u64;
            bit_pos += 8;
            remaining -= 8;
        }

        // 3) tail bits, taken from the top of the last octet
        if remaining > 0 {
            let byte = self.buffer[bit_pos / 8];
            result = (result << remaining) | (byte >> (8 - remaining)) as u64;
        }

        result
    }
}

impl fmt::Debug for BitCursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitCursor {{ <{} ^{} >{} {} }}", self.start, self.pos, self.end, self.dump_bin())
    }
}
