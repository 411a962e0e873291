#![allow(dead_code)]

/// Builds MSB-first test vectors field by field
#[derive(Default)]
pub struct BitVecBuilder {
    bits: String,
}

impl BitVecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(mut self, value: u64, width: usize) -> Self {
        for i in (0..width).rev() {
            self.bits.push(if (value >> i) & 1 == 1 { '1' } else { '0' });
        }
        self
    }

    pub fn bits(mut self, bits: &str) -> Self {
        self.bits.push_str(bits);
        self
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn as_str(&self) -> &str {
        &self.bits
    }

    /// Pack into a block of `octets`; the partial last octet is zero filled and
    /// whole octets after it carry the 0x2B spare padding pattern
    pub fn into_block(self, octets: usize) -> Vec<u8> {
        assert!(self.bits.len() <= octets * 8, "{} bits do not fit {} octets", self.bits.len(), octets);
        let mut block = vec![0x2Bu8; octets];
        for b in block.iter_mut().take(self.bits.len().div_ceil(8)) {
            *b = 0;
        }
        for (i, c) in self.bits.chars().enumerate() {
            if c == '1' {
                block[i / 8] |= 0x80 >> (i % 8);
            }
        }
        block
    }
}

/// Store `value` least significant bit first from wire bit `start`, where bit n is bit n % 8 of octet n / 8
pub fn put_lsb_first(buf: &mut [u8], start: usize, width: usize, value: u64) {
    for j in 0..width {
        let bit = start + j;
        if (value >> j) & 1 == 1 {
            buf[bit / 8] |= 1 << (bit % 8);
        } else {
            buf[bit / 8] &= !(1 << (bit % 8));
        }
    }
}
