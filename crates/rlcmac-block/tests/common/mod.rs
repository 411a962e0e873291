#![allow(dead_code)]

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

/// Store data octets of an enhanced data block, octet i at wire bit `start + 8 * i`
pub fn put_octets(buf: &mut [u8], start: usize, octets: &[u8]) {
    for (i, octet) in octets.iter().enumerate() {
        put_lsb_first(buf, start + 8 * i, 8, *octet as u64);
    }
}

/// Wire bit `n` of `buf`, zero past the end
pub fn wire_bit(buf: &[u8], n: usize) -> u8 {
    buf.get(n / 8).map(|b| (b >> (n % 8)) & 1).unwrap_or(0)
}
