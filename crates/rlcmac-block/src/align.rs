use crate::framer::SubBlock;

/// Low bits of the first aligned octet that belong to the header tail
const SPARE_MASK: u8 = 0x3F;

/// Produces an octet-aligned copy of an enhanced data block.
///
/// The block is taken from `sub.offset_bits`, counted least significant bit first, and shifted down by
/// `offset_bits % 8` with bits carried across octet boundaries. The 6 spare bits at the bottom of the
/// first octet are cleared afterwards. In the result, octet 0 holds the two leading data bits in its two
/// most significant positions and every following octet holds one data octet.
/// Bits past the end of `block` read as zero.
pub fn align_sub_block(block: &[u8], sub: &SubBlock) -> Vec<u8> {
    let first = sub.offset_bits / 8;
    let shift = sub.offset_bits % 8;
    let octet = |i: usize| block.get(i).copied().unwrap_or(0);

    let mut out: Vec<u8> = (0..sub.aligned_len())
        .map(|i| {
            if shift == 0 {
                octet(first + i)
            } else {
                (octet(first + i) >> shift) | (octet(first + i + 1) << (8 - shift))
            }
        })
        .collect();

    if let Some(head) = out.first_mut() {
        *head &= !SPARE_MASK;
    }

    tracing::trace!("aligned data block {} from bit {}: {:02x?}", sub.index, sub.offset_bits, out);
    out
}
