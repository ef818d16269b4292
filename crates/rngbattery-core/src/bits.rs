//! Fixed-width bit extraction over buffers of 32-bit words.
//!
//! Buffers are read as one continuous bitstream, most significant bit of
//! word 0 first. Bit positions inside a single word use the same convention:
//! bit 0 is the MSB, bit 31 the LSB.

const WORD_BITS: u32 = 32;

// ---------------------------------------------------------------------------
// Single-word helpers
// ---------------------------------------------------------------------------

/// Mask with bits `bstart..=bstop` set (bit 0 = MSB).
///
/// Returns 0 for an empty or out-of-range window.
pub fn umask(bstart: u32, bstop: u32) -> u32 {
    if bstop >= WORD_BITS || bstop < bstart {
        return 0;
    }
    let blen = bstop - bstart + 1;
    if blen == WORD_BITS {
        return u32::MAX;
    }
    ((1u32 << blen) - 1) << (WORD_BITS - blen - bstart)
}

/// Extract bits `bstart..=bstop` of `input` and move them so the window
/// begins at bit `boffset`. Bits shifted past either end are dropped.
pub fn window(input: u32, bstart: u32, bstop: u32, boffset: u32) -> u32 {
    let masked = input & umask(bstart, bstop);
    if masked == 0 || boffset >= WORD_BITS {
        return 0;
    }
    if boffset >= bstart {
        masked >> (boffset - bstart)
    } else {
        masked << (bstart - boffset)
    }
}

pub fn rotate_left(input: u32, shift: u32) -> u32 {
    input.rotate_left(shift % WORD_BITS)
}

pub fn rotate_right(input: u32, shift: u32) -> u32 {
    input.rotate_right(shift % WORD_BITS)
}

// ---------------------------------------------------------------------------
// Buffer helpers
// ---------------------------------------------------------------------------

/// The `n`th bit of the buffer (0 or 1), wrapping past the end.
pub fn get_bit(words: &[u32], n: u64) -> u32 {
    if words.is_empty() {
        return 0;
    }
    let n = n % (words.len() as u64 * WORD_BITS as u64);
    let word = words[(n / WORD_BITS as u64) as usize];
    (word >> (WORD_BITS - 1 - (n % WORD_BITS as u64) as u32)) & 1
}

/// `blen` bits (1..=32) starting at bit `boffset` of the first `bslen` words,
/// wrapping cyclically from the last word back to the first.
///
/// `bslen` is clamped to the buffer length; a zero-length buffer or window yields 0.
pub fn get_bit_ntuple(bitstring: &[u32], bslen: usize, blen: u32, boffset: u64) -> u32 {
    let bslen = bslen.min(bitstring.len());
    if bslen == 0 || blen == 0 {
        return 0;
    }
    let blen = blen.min(WORD_BITS);
    let total = bslen as u64 * WORD_BITS as u64;
    let start = boffset % total;
    let w = (start / WORD_BITS as u64) as usize;
    let b = (start % WORD_BITS as u64) as u32;
    let hi = bitstring[w] as u64;
    let lo = bitstring[(w + 1) % bslen] as u64;
    let combined = (hi << WORD_BITS) | lo;
    ((combined << b) >> (2 * WORD_BITS - blen)) as u32
}

/// Fill `output` with consecutive `ntuple`-bit values read from `input`
/// starting at bit `offset`, wrapping cyclically.
pub fn get_ntuple_cyclic(input: &[u32], output: &mut [u32], ntuple: u32, offset: u64) {
    for (k, slot) in output.iter_mut().enumerate() {
        *slot = get_bit_ntuple(input, input.len(), ntuple, offset + k as u64 * ntuple as u64);
    }
}

/// `ntuple` bits starting at `offset` without wrapping; `None` past the end.
pub fn get_ntuple_linear(input: &[u32], ntuple: u32, offset: u64) -> Option<u32> {
    let total = input.len() as u64 * WORD_BITS as u64;
    if ntuple == 0 || ntuple > WORD_BITS || offset + ntuple as u64 > total {
        return None;
    }
    Some(get_bit_ntuple(input, input.len(), ntuple, offset))
}

/// Render the low `nbits` bits of `value`, most significant first.
pub fn format_bits(value: u32, nbits: u32) -> String {
    let nbits = nbits.min(WORD_BITS);
    (0..nbits)
        .rev()
        .map(|i| if (value >> i) & 1 == 1 { '1' } else { '0' })
        .collect()
}
