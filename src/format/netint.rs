// Big-endian ("network order") integers of width 1, 2, 4 or 8 bytes.
//
// Delta commands pick the narrowest width that holds each parameter;
// signature headers and records use fixed 4-byte fields.

/// Widths a command parameter may take, in order.
pub const WIDTHS: [usize; 4] = [1, 2, 4, 8];

/// Narrowest width from [`WIDTHS`] that holds `v`.
#[inline]
pub fn int_len(v: u64) -> usize {
    if v <= u64::from(u8::MAX) {
        1
    } else if v <= u64::from(u16::MAX) {
        2
    } else if v <= u64::from(u32::MAX) {
        4
    } else {
        8
    }
}

/// Index of `width` within [`WIDTHS`].
#[inline]
pub fn width_index(width: usize) -> usize {
    match width {
        1 => 0,
        2 => 1,
        4 => 2,
        _ => 3,
    }
}

/// Append `v` as `width` big-endian bytes. `v` must fit.
#[inline]
pub fn put_be(out: &mut Vec<u8>, v: u64, width: usize) {
    debug_assert!(WIDTHS.contains(&width));
    debug_assert!(width == 8 || v >> (width * 8) == 0, "{v} does not fit {width} bytes");
    out.extend_from_slice(&v.to_be_bytes()[8 - width..]);
}

/// Read a big-endian integer occupying all of `bytes` (at most 8).
#[inline]
pub fn get_be(bytes: &[u8]) -> u64 {
    debug_assert!(bytes.len() <= 8);
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

#[inline]
pub fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

#[inline]
pub fn get_u32(bytes: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*bytes)
}
