//! CRC-32 over response field names.
//!
//! Parameters: reflected polynomial `0xEDB88320`, initial state `!0`,
//! final XOR `!0`. The client firmware recomputes these checksums to look up
//! fields, so the bit pattern is fixed.

/// Reflected generator polynomial.
pub const POLYNOMIAL: u32 = 0xEDB8_8320;

const TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut c = i as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { POLYNOMIAL ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[i] = c;
        i += 1;
    }
    table
}

/// Computes the checksum of `bytes`.
#[must_use]
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = !0u32;
    for &b in bytes {
        crc = (crc >> 8) ^ TABLE[((crc ^ u32::from(b)) & 0xFF) as usize];
    }
    !crc
}

/// Renders the checksum of a field name as the unsigned decimal key used on
/// the wire.
#[must_use]
pub fn field_key(name: &str) -> String {
    crc32(name.as_bytes()).to_string()
}
