//! Packed binary-coded-decimal (BCD) codec for subscriber identifiers.
//!
//! Wire format:
//! ```text
//! byte 0: [digit 2 : high nibble][digit 1 : low nibble]
//! byte 1: [digit 4 : high nibble][digit 3 : low nibble]
//! ...
//! last:   [0xF (no digit)       ][digit N : low nibble]   (odd N only)
//! ```
//!
//! # What is BCD? (for beginners)
//!
//! An IMSI is a string of up to 15 decimal digits.  Sending it as ASCII text
//! costs one byte per digit, but a single decimal digit only needs 4 bits
//! (values 0–9).  BCD packs two digits into each byte: the *earlier* digit
//! goes into the low nibble (bits 0–3) and the *later* digit into the high
//! nibble (bits 4–7).  The IMSI `"12345"` therefore becomes:
//!
//! ```text
//! "12" -> 0x21    "34" -> 0x43    "5" -> 0xF5
//! ```
//!
//! When the digit count is odd the final high nibble has nothing to carry, so
//! it is filled with the sentinel `0xF` ("no digit").  The decoder stops as
//! soon as it sees that sentinel.
//!
//! # Undefined nibbles
//!
//! Nibble values `0xA`–`0xE` are not digits.  The decoder rejects them with
//! [`BcdError::InvalidNibble`] instead of producing a non-digit character, so
//! a successfully decoded identifier always consists of ASCII digits only.
//! The sentinel is only legal in the high nibble; a `0xF` low nibble is also
//! rejected.

use thiserror::Error;

/// The nibble value that marks "no digit" in the final half-byte.
pub const SENTINEL_NIBBLE: u8 = 0x0F;

/// Errors that can occur while encoding or decoding a packed identifier.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BcdError {
    /// The identifier to encode was the empty string.
    #[error("identifier is empty")]
    Empty,

    /// The identifier to encode contains a character that is not `0`–`9`.
    #[error("identifier must contain only decimal digits, found {found:?} at position {position}")]
    InvalidDigit { position: usize, found: char },

    /// A wire byte carries a nibble that is neither a digit nor a legal sentinel.
    #[error("invalid BCD nibble 0x{nibble:X} in byte {offset}")]
    InvalidNibble { offset: usize, nibble: u8 },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a decimal identifier into its packed BCD form.
///
/// # Errors
///
/// Returns [`BcdError::Empty`] for an empty string and
/// [`BcdError::InvalidDigit`] if any character is not an ASCII digit.
///
/// # Examples
///
/// ```rust
/// use pgw_core::protocol::bcd::{decode, encode};
///
/// let bytes = encode("12345").unwrap();
/// assert_eq!(bytes, vec![0x21, 0x43, 0xF5]);
/// assert_eq!(decode(&bytes).unwrap(), "12345");
/// ```
pub fn encode(imsi: &str) -> Result<Vec<u8>, BcdError> {
    if imsi.is_empty() {
        return Err(BcdError::Empty);
    }

    if let Some((position, found)) = imsi.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        return Err(BcdError::InvalidDigit { position, found });
    }

    // Every byte is now an ASCII digit, so byte-wise arithmetic is safe.
    let digits = imsi.as_bytes();
    let mut packed = Vec::with_capacity(digits.len().div_ceil(2));
    for pair in digits.chunks(2) {
        let low = pair[0] - b'0';
        let high = pair.get(1).map_or(SENTINEL_NIBBLE, |d| d - b'0');
        packed.push((high << 4) | low);
    }
    Ok(packed)
}

/// Decodes a packed BCD byte sequence back into a decimal identifier.
///
/// Bytes are processed in order.  For each byte the low-nibble digit is
/// emitted first; if the high nibble is the sentinel, decoding stops there and
/// any remaining bytes are ignored.  An empty slice decodes to an empty string.
///
/// # Errors
///
/// Returns [`BcdError::InvalidNibble`] if a nibble holds `0xA`–`0xE`, or if
/// the sentinel appears in a low nibble.
pub fn decode(bytes: &[u8]) -> Result<String, BcdError> {
    let mut imsi = String::with_capacity(bytes.len() * 2);

    for (offset, &byte) in bytes.iter().enumerate() {
        imsi.push(nibble_to_digit(byte & 0x0F, offset)?);

        let high = byte >> 4;
        if high == SENTINEL_NIBBLE {
            break;
        }
        imsi.push(nibble_to_digit(high, offset)?);
    }

    Ok(imsi)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn nibble_to_digit(nibble: u8, offset: usize) -> Result<char, BcdError> {
    if nibble <= 9 {
        Ok(char::from(b'0' + nibble))
    } else {
        Err(BcdError::InvalidNibble { offset, nibble })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
