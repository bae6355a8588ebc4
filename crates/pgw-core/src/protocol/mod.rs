//! Protocol module containing the IMSI codec and the reply vocabulary.

pub mod bcd;
pub mod reply;

pub use bcd::{decode, encode, BcdError, SENTINEL_NIBBLE};
pub use reply::{ReplyParseError, SessionOutcome};
