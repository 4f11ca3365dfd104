//! Envelope addresses
//!
//! Addresses are carried as plain strings: the relay server is trusted to
//! check their syntax. Only what would break the SMTP framing is rejected.

mod envelope;

pub use self::envelope::{Envelope, EnvelopeError};
