//! ### Sending Messages
//!
//! A transport hands formatted messages to a mail server. The only one
//! provided is [`SmtpClient`](smtp::SmtpClient), which submits over SMTP
//! with TLS or STARTTLS and authentication.

use crate::{address::Envelope, error, Message};

pub mod smtp;

/// Blocking Transport method for emails
pub trait Transport {
    /// Response produced by the Transport
    type Ok;
    /// Error produced by the Transport
    type Error: From<crate::Error>;

    /// Sends the email
    fn send(&self, message: &Message) -> Result<Self::Ok, Self::Error> {
        let raw = message.formatted().map_err(error::composition)?;
        let envelope = message.envelope().map_err(error::composition)?;
        self.send_raw(&envelope, &raw)
    }

    /// Sends an already formatted email
    fn send_raw(&self, envelope: &Envelope, email: &[u8]) -> Result<Self::Ok, Self::Error>;
}
