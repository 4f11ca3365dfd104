//! SMTP client
//!
//! `SmtpConnection` allows manually sending SMTP commands.
//!
//! ```rust,no_run
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! use mailsend::address::Envelope;
//! use mailsend::transport::smtp::{client::SmtpConnection, extension::ClientId, SMTP_PORT};
//!
//! let hello = ClientId::Domain("my_hostname".to_owned());
//! let mut client = SmtpConnection::connect(("localhost", SMTP_PORT), None, &hello, None)?;
//! let envelope = Envelope::new("user@example.com".to_owned(), vec!["root@example.org".to_owned()])?;
//! client.send(&envelope, b"Subject: Test\r\n\r\nTest email")?;
//! client.quit()?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

pub use self::{
    connection::SmtpConnection,
    net::NetworkStream,
    tls::{Certificate, TlsParameters, TlsParametersBuilder},
};
use crate::{
    address::Envelope,
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        error::Error,
        extension::{ClientId, ServerInfo},
        response::Response,
    },
};

mod connection;
mod net;
mod tls;

/// The codec used for transparency
///
/// Doubles the leading dot of every line ([RFC 5321 section
/// 4.5.2](https://tools.ietf.org/html/rfc5321#section-4.5.2)). The state
/// carries over between calls, so a message can be encoded in chunks.
#[derive(Default, Clone, Copy, Debug)]
pub struct ClientCodec {
    /// Bytes of a `CRLF.` sequence seen so far
    escape_count: u8,
}

impl ClientCodec {
    /// Creates a new client codec
    pub fn new() -> Self {
        ClientCodec::default()
    }

    /// Adds transparency
    pub fn encode(&mut self, frame: &[u8], buf: &mut Vec<u8>) {
        let mut start = 0;
        for (idx, byte) in frame.iter().enumerate() {
            self.escape_count = match (self.escape_count, byte) {
                (0, b'\r') | (1, b'\r') | (2, b'\r') => 1,
                (1, b'\n') => 2,
                (2, b'.') => 3,
                _ => 0,
            };
            if self.escape_count == 3 {
                self.escape_count = 0;
                buf.extend_from_slice(&frame[start..idx]);
                buf.push(b'.');
                start = idx;
            }
        }
        buf.extend_from_slice(&frame[start..]);
    }
}

/// Returns the string replacing all the CRLF with "\<CRLF\>"
/// Used for debug displays
#[cfg(feature = "tracing")]
pub(super) fn escape_crlf(string: &str) -> String {
    string.replace("\r\n", "<CRLF>")
}

/// An established SMTP session, greeted and past EHLO
///
/// This is the seam between the client policy (which TLS mode, when to
/// authenticate) and the wire. [`SmtpConnection`] is the network
/// implementation.
pub trait SmtpSession {
    /// What the server advertised in its last EHLO reply
    fn server_info(&self) -> &ServerInfo;

    /// Whether the session runs over TLS
    fn is_encrypted(&self) -> bool;

    /// Whether STARTTLS can be issued now
    fn can_starttls(&self) -> bool {
        !self.is_encrypted()
            && self
                .server_info()
                .supports_feature(crate::transport::smtp::extension::Extension::StartTls)
    }

    /// Upgrades the session in place with STARTTLS, then greets again
    fn starttls(
        &mut self,
        tls_parameters: &TlsParameters,
        hello_name: &ClientId,
    ) -> Result<(), Error>;

    /// Authenticates with the first of `mechanisms` the server supports
    fn auth(
        &mut self,
        mechanisms: &[Mechanism],
        credentials: &Credentials,
    ) -> Result<Response, Error>;

    /// Runs one mail transaction: MAIL, one RCPT per recipient, DATA
    fn send(&mut self, envelope: &Envelope, email: &[u8]) -> Result<Response, Error>;

    /// Ends the session politely
    fn quit(&mut self) -> Result<Response, Error>;

    /// Tears the session down after a failure, ignoring errors
    fn abort(&mut self);
}

/// Opens [`SmtpSession`]s
pub trait Connector {
    /// The session type produced
    type Session: SmtpSession;

    /// Connects to `host:port`, TLS-wrapped when `tls_parameters` is given,
    /// reads the greeting and sends EHLO
    fn connect(
        &self,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
        hello_name: &ClientId,
        tls_parameters: Option<&TlsParameters>,
    ) -> Result<Self::Session, Error>;
}

/// Connects over TCP, the default [`Connector`]
#[derive(Debug, Default, Clone, Copy)]
pub struct NetworkConnector;

impl Connector for NetworkConnector {
    type Session = SmtpConnection;

    fn connect(
        &self,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
        hello_name: &ClientId,
        tls_parameters: Option<&TlsParameters>,
    ) -> Result<SmtpConnection, Error> {
        SmtpConnection::connect((host, port), timeout, hello_name, tls_parameters)
    }
}
