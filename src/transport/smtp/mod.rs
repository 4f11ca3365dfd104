//! The SMTP transport sends emails using the SMTP protocol.
//!
//! This SMTP client follows [RFC 5321](https://tools.ietf.org/html/rfc5321)
//! and hands one message to a relay server per connection.
//!
//! It implements the following extensions:
//!
//! * 8BITMIME ([RFC 6152](https://tools.ietf.org/html/rfc6152))
//! * SMTPUTF8 ([RFC 6531](https://tools.ietf.org/html/rfc6531))
//! * AUTH ([RFC 4954](https://tools.ietf.org/html/rfc4954)) with PLAIN and LOGIN mechanisms
//! * STARTTLS ([RFC 3207](https://tools.ietf.org/html/rfc3207))
//!
//! #### Securing the connection
//!
//! On port 465 ([`SUBMISSIONS_PORT`]) the connection is wrapped in TLS
//! before the greeting. On any other port the client connects in plain
//! text and upgrades with STARTTLS. What happens when the server does not
//! offer STARTTLS is the [`TlsPolicy`]: [`Strict`](TlsPolicy::Strict), the
//! default, aborts before any credential is sent, while
//! [`Opportunistic`](TlsPolicy::Opportunistic) carries on in plain text.
//!
//! #### Example
//!
//! ```rust,no_run
//! use mailsend::{Message, SmtpClient};
//!
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! let email = Message::builder()
//!     .from("nobody@domain.tld")
//!     .to("hei@domain.tld")
//!     .subject("Happy new year")
//!     .attachment("card.txt", "Best wishes")
//!     .body("Be happy!")?;
//!
//! // Authenticates as nobody@domain.tld with this secret
//! let client = SmtpClient::new("smtp.domain.tld", "587", "password");
//! client.send(&email)?;
//! # Ok(())
//! # }
//! ```
//!
//! #### Lower level
//!
//! You can also send commands, here is a simple email transaction without
//! error handling:
//!
//! ```rust,no_run
//! use mailsend::transport::smtp::{SMTP_PORT, extension::ClientId, commands::*, client::SmtpConnection};
//!
//! let hello = ClientId::Domain("my_hostname".to_owned());
//! let mut client = SmtpConnection::connect(("localhost", SMTP_PORT), None, &hello, None).unwrap();
//! client.command(Mail::new("user@example.com", vec![])).unwrap();
//! client.command(Rcpt::new("user@example.org")).unwrap();
//! client.command(Data).unwrap();
//! client.message(b"Test email").unwrap();
//! client.command(Quit).unwrap();
//! ```

use std::{fmt, time::Duration};

pub use self::{
    error::Error,
    transport::{SmtpClient, SmtpClientBuilder},
};
use crate::transport::smtp::{
    authentication::{Mechanism, DEFAULT_MECHANISMS},
    client::TlsParameters,
    extension::ClientId,
};

pub mod authentication;
pub mod client;
pub mod commands;
pub(crate) mod error;
pub mod extension;
pub mod response;
mod transport;

// Registered port numbers:
// https://www.iana.org/assignments/service-names-port-numbers/service-names-port-numbers.xhtml

/// Default smtp port
pub const SMTP_PORT: u16 = 25;
/// Default submission port
pub const SUBMISSION_PORT: u16 = 587;
/// Default submission over TLS port
///
/// Connections to this port are TLS-wrapped from the start
/// (<https://tools.ietf.org/html/rfc8314>).
pub const SUBMISSIONS_PORT: u16 = 465;

/// Default timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// What to do when a plain text connection can't be upgraded
///
/// Connections to [`SUBMISSIONS_PORT`] are encrypted from the start and
/// never look at the policy.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TlsPolicy {
    /// Require `STARTTLS`, fail before authenticating when it is not offered
    #[default]
    Strict,
    /// Use `STARTTLS` when offered, otherwise authenticate in plain text
    ///
    /// Credentials and content then travel unencrypted. Only meant for
    /// legacy relays on trusted networks.
    Opportunistic,
}

/// Everything needed to reach and authenticate against a server
///
/// Read-only once the client is built. The `Debug` implementation does not
/// print the secret.
#[derive(Clone)]
pub struct ClientConfig {
    /// Server host name or IP address, also the name checked in its certificate
    pub(crate) host: String,
    /// Server port, kept as given, e.g. `"587"`
    pub(crate) port: String,
    /// AUTH secret
    pub(crate) secret: String,
    pub(crate) tls_policy: TlsPolicy,
    /// Connect, read and write timeout
    pub(crate) timeout: Option<Duration>,
    /// Name sent with EHLO
    pub(crate) hello_name: ClientId,
    /// Mechanisms to try, in order
    pub(crate) authentication: Vec<Mechanism>,
    /// Overrides the default certificate checks for `host`
    pub(crate) tls_parameters: Option<TlsParameters>,
}

impl ClientConfig {
    pub(crate) fn new(host: String, port: String, secret: String) -> Self {
        ClientConfig {
            host,
            port,
            secret,
            tls_policy: TlsPolicy::default(),
            timeout: Some(DEFAULT_TIMEOUT),
            hello_name: ClientId::default(),
            authentication: DEFAULT_MECHANISMS.into(),
            tls_parameters: None,
        }
    }

    /// Server host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Server port, as configured
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Behaviour when STARTTLS is not offered
    pub fn tls_policy(&self) -> TlsPolicy {
        self.tls_policy
    }

    /// Connect, read and write timeout
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Name sent with EHLO
    pub fn hello_name(&self) -> &ClientId {
        &self.hello_name
    }

    /// Mechanisms tried, in order
    pub fn authentication(&self) -> &[Mechanism] {
        &self.authentication
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls_policy", &self.tls_policy)
            .field("timeout", &self.timeout)
            .field("hello_name", &self.hello_name)
            .field("authentication", &self.authentication)
            .field("tls_parameters", &self.tls_parameters)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::new(
            "smtp.example.org".to_owned(),
            "587".to_owned(),
            "s3cret".to_owned(),
        );

        assert_eq!(config.tls_policy(), TlsPolicy::Strict);
        assert_eq!(config.timeout(), Some(DEFAULT_TIMEOUT));
        assert_eq!(config.authentication(), [Mechanism::Plain]);
        assert_eq!(config.port(), "587");
    }

    #[test]
    fn debug_hides_secret() {
        let config = ClientConfig::new(
            "smtp.example.org".to_owned(),
            "587".to_owned(),
            "s3cret".to_owned(),
        );

        let debug = format!("{config:?}");
        assert!(debug.contains("smtp.example.org"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    #[cfg(feature = "serde")]
    fn tls_policy_serde() {
        assert_eq!(
            serde_json::to_string(&TlsPolicy::Opportunistic).unwrap(),
            "\"opportunistic\""
        );
        assert_eq!(
            serde_json::from_str::<TlsPolicy>("\"strict\"").unwrap(),
            TlsPolicy::Strict
        );
    }
}
