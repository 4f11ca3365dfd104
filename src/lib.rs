//! Mailsend composes `multipart/mixed` emails and submits them over SMTP.
//!
//! A message is a sender, recipients, a subject, a plain text body and any
//! number of attachments. [`SmtpClient`] connects to a submission server,
//! secures the connection, authenticates and transmits the message, then
//! closes the connection.
//!
//! ```rust,no_run
//! use mailsend::{Message, SmtpClient};
//!
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! let client = SmtpClient::new("smtp.example.com", "465", "app-password");
//!
//! // check the settings before the first send
//! client.validate("reports@example.com")?;
//!
//! let message = Message::builder()
//!     .from("reports@example.com")
//!     .to("team@example.com")
//!     .subject("Weekly report")
//!     .attachment("report.csv", "week,count\n42,7\n")
//!     .body("Report attached.")?;
//! client.send(&message)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! * **native-tls** (default): TLS through the platform library
//! * **rustls**: TLS through `rustls`, trusting the `webpki-roots` set
//! * **hostname** (default): use the local host name in `EHLO`
//! * **tracing**: log the SMTP exchange at `debug` level, credentials redacted
//! * **serde**: (de)serialize [`TlsPolicy`] and other configuration types
//!
//! At least one TLS backend is needed, `native-tls` is preferred when both
//! are enabled.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    rust_2018_idioms
)]

#[cfg(not(any(feature = "native-tls", feature = "rustls")))]
compile_error!("feature `native-tls` or `rustls` must be enabled to secure SMTP connections");

pub mod address;
pub mod error;
pub mod message;
pub mod transport;

pub use crate::{
    address::Envelope,
    error::Error,
    message::Message,
    transport::{
        smtp::{SmtpClient, TlsPolicy},
        Transport,
    },
};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;
