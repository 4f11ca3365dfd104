//! Error type naming the stage of a send that failed

use std::{error::Error as StdError, fmt};

use crate::{
    transport::smtp::{self, response::Code},
    BoxError,
};

/// The errors returned by [`SmtpClient`](crate::SmtpClient) and by
/// [`Transport`](crate::Transport) implementations
///
/// Every failure is terminal for the call: nothing is retried. The kind
/// tells which stage failed, the [`source`](StdError::source) holds the
/// underlying cause, usually a [`transport::smtp::Error`](smtp::Error) or a
/// [`message::Error`](crate::message::Error).
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                source: source.map(Into::into),
            }),
        }
    }

    /// Returns true if the message could not be formatted
    pub fn is_composition(&self) -> bool {
        matches!(self.inner.kind, Kind::Composition)
    }

    /// Returns true if the server could not be reached or greeted
    pub fn is_connection(&self) -> bool {
        matches!(self.inner.kind, Kind::Connection)
    }

    /// Returns true if TLS failed, or was required and not offered
    pub fn is_tls(&self) -> bool {
        matches!(self.inner.kind, Kind::Tls)
    }

    /// Returns true if the credentials were rejected
    pub fn is_authentication(&self) -> bool {
        matches!(self.inner.kind, Kind::Authentication)
    }

    /// Returns true if the sender, a recipient or the content was refused,
    /// or the transfer broke
    pub fn is_transmission(&self) -> bool {
        matches!(self.inner.kind, Kind::Transmission)
    }

    /// Returns true if the error is caused by a timeout
    pub fn is_timeout(&self) -> bool {
        self.smtp_source().is_some_and(smtp::Error::is_timeout)
    }

    /// Returns the SMTP reply code, if the server answered with an error
    pub fn status(&self) -> Option<Code> {
        self.smtp_source().and_then(smtp::Error::status)
    }

    fn smtp_source(&self) -> Option<&smtp::Error> {
        self.inner
            .source
            .as_ref()
            .and_then(|source| source.downcast_ref::<smtp::Error>())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    /// Formatting the message failed
    Composition,
    /// DNS resolution, TCP connection, greeting or EHLO failed
    Connection,
    /// TLS handshake failed, or TLS was required and not offered
    Tls,
    /// AUTH failed
    Authentication,
    /// MAIL, RCPT or DATA failed
    Transmission,
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("mailsend::Error");

        builder.field("kind", &self.inner.kind);

        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.kind {
            Kind::Composition => f.write_str("failed to create email message")?,
            Kind::Connection => f.write_str("failed to connect to SMTP server")?,
            Kind::Tls => f.write_str("failed to secure the connection")?,
            Kind::Authentication => f.write_str("authentication failed")?,
            Kind::Transmission => f.write_str("failed to send email")?,
        };

        if let Some(ref e) = self.inner.source {
            write!(f, ": {e}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| {
            let r: &(dyn StdError + 'static) = &**e;
            r
        })
    }
}

pub(crate) fn composition<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Composition, Some(e))
}

pub(crate) fn connection<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Connection, Some(e))
}

pub(crate) fn tls<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Tls, Some(e))
}

pub(crate) fn authentication<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Authentication, Some(e))
}

pub(crate) fn transmission<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Transmission, Some(e))
}

#[cfg(test)]
mod test {
    use std::{error::Error as _, io};

    use super::*;
    use crate::message;

    #[test]
    fn display_names_the_stage() {
        let err = composition(message::Error::MissingRecipients);

        assert!(err.is_composition());
        assert_eq!(
            err.to_string(),
            "failed to create email message: missing destination address"
        );
        assert!(err.source().is_some());
        assert!(err.status().is_none());
    }

    #[test]
    fn status_and_timeout_come_from_smtp_source() {
        let rejected: smtp::Error = "535 5.7.8 Bad credentials\r\n"
            .parse::<smtp::response::Response>()
            .map(|response| smtp::error::code(response.code(), None))
            .unwrap();
        let err = authentication(rejected);

        assert!(err.is_authentication());
        assert_eq!(err.status().map(u16::from), Some(535));
        assert!(!err.is_timeout());

        let err = transmission(smtp::error::network(io::Error::new(
            io::ErrorKind::TimedOut,
            "too slow",
        )));
        assert!(err.is_transmission());
        assert!(err.is_timeout());
    }

    #[test]
    fn message_only_error() {
        let err = tls("TLS not supported by the server, aborted");

        assert!(err.is_tls());
        assert_eq!(
            err.to_string(),
            "failed to secure the connection: TLS not supported by the server, aborted"
        );
    }
}
