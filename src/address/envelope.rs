use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
};

/// Simple email envelope representation
///
/// The reverse path goes to `MAIL FROM`, each forward path to one
/// `RCPT TO`.
#[derive(PartialEq, Eq, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Envelope {
    /// The envelope recipients' addresses
    ///
    /// This can not be empty.
    forward_path: Vec<String>,
    /// The envelope sender address
    reverse_path: String,
}

impl Envelope {
    /// Creates a new envelope, which may fail if `to` is empty.
    ///
    /// ```
    /// # use mailsend::address::Envelope;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let envelope = Envelope::new("from@email.com".to_owned(), vec!["to@email.com".to_owned()])?;
    /// assert_eq!(envelope.from(), "from@email.com");
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// If `to` has no elements in it, or if an address contains a line break.
    pub fn new(from: String, to: Vec<String>) -> Result<Envelope, EnvelopeError> {
        if to.is_empty() {
            return Err(EnvelopeError::MissingTo);
        }
        if let Some(address) = std::iter::once(&from)
            .chain(to.iter())
            .find(|address| address.contains(['\r', '\n']))
        {
            return Err(EnvelopeError::LineBreak(address.clone()));
        }

        Ok(Envelope {
            forward_path: to,
            reverse_path: from,
        })
    }

    /// Gets the destination addresses of the envelope.
    pub fn to(&self) -> &[String] {
        self.forward_path.as_slice()
    }

    /// Gets the sender of the envelope.
    pub fn from(&self) -> &str {
        &self.reverse_path
    }

    /// Check if any of the addresses in the envelope contains non-ascii chars
    pub(crate) fn has_non_ascii_addresses(&self) -> bool {
        !self.reverse_path.is_ascii() || self.forward_path.iter().any(|a| !a.is_ascii())
    }
}

/// Reasons an [`Envelope`] can't be built
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EnvelopeError {
    /// No recipient was given
    MissingTo,
    /// This address would end the SMTP command early
    LineBreak(String),
}

impl Display for EnvelopeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeError::MissingTo => f.write_str("missing destination address"),
            EnvelopeError::LineBreak(address) => {
                write!(f, "address contains a line break: {address:?}")
            }
        }
    }
}

impl StdError for EnvelopeError {}
