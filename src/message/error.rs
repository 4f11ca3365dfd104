use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
    io,
};

/// Error type for message composition
///
/// Each variant names the step that failed.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// No sender was given to the builder
    MissingFrom,
    /// The message has no recipient
    MissingRecipients,
    /// A header-bound value contains a line break
    InvalidHeader {
        /// Header, or `filename` for an attachment name
        field: &'static str,
    },
    /// Writing the message headers failed
    Headers(io::Error),
    /// Writing the text body failed
    Body(io::Error),
    /// Writing one attachment failed
    Attachment {
        /// Name of the attachment being written
        filename: String,
        /// Underlying failure
        source: io::Error,
    },
    /// Writing the closing boundary failed
    Close(io::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingFrom => f.write_str("missing source address"),
            Error::MissingRecipients => f.write_str("missing destination address"),
            Error::InvalidHeader { field } => {
                write!(f, "{field} contains a line break")
            }
            Error::Headers(_) => f.write_str("failed to write email headers"),
            Error::Body(_) => f.write_str("failed to write email body"),
            Error::Attachment { filename, .. } => {
                write!(f, "failed to attach {filename:?}")
            }
            Error::Close(_) => f.write_str("failed to close multipart body"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Headers(err)
            | Error::Body(err)
            | Error::Close(err)
            | Error::Attachment { source: err, .. } => Some(err),
            Error::MissingFrom | Error::MissingRecipients | Error::InvalidHeader { .. } => None,
        }
    }
}
