//! Composes `multipart/mixed` messages with a text body and attachments
//!
//! ```rust
//! use mailsend::Message;
//!
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! let message = Message::builder()
//!     .from("a@x.com")
//!     .to("b@y.com")
//!     .to("c@y.com")
//!     .subject("Hi")
//!     .attachment("r.txt", "data")
//!     .body("Hello")?;
//!
//! let payload = message.formatted()?;
//! # Ok(())
//! # }
//! ```
//!
//! Which produces, with a fresh random boundary on every call:
//!
//! ```sh
//! From: a@x.com
//! To: b@y.com,c@y.com
//! Subject: Hi
//! MIME-Version: 1.0
//! Content-Type: multipart/mixed; boundary=Wq0Fx3n5RqGkDlpu7Zb0mBvA1JZ6LWmH9tceYJ2o
//!
//! --Wq0Fx3n5RqGkDlpu7Zb0mBvA1JZ6LWmH9tceYJ2o
//! Content-Type: text/plain
//!
//! Hello
//! --Wq0Fx3n5RqGkDlpu7Zb0mBvA1JZ6LWmH9tceYJ2o
//! Content-Type: application/octet-stream
//! Content-Disposition: attachment; filename="r.txt"
//!
//! data
//! --Wq0Fx3n5RqGkDlpu7Zb0mBvA1JZ6LWmH9tceYJ2o--
//! ```
//!
//! Lines end with CRLF. Header values are not encoded: a line break in the
//! sender, a recipient, the subject or a filename is refused, while a
//! double quote in a filename is written as is and ends the quoted string.

use std::{collections::BTreeMap, io::Write};

pub use self::error::Error;
use self::{
    header::{Headers, CONTENT_DISPOSITION, CONTENT_TYPE, FROM, MIME_VERSION, SUBJECT, TO},
    mimebody::{make_boundary, MultiPartWriter},
};
use crate::address::{Envelope, EnvelopeError};

mod error;
pub mod header;
mod mimebody;

/// Attachment contents by filename
pub type Attachments = BTreeMap<String, Vec<u8>>;

/// An outbound email: sender, recipients, subject, text body and attachments
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    from: String,
    to: Vec<String>,
    subject: String,
    body: String,
    attachments: Attachments,
}

impl Message {
    /// Creates a message from its parts
    ///
    /// Nothing is checked here, see [`Message::formatted`].
    pub fn new(
        from: impl Into<String>,
        to: Vec<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        attachments: Option<Attachments>,
    ) -> Message {
        Message {
            from: from.into(),
            to,
            subject: subject.into(),
            body: body.into(),
            attachments: attachments.unwrap_or_default(),
        }
    }

    /// Creates a new empty message builder
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    /// Sender address, also the identity used to authenticate when sending
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Recipients, in order
    pub fn to(&self) -> &[String] {
        &self.to
    }

    /// Subject line
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Text body
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Attachments, sorted by filename
    pub fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    /// The SMTP envelope: `from` as reverse path, every `to` as forward path
    pub fn envelope(&self) -> Result<Envelope, EnvelopeError> {
        Envelope::new(self.from.clone(), self.to.clone())
    }

    /// Top level headers for a body delimited by `boundary`
    fn headers(&self, boundary: &str) -> Result<Headers, Error> {
        if self.to.is_empty() {
            return Err(Error::MissingRecipients);
        }

        let mut headers = Headers::new();
        headers.insert_raw(FROM, self.from.clone())?;
        headers.insert_raw(TO, self.to.join(","))?;
        headers.insert_raw(SUBJECT, self.subject.clone())?;
        headers.insert_raw(MIME_VERSION, "1.0".to_owned())?;
        headers.insert_raw(
            CONTENT_TYPE,
            format!("multipart/mixed; boundary={boundary}"),
        )?;
        Ok(headers)
    }

    /// Streams the formatted message into `out`
    ///
    /// Header values are checked before anything is written. An I/O error
    /// can still leave a truncated message in `out`.
    pub fn write_to<W: Write>(&self, mut out: W) -> Result<W, Error> {
        let boundary = make_boundary();
        let headers = self.headers(&boundary)?;

        let mut body_headers = Headers::new();
        body_headers.insert_raw(CONTENT_TYPE, mime::TEXT_PLAIN.essence_str().to_owned())?;

        let mut parts = Vec::with_capacity(self.attachments.len());
        for (filename, content) in &self.attachments {
            header::check_line("filename", filename)?;

            let mut part_headers = Headers::new();
            part_headers.insert_raw(
                CONTENT_TYPE,
                mime::APPLICATION_OCTET_STREAM.essence_str().to_owned(),
            )?;
            part_headers.insert_raw(
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            )?;
            parts.push((filename, part_headers, content));
        }

        write!(out, "{headers}\r\n").map_err(Error::Headers)?;

        let mut writer = MultiPartWriter::new(out, boundary);
        writer
            .part(&body_headers, self.body.as_bytes())
            .map_err(Error::Body)?;
        for (filename, part_headers, content) in parts {
            writer
                .part(&part_headers, content)
                .map_err(|source| Error::Attachment {
                    filename: filename.clone(),
                    source,
                })?;
        }
        writer.finish().map_err(Error::Close)
    }

    /// Formats the whole message
    ///
    /// A new boundary is drawn on every call.
    pub fn formatted(&self) -> Result<Vec<u8>, Error> {
        let size = self.body.len()
            + self
                .attachments
                .iter()
                .map(|(name, content)| name.len() + content.len() + 128)
                .sum::<usize>()
            + 512;
        self.write_to(Vec::with_capacity(size))
    }
}

/// A builder for messages
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<String>,
    to: Vec<String>,
    subject: String,
    attachments: Attachments,
}

impl MessageBuilder {
    /// Creates a new default message builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `From` header and envelope sender
    pub fn from(mut self, address: impl Into<String>) -> Self {
        self.from = Some(address.into());
        self
    }

    /// Add a recipient
    ///
    /// Can be called multiple times.
    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to.push(address.into());
        self
    }

    /// Set `Subject` header
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Add an attachment, replacing any previous one with the same name
    pub fn attachment(mut self, filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.attachments.insert(filename.into(), content.into());
        self
    }

    /// Create message with the given text body
    pub fn body(self, body: impl Into<String>) -> Result<Message, Error> {
        let from = self.from.ok_or(Error::MissingFrom)?;
        if self.to.is_empty() {
            return Err(Error::MissingRecipients);
        }

        Ok(Message {
            from,
            to: self.to,
            subject: self.subject,
            body: body.into(),
            attachments: self.attachments,
        })
    }
}
