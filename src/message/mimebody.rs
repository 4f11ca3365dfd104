//! Streaming `multipart/*` body writer

use std::io::{self, Write};

use super::header::Headers;

/// Length of generated boundaries
const BOUNDARY_LEN: usize = 40;

/// Create a random MIME boundary.
pub(crate) fn make_boundary() -> String {
    std::iter::repeat_with(fastrand::alphanumeric)
        .take(BOUNDARY_LEN)
        .collect()
}

/// Writes the parts of a multipart body one after the other
///
/// The first delimiter opens the body directly. Every later delimiter and
/// the closing one are preceded by a CRLF, which belongs to the delimiter
/// and not to the part content ([RFC 2046 section
/// 5.1.1](https://tools.ietf.org/html/rfc2046#section-5.1.1)).
pub(crate) struct MultiPartWriter<W> {
    out: W,
    boundary: String,
    parts: usize,
}

impl<W: Write> MultiPartWriter<W> {
    pub(crate) fn new(out: W, boundary: String) -> Self {
        MultiPartWriter {
            out,
            boundary,
            parts: 0,
        }
    }

    /// Writes one part: delimiter, headers, blank line, then `content` verbatim
    pub(crate) fn part(&mut self, headers: &Headers, content: &[u8]) -> io::Result<()> {
        if self.parts > 0 {
            self.out.write_all(b"\r\n")?;
        }
        write!(self.out, "--{}\r\n{}\r\n", self.boundary, headers)?;
        self.out.write_all(content)?;
        self.parts += 1;
        Ok(())
    }

    /// Writes the closing delimiter and gives the writer back
    pub(crate) fn finish(mut self) -> io::Result<W> {
        write!(self.out, "\r\n--{}--\r\n", self.boundary)?;
        self.out.flush()?;
        Ok(self.out)
    }
}
