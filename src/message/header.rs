//! Header lines of the message and of its parts

use std::fmt::{self, Display, Formatter};

use super::Error;

/// `From`
pub const FROM: &str = "From";
/// `To`
pub const TO: &str = "To";
/// `Subject`
pub const SUBJECT: &str = "Subject";
/// `MIME-Version`
pub const MIME_VERSION: &str = "MIME-Version";
/// `Content-Type`
pub const CONTENT_TYPE: &str = "Content-Type";
/// `Content-Disposition`
pub const CONTENT_DISPOSITION: &str = "Content-Disposition";

/// An ordered list of header lines
///
/// Values are written as given, without any encoding. `Display` renders
/// each header as `Name: value` followed by CRLF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    headers: Vec<(&'static str, String)>,
}

impl Headers {
    /// Create an empty `Headers`
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header, refusing values that would start a new line
    pub fn insert_raw(&mut self, name: &'static str, value: String) -> Result<(), Error> {
        check_line(name, &value)?;
        self.headers.push((name, value));
        Ok(())
    }

    /// First value of the header `name`, compared case-insensitively
    pub fn get_raw(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Number of header lines
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Whether no header was inserted
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl Display for Headers {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.headers {
            write!(f, "{name}: {value}\r\n")?;
        }

        Ok(())
    }
}

/// Fails when `value` holds a CR or LF, which would inject header lines
pub(crate) fn check_line(field: &'static str, value: &str) -> Result<(), Error> {
    if value.contains(['\r', '\n']) {
        Err(Error::InvalidHeader { field })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keeps_insertion_order() {
        let mut headers = Headers::new();
        headers.insert_raw(FROM, "a@x.com".to_owned()).unwrap();
        headers.insert_raw(TO, "b@y.com,c@y.com".to_owned()).unwrap();
        headers.insert_raw(SUBJECT, "Hi".to_owned()).unwrap();

        assert_eq!(
            headers.to_string(),
            "From: a@x.com\r\nTo: b@y.com,c@y.com\r\nSubject: Hi\r\n"
        );
        assert_eq!(headers.get_raw("subject"), Some("Hi"));
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn rejects_line_breaks() {
        let mut headers = Headers::new();

        assert!(matches!(
            headers.insert_raw(SUBJECT, "Hi\r\nBcc: evil@z.com".to_owned()),
            Err(Error::InvalidHeader { field: "Subject" })
        ));
        assert!(matches!(
            headers.insert_raw(SUBJECT, "Hi\nthere".to_owned()),
            Err(Error::InvalidHeader { field: "Subject" })
        ));
        assert!(headers.is_empty());
    }
}
