//! SMTP commands, rendered through `Display` with their trailing CRLF

use std::fmt::{self, Display, Formatter};

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::transport::smtp::{
    authentication::{Credentials, Mechanism},
    error::{self, Error},
    extension::{ClientId, MailParameter},
    response::Response,
};

/// EHLO command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Ehlo {
    client_id: ClientId,
}

impl Display for Ehlo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "EHLO {}\r\n", self.client_id)
    }
}

impl Ehlo {
    /// Creates an EHLO command
    pub fn new(client_id: ClientId) -> Ehlo {
        Ehlo { client_id }
    }
}

/// HELO command, for servers that reject EHLO
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Helo {
    client_id: ClientId,
}

impl Display for Helo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "HELO {}\r\n", self.client_id)
    }
}

impl Helo {
    /// Creates a HELO command
    pub fn new(client_id: ClientId) -> Helo {
        Helo { client_id }
    }
}

/// STARTTLS command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub struct Starttls;

impl Display for Starttls {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("STARTTLS\r\n")
    }
}

/// MAIL command
///
/// The reverse path is sent as given, without any address validation.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Mail<'a> {
    sender: &'a str,
    parameters: Vec<MailParameter>,
}

impl Display for Mail<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "MAIL FROM:<{}>", self.sender)?;
        for parameter in &self.parameters {
            write!(f, " {parameter}")?;
        }
        f.write_str("\r\n")
    }
}

impl<'a> Mail<'a> {
    /// Creates a MAIL command
    pub fn new(sender: &'a str, parameters: Vec<MailParameter>) -> Mail<'a> {
        Mail { sender, parameters }
    }
}

/// RCPT command
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Rcpt<'a> {
    recipient: &'a str,
}

impl Display for Rcpt<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "RCPT TO:<{}>\r\n", self.recipient)
    }
}

impl<'a> Rcpt<'a> {
    /// Creates an RCPT command
    pub fn new(recipient: &'a str) -> Rcpt<'a> {
        Rcpt { recipient }
    }
}

/// DATA command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub struct Data;

impl Display for Data {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("DATA\r\n")
    }
}

/// QUIT command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub struct Quit;

impl Display for Quit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("QUIT\r\n")
    }
}

/// AUTH command, or a bare continuation line answering a `334` challenge
///
/// The `Debug` implementation does not print the encoded response.
#[derive(PartialEq, Eq, Clone)]
pub struct Auth {
    mechanism: Mechanism,
    response: Option<String>,
    continuation: bool,
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("mechanism", &self.mechanism)
            .field("continuation", &self.continuation)
            .finish_non_exhaustive()
    }
}

impl Display for Auth {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (self.continuation, &self.response) {
            (true, Some(response)) => f.write_str(response)?,
            (_, Some(response)) => write!(f, "AUTH {} {}", self.mechanism, response)?,
            (_, None) => write!(f, "AUTH {}", self.mechanism)?,
        }
        f.write_str("\r\n")
    }
}

impl Auth {
    /// Creates the initial AUTH command
    pub fn new(mechanism: Mechanism, credentials: &Credentials) -> Result<Auth, Error> {
        let response = if mechanism.supports_initial_response() {
            Some(STANDARD.encode(mechanism.response(credentials, None)?))
        } else {
            None
        };

        Ok(Auth {
            mechanism,
            response,
            continuation: false,
        })
    }

    /// Answers a `334` challenge sent by the server
    pub fn new_from_response(
        mechanism: Mechanism,
        credentials: &Credentials,
        response: &Response,
    ) -> Result<Auth, Error> {
        if !response.has_code(334) {
            return Err(error::response("Expecting a challenge"));
        }

        let encoded_challenge = response
            .first_word()
            .ok_or_else(|| error::response("Could not read auth challenge"))?;
        let decoded_challenge = STANDARD
            .decode(encoded_challenge)
            .map_err(error::response)?;
        let decoded_challenge = String::from_utf8(decoded_challenge).map_err(error::response)?;

        #[cfg(feature = "tracing")]
        tracing::debug!("auth decoded challenge: {}", decoded_challenge);

        let answer = mechanism.response(credentials, Some(&decoded_challenge))?;

        Ok(Auth {
            mechanism,
            response: Some(STANDARD.encode(answer)),
            continuation: true,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::smtp::{
        extension::MailBodyParameter,
        response::{Category, Code, Severity},
    };

    #[test]
    fn envelope_commands() {
        assert_eq!(
            Ehlo::new(ClientId::Domain("client.example".to_owned())).to_string(),
            "EHLO client.example\r\n"
        );
        assert_eq!(
            Helo::new(ClientId::Domain("client.example".to_owned())).to_string(),
            "HELO client.example\r\n"
        );
        assert_eq!(
            Mail::new("a@x.com", vec![]).to_string(),
            "MAIL FROM:<a@x.com>\r\n"
        );
        assert_eq!(
            Mail::new(
                "a@x.com",
                vec![MailParameter::Body(MailBodyParameter::EightBitMime)]
            )
            .to_string(),
            "MAIL FROM:<a@x.com> BODY=8BITMIME\r\n"
        );
        assert_eq!(Rcpt::new("b@y.com").to_string(), "RCPT TO:<b@y.com>\r\n");
        assert_eq!(Data.to_string(), "DATA\r\n");
        assert_eq!(Starttls.to_string(), "STARTTLS\r\n");
        assert_eq!(Quit.to_string(), "QUIT\r\n");
    }

    #[test]
    fn auth_plain_has_initial_response() {
        let credentials = Credentials::from(("user", "password"));

        assert_eq!(
            Auth::new(Mechanism::Plain, &credentials)
                .unwrap()
                .to_string(),
            "AUTH PLAIN AHVzZXIAcGFzc3dvcmQ=\r\n"
        );
    }

    #[test]
    fn auth_login_answers_challenges() {
        let credentials = Credentials::from(("alice", "wonderland"));
        let challenge = |text: &str| {
            Response::new(
                Code::new(Severity::PositiveIntermediate, Category::Unspecified3, 4),
                vec![text.to_owned()],
            )
        };

        assert_eq!(
            Auth::new(Mechanism::Login, &credentials)
                .unwrap()
                .to_string(),
            "AUTH LOGIN\r\n"
        );
        // "Username:" and "Password:"
        assert_eq!(
            Auth::new_from_response(Mechanism::Login, &credentials, &challenge("VXNlcm5hbWU6"))
                .unwrap()
                .to_string(),
            "YWxpY2U=\r\n"
        );
        assert_eq!(
            Auth::new_from_response(Mechanism::Login, &credentials, &challenge("UGFzc3dvcmQ6"))
                .unwrap()
                .to_string(),
            "d29uZGVybGFuZA==\r\n"
        );
        assert!(
            Auth::new_from_response(Mechanism::Login, &credentials, &challenge("!!!")).is_err()
        );
    }

    #[test]
    fn auth_debug_is_redacted() {
        let credentials = Credentials::from(("user", "password"));
        let auth = Auth::new(Mechanism::Plain, &credentials).unwrap();

        assert!(!format!("{auth:?}").contains("AHVzZXIAcGFzc3dvcmQ="));
    }
}
