use std::{
    fmt::Display,
    io::{self, BufRead, BufReader, Write},
    net::{Shutdown, ToSocketAddrs},
    time::Duration,
};

#[cfg(feature = "tracing")]
use super::escape_crlf;
use super::{ClientCodec, NetworkStream, SmtpSession, TlsParameters};
use crate::{
    address::Envelope,
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        commands::{Auth, Data, Ehlo, Helo, Mail, Quit, Rcpt, Starttls},
        error::{self, Error},
        extension::{ClientId, Extension, MailBodyParameter, MailParameter, ServerInfo},
        response::{parse_response, Response},
    },
};

/// Upper bound on `334` round trips during AUTH
const MAX_CHALLENGES: u8 = 10;

/// Structure that implements the SMTP client
pub struct SmtpConnection {
    /// TCP stream between client and server
    stream: BufReader<NetworkStream>,
    /// Whether QUIT has been sent
    sent_quit: bool,
    /// Set once the stream or the reply framing can no longer be trusted
    broken: bool,
    /// Information about the server
    server_info: ServerInfo,
}

impl SmtpConnection {
    /// Get information about the server
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Connects to the configured server
    ///
    /// Reads the greeting, then sends EHLO and parses server information.
    /// Servers answering EHLO with a permanent error are greeted with HELO.
    pub fn connect<A: ToSocketAddrs>(
        server: A,
        timeout: Option<Duration>,
        hello_name: &ClientId,
        tls_parameters: Option<&TlsParameters>,
    ) -> Result<SmtpConnection, Error> {
        let stream = NetworkStream::connect(server, timeout, tls_parameters)?;
        let mut conn = SmtpConnection {
            stream: BufReader::new(stream),
            sent_quit: false,
            broken: false,
            server_info: ServerInfo::default(),
        };

        let _greeting = conn.read_response()?;
        #[cfg(feature = "tracing")]
        tracing::debug!("greeting: {:?}", _greeting.first_line());

        match conn.ehlo(hello_name) {
            Err(err) if err.is_permanent() => conn.helo(hello_name)?,
            other => other?,
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("server {}", conn.server_info);
        Ok(conn)
    }

    /// Runs one mail transaction
    ///
    /// Adds `BODY=8BITMIME` when the content is not plain ASCII and the
    /// server advertises it, and `SMTPUTF8` for non-ASCII addresses.
    pub fn send(&mut self, envelope: &Envelope, email: &[u8]) -> Result<Response, Error> {
        let mut mail_options = vec![];

        if envelope.has_non_ascii_addresses() {
            if !self.server_info.supports_feature(Extension::SmtpUtfEight) {
                return Err(error::client(
                    "Envelope contains non-ascii chars but server does not support SMTPUTF8",
                ));
            }
            mail_options.push(MailParameter::SmtpUtfEight);
        }

        if !email.is_ascii() {
            if self.server_info.supports_feature(Extension::EightBitMime) {
                mail_options.push(MailParameter::Body(MailBodyParameter::EightBitMime));
            } else {
                #[cfg(feature = "tracing")]
                tracing::warn!("sending 8bit content to a server without 8BITMIME");
            }
        }

        self.command(Mail::new(envelope.from(), mail_options))?;

        for to_address in envelope.to() {
            self.command(Rcpt::new(to_address))?;
        }

        self.command(Data)?;

        self.message(email)
    }

    /// Whether the connection can still be used
    pub fn has_broken(&self) -> bool {
        self.sent_quit || self.broken
    }

    /// Whether STARTTLS can be issued now
    pub fn can_starttls(&self) -> bool {
        !self.is_encrypted() && self.server_info.supports_feature(Extension::StartTls)
    }

    /// Sends STARTTLS, runs the handshake and greets the server again
    ///
    /// The features advertised before the upgrade are discarded.
    pub fn starttls(
        &mut self,
        tls_parameters: &TlsParameters,
        hello_name: &ClientId,
    ) -> Result<(), Error> {
        if !self.server_info.supports_feature(Extension::StartTls) {
            return Err(error::client("STARTTLS is not supported on this server"));
        }

        self.command(Starttls)?;
        if let Err(err) = self.stream.get_mut().upgrade_tls(tls_parameters) {
            self.broken = true;
            return Err(err);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("connection encrypted");

        self.ehlo(hello_name)
    }

    /// Send EHLO and update server info
    fn ehlo(&mut self, hello_name: &ClientId) -> Result<(), Error> {
        let ehlo_response = self.command(Ehlo::new(hello_name.clone()))?;
        self.server_info = ServerInfo::from_response(&ehlo_response)?;
        Ok(())
    }

    /// Send HELO, the server then advertises no extension
    fn helo(&mut self, hello_name: &ClientId) -> Result<(), Error> {
        let helo_response = self.command(Helo::new(hello_name.clone()))?;
        self.server_info = ServerInfo::from_helo_response(&helo_response);
        Ok(())
    }

    /// Sends QUIT
    pub fn quit(&mut self) -> Result<Response, Error> {
        self.sent_quit = true;
        self.command(Quit)
    }

    /// Sends QUIT if still possible and shuts the socket down, ignoring errors
    pub fn abort(&mut self) {
        if !self.has_broken() {
            let _ = self.quit();
        }

        let _ = self.stream.get_ref().shutdown(Shutdown::Both);
    }

    /// Tells if the underlying stream is currently encrypted
    pub fn is_encrypted(&self) -> bool {
        self.stream.get_ref().is_encrypted()
    }

    /// Set read and write timeouts
    pub fn set_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        self.stream.get_mut().set_read_timeout(duration)?;
        self.stream.get_mut().set_write_timeout(duration)
    }

    /// Sends an AUTH command with the first mechanism the server supports,
    /// and answers the challenges
    pub fn auth(
        &mut self,
        mechanisms: &[Mechanism],
        credentials: &Credentials,
    ) -> Result<Response, Error> {
        let mechanism = self
            .server_info
            .get_auth_mechanism(mechanisms)
            .ok_or_else(|| error::client("No compatible authentication mechanism was found"))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "authenticating as {} with {}",
            credentials.identity(),
            mechanism
        );

        let mut challenges = MAX_CHALLENGES;
        let auth = Auth::new(mechanism, credentials)?;
        let mut response = self.command_line(&auth.to_string(), true)?;

        while challenges > 0 && response.has_code(334) {
            challenges -= 1;
            let answer = Auth::new_from_response(mechanism, credentials, &response)?;
            response = self.command_line(&answer.to_string(), true)?;
        }

        if challenges == 0 {
            Err(error::response("Unexpected number of challenges"))
        } else {
            Ok(response)
        }
    }

    /// Sends the message content, dot-stuffed and terminated
    pub fn message(&mut self, message: &[u8]) -> Result<Response, Error> {
        let mut codec = ClientCodec::new();
        let mut out_buf = Vec::with_capacity(message.len());
        codec.encode(message, &mut out_buf);
        self.write_raw(&out_buf)?;
        self.write_raw(b"\r\n.\r\n")?;

        #[cfg(feature = "tracing")]
        tracing::debug!("wrote {} bytes of message content", out_buf.len());

        self.read_response()
    }

    /// Sends an SMTP command
    pub fn command<C: Display>(&mut self, command: C) -> Result<Response, Error> {
        self.command_line(&command.to_string(), false)
    }

    fn command_line(&mut self, line: &str, sensitive: bool) -> Result<Response, Error> {
        self.write_raw(line.as_bytes())?;

        #[cfg(feature = "tracing")]
        if sensitive {
            tracing::debug!(">> {}", redact_auth(line));
        } else {
            tracing::debug!(">> {}", escape_crlf(line));
        }
        #[cfg(not(feature = "tracing"))]
        let _ = sensitive;

        self.read_response()
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if self.broken {
            return Err(error::client("Connection is in a broken state"));
        }

        let res = {
            let stream = self.stream.get_mut();
            stream.write_all(bytes).and_then(|()| stream.flush())
        };
        res.map_err(|err| {
            self.broken = true;
            error::network(err)
        })
    }

    /// Gets the SMTP response
    ///
    /// Negative replies become errors carrying the reply code.
    pub fn read_response(&mut self) -> Result<Response, Error> {
        let mut buffer = String::with_capacity(100);

        loop {
            let read = self.stream.read_line(&mut buffer).map_err(|err| {
                self.broken = true;
                error::network(err)
            })?;
            if read == 0 {
                break;
            }

            match parse_response(&buffer) {
                Ok((_remaining, response)) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("<< {}", escape_crlf(&buffer));

                    return if response.is_positive() {
                        Ok(response)
                    } else {
                        Err(error::code(
                            response.code(),
                            Some(response.message().collect::<Vec<_>>().join(" ")),
                        ))
                    };
                }
                Err(nom::Err::Incomplete(_)) => {}
                Err(nom::Err::Failure(e)) | Err(nom::Err::Error(e)) => {
                    self.broken = true;
                    return Err(error::response(e.to_string()));
                }
            }
        }

        self.broken = true;
        Err(error::response("incomplete response"))
    }
}

/// Keeps the command and mechanism, hides the SASL payload
#[cfg(feature = "tracing")]
fn redact_auth(line: &str) -> String {
    let mut words = line.trim_end().splitn(3, ' ');
    match (words.next(), words.next(), words.next()) {
        (Some("AUTH"), Some(mechanism), Some(_)) => format!("AUTH {mechanism} <redacted><CRLF>"),
        (Some("AUTH"), Some(mechanism), None) => format!("AUTH {mechanism}<CRLF>"),
        _ => "<redacted><CRLF>".to_owned(),
    }
}

impl SmtpSession for SmtpConnection {
    fn server_info(&self) -> &ServerInfo {
        SmtpConnection::server_info(self)
    }

    fn is_encrypted(&self) -> bool {
        SmtpConnection::is_encrypted(self)
    }

    fn can_starttls(&self) -> bool {
        SmtpConnection::can_starttls(self)
    }

    fn starttls(
        &mut self,
        tls_parameters: &TlsParameters,
        hello_name: &ClientId,
    ) -> Result<(), Error> {
        SmtpConnection::starttls(self, tls_parameters, hello_name)
    }

    fn auth(
        &mut self,
        mechanisms: &[Mechanism],
        credentials: &Credentials,
    ) -> Result<Response, Error> {
        SmtpConnection::auth(self, mechanisms, credentials)
    }

    fn send(&mut self, envelope: &Envelope, email: &[u8]) -> Result<Response, Error> {
        SmtpConnection::send(self, envelope, email)
    }

    fn quit(&mut self) -> Result<Response, Error> {
        SmtpConnection::quit(self)
    }

    fn abort(&mut self) {
        SmtpConnection::abort(self)
    }
}
