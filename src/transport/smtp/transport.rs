use std::time::Duration;

use super::{ClientConfig, TlsPolicy, SUBMISSIONS_PORT};
use crate::{
    address::Envelope,
    error::{self, Error},
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        client::{Connector, NetworkConnector, SmtpSession, TlsParameters},
        extension::ClientId,
        response::Response,
    },
    Message, Transport,
};

/// Sends emails using the SMTP protocol
///
/// Each call opens its own connection, authenticates, and closes the
/// connection before returning, whatever the outcome. The client keeps no
/// state between calls and can be shared.
#[derive(Debug, Clone)]
pub struct SmtpClient<C = NetworkConnector> {
    config: ClientConfig,
    connector: C,
}

impl SmtpClient {
    /// Creates a client with default settings
    ///
    /// Does no I/O. See [`SmtpClient::builder`] for the defaults.
    pub fn new(
        host: impl Into<String>,
        port: impl Into<String>,
        secret: impl Into<String>,
    ) -> SmtpClient {
        Self::builder(host, port, secret).build()
    }

    /// Creates a client builder
    ///
    /// Defaults are:
    ///
    /// * [`TlsPolicy::Strict`]
    /// * A 60-seconds timeout for connecting and for every read and write
    /// * The local host name for EHLO
    /// * `PLAIN` authentication
    pub fn builder(
        host: impl Into<String>,
        port: impl Into<String>,
        secret: impl Into<String>,
    ) -> SmtpClientBuilder {
        SmtpClientBuilder {
            config: ClientConfig::new(host.into(), port.into(), secret.into()),
            connector: NetworkConnector,
        }
    }
}

impl<C: Connector> SmtpClient<C> {
    /// The configuration the client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Formats `message` and sends it to all its recipients
    ///
    /// Authenticates as the sender of the message. The transaction succeeds
    /// or fails as a whole, a single refused recipient fails the send.
    pub fn send(&self, message: &Message) -> Result<Response, Error> {
        let email = message.formatted().map_err(error::composition)?;
        let envelope = message.envelope().map_err(error::composition)?;

        self.send_as(message.from(), &envelope, &email)
    }

    /// Sends an already formatted email, authenticating as the envelope sender
    pub fn send_raw(&self, envelope: &Envelope, email: &[u8]) -> Result<Response, Error> {
        self.send_as(envelope.from(), envelope, email)
    }

    /// Connects and authenticates as `user`, without sending anything
    ///
    /// Useful to check a configuration before the first send.
    pub fn validate(&self, user: &str) -> Result<(), Error> {
        self.session(user, |_| Ok(()))
    }

    fn send_as(&self, user: &str, envelope: &Envelope, email: &[u8]) -> Result<Response, Error> {
        self.session(user, |session| {
            session
                .send(envelope, email)
                .map_err(error::transmission)
        })
    }

    /// Runs `f` on an authenticated session, then closes it
    ///
    /// QUIT follows a success, its failure does not change the result.
    /// Any failure aborts the session.
    fn session<T, F>(&self, user: &str, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut C::Session) -> Result<T, Error>,
    {
        let mut session = self.connection()?;

        let credentials = Credentials::new(user.to_owned(), self.config.secret.clone());
        let result = session
            .auth(&self.config.authentication, &credentials)
            .map_err(error::authentication)
            .and_then(|_| f(&mut session));

        match result {
            Ok(value) => {
                if let Err(_err) = session.quit() {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("QUIT failed after success: {}", _err);
                }
                Ok(value)
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("aborting session: {}", err);
                session.abort();
                Err(err)
            }
        }
    }

    /// Opens a session secured as the port and the [`TlsPolicy`] require
    fn connection(&self) -> Result<C::Session, Error> {
        let config = &self.config;
        let port = config.port.parse::<u16>().map_err(|err| {
            error::connection(format!("invalid port {:?}: {err}", config.port))
        })?;

        if port == SUBMISSIONS_PORT {
            let tls_parameters = self.tls_parameters()?;
            return self
                .connect(port, Some(&tls_parameters))
                .map_err(|err| {
                    if err.is_tls() {
                        error::tls(err)
                    } else {
                        error::connection(err)
                    }
                });
        }

        let mut session = self.connect(port, None).map_err(error::connection)?;

        if session.can_starttls() {
            let upgraded = self.tls_parameters().and_then(|tls_parameters| {
                session
                    .starttls(&tls_parameters, &config.hello_name)
                    .map_err(error::tls)
            });
            if let Err(err) = upgraded {
                session.abort();
                return Err(err);
            }
        } else {
            match config.tls_policy {
                TlsPolicy::Strict => {
                    session.abort();
                    return Err(error::tls("TLS not supported by the server, aborted"));
                }
                TlsPolicy::Opportunistic => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        "{} does not offer STARTTLS, continuing unencrypted",
                        config.host
                    );
                }
            }
        }

        Ok(session)
    }

    fn connect(
        &self,
        port: u16,
        tls_parameters: Option<&TlsParameters>,
    ) -> Result<C::Session, crate::transport::smtp::Error> {
        self.connector.connect(
            &self.config.host,
            port,
            self.config.timeout,
            &self.config.hello_name,
            tls_parameters,
        )
    }

    fn tls_parameters(&self) -> Result<TlsParameters, Error> {
        match self.config.tls_parameters {
            Some(ref tls_parameters) => Ok(tls_parameters.clone()),
            None => TlsParameters::new(self.config.host.clone()).map_err(error::tls),
        }
    }
}

impl<C: Connector> Transport for SmtpClient<C> {
    type Ok = Response;
    type Error = Error;

    fn send(&self, message: &Message) -> Result<Response, Error> {
        SmtpClient::send(self, message)
    }

    fn send_raw(&self, envelope: &Envelope, email: &[u8]) -> Result<Response, Error> {
        SmtpClient::send_raw(self, envelope, email)
    }
}

/// Contains client configuration.
/// Instances of this struct can be created using [`SmtpClient::builder`].
#[derive(Debug, Clone)]
pub struct SmtpClientBuilder<C = NetworkConnector> {
    config: ClientConfig,
    connector: C,
}

impl<C> SmtpClientBuilder<C> {
    /// Set the behaviour when STARTTLS is not offered
    pub fn tls_policy(mut self, tls_policy: TlsPolicy) -> Self {
        self.config.tls_policy = tls_policy;
        self
    }

    /// Set the timeout duration
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the name used during EHLO
    pub fn hello_name(mut self, name: ClientId) -> Self {
        self.config.hello_name = name;
        self
    }

    /// Set the authentication mechanisms to try, in order
    pub fn authentication(mut self, mechanisms: Vec<Mechanism>) -> Self {
        self.config.authentication = mechanisms;
        self
    }

    /// Set the TLS settings, e.g. to check the certificate against another name
    pub fn tls_parameters(mut self, tls_parameters: TlsParameters) -> Self {
        self.config.tls_parameters = Some(tls_parameters);
        self
    }

    /// Use another way to open sessions
    pub fn connector<D: Connector>(self, connector: D) -> SmtpClientBuilder<D> {
        SmtpClientBuilder {
            config: self.config,
            connector,
        }
    }

    /// Build the client
    pub fn build(self) -> SmtpClient<C> {
        SmtpClient {
            config: self.config,
            connector: self.connector,
        }
    }
}

#[cfg(test)]
mod test {
    use std::{cell::RefCell, rc::Rc};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::transport::smtp::{
        error as smtp_error,
        extension::ServerInfo,
        response::{Category, Code, Severity},
        Error as SmtpError,
    };

    type Log = Rc<RefCell<Vec<String>>>;

    /// What the fake server does
    #[derive(Clone)]
    struct Script {
        features: Vec<&'static str>,
        reject_auth: bool,
        reject_rcpt: bool,
    }

    impl Default for Script {
        fn default() -> Self {
            Script {
                features: vec!["STARTTLS", "AUTH PLAIN LOGIN"],
                reject_auth: false,
                reject_rcpt: false,
            }
        }
    }

    struct FakeConnector {
        script: Script,
        log: Log,
    }

    struct FakeSession {
        script: Script,
        log: Log,
        encrypted: bool,
        server_info: ServerInfo,
    }

    fn ok() -> Response {
        Response::new(
            Code::new(Severity::PositiveCompletion, Category::MailSystem, 0),
            vec!["OK".to_owned()],
        )
    }

    fn rejected(category: Category, detail: u8) -> SmtpError {
        smtp_error::code(
            Code::new(Severity::PermanentNegativeCompletion, category, detail),
            Some("rejected".to_owned()),
        )
    }

    fn server_info(features: &[&str]) -> ServerInfo {
        let mut lines = vec!["mx.example.org".to_owned()];
        lines.extend(features.iter().map(|feature| (*feature).to_owned()));
        ServerInfo::from_response(&Response::new(ok().code(), lines)).unwrap()
    }

    impl Connector for FakeConnector {
        type Session = FakeSession;

        fn connect(
            &self,
            host: &str,
            port: u16,
            _timeout: Option<Duration>,
            _hello_name: &ClientId,
            tls_parameters: Option<&TlsParameters>,
        ) -> Result<FakeSession, SmtpError> {
            let encrypted = tls_parameters.is_some();
            self.log.borrow_mut().push(format!(
                "connect {host}:{port}{}",
                if encrypted { " tls" } else { "" }
            ));

            Ok(FakeSession {
                script: self.script.clone(),
                log: Rc::clone(&self.log),
                encrypted,
                server_info: server_info(&self.script.features),
            })
        }
    }

    impl SmtpSession for FakeSession {
        fn server_info(&self) -> &ServerInfo {
            &self.server_info
        }

        fn is_encrypted(&self) -> bool {
            self.encrypted
        }

        fn starttls(
            &mut self,
            _tls_parameters: &TlsParameters,
            _hello_name: &ClientId,
        ) -> Result<(), SmtpError> {
            self.log.borrow_mut().push("starttls".to_owned());
            self.encrypted = true;
            Ok(())
        }

        fn auth(
            &mut self,
            mechanisms: &[Mechanism],
            credentials: &Credentials,
        ) -> Result<Response, SmtpError> {
            let mechanism = self
                .server_info
                .get_auth_mechanism(mechanisms)
                .ok_or_else(|| smtp_error::client("no mechanism"))?;
            self.log.borrow_mut().push(format!(
                "auth {mechanism} {} encrypted={}",
                credentials.identity(),
                self.encrypted
            ));

            if self.script.reject_auth {
                Err(rejected(Category::Unspecified3, 5))
            } else {
                Ok(ok())
            }
        }

        fn send(&mut self, envelope: &Envelope, email: &[u8]) -> Result<Response, SmtpError> {
            self.log.borrow_mut().push(format!(
                "send {} -> {} ({} bytes)",
                envelope.from(),
                envelope.to().join(","),
                email.len()
            ));

            if self.script.reject_rcpt {
                Err(rejected(Category::MailSystem, 0))
            } else {
                Ok(ok())
            }
        }

        fn quit(&mut self) -> Result<Response, SmtpError> {
            self.log.borrow_mut().push("quit".to_owned());
            Ok(ok())
        }

        fn abort(&mut self) {
            self.log.borrow_mut().push("abort".to_owned());
        }
    }

    fn client(port: &str, policy: TlsPolicy, script: Script) -> (SmtpClient<FakeConnector>, Log) {
        let log = Log::default();
        let client = SmtpClient::builder("smtp.example.org", port, "s3cret")
            .tls_policy(policy)
            .connector(FakeConnector {
                script,
                log: Rc::clone(&log),
            })
            .build();
        (client, log)
    }

    fn message() -> Message {
        Message::builder()
            .from("a@x.com")
            .to("b@y.com")
            .to("c@y.com")
            .subject("Hi")
            .attachment("r.txt", "data")
            .body("Hello")
            .unwrap()
    }

    fn events(log: &Log) -> Vec<String> {
        log.borrow().clone()
    }

    #[test]
    fn strict_requires_starttls() {
        let script = Script {
            features: vec!["AUTH PLAIN"],
            ..Script::default()
        };
        let (client, log) = client("587", TlsPolicy::Strict, script);

        let err = client.validate("user@x.com").unwrap_err();

        assert!(err.is_tls());
        assert_eq!(
            err.to_string(),
            "failed to secure the connection: TLS not supported by the server, aborted"
        );
        assert_eq!(events(&log), ["connect smtp.example.org:587", "abort"]);
    }

    #[test]
    fn strict_upgrades_before_auth() {
        let (client, log) = client("587", TlsPolicy::Strict, Script::default());

        client.validate("user@x.com").unwrap();

        assert_eq!(
            events(&log),
            [
                "connect smtp.example.org:587",
                "starttls",
                "auth PLAIN user@x.com encrypted=true",
                "quit"
            ]
        );
    }

    #[test]
    fn submissions_port_is_wrapped() {
        let script = Script {
            features: vec!["AUTH PLAIN"],
            ..Script::default()
        };
        let (client, log) = client("465", TlsPolicy::Strict, script);

        client.validate("user@x.com").unwrap();

        assert_eq!(
            events(&log),
            [
                "connect smtp.example.org:465 tls",
                "auth PLAIN user@x.com encrypted=true",
                "quit"
            ]
        );
    }

    #[test]
    fn opportunistic_falls_back_to_plain_text() {
        let script = Script {
            features: vec!["AUTH PLAIN"],
            ..Script::default()
        };
        let (client, log) = client("25", TlsPolicy::Opportunistic, script);

        client.send(&message()).unwrap();

        assert_eq!(
            events(&log),
            [
                "connect smtp.example.org:25",
                "auth PLAIN a@x.com encrypted=false",
                format!(
                    "send a@x.com -> b@y.com,c@y.com ({} bytes)",
                    message().formatted().unwrap().len()
                )
                .as_str(),
                "quit"
            ]
        );
    }

    #[test]
    fn opportunistic_still_upgrades() {
        let (client, log) = client("587", TlsPolicy::Opportunistic, Script::default());

        client.validate("user@x.com").unwrap();

        assert_eq!(events(&log)[1], "starttls");
    }

    #[test]
    fn rejected_auth_sends_nothing() {
        let script = Script {
            reject_auth: true,
            ..Script::default()
        };
        let (client, log) = client("587", TlsPolicy::Strict, script);

        let err = client.send(&message()).unwrap_err();

        assert!(err.is_authentication());
        assert_eq!(err.status().map(u16::from), Some(535));
        assert_eq!(
            events(&log),
            [
                "connect smtp.example.org:587",
                "starttls",
                "auth PLAIN a@x.com encrypted=true",
                "abort"
            ]
        );
    }

    #[test]
    fn no_common_mechanism_is_an_auth_error() {
        let script = Script {
            features: vec!["STARTTLS", "AUTH LOGIN"],
            ..Script::default()
        };
        let (client, log) = client("587", TlsPolicy::Strict, script);

        let err = client.validate("user@x.com").unwrap_err();

        assert!(err.is_authentication());
        assert_eq!(events(&log).last().map(String::as_str), Some("abort"));
    }

    #[test]
    fn rejected_recipient_is_a_transmission_error() {
        let script = Script {
            reject_rcpt: true,
            ..Script::default()
        };
        let (client, log) = client("587", TlsPolicy::Strict, script);

        let err = client.send(&message()).unwrap_err();

        assert!(err.is_transmission());
        assert_eq!(err.status().map(u16::from), Some(550));
        assert_eq!(events(&log).last().map(String::as_str), Some("abort"));
    }

    #[test]
    fn composition_errors_happen_before_connecting() {
        let (client, log) = client("587", TlsPolicy::Strict, Script::default());
        let message = Message::new("a@x.com", vec![], "Hi", "Hello", None);

        let err = client.send(&message).unwrap_err();

        assert!(err.is_composition());
        assert!(events(&log).is_empty());
    }

    #[test]
    fn invalid_port_is_a_connection_error() {
        let (client, log) = client("smtp", TlsPolicy::Strict, Script::default());

        let err = client.validate("user@x.com").unwrap_err();

        assert!(err.is_connection());
        assert!(events(&log).is_empty());
    }

    #[test]
    fn login_when_configured() {
        let script = Script {
            features: vec!["STARTTLS", "AUTH LOGIN"],
            ..Script::default()
        };
        let log = Log::default();
        let client = SmtpClient::builder("smtp.example.org", "587", "s3cret")
            .authentication(vec![Mechanism::Plain, Mechanism::Login])
            .connector(FakeConnector {
                script,
                log: Rc::clone(&log),
            })
            .build();

        client.validate("user@x.com").unwrap();

        assert_eq!(events(&log)[2], "auth LOGIN user@x.com encrypted=true");
    }
}
