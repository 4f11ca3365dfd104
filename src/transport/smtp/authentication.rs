//! SASL mechanisms used with the `AUTH` command

use std::fmt::{self, Debug, Display, Formatter};

use crate::transport::smtp::error::{self, Error};

/// Mechanisms tried when none are configured
pub const DEFAULT_MECHANISMS: &[Mechanism] = &[Mechanism::Plain];

/// Authentication identity and secret
///
/// The secret is never printed by the `Debug` implementation.
#[derive(PartialEq, Eq, Clone, Hash)]
pub struct Credentials {
    authentication_identity: String,
    secret: String,
}

impl Credentials {
    /// Create a `Credentials` struct from username and password
    pub fn new(username: String, password: String) -> Credentials {
        Credentials {
            authentication_identity: username,
            secret: password,
        }
    }

    /// The identity the client authenticates as
    pub fn identity(&self) -> &str {
        &self.authentication_identity
    }
}

impl<S, T> From<(S, T)> for Credentials
where
    S: Into<String>,
    T: Into<String>,
{
    fn from((username, password): (S, T)) -> Self {
        Credentials::new(username.into(), password.into())
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("authentication_identity", &self.authentication_identity)
            .finish_non_exhaustive()
    }
}

/// Supported authentication mechanisms
#[derive(PartialEq, Eq, Copy, Clone, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mechanism {
    /// PLAIN, defined in [RFC 4616](https://tools.ietf.org/html/rfc4616)
    Plain,
    /// LOGIN, obsolete but still the only option on some providers
    ///
    /// Defined in [draft-murchison-sasl-login-00](https://www.ietf.org/archive/id/draft-murchison-sasl-login-00.txt).
    Login,
}

impl Display for Mechanism {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Mechanism::Plain => "PLAIN",
            Mechanism::Login => "LOGIN",
        })
    }
}

impl Mechanism {
    /// Whether the first client message travels with the `AUTH` command
    pub fn supports_initial_response(self) -> bool {
        match self {
            Mechanism::Plain => true,
            Mechanism::Login => false,
        }
    }

    /// Returns the clear text to send, given an optional decoded server challenge
    pub fn response(
        self,
        credentials: &Credentials,
        challenge: Option<&str>,
    ) -> Result<String, Error> {
        match self {
            Mechanism::Plain => match challenge {
                Some(_) => Err(error::client("This mechanism does not expect a challenge")),
                // empty authorization identity, RFC 4616 section 2
                None => Ok(format!(
                    "\u{0}{}\u{0}{}",
                    credentials.authentication_identity, credentials.secret
                )),
            },
            Mechanism::Login => {
                let challenge = challenge
                    .ok_or_else(|| error::client("This mechanism does expect a challenge"))?;

                match challenge {
                    "User Name" | "Username:" | "Username" => {
                        Ok(credentials.authentication_identity.clone())
                    }
                    "Password" | "Password:" => Ok(credentials.secret.clone()),
                    _ => Err(error::client("Unrecognized challenge")),
                }
            }
        }
    }
}
