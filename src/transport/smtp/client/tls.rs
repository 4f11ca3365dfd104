use std::fmt::{self, Debug};
#[cfg(feature = "rustls")]
use std::sync::Arc;

#[cfg(feature = "native-tls")]
use native_tls::{Protocol, TlsConnector};
#[cfg(feature = "rustls")]
use rustls::{pki_types::CertificateDer, ClientConfig, RootCertStore};

use crate::transport::smtp::error::{self, Error};

/// Accepted protocols by default.
/// This removes TLS 1.0 and 1.1 compared to native-tls defaults, matching rustls.
#[cfg(feature = "native-tls")]
const DEFAULT_TLS_MIN_PROTOCOL: Protocol = Protocol::Tlsv12;

/// Parameters to use for secure clients
///
/// The certificate is verified against the default trust roots of the
/// backend, plus any root added through [`TlsParametersBuilder`], for the
/// configured `domain`.
#[derive(Clone)]
pub struct TlsParameters {
    pub(crate) connector: InnerTlsParameters,
    /// The domain name which is expected in the TLS certificate from the server
    domain: String,
}

#[derive(Clone)]
pub(crate) enum InnerTlsParameters {
    #[cfg(feature = "native-tls")]
    NativeTls(TlsConnector),
    #[cfg(feature = "rustls")]
    Rustls(Arc<ClientConfig>),
}

/// Builder for `TlsParameters`
#[derive(Debug, Clone)]
pub struct TlsParametersBuilder {
    domain: String,
    root_certs: Vec<Certificate>,
}

impl TlsParametersBuilder {
    /// Creates a new builder for `TlsParameters`
    pub fn new(domain: String) -> Self {
        Self {
            domain,
            root_certs: Vec::new(),
        }
    }

    /// Add a custom root certificate
    ///
    /// Can be used to connect to a server whose certificate is issued by a
    /// private authority.
    pub fn add_root_certificate(mut self, cert: Certificate) -> Self {
        self.root_certs.push(cert);
        self
    }

    /// Creates `TlsParameters` with the preferred backend
    pub fn build(self) -> Result<TlsParameters, Error> {
        #[cfg(feature = "native-tls")]
        return self.build_native();

        #[cfg(not(feature = "native-tls"))]
        return self.build_rustls();
    }

    /// Creates `TlsParameters` backed by `native-tls`
    #[cfg(feature = "native-tls")]
    #[cfg_attr(docsrs, doc(cfg(feature = "native-tls")))]
    pub fn build_native(self) -> Result<TlsParameters, Error> {
        let mut tls_builder = TlsConnector::builder();
        for cert in self.root_certs {
            tls_builder.add_root_certificate(cert.native_tls);
        }
        tls_builder.min_protocol_version(Some(DEFAULT_TLS_MIN_PROTOCOL));

        let connector = tls_builder.build().map_err(error::tls)?;
        Ok(TlsParameters {
            connector: InnerTlsParameters::NativeTls(connector),
            domain: self.domain,
        })
    }

    /// Creates `TlsParameters` backed by `rustls`, trusting the `webpki-roots` set
    #[cfg(feature = "rustls")]
    #[cfg_attr(docsrs, doc(cfg(feature = "rustls")))]
    pub fn build_rustls(self) -> Result<TlsParameters, Error> {
        let provider = rustls::crypto::CryptoProvider::get_default()
            .map(Arc::clone)
            .unwrap_or_else(|| Arc::new(rustls::crypto::ring::default_provider()));

        let mut root_cert_store = RootCertStore::empty();
        root_cert_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        for cert in self.root_certs {
            root_cert_store.add(cert.rustls).map_err(error::tls)?;
        }

        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(error::tls)?
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();

        Ok(TlsParameters {
            connector: InnerTlsParameters::Rustls(Arc::new(config)),
            domain: self.domain,
        })
    }
}

impl TlsParameters {
    /// Creates TLS parameters for `domain` with the preferred backend
    pub fn new(domain: String) -> Result<Self, Error> {
        TlsParametersBuilder::new(domain).build()
    }

    /// Creates a new `TlsParameters` builder
    pub fn builder(domain: String) -> TlsParametersBuilder {
        TlsParametersBuilder::new(domain)
    }

    /// Creates TLS parameters backed by `native-tls`
    #[cfg(feature = "native-tls")]
    #[cfg_attr(docsrs, doc(cfg(feature = "native-tls")))]
    pub fn new_native(domain: String) -> Result<Self, Error> {
        TlsParametersBuilder::new(domain).build_native()
    }

    /// Creates TLS parameters backed by `rustls`, trusting the `webpki-roots` set
    #[cfg(feature = "rustls")]
    #[cfg_attr(docsrs, doc(cfg(feature = "rustls")))]
    pub fn new_rustls(domain: String) -> Result<Self, Error> {
        TlsParametersBuilder::new(domain).build_rustls()
    }

    /// The domain the server certificate is checked against
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl Debug for TlsParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backend = match self.connector {
            #[cfg(feature = "native-tls")]
            InnerTlsParameters::NativeTls(_) => "native-tls",
            #[cfg(feature = "rustls")]
            InnerTlsParameters::Rustls(_) => "rustls",
        };

        f.debug_struct("TlsParameters")
            .field("backend", &backend)
            .field("domain", &self.domain)
            .finish()
    }
}

/// A certificate that can be used with [`TlsParametersBuilder::add_root_certificate`]
#[derive(Clone)]
pub struct Certificate {
    #[cfg(feature = "native-tls")]
    native_tls: native_tls::Certificate,
    #[cfg(feature = "rustls")]
    rustls: CertificateDer<'static>,
}

impl Certificate {
    /// Create a `Certificate` from a DER encoded certificate
    pub fn from_der(der: Vec<u8>) -> Result<Self, Error> {
        #[cfg(feature = "native-tls")]
        let native_tls_cert = native_tls::Certificate::from_der(&der).map_err(error::tls)?;

        Ok(Self {
            #[cfg(feature = "native-tls")]
            native_tls: native_tls_cert,
            #[cfg(feature = "rustls")]
            rustls: CertificateDer::from(der),
        })
    }
}

impl Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate").finish_non_exhaustive()
    }
}
