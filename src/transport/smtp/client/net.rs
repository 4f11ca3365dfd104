use std::{
    io::{self, Read, Write},
    mem,
    net::{Shutdown, TcpStream, ToSocketAddrs},
    time::Duration,
};

#[cfg(feature = "rustls")]
use std::sync::Arc;

#[cfg(feature = "rustls")]
use rustls::{pki_types::ServerName, ClientConnection, StreamOwned};

use super::tls::{InnerTlsParameters, TlsParameters};
use crate::transport::smtp::error::{self, Error};

/// A network stream, plain TCP or TLS over TCP
pub struct NetworkStream {
    inner: InnerNetworkStream,
}

/// Represents the different types of underlying network streams
#[allow(clippy::large_enum_variant)]
enum InnerNetworkStream {
    /// Plain TCP stream
    Tcp(TcpStream),
    /// Encrypted TCP stream
    #[cfg(feature = "native-tls")]
    NativeTls(native_tls::TlsStream<TcpStream>),
    /// Encrypted TCP stream
    #[cfg(feature = "rustls")]
    Rustls(StreamOwned<ClientConnection, TcpStream>),
    /// Can't be built, only a placeholder while upgrading to TLS
    None,
}

impl NetworkStream {
    fn new(inner: InnerNetworkStream) -> Self {
        debug_assert!(
            !matches!(inner, InnerNetworkStream::None),
            "InnerNetworkStream::None must never be built"
        );

        NetworkStream { inner }
    }

    /// Shutdowns the connection
    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        self.tcp_stream()?.shutdown(how)
    }

    fn tcp_stream(&self) -> io::Result<&TcpStream> {
        match self.inner {
            InnerNetworkStream::Tcp(ref s) => Ok(s),
            #[cfg(feature = "native-tls")]
            InnerNetworkStream::NativeTls(ref s) => Ok(s.get_ref()),
            #[cfg(feature = "rustls")]
            InnerNetworkStream::Rustls(ref s) => Ok(s.get_ref()),
            InnerNetworkStream::None => Err(placeholder_error()),
        }
    }

    /// Opens a TCP connection to the first reachable address of `server`,
    /// wrapped in TLS when `tls_parameters` is given
    ///
    /// `timeout` bounds the connection attempt and every read and write
    /// made afterwards, the TLS handshake included.
    pub fn connect<T: ToSocketAddrs>(
        server: T,
        timeout: Option<Duration>,
        tls_parameters: Option<&TlsParameters>,
    ) -> Result<NetworkStream, Error> {
        fn try_connect<T: ToSocketAddrs>(
            server: T,
            timeout: Option<Duration>,
        ) -> Result<TcpStream, Error> {
            let addrs = server.to_socket_addrs().map_err(error::connection)?;

            let mut last_err = None;
            for addr in addrs {
                let attempt = match timeout {
                    Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                    None => TcpStream::connect(addr),
                };

                match attempt {
                    Ok(stream) => return Ok(stream),
                    Err(err) => last_err = Some(err),
                }
            }

            Err(match last_err {
                Some(last_err) => error::connection(last_err),
                None => error::connection("could not resolve to any address"),
            })
        }

        let tcp_stream = try_connect(server, timeout)?;
        // the TLS handshake already reads and writes
        tcp_stream
            .set_read_timeout(timeout)
            .map_err(error::network)?;
        tcp_stream
            .set_write_timeout(timeout)
            .map_err(error::network)?;

        let mut stream = NetworkStream::new(InnerNetworkStream::Tcp(tcp_stream));
        if let Some(tls_parameters) = tls_parameters {
            stream.upgrade_tls(tls_parameters)?;
        }
        Ok(stream)
    }

    /// Runs the TLS handshake over the current plain connection
    ///
    /// Does nothing when the stream is already encrypted.
    pub fn upgrade_tls(&mut self, tls_parameters: &TlsParameters) -> Result<(), Error> {
        match &self.inner {
            InnerNetworkStream::Tcp(_) => {
                let InnerNetworkStream::Tcp(tcp_stream) =
                    mem::replace(&mut self.inner, InnerNetworkStream::None)
                else {
                    unreachable!("the stream was checked to be plain TCP");
                };

                self.inner = Self::upgrade_tls_impl(tcp_stream, tls_parameters)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn upgrade_tls_impl(
        tcp_stream: TcpStream,
        tls_parameters: &TlsParameters,
    ) -> Result<InnerNetworkStream, Error> {
        Ok(match tls_parameters.connector {
            #[cfg(feature = "native-tls")]
            InnerTlsParameters::NativeTls(ref connector) => InnerNetworkStream::NativeTls(
                connector
                    .connect(tls_parameters.domain(), tcp_stream)
                    .map_err(|err| match err {
                        // a blocking socket only stops mid-handshake when its timeout expired
                        native_tls::HandshakeError::WouldBlock(_) => error::tls(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "TLS handshake timed out",
                        )),
                        native_tls::HandshakeError::Failure(err) => error::tls(err),
                    })?,
            ),
            #[cfg(feature = "rustls")]
            InnerTlsParameters::Rustls(ref config) => {
                let domain = ServerName::try_from(tls_parameters.domain().to_owned())
                    .map_err(error::tls)?;
                let connection =
                    ClientConnection::new(Arc::clone(config), domain).map_err(error::tls)?;
                let mut stream = StreamOwned::new(connection, tcp_stream);
                // rustls handshakes lazily, drive it now so failures belong to this step
                while stream.conn.is_handshaking() {
                    stream
                        .conn
                        .complete_io(&mut stream.sock)
                        .map_err(error::tls)?;
                }
                InnerNetworkStream::Rustls(stream)
            }
        })
    }

    /// Whether the stream is currently encrypted
    pub fn is_encrypted(&self) -> bool {
        match self.inner {
            InnerNetworkStream::Tcp(_) | InnerNetworkStream::None => false,
            #[cfg(feature = "native-tls")]
            InnerNetworkStream::NativeTls(_) => true,
            #[cfg(feature = "rustls")]
            InnerNetworkStream::Rustls(_) => true,
        }
    }

    /// Set read timeout for IO calls
    pub fn set_read_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        self.tcp_stream()?.set_read_timeout(duration)
    }

    /// Set write timeout for IO calls
    pub fn set_write_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        self.tcp_stream()?.set_write_timeout(duration)
    }
}

impl Read for NetworkStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner {
            InnerNetworkStream::Tcp(ref mut s) => s.read(buf),
            #[cfg(feature = "native-tls")]
            InnerNetworkStream::NativeTls(ref mut s) => s.read(buf),
            #[cfg(feature = "rustls")]
            InnerNetworkStream::Rustls(ref mut s) => s.read(buf),
            InnerNetworkStream::None => Err(placeholder_error()),
        }
    }
}

impl Write for NetworkStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.inner {
            InnerNetworkStream::Tcp(ref mut s) => s.write(buf),
            #[cfg(feature = "native-tls")]
            InnerNetworkStream::NativeTls(ref mut s) => s.write(buf),
            #[cfg(feature = "rustls")]
            InnerNetworkStream::Rustls(ref mut s) => s.write(buf),
            InnerNetworkStream::None => Err(placeholder_error()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner {
            InnerNetworkStream::Tcp(ref mut s) => s.flush(),
            #[cfg(feature = "native-tls")]
            InnerNetworkStream::NativeTls(ref mut s) => s.flush(),
            #[cfg(feature = "rustls")]
            InnerNetworkStream::Rustls(ref mut s) => s.flush(),
            InnerNetworkStream::None => Err(placeholder_error()),
        }
    }
}

fn placeholder_error() -> io::Error {
    io::Error::new(
        io::ErrorKind::NotConnected,
        "stream left unusable by a failed TLS upgrade",
    )
}
