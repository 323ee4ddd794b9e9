//! TLS-wrapped network stream

use std::{
    fmt::{self, Debug, Formatter},
    io::{self, Read, Write},
    net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs},
    time::Duration,
};

use native_tls::{HandshakeError, TlsStream};

use super::TlsParameters;
use crate::transport::smtp::error::{self, Error};

/// The network stream between client and server
///
/// Encrypted from the first byte; there is no plaintext mode.
pub struct NetworkStream {
    inner: TlsStream<TcpStream>,
}

impl Debug for NetworkStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("NetworkStream(_)")
    }
}

impl NetworkStream {
    /// Opens a TCP connection to the server and performs the TLS
    /// handshake
    ///
    /// Every resolved address is tried in order; `timeout` bounds each
    /// connection attempt.
    pub fn connect<A: ToSocketAddrs>(
        server: A,
        timeout: Option<Duration>,
        tls_parameters: &TlsParameters,
    ) -> Result<NetworkStream, Error> {
        fn try_connect(addr: &SocketAddr, timeout: Option<Duration>) -> io::Result<TcpStream> {
            match timeout {
                Some(timeout) => TcpStream::connect_timeout(addr, timeout),
                None => TcpStream::connect(addr),
            }
        }

        let addrs = server.to_socket_addrs().map_err(error::connection)?;
        let mut last_err = None;

        for addr in addrs {
            match try_connect(&addr, timeout) {
                Ok(tcp_stream) => {
                    let inner = match tls_parameters
                        .connector()
                        .connect(tls_parameters.domain(), tcp_stream)
                    {
                        Ok(stream) => stream,
                        Err(HandshakeError::Failure(err)) => return Err(error::tls(err)),
                        // The socket is blocking, so the handshake either
                        // completes or fails in one call
                        Err(HandshakeError::WouldBlock(_)) => {
                            return Err(error::tls("TLS handshake interrupted"))
                        }
                    };
                    return Ok(NetworkStream { inner });
                }
                Err(err) => last_err = Some(err),
            }
        }

        Err(match last_err {
            Some(err) => error::connection(err),
            None => error::connection("could not resolve to any address"),
        })
    }

    /// Set read timeout for IO calls
    pub fn set_read_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        self.inner.get_ref().set_read_timeout(duration)
    }

    /// Set write timeout for IO calls
    pub fn set_write_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        self.inner.get_ref().set_write_timeout(duration)
    }

    /// Shuts down both halves of the underlying TCP connection
    pub fn shutdown(&mut self, how: Shutdown) -> io::Result<()> {
        self.inner.get_ref().shutdown(how)
    }
}

impl Read for NetworkStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for NetworkStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
