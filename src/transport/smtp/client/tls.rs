//! TLS configuration for the connection

use std::fmt::{self, Debug, Formatter};

use native_tls::{Protocol, TlsConnector};

use crate::transport::smtp::error::{self, Error};

/// Accepted protocols by default.
///
/// This removes TLS 1.0 and 1.1 compared to native-tls defaults.
const DEFAULT_TLS_MIN_PROTOCOL: Protocol = Protocol::Tlsv12;

/// Parameters to use for secure clients
#[derive(Clone)]
pub struct TlsParameters {
    connector: TlsConnector,
    /// The domain name which is expected in the TLS certificate from the server
    domain: String,
}

impl TlsParameters {
    /// Creates a new `TlsParameters` expecting a certificate valid for
    /// `domain`
    pub fn new(domain: String) -> Result<Self, Error> {
        let mut tls_builder = TlsConnector::builder();
        tls_builder.min_protocol_version(Some(DEFAULT_TLS_MIN_PROTOCOL));
        let connector = tls_builder.build().map_err(error::tls)?;
        Ok(Self { connector, domain })
    }

    pub(crate) fn connector(&self) -> &TlsConnector {
        &self.connector
    }

    /// The domain the server certificate must be valid for
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl Debug for TlsParameters {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsParameters")
            .field("domain", &self.domain)
            .finish()
    }
}
