//! The SMTP transport sends letters using the SMTP protocol.
//!
//! This client is designed to submit letters to a relay server, relying
//! on the relay for sanity and RFC compliance checks. The connection is
//! TLS-wrapped from the first byte (implicit TLS as used on the
//! submissions port, not `STARTTLS`), and authentication uses the PLAIN
//! mechanism ([RFC 4954](https://tools.ietf.org/html/rfc4954)) whenever
//! the server advertises it.
//!
//! Sends are synchronous, fail fast at the first negative reply and are
//! never retried. Whatever happens, a session that was opened is closed
//! again before the error surfaces.
//!
//! #### Example
//!
//! ```rust,no_run
//! use missive::{Letter, Sender};
//!
//! # fn main() -> Result<(), missive::transport::smtp::error::Error> {
//! let sender = Sender::new("smtp.example.com", 465, "Alice", "alice@example.com", "secret");
//!
//! let mut letter = Letter::new();
//! letter.add_receivers(["bob@example.com"]);
//! letter.set_subject("Hi");
//! letter.set_content("Hello");
//!
//! sender.send(&mut letter)?;
//! # Ok(())
//! # }
//! ```

use std::{
    fmt::{self, Debug, Formatter},
    time::Duration,
};

use crate::{
    address::Envelope,
    message::{Letter, Mailbox},
    transport::smtp::{
        authentication::{Credentials, DEFAULT_MECHANISMS},
        client::{SmtpConnection, TlsParameters},
        error::Error,
        extension::ClientId,
        response::Response,
    },
};

pub mod authentication;
pub mod client;
pub mod commands;
pub mod error;
pub mod extension;
pub mod response;

/// Default submission over TLS port
///
/// https://tools.ietf.org/html/rfc8314
pub const SUBMISSIONS_PORT: u16 = 465;

/// Default timeout for SMTP commands
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

macro_rules! try_smtp (
    ($err: expr, $client: ident) => ({
        match $err {
            Ok(val) => val,
            Err(err) => {
                $client.abort();
                return Err(err);
            },
        }
    })
);

/// Holds the server connection parameters and the account identity used
/// to deliver letters.
///
/// A `Sender` is configured once at construction and owns no connection:
/// every [`send`](Sender::send) opens a fresh authenticated session and
/// closes it again.
#[derive(Clone)]
pub struct Sender {
    /// Server hostname, also the name validated against the TLS certificate
    host: String,
    /// Server port, usually [`SUBMISSIONS_PORT`]
    port: u16,
    /// Display name rendered into the `From:` header
    name: String,
    /// Account address: `From:` header, envelope sender and
    /// authentication identity all at once
    address: String,
    password: String,
    /// Network deadline applied to connect, read and write
    timeout: Option<Duration>,
    /// Name sent during EHLO
    hello_name: ClientId,
}

impl Debug for Sender {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("address", &self.address)
            .field("timeout", &self.timeout)
            .field("hello_name", &self.hello_name)
            .finish()
    }
}

impl Sender {
    /// Creates a sender for `host:port`.
    ///
    /// Defaults are a 60 seconds network timeout and the local hostname
    /// as EHLO identity.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        name: impl Into<String>,
        address: impl Into<String>,
        password: impl Into<String>,
    ) -> Sender {
        Sender {
            host: host.into(),
            port,
            name: name.into(),
            address: address.into(),
            password: password.into(),
            timeout: Some(DEFAULT_TIMEOUT),
            hello_name: ClientId::default(),
        }
    }

    /// Set the network deadline applied to connect, read and write.
    ///
    /// `None` removes the deadline entirely: a hung connection then
    /// blocks the calling thread indefinitely.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the name used during EHLO
    pub fn hello_name(mut self, name: ClientId) -> Self {
        self.hello_name = name;
        self
    }

    /// The identity stamped into a letter's `From:` header at send time.
    pub fn mailbox(&self) -> Mailbox {
        Mailbox::new(self.name.clone(), self.address.clone())
    }

    /// Builds the letter and delivers it.
    ///
    /// The sender's identity is stamped into the letter first, then the
    /// letter is (re)built and streamed over a fresh session: connect and
    /// TLS handshake, EHLO, AUTH PLAIN if the server advertises it,
    /// `MAIL FROM`, one `RCPT TO` per receiver and carbon-copy address in
    /// append order, `DATA`, `QUIT`.
    ///
    /// The first failure aborts the remaining steps and is returned
    /// as-is; there are no retries and no partial-recipient recovery. An
    /// empty recipient list is not rejected locally — whether a
    /// transaction without recipients is acceptable is the server's
    /// decision.
    pub fn send(&self, letter: &mut Letter) -> Result<Response, Error> {
        letter.set_from(self.mailbox());
        letter.build();

        let envelope = Envelope::new(self.address.clone(), letter.envelope_recipients());

        let tls_parameters = TlsParameters::new(self.host.clone())?;
        let mut conn = match SmtpConnection::connect(
            (self.host.as_str(), self.port),
            self.timeout,
            &self.hello_name,
            &tls_parameters,
        ) {
            Ok(conn) => conn,
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("connecting to {}:{} failed: {}", self.host, self.port, err);
                return Err(err);
            }
        };

        if conn.server_info().get_auth_mechanism(DEFAULT_MECHANISMS).is_some() {
            let credentials = Credentials::new(self.address.clone(), self.password.clone());
            if let Err(err) = conn.auth(DEFAULT_MECHANISMS, &credentials) {
                #[cfg(feature = "tracing")]
                tracing::warn!("authentication failed: {}", err);
                conn.abort();
                return Err(err);
            }
        }

        let result = try_smtp!(conn.send(&envelope, letter.formatted()), conn);
        try_smtp!(conn.quit(), conn);

        Ok(result)
    }
}
