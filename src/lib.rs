//! Minimal email composition and delivery.
//!
//! `missive` builds a `multipart/mixed` MIME message — a plain-text body
//! plus binary attachments — and submits it to a mail server over an
//! implicit-TLS SMTP session with PLAIN authentication.
//!
//! Two types make up the public surface:
//!
//! * [`Letter`] accumulates recipients, carbon-copy addresses, a subject,
//!   the plain-text content and attachments, and serializes everything
//!   into a single MIME buffer on demand.
//! * [`Sender`] holds the server connection parameters and account
//!   identity, and delivers a built letter over one blocking SMTP
//!   transaction.
//!
//! # Example
//!
//! ```rust,no_run
//! use missive::{Letter, Sender};
//!
//! # fn main() -> Result<(), missive::transport::smtp::error::Error> {
//! let sender = Sender::new("smtp.example.com", 465, "Alice", "alice@example.com", "secret");
//!
//! let mut letter = Letter::new();
//! letter.add_receivers(["bob@example.com"]);
//! letter.add_carbon_copy(["carol@example.com"]);
//! letter.set_subject("Hi");
//! letter.set_content("Hello");
//! letter.add_attachment("notes.txt", b"AB".to_vec());
//!
//! sender.send(&mut letter)?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod address;
pub mod message;
pub mod transport;

pub use crate::{
    address::Envelope,
    message::{Attachment, Letter, Mailbox},
    transport::smtp::Sender,
};

/// Type alias for boxed error sources
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
