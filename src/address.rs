//! Protocol-level envelope

/// Simple mail envelope representation
///
/// The envelope carries the addresses declared to the transport protocol
/// (`MAIL FROM` / `RCPT TO`), which are distinct from the `From:`, `To:`
/// and `CC:` display headers of the message itself.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Envelope {
    /// The envelope recipients' addresses
    forward_path: Vec<String>,
    /// The envelope sender address
    reverse_path: String,
}

impl Envelope {
    /// Creates a new envelope.
    ///
    /// An empty recipient list is accepted: whether a mail transaction
    /// without recipients can proceed is the remote server's decision.
    pub fn new(from: impl Into<String>, to: Vec<String>) -> Envelope {
        Envelope {
            forward_path: to,
            reverse_path: from.into(),
        }
    }

    /// Gets the destination addresses of the envelope.
    pub fn to(&self) -> &[String] {
        self.forward_path.as_slice()
    }

    /// Gets the sender of the envelope.
    pub fn from(&self) -> &str {
        &self.reverse_path
    }
}
