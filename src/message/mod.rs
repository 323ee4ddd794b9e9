//! Letter building
//!
//! [`Letter`] accumulates recipients, carbon-copy addresses, a subject, a
//! plain-text content and attachments, then serializes all of it into a
//! single `multipart/mixed` MIME buffer on demand.
//!
//! Serialization runs in four ordered phases appending to one growing
//! buffer: the header block, the text part, one part per attachment, and
//! the closing boundary marker.
//!
//! ```
//! use missive::{Letter, Mailbox};
//!
//! let mut letter = Letter::new();
//! letter.set_from(Mailbox::new("Alice", "alice@example.com"));
//! letter.add_receivers(["bob@example.com"]);
//! letter.set_subject("Hi");
//! letter.set_content("Hello");
//! letter.add_attachment("notes.txt", b"AB".to_vec());
//!
//! letter.build();
//! println!("{}", letter.dump());
//! ```

use std::{
    fmt::{self, Display, Formatter},
    sync::Mutex,
};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters escaped in the RFC 5987 `filename*` parameter.
///
/// Everything outside the attr-char set (ALPHA / DIGIT / `!#$&+-.^_`|~`)
/// is percent-encoded.
const ATTR_CHAR_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Create a random MIME boundary.
fn make_boundary() -> String {
    std::iter::repeat_with(fastrand::alphanumeric).take(40).collect()
}

/// Display name and address pair rendered into the `From:` header.
///
/// Renders as `name<address>`, with no whitespace between the two.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mailbox {
    /// The display name
    pub name: String,
    /// The email address
    pub email: String,
}

impl Mailbox {
    /// Creates a new `Mailbox` from a display name and an address.
    ///
    /// Neither part is validated or escaped.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Mailbox {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl Display for Mailbox {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.name, self.email)
    }
}

/// A named binary attachment, fully buffered in memory.
///
/// Reading attachment content from disk is the caller's job; the letter
/// only ever sees complete byte buffers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    filename: String,
    data: Vec<u8>,
}

impl Attachment {
    /// Creates an attachment from a filename and its content.
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Attachment {
            filename: filename.into(),
            data,
        }
    }

    /// The filename presented to the receiving client.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The raw attachment content.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// An in-memory, mutable message builder.
///
/// Recipients, carbon-copy addresses and attachments append under a
/// shared lock, so several threads holding `&Letter` may add entries
/// concurrently. Subject, content and sender identity are plain fields
/// set during single-threaded setup. [`build`](Letter::build) and
/// [`dump`](Letter::dump) take `&mut self`, which makes a build racing an
/// append impossible to express.
///
/// All three sequences preserve insertion order and keep duplicates.
#[derive(Debug)]
pub struct Letter {
    from: Mailbox,
    subject: String,
    content: String,
    inner: Mutex<Inner>,
    boundary: String,
    body: Vec<u8>,
}

#[derive(Debug, Default)]
struct Inner {
    receivers: Vec<String>,
    carbon_copy: Vec<String>,
    attachments: Vec<Attachment>,
}

impl Default for Letter {
    fn default() -> Self {
        Self::new()
    }
}

impl Letter {
    /// Creates an empty letter.
    ///
    /// The MIME boundary is drawn once per letter, so rebuilding an
    /// unchanged letter yields byte-identical output.
    pub fn new() -> Self {
        Letter {
            from: Mailbox::default(),
            subject: String::new(),
            content: String::new(),
            inner: Mutex::new(Inner::default()),
            boundary: make_boundary(),
            body: Vec::new(),
        }
    }

    /// Appends receiver addresses, preserving call order.
    ///
    /// Duplicates are kept. Safe to call from several threads at once.
    pub fn add_receivers<I, S>(&self, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = self.inner.lock().unwrap();
        inner.receivers.extend(addresses.into_iter().map(Into::into));
    }

    /// Appends carbon-copy addresses, preserving call order.
    pub fn add_carbon_copy<I, S>(&self, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = self.inner.lock().unwrap();
        inner.carbon_copy.extend(addresses.into_iter().map(Into::into));
    }

    /// Appends attachments, preserving call order.
    pub fn add_attachments<I>(&self, items: I)
    where
        I: IntoIterator<Item = Attachment>,
    {
        let mut inner = self.inner.lock().unwrap();
        inner.attachments.extend(items);
    }

    /// Appends a single attachment.
    pub fn add_attachment(&self, filename: impl Into<String>, data: Vec<u8>) {
        self.add_attachments([Attachment::new(filename, data)]);
    }

    /// Sets the `Subject:` header. Last write wins.
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = subject.into();
    }

    /// Sets the plain-text content. Last write wins.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    /// Sets the identity rendered into the `From:` header.
    ///
    /// [`Sender::send`](crate::Sender::send) overwrites this with its own
    /// identity right before building, so a letter reused across senders
    /// always carries the identity of the sender actually delivering it.
    pub fn set_from(&mut self, from: Mailbox) {
        self.from = from;
    }

    /// The identity currently rendered into the `From:` header.
    pub fn from(&self) -> &Mailbox {
        &self.from
    }

    /// The current subject.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The current plain-text content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The receiver addresses, in append order.
    pub fn receivers(&self) -> Vec<String> {
        self.inner.lock().unwrap().receivers.clone()
    }

    /// The carbon-copy addresses, in append order.
    pub fn carbon_copy(&self) -> Vec<String> {
        self.inner.lock().unwrap().carbon_copy.clone()
    }

    /// Number of attachments added so far.
    pub fn attachments_len(&self) -> usize {
        self.inner.lock().unwrap().attachments.len()
    }

    /// Addresses to declare as protocol-level recipients: receivers
    /// first, then carbon-copy, each in append order.
    pub fn envelope_recipients(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .receivers
            .iter()
            .chain(inner.carbon_copy.iter())
            .cloned()
            .collect()
    }

    /// The serialized message, empty until [`build`](Letter::build) runs.
    pub fn formatted(&self) -> &[u8] {
        &self.body
    }

    /// Serializes the letter into its MIME representation.
    ///
    /// The body is always fully recomputed from the current fields; a
    /// previously built body is discarded.
    pub fn build(&mut self) {
        let mut out = Vec::with_capacity(256 + self.content.len());
        {
            let inner = self.inner.lock().unwrap();
            self.write_header(&inner, &mut out);
            self.write_content(&mut out);
            self.write_attachments(&inner, &mut out);
            self.write_terminator(&mut out);
        }
        self.body = out;
    }

    /// Renders the serialized body as text for inspection, building it
    /// first if it has not been built yet.
    pub fn dump(&mut self) -> String {
        if self.body.is_empty() {
            self.build();
        }
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Header phase: message headers, the multipart declaration and the
    /// opening boundary marker. Header values are written verbatim,
    /// without escaping or validation.
    fn write_header(&self, inner: &Inner, out: &mut Vec<u8>) {
        out.extend_from_slice(
            format!(
                "From: {}\r\nTo: {}\r\nCC: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\n",
                self.from,
                inner.receivers.join(","),
                inner.carbon_copy.join(","),
                self.subject,
            )
            .as_bytes(),
        );
        out.extend_from_slice(
            format!(
                "Content-Type: multipart/mixed; boundary={}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        out.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
    }

    /// Body phase: the quoted-printable text part, closed by a boundary
    /// separator.
    fn write_content(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(b"Content-Type: text/plain; charset=UTF-8\r\n");
        out.extend_from_slice(b"Content-Transfer-Encoding: quoted-printable\r\n\r\n");
        out.extend_from_slice(quoted_printable::encode_to_str(&self.content).as_bytes());
        out.extend_from_slice(format!("\r\n\r\n--{}\r\n", self.boundary).as_bytes());
    }

    /// Attachments phase: one `application/octet-stream` part per
    /// attachment, base64 content, boundary separators between parts but
    /// not after the last one.
    ///
    /// The `name=` parameter keeps the legacy `"?UTF-8?B?…?="` marker
    /// (without the leading `=` of a well-formed encoded word) that
    /// receiving clients already accept; the standards-correct filename
    /// travels in the RFC 5987 `filename*` parameter.
    fn write_attachments(&self, inner: &Inner, out: &mut Vec<u8>) {
        for (i, item) in inner.attachments.iter().enumerate() {
            out.extend_from_slice(
                format!(
                    "Content-Type: application/octet-stream; charset=UTF-8;\r\n \tname=\"?UTF-8?B?{}?=\"\r\n",
                    BASE64.encode(item.filename())
                )
                .as_bytes(),
            );
            out.extend_from_slice(b"Content-Transfer-Encoding: base64\r\n");
            out.extend_from_slice(
                format!(
                    "Content-Disposition: attachment; filename*=utf-8''{}\r\n\r\n",
                    utf8_percent_encode(item.filename(), ATTR_CHAR_ESCAPE)
                )
                .as_bytes(),
            );
            out.extend_from_slice(BASE64.encode(item.data()).as_bytes());

            if i != inner.attachments.len() - 1 {
                out.extend_from_slice(format!("\r\n--{}\r\n", self.boundary).as_bytes());
            }
        }
    }

    /// Terminator phase: the closing boundary marker.
    fn write_terminator(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(format!("\r\n--{}--\r\n", self.boundary).as_bytes());
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn built(letter: &mut Letter) -> String {
        letter.build();
        String::from_utf8_lossy(letter.formatted()).into_owned()
    }

    #[test]
    fn mailbox_renders_without_space() {
        let mailbox = Mailbox::new("Alice", "alice@example.com");
        assert_eq!(mailbox.to_string(), "Alice<alice@example.com>");
    }

    #[test]
    fn boundary_is_alphanumeric_and_per_letter() {
        let a = Letter::new();
        let b = Letter::new();
        assert_eq!(a.boundary.len(), 40);
        assert!(a.boundary.bytes().all(|b| b.is_ascii_alphanumeric()));
        assert_ne!(a.boundary, b.boundary);
    }

    #[test]
    fn rebuild_is_byte_identical() {
        let mut letter = Letter::new();
        letter.set_from(Mailbox::new("A", "a@example.com"));
        letter.add_receivers(["b@example.com"]);
        letter.set_subject("s");
        letter.set_content("c");

        let first = built(&mut letter);
        let second = built(&mut letter);
        assert_eq!(first, second);
    }

    #[test]
    fn exactly_one_from_header() {
        let mut letter = Letter::new();
        letter.set_from(Mailbox::new("Alice", "alice@example.com"));
        let out = built(&mut letter);

        let from_lines: Vec<&str> = out
            .lines()
            .filter(|line| line.starts_with("From: "))
            .collect();
        assert_eq!(from_lines, ["From: Alice<alice@example.com>"]);
    }

    #[test]
    fn receivers_keep_append_order_and_duplicates() {
        let mut letter = Letter::new();
        letter.add_receivers(["b@example.com", "a@example.com"]);
        letter.add_receivers(["b@example.com"]);
        let out = built(&mut letter);

        assert!(out.contains("To: b@example.com,a@example.com,b@example.com\r\n"));
    }

    #[test]
    fn carbon_copy_joins_in_order() {
        let mut letter = Letter::new();
        letter.add_carbon_copy(["x@example.com", "y@example.com"]);
        let out = built(&mut letter);

        assert!(out.contains("CC: x@example.com,y@example.com\r\n"));
    }

    #[test]
    fn envelope_recipients_receivers_then_carbon_copy() {
        let letter = Letter::new();
        letter.add_carbon_copy(["cc@example.com"]);
        letter.add_receivers(["to@example.com"]);

        assert_eq!(letter.envelope_recipients(), ["to@example.com", "cc@example.com"]);
    }

    #[test]
    fn attachment_content_round_trips() {
        use base64::{engine::general_purpose::STANDARD, Engine};

        let all_bytes: Vec<u8> = (0u8..=255).collect();
        let mut letter = Letter::new();
        letter.add_attachment("blob.bin", all_bytes.clone());
        let out = built(&mut letter);

        // The base64 run sits between the part's blank line and the final
        // boundary marker.
        let part = out.split("Content-Transfer-Encoding: base64\r\n").nth(1).unwrap();
        let encoded = part
            .split("\r\n\r\n")
            .nth(1)
            .unwrap()
            .split("\r\n")
            .next()
            .unwrap();
        assert_eq!(STANDARD.decode(encoded).unwrap(), all_bytes);
    }

    #[test]
    fn empty_attachment_round_trips() {
        let mut letter = Letter::new();
        letter.add_attachment("empty.bin", Vec::new());
        let out = built(&mut letter);

        assert!(out.contains("Content-Transfer-Encoding: base64\r\n"));
        // Zero bytes encode to an empty run: the blank line is followed
        // directly by the closing boundary.
        assert!(out.contains(&format!("filename*=utf-8''empty.bin\r\n\r\n\r\n--{}--", letter.boundary)));
    }

    #[test]
    fn non_ascii_filename_percent_decodes_back() {
        let filename = "рапорт от января.txt";
        let mut letter = Letter::new();
        letter.add_attachment(filename, b"x".to_vec());
        let out = built(&mut letter);

        let param = out
            .split("filename*=utf-8''")
            .nth(1)
            .unwrap()
            .split("\r\n")
            .next()
            .unwrap();
        let decoded = percent_encoding::percent_decode_str(param)
            .decode_utf8()
            .unwrap();
        assert_eq!(decoded, filename);
    }

    #[test]
    fn filename_marker_carries_base64() {
        let mut letter = Letter::new();
        letter.add_attachment("f.txt", b"AB".to_vec());
        let out = built(&mut letter);

        assert!(out.contains(" \tname=\"?UTF-8?B?Zi50eHQ=?=\"\r\n"));
    }

    #[test]
    fn boundary_discipline_with_attachments() {
        let mut letter = Letter::new();
        letter.set_content("hello");
        letter.add_attachment("a.bin", b"a".to_vec());
        letter.add_attachment("b.bin", b"b".to_vec());
        let out = built(&mut letter);

        let separator = format!("--{}", letter.boundary);
        let terminator = format!("--{}--", letter.boundary);
        let separators = out.lines().filter(|line| *line == separator).count();
        let terminators = out.lines().filter(|line| *line == terminator).count();

        // 3 parts: opening marker + 2 internal separators, 1 terminator.
        assert_eq!(separators, 3);
        assert_eq!(terminators, 1);
    }

    #[test]
    fn zero_attachments_still_yield_text_part_and_terminator() {
        let mut letter = Letter::new();
        letter.set_content("hello");
        let out = built(&mut letter);

        assert!(out.contains("Content-Type: text/plain; charset=UTF-8\r\n"));
        assert!(out.contains("hello"));
        assert!(out.trim_end().ends_with(&format!("--{}--", letter.boundary)));
    }

    #[test]
    fn content_is_quoted_printable_encoded() {
        let mut letter = Letter::new();
        letter.set_content("héllo = test");
        let out = built(&mut letter);

        // ASCII survives verbatim, `é` and `=` are escaped per RFC 2045.
        assert!(out.contains("h=C3=A9llo =3D test"));
    }

    #[test]
    fn dump_builds_if_empty() {
        let mut letter = Letter::new();
        letter.set_subject("probe");
        assert!(letter.formatted().is_empty());

        let dumped = letter.dump();
        assert!(dumped.contains("Subject: probe\r\n"));
        assert!(!letter.formatted().is_empty());
    }

    #[test]
    fn concurrent_appends_are_serialized() {
        use std::sync::Arc;

        let letter = Arc::new(Letter::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let letter = Arc::clone(&letter);
                std::thread::spawn(move || {
                    for j in 0..50 {
                        letter.add_receivers([format!("user{i}-{j}@example.com")]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(letter.receivers().len(), 200);
    }
}
