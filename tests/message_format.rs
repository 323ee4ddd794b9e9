//! Wire-format checks against the public API: what a receiving client
//! sees when parsing a built letter.

use base64::{engine::general_purpose::STANDARD, Engine};
use missive::{Letter, Sender};
use pretty_assertions::assert_eq;

/// Extracts the boundary token from a rendered message.
fn boundary_of(message: &str) -> String {
    message
        .lines()
        .find_map(|line| line.split_once("boundary=").map(|(_, b)| b.to_owned()))
        .expect("no multipart boundary declared")
}

#[test]
fn end_to_end_build() {
    let sender = Sender::new("smtp.example.com", 465, "Alice", "alice@example.com", "secret");

    let mut letter = Letter::new();
    letter.set_from(sender.mailbox());
    letter.add_receivers(["a@example.com"]);
    letter.set_subject("Hi");
    letter.set_content("Hello");
    letter.add_attachment("f.txt", b"AB".to_vec());

    letter.build();
    let message = letter.dump();
    let boundary = boundary_of(&message);

    // Header block
    assert!(message.starts_with("From: Alice<alice@example.com>\r\n"));
    assert!(message.contains("To: a@example.com\r\n"));
    assert!(message.contains("Subject: Hi\r\n"));
    assert!(message.contains("MIME-Version: 1.0\r\n"));
    assert!(message.contains(&format!(
        "Content-Type: multipart/mixed; boundary={boundary}\r\n"
    )));

    // Text part carries the content verbatim
    let text_part = message
        .split("Content-Type: text/plain; charset=UTF-8\r\n")
        .nth(1)
        .unwrap();
    assert!(text_part.starts_with("Content-Transfer-Encoding: quoted-printable\r\n\r\nHello\r\n"));

    // Attachment part decodes back to the original bytes
    let attachment_body = message
        .split("Content-Transfer-Encoding: base64\r\n")
        .nth(1)
        .unwrap()
        .split("\r\n\r\n")
        .nth(1)
        .unwrap()
        .split("\r\n")
        .next()
        .unwrap();
    assert_eq!(STANDARD.decode(attachment_body).unwrap(), b"AB");

    // Closing marker
    assert!(message.trim_end().ends_with(&format!("--{boundary}--")));
}

#[test]
fn to_header_lists_receivers_in_append_order() {
    let mut letter = Letter::new();
    letter.add_receivers(["c@example.com", "a@example.com"]);
    letter.add_receivers(["b@example.com", "a@example.com"]);

    let message = letter.dump();
    assert!(message.contains("To: c@example.com,a@example.com,b@example.com,a@example.com\r\n"));
}

#[test]
fn boundary_marker_counts() {
    let mut letter = Letter::new();
    letter.set_content("body");
    letter.add_attachment("one.bin", vec![1]);
    letter.add_attachment("two.bin", vec![2]);
    letter.add_attachment("three.bin", vec![3]);

    let message = letter.dump();
    let boundary = boundary_of(&message);

    let separators = message
        .lines()
        .filter(|line| *line == format!("--{boundary}"))
        .count();
    let terminators = message
        .lines()
        .filter(|line| *line == format!("--{boundary}--"))
        .count();

    // 4 parts: 1 opening marker + 3 internal separators; 1 terminator.
    assert_eq!(separators, 4);
    assert_eq!(terminators, 1);
}

#[test]
fn zero_attachments_keep_text_part_and_terminator() {
    let mut letter = Letter::new();
    letter.set_content("just text");

    let message = letter.dump();
    let boundary = boundary_of(&message);

    assert_eq!(
        message
            .matches("Content-Type: text/plain; charset=UTF-8\r\n")
            .count(),
        1
    );
    assert!(message.contains("just text"));
    assert!(message.trim_end().ends_with(&format!("--{boundary}--")));
}

#[test]
fn non_ascii_filename_survives_percent_encoding() {
    let filename = "说明书.pdf";

    let mut letter = Letter::new();
    letter.add_attachment(filename, b"pdf".to_vec());

    let message = letter.dump();
    let param = message
        .split("filename*=utf-8''")
        .nth(1)
        .unwrap()
        .split("\r\n")
        .next()
        .unwrap();

    assert!(param.is_ascii());
    assert_eq!(
        percent_encoding::percent_decode_str(param)
            .decode_utf8()
            .unwrap(),
        filename
    );
}

#[test]
fn binary_attachment_round_trips_all_byte_values() {
    let payload: Vec<u8> = (0u8..=255).collect();

    let mut letter = Letter::new();
    letter.add_attachment("blob.bin", payload.clone());

    let message = letter.dump();
    let encoded = message
        .split("Content-Transfer-Encoding: base64\r\n")
        .nth(1)
        .unwrap()
        .split("\r\n\r\n")
        .nth(1)
        .unwrap()
        .split("\r\n")
        .next()
        .unwrap();

    assert_eq!(STANDARD.decode(encoded).unwrap(), payload);
}

#[test]
fn sender_identity_is_stamped_at_send_time() {
    let first = Sender::new("smtp.example.com", 465, "First", "first@example.com", "pw");
    let second = Sender::new("smtp.example.com", 465, "Second", "second@example.com", "pw");

    let mut letter = Letter::new();
    letter.set_from(first.mailbox());
    letter.build();
    assert!(letter.dump().contains("From: First<first@example.com>\r\n"));

    // Rebuilding under another sender's identity replaces the header
    // entirely; nothing of the first identity remains.
    letter.set_from(second.mailbox());
    letter.build();
    let message = letter.dump();
    assert!(message.contains("From: Second<second@example.com>\r\n"));
    assert!(!message.contains("first@example.com"));
}

#[test]
fn envelope_recipients_cover_receivers_then_carbon_copy() {
    let letter = Letter::new();
    letter.add_receivers(["to1@example.com", "to2@example.com"]);
    letter.add_carbon_copy(["cc1@example.com"]);

    assert_eq!(
        letter.envelope_recipients(),
        ["to1@example.com", "to2@example.com", "cc1@example.com"]
    );
}

#[test]
fn zero_recipients_build_an_empty_to_header() {
    let mut letter = Letter::new();
    letter.set_subject("nobody");

    // No local "must have recipients" rule: the letter still builds, and
    // declaring zero envelope recipients is left to the server to judge.
    let message = letter.dump();
    assert!(message.contains("To: \r\n"));
    assert!(letter.envelope_recipients().is_empty());
}
