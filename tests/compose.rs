use mailparse::{parse_mail, DispositionType, MailHeaderMap, ParsedMail};
use mailsend::message::{Attachments, Error, Message};
use pretty_assertions::assert_eq;

/// The CRLF before a delimiter belongs to the delimiter, drop it if the
/// parser kept it
fn content(part: &ParsedMail<'_>) -> Vec<u8> {
    let mut raw = part.get_body_raw().unwrap();
    if raw.ends_with(b"\r\n") {
        raw.truncate(raw.len() - 2);
    }
    raw
}

fn attachment_name(part: &ParsedMail<'_>) -> Option<String> {
    let disposition = part.get_content_disposition();
    match disposition.disposition {
        DispositionType::Attachment => disposition.params.get("filename").cloned(),
        _ => None,
    }
}

#[test]
fn scenario_round_trip() {
    let mut attachments = Attachments::new();
    attachments.insert("r.txt".to_owned(), b"data".to_vec());
    let message = Message::new(
        "a@x.com",
        vec!["b@y.com".to_owned(), "c@y.com".to_owned()],
        "Hi",
        "Hello",
        Some(attachments),
    );

    let formatted = message.formatted().unwrap();
    let parsed = parse_mail(&formatted).unwrap();

    assert_eq!(parsed.headers.get_first_value("From").unwrap(), "a@x.com");
    assert_eq!(
        parsed.headers.get_first_value("To").unwrap(),
        "b@y.com,c@y.com"
    );
    assert_eq!(parsed.headers.get_first_value("Subject").unwrap(), "Hi");
    assert_eq!(
        parsed.headers.get_first_value("MIME-Version").unwrap(),
        "1.0"
    );
    assert_eq!(parsed.ctype.mimetype, "multipart/mixed");
    assert_eq!(parsed.subparts.len(), 2);

    let body = &parsed.subparts[0];
    assert_eq!(body.ctype.mimetype, "text/plain");
    assert_eq!(attachment_name(body), None);
    assert_eq!(content(body), b"Hello");

    let attachment = &parsed.subparts[1];
    assert_eq!(attachment.ctype.mimetype, "application/octet-stream");
    assert_eq!(attachment_name(attachment).as_deref(), Some("r.txt"));
    assert_eq!(content(attachment), b"data");
}

#[test]
fn binary_attachments_are_byte_identical() {
    let binary: Vec<u8> = (0..=255u8).cycle().take(3000).collect();
    let message = Message::builder()
        .from("a@x.com")
        .to("b@y.com")
        .subject("Files")
        .attachment("blob.bin", binary.clone())
        .attachment("notes.txt", "line one\r\nline two")
        .attachment("empty", Vec::new())
        .body("See attached")
        .unwrap();

    let formatted = message.formatted().unwrap();
    let parsed = parse_mail(&formatted).unwrap();

    assert_eq!(parsed.subparts.len(), 4);
    assert_eq!(content(&parsed.subparts[0]), b"See attached");

    let mut found: Vec<(String, Vec<u8>)> = parsed.subparts[1..]
        .iter()
        .map(|part| (attachment_name(part).unwrap(), content(part)))
        .collect();
    found.sort();

    assert_eq!(
        found,
        [
            ("blob.bin".to_owned(), binary),
            ("empty".to_owned(), Vec::new()),
            ("notes.txt".to_owned(), b"line one\r\nline two".to_vec()),
        ]
    );
}

#[test]
fn zero_attachments() {
    let message = Message::new("a@x.com", vec!["b@y.com".to_owned()], "Hi", "Hello", None);

    let formatted = message.formatted().unwrap();
    let parsed = parse_mail(&formatted).unwrap();
    let boundary = parsed.ctype.params.get("boundary").unwrap().clone();

    assert_eq!(parsed.subparts.len(), 1);
    assert_eq!(content(&parsed.subparts[0]), b"Hello");
    assert!(formatted.ends_with(format!("\r\n--{boundary}--\r\n").as_bytes()));
}

#[test]
fn boundary_absent_from_contents() {
    let body = "--\r\n----\r\n-- not a boundary --";
    let attachment = b"\r\n--\r\n\r\n--x".to_vec();
    let message = Message::builder()
        .from("a@x.com")
        .to("b@y.com")
        .attachment("dashes.txt", attachment.clone())
        .body(body)
        .unwrap();

    for _ in 0..20 {
        let formatted = message.formatted().unwrap();
        let parsed = parse_mail(&formatted).unwrap();
        let boundary = parsed.ctype.params.get("boundary").unwrap().clone();
        let delimiter = format!("--{boundary}");

        assert!(!body.contains(&delimiter));
        assert!(!String::from_utf8_lossy(&attachment).contains(&delimiter));
        assert_eq!(content(&parsed.subparts[0]), body.as_bytes());
        assert_eq!(content(&parsed.subparts[1]), attachment);
    }
}

#[test]
fn composition_errors() {
    let message = Message::new("a@x.com", vec![], "Hi", "Hello", None);
    assert!(matches!(message.formatted(), Err(Error::MissingRecipients)));

    let message = Message::new(
        "a@x.com",
        vec!["b@y.com".to_owned()],
        "Hi\r\nBcc: everyone@y.com",
        "Hello",
        None,
    );
    let err = message.formatted().unwrap_err();
    assert_eq!(err.to_string(), "Subject contains a line break");
}
