//! Content type detection for bodies sent without a `Content-Type`.
//!
//! A reduced form of the WHATWG MIME sniffing algorithm: at most the first
//! 512 bytes are considered, markup signatures are checked after leading
//! whitespace, then a few binary magic numbers, then a text/binary split.

const SNIFF_LEN: usize = 512;

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

static HTML_SIGNATURES: [&[u8]; 17] = [
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

static MAGIC: [(&[u8], &str); 7] = [
    (b"%PDF-", "application/pdf"),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"\x1f\x8b\x08", "application/x-gzip"),
    (b"PK\x03\x04", "application/zip"),
];

/// Best guess at the media type of `data`.
#[must_use]
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];
    if data.is_empty() {
        return TEXT_PLAIN;
    }

    let start = data
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' '))
        .unwrap_or(data.len());
    let markup = &data[start..];

    if HTML_SIGNATURES.iter().any(|sig| is_html_tag(markup, sig)) {
        return "text/html; charset=utf-8";
    }
    if markup.starts_with(b"<?xml") {
        return "text/xml; charset=utf-8";
    }
    if let Some((_, media_type)) = MAGIC.iter().find(|(magic, _)| data.starts_with(magic)) {
        return *media_type;
    }
    if data.iter().any(|&b| is_binary(b)) {
        return OCTET_STREAM;
    }
    TEXT_PLAIN
}

/// Case-insensitive prefix match that must be followed by a space or `>`.
fn is_html_tag(data: &[u8], sig: &[u8]) -> bool {
    if data.len() <= sig.len() || !data[..sig.len()].eq_ignore_ascii_case(sig) {
        return false;
    }
    matches!(data[sig.len()], b' ' | b'>')
}

fn is_binary(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0b | 0x0e..=0x1a | 0x1c..=0x1f)
}
