//! # Content Negotiation
//!
//! `Accept-Encoding` parsing and selection following RFC 2616 §14.3.
//!
//! Each header value is a comma separated list of `token[;q=quality]`
//! elements. Tokens are classified with a 256 entry octet table built once per
//! process. A malformed element (empty token, a `;` not followed by `q=`, a
//! quality outside `0..=1`) is skipped up to the next comma; the rest of the
//! header is still parsed.
//!
//! Selection walks the caller's offers in preference order and keeps the
//! strictly highest quality among specs naming the offer or `*`, so the
//! caller's order breaks ties. A best quality of exactly zero is an explicit
//! rejection and yields `""`. Without any usable spec the result is
//! `"identity"`.
//!
//! ```rust
//! use http::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
//! use kitmux::negotiation::negotiate_content_encoding;
//!
//! let mut headers = HeaderMap::new();
//! headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip;q=1.0, br;q=0.5, *;q=0.5"));
//! assert_eq!(negotiate_content_encoding(&headers, &["br", "gzip", "deflate"]), "gzip");
//! ```

use http::header::{HeaderMap, HeaderName, ACCEPT_ENCODING};
use once_cell::sync::Lazy;

/// Result when no `Accept-Encoding` spec applies.
pub const IDENTITY: &str = "identity";

pub const WILDCARD: &str = "*";

const IS_TOKEN: u8 = 1;
const IS_SPACE: u8 = 1 << 1;

const SEPARATORS: &[u8] = b" \t\"(),/:;<=>?@[]\\{}";
const SPACES: &[u8] = b" \t\r\n";

/// RFC 2616 octet classes: `token` characters and linear white space.
static OCTET_TYPES: Lazy<[u8; 256]> = Lazy::new(|| {
    let mut table = [0_u8; 256];
    for (c, slot) in (0_u8..=255).zip(table.iter_mut()) {
        let is_ctl = c <= 31 || c == 127;
        let is_char = c <= 127;
        if SPACES.contains(&c) {
            *slot |= IS_SPACE;
        }
        if is_char && !is_ctl && !SEPARATORS.contains(&c) {
            *slot |= IS_TOKEN;
        }
    }
    table
});

#[inline]
#[must_use]
pub fn is_token(b: u8) -> bool {
    OCTET_TYPES[usize::from(b)] & IS_TOKEN != 0
}

#[inline]
#[must_use]
pub fn is_space(b: u8) -> bool {
    OCTET_TYPES[usize::from(b)] & IS_SPACE != 0
}

/// One parsed `token;q=value` element.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptSpec {
    pub value: String,
    pub q: f64,
}

/// Parse every value of header `name` into specs, in order.
#[must_use]
pub fn parse_accept(headers: &HeaderMap, name: &HeaderName) -> Vec<AcceptSpec> {
    let mut specs = Vec::new();
    for value in headers.get_all(name) {
        parse_accept_value(value.as_bytes(), &mut specs);
    }
    specs
}

/// Parse one header value, appending well-formed elements to `specs`.
pub fn parse_accept_value(mut s: &[u8], specs: &mut Vec<AcceptSpec>) {
    loop {
        s = skip_space(s);
        if s.is_empty() {
            return;
        }
        match expect_element(s) {
            Some((spec, rest)) => {
                specs.push(spec);
                s = match rest.split_first() {
                    Some((b',', rest)) => rest,
                    _ => return,
                };
            }
            None => s = skip_element(s),
        }
    }
}

/// Parse `token [; q=quality]` followed by optional space, up to a comma or
/// the end of input.
fn expect_element(s: &[u8]) -> Option<(AcceptSpec, &[u8])> {
    let (token, rest) = expect_token_slash(s);
    if token.is_empty() {
        return None;
    }
    let mut q = 1.0;
    let mut rest = skip_space(rest);
    if let Some(params) = rest.strip_prefix(b";") {
        let params = skip_space(params).strip_prefix(b"q=")?;
        let (quality, after) = expect_quality(params)?;
        q = quality;
        rest = skip_space(after);
    }
    if !(rest.is_empty() || rest.starts_with(b",")) {
        return None;
    }
    let value = String::from_utf8_lossy(token).into_owned();
    Some((AcceptSpec { value, q }, rest))
}

fn expect_token_slash(s: &[u8]) -> (&[u8], &[u8]) {
    let end = s
        .iter()
        .position(|&b| !is_token(b) && b != b'/')
        .unwrap_or(s.len());
    s.split_at(end)
}

/// `0` or `1`, optionally followed by `.` and decimal digits; at most `1.0`.
fn expect_quality(s: &[u8]) -> Option<(f64, &[u8])> {
    let (&first, rest) = s.split_first()?;
    let mut q: f64 = match first {
        b'0' => 0.0,
        b'1' => 1.0,
        _ => return None,
    };
    let Some(frac) = rest.strip_prefix(b".") else {
        return Some((q, rest));
    };
    let digits = frac.iter().take_while(|b| b.is_ascii_digit()).count();
    // digits past the ninth cannot change the result meaningfully
    let (mut n, mut d) = (0_u32, 1_u32);
    for &b in frac[..digits].iter().take(9) {
        n = n * 10 + u32::from(b - b'0');
        d *= 10;
    }
    q += f64::from(n) / f64::from(d);
    if q > 1.0 {
        return None;
    }
    Some((q, &frac[digits..]))
}

fn skip_space(s: &[u8]) -> &[u8] {
    let start = s.iter().position(|&b| !is_space(b)).unwrap_or(s.len());
    &s[start..]
}

fn skip_element(s: &[u8]) -> &[u8] {
    match s.iter().position(|&b| b == b',') {
        Some(i) => &s[i + 1..],
        None => &[],
    }
}

/// Pick the best of `offers` for already parsed `specs`.
#[must_use]
pub fn select<'a>(specs: &[AcceptSpec], offers: &[&'a str]) -> &'a str {
    let mut best_q = -1.0;
    let mut best: &'a str = IDENTITY;
    for &offer in offers {
        for spec in specs {
            if spec.q > best_q && (spec.value == WILDCARD || spec.value.eq_ignore_ascii_case(offer))
            {
                best_q = spec.q;
                best = offer;
            }
        }
    }
    if best_q == 0.0 {
        return "";
    }
    best
}

/// Best offered content coding for the `Accept-Encoding` values in `headers`.
///
/// `""` means every offer was explicitly rejected with `q=0`.
#[must_use]
pub fn negotiate_content_encoding<'a>(headers: &HeaderMap, offers: &[&'a str]) -> &'a str {
    let specs = parse_accept(headers, &ACCEPT_ENCODING);
    select(&specs, offers)
}
