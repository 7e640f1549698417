use kitmux::compress::{detect_content_type, Brotli, CompressError, Compressor, Deflate, Gzip};
use kitmux::config::CompressionConfig;
use proptest::prelude::*;
use std::sync::Arc;

const SCHEMES: [&str; 3] = ["br", "gzip", "deflate"];

fn fast() -> Compressor {
    Compressor::with_config(&CompressionConfig {
        gzip_level: 1,
        deflate_level: 1,
        brotli_quality: 1,
        brotli_window: 16,
    })
}

proptest! {
    #[test]
    fn prop_decode_inverts_encode(body in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let c = fast();
        for scheme in SCHEMES {
            let encoded = c.encode(scheme, &body).unwrap();
            let decoded = c.decode(scheme, &encoded).unwrap();
            prop_assert_eq!(&decoded, &body, "scheme {}", scheme);
        }
    }

    #[test]
    fn prop_repetitive_text_shrinks(word in "[a-z]{3,12}", n in 64_usize..256) {
        let body = word.repeat(n).into_bytes();
        let c = fast();
        for scheme in SCHEMES {
            let encoded = c.encode(scheme, &body).unwrap();
            prop_assert!(encoded.len() < body.len(), "scheme {}", scheme);
        }
    }
}

#[test]
fn test_default_settings_round_trip() {
    let body = "<html><body>hello hello hello hello</body></html>".repeat(50);
    let c = Compressor::shared();
    for scheme in SCHEMES {
        let encoded = c.encode(scheme, body.as_bytes()).unwrap();
        assert_eq!(c.decode(scheme, &encoded).unwrap(), body.as_bytes());
    }
}

#[test]
fn test_streams_interoperate_with_flate2() {
    use std::io::Read;

    let body = b"interoperability check ".repeat(20);
    let encoded = Compressor::shared().encode("gzip", &body).unwrap();
    let mut decoded = Vec::new();
    flate2::read::GzDecoder::new(&encoded[..])
        .read_to_end(&mut decoded)
        .unwrap();
    assert_eq!(decoded, body);

    let encoded = Compressor::shared().encode("deflate", &body).unwrap();
    let mut decoded = Vec::new();
    flate2::read::DeflateDecoder::new(&encoded[..])
        .read_to_end(&mut decoded)
        .unwrap();
    assert_eq!(decoded, body);
}

#[test]
fn test_corrupt_input_is_an_error() {
    let c = Compressor::shared();
    let err = c.decode("gzip", b"definitely not gzip").unwrap_err();
    assert!(matches!(err, CompressError::Io(_)), "{err:?}");
}

#[test]
fn test_unknown_scheme() {
    let c = Compressor::shared();
    assert!(matches!(
        c.decode("zstd", b""),
        Err(CompressError::UnsupportedEncoding { .. })
    ));
}

#[test]
fn test_custom_codec_set() {
    let mut c = Compressor::empty();
    assert!(c.encodings().is_empty());
    c.register(Arc::new(Deflate::new(6)));
    c.register(Arc::new(Brotli::new(5, 18)));
    c.register(Arc::new(Gzip::new(6)));
    assert_eq!(c.encodings(), vec!["deflate", "br", "gzip"]);
}

#[test]
fn test_minify_by_media_type() {
    let c = Compressor::shared();
    let json = c
        .minify("application/json; charset=utf-8", b"{ \"a\" : [1, 2] }")
        .unwrap();
    assert_eq!(json, b"{\"a\":[1,2]}");

    let html = c
        .minify("text/html", b"<p>  hello   world  </p>\n\n")
        .unwrap();
    assert!(html.len() < 26, "{}", String::from_utf8_lossy(&html));

    assert!(matches!(
        c.minify("image/png", b"\x89PNG"),
        Err(CompressError::UnsupportedMediaType { .. })
    ));
}

#[test]
fn test_detect_content_type() {
    assert_eq!(detect_content_type(b"<!DOCTYPE html><html>"), "text/html; charset=utf-8");
    assert_eq!(detect_content_type(b"\x89PNG\r\n\x1a\n...."), "image/png");
    assert_eq!(detect_content_type(b"plain words"), "text/plain; charset=utf-8");
}
