use http::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, CONTENT_TYPE, SET_COOKIE};
use http::{Method, StatusCode};
use kitmux::compress::Compressor;
use kitmux::dispatcher::{chain, handler_fn, set_cookie};
use kitmux::pipeline::{response_from_state, response_with, Directive, ResponseState};
use kitmux::router::Mux;
use kitmux::server::{Request, ResponseRecorder, ResponseWriter};
use kitmux::Handler;

const ALL: [Directive; 4] = [
    Directive::Minify,
    Directive::Brotli,
    Directive::Gzip,
    Directive::Deflate,
];

fn request(accept_encoding: Option<&'static str>) -> Request {
    let r = Request::new(Method::GET, "/").unwrap();
    match accept_encoding {
        Some(value) => r.with_header(ACCEPT_ENCODING, HeaderValue::from_static(value)),
        None => r,
    }
}

fn typed(content_type: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers
}

fn run(state: ResponseState, r: &mut Request) -> ResponseRecorder {
    let mut w = ResponseRecorder::new();
    response_with(state).serve(&mut w, r);
    w
}

fn decode(w: &ResponseRecorder) -> Vec<u8> {
    match w.header("content-encoding") {
        Some(token) => Compressor::shared().decode(token, w.body()).unwrap(),
        None => w.body().to_vec(),
    }
}

#[test]
fn test_negotiated_encoding_is_applied() {
    let body = b"{ \"message\" : \"hello\" }".to_vec();
    let state =
        ResponseState::new(200, typed("application/json"), body).with_compression(ALL.to_vec());

    let w = run(state, &mut request(Some("gzip;q=1.0, br;q=0.5")));
    assert_eq!(w.status(), StatusCode::OK);
    assert_eq!(w.header("content-encoding"), Some("gzip"));
    assert_eq!(w.header("content-type"), Some("application/json"));
    assert_eq!(decode(&w), b"{\"message\":\"hello\"}");
}

#[test]
fn test_caller_order_breaks_ties() {
    let state = ResponseState::new(200, typed("text/plain"), b"abc".to_vec())
        .with_compression(vec![Directive::Deflate, Directive::Brotli]);
    let w = run(state, &mut request(Some("br, deflate")));
    assert_eq!(w.header("content-encoding"), Some("deflate"));
    assert_eq!(decode(&w), b"abc");
}

#[test]
fn test_no_accept_encoding_sends_identity() {
    let state = ResponseState::new(200, typed("text/plain"), b"plain body".to_vec())
        .with_compression(ALL.to_vec());
    let w = run(state, &mut request(None));
    assert_eq!(w.header("content-encoding"), None);
    assert_eq!(w.body(), b"plain body");
}

#[test]
fn test_rejected_encodings_send_identity() {
    let state = ResponseState::new(200, typed("text/plain"), b"plain body".to_vec())
        .with_compression(ALL.to_vec());
    let w = run(state, &mut request(Some("gzip;q=0, *;q=0")));
    assert_eq!(w.header("content-encoding"), None);
    assert_eq!(w.body(), b"plain body");
}

#[test]
fn test_minify_without_transport() {
    let css = b"body {\n  color : red ;\n}\n".to_vec();
    let state = ResponseState::new(200, typed("text/css"), css.clone())
        .with_compression(vec![Directive::Minify]);
    let w = run(state, &mut request(Some("gzip")));
    assert_eq!(w.header("content-encoding"), None);
    assert!(w.body().len() < css.len(), "{}", w.body_str());
}

#[test]
fn test_minify_failure_keeps_body() {
    let body = vec![0x00, 0x01, 0x02, 0xff];
    let state = ResponseState::new(200, typed("application/octet-stream"), body.clone())
        .with_compression(vec![Directive::Minify]);
    let w = run(state, &mut request(None));
    assert_eq!(w.body(), body.as_slice());
}

#[test]
fn test_invalid_utf8_json_is_sent_unminified() {
    let body = b"{ \"a\": \"\xff\" }".to_vec();
    let state = ResponseState::new(200, typed("application/json"), body.clone())
        .with_compression(vec![Directive::Minify, Directive::Gzip]);
    let w = run(state, &mut request(Some("gzip")));
    assert_eq!(w.header("content-encoding"), Some("gzip"));
    assert_eq!(decode(&w), body);
}

#[test]
fn test_missing_content_type_is_sniffed() {
    let body = b"<html><body>  hi  </body></html>".to_vec();
    let state =
        ResponseState::new(200, HeaderMap::new(), body).with_compression(vec![Directive::Minify]);
    let w = run(state, &mut request(None));
    assert_eq!(w.header("content-type"), Some("text/html; charset=utf-8"));
    assert!(!w.body_str().contains("  hi  "), "{}", w.body_str());
}

#[test]
fn test_error_status_forces_plain_text() {
    let state = ResponseState::new(404, typed("text/html"), b"<b>missing</b>".to_vec());
    let w = run(state, &mut request(None));
    assert_eq!(w.status(), StatusCode::NOT_FOUND);
    assert_eq!(w.header("content-type"), Some("text/plain; charset=utf-8"));
    assert_eq!(w.header("x-content-type-options"), Some("nosniff"));
    assert_eq!(w.body(), b"<b>missing</b>");
}

#[test]
fn test_unknown_status_becomes_500() {
    let state = ResponseState::new(299, typed("text/plain"), b"odd".to_vec());
    let w = run(state, &mut request(None));
    assert_eq!(w.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(w.body(), b"Internal Server Error\n");
    assert_eq!(w.header("content-type"), Some("text/plain; charset=utf-8"));
}

#[test]
fn test_state_headers_replace_writer_headers() {
    let mut headers = typed("text/plain");
    headers.append(SET_COOKIE, HeaderValue::from_static("a=1"));
    headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));
    let state = ResponseState::new(201, headers, b"created".to_vec());

    let handler = chain(Vec::new())
        .then(set_cookie("stale=1"))
        .then(handler_fn(|w, _r| {
            w.headers_mut()
                .insert("x-request-id", HeaderValue::from_static("abc"));
        }))
        .then(response_with(state));
    let mut w = ResponseRecorder::new();
    handler.serve(&mut w, &mut request(None));

    assert_eq!(w.status(), StatusCode::CREATED);
    let cookies: Vec<_> = w.headers().get_all(SET_COOKIE).iter().collect();
    assert_eq!(cookies, vec!["a=1", "b=2"]);
    assert_eq!(w.header("x-request-id"), Some("abc"));
}

#[test]
fn test_state_threads_to_not_found_handler() {
    let mux = Mux::new()
        .handle(
            "GET",
            "/api/:version",
            handler_fn(|_w, r| {
                let state = ResponseState::new(200, typed("text/plain"), b"unused".to_vec());
                r.set_state(state);
            }),
        )
        .not_found_handler(response_from_state());

    let mut r = request(None);
    r.set_state(ResponseState::new(
        410,
        HeaderMap::new(),
        b"this page moved away\n".to_vec(),
    ));
    let mut w = ResponseRecorder::new();
    mux.serve(&mut w, &mut r);

    assert_eq!(w.status(), StatusCode::GONE);
    assert_eq!(w.body(), b"this page moved away\n");
    assert!(r.state().is_none());
}

#[test]
fn test_response_from_state_without_state_is_500() {
    let mut w = ResponseRecorder::new();
    response_from_state().serve(&mut w, &mut request(None));
    assert_eq!(w.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
