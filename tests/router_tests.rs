use http::{Method, StatusCode};
use kitmux::dispatcher::{handler_fn, SharedHandler};
use kitmux::router::{Mux, MuxMatcher};
use kitmux::server::{Request, ResponseRecorder, ResponseWriter};
use kitmux::Handler;
use std::sync::Arc;

/// Handler writing a fixed body, to see which entry ran.
fn named(name: &'static str) -> impl Handler + 'static {
    handler_fn(move |w, _r| {
        let _ = w.write(name.as_bytes());
    })
}

/// Handler writing its named arguments as `key=value` lines.
fn dump_args() -> impl Handler + 'static {
    handler_fn(|w, r| {
        let mut out = String::new();
        for (key, value) in r.named_args().iter() {
            out.push_str(&format!("{key}={value}\n"));
        }
        let _ = w.write(out.as_bytes());
    })
}

fn serve(mux: &Mux, method: Method, path: &str) -> ResponseRecorder {
    let mut r = Request::new(method, path).unwrap();
    let mut w = ResponseRecorder::new();
    mux.serve(&mut w, &mut r);
    w
}

#[test]
fn test_highest_priority_match_wins() {
    let mux = Mux::new()
        .with(named("low"), MuxMatcher::mock(1.0, true, true))
        .with(named("high"), MuxMatcher::mock(5.0, true, true))
        .with(named("never"), MuxMatcher::mock(9.0, true, false));

    assert_eq!(serve(&mux, Method::GET, "/").body_str(), "high");
}

#[test]
fn test_equal_priority_keeps_registration_order() {
    let mux = Mux::new()
        .with(named("first"), MuxMatcher::mock(3.0, true, true))
        .with(named("second"), MuxMatcher::mock(3.0, true, false))
        .with(named("third"), MuxMatcher::mock(3.0, false, true))
        .with(named("fourth"), MuxMatcher::mock(4.0, true, false))
        // different configuration, same priority as "first"
        .with(named("fifth"), MuxMatcher::and(3.0, vec![MuxMatcher::mock(1.0, true, true)]));

    // "third" fails validation and is never registered
    assert_eq!(mux.len(), 4);
    let priorities: Vec<f64> = mux.entries().iter().map(|e| e.matcher().priority()).collect();
    assert_eq!(priorities, vec![4.0, 3.0, 3.0, 3.0]);
    assert_eq!(serve(&mux, Method::GET, "/").body_str(), "first");
}

#[test]
fn test_specific_route_beats_generic() {
    let mux = Mux::new()
        .handle("*", "/users/:id", named("any-user"))
        .handle("GET", "/users/:id", named("get-user"))
        .handle("GET", "/users/me", named("me"));

    assert_eq!(serve(&mux, Method::GET, "/users/me").body_str(), "me");
    assert_eq!(serve(&mux, Method::GET, "/users/42").body_str(), "get-user");
    assert_eq!(serve(&mux, Method::DELETE, "/users/42").body_str(), "any-user");
}

#[test]
fn test_colon_pattern_extracts_named_args() {
    let mux = Mux::new().with(dump_args(), MuxMatcher::pattern("/:a/:b/:c"));

    let w = serve(&mux, Method::GET, "/x/yyy/z");
    assert_eq!(w.status(), StatusCode::OK);
    assert_eq!(w.body_str(), "a=x\nb=yyy\nc=z\n");

    let w = serve(&mux, Method::GET, "/x/yyy");
    assert_eq!(w.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_delimiter_styles_agree() {
    let matchers = [
        MuxMatcher::pattern("/:a/:b/:c"),
        MuxMatcher::pattern_with(0.0, "/:a:/:b:/:c:", ":", ":"),
        MuxMatcher::pattern_with(0.0, "/{{a}}/{{b}}/{{c}}", "{{", "}}"),
    ];
    for matcher in matchers {
        let description = matcher.to_string();
        let mux = Mux::new().with(dump_args(), matcher);
        assert_eq!(mux.len(), 1, "{description}");
        let w = serve(&mux, Method::GET, "/x/yyy/z");
        assert_eq!(w.body_str(), "a=x\nb=yyy\nc=z\n", "{description}");
        assert_eq!(
            serve(&mux, Method::GET, "/x/yyy").status(),
            StatusCode::NOT_FOUND,
            "{description}"
        );
    }
}

#[test]
fn test_empty_mux_not_found() {
    let w = serve(&Mux::new(), Method::GET, "/anything");
    assert_eq!(w.status(), StatusCode::NOT_FOUND);
    assert_eq!(w.header("content-type"), Some("text/plain; charset=utf-8"));
    assert_eq!(w.header("x-content-type-options"), Some("nosniff"));
    assert_eq!(w.body_str(), "Not Found\n");
}

#[test]
fn test_not_found_handler() {
    let mux = Mux::new()
        .handle("GET", "/a", named("a"))
        .not_found_handler(handler_fn(|w, _r| {
            w.write_header(StatusCode::GONE);
            let _ = w.write(b"gone");
        }));
    let w = serve(&mux, Method::GET, "/b");
    assert_eq!(w.status(), StatusCode::GONE);
    assert_eq!(w.body_str(), "gone");
}

#[test]
fn test_panic_value_reaches_panic_handler() {
    let mux = Mux::new()
        .handle(
            "GET",
            "/boom",
            handler_fn(|_w, _r| std::panic::panic_any(99_i32)),
        )
        .panic_handler(handler_fn(|w, r| {
            let value = r
                .recovered()
                .and_then(|p| p.downcast_ref::<i32>())
                .copied()
                .unwrap_or_default();
            w.write_header(StatusCode::SERVICE_UNAVAILABLE);
            let _ = w.write(value.to_string().as_bytes());
        }));

    let w = serve(&mux, Method::GET, "/boom");
    assert_eq!(w.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(w.body_str(), "99");
}

#[test]
fn test_panic_without_handler_is_500() {
    let mux = Mux::new().handle("GET", "/boom", handler_fn(|_w, _r| panic!("kaboom")));

    let w = serve(&mux, Method::GET, "/boom");
    assert_eq!(w.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(w.header("content-type"), Some("text/plain; charset=utf-8"));
    assert_eq!(w.body_str(), "Internal Server Error\n");
}

#[test]
fn test_panic_message_is_exposed() {
    let mux = Mux::new()
        .handle("GET", "/boom", handler_fn(|_w, _r| panic!("kaboom")))
        .panic_handler(handler_fn(|w, r| {
            let msg = r.recovered().and_then(|p| p.message()).unwrap_or("?").to_string();
            let _ = w.write(msg.as_bytes());
        }));
    assert_eq!(serve(&mux, Method::GET, "/boom").body_str(), "kaboom");
}

#[test]
fn test_duplicate_registration_is_ignored() {
    let mut mux = Mux::new();
    let h: SharedHandler = Arc::new(named("one"));
    let matcher = || {
        MuxMatcher::and(
            0.0,
            vec![MuxMatcher::methods(["GET"]), MuxMatcher::pattern("/items/:id")],
        )
    };
    assert!(mux.register(Arc::clone(&h), matcher()));
    assert!(!mux.register(h, matcher()));
    let mux = mux.handle("GET", "/items/:id", named("two"));
    assert_eq!(mux.len(), 1);
    assert_eq!(serve(&mux, Method::GET, "/items/1").body_str(), "one");
}

#[test]
fn test_or_accumulates_named_args() {
    let matcher = MuxMatcher::or(
        0.0,
        vec![
            MuxMatcher::pattern("/:first/:rest"),
            MuxMatcher::pattern("/:dir/:file"),
            MuxMatcher::pattern("/nope/:x"),
        ],
    );
    let mux = Mux::new().with(dump_args(), matcher);

    let w = serve(&mux, Method::GET, "/docs/readme");
    assert_eq!(w.body_str(), "first=docs\nrest=readme\ndir=docs\nfile=readme\n");
}

#[test]
fn test_handler_sees_only_winning_args() {
    let mux = Mux::new()
        .with(
            named("never"),
            MuxMatcher::and(
                100.0,
                vec![MuxMatcher::pattern("/:x/:y"), MuxMatcher::methods(["POST"])],
            ),
        )
        .with(dump_args(), MuxMatcher::pattern("/:a/:b"));

    assert_eq!(serve(&mux, Method::GET, "/1/2").body_str(), "a=1\nb=2\n");
}

#[test]
fn test_respond_bridges_http_types() {
    let mux = Mux::new().handle("POST", "/echo", handler_fn(|w, r| {
        let body = r.body().to_vec();
        let _ = w.write(&body);
    }));
    let req = http::Request::builder()
        .method(Method::POST)
        .uri("/echo?x=1")
        .body(b"hello".to_vec())
        .unwrap();
    let resp = mux.respond(req);
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.body(), b"hello");
}

#[test]
fn test_mux_shared_across_threads() {
    let mux = Arc::new(Mux::new().with(dump_args(), MuxMatcher::pattern("/n/:n")));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let mux = Arc::clone(&mux);
            std::thread::spawn(move || {
                let w = serve(&mux, Method::GET, &format!("/n/{i}"));
                w.body_str().into_owned()
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), format!("n={i}\n"));
    }
}
