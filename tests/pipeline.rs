mod common;
use common::*;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode, Version};
use http_body::Frame;
use jrpc_http::{AuthEntry, ErrorPayload, HookError, ServiceBuilder};
use serde_json::json;
use std::{
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    task::{Context, Poll},
};
use tokio::sync::Notify;

#[tokio::test]
async fn subtract_named_and_positional() {
    init_tracing();
    let service = server_service();

    let answer = send_json(
        &service,
        r#"{"jsonrpc":"2.0","method":"subtract","params":{"X":45,"Y":3},"id":7}"#,
    )
    .await;
    assert_eq!(answer.status, StatusCode::OK);
    assert_eq!(answer.body, Some(json!({"jsonrpc":"2.0","result":42,"id":7})));
    assert_eq!(answer.headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(answer.headers[header::SERVER], "JSON-RPC/2.0 (Rust)");

    let answer = send_json(
        &service,
        r#"{"jsonrpc":"2.0","method":"subtract","params":[45,3],"id":"abc"}"#,
    )
    .await;
    assert_eq!(answer.body, Some(json!({"jsonrpc":"2.0","result":42,"id":"abc"})));

    let answer = send_json(
        &service,
        r#"{"jsonrpc":"2.0","method":"subtract","params":[45],"id":1}"#,
    )
    .await;
    assert_eq!(answer.body.unwrap()["error"]["code"], -32602);
}

#[tokio::test]
async fn custom_errors_pass_through() {
    let service = server_service();
    let answer = send_json(
        &service,
        r#"{"jsonrpc":"2.0","method":"subtract","params":{"X":999,"Y":999},"id":1}"#,
    )
    .await;
    assert_eq!(answer.status, StatusCode::OK);
    assert_eq!(
        answer.body,
        Some(json!({
            "jsonrpc": "2.0",
            "error": {"code": -320099, "message": "Custom error", "data": "mock server error"},
            "id": 1
        }))
    );
}

#[tokio::test]
async fn notifications() {
    let service = server_service();

    for body in [
        r#"{"jsonrpc":"2.0","method":"update"}"#,
        r#"{"jsonrpc":"2.0","method":"missing"}"#,
        r#"{"jsonrpc":"2.0","method":"subtract","params":{"X":999,"Y":999}}"#,
        // an explicit null id counts as absent
        r#"{"jsonrpc":"2.0","method":"update","id":null}"#,
        r#"{"jsonrpc":"2.0","method":"missing","id":null}"#,
    ] {
        let answer = send_json(&service, body).await;
        assert_eq!(answer.status, StatusCode::NO_CONTENT, "{body}");
        assert!(answer.body.is_none(), "{body}");
        assert_eq!(answer.headers[header::SERVER], "JSON-RPC/2.0 (Rust)");
    }
}

#[tokio::test]
async fn ids() {
    let service = server_service();

    let answer = send_json(&service, r#"{"jsonrpc":"2.0","method":"copy","id":7.0}"#).await;
    let body = answer.body.unwrap();
    assert_eq!(body["result"]["id"], "7");
    assert_eq!(body["id"], 7.0);

    let answer = send_json(&service, r#"{"jsonrpc":"2.0","method":"copy","id":"x-1"}"#).await;
    assert_eq!(answer.body.unwrap()["result"]["id"], "x-1");

    for id in ["1.5", "[1]", r#"{"a":1}"#, "true"] {
        let answer = send_json(
            &service,
            &format!(r#"{{"jsonrpc":"2.0","method":"copy","id":{id}}}"#),
        )
        .await;
        assert_eq!(answer.status, StatusCode::OK);
        let body = answer.body.unwrap();
        assert_eq!(body["error"]["code"], -32000, "{id}");
        assert_eq!(body["error"]["message"], "Invalid ID");
        assert!(body["id"].is_null());
        assert!(body.get("result").is_none());
    }
}

#[tokio::test]
async fn dispatch_errors() {
    let service = server_service();

    let cases = [
        (r#"{"jsonrpc":"2.0","method":"nope","id":1}"#, -32601, None),
        (
            r#"{"jsonrpc":"2.0","method":"nilmethod","id":1}"#,
            -32603,
            Some("unable to call provided method"),
        ),
        (
            r#"{"jsonrpc":"2.0","method":"rpc.copy","id":1}"#,
            -32600,
            Some("method cannot match the pattern rpc.*"),
        ),
        (
            r#"{"jsonrpc":"2.0","method":"  ","id":1}"#,
            -32600,
            Some("method name is invalid"),
        ),
    ];

    for (body, code, detail) in cases {
        let answer = send_json(&service, body).await;
        assert_eq!(answer.status, StatusCode::OK);
        let body = answer.body.unwrap();
        assert_eq!(body["error"]["code"], code);
        assert_eq!(body["error"]["data"].as_str(), detail);
        assert_eq!(body["id"], 1);
    }
}

#[tokio::test]
async fn malformed_bodies() {
    let service = server_service();

    let answer = send_json(&service, "{}").await;
    assert_eq!(answer.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        answer.body,
        Some(json!({
            "jsonrpc": "2.0",
            "error": {
                "code": -32600,
                "message": "Invalid Request",
                "data": "jsonrpc request member must be exactly '2.0'"
            },
            "id": null
        }))
    );

    let answer = send_json(&service, r#"[{"jsonrpc":"2.0","method":"update","id":1}]"#).await;
    assert_eq!(answer.status, StatusCode::OK);
    assert_eq!(answer.body.unwrap()["error"]["code"], -32002);

    let answer = send_json(&service, r#"{"jsonrpc":"2.0","method":["update"],"id":1}"#).await;
    assert_eq!(answer.body.unwrap()["error"]["code"], -32001);

    let answer = send_json(&service, "not json").await;
    assert_eq!(answer.status, StatusCode::OK);
    let body = answer.body.unwrap();
    assert_eq!(body["error"]["code"], -32700);
    assert!(body["id"].is_null());
}

#[tokio::test]
async fn transport_checks() {
    let service = server_service();
    let body = r#"{"jsonrpc":"2.0","method":"update","id":1}"#;

    let req = post(SERVER_ROUTE)
        .method(http::Method::GET)
        .body(body.to_owned())
        .unwrap();
    let answer = send(&service, req, None).await;
    assert_eq!(answer.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(answer.headers[header::ALLOW], "POST");
    assert_eq!(answer.body.unwrap()["error"]["code"], -32600);

    let req = post(SERVER_ROUTE)
        .version(Version::HTTP_2)
        .body(body.to_owned())
        .unwrap();
    let answer = send(&service, req, None).await;
    assert_eq!(answer.status, StatusCode::NOT_IMPLEMENTED);

    let req = http::Request::post(SERVER_ROUTE)
        .header(header::ACCEPT, "application/json")
        .body(body.to_owned())
        .unwrap();
    let answer = send(&service, req, None).await;
    assert_eq!(answer.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(answer.body.unwrap()["error"]["code"], -32700);

    let req = http::Request::post(SERVER_ROUTE)
        .header(header::CONTENT_TYPE, "APPLICATION/JSON")
        .header(header::ACCEPT, "text/html")
        .body(body.to_owned())
        .unwrap();
    let answer = send(&service, req, None).await;
    assert_eq!(answer.status, StatusCode::NOT_ACCEPTABLE);
}

struct FailingBody;

impl http_body::Body for FailingBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(Some(Err(std::io::Error::other("connection reset"))))
    }
}

#[tokio::test]
async fn unreadable_body() {
    let service = server_service();
    let req = post(SERVER_ROUTE).body(FailingBody).unwrap();
    let answer = send(&service, req, None).await;
    assert_eq!(answer.status, StatusCode::BAD_REQUEST);
    let body = answer.body.unwrap();
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(body["error"]["data"], "connection reset");
}

#[tokio::test]
async fn hooks() {
    let responses = Arc::new(AtomicUsize::new(0));
    let seen = responses.clone();

    let service = server_builder()
        .on_request(|body| {
            if body.windows(7).any(|w| w == b"forbid!") {
                return Err(HookError::with_status("nope", 429));
            }
            if body.windows(7).any(|w| w == b"unknown") {
                return Err(HookError::with_status("nope", 999));
            }
            Ok(())
        })
        .on_response(move |body| {
            seen.fetch_add(1, Ordering::SeqCst);
            if body.windows(4).any(|w| w == b"1337") {
                return Err(HookError::new("filtered"));
            }
            Ok(())
        })
        .build();

    let answer = send_json(&service, r#"{"jsonrpc":"2.0","method":"forbid!","id":1}"#).await;
    assert_eq!(answer.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(answer.body.is_none());
    assert!(answer.headers.is_empty());

    let answer = send_json(&service, r#"{"jsonrpc":"2.0","method":"unknown","id":1}"#).await;
    assert_eq!(answer.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(answer.body.is_none());
    assert_eq!(responses.load(Ordering::SeqCst), 0);

    let answer = send_json(
        &service,
        r#"{"jsonrpc":"2.0","method":"subtract","params":[1340,3],"id":1}"#,
    )
    .await;
    assert_eq!(answer.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(answer.body.is_none());
    assert_eq!(responses.load(Ordering::SeqCst), 1);
    // the response headers are already decided when the hook aborts
    assert_eq!(answer.headers[header::SERVER], "JSON-RPC/2.0 (Rust)");
    assert_eq!(answer.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    // notifications skip the response hook
    let answer = send_json(&service, r#"{"jsonrpc":"2.0","method":"update"}"#).await;
    assert_eq!(answer.status, StatusCode::NO_CONTENT);
    assert_eq!(responses.load(Ordering::SeqCst), 1);

    let answer = send_json(&service, r#"{"jsonrpc":"2.0","method":"update","id":2}"#).await;
    assert_eq!(answer.status, StatusCode::OK);
    assert_eq!(responses.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn headers_are_snapshotted_per_request() {
    let service = server_service();

    let mut headers = HeaderMap::new();
    headers.insert(header::SERVER, HeaderValue::from_static("changed"));
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    service.set_headers(headers);

    let answer = send_json(&service, r#"{"jsonrpc":"2.0","method":"update","id":1}"#).await;
    assert_eq!(answer.headers[header::SERVER], "changed");
    assert_eq!(answer.headers[header::CONTENT_TYPE], "application/json");
    assert!(answer.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    assert_eq!(service.headers()[header::SERVER], "changed");
}

#[tokio::test]
async fn updates_do_not_reach_requests_in_flight() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());

    let service = {
        let (started, release) = (started.clone(), release.clone());
        server_builder()
            .register("wait", move || {
                let (started, release) = (started.clone(), release.clone());
                async move {
                    started.notify_one();
                    release.notified().await;
                    Ok::<_, ErrorPayload>(1)
                }
            })
            .build()
    };

    let in_flight = send_json(&service, r#"{"jsonrpc":"2.0","method":"wait","id":1}"#);
    let update = async {
        started.notified().await;

        let mut headers = HeaderMap::new();
        headers.insert(header::SERVER, HeaderValue::from_static("changed"));
        service.set_headers(headers);
        service.add_authorization([AuthEntry::new("late", "pw", ["127.0.0.1/32"]).unwrap()]);

        release.notify_one();
    };
    let (answer, ()) = tokio::join!(in_flight, update);

    assert_eq!(answer.status, StatusCode::OK);
    assert_eq!(answer.body, Some(json!({"jsonrpc":"2.0","result":1,"id":1})));
    assert_eq!(answer.headers[header::SERVER], "JSON-RPC/2.0 (Rust)");
    assert_eq!(answer.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    // later requests see both updates
    let answer = send_json(&service, r#"{"jsonrpc":"2.0","method":"update","id":2}"#).await;
    assert_eq!(answer.status, StatusCode::FORBIDDEN);

    let req = post(SERVER_ROUTE)
        .header(header::AUTHORIZATION, basic("late", "pw"))
        .body(r#"{"jsonrpc":"2.0","method":"update","id":3}"#.to_owned())
        .unwrap();
    let answer = send(&service, req, Some(localhost())).await;
    assert_eq!(answer.status, StatusCode::OK);
    assert_eq!(answer.headers[header::SERVER], "changed");
    assert!(answer.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn call_view() {
    let service = ServiceBuilder::new()
        .register("copy", copy)
        .behind_reverse_proxy(true)
        .build();

    let req = post("/")
        .header(header::USER_AGENT, "tests/1.0")
        .header("x-real-ip", "10.0.0.9")
        .header("x-forwarded-host", " rpc.example ")
        .body(r#"{"jsonrpc":"2.0","method":"copy","params":[1,2],"id":3}"#.to_owned())
        .unwrap();
    let answer = send(&service, req, Some(localhost())).await;
    let result = &answer.body.unwrap()["result"];

    assert_eq!(result["remote_address"], "10.0.0.9");
    assert_eq!(result["user_agent"], "tests/1.0");
    assert_eq!(result["host"], "rpc.example");
    assert_eq!(result["params"], json!([1, 2]));
    assert_eq!(result["method"], "copy");
    assert_eq!(result["id"], "3");
}

#[tokio::test]
async fn proxy_mode() {
    let service = proxy_service();
    assert!(service.is_proxy());

    for method in ["subtract", "anything", "rpc.internal", "RPC.proxy"] {
        let answer = send_json(
            &service,
            &format!(r#"{{"jsonrpc":"2.0","method":"{method}","params":{{"a":1}},"id":1}}"#),
        )
        .await;
        assert_eq!(answer.status, StatusCode::OK);
        let body = answer.body.unwrap();
        assert_eq!(body["result"]["method"], method);
        assert_eq!(body["result"]["params"], json!({"a": 1}));
    }

    let answer = send_json(&service, r#"{"jsonrpc":"2.0","method":"","id":1}"#).await;
    assert_eq!(answer.body.unwrap()["error"]["code"], -32600);
}
