mod common;
use common::*;

use jrpc_http::{ServeError, ServiceBuilder};
use std::{net::SocketAddr, time::Duration};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// Write a raw HTTP/1.1 request and read the response until the server
/// closes the connection.
async fn roundtrip<S>(mut stream: S, route: &str, extra: &str, body: &str) -> String
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let req = format!(
        "POST {route} HTTP/1.1\r\n\
         Host: localhost\r\n\
         Content-Type: application/json\r\n\
         Accept: application/json\r\n\
         Connection: close\r\n\
         {extra}\
         Content-Length: {}\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(req.as_bytes()).await.unwrap();

    let mut res = String::new();
    stream.read_to_string(&mut res).await.unwrap();
    res
}

#[cfg(unix)]
#[tokio::test]
async fn unix_socket() {
    use std::os::unix::fs::PermissionsExt;
    use tokio::net::UnixStream;

    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rpc.sock");
    std::fs::write(&path, "stale").unwrap();

    let service = server_builder()
        .unix_socket(&path)
        .unix_socket_mode(0o600)
        .build();

    let token = CancellationToken::new();
    let server = tokio::spawn(service.serve(token.clone()));

    let stream = loop {
        match UnixStream::connect(&path).await {
            Ok(stream) => break stream,
            Err(_) => tokio::time::sleep(Duration::from_millis(10)).await,
        }
    };

    let res = roundtrip(
        stream,
        SERVER_ROUTE,
        "",
        r#"{"jsonrpc":"2.0","method":"subtract","params":[45,3],"id":1}"#,
    )
    .await;
    assert!(res.starts_with("HTTP/1.1 200 OK"), "{res}");
    assert!(res.ends_with(r#"{"jsonrpc":"2.0","result":42,"id":1}"#), "{res}");

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o7777, 0o600);

    token.cancel();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn unix_peers_have_no_address() {
    use tokio::net::UnixStream;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("auth.sock");
    let service = auth_builder().unix_socket(&path).build();

    let token = CancellationToken::new();
    let server = tokio::spawn(service.serve(token.clone()));

    let stream = loop {
        match UnixStream::connect(&path).await {
            Ok(stream) => break stream,
            Err(_) => tokio::time::sleep(Duration::from_millis(10)).await,
        }
    };
    let auth = format!("Authorization: {}\r\n", basic(USERNAME, PASSWORD));
    let res = roundtrip(
        stream,
        AUTH_ROUTE,
        &auth,
        r#"{"jsonrpc":"2.0","method":"update","id":1}"#,
    )
    .await;
    assert!(res.starts_with("HTTP/1.1 403 Forbidden"), "{res}");

    token.cancel();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn transport_selection() {
    let err = server_service().serve(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, ServeError::NoTransport));

    let dir = tempfile::tempdir().unwrap();
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));

    let err = ServiceBuilder::new()
        .unix_socket(dir.path().join("rpc.sock"))
        .tcp_tls(addr, dir.path().join("cert.pem"), dir.path().join("key.pem"))
        .build()
        .serve(CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ServeError::BothTransports));

    let cert = dir.path().join("cert.pem");
    let err = ServiceBuilder::new()
        .tcp_tls(addr, &cert, dir.path().join("key.pem"))
        .build()
        .serve(CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ServeError::MissingFile(path) if path == cert));
}

#[tokio::test]
async fn tcp_with_connect_info() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = auth_service()
        .into_axum()
        .into_make_service_with_connect_info::<SocketAddr>();

    let token = CancellationToken::new();
    let shutdown = token.clone().cancelled_owned();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
    });

    let auth = format!("Authorization: {}\r\n", basic(USERNAME, PASSWORD));
    let body = r#"{"jsonrpc":"2.0","method":"copy","id":"x"}"#;

    let stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let res = roundtrip(stream, AUTH_ROUTE, &auth, body).await;
    assert!(res.starts_with("HTTP/1.1 200 OK"), "{res}");
    assert!(res.contains(r#""remote_address":"127.0.0.1""#), "{res}");

    let stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let res = roundtrip(stream, AUTH_ROUTE, "", body).await;
    assert!(res.starts_with("HTTP/1.1 403 Forbidden"), "{res}");

    token.cancel();
    server.await.unwrap().unwrap();
}
