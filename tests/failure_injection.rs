//! Failure injection tests for the forwarder.

use axum::body::Body;
use axum::http::{header, Response, StatusCode};

mod common;

#[tokio::test]
async fn test_connection_refused_diagnostic_page() {
    let upstream = common::refused_addr().await;
    let (proxy_addr, shutdown) = common::start_proxy(common::proxy_config(upstream)).await;

    let res = common::client()
        .get(format!("http://{}/anything?x=1", proxy_addr))
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "text/html");

    let body = res.text().await.unwrap();
    assert!(body.contains(&format!("http://{}", upstream)), "{body}");
    assert!(body.contains(&format!("grep :{}", upstream.port())));
    assert!(body.contains("Client IP: 127.0.0.1"));
    assert!(body.contains("Edge region: unknown"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_diagnostic_page_reports_edge_metadata() {
    let upstream = common::refused_addr().await;
    let mut config = common::proxy_config(upstream);
    config.edge.region = Some("FRA".into());
    let (proxy_addr, shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .get(format!("http://{}/", proxy_addr))
        .header("cf-connecting-ip", "203.0.113.7")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body = res.text().await.unwrap();
    assert!(body.contains("Client IP: 203.0.113.7"));
    assert!(body.contains("Edge region: FRA"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_hangup() {
    let upstream = common::start_hangup_backend().await;
    let (proxy_addr, shutdown) = common::start_proxy(common::proxy_config(upstream)).await;

    let res = common::client()
        .post(format!("http://{}/submit", proxy_addr))
        .body("payload")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "text/html");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unanswered_upstream_times_out_as_bad_gateway() {
    let upstream = common::start_stalled_backend().await;
    let mut config = common::proxy_config(upstream);
    config.timeouts.upstream_secs = 1;
    config.timeouts.request_secs = 5;
    let (proxy_addr, shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .get(format!("http://{}/slow", proxy_addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "text/html");
    let body = res.text().await.unwrap();
    assert!(body.contains(&format!("http://{}", upstream)), "{body}");
    assert!(body.contains("upstream did not respond within 1s"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_redirect_loop() {
    let (backend_addr, _recorded) = common::start_recording_backend(|_| {
        Response::builder()
            .status(StatusCode::FOUND)
            .header(header::LOCATION, "/loop")
            .body(Body::empty())
            .unwrap()
    })
    .await;
    let mut config = common::proxy_config(backend_addr);
    config.upstream.max_redirects = 5;
    let (proxy_addr, shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .get(format!("http://{}/loop", proxy_addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body = res.text().await.unwrap();
    assert!(body.contains("redirect count exceeded the limit of 5"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_errors_passed_through() {
    // An upstream 5xx is a response, not a transport failure
    let (backend_addr, _recorded) = common::start_recording_backend(|_| {
        Response::builder()
            .status(StatusCode::SERVICE_UNAVAILABLE)
            .body(Body::from("maintenance"))
            .unwrap()
    })
    .await;
    let (proxy_addr, shutdown) = common::start_proxy(common::proxy_config(backend_addr)).await;

    let res = common::client()
        .get(format!("http://{}/", proxy_addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.text().await.unwrap(), "maintenance");

    shutdown.trigger();
}

#[tokio::test]
async fn test_recovers_when_upstream_appears() {
    let upstream = common::refused_addr().await;
    let (proxy_addr, shutdown) = common::start_proxy(common::proxy_config(upstream)).await;
    let client = common::client();

    let res = client.get(format!("http://{}/", proxy_addr)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    // Each request is a fresh attempt; nothing about the failure is remembered
    let listener = tokio::net::TcpListener::bind(upstream).await.unwrap();
    let app = axum::Router::new().fallback(|| async { "back" });
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let res = client.get(format!("http://{}/", proxy_addr)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "back");

    shutdown.trigger();
}
