//! Tests for the application routes, middleware and startup.

use std::net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener};

use axum::{Router, http::StatusCode, routing::get};
use rstest::{fixture, rstest};

use super::{AppError, MarathonApp, VERSION_HEADER};
use crate::{
    config::{Config, SharedConfig},
    server::{ServerError, ServerHandle},
};

#[fixture]
fn config() -> SharedConfig {
    let mut config = Config::default();
    config.app.host = Ipv4Addr::LOCALHOST.to_string();
    SharedConfig::new(config)
}

/// Reserve a free local port and release it for rebinding.
///
/// Subject to a time-of-check/time-of-use race; only use in tests.
fn free_port() -> u16 {
    StdTcpListener::bind(SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0))
        .and_then(|listener| listener.local_addr())
        .expect("failed to reserve a port")
        .port()
}

async fn listen(app: &MarathonApp) -> ServerHandle {
    app.listen(SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0))
        .await
        .expect("listen failed")
}

fn url(handle: &ServerHandle, path: &str) -> String { format!("http://{}{path}", handle.local_addr()) }

/// `GET` `url` with a proxy-free client.
async fn fetch(url: String) -> reqwest::Result<reqwest::Response> {
    reqwest::Client::builder().no_proxy().build()?.get(url).send().await
}

#[rstest]
#[tokio::test]
async fn healthcheck_returns_working_text(config: SharedConfig) {
    let app = MarathonApp::new(config);
    let handle = listen(&app).await;

    let response = fetch(url(&handle, "/healthcheck"))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.expect("body"), "WORKING");

    handle.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn healthcheck_reflects_config_changes(config: SharedConfig) {
    let app = MarathonApp::new(config.clone());
    let handle = listen(&app).await;

    config.update(|c| c.healthcheck.working_text = "OTHERWORKING".to_owned());
    let body = fetch(url(&handle, "/healthcheck"))
        .await
        .expect("request failed")
        .text()
        .await
        .expect("body");
    assert_eq!(body, "OTHERWORKING");

    handle.shutdown().await;
}

#[rstest]
#[case("/healthcheck", StatusCode::OK)]
#[case("/missing", StatusCode::NOT_FOUND)]
#[tokio::test]
async fn every_response_carries_version(
    config: SharedConfig,
    #[case] path: &str,
    #[case] status: StatusCode,
) {
    let app = MarathonApp::new(config);
    let handle = listen(&app).await;

    let response = fetch(url(&handle, path))
        .await
        .expect("request failed");
    assert_eq!(response.status(), status);
    assert_eq!(
        response
            .headers()
            .get(VERSION_HEADER.as_str())
            .and_then(|v| v.to_str().ok()),
        Some(crate::VERSION)
    );

    handle.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn panicking_handler_becomes_internal_error(config: SharedConfig) {
    let extra = Router::new().route(
        "/boom",
        get(|| async {
            if true {
                panic!("boom");
            }
            "unreachable"
        }),
    );
    let app = MarathonApp::new(config).with_routes(extra);
    let handle = listen(&app).await;

    let response = fetch(url(&handle, "/boom"))
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().contains_key(VERSION_HEADER.as_str()));

    let response = fetch(url(&handle, "/healthcheck"))
        .await
        .expect("request after panic failed");
    assert_eq!(response.status(), StatusCode::OK);

    handle.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn run_listens_on_configured_port(config: SharedConfig) {
    let app = MarathonApp::new(config.clone());
    let port = free_port();
    config.set_port(port);

    let handle = app.run().await.expect("run failed");
    assert_eq!(handle.local_addr().port(), port);

    handle.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn run_reads_port_at_call_time(config: SharedConfig) {
    let app = MarathonApp::new(config.clone());

    let first_port = free_port();
    config.set_port(first_port);
    let first = app.run().await.expect("first run failed");

    let second_port = free_port();
    config.set_port(second_port);
    let second = app.run().await.expect("second run failed");

    assert_eq!(first.local_addr().port(), first_port);
    assert_eq!(second.local_addr().port(), second_port);
    assert!(!first.same_listener(&second));

    first.shutdown().await;
    second.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn run_rejects_when_port_is_taken(config: SharedConfig) {
    let app = MarathonApp::new(config.clone());
    let occupied = StdTcpListener::bind(SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0))
        .expect("failed to occupy a port");
    config.set_port(occupied.local_addr().expect("occupied address").port());

    let err = app.run().await.expect_err("run should fail");
    assert!(
        matches!(err, AppError::Server(ServerError::Bind(_))),
        "unexpected error: {err:?}"
    );
}

#[rstest]
#[case::empty("")]
#[case::whitespace("not a host")]
#[tokio::test]
async fn run_rejects_unresolvable_host(config: SharedConfig, #[case] host: &str) {
    config.update(|c| c.app.host = host.to_owned());
    let app = MarathonApp::new(config);

    let err = app.run().await.expect_err("run should fail");
    assert!(
        matches!(&err, AppError::InvalidAddress { host: reported, port: 8080, .. } if reported == host),
        "unexpected error: {err:?}"
    );
    assert!(
        std::error::Error::source(&err).is_some(),
        "resolver error is kept as the cause"
    );
}
