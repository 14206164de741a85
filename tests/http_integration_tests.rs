// File: http_integration_tests.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

mod common;

use common::*;
use gitprobe::error::{ErrorKind, ProbeError};
use serial_test::serial;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_exposed_config_is_vulnerable() {
    let server = setup_mock_server().await;
    mount_site(&server, "found", 200, GIT_CONFIG).await;

    let report = test_client()
        .probe(&CancellationToken::new(), &site_url(&server, "found"))
        .await;

    let outcome = report.outcome.unwrap();
    assert!(outcome.vulnerable);
    assert_eq!(outcome.status, 200);
    assert!(report.debug.is_none());
}

#[tokio::test]
async fn test_not_found_is_not_vulnerable() {
    let server = setup_mock_server().await;
    mount_site(&server, "missing", 404, "Not Found").await;

    let report = test_client()
        .probe(&CancellationToken::new(), &site_url(&server, "missing"))
        .await;

    let outcome = report.outcome.unwrap();
    assert!(!outcome.vulnerable);
    assert_eq!(outcome.status, 404);
}

#[tokio::test]
async fn test_ok_without_marker_is_not_vulnerable() {
    let server = setup_mock_server().await;
    mount_site(&server, "html", 200, "<html><body>Welcome</body></html>").await;

    let report = test_client()
        .probe(&CancellationToken::new(), &site_url(&server, "html"))
        .await;

    assert!(!report.outcome.unwrap().vulnerable);
}

#[tokio::test]
async fn test_redirect_is_not_followed() {
    let server = setup_mock_server().await;
    mount_site(&server, "target", 200, GIT_CONFIG).await;
    Mock::given(method("GET"))
        .and(path("/moved/.git/config"))
        .respond_with(
            ResponseTemplate::new(302)
                .append_header("location", format!("{}/target/.git/config", server.uri())),
        )
        .expect(1)
        .mount(&server)
        .await;

    let report = test_client()
        .probe(&CancellationToken::new(), &site_url(&server, "moved"))
        .await;

    let outcome = report.outcome.unwrap();
    assert!(!outcome.vulnerable);
    assert_eq!(outcome.status, 302);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
#[serial]
async fn test_slow_server_times_out() {
    let server = setup_mock_server().await;
    mount_slow_site(&server, "slow", Duration::from_secs(3)).await;

    let client = client_with(100, Duration::from_millis(300), false);
    let report = client
        .probe(&CancellationToken::new(), &site_url(&server, "slow"))
        .await;

    let err = report.outcome.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(err.to_string().contains("deadline exceeded"));
}

#[tokio::test]
#[serial]
async fn test_cancel_mid_request_wins_over_timeout() {
    let server = setup_mock_server().await;
    mount_slow_site(&server, "slow", Duration::from_secs(3)).await;

    let client = client_with(100, Duration::from_secs(10), false);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let report = client.probe(&cancel, &site_url(&server, "slow")).await;

    assert!(matches!(report.outcome, Err(ProbeError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Bind then drop a listener so the port is very likely closed.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let url = Url::parse(&format!("http://127.0.0.1:{}/.git/config", port)).unwrap();

    let report = test_client().probe(&CancellationToken::new(), &url).await;

    let err = report.outcome.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn test_debug_trace_is_recorded_per_request() {
    let server = setup_mock_server().await;
    mount_site(&server, "found", 200, GIT_CONFIG).await;

    let client = client_with(100, Duration::from_secs(5), true);
    let url = site_url(&server, "found");
    let cancel = CancellationToken::new();

    let first = client.probe(&cancel, &url).await;
    let second = client.probe(&cancel, &url).await;

    assert!(first.outcome.unwrap().vulnerable);
    let first = first.debug.unwrap();
    let second = second.debug.unwrap();

    let port = server.address().port();
    assert_eq!(first.address, format!("127.0.0.1:{}", port));
    assert!(first.connection.duration().is_some());
    assert!(first.dial.duration().is_some());
    assert!(first.first_response_byte.is_some());
    assert!(first.request.duration().is_some());
    assert!(first.request.start < second.request.start);
}

#[tokio::test]
async fn test_debug_trace_records_dns() {
    let server = setup_mock_server().await;
    mount_site(&server, "found", 200, GIT_CONFIG).await;

    let client = client_with(100, Duration::from_secs(5), true);
    let url = Url::parse(&format!(
        "http://localhost:{}/found/.git/config",
        server.address().port()
    ))
    .unwrap();

    let report = client.probe(&CancellationToken::new(), &url).await;
    let trace = report.debug.unwrap();

    assert_eq!(trace.dns.host, "localhost");
    assert!(!trace.dns.addresses.is_empty());
    assert!(trace.dns.duration().is_some());
    assert!(trace.to_string().contains("DNS Duration:"));
}
