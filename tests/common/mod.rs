// File: common/mod.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

#![allow(dead_code)]

use gitprobe::config::ConfigParameter;
use gitprobe::http::ProbeClient;
use gitprobe::worker::ScanResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const GIT_CONFIG: &str = "[core]\n\trepositoryformatversion = 0\n\tfilemode = true\n\tbare = false\n\tlogallrefupdates = true\n[remote \"origin\"]\n\turl = git@github.com:example/app.git\n\tfetch = +refs/heads/*:refs/remotes/origin/*\n";

pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Mounts `/<name>/.git/config` answering with `status` and `body`.
pub async fn mount_site(server: &MockServer, name: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/.git/config", name)))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

pub async fn mount_slow_site(server: &MockServer, name: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/.git/config", name)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(GIT_CONFIG)
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

pub fn site_url(server: &MockServer, name: &str) -> Url {
    Url::parse(&format!("{}/{}/.git/config", server.uri(), name)).unwrap()
}

pub fn client_with(rate_limit: u32, timeout: Duration, debug: bool) -> Arc<ProbeClient> {
    let mut config = ConfigParameter::new();
    config.set_rate_limit(rate_limit).unwrap();
    config.set_timeout(timeout).unwrap();
    config.set_debug(debug);
    Arc::new(ProbeClient::new(&config).unwrap())
}

pub fn test_client() -> Arc<ProbeClient> {
    client_with(1000, Duration::from_secs(5), false)
}

pub async fn collect(mut rx: mpsc::Receiver<ScanResult>) -> Vec<ScanResult> {
    let mut results = Vec::new();
    while let Some(result) = rx.recv().await {
        results.push(result);
    }
    results
}
