// File: http.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::config::ConfigParameter;
use crate::error::ProbeError;
use crate::trace::{DebugTrace, TraceLayer, TraceListener, TracingResolver};
use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use log::debug;
use reqwest::{redirect::Policy, StatusCode};
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Section header every git config file starts with.
pub const GIT_CONFIG_MARKER: &[u8] = b"[core]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub vulnerable: bool,
    pub status: u16,
}

/// What one probe produced: the classification or the reason there is none,
/// plus the lifecycle trace when diagnostics are on.
#[derive(Debug)]
pub struct ProbeReport {
    pub outcome: Result<ProbeOutcome, ProbeError>,
    pub debug: Option<DebugTrace>,
}

impl ProbeReport {
    fn failed(error: ProbeError) -> Self {
        ProbeReport {
            outcome: Err(error),
            debug: None,
        }
    }
}

/// Anything that can classify a single URL. The worker pool is generic over
/// this so it can be driven without a network.
pub trait Prober: Send + Sync + 'static {
    fn probe(
        &self,
        cancel: &CancellationToken,
        url: &Url,
    ) -> impl Future<Output = ProbeReport> + Send;
}

pub fn is_vulnerable(status: StatusCode, body: &[u8]) -> bool {
    status == StatusCode::OK
        && body
            .windows(GIT_CONFIG_MARKER.len())
            .any(|window| window == GIT_CONFIG_MARKER)
}

#[derive(Debug, Clone)]
pub struct ProbeClient {
    client: reqwest::Client,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    rate_limit: NonZeroU32,
    timeout: Duration,
    debug: bool,
}

impl ProbeClient {
    pub fn new(config: &ConfigParameter) -> Result<Self, ProbeError> {
        let mut builder = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .redirect(Policy::none())
            .timeout(config.timeout())
            .pool_max_idle_per_host(0)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ));

        if config.debug() {
            builder = builder
                .dns_resolver(Arc::new(TracingResolver))
                .connector_layer(TraceLayer);
        }

        let client = builder.build().map_err(ProbeError::Client)?;

        Ok(ProbeClient {
            client,
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_second(config.rate_limit()))),
            rate_limit: config.rate_limit(),
            timeout: config.timeout(),
            debug: config.debug(),
        })
    }

    pub fn rate_limit(&self) -> NonZeroU32 {
        self.rate_limit
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Waits for a rate-limit token, then fetches `url` once.
    ///
    /// Cancellation while queued on the limiter returns before any network
    /// activity. During the request, cancellation and the client timeout race;
    /// whichever fires first decides the error.
    pub async fn probe(&self, cancel: &CancellationToken, url: &Url) -> ProbeReport {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return ProbeReport::failed(ProbeError::Cancelled),
            _ = self.rate_limiter.until_ready() => {}
        }

        if !self.debug {
            return ProbeReport {
                outcome: self.guarded(cancel, self.fetch(url)).await,
                debug: None,
            };
        }

        let listener = TraceListener::new();
        listener.request_start(&host_port(url));
        let outcome = self
            .guarded(cancel, listener.clone().scope(self.fetch(url)))
            .await;
        listener.request_end();

        ProbeReport {
            outcome,
            debug: Some(listener.snapshot()),
        }
    }

    async fn guarded(
        &self,
        cancel: &CancellationToken,
        fetch: impl Future<Output = Result<ProbeOutcome, ProbeError>>,
    ) -> Result<ProbeOutcome, ProbeError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProbeError::Cancelled),
            outcome = fetch => outcome,
        }
    }

    async fn fetch(&self, url: &Url) -> Result<ProbeOutcome, ProbeError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ProbeError::from_request(e, self.timeout))?;

        if let Some(listener) = TraceListener::current() {
            listener.first_response_byte();
        }

        let status = response.status();
        debug!("{} answered {}", url, status);
        if status != StatusCode::OK {
            return Ok(ProbeOutcome {
                vulnerable: false,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ProbeError::from_request(e, self.timeout))?;

        Ok(ProbeOutcome {
            vulnerable: is_vulnerable(status, &body),
            status: status.as_u16(),
        })
    }
}

impl Prober for ProbeClient {
    async fn probe(&self, cancel: &CancellationToken, url: &Url) -> ProbeReport {
        ProbeClient::probe(self, cancel, url).await
    }
}

fn host_port(url: &Url) -> String {
    match (url.host_str(), url.port_or_known_default()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => url.to_string(),
    }
}
