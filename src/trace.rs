// File: trace.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

//! Connection-lifecycle timing for a single request.
//!
//! A [`TraceListener`] is created per probe and installed as a task-local for
//! the duration of the request. The DNS resolver and the connector layer that
//! the probe client registers in diagnostic mode look the listener up and
//! timestamp their transitions into it. Nothing outside the owning request
//! ever sees the listener; callers get an owned [`DebugTrace`] snapshot back.

use chrono::{DateTime, Utc};
use log::trace;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use std::fmt;
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::{Layer, Service};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

tokio::task_local! {
    static CURRENT_TRACE: TraceListener;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl Span {
    pub fn duration(&self) -> Option<std::time::Duration> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => (end - start).to_std().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsTrace {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub host: String,
    pub addresses: Vec<IpAddr>,
    pub error: Option<String>,
}

impl DnsTrace {
    pub fn duration(&self) -> Option<std::time::Duration> {
        Span {
            start: self.start,
            end: self.end,
        }
        .duration()
    }
}

/// Timestamps collected while one request ran.
///
/// `dial` covers socket connect (and the TLS handshake for https targets);
/// `connection` covers the whole acquisition including name resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugTrace {
    pub address: String,
    pub dns: DnsTrace,
    pub dial: Span,
    pub connection: Span,
    /// Not observed directly: set when the connection is handed to the request.
    pub wrote_headers: Option<DateTime<Utc>>,
    pub first_response_byte: Option<DateTime<Utc>>,
    pub request: Span,
}

fn format_duration(d: Option<std::time::Duration>) -> String {
    d.map_or_else(|| "n/a".to_string(), |d| format!("{:?}", d))
}

impl fmt::Display for DebugTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "Address: {}", self.address)?;
        writeln!(f, "DNS Duration: {}", format_duration(self.dns.duration()))?;
        writeln!(f, "Connect Duration: {}", format_duration(self.dial.duration()))?;
        writeln!(
            f,
            "Request Duration: {}",
            format_duration(self.request.duration())
        )
    }
}

/// Request-scoped recorder handed to the lifecycle hooks.
#[derive(Debug, Clone, Default)]
pub struct TraceListener {
    inner: Arc<Mutex<DebugTrace>>,
}

impl TraceListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listener of the request running on the current task, if any.
    pub fn current() -> Option<TraceListener> {
        CURRENT_TRACE.try_with(|listener| listener.clone()).ok()
    }

    /// Runs `fut` with this listener visible to the transport hooks.
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        CURRENT_TRACE.scope(self, fut).await
    }

    fn record(&self, f: impl FnOnce(&mut DebugTrace)) {
        // A poisoned lock only means another hook panicked mid-write.
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard);
    }

    pub fn request_start(&self, address: &str) {
        self.record(|t| {
            t.address = address.to_string();
            t.request.start = Some(Utc::now());
        });
    }

    pub fn request_end(&self) {
        self.record(|t| t.request.end = Some(Utc::now()));
    }

    pub fn connection_start(&self) {
        self.record(|t| {
            let now = Some(Utc::now());
            t.connection.start = now;
            t.dial.start = now;
        });
    }

    pub fn connection_done(&self) {
        self.record(|t| {
            let now = Some(Utc::now());
            t.connection.end = now;
            t.dial.end = now;
            t.wrote_headers = now;
        });
    }

    pub fn dns_start(&self, host: &str) {
        self.record(|t| {
            t.dns.start = Some(Utc::now());
            t.dns.host = host.to_string();
        });
    }

    pub fn dns_done(&self, result: Result<&[IpAddr], String>) {
        self.record(|t| {
            let now = Some(Utc::now());
            t.dns.end = now;
            match result {
                Ok(addrs) => {
                    t.dns.addresses = addrs.to_vec();
                    // dialing starts as soon as addresses are handed back
                    t.dial.start = now;
                }
                Err(e) => t.dns.error = Some(e),
            }
        });
    }

    pub fn first_response_byte(&self) {
        self.record(|t| t.first_response_byte = Some(Utc::now()));
    }

    pub fn snapshot(&self) -> DebugTrace {
        match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// System resolver that reports lookups to the current request's listener.
#[derive(Debug, Clone, Default)]
pub struct TracingResolver;

impl Resolve for TracingResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let listener = TraceListener::current();
        let host = name.as_str().to_string();
        Box::pin(async move {
            if let Some(l) = &listener {
                l.dns_start(&host);
            }
            trace!("Resolving {}", host);

            let resolved: Result<Addrs, BoxError> =
                match tokio::net::lookup_host((host.as_str(), 0)).await {
                    Ok(addrs) => {
                        let addrs: Vec<_> = addrs.collect();
                        if let Some(l) = &listener {
                            let ips: Vec<IpAddr> = addrs.iter().map(|a| a.ip()).collect();
                            l.dns_done(Ok(ips.as_slice()));
                        }
                        Ok(Box::new(addrs.into_iter()))
                    }
                    Err(e) => {
                        if let Some(l) = &listener {
                            l.dns_done(Err(e.to_string()));
                        }
                        Err(Box::new(e))
                    }
                };
            resolved
        })
    }
}

/// Connector middleware marking connection acquisition start and end.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceLayer;

impl<S> Layer<S> for TraceLayer {
    type Service = TraceConnector<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TraceConnector { inner }
    }
}

#[derive(Debug, Clone)]
pub struct TraceConnector<S> {
    inner: S,
}

impl<S, R> Service<R> for TraceConnector<S>
where
    S: Service<R>,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: R) -> Self::Future {
        let listener = TraceListener::current();
        if let Some(l) = &listener {
            l.connection_start();
        }
        let fut = self.inner.call(req);
        Box::pin(async move {
            let res = fut.await;
            if let (Some(l), true) = (&listener, res.is_ok()) {
                l.connection_done();
            }
            res
        })
    }
}
