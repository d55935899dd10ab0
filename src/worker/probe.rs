//! Probe executor: one bounded HTTP(S) request per check.

use std::error::Error as _;

use reqwest::redirect::Policy;
use reqwest::{Client, Method, Url};

use crate::domain::{Check, CheckOutcome, HttpMethod};
use crate::error::MonitorError;

/// Issues probes and classifies what came back.
///
/// Redirects are not followed: a `3xx` is the endpoint's answer and is
/// judged against the check's success codes like any other status.
/// Probes always connect directly, ignoring proxy environment variables.
#[derive(Debug, Clone)]
pub struct Prober {
    client: Client,
}

impl Prober {
    /// Builds the shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Internal`] if the TLS backend cannot be
    /// initialized.
    pub fn new() -> Result<Self, MonitorError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .no_proxy()
            .user_agent(concat!("uptime-monitor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MonitorError::Internal(format!("probe client: {e}")))?;
        Ok(Self { client })
    }

    /// Probes `check` once and returns exactly one outcome.
    ///
    /// The request future and the deadline race inside a single
    /// `timeout`; whichever finishes first decides the outcome and the
    /// loser is dropped unpolled. Nothing here returns an error: every
    /// failure is encoded in the [`CheckOutcome`].
    pub async fn probe(&self, check: &Check) -> CheckOutcome {
        let url = match Url::parse(&check.target_url()) {
            Ok(url) if url.host_str().is_some() => url,
            Ok(_) => return CheckOutcome::transport_error("invalid url: missing host"),
            Err(e) => return CheckOutcome::transport_error(format!("invalid url: {e}")),
        };

        let request = self.client.request(to_method(check.method), url).send();

        let outcome = match tokio::time::timeout(check.timeout(), request).await {
            Err(_elapsed) => CheckOutcome::timed_out(),
            Ok(Err(e)) if e.is_timeout() => CheckOutcome::timed_out(),
            Ok(Err(e)) => CheckOutcome::transport_error(describe(&e)),
            Ok(Ok(response)) => CheckOutcome::responded(response.status().as_u16()),
        };

        tracing::debug!(
            check_id = %check.id,
            url = %check.target_url(),
            had_error = outcome.had_error,
            response_code = ?outcome.response_code,
            "probe finished"
        );
        outcome
    }
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Flattens a transport error and its causes into one line.
fn describe(error: &reqwest::Error) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
