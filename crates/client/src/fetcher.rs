//! Remote fetcher: one logical upstream call with timeout, retry and backoff.
//!
//! ### Retry policy
//!
//! - At most `1 + max_retries` attempts, each bounded by `timeout`.
//! - Only retryable transport failures (timeouts, connection errors, 429,
//!   5xx) are repeated. Upstream application errors and other 4xx are final.
//! - Before retry `n` (1-based) the fetcher sleeps `backoff_unit * 2^n`.
//!
//! The fetcher never touches the cache and never raises; every call ends in
//! an [`ApiResult`].

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::transport::{HttpTransport, Transport, TransportError, TransportRequest};
use crate::upstream::{ApiResult, TransportFailure, UpstreamConfig, UpstreamRequest, decode};

/// Upper bound on the backoff exponent.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// How a single attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    UpstreamError,
    Retryable,
    NonRetryable,
}

impl AttemptOutcome {
    fn of(result: &ApiResult) -> Self {
        match result {
            ApiResult::Success(_) => AttemptOutcome::Success,
            ApiResult::UpstreamError { .. } => AttemptOutcome::UpstreamError,
            ApiResult::TransportError(f) if f.classification.is_retryable() => AttemptOutcome::Retryable,
            ApiResult::TransportError(_) => AttemptOutcome::NonRetryable,
        }
    }
}

/// Diagnostic event emitted around each attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchEvent {
    AttemptStarted {
        operation: &'static str,
        subject: String,
        attempt: u32,
    },
    AttemptFinished {
        operation: &'static str,
        subject: String,
        attempt: u32,
        status: Option<u16>,
        elapsed: Duration,
        outcome: AttemptOutcome,
    },
    BackoffScheduled {
        operation: &'static str,
        subject: String,
        retry: u32,
        delay: Duration,
    },
    Exhausted {
        operation: &'static str,
        subject: String,
        attempts: u32,
    },
}

/// Sink for [`FetchEvent`]s.
pub trait FetchObserver: Send + Sync {
    fn on_event(&self, event: &FetchEvent);
}

/// Default observer: forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl FetchObserver for TracingObserver {
    fn on_event(&self, event: &FetchEvent) {
        match event {
            FetchEvent::AttemptStarted { operation, subject, attempt } => {
                tracing::debug!(operation, subject = %subject, attempt, "upstream attempt started");
            }
            FetchEvent::AttemptFinished { operation, subject, attempt, status, elapsed, outcome } => {
                tracing::debug!(
                    operation,
                    subject = %subject,
                    attempt,
                    status = ?status,
                    elapsed_ms = elapsed.as_millis() as u64,
                    outcome = ?outcome,
                    "upstream attempt finished"
                );
            }
            FetchEvent::BackoffScheduled { operation, subject, retry, delay } => {
                tracing::info!(
                    operation,
                    subject = %subject,
                    retry,
                    delay_ms = delay.as_millis() as u64,
                    "retrying upstream call after backoff"
                );
            }
            FetchEvent::Exhausted { operation, subject, attempts } => {
                tracing::warn!(operation, subject = %subject, attempts, "upstream retries exhausted");
            }
        }
    }
}

/// Performs upstream calls.
#[derive(Clone)]
pub struct RemoteFetcher {
    transport: Arc<dyn Transport>,
    config: UpstreamConfig,
    observer: Arc<dyn FetchObserver>,
}

impl RemoteFetcher {
    pub fn new(config: UpstreamConfig, transport: Arc<dyn Transport>) -> Self {
        Self { transport, config, observer: Arc::new(TracingObserver) }
    }

    /// Create a fetcher backed by reqwest.
    pub fn http(config: UpstreamConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config.user_agent)?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    pub fn with_observer(mut self, observer: Arc<dyn FetchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.min(MAX_BACKOFF_EXPONENT);
        self.config.backoff_unit.saturating_mul(factor)
    }

    /// Execute one logical upstream call.
    pub async fn fetch(&self, req: &UpstreamRequest) -> ApiResult {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return ApiResult::TransportError(TransportFailure::internal(
                "missing API key: REELCACHE_API_KEY not set",
            ));
        };

        let request = TransportRequest {
            url: self.config.endpoint(req),
            headers: vec![("X-RapidAPI-Key", api_key.to_string()), ("X-RapidAPI-Host", self.config.api_host.clone())],
            query: req.query(),
            timeout: self.config.timeout,
        };

        let operation = req.operation();
        let subject = req.subject();
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.observer
                .on_event(&FetchEvent::AttemptStarted { operation, subject: subject.to_string(), attempt });

            let start = Instant::now();
            let (status, result) = self.attempt(&request).await;

            self.observer.on_event(&FetchEvent::AttemptFinished {
                operation,
                subject: subject.to_string(),
                attempt,
                status,
                elapsed: start.elapsed(),
                outcome: AttemptOutcome::of(&result),
            });

            if !result.is_retryable() {
                return result;
            }

            if attempt > self.config.max_retries {
                self.observer
                    .on_event(&FetchEvent::Exhausted { operation, subject: subject.to_string(), attempts: attempt });
                return result;
            }

            let delay = self.backoff_delay(attempt);
            self.observer.on_event(&FetchEvent::BackoffScheduled {
                operation,
                subject: subject.to_string(),
                retry: attempt,
                delay,
            });
            tokio::time::sleep(delay).await;
        }
    }

    /// A single bounded attempt. Returns the HTTP status when one was received.
    async fn attempt(&self, request: &TransportRequest) -> (Option<u16>, ApiResult) {
        let response = match tokio::time::timeout(request.timeout, self.transport.get(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return (None, ApiResult::TransportError(e.into())),
            Err(_) => return (None, ApiResult::TransportError(TransportFailure::timeout(request.timeout))),
        };

        let status = response.status;
        if !(200..300).contains(&status) {
            return (Some(status), ApiResult::TransportError(TransportFailure::status(status, &response.body)));
        }

        (Some(status), decode(status, &response.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingObserver, Scripted, ScriptedTransport};
    use crate::upstream::Classification;
    use serde_json::json;

    fn config() -> UpstreamConfig {
        UpstreamConfig { api_key: Some("test-key".into()), ..UpstreamConfig::default() }
    }

    fn fetcher(transport: Arc<ScriptedTransport>, observer: Arc<RecordingObserver>) -> RemoteFetcher {
        RemoteFetcher::new(config(), transport).with_observer(observer)
    }

    fn profile_request() -> UpstreamRequest {
        UpstreamRequest::UserInfo { username: "alice".into() }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_first_attempt() {
        let transport = Arc::new(ScriptedTransport::always(Scripted::ok(json!({"user": {"uniqueId": "alice"}}))));
        let observer = Arc::new(RecordingObserver::default());

        let result = fetcher(transport.clone(), observer.clone()).fetch(&profile_request()).await;

        assert_eq!(result, ApiResult::Success(json!({"user": {"uniqueId": "alice"}})));
        assert_eq!(transport.calls(), 1);
        assert!(observer.backoff_delays().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sends_auth_headers_and_query() {
        let transport = Arc::new(ScriptedTransport::always(Scripted::ok(json!({}))));
        let observer = Arc::new(RecordingObserver::default());
        let req = UpstreamRequest::UserPosts { username: "alice".into(), cursor: Some("42".into()), count: 10 };

        fetcher(transport.clone(), observer).fetch(&req).await;

        let sent = &transport.requests()[0];
        assert_eq!(sent.url, "https://tiktok-scraper7.p.rapidapi.com/user/posts");
        assert!(sent.headers.contains(&("X-RapidAPI-Key", "test-key".to_string())));
        assert!(sent.headers.contains(&("X-RapidAPI-Host", "tiktok-scraper7.p.rapidapi.com".to_string())));
        assert!(sent.query.contains(&("cursor", "42".to_string())));
        assert_eq!(sent.timeout, Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_ceiling_on_server_error() {
        let transport = Arc::new(ScriptedTransport::always(Scripted::Status(503, "unavailable".into())));
        let observer = Arc::new(RecordingObserver::default());
        let start = Instant::now();

        let result = fetcher(transport.clone(), observer.clone()).fetch(&profile_request()).await;

        let ApiResult::TransportError(failure) = result else { panic!("expected transport error") };
        assert_eq!(failure.status, Some(503));
        assert_eq!(failure.classification, Classification::Retryable);
        assert_eq!(transport.calls(), 3);
        assert_eq!(observer.backoff_delays(), vec![Duration::from_secs(2), Duration::from_secs(4)]);
        assert!(start.elapsed() >= Duration::from_secs(6));
        assert!(matches!(observer.events().last(), Some(FetchEvent::Exhausted { attempts: 3, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::always(Scripted::Status(404, "no such user".into())));
        let observer = Arc::new(RecordingObserver::default());

        let result = fetcher(transport.clone(), observer.clone()).fetch(&profile_request()).await;

        let ApiResult::TransportError(failure) = result else { panic!("expected transport error") };
        assert_eq!(failure.classification, Classification::NonRetryable);
        assert_eq!(transport.calls(), 1);
        assert!(observer.backoff_delays().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_upstream_error_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::always(Scripted::upstream_error(-1, "user not exist")));
        let observer = Arc::new(RecordingObserver::default());

        let result = fetcher(transport.clone(), observer).fetch(&profile_request()).await;

        assert_eq!(result, ApiResult::UpstreamError { code: -1, msg: "user not exist".into() });
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_rate_limit() {
        let transport = Arc::new(ScriptedTransport::new(
            vec![Scripted::Status(429, "slow down".into()), Scripted::Network("connection reset")],
            Scripted::ok(json!({"ok": true})),
        ));
        let observer = Arc::new(RecordingObserver::default());

        let result = fetcher(transport.clone(), observer.clone()).fetch(&profile_request()).await;

        assert!(result.is_success());
        assert_eq!(transport.calls(), 3);
        assert_eq!(observer.backoff_delays().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_is_retryable() {
        let transport = Arc::new(
            ScriptedTransport::always(Scripted::ok(json!({}))).with_delay(Duration::from_secs(60)),
        );
        let observer = Arc::new(RecordingObserver::default());
        let fetcher = RemoteFetcher::new(UpstreamConfig { max_retries: 0, ..config() }, transport.clone())
            .with_observer(observer);

        let result = fetcher.fetch(&profile_request()).await;

        let ApiResult::TransportError(failure) = result else { panic!("expected timeout") };
        assert!(failure.message.contains("timed out"));
        assert_eq!(failure.classification, Classification::Retryable);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_makes_one_attempt() {
        let transport = Arc::new(ScriptedTransport::always(Scripted::Timeout));
        let observer = Arc::new(RecordingObserver::default());
        let fetcher = RemoteFetcher::new(UpstreamConfig { max_retries: 0, ..config() }, transport.clone())
            .with_observer(observer);

        assert!(fetcher.fetch(&profile_request()).await.is_retryable());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_api_key_skips_network() {
        let transport = Arc::new(ScriptedTransport::always(Scripted::ok(json!({}))));
        let fetcher = RemoteFetcher::new(UpstreamConfig::default(), transport.clone());

        let ApiResult::TransportError(failure) = fetcher.fetch(&profile_request()).await else {
            panic!("expected failure")
        };
        assert_eq!(failure.classification, Classification::NonRetryable);
        assert!(failure.message.contains("API key"));
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn test_backoff_delay() {
        let fetcher = RemoteFetcher::new(config(), Arc::new(ScriptedTransport::always(Scripted::Timeout)));
        assert_eq!(fetcher.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(fetcher.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(fetcher.backoff_delay(3), Duration::from_secs(8));
        assert_eq!(fetcher.backoff_delay(100), Duration::from_secs(65_536));
    }
}
