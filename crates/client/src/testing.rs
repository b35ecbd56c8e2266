//! Scripted transport and recording observer for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Value, json};
use tokio::sync::Semaphore;

use crate::fetcher::{FetchEvent, FetchObserver};
use crate::transport::{RawResponse, Transport, TransportError, TransportRequest};

/// One canned transport outcome.
#[derive(Debug, Clone)]
pub(crate) enum Scripted {
    Status(u16, String),
    Timeout,
    Network(&'static str),
}

impl Scripted {
    pub(crate) fn ok(data: Value) -> Self {
        Scripted::Status(200, json!({"code": 0, "msg": "success", "data": data}).to_string())
    }

    pub(crate) fn upstream_error(code: i64, msg: &str) -> Self {
        Scripted::Status(200, json!({"code": code, "msg": msg, "data": null}).to_string())
    }
}

/// Transport that replays a script, then repeats `fallback` forever.
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Mutex<Scripted>,
    requests: Mutex<Vec<TransportRequest>>,
    calls: AtomicUsize,
    delay: Duration,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<Scripted>, fallback: Scripted) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Mutex::new(fallback),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            gate: None,
        }
    }

    pub(crate) fn always(response: Scripted) -> Self {
        Self::new(Vec::new(), response)
    }

    /// Every call sleeps for `delay` before answering.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every call waits for a permit on `gate` before answering.
    pub(crate) fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn set_fallback(&self, response: Scripted) {
        *self.fallback.lock().unwrap() = response;
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, request: &TransportRequest) -> Result<RawResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let next = self.script.lock().unwrap().pop_front();
        let response = next.unwrap_or_else(|| self.fallback.lock().unwrap().clone());

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match response {
            Scripted::Status(status, body) => Ok(RawResponse { status, body: Bytes::from(body), fetch_ms: 0 }),
            Scripted::Timeout => Err(TransportError::Timeout(request.timeout)),
            Scripted::Network(message) => Err(TransportError::Network(message.to_string())),
        }
    }
}

/// Observer that keeps every event.
#[derive(Default)]
pub(crate) struct RecordingObserver {
    events: Mutex<Vec<FetchEvent>>,
}

impl RecordingObserver {
    pub(crate) fn events(&self) -> Vec<FetchEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn backoff_delays(&self) -> Vec<Duration> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                FetchEvent::BackoffScheduled { delay, .. } => Some(delay),
                _ => None,
            })
            .collect()
    }
}

impl FetchObserver for RecordingObserver {
    fn on_event(&self, event: &FetchEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
