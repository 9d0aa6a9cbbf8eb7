//! Delivery of detected wins to the server.
//!
//! A detector has two ways to reach the server: the preferred in-process bus
//! to a proxy task that owns the HTTP connection, and a direct HTTP call.
//! [`DeliveryTransport`] owns the policy between them: try the preferred
//! channel, and only if it is unavailable or reports an error, try the
//! fallback exactly once. The two channels are never used concurrently for
//! the same win. There is no further retry; duplicates caused by a lost reply
//! are absorbed by the server's ledger deduplication.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};
use url::Url;

use super::{ClientError, parse_response};
use crate::detector::DetectorThrottle;
use crate::objects::{AdmissionResponse, WinEventPayload};

/// Default buffer of the in-process bus.
pub const DEFAULT_BUS_BUFFER: usize = 64;

/// One path from the detector to the server.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether the channel can be used at all right now. A channel that is
    /// merely slow is still available.
    fn is_available(&self) -> bool {
        true
    }

    async fn send(&self, payload: &WinEventPayload) -> Result<AdmissionResponse, ClientError>;
}

#[async_trait]
impl<T: DeliveryChannel + ?Sized> DeliveryChannel for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    async fn send(&self, payload: &WinEventPayload) -> Result<AdmissionResponse, ClientError> {
        (**self).send(payload).await
    }
}

/// Outcome of [`DeliveryTransport::deliver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryResult {
    Delivered {
        channel: &'static str,
        response: AdmissionResponse,
    },
    Failed,
}

impl DeliveryResult {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryResult::Delivered { .. })
    }
}

/// Preferred-then-fallback delivery policy.
pub struct DeliveryTransport<P, F> {
    preferred: P,
    fallback: F,
}

impl<P: DeliveryChannel, F: DeliveryChannel> DeliveryTransport<P, F> {
    pub fn new(preferred: P, fallback: F) -> Self {
        Self {
            preferred,
            fallback,
        }
    }

    /// Deliver one win. Resolves only after a channel answered or both
    /// failed.
    pub async fn deliver(&self, payload: &WinEventPayload) -> DeliveryResult {
        if self.preferred.is_available() {
            match self.preferred.send(payload).await {
                Ok(response) => {
                    return DeliveryResult::Delivered {
                        channel: self.preferred.name(),
                        response,
                    };
                }
                Err(e) => {
                    warn!(
                        channel = self.preferred.name(),
                        error = %e,
                        "Preferred channel failed, falling back"
                    );
                }
            }
        } else {
            debug!(
                channel = self.preferred.name(),
                "Preferred channel unavailable, falling back"
            );
        }

        match self.fallback.send(payload).await {
            Ok(response) => DeliveryResult::Delivered {
                channel: self.fallback.name(),
                response,
            },
            Err(e) => {
                error!(
                    channel = self.fallback.name(),
                    error = %e,
                    name = %payload.name,
                    item = %payload.item,
                    "Win delivery failed on both channels"
                );
                DeliveryResult::Failed
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Direct HTTP channel
// ---------------------------------------------------------------------------

/// `POST /api/v1/detector/event` straight to the server.
#[derive(Debug, Clone)]
pub struct DirectChannel {
    http: Client,
    base_url: Url,
}

impl DirectChannel {
    /// Create a channel with a short request timeout.
    pub fn new(base_url: Url) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { http, base_url }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }
}

#[async_trait]
impl DeliveryChannel for DirectChannel {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn send(&self, payload: &WinEventPayload) -> Result<AdmissionResponse, ClientError> {
        let url = self.base_url.join("/api/v1/detector/event")?;
        let resp = self.http.post(url).json(payload).send().await?;
        parse_response(resp).await
    }
}

// ---------------------------------------------------------------------------
// In-process bus channel
// ---------------------------------------------------------------------------

struct BusEnvelope {
    payload: WinEventPayload,
    reply: oneshot::Sender<Result<AdmissionResponse, ClientError>>,
}

/// Detector end of the in-process bus.
#[derive(Clone)]
pub struct BusChannel {
    tx: mpsc::Sender<BusEnvelope>,
}

/// Proxy end of the in-process bus. Forwards every envelope upstream and
/// replies with the upstream result.
pub struct BusProxy<U> {
    rx: mpsc::Receiver<BusEnvelope>,
    upstream: U,
}

/// Create a bus with the given buffer.
///
/// The returned [`BusProxy`] must be driven with [`BusProxy::run`]; until it
/// is, and after it stops, the [`BusChannel`] reports itself unavailable.
pub fn bus_channel<U: DeliveryChannel>(buffer: usize, upstream: U) -> (BusChannel, BusProxy<U>) {
    let (tx, rx) = mpsc::channel(buffer);
    (BusChannel { tx }, BusProxy { rx, upstream })
}

#[async_trait]
impl DeliveryChannel for BusChannel {
    fn name(&self) -> &'static str {
        "bus"
    }

    fn is_available(&self) -> bool {
        !self.tx.is_closed()
    }

    async fn send(&self, payload: &WinEventPayload) -> Result<AdmissionResponse, ClientError> {
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(BusEnvelope {
                payload: payload.clone(),
                reply,
            })
            .await
            .map_err(|_| ClientError::BusClosed)?;
        reply_rx.await.map_err(|_| ClientError::NoReply)?
    }
}

impl<U: DeliveryChannel> BusProxy<U> {
    /// Run until shutdown is signaled or every [`BusChannel`] is dropped.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("BusProxy started");

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("BusProxy received shutdown signal");
                        break;
                    }
                }

                Some(envelope) = self.rx.recv() => {
                    debug!(name = %envelope.payload.name, "Forwarding win over bus");
                    let result = self.upstream.send(&envelope.payload).await;
                    let _ = envelope.reply.send(result);
                }

                else => {
                    info!("Bus channel closed");
                    break;
                }
            }
        }

        info!("BusProxy shutdown complete");
    }
}

// ---------------------------------------------------------------------------
// Submitter
// ---------------------------------------------------------------------------

/// Throttle plus transport: the detector's `submit` entry point.
pub struct WinSubmitter<P, F> {
    throttle: Arc<DetectorThrottle>,
    transport: DeliveryTransport<P, F>,
}

impl<P: DeliveryChannel, F: DeliveryChannel> WinSubmitter<P, F> {
    pub fn new(throttle: Arc<DetectorThrottle>, transport: DeliveryTransport<P, F>) -> Self {
        Self {
            throttle,
            transport,
        }
    }

    /// Submit a detected win. Returns `None` when the throttle suppressed it.
    pub async fn submit(&self, payload: WinEventPayload) -> Option<DeliveryResult> {
        if !self.throttle.should_emit(&payload) {
            return None;
        }

        info!(
            kind = %payload.kind,
            name = %payload.name,
            item = %payload.item,
            price = ?payload.price,
            "Submitting win"
        );
        let result = self.transport.deliver(&payload).await;
        if let DeliveryResult::Delivered { channel, response } = &result {
            info!(channel, status = %response.status, "Win delivered");
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::AdmissionStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeChannel {
        name: &'static str,
        available: bool,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FakeChannel {
        fn new(name: &'static str, available: bool, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                available,
                fail,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DeliveryChannel for FakeChannel {
        fn name(&self) -> &'static str {
            self.name
        }

        fn is_available(&self) -> bool {
            self.available
        }

        async fn send(&self, _: &WinEventPayload) -> Result<AdmissionResponse, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ClientError::NoReply)
            } else {
                Ok(AdmissionResponse {
                    status: AdmissionStatus::Recorded,
                    reason: None,
                    entry_id: None,
                })
            }
        }
    }

    fn win() -> WinEventPayload {
        WinEventPayload::sale("alice", "Charizard Card", Some("$12.50".into()))
    }

    #[tokio::test]
    async fn test_preferred_success_skips_fallback() {
        let preferred = FakeChannel::new("bus", true, false);
        let fallback = FakeChannel::new("direct", true, false);
        let transport = DeliveryTransport::new(preferred.clone(), fallback.clone());

        let result = transport.deliver(&win()).await;
        assert!(matches!(result, DeliveryResult::Delivered { channel: "bus", .. }));
        assert_eq!(preferred.calls(), 1);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_preferred_error_falls_back_once() {
        let preferred = FakeChannel::new("bus", true, true);
        let fallback = FakeChannel::new("direct", true, false);
        let transport = DeliveryTransport::new(preferred.clone(), fallback.clone());

        let result = transport.deliver(&win()).await;
        assert!(matches!(result, DeliveryResult::Delivered { channel: "direct", .. }));
        assert_eq!(preferred.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_preferred_is_not_called() {
        let preferred = FakeChannel::new("bus", false, false);
        let fallback = FakeChannel::new("direct", true, false);
        let transport = DeliveryTransport::new(preferred.clone(), fallback.clone());

        assert!(transport.deliver(&win()).await.is_delivered());
        assert_eq!(preferred.calls(), 0);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_both_failing_reports_failed() {
        let preferred = FakeChannel::new("bus", true, true);
        let fallback = FakeChannel::new("direct", true, true);
        let transport = DeliveryTransport::new(preferred.clone(), fallback.clone());

        assert_eq!(transport.deliver(&win()).await, DeliveryResult::Failed);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_bus_forwards_through_proxy() {
        let upstream = FakeChannel::new("upstream", true, false);
        let (bus, proxy) = bus_channel(4, upstream.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(proxy.run(shutdown_rx));

        assert!(bus.is_available());
        let response = bus.send(&win()).await.unwrap();
        assert_eq!(response.status, AdmissionStatus::Recorded);
        assert_eq!(upstream.calls(), 1);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
        assert!(!bus.is_available());
    }

    #[tokio::test]
    async fn test_submitter_throttles_repeats() {
        let preferred = FakeChannel::new("bus", true, false);
        let fallback = FakeChannel::new("direct", true, false);
        let submitter = WinSubmitter::new(
            Arc::new(DetectorThrottle::default()),
            DeliveryTransport::new(preferred.clone(), fallback),
        );

        assert!(submitter.submit(win()).await.is_some());
        assert!(submitter.submit(win()).await.is_none());
        assert_eq!(preferred.calls(), 1);
    }
}
