//! Wheel service sink.
//!
//! Wheel items (title carries the marker, or the detector flagged a wheel
//! spin) are forwarded to the companion wheel service so it can queue a spin
//! for the buyer. A pending payment always blocks this sink, including on
//! manual reprints.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use autoprint_sdk::objects::SinkOutcome;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use url::Url;

use super::{SinkError, bounded};
use crate::config::{PipelineSettings, WheelConfig};
use crate::entities::parse_amount;
use crate::events::DispatchRequest;

#[async_trait]
pub trait WheelForwarder: Send + Sync {
    async fn forward(
        &self,
        buyer: &str,
        item: &str,
        amount: Option<Decimal>,
    ) -> Result<(), SinkError>;
}

/// `POST {endpoint}` with `{"buyer", "item", "amount"}`; any 2xx is an ack.
#[derive(Debug, Clone)]
pub struct HttpWheelForwarder {
    http: reqwest::Client,
    endpoint: Url,
}

#[derive(Serialize)]
struct WheelSpin<'a> {
    buyer: &'a str,
    item: &'a str,
    amount: Option<Decimal>,
}

impl HttpWheelForwarder {
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl WheelForwarder for HttpWheelForwarder {
    async fn forward(
        &self,
        buyer: &str,
        item: &str,
        amount: Option<Decimal>,
    ) -> Result<(), SinkError> {
        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(&WheelSpin {
                buyer,
                item,
                amount,
            })
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

pub struct WheelSink {
    forwarder: Option<Arc<dyn WheelForwarder>>,
    marker: String,
    timeout: Duration,
}

impl WheelSink {
    pub fn new(
        forwarder: Option<Arc<dyn WheelForwarder>>,
        marker: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            forwarder,
            marker: marker.into().to_lowercase(),
            timeout,
        }
    }

    pub fn from_config(config: &WheelConfig) -> Self {
        let forwarder = config
            .endpoint
            .clone()
            .map(|url| Arc::new(HttpWheelForwarder::new(url)) as Arc<dyn WheelForwarder>);
        Self::new(forwarder, config.marker.clone(), config.timeout)
    }

    pub fn is_wheel_item(&self, req: &DispatchRequest) -> bool {
        req.wheel_hint
            || (!self.marker.is_empty() && req.item.to_lowercase().contains(&self.marker))
    }

    pub async fn deliver(&self, req: &DispatchRequest, settings: &PipelineSettings) -> SinkOutcome {
        if !self.is_wheel_item(req) {
            return SinkOutcome::skipped("not a wheel item");
        }
        if req.payment_pending {
            return SinkOutcome::skipped("payment pending");
        }
        if !settings.announce_wheel_spins {
            return SinkOutcome::skipped("wheel forwarding disabled");
        }
        let Some(forwarder) = &self.forwarder else {
            return SinkOutcome::skipped("no wheel service configured");
        };

        let amount = req.price.as_deref().and_then(parse_amount);
        let outcome = bounded(
            self.timeout,
            forwarder.forward(&req.winner, &req.item, amount),
        )
        .await;
        if outcome.is_delivered() {
            info!(winner = %req.winner, item = %req.item, "Wheel spin forwarded");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::DispatchOrigin;
    use autoprint_sdk::objects::WinKind;
    use std::str::FromStr;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingForwarder {
        spins: Mutex<Vec<(String, Option<Decimal>)>>,
    }

    #[async_trait]
    impl WheelForwarder for RecordingForwarder {
        async fn forward(
            &self,
            buyer: &str,
            _: &str,
            amount: Option<Decimal>,
        ) -> Result<(), SinkError> {
            self.spins.lock().unwrap().push((buyer.to_string(), amount));
            Ok(())
        }
    }

    fn request(item: &str, origin: DispatchOrigin) -> DispatchRequest {
        DispatchRequest {
            entry_id: None,
            kind: WinKind::Sale,
            winner: "carol".into(),
            item: item.into(),
            price: Some("$5.00".into()),
            status: None,
            payment_pending: false,
            wheel_hint: false,
            origin,
        }
    }

    fn sink(forwarder: &Arc<RecordingForwarder>) -> WheelSink {
        WheelSink::new(
            Some(forwarder.clone() as Arc<dyn WheelForwarder>),
            "Wheel",
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_forwards_marked_items_with_amount() {
        let forwarder = Arc::new(RecordingForwarder::default());
        let sink = sink(&forwarder);
        let settings = PipelineSettings::default();

        let outcome = sink
            .deliver(&request("Mystery WHEEL spin", DispatchOrigin::Automatic), &settings)
            .await;
        assert!(outcome.is_delivered());
        assert_eq!(
            sink.deliver(&request("Charizard Card", DispatchOrigin::Automatic), &settings)
                .await,
            SinkOutcome::skipped("not a wheel item")
        );

        let spins = forwarder.spins.lock().unwrap();
        assert_eq!(spins.len(), 1);
        assert_eq!(spins[0].1, Decimal::from_str("5.00").ok());
    }

    #[tokio::test]
    async fn test_wheel_hint_marks_item() {
        let forwarder = Arc::new(RecordingForwarder::default());
        let mut req = request("Card #12", DispatchOrigin::Automatic);
        req.wheel_hint = true;
        assert!(
            sink(&forwarder)
                .deliver(&req, &PipelineSettings::default())
                .await
                .is_delivered()
        );
    }

    #[tokio::test]
    async fn test_payment_pending_blocks_manual_dispatch() {
        let forwarder = Arc::new(RecordingForwarder::default());
        let mut req = request("Wheel spin", DispatchOrigin::Manual);
        req.payment_pending = true;

        let outcome = sink(&forwarder)
            .deliver(&req, &PipelineSettings::default())
            .await;
        assert_eq!(outcome, SinkOutcome::skipped("payment pending"));
        assert!(forwarder.spins.lock().unwrap().is_empty());
    }
}
