//! Chat announcement sink.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use autoprint_sdk::objects::SinkOutcome;
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use super::{SinkError, bounded};
use crate::config::{ChatConfig, PipelineSettings};
use crate::events::DispatchRequest;

/// Posts a message into the stream chat. Returns whether the chat accepted
/// it.
#[async_trait]
pub trait ChatAnnouncer: Send + Sync {
    async fn announce(&self, text: &str) -> bool;
}

/// Announces through an HTTP chat bridge: `POST {endpoint}` with
/// `{"message": "..."}`.
#[derive(Debug, Clone)]
pub struct HttpChatAnnouncer {
    http: reqwest::Client,
    endpoint: Url,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    message: &'a str,
}

impl HttpChatAnnouncer {
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    async fn post(&self, text: &str) -> Result<(), SinkError> {
        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(&ChatMessage { message: text })
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

#[async_trait]
impl ChatAnnouncer for HttpChatAnnouncer {
    async fn announce(&self, text: &str) -> bool {
        match self.post(text).await {
            Ok(()) => true,
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "Chat bridge call failed");
                false
            }
        }
    }
}

pub struct ChatSink {
    announcer: Option<Arc<dyn ChatAnnouncer>>,
    template: String,
    timeout: Duration,
}

impl ChatSink {
    pub fn new(
        announcer: Option<Arc<dyn ChatAnnouncer>>,
        template: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            announcer,
            template: template.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        let announcer = config
            .endpoint
            .clone()
            .map(|url| Arc::new(HttpChatAnnouncer::new(url)) as Arc<dyn ChatAnnouncer>);
        Self::new(announcer, config.template.clone(), config.timeout)
    }

    pub fn render(&self, req: &DispatchRequest) -> String {
        self.template
            .replace("{winner}", &req.winner)
            .replace("{item}", &req.item)
            .replace("{price}", req.price.as_deref().unwrap_or(""))
    }

    pub async fn deliver(&self, req: &DispatchRequest, settings: &PipelineSettings) -> SinkOutcome {
        if !settings.announce_to_chat {
            return SinkOutcome::skipped("chat announcements disabled");
        }
        if !settings.chat_announce_patterns.matches(&req.item) {
            return SinkOutcome::skipped("no announce pattern matched");
        }
        let Some(announcer) = &self.announcer else {
            return SinkOutcome::skipped("no chat bridge configured");
        };

        let text = self.render(req);
        let outcome = bounded(self.timeout, async {
            if announcer.announce(&text).await {
                Ok(())
            } else {
                Err(SinkError::Declined)
            }
        })
        .await;
        if outcome.is_delivered() {
            info!(winner = %req.winner, item = %req.item, "Announced in chat");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PatternList;
    use crate::events::DispatchOrigin;
    use autoprint_sdk::objects::WinKind;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingAnnouncer {
        messages: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatAnnouncer for RecordingAnnouncer {
        async fn announce(&self, text: &str) -> bool {
            self.messages.lock().unwrap().push(text.to_string());
            true
        }
    }

    fn request(item: &str) -> DispatchRequest {
        DispatchRequest {
            entry_id: None,
            kind: WinKind::Sale,
            winner: "alice".into(),
            item: item.into(),
            price: Some("$12.50".into()),
            status: None,
            payment_pending: false,
            wheel_hint: false,
            origin: DispatchOrigin::Automatic,
        }
    }

    #[tokio::test]
    async fn test_announces_only_matching_items() {
        let announcer = Arc::new(RecordingAnnouncer::default());
        let sink = ChatSink::new(
            Some(announcer.clone() as Arc<dyn ChatAnnouncer>),
            "{winner} won {item} for {price}",
            Duration::from_secs(1),
        );
        let settings = PipelineSettings {
            announce_to_chat: true,
            chat_announce_patterns: PatternList::new(["charizard"]),
            ..PipelineSettings::default()
        };

        assert!(
            sink.deliver(&request("Charizard Card"), &settings)
                .await
                .is_delivered()
        );
        assert_eq!(
            sink.deliver(&request("Pikachu Card"), &settings).await,
            SinkOutcome::skipped("no announce pattern matched")
        );
        assert_eq!(
            *announcer.messages.lock().unwrap(),
            vec!["alice won Charizard Card for $12.50".to_string()]
        );
    }

    #[tokio::test]
    async fn test_disabled_chat_is_skipped() {
        let announcer = Arc::new(RecordingAnnouncer::default());
        let sink = ChatSink::new(
            Some(announcer.clone() as Arc<dyn ChatAnnouncer>),
            "{winner}",
            Duration::from_secs(1),
        );
        let settings = PipelineSettings {
            chat_announce_patterns: PatternList::new(["card"]),
            ..PipelineSettings::default()
        };
        assert!(matches!(
            sink.deliver(&request("Charizard Card"), &settings).await,
            SinkOutcome::Skipped { .. }
        ));
        assert!(announcer.messages.lock().unwrap().is_empty());
    }
}
