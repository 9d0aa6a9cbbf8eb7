//! Admin API client (operator console → AutoPrint server).

use futures_util::StreamExt;
use futures_util::stream::SplitStream;
use reqwest::Client;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use super::{ClientError, parse_response};
use crate::objects::admin::{
    CreateShowRequest, HeartbeatResponse, PatternsRequest, PatternsResponse, ReprintRequest,
    ReprintResponse, ResetResponse, ShowResponse, StatusResponse, ToggleRequest, ToggleResponse,
    WinRecordResponse,
};
use crate::objects::{NoticeMessage, SinkOutcome};

/// Typed HTTP client for the AutoPrint **Admin API**.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: Client,
    base_url: Url,
}

impl AdminClient {
    /// Create a new `AdminClient` for the server at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `GET /api/v1/admin/status`
    pub async fn status(&self) -> Result<StatusResponse, ClientError> {
        self.get("/api/v1/admin/status").await
    }

    /// `POST /api/v1/detector/heartbeat`
    pub async fn heartbeat(&self) -> Result<HeartbeatResponse, ClientError> {
        self.post_empty("/api/v1/detector/heartbeat").await
    }

    /// `GET /api/v1/admin/wins` – most recent wins of the active show.
    pub async fn recent_wins(&self, limit: usize) -> Result<Vec<WinRecordResponse>, ClientError> {
        let url = self.base_url.join("/api/v1/admin/wins")?;
        let resp = self
            .http
            .get(url)
            .query(&[("limit", limit)])
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `GET /api/v1/admin/wins/search` – case-insensitive search over winner
    /// and item.
    pub async fn search_wins(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<WinRecordResponse>, ClientError> {
        let url = self.base_url.join("/api/v1/admin/wins/search")?;
        let limit = limit.to_string();
        let resp = self
            .http
            .get(url)
            .query(&[("q", query), ("limit", limit.as_str())])
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `POST /api/v1/admin/wins/reprint`
    pub async fn reprint(&self, request: &ReprintRequest) -> Result<ReprintResponse, ClientError> {
        self.post_json("/api/v1/admin/wins/reprint", request).await
    }

    /// `POST /api/v1/admin/wins/print-last`
    pub async fn print_last(&self) -> Result<ReprintResponse, ClientError> {
        self.post_empty("/api/v1/admin/wins/print-last").await
    }

    /// `POST /api/v1/admin/printer/test`
    pub async fn test_print(&self) -> Result<SinkOutcome, ClientError> {
        self.post_empty("/api/v1/admin/printer/test").await
    }

    /// `POST /api/v1/admin/printer/pause`
    pub async fn pause(&self) -> Result<ToggleResponse, ClientError> {
        self.post_empty("/api/v1/admin/printer/pause").await
    }

    /// `POST /api/v1/admin/printer/resume`
    pub async fn resume(&self) -> Result<ToggleResponse, ClientError> {
        self.post_empty("/api/v1/admin/printer/resume").await
    }

    /// `PUT /api/v1/admin/settings/exclusions`
    pub async fn set_exclusions(
        &self,
        patterns: Vec<String>,
    ) -> Result<PatternsResponse, ClientError> {
        self.put_json(
            "/api/v1/admin/settings/exclusions",
            &PatternsRequest { patterns },
        )
        .await
    }

    /// `PUT /api/v1/admin/settings/chat-patterns`
    pub async fn set_chat_patterns(
        &self,
        patterns: Vec<String>,
    ) -> Result<PatternsResponse, ClientError> {
        self.put_json(
            "/api/v1/admin/settings/chat-patterns",
            &PatternsRequest { patterns },
        )
        .await
    }

    /// `PUT /api/v1/admin/settings/print-giveaways`
    pub async fn set_print_giveaways(&self, enabled: bool) -> Result<ToggleResponse, ClientError> {
        self.put_json(
            "/api/v1/admin/settings/print-giveaways",
            &ToggleRequest { enabled },
        )
        .await
    }

    /// `PUT /api/v1/admin/settings/announce-to-chat`
    pub async fn set_announce_to_chat(
        &self,
        enabled: bool,
    ) -> Result<ToggleResponse, ClientError> {
        self.put_json(
            "/api/v1/admin/settings/announce-to-chat",
            &ToggleRequest { enabled },
        )
        .await
    }

    /// `PUT /api/v1/admin/settings/announce-wheel-spins`
    pub async fn set_announce_wheel_spins(
        &self,
        enabled: bool,
    ) -> Result<ToggleResponse, ClientError> {
        self.put_json(
            "/api/v1/admin/settings/announce-wheel-spins",
            &ToggleRequest { enabled },
        )
        .await
    }

    /// `GET /api/v1/admin/shows`
    pub async fn list_shows(&self) -> Result<Vec<ShowResponse>, ClientError> {
        self.get("/api/v1/admin/shows").await
    }

    /// `POST /api/v1/admin/shows` – create a show and make it active.
    pub async fn create_show(&self, name: impl Into<String>) -> Result<ShowResponse, ClientError> {
        self.post_json(
            "/api/v1/admin/shows",
            &CreateShowRequest { name: name.into() },
        )
        .await
    }

    /// `POST /api/v1/admin/shows/end` – end the active show.
    pub async fn end_show(&self) -> Result<ShowResponse, ClientError> {
        self.post_empty("/api/v1/admin/shows/end").await
    }

    /// `POST /api/v1/admin/shows/reset` – clear the active show's history.
    pub async fn reset_show(&self) -> Result<ResetResponse, ClientError> {
        self.post_empty("/api/v1/admin/shows/reset").await
    }

    /// `DELETE /api/v1/admin/shows/{show_id}`
    pub async fn delete_show(&self, show_id: &str) -> Result<(), ClientError> {
        let url = self.base_url.join(&format!(
            "/api/v1/admin/shows/{}",
            urlencoding::encode(show_id)
        ))?;
        let resp = self.http.delete(url).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, body });
        }

        Ok(())
    }

    /// `GET /api/v1/admin/notices/ws` – subscribe to the live notice feed.
    pub async fn notices(&self) -> Result<NoticeStream, ClientError> {
        let mut url = self.base_url.join("/api/v1/admin/notices/ws")?;
        let scheme = match url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        // http→ws and https→wss are both special-scheme swaps, which `url`
        // accepts.
        let _ = url.set_scheme(scheme);

        let (ws_stream, _) = connect_async(url.as_str()).await?;
        let (_, read) = ws_stream.split();
        Ok(NoticeStream { read })
    }

    /// Look up a ledger entry id by position in the recent list, newest
    /// first. Convenience for console commands like "reprint 3".
    pub async fn entry_id_at(&self, index: usize) -> Result<Option<Uuid>, ClientError> {
        let wins = self.recent_wins(index + 1).await?;
        Ok(wins.get(index).map(|w| w.entry_id))
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.base_url.join(path)?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    async fn post_empty<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ClientError> {
        let url = self.base_url.join(path)?;
        let resp = self.http.post(url).send().await?;
        parse_response(resp).await
    }

    async fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.base_url.join(path)?;
        let resp = self.http.post(url).json(body).send().await?;
        parse_response(resp).await
    }

    async fn put_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.base_url.join(path)?;
        let resp = self.http.put(url).json(body).send().await?;
        parse_response(resp).await
    }
}

/// Live stream of [`NoticeMessage`] frames.
pub struct NoticeStream {
    read: SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

impl NoticeStream {
    /// Wait for the next notice. Returns `None` once the server closes the
    /// connection.
    pub async fn next(&mut self) -> Option<Result<NoticeMessage, ClientError>> {
        loop {
            let msg = match self.read.next().await? {
                Ok(msg) => msg,
                Err(e) => return Some(Err(e.into())),
            };
            match msg {
                Message::Text(text) => {
                    return Some(serde_json::from_str(&text).map_err(ClientError::Json));
                }
                Message::Close(_) => return None,
                other => debug!(?other, "Ignoring non-text notice frame"),
            }
        }
    }
}
