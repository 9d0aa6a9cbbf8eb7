//! HTTP clients for the AutoPrint server.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest`.

mod admin;
pub mod transport;

pub use admin::{AdminClient, NoticeStream};
pub use transport::{
    BusChannel, BusProxy, DeliveryChannel, DeliveryResult, DeliveryTransport, DirectChannel,
    WinSubmitter, bus_channel,
};

use reqwest::StatusCode;

/// Errors produced by the SDK HTTP clients and delivery channels.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, connection refused, timeout, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// WebSocket handshake or stream failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The in-process bus has no proxy listening.
    #[error("message bus closed")]
    BusClosed,

    /// The bus proxy dropped the request without answering.
    #[error("message bus proxy did not reply")]
    NoReply,
}

pub(crate) async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message_carries_status_and_body() {
        let err = ClientError::Api {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            body: "winner is empty".into(),
        };
        assert_eq!(
            err.to_string(),
            "api error: status 422 Unprocessable Entity, body: winner is empty"
        );
        assert_eq!(ClientError::BusClosed.to_string(), "message bus closed");
    }
}
