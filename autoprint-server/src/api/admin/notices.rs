use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use autoprint_sdk::objects::NoticeMessage;
use tokio::sync::broadcast::error::RecvError;

use crate::state::AppState;

/// `GET /notices/ws` — WebSocket notice feed.
///
/// Pushes a [`NoticeMessage`] JSON frame for every admission, sink outcome
/// and show lifecycle change. A client that falls behind receives a
/// `lagged` frame with the number of notices it missed.
pub async fn notices_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_notice_ws(socket, state))
}

/// Background task that drives a single WebSocket connection until the
/// client disconnects or the pipeline shuts down.
async fn handle_notice_ws(mut socket: WebSocket, state: AppState) {
    let mut notices = state.pipeline.notices.subscribe();
    tracing::debug!("Notice feed client connected");

    loop {
        tokio::select! {
            result = notices.recv() => {
                let message = match result {
                    Ok(notice) => NoticeMessage::from(notice),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Notice feed client lagged");
                        NoticeMessage::Lagged { skipped }
                    }
                    Err(RecvError::Closed) => break,
                };
                if send_json(&mut socket, &message).await.is_err() {
                    return; // client gone
                }
            }

            // Incoming WebSocket frame from the client (ping/pong/close)
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                        tracing::debug!("Notice feed client disconnected");
                        return;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    let _ = socket.send(Message::Close(None)).await;
}

/// Serialize `value` as JSON and send it as a text WebSocket frame.
async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, value: &T) -> Result<(), ()> {
    let json = serde_json::to_string(value).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}
