//! Operator notice feed.
//!
//! The `GET /api/v1/admin/notices/ws` endpoint upgrades to a WebSocket
//! connection and pushes a [`NoticeMessage`] JSON frame for every admission
//! outcome, sink result and show transition. The feed is live only; nothing
//! is replayed on connect.

use serde::{Deserialize, Serialize};

use super::win::{AdmissionStatus, WinKind};

/// A downstream action the dispatcher fans out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Printer,
    Chat,
    Wheel,
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkKind::Printer => write!(f, "printer"),
            SinkKind::Chat => write!(f, "chat"),
            SinkKind::Wheel => write!(f, "wheel"),
        }
    }
}

/// Result of handing one win to one sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SinkOutcome {
    /// The collaborator acknowledged the job.
    Delivered,
    /// The sink's gate (toggle, pattern, classification) did not apply.
    Skipped { reason: String },
    /// A print was accepted too recently; this job was dropped.
    CooldownDropped,
    /// The collaborator reported a failure.
    Failed { error: String },
    /// The collaborator did not answer in time.
    TimedOut,
}

impl SinkOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        SinkOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        SinkOutcome::Failed {
            error: error.to_string(),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, SinkOutcome::Delivered)
    }
}

/// Result of one dispatch across all sinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub printer: SinkOutcome,
    pub chat: SinkOutcome,
    pub wheel: SinkOutcome,
}

/// What happened to a show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowAction {
    Created,
    Ended,
    Deleted,
    Reset,
}

/// Server-to-client notice frame.
///
/// Internally tagged so the client can dispatch on the `"type"` field:
///
/// ```json
/// {"type":"admission","status":"duplicate","kind":"sale","name":"alice","item":"Charizard Card"}
/// {"type":"sink","sink":"printer","outcome":{"outcome":"cooldown_dropped"},"name":"alice","item":"Charizard Card"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NoticeMessage {
    Admission {
        status: AdmissionStatus,
        kind: WinKind,
        name: String,
        item: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        price: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        show_id: Option<String>,
    },
    Sink {
        sink: SinkKind,
        outcome: SinkOutcome,
        name: String,
        item: String,
    },
    Show {
        action: ShowAction,
        show_id: String,
    },
    /// Frames were dropped because the client fell behind.
    Lagged { skipped: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_notice_shape() {
        let notice = NoticeMessage::Sink {
            sink: SinkKind::Printer,
            outcome: SinkOutcome::failed("exit status 1"),
            name: "alice".into(),
            item: "Charizard Card".into(),
        };
        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["type"], "sink");
        assert_eq!(json["outcome"]["outcome"], "failed");
        assert_eq!(json["outcome"]["error"], "exit status 1");

        let back: NoticeMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, notice);
    }
}
