pub mod admin;
pub mod notice;
pub mod win;

pub use notice::{DispatchSummary, NoticeMessage, ShowAction, SinkKind, SinkOutcome};
pub use win::{AdmissionResponse, AdmissionStatus, WinEventPayload, WinKind};
