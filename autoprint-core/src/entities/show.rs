use std::collections::BTreeMap;

use autoprint_sdk::objects::admin::{ShowResponse, ShowStatus as SdkShowStatus};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Slug identifying a show, derived from its display name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShowId(String);

impl ShowId {
    /// Lowercase the name and replace every non-alphanumeric character with
    /// `-`. Returns `None` for names with no alphanumeric content.
    pub fn from_name(name: &str) -> Option<Self> {
        let slug: String = name
            .trim()
            .chars()
            .map(|c| {
                if c.is_alphanumeric() {
                    c.to_lowercase().next().unwrap_or(c)
                } else {
                    '-'
                }
            })
            .collect();
        if slug.chars().any(char::is_alphanumeric) {
            Some(Self(slug))
        } else {
            None
        }
    }

    /// Wrap an id that is already a slug (e.g. a path parameter).
    pub fn from_slug(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn labels_file(&self) -> String {
        format!("labels-{}.json", self.0)
    }
}

impl std::fmt::Display for ShowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowStatus {
    Active,
    Ended,
}

impl From<ShowStatus> for SdkShowStatus {
    fn from(value: ShowStatus) -> Self {
        match value {
            ShowStatus::Active => SdkShowStatus::Active,
            ShowStatus::Ended => SdkShowStatus::Ended,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowRecord {
    pub name: String,
    pub labels_file: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub ended_at: Option<OffsetDateTime>,
    pub status: ShowStatus,
}

impl ShowRecord {
    pub fn new(id: &ShowId, name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            labels_file: id.labels_file(),
            created_at: OffsetDateTime::now_utc(),
            ended_at: None,
            status: ShowStatus::Active,
        }
    }

    pub fn to_response(&self, id: &ShowId) -> ShowResponse {
        ShowResponse {
            show_id: id.to_string(),
            name: self.name.clone(),
            labels_file: self.labels_file.clone(),
            status: self.status.into(),
            created_at: self.created_at.unix_timestamp(),
            ended_at: self.ended_at.map(OffsetDateTime::unix_timestamp),
        }
    }
}

/// The persisted show registry: every show ever created plus the one that
/// is currently running.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowRegistry {
    #[serde(default)]
    pub current_show: Option<ShowId>,
    #[serde(default)]
    pub shows: BTreeMap<ShowId, ShowRecord>,
}

impl ShowRegistry {
    /// The active show, if the registry names one and it is still active.
    pub fn active(&self) -> Option<(&ShowId, &ShowRecord)> {
        let id = self.current_show.as_ref()?;
        let record = self.shows.get(id)?;
        (record.status == ShowStatus::Active).then_some((id, record))
    }

    pub fn to_responses(&self) -> Vec<ShowResponse> {
        self.shows
            .iter()
            .map(|(id, record)| record.to_response(id))
            .collect()
    }
}
