//! Operator-editable pipeline settings.

use autoprint_sdk::objects::WinKind;
use serde::{Deserialize, Serialize};

/// Case-insensitive substring patterns.
///
/// Patterns are trimmed; blank patterns are dropped on construction so an
/// empty string never matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternList(Vec<String>);

impl PatternList {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            patterns
                .into_iter()
                .map(|p| p.as_ref().trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        )
    }

    /// First pattern contained in `text`, ignoring case.
    pub fn find_match(&self, text: &str) -> Option<&str> {
        let haystack = text.to_lowercase();
        self.0
            .iter()
            .find(|p| haystack.contains(&p.to_lowercase()))
            .map(String::as_str)
    }

    pub fn matches(&self, text: &str) -> bool {
        self.find_match(text).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.clone()
    }
}

/// Toggles and pattern lists consulted by admission and dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Automatic dispatch is paused when false. Wins are still stored.
    pub printing_enabled: bool,
    /// Giveaway wins are stored as excluded when false.
    pub print_giveaways: bool,
    pub announce_to_chat: bool,
    /// Forward wheel items to the wheel service.
    pub announce_wheel_spins: bool,
    /// Items whose title contains any of these are stored as excluded.
    pub exclusions: PatternList,
    /// Items whose title contains any of these are announced in chat.
    pub chat_announce_patterns: PatternList,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            printing_enabled: true,
            print_giveaways: true,
            announce_to_chat: false,
            announce_wheel_spins: true,
            exclusions: PatternList::default(),
            chat_announce_patterns: PatternList::default(),
        }
    }
}

impl PipelineSettings {
    /// Why a win of this kind and title is kept from dispatch, if it is.
    pub fn exclusion_reason(&self, kind: WinKind, item: &str) -> Option<String> {
        if let Some(pattern) = self.exclusions.find_match(item) {
            return Some(format!("matches exclusion pattern '{pattern}'"));
        }
        if kind == WinKind::Giveaway && !self.print_giveaways {
            return Some("giveaway printing disabled".to_string());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_matching_ignores_case_and_blanks() {
        let patterns = PatternList::new(["  Wheel ", "", "   "]);
        assert_eq!(patterns.as_slice(), ["Wheel"]);
        assert!(patterns.matches("Mystery WHEEL Spin"));
        assert!(!patterns.matches("Charizard Card"));
    }

    #[test]
    fn test_exclusion_checked_before_giveaway_toggle() {
        let settings = PipelineSettings {
            print_giveaways: false,
            exclusions: PatternList::new(["shipping"]),
            ..PipelineSettings::default()
        };
        let reason = settings.exclusion_reason(WinKind::Giveaway, "Free Shipping");
        assert_eq!(reason.as_deref(), Some("matches exclusion pattern 'shipping'"));

        let reason = settings.exclusion_reason(WinKind::Giveaway, "Giveaway Prize");
        assert_eq!(reason.as_deref(), Some("giveaway printing disabled"));
        assert_eq!(settings.exclusion_reason(WinKind::Sale, "Charizard Card"), None);
    }
}
