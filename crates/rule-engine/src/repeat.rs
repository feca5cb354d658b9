//! Repeat policy codec
//!
//! Converts between the user's repeat selection (a mode plus an optional set
//! of weekdays) and the canonical `repeat` string sent to the device.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Day of week, declared in weekly order (Monday first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Mo,
    Tu,
    We,
    Th,
    Fr,
    Sa,
    Su,
}

impl Weekday {
    /// All days in canonical order
    pub const ALL: [Weekday; 7] = [
        Weekday::Mo,
        Weekday::Tu,
        Weekday::We,
        Weekday::Th,
        Weekday::Fr,
        Weekday::Sa,
        Weekday::Su,
    ];

    /// Two-letter wire code
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Weekday::Mo => "Mo",
            Weekday::Tu => "Tu",
            Weekday::We => "We",
            Weekday::Th => "Th",
            Weekday::Fr => "Fr",
            Weekday::Sa => "Sa",
            Weekday::Su => "Su",
        }
    }

    /// Parse a two-letter code (case-sensitive)
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.code() == code)
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Token stored when a rule does not repeat
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoRepeat {
    #[default]
    OneTime,
    Never,
}

impl NoRepeat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NoRepeat::OneTime => "one_time",
            NoRepeat::Never => "never",
        }
    }

    fn mode(self) -> RepeatMode {
        match self {
            NoRepeat::OneTime => RepeatMode::OneTime,
            NoRepeat::Never => RepeatMode::Never,
        }
    }
}

/// Repeat option picked by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    /// Nothing chosen yet
    #[default]
    Unset,
    OneTime,
    Never,
    Always,
    /// Specific weekdays
    Days,
    /// Unrecognized token, passed through verbatim
    Other(String),
}

impl RepeatMode {
    /// Map a form repeat option value to a mode; `""` means nothing chosen
    #[must_use]
    pub fn from_choice(choice: &str) -> Self {
        match choice {
            "" => RepeatMode::Unset,
            "one_time" => RepeatMode::OneTime,
            "never" => RepeatMode::Never,
            "always" => RepeatMode::Always,
            "days" => RepeatMode::Days,
            other => RepeatMode::Other(other.to_string()),
        }
    }

    /// Whether this mode recurs (and therefore excludes a fixed date)
    #[must_use]
    pub fn is_recurring(&self) -> bool {
        matches!(self, RepeatMode::Always | RepeatMode::Days | RepeatMode::Other(_))
    }
}

/// Decoded repeat selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepeatSelection {
    pub mode: RepeatMode,
    /// Selected days in weekly order, empty unless `mode` is `Days`
    pub days: Vec<Weekday>,
}

/// Encode a repeat selection into its canonical string.
///
/// Days are emitted in weekly order whatever order they were selected in. An
/// unset mode, or `Days` with nothing selected, yields the default token.
#[must_use]
pub fn encode_repeat(mode: &RepeatMode, days: &[Weekday], default: NoRepeat) -> String {
    match mode {
        RepeatMode::Unset => default.as_str().to_string(),
        RepeatMode::OneTime => NoRepeat::OneTime.as_str().to_string(),
        RepeatMode::Never => NoRepeat::Never.as_str().to_string(),
        RepeatMode::Always => "always".to_string(),
        RepeatMode::Days => {
            let encoded: String = Weekday::ALL
                .into_iter()
                .filter(|d| days.contains(d))
                .map(Weekday::code)
                .collect();
            if encoded.is_empty() {
                default.as_str().to_string()
            } else {
                encoded
            }
        }
        RepeatMode::Other(token) if token.is_empty() => default.as_str().to_string(),
        RepeatMode::Other(token) => token.clone(),
    }
}

/// Decode a canonical repeat string back into a selection
#[must_use]
pub fn decode_repeat(repeat: &str, default: NoRepeat) -> RepeatSelection {
    if let Some(days) = parse_days(repeat) {
        return RepeatSelection {
            mode: RepeatMode::Days,
            days,
        };
    }

    let mode = match repeat {
        "" => default.mode(),
        "one_time" => RepeatMode::OneTime,
        "never" => RepeatMode::Never,
        "always" => RepeatMode::Always,
        other => RepeatMode::Other(other.to_string()),
    };
    RepeatSelection {
        mode,
        days: Vec::new(),
    }
}

/// Parse a string made only of weekday codes.
///
/// Returns `None` unless every two-byte chunk is one of the seven codes, so a
/// token such as `"Monthly"` never reads as Monday.
fn parse_days(repeat: &str) -> Option<Vec<Weekday>> {
    if repeat.is_empty() || repeat.len() % 2 != 0 {
        return None;
    }

    let mut days = Vec::new();
    for chunk in repeat.as_bytes().chunks(2) {
        let code = std::str::from_utf8(chunk).ok()?;
        let day = Weekday::from_code(code)?;
        if !days.contains(&day) {
            days.push(day);
        }
    }
    days.sort();
    Some(days)
}
