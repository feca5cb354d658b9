//! Data models for the rule engine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::InputError;

/// Storage key under which the whole collection is saved
pub const STORAGE_KEY: &str = "eventsData";

/// A complete automation rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Stable identifier, never sent to the device
    #[serde(default = "new_rule_id")]
    pub id: String,
    /// Human-readable name
    #[serde(default)]
    pub name: String,
    /// What the finger does when the rule fires
    pub action: Action,
    /// Trigger condition
    #[serde(default)]
    pub condition: Condition,
    /// Canonical repeat string (`one_time`, `always`, `MoWeFr`, ...)
    #[serde(default)]
    pub repeat: String,
}

/// Capability the device performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Click,
    DoubleClick,
}

impl Action {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Click => "click",
            Action::DoubleClick => "double_click",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "click" => Ok(Action::Click),
            "double_click" => Ok(Action::DoubleClick),
            other => Err(InputError::UnknownAction(other.to_string())),
        }
    }
}

/// Trigger condition; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Relative humidity threshold, 0 to 100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    /// Temperature threshold in degrees Celsius, -100 to 100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Luminosity threshold, 0 to 100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub luminosity: Option<f64>,
    /// Date in DD/MM/YYYY format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Time in HH:MM format (24-hour)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<String>,
}

impl Condition {
    /// Whether any sensor threshold is set
    #[must_use]
    pub fn has_sensor(&self) -> bool {
        self.humidity.is_some() || self.temperature.is_some() || self.luminosity.is_some()
    }

    #[must_use]
    pub fn has_date(&self) -> bool {
        self.date.as_deref().is_some_and(|d| !d.is_empty())
    }

    #[must_use]
    pub fn has_hour(&self) -> bool {
        self.hour.as_deref().is_some_and(|h| !h.is_empty())
    }

    /// Whether a date or an hour is set
    #[must_use]
    pub fn has_schedule(&self) -> bool {
        self.has_date() || self.has_hour()
    }

    /// Drop empty date/hour strings so they are omitted on the wire
    pub(crate) fn normalize(&mut self) {
        if !self.has_date() {
            self.date = None;
        }
        if !self.has_hour() {
            self.hour = None;
        }
    }
}

/// A candidate rule built by the UI, not yet validated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleDraft {
    #[serde(default)]
    pub name: String,
    /// `None` when the user has not picked an action
    #[serde(default)]
    pub action: Option<Action>,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub repeat: String,
}

impl RuleDraft {
    /// Turn a validated draft into a rule with the given id
    #[must_use]
    pub(crate) fn into_rule(self, id: String, action: Action) -> Rule {
        Rule {
            id,
            name: self.name,
            action,
            condition: self.condition,
            repeat: self.repeat,
        }
    }
}

impl From<&Rule> for RuleDraft {
    fn from(rule: &Rule) -> Self {
        Self {
            name: rule.name.clone(),
            action: Some(rule.action),
            condition: rule.condition.clone(),
            repeat: rule.repeat.clone(),
        }
    }
}

/// Persisted document: `{"events": [...]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleDocument {
    #[serde(default)]
    pub events: Vec<Rule>,
}

/// A rule as the device expects it (no id)
#[derive(Debug, Serialize)]
pub struct WireRule<'a> {
    pub name: &'a str,
    pub action: Action,
    pub condition: &'a Condition,
    pub repeat: &'a str,
}

impl<'a> From<&'a Rule> for WireRule<'a> {
    fn from(rule: &'a Rule) -> Self {
        Self {
            name: &rule.name,
            action: rule.action,
            condition: &rule.condition,
            repeat: &rule.repeat,
        }
    }
}

/// Request body for the device's `/events` endpoint
#[derive(Debug, Serialize)]
pub struct WirePayload<'a> {
    pub events: Vec<WireRule<'a>>,
}

impl<'a> WirePayload<'a> {
    #[must_use]
    pub fn new(rules: &'a [Rule]) -> Self {
        Self {
            events: rules.iter().map(WireRule::from).collect(),
        }
    }
}

/// Generate a fresh rule id
#[must_use]
pub fn new_rule_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_omits_unset_fields() {
        let condition = Condition {
            hour: Some("08:00".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&condition).unwrap();
        assert_eq!(json, r#"{"hour":"08:00"}"#);
    }

    #[test]
    fn test_wire_payload_has_no_id() {
        let rule = Rule {
            id: new_rule_id(),
            name: "Morning Coffee".to_string(),
            action: Action::DoubleClick,
            condition: Condition {
                luminosity: Some(80.0),
                ..Default::default()
            },
            repeat: "always".to_string(),
        };
        let rules = [rule];
        let value = serde_json::to_value(WirePayload::new(&rules)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "events": [{
                    "name": "Morning Coffee",
                    "action": "double_click",
                    "condition": { "luminosity": 80.0 },
                    "repeat": "always"
                }]
            })
        );
    }

    #[test]
    fn test_legacy_rule_without_id_or_name() {
        let rule: Rule = serde_json::from_str(
            r#"{"action":"click","condition":{"temperature":30},"repeat":"always"}"#,
        )
        .unwrap();
        assert!(!rule.id.is_empty());
        assert!(rule.name.is_empty());
        assert_eq!(rule.condition.temperature, Some(30.0));
    }

    #[test]
    fn test_action_from_str() {
        assert_eq!("double_click".parse::<Action>().unwrap(), Action::DoubleClick);
        assert!(matches!(
            "triple".parse::<Action>(),
            Err(InputError::UnknownAction(_))
        ));
    }
}
