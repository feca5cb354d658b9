//! Built-in rule templates

use crate::model::{Action, Condition, RuleDraft};
use crate::validator::ValidationPolicy;
use serde::Serialize;

/// A ready-made rule the user can add in one step
#[derive(Debug, Clone, Serialize)]
pub struct RuleTemplate {
    /// URL-friendly identifier
    pub slug: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub rule: RuleDraft,
}

/// Hour-triggered template
fn at_hour(hour: &str) -> Condition {
    Condition {
        hour: Some(hour.to_string()),
        ..Default::default()
    }
}

fn template(
    slug: &'static str,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    action: Action,
    condition: Condition,
    repeat: &str,
) -> RuleTemplate {
    RuleTemplate {
        slug,
        name,
        description,
        icon,
        rule: RuleDraft {
            name: name.to_string(),
            action: Some(action),
            condition,
            repeat: repeat.to_string(),
        },
    }
}

/// All built-in templates, in display order
#[must_use]
pub fn catalog() -> Vec<RuleTemplate> {
    vec![
        template(
            "morning-coffee",
            "Morning Coffee",
            "Click every day at 8:00 AM",
            "☕",
            Action::Click,
            at_hour("08:00"),
            "always",
        ),
        template(
            "lunch-reminder",
            "Lunch Reminder",
            "Click every day at 12:00 PM",
            "🍽️",
            Action::Click,
            at_hour("12:00"),
            "always",
        ),
        template(
            "wake-up-call",
            "Wake Up Call",
            "Double click at 7:00 AM",
            "⏰",
            Action::DoubleClick,
            at_hour("07:00"),
            "always",
        ),
        template(
            "evening-routine",
            "Evening Routine",
            "Click every day at 9:00 PM",
            "🌙",
            Action::Click,
            at_hour("21:00"),
            "always",
        ),
        template(
            "workday-start",
            "Workday Start",
            "Click weekdays at 9:00 AM",
            "💼",
            Action::Click,
            at_hour("09:00"),
            "MoTuWeThFr",
        ),
        template(
            "weekend-alert",
            "Weekend Alert",
            "Click on weekends at 10:00 AM",
            "🎉",
            Action::Click,
            at_hour("10:00"),
            "SaSu",
        ),
        template(
            "bright-light",
            "Bright Light",
            "Click when luminosity > 80%",
            "☀️",
            Action::Click,
            Condition {
                luminosity: Some(80.0),
                ..Default::default()
            },
            "always",
        ),
        template(
            "hot-temperature",
            "Hot Temperature",
            "Click when temperature > 30°C",
            "🌡️",
            Action::Click,
            Condition {
                temperature: Some(30.0),
                ..Default::default()
            },
            "always",
        ),
    ]
}

/// Templates whose rule passes `policy`, in display order
#[must_use]
pub fn available(policy: &ValidationPolicy) -> Vec<RuleTemplate> {
    catalog()
        .into_iter()
        .filter(|t| policy.validate(t.rule.clone()).is_ok())
        .collect()
}

/// Look up a template by slug or display name
#[must_use]
pub fn find(key: &str) -> Option<RuleTemplate> {
    catalog()
        .into_iter()
        .find(|t| t.slug == key || t.name.eq_ignore_ascii_case(key))
}
