//! Rule validation
//!
//! The validator is a pure function of a [`ValidationPolicy`] and a draft.
//! App variants differ only in which checks are strict, so the policy is a
//! set of named checks rather than separate code paths.

use crate::error::ValidationError;
use crate::model::RuleDraft;
use crate::repeat::{decode_repeat, NoRepeat};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Date format used in conditions
pub const DATE_FORMAT: &str = "%d/%m/%Y";
/// Hour format used in conditions
pub const HOUR_FORMAT: &str = "%H:%M";

/// A toggleable structural check
///
/// A missing action is always rejected and is not listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    /// Name must be non-blank
    RequireName,
    /// At least one sensor or schedule field
    RequireCondition,
    /// Without sensors, date and hour must both be set
    CompleteSchedule,
    /// Date and hour must parse as DD/MM/YYYY and HH:MM
    ScheduleFormat,
}

/// Active validation rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    pub checks: BTreeSet<Check>,
    /// Token stored when no repeat was chosen
    #[serde(default)]
    pub default_repeat: NoRepeat,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::lenient()
    }
}

impl ValidationPolicy {
    /// Either a date or an hour is enough
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            checks: BTreeSet::from([Check::RequireCondition, Check::ScheduleFormat]),
            default_repeat: NoRepeat::OneTime,
        }
    }

    /// Date and hour are required together when no sensor is set
    #[must_use]
    pub fn strict() -> Self {
        Self {
            checks: BTreeSet::from([
                Check::RequireCondition,
                Check::CompleteSchedule,
                Check::ScheduleFormat,
            ]),
            default_repeat: NoRepeat::OneTime,
        }
    }

    /// Lenient schedule, mandatory name
    #[must_use]
    pub fn named() -> Self {
        Self {
            checks: BTreeSet::from([
                Check::RequireName,
                Check::RequireCondition,
                Check::ScheduleFormat,
            ]),
            default_repeat: NoRepeat::OneTime,
        }
    }

    #[must_use]
    pub fn with_default_repeat(mut self, default_repeat: NoRepeat) -> Self {
        self.default_repeat = default_repeat;
        self
    }

    #[must_use]
    pub fn is_active(&self, check: Check) -> bool {
        self.checks.contains(&check)
    }

    /// Validate a draft and return it normalized.
    ///
    /// Normalization trims the name, drops empty date/hour strings, defaults an
    /// empty repeat and forces the no-repeat token when a date is set.
    pub fn validate(&self, mut draft: RuleDraft) -> Result<RuleDraft, ValidationError> {
        if draft.action.is_none() {
            return Err(ValidationError::MissingAction);
        }

        draft.name = draft.name.trim().to_string();
        if self.is_active(Check::RequireName) && draft.name.is_empty() {
            return Err(ValidationError::MissingName);
        }

        draft.condition.normalize();
        let condition = &draft.condition;

        if self.is_active(Check::RequireCondition)
            && !condition.has_sensor()
            && !condition.has_schedule()
        {
            return Err(ValidationError::EmptyCondition);
        }

        if self.is_active(Check::CompleteSchedule)
            && !condition.has_sensor()
            && condition.has_date() != condition.has_hour()
        {
            return Err(ValidationError::IncompleteSchedule);
        }

        if self.is_active(Check::ScheduleFormat) {
            if let Some(date) = &condition.date {
                if date.len() != 10 || NaiveDate::parse_from_str(date, DATE_FORMAT).is_err() {
                    return Err(ValidationError::InvalidDate(date.clone()));
                }
            }
            if let Some(hour) = &condition.hour {
                if hour.len() != 5 || NaiveTime::parse_from_str(hour, HOUR_FORMAT).is_err() {
                    return Err(ValidationError::InvalidHour(hour.clone()));
                }
            }
        }

        let recurring = decode_repeat(&draft.repeat, self.default_repeat)
            .mode
            .is_recurring();
        if draft.repeat.is_empty() || (condition.has_date() && recurring) {
            draft.repeat = self.default_repeat.as_str().to_string();
        }

        Ok(draft)
    }
}

impl FromStr for ValidationPolicy {
    type Err = String;

    /// Parse a preset name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::lenient()),
            "strict" => Ok(Self::strict()),
            "named" => Ok(Self::named()),
            other => Err(format!("unknown validation policy: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, Condition};

    fn draft(action: Option<Action>, condition: Condition) -> RuleDraft {
        RuleDraft {
            name: "Test".to_string(),
            action,
            condition,
            repeat: String::new(),
        }
    }

    fn hour_only() -> Condition {
        Condition {
            date: Some(String::new()),
            hour: Some("14:30".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_action_wins_over_everything() {
        for policy in [
            ValidationPolicy::lenient(),
            ValidationPolicy::strict(),
            ValidationPolicy::named(),
        ] {
            let mut d = draft(None, Condition::default());
            d.name = String::new();
            assert_eq!(policy.validate(d), Err(ValidationError::MissingAction));
        }
    }

    #[test]
    fn test_empty_condition() {
        let result =
            ValidationPolicy::lenient().validate(draft(Some(Action::Click), Condition::default()));
        assert_eq!(result, Err(ValidationError::EmptyCondition));
    }

    #[test]
    fn test_hour_only_lenient_vs_strict() {
        let accepted = ValidationPolicy::lenient()
            .validate(draft(Some(Action::Click), hour_only()))
            .unwrap();
        assert_eq!(accepted.repeat, "one_time");
        assert_eq!(accepted.condition.date, None);

        let rejected = ValidationPolicy::strict().validate(draft(Some(Action::Click), hour_only()));
        assert_eq!(rejected, Err(ValidationError::IncompleteSchedule));
    }

    #[test]
    fn test_strict_accepts_sensor_without_schedule() {
        let condition = Condition {
            humidity: Some(40.0),
            hour: Some("07:00".to_string()),
            ..Default::default()
        };
        assert!(ValidationPolicy::strict()
            .validate(draft(Some(Action::Click), condition))
            .is_ok());
    }

    #[test]
    fn test_name_required_only_when_active() {
        let mut d = draft(Some(Action::Click), hour_only());
        d.name = "   ".to_string();
        assert_eq!(
            ValidationPolicy::named().validate(d.clone()),
            Err(ValidationError::MissingName)
        );
        let ok = ValidationPolicy::lenient().validate(d).unwrap();
        assert_eq!(ok.name, "");
    }

    #[test]
    fn test_schedule_format() {
        let condition = Condition {
            date: Some("2024-01-01".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            ValidationPolicy::lenient().validate(draft(Some(Action::Click), condition)),
            Err(ValidationError::InvalidDate(_))
        ));

        let condition = Condition {
            hour: Some("25:00".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            ValidationPolicy::lenient().validate(draft(Some(Action::Click), condition)),
            Err(ValidationError::InvalidHour(_))
        ));
    }

    #[test]
    fn test_date_forces_no_repeat() {
        let mut d = draft(
            Some(Action::Click),
            Condition {
                date: Some("24/12/2025".to_string()),
                hour: Some("09:00".to_string()),
                ..Default::default()
            },
        );
        d.repeat = "MoTu".to_string();
        let policy = ValidationPolicy::strict().with_default_repeat(NoRepeat::Never);
        assert_eq!(policy.validate(d).unwrap().repeat, "never");
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Strict".parse::<ValidationPolicy>().unwrap(), ValidationPolicy::strict());
        assert!("loose".parse::<ValidationPolicy>().is_err());
    }

    #[test]
    fn test_policy_from_json() {
        let policy: ValidationPolicy = serde_json::from_str(
            r#"{"checks":["require_condition","complete_schedule"],"default_repeat":"never"}"#,
        )
        .unwrap();
        assert!(policy.is_active(Check::CompleteSchedule));
        assert!(!policy.is_active(Check::RequireName));
        assert_eq!(policy.default_repeat, NoRepeat::Never);
    }
}
