//! Rule form payloads accepted by the API

use rule_engine::{InputError, NoRepeat, RepeatMode, RuleDraft, RuleForm, Weekday};
use serde::Deserialize;

/// A form field the client may send as a number or as typed text
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    fn as_text(&self) -> String {
        match self {
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }
}

/// Raw form fields for creating or editing a rule
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub humidity: Option<FieldValue>,
    #[serde(default)]
    pub temperature: Option<FieldValue>,
    #[serde(default)]
    pub luminosity: Option<FieldValue>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub hour: String,
    /// Repeat option value; `""` means nothing chosen yet
    #[serde(default)]
    pub repeat: String,
    #[serde(default)]
    pub days: Vec<Weekday>,
}

impl RuleInput {
    /// Replay the fields through a [`RuleForm`] so input-time checks apply.
    ///
    /// The date is applied after the repeat choice, so a dated rule ends up
    /// non-repeating.
    pub fn into_draft(self, default: NoRepeat) -> Result<RuleDraft, InputError> {
        let mut form = RuleForm::new();
        form.set_name(self.name);
        form.set_action(&self.action)?;
        if let Some(v) = &self.humidity {
            form.set_humidity(&v.as_text())?;
        }
        if let Some(v) = &self.temperature {
            form.set_temperature(&v.as_text())?;
        }
        if let Some(v) = &self.luminosity {
            form.set_luminosity(&v.as_text())?;
        }
        form.set_repeat_mode(RepeatMode::from_choice(&self.repeat));
        for day in self.days {
            if !form.selected_days.contains(&day) {
                form.toggle_day(day);
            }
        }
        form.set_hour_text(&self.hour)?;
        form.set_date_text(&self.date)?;
        Ok(form.to_draft(default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rule_engine::Action;

    #[test]
    fn test_input_from_json() {
        let input: RuleInput = serde_json::from_str(
            r#"{"name":"Workday","action":"click","humidity":"45","temperature":-5,
                "hour":"09:00","repeat":"days","days":["Fr","Mo","Fr"]}"#,
        )
        .unwrap();
        let draft = input.into_draft(NoRepeat::OneTime).unwrap();
        assert_eq!(draft.action, Some(Action::Click));
        assert_eq!(draft.condition.humidity, Some(45.0));
        assert_eq!(draft.condition.temperature, Some(-5.0));
        assert_eq!(draft.repeat, "MoFr");
    }

    #[test]
    fn test_date_overrides_recurring_repeat() {
        let input = RuleInput {
            action: "double_click".to_string(),
            date: "31/12/2025".to_string(),
            repeat: "always".to_string(),
            ..Default::default()
        };
        let draft = input.into_draft(NoRepeat::OneTime).unwrap();
        assert_eq!(draft.repeat, "one_time");
        assert_eq!(draft.condition.date.as_deref(), Some("31/12/2025"));
    }

    #[test]
    fn test_empty_repeat_choice_uses_default_token() {
        let input: RuleInput =
            serde_json::from_str(r#"{"action":"click","hour":"08:00","repeat":""}"#).unwrap();
        let draft = input.into_draft(NoRepeat::Never).unwrap();
        assert_eq!(draft.repeat, "never");
    }

    #[test]
    fn test_unknown_repeat_token_passes_through() {
        let input: RuleInput =
            serde_json::from_str(r#"{"action":"click","hour":"08:00","repeat":"weekly"}"#)
                .unwrap();
        let draft = input.into_draft(NoRepeat::OneTime).unwrap();
        assert_eq!(draft.repeat, "weekly");
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        let input = RuleInput {
            action: "click".to_string(),
            luminosity: Some(FieldValue::Number(150.0)),
            ..Default::default()
        };
        assert!(matches!(
            input.into_draft(NoRepeat::OneTime),
            Err(InputError::OutOfRange { field: "luminosity", .. })
        ));
    }
}
