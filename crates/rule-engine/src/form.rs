//! Explicit form state for building rule drafts
//!
//! Holds what the UI is editing and enforces the input-time rules: numeric
//! ranges are checked when a value is typed, and a fixed date and a recurring
//! repeat exclude each other.

use crate::error::InputError;
use crate::model::{Action, Condition, Rule, RuleDraft};
use crate::repeat::{decode_repeat, encode_repeat, NoRepeat, RepeatMode, Weekday};
use crate::validator::{DATE_FORMAT, HOUR_FORMAT};
use chrono::{NaiveDate, NaiveTime};
use std::ops::RangeInclusive;

pub const HUMIDITY_RANGE: RangeInclusive<f64> = 0.0..=100.0;
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = -100.0..=100.0;
pub const LUMINOSITY_RANGE: RangeInclusive<f64> = 0.0..=100.0;

/// Form fields for one rule
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleForm {
    pub name: String,
    pub action: Option<Action>,
    pub humidity: Option<f64>,
    pub temperature: Option<f64>,
    pub luminosity: Option<f64>,
    pub date: Option<String>,
    pub hour: Option<String>,
    pub repeat_mode: RepeatMode,
    pub selected_days: Vec<Weekday>,
    /// Id of the stored rule being edited, if any
    pub editing: Option<String>,
}

impl RuleForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an existing rule for editing
    #[must_use]
    pub fn from_rule(rule: &Rule, default: NoRepeat) -> Self {
        let selection = decode_repeat(&rule.repeat, default);
        Self {
            name: rule.name.clone(),
            action: Some(rule.action),
            humidity: rule.condition.humidity,
            temperature: rule.condition.temperature,
            luminosity: rule.condition.luminosity,
            date: rule.condition.date.clone(),
            hour: rule.condition.hour.clone(),
            repeat_mode: selection.mode,
            selected_days: selection.days,
            editing: Some(rule.id.clone()),
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Set the action from its wire name; `""` unsets it
    pub fn set_action(&mut self, value: &str) -> Result<(), InputError> {
        self.action = if value.is_empty() {
            None
        } else {
            Some(value.parse()?)
        };
        Ok(())
    }

    pub fn set_humidity(&mut self, input: &str) -> Result<(), InputError> {
        self.humidity = parse_in_range("humidity", input, HUMIDITY_RANGE, self.humidity)?;
        Ok(())
    }

    pub fn set_temperature(&mut self, input: &str) -> Result<(), InputError> {
        self.temperature =
            parse_in_range("temperature", input, TEMPERATURE_RANGE, self.temperature)?;
        Ok(())
    }

    pub fn set_luminosity(&mut self, input: &str) -> Result<(), InputError> {
        self.luminosity = parse_in_range("luminosity", input, LUMINOSITY_RANGE, self.luminosity)?;
        Ok(())
    }

    /// Set a fixed date; a dated rule never repeats
    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = Some(date.format(DATE_FORMAT).to_string());
        self.repeat_mode = RepeatMode::OneTime;
        self.selected_days.clear();
    }

    pub fn set_hour(&mut self, time: NaiveTime) {
        self.hour = Some(time.format(HOUR_FORMAT).to_string());
    }

    /// Set the date from `DD/MM/YYYY` text; `""` clears it
    pub fn set_date_text(&mut self, input: &str) -> Result<(), InputError> {
        let input = input.trim();
        if input.is_empty() {
            self.date = None;
            return Ok(());
        }
        let date = NaiveDate::parse_from_str(input, DATE_FORMAT).map_err(|_| {
            InputError::BadFormat {
                field: "date",
                expected: "DD/MM/YYYY",
                value: input.to_string(),
            }
        })?;
        self.set_date(date);
        Ok(())
    }

    /// Set the hour from `HH:MM` text; `""` clears it
    pub fn set_hour_text(&mut self, input: &str) -> Result<(), InputError> {
        let input = input.trim();
        if input.is_empty() {
            self.hour = None;
            return Ok(());
        }
        let time = NaiveTime::parse_from_str(input, HOUR_FORMAT).map_err(|_| {
            InputError::BadFormat {
                field: "hour",
                expected: "HH:MM",
                value: input.to_string(),
            }
        })?;
        self.set_hour(time);
        Ok(())
    }

    /// Choose a repeat mode; recurring modes clear the date
    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        if mode != RepeatMode::Days {
            self.selected_days.clear();
        }
        if mode.is_recurring() {
            self.date = None;
        }
        self.repeat_mode = mode;
    }

    /// Add or remove a day from the custom selection
    pub fn toggle_day(&mut self, day: Weekday) {
        if let Some(pos) = self.selected_days.iter().position(|d| *d == day) {
            self.selected_days.remove(pos);
        } else {
            self.selected_days.push(day);
        }
    }

    pub fn clear_action(&mut self) {
        self.action = None;
    }

    pub fn clear_humidity(&mut self) {
        self.humidity = None;
    }

    pub fn clear_temperature(&mut self) {
        self.temperature = None;
    }

    pub fn clear_luminosity(&mut self) {
        self.luminosity = None;
    }

    pub fn clear_date(&mut self) {
        self.date = None;
    }

    pub fn clear_hour(&mut self) {
        self.hour = None;
    }

    pub fn clear_repeat(&mut self) {
        self.repeat_mode = RepeatMode::Unset;
        self.selected_days.clear();
    }

    /// Reset every field and leave edit mode
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Build a draft for the validator
    #[must_use]
    pub fn to_draft(&self, default: NoRepeat) -> RuleDraft {
        RuleDraft {
            name: self.name.trim().to_string(),
            action: self.action,
            condition: Condition {
                humidity: self.humidity,
                temperature: self.temperature,
                luminosity: self.luminosity,
                date: self.date.clone(),
                hour: self.hour.clone(),
            },
            repeat: encode_repeat(&self.repeat_mode, &self.selected_days, default),
        }
    }
}

/// Parse a typed number, rejecting values outside `range`.
///
/// An empty string or a lone `-` (typing in progress) clears the field.
fn parse_in_range(
    field: &'static str,
    input: &str,
    range: RangeInclusive<f64>,
    current: Option<f64>,
) -> Result<Option<f64>, InputError> {
    let input = input.trim();
    if input.is_empty() || input == "-" {
        return Ok(None);
    }

    let value: f64 = input.parse().map_err(|_| InputError::NotANumber {
        field,
        value: input.to_string(),
    })?;
    if !value.is_finite() || !range.contains(&value) {
        tracing::debug!("Rejected {} input {:?}, keeping {:?}", field, input, current);
        return Err(InputError::OutOfRange {
            field,
            min: *range.start(),
            max: *range.end(),
            value: input.to_string(),
        });
    }
    Ok(Some(value))
}
