//! Parameter validation keyed by declared input type

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::input::{InputDeclaration, InputType};
use super::phone::{normalize_phone, PhoneError};
use super::region::{lookup_region, RegionLookup, REGION_COUNT};
use super::text::{collapse_whitespace, fold_accents};
use crate::domain::DomainError;

/// Stable machine code naming the violated rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationRule {
    Required,
    Choice,
    RegionCodeFormat,
    RegionCodeRange,
    PhoneFormat,
    NumberFormat,
    NumberMin,
    NumberMax,
    TextTooLong,
    TextPattern,
    UnknownType,
}

impl ValidationRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Choice => "choice",
            Self::RegionCodeFormat => "region_code_format",
            Self::RegionCodeRange => "region_code_range",
            Self::PhoneFormat => "phone_format",
            Self::NumberFormat => "number_format",
            Self::NumberMin => "number_min",
            Self::NumberMax => "number_max",
            Self::TextTooLong => "text_too_long",
            Self::TextPattern => "text_pattern",
            Self::UnknownType => "unknown_type",
        }
    }
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured, user-correctable validation failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub field: String,
    pub rule: ValidationRule,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(field: impl Into<String>, rule: ValidationRule, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<ValidationFailure> for DomainError {
    fn from(failure: ValidationFailure) -> Self {
        DomainError::invalid_field(failure.field, failure.rule.as_str(), failure.message)
    }
}

/// Validates and normalizes raw input values
///
/// Never panics on malformed input: every call returns either the
/// normalized JSON value or a [`ValidationFailure`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterValidator;

impl ParameterValidator {
    /// Validates `raw` against a full declaration
    ///
    /// Blank optional values normalize to `null`.
    pub fn validate(
        declaration: &InputDeclaration,
        raw: &str,
        required: bool,
    ) -> Result<Value, ValidationFailure> {
        let field = declaration.name.as_str();

        if raw.trim().is_empty() {
            return if required {
                Err(ValidationFailure::new(
                    field,
                    ValidationRule::Required,
                    format!("{} is required", declaration.label),
                ))
            } else {
                Ok(Value::Null)
            };
        }

        match declaration.input_type {
            InputType::Select => validate_select(declaration, raw),
            InputType::RegionCode => validate_region_code(field, raw),
            InputType::Phone => validate_phone(field, raw),
            InputType::Number => validate_number(field, raw, declaration.min, declaration.max),
            InputType::Text => validate_text(declaration, raw),
        }
    }

    /// Validates a bare value by type name, e.g. `validate_kind("region_code", "16")`
    pub fn validate_kind(kind: &str, raw: &str) -> Result<Value, ValidationFailure> {
        let input_type = kind.parse::<InputType>().map_err(|e| {
            ValidationFailure::new(kind, ValidationRule::UnknownType, e.to_string())
        })?;
        let declaration = InputDeclaration::new(kind, kind, input_type);

        Self::validate(&declaration, raw, true)
    }
}

fn validate_select(declaration: &InputDeclaration, raw: &str) -> Result<Value, ValidationFailure> {
    let wanted = choice_key(raw);

    declaration
        .options
        .iter()
        .find(|option| choice_key(&option.value) == wanted || choice_key(&option.label) == wanted)
        .map(|option| Value::String(option.value.clone()))
        .ok_or_else(|| {
            let allowed = declaration
                .options
                .iter()
                .map(|o| o.label.as_str())
                .collect::<Vec<_>>()
                .join(", ");

            ValidationFailure::new(
                &declaration.name,
                ValidationRule::Choice,
                format!(
                    "'{}' is not one of the allowed choices for {}: {}",
                    raw.trim(),
                    declaration.label,
                    allowed
                ),
            )
        })
}

fn choice_key(value: &str) -> String {
    collapse_whitespace(&fold_accents(value)).to_lowercase()
}

fn validate_region_code(field: &str, raw: &str) -> Result<Value, ValidationFailure> {
    match lookup_region(raw) {
        RegionLookup::Valid(code) => Ok(Value::String(code)),
        RegionLookup::OutOfRange(_) => Err(ValidationFailure::new(
            field,
            ValidationRule::RegionCodeRange,
            format!(
                "'{}' is not a valid wilaya code, expected 01 to {:02}",
                raw.trim(),
                REGION_COUNT
            ),
        )),
        RegionLookup::Unknown => Err(ValidationFailure::new(
            field,
            ValidationRule::RegionCodeFormat,
            format!("'{}' is not a known wilaya code or name", raw.trim()),
        )),
    }
}

fn validate_phone(field: &str, raw: &str) -> Result<Value, ValidationFailure> {
    normalize_phone(raw).map(Value::String).map_err(|e| {
        let reason = match e {
            PhoneError::InvalidCharacters => "contains characters that are not part of a phone number",
            PhoneError::InvalidLength => "does not have the digits of an Algerian number",
            PhoneError::NotMobile => "is not a mobile number (expected 05, 06 or 07)",
        };

        ValidationFailure::new(
            field,
            ValidationRule::PhoneFormat,
            format!("'{}' {}", raw.trim(), reason),
        )
    })
}

fn validate_number(
    field: &str,
    raw: &str,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<Value, ValidationFailure> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    let number = cleaned
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| {
            ValidationFailure::new(
                field,
                ValidationRule::NumberFormat,
                format!("'{}' is not a number", raw.trim()),
            )
        })?;

    if let Some(min) = min {
        if number < min {
            return Err(ValidationFailure::new(
                field,
                ValidationRule::NumberMin,
                format!("{} is below the minimum of {}", number, min),
            ));
        }
    }

    if let Some(max) = max {
        if number > max {
            return Err(ValidationFailure::new(
                field,
                ValidationRule::NumberMax,
                format!("{} is above the maximum of {}", number, max),
            ));
        }
    }

    Ok(number_value(number))
}

fn number_value(number: f64) -> Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

    if number.fract() == 0.0 && number.abs() < MAX_EXACT {
        Value::from(number as i64)
    } else {
        serde_json::Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn validate_text(declaration: &InputDeclaration, raw: &str) -> Result<Value, ValidationFailure> {
    let field = declaration.name.as_str();
    let text = collapse_whitespace(raw);

    if let Some(limit) = declaration.max_length {
        let length = text.chars().count();

        if length > limit {
            return Err(ValidationFailure::new(
                field,
                ValidationRule::TextTooLong,
                format!("{} characters exceeds the limit of {}", length, limit),
            ));
        }
    }

    if let Some(pattern) = &declaration.pattern {
        let matches = anchored(pattern)
            .map(|re| re.is_match(&text))
            .unwrap_or(false);

        if !matches {
            return Err(ValidationFailure::new(
                field,
                ValidationRule::TextPattern,
                format!("'{}' is not a valid {}", text, declaration.label),
            ));
        }
    }

    Ok(Value::String(text))
}

/// Compiles `pattern` so that it must match the whole value
fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", pattern))
}
