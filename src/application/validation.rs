//! Declarative request validation.
//!
//! A [`Schema`] is a table of [`FieldRule`]s evaluated by one generic
//! [`validate`]. Every violation is reported; evaluation never stops at the
//! first failure.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::domain::types::JobType;

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{10}$").expect("phone pattern is valid"));

fn phone_pattern() -> &'static Regex {
    &PHONE_PATTERN
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
}

/// Constraints and messages for one field.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Trim before length and pattern checks.
    pub trim: bool,
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    pub pattern: Option<fn() -> &'static Regex>,
    pub one_of: Option<&'static [&'static str]>,
    /// Whether `""` is accepted for optional fields.
    pub allow_empty: bool,
    pub messages: FieldMessages,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldMessages {
    pub required: &'static str,
    pub invalid_type: &'static str,
    pub too_short: &'static str,
    pub too_long: &'static str,
    pub pattern: &'static str,
    pub one_of: &'static str,
}

impl FieldMessages {
    const fn generic() -> Self {
        Self {
            required: "is required",
            invalid_type: "has the wrong type",
            too_short: "is too short",
            too_long: "is too long",
            pattern: "has an invalid format",
            one_of: "is not an allowed value",
        }
    }
}

impl FieldRule {
    pub const fn string(field: &'static str) -> Self {
        Self {
            field,
            kind: FieldKind::String,
            required: false,
            trim: true,
            min_len: None,
            max_len: None,
            pattern: None,
            one_of: None,
            allow_empty: false,
            messages: FieldMessages::generic(),
        }
    }

    pub const fn integer(field: &'static str) -> Self {
        Self {
            kind: FieldKind::Integer,
            ..Self::string(field)
        }
    }

    pub const fn required(mut self, message: &'static str) -> Self {
        self.required = true;
        self.messages.required = message;
        self
    }

    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub const fn min(mut self, len: usize, message: &'static str) -> Self {
        self.min_len = Some(len);
        self.messages.too_short = message;
        self
    }

    pub const fn max(mut self, len: usize, message: &'static str) -> Self {
        self.max_len = Some(len);
        self.messages.too_long = message;
        self
    }

    pub const fn pattern(mut self, pattern: fn() -> &'static Regex, message: &'static str) -> Self {
        self.pattern = Some(pattern);
        self.messages.pattern = message;
        self
    }

    pub const fn one_of(mut self, values: &'static [&'static str], message: &'static str) -> Self {
        self.one_of = Some(values);
        self.messages.one_of = message;
        self
    }

    pub const fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    pub const fn type_message(mut self, message: &'static str) -> Self {
        self.messages.invalid_type = message;
        self
    }

    fn check(&self, value: Option<&Value>, errors: &mut Vec<String>) {
        let value = match value {
            None | Some(Value::Null) => {
                if self.required {
                    errors.push(self.messages.required.to_string());
                }
                return;
            }
            Some(value) => value,
        };

        match self.kind {
            FieldKind::Integer => {
                if !value.is_i64() && !value.is_u64() {
                    errors.push(self.messages.invalid_type.to_string());
                }
            }
            FieldKind::String => {
                let Some(raw) = value.as_str() else {
                    errors.push(self.messages.invalid_type.to_string());
                    return;
                };
                let text = if self.trim { raw.trim() } else { raw };
                if text.is_empty() {
                    if self.required || !self.allow_empty {
                        errors.push(self.messages.required.to_string());
                    }
                    return;
                }
                self.check_text(text, errors);
            }
        }
    }

    fn check_text(&self, text: &str, errors: &mut Vec<String>) {
        let len = text.chars().count();
        if self.min_len.is_some_and(|min| len < min) {
            errors.push(self.messages.too_short.to_string());
        }
        if self.max_len.is_some_and(|max| len > max) {
            errors.push(self.messages.too_long.to_string());
        }
        if self.pattern.is_some_and(|pattern| !pattern().is_match(text)) {
            errors.push(self.messages.pattern.to_string());
        }
        if self.one_of.is_some_and(|allowed| !allowed.contains(&text)) {
            errors.push(self.messages.one_of.to_string());
        }
    }
}

pub type Schema = &'static [FieldRule];

/// Check `input` against `schema`, collecting every violation.
pub fn validate(schema: Schema, input: &Value) -> Result<(), Vec<String>> {
    let Some(object) = input.as_object() else {
        return Err(vec!["request body must be a JSON object".to_string()]);
    };

    let mut errors = Vec::new();
    for rule in schema {
        rule.check(object.get(rule.field), &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

const ROLES: &[&str] = &["HR", "jobSeeker"];
const JOB_TYPES: &[&str] = &[
    JobType::FullTime.as_str(),
    JobType::PartTime.as_str(),
    JobType::Internship.as_str(),
    JobType::Contract.as_str(),
];

const PHONE_RULE: FieldRule = FieldRule::string("phoneNumber")
    .required("Phone number is required")
    .pattern(phone_pattern, "Phone number must be exactly 10 digits")
    .type_message("Phone number must be a string");

pub static SIGN_UP: &[FieldRule] = &[
    FieldRule::string("name")
        .required("Name is required")
        .min(2, "Name must be at least 2 characters")
        .max(25, "Name must be at most 25 characters")
        .type_message("Name must be a string"),
    PHONE_RULE,
    FieldRule::string("role")
        .required("Role is required")
        .one_of(ROLES, "Role must be either HR or jobSeeker"),
    FieldRule::string("password")
        .required("Password is required")
        .min(6, "Password must be at least 6 characters")
        .max(50, "Password must be at most 50 characters"),
    FieldRule::string("note")
        .optional()
        .allow_empty()
        .max(500, "Note must be at most 500 characters"),
];

pub static LOGIN: &[FieldRule] = &[
    PHONE_RULE,
    FieldRule::string("password").required("Password is required"),
];

pub static REFRESH: &[FieldRule] =
    &[FieldRule::string("refreshToken").required("Refresh token is required")];

pub static JOB_CREATE: &[FieldRule] = &[
    FieldRule::string("title")
        .required("Title is required")
        .max(100, "Title must be at most 100 characters"),
    FieldRule::string("description").required("Description is required"),
    FieldRule::string("company_name")
        .required("Company name is required")
        .max(100, "Company name must be at most 100 characters"),
    FieldRule::string("location")
        .optional()
        .allow_empty()
        .max(100, "Location must be at most 100 characters"),
    FieldRule::string("salary_range")
        .required("Salary range is required")
        .max(50, "Salary range must be at most 50 characters"),
    FieldRule::string("job_type").required("Job type is required").one_of(
        JOB_TYPES,
        "Job type must be one of Full-Time, Part-Time, Internship, Contract",
    ),
];

pub static JOB_UPDATE: &[FieldRule] = &[
    FieldRule::string("title").max(100, "Title must be at most 100 characters"),
    FieldRule::string("description"),
    FieldRule::string("company_name").max(100, "Company name must be at most 100 characters"),
    FieldRule::string("location")
        .allow_empty()
        .max(100, "Location must be at most 100 characters"),
    FieldRule::string("salary_range").max(50, "Salary range must be at most 50 characters"),
    FieldRule::string("job_type").one_of(
        JOB_TYPES,
        "Job type must be one of Full-Time, Part-Time, Internship, Contract",
    ),
    FieldRule::integer("id").type_message("Job id must be an integer"),
];
