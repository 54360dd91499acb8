//! Request validation from catalog column rules.
//!
//! Bodies are coerced to the column's storage type first, then checked against the
//! rule. Every failing field is collected so the client sees all problems at once.

use crate::config::{ColumnDef, ColumnType, EntityDef, Format, ValidationRule, NUMERIC_LIMIT};
use crate::error::{AppError, FieldErrors};
use crate::store::Row;
use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a create body. Omitted columns take their default; required columns must
    /// be present and non-null. Unknown and system keys are dropped.
    pub fn for_create(entity: &EntityDef, body: &Value) -> Result<Row, AppError> {
        let body = as_object(body)?;
        let mut out = Row::new();
        let mut errors = FieldErrors::new();
        for c in &entity.columns {
            match body.get(c.name) {
                None | Some(Value::Null) if c.rule.required => {
                    errors.insert(c.name.into(), "is required".into());
                }
                None => {
                    if let Some(default) = &c.default {
                        out.insert(c.name.into(), default.clone());
                    }
                }
                Some(v) => match check(c, v) {
                    Ok(v) => {
                        out.insert(c.name.into(), v);
                    }
                    Err(reason) => {
                        errors.insert(c.name.into(), reason);
                    }
                },
            }
        }
        finish(out, errors)
    }

    /// Validate an update body: only keys present are checked and written.
    pub fn for_update(entity: &EntityDef, body: &Value) -> Result<Row, AppError> {
        let body = as_object(body)?;
        let mut out = Row::new();
        let mut errors = FieldErrors::new();
        for (key, v) in body {
            let Some(c) = entity.column(key) else {
                tracing::debug!(entity = entity.table, key = %key, "ignoring unknown key");
                continue;
            };
            match check(c, v) {
                Ok(v) => {
                    out.insert(c.name.into(), v);
                }
                Err(reason) => {
                    errors.insert(c.name.into(), reason);
                }
            }
        }
        finish(out, errors)
    }

    /// Coerce a query-string filter value to the column's type. The literal `null`
    /// matches SQL NULL.
    pub fn filter_value(c: &ColumnDef, raw: &str) -> Result<Value, AppError> {
        if raw == "null" {
            return Ok(Value::Null);
        }
        let raw = Value::String(raw.to_string());
        coerce(c.ty, &raw).map_err(|reason| AppError::field(c.name, reason))
    }
}

fn as_object(body: &Value) -> Result<&serde_json::Map<String, Value>, AppError> {
    body.as_object()
        .ok_or_else(|| AppError::BadRequest("request body must be a JSON object".into()))
}

fn finish(out: Row, errors: FieldErrors) -> Result<Row, AppError> {
    if errors.is_empty() {
        Ok(out)
    } else {
        Err(AppError::Validation {
            message: "validation failed".into(),
            errors,
        })
    }
}

/// Coerce then apply the column rule. Returns the stored value or a reason.
fn check(c: &ColumnDef, v: &Value) -> Result<Value, String> {
    if v.is_null() {
        return if c.nullable {
            Ok(Value::Null)
        } else {
            Err("may not be null".into())
        };
    }
    let v = coerce(c.ty, v)?;
    apply_rule(&c.rule, &v)?;
    Ok(v)
}

fn coerce(ty: ColumnType, v: &Value) -> Result<Value, String> {
    match ty {
        ColumnType::Text => match v {
            Value::String(s) => Ok(Value::String(s.clone())),
            _ => Err("must be a string".into()),
        },
        ColumnType::BigInt => {
            let n = match v {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            n.map(Value::from).ok_or_else(|| "must be an integer".into())
        }
        ColumnType::Numeric => {
            let n = match v {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            // Stored with two decimals.
            let n = n
                .filter(|n| n.is_finite())
                .map(|n| (n * 100.0).round() / 100.0)
                .ok_or_else(|| "must be a number".to_string())?;
            if n.abs() >= NUMERIC_LIMIT {
                return Err(format!("must be less than {} in magnitude", NUMERIC_LIMIT));
            }
            serde_json::Number::from_f64(n)
                .map(Value::Number)
                .ok_or_else(|| "must be a number".into())
        }
        ColumnType::Boolean => match v {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err("must be a boolean".into()),
            },
            Value::Number(n) => match n.as_i64() {
                Some(0) => Ok(Value::Bool(false)),
                Some(1) => Ok(Value::Bool(true)),
                _ => Err("must be a boolean".into()),
            },
            _ => Err("must be a boolean".into()),
        },
        ColumnType::Date => v
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .ok_or_else(|| "must be a date (YYYY-MM-DD)".into()),
    }
}

fn apply_rule(rule: &ValidationRule, v: &Value) -> Result<(), String> {
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(min) = rule.min_length {
            if len < min {
                return Err(format!("must be at least {} characters", min));
            }
        }
        if let Some(max) = rule.max_length {
            if len > max {
                return Err(format!("must be at most {} characters", max));
            }
        }
        if let Some(Format::Email) = rule.format {
            if !is_email(s) {
                return Err("must be a valid email".into());
            }
        }
        if let Some(pattern) = rule.pattern {
            let re = Regex::new(pattern).map_err(|_| "has an invalid pattern".to_string())?;
            if !re.is_match(s) {
                return Err("does not match required pattern".into());
            }
        }
        if let Some(allowed) = &rule.allowed {
            if !allowed.iter().any(|a| *a == s) {
                return Err(format!("must be one of: {}", allowed.join(", ")));
            }
        }
    }
    if let Some(n) = v.as_f64() {
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(format!("must be at least {}", min));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(format!("must be at most {}", max));
            }
        }
    }
    Ok(())
}

fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !s.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
}
