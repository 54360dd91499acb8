//! Entity, column and validation-rule types that describe every account-scoped table.

use serde_json::Value;
use std::sync::Arc;

/// Storage type of a declared column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    BigInt,
    /// Money and quantities with decimals. Exposed over JSON as numbers.
    Numeric,
    Boolean,
    /// `YYYY-MM-DD`.
    Date,
}

impl ColumnType {
    /// Column type used in DDL.
    pub fn ddl(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Numeric => "NUMERIC(14, 2)",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Date => "DATE",
        }
    }

    /// Cast applied to bound parameters (`$n::cast`).
    pub fn cast(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::BigInt => "int8",
            ColumnType::Numeric => "numeric",
            ColumnType::Boolean => "bool",
            ColumnType::Date => "date",
        }
    }
}

/// `NUMERIC(14, 2)` holds magnitudes strictly below this.
pub const NUMERIC_LIMIT: f64 = 1e12;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Email,
}

#[derive(Clone, Debug, Default)]
pub struct ValidationRule {
    pub required: bool,
    pub format: Option<Format>,
    pub max_length: Option<usize>,
    pub min_length: Option<usize>,
    pub pattern: Option<&'static str>,
    pub allowed: Option<Vec<&'static str>>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
    /// Applied on create when the body omits the column.
    pub default: Option<Value>,
    /// Accepted on writes, never returned in responses (e.g. SMTP password).
    pub write_only: bool,
    /// Table of another scoped entity this column points at (by id, same account).
    pub references: Option<&'static str>,
    pub rule: ValidationRule,
}

impl ColumnDef {
    pub fn new(name: &'static str, ty: ColumnType) -> Self {
        ColumnDef {
            name,
            ty,
            nullable: true,
            default: None,
            write_only: false,
            references: None,
            rule: ValidationRule::default(),
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub fn bigint(name: &'static str) -> Self {
        Self::new(name, ColumnType::BigInt)
    }

    pub fn numeric(name: &'static str) -> Self {
        Self::new(name, ColumnType::Numeric)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, ColumnType::Boolean)
    }

    pub fn date(name: &'static str) -> Self {
        Self::new(name, ColumnType::Date)
    }

    /// Required on create; never null.
    pub fn required(mut self) -> Self {
        self.rule.required = true;
        self.nullable = false;
        self
    }

    /// Not null, filled from `value` when omitted on create.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self.nullable = false;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    pub fn references(mut self, table: &'static str) -> Self {
        self.references = Some(table);
        self
    }

    pub fn email(mut self) -> Self {
        self.rule.format = Some(Format::Email);
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.rule.max_length = Some(n);
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.rule.min_length = Some(n);
        self
    }

    /// Checked to compile when the catalog is validated.
    pub fn pattern(mut self, pattern: &'static str) -> Self {
        self.rule.pattern = Some(pattern);
        self
    }

    pub fn allowed(mut self, values: &[&'static str]) -> Self {
        self.rule.allowed = Some(values.to_vec());
        self
    }

    pub fn minimum(mut self, n: f64) -> Self {
        self.rule.minimum = Some(n);
        self
    }

    pub fn maximum(mut self, n: f64) -> Self {
        self.rule.maximum = Some(n);
        self
    }
}

/// Which domain entity a catalog entry describes. Handlers dispatch on this for
/// entities with behavior beyond plain CRUD.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Customer,
    Stock,
    Supply,
    Sale,
    Order,
    Wallet,
    Transaction,
    Team,
    Task,
    EmailConfig,
}

#[derive(Clone, Debug)]
pub struct EntityDef {
    pub kind: EntityKind,
    pub table: &'static str,
    /// Route segment, e.g. `email-configs`.
    pub path: &'static str,
    /// Human label used in messages, e.g. `Email config`.
    pub label: &'static str,
    pub columns: Vec<ColumnDef>,
}

impl EntityDef {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns returned to clients.
    pub fn readable_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| !c.write_only)
    }

    pub fn reference_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.references.is_some())
    }
}

pub type EntityRef = Arc<EntityDef>;
