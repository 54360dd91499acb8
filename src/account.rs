//! Principals and the polymorphic tenant account (retail store or office).

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated principal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

/// Discriminant of [`Account`]; stored as `account_type` on every scoped row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Retail,
    Office,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Retail => "retail",
            AccountKind::Office => "office",
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "retail" => Ok(AccountKind::Retail),
            "office" => Ok(AccountKind::Office),
            _ => Err(AppError::field(
                "account_type",
                format!("invalid account type: {} (expected retail or office)", s),
            )),
        }
    }
}

/// Kind + id of an account. This is the scoping root handed to every store call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct AccountRef {
    #[serde(rename = "account_type")]
    pub kind: AccountKind,
    #[serde(rename = "account_id")]
    pub id: Uuid,
}

impl AccountRef {
    pub fn new(kind: AccountKind, id: Uuid) -> Self {
        AccountRef { kind, id }
    }
}

impl std::fmt::Display for AccountRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RetailStore {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Office {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// The tenant a request operates against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "account_type", rename_all = "lowercase")]
pub enum Account {
    Retail(RetailStore),
    Office(Office),
}

impl Account {
    pub fn kind(&self) -> AccountKind {
        match self {
            Account::Retail(_) => AccountKind::Retail,
            Account::Office(_) => AccountKind::Office,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Account::Retail(r) => r.id,
            Account::Office(o) => o.id,
        }
    }

    pub fn account_ref(&self) -> AccountRef {
        AccountRef::new(self.kind(), self.id())
    }
}

/// A user's currently selected account. One row per user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionAccount {
    pub user_id: Uuid,
    pub account_type: AccountKind,
    pub account_id: Uuid,
    pub updated_at: DateTime<Utc>,
}

impl SessionAccount {
    pub fn account_ref(&self) -> AccountRef {
        AccountRef::new(self.account_type, self.account_id)
    }
}
