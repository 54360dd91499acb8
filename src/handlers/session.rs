//! Account listing/creation and the session account pointer.

use crate::account::Account;
use crate::error::{AppError, FieldErrors};
use crate::extractors::{ApiJson, AuthUser};
use crate::response::{success_created, success_empty, success_many, success_ok, Reply};
use crate::service::AccountResolver;
use crate::state::AppState;
use axum::extract::State;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

/// Missing fields are reported as field errors, not as a body rejection.
#[derive(Debug, Deserialize)]
pub struct SelectAccountBody {
    pub account_type: Option<String>,
    pub account_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountBody {
    pub account_type: Option<String>,
    pub name: Option<String>,
}

fn required<'a>(errors: &mut FieldErrors, field: &str, value: &'a Option<String>) -> &'a str {
    match value.as_deref() {
        Some(v) => v,
        None => {
            errors.insert(field.to_string(), "is required".into());
            ""
        }
    }
}

fn ensure_valid(errors: FieldErrors) -> Result<(), AppError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation {
            message: "validation failed".into(),
            errors,
        })
    }
}

pub async fn list_accounts(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Reply<Vec<Account>>, AppError> {
    let accounts = AccountResolver::new(state.store.as_ref()).accounts_for(&user).await?;
    Ok(success_many(accounts, "Accounts retrieved"))
}

pub async fn create_account(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(body): ApiJson<CreateAccountBody>,
) -> Result<Reply<Account>, AppError> {
    let mut errors = FieldErrors::new();
    let account_type = required(&mut errors, "account_type", &body.account_type);
    let name = required(&mut errors, "name", &body.name);
    ensure_valid(errors)?;
    let account = AccountResolver::new(state.store.as_ref())
        .create_account(&user, account_type, name)
        .await?;
    Ok(success_created(account, "Account created"))
}

/// GET /session-accounts: the currently selected account.
pub async fn current(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<Reply<Account>, AppError> {
    let account = AccountResolver::new(state.store.as_ref()).resolve(&user).await?;
    Ok(success_ok(account, "Current account retrieved"))
}

/// PUT/POST /session-accounts: switch to another account.
pub async fn select(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(body): ApiJson<SelectAccountBody>,
) -> Result<Reply<Account>, AppError> {
    let mut errors = FieldErrors::new();
    let account_type = required(&mut errors, "account_type", &body.account_type);
    let account_id = match body.account_id.as_deref().map(|s| Uuid::parse_str(s.trim())) {
        Some(Ok(id)) => Some(id),
        Some(Err(_)) => {
            errors.insert("account_id".into(), "must be a valid UUID".into());
            None
        }
        None => {
            errors.insert("account_id".into(), "is required".into());
            None
        }
    };
    ensure_valid(errors)?;
    let Some(account_id) = account_id else {
        return Err(AppError::field("account_id", "is required"));
    };
    let account = AccountResolver::new(state.store.as_ref())
        .set_account(&user, account_type, account_id)
        .await?;
    Ok(success_ok(account, "Account switched"))
}

/// DELETE /session-accounts: forget the selection (logout).
pub async fn clear(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<Reply<Value>, AppError> {
    let cleared = AccountResolver::new(state.store.as_ref()).clear_account(&user).await?;
    Ok(success_empty(if cleared {
        "Account cleared"
    } else {
        "No account was selected"
    }))
}
