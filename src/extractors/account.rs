//! The account a request is scoped to, resolved once per request.

use crate::account::{Account, AccountRef, User};
use crate::error::AppError;
use crate::extractors::AuthUser;
use crate::service::AccountResolver;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

#[derive(Clone, Debug)]
pub struct CurrentAccount {
    pub user: User,
    pub account: Account,
}

impl CurrentAccount {
    /// Scope handed to every store call made for this request.
    pub fn scope(&self) -> AccountRef {
        self.account.account_ref()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        let account = AccountResolver::new(state.store.as_ref()).resolve(&user).await?;
        Ok(CurrentAccount { user, account })
    }
}
