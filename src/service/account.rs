//! Resolves and switches the account a user's requests are scoped to.

use crate::account::{Account, AccountKind, AccountRef, User};
use crate::error::AppError;
use crate::store::Store;
use uuid::Uuid;

pub struct AccountResolver<'a> {
    store: &'a dyn Store,
}

impl<'a> AccountResolver<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        AccountResolver { store }
    }

    /// The account named by the user's session pointer.
    ///
    /// Fails with `NoActiveAccount` when the user has never selected one (or logged out),
    /// and with `StaleAccountReference` when the pointer names an account that is gone.
    pub async fn resolve(&self, user: &User) -> Result<Account, AppError> {
        let session = self
            .store
            .session_account(user.id)
            .await?
            .ok_or(AppError::NoActiveAccount)?;
        let account_ref = session.account_ref();
        match self.store.find_account(account_ref).await? {
            Some(account) => Ok(account),
            None => {
                tracing::warn!(user_id = %user.id, account = %account_ref, "session points at a missing account");
                Err(AppError::StaleAccountReference)
            }
        }
    }

    /// Select `account_type`/`account_id` for the user. Re-selecting the current account
    /// only refreshes the pointer.
    pub async fn set_account(&self, user: &User, account_type: &str, account_id: Uuid) -> Result<Account, AppError> {
        let kind: AccountKind = account_type.parse()?;
        let account_ref = AccountRef::new(kind, account_id);
        let account = self
            .store
            .find_account(account_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} account", kind)))?;
        if !self.store.can_select_account(user.id, account_ref).await? {
            return Err(AppError::Forbidden("not allowed to use this account".into()));
        }
        self.store.upsert_session_account(user.id, account_ref).await?;
        tracing::info!(user_id = %user.id, account = %account_ref, "account selected");
        Ok(account)
    }

    /// Drop the session pointer. Returns whether one existed.
    pub async fn clear_account(&self, user: &User) -> Result<bool, AppError> {
        let cleared = self.store.delete_session_account(user.id).await?;
        tracing::info!(user_id = %user.id, cleared, "account cleared");
        Ok(cleared)
    }

    pub async fn accounts_for(&self, user: &User) -> Result<Vec<Account>, AppError> {
        self.store.accounts_for_user(user.id).await
    }

    pub async fn create_account(&self, user: &User, account_type: &str, name: &str) -> Result<Account, AppError> {
        let kind: AccountKind = account_type.parse()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::field("name", "is required"));
        }
        if name.chars().count() > 255 {
            return Err(AppError::field("name", "must be at most 255 characters"));
        }
        let account = self.store.create_account(user.id, kind, name).await?;
        tracing::info!(user_id = %user.id, account = %account.account_ref(), "account created");
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn setup() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = store.add_user("owner@example.com", "Owner").unwrap();
        (store, user)
    }

    #[tokio::test]
    async fn resolve_without_pointer_is_no_active_account() {
        let (store, user) = setup();
        let resolver = AccountResolver::new(&store);
        assert!(matches!(resolver.resolve(&user).await, Err(AppError::NoActiveAccount)));
    }

    #[tokio::test]
    async fn set_then_resolve_returns_selected_account() {
        let (store, user) = setup();
        let resolver = AccountResolver::new(&store);
        let shop = resolver.create_account(&user, "retail", "Corner Shop").await.unwrap();

        let selected = resolver.set_account(&user, "Retail", shop.id()).await.unwrap();
        assert_eq!(selected, shop);
        assert_eq!(resolver.resolve(&user).await.unwrap(), shop);

        // idempotent
        resolver.set_account(&user, "retail", shop.id()).await.unwrap();
        assert_eq!(resolver.resolve(&user).await.unwrap(), shop);
        assert_eq!(store.session_rows(user.id).unwrap(), 1);
    }

    #[tokio::test]
    async fn switching_accounts_overwrites_pointer() {
        let (store, user) = setup();
        let resolver = AccountResolver::new(&store);
        let shop = resolver.create_account(&user, "retail", "Corner Shop").await.unwrap();
        let office = resolver.create_account(&user, "office", "Head Office").await.unwrap();

        resolver.set_account(&user, "retail", shop.id()).await.unwrap();
        resolver.set_account(&user, "office", office.id()).await.unwrap();
        assert_eq!(resolver.resolve(&user).await.unwrap(), office);
        assert_eq!(resolver.accounts_for(&user).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn set_account_rejects_bad_input() {
        let (store, user) = setup();
        let other = store.add_user("other@example.com", "Other").unwrap();
        let resolver = AccountResolver::new(&store);
        let theirs = resolver.create_account(&other, "retail", "Their Shop").await.unwrap();

        assert!(matches!(
            resolver.set_account(&user, "warehouse", theirs.id()).await,
            Err(AppError::Validation { .. })
        ));
        assert!(matches!(
            resolver.set_account(&user, "retail", Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            resolver.set_account(&user, "retail", theirs.id()).await,
            Err(AppError::Forbidden(_))
        ));
        // kind must match the id's table
        assert!(matches!(
            resolver.set_account(&other, "office", theirs.id()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn office_membership_grants_selection() {
        let (store, user) = setup();
        let boss = store.add_user("boss@example.com", "Boss").unwrap();
        let resolver = AccountResolver::new(&store);
        let office = resolver.create_account(&boss, "office", "HQ").await.unwrap();

        assert!(resolver.set_account(&user, "office", office.id()).await.is_err());
        store.add_office_member(office.id(), user.id).unwrap();
        assert_eq!(resolver.set_account(&user, "office", office.id()).await.unwrap(), office);
    }

    #[tokio::test]
    async fn removed_account_is_stale_and_clear_logs_out() {
        let (store, user) = setup();
        let resolver = AccountResolver::new(&store);
        let shop = resolver.create_account(&user, "retail", "Pop-up").await.unwrap();
        resolver.set_account(&user, "retail", shop.id()).await.unwrap();

        store.remove_account(shop.account_ref()).unwrap();
        assert!(matches!(resolver.resolve(&user).await, Err(AppError::StaleAccountReference)));

        assert!(resolver.clear_account(&user).await.unwrap());
        assert!(!resolver.clear_account(&user).await.unwrap());
        assert!(matches!(resolver.resolve(&user).await, Err(AppError::NoActiveAccount)));
    }
}
