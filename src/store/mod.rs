//! Persistence seam. Every method touching a scoped entity takes the resolved
//! [`AccountRef`] and must only see or change rows owned by it.

mod memory;
mod postgres;
mod schema;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use schema::{ensure_database_exists, ensure_tables};

use crate::account::{Account, AccountKind, AccountRef, SessionAccount, User};
use crate::config::EntityDef;
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

/// One entity row as JSON: `id`, readable columns, `created_at`, `updated_at`.
pub type Row = serde_json::Map<String, Value>;

/// Exact-match filters plus paging, already validated and clamped.
#[derive(Clone, Debug, Default)]
pub struct ListQuery {
    pub filters: Vec<(String, Value)>,
    pub limit: u32,
    pub offset: u32,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), AppError>;

    async fn user_by_token_hash(&self, token_hash: &str) -> Result<Option<User>, AppError>;

    async fn find_account(&self, account: AccountRef) -> Result<Option<Account>, AppError>;

    /// Accounts the user may select: owned retail stores and offices they belong to.
    async fn accounts_for_user(&self, user_id: Uuid) -> Result<Vec<Account>, AppError>;

    async fn can_select_account(&self, user_id: Uuid, account: AccountRef) -> Result<bool, AppError>;

    /// Create a retail store owned by `user_id`, or an office with `user_id` as owner member.
    async fn create_account(&self, user_id: Uuid, kind: AccountKind, name: &str) -> Result<Account, AppError>;

    async fn session_account(&self, user_id: Uuid) -> Result<Option<SessionAccount>, AppError>;

    /// Insert or overwrite the user's single pointer row.
    async fn upsert_session_account(&self, user_id: Uuid, account: AccountRef) -> Result<SessionAccount, AppError>;

    async fn delete_session_account(&self, user_id: Uuid) -> Result<bool, AppError>;

    async fn list(&self, scope: AccountRef, entity: &EntityDef, query: &ListQuery) -> Result<Vec<Row>, AppError>;

    async fn read(&self, scope: AccountRef, entity: &EntityDef, id: i64) -> Result<Option<Row>, AppError>;

    async fn insert(&self, scope: AccountRef, entity: &EntityDef, values: &Row) -> Result<Row, AppError>;

    /// Insert several rows, all or nothing.
    async fn insert_all(&self, scope: AccountRef, items: &[(&EntityDef, Row)]) -> Result<Vec<Row>, AppError>;

    async fn update(&self, scope: AccountRef, entity: &EntityDef, id: i64, values: &Row)
        -> Result<Option<Row>, AppError>;

    /// Update several rows of one entity, all or nothing. Ids not found in the scope
    /// are skipped; the returned rows are the ones that were updated.
    async fn update_all(&self, scope: AccountRef, entity: &EntityDef, items: &[(i64, Row)])
        -> Result<Vec<Row>, AppError>;

    async fn delete(&self, scope: AccountRef, entity: &EntityDef, id: i64) -> Result<bool, AppError>;
}
