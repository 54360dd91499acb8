//! In-process [`Store`] for tests and local runs. Same scoping rules as the
//! PostgreSQL store; multi-row writes apply under one write lock.

use super::{ListQuery, Row, Store};
use crate::account::{Account, AccountKind, AccountRef, Office, RetailStore, SessionAccount, User};
use crate::config::EntityDef;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

struct StoredRow {
    scope: AccountRef,
    /// Every declared column (write-only included) plus id and timestamps.
    values: Row,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    tokens: HashMap<String, Uuid>,
    retail: HashMap<Uuid, RetailStore>,
    offices: HashMap<Uuid, Office>,
    members: HashSet<(Uuid, Uuid)>,
    sessions: HashMap<Uuid, SessionAccount>,
    tables: HashMap<&'static str, Vec<StoredRow>>,
    next_id: i64,
}

impl Inner {
    fn insert_row(&mut self, scope: AccountRef, entity: &EntityDef, values: &Row) -> Row {
        self.next_id += 1;
        let now = Value::String(Utc::now().to_rfc3339());
        let mut stored = Row::new();
        stored.insert("id".into(), Value::from(self.next_id));
        for c in &entity.columns {
            stored.insert(c.name.to_string(), values.get(c.name).cloned().unwrap_or(Value::Null));
        }
        stored.insert("created_at".into(), now.clone());
        stored.insert("updated_at".into(), now);
        let out = visible(entity, &stored);
        self.tables
            .entry(entity.table)
            .or_default()
            .push(StoredRow { scope, values: stored });
        out
    }

    fn update_row(&mut self, scope: AccountRef, entity: &EntityDef, id: i64, values: &Row) -> Option<Row> {
        let row = self
            .tables
            .get_mut(entity.table)?
            .iter_mut()
            .find(|r| r.scope == scope && r.values.get("id") == Some(&Value::from(id)))?;
        for c in &entity.columns {
            if let Some(v) = values.get(c.name) {
                row.values.insert(c.name.to_string(), v.clone());
            }
        }
        row.values
            .insert("updated_at".into(), Value::String(Utc::now().to_rfc3339()));
        Some(visible(entity, &row.values))
    }
}

/// Strip write-only columns, keeping the column order of the entity.
fn visible(entity: &EntityDef, stored: &Row) -> Row {
    let mut out = Row::new();
    out.insert("id".into(), stored.get("id").cloned().unwrap_or(Value::Null));
    for c in entity.readable_columns() {
        out.insert(c.name.to_string(), stored.get(c.name).cloned().unwrap_or(Value::Null));
    }
    for ts in ["created_at", "updated_at"] {
        out.insert(ts.to_string(), stored.get(ts).cloned().unwrap_or(Value::Null));
    }
    out
}

/// Exact match; numbers compare by value so `5` matches `5.0`.
fn matches(stored: Option<&Value>, wanted: &Value) -> bool {
    let stored = stored.unwrap_or(&Value::Null);
    match (stored, wanted) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (a, b) => a == b,
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<'_, Inner>, AppError> {
        self.inner
            .read()
            .map_err(|_| AppError::Internal("memory store lock poisoned".into()))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<'_, Inner>, AppError> {
        self.inner
            .write()
            .map_err(|_| AppError::Internal("memory store lock poisoned".into()))
    }

    pub fn add_user(&self, email: &str, name: &str) -> Result<User, AppError> {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
        };
        self.write_lock()?.users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Register a bearer token by its SHA-256 hex digest.
    pub fn add_token(&self, token_hash: &str, user_id: Uuid) -> Result<(), AppError> {
        self.write_lock()?.tokens.insert(token_hash.to_string(), user_id);
        Ok(())
    }

    pub fn add_office_member(&self, office_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        self.write_lock()?.members.insert((office_id, user_id));
        Ok(())
    }

    /// Remove an account without touching session pointers, leaving them stale.
    pub fn remove_account(&self, account: AccountRef) -> Result<bool, AppError> {
        let mut inner = self.write_lock()?;
        Ok(match account.kind {
            AccountKind::Retail => inner.retail.remove(&account.id).is_some(),
            AccountKind::Office => {
                inner.members.retain(|(office, _)| *office != account.id);
                inner.offices.remove(&account.id).is_some()
            }
        })
    }

    /// Number of session pointer rows held for `user_id` (0 or 1).
    pub fn session_rows(&self, user_id: Uuid) -> Result<usize, AppError> {
        Ok(usize::from(self.read_lock()?.sessions.contains_key(&user_id)))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        self.read_lock().map(|_| ())
    }

    async fn user_by_token_hash(&self, token_hash: &str) -> Result<Option<User>, AppError> {
        let inner = self.read_lock()?;
        Ok(inner
            .tokens
            .get(token_hash)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn find_account(&self, account: AccountRef) -> Result<Option<Account>, AppError> {
        let inner = self.read_lock()?;
        Ok(match account.kind {
            AccountKind::Retail => inner.retail.get(&account.id).cloned().map(Account::Retail),
            AccountKind::Office => inner.offices.get(&account.id).cloned().map(Account::Office),
        })
    }

    async fn accounts_for_user(&self, user_id: Uuid) -> Result<Vec<Account>, AppError> {
        let inner = self.read_lock()?;
        let mut retail: Vec<&RetailStore> = inner.retail.values().filter(|r| r.owner_id == user_id).collect();
        retail.sort_by_key(|r| (r.created_at, r.id));
        let mut offices: Vec<&Office> = inner
            .offices
            .values()
            .filter(|o| inner.members.contains(&(o.id, user_id)))
            .collect();
        offices.sort_by_key(|o| (o.created_at, o.id));
        Ok(retail
            .into_iter()
            .cloned()
            .map(Account::Retail)
            .chain(offices.into_iter().cloned().map(Account::Office))
            .collect())
    }

    async fn can_select_account(&self, user_id: Uuid, account: AccountRef) -> Result<bool, AppError> {
        let inner = self.read_lock()?;
        Ok(match account.kind {
            AccountKind::Retail => inner
                .retail
                .get(&account.id)
                .is_some_and(|r| r.owner_id == user_id),
            AccountKind::Office => inner.members.contains(&(account.id, user_id)),
        })
    }

    async fn create_account(&self, user_id: Uuid, kind: AccountKind, name: &str) -> Result<Account, AppError> {
        let mut inner = self.write_lock()?;
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        Ok(match kind {
            AccountKind::Retail => {
                let store = RetailStore {
                    id,
                    name: name.to_string(),
                    owner_id: user_id,
                    created_at,
                };
                inner.retail.insert(id, store.clone());
                Account::Retail(store)
            }
            AccountKind::Office => {
                let office = Office {
                    id,
                    name: name.to_string(),
                    created_at,
                };
                inner.offices.insert(id, office.clone());
                inner.members.insert((id, user_id));
                Account::Office(office)
            }
        })
    }

    async fn session_account(&self, user_id: Uuid) -> Result<Option<SessionAccount>, AppError> {
        Ok(self.read_lock()?.sessions.get(&user_id).cloned())
    }

    async fn upsert_session_account(&self, user_id: Uuid, account: AccountRef) -> Result<SessionAccount, AppError> {
        let session = SessionAccount {
            user_id,
            account_type: account.kind,
            account_id: account.id,
            updated_at: Utc::now(),
        };
        self.write_lock()?.sessions.insert(user_id, session.clone());
        Ok(session)
    }

    async fn delete_session_account(&self, user_id: Uuid) -> Result<bool, AppError> {
        Ok(self.write_lock()?.sessions.remove(&user_id).is_some())
    }

    async fn list(&self, scope: AccountRef, entity: &EntityDef, query: &ListQuery) -> Result<Vec<Row>, AppError> {
        let inner = self.read_lock()?;
        let Some(rows) = inner.tables.get(entity.table) else {
            return Ok(Vec::new());
        };
        let filters: Vec<&(String, Value)> = query
            .filters
            .iter()
            .filter(|(col, _)| entity.readable_columns().any(|c| c.name == col.as_str()))
            .collect();
        Ok(rows
            .iter()
            .filter(|r| r.scope == scope)
            .filter(|r| filters.iter().all(|(col, v)| matches(r.values.get(col.as_str()), v)))
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .map(|r| visible(entity, &r.values))
            .collect())
    }

    async fn read(&self, scope: AccountRef, entity: &EntityDef, id: i64) -> Result<Option<Row>, AppError> {
        let inner = self.read_lock()?;
        Ok(inner.tables.get(entity.table).and_then(|rows| {
            rows.iter()
                .find(|r| r.scope == scope && r.values.get("id") == Some(&Value::from(id)))
                .map(|r| visible(entity, &r.values))
        }))
    }

    async fn insert(&self, scope: AccountRef, entity: &EntityDef, values: &Row) -> Result<Row, AppError> {
        Ok(self.write_lock()?.insert_row(scope, entity, values))
    }

    async fn insert_all(&self, scope: AccountRef, items: &[(&EntityDef, Row)]) -> Result<Vec<Row>, AppError> {
        let mut inner = self.write_lock()?;
        Ok(items
            .iter()
            .map(|(entity, values)| inner.insert_row(scope, entity, values))
            .collect())
    }

    async fn update(
        &self,
        scope: AccountRef,
        entity: &EntityDef,
        id: i64,
        values: &Row,
    ) -> Result<Option<Row>, AppError> {
        Ok(self.write_lock()?.update_row(scope, entity, id, values))
    }

    async fn update_all(
        &self,
        scope: AccountRef,
        entity: &EntityDef,
        items: &[(i64, Row)],
    ) -> Result<Vec<Row>, AppError> {
        let mut inner = self.write_lock()?;
        Ok(items
            .iter()
            .filter_map(|(id, values)| inner.update_row(scope, entity, *id, values))
            .collect())
    }

    async fn delete(&self, scope: AccountRef, entity: &EntityDef, id: i64) -> Result<bool, AppError> {
        let mut inner = self.write_lock()?;
        let Some(rows) = inner.tables.get_mut(entity.table) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|r| !(r.scope == scope && r.values.get("id") == Some(&Value::from(id))));
        Ok(rows.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Catalog, EntityKind};
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[tokio::test]
    async fn rows_are_isolated_per_account() {
        let store = MemoryStore::new();
        let catalog = Catalog::standard().unwrap();
        let customers = catalog.get(EntityKind::Customer).unwrap();
        let a = AccountRef::new(AccountKind::Retail, Uuid::new_v4());
        let b = AccountRef::new(AccountKind::Office, Uuid::new_v4());

        let created = store.insert(a, customers, &row(&[("name", json!("Ada"))])).await.unwrap();
        store.insert(b, customers, &row(&[("name", json!("Ada"))])).await.unwrap();
        let id = created["id"].as_i64().unwrap();

        let q = ListQuery {
            filters: vec![("name".into(), json!("Ada"))],
            limit: 100,
            offset: 0,
        };
        assert_eq!(store.list(a, customers, &q).await.unwrap().len(), 1);
        assert!(store.read(b, customers, id).await.unwrap().is_none());
        assert!(!store.delete(b, customers, id).await.unwrap());
        assert!(store.update(b, customers, id, &row(&[("notes", json!("x"))])).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_only_columns_are_stored_but_hidden() {
        let store = MemoryStore::new();
        let catalog = Catalog::standard().unwrap();
        let email = catalog.get(EntityKind::EmailConfig).unwrap();
        let scope = AccountRef::new(AccountKind::Retail, Uuid::new_v4());
        let created = store
            .insert(
                scope,
                email,
                &row(&[
                    ("host", json!("smtp.example.com")),
                    ("port", json!(587)),
                    ("password", json!("secret")),
                    ("from_address", json!("shop@example.com")),
                ]),
            )
            .await
            .unwrap();
        assert!(!created.contains_key("password"));
        assert_eq!(created["host"], "smtp.example.com");
    }

    #[tokio::test]
    async fn update_all_skips_missing_ids() {
        let store = MemoryStore::new();
        let catalog = Catalog::standard().unwrap();
        let tasks = catalog.get(EntityKind::Task).unwrap();
        let scope = AccountRef::new(AccountKind::Retail, Uuid::new_v4());
        let t = store.insert(scope, tasks, &row(&[("title", json!("Count till"))])).await.unwrap();
        let id = t["id"].as_i64().unwrap();
        let updated = store
            .update_all(
                scope,
                tasks,
                &[(id, row(&[("status", json!("Done"))])), (999, row(&[("status", json!("Done"))]))],
            )
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["status"], "Done");
    }
}
