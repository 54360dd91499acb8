//! PostgreSQL-backed [`Store`].

use super::{ListQuery, Row, Store};
use crate::account::{Account, AccountKind, AccountRef, Office, RetailStore, SessionAccount, User};
use crate::config::{ColumnType, EntityDef};
use crate::error::AppError;
use crate::sql::{self, qualified_table, QueryBuf};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    schema: String,
}

impl PgStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgStore {
            pool,
            schema: schema.into(),
        }
    }

    fn table(&self, name: &str) -> String {
        qualified_table(&self.schema, name)
    }

    async fn fetch_retail(&self, id: Uuid) -> Result<Option<RetailStore>, AppError> {
        let sql = format!(
            "SELECT id, name, owner_id, created_at FROM {} WHERE id = $1",
            self.table("retail_stores")
        );
        let row: Option<(Uuid, String, Uuid, DateTime<Utc>)> =
            sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(|(id, name, owner_id, created_at)| RetailStore {
            id,
            name,
            owner_id,
            created_at,
        }))
    }

    async fn fetch_office(&self, id: Uuid) -> Result<Option<Office>, AppError> {
        let sql = format!("SELECT id, name, created_at FROM {} WHERE id = $1", self.table("offices"));
        let row: Option<(Uuid, String, DateTime<Utc>)> =
            sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(|(id, name, created_at)| Office { id, name, created_at }))
    }
}

fn bound(q: &QueryBuf) -> sqlx::query::Query<'_, Postgres, PgArguments> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    query
}

/// Decode a row selected with [`sql::select_column_list`] into JSON, typed per column.
fn decode_row(entity: &EntityDef, row: &PgRow) -> Result<Row, AppError> {
    use sqlx::Row as _;
    let mut out = Row::new();
    out.insert("id".into(), Value::from(row.try_get::<i64, _>("id")?));
    for c in entity.readable_columns() {
        let v = match c.ty {
            ColumnType::Text | ColumnType::Date => row.try_get::<Option<String>, _>(c.name)?.map(Value::String),
            ColumnType::BigInt => row.try_get::<Option<i64>, _>(c.name)?.map(Value::from),
            ColumnType::Numeric => row
                .try_get::<Option<f64>, _>(c.name)?
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            ColumnType::Boolean => row.try_get::<Option<bool>, _>(c.name)?.map(Value::Bool),
        };
        out.insert(c.name.to_string(), v.unwrap_or(Value::Null));
    }
    for ts in ["created_at", "updated_at"] {
        let d: DateTime<Utc> = row.try_get(ts)?;
        out.insert(ts.to_string(), Value::String(d.to_rfc3339()));
    }
    Ok(out)
}

type SessionRow = (Uuid, String, Uuid, DateTime<Utc>);

fn session_from_row((user_id, account_type, account_id, updated_at): SessionRow) -> Result<SessionAccount, AppError> {
    Ok(SessionAccount {
        user_id,
        account_type: account_type.parse()?,
        account_id,
        updated_at,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn user_by_token_hash(&self, token_hash: &str) -> Result<Option<User>, AppError> {
        let sql = format!(
            "SELECT u.id, u.email, u.name FROM {} u JOIN {} t ON t.user_id = u.id \
             WHERE t.token_hash = $1 AND t.revoked_at IS NULL",
            self.table("users"),
            self.table("api_tokens")
        );
        let row: Option<(Uuid, String, String)> =
            sqlx::query_as(&sql).bind(token_hash).fetch_optional(&self.pool).await?;
        Ok(row.map(|(id, email, name)| User { id, email, name }))
    }

    async fn find_account(&self, account: AccountRef) -> Result<Option<Account>, AppError> {
        Ok(match account.kind {
            AccountKind::Retail => self.fetch_retail(account.id).await?.map(Account::Retail),
            AccountKind::Office => self.fetch_office(account.id).await?.map(Account::Office),
        })
    }

    async fn accounts_for_user(&self, user_id: Uuid) -> Result<Vec<Account>, AppError> {
        let retail_sql = format!(
            "SELECT id, name, owner_id, created_at FROM {} WHERE owner_id = $1 ORDER BY created_at, id",
            self.table("retail_stores")
        );
        let retail: Vec<(Uuid, String, Uuid, DateTime<Utc>)> =
            sqlx::query_as(&retail_sql).bind(user_id).fetch_all(&self.pool).await?;
        let office_sql = format!(
            "SELECT o.id, o.name, o.created_at FROM {} o JOIN {} m ON m.office_id = o.id \
             WHERE m.user_id = $1 ORDER BY o.created_at, o.id",
            self.table("offices"),
            self.table("office_members")
        );
        let offices: Vec<(Uuid, String, DateTime<Utc>)> =
            sqlx::query_as(&office_sql).bind(user_id).fetch_all(&self.pool).await?;

        let mut out: Vec<Account> = retail
            .into_iter()
            .map(|(id, name, owner_id, created_at)| {
                Account::Retail(RetailStore {
                    id,
                    name,
                    owner_id,
                    created_at,
                })
            })
            .collect();
        out.extend(
            offices
                .into_iter()
                .map(|(id, name, created_at)| Account::Office(Office { id, name, created_at })),
        );
        Ok(out)
    }

    async fn can_select_account(&self, user_id: Uuid, account: AccountRef) -> Result<bool, AppError> {
        let sql = match account.kind {
            AccountKind::Retail => format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1 AND owner_id = $2)",
                self.table("retail_stores")
            ),
            AccountKind::Office => format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE office_id = $1 AND user_id = $2)",
                self.table("office_members")
            ),
        };
        let (allowed,): (bool,) = sqlx::query_as(&sql)
            .bind(account.id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(allowed)
    }

    async fn create_account(&self, user_id: Uuid, kind: AccountKind, name: &str) -> Result<Account, AppError> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;
        let account = match kind {
            AccountKind::Retail => {
                let sql = format!(
                    "INSERT INTO {} (id, name, owner_id) VALUES ($1, $2, $3) RETURNING created_at",
                    self.table("retail_stores")
                );
                let (created_at,): (DateTime<Utc>,) = sqlx::query_as(&sql)
                    .bind(id)
                    .bind(name)
                    .bind(user_id)
                    .fetch_one(&mut *tx)
                    .await?;
                Account::Retail(RetailStore {
                    id,
                    name: name.to_string(),
                    owner_id: user_id,
                    created_at,
                })
            }
            AccountKind::Office => {
                let sql = format!(
                    "INSERT INTO {} (id, name) VALUES ($1, $2) RETURNING created_at",
                    self.table("offices")
                );
                let (created_at,): (DateTime<Utc>,) = sqlx::query_as(&sql)
                    .bind(id)
                    .bind(name)
                    .fetch_one(&mut *tx)
                    .await?;
                let member_sql = format!(
                    "INSERT INTO {} (office_id, user_id, role) VALUES ($1, $2, 'owner')",
                    self.table("office_members")
                );
                sqlx::query(&member_sql).bind(id).bind(user_id).execute(&mut *tx).await?;
                Account::Office(Office {
                    id,
                    name: name.to_string(),
                    created_at,
                })
            }
        };
        tx.commit().await?;
        Ok(account)
    }

    async fn session_account(&self, user_id: Uuid) -> Result<Option<SessionAccount>, AppError> {
        let sql = format!(
            "SELECT user_id, account_type, account_id, updated_at FROM {} WHERE user_id = $1",
            self.table("session_accounts")
        );
        let row: Option<SessionRow> = sqlx::query_as(&sql).bind(user_id).fetch_optional(&self.pool).await?;
        row.map(session_from_row).transpose()
    }

    async fn upsert_session_account(&self, user_id: Uuid, account: AccountRef) -> Result<SessionAccount, AppError> {
        let sql = format!(
            "INSERT INTO {} (user_id, account_type, account_id, updated_at) VALUES ($1, $2, $3, NOW()) \
             ON CONFLICT (user_id) DO UPDATE SET account_type = EXCLUDED.account_type, \
             account_id = EXCLUDED.account_id, updated_at = NOW() \
             RETURNING user_id, account_type, account_id, updated_at",
            self.table("session_accounts")
        );
        let row: SessionRow = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(account.kind.as_str())
            .bind(account.id)
            .fetch_one(&self.pool)
            .await?;
        session_from_row(row)
    }

    async fn delete_session_account(&self, user_id: Uuid) -> Result<bool, AppError> {
        let sql = format!("DELETE FROM {} WHERE user_id = $1", self.table("session_accounts"));
        let done = sqlx::query(&sql).bind(user_id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn list(&self, scope: AccountRef, entity: &EntityDef, query: &ListQuery) -> Result<Vec<Row>, AppError> {
        let q = sql::select_list(&self.schema, entity, scope, &query.filters, query.limit, query.offset)?;
        let rows = bound(&q).fetch_all(&self.pool).await?;
        rows.iter().map(|r| decode_row(entity, r)).collect()
    }

    async fn read(&self, scope: AccountRef, entity: &EntityDef, id: i64) -> Result<Option<Row>, AppError> {
        let q = sql::select_by_id(&self.schema, entity, scope, id);
        let row = bound(&q).fetch_optional(&self.pool).await?;
        row.map(|r| decode_row(entity, &r)).transpose()
    }

    async fn insert(&self, scope: AccountRef, entity: &EntityDef, values: &Row) -> Result<Row, AppError> {
        let q = sql::insert(&self.schema, entity, scope, values)?;
        let row = bound(&q).fetch_one(&self.pool).await?;
        decode_row(entity, &row)
    }

    async fn insert_all(&self, scope: AccountRef, items: &[(&EntityDef, Row)]) -> Result<Vec<Row>, AppError> {
        let mut out = Vec::with_capacity(items.len());
        let mut tx = self.pool.begin().await?;
        for (entity, values) in items {
            let q = sql::insert(&self.schema, entity, scope, values)?;
            let row = bound(&q).fetch_one(&mut *tx).await?;
            out.push(decode_row(entity, &row)?);
        }
        tx.commit().await?;
        Ok(out)
    }

    async fn update(
        &self,
        scope: AccountRef,
        entity: &EntityDef,
        id: i64,
        values: &Row,
    ) -> Result<Option<Row>, AppError> {
        let q = sql::update(&self.schema, entity, scope, id, values)?;
        let row = bound(&q).fetch_optional(&self.pool).await?;
        row.map(|r| decode_row(entity, &r)).transpose()
    }

    async fn update_all(
        &self,
        scope: AccountRef,
        entity: &EntityDef,
        items: &[(i64, Row)],
    ) -> Result<Vec<Row>, AppError> {
        let mut out = Vec::with_capacity(items.len());
        let mut tx = self.pool.begin().await?;
        for (id, values) in items {
            let q = sql::update(&self.schema, entity, scope, *id, values)?;
            if let Some(row) = bound(&q).fetch_optional(&mut *tx).await? {
                out.push(decode_row(entity, &row)?);
            }
        }
        tx.commit().await?;
        Ok(out)
    }

    async fn delete(&self, scope: AccountRef, entity: &EntityDef, id: i64) -> Result<bool, AppError> {
        let q = sql::delete(&self.schema, entity, scope, id);
        let done = bound(&q).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }
}
