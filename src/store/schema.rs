//! Table DDL for principals, accounts, session pointers and every catalog entity.
//! All tables live in the configured schema (default `shopdesk`).

use crate::config::{Catalog, ColumnDef, EntityDef};
use crate::error::{AppError, ConfigError};
use crate::sql::{qualified_table, quoted};
use serde_json::Value;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

/// Create the schema and all tables if they do not exist. Safe to run on every start.
pub async fn ensure_tables(pool: &PgPool, schema: &str, catalog: &Catalog) -> Result<(), AppError> {
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema)))
        .execute(pool)
        .await?;

    for ddl in account_ddl(schema) {
        sqlx::query(&ddl).execute(pool).await?;
    }

    for entity in catalog.entities() {
        sqlx::query(&entity_table_ddl(schema, entity)).execute(pool).await?;
        let index = format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} (account_type, account_id)",
            quoted(&format!("{}_account_idx", entity.table)),
            qualified_table(schema, entity.table)
        );
        sqlx::query(&index).execute(pool).await?;
    }

    // Foreign keys after every table exists; only the missing ones are added.
    for entity in catalog.entities() {
        for c in entity.reference_columns() {
            let Some(target) = c.references else { continue };
            let name = foreign_key_name(entity, c);
            let (exists,): (bool,) = sqlx::query_as(
                "SELECT EXISTS(SELECT 1 FROM pg_constraint c \
                 JOIN pg_namespace n ON n.oid = c.connamespace \
                 WHERE n.nspname = $1 AND c.conname = $2)",
            )
            .bind(schema)
            .bind(&name)
            .fetch_one(pool)
            .await?;
            if !exists {
                sqlx::query(&foreign_key_ddl(schema, entity, c, target))
                    .execute(pool)
                    .await?;
                tracing::debug!(table = entity.table, column = c.name, constraint = %name, "foreign key added");
            }
        }
    }

    tracing::info!(schema, entities = catalog.entities().len(), "tables ensured");
    Ok(())
}

fn account_ddl(schema: &str) -> Vec<String> {
    let users = qualified_table(schema, "users");
    let tokens = qualified_table(schema, "api_tokens");
    let retail = qualified_table(schema, "retail_stores");
    let offices = qualified_table(schema, "offices");
    let members = qualified_table(schema, "office_members");
    let sessions = qualified_table(schema, "session_accounts");
    vec![
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {users} (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                email TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {tokens} (
                token_hash TEXT PRIMARY KEY,
                user_id UUID NOT NULL REFERENCES {users} (id) ON DELETE CASCADE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                revoked_at TIMESTAMPTZ
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {retail} (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                owner_id UUID NOT NULL REFERENCES {users} (id),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {offices} (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {members} (
                office_id UUID NOT NULL REFERENCES {offices} (id) ON DELETE CASCADE,
                user_id UUID NOT NULL REFERENCES {users} (id) ON DELETE CASCADE,
                role TEXT NOT NULL DEFAULT 'member',
                PRIMARY KEY (office_id, user_id)
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {sessions} (
                user_id UUID PRIMARY KEY REFERENCES {users} (id) ON DELETE CASCADE,
                account_type TEXT NOT NULL CHECK (account_type IN ('retail', 'office')),
                account_id UUID NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#
        ),
    ]
}

/// CREATE TABLE for one scoped entity: system columns plus declared columns.
pub(crate) fn entity_table_ddl(schema: &str, entity: &EntityDef) -> String {
    let mut cols = vec![
        "id BIGSERIAL PRIMARY KEY".to_string(),
        "account_type TEXT NOT NULL CHECK (account_type IN ('retail', 'office'))".to_string(),
        "account_id UUID NOT NULL".to_string(),
    ];
    for c in &entity.columns {
        cols.push(column_ddl(c));
    }
    cols.push("created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()".into());
    cols.push("updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()".into());
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        qualified_table(schema, entity.table),
        cols.join(",\n    ")
    )
}

fn column_ddl(c: &ColumnDef) -> String {
    let mut s = format!("{} {}", quoted(c.name), c.ty.ddl());
    if !c.nullable {
        s.push_str(" NOT NULL");
    }
    if let Some(default) = c.default.as_ref().and_then(literal) {
        s.push_str(" DEFAULT ");
        s.push_str(&default);
    }
    s
}

fn literal(v: &Value) -> Option<String> {
    match v {
        Value::Bool(b) => Some(if *b { "TRUE".into() } else { "FALSE".into() }),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(format!("'{}'", s.replace('\'', "''"))),
        _ => None,
    }
}

fn foreign_key_name(entity: &EntityDef, c: &ColumnDef) -> String {
    format!("{}_{}_fkey", entity.table, c.name)
}

fn foreign_key_ddl(schema: &str, entity: &EntityDef, c: &ColumnDef, target: &str) -> String {
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} (id) ON DELETE RESTRICT",
        qualified_table(schema, entity.table),
        quoted(&foreign_key_name(entity, c)),
        quoted(c.name),
        qualified_table(schema, target)
    )
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| invalid_url(e.to_string()))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn invalid_url(reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidSetting {
        key: "DATABASE_URL",
        reason: reason.into(),
    }
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), ConfigError> {
    let path_start = url.rfind('/').ok_or_else(|| invalid_url("no database path"))? + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntityKind;

    #[test]
    fn entity_ddl_has_scope_and_defaults() {
        let catalog = Catalog::standard().unwrap();
        let tasks = catalog.get(EntityKind::Task).unwrap();
        let ddl = entity_table_ddl("shop", tasks);
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS \"shop\".\"tasks\""));
        assert!(ddl.contains("account_id UUID NOT NULL"));
        assert!(ddl.contains("\"title\" TEXT NOT NULL"));
        assert!(ddl.contains("\"status\" TEXT NOT NULL DEFAULT 'Todo'"));
        assert!(ddl.contains("\"team_id\" BIGINT,"));
    }

    #[test]
    fn parses_database_name() {
        let (admin, name) = parse_db_name_from_url("postgres://u:p@localhost:5432/shop?sslmode=disable").unwrap();
        assert_eq!(admin, "postgres://u:p@localhost:5432/postgres");
        assert_eq!(name, "shop");
    }

    #[test]
    fn url_without_path_is_a_config_error() {
        let err = parse_db_name_from_url("postgres:localhost").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { key: "DATABASE_URL", .. }));
        assert!(matches!(AppError::from(err), AppError::Config(_)));
    }

    #[test]
    fn foreign_keys_restrict_deletes() {
        let catalog = Catalog::standard().unwrap();
        let sales = catalog.get(EntityKind::Sale).unwrap();
        let stock_id = sales.column("stock_id").unwrap();
        assert_eq!(foreign_key_name(sales, stock_id), "sales_stock_id_fkey");
        assert_eq!(
            foreign_key_ddl("shop", sales, stock_id, "stocks"),
            "ALTER TABLE \"shop\".\"sales\" ADD CONSTRAINT \"sales_stock_id_fkey\" \
             FOREIGN KEY (\"stock_id\") REFERENCES \"shop\".\"stocks\" (id) ON DELETE RESTRICT"
        );
    }
}
