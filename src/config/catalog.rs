//! The account-scoped entities served by the API.

use crate::config::types::{ColumnDef, EntityDef, EntityKind, EntityRef};
use crate::config::validate;
use crate::error::ConfigError;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Validated set of entity definitions, indexed by table.
#[derive(Clone, Debug)]
pub struct Catalog {
    entities: Vec<EntityRef>,
    by_table: HashMap<&'static str, EntityRef>,
}

impl Catalog {
    /// Build a catalog from definitions. Fails on dangling references, duplicate
    /// tables or path segments, and patterns that do not compile.
    pub fn new(entities: Vec<EntityDef>) -> Result<Self, ConfigError> {
        validate(&entities)?;
        let entities: Vec<EntityRef> = entities.into_iter().map(Arc::new).collect();
        let by_table = entities.iter().map(|e| (e.table, e.clone())).collect();
        Ok(Catalog {
            entities,
            by_table,
        })
    }

    /// The back-office catalog: customers, stock, supplies, sales, orders, wallets,
    /// transactions, teams, tasks and email configs.
    pub fn standard() -> Result<Self, ConfigError> {
        Self::new(standard_entities())
    }

    pub fn entities(&self) -> &[EntityRef] {
        &self.entities
    }

    pub fn by_table(&self, table: &str) -> Option<&EntityRef> {
        self.by_table.get(table)
    }

    pub fn get(&self, kind: EntityKind) -> Result<&EntityRef, ConfigError> {
        self.entities
            .iter()
            .find(|e| e.kind == kind)
            .ok_or_else(|| ConfigError::Catalog(format!("no entity of kind {:?}", kind)))
    }

    /// Every (entity, column) pair whose column references `table`.
    pub fn referencing(&self, table: &str) -> Vec<(EntityRef, &'static str)> {
        let mut out = Vec::new();
        for e in &self.entities {
            for c in e.reference_columns() {
                if c.references == Some(table) {
                    out.push((e.clone(), c.name));
                }
            }
        }
        out
    }
}

fn standard_entities() -> Vec<EntityDef> {
    vec![
        EntityDef {
            kind: EntityKind::Customer,
            table: "customers",
            path: "customers",
            label: "Customer",
            columns: vec![
                ColumnDef::text("name").required().min_length(1).max_length(255),
                ColumnDef::text("email").email().max_length(255),
                ColumnDef::text("phone").pattern(r"^\+?[0-9 ()-]{5,32}$"),
                ColumnDef::text("address").max_length(500),
                ColumnDef::text("notes"),
            ],
        },
        EntityDef {
            kind: EntityKind::Stock,
            table: "stocks",
            path: "stock",
            label: "Stock",
            columns: vec![
                ColumnDef::text("name").required().min_length(1).max_length(255),
                ColumnDef::text("sku").max_length(64),
                ColumnDef::bigint("quantity").required().minimum(0.0),
                ColumnDef::numeric("cost_price").minimum(0.0),
                ColumnDef::numeric("selling_price").minimum(0.0),
                ColumnDef::bigint("low_stock_threshold")
                    .default_value(json!(0))
                    .minimum(0.0),
            ],
        },
        EntityDef {
            kind: EntityKind::Supply,
            table: "supplies",
            path: "supplies",
            label: "Supply",
            columns: vec![
                ColumnDef::text("supplier_name").required().min_length(1).max_length(255),
                ColumnDef::text("item_name").required().min_length(1).max_length(255),
                ColumnDef::bigint("quantity").required().minimum(0.0),
                ColumnDef::numeric("unit_cost").minimum(0.0),
                ColumnDef::text("status")
                    .default_value(json!("pending"))
                    .allowed(&["pending", "received", "cancelled"]),
                ColumnDef::date("expected_on"),
            ],
        },
        EntityDef {
            kind: EntityKind::Sale,
            table: "sales",
            path: "sales",
            label: "Sale",
            columns: vec![
                ColumnDef::bigint("stock_id").required().references("stocks"),
                ColumnDef::bigint("customer_id").references("customers"),
                ColumnDef::bigint("quantity").required().minimum(1.0),
                ColumnDef::numeric("unit_price").required().minimum(0.0),
                ColumnDef::boolean("is_credit").default_value(json!(false)),
                ColumnDef::numeric("amount_paid")
                    .default_value(json!(0))
                    .minimum(0.0),
                ColumnDef::date("due_on"),
            ],
        },
        EntityDef {
            kind: EntityKind::Order,
            table: "orders",
            path: "orders",
            label: "Order",
            columns: vec![
                ColumnDef::text("reference").required().min_length(1).max_length(64),
                ColumnDef::bigint("customer_id").references("customers"),
                ColumnDef::numeric("total").required().minimum(0.0),
                ColumnDef::text("status")
                    .default_value(json!("open"))
                    .allowed(&["open", "fulfilled", "cancelled"]),
            ],
        },
        EntityDef {
            kind: EntityKind::Wallet,
            table: "wallets",
            path: "wallets",
            label: "Wallet",
            columns: vec![
                ColumnDef::text("name").required().min_length(1).max_length(255),
                ColumnDef::text("currency")
                    .default_value(json!("USD"))
                    .min_length(3)
                    .max_length(3),
                ColumnDef::numeric("balance").default_value(json!(0)),
            ],
        },
        EntityDef {
            kind: EntityKind::Transaction,
            table: "transactions",
            path: "transactions",
            label: "Transaction",
            columns: vec![
                ColumnDef::text("kind")
                    .required()
                    .allowed(&["income", "expense", "transfer"]),
                ColumnDef::numeric("amount").required().minimum(0.0),
                ColumnDef::bigint("wallet_id").references("wallets"),
                ColumnDef::text("description").max_length(500),
                ColumnDef::date("occurred_on"),
            ],
        },
        EntityDef {
            kind: EntityKind::Team,
            table: "teams",
            path: "teams",
            label: "Team",
            columns: vec![
                ColumnDef::text("name").required().min_length(1).max_length(255),
                ColumnDef::text("description"),
            ],
        },
        EntityDef {
            kind: EntityKind::Task,
            table: "tasks",
            path: "tasks",
            label: "Task",
            columns: vec![
                ColumnDef::text("title").required().min_length(1).max_length(255),
                ColumnDef::text("description"),
                ColumnDef::text("status")
                    .default_value(json!("Todo"))
                    .min_length(1)
                    .max_length(64),
                ColumnDef::bigint("team_id").references("teams"),
                ColumnDef::text("assignee").max_length(255),
                ColumnDef::date("due_on"),
                ColumnDef::bigint("position").default_value(json!(0)),
            ],
        },
        EntityDef {
            kind: EntityKind::EmailConfig,
            table: "email_configs",
            path: "email-configs",
            label: "Email config",
            columns: vec![
                ColumnDef::text("host").required().min_length(1).max_length(255),
                ColumnDef::bigint("port").required().minimum(1.0).maximum(65535.0),
                ColumnDef::text("username").max_length(255),
                ColumnDef::text("password").write_only(),
                ColumnDef::text("from_address").required().email().max_length(255),
                ColumnDef::text("encryption")
                    .default_value(json!("tls"))
                    .allowed(&["none", "ssl", "tls"]),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_is_valid() {
        let catalog = Catalog::standard().unwrap();
        assert_eq!(catalog.entities().len(), 10);
        assert_eq!(catalog.by_table("stocks").map(|e| e.path), Some("stock"));
        assert_eq!(catalog.get(EntityKind::EmailConfig).unwrap().path, "email-configs");
    }

    #[test]
    fn referencing_lists_dependents() {
        let catalog = Catalog::standard().unwrap();
        let mut deps: Vec<_> = catalog
            .referencing("customers")
            .into_iter()
            .map(|(e, col)| (e.table, col))
            .collect();
        deps.sort();
        assert_eq!(deps, vec![("orders", "customer_id"), ("sales", "customer_id")]);
    }

    #[test]
    fn password_is_not_readable() {
        let catalog = Catalog::standard().unwrap();
        let email = catalog.get(EntityKind::EmailConfig).unwrap();
        assert!(email.readable_columns().all(|c| c.name != "password"));
    }
}
