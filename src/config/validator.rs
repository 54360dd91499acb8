//! Catalog validation: referential integrity and route consistency.

use crate::config::types::EntityDef;
use crate::error::ConfigError;
use std::collections::HashSet;

/// Columns every scoped table carries; entity definitions may not redeclare them.
pub const SYSTEM_COLUMNS: &[&str] = &["id", "account_type", "account_id", "created_at", "updated_at"];

pub fn validate(entities: &[EntityDef]) -> Result<(), ConfigError> {
    let mut tables = HashSet::new();
    let mut paths = HashSet::new();
    for e in entities {
        if !tables.insert(e.table) {
            return Err(ConfigError::Catalog(format!("duplicate table: {}", e.table)));
        }
        if !paths.insert(e.path) {
            return Err(ConfigError::DuplicatePathSegment(e.path.to_string()));
        }
    }

    for e in entities {
        let mut names = HashSet::new();
        for c in &e.columns {
            if SYSTEM_COLUMNS.contains(&c.name) {
                return Err(ConfigError::Catalog(format!(
                    "{}.{} shadows a system column",
                    e.table, c.name
                )));
            }
            if !names.insert(c.name) {
                return Err(ConfigError::Catalog(format!("duplicate column: {}.{}", e.table, c.name)));
            }
            if let Some(target) = c.references {
                if !tables.contains(target) {
                    return Err(ConfigError::MissingReference {
                        kind: "table",
                        id: format!("{} (from {}.{})", target, e.table, c.name),
                    });
                }
            }
            if let Some(pattern) = c.rule.pattern {
                regex::Regex::new(pattern).map_err(|err| {
                    ConfigError::Catalog(format!("invalid pattern for {}.{}: {}", e.table, c.name, err))
                })?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{ColumnDef, EntityKind};

    fn entity(table: &'static str, path: &'static str, columns: Vec<ColumnDef>) -> EntityDef {
        EntityDef {
            kind: EntityKind::Team,
            table,
            path,
            label: "Thing",
            columns,
        }
    }

    #[test]
    fn rejects_dangling_reference() {
        let defs = vec![entity("things", "things", vec![ColumnDef::bigint("owner_id").references("owners")])];
        assert!(matches!(validate(&defs), Err(ConfigError::MissingReference { .. })));
    }

    #[test]
    fn rejects_duplicate_path() {
        let defs = vec![entity("a", "same", vec![]), entity("b", "same", vec![])];
        assert!(matches!(validate(&defs), Err(ConfigError::DuplicatePathSegment(_))));
    }

    #[test]
    fn rejects_system_column() {
        let defs = vec![entity("a", "a", vec![ColumnDef::text("account_id")])];
        assert!(validate(&defs).is_err());
    }

    #[test]
    fn rejects_bad_pattern() {
        let defs = vec![entity("a", "a", vec![ColumnDef::text("code").pattern("([")])];
        assert!(validate(&defs).is_err());
    }
}
