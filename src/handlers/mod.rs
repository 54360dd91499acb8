//! HTTP handlers: scoped entity CRUD, stock, accounts/session, kanban and reports.

pub mod entity;
pub mod kanban;
pub mod reports;
pub mod session;
pub mod stock;
