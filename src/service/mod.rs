//! Services: account resolution, generic scoped CRUD and the domain operations on top.

mod account;
mod crud;
mod kanban;
mod sales;
mod stock;
mod validation;

pub use account::AccountResolver;
pub use crud::CrudService;
pub use kanban::{bucket, Board, BoardColumn, KanbanService, StatusChange};
pub use sales::{sales_summary, SalesSummary};
pub use stock::{notification_for, StockPurchase, StockService};
pub use validation::RequestValidator;
