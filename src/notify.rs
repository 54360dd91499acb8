//! Outbound notifications. Delivery (push, mail) lives outside this crate; the
//! default notifier only records the event in the log.

use crate::account::AccountRef;
use crate::error::AppError;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    StockUpdated {
        account: AccountRef,
        stock_id: i64,
        name: String,
        quantity: i64,
    },
    LowStock {
        account: AccountRef,
        stock_id: i64,
        name: String,
        quantity: i64,
        threshold: i64,
    },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), AppError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), AppError> {
        match notification {
            Notification::StockUpdated {
                account,
                stock_id,
                quantity,
                ..
            } => tracing::info!(account = %account, stock_id, quantity, "stock updated"),
            Notification::LowStock {
                account,
                stock_id,
                quantity,
                threshold,
                ..
            } => tracing::warn!(account = %account, stock_id, quantity, threshold, "stock is low"),
        }
        Ok(())
    }
}
