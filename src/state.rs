//! Shared application state for all routes.

use crate::config::{AppConfig, Catalog};
use crate::notify::{Notifier, TracingNotifier};
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub catalog: Arc<Catalog>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// State with the log-only notifier.
    pub fn new(store: Arc<dyn Store>, catalog: Catalog, config: AppConfig) -> Self {
        AppState {
            store,
            catalog: Arc::new(catalog),
            notifier: Arc::new(TracingNotifier),
            config: Arc::new(config),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}
