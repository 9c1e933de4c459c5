use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::cost::PricingTable;
use crate::pipeline::Pipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Locked for the whole batch so two requests never render at the same time.
    pub pipeline: Arc<Mutex<Pipeline>>,
    pub pricing: Arc<PricingTable>,
    pub config: Config,
}
